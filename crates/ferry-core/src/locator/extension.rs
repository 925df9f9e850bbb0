//! File extension inference from a locator's last path segment.

use std::sync::LazyLock;

use regex::Regex;

use super::Locator;

/// Extension used when none can be inferred.
pub const DEFAULT_EXTENSION: &str = ".unknown";

/// A leading dot followed by 1 to 10 ASCII alphanumerics.
#[allow(clippy::expect_used)]
static EXTENSION_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\.[A-Za-z0-9]{1,10}$").expect("extension regex is valid"));

/// Returns the extension (with its dot) of the locator's last path segment,
/// or `None` when it is missing or not a plausible file extension.
///
/// - `https://x/y/z.PNG` → `Some(".PNG")`
/// - `https://x/y/z` → `None`
/// - `/a/.bashrc` → `None`
pub fn infer_extension(locator: &Locator) -> Option<String> {
    let path = locator.url_path();
    let name = path.rsplit('/').next().unwrap_or_default();
    let ext = split_extension(name)?;
    EXTENSION_PATTERN.is_match(ext).then(|| ext.to_string())
}

/// Like [`infer_extension`] but falls back to [`DEFAULT_EXTENSION`].
pub fn extension_or_default(locator: &Locator) -> String {
    infer_extension(locator).unwrap_or_else(|| DEFAULT_EXTENSION.to_string())
}

/// Splits at the last dot, ignoring dots that only lead the name.
fn split_extension(name: &str) -> Option<&str> {
    let dot = name.rfind('.')?;
    if name[..dot].chars().all(|c| c == '.') {
        return None;
    }
    Some(&name[dot..])
}
