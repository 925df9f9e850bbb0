//! `ferry classify <uri>` – show the locator variant and its forms.

use anyhow::Result;
use ferry_core::locator::{infer_extension, Locator};

pub fn run_classify(uri: &str) -> Result<()> {
    let locator = Locator::classify(uri)?;
    println!("{:<10} {}", "KIND", locator.kind());
    println!("{:<10} {}", "DISPLAY", locator.as_display());
    println!("{:<10} {}", "SOURCE", locator.as_source());
    println!(
        "{:<10} {}",
        "EXTENSION",
        infer_extension(&locator).as_deref().unwrap_or("-")
    );
    Ok(())
}
