use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// curl settings shared by every HTTP request (optional `[http]` section).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Seconds allowed for establishing a connection.
    pub connect_timeout_secs: u64,
    /// Hard limit in seconds for a whole transfer.
    pub timeout_secs: u64,
    /// Maximum redirects followed per request.
    pub max_redirections: u32,
    /// `User-Agent` sent with every request.
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: 30,
            timeout_secs: 3600,
            max_redirections: 10,
            user_agent: format!("ferry/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Object-store endpoints (optional `[object_store]` section). Overridable for
/// emulators and tests.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectStoreConfig {
    pub endpoint: String,
    pub upload_endpoint: String,
}

impl Default for ObjectStoreConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://storage.googleapis.com".to_string(),
            upload_endpoint: "https://storage.googleapis.com/upload/storage/v1".to_string(),
        }
    }
}

/// Global configuration loaded from `~/.config/ferry/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FerryConfig {
    /// Where `remote` uploads land when no prefix is given.
    pub remote_prefix: String,
    /// Environment variable holding the base64 service-account key.
    pub credentials_env: String,
    /// Unmanaged scratch area; the OS temp dir when unset.
    #[serde(default)]
    pub scratch_root: Option<PathBuf>,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub object_store: ObjectStoreConfig,
}

impl Default for FerryConfig {
    fn default() -> Self {
        Self {
            remote_prefix: "gs://ferry-tmp".to_string(),
            credentials_env: "FERRY_CREDENTIALS_JSON".to_string(),
            scratch_root: None,
            http: HttpConfig::default(),
            object_store: ObjectStoreConfig::default(),
        }
    }
}

impl FerryConfig {
    pub fn scratch_root(&self) -> PathBuf {
        self.scratch_root
            .clone()
            .unwrap_or_else(std::env::temp_dir)
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("ferry")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<FerryConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = FerryConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }
    load_from(&path)
}

pub fn load_from(path: &Path) -> Result<FerryConfig> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    let cfg: FerryConfig = toml::from_str(&data)
        .with_context(|| format!("invalid config {}", path.display()))?;
    Ok(cfg)
}
