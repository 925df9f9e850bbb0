//! libcurl-backed adapters for HTTP fetch and object-store get/put.
//!
//! All calls run on the current thread and block until the transfer ends.

use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::Path;
use std::sync::OnceLock;
use std::time::Duration;

use curl::easy::{Easy, List, ReadError};

use super::{AdapterError, Backend};
use crate::config::{FerryConfig, HttpConfig, ObjectStoreConfig};
use crate::credential::{self, Credential, CredentialError};
use crate::locator::ObjectStoreLocator;

/// Per-request curl settings.
#[derive(Debug, Clone)]
pub struct CurlOptions {
    pub connect_timeout: Duration,
    pub timeout: Duration,
    pub max_redirections: u32,
    pub user_agent: String,
}

impl Default for CurlOptions {
    fn default() -> Self {
        Self::from(&HttpConfig::default())
    }
}

impl From<&HttpConfig> for CurlOptions {
    fn from(cfg: &HttpConfig) -> Self {
        Self {
            connect_timeout: Duration::from_secs(cfg.connect_timeout_secs),
            timeout: Duration::from_secs(cfg.timeout_secs),
            max_redirections: cfg.max_redirections,
            user_agent: cfg.user_agent.clone(),
        }
    }
}

/// Base URLs for object reads and media uploads.
#[derive(Debug, Clone)]
pub struct ObjectStoreEndpoints {
    /// Objects are read from `<download>/<bucket>/<key>`.
    pub download: String,
    /// Objects are written via `<upload>/b/<bucket>/o?uploadType=media&name=<key>`.
    pub upload: String,
}

impl Default for ObjectStoreEndpoints {
    fn default() -> Self {
        Self::from(&ObjectStoreConfig::default())
    }
}

impl From<&ObjectStoreConfig> for ObjectStoreEndpoints {
    fn from(cfg: &ObjectStoreConfig) -> Self {
        Self {
            download: cfg.endpoint.trim_end_matches('/').to_string(),
            upload: cfg.upload_endpoint.trim_end_matches('/').to_string(),
        }
    }
}

/// Easy handle with redirects, timeouts and user agent applied.
pub(crate) fn configured_easy(url: &str, options: &CurlOptions) -> Result<Easy, curl::Error> {
    let mut easy = Easy::new();
    easy.url(url)?;
    easy.follow_location(true)?;
    easy.max_redirections(options.max_redirections)?;
    easy.connect_timeout(options.connect_timeout)?;
    easy.timeout(options.timeout)?;
    easy.useragent(&options.user_agent)?;
    // Object names may contain `..` segments that must reach the server as is.
    easy.path_as_is(true)?;
    Ok(easy)
}

pub struct CurlBackend {
    options: CurlOptions,
    endpoints: ObjectStoreEndpoints,
    /// Variable the credential is read from on first object-store call.
    credentials_env: Option<String>,
    credential: OnceLock<Option<Credential>>,
}

impl CurlBackend {
    pub fn new(options: CurlOptions, endpoints: ObjectStoreEndpoints, credential: Option<Credential>) -> Self {
        Self {
            options,
            endpoints,
            credentials_env: None,
            credential: OnceLock::from(credential),
        }
    }

    /// Backend configured from `cfg`. The credential in `cfg.credentials_env`
    /// is only decoded when an object-store call needs it, so HTTP and local
    /// transfers work even if it is malformed.
    pub fn from_config(cfg: &FerryConfig) -> Self {
        Self {
            options: CurlOptions::from(&cfg.http),
            endpoints: ObjectStoreEndpoints::from(&cfg.object_store),
            credentials_env: Some(cfg.credentials_env.clone()),
            credential: OnceLock::new(),
        }
    }

    pub fn options(&self) -> &CurlOptions {
        &self.options
    }

    /// The credential, loading it from the environment on first use.
    /// A failed load is not cached and is retried on the next call.
    fn credential(&self) -> Result<Option<&Credential>, CredentialError> {
        if let Some(cached) = self.credential.get() {
            return Ok(cached.as_ref());
        }
        let loaded = match &self.credentials_env {
            Some(env) => {
                let loaded = credential::get_credential(env)?;
                if loaded.is_none() {
                    tracing::debug!(env = %env, "no credential set, object store access is anonymous");
                }
                loaded
            }
            None => None,
        };
        Ok(self.credential.get_or_init(|| loaded).as_ref())
    }

    fn auth_header(&self) -> Result<Option<String>, AdapterError> {
        match self.credential()? {
            Some(c) => {
                let token = c.bearer_token(&self.options)?;
                Ok(Some(format!("Authorization: Bearer {}", token)))
            }
            None => Ok(None),
        }
    }

    /// GET into `dest`, removing the partial file on any failure.
    fn get_to_file(&self, url: &str, dest: &Path, auth: Option<String>) -> Result<(), AdapterError> {
        let result = self.perform_get(url, dest, auth);
        if let Err(e) = &result {
            tracing::warn!(url, dest = %dest.display(), "GET failed: {}", e);
            if dest.exists() {
                let _ = fs::remove_file(dest);
            }
        }
        result
    }

    fn perform_get(&self, url: &str, dest: &Path, auth: Option<String>) -> Result<(), AdapterError> {
        let mut file = File::create(dest)?;
        let mut easy = configured_easy(url, &self.options)?;
        if let Some(header) = auth {
            let mut list = List::new();
            list.append(&header)?;
            easy.http_headers(list)?;
        }

        let mut write_error: Option<std::io::Error> = None;
        let performed = {
            let mut transfer = easy.transfer();
            transfer.write_function(|data| match file.write_all(data) {
                Ok(()) => Ok(data.len()),
                Err(e) => {
                    write_error = Some(e);
                    Ok(0) // abort transfer
                }
            })?;
            transfer.perform()
        };
        if let Some(e) = write_error {
            return Err(AdapterError::Io(e));
        }
        performed?;

        let code = easy.response_code()?;
        if !(200..300).contains(&code) {
            return Err(AdapterError::Http {
                status: code,
                url: url.to_string(),
            });
        }
        file.flush()?;
        Ok(())
    }

    fn object_url(&self, object: &ObjectStoreLocator) -> String {
        format!("{}/{}/{}", self.endpoints.download, object.bucket(), object.encoded_key())
    }

    fn upload_url(&self, object: &ObjectStoreLocator) -> String {
        format!(
            "{}/b/{}/o?uploadType=media&name={}",
            self.endpoints.upload,
            urlencoding::encode(object.bucket()),
            urlencoding::encode(&object.key())
        )
    }
}

impl Backend for CurlBackend {
    fn http_fetch(&self, url: &str, dest: &Path) -> Result<(), AdapterError> {
        self.get_to_file(url, dest, None)
    }

    fn object_get(&self, object: &ObjectStoreLocator, dest: &Path) -> Result<(), AdapterError> {
        let auth = self.auth_header()?;
        self.get_to_file(&self.object_url(object), dest, auth)
    }

    fn object_put(&self, src: &Path, object: &ObjectStoreLocator) -> Result<(), AdapterError> {
        let url = self.upload_url(object);
        let mut file = File::open(src)?;
        let len = file.metadata()?.len();

        let mut easy = configured_easy(&url, &self.options)?;
        easy.post(true)?;
        easy.post_field_size(len)?;
        let mut list = List::new();
        list.append("Content-Type: application/octet-stream")?;
        list.append("Expect:")?;
        if let Some(header) = self.auth_header()? {
            list.append(&header)?;
        }
        easy.http_headers(list)?;

        let mut response = Vec::new();
        {
            let mut transfer = easy.transfer();
            transfer.read_function(|buf| file.read(buf).map_err(|_| ReadError::Abort))?;
            transfer.write_function(|data| {
                response.extend_from_slice(data);
                Ok(data.len())
            })?;
            transfer.perform()?;
        }

        let code = easy.response_code()?;
        if !(200..300).contains(&code) {
            tracing::warn!(
                url = %url,
                status = code,
                body = %String::from_utf8_lossy(&response),
                "object upload rejected"
            );
            return Err(AdapterError::Http { status: code, url });
        }
        tracing::debug!(src = %src.display(), object = %object, bytes = len, "uploaded");
        Ok(())
    }
}
