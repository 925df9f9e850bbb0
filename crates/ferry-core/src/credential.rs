//! Object-store credentials.
//!
//! A credential is read from an environment variable holding a base64-encoded
//! service-account key. Access tokens are minted with a signed JWT assertion
//! and cached until shortly before they expire.

use std::fmt;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use base64::Engine as _;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::backend::{configured_easy, CurlOptions};

const CLOUD_PLATFORM_SCOPE: &str = "https://www.googleapis.com/auth/cloud-platform";
const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const ASSERTION_LIFETIME: Duration = Duration::from_secs(3600);
/// Tokens are refreshed this long before their stated expiry.
const REFRESH_MARGIN: Duration = Duration::from_secs(60);

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("credential payload is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("credential payload is not a service-account key: {0}")]
    Json(#[from] serde_json::Error),

    #[error("failed to sign token request: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),

    #[error("token endpoint {uri} returned HTTP {status}")]
    TokenEndpoint { uri: String, status: u32 },

    #[error("token request failed: {0}")]
    Curl(#[from] curl::Error),
}

/// The fields of a service-account key file this crate uses.
#[derive(Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    private_key: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
    #[serde(default)]
    pub project_id: Option<String>,
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

impl fmt::Debug for ServiceAccountKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceAccountKey")
            .field("client_email", &self.client_email)
            .field("token_uri", &self.token_uri)
            .field("project_id", &self.project_id)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Serialize)]
struct Claims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: u64,
    exp: u64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

#[derive(Clone)]
struct AccessToken {
    token: String,
    /// `None` for tokens that never expire (static tokens).
    expires_at: Option<SystemTime>,
}

impl AccessToken {
    fn is_fresh(&self, now: SystemTime) -> bool {
        match self.expires_at {
            None => true,
            Some(at) => now + REFRESH_MARGIN < at,
        }
    }
}

enum Source {
    ServiceAccount(ServiceAccountKey),
    Static,
}

/// Opaque handle passed to object-store adapters.
pub struct Credential {
    source: Source,
    cached: Mutex<Option<AccessToken>>,
}

impl Credential {
    pub fn from_service_account(key: ServiceAccountKey) -> Self {
        Self {
            source: Source::ServiceAccount(key),
            cached: Mutex::new(None),
        }
    }

    /// Decodes a base64-encoded service-account JSON payload.
    pub fn from_base64(encoded: &str) -> Result<Self, CredentialError> {
        let raw = base64::engine::general_purpose::STANDARD.decode(encoded.trim())?;
        let key: ServiceAccountKey = serde_json::from_slice(&raw)?;
        Ok(Self::from_service_account(key))
    }

    /// Wraps an already issued access token; it is never refreshed.
    pub fn from_access_token(token: impl Into<String>) -> Self {
        Self {
            source: Source::Static,
            cached: Mutex::new(Some(AccessToken {
                token: token.into(),
                expires_at: None,
            })),
        }
    }

    pub fn service_account(&self) -> Option<&ServiceAccountKey> {
        match &self.source {
            Source::ServiceAccount(key) => Some(key),
            Source::Static => None,
        }
    }

    /// A valid bearer token, refreshing it first if it is missing or about to expire.
    pub fn bearer_token(&self, options: &CurlOptions) -> Result<String, CredentialError> {
        let now = SystemTime::now();
        let mut cached = self.cached.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(token) = cached.as_ref().filter(|t| t.is_fresh(now)) {
            return Ok(token.token.clone());
        }
        let key = match &self.source {
            Source::ServiceAccount(key) => key,
            // Static tokens never expire, so the cache is always populated.
            Source::Static => {
                return Ok(cached.as_ref().map(|t| t.token.clone()).unwrap_or_default());
            }
        };
        let fresh = request_token(key, options, now)?;
        tracing::debug!(client = %key.client_email, "refreshed object store access token");
        let token = fresh.token.clone();
        *cached = Some(fresh);
        Ok(token)
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match &self.source {
            Source::ServiceAccount(key) => key.client_email.as_str(),
            Source::Static => "static-token",
        };
        f.debug_tuple("Credential").field(&kind).finish()
    }
}

/// Reads the credential from `env_var`. Unset or empty means anonymous access.
pub fn get_credential(env_var: &str) -> Result<Option<Credential>, CredentialError> {
    match std::env::var(env_var) {
        Ok(encoded) if !encoded.trim().is_empty() => Credential::from_base64(&encoded).map(Some),
        _ => Ok(None),
    }
}

fn signed_assertion(key: &ServiceAccountKey, now: SystemTime) -> Result<String, CredentialError> {
    let iat = now.duration_since(UNIX_EPOCH).unwrap_or_default().as_secs();
    let claims = Claims {
        iss: &key.client_email,
        scope: CLOUD_PLATFORM_SCOPE,
        aud: &key.token_uri,
        iat,
        exp: iat + ASSERTION_LIFETIME.as_secs(),
    };
    let signing_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes())?;
    Ok(jsonwebtoken::encode(
        &Header::new(Algorithm::RS256),
        &claims,
        &signing_key,
    )?)
}

fn request_token(
    key: &ServiceAccountKey,
    options: &CurlOptions,
    now: SystemTime,
) -> Result<AccessToken, CredentialError> {
    let assertion = signed_assertion(key, now)?;
    let form = format!(
        "grant_type={}&assertion={}",
        urlencoding::encode(JWT_BEARER_GRANT),
        urlencoding::encode(&assertion)
    );

    let mut easy = configured_easy(&key.token_uri, options)?;
    easy.post(true)?;
    easy.post_fields_copy(form.as_bytes())?;

    let mut body = Vec::new();
    {
        let mut transfer = easy.transfer();
        transfer.write_function(|data| {
            body.extend_from_slice(data);
            Ok(data.len())
        })?;
        transfer.perform()?;
    }

    let status = easy.response_code()?;
    if !(200..300).contains(&status) {
        return Err(CredentialError::TokenEndpoint {
            uri: key.token_uri.clone(),
            status,
        });
    }
    let response: TokenResponse = serde_json::from_slice(&body)?;
    Ok(AccessToken {
        token: response.access_token,
        expires_at: Some(now + Duration::from_secs(response.expires_in)),
    })
}
