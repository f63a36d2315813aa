//! Connection configuration for a `VaultClient`.
//!
//! The embedding application supplies these values; this crate never reads
//! environment variables or files to obtain them. `ClientConfig` derives
//! `Deserialize` so it can be embedded in the application's own config.

use std::fmt;
use std::path::PathBuf;

use serde::Deserialize;
use url::Url;

use crate::error::ApiError;

/// Where the Local REST API listens by default (HTTPS, self-signed).
pub const DEFAULT_BASE_URL: &str = "https://127.0.0.1:27124/";

/// PEM files presented for mutual TLS.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ClientCertPaths {
    pub cert_path: PathBuf,
    pub key_path: PathBuf,
}

#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct ClientConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    pub token: String,
    /// When `None`, the server certificate is not verified.
    #[serde(default)]
    pub client_cert: Option<ClientCertPaths>,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

impl ClientConfig {
    pub fn new(base_url: &str, token: &str) -> Self {
        Self {
            base_url: base_url.to_string(),
            token: token.to_string(),
            client_cert: None,
        }
    }

    pub fn with_client_cert(mut self, cert_path: impl Into<PathBuf>, key_path: impl Into<PathBuf>) -> Self {
        self.client_cert = Some(ClientCertPaths {
            cert_path: cert_path.into(),
            key_path: key_path.into(),
        });
        self
    }

    /// Build a config from loosely-supplied certificate paths.
    ///
    /// The certificate pair is used only when both halves are present. A lone
    /// certificate or key is dropped with a warning and the client falls back
    /// to unverified TLS.
    pub fn from_parts(
        base_url: &str,
        token: &str,
        cert_path: Option<PathBuf>,
        key_path: Option<PathBuf>,
    ) -> Self {
        let config = Self::new(base_url, token);
        match (cert_path, key_path) {
            (Some(cert), Some(key)) => config.with_client_cert(cert, key),
            (None, None) => config,
            (cert, key) => {
                tracing::warn!(
                    cert = ?cert,
                    key = ?key,
                    "client certificate and key must be supplied together; ignoring the lone half"
                );
                config
            }
        }
    }

    /// Parse and check `base_url`. Only absolute `http`/`https` URLs are usable.
    pub fn parsed_base_url(&self) -> Result<Url, ApiError> {
        let url = Url::parse(&self.base_url)
            .map_err(|e| ApiError::InvalidConfig(format!("invalid base URL {:?}: {e}", self.base_url)))?;
        match url.scheme() {
            "http" | "https" => Ok(url),
            other => Err(ApiError::InvalidConfig(format!(
                "unsupported URL scheme {other:?} in base URL"
            ))),
        }
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("base_url", &self.base_url)
            .field("token", &"<redacted>")
            .field("client_cert", &self.client_cert)
            .finish()
    }
}
