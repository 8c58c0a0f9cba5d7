//! Client configuration.

use std::path::PathBuf;

use hfca_crypto::CryptoConfig;

/// CA client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// CA endpoint (scheme, host and port).
    pub url: String,

    /// API base path appended to the endpoint.
    pub base_path: String,

    /// CA name sent as `caname`; the server's default CA when unset.
    pub ca_name: Option<String>,

    /// PEM bundle of trusted roots. When set, only these roots are trusted.
    pub tls_ca_certs: Option<PathBuf>,

    /// Per-request timeout in seconds.
    pub timeout_secs: u64,

    /// Key and signature configuration.
    pub crypto: CryptoConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:7054".to_string(),
            base_path: "/api/v1/".to_string(),
            ca_name: None,
            tls_ca_certs: None,
            timeout_secs: 30,
            crypto: CryptoConfig::default(),
        }
    }
}

impl ClientConfig {
    /// Configuration for a CA endpoint with default settings.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    pub fn with_base_path(mut self, base_path: impl Into<String>) -> Self {
        self.base_path = base_path.into();
        self
    }

    pub fn with_ca_name(mut self, ca_name: impl Into<String>) -> Self {
        self.ca_name = Some(ca_name.into());
        self
    }

    pub fn with_tls_ca_certs(mut self, path: impl Into<PathBuf>) -> Self {
        self.tls_ca_certs = Some(path.into());
        self
    }

    pub fn with_timeout_secs(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    pub fn with_crypto(mut self, crypto: CryptoConfig) -> Self {
        self.crypto = crypto;
        self
    }

    /// Endpoint joined with the base path, always ending in `/`.
    pub fn api_root(&self) -> String {
        let base = self.base_path.trim_matches('/');
        let url = self.url.trim_end_matches('/');
        if base.is_empty() {
            format!("{}/", url)
        } else {
            format!("{}/{}/", url, base)
        }
    }
}
