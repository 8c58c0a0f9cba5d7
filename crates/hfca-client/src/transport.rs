//! HTTP transport for the CA REST API.
//!
//! Thin wrapper over a pooled `reqwest::Client`. A non-success status is
//! turned into [`TransportError::Status`] before the body is handed to the
//! JSON layer.

use std::time::Duration;

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::RequestBuilder;
use tracing::debug;

use crate::config::ClientConfig;
use crate::error::TransportError;

/// How a request authenticates.
#[derive(Clone, Copy)]
pub enum Authorization<'a> {
    /// Unauthenticated.
    None,
    /// HTTP Basic with enrollment id and secret.
    Basic { id: &'a str, secret: &'a str },
    /// Signed token computed over the request body.
    Token(&'a str),
}

/// HTTP client bound to the CA's API root.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    inner: reqwest::Client,
    api_root: String,
}

impl HttpTransport {
    /// Build the transport, loading the custom trust roots if configured.
    pub fn new(config: &ClientConfig) -> Result<Self, TransportError> {
        let mut builder =
            reqwest::Client::builder().timeout(Duration::from_secs(config.timeout_secs));

        if let Some(path) = &config.tls_ca_certs {
            let bundle = std::fs::read(path).map_err(|e| {
                TransportError::Tls(format!("failed to read '{}': {}", path.display(), e))
            })?;
            let roots = reqwest::Certificate::from_pem_bundle(&bundle)
                .map_err(|e| TransportError::Tls(e.to_string()))?;
            if roots.is_empty() {
                return Err(TransportError::Tls(format!(
                    "no certificates found in '{}'",
                    path.display()
                )));
            }

            // Trust only the supplied roots; hostname verification stays on.
            builder = builder.use_rustls_tls().tls_built_in_root_certs(false);
            for root in roots {
                builder = builder.add_root_certificate(root);
            }
            debug!(path = %path.display(), "Using custom TLS trust roots");
        }

        let inner = builder
            .build()
            .map_err(|e| TransportError::Tls(e.to_string()))?;

        Ok(Self {
            inner,
            api_root: config.api_root(),
        })
    }

    /// Full URL for an API path.
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.api_root, path.trim_start_matches('/'))
    }

    /// GET an endpoint and return the raw response body.
    pub async fn get(
        &self,
        path: &str,
        query: &[(&str, &str)],
        auth: Authorization<'_>,
    ) -> Result<Vec<u8>, TransportError> {
        let url = self.url(path);
        debug!(url = %url, "GET request");

        let mut request = self.inner.get(&url);
        if !query.is_empty() {
            request = request.query(query);
        }
        self.send(authorize(request, auth)).await
    }

    /// POST a JSON body exactly as given and return the raw response body.
    pub async fn post(
        &self,
        path: &str,
        body: Vec<u8>,
        auth: Authorization<'_>,
    ) -> Result<Vec<u8>, TransportError> {
        let url = self.url(path);
        debug!(url = %url, body_len = body.len(), "POST request");

        let request = self
            .inner
            .post(&url)
            .header(CONTENT_TYPE, "application/json")
            .body(body);
        self.send(authorize(request, auth)).await
    }

    async fn send(&self, request: RequestBuilder) -> Result<Vec<u8>, TransportError> {
        let response = request.send().await.map_err(classify)?;

        let status = response.status();
        if !status.is_success() {
            let body = match response.text().await {
                Ok(text) => text,
                Err(e) => format!("<unreadable body: {}>", e),
            };
            return Err(TransportError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let bytes = response.bytes().await.map_err(classify)?;
        Ok(bytes.to_vec())
    }
}

fn authorize(request: RequestBuilder, auth: Authorization<'_>) -> RequestBuilder {
    match auth {
        Authorization::None => request,
        Authorization::Basic { id, secret } => request.basic_auth(id, Some(secret)),
        Authorization::Token(token) => request.header(AUTHORIZATION, token),
    }
}

fn classify(e: reqwest::Error) -> TransportError {
    if e.is_timeout() {
        TransportError::Timeout(e.to_string())
    } else {
        TransportError::Request(e)
    }
}
