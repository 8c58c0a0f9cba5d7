//! Error types for the CA client.

use hfca_crypto::CryptoError;
use thiserror::Error;

/// Failures below the protocol: connection, TLS, timeouts and HTTP status.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Request could not be sent or the response could not be read.
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The request timed out.
    #[error("request timed out: {0}")]
    Timeout(String),

    /// The server answered with a non-success status.
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// TLS trust configuration could not be built.
    #[error("TLS configuration error: {0}")]
    Tls(String),
}

impl TransportError {
    /// Whether repeating the same request may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Request(e) => e.is_connect() || e.is_timeout() || e.is_request(),
            Self::Timeout(_) => true,
            Self::Status { status, .. } => *status >= 500,
            Self::Tls(_) => false,
        }
    }
}

/// Errors that can occur when talking to the CA.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Missing or malformed caller input, detected before any I/O.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Key, CSR or signature failure.
    #[error("crypto error: {0}")]
    Crypto(#[from] CryptoError),

    /// Network, TLS or HTTP status failure.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Well-formed HTTP response without a usable `result`.
    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("enrollment failed: {0}")]
    Enrollment(#[source] Box<ClientError>),

    #[error("reenrollment failed: {0}")]
    Reenrollment(#[source] Box<ClientError>),

    #[error("registration failed: {0}")]
    Register(#[source] Box<ClientError>),

    #[error("revocation failed: {0}")]
    Revoke(#[source] Box<ClientError>),

    #[error("certificate listing failed: {0}")]
    Certificates(#[source] Box<ClientError>),
}

impl ClientError {
    /// The innermost error, looking through operation wrappers.
    pub fn root_cause(&self) -> &ClientError {
        match self {
            Self::Enrollment(inner)
            | Self::Reenrollment(inner)
            | Self::Register(inner)
            | Self::Revoke(inner)
            | Self::Certificates(inner) => inner.root_cause(),
            other => other,
        }
    }

    /// Whether the CA rejected the caller's credentials.
    pub fn is_unauthorized(&self) -> bool {
        matches!(
            self.root_cause(),
            Self::Transport(TransportError::Status { status: 401 | 403, .. })
        )
    }

    /// Whether the caller may retry the same request.
    pub fn is_retryable(&self) -> bool {
        match self.root_cause() {
            Self::Transport(e) => e.is_retryable(),
            _ => false,
        }
    }
}
