//! Error types for the wallet.

use hfca_crypto::CryptoError;
use thiserror::Error;

/// Errors that can occur when storing or loading identities.
#[derive(Debug, Error)]
pub enum WalletError {
    /// No identity is stored under the label.
    #[error("identity not found: {0}")]
    NotFound(String),

    /// Label is empty or would escape the store.
    #[error("invalid label: '{0}'")]
    InvalidLabel(String),

    #[error("storage error: {0}")]
    Io(#[from] std::io::Error),

    /// Stored blob is not base64 of UTF-8 text.
    #[error("failed to decode identity: {0}")]
    Decode(String),

    #[error("invalid identity JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unsupported identity type: '{0}'")]
    InvalidType(String),

    #[error("unsupported identity version: {0}")]
    UnsupportedVersion(String),

    /// Certificate or private key PEM could not be parsed.
    #[error("invalid credentials: {0}")]
    Crypto(#[from] CryptoError),

    /// The enrollment's key is held outside this process.
    #[error("enrollment has no private key to store")]
    ExternalKey,
}
