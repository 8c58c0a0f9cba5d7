//! Crypto error types.

use thiserror::Error;

/// Errors that can occur during key, CSR or signature operations.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// Security level has no curve mapping.
    #[error("unsupported security level: {0} (expected 256 or 384)")]
    UnsupportedSecurityLevel(u16),

    /// Unknown signature algorithm name.
    #[error("unsupported signature algorithm: {0}")]
    UnsupportedAlgorithm(String),

    /// Signature algorithm does not match the configured curve.
    #[error("signature algorithm {algorithm} cannot be used with curve {curve}")]
    AlgorithmMismatch {
        algorithm: &'static str,
        curve: &'static str,
    },

    /// Caller passed a missing or malformed argument.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Failed to generate a key pair.
    #[error("failed to generate key pair: {0}")]
    KeyGeneration(String),

    /// Failed to encode or decode key material.
    #[error("invalid key: {0}")]
    InvalidKey(String),

    /// Failed to build the certificate signing request.
    #[error("failed to generate CSR: {0}")]
    Csr(String),

    /// Failed to produce or decode a signature.
    #[error("signature error: {0}")]
    Signature(String),

    /// Failed to parse a certificate.
    #[error("failed to parse certificate: {0}")]
    Certificate(String),
}
