//! Per-request authorization tokens.
//!
//! A token is `b64(certPEM) "." b64(signature)` where the signature covers
//! `b64(body) "." b64(certPEM)`. The body must be the exact bytes sent.

use base64::{engine::general_purpose::STANDARD, Engine};
use hfca_crypto::{verify_with_certificate, CryptoError, CryptoSuite, KeyPair};

/// Build the token for `body`, signed with the identity's key.
pub fn build_auth_token(
    suite: &dyn CryptoSuite,
    cert_pem: &str,
    key: &KeyPair,
    body: &[u8],
) -> Result<String, CryptoError> {
    if cert_pem.is_empty() {
        return Err(CryptoError::InvalidArgument(
            "certificate must not be empty".to_string(),
        ));
    }

    let cert_b64 = STANDARD.encode(cert_pem.as_bytes());
    let message = format!("{}.{}", STANDARD.encode(body), cert_b64);
    let signature = suite.sign(key, message.as_bytes())?;

    Ok(format!("{}.{}", cert_b64, signature))
}

/// Check a token against the body it was sent with.
///
/// Returns the signer's PEM certificate. The certificate itself is not
/// validated against any CA.
pub fn verify_auth_token(token: &str, body: &[u8]) -> Result<String, CryptoError> {
    let (cert_b64, signature) = token
        .split_once('.')
        .ok_or_else(|| CryptoError::Signature("malformed token".to_string()))?;

    let cert_bytes = STANDARD
        .decode(cert_b64)
        .map_err(|e| CryptoError::Signature(format!("malformed token certificate: {}", e)))?;
    let cert_pem = String::from_utf8(cert_bytes)
        .map_err(|e| CryptoError::Signature(format!("malformed token certificate: {}", e)))?;

    let message = format!("{}.{}", STANDARD.encode(body), cert_b64);
    if !verify_with_certificate(&cert_pem, message.as_bytes(), signature)? {
        return Err(CryptoError::Signature(
            "token signature does not match".to_string(),
        ));
    }

    Ok(cert_pem)
}
