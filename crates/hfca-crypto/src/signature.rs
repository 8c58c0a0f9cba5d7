//! ECDSA signing with low-S normalization.
//!
//! A raw signature is decoded into (r, s); when `s` lies in the upper half of
//! the curve order it is replaced by `n - s`, then (r, s) is re-encoded as DER.
//! Both encodings verify, so only the low form is ever emitted.

use base64::{engine::general_purpose::STANDARD, Engine};
use p256::ecdsa::signature::{Signer, Verifier};
use p256::elliptic_curve::scalar::IsHigh;
use p256::elliptic_curve::PrimeField;
use p256::pkcs8::DecodePublicKey;

use crate::config::SecurityLevel;
use crate::error::CryptoError;
use crate::key::KeyPair;

/// Sign `message` and return the low-S DER signature as base64.
pub fn sign(key: &KeyPair, message: &[u8]) -> Result<String, CryptoError> {
    if message.is_empty() {
        return Err(CryptoError::InvalidArgument(
            "message to sign must not be empty".to_string(),
        ));
    }

    let raw_der = if let Some(sk) = key.p256() {
        let signing_key = p256::ecdsa::SigningKey::from(sk);
        let signature: p256::ecdsa::Signature = signing_key
            .try_sign(message)
            .map_err(|e| CryptoError::Signature(e.to_string()))?;
        signature.to_der().as_bytes().to_vec()
    } else if let Some(sk) = key.p384() {
        let signing_key = p384::ecdsa::SigningKey::from(sk);
        let signature: p384::ecdsa::Signature = signing_key
            .try_sign(message)
            .map_err(|e| CryptoError::Signature(e.to_string()))?;
        signature.to_der().as_bytes().to_vec()
    } else {
        return Err(CryptoError::InvalidKey("unsupported key type".to_string()));
    };

    let normalized = normalize_signature(key.security_level(), &raw_der)?;
    Ok(STANDARD.encode(normalized))
}

/// Rewrite a DER signature into canonical low-S form.
///
/// Idempotent: a signature that is already low-S comes back unchanged.
pub fn normalize_signature(level: SecurityLevel, der: &[u8]) -> Result<Vec<u8>, CryptoError> {
    match level {
        SecurityLevel::L256 => {
            let signature = p256::ecdsa::Signature::from_der(der)
                .map_err(|e| CryptoError::Signature(e.to_string()))?;
            let (r, s) = signature.split_scalars();
            if !bool::from(s.is_high()) {
                return Ok(signature.to_der().as_bytes().to_vec());
            }
            let low_s = -*s;
            let normalized = p256::ecdsa::Signature::from_scalars(r.to_repr(), low_s.to_repr())
                .map_err(|e| CryptoError::Signature(e.to_string()))?;
            Ok(normalized.to_der().as_bytes().to_vec())
        }
        SecurityLevel::L384 => {
            let signature = p384::ecdsa::Signature::from_der(der)
                .map_err(|e| CryptoError::Signature(e.to_string()))?;
            let (r, s) = signature.split_scalars();
            if !bool::from(s.is_high()) {
                return Ok(signature.to_der().as_bytes().to_vec());
            }
            let low_s = -*s;
            let normalized = p384::ecdsa::Signature::from_scalars(r.to_repr(), low_s.to_repr())
                .map_err(|e| CryptoError::Signature(e.to_string()))?;
            Ok(normalized.to_der().as_bytes().to_vec())
        }
    }
}

/// Whether the `s` component of a DER signature is in the lower half of the order.
pub fn is_low_s(level: SecurityLevel, der: &[u8]) -> Result<bool, CryptoError> {
    let high = match level {
        SecurityLevel::L256 => p256::ecdsa::Signature::from_der(der)
            .map(|sig| bool::from(sig.s().is_high())),
        SecurityLevel::L384 => p384::ecdsa::Signature::from_der(der)
            .map(|sig| bool::from(sig.s().is_high())),
    }
    .map_err(|e| CryptoError::Signature(e.to_string()))?;
    Ok(!high)
}

/// Verify a base64 DER signature over `message` with the key's public half.
pub fn verify(key: &KeyPair, message: &[u8], signature_b64: &str) -> Result<bool, CryptoError> {
    let public_der = key.public_key_der()?;
    verify_with_public_key_der(&public_der, message, signature_b64)
}

/// Verify a base64 DER signature against a DER SubjectPublicKeyInfo.
///
/// Returns `Ok(false)` for a well-formed signature that does not verify.
pub fn verify_with_public_key_der(
    spki_der: &[u8],
    message: &[u8],
    signature_b64: &str,
) -> Result<bool, CryptoError> {
    let der = STANDARD
        .decode(signature_b64)
        .map_err(|e| CryptoError::Signature(format!("signature is not base64: {}", e)))?;

    if let Ok(public_key) = p256::PublicKey::from_public_key_der(spki_der) {
        let signature = p256::ecdsa::Signature::from_der(&der)
            .map_err(|e| CryptoError::Signature(e.to_string()))?;
        let verifying_key = p256::ecdsa::VerifyingKey::from(&public_key);
        return Ok(verifying_key.verify(message, &signature).is_ok());
    }

    if let Ok(public_key) = p384::PublicKey::from_public_key_der(spki_der) {
        let signature = p384::ecdsa::Signature::from_der(&der)
            .map_err(|e| CryptoError::Signature(e.to_string()))?;
        let verifying_key = p384::ecdsa::VerifyingKey::from(&public_key);
        return Ok(verifying_key.verify(message, &signature).is_ok());
    }

    Err(CryptoError::InvalidKey(
        "public key is not on a supported curve".to_string(),
    ))
}
