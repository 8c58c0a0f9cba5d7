//! Elliptic-curve key pairs.

use std::fmt;

use p256::elliptic_curve::sec1::ToEncodedPoint;
use p256::pkcs8::{DecodePrivateKey, EncodePrivateKey, EncodePublicKey, LineEnding};
use rand::rngs::OsRng;

use crate::config::SecurityLevel;
use crate::error::CryptoError;

const PKCS8_TAG: &str = "PRIVATE KEY";
const SEC1_TAG: &str = "EC PRIVATE KEY";

#[derive(Clone)]
enum Secret {
    P256(p256::SecretKey),
    P384(p384::SecretKey),
}

/// An EC key pair. The public half is always derivable from the private half,
/// so a `KeyPair` is complete by construction.
#[derive(Clone)]
pub struct KeyPair {
    secret: Secret,
}

impl KeyPair {
    /// Generate a fresh key pair on the curve for `level`.
    pub fn generate(level: SecurityLevel) -> Self {
        let secret = match level {
            SecurityLevel::L256 => Secret::P256(p256::SecretKey::random(&mut OsRng)),
            SecurityLevel::L384 => Secret::P384(p384::SecretKey::random(&mut OsRng)),
        };
        Self { secret }
    }

    /// Load a private key from PEM.
    ///
    /// Accepts PKCS#8 (`PRIVATE KEY`) and SEC1 (`EC PRIVATE KEY`) encodings
    /// on either supported curve.
    pub fn from_pem(pem_str: &str) -> Result<Self, CryptoError> {
        let block = pem::parse(pem_str).map_err(|e| CryptoError::InvalidKey(e.to_string()))?;
        let der = block.contents();

        let secret = match block.tag() {
            PKCS8_TAG => p256::SecretKey::from_pkcs8_der(der)
                .map(Secret::P256)
                .or_else(|_| p384::SecretKey::from_pkcs8_der(der).map(Secret::P384))
                .map_err(|e| CryptoError::InvalidKey(format!("unsupported PKCS#8 key: {}", e)))?,
            SEC1_TAG => p256::SecretKey::from_sec1_der(der)
                .map(Secret::P256)
                .or_else(|_| p384::SecretKey::from_sec1_der(der).map(Secret::P384))
                .map_err(|e| CryptoError::InvalidKey(format!("unsupported SEC1 key: {}", e)))?,
            other => {
                return Err(CryptoError::InvalidKey(format!(
                    "expected a private key PEM block, got '{}'",
                    other
                )))
            }
        };

        Ok(Self { secret })
    }

    /// Security level (curve) of this key.
    pub fn security_level(&self) -> SecurityLevel {
        match self.secret {
            Secret::P256(_) => SecurityLevel::L256,
            Secret::P384(_) => SecurityLevel::L384,
        }
    }

    /// Private key as PKCS#8 PEM.
    pub fn private_key_pem(&self) -> Result<String, CryptoError> {
        let pem = match &self.secret {
            Secret::P256(sk) => sk.to_pkcs8_pem(LineEnding::LF),
            Secret::P384(sk) => sk.to_pkcs8_pem(LineEnding::LF),
        }
        .map_err(|e| CryptoError::InvalidKey(e.to_string()))?;
        Ok(pem.to_string())
    }

    /// Public key as DER-encoded SubjectPublicKeyInfo.
    pub fn public_key_der(&self) -> Result<Vec<u8>, CryptoError> {
        let doc = match &self.secret {
            Secret::P256(sk) => sk.public_key().to_public_key_der(),
            Secret::P384(sk) => sk.public_key().to_public_key_der(),
        }
        .map_err(|e| CryptoError::InvalidKey(e.to_string()))?;
        Ok(doc.as_bytes().to_vec())
    }

    /// Public key as PEM-encoded SubjectPublicKeyInfo.
    pub fn public_key_pem(&self) -> Result<String, CryptoError> {
        match &self.secret {
            Secret::P256(sk) => sk.public_key().to_public_key_pem(LineEnding::LF),
            Secret::P384(sk) => sk.public_key().to_public_key_pem(LineEnding::LF),
        }
        .map_err(|e| CryptoError::InvalidKey(e.to_string()))
    }

    /// Uncompressed SEC1 public point.
    pub fn public_point(&self) -> Vec<u8> {
        match &self.secret {
            Secret::P256(sk) => sk.public_key().to_encoded_point(false).as_bytes().to_vec(),
            Secret::P384(sk) => sk.public_key().to_encoded_point(false).as_bytes().to_vec(),
        }
    }

    pub(crate) fn p256(&self) -> Option<&p256::SecretKey> {
        match &self.secret {
            Secret::P256(sk) => Some(sk),
            Secret::P384(_) => None,
        }
    }

    pub(crate) fn p384(&self) -> Option<&p384::SecretKey> {
        match &self.secret {
            Secret::P384(sk) => Some(sk),
            Secret::P256(_) => None,
        }
    }
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("curve", &self.security_level().curve_name())
            .finish_non_exhaustive()
    }
}

impl PartialEq for KeyPair {
    fn eq(&self, other: &Self) -> bool {
        self.security_level() == other.security_level()
            && self.public_point() == other.public_point()
    }
}

impl Eq for KeyPair {}
