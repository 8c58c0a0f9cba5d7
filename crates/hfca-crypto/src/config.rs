//! Crypto configuration.
//!
//! A [`CryptoConfig`] is an immutable value handed to each suite instance.
//! Security level and signature algorithm are checked for consistency when
//! the value is built, so a suite never holds a mismatched pair.

use std::fmt;
use std::str::FromStr;

use crate::error::CryptoError;

/// Security level, which selects the elliptic curve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SecurityLevel {
    /// 256-bit security, curve secp256r1 (P-256).
    #[default]
    L256,
    /// 384-bit security, curve secp384r1 (P-384).
    L384,
}

impl SecurityLevel {
    /// Named curve for this level.
    pub fn curve_name(&self) -> &'static str {
        match self {
            Self::L256 => "secp256r1",
            Self::L384 => "secp384r1",
        }
    }

    /// Level in bits.
    pub fn bits(&self) -> u16 {
        match self {
            Self::L256 => 256,
            Self::L384 => 384,
        }
    }
}

impl TryFrom<u16> for SecurityLevel {
    type Error = CryptoError;

    fn try_from(bits: u16) -> Result<Self, Self::Error> {
        match bits {
            256 => Ok(Self::L256),
            384 => Ok(Self::L384),
            other => Err(CryptoError::UnsupportedSecurityLevel(other)),
        }
    }
}

impl fmt::Display for SecurityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.bits())
    }
}

/// Signature algorithm used for CSRs and request signing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SignatureAlgorithm {
    #[default]
    EcdsaSha256,
    EcdsaSha384,
}

impl SignatureAlgorithm {
    /// Conventional algorithm name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::EcdsaSha256 => "SHA256withECDSA",
            Self::EcdsaSha384 => "SHA384withECDSA",
        }
    }

    /// The algorithm that pairs with a security level.
    pub fn for_level(level: SecurityLevel) -> Self {
        match level {
            SecurityLevel::L256 => Self::EcdsaSha256,
            SecurityLevel::L384 => Self::EcdsaSha384,
        }
    }
}

impl FromStr for SignatureAlgorithm {
    type Err = CryptoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "SHA256withECDSA" => Ok(Self::EcdsaSha256),
            "SHA384withECDSA" => Ok(Self::EcdsaSha384),
            other => Err(CryptoError::UnsupportedAlgorithm(other.to_string())),
        }
    }
}

impl fmt::Display for SignatureAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Crypto suite configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CryptoConfig {
    security_level: SecurityLevel,
    signature_algorithm: SignatureAlgorithm,
}

impl CryptoConfig {
    /// Build a configuration, rejecting algorithm/curve pairs that do not match.
    pub fn new(
        security_level: SecurityLevel,
        signature_algorithm: SignatureAlgorithm,
    ) -> Result<Self, CryptoError> {
        if SignatureAlgorithm::for_level(security_level) != signature_algorithm {
            return Err(CryptoError::AlgorithmMismatch {
                algorithm: signature_algorithm.name(),
                curve: security_level.curve_name(),
            });
        }
        Ok(Self {
            security_level,
            signature_algorithm,
        })
    }

    /// Configuration for a security level with its matching algorithm.
    pub fn for_level(security_level: SecurityLevel) -> Self {
        Self {
            security_level,
            signature_algorithm: SignatureAlgorithm::for_level(security_level),
        }
    }

    pub fn security_level(&self) -> SecurityLevel {
        self.security_level
    }

    pub fn signature_algorithm(&self) -> SignatureAlgorithm {
        self.signature_algorithm
    }

    pub fn curve_name(&self) -> &'static str {
        self.security_level.curve_name()
    }
}
