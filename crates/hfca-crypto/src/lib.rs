//! hfca crypto primitives
//!
//! Elliptic-curve key pairs, PKCS#10 certificate signing requests and ECDSA
//! signatures in canonical low-S form, plus the certificate inspection the
//! enrollment client needs.
//!
//! This crate has no network or storage dependencies.

pub mod cert;
pub mod config;
pub mod csr;
pub mod error;
pub mod key;
pub mod signature;
pub mod suite;

// Re-export commonly used types
pub use cert::{certificate_info, subject_common_name, verify_with_certificate, CertificateInfo};
pub use config::{CryptoConfig, SecurityLevel, SignatureAlgorithm};
pub use csr::AttributeRequest;
pub use error::CryptoError;
pub use key::KeyPair;
pub use signature::{is_low_s, normalize_signature};
pub use suite::{CryptoSuite, EcdsaSuite};
