//! The crypto capability used by the protocol client.

use tracing::debug;

use crate::config::CryptoConfig;
use crate::csr::{build_csr, AttributeRequest};
use crate::error::CryptoError;
use crate::key::KeyPair;
use crate::signature;

/// Key generation, CSR construction and signing.
///
/// Implement this trait to substitute another curve or key backend without
/// touching the protocol client.
pub trait CryptoSuite: Send + Sync {
    /// Generate a fresh key pair.
    fn generate_key_pair(&self) -> Result<KeyPair, CryptoError>;

    /// Build a PEM CSR binding `subject_cn` to the key.
    fn generate_csr(
        &self,
        key_pair: &KeyPair,
        subject_cn: &str,
        attr_reqs: &[AttributeRequest],
    ) -> Result<String, CryptoError>;

    /// Sign `message`, returning a base64 low-S DER signature.
    fn sign(&self, key_pair: &KeyPair, message: &[u8]) -> Result<String, CryptoError>;

    /// Verify a signature produced by [`CryptoSuite::sign`].
    fn verify(
        &self,
        key_pair: &KeyPair,
        message: &[u8],
        signature_b64: &str,
    ) -> Result<bool, CryptoError>;
}

/// ECDSA over P-256 or P-384, selected by the configured security level.
#[derive(Debug, Clone, Copy, Default)]
pub struct EcdsaSuite {
    config: CryptoConfig,
}

impl EcdsaSuite {
    pub fn new(config: CryptoConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CryptoConfig {
        &self.config
    }
}

impl CryptoSuite for EcdsaSuite {
    fn generate_key_pair(&self) -> Result<KeyPair, CryptoError> {
        debug!(curve = self.config.curve_name(), "Generating key pair");
        Ok(KeyPair::generate(self.config.security_level()))
    }

    fn generate_csr(
        &self,
        key_pair: &KeyPair,
        subject_cn: &str,
        attr_reqs: &[AttributeRequest],
    ) -> Result<String, CryptoError> {
        build_csr(key_pair, subject_cn, attr_reqs)
    }

    fn sign(&self, key_pair: &KeyPair, message: &[u8]) -> Result<String, CryptoError> {
        signature::sign(key_pair, message)
    }

    fn verify(
        &self,
        key_pair: &KeyPair,
        message: &[u8],
        signature_b64: &str,
    ) -> Result<bool, CryptoError> {
        signature::verify(key_pair, message, signature_b64)
    }
}
