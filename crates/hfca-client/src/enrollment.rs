//! Issued identity: certificate, CA chain and (usually) the private key.

use hfca_crypto::{certificate_info, CertificateInfo, CryptoError, KeyPair};

use crate::error::ClientError;

/// Where the enrollment's private key lives.
#[derive(Debug, Clone)]
pub enum EnrollmentKey {
    /// Generated by this client while building the CSR.
    Generated(KeyPair),
    /// The caller supplied the CSR and manages the key.
    External,
}

/// Result of a successful enrollment or reenrollment.
#[derive(Debug, Clone)]
pub struct Enrollment {
    key: EnrollmentKey,
    cert: String,
    ca_chain: String,
}

impl Enrollment {
    pub fn new(key: EnrollmentKey, cert: impl Into<String>, ca_chain: impl Into<String>) -> Self {
        Self {
            key,
            cert: cert.into(),
            ca_chain: ca_chain.into(),
        }
    }

    pub fn key(&self) -> &EnrollmentKey {
        &self.key
    }

    /// The private key, if this client holds it.
    pub fn key_pair(&self) -> Option<&KeyPair> {
        match &self.key {
            EnrollmentKey::Generated(key) => Some(key),
            EnrollmentKey::External => None,
        }
    }

    /// PEM enrollment certificate.
    pub fn cert(&self) -> &str {
        &self.cert
    }

    /// PEM chain of the issuing CA. Empty when not known.
    pub fn ca_chain(&self) -> &str {
        &self.ca_chain
    }

    /// Attach the key for an enrollment made with an external CSR.
    pub fn with_key_pair(mut self, key: KeyPair) -> Self {
        self.key = EnrollmentKey::Generated(key);
        self
    }

    /// Subject, serial, AKI and expiry of the certificate.
    pub fn certificate_info(&self) -> Result<CertificateInfo, CryptoError> {
        certificate_info(&self.cert)
    }

    /// Key used to sign requests made with this identity as registrar.
    pub(crate) fn signing_key(&self) -> Result<&KeyPair, ClientError> {
        self.key_pair().ok_or_else(|| {
            ClientError::Crypto(CryptoError::InvalidArgument(
                "public and private keys must be provided".to_string(),
            ))
        })
    }
}
