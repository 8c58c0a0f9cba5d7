//! X.509 identity record and its stored form.
//!
//! Stored as base64 of the compact JSON envelope
//! `{"type":"X.509","version":1,"mspId":..,"credentials":{"certificate":..,"privateKey":..}}`.

use base64::{engine::general_purpose::STANDARD, Engine};
use hfca_client::{Enrollment, EnrollmentKey};
use hfca_crypto::{certificate_info, KeyPair};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::WalletError;

pub const IDENTITY_TYPE: &str = "X.509";
pub const IDENTITY_VERSION: u64 = 1;

/// Certificate, private key and organization of one identity.
#[derive(Clone, PartialEq, Eq)]
pub struct X509Identity {
    /// PEM enrollment certificate.
    pub certificate: String,
    /// PKCS#8 PEM private key.
    pub private_key: String,
    pub msp_id: String,
}

impl std::fmt::Debug for X509Identity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("X509Identity")
            .field("msp_id", &self.msp_id)
            .field("certificate", &self.certificate)
            .finish_non_exhaustive()
    }
}

#[derive(Serialize, Deserialize)]
struct Envelope {
    #[serde(rename = "type")]
    kind: String,
    version: Value,
    #[serde(rename = "mspId")]
    msp_id: String,
    credentials: Credentials,
}

#[derive(Serialize, Deserialize)]
struct Credentials {
    certificate: String,
    #[serde(rename = "privateKey")]
    private_key: String,
}

impl X509Identity {
    pub fn new(
        certificate: impl Into<String>,
        private_key: impl Into<String>,
        msp_id: impl Into<String>,
    ) -> Self {
        Self {
            certificate: certificate.into(),
            private_key: private_key.into(),
            msp_id: msp_id.into(),
        }
    }

    /// Capture an enrollment. Fails if its key is held externally.
    pub fn from_enrollment(
        enrollment: &Enrollment,
        msp_id: impl Into<String>,
    ) -> Result<Self, WalletError> {
        let key = enrollment.key_pair().ok_or(WalletError::ExternalKey)?;
        Ok(Self {
            certificate: enrollment.cert().to_string(),
            private_key: key.private_key_pem()?,
            msp_id: msp_id.into(),
        })
    }

    /// Rebuild an enrollment usable as registrar. The CA chain is not kept.
    pub fn to_enrollment(&self) -> Result<Enrollment, WalletError> {
        let key = KeyPair::from_pem(&self.private_key)?;
        Ok(Enrollment::new(
            EnrollmentKey::Generated(key),
            self.certificate.clone(),
            String::new(),
        ))
    }

    /// Serialize to the stored form.
    pub fn encode(&self) -> Result<String, WalletError> {
        let envelope = Envelope {
            kind: IDENTITY_TYPE.to_string(),
            version: Value::from(IDENTITY_VERSION),
            msp_id: self.msp_id.clone(),
            credentials: Credentials {
                certificate: self.certificate.clone(),
                private_key: self.private_key.clone(),
            },
        };
        let json = serde_json::to_string(&envelope)?;
        Ok(STANDARD.encode(json))
    }

    /// Parse the stored form, checking the envelope and both PEM blocks.
    pub fn decode(blob: &str) -> Result<Self, WalletError> {
        let bytes = STANDARD
            .decode(blob.trim())
            .map_err(|e| WalletError::Decode(e.to_string()))?;
        let json = String::from_utf8(bytes).map_err(|e| WalletError::Decode(e.to_string()))?;
        let envelope: Envelope = serde_json::from_str(&json)?;

        if envelope.kind != IDENTITY_TYPE {
            return Err(WalletError::InvalidType(envelope.kind));
        }
        let supported = match &envelope.version {
            Value::Number(n) => n.as_u64() == Some(IDENTITY_VERSION),
            Value::String(s) => s.parse::<u64>().ok() == Some(IDENTITY_VERSION),
            _ => false,
        };
        if !supported {
            return Err(WalletError::UnsupportedVersion(envelope.version.to_string()));
        }

        certificate_info(&envelope.credentials.certificate)?;
        KeyPair::from_pem(&envelope.credentials.private_key)?;

        Ok(Self {
            certificate: envelope.credentials.certificate,
            private_key: envelope.credentials.private_key,
            msp_id: envelope.msp_id,
        })
    }
}
