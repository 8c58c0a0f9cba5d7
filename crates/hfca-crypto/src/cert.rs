//! Certificate inspection.
//!
//! Reads the few fields the client needs from an issued certificate: the
//! subject CN (for reenrollment), the serial and authority key identifier
//! (to address a single certificate for revocation) and the expiry.

use chrono::{DateTime, Utc};
use x509_parser::extensions::ParsedExtension;
use x509_parser::prelude::*;

use crate::error::CryptoError;
use crate::signature::verify_with_public_key_der;

const CERTIFICATE_TAG: &str = "CERTIFICATE";

/// Fields extracted from an X.509 certificate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateInfo {
    /// Subject Common Name.
    pub subject_cn: String,

    /// Serial number, lowercase hex without leading zero bytes.
    pub serial_hex: String,

    /// Authority key identifier, lowercase hex, if the extension is present.
    pub authority_key_id_hex: Option<String>,

    /// End of the validity period.
    pub not_after: DateTime<Utc>,
}

/// Decode the first certificate of a PEM string to DER.
fn certificate_der(cert_pem: &str) -> Result<Vec<u8>, CryptoError> {
    let block = ::pem::parse(cert_pem).map_err(|e| CryptoError::Certificate(e.to_string()))?;
    if block.tag() != CERTIFICATE_TAG {
        return Err(CryptoError::Certificate(format!(
            "expected a CERTIFICATE PEM block, got '{}'",
            block.tag()
        )));
    }
    Ok(block.contents().to_vec())
}

/// Extract the subject, serial, AKI and expiry of a PEM certificate.
pub fn certificate_info(cert_pem: &str) -> Result<CertificateInfo, CryptoError> {
    let der = certificate_der(cert_pem)?;
    let (_, cert) = X509Certificate::from_der(&der)
        .map_err(|e| CryptoError::Certificate(format!("{:?}", e)))?;

    let subject_cn = extract_cn_from_subject(&cert)?;

    let serial = cert.tbs_certificate.raw_serial();
    let first_significant = serial.iter().position(|b| *b != 0).unwrap_or(serial.len());
    let serial_hex = hex::encode(&serial[first_significant..]);

    let mut authority_key_id_hex = None;
    for ext in cert.extensions() {
        if let ParsedExtension::AuthorityKeyIdentifier(aki) = ext.parsed_extension() {
            authority_key_id_hex = aki.key_identifier.as_ref().map(|id| hex::encode(id.0));
        }
    }

    let not_after = DateTime::from_timestamp(cert.validity().not_after.timestamp(), 0)
        .ok_or_else(|| CryptoError::Certificate("expiry out of range".to_string()))?;

    Ok(CertificateInfo {
        subject_cn,
        serial_hex,
        authority_key_id_hex,
        not_after,
    })
}

/// Extract the subject Common Name of a PEM certificate.
pub fn subject_common_name(cert_pem: &str) -> Result<String, CryptoError> {
    let der = certificate_der(cert_pem)?;
    let (_, cert) = X509Certificate::from_der(&der)
        .map_err(|e| CryptoError::Certificate(format!("{:?}", e)))?;
    extract_cn_from_subject(&cert)
}

/// Verify a base64 DER signature with the public key of a PEM certificate.
pub fn verify_with_certificate(
    cert_pem: &str,
    message: &[u8],
    signature_b64: &str,
) -> Result<bool, CryptoError> {
    let der = certificate_der(cert_pem)?;
    let (_, cert) = X509Certificate::from_der(&der)
        .map_err(|e| CryptoError::Certificate(format!("{:?}", e)))?;
    verify_with_public_key_der(cert.public_key().raw, message, signature_b64)
}

fn extract_cn_from_subject(cert: &X509Certificate<'_>) -> Result<String, CryptoError> {
    cert.subject()
        .iter_common_name()
        .next()
        .ok_or_else(|| {
            CryptoError::Certificate("certificate does not contain a Common Name (CN)".to_string())
        })?
        .as_str()
        .map(|s| s.to_string())
        .map_err(|e| CryptoError::Certificate(format!("failed to parse CN: {:?}", e)))
}
