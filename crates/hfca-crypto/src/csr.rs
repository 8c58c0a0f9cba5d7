//! PKCS#10 certificate signing requests.
//!
//! Uses rcgen to encode and sign the request. The request always carries a
//! subject key identifier and, when the caller asks for attributes, an
//! attribute-request extension.

use rcgen::{CertificateParams, CustomExtension, DistinguishedName, DnType};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::config::SecurityLevel;
use crate::error::CryptoError;
use crate::key::KeyPair;

/// OID of the subject key identifier extension.
const OID_SUBJECT_KEY_IDENTIFIER: &[u64] = &[2, 5, 29, 14];

/// OID the CA uses for attribute extensions in issued certificates.
pub const OID_ATTRIBUTES: &[u64] = &[1, 2, 3, 4, 5, 6, 7, 8, 1];

/// An attribute the caller wants embedded in the issued certificate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeRequest {
    pub name: String,
    /// When false the CA must fail the request if the identity lacks the attribute.
    #[serde(default)]
    pub optional: bool,
}

impl AttributeRequest {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            optional: false,
        }
    }

    pub fn optional(mut self, optional: bool) -> Self {
        self.optional = optional;
        self
    }
}

#[derive(Serialize)]
struct AttributeRequestExtension<'a> {
    attr_reqs: &'a [AttributeRequest],
}

/// Build a PEM CSR for `subject_cn` signed with `key`.
pub fn build_csr(
    key: &KeyPair,
    subject_cn: &str,
    attr_reqs: &[AttributeRequest],
) -> Result<String, CryptoError> {
    if subject_cn.is_empty() {
        return Err(CryptoError::InvalidArgument(
            "CSR subject common name must not be empty".to_string(),
        ));
    }

    let signing_alg = match key.security_level() {
        SecurityLevel::L256 => &rcgen::PKCS_ECDSA_P256_SHA256,
        SecurityLevel::L384 => &rcgen::PKCS_ECDSA_P384_SHA384,
    };
    let private_pem = key.private_key_pem()?;
    let signer = rcgen::KeyPair::from_pem_and_sign_algo(&private_pem, signing_alg)
        .map_err(|e| CryptoError::Csr(e.to_string()))?;

    let mut params = CertificateParams::default();

    let mut dn = DistinguishedName::new();
    dn.push(DnType::CommonName, subject_cn);
    params.distinguished_name = dn;

    params.custom_extensions.push(CustomExtension::from_oid_content(
        OID_SUBJECT_KEY_IDENTIFIER,
        der_octet_string(&subject_key_identifier(key)),
    ));

    if !attr_reqs.is_empty() {
        let value = serde_json::to_vec(&AttributeRequestExtension { attr_reqs })
            .map_err(|e| CryptoError::Csr(e.to_string()))?;
        params
            .custom_extensions
            .push(CustomExtension::from_oid_content(OID_ATTRIBUTES, value));
    }

    let csr = params
        .serialize_request(&signer)
        .map_err(|e| CryptoError::Csr(e.to_string()))?;

    csr.pem().map_err(|e| CryptoError::Csr(e.to_string()))
}

/// Subject key identifier: leftmost 160 bits of SHA-256 over the public point.
pub fn subject_key_identifier(key: &KeyPair) -> Vec<u8> {
    let digest = Sha256::digest(key.public_point());
    digest[..20].to_vec()
}

fn der_octet_string(bytes: &[u8]) -> Vec<u8> {
    // Identifiers here are always shorter than 128 bytes.
    let mut out = Vec::with_capacity(bytes.len() + 2);
    out.push(0x04);
    out.push(bytes.len() as u8);
    out.extend_from_slice(bytes);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use x509_parser::cri_attributes::ParsedCriAttribute;
    use x509_parser::extensions::{ParsedExtension, X509Extension};
    use x509_parser::prelude::*;

    fn parse_csr(csr_pem: &str) -> Vec<u8> {
        let block = ::pem::parse(csr_pem).unwrap();
        assert_eq!(block.tag(), "CERTIFICATE REQUEST");
        block.contents().to_vec()
    }

    #[test]
    fn test_csr_binds_subject_and_key() {
        let key = KeyPair::generate(SecurityLevel::L256);
        let pem = build_csr(&key, "admin", &[]).unwrap();
        let der = parse_csr(&pem);

        let (_, csr) = X509CertificationRequest::from_der(&der).unwrap();
        let cn = csr
            .certification_request_info
            .subject
            .iter_common_name()
            .next()
            .and_then(|cn| cn.as_str().ok())
            .unwrap();
        assert_eq!(cn, "admin");

        let spki = &csr.certification_request_info.subject_pki;
        assert_eq!(spki.raw, key.public_key_der().unwrap().as_slice());
    }

    #[test]
    fn test_csr_carries_subject_key_identifier() {
        let key = KeyPair::generate(SecurityLevel::L384);
        let der = parse_csr(&build_csr(&key, "user1", &[]).unwrap());
        let (_, csr) = X509CertificationRequest::from_der(&der).unwrap();

        let expected = subject_key_identifier(&key);
        let found = csr
            .requested_extensions()
            .into_iter()
            .flatten()
            .any(|ext| matches!(ext, ParsedExtension::SubjectKeyIdentifier(ski) if ski.0 == expected.as_slice()));
        assert!(found);
    }

    #[test]
    fn test_csr_with_attribute_requests() {
        let key = KeyPair::generate(SecurityLevel::L256);
        let reqs = vec![
            AttributeRequest::new("hf.Affiliation"),
            AttributeRequest::new("email").optional(true),
        ];
        let pem = build_csr(&key, "user2", &reqs).unwrap();
        let der = parse_csr(&pem);
        let (_, csr) = X509CertificationRequest::from_der(&der).unwrap();

        let extensions: Vec<&X509Extension> = csr
            .certification_request_info
            .iter_attributes()
            .filter_map(|attr| match attr.parsed_attribute() {
                ParsedCriAttribute::ExtensionRequest(req) => Some(req.extensions.iter()),
                _ => None,
            })
            .flatten()
            .collect();
        let attrs = extensions
            .iter()
            .find(|ext| ext.oid.to_id_string() == "1.2.3.4.5.6.7.8.1")
            .expect("attribute request extension");

        let value: serde_json::Value = serde_json::from_slice(attrs.value).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "attr_reqs": [
                    { "name": "hf.Affiliation", "optional": false },
                    { "name": "email", "optional": true }
                ]
            })
        );
    }

    #[test]
    fn test_empty_subject_rejected() {
        let key = KeyPair::generate(SecurityLevel::L256);
        assert!(matches!(
            build_csr(&key, "", &[]),
            Err(CryptoError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_attribute_request_wire_shape() {
        let json = serde_json::to_value(AttributeRequest::new("role").optional(true)).unwrap();
        assert_eq!(json, serde_json::json!({ "name": "role", "optional": true }));
    }
}
