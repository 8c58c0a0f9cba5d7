//! Request and result types of the CA operations.

use std::fmt;
use std::str::FromStr;

use hfca_crypto::{certificate_info, AttributeRequest};
use serde::{Deserialize, Serialize};

use crate::error::ClientError;

/// Enrollment with an identifier and secret.
#[derive(Debug, Clone)]
pub struct EnrollmentRequest {
    pub id: String,
    pub secret: String,
    /// PEM CSR built by the caller. When set, no key pair is generated.
    pub csr: Option<String>,
    pub profile: Option<String>,
    pub attr_reqs: Vec<AttributeRequest>,
}

impl EnrollmentRequest {
    pub fn new(id: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            secret: secret.into(),
            csr: None,
            profile: None,
            attr_reqs: Vec::new(),
        }
    }

    pub fn with_csr(mut self, csr: impl Into<String>) -> Self {
        self.csr = Some(csr.into());
        self
    }

    pub fn with_profile(mut self, profile: impl Into<String>) -> Self {
        self.profile = Some(profile.into());
        self
    }

    pub fn with_attr_req(mut self, attr_req: AttributeRequest) -> Self {
        self.attr_reqs.push(attr_req);
        self
    }
}

/// Re-issue of the registrar's certificate.
#[derive(Debug, Clone, Default)]
pub struct ReenrollmentRequest {
    pub csr: Option<String>,
    pub attr_reqs: Vec<AttributeRequest>,
}

impl ReenrollmentRequest {
    pub fn with_csr(mut self, csr: impl Into<String>) -> Self {
        self.csr = Some(csr.into());
        self
    }

    pub fn with_attr_req(mut self, attr_req: AttributeRequest) -> Self {
        self.attr_reqs.push(attr_req);
        self
    }
}

/// Attribute attached to a registered identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationAttribute {
    pub name: String,
    pub value: String,
    /// Whether the attribute is added to enrollment certificates by default.
    #[serde(rename = "ecert", default)]
    pub include_in_cert: bool,
}

impl RegistrationAttribute {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            include_in_cert: false,
        }
    }

    pub fn include_in_cert(mut self, include: bool) -> Self {
        self.include_in_cert = include;
        self
    }
}

/// Registration of a new identity.
#[derive(Debug, Clone)]
pub struct RegistrationRequest {
    pub id: String,
    /// Secret to assign; the CA generates one when unset.
    pub secret: Option<String>,
    /// Enrollment limit; 0 uses the CA default, -1 is unlimited.
    pub max_enrollments: i32,
    pub attrs: Vec<RegistrationAttribute>,
    /// Identity type, e.g. `client` or `peer`.
    pub role: Option<String>,
    pub affiliation: String,
}

impl RegistrationRequest {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            secret: None,
            max_enrollments: 0,
            attrs: Vec::new(),
            role: None,
            affiliation: String::new(),
        }
    }

    pub fn with_secret(mut self, secret: impl Into<String>) -> Self {
        self.secret = Some(secret.into());
        self
    }

    pub fn with_max_enrollments(mut self, max_enrollments: i32) -> Self {
        self.max_enrollments = max_enrollments;
        self
    }

    pub fn with_attr(mut self, attr: RegistrationAttribute) -> Self {
        self.attrs.push(attr);
        self
    }

    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.role = Some(role.into());
        self
    }

    pub fn with_affiliation(mut self, affiliation: impl Into<String>) -> Self {
        self.affiliation = affiliation.into();
        self
    }
}

/// CRL reason codes (RFC 5280 section 5.3.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RevocationReason {
    #[default]
    Unspecified,
    KeyCompromise,
    CaCompromise,
    AffiliationChanged,
    Superseded,
    CessationOfOperation,
    CertificateHold,
    RemoveFromCrl,
    PrivilegeWithdrawn,
    AaCompromise,
}

impl RevocationReason {
    pub const ALL: [RevocationReason; 10] = [
        Self::Unspecified,
        Self::KeyCompromise,
        Self::CaCompromise,
        Self::AffiliationChanged,
        Self::Superseded,
        Self::CessationOfOperation,
        Self::CertificateHold,
        Self::RemoveFromCrl,
        Self::PrivilegeWithdrawn,
        Self::AaCompromise,
    ];

    /// Name sent on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unspecified => "unspecified",
            Self::KeyCompromise => "keyCompromise",
            Self::CaCompromise => "cACompromise",
            Self::AffiliationChanged => "affiliationChanged",
            Self::Superseded => "superseded",
            Self::CessationOfOperation => "cessationOfOperation",
            Self::CertificateHold => "certificateHold",
            Self::RemoveFromCrl => "removeFromCRL",
            Self::PrivilegeWithdrawn => "privilegeWithdrawn",
            Self::AaCompromise => "aACompromise",
        }
    }
}

impl fmt::Display for RevocationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RevocationReason {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|reason| reason.as_str() == s)
            .ok_or_else(|| ClientError::InvalidArgument(format!("unknown revocation reason: {}", s)))
    }
}

/// What to revoke.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RevokeTarget {
    /// The identity and every certificate issued to it.
    ById(String),
    /// One certificate, addressed by hex AKI and serial.
    ByCertificate { aki: String, serial: String },
}

impl RevokeTarget {
    /// Address the certificate in `cert_pem`.
    pub fn from_certificate(cert_pem: &str) -> Result<Self, ClientError> {
        let info = certificate_info(cert_pem)?;
        let aki = info.authority_key_id_hex.ok_or_else(|| {
            ClientError::InvalidArgument(
                "certificate has no authority key identifier".to_string(),
            )
        })?;
        Ok(Self::ByCertificate {
            aki,
            serial: info.serial_hex,
        })
    }

    pub(crate) fn validate(&self) -> Result<(), ClientError> {
        match self {
            Self::ById(id) if id.is_empty() => Err(ClientError::InvalidArgument(
                "revocation id must not be empty".to_string(),
            )),
            Self::ByCertificate { aki, serial } if aki.is_empty() || serial.is_empty() => {
                Err(ClientError::InvalidArgument(
                    "both aki and serial are required to revoke a certificate".to_string(),
                ))
            }
            _ => Ok(()),
        }
    }
}

/// Revocation of an identity or a certificate.
#[derive(Debug, Clone)]
pub struct RevocationRequest {
    pub target: RevokeTarget,
    pub reason: RevocationReason,
    /// Ask the CA to return an updated CRL.
    pub gen_crl: bool,
}

impl RevocationRequest {
    pub fn new(target: RevokeTarget) -> Self {
        Self {
            target,
            reason: RevocationReason::default(),
            gen_crl: false,
        }
    }

    pub fn with_reason(mut self, reason: RevocationReason) -> Self {
        self.reason = reason;
        self
    }

    pub fn with_gen_crl(mut self, gen_crl: bool) -> Self {
        self.gen_crl = gen_crl;
        self
    }
}

/// Certificate reported as revoked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevokedCertificate {
    pub serial: String,
    pub aki: String,
}

/// Outcome of a revocation.
#[derive(Debug, Clone)]
pub struct Revocation {
    pub revoked: Vec<RevokedCertificate>,
    /// Base64 of the PEM CRL, when one was requested and returned.
    pub crl: Option<String>,
}

/// Description of the CA.
#[derive(Debug, Clone)]
pub struct CaInfo {
    pub ca_name: String,
    /// PEM chain.
    pub ca_chain: String,
    pub issuer_public_key: String,
    pub issuer_revocation_public_key: String,
    pub version: String,
}
