//! Wire format of the CA REST API.
//!
//! Request bodies borrow from the caller's request types and are serialized
//! once; the same bytes are signed and sent. Responses share the envelope
//! `{success, result, errors, messages}`.

use hfca_crypto::AttributeRequest;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ClientError;
use crate::types::RegistrationAttribute;

/// Body of `enroll` and `reenroll`.
#[derive(Debug, Serialize)]
pub struct EnrollBody<'a> {
    pub certificate_request: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub caname: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile: Option<&'a str>,
    #[serde(skip_serializing_if = "<[_]>::is_empty")]
    pub attr_reqs: &'a [AttributeRequest],
}

/// Body of `register`.
#[derive(Debug, Serialize)]
pub struct RegisterBody<'a> {
    pub id: &'a str,
    pub affiliation: &'a str,
    pub max_enrollments: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub caname: Option<&'a str>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub role: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secret: Option<&'a str>,
    #[serde(skip_serializing_if = "<[_]>::is_empty")]
    pub attrs: &'a [RegistrationAttribute],
}

/// Body of `revoke`. Unused addressing fields are sent as empty strings.
#[derive(Debug, Serialize)]
pub struct RevokeBody<'a> {
    pub id: &'a str,
    pub aki: &'a str,
    pub serial: &'a str,
    pub reason: &'a str,
    pub gencrl: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub caname: Option<&'a str>,
}

/// Response envelope shared by every endpoint.
#[derive(Debug, Deserialize)]
pub struct CaResponse<T> {
    #[serde(default)]
    pub success: bool,
    pub result: Option<T>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub errors: Vec<CaMessage>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub messages: Vec<CaMessage>,
}

/// One entry of `errors` or `messages`.
#[derive(Debug, Clone, Deserialize)]
pub struct CaMessage {
    #[serde(default)]
    pub code: i64,
    #[serde(default)]
    pub message: String,
}

/// `result` of `enroll` and `reenroll`.
#[derive(Debug, Deserialize)]
pub struct EnrollResult {
    /// Base64 of the PEM certificate.
    #[serde(rename = "Cert")]
    pub cert: String,
    #[serde(rename = "ServerInfo")]
    pub server_info: ServerInfo,
}

/// CA description; the `result` of `cainfo` and part of enrollment results.
#[derive(Debug, Default, Deserialize)]
pub struct ServerInfo {
    #[serde(rename = "CAName", default)]
    pub ca_name: String,
    /// Base64 of the PEM chain.
    #[serde(rename = "CAChain", default)]
    pub ca_chain: String,
    #[serde(rename = "IssuerPublicKey", default)]
    pub issuer_public_key: String,
    #[serde(rename = "IssuerRevocationPublicKey", default)]
    pub issuer_revocation_public_key: String,
    #[serde(rename = "Version", default)]
    pub version: String,
}

/// `result` of `register`.
#[derive(Debug, Deserialize)]
pub struct RegisterResult {
    pub secret: String,
}

/// `result` of `revoke`.
#[derive(Debug, Deserialize)]
pub struct RevokeResult {
    #[serde(rename = "RevokedCerts", default, deserialize_with = "null_as_empty")]
    pub revoked_certs: Vec<RevokedCertWire>,
    #[serde(rename = "CRL", default)]
    pub crl: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RevokedCertWire {
    #[serde(rename = "Serial", default)]
    pub serial: String,
    #[serde(rename = "AKI", default)]
    pub aki: String,
}

/// `result` of `certificates`.
#[derive(Debug, Deserialize)]
pub struct CertificatesResult {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub certs: Vec<CertificateWire>,
}

#[derive(Debug, Deserialize)]
pub struct CertificateWire {
    #[serde(rename = "PEM")]
    pub pem: String,
}

fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

/// Decode a 2xx response body and extract `result`.
///
/// Malformed JSON, `success: false` and a missing `result` are all
/// [`ClientError::Protocol`].
pub fn parse_result<T: DeserializeOwned>(body: &[u8]) -> Result<T, ClientError> {
    let response: CaResponse<T> = serde_json::from_slice(body)
        .map_err(|e| ClientError::Protocol(format!("malformed response: {}", e)))?;

    for m in &response.messages {
        debug!(code = m.code, message = %m.message, "CA message");
    }

    if !response.success {
        return Err(ClientError::Protocol(describe_errors(&response.errors)));
    }

    response
        .result
        .ok_or_else(|| ClientError::Protocol("response has no result".to_string()))
}

fn describe_errors(errors: &[CaMessage]) -> String {
    if errors.is_empty() {
        return "request was not successful".to_string();
    }
    errors
        .iter()
        .map(|e| format!("[{}] {}", e.code, e.message))
        .collect::<Vec<_>>()
        .join("; ")
}
