//! CA protocol client.

use std::sync::Arc;

use base64::{engine::general_purpose::STANDARD, Engine};
use hfca_crypto::{subject_common_name, AttributeRequest, CryptoSuite, EcdsaSuite, KeyPair};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::ClientConfig;
use crate::enrollment::{Enrollment, EnrollmentKey};
use crate::error::ClientError;
use crate::messages::{
    parse_result, CertificatesResult, EnrollBody, EnrollResult, RegisterBody, RegisterResult,
    RevokeBody, RevokeResult, ServerInfo,
};
use crate::token::build_auth_token;
use crate::transport::{Authorization, HttpTransport};
use crate::types::{
    CaInfo, EnrollmentRequest, ReenrollmentRequest, RegistrationRequest, RevocationRequest,
    Revocation, RevokeTarget, RevokedCertificate,
};

/// Client for one CA endpoint.
///
/// Cheap to share: every operation takes `&self` and requests go through a
/// single pooled HTTP client.
pub struct CaClient {
    config: ClientConfig,
    transport: HttpTransport,
    suite: Arc<dyn CryptoSuite>,
}

impl CaClient {
    /// Create a client using ECDSA with the configured security level.
    pub fn new(config: ClientConfig) -> Result<Self, ClientError> {
        let suite = Arc::new(EcdsaSuite::new(config.crypto));
        Self::with_suite(config, suite)
    }

    /// Create a client with a custom crypto suite.
    pub fn with_suite(
        config: ClientConfig,
        suite: Arc<dyn CryptoSuite>,
    ) -> Result<Self, ClientError> {
        let transport = HttpTransport::new(&config)?;
        Ok(Self {
            config,
            transport,
            suite,
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn suite(&self) -> &dyn CryptoSuite {
        self.suite.as_ref()
    }

    /// Enroll with an identifier and secret.
    ///
    /// Generates a key pair and CSR unless the request carries a CSR, in
    /// which case the returned enrollment has an [`EnrollmentKey::External`]
    /// key.
    pub async fn enroll(&self, request: &EnrollmentRequest) -> Result<Enrollment, ClientError> {
        if request.id.is_empty() || request.secret.is_empty() {
            return Err(ClientError::InvalidArgument(
                "enrollment id and secret are required".to_string(),
            ));
        }

        info!(id = %request.id, external_csr = request.csr.is_some(), "Enrolling identity");
        let enrollment = self
            .do_enroll(request)
            .await
            .map_err(|e| ClientError::Enrollment(Box::new(e)))?;
        info!(id = %request.id, "Enrollment complete");

        Ok(enrollment)
    }

    async fn do_enroll(&self, request: &EnrollmentRequest) -> Result<Enrollment, ClientError> {
        let (key, csr) = self.key_and_csr(request.csr.as_deref(), &request.id, &request.attr_reqs)?;

        let body = encode(&EnrollBody {
            certificate_request: &csr,
            caname: self.config.ca_name.as_deref(),
            profile: request.profile.as_deref(),
            attr_reqs: &request.attr_reqs,
        })?;

        let auth = Authorization::Basic {
            id: &request.id,
            secret: &request.secret,
        };
        let response = self.transport.post("enroll", body, auth).await?;

        enrollment_from_response(key, &response)
    }

    /// Obtain a new certificate for the registrar's identity.
    pub async fn reenroll(
        &self,
        registrar: &Enrollment,
        request: &ReenrollmentRequest,
    ) -> Result<Enrollment, ClientError> {
        let signer = registrar.signing_key()?;

        let enrollment = self
            .do_reenroll(registrar, signer, request)
            .await
            .map_err(|e| ClientError::Reenrollment(Box::new(e)))?;

        Ok(enrollment)
    }

    async fn do_reenroll(
        &self,
        registrar: &Enrollment,
        signer: &KeyPair,
        request: &ReenrollmentRequest,
    ) -> Result<Enrollment, ClientError> {
        let subject = subject_common_name(registrar.cert())?;
        info!(id = %subject, "Reenrolling identity");

        let (key, csr) = self.key_and_csr(request.csr.as_deref(), &subject, &request.attr_reqs)?;

        let body = encode(&EnrollBody {
            certificate_request: &csr,
            caname: self.config.ca_name.as_deref(),
            profile: None,
            attr_reqs: &request.attr_reqs,
        })?;

        let response = self.post_signed("reenroll", body, registrar, signer).await?;
        enrollment_from_response(key, &response)
    }

    /// Register a new identity and return its enrollment secret.
    pub async fn register(
        &self,
        request: &RegistrationRequest,
        registrar: &Enrollment,
    ) -> Result<String, ClientError> {
        if request.id.is_empty() {
            return Err(ClientError::InvalidArgument(
                "registration id is required".to_string(),
            ));
        }
        let signer = registrar.signing_key()?;

        info!(id = %request.id, max_enrollments = request.max_enrollments, "Registering identity");
        self.do_register(request, registrar, signer)
            .await
            .map_err(|e| ClientError::Register(Box::new(e)))
    }

    async fn do_register(
        &self,
        request: &RegistrationRequest,
        registrar: &Enrollment,
        signer: &KeyPair,
    ) -> Result<String, ClientError> {
        let body = encode(&RegisterBody {
            id: &request.id,
            affiliation: &request.affiliation,
            max_enrollments: request.max_enrollments,
            caname: self.config.ca_name.as_deref(),
            role: request.role.as_deref(),
            secret: request.secret.as_deref(),
            attrs: &request.attrs,
        })?;

        let response = self.post_signed("register", body, registrar, signer).await?;
        let result: RegisterResult = parse_result(&response)?;

        Ok(result.secret)
    }

    /// Revoke an identity or a single certificate.
    pub async fn revoke(
        &self,
        request: &RevocationRequest,
        registrar: &Enrollment,
    ) -> Result<Revocation, ClientError> {
        request.target.validate()?;
        let signer = registrar.signing_key()?;

        info!(revoke_target = ?request.target, reason = %request.reason, gencrl = request.gen_crl, "Revoking");
        let revocation = self
            .do_revoke(request, registrar, signer)
            .await
            .map_err(|e| ClientError::Revoke(Box::new(e)))?;
        info!(revoked = revocation.revoked.len(), "Revocation complete");

        Ok(revocation)
    }

    async fn do_revoke(
        &self,
        request: &RevocationRequest,
        registrar: &Enrollment,
        signer: &KeyPair,
    ) -> Result<Revocation, ClientError> {
        let (id, aki, serial) = match &request.target {
            RevokeTarget::ById(id) => (id.as_str(), "", ""),
            RevokeTarget::ByCertificate { aki, serial } => ("", aki.as_str(), serial.as_str()),
        };

        let body = encode(&RevokeBody {
            id,
            aki,
            serial,
            reason: request.reason.as_str(),
            gencrl: request.gen_crl,
            caname: self.config.ca_name.as_deref(),
        })?;

        let response = self.post_signed("revoke", body, registrar, signer).await?;
        let result: RevokeResult = parse_result(&response)?;

        let revoked = result
            .revoked_certs
            .into_iter()
            .map(|c| RevokedCertificate {
                serial: c.serial,
                aki: c.aki,
            })
            .collect();
        let crl = result.crl.filter(|crl| !crl.is_empty());
        if request.gen_crl && crl.is_none() {
            warn!("CRL was requested but the CA returned none");
        }

        Ok(Revocation { revoked, crl })
    }

    /// Fetch the CA's name, chain and issuer keys.
    pub async fn ca_info(&self) -> Result<CaInfo, ClientError> {
        let query: Vec<(&str, &str)> = match self.config.ca_name.as_deref() {
            Some(name) => vec![("ca", name)],
            None => Vec::new(),
        };

        let response = self
            .transport
            .get("cainfo", &query, Authorization::None)
            .await?;
        let info: ServerInfo = parse_result(&response)?;
        debug!(ca_name = %info.ca_name, version = %info.version, "Fetched CA info");

        Ok(CaInfo {
            ca_chain: decode_pem(&info.ca_chain, "CAChain")?,
            ca_name: info.ca_name,
            issuer_public_key: info.issuer_public_key,
            issuer_revocation_public_key: info.issuer_revocation_public_key,
            version: info.version,
        })
    }

    /// List certificates visible to the registrar, optionally for one id.
    pub async fn certificates(
        &self,
        registrar: &Enrollment,
        id: Option<&str>,
    ) -> Result<Vec<String>, ClientError> {
        let signer = registrar.signing_key()?;

        self.do_certificates(registrar, signer, id)
            .await
            .map_err(|e| ClientError::Certificates(Box::new(e)))
    }

    async fn do_certificates(
        &self,
        registrar: &Enrollment,
        signer: &KeyPair,
        id: Option<&str>,
    ) -> Result<Vec<String>, ClientError> {
        let mut query = Vec::new();
        if let Some(id) = id {
            query.push(("id", id));
        }
        if let Some(name) = self.config.ca_name.as_deref() {
            query.push(("ca", name));
        }

        let token = build_auth_token(self.suite.as_ref(), registrar.cert(), signer, b"")?;
        let response = self
            .transport
            .get("certificates", &query, Authorization::Token(&token))
            .await?;
        let result: CertificatesResult = parse_result(&response)?;

        debug!(count = result.certs.len(), "Fetched certificates");
        Ok(result.certs.into_iter().map(|c| c.pem).collect())
    }

    fn key_and_csr(
        &self,
        csr: Option<&str>,
        subject: &str,
        attr_reqs: &[AttributeRequest],
    ) -> Result<(EnrollmentKey, String), ClientError> {
        match csr {
            Some(csr) => Ok((EnrollmentKey::External, csr.to_string())),
            None => {
                let key = self.suite.generate_key_pair()?;
                let csr = self.suite.generate_csr(&key, subject, attr_reqs)?;
                Ok((EnrollmentKey::Generated(key), csr))
            }
        }
    }

    async fn post_signed(
        &self,
        path: &str,
        body: Vec<u8>,
        registrar: &Enrollment,
        signer: &KeyPair,
    ) -> Result<Vec<u8>, ClientError> {
        let token = build_auth_token(self.suite.as_ref(), registrar.cert(), signer, &body)?;
        let response = self
            .transport
            .post(path, body, Authorization::Token(&token))
            .await?;
        Ok(response)
    }
}

fn encode<T: Serialize>(body: &T) -> Result<Vec<u8>, ClientError> {
    serde_json::to_vec(body)
        .map_err(|e| ClientError::Protocol(format!("failed to encode request: {}", e)))
}

fn enrollment_from_response(key: EnrollmentKey, response: &[u8]) -> Result<Enrollment, ClientError> {
    let result: EnrollResult = parse_result(response)?;
    let cert = decode_pem(&result.cert, "Cert")?;
    let ca_chain = decode_pem(&result.server_info.ca_chain, "CAChain")?;
    Ok(Enrollment::new(key, cert, ca_chain))
}

fn decode_pem(b64: &str, field: &str) -> Result<String, ClientError> {
    let bytes = STANDARD
        .decode(b64)
        .map_err(|e| ClientError::Protocol(format!("{} is not valid base64: {}", field, e)))?;
    String::from_utf8(bytes)
        .map_err(|e| ClientError::Protocol(format!("{} is not valid UTF-8: {}", field, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use hfca_crypto::CryptoError;

    fn client() -> CaClient {
        CaClient::new(ClientConfig::new("http://127.0.0.1:9").with_timeout_secs(1)).unwrap()
    }

    #[tokio::test]
    async fn test_enroll_requires_id_and_secret() {
        let err = client()
            .enroll(&EnrollmentRequest::new("", "secret"))
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::InvalidArgument(_)));

        let err = client()
            .enroll(&EnrollmentRequest::new("admin", ""))
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn test_external_registrar_is_rejected_before_io() {
        let registrar = Enrollment::new(EnrollmentKey::External, "CERT", "");
        let request = RegistrationRequest::new("user1");
        let err = client().register(&request, &registrar).await.unwrap_err();
        match err {
            ClientError::Crypto(CryptoError::InvalidArgument(msg)) => {
                assert_eq!(msg, "public and private keys must be provided")
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_empty_revoke_target_is_rejected_before_io() {
        let registrar = Enrollment::new(EnrollmentKey::External, "CERT", "");
        let request = RevocationRequest::new(RevokeTarget::ById(String::new()));
        let err = client().revoke(&request, &registrar).await.unwrap_err();
        assert!(matches!(err, ClientError::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn test_transport_failure_is_wrapped() {
        let err = client()
            .enroll(&EnrollmentRequest::new("admin", "adminpw"))
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Enrollment(_)));
        assert!(err.is_retryable());
    }

    #[test]
    fn test_decode_pem_rejects_garbage() {
        assert!(matches!(
            decode_pem("not base64!", "Cert"),
            Err(ClientError::Protocol(_))
        ));
        assert_eq!(decode_pem("", "CAChain").unwrap(), "");
    }
}
