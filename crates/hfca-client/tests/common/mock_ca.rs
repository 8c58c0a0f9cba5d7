//! In-process certificate authority speaking the enrollment REST API.
//!
//! Parses CSRs with x509-parser, issues certificates with rcgen and checks
//! request tokens with the client's own verifier.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::{
    body::Bytes,
    extract::{Query, State},
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use base64::{engine::general_purpose::STANDARD, Engine};
use hfca_client::verify_auth_token;
use hfca_crypto::{certificate_info, subject_common_name};
use rcgen::{
    CertificateParams, DistinguishedName, DnType, IsCa, KeyPair, KeyUsagePurpose, SerialNumber,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::net::TcpListener;
use x509_parser::prelude::*;

pub const CA_NAME: &str = "ca-mock";

/// Failure injected into the next request.
#[derive(Debug, Clone, Copy)]
pub enum Fault {
    /// Answer with this HTTP status.
    Status(u16),
    /// Answer 200 with `success: true` and no `result`.
    MissingResult,
}

struct Identity {
    secret: String,
    max_enrollments: i32,
    enrollments: i32,
    revoked: bool,
}

struct Issued {
    id: String,
    serial_hex: String,
    aki_hex: String,
    pem: String,
    revoked: bool,
}

struct Registry {
    identities: HashMap<String, Identity>,
    issued: Vec<Issued>,
    next_serial: u32,
    fault: Option<Fault>,
}

struct CaState {
    ca_cert: rcgen::Certificate,
    ca_key: KeyPair,
    registry: Mutex<Registry>,
}

/// Subject public key taken from a CSR.
struct CsrPublicKey {
    point: Vec<u8>,
    alg: &'static rcgen::SignatureAlgorithm,
}

impl rcgen::PublicKeyData for CsrPublicKey {
    fn der_bytes(&self) -> &[u8] {
        &self.point
    }

    fn algorithm(&self) -> &rcgen::SignatureAlgorithm {
        self.alg
    }
}

pub struct MockCa {
    addr: SocketAddr,
    state: Arc<CaState>,
}

impl MockCa {
    /// Start the CA on an ephemeral localhost port.
    pub async fn start() -> Self {
        let ca_key = KeyPair::generate().unwrap();
        let mut params = CertificateParams::default();
        let mut dn = DistinguishedName::new();
        dn.push(DnType::CommonName, "Mock CA");
        dn.push(DnType::OrganizationName, "org1.example.com");
        params.distinguished_name = dn;
        params.is_ca = IsCa::Ca(rcgen::BasicConstraints::Unconstrained);
        params.key_usages = vec![
            KeyUsagePurpose::KeyCertSign,
            KeyUsagePurpose::CrlSign,
            KeyUsagePurpose::DigitalSignature,
        ];
        let ca_cert = params.self_signed(&ca_key).unwrap();

        let state = Arc::new(CaState {
            ca_cert,
            ca_key,
            registry: Mutex::new(Registry {
                identities: HashMap::new(),
                issued: Vec::new(),
                next_serial: 0x1000_0001,
                fault: None,
            }),
        });

        let app = Router::new()
            .route("/api/v1/cainfo", get(cainfo))
            .route("/api/v1/enroll", post(enroll))
            .route("/api/v1/reenroll", post(reenroll))
            .route("/api/v1/register", post(register))
            .route("/api/v1/revoke", post(revoke))
            .route("/api/v1/certificates", get(certificates))
            .with_state(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { addr, state }
    }

    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Bootstrap identity, as configured on a real CA's command line.
    pub fn add_identity(&self, id: &str, secret: &str, max_enrollments: i32) {
        self.state.registry.lock().unwrap().identities.insert(
            id.to_string(),
            Identity {
                secret: secret.to_string(),
                max_enrollments,
                enrollments: 0,
                revoked: false,
            },
        );
    }

    pub fn inject_fault(&self, fault: Fault) {
        self.state.registry.lock().unwrap().fault = Some(fault);
    }

    pub fn ca_cert_pem(&self) -> String {
        self.state.ca_cert.pem()
    }
}

fn ok(result: Value) -> Response {
    Json(json!({"success": true, "result": result, "errors": [], "messages": []})).into_response()
}

fn fail(status: StatusCode, code: i64, message: &str) -> Response {
    (
        status,
        Json(json!({
            "success": false,
            "result": null,
            "errors": [{"code": code, "message": message}],
            "messages": []
        })),
    )
        .into_response()
}

fn unauthorized() -> Response {
    fail(StatusCode::UNAUTHORIZED, 20, "Authentication failure")
}

impl CaState {
    fn take_fault(&self) -> Option<Response> {
        let fault = self.registry.lock().unwrap().fault.take()?;
        Some(match fault {
            Fault::Status(status) => fail(
                StatusCode::from_u16(status).unwrap(),
                0,
                "injected failure",
            ),
            Fault::MissingResult => {
                Json(json!({"success": true, "errors": [], "messages": []})).into_response()
            }
        })
    }

    fn chain_b64(&self) -> String {
        STANDARD.encode(self.ca_cert.pem())
    }

    /// Issue a certificate for the CSR's public key, subject `id`.
    fn issue(&self, csr_pem: &str, id: &str) -> Result<String, String> {
        let block = ::pem::parse(csr_pem).map_err(|e| e.to_string())?;
        let (_, csr) =
            X509CertificationRequest::from_der(block.contents()).map_err(|e| e.to_string())?;

        let info = &csr.certification_request_info;
        let cn = info
            .subject
            .iter_common_name()
            .next()
            .and_then(|cn| cn.as_str().ok())
            .ok_or("CSR has no CN")?;
        if cn != id {
            return Err(format!("CSR CN '{}' does not match '{}'", cn, id));
        }

        let point = info.subject_pki.subject_public_key.data.to_vec();
        let alg = match point.len() {
            65 => &rcgen::PKCS_ECDSA_P256_SHA256,
            97 => &rcgen::PKCS_ECDSA_P384_SHA384,
            n => return Err(format!("unsupported public key length {}", n)),
        };

        let serial = {
            let mut registry = self.registry.lock().unwrap();
            let serial = registry.next_serial;
            registry.next_serial += 1;
            serial
        };

        let mut params = CertificateParams::default();
        let mut dn = DistinguishedName::new();
        dn.push(DnType::CommonName, id);
        params.distinguished_name = dn;
        params.serial_number = Some(SerialNumber::from(serial.to_be_bytes().to_vec()));
        params.use_authority_key_identifier_extension = true;
        params.key_usages = vec![KeyUsagePurpose::DigitalSignature];

        let cert = params
            .signed_by(&CsrPublicKey { point, alg }, &self.ca_cert, &self.ca_key)
            .map_err(|e| e.to_string())?;
        let pem = cert.pem();

        let cert_info = certificate_info(&pem).map_err(|e| e.to_string())?;
        self.registry.lock().unwrap().issued.push(Issued {
            id: id.to_string(),
            serial_hex: cert_info.serial_hex,
            aki_hex: cert_info.authority_key_id_hex.unwrap_or_default(),
            pem: pem.clone(),
            revoked: false,
        });

        Ok(pem)
    }

    /// Resolve the caller of a token-authenticated request.
    fn authenticate(&self, headers: &HeaderMap, body: &[u8]) -> Option<String> {
        let token = headers.get(AUTHORIZATION)?.to_str().ok()?;
        let cert_pem = verify_auth_token(token, body).ok()?;
        let cert = certificate_info(&cert_pem).ok()?;

        let registry = self.registry.lock().unwrap();
        let issued = registry
            .issued
            .iter()
            .find(|c| c.serial_hex == cert.serial_hex)?;
        let identity = registry.identities.get(&issued.id)?;
        if issued.revoked || identity.revoked {
            return None;
        }
        Some(issued.id.clone())
    }

    fn enrollment_result(&self, cert_pem: &str) -> Response {
        ok(json!({
            "Cert": STANDARD.encode(cert_pem),
            "ServerInfo": {"CAName": CA_NAME, "CAChain": self.chain_b64()}
        }))
    }
}

fn basic_credentials(headers: &HeaderMap) -> Option<(String, String)> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let encoded = value.strip_prefix("Basic ")?;
    let decoded = String::from_utf8(STANDARD.decode(encoded).ok()?).ok()?;
    let (id, secret) = decoded.split_once(':')?;
    Some((id.to_string(), secret.to_string()))
}

#[derive(Deserialize)]
struct EnrollBody {
    certificate_request: String,
}

#[derive(Deserialize)]
struct RegisterBody {
    id: String,
    #[serde(default)]
    max_enrollments: i32,
    #[serde(default)]
    secret: Option<String>,
}

#[derive(Deserialize)]
struct RevokeBody {
    id: String,
    aki: String,
    serial: String,
    reason: String,
    gencrl: bool,
}

async fn cainfo(State(state): State<Arc<CaState>>) -> Response {
    if let Some(response) = state.take_fault() {
        return response;
    }
    ok(json!({
        "CAName": CA_NAME,
        "CAChain": state.chain_b64(),
        "IssuerPublicKey": "",
        "IssuerRevocationPublicKey": "",
        "Version": "1.5.5"
    }))
}

async fn enroll(State(state): State<Arc<CaState>>, headers: HeaderMap, body: Bytes) -> Response {
    if let Some(response) = state.take_fault() {
        return response;
    }
    let Some((id, secret)) = basic_credentials(&headers) else {
        return unauthorized();
    };

    {
        let mut registry = state.registry.lock().unwrap();
        let Some(identity) = registry.identities.get_mut(&id) else {
            return unauthorized();
        };
        let exhausted =
            identity.max_enrollments > 0 && identity.enrollments >= identity.max_enrollments;
        if identity.secret != secret || identity.revoked || exhausted {
            return unauthorized();
        }
        identity.enrollments += 1;
    }

    let Ok(request) = serde_json::from_slice::<EnrollBody>(&body) else {
        return fail(StatusCode::BAD_REQUEST, 1, "malformed enroll request");
    };
    match state.issue(&request.certificate_request, &id) {
        Ok(pem) => state.enrollment_result(&pem),
        Err(e) => fail(StatusCode::BAD_REQUEST, 1, &e),
    }
}

async fn reenroll(State(state): State<Arc<CaState>>, headers: HeaderMap, body: Bytes) -> Response {
    if let Some(response) = state.take_fault() {
        return response;
    }
    let Some(id) = state.authenticate(&headers, &body) else {
        return unauthorized();
    };
    let Ok(request) = serde_json::from_slice::<EnrollBody>(&body) else {
        return fail(StatusCode::BAD_REQUEST, 1, "malformed reenroll request");
    };
    match state.issue(&request.certificate_request, &id) {
        Ok(pem) => state.enrollment_result(&pem),
        Err(e) => fail(StatusCode::BAD_REQUEST, 1, &e),
    }
}

async fn register(State(state): State<Arc<CaState>>, headers: HeaderMap, body: Bytes) -> Response {
    if let Some(response) = state.take_fault() {
        return response;
    }
    if state.authenticate(&headers, &body).is_none() {
        return unauthorized();
    }
    let Ok(request) = serde_json::from_slice::<RegisterBody>(&body) else {
        return fail(StatusCode::BAD_REQUEST, 1, "malformed register request");
    };

    let mut registry = state.registry.lock().unwrap();
    if registry.identities.contains_key(&request.id) {
        return fail(
            StatusCode::BAD_REQUEST,
            74,
            &format!("Identity '{}' is already registered", request.id),
        );
    }
    let secret = request
        .secret
        .unwrap_or_else(|| format!("{}-generated-secret", request.id));
    registry.identities.insert(
        request.id,
        Identity {
            secret: secret.clone(),
            max_enrollments: request.max_enrollments,
            enrollments: 0,
            revoked: false,
        },
    );

    ok(json!({ "secret": secret }))
}

async fn revoke(State(state): State<Arc<CaState>>, headers: HeaderMap, body: Bytes) -> Response {
    if let Some(response) = state.take_fault() {
        return response;
    }
    if state.authenticate(&headers, &body).is_none() {
        return unauthorized();
    }
    let Ok(request) = serde_json::from_slice::<RevokeBody>(&body) else {
        return fail(StatusCode::BAD_REQUEST, 1, "malformed revoke request");
    };
    if request.reason.is_empty() {
        return fail(StatusCode::BAD_REQUEST, 1, "missing reason");
    }

    let mut registry = state.registry.lock().unwrap();
    let mut revoked = Vec::new();
    if !request.id.is_empty() {
        let Some(identity) = registry.identities.get_mut(&request.id) else {
            return fail(StatusCode::NOT_FOUND, 63, "identity not found");
        };
        identity.revoked = true;
        for cert in registry.issued.iter_mut().filter(|c| c.id == request.id) {
            cert.revoked = true;
            revoked.push(json!({"Serial": cert.serial_hex, "AKI": cert.aki_hex}));
        }
    } else {
        let Some(cert) = registry
            .issued
            .iter_mut()
            .find(|c| c.serial_hex == request.serial && c.aki_hex == request.aki)
        else {
            return fail(StatusCode::NOT_FOUND, 48, "certificate not found");
        };
        cert.revoked = true;
        revoked.push(json!({"Serial": cert.serial_hex, "AKI": cert.aki_hex}));
    }

    let crl = if request.gencrl {
        let serials: Vec<&str> = registry
            .issued
            .iter()
            .filter(|c| c.revoked)
            .map(|c| c.serial_hex.as_str())
            .collect();
        let block = ::pem::Pem::new("X509 CRL", serials.join(",").into_bytes());
        STANDARD.encode(::pem::encode(&block))
    } else {
        String::new()
    };

    ok(json!({ "RevokedCerts": revoked, "CRL": crl }))
}

async fn certificates(
    State(state): State<Arc<CaState>>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    if let Some(response) = state.take_fault() {
        return response;
    }
    if state.authenticate(&headers, b"").is_none() {
        return unauthorized();
    }

    let registry = state.registry.lock().unwrap();
    let certs: Vec<Value> = registry
        .issued
        .iter()
        .filter(|c| query.get("id").map_or(true, |id| *id == c.id))
        .map(|c| json!({ "PEM": c.pem }))
        .collect();

    ok(json!({ "certs": certs }))
}

/// Subject CN of a PEM certificate.
pub fn subject(cert_pem: &str) -> String {
    subject_common_name(cert_pem).unwrap()
}
