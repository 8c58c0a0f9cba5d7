//! hfca client library
//!
//! Talks to a certificate authority over its REST API: enrollment,
//! reenrollment, registration, revocation and certificate listing.
//! Privileged requests are authorized with a token signed by the
//! registrar's enrollment key.

pub mod client;
pub mod config;
pub mod enrollment;
pub mod error;
pub mod messages;
pub mod token;
pub mod transport;
pub mod types;

pub use client::CaClient;
pub use config::ClientConfig;
pub use enrollment::{Enrollment, EnrollmentKey};
pub use error::{ClientError, TransportError};
pub use token::{build_auth_token, verify_auth_token};
pub use types::{
    CaInfo, EnrollmentRequest, ReenrollmentRequest, RegistrationAttribute, RegistrationRequest,
    Revocation, RevocationReason, RevocationRequest, RevokeTarget, RevokedCertificate,
};
