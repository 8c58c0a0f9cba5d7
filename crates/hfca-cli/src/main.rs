//! hfca - command line client for a certificate authority.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use hfca_client::{
    CaClient, ClientConfig, EnrollmentRequest, ReenrollmentRequest, RegistrationAttribute,
    RegistrationRequest, RevocationReason, RevocationRequest, RevokeTarget,
};
use hfca_crypto::{certificate_info, AttributeRequest, CryptoConfig, SecurityLevel};
use hfca_wallet::{Wallet, X509Identity};

/// hfca - certificate authority identity client
#[derive(Parser)]
#[command(name = "hfca")]
#[command(about = "Enroll, register and revoke identities with a certificate authority", long_about = None)]
struct Cli {
    /// CA endpoint
    #[arg(short, long, default_value = "http://localhost:7054")]
    url: String,

    /// CA name, when the server hosts more than one
    #[arg(long)]
    ca_name: Option<String>,

    /// PEM bundle of trusted TLS roots
    #[arg(long)]
    tls_ca_certs: Option<PathBuf>,

    /// Key size: 256 (P-256) or 384 (P-384)
    #[arg(long, default_value_t = 256)]
    security_level: u16,

    /// Wallet directory
    #[arg(long, default_value = "wallet")]
    wallet: PathBuf,

    /// MSP ID recorded with stored identities
    #[arg(long, default_value = "Org1MSP")]
    msp_id: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show CA information
    Cainfo,

    /// Enroll an identity and store it in the wallet
    Enroll {
        #[arg(long)]
        id: String,

        #[arg(long)]
        secret: String,

        /// Use this PEM CSR instead of generating a key (identity is not stored)
        #[arg(long)]
        csr: Option<PathBuf>,

        /// Signing profile
        #[arg(long)]
        profile: Option<String>,

        /// Attribute to request, NAME or NAME:opt
        #[arg(long = "attr-req")]
        attr_reqs: Vec<String>,

        /// Wallet label (defaults to the id)
        #[arg(long)]
        label: Option<String>,
    },

    /// Renew the certificate of a stored identity
    Reenroll {
        #[arg(long)]
        label: String,

        /// Attribute to request, NAME or NAME:opt
        #[arg(long = "attr-req")]
        attr_reqs: Vec<String>,
    },

    /// Register a new identity
    Register {
        /// Wallet label of the registrar
        #[arg(long)]
        registrar: String,

        #[arg(long)]
        id: String,

        #[arg(long)]
        secret: Option<String>,

        /// 0 uses the CA default, -1 is unlimited
        #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
        max_enrollments: i32,

        /// Attribute, NAME=VALUE or NAME=VALUE:ecert
        #[arg(long = "attr")]
        attrs: Vec<String>,

        /// Identity type, e.g. client or peer
        #[arg(long = "type")]
        role: Option<String>,

        #[arg(long, default_value = "")]
        affiliation: String,
    },

    /// Revoke an identity or a certificate
    Revoke {
        /// Wallet label of the registrar
        #[arg(long)]
        registrar: String,

        /// Revoke this identity and all its certificates
        #[arg(long, conflicts_with_all = ["aki", "serial", "cert"])]
        id: Option<String>,

        /// Authority key identifier (hex) of the certificate
        #[arg(long, requires = "serial", conflicts_with = "cert")]
        aki: Option<String>,

        /// Serial number (hex) of the certificate
        #[arg(long, requires = "aki", conflicts_with = "cert")]
        serial: Option<String>,

        /// Revoke the certificate in this PEM file
        #[arg(long)]
        cert: Option<PathBuf>,

        #[arg(long, default_value = "unspecified")]
        reason: RevocationReason,

        /// Return an updated CRL
        #[arg(long)]
        gencrl: bool,
    },

    /// List certificates known to the CA
    Certificates {
        /// Wallet label of the registrar
        #[arg(long)]
        registrar: String,

        /// Only certificates of this identity
        #[arg(long)]
        id: Option<String>,
    },

    /// Manage wallet identities
    #[command(subcommand)]
    Identities(IdentityCommands),
}

#[derive(Subcommand)]
enum IdentityCommands {
    /// List stored identities
    List,

    /// Show a stored identity
    Show { label: String },

    /// Remove a stored identity
    Remove { label: String },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("hfca=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    run(Cli::parse()).await
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {

    if let Commands::Identities(command) = &cli.command {
        let wallet = Wallet::open(&cli.wallet).await?;
        return identities(&wallet, command).await;
    }
    let wallet_dir = cli.wallet.clone();

    let level = SecurityLevel::try_from(cli.security_level)?;
    let mut config = ClientConfig::new(&cli.url).with_crypto(CryptoConfig::for_level(level));
    if let Some(name) = &cli.ca_name {
        config = config.with_ca_name(name);
    }
    if let Some(path) = &cli.tls_ca_certs {
        config = config.with_tls_ca_certs(path);
    }
    let client = CaClient::new(config)?;

    match cli.command {
        Commands::Cainfo => cainfo(&client).await?,
        Commands::Enroll {
            id,
            secret,
            csr,
            profile,
            attr_reqs,
            label,
        } => {
            let mut request = EnrollmentRequest::new(&id, secret);
            if let Some(path) = csr {
                request = request.with_csr(std::fs::read_to_string(path)?);
            }
            if let Some(profile) = profile {
                request = request.with_profile(profile);
            }
            for attr_req in &attr_reqs {
                request = request.with_attr_req(parse_attr_req(attr_req));
            }

            let enrollment = client.enroll(&request).await?;
            if enrollment.key_pair().is_none() {
                warn!("Key is managed externally; identity not stored");
                println!("{}", enrollment.cert());
            } else {
                let label = label.unwrap_or(id);
                let wallet = Wallet::open(&wallet_dir).await?;
                let identity = X509Identity::from_enrollment(&enrollment, &cli.msp_id)?;
                wallet.put(&label, &identity).await?;
                println!("Enrolled and stored as '{}'", label);
            }
        }
        Commands::Reenroll { label, attr_reqs } => {
            let wallet = Wallet::open(&wallet_dir).await?;
            let current = wallet.get(&label).await?;
            let mut request = ReenrollmentRequest::default();
            for attr_req in &attr_reqs {
                request = request.with_attr_req(parse_attr_req(attr_req));
            }

            let enrollment = client.reenroll(&current.to_enrollment()?, &request).await?;
            let identity = X509Identity::from_enrollment(&enrollment, &current.msp_id)?;
            wallet.put(&label, &identity).await?;
            println!("Reenrolled '{}'", label);
        }
        Commands::Register {
            registrar,
            id,
            secret,
            max_enrollments,
            attrs,
            role,
            affiliation,
        } => {
            let registrar = Wallet::open(&wallet_dir)
                .await?
                .get(&registrar)
                .await?
                .to_enrollment()?;
            let mut request = RegistrationRequest::new(&id)
                .with_max_enrollments(max_enrollments)
                .with_affiliation(affiliation);
            if let Some(secret) = secret {
                request = request.with_secret(secret);
            }
            if let Some(role) = role {
                request = request.with_role(role);
            }
            for attr in &attrs {
                request = request.with_attr(parse_attr(attr)?);
            }

            let secret = client.register(&request, &registrar).await?;
            println!("Registered '{}' with secret: {}", id, secret);
        }
        Commands::Revoke {
            registrar,
            id,
            aki,
            serial,
            cert,
            reason,
            gencrl,
        } => {
            let target = match (id, aki, serial, cert) {
                (Some(id), None, None, None) => RevokeTarget::ById(id),
                (None, Some(aki), Some(serial), None) => RevokeTarget::ByCertificate { aki, serial },
                (None, None, None, Some(path)) => {
                    RevokeTarget::from_certificate(&std::fs::read_to_string(path)?)?
                }
                _ => return Err("specify --id, --aki with --serial, or --cert".into()),
            };
            let registrar = Wallet::open(&wallet_dir)
                .await?
                .get(&registrar)
                .await?
                .to_enrollment()?;
            let request = RevocationRequest::new(target)
                .with_reason(reason)
                .with_gen_crl(gencrl);

            let revocation = client.revoke(&request, &registrar).await?;
            println!("Revoked certificates ({}):", revocation.revoked.len());
            println!("{:<42}  {}", "SERIAL", "AKI");
            for revoked in &revocation.revoked {
                println!("{:<42}  {}", revoked.serial, revoked.aki);
            }
            if let Some(crl) = revocation.crl {
                println!("CRL (base64): {}", crl);
            }
        }
        Commands::Certificates { registrar, id } => {
            let registrar = Wallet::open(&wallet_dir)
                .await?
                .get(&registrar)
                .await?
                .to_enrollment()?;
            let certs = client.certificates(&registrar, id.as_deref()).await?;
            info!(count = certs.len(), "Listed certificates");
            for cert in certs {
                println!("{}", cert);
            }
        }
        Commands::Identities(_) => {}
    }

    Ok(())
}

async fn cainfo(client: &CaClient) -> Result<(), Box<dyn std::error::Error>> {
    let info = client.ca_info().await?;
    println!("  Name:       {}", info.ca_name);
    println!("  Version:    {}", info.version);
    println!("  Chain:");
    println!("{}", info.ca_chain);
    Ok(())
}

async fn identities(
    wallet: &Wallet,
    command: &IdentityCommands,
) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        IdentityCommands::List => {
            let labels = wallet.list().await?;
            println!("Identities ({}):", labels.len());
            for label in labels {
                println!("  {}", label);
            }
        }
        IdentityCommands::Show { label } => {
            let identity = wallet.get(label).await?;
            let cert = certificate_info(&identity.certificate)?;
            println!("  Label:      {}", label);
            println!("  MSP ID:     {}", identity.msp_id);
            println!("  Subject:    {}", cert.subject_cn);
            println!("  Serial:     {}", cert.serial_hex);
            if let Some(aki) = &cert.authority_key_id_hex {
                println!("  AKI:        {}", aki);
            }
            println!("  Expires:    {}", cert.not_after.format("%Y-%m-%d %H:%M:%S UTC"));
        }
        IdentityCommands::Remove { label } => {
            wallet.remove(label).await?;
            println!("Removed '{}'", label);
        }
    }
    Ok(())
}

/// `NAME` or `NAME:opt`.
fn parse_attr_req(spec: &str) -> AttributeRequest {
    match spec.strip_suffix(":opt") {
        Some(name) => AttributeRequest::new(name).optional(true),
        None => AttributeRequest::new(spec),
    }
}

/// `NAME=VALUE` or `NAME=VALUE:ecert`.
fn parse_attr(spec: &str) -> Result<RegistrationAttribute, String> {
    let (name, value) = spec
        .split_once('=')
        .ok_or_else(|| format!("attribute '{}' must be NAME=VALUE", spec))?;
    Ok(match value.strip_suffix(":ecert") {
        Some(value) => RegistrationAttribute::new(name, value).include_in_cert(true),
        None => RegistrationAttribute::new(name, value),
    })
}
