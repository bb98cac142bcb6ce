use std::{fs::File, io::Write, ops::Add, path::Path};

use clap::Parser;
use lbcfd_cert::constants::DEFAULT_WEBHOOK_SERVICE_HOST;
use rcgen::{Certificate, CertificateParams, ExtendedKeyUsagePurpose, KeyUsagePurpose};
use time::{Duration, OffsetDateTime};

const DEFAULT_OUTPUT_DIR: &str = ".";
const VALIDITY_DAYS: i64 = 36500;

#[derive(Parser)]
struct Args {
    /// TLS hostname
    #[arg(long, default_value = DEFAULT_WEBHOOK_SERVICE_HOST)]
    host: String,

    #[arg(long, default_value = DEFAULT_OUTPUT_DIR)]
    out_dir: String,
}

fn main() -> anyhow::Result<()> {
    println!("Generate certificate and key files");

    let arg = Args::parse();

    let mut params = CertificateParams::new(vec![arg.host]);
    params.not_before = OffsetDateTime::now_utc();
    params.not_after = OffsetDateTime::now_utc().add(Duration::days(VALIDITY_DAYS));
    params.key_usages = vec![
        KeyUsagePurpose::DigitalSignature,
        KeyUsagePurpose::KeyEncipherment,
    ];
    params.extended_key_usages = vec![ExtendedKeyUsagePurpose::ServerAuth];

    let cert = Certificate::from_params(params)?;

    let out_dir = Path::new(&arg.out_dir);
    File::create(out_dir.join("tls.cert"))?.write_all(cert.serialize_pem()?.as_bytes())?;
    File::create(out_dir.join("tls.key"))?.write_all(cert.serialize_private_key_pem().as_bytes())?;

    Ok(())
}
