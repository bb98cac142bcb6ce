use std::{fs::File, io::BufReader};

use rustls::{Certificate, PrivateKey};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("std::io::Error: {0}")]
    StdIo(#[from] std::io::Error),

    #[error("no certificate found in {0}")]
    NoCertificate(String),

    #[error("no PKCS8-encoded private key found in {0}")]
    NoPrivateKey(String),

    #[error("more than one PKCS8-encoded private key found in {0}")]
    TooManyPrivateKeys(String),
}

pub fn load_certificates_from_pem(path: &str) -> Result<Vec<Certificate>, Error> {
    let file = File::open(path)?;
    let mut reader = BufReader::new(file);

    let certs = rustls_pemfile::certs(&mut reader)?;
    if certs.is_empty() {
        return Err(Error::NoCertificate(path.to_string()));
    }

    Ok(certs.into_iter().map(Certificate).collect())
}

pub fn load_private_key_from_file(path: &str) -> Result<PrivateKey, Error> {
    let file = File::open(path)?;
    let mut reader = BufReader::new(file);

    let mut keys = rustls_pemfile::pkcs8_private_keys(&mut reader)?;

    match keys.len() {
        0 => Err(Error::NoPrivateKey(path.to_string())),
        1 => Ok(PrivateKey(keys.remove(0))),
        _ => Err(Error::TooManyPrivateKeys(path.to_string())),
    }
}
