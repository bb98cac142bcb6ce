use std::fs;

use lbcfd_cert::constants::{DEFAULT_TLS_CERT, DEFAULT_TLS_KEY};
use serde::{Deserialize, Serialize};

use super::error::ServerError;

pub const DEFAULT_HTTP_PORT: u32 = 8080;
pub const DEFAULT_HTTPS_PORT: u32 = 8443;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Tls {
    pub cert: String,
    pub key: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub http_port: u32,
    pub https_port: u32,
    pub tls: Tls,
}

impl Config {
    pub fn load(file: &str) -> Result<Self, ServerError> {
        let contents = fs::read_to_string(file).map_err(ServerError::StdIo)?;
        serde_yaml::from_str(&contents).map_err(ServerError::Config)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            http_port: DEFAULT_HTTP_PORT,
            https_port: DEFAULT_HTTPS_PORT,
            tls: Tls {
                cert: DEFAULT_TLS_CERT.to_string(),
                key: DEFAULT_TLS_KEY.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config() {
        let config: Config = serde_yaml::from_str("https_port: 9443\n").unwrap();
        assert_eq!(config.https_port, 9443);
        assert_eq!(config.http_port, DEFAULT_HTTP_PORT);
        assert_eq!(config.tls.cert, DEFAULT_TLS_CERT);
    }

    #[test]
    fn test_full_config() {
        let config: Config = serde_yaml::from_str(
            "http_port: 18080\nhttps_port: 18443\ntls:\n  cert: /tmp/tls.cert\n  key: /tmp/tls.key\n",
        )
        .unwrap();
        assert_eq!(
            config,
            Config {
                http_port: 18080,
                https_port: 18443,
                tls: Tls {
                    cert: "/tmp/tls.cert".to_string(),
                    key: "/tmp/tls.key".to_string(),
                },
            }
        );
    }

    #[test]
    fn test_load_missing_file() {
        assert!(matches!(
            Config::load("/nonexistent/lbcfd.yaml"),
            Err(ServerError::StdIo(_))
        ));
    }
}
