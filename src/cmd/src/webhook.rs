use clap::Parser;
use lbcfd_kubernetes::webhook::config::Config;

#[derive(Debug, Clone, Parser)]
pub struct WebhookCmd {
    #[arg(long = "http-port", help = "HTTP server serving port [default: 8080]")]
    pub http_port: Option<u32>,

    #[arg(long = "https-port", help = "HTTPS server serving port [default: 8443]")]
    pub https_port: Option<u32>,

    #[arg(short = 'f', long, help = "Config file path for admission webhook server")]
    pub file: Option<String>,

    #[arg(long = "tls-cert", help = "path to TLS Certificate for admission webhook server")]
    pub tls_cert: Option<String>,

    #[arg(long = "tls-key", help = "path to TLS Key for admission webhook server")]
    pub tls_key: Option<String>,
}

impl WebhookCmd {
    /// Overrides `config` with the flags given on the command line.
    pub fn merge(self, mut config: Config) -> Config {
        config.http_port = self.http_port.unwrap_or(config.http_port);
        config.https_port = self.https_port.unwrap_or(config.https_port);
        if let Some(cert) = self.tls_cert {
            config.tls.cert = cert;
        }
        if let Some(key) = self.tls_key {
            config.tls.key = key;
        }
        config
    }
}
