use clap::{Parser, Subcommand, ValueEnum};

use lbcfd_kubernetes::webhook::{config::Config, error::ServerError, server};
use lbcfd_trace::init::TraceConfig;

use crate::webhook::WebhookCmd;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cmd {
    #[arg(
        short,
        long,
        global = true,
        required = false,
        default_value = "info",
        help = "Log level(trace, debug, info, warn, error)"
    )]
    pub level: String,

    #[arg(
        value_enum,
        short = 'd',
        long,
        global = true,
        required = false,
        default_value = "plain",
        help = "Log display format"
    )]
    pub format: Format,

    #[arg(short = 'o', long = "log-file", help = "Log output file path")]
    pub log_file: Option<String>,

    #[clap(subcommand)]
    pub sub: SubCmd,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Format {
    Plain,
    Json,
}

impl std::fmt::Display for Format {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Format::Plain => write!(f, "plain"),
            Format::Json => write!(f, "json"),
        }
    }
}

#[derive(Debug, Clone, Subcommand)]
pub enum SubCmd {
    /// Serve the admission webhooks
    Webhook(WebhookCmd),
    Version,
}

pub fn run() -> Result<(), ServerError> {
    let command = Cmd::parse();

    match command.sub {
        SubCmd::Version => println!("{}", env!("CARGO_PKG_VERSION")),
        SubCmd::Webhook(w) => {
            let trace_conf = TraceConfig {
                level: command.level,
                format: command.format.to_string(),
                file: command.log_file,
            };
            let config = match &w.file {
                None => Config::default(),
                Some(file) => Config::load(file)?,
            };

            server::start(w.merge(config), trace_conf)?;
        }
    }
    Ok(())
}
