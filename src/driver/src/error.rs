use std::time::Duration;

use thiserror::Error;

/// Failures to get an answer out of a driver.
///
/// None of these is a driver judgement; a driver that answers `succ=false` or `status=Fail`
/// produces a successful call.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid driver url {url}: {message}")]
    InvalidUrl { url: String, message: String },

    #[error("call to {url} timed out after {timeout:?}")]
    Timeout { url: String, timeout: Duration },

    #[error("failed to call {url}: {message}")]
    Transport { url: String, message: String },

    #[error("{url} responded with HTTP {status}: {body}")]
    UnexpectedStatus {
        url: String,
        status: u16,
        body: String,
    },

    #[error("malformed driver response: {0}")]
    Decode(#[source] serde_json::Error),

    #[error("failed to encode driver request: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("failed to build http client: {0}")]
    Client(#[source] reqwest::Error),
}

impl Error {
    pub fn reason(&self) -> &'static str {
        match self {
            Error::InvalidUrl { .. } => "invalid_url",
            Error::Timeout { .. } => "timeout",
            Error::Transport { .. } => "transport",
            Error::UnexpectedStatus { .. } => "unexpected_status",
            Error::Decode(_) => "decode",
            Error::Encode(_) => "encode",
            Error::Client(_) => "client",
        }
    }
}
