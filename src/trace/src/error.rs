use thiserror::Error;

pub trait TraceableError: std::error::Error {
    fn metric_label(&self) -> String;
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("std::io::Error: {0}")]
    StdIo(#[source] std::io::Error),

    #[error("invalid log level: {0}")]
    InvalidLevel(String),

    #[error("failed to initialize subscriber: {0}")]
    Init(String),
}
