use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownValue {
    pub field: &'static str,
    pub value: String,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("unsupported value {:?} for {}", .0.value, .0.field)]
    UnknownValue(UnknownValue),

    #[error("invalid driver endpoint: {0}")]
    Endpoint(String),
}
