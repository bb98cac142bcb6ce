use kube::core::admission::SerializePatchError;
use lbcfd_trace::error::TraceableError;
use thiserror::Error;

use super::validation::ErrorList;

/// Reasons an admission request is denied.
///
/// The `Display` output is the denial message returned to the API server.
#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to decode {kind}: {message}")]
    Decode { kind: String, message: String },

    #[error("{0}")]
    Validation(ErrorList),

    #[error("{0}")]
    ImmutableField(ErrorList),

    #[error("driver {namespace}/{name} not found")]
    DriverNotFound { namespace: String, name: String },

    #[error("driver {0} is draining")]
    DriverDraining(String),

    #[error("driver {0} is deleting")]
    DriverDeleting(String),

    #[error("failed to call {webhook} of driver {driver}: {source}")]
    WebhookTransport {
        driver: String,
        webhook: String,
        #[source]
        source: lbcfd_driver::error::Error,
    },

    #[error("{webhook} of driver {driver} denied the request: {message}")]
    WebhookDenied {
        driver: String,
        webhook: String,
        message: String,
    },

    #[error("failed to look up {kind}: {source}")]
    Lookup {
        kind: String,
        #[source]
        source: kube::Error,
    },

    #[error("{}", .0.iter().map(|e| e.to_string()).collect::<Vec<_>>().join("; "))]
    Aggregate(Vec<Error>),

    #[error("{0}")]
    Forbidden(String),

    #[error("kind {actual} is not served here, expected {expected}")]
    KindMismatch { expected: String, actual: String },

    #[error("SerializePatchError: {0}")]
    SerializePatch(#[source] SerializePatchError),

    #[error("failed to apply patch: {0}")]
    Patch(#[source] json_patch::PatchError),

    #[error("CRD Error: {0}")]
    Crd(#[source] crate::crd::error::Error),
}

impl Error {
    /// Collapses a list of failures; a single failure is returned as is.
    pub fn aggregate(mut errs: Vec<Error>) -> Option<Error> {
        match errs.len() {
            0 => None,
            1 => errs.pop(),
            _ => Some(Error::Aggregate(errs)),
        }
    }
}

impl TraceableError for Error {
    fn metric_label(&self) -> String {
        match self {
            Error::Decode { .. } => "decode",
            Error::Validation(_) => "validation",
            Error::ImmutableField(_) => "immutable_field",
            Error::DriverNotFound { .. } => "driver_not_found",
            Error::DriverDraining(_) => "driver_draining",
            Error::DriverDeleting(_) => "driver_deleting",
            Error::WebhookTransport { .. } => "webhook_transport",
            Error::WebhookDenied { .. } => "webhook_denied",
            Error::Lookup { .. } => "lookup",
            Error::Aggregate(_) => "aggregate",
            Error::Forbidden(_) => "forbidden",
            Error::KindMismatch { .. } => "kind_mismatch",
            Error::SerializePatch(_) => "serialize_patch",
            Error::Patch(_) => "patch",
            Error::Crd(_) => "crd",
        }
        .to_string()
    }
}

/// Failures to bring the admission server up.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("std::io::Error: {0}")]
    StdIo(#[from] std::io::Error),

    #[error("failed to load config: {0}")]
    Config(#[source] serde_yaml::Error),

    #[error("certificate error: {0}")]
    Cert(#[source] lbcfd_cert::util::Error),

    #[error("TLS error: {0}")]
    Tls(#[source] rustls::Error),

    #[error("Kube Error: {0}")]
    Kube(#[source] kube::Error),

    #[error("Driver client error: {0}")]
    Driver(#[source] lbcfd_driver::error::Error),

    #[error("Metrics error: {0}")]
    Metrics(#[source] prometheus::Error),

    #[error("Trace error: {0}")]
    Trace(#[source] lbcfd_trace::error::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::webhook::validation::{FieldError, FieldPath};

    #[test]
    fn test_aggregate_message() {
        let errs = vec![
            Error::DriverDraining("kube-system/lbcf-a".to_string()),
            Error::WebhookDenied {
                driver: "lbcf-b".to_string(),
                webhook: "validateBackend".to_string(),
                message: "bad port".to_string(),
            },
        ];
        let err = Error::aggregate(errs).unwrap();
        assert_eq!(
            err.to_string(),
            "driver kube-system/lbcf-a is draining; validateBackend of driver lbcf-b denied the request: bad port"
        );
        assert_eq!(err.metric_label(), "aggregate");
    }

    #[test]
    fn test_aggregate_single_and_empty() {
        assert!(Error::aggregate(vec![]).is_none());
        let err = Error::aggregate(vec![Error::Forbidden("no".to_string())]).unwrap();
        assert!(matches!(err, Error::Forbidden(_)));
    }

    #[test]
    fn test_validation_message() {
        let errs: ErrorList = [FieldError::required(
            FieldPath::new("spec").child("lbDriver"),
            "",
        )]
        .into_iter()
        .collect();
        assert_eq!(
            Error::Validation(errs).to_string(),
            "spec.lbDriver: Required value"
        );
    }
}
