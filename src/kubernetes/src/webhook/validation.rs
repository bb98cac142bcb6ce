//! Structural checks on candidate objects.
//!
//! Every rule reports into an [`ErrorList`] of path-qualified [`FieldError`]s. Nothing here
//! looks anything up or calls a driver.

pub mod backend_group;
pub mod backend_record;
pub mod bind;
pub mod common;
pub mod load_balancer;
pub mod load_balancer_driver;

use std::fmt;

/// Dotted path to a field, such as `spec.webhooks[2].timeout`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldPath(String);

impl FieldPath {
    pub fn new(root: &str) -> Self {
        Self(root.to_string())
    }

    pub fn child(&self, name: &str) -> Self {
        Self(format!("{}.{name}", self.0))
    }

    pub fn index(&self, i: usize) -> Self {
        Self(format!("{}[{i}]", self.0))
    }

    pub fn key(&self, key: &str) -> Self {
        Self(format!("{}[{key}]", self.0))
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Required,
    Invalid,
    Forbidden,
    Duplicate,
    NotSupported,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub kind: ErrorKind,
    pub path: FieldPath,
    pub value: Option<String>,
    pub detail: String,
}

impl FieldError {
    pub fn required(path: FieldPath, detail: &str) -> Self {
        Self {
            kind: ErrorKind::Required,
            path,
            value: None,
            detail: detail.to_string(),
        }
    }

    pub fn invalid(path: FieldPath, value: impl fmt::Display, detail: &str) -> Self {
        Self {
            kind: ErrorKind::Invalid,
            path,
            value: Some(value.to_string()),
            detail: detail.to_string(),
        }
    }

    pub fn forbidden(path: FieldPath, detail: &str) -> Self {
        Self {
            kind: ErrorKind::Forbidden,
            path,
            value: None,
            detail: detail.to_string(),
        }
    }

    pub fn duplicate(path: FieldPath, value: impl fmt::Display) -> Self {
        Self {
            kind: ErrorKind::Duplicate,
            path,
            value: Some(value.to_string()),
            detail: String::new(),
        }
    }

    pub fn not_supported<S: AsRef<str>>(
        path: FieldPath,
        value: impl fmt::Display,
        supported: &[S],
    ) -> Self {
        let detail = supported
            .iter()
            .map(|s| format!("{:?}", s.as_ref()))
            .collect::<Vec<_>>()
            .join(", ");
        Self {
            kind: ErrorKind::NotSupported,
            path,
            value: Some(value.to_string()),
            detail: format!("supported values: {detail}"),
        }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.kind {
            ErrorKind::Required => "Required value",
            ErrorKind::Invalid => "Invalid value",
            ErrorKind::Forbidden => "Forbidden",
            ErrorKind::Duplicate => "Duplicate value",
            ErrorKind::NotSupported => "Unsupported value",
        };
        write!(f, "{}: {kind}", self.path)?;
        if let Some(value) = &self.value {
            write!(f, ": {value:?}")?;
        }
        if !self.detail.is_empty() {
            write!(f, ": {}", self.detail)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorList(Vec<FieldError>);

impl ErrorList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, err: FieldError) {
        self.0.push(err);
    }

    pub fn extend(&mut self, other: ErrorList) {
        self.0.extend(other.0);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldError> {
        self.0.iter()
    }

    pub fn into_result(self) -> Result<(), ErrorList> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for ErrorList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msgs: Vec<String> = self.0.iter().map(|e| e.to_string()).collect();
        write!(f, "{}", msgs.join("; "))
    }
}

impl FromIterator<FieldError> for ErrorList {
    fn from_iter<T: IntoIterator<Item = FieldError>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}
