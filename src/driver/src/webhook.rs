use std::{str::FromStr, time::Duration};

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_WEBHOOK_TIMEOUT: Duration = Duration::from_secs(10);
pub const MAX_WEBHOOK_TIMEOUT: Duration = Duration::from_secs(60);

/// Default timeout as it is written into driver objects.
pub const DEFAULT_WEBHOOK_TIMEOUT_STR: &str = "10s";

/// Webhooks every driver must serve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Webhook {
    #[serde(rename = "validateLoadBalancer")]
    ValidateLoadBalancer,
    #[serde(rename = "createLoadBalancer")]
    CreateLoadBalancer,
    #[serde(rename = "ensureLoadBalancer")]
    EnsureLoadBalancer,
    #[serde(rename = "deleteLoadBalancer")]
    DeleteLoadBalancer,
    #[serde(rename = "validateBackend")]
    ValidateBackend,
    #[serde(rename = "generateBackendAddr")]
    GenerateBackendAddr,
    #[serde(rename = "ensureBackendRegistered")]
    EnsureBackendRegistered,
    #[serde(rename = "ensureBackendDeregistered")]
    EnsureBackendDeregistered,
}

impl Webhook {
    pub const ALL: [Webhook; 8] = [
        Webhook::ValidateLoadBalancer,
        Webhook::CreateLoadBalancer,
        Webhook::EnsureLoadBalancer,
        Webhook::DeleteLoadBalancer,
        Webhook::ValidateBackend,
        Webhook::GenerateBackendAddr,
        Webhook::EnsureBackendRegistered,
        Webhook::EnsureBackendDeregistered,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Webhook::ValidateLoadBalancer => "validateLoadBalancer",
            Webhook::CreateLoadBalancer => "createLoadBalancer",
            Webhook::EnsureLoadBalancer => "ensureLoadBalancer",
            Webhook::DeleteLoadBalancer => "deleteLoadBalancer",
            Webhook::ValidateBackend => "validateBackend",
            Webhook::GenerateBackendAddr => "generateBackendAddr",
            Webhook::EnsureBackendRegistered => "ensureBackendRegistered",
            Webhook::EnsureBackendDeregistered => "ensureBackendDeregistered",
        }
    }
}

impl std::fmt::Display for Webhook {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown webhook name: {0}")]
pub struct UnknownWebhook(pub String);

impl FromStr for Webhook {
    type Err = UnknownWebhook;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Webhook::ALL
            .iter()
            .find(|w| w.as_str() == s)
            .copied()
            .ok_or_else(|| UnknownWebhook(s.to_string()))
    }
}

const DURATION_UNITS: [&str; 6] = ["ns", "us", "ms", "s", "m", "h"];

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("invalid duration {0:?}: expected numbers with units ns, us, ms, s, m or h such as 1m30s")]
pub struct InvalidDuration(pub String);

/// Parses a Go style duration such as `10s`, `1m30s` or `500ms`.
///
/// Webhook timeouts, ensure periods and resync periods all go through here.
pub fn parse_duration(s: &str) -> Result<Duration, InvalidDuration> {
    let s = s.trim();
    if s == "0" {
        return Ok(Duration::ZERO);
    }
    if !is_go_duration(s) {
        return Err(InvalidDuration(s.to_string()));
    }
    humantime::parse_duration(s).map_err(|_| InvalidDuration(s.to_string()))
}

// `[0-9]+(\.[0-9]*)?<unit>` repeated, nothing else
fn is_go_duration(s: &str) -> bool {
    let mut rest = s;
    if rest.is_empty() {
        return false;
    }
    while !rest.is_empty() {
        let int_len = rest.find(|c: char| !c.is_ascii_digit()).unwrap_or(rest.len());
        if int_len == 0 {
            return false;
        }
        rest = &rest[int_len..];
        if let Some(frac) = rest.strip_prefix('.') {
            rest = frac.trim_start_matches(|c: char| c.is_ascii_digit());
        }
        // longest unit wins, so "ms" is never read as "m"
        match DURATION_UNITS
            .iter()
            .filter(|u| rest.starts_with(*u))
            .max_by_key(|u| u.len())
        {
            Some(unit) => rest = &rest[unit.len()..],
            None => return false,
        }
    }
    true
}
