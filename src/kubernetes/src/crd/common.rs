use std::{collections::BTreeMap, str::FromStr};

use k8s_openapi::apimachinery::pkg::apis::meta::v1::Time;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::error::{Error, UnknownValue};

pub const GROUP: &str = "lbcf.tkestack.io";

pub const SYSTEM_NAMESPACE: &str = "kube-system";
pub const SYSTEM_DRIVER_PREFIX: &str = "lbcf-";

pub const LABEL_DRIVER_DRAINING: &str = "lbcf.tkestack.io/driver-draining";
pub const LABEL_DO_NOT_DELETE: &str = "lbcf.tkestack.io/do-not-delete";
pub const LABEL_DRIVER_NAME: &str = "lbcf.tkestack.io/lb-driver";

pub const MIN_ENSURE_PERIOD_SECS: u64 = 30;

/// Namespace a driver reference made from `namespace` points to.
///
/// Names carrying the system prefix always live in the system namespace.
pub fn driver_namespace(driver_name: &str, namespace: &str) -> String {
    if driver_name.starts_with(SYSTEM_DRIVER_PREFIX) {
        SYSTEM_NAMESPACE.to_string()
    } else {
        namespace.to_string()
    }
}

pub fn is_driver_draining(labels: &BTreeMap<String, String>) -> bool {
    labels
        .get(LABEL_DRIVER_DRAINING)
        .map(|v| v.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

pub fn has_do_not_delete(labels: &BTreeMap<String, String>) -> bool {
    labels.contains_key(LABEL_DO_NOT_DELETE)
}

macro_rules! string_enum {
    ($name:ident, $field:literal, { $($variant:ident => $value:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $value),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = Error;
            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($value => Ok($name::$variant),)+
                    _ => Err(Error::UnknownValue(UnknownValue {
                        field: $field,
                        value: s.to_string(),
                    })),
                }
            }
        }
    };
}

string_enum!(EnsurePolicy, "ensurePolicy.policy", {
    IfNotSucc => "IfNotSucc",
    Always => "Always",
});

string_enum!(DeregPolicy, "deregisterPolicy", {
    IfNotReady => "IfNotReady",
    IfNotRunning => "IfNotRunning",
    Webhook => "Webhook",
});

string_enum!(FailurePolicy, "deregisterWebhook.failurePolicy", {
    DoNothing => "DoNothing",
    IfNotReady => "IfNotReady",
    IfNotRunning => "IfNotRunning",
});

string_enum!(Protocol, "protocol", {
    Tcp => "TCP",
    Udp => "UDP",
});

#[derive(Deserialize, Serialize, Clone, Default, Debug, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct EnsurePolicyConfig {
    #[serde(default)]
    pub policy: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_period: Option<String>,
}

#[derive(Deserialize, Serialize, Clone, Default, Debug, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PortSelector {
    /// Deprecated: use `port`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port_number: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub protocol: Option<String>,
}

impl PortSelector {
    /// Port after folding the deprecated `portNumber` into `port`.
    pub fn canonical_port(&self) -> i32 {
        match self.port {
            Some(p) if p != 0 => p,
            _ => self.port_number.unwrap_or(0),
        }
    }

    pub fn canonical_protocol(&self) -> String {
        match self.protocol.as_deref() {
            Some(p) if !p.is_empty() => p.to_string(),
            _ => Protocol::Tcp.to_string(),
        }
    }

    pub fn equivalent(&self, other: &PortSelector) -> bool {
        self.canonical_port() == other.canonical_port()
            && self.canonical_protocol() == other.canonical_protocol()
    }
}

#[derive(Deserialize, Serialize, Clone, Default, Debug, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SelectPodByLabel {
    #[serde(default)]
    pub selector: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub except: Option<Vec<String>>,
}

#[derive(Deserialize, Serialize, Clone, Default, Debug, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PodBackend {
    /// Deprecated: use `ports`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<PortSelector>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ports: Option<Vec<PortSelector>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub by_label: Option<SelectPodByLabel>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub by_name: Option<Vec<String>>,
}

#[derive(Deserialize, Serialize, Clone, Default, Debug, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DeregisterWebhookSpec {
    #[serde(default)]
    pub driver_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_policy: Option<String>,
}

#[derive(Deserialize, Serialize, Clone, Debug, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    pub r#type: String,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_transition_time: Option<Time>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest(
        driver,
        namespace,
        expected,
        case("lbcf-clb", "default", "kube-system"),
        case("my-driver", "default", "default"),
        case("lbcf", "team-a", "team-a"),
    )]
    fn test_driver_namespace(driver: &str, namespace: &str, expected: &str) {
        assert_eq!(driver_namespace(driver, namespace), expected);
    }

    #[rstest(
        value,
        expected,
        case(Some("true"), true),
        case(Some("TRUE"), true),
        case(Some("false"), false),
        case(Some(""), false),
        case(None, false),
    )]
    fn test_is_driver_draining(value: Option<&str>, expected: bool) {
        let mut labels = BTreeMap::new();
        if let Some(v) = value {
            labels.insert(LABEL_DRIVER_DRAINING.to_string(), v.to_string());
        }
        assert_eq!(is_driver_draining(&labels), expected);
    }

    #[test]
    fn test_string_enums() {
        assert_eq!(DeregPolicy::from_str("Webhook").unwrap(), DeregPolicy::Webhook);
        assert!(DeregPolicy::from_str("webhook").is_err());
        assert_eq!(Protocol::Udp.to_string(), "UDP");
        assert_eq!(EnsurePolicy::ALL.len(), 2);
    }

    #[rstest(
        port,
        expected_port,
        expected_protocol,
        case(PortSelector { port_number: Some(80), port: None, protocol: None }, 80, "TCP"),
        case(PortSelector { port_number: Some(80), port: Some(8080), protocol: Some("UDP".to_string()) }, 8080, "UDP"),
        case(PortSelector { port_number: Some(80), port: Some(0), protocol: Some(String::new()) }, 80, "TCP"),
        case(PortSelector::default(), 0, "TCP"),
    )]
    fn test_port_selector_canonical(port: PortSelector, expected_port: i32, expected_protocol: &str) {
        assert_eq!(port.canonical_port(), expected_port);
        assert_eq!(port.canonical_protocol(), expected_protocol);
    }
}
