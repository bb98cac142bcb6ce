use std::{collections::BTreeMap, str::FromStr, time::Duration};

use lbcfd_driver::webhook::parse_duration;
use once_cell::sync::Lazy;
use regex::Regex;

use super::{ErrorList, FieldError, FieldPath};
use crate::crd::common::{
    DeregPolicy, DeregisterWebhookSpec, EnsurePolicy, EnsurePolicyConfig, FailurePolicy,
    PodBackend, PortSelector, Protocol, MIN_ENSURE_PERIOD_SECS,
};

const MAX_LABEL_NAME_LEN: usize = 63;
const MAX_LABEL_PREFIX_LEN: usize = 253;

static QUALIFIED_NAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([A-Za-z0-9][-A-Za-z0-9_.]*)?[A-Za-z0-9]$").expect("valid qualified name regex")
});

static DNS_SUBDOMAIN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-z0-9]([-a-z0-9]*[a-z0-9])?(\.[a-z0-9]([-a-z0-9]*[a-z0-9])?)*$")
        .expect("valid dns subdomain regex")
});

pub fn is_label_key(key: &str) -> bool {
    let name = match key.split_once('/') {
        Some((prefix, name)) => {
            if prefix.is_empty()
                || prefix.len() > MAX_LABEL_PREFIX_LEN
                || !DNS_SUBDOMAIN.is_match(prefix)
            {
                return false;
            }
            name
        }
        None => key,
    };
    !name.is_empty() && name.len() <= MAX_LABEL_NAME_LEN && QUALIFIED_NAME.is_match(name)
}

pub fn is_label_value(value: &str) -> bool {
    value.is_empty() || (value.len() <= MAX_LABEL_NAME_LEN && QUALIFIED_NAME.is_match(value))
}

pub fn validate_label_selector(selector: &BTreeMap<String, String>, path: &FieldPath) -> ErrorList {
    let mut errs = ErrorList::new();
    if selector.is_empty() {
        errs.push(FieldError::required(path.clone(), "selector must not be empty"));
        return errs;
    }
    for (key, value) in selector {
        if !is_label_key(key) {
            errs.push(FieldError::invalid(
                path.key(key),
                key,
                "must be a valid label key",
            ));
        }
        if !is_label_value(value) {
            errs.push(FieldError::invalid(
                path.key(key),
                value,
                "must be a valid label value",
            ));
        }
    }
    errs
}

pub fn validate_ensure_policy(policy: Option<&EnsurePolicyConfig>, path: &FieldPath) -> ErrorList {
    let mut errs = ErrorList::new();
    let Some(policy) = policy else {
        return errs;
    };
    match EnsurePolicy::from_str(&policy.policy) {
        Ok(EnsurePolicy::IfNotSucc) => {
            if policy.min_period.is_some() {
                errs.push(FieldError::forbidden(
                    path.child("minPeriod"),
                    "minPeriod is only allowed when policy is Always",
                ));
            }
        }
        Ok(EnsurePolicy::Always) => {
            if let Some(period) = &policy.min_period {
                match parse_duration(period) {
                    Ok(d) if d >= Duration::from_secs(MIN_ENSURE_PERIOD_SECS) => {}
                    Ok(_) => errs.push(FieldError::invalid(
                        path.child("minPeriod"),
                        period,
                        "must be at least 30s",
                    )),
                    Err(e) => errs.push(FieldError::invalid(
                        path.child("minPeriod"),
                        period,
                        &e.to_string(),
                    )),
                }
            }
        }
        Err(_) => errs.push(FieldError::not_supported(
            path.child("policy"),
            &policy.policy,
            &EnsurePolicy::ALL.iter().map(|p| p.as_str()).collect::<Vec<_>>(),
        )),
    }
    errs
}

pub fn validate_port_selector(port: &PortSelector, path: &FieldPath) -> ErrorList {
    let mut errs = ErrorList::new();
    let number = port.canonical_port();
    if number <= 0 || number > 65535 {
        errs.push(FieldError::invalid(
            path.child("port"),
            number,
            "must be between 1 and 65535, inclusive",
        ));
    }
    if let Some(protocol) = port.protocol.as_deref().filter(|p| !p.is_empty()) {
        if Protocol::from_str(protocol).is_err() {
            errs.push(FieldError::not_supported(
                path.child("protocol"),
                protocol,
                &Protocol::ALL.iter().map(|p| p.as_str()).collect::<Vec<_>>(),
            ));
        }
    }
    errs
}

pub fn validate_pod_backend(pods: &PodBackend, path: &FieldPath) -> ErrorList {
    let mut errs = ErrorList::new();
    match (&pods.by_label, &pods.by_name) {
        (Some(_), Some(_)) => errs.push(FieldError::forbidden(
            path.child("byName"),
            "byLabel and byName are mutually exclusive",
        )),
        (None, None) => errs.push(FieldError::required(
            path.child("byLabel"),
            "one of byLabel or byName is required",
        )),
        (Some(by_label), None) => errs.extend(validate_label_selector(
            &by_label.selector,
            &path.child("byLabel").child("selector"),
        )),
        (None, Some(by_name)) => {
            if by_name.is_empty() {
                errs.push(FieldError::required(
                    path.child("byName"),
                    "at least one pod name is required",
                ));
            }
            for (i, name) in by_name.iter().enumerate() {
                if name.is_empty() {
                    errs.push(FieldError::required(path.child("byName").index(i), ""));
                }
            }
        }
    }

    let ports = pods.ports.as_deref().unwrap_or_default();
    if ports.is_empty() && pods.port.is_none() {
        errs.push(FieldError::required(
            path.child("ports"),
            "at least one port is required",
        ));
    }
    for (i, port) in ports.iter().enumerate() {
        errs.extend(validate_port_selector(port, &path.child("ports").index(i)));
    }
    if let Some(port) = &pods.port {
        errs.extend(validate_port_selector(port, &path.child("port")));
    }
    errs
}

/// Checks `deregisterPolicy` and `deregisterWebhook` of the object rooted at `spec`.
///
/// An unset policy is accepted; it is defaulted on admission.
pub fn validate_deregister_policy(
    policy: Option<&str>,
    webhook: Option<&DeregisterWebhookSpec>,
    spec: &FieldPath,
) -> ErrorList {
    let mut errs = ErrorList::new();
    let Some(policy) = policy.filter(|p| !p.is_empty()) else {
        return errs;
    };
    match DeregPolicy::from_str(policy) {
        Err(_) => errs.push(FieldError::not_supported(
            spec.child("deregisterPolicy"),
            policy,
            &DeregPolicy::ALL.iter().map(|p| p.as_str()).collect::<Vec<_>>(),
        )),
        Ok(DeregPolicy::Webhook) => match webhook {
            None => errs.push(FieldError::required(
                spec.child("deregisterWebhook"),
                "required when deregisterPolicy is Webhook",
            )),
            Some(hook) => {
                let path = spec.child("deregisterWebhook");
                if hook.driver_name.is_empty() {
                    errs.push(FieldError::required(path.child("driverName"), ""));
                }
                if let Some(failure) = hook.failure_policy.as_deref().filter(|p| !p.is_empty()) {
                    if FailurePolicy::from_str(failure).is_err() {
                        errs.push(FieldError::not_supported(
                            path.child("failurePolicy"),
                            failure,
                            &FailurePolicy::ALL
                                .iter()
                                .map(|p| p.as_str())
                                .collect::<Vec<_>>(),
                        ));
                    }
                }
            }
        },
        Ok(_) => {}
    }
    errs
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;
    use crate::crd::common::SelectPodByLabel;

    fn spec() -> FieldPath {
        FieldPath::new("spec")
    }

    #[rstest(
        policy,
        min_period,
        valid,
        case("IfNotSucc", None, true),
        case("IfNotSucc", Some("60s"), false),
        case("Always", None, true),
        case("Always", Some("30s"), true),
        case("Always", Some("1m"), true),
        case("Always", Some("29s"), false),
        case("Always", Some("soon"), false),
        case("Always", Some("1 minute"), false),
        case("Sometimes", None, false),
        case("", None, false),
    )]
    fn test_validate_ensure_policy(policy: &str, min_period: Option<&str>, valid: bool) {
        let conf = EnsurePolicyConfig {
            policy: policy.to_string(),
            min_period: min_period.map(String::from),
        };
        let errs = validate_ensure_policy(Some(&conf), &spec().child("ensurePolicy"));
        assert_eq!(errs.is_empty(), valid, "{errs}");
    }

    #[rstest(
        port,
        protocol,
        valid,
        case(Some(80), Some("TCP"), true),
        case(Some(53), Some("UDP"), true),
        case(Some(65535), None, true),
        case(Some(0), Some("TCP"), false),
        case(Some(65536), Some("TCP"), false),
        case(Some(-1), Some("TCP"), false),
        case(Some(80), Some("SCTP"), false),
        case(Some(80), Some("tcp"), false),
        case(None, None, false),
    )]
    fn test_validate_port_selector(port: Option<i32>, protocol: Option<&str>, valid: bool) {
        let selector = PortSelector {
            port_number: None,
            port,
            protocol: protocol.map(String::from),
        };
        assert_eq!(
            validate_port_selector(&selector, &spec().child("port")).is_empty(),
            valid
        );
    }

    #[test]
    fn test_deprecated_port_number_is_accepted() {
        let selector = PortSelector {
            port_number: Some(8080),
            port: None,
            protocol: None,
        };
        assert!(validate_port_selector(&selector, &spec()).is_empty());
    }

    #[rstest(
        key,
        expected,
        case("app", true),
        case("app.kubernetes.io/name", true),
        case("lb.lbcf.tkestack.io/lb1", true),
        case("", false),
        case("/name", false),
        case("Bad_Prefix/name", false),
        case("-app", false),
        case("a/b/c", false),
    )]
    fn test_is_label_key(key: &str, expected: bool) {
        assert_eq!(is_label_key(key), expected);
    }

    #[rstest(
        value,
        expected,
        case("", true),
        case("nginx", true),
        case("v1.2_3-x", true),
        case("has space", false),
        case("-leading", false),
    )]
    fn test_is_label_value(value: &str, expected: bool) {
        assert_eq!(is_label_value(value), expected);
    }

    #[test]
    fn test_validate_pod_backend() {
        let by_label = SelectPodByLabel {
            selector: BTreeMap::from([("app".to_string(), "nginx".to_string())]),
            except: None,
        };
        let port = PortSelector {
            port_number: None,
            port: Some(80),
            protocol: Some("TCP".to_string()),
        };
        let path = spec().child("pods");

        let valid = PodBackend {
            port: None,
            ports: Some(vec![port.clone()]),
            by_label: Some(by_label.clone()),
            by_name: None,
        };
        assert!(validate_pod_backend(&valid, &path).is_empty());

        let both = PodBackend {
            by_name: Some(vec!["pod-0".to_string()]),
            ..valid.clone()
        };
        assert_eq!(validate_pod_backend(&both, &path).len(), 1);

        let neither = PodBackend {
            by_label: None,
            ..valid.clone()
        };
        assert_eq!(validate_pod_backend(&neither, &path).len(), 1);

        let empty_selector = PodBackend {
            by_label: Some(SelectPodByLabel::default()),
            ..valid.clone()
        };
        assert_eq!(validate_pod_backend(&empty_selector, &path).len(), 1);

        let no_ports = PodBackend {
            ports: None,
            ..valid.clone()
        };
        let errs = validate_pod_backend(&no_ports, &path);
        assert_eq!(
            errs.to_string(),
            "spec.pods.ports: Required value: at least one port is required"
        );

        let singular = PodBackend {
            port: Some(port),
            ports: None,
            ..valid
        };
        assert!(validate_pod_backend(&singular, &path).is_empty());
    }

    // Membership is checked the intuitive way: known values pass, unknown values fail.
    #[rstest(
        policy,
        webhook,
        errors,
        case(None, None, 0),
        case(Some(""), None, 0),
        case(Some("IfNotReady"), None, 0),
        case(Some("IfNotRunning"), None, 0),
        case(Some("Never"), None, 1),
        case(Some("Webhook"), None, 1),
        case(Some("Webhook"), Some(("lbcf-dereg", None)), 0),
        case(Some("Webhook"), Some(("lbcf-dereg", Some("DoNothing"))), 0),
        case(Some("Webhook"), Some(("lbcf-dereg", Some("IfNotRunning"))), 0),
        case(Some("Webhook"), Some(("lbcf-dereg", Some("Retry"))), 1),
        case(Some("Webhook"), Some(("", Some("Retry"))), 2),
    )]
    fn test_validate_deregister_policy(
        policy: Option<&str>,
        webhook: Option<(&str, Option<&str>)>,
        errors: usize,
    ) {
        let webhook = webhook.map(|(driver, failure)| DeregisterWebhookSpec {
            driver_name: driver.to_string(),
            failure_policy: failure.map(String::from),
        });
        let errs = validate_deregister_policy(policy, webhook.as_ref(), &spec());
        assert_eq!(errs.len(), errors, "{errs}");
    }
}
