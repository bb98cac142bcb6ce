use std::{collections::BTreeSet, str::FromStr};

use kube::ResourceExt;
use lbcfd_driver::webhook::{parse_duration, Webhook, MAX_WEBHOOK_TIMEOUT};

use super::{ErrorList, FieldError, FieldPath};
use crate::crd::{
    common::{SYSTEM_DRIVER_PREFIX, SYSTEM_NAMESPACE},
    load_balancer_driver::{LoadBalancerDriver, WebhookConfig, DRIVER_TYPE_WEBHOOK},
};

pub fn validate(driver: &LoadBalancerDriver) -> ErrorList {
    let mut errs = validate_name(
        driver.metadata.namespace.as_deref().unwrap_or_default(),
        &driver.name_any(),
    );
    let spec = FieldPath::new("spec");

    if driver.spec.driver_type != DRIVER_TYPE_WEBHOOK {
        errs.push(FieldError::not_supported(
            spec.child("driverType"),
            &driver.spec.driver_type,
            &[DRIVER_TYPE_WEBHOOK],
        ));
    }
    if let Err(e) = url::Url::parse(&driver.spec.url) {
        errs.push(FieldError::invalid(
            spec.child("url"),
            &driver.spec.url,
            &e.to_string(),
        ));
    }
    errs.extend(validate_webhooks(
        driver.spec.webhooks.as_deref(),
        &spec.child("webhooks"),
    ));
    errs
}

/// Drivers in the system namespace carry the reserved prefix, drivers elsewhere must not.
pub fn validate_name(namespace: &str, name: &str) -> ErrorList {
    let mut errs = ErrorList::new();
    let path = FieldPath::new("metadata").child("name");
    let reserved = name.starts_with(SYSTEM_DRIVER_PREFIX);
    if namespace == SYSTEM_NAMESPACE && !reserved {
        errs.push(FieldError::invalid(
            path,
            name,
            "name of a driver in kube-system must start with lbcf-",
        ));
    } else if namespace != SYSTEM_NAMESPACE && reserved {
        errs.push(FieldError::invalid(
            path,
            name,
            "prefix lbcf- is reserved for drivers in kube-system",
        ));
    }
    errs
}

/// Every known webhook must be declared exactly once with a timeout in `(0, 60s]`.
///
/// Unknown and duplicated names are reported together with the missing ones; timeouts are
/// only checked on the first declaration of a known name.
pub fn validate_webhooks(webhooks: Option<&[WebhookConfig]>, path: &FieldPath) -> ErrorList {
    let mut errs = ErrorList::new();
    let Some(webhooks) = webhooks else {
        errs.push(FieldError::required(
            path.clone(),
            "all driver webhooks must be declared",
        ));
        return errs;
    };

    let mut seen = BTreeSet::new();
    for (i, hook) in webhooks.iter().enumerate() {
        let item = path.index(i);
        match Webhook::from_str(&hook.name) {
            Err(_) => errs.push(FieldError::not_supported(
                item.child("name"),
                &hook.name,
                &Webhook::ALL.iter().map(|w| w.as_str()).collect::<Vec<_>>(),
            )),
            Ok(webhook) if !seen.insert(webhook) => {
                errs.push(FieldError::duplicate(item.child("name"), &hook.name))
            }
            Ok(_) => errs.extend(validate_timeout(&hook.timeout, &item.child("timeout"))),
        }
    }

    for webhook in Webhook::ALL {
        if !seen.contains(&webhook) {
            errs.push(FieldError::required(
                path.clone(),
                &format!("webhook {webhook} must be declared"),
            ));
        }
    }
    errs
}

fn validate_timeout(timeout: &str, path: &FieldPath) -> ErrorList {
    let mut errs = ErrorList::new();
    match parse_duration(timeout) {
        Ok(d) if !d.is_zero() && d <= MAX_WEBHOOK_TIMEOUT => {}
        Ok(_) => errs.push(FieldError::invalid(
            path.clone(),
            timeout,
            "must be greater than 0s and at most 60s",
        )),
        Err(e) => errs.push(FieldError::invalid(path.clone(), timeout, &e.to_string())),
    }
    errs
}

pub fn validate_update(old: &LoadBalancerDriver, new: &LoadBalancerDriver) -> ErrorList {
    let mut errs = ErrorList::new();
    let spec = FieldPath::new("spec");
    if old.spec.url != new.spec.url {
        errs.push(FieldError::forbidden(spec.child("url"), "field is immutable"));
    }
    if old.spec.driver_type != new.spec.driver_type {
        errs.push(FieldError::forbidden(
            spec.child("driverType"),
            "field is immutable",
        ));
    }
    errs
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use rstest::rstest;

    use super::*;
    use crate::{
        crd::load_balancer_driver::default_webhooks, fixture::test_driver,
        webhook::validation::ErrorKind,
    };

    fn hook(name: &str, timeout: &str) -> WebhookConfig {
        WebhookConfig {
            name: name.to_string(),
            timeout: timeout.to_string(),
        }
    }

    #[test]
    fn test_valid_driver() {
        let driver = test_driver("kube-system", "lbcf-clb");
        assert!(validate(&driver).is_empty());
    }

    #[rstest(
        namespace,
        name,
        valid,
        case("kube-system", "lbcf-clb", true),
        case("kube-system", "clb", false),
        case("default", "clb", true),
        case("default", "lbcf-clb", false),
    )]
    fn test_validate_name(namespace: &str, name: &str, valid: bool) {
        assert_eq!(validate_name(namespace, name).is_empty(), valid);
    }

    #[test]
    fn test_invalid_type_and_url() {
        let mut driver = test_driver("kube-system", "lbcf-clb");
        driver.spec.driver_type = "Grpc".to_string();
        driver.spec.url = "not a url".to_string();
        let errs = validate(&driver);
        let paths: Vec<String> = errs.iter().map(|e| e.path.to_string()).collect();
        assert_eq!(paths, vec!["spec.driverType", "spec.url"]);
    }

    #[test]
    fn test_missing_webhooks() {
        let errs = validate_webhooks(None, &FieldPath::new("spec").child("webhooks"));
        assert_eq!(errs.len(), 1);
        assert_eq!(errs.iter().next().unwrap().kind, ErrorKind::Required);
    }

    #[test]
    fn test_unknown_name_reported_with_missing_ones() {
        let mut hooks = default_webhooks();
        hooks.pop();
        hooks.push(hook("judgePodDeregister", "10s"));
        let errs = validate_webhooks(Some(&hooks), &FieldPath::new("spec").child("webhooks"));
        let kinds: Vec<ErrorKind> = errs.iter().map(|e| e.kind).collect();
        assert_eq!(kinds, vec![ErrorKind::NotSupported, ErrorKind::Required]);
        assert!(errs.to_string().contains("ensureBackendDeregistered"));
    }

    #[test]
    fn test_duplicate_name() {
        let mut hooks = default_webhooks();
        hooks.push(hook("validateBackend", "5s"));
        let errs = validate_webhooks(Some(&hooks), &FieldPath::new("spec").child("webhooks"));
        assert_eq!(errs.len(), 1);
        assert_eq!(
            errs.to_string(),
            "spec.webhooks[8].name: Duplicate value: \"validateBackend\""
        );
    }

    #[rstest(
        timeout,
        valid,
        case("10s", true),
        case("60s", true),
        case("1m", true),
        case("500ms", true),
        case("0s", false),
        case("61s", false),
        case("2m", false),
        case("", false),
        case("ten", false),
        case("2sec", false),
        case("5 seconds", false),
    )]
    fn test_webhook_timeout(timeout: &str, valid: bool) {
        let mut hooks = default_webhooks();
        hooks[0].timeout = timeout.to_string();
        let errs = validate_webhooks(Some(&hooks), &FieldPath::new("spec").child("webhooks"));
        assert_eq!(errs.is_empty(), valid, "{errs}");
    }

    #[test]
    fn test_validate_update() {
        let old = test_driver("kube-system", "lbcf-clb");
        let mut new = old.clone();
        new.spec.accept_dry_run_call = !old.spec.accept_dry_run_call;
        assert!(validate_update(&old, &new).is_empty());

        new.spec.url = "http://other.kube-system.svc".to_string();
        assert_eq!(validate_update(&old, &new).len(), 1);
        new.spec.driver_type = "Other".to_string();
        assert_eq!(validate_update(&old, &new).len(), 2);
    }

    proptest! {
        #[test]
        fn prop_webhook_set_must_be_exact(
            drop in proptest::collection::btree_set(0usize..8, 0..3),
            dup in proptest::option::of(0usize..8),
            secs in 0u64..120,
        ) {
            let mut hooks: Vec<WebhookConfig> = default_webhooks()
                .into_iter()
                .enumerate()
                .filter(|(i, _)| !drop.contains(i))
                .map(|(_, h)| h)
                .collect();
            if let Some(i) = dup {
                hooks.push(hook(Webhook::ALL[i].as_str(), "10s"));
            }
            if let Some(first) = hooks.first_mut() {
                first.timeout = format!("{secs}s");
            }
            let timeout_ok = hooks.is_empty() || (secs > 0 && secs <= 60);
            let missing = drop.iter().any(|i| Some(*i) != dup);
            let duplicated = dup.is_some_and(|i| !drop.contains(&i));
            let expect_valid = !missing && !duplicated && timeout_ok;

            let errs = validate_webhooks(Some(&hooks), &FieldPath::new("spec").child("webhooks"));
            prop_assert_eq!(errs.is_empty(), expect_valid);
        }
    }
}
