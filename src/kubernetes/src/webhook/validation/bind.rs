use std::{collections::BTreeSet, time::Duration};

use lbcfd_driver::webhook::parse_duration;

use super::{
    common::{validate_deregister_policy, validate_ensure_policy, validate_pod_backend},
    ErrorList, FieldError, FieldPath,
};
use crate::crd::bind::{Bind, MIN_RESYNC_PERIOD_SECS};

pub fn validate(bind: &Bind) -> ErrorList {
    let mut errs = ErrorList::new();
    let spec = FieldPath::new("spec");

    if bind.spec.load_balancers.is_empty() {
        errs.push(FieldError::required(
            spec.child("loadBalancers"),
            "at least one load balancer is required",
        ));
    }
    let mut names = BTreeSet::new();
    for (i, target) in bind.spec.load_balancers.iter().enumerate() {
        let path = spec.child("loadBalancers").index(i);
        if target.name.is_empty() {
            errs.push(FieldError::required(path.child("name"), ""));
        } else if !names.insert(&target.name) {
            errs.push(FieldError::duplicate(path.child("name"), &target.name));
        }
        if target.driver.is_empty() {
            errs.push(FieldError::required(path.child("driver"), ""));
        }
        if target.spec.is_empty() {
            errs.push(FieldError::required(path.child("spec"), ""));
        }
    }

    match &bind.spec.pods {
        None => errs.push(FieldError::required(spec.child("pods"), "")),
        Some(pods) => errs.extend(validate_pod_backend(pods, &spec.child("pods"))),
    }

    errs.extend(validate_deregister_policy(
        bind.spec.deregister_policy.as_deref(),
        bind.spec.deregister_webhook.as_ref(),
        &spec,
    ));
    errs.extend(validate_ensure_policy(
        bind.spec.ensure_policy.as_ref(),
        &spec.child("ensurePolicy"),
    ));

    if let Some(period) = &bind.spec.resync_period {
        match parse_duration(period) {
            Ok(d) if d >= Duration::from_secs(MIN_RESYNC_PERIOD_SECS) => {}
            Ok(_) => errs.push(FieldError::invalid(
                spec.child("resyncPeriod"),
                period,
                "must be at least 10s",
            )),
            Err(e) => errs.push(FieldError::invalid(
                spec.child("resyncPeriod"),
                period,
                &e.to_string(),
            )),
        }
    }
    errs
}

/// The driver and spec of a load balancer cannot change while its name stays in the list.
pub fn validate_update(old: &Bind, new: &Bind) -> ErrorList {
    let mut errs = ErrorList::new();
    for (i, target) in new.spec.load_balancers.iter().enumerate() {
        let Some(prev) = old.spec.target(&target.name) else {
            continue;
        };
        let path = FieldPath::new("spec").child("loadBalancers").index(i);
        if prev.driver != target.driver {
            errs.push(FieldError::forbidden(path.child("driver"), "field is immutable"));
        }
        if prev.spec != target.spec {
            errs.push(FieldError::forbidden(path.child("spec"), "field is immutable"));
        }
    }
    errs
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use rstest::rstest;

    use super::*;
    use crate::{crd::bind::TargetLoadBalancer, fixture::test_bind};

    #[test]
    fn test_valid_bind() {
        let bind = test_bind("default", "bind", &[("lb1", "lbcf-a"), ("lb2", "lbcf-b")]);
        assert!(validate(&bind).is_empty());
    }

    #[test]
    fn test_targets() {
        let mut bind = test_bind("default", "bind", &[]);
        assert_eq!(
            validate(&bind).to_string(),
            "spec.loadBalancers: Required value: at least one load balancer is required"
        );

        bind.spec.load_balancers = vec![
            TargetLoadBalancer {
                name: "lb1".to_string(),
                driver: "lbcf-a".to_string(),
                spec: BTreeMap::from([("zone".to_string(), "a".to_string())]),
                attributes: None,
            },
            TargetLoadBalancer {
                name: "lb1".to_string(),
                driver: String::new(),
                spec: BTreeMap::new(),
                attributes: None,
            },
        ];
        let paths: Vec<String> = validate(&bind).iter().map(|e| e.path.to_string()).collect();
        assert_eq!(
            paths,
            vec![
                "spec.loadBalancers[1].name",
                "spec.loadBalancers[1].driver",
                "spec.loadBalancers[1].spec",
            ]
        );
    }

    #[test]
    fn test_pods_required() {
        let mut bind = test_bind("default", "bind", &[("lb1", "lbcf-a")]);
        bind.spec.pods = None;
        assert_eq!(validate(&bind).to_string(), "spec.pods: Required value");
    }

    #[rstest(
        policy,
        valid,
        case(Some("IfNotReady"), true),
        case(Some("IfNotRunning"), true),
        case(Some("Always"), false),
    )]
    fn test_deregister_policy(policy: Option<&str>, valid: bool) {
        let mut bind = test_bind("default", "bind", &[("lb1", "lbcf-a")]);
        bind.spec.deregister_policy = policy.map(String::from);
        assert_eq!(validate(&bind).is_empty(), valid);
    }

    #[rstest(
        period,
        valid,
        case("10s", true),
        case("5m", true),
        case("9s", false),
        case("never", false),
        case("30 seconds", false),
        case("15sec", false),
    )]
    fn test_resync_period(period: &str, valid: bool) {
        let mut bind = test_bind("default", "bind", &[("lb1", "lbcf-a")]);
        bind.spec.resync_period = Some(period.to_string());
        assert_eq!(validate(&bind).is_empty(), valid);
    }

    #[test]
    fn test_validate_update() {
        let old = test_bind("default", "bind", &[("lb1", "lbcf-a"), ("lb2", "lbcf-b")]);

        // adding and removing targets is fine
        let new = test_bind("default", "bind", &[("lb2", "lbcf-b"), ("lb3", "lbcf-c")]);
        assert!(validate_update(&old, &new).is_empty());

        let mut new = old.clone();
        new.spec.load_balancers[1].driver = "lbcf-c".to_string();
        new.spec.load_balancers[1]
            .spec
            .insert("zone".to_string(), "other".to_string());
        assert_eq!(
            validate_update(&old, &new).to_string(),
            "spec.loadBalancers[1].driver: Forbidden: field is immutable; spec.loadBalancers[1].spec: Forbidden: field is immutable"
        );
    }
}
