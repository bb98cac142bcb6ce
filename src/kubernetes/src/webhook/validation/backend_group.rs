use std::collections::BTreeSet;

use super::{
    common::{
        validate_deregister_policy, validate_ensure_policy, validate_label_selector,
        validate_pod_backend, validate_port_selector,
    },
    ErrorList, FieldError, FieldPath,
};
use crate::crd::backend_group::BackendGroup;

pub fn validate(bg: &BackendGroup) -> ErrorList {
    let mut errs = ErrorList::new();
    let spec = FieldPath::new("spec");

    if bg.spec.load_balancer_names().is_empty() {
        errs.push(FieldError::required(
            spec.child("loadBalancers"),
            "at least one load balancer is required",
        ));
    }
    let mut seen = BTreeSet::new();
    for (i, name) in bg.spec.load_balancers.iter().flatten().enumerate() {
        let path = spec.child("loadBalancers").index(i);
        if name.is_empty() {
            errs.push(FieldError::required(path, ""));
        } else if !seen.insert(name) {
            errs.push(FieldError::duplicate(path, name));
        }
    }

    let selectors = [
        bg.spec.service.is_some(),
        bg.spec.pods.is_some(),
        bg.spec.static_addrs.is_some(),
    ]
    .into_iter()
    .filter(|set| *set)
    .count();
    match selectors {
        0 => errs.push(FieldError::required(
            spec.clone(),
            "one of service, pods or static is required",
        )),
        1 => {}
        _ => errs.push(FieldError::forbidden(
            spec.clone(),
            "only one of service, pods or static may be set",
        )),
    }

    if let Some(service) = &bg.spec.service {
        let path = spec.child("service");
        if service.name.is_empty() {
            errs.push(FieldError::required(path.child("name"), ""));
        }
        errs.extend(validate_port_selector(&service.port, &path.child("port")));
        if let Some(selector) = service.node_port_selector.as_ref().filter(|s| !s.is_empty()) {
            errs.extend(validate_label_selector(
                selector,
                &path.child("nodePortSelector"),
            ));
        }
    }
    if let Some(pods) = &bg.spec.pods {
        errs.extend(validate_pod_backend(pods, &spec.child("pods")));
    }
    if let Some(addrs) = &bg.spec.static_addrs {
        if addrs.is_empty() {
            errs.push(FieldError::required(
                spec.child("static"),
                "at least one address is required",
            ));
        }
        for (i, addr) in addrs.iter().enumerate() {
            if addr.is_empty() {
                errs.push(FieldError::required(spec.child("static").index(i), ""));
            }
        }
    }

    errs.extend(validate_deregister_policy(
        bg.spec.deregister_policy.as_deref(),
        bg.spec.deregister_webhook.as_ref(),
        &spec,
    ));
    errs.extend(validate_ensure_policy(
        bg.spec.ensure_policy.as_ref(),
        &spec.child("ensurePolicy"),
    ));
    errs
}

pub fn validate_update(old: &BackendGroup, new: &BackendGroup) -> ErrorList {
    let mut errs = ErrorList::new();
    if old.spec.backend_type() != new.spec.backend_type() {
        errs.push(FieldError::forbidden(
            FieldPath::new("spec"),
            "backend type (service, pods or static) is immutable",
        ));
    }
    errs
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;
    use crate::{
        crd::{
            backend_group::ServiceBackend,
            common::{DeregisterWebhookSpec, PortSelector},
        },
        fixture::test_backend_group,
    };

    fn service() -> ServiceBackend {
        ServiceBackend {
            name: "nginx".to_string(),
            port: PortSelector {
                port_number: None,
                port: Some(80),
                protocol: Some("TCP".to_string()),
            },
            node_port_selector: None,
        }
    }

    #[test]
    fn test_valid_backend_group() {
        assert!(validate(&test_backend_group("default", "bg", &["lb1"])).is_empty());
    }

    #[test]
    fn test_load_balancers_required() {
        let bg = test_backend_group("default", "bg", &[]);
        assert_eq!(
            validate(&bg).to_string(),
            "spec.loadBalancers: Required value: at least one load balancer is required"
        );
    }

    #[test]
    fn test_deprecated_lb_name_counts() {
        let mut bg = test_backend_group("default", "bg", &[]);
        bg.spec.lb_name = Some("lb1".to_string());
        assert!(validate(&bg).is_empty());
    }

    #[test]
    fn test_duplicate_load_balancers() {
        let bg = test_backend_group("default", "bg", &["lb1", "lb2", "lb1"]);
        assert_eq!(
            validate(&bg).to_string(),
            "spec.loadBalancers[2]: Duplicate value: \"lb1\""
        );
    }

    #[rstest(
        with_service,
        with_pods,
        with_static,
        valid,
        case(false, false, false, false),
        case(true, false, false, true),
        case(false, true, false, true),
        case(false, false, true, true),
        case(true, true, false, false),
        case(true, false, true, false),
        case(true, true, true, false),
    )]
    fn test_exactly_one_selector(with_service: bool, with_pods: bool, with_static: bool, valid: bool) {
        let mut bg = test_backend_group("default", "bg", &["lb1"]);
        if !with_pods {
            bg.spec.pods = None;
        }
        if with_service {
            bg.spec.service = Some(service());
        }
        if with_static {
            bg.spec.static_addrs = Some(vec!["10.0.0.1:80".to_string()]);
        }
        assert_eq!(validate(&bg).is_empty(), valid);
    }

    #[test]
    fn test_service_backend() {
        let mut bg = test_backend_group("default", "bg", &["lb1"]);
        bg.spec.pods = None;
        let mut svc = service();
        svc.name = String::new();
        svc.port.protocol = Some("SCTP".to_string());
        bg.spec.service = Some(svc);
        let paths: Vec<String> = validate(&bg).iter().map(|e| e.path.to_string()).collect();
        assert_eq!(paths, vec!["spec.service.name", "spec.service.port.protocol"]);
    }

    #[test]
    fn test_deregister_webhook_required() {
        let mut bg = test_backend_group("default", "bg", &["lb1"]);
        bg.spec.deregister_policy = Some("Webhook".to_string());
        assert_eq!(
            validate(&bg).to_string(),
            "spec.deregisterWebhook: Required value: required when deregisterPolicy is Webhook"
        );
        bg.spec.deregister_webhook = Some(DeregisterWebhookSpec {
            driver_name: "lbcf-dereg".to_string(),
            failure_policy: Some("DoNothing".to_string()),
        });
        assert!(validate(&bg).is_empty());
    }

    #[test]
    fn test_validate_update() {
        let old = test_backend_group("default", "bg", &["lb1"]);
        let mut new = test_backend_group("default", "bg", &["lb1", "lb2"]);
        assert!(validate_update(&old, &new).is_empty());

        new.spec.pods = None;
        new.spec.service = Some(service());
        assert_eq!(
            validate_update(&old, &new).to_string(),
            "spec: Forbidden: backend type (service, pods or static) is immutable"
        );
    }
}
