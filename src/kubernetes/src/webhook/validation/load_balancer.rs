use kube::ResourceExt;

use super::{common::validate_ensure_policy, ErrorList, FieldError, FieldPath};
use crate::crd::{
    common::{SYSTEM_DRIVER_PREFIX, SYSTEM_NAMESPACE},
    load_balancer::LoadBalancer,
};

pub fn validate(lb: &LoadBalancer) -> ErrorList {
    let mut errs = ErrorList::new();
    let spec = FieldPath::new("spec");

    if lb.spec.lb_driver.is_empty() {
        errs.push(FieldError::required(spec.child("lbDriver"), ""));
    }

    if lb.spec.scope.as_ref().is_some_and(|s| !s.is_empty()) {
        if !lb.spec.lb_driver.starts_with(SYSTEM_DRIVER_PREFIX) {
            errs.push(FieldError::invalid(
                spec.child("lbDriver"),
                &lb.spec.lb_driver,
                "a LoadBalancer with scope must use a driver prefixed with lbcf-",
            ));
        }
        let namespace = lb.namespace().unwrap_or_default();
        if namespace != SYSTEM_NAMESPACE {
            errs.push(FieldError::invalid(
                FieldPath::new("metadata").child("namespace"),
                namespace,
                "a LoadBalancer with scope must be created in kube-system",
            ));
        }
    }

    errs.extend(validate_ensure_policy(
        lb.spec.ensure_policy.as_ref(),
        &spec.child("ensurePolicy"),
    ));
    errs
}

pub fn validate_update(old: &LoadBalancer, new: &LoadBalancer) -> ErrorList {
    let mut errs = ErrorList::new();
    let spec = FieldPath::new("spec");
    if old.spec.lb_driver != new.spec.lb_driver {
        errs.push(FieldError::forbidden(
            spec.child("lbDriver"),
            "field is immutable",
        ));
    }
    if old.spec.lb_spec != new.spec.lb_spec {
        errs.push(FieldError::forbidden(spec.child("lbSpec"), "field is immutable"));
    }
    errs
}
