use std::collections::BTreeMap;

use serde_json::json;

use super::{ensure_labels, PatchSet};
use crate::crd::{
    backend_group::{member_label, BackendGroup, LABEL_LB_MEMBER_VALUE, LABEL_LB_NAME},
    common::{DeregPolicy, PodBackend, PortSelector},
};

pub fn build(bg: &BackendGroup) -> PatchSet {
    PatchSet::new()
        .extend(lb_labels(bg))
        .extend(migrate_lb_name(bg))
        .extend(pod_ports(bg.spec.pods.as_ref(), "/spec/pods"))
        .extend(service_port(bg))
        .extend(default_deregister_policy(bg.spec.deregister_policy.as_deref()))
}

/// Primary label for the first load balancer plus one membership label per load balancer.
pub fn lb_labels(bg: &BackendGroup) -> PatchSet {
    let names = bg.spec.load_balancer_names();
    let Some(primary) = names.first() else {
        return PatchSet::new();
    };
    let mut desired = BTreeMap::from([(LABEL_LB_NAME.to_string(), primary.clone())]);
    for name in &names {
        desired.insert(member_label(name), LABEL_LB_MEMBER_VALUE.to_string());
    }
    ensure_labels(bg.metadata.labels.as_ref(), &desired)
}

/// Moves the deprecated `lbName` into `loadBalancers`.
pub fn migrate_lb_name(bg: &BackendGroup) -> PatchSet {
    let Some(name) = &bg.spec.lb_name else {
        return PatchSet::new();
    };
    let patch = PatchSet::new().remove("/spec/lbName");
    if name.is_empty() {
        return patch;
    }
    match &bg.spec.load_balancers {
        Some(list) if list.contains(name) => patch,
        Some(_) => patch.add("/spec/loadBalancers/-", json!(name)),
        None => patch.add("/spec/loadBalancers", json!([name])),
    }
}

/// Folds the deprecated `portNumber` into `port` and defaults the protocol of the selector at
/// `path`.
pub fn canonical_port(port: &PortSelector, path: &str) -> PatchSet {
    let mut patch = PatchSet::new();
    if port.port_number.is_some() {
        patch = patch.remove(format!("{path}/portNumber"));
    }
    if port.port.unwrap_or(0) == 0 && port.canonical_port() != 0 {
        patch = patch.add(format!("{path}/port"), json!(port.canonical_port()));
    }
    if port.protocol.as_deref().unwrap_or_default().is_empty() {
        patch = patch.add(format!("{path}/protocol"), json!(port.canonical_protocol()));
    }
    patch
}

/// Canonicalises every entry of `ports` and merges the deprecated singular `port` into it.
pub fn pod_ports(pods: Option<&PodBackend>, root: &str) -> PatchSet {
    let Some(pods) = pods else {
        return PatchSet::new();
    };
    let mut patch = pods
        .ports
        .iter()
        .flatten()
        .enumerate()
        .fold(PatchSet::new(), |patch, (i, port)| {
            patch.extend(canonical_port(port, &format!("{root}/ports/{i}")))
        });

    if let Some(port) = &pods.port {
        patch = patch.remove(format!("{root}/port"));
        let canonical = json!({
            "port": port.canonical_port(),
            "protocol": port.canonical_protocol(),
        });
        patch = match &pods.ports {
            None => patch.add(format!("{root}/ports"), json!([canonical])),
            Some(ports) if ports.iter().any(|p| p.equivalent(port)) => patch,
            Some(_) => patch.add(format!("{root}/ports/-"), canonical),
        };
    }
    patch
}

pub fn service_port(bg: &BackendGroup) -> PatchSet {
    match &bg.spec.service {
        Some(service) if service.port != PortSelector::default() => {
            canonical_port(&service.port, "/spec/service/port")
        }
        _ => PatchSet::new(),
    }
}

pub fn default_deregister_policy(policy: Option<&str>) -> PatchSet {
    if policy.unwrap_or_default().is_empty() {
        PatchSet::new().add(
            "/spec/deregisterPolicy",
            json!(DeregPolicy::IfNotReady.as_str()),
        )
    } else {
        PatchSet::new()
    }
}
