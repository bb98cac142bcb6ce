use std::collections::BTreeMap;

use serde_json::json;

use super::{ensure_labels, PatchSet};
use crate::crd::{
    common::LABEL_DRIVER_NAME,
    load_balancer::{LoadBalancer, LOAD_BALANCER_FINALIZER},
};

/// Finalizer on create, driver label on create and update.
pub fn build(lb: &LoadBalancer, create: bool) -> PatchSet {
    let patch = if create {
        finalizer(lb)
    } else {
        PatchSet::new()
    };
    patch.extend(driver_label(lb))
}

/// Adds the deletion finalizer unless present.
///
/// A missing finalizer list is created with one element; an existing one is appended to, since
/// `/metadata/finalizers/-` cannot be added to a list that does not exist yet.
pub fn finalizer(lb: &LoadBalancer) -> PatchSet {
    match lb.metadata.finalizers.as_deref() {
        Some(finalizers) if finalizers.iter().any(|f| f == LOAD_BALANCER_FINALIZER) => {
            PatchSet::new()
        }
        Some(finalizers) if !finalizers.is_empty() => {
            PatchSet::new().add("/metadata/finalizers/-", json!(LOAD_BALANCER_FINALIZER))
        }
        _ => PatchSet::new().add("/metadata/finalizers", json!([LOAD_BALANCER_FINALIZER])),
    }
}

pub fn driver_label(lb: &LoadBalancer) -> PatchSet {
    if lb.spec.lb_driver.is_empty() {
        return PatchSet::new();
    }
    let desired = BTreeMap::from([(LABEL_DRIVER_NAME.to_string(), lb.spec.lb_driver.clone())]);
    ensure_labels(lb.metadata.labels.as_ref(), &desired)
}

#[cfg(test)]
mod tests {
    use assert_json_diff::assert_json_eq;

    use super::*;
    use crate::{
        fixture::test_load_balancer,
        webhook::patch::testing::{apply, ops},
    };

    #[test]
    fn test_finalizer_on_empty_list() {
        let lb = test_load_balancer("default", "lb1", "lbcf-clb");
        let patch = finalizer(&lb);
        assert_json_eq!(
            ops(&patch),
            json!([{"op": "add", "path": "/metadata/finalizers", "value": [LOAD_BALANCER_FINALIZER]}])
        );
        let doc = apply(&lb, &patch);
        assert_json_eq!(doc["metadata"]["finalizers"], json!([LOAD_BALANCER_FINALIZER]));
    }

    #[test]
    fn test_finalizer_appended() {
        let mut lb = test_load_balancer("default", "lb1", "lbcf-clb");
        lb.metadata.finalizers = Some(vec!["example.com/keep".to_string()]);
        let patch = finalizer(&lb);
        assert_json_eq!(
            ops(&patch),
            json!([{"op": "add", "path": "/metadata/finalizers/-", "value": LOAD_BALANCER_FINALIZER}])
        );
        let doc = apply(&lb, &patch);
        assert_json_eq!(
            doc["metadata"]["finalizers"],
            json!(["example.com/keep", LOAD_BALANCER_FINALIZER])
        );
    }

    #[test]
    fn test_finalizer_present() {
        let mut lb = test_load_balancer("default", "lb1", "lbcf-clb");
        lb.metadata.finalizers = Some(vec![LOAD_BALANCER_FINALIZER.to_string()]);
        assert!(finalizer(&lb).is_empty());
    }

    #[test]
    fn test_build() {
        let mut lb = test_load_balancer("default", "lb1", "lbcf-clb");
        lb.metadata.labels = Some(BTreeMap::from([
            (LABEL_DRIVER_NAME.to_string(), "stale".to_string()),
            ("app".to_string(), "web".to_string()),
        ]));

        let doc = apply(&lb, &build(&lb, true));
        assert_json_eq!(
            doc["metadata"]["labels"],
            json!({"app": "web", "lbcf.tkestack.io/lb-driver": "lbcf-clb"})
        );
        assert_json_eq!(doc["metadata"]["finalizers"], json!([LOAD_BALANCER_FINALIZER]));

        let doc = apply(&lb, &build(&lb, false));
        assert!(doc["metadata"].get("finalizers").is_none());
        assert_json_eq!(
            doc["metadata"]["labels"]["lbcf.tkestack.io/lb-driver"],
            json!("lbcf-clb")
        );
    }
}
