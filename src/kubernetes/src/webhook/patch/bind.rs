use super::{
    backend_group::{default_deregister_policy, pod_ports},
    PatchSet,
};
use crate::crd::bind::Bind;

pub fn build(bind: &Bind) -> PatchSet {
    PatchSet::new()
        .extend(pod_ports(bind.spec.pods.as_ref(), "/spec/pods"))
        .extend(default_deregister_policy(bind.spec.deregister_policy.as_deref()))
}

#[cfg(test)]
mod tests {
    use assert_json_diff::assert_json_eq;
    use serde_json::json;

    use super::*;
    use crate::{crd::common::PortSelector, fixture::test_bind, webhook::patch::testing::ops};

    #[test]
    fn test_build() {
        let mut bind = test_bind("default", "bind", &[("lb1", "lbcf-a")]);
        if let Some(pods) = bind.spec.pods.as_mut() {
            pods.ports = Some(vec![PortSelector {
                port_number: Some(80),
                port: None,
                protocol: Some("UDP".to_string()),
            }]);
        }
        bind.spec.deregister_policy = None;
        assert_json_eq!(
            ops(&build(&bind)),
            json!([
                {"op": "remove", "path": "/spec/pods/ports/0/portNumber"},
                {"op": "add", "path": "/spec/pods/ports/0/port", "value": 80},
                {"op": "add", "path": "/spec/deregisterPolicy", "value": "IfNotReady"},
            ])
        );
    }
}
