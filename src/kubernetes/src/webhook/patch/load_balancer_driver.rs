use lbcfd_driver::webhook::Webhook;
use serde_json::json;

use super::PatchSet;
use crate::crd::load_balancer_driver::{default_webhooks, LoadBalancerDriver, WebhookConfig};

/// Declares every known webhook the driver leaves out, with the default timeout.
///
/// Declared entries are never touched.
pub fn build(driver: &LoadBalancerDriver) -> PatchSet {
    match &driver.spec.webhooks {
        None => PatchSet::new().add("/spec/webhooks", json!(default_webhooks())),
        Some(declared) => Webhook::ALL
            .into_iter()
            .filter(|w| !declared.iter().any(|h| h.name == w.as_str()))
            .fold(PatchSet::new(), |patch, w| {
                patch.add(
                    "/spec/webhooks/-",
                    json!(WebhookConfig::with_default_timeout(w)),
                )
            }),
    }
}

#[cfg(test)]
mod tests {
    use assert_json_diff::assert_json_eq;

    use super::*;
    use crate::{
        fixture::test_driver,
        webhook::patch::testing::{apply, ops},
    };

    #[test]
    fn test_no_webhooks() {
        let mut driver = test_driver("kube-system", "lbcf-clb");
        driver.spec.webhooks = None;
        let doc = apply(&driver, &build(&driver));
        let decoded: LoadBalancerDriver = serde_json::from_value(doc).unwrap();
        assert_eq!(decoded.spec.webhooks, Some(default_webhooks()));
    }

    #[test]
    fn test_merge_missing() {
        let mut driver = test_driver("kube-system", "lbcf-clb");
        driver.spec.webhooks = Some(vec![
            WebhookConfig {
                name: "validateBackend".to_string(),
                timeout: "3s".to_string(),
            },
            WebhookConfig {
                name: "judgePodDeregister".to_string(),
                timeout: "3s".to_string(),
            },
        ]);
        let patch = build(&driver);
        assert_eq!(patch.len(), 7);

        let doc = apply(&driver, &patch);
        let hooks = doc["spec"]["webhooks"].as_array().unwrap();
        assert_eq!(hooks.len(), 9);
        assert_json_eq!(hooks[0], json!({"name": "validateBackend", "timeout": "3s"}));
        assert_json_eq!(hooks[2], json!({"name": "validateLoadBalancer", "timeout": "10s"}));
    }

    #[test]
    fn test_complete() {
        let driver = test_driver("kube-system", "lbcf-clb");
        assert!(build(&driver).is_empty());
        assert_json_eq!(ops(&build(&driver)), json!([]));
    }
}
