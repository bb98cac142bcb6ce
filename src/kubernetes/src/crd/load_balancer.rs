use std::collections::BTreeMap;

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::common::{Condition, EnsurePolicyConfig};

pub const LOAD_BALANCER_FINALIZER: &str = "lbcf.tkestack.io/delete-load-loadbalancer";

#[derive(CustomResource, Debug, Serialize, Deserialize, Default, Clone, JsonSchema)]
#[kube(
    group = "lbcf.tkestack.io",
    version = "v1beta1",
    kind = "LoadBalancer"
)]
#[kube(status = "LoadBalancerStatus")]
#[kube(namespaced)]
#[kube(
    printcolumn = r#"{"name":"DRIVER", "type":"string", "description":"Driver of the load balancer", "jsonPath":".spec.lbDriver"}"#,
    printcolumn = r#"{"name":"AGE", "type":"date", "description":"Date from created", "jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct LoadBalancerSpec {
    #[serde(default)]
    pub lb_driver: String,
    #[serde(default)]
    pub lb_spec: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attributes: Option<BTreeMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ensure_policy: Option<EnsurePolicyConfig>,
}

#[derive(Deserialize, Serialize, Clone, Default, Debug, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoadBalancerStatus {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lb_info: Option<BTreeMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conditions: Option<Vec<Condition>>,
}

impl LoadBalancer {
    pub fn attributes(&self) -> BTreeMap<String, String> {
        self.spec.attributes.clone().unwrap_or_default()
    }

    pub fn lb_info(&self) -> BTreeMap<String, String> {
        self.status
            .as_ref()
            .and_then(|s| s.lb_info.clone())
            .unwrap_or_default()
    }
}
