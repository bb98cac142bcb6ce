use std::collections::BTreeMap;

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::common::{Condition, DeregisterWebhookSpec, EnsurePolicyConfig, PodBackend};

pub const MIN_RESYNC_PERIOD_SECS: u64 = 10;

/// Binds one set of pods to several load balancers, each served by its own driver.
#[derive(CustomResource, Debug, Serialize, Deserialize, Default, Clone, JsonSchema)]
#[kube(group = "lbcf.tkestack.io", version = "v1beta1", kind = "Bind")]
#[kube(status = "BindStatus")]
#[kube(namespaced)]
#[kube(
    printcolumn = r#"{"name":"AGE", "type":"date", "description":"Date from created", "jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct BindSpec {
    #[serde(default)]
    pub load_balancers: Vec<TargetLoadBalancer>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pods: Option<PodBackend>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameters: Option<BTreeMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deregister_policy: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deregister_webhook: Option<DeregisterWebhookSpec>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ensure_policy: Option<EnsurePolicyConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resync_period: Option<String>,
}

#[derive(Deserialize, Serialize, Clone, Default, Debug, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TargetLoadBalancer {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub driver: String,
    #[serde(default)]
    pub spec: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attributes: Option<BTreeMap<String, String>>,
}

#[derive(Deserialize, Serialize, Clone, Default, Debug, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct BindStatus {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub load_balancer_statuses: Option<Vec<TargetLoadBalancerStatus>>,
}

#[derive(Deserialize, Serialize, Clone, Default, Debug, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TargetLoadBalancerStatus {
    pub name: String,
    pub driver: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lb_info: Option<BTreeMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conditions: Option<Vec<Condition>>,
}

impl BindSpec {
    pub fn parameters(&self) -> BTreeMap<String, String> {
        self.parameters.clone().unwrap_or_default()
    }

    pub fn target(&self, name: &str) -> Option<&TargetLoadBalancer> {
        self.load_balancers.iter().find(|lb| lb.name == name)
    }
}

impl TargetLoadBalancer {
    pub fn attributes(&self) -> BTreeMap<String, String> {
        self.attributes.clone().unwrap_or_default()
    }
}
