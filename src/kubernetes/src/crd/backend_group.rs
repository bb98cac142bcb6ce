use std::collections::BTreeMap;

use kube::CustomResource;
use lbcfd_driver::types::BackendType;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::common::{DeregisterWebhookSpec, EnsurePolicyConfig, PodBackend, PortSelector};

/// Label holding the first load balancer a BackendGroup is bound to.
pub const LABEL_LB_NAME: &str = "lbcf.tkestack.io/lb-name";
/// Prefix of the per load balancer membership labels, `lb.lbcf.tkestack.io/<lb>: "True"`.
pub const LABEL_LB_MEMBER_PREFIX: &str = "lb.lbcf.tkestack.io/";
pub const LABEL_LB_MEMBER_VALUE: &str = "True";

pub fn member_label(lb_name: &str) -> String {
    format!("{LABEL_LB_MEMBER_PREFIX}{lb_name}")
}

#[derive(CustomResource, Debug, Serialize, Deserialize, Default, Clone, JsonSchema)]
#[kube(
    group = "lbcf.tkestack.io",
    version = "v1beta1",
    kind = "BackendGroup",
    shortname = "bg"
)]
#[kube(status = "BackendGroupStatus")]
#[kube(namespaced)]
#[kube(
    printcolumn = r#"{"name":"BACKENDS", "type":"integer", "description":"Number of backends", "jsonPath":".status.backends"}"#,
    printcolumn = r#"{"name":"REGISTERED", "type":"integer", "description":"Number of registered backends", "jsonPath":".status.registeredBackends"}"#,
    printcolumn = r#"{"name":"AGE", "type":"date", "description":"Date from created", "jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct BackendGroupSpec {
    /// Deprecated: use `loadBalancers`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lb_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub load_balancers: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service: Option<ServiceBackend>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pods: Option<PodBackend>,
    #[serde(rename = "static", skip_serializing_if = "Option::is_none")]
    pub static_addrs: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameters: Option<BTreeMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deregister_policy: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deregister_webhook: Option<DeregisterWebhookSpec>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ensure_policy: Option<EnsurePolicyConfig>,
}

#[derive(Deserialize, Serialize, Clone, Default, Debug, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ServiceBackend {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub port: PortSelector,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node_port_selector: Option<BTreeMap<String, String>>,
}

#[derive(Deserialize, Serialize, Clone, Default, Debug, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct BackendGroupStatus {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backends: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub registered_backends: Option<i32>,
}

impl BackendGroupSpec {
    /// Load balancers this group is bound to: `loadBalancers` followed by the deprecated
    /// `lbName` when the list does not already hold it.
    pub fn load_balancer_names(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for name in self.load_balancers.iter().flatten() {
            if !names.contains(name) {
                names.push(name.clone());
            }
        }
        if let Some(name) = self.lb_name.as_ref().filter(|n| !n.is_empty()) {
            if !names.contains(name) {
                names.push(name.clone());
            }
        }
        names
    }

    /// Backend family of this group; `None` when no selector is set.
    pub fn backend_type(&self) -> Option<BackendType> {
        if self.service.is_some() {
            Some(BackendType::Service)
        } else if self.pods.is_some() {
            Some(BackendType::Pod)
        } else if self.static_addrs.is_some() {
            Some(BackendType::Static)
        } else {
            None
        }
    }

    pub fn parameters(&self) -> BTreeMap<String, String> {
        self.parameters.clone().unwrap_or_default()
    }
}
