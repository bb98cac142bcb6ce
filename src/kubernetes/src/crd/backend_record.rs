use std::collections::BTreeMap;

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::common::{Condition, DeregisterWebhookSpec, EnsurePolicyConfig, PortSelector};

#[derive(CustomResource, Debug, Serialize, Deserialize, Default, Clone, JsonSchema)]
#[kube(
    group = "lbcf.tkestack.io",
    version = "v1beta1",
    kind = "BackendRecord",
    shortname = "br"
)]
#[kube(status = "BackendRecordStatus")]
#[kube(namespaced)]
#[kube(
    printcolumn = r#"{"name":"LB", "type":"string", "description":"Load balancer of the backend", "jsonPath":".spec.lbName"}"#,
    printcolumn = r#"{"name":"ADDR", "type":"string", "description":"Backend address", "jsonPath":".status.backendAddr"}"#,
    printcolumn = r#"{"name":"AGE", "type":"date", "description":"Date from created", "jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct BackendRecordSpec {
    #[serde(default)]
    pub lb_name: String,
    #[serde(default)]
    pub lb_driver: String,
    #[serde(default)]
    pub lb_info: BTreeMap<String, String>,
    #[serde(default)]
    pub lb_attributes: BTreeMap<String, String>,
    #[serde(default)]
    pub parameters: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pod_backend: Option<PodBackendRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_backend: Option<ServiceBackendRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub static_addr: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ensure_policy: Option<EnsurePolicyConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deregister_policy: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deregister_webhook: Option<DeregisterWebhookSpec>,
}

#[derive(Deserialize, Serialize, Clone, Default, Debug, JsonSchema, PartialEq, Eq)]
pub struct PodBackendRecord {
    pub name: String,
    pub port: PortSelector,
}

#[derive(Deserialize, Serialize, Clone, Default, Debug, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ServiceBackendRecord {
    pub name: String,
    pub port: PortSelector,
    pub node_port: i32,
    pub node_name: String,
}

#[derive(Deserialize, Serialize, Clone, Default, Debug, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct BackendRecordStatus {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backend_addr: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub injected_info: Option<BTreeMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conditions: Option<Vec<Condition>>,
}
