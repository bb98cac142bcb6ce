use std::collections::BTreeMap;

use rand::Rng;
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::webhook::Webhook;

pub type Attributes = BTreeMap<String, String>;

const DRY_RUN_MESSAGE: &str = "dry run: driver does not accept dry-run calls";

/// A request body tied to the webhook that serves it and the response it gets back.
pub trait WebhookRequest: Serialize + Send + Sync {
    const WEBHOOK: Webhook;
    type Response: DeserializeOwned + DryRunResponse + Send;

    fn dry_run(&self) -> bool;
}

/// Response synthesized when a dry-run request must not reach the driver.
pub trait DryRunResponse {
    fn dry_run_success() -> Self;
}

/// Returns a fresh identifier for one attempt of a retryable webhook.
pub fn new_retry_id() -> String {
    let val: u128 = rand::thread_rng().gen();
    format!("{val:032x}")
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operation {
    #[default]
    Create,
    Update,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Status {
    Succ,
    Fail,
    Running,
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Status::Succ => write!(f, "Succ"),
            Status::Fail => write!(f, "Fail"),
            Status::Running => write!(f, "Running"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum BackendType {
    #[default]
    Pod,
    Service,
    Static,
}

impl std::fmt::Display for BackendType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendType::Pod => write!(f, "Pod"),
            BackendType::Service => write!(f, "Service"),
            BackendType::Static => write!(f, "Static"),
        }
    }
}

/// Identifiers carried by every retryable request.
///
/// `record_id` is stable for the object being driven, `retry_id` changes on every attempt so
/// a driver can tell a retry of partially done work from a brand new call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryIdentity {
    #[serde(rename = "recordID")]
    pub record_id: String,
    #[serde(rename = "retryID")]
    pub retry_id: String,
}

impl RetryIdentity {
    pub fn new(record_id: impl Into<String>) -> Self {
        Self {
            record_id: record_id.into(),
            retry_id: new_retry_id(),
        }
    }
}

/// Response of the no-retry family.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidateResponse {
    pub succ: bool,
    #[serde(default)]
    pub msg: String,
}

impl DryRunResponse for ValidateResponse {
    fn dry_run_success() -> Self {
        Self {
            succ: true,
            msg: DRY_RUN_MESSAGE.to_string(),
        }
    }
}

/// Common part of every retryable response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetryResponse {
    pub status: Status,
    #[serde(default)]
    pub msg: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_retry_delay_in_seconds: Option<i32>,
}

impl DryRunResponse for RetryResponse {
    fn dry_run_success() -> Self {
        Self {
            status: Status::Succ,
            msg: DRY_RUN_MESSAGE.to_string(),
            min_retry_delay_in_seconds: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidateLoadBalancerRequest {
    pub dry_run: bool,
    #[serde(default)]
    pub lb_spec: Attributes,
    pub operation: Operation,
    #[serde(default)]
    pub attributes: Attributes,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old_attributes: Option<Attributes>,
}

impl WebhookRequest for ValidateLoadBalancerRequest {
    const WEBHOOK: Webhook = Webhook::ValidateLoadBalancer;
    type Response = ValidateResponse;

    fn dry_run(&self) -> bool {
        self.dry_run
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateLoadBalancerRequest {
    #[serde(flatten)]
    pub identity: RetryIdentity,
    pub dry_run: bool,
    #[serde(default)]
    pub lb_spec: Attributes,
    #[serde(default)]
    pub attributes: Attributes,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateLoadBalancerResponse {
    #[serde(flatten)]
    pub response: RetryResponse,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lb_info: Option<Attributes>,
}

impl DryRunResponse for CreateLoadBalancerResponse {
    fn dry_run_success() -> Self {
        Self {
            response: RetryResponse::dry_run_success(),
            lb_info: None,
        }
    }
}

impl WebhookRequest for CreateLoadBalancerRequest {
    const WEBHOOK: Webhook = Webhook::CreateLoadBalancer;
    type Response = CreateLoadBalancerResponse;

    fn dry_run(&self) -> bool {
        self.dry_run
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnsureLoadBalancerRequest {
    #[serde(flatten)]
    pub identity: RetryIdentity,
    pub dry_run: bool,
    #[serde(default)]
    pub lb_info: Attributes,
    #[serde(default)]
    pub attributes: Attributes,
}

impl WebhookRequest for EnsureLoadBalancerRequest {
    const WEBHOOK: Webhook = Webhook::EnsureLoadBalancer;
    type Response = RetryResponse;

    fn dry_run(&self) -> bool {
        self.dry_run
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteLoadBalancerRequest {
    #[serde(flatten)]
    pub identity: RetryIdentity,
    pub dry_run: bool,
    #[serde(default)]
    pub lb_info: Attributes,
    #[serde(default)]
    pub attributes: Attributes,
}

impl WebhookRequest for DeleteLoadBalancerRequest {
    const WEBHOOK: Webhook = Webhook::DeleteLoadBalancer;
    type Response = RetryResponse;

    fn dry_run(&self) -> bool {
        self.dry_run
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidateBackendRequest {
    pub dry_run: bool,
    pub backend_type: BackendType,
    #[serde(default)]
    pub lb_info: Attributes,
    #[serde(default)]
    pub parameters: Attributes,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old_parameters: Option<Attributes>,
    pub operation: Operation,
}

impl WebhookRequest for ValidateBackendRequest {
    const WEBHOOK: Webhook = Webhook::ValidateBackend;
    type Response = ValidateResponse;

    fn dry_run(&self) -> bool {
        self.dry_run
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortSelector {
    pub port: i32,
    pub protocol: String,
}

/// The pod a backend address is generated for.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PodBackendInfo {
    pub pod: serde_json::Value,
    pub port: PortSelector,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceBackendInfo {
    pub service: serde_json::Value,
    pub port: PortSelector,
    pub node_port: i32,
    pub node_name: String,
    #[serde(default)]
    pub node_addresses: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateBackendAddrRequest {
    #[serde(flatten)]
    pub identity: RetryIdentity,
    pub dry_run: bool,
    #[serde(default)]
    pub lb_info: Attributes,
    #[serde(default)]
    pub lb_attributes: Attributes,
    #[serde(default)]
    pub parameters: Attributes,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pod_backend: Option<PodBackendInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_backend: Option<ServiceBackendInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub static_addr: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateBackendAddrResponse {
    #[serde(flatten)]
    pub response: RetryResponse,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backend_addr: Option<String>,
}

impl DryRunResponse for GenerateBackendAddrResponse {
    fn dry_run_success() -> Self {
        Self {
            response: RetryResponse::dry_run_success(),
            backend_addr: None,
        }
    }
}

impl WebhookRequest for GenerateBackendAddrRequest {
    const WEBHOOK: Webhook = Webhook::GenerateBackendAddr;
    type Response = GenerateBackendAddrResponse;

    fn dry_run(&self) -> bool {
        self.dry_run
    }
}

/// Body shared by backend registration and deregistration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackendOperation {
    #[serde(flatten)]
    pub identity: RetryIdentity,
    pub dry_run: bool,
    #[serde(default)]
    pub lb_info: Attributes,
    pub backend_addr: String,
    #[serde(default)]
    pub parameters: Attributes,
    #[serde(default)]
    pub injected_info: Attributes,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackendOperationResponse {
    #[serde(flatten)]
    pub response: RetryResponse,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub injected_info: Option<Attributes>,
}

impl DryRunResponse for BackendOperationResponse {
    fn dry_run_success() -> Self {
        Self {
            response: RetryResponse::dry_run_success(),
            injected_info: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EnsureBackendRegisteredRequest(pub BackendOperation);

impl WebhookRequest for EnsureBackendRegisteredRequest {
    const WEBHOOK: Webhook = Webhook::EnsureBackendRegistered;
    type Response = BackendOperationResponse;

    fn dry_run(&self) -> bool {
        self.0.dry_run
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EnsureBackendDeregisteredRequest(pub BackendOperation);

impl WebhookRequest for EnsureBackendDeregisteredRequest {
    const WEBHOOK: Webhook = Webhook::EnsureBackendDeregistered;
    type Response = BackendOperationResponse;

    fn dry_run(&self) -> bool {
        self.0.dry_run
    }
}
