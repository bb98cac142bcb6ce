use std::str::FromStr;

use kube::{CustomResource, ResourceExt};
use lbcfd_driver::{
    endpoint::Endpoint,
    webhook::{parse_duration, Webhook, DEFAULT_WEBHOOK_TIMEOUT_STR},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::{
    common::{is_driver_draining, Condition},
    error::Error,
};

pub const DRIVER_TYPE_WEBHOOK: &str = "Webhook";

#[derive(CustomResource, Debug, Serialize, Deserialize, Default, Clone, JsonSchema)]
#[kube(
    group = "lbcf.tkestack.io",
    version = "v1beta1",
    kind = "LoadBalancerDriver",
    shortname = "lbd"
)]
#[kube(status = "LoadBalancerDriverStatus")]
#[kube(namespaced)]
#[kube(
    printcolumn = r#"{"name":"TYPE", "type":"string", "description":"Type of the driver", "jsonPath":".spec.driverType"}"#,
    printcolumn = r#"{"name":"URL", "type":"string", "description":"Base URL of the driver", "jsonPath":".spec.url"}"#,
    printcolumn = r#"{"name":"AGE", "type":"date", "description":"Date from created", "jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct LoadBalancerDriverSpec {
    #[serde(default)]
    pub driver_type: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub accept_dry_run_call: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub webhooks: Option<Vec<WebhookConfig>>,
}

#[derive(Deserialize, Serialize, Clone, Default, Debug, JsonSchema, PartialEq, Eq)]
pub struct WebhookConfig {
    #[serde(default)]
    pub name: String,
    /// Duration such as `10s`.
    #[serde(default)]
    pub timeout: String,
}

impl WebhookConfig {
    pub fn with_default_timeout(webhook: Webhook) -> Self {
        Self {
            name: webhook.to_string(),
            timeout: DEFAULT_WEBHOOK_TIMEOUT_STR.to_string(),
        }
    }
}

/// Every known webhook with the default timeout.
pub fn default_webhooks() -> Vec<WebhookConfig> {
    Webhook::ALL
        .into_iter()
        .map(WebhookConfig::with_default_timeout)
        .collect()
}

#[derive(Deserialize, Serialize, Clone, Default, Debug, JsonSchema)]
pub struct LoadBalancerDriverStatus {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conditions: Option<Vec<Condition>>,
}

impl LoadBalancerDriver {
    pub fn is_draining(&self) -> bool {
        is_driver_draining(self.labels())
    }

    pub fn is_deleting(&self) -> bool {
        self.metadata.deletion_timestamp.is_some()
    }

    /// Call target of this driver.
    ///
    /// Webhooks with unknown names or unparsable timeouts are ignored; calls to them use the
    /// default timeout.
    pub fn endpoint(&self) -> Result<Endpoint, Error> {
        let mut endpoint = Endpoint::new(&self.name_any(), &self.spec.url)
            .map_err(|e| Error::Endpoint(e.to_string()))?
            .accept_dry_run_call(self.spec.accept_dry_run_call);
        for hook in self.spec.webhooks.iter().flatten() {
            if let (Ok(webhook), Ok(timeout)) =
                (Webhook::from_str(&hook.name), parse_duration(&hook.timeout))
            {
                endpoint = endpoint.with_timeout(webhook, timeout);
            }
        }
        Ok(endpoint)
    }
}
