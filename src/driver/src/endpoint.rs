use std::{collections::BTreeMap, time::Duration};

use crate::{
    error::Error,
    webhook::{Webhook, DEFAULT_WEBHOOK_TIMEOUT},
};

/// Where and how a driver is called.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub name: String,
    url: String,
    pub accept_dry_run_call: bool,
    timeouts: BTreeMap<Webhook, Duration>,
}

impl Endpoint {
    pub fn new(name: &str, url: &str) -> Result<Self, Error> {
        url::Url::parse(url).map_err(|e| Error::InvalidUrl {
            url: url.to_string(),
            message: e.to_string(),
        })?;
        Ok(Self {
            name: name.to_string(),
            url: url.trim_end_matches('/').to_string(),
            accept_dry_run_call: false,
            timeouts: BTreeMap::new(),
        })
    }

    pub fn accept_dry_run_call(mut self, accept: bool) -> Self {
        self.accept_dry_run_call = accept;
        self
    }

    pub fn with_timeout(mut self, webhook: Webhook, timeout: Duration) -> Self {
        self.timeouts.insert(webhook, timeout);
        self
    }

    /// Declared timeout of the webhook, or the default when the driver declares none.
    pub fn timeout(&self, webhook: Webhook) -> Duration {
        self.timeouts
            .get(&webhook)
            .copied()
            .unwrap_or(DEFAULT_WEBHOOK_TIMEOUT)
    }

    pub fn webhook_url(&self, webhook: Webhook) -> String {
        format!("{}/{}", self.url, webhook)
    }

    pub fn health_url(&self) -> String {
        format!("{}/healthz", self.url)
    }
}
