use std::sync::Arc;

use crate::{
    endpoint::Endpoint,
    error::Error,
    invoker::{HttpInvoker, Invoker},
    types::{DryRunResponse, WebhookRequest},
    webhook::DEFAULT_WEBHOOK_TIMEOUT,
};

/// Typed calls to drivers on top of an [`Invoker`].
#[derive(Clone)]
pub struct DriverClient {
    invoker: Arc<dyn Invoker>,
}

impl DriverClient {
    pub fn new(invoker: Arc<dyn Invoker>) -> Self {
        Self { invoker }
    }

    pub fn http() -> Result<Self, Error> {
        Ok(Self::new(Arc::new(HttpInvoker::new()?)))
    }

    /// Calls the webhook `R` is bound to.
    ///
    /// A dry-run request to a driver that does not accept dry-run calls never reaches the
    /// transport; it is answered with the synthetic success of `R::Response`.
    #[tracing::instrument(skip_all, fields(driver = %endpoint.name, webhook = R::WEBHOOK.as_str()))]
    pub async fn call<R: WebhookRequest>(
        &self,
        endpoint: &Endpoint,
        req: &R,
    ) -> Result<R::Response, Error> {
        if req.dry_run() && !endpoint.accept_dry_run_call {
            tracing::debug!("skip calling driver for dry-run request");
            return Ok(R::Response::dry_run_success());
        }

        let url = endpoint.webhook_url(R::WEBHOOK);
        let timeout = endpoint.timeout(R::WEBHOOK);
        let body = serde_json::to_value(req).map_err(Error::Encode)?;

        tracing::debug!(url, ?timeout, "call driver webhook");

        let resp = tokio::time::timeout(timeout, self.invoker.invoke(&url, timeout, body))
            .await
            .map_err(|_| Error::Timeout {
                url: url.clone(),
                timeout,
            })??;

        serde_json::from_value(resp).map_err(Error::Decode)
    }

    #[tracing::instrument(skip_all, fields(driver = %endpoint.name))]
    pub async fn health(&self, endpoint: &Endpoint) -> Result<(), Error> {
        let url = endpoint.health_url();
        tokio::time::timeout(
            DEFAULT_WEBHOOK_TIMEOUT,
            self.invoker.health(&url, DEFAULT_WEBHOOK_TIMEOUT),
        )
        .await
        .map_err(|_| Error::Timeout {
            url: url.clone(),
            timeout: DEFAULT_WEBHOOK_TIMEOUT,
        })?
    }
}
