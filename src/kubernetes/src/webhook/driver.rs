use lbcfd_driver::types::{ValidateResponse, WebhookRequest};

use super::error::Error;
use crate::{
    context::Context,
    crd::{common::driver_namespace, load_balancer_driver::LoadBalancerDriver},
    util::get_namespaced_name,
};

/// Looks up the driver `name` referenced from `namespace`.
pub async fn find_driver(
    ctx: &Context,
    namespace: &str,
    name: &str,
) -> Result<LoadBalancerDriver, Error> {
    let driver_ns = driver_namespace(name, namespace);
    ctx.lookups
        .drivers
        .get(&driver_ns, name)
        .await
        .map_err(|e| Error::Lookup {
            kind: "LoadBalancerDriver".to_string(),
            source: e,
        })?
        .ok_or(Error::DriverNotFound {
            namespace: driver_ns,
            name: name.to_string(),
        })
}

/// Like [`find_driver`], but also rejects drivers that must not take new objects.
pub async fn resolve_driver(
    ctx: &Context,
    namespace: &str,
    name: &str,
) -> Result<LoadBalancerDriver, Error> {
    let driver = find_driver(ctx, namespace, name).await?;
    if driver.is_draining() {
        return Err(Error::DriverDraining(get_namespaced_name(&driver)));
    }
    if driver.is_deleting() {
        return Err(Error::DriverDeleting(get_namespaced_name(&driver)));
    }
    Ok(driver)
}

/// Calls a no-retry webhook of `driver`; `succ=false` becomes a denial.
#[tracing::instrument(skip_all, fields(driver = %get_namespaced_name(driver), webhook = R::WEBHOOK.as_str()))]
pub async fn call_validate<R>(ctx: &Context, driver: &LoadBalancerDriver, req: &R) -> Result<(), Error>
where
    R: WebhookRequest<Response = ValidateResponse>,
{
    let webhook = R::WEBHOOK.as_str();
    let driver_name = get_namespaced_name(driver);
    let endpoint = driver.endpoint().map_err(Error::Crd)?;

    match ctx.drivers.call(&endpoint, req).await {
        Ok(resp) if resp.succ => {
            ctx.metrics.webhook_call(webhook, "succ");
            tracing::debug!(msg = resp.msg, "driver accepted");
            Ok(())
        }
        Ok(resp) => {
            ctx.metrics.webhook_call(webhook, "fail");
            tracing::info!(msg = resp.msg, "driver rejected");
            Err(Error::WebhookDenied {
                driver: driver_name,
                webhook: webhook.to_string(),
                message: resp.msg,
            })
        }
        Err(e) => {
            ctx.metrics.webhook_call(webhook, e.reason());
            tracing::error!(error=?e, "failed to call driver");
            Err(Error::WebhookTransport {
                driver: driver_name,
                webhook: webhook.to_string(),
                source: e,
            })
        }
    }
}
