use async_trait::async_trait;
use kube::ResourceExt;

use super::{
    admission::AdmissionPolicy,
    error::Error,
    patch::{self, PatchSet},
    validation::{self, ErrorList},
};
use crate::{
    context::Context,
    crd::{
        common::{LABEL_DRIVER_DRAINING, LABEL_DRIVER_NAME, SYSTEM_NAMESPACE},
        load_balancer_driver::LoadBalancerDriver,
    },
    util::get_namespaced_name,
};

#[async_trait]
impl AdmissionPolicy for LoadBalancerDriver {
    fn structural(&self) -> ErrorList {
        validation::load_balancer_driver::validate(self)
    }

    fn canonicalize(&self, _create: bool) -> PatchSet {
        patch::load_balancer_driver::build(self)
    }

    async fn validate_create(&self, _ctx: &Context, _dry_run: bool) -> Result<(), Error> {
        self.structural().into_result().map_err(Error::Validation)
    }

    async fn validate_update(
        &self,
        old: &Self,
        _ctx: &Context,
        _dry_run: bool,
    ) -> Result<(), Error> {
        validation::load_balancer_driver::validate_update(old, self)
            .into_result()
            .map_err(Error::ImmutableField)?;
        self.structural().into_result().map_err(Error::Validation)
    }

    /// Only a draining driver nothing depends on any more may go.
    async fn validate_delete(ctx: &Context, old: Option<&Self>) -> Result<(), Error> {
        let Some(driver) = old else {
            return Ok(());
        };
        let name = get_namespaced_name(driver);
        if !driver.is_draining() {
            return Err(Error::Forbidden(format!(
                "LoadBalancerDriver {name} must be labeled {LABEL_DRIVER_DRAINING}=true before deletion"
            )));
        }

        let namespace = driver.namespace().unwrap_or_default();
        let scope = (namespace != SYSTEM_NAMESPACE).then_some(namespace.as_str());
        let selector = format!("{LABEL_DRIVER_NAME}={}", driver.name_any());

        let lbs = ctx
            .lookups
            .load_balancers
            .list(scope, &selector)
            .await
            .map_err(|e| Error::Lookup {
                kind: "LoadBalancer".to_string(),
                source: e,
            })?;
        if !lbs.is_empty() {
            return Err(Error::Forbidden(format!(
                "LoadBalancerDriver {name} is still used by {} LoadBalancer(s)",
                lbs.len()
            )));
        }

        let records = ctx
            .lookups
            .backend_records
            .list(scope, &selector)
            .await
            .map_err(|e| Error::Lookup {
                kind: "BackendRecord".to_string(),
                source: e,
            })?;
        if !records.is_empty() {
            return Err(Error::Forbidden(format!(
                "LoadBalancerDriver {name} is still used by {} BackendRecord(s)",
                records.len()
            )));
        }
        Ok(())
    }
}
