use async_trait::async_trait;
use kube::ResourceExt;
use lbcfd_driver::types::{Operation, ValidateLoadBalancerRequest};

use super::{
    admission::AdmissionPolicy,
    driver::{call_validate, find_driver, resolve_driver},
    error::Error,
    patch::{self, PatchSet},
    validation::{self, ErrorList},
};
use crate::{
    context::Context,
    crd::{
        common::{has_do_not_delete, LABEL_DO_NOT_DELETE},
        load_balancer::LoadBalancer,
    },
    util::get_namespaced_name,
};

#[async_trait]
impl AdmissionPolicy for LoadBalancer {
    fn structural(&self) -> ErrorList {
        validation::load_balancer::validate(self)
    }

    fn canonicalize(&self, create: bool) -> PatchSet {
        patch::load_balancer::build(self, create)
    }

    async fn validate_create(&self, ctx: &Context, dry_run: bool) -> Result<(), Error> {
        self.structural().into_result().map_err(Error::Validation)?;

        let namespace = self.namespace().unwrap_or_default();
        let driver = resolve_driver(ctx, &namespace, &self.spec.lb_driver).await?;
        let req = ValidateLoadBalancerRequest {
            dry_run,
            lb_spec: self.spec.lb_spec.clone(),
            operation: Operation::Create,
            attributes: self.attributes(),
            old_attributes: None,
        };
        call_validate(ctx, &driver, &req).await
    }

    async fn validate_update(
        &self,
        old: &Self,
        ctx: &Context,
        dry_run: bool,
    ) -> Result<(), Error> {
        validation::load_balancer::validate_update(old, self)
            .into_result()
            .map_err(Error::ImmutableField)?;
        self.structural().into_result().map_err(Error::Validation)?;

        if old.attributes() == self.attributes() {
            return Ok(());
        }
        // A draining driver still serves the objects it already has.
        let namespace = self.namespace().unwrap_or_default();
        let driver = find_driver(ctx, &namespace, &self.spec.lb_driver).await?;
        let req = ValidateLoadBalancerRequest {
            dry_run,
            lb_spec: self.spec.lb_spec.clone(),
            operation: Operation::Update,
            attributes: self.attributes(),
            old_attributes: Some(old.attributes()),
        };
        call_validate(ctx, &driver, &req).await
    }

    async fn validate_delete(_ctx: &Context, old: Option<&Self>) -> Result<(), Error> {
        match old {
            Some(lb) if has_do_not_delete(lb.labels()) => Err(Error::Forbidden(format!(
                "LoadBalancer {} is labeled {LABEL_DO_NOT_DELETE}",
                get_namespaced_name(lb)
            ))),
            _ => Ok(()),
        }
    }
}
