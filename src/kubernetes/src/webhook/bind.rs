use std::collections::BTreeMap;

use async_trait::async_trait;
use futures::future::join_all;
use kube::ResourceExt;
use lbcfd_driver::types::{
    BackendType, Operation, ValidateBackendRequest, ValidateLoadBalancerRequest,
};

use super::{
    admission::AdmissionPolicy,
    driver::{call_validate, resolve_driver},
    error::Error,
    patch::{self, PatchSet},
    validation::{self, ErrorList},
};
use crate::{
    context::Context,
    crd::bind::{Bind, TargetLoadBalancer},
};

/// One target of a Bind together with its previous version, if any.
struct Target<'a> {
    current: &'a TargetLoadBalancer,
    previous: Option<&'a TargetLoadBalancer>,
}

impl Bind {
    fn lb_info(&self, target: &str) -> BTreeMap<String, String> {
        self.status
            .as_ref()
            .and_then(|s| s.load_balancer_statuses.as_ref())
            .and_then(|statuses| statuses.iter().find(|s| s.name == target))
            .and_then(|s| s.lb_info.clone())
            .unwrap_or_default()
    }

    /// Validates the load balancer then the backends of one target.
    async fn validate_target(
        &self,
        ctx: &Context,
        target: Target<'_>,
        old: Option<&Bind>,
        dry_run: bool,
    ) -> Result<(), Error> {
        let namespace = self.namespace().unwrap_or_default();
        let driver = resolve_driver(ctx, &namespace, &target.current.driver).await?;
        let operation = match target.previous {
            Some(_) => Operation::Update,
            None => Operation::Create,
        };

        let lb_req = ValidateLoadBalancerRequest {
            dry_run,
            lb_spec: target.current.spec.clone(),
            operation,
            attributes: target.current.attributes(),
            old_attributes: target.previous.map(|p| p.attributes()),
        };
        call_validate(ctx, &driver, &lb_req).await?;

        let backend_req = ValidateBackendRequest {
            dry_run,
            backend_type: BackendType::Pod,
            lb_info: old
                .map(|o| o.lb_info(&target.current.name))
                .unwrap_or_default(),
            parameters: self.spec.parameters(),
            old_parameters: target
                .previous
                .and(old)
                .map(|o| o.spec.parameters()),
            operation,
        };
        call_validate(ctx, &driver, &backend_req).await
    }

    /// Runs every target concurrently and reports all failures together.
    async fn validate_targets(
        &self,
        ctx: &Context,
        old: Option<&Bind>,
        dry_run: bool,
    ) -> Result<(), Error> {
        let branches = self.spec.load_balancers.iter().map(|current| {
            let target = Target {
                current,
                previous: old.and_then(|o| o.spec.target(&current.name)),
            };
            self.validate_target(ctx, target, old, dry_run)
        });
        let errs: Vec<Error> = join_all(branches)
            .await
            .into_iter()
            .filter_map(Result::err)
            .collect();
        match Error::aggregate(errs) {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl AdmissionPolicy for Bind {
    fn structural(&self) -> ErrorList {
        validation::bind::validate(self)
    }

    fn canonicalize(&self, _create: bool) -> PatchSet {
        patch::bind::build(self)
    }

    async fn validate_create(&self, ctx: &Context, dry_run: bool) -> Result<(), Error> {
        self.structural().into_result().map_err(Error::Validation)?;
        self.validate_targets(ctx, None, dry_run).await
    }

    async fn validate_update(
        &self,
        old: &Self,
        ctx: &Context,
        dry_run: bool,
    ) -> Result<(), Error> {
        validation::bind::validate_update(old, self)
            .into_result()
            .map_err(Error::ImmutableField)?;
        self.structural().into_result().map_err(Error::Validation)?;
        self.validate_targets(ctx, Some(old), dry_run).await
    }
}
