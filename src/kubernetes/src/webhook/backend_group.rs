use std::{collections::BTreeMap, str::FromStr};

use async_trait::async_trait;
use kube::ResourceExt;
use lbcfd_driver::types::{Operation, ValidateBackendRequest};

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
        backend_group::BackendGroup,
        common::{has_do_not_delete, DeregPolicy, LABEL_DO_NOT_DELETE},
    },
    util::get_namespaced_name,
};

impl BackendGroup {
    async fn check_deregister_webhook(&self, ctx: &Context) -> Result<(), Error> {
        let policy = self.spec.deregister_policy.as_deref().unwrap_or_default();
        if DeregPolicy::from_str(policy).ok() != Some(DeregPolicy::Webhook) {
            return Ok(());
        }
        if let Some(webhook) = &self.spec.deregister_webhook {
            let namespace = self.namespace().unwrap_or_default();
            resolve_driver(ctx, &namespace, &webhook.driver_name).await?;
        }
        Ok(())
    }

    /// Asks the driver of every existing load balancer `lbs` names whether it accepts the
    /// backends; stops at the first refusal.
    ///
    /// Load balancers that do not exist yet are skipped.
    async fn validate_backends(
        &self,
        ctx: &Context,
        lbs: &[(String, Operation)],
        old_parameters: Option<BTreeMap<String, String>>,
        dry_run: bool,
    ) -> Result<(), Error> {
        let namespace = self.namespace().unwrap_or_default();
        for (name, operation) in lbs {
            let lb = ctx
                .lookups
                .load_balancers
                .get(&namespace, name)
                .await
                .map_err(|e| Error::Lookup {
                    kind: "LoadBalancer".to_string(),
                    source: e,
                })?;
            let Some(lb) = lb else {
                tracing::debug!(lb = name, "skip validating backends of missing load balancer");
                continue;
            };
            let driver = match operation {
                Operation::Create => resolve_driver(ctx, &namespace, &lb.spec.lb_driver).await?,
                Operation::Update => find_driver(ctx, &namespace, &lb.spec.lb_driver).await?,
            };
            let req = ValidateBackendRequest {
                dry_run,
                backend_type: self.spec.backend_type().unwrap_or_default(),
                lb_info: lb.lb_info(),
                parameters: self.spec.parameters(),
                old_parameters: match operation {
                    Operation::Create => None,
                    Operation::Update => old_parameters.clone(),
                },
                operation: *operation,
            };
            call_validate(ctx, &driver, &req).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl AdmissionPolicy for BackendGroup {
    fn structural(&self) -> ErrorList {
        validation::backend_group::validate(self)
    }

    fn canonicalize(&self, _create: bool) -> PatchSet {
        patch::backend_group::build(self)
    }

    async fn validate_create(&self, ctx: &Context, dry_run: bool) -> Result<(), Error> {
        self.structural().into_result().map_err(Error::Validation)?;
        self.check_deregister_webhook(ctx).await?;

        let lbs: Vec<(String, Operation)> = self
            .spec
            .load_balancer_names()
            .into_iter()
            .map(|n| (n, Operation::Create))
            .collect();
        self.validate_backends(ctx, &lbs, None, dry_run).await
    }

    /// Newly referenced load balancers are validated as a create; the others only when the
    /// parameters changed.
    async fn validate_update(
        &self,
        old: &Self,
        ctx: &Context,
        dry_run: bool,
    ) -> Result<(), Error> {
        validation::backend_group::validate_update(old, self)
            .into_result()
            .map_err(Error::ImmutableField)?;
        self.structural().into_result().map_err(Error::Validation)?;
        if self.spec.deregister_webhook != old.spec.deregister_webhook
            || self.spec.deregister_policy != old.spec.deregister_policy
        {
            self.check_deregister_webhook(ctx).await?;
        }

        let old_names = old.spec.load_balancer_names();
        let params_changed = old.spec.parameters() != self.spec.parameters();
        let lbs: Vec<(String, Operation)> = self
            .spec
            .load_balancer_names()
            .into_iter()
            .filter_map(|n| {
                if !old_names.contains(&n) {
                    Some((n, Operation::Create))
                } else if params_changed {
                    Some((n, Operation::Update))
                } else {
                    None
                }
            })
            .collect();
        self.validate_backends(ctx, &lbs, Some(old.spec.parameters()), dry_run)
            .await
    }

    async fn validate_delete(_ctx: &Context, old: Option<&Self>) -> Result<(), Error> {
        match old {
            Some(bg) if has_do_not_delete(bg.labels()) => Err(Error::Forbidden(format!(
                "BackendGroup {} is labeled {LABEL_DO_NOT_DELETE}",
                get_namespaced_name(bg)
            ))),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use serde_json::json;

    use super::*;
    use crate::{
        crd::{
            common::{DeregisterWebhookSpec, LABEL_DRIVER_DRAINING},
            load_balancer::LoadBalancerStatus,
        },
        fixture::{
            test_backend_group, test_context, test_driver, test_load_balancer, Reply, TestEnv,
        },
    };

    fn env() -> TestEnv {
        let mut lb1 = test_load_balancer("default", "lb1", "lbcf-a");
        lb1.status = Some(LoadBalancerStatus {
            lb_info: Some(BTreeMap::from([("id".to_string(), "lb-123".to_string())])),
            conditions: None,
        });
        TestEnv::default()
            .with_driver(test_driver("kube-system", "lbcf-a"))
            .with_driver(test_driver("default", "b"))
            .with_load_balancer(lb1)
            .with_load_balancer(test_load_balancer("default", "lb2", "b"))
    }

    #[tokio::test]
    async fn test_create_calls_every_existing_load_balancer() {
        let env = env();
        let ctx = test_context(&env);
        let mut bg = test_backend_group("default", "bg", &["lb1", "lb2", "lb-missing"]);
        bg.spec.parameters = Some(BTreeMap::from([("weight".to_string(), "10".to_string())]));

        bg.validate_create(&ctx, false).await.unwrap();

        let calls = env.invoker.calls("validateBackend");
        assert_eq!(calls.len(), 2);
        assert_eq!(
            calls[0],
            json!({
                "dryRun": false,
                "backendType": "Pod",
                "lbInfo": {"id": "lb-123"},
                "parameters": {"weight": "10"},
                "operation": "Create",
            })
        );
        assert_eq!(calls[1]["lbInfo"], json!({}));
    }

    #[tokio::test]
    async fn test_create_stops_at_first_denial() {
        let env = env().with_reply(
            "validateBackend",
            Reply::Json(json!({"succ": false, "msg": "no such port"})),
        );
        let ctx = test_context(&env);
        let bg = test_backend_group("default", "bg", &["lb1", "lb2"]);

        let err = bg.validate_create(&ctx, false).await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "validateBackend of driver kube-system/lbcf-a denied the request: no such port"
        );
        assert_eq!(env.invoker.call_count("validateBackend"), 1);
    }

    #[tokio::test]
    async fn test_create_invalid_never_calls_driver() {
        let env = env();
        let ctx = test_context(&env);
        let mut bg = test_backend_group("default", "bg", &["lb1"]);
        bg.spec.static_addrs = Some(vec!["10.0.0.1:80".to_string()]);

        let err = bg.validate_create(&ctx, false).await.unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert_eq!(env.invoker.call_count("validateBackend"), 0);
    }

    #[tokio::test]
    async fn test_create_deregister_webhook_driver_draining() {
        let mut driver = test_driver("kube-system", "lbcf-dereg");
        driver.metadata.labels = Some(BTreeMap::from([(
            LABEL_DRIVER_DRAINING.to_string(),
            "true".to_string(),
        )]));
        let env = env().with_driver(driver);
        let ctx = test_context(&env);
        let mut bg = test_backend_group("default", "bg", &["lb1"]);
        bg.spec.deregister_policy = Some("Webhook".to_string());
        bg.spec.deregister_webhook = Some(DeregisterWebhookSpec {
            driver_name: "lbcf-dereg".to_string(),
            failure_policy: Some("DoNothing".to_string()),
        });

        let err = bg.validate_create(&ctx, false).await.unwrap_err();
        assert_eq!(err.to_string(), "driver kube-system/lbcf-dereg is draining");
    }

    #[tokio::test]
    async fn test_update() {
        let env = env();
        let ctx = test_context(&env);
        let old = test_backend_group("default", "bg", &["lb1"]);

        old.validate_update(&old, &ctx, false).await.unwrap();
        assert_eq!(env.invoker.call_count("validateBackend"), 0);

        let mut new = old.clone();
        new.spec.load_balancers = Some(vec!["lb1".to_string(), "lb2".to_string()]);
        new.spec.parameters = Some(BTreeMap::from([("weight".to_string(), "5".to_string())]));
        new.validate_update(&old, &ctx, false).await.unwrap();

        let calls = env.invoker.calls("validateBackend");
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0]["operation"], "Update");
        assert_eq!(calls[0]["oldParameters"], json!({}));
        assert_eq!(calls[1]["operation"], "Create");
        assert!(calls[1].get("oldParameters").is_none());
    }

    #[tokio::test]
    async fn test_update_backend_type_immutable() {
        let env = env();
        let ctx = test_context(&env);
        let old = test_backend_group("default", "bg", &["lb1"]);
        let mut new = old.clone();
        new.spec.pods = None;
        new.spec.static_addrs = Some(vec!["10.0.0.1:80".to_string()]);

        let err = new.validate_update(&old, &ctx, false).await.unwrap_err();
        assert!(matches!(err, Error::ImmutableField(_)));
    }

    #[tokio::test]
    async fn test_delete() {
        let ctx = test_context(&TestEnv::default());
        let mut bg = test_backend_group("default", "bg", &["lb1"]);
        BackendGroup::validate_delete(&ctx, Some(&bg)).await.unwrap();

        bg.metadata.labels = Some(BTreeMap::from([(
            LABEL_DO_NOT_DELETE.to_string(),
            String::new(),
        )]));
        let err = BackendGroup::validate_delete(&ctx, Some(&bg))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Forbidden(_)));
        BackendGroup::validate_delete(&ctx, None).await.unwrap();
    }
}
