use async_trait::async_trait;

use super::{
    admission::AdmissionPolicy,
    error::Error,
    validation::{self, ErrorList},
};
use crate::{context::Context, crd::backend_record::BackendRecord};

/// BackendRecords are owned by the reconciler; admission only guards their identity.
#[async_trait]
impl AdmissionPolicy for BackendRecord {
    fn structural(&self) -> ErrorList {
        ErrorList::new()
    }

    async fn validate_create(&self, _ctx: &Context, _dry_run: bool) -> Result<(), Error> {
        Ok(())
    }

    async fn validate_update(
        &self,
        old: &Self,
        _ctx: &Context,
        _dry_run: bool,
    ) -> Result<(), Error> {
        validation::backend_record::validate_update(old, self)
            .into_result()
            .map_err(Error::ImmutableField)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{test_context, TestEnv};

    #[tokio::test]
    async fn test_backend_record() {
        let env = TestEnv::default();
        let ctx = test_context(&env);
        let old = crate::fixture::test_backend_record("default", "br", "lb1", "lbcf-a");
        old.validate_create(&ctx, false).await.unwrap();

        let mut new = old.clone();
        new.spec.lb_info.insert("id".to_string(), "lb-1".to_string());
        new.validate_update(&old, &ctx, false).await.unwrap();

        new.spec.lb_driver = "lbcf-b".to_string();
        let err = new.validate_update(&old, &ctx, false).await.unwrap_err();
        assert_eq!(err.to_string(), "spec.lbDriver: Forbidden: field is immutable");
        BackendRecord::validate_delete(&ctx, Some(&old)).await.unwrap();
        assert_eq!(env.invoker.total_calls(), 0);
    }
}
