use std::{fmt::Debug, sync::Arc};

use async_trait::async_trait;
use k8s_openapi::NamespaceResourceScope;
use kube::{api::ListParams, Api, Client, Resource};
use serde::de::DeserializeOwned;

use crate::crd::{
    backend_record::BackendRecord, load_balancer::LoadBalancer,
    load_balancer_driver::LoadBalancerDriver,
};

/// Read-only view on stored resources of kind `K`.
#[async_trait]
pub trait ResourceLookup<K>: Send + Sync {
    /// `Ok(None)` when the object does not exist.
    async fn get(&self, namespace: &str, name: &str) -> Result<Option<K>, kube::Error>;

    /// Lists objects matching `label_selector`; `namespace = None` searches all namespaces.
    async fn list(
        &self,
        namespace: Option<&str>,
        label_selector: &str,
    ) -> Result<Vec<K>, kube::Error>;
}

#[derive(Clone)]
pub struct ApiLookup {
    client: Client,
}

impl ApiLookup {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl<K> ResourceLookup<K> for ApiLookup
where
    K: Resource<Scope = NamespaceResourceScope, DynamicType = ()>
        + Clone
        + DeserializeOwned
        + Debug
        + Send
        + Sync
        + 'static,
{
    async fn get(&self, namespace: &str, name: &str) -> Result<Option<K>, kube::Error> {
        let api = Api::<K>::namespaced(self.client.clone(), namespace);
        api.get_opt(name).await
    }

    async fn list(
        &self,
        namespace: Option<&str>,
        label_selector: &str,
    ) -> Result<Vec<K>, kube::Error> {
        let api = match namespace {
            Some(ns) => Api::<K>::namespaced(self.client.clone(), ns),
            None => Api::<K>::all(self.client.clone()),
        };
        let list = api
            .list(&ListParams::default().labels(label_selector))
            .await?;
        Ok(list.items)
    }
}

/// Lookups the admission engine consults.
#[derive(Clone)]
pub struct Lookups {
    pub load_balancers: Arc<dyn ResourceLookup<LoadBalancer>>,
    pub drivers: Arc<dyn ResourceLookup<LoadBalancerDriver>>,
    pub backend_records: Arc<dyn ResourceLookup<BackendRecord>>,
}

impl Lookups {
    pub fn from_client(client: Client) -> Self {
        let lookup = Arc::new(ApiLookup::new(client));
        Self {
            load_balancers: lookup.clone(),
            drivers: lookup.clone(),
            backend_records: lookup,
        }
    }
}

#[cfg(test)]
mod tests {
    use http::{Request, Response};
    use hyper::Body;
    use serde_json::json;

    use super::*;
    use crate::fixture::test_load_balancer;

    type ApiServerHandle = tower_test::mock::Handle<Request<Body>, Response<Body>>;

    fn mock_client() -> (Client, ApiServerHandle) {
        let (mock_service, handle) = tower_test::mock::pair::<Request<Body>, Response<Body>>();
        (Client::new(mock_service, "default"), handle)
    }

    async fn timeout_after_1s(handle: tokio::task::JoinHandle<()>) {
        tokio::time::timeout(std::time::Duration::from_secs(1), handle)
            .await
            .expect("timeout on mock apiserver")
            .expect("scenario succeeded")
    }

    #[tokio::test]
    async fn test_get_missing_driver() {
        let (client, mut handle) = mock_client();
        let lookup = ApiLookup::new(client);

        let server = tokio::spawn(async move {
            let (request, send) = handle.next_request().await.expect("service not called");
            assert_eq!(request.method(), http::Method::GET);
            assert_eq!(
                request.uri().path(),
                "/apis/lbcf.tkestack.io/v1beta1/namespaces/kube-system/loadbalancerdrivers/lbcf-missing"
            );
            let status = json!({
                "kind": "Status",
                "apiVersion": "v1",
                "status": "Failure",
                "message": "loadbalancerdrivers \"lbcf-missing\" not found",
                "reason": "NotFound",
                "code": 404,
            });
            send.send_response(
                Response::builder()
                    .status(404)
                    .body(Body::from(serde_json::to_vec(&status).unwrap()))
                    .unwrap(),
            );
        });

        let driver = ResourceLookup::<LoadBalancerDriver>::get(&lookup, "kube-system", "lbcf-missing")
            .await
            .unwrap();
        assert!(driver.is_none());
        timeout_after_1s(server).await;
    }

    #[tokio::test]
    async fn test_list_all_namespaces_by_label() {
        let (client, mut handle) = mock_client();
        let lookup = ApiLookup::new(client);
        let lb = test_load_balancer("team-a", "lb1", "lbcf-clb");

        let server = tokio::spawn(async move {
            let (request, send) = handle.next_request().await.expect("service not called");
            assert_eq!(request.method(), http::Method::GET);
            assert_eq!(
                request.uri().path(),
                "/apis/lbcf.tkestack.io/v1beta1/loadbalancers"
            );
            assert!(request
                .uri()
                .query()
                .unwrap_or_default()
                .contains("labelSelector="));
            let list = json!({
                "apiVersion": "lbcf.tkestack.io/v1beta1",
                "kind": "LoadBalancerList",
                "metadata": { "resourceVersion": "1" },
                "items": [lb],
            });
            send.send_response(
                Response::builder()
                    .body(Body::from(serde_json::to_vec(&list).unwrap()))
                    .unwrap(),
            );
        });

        let lbs = ResourceLookup::<LoadBalancer>::list(
            &lookup,
            None,
            "lbcf.tkestack.io/lb-driver=lbcf-clb",
        )
        .await
        .unwrap();
        assert_eq!(lbs.len(), 1);
        assert_eq!(lbs[0].spec.lb_driver, "lbcf-clb");
        timeout_after_1s(server).await;
    }
}
