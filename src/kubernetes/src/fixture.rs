// #[cfg(test)]
use std::{
    collections::{BTreeMap, HashMap},
    sync::{Arc, Mutex},
    time::Duration,
};

use async_trait::async_trait;
use kube::{core::ObjectMeta, Resource, ResourceExt};
use lbcfd_driver::{client::DriverClient, error::Error as DriverError, invoker::Invoker};
use serde_json::{json, Value};

use crate::{
    context::{Context, State},
    crd::{
        backend_group::{BackendGroup, BackendGroupSpec},
        backend_record::{BackendRecord, BackendRecordSpec, PodBackendRecord},
        bind::{Bind, BindSpec, TargetLoadBalancer},
        common::{PodBackend, PortSelector, SelectPodByLabel, LABEL_DRIVER_NAME},
        load_balancer::{LoadBalancer, LoadBalancerSpec},
        load_balancer_driver::{
            default_webhooks, LoadBalancerDriver, LoadBalancerDriverSpec, DRIVER_TYPE_WEBHOOK,
        },
    },
    lister::{Lookups, ResourceLookup},
};

fn meta(namespace: &str, name: &str) -> ObjectMeta {
    ObjectMeta {
        name: Some(name.to_string()),
        namespace: Some(namespace.to_string()),
        ..Default::default()
    }
}

fn test_pods() -> PodBackend {
    PodBackend {
        port: None,
        ports: Some(vec![PortSelector {
            port_number: None,
            port: Some(80),
            protocol: Some("TCP".to_string()),
        }]),
        by_label: Some(SelectPodByLabel {
            selector: BTreeMap::from([("app".to_string(), "nginx".to_string())]),
            except: None,
        }),
        by_name: None,
    }
}

pub fn test_driver(namespace: &str, name: &str) -> LoadBalancerDriver {
    LoadBalancerDriver {
        metadata: meta(namespace, name),
        spec: LoadBalancerDriverSpec {
            driver_type: DRIVER_TYPE_WEBHOOK.to_string(),
            url: format!("http://{name}.{namespace}.svc"),
            accept_dry_run_call: true,
            webhooks: Some(default_webhooks()),
        },
        status: None,
    }
}

pub fn test_load_balancer(namespace: &str, name: &str, driver: &str) -> LoadBalancer {
    let mut metadata = meta(namespace, name);
    if !driver.is_empty() {
        metadata.labels = Some(BTreeMap::from([(
            LABEL_DRIVER_NAME.to_string(),
            driver.to_string(),
        )]));
    }
    LoadBalancer {
        metadata,
        spec: LoadBalancerSpec {
            lb_driver: driver.to_string(),
            lb_spec: BTreeMap::from([("zone".to_string(), "a".to_string())]),
            attributes: None,
            scope: None,
            ensure_policy: None,
        },
        status: None,
    }
}

pub fn test_backend_group(namespace: &str, name: &str, lbs: &[&str]) -> BackendGroup {
    BackendGroup {
        metadata: meta(namespace, name),
        spec: BackendGroupSpec {
            load_balancers: (!lbs.is_empty())
                .then(|| lbs.iter().map(|lb| lb.to_string()).collect()),
            pods: Some(test_pods()),
            ..Default::default()
        },
        status: None,
    }
}

pub fn test_backend_record(namespace: &str, name: &str, lb: &str, driver: &str) -> BackendRecord {
    let mut metadata = meta(namespace, name);
    metadata.labels = Some(BTreeMap::from([(
        LABEL_DRIVER_NAME.to_string(),
        driver.to_string(),
    )]));
    BackendRecord {
        metadata,
        spec: BackendRecordSpec {
            lb_name: lb.to_string(),
            lb_driver: driver.to_string(),
            pod_backend: Some(PodBackendRecord {
                name: "pod-0".to_string(),
                port: PortSelector {
                    port_number: None,
                    port: Some(80),
                    protocol: Some("TCP".to_string()),
                },
            }),
            ..Default::default()
        },
        status: None,
    }
}

pub fn test_bind(namespace: &str, name: &str, targets: &[(&str, &str)]) -> Bind {
    Bind {
        metadata: meta(namespace, name),
        spec: BindSpec {
            load_balancers: targets
                .iter()
                .map(|(lb, driver)| TargetLoadBalancer {
                    name: lb.to_string(),
                    driver: driver.to_string(),
                    spec: BTreeMap::from([("zone".to_string(), "a".to_string())]),
                    attributes: None,
                })
                .collect(),
            pods: Some(test_pods()),
            ..Default::default()
        },
        status: None,
    }
}

/// Lookup over a fixed set of objects.
pub struct InMemoryLookup<K> {
    items: Vec<K>,
}

impl<K> InMemoryLookup<K> {
    pub fn new(items: Vec<K>) -> Self {
        Self { items }
    }
}

/// Matches `k=v`, `k==v`, `k!=v` and bare `k` terms joined by commas.
pub fn matches_selector(labels: &BTreeMap<String, String>, selector: &str) -> bool {
    selector
        .split(',')
        .map(str::trim)
        .filter(|term| !term.is_empty())
        .all(|term| {
            if let Some((k, v)) = term.split_once("!=") {
                labels.get(k.trim()).map(String::as_str) != Some(v.trim())
            } else if let Some((k, v)) = term.split_once('=') {
                let v = v.trim_start_matches('=');
                labels.get(k.trim()).map(String::as_str) == Some(v.trim())
            } else {
                labels.contains_key(term)
            }
        })
}

#[async_trait]
impl<K> ResourceLookup<K> for InMemoryLookup<K>
where
    K: Resource + Clone + Send + Sync,
{
    async fn get(&self, namespace: &str, name: &str) -> Result<Option<K>, kube::Error> {
        Ok(self
            .items
            .iter()
            .find(|i| i.namespace().as_deref() == Some(namespace) && i.name_any() == name)
            .cloned())
    }

    async fn list(
        &self,
        namespace: Option<&str>,
        label_selector: &str,
    ) -> Result<Vec<K>, kube::Error> {
        Ok(self
            .items
            .iter()
            .filter(|i| namespace.is_none() || i.namespace().as_deref() == namespace)
            .filter(|i| matches_selector(i.labels(), label_selector))
            .cloned()
            .collect())
    }
}

/// Scripted driver answer.
#[derive(Debug, Clone)]
pub enum Reply {
    Json(Value),
    Fail(String),
}

/// Invoker answering from a script and remembering every body it got.
///
/// Webhooks without a scripted reply succeed.
#[derive(Default)]
pub struct RecordingInvoker {
    replies: Mutex<HashMap<String, Reply>>,
    delay: Mutex<Option<Duration>>,
    calls: Mutex<Vec<(String, Value)>>,
}

impl RecordingInvoker {
    pub fn reply(&self, webhook: &str, reply: Reply) {
        self.replies
            .lock()
            .unwrap()
            .insert(webhook.to_string(), reply);
    }

    pub fn delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = Some(delay);
    }

    /// Bodies sent to `webhook`, oldest first.
    pub fn calls(&self, webhook: &str) -> Vec<Value> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(w, _)| w == webhook)
            .map(|(_, body)| body.clone())
            .collect()
    }

    pub fn call_count(&self, webhook: &str) -> usize {
        self.calls(webhook).len()
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    fn scripted(&self, webhook: &str) -> Option<Reply> {
        self.replies.lock().unwrap().get(webhook).cloned()
    }
}

#[async_trait]
impl Invoker for RecordingInvoker {
    async fn invoke(&self, url: &str, _timeout: Duration, body: Value) -> Result<Value, DriverError> {
        let webhook = url.rsplit('/').next().unwrap_or_default().to_string();
        self.calls.lock().unwrap().push((webhook.clone(), body));

        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        match self.scripted(&webhook) {
            Some(Reply::Json(v)) => Ok(v),
            Some(Reply::Fail(message)) => Err(DriverError::Transport {
                url: url.to_string(),
                message,
            }),
            None if webhook.starts_with("validate") => Ok(json!({"succ": true, "msg": ""})),
            None => Ok(json!({"status": "Succ", "msg": ""})),
        }
    }

    async fn health(&self, url: &str, _timeout: Duration) -> Result<(), DriverError> {
        match self.scripted("healthz") {
            Some(Reply::Fail(message)) => Err(DriverError::Transport {
                url: url.to_string(),
                message,
            }),
            _ => Ok(()),
        }
    }
}

/// Objects and driver behaviour an admission test runs against.
#[derive(Default)]
pub struct TestEnv {
    pub load_balancers: Vec<LoadBalancer>,
    pub drivers: Vec<LoadBalancerDriver>,
    pub backend_records: Vec<BackendRecord>,
    pub invoker: Arc<RecordingInvoker>,
    pub state: State,
}

impl TestEnv {
    pub fn with_driver(mut self, driver: LoadBalancerDriver) -> Self {
        self.drivers.push(driver);
        self
    }

    pub fn with_load_balancer(mut self, lb: LoadBalancer) -> Self {
        self.load_balancers.push(lb);
        self
    }

    pub fn with_backend_record(mut self, record: BackendRecord) -> Self {
        self.backend_records.push(record);
        self
    }

    pub fn with_reply(self, webhook: &str, reply: Reply) -> Self {
        self.invoker.reply(webhook, reply);
        self
    }

    pub fn with_delay(self, delay: Duration) -> Self {
        self.invoker.delay(delay);
        self
    }

    pub fn lookups(&self) -> Lookups {
        Lookups {
            load_balancers: Arc::new(InMemoryLookup::new(self.load_balancers.clone())),
            drivers: Arc::new(InMemoryLookup::new(self.drivers.clone())),
            backend_records: Arc::new(InMemoryLookup::new(self.backend_records.clone())),
        }
    }
}

/// Context over `env`; metrics go to `env.state`, so call it once per env.
pub fn test_context(env: &TestEnv) -> Arc<Context> {
    env.state
        .to_context(env.lookups(), DriverClient::new(env.invoker.clone()))
        .unwrap()
}

/// AdmissionReview as the API server sends it.
pub fn admission_review(
    kind: &str,
    operation: &str,
    object: Option<Value>,
    old_object: Option<Value>,
) -> Value {
    let meta = object.as_ref().or(old_object.as_ref());
    let name = meta
        .and_then(|o| o["metadata"]["name"].as_str())
        .unwrap_or_default();
    let namespace = meta
        .and_then(|o| o["metadata"]["namespace"].as_str())
        .unwrap_or_default();
    json!({
        "apiVersion": "admission.k8s.io/v1",
        "kind": "AdmissionReview",
        "request": {
            "uid": "705ab4f5-6393-11e8-b7cc-42010a800002",
            "kind": {"group": "lbcf.tkestack.io", "version": "v1beta1", "kind": kind},
            "resource": {
                "group": "lbcf.tkestack.io",
                "version": "v1beta1",
                "resource": format!("{}s", kind.to_lowercase()),
            },
            "name": name,
            "namespace": namespace,
            "operation": operation,
            "userInfo": {"username": "admin"},
            "object": object,
            "oldObject": old_object,
            "dryRun": false,
        },
    })
}
