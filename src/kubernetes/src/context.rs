use std::sync::Arc;

use chrono::{DateTime, Utc};
use lbcfd_driver::client::DriverClient;
use lbcfd_trace::metrics::Metrics;
use serde::Serialize;
use tokio::sync::RwLock;

use crate::lister::Lookups;

/// Everything an admission decision may consult.
#[derive(Clone)]
pub struct Context {
    pub lookups: Lookups,
    pub drivers: DriverClient,
    // Diagnostics read by the web server
    pub diagnostics: Arc<RwLock<Diagnostics>>,
    pub metrics: Metrics,
}

#[derive(Debug, Clone, Default)]
pub struct State {
    pub diagnostics: Arc<RwLock<Diagnostics>>,
    pub registry: prometheus::Registry,
}

impl State {
    pub fn new(component: &str) -> State {
        State {
            diagnostics: Arc::new(RwLock::new(Diagnostics::new(component.to_string()))),
            registry: prometheus::Registry::default(),
        }
    }

    /// Metrics getter
    pub fn metrics(&self) -> Vec<prometheus::proto::MetricFamily> {
        self.registry.gather()
    }

    /// State getter
    pub async fn diagnostics(&self) -> Diagnostics {
        self.diagnostics.read().await.clone()
    }

    /// Creates an admission Context that reports into this State.
    pub fn to_context(
        &self,
        lookups: Lookups,
        drivers: DriverClient,
    ) -> Result<Arc<Context>, prometheus::Error> {
        Ok(Arc::new(Context {
            lookups,
            drivers,
            diagnostics: self.diagnostics.clone(),
            metrics: Metrics::default().register(&self.registry)?,
        }))
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostics {
    pub component: String,
    pub last_event: DateTime<Utc>,
    pub allowed: u64,
    pub denied: u64,
}

impl Diagnostics {
    pub fn new(component: String) -> Self {
        Self {
            component,
            last_event: Utc::now(),
            allowed: 0,
            denied: 0,
        }
    }

    pub fn record(&mut self, allowed: bool) {
        self.last_event = Utc::now();
        if allowed {
            self.allowed += 1;
        } else {
            self.denied += 1;
        }
    }
}

impl Default for Diagnostics {
    fn default() -> Self {
        Self::new("lbcfd".to_string())
    }
}
