use prometheus::Registry;
use prometheus::{histogram_opts, opts, HistogramVec, IntCounterVec};
use tokio::time::Instant;

#[derive(Debug, Clone)]
pub struct Metrics {
    pub admissions: IntCounterVec,
    pub denials: IntCounterVec,
    pub webhook_calls: IntCounterVec,
    pub admission_duration: HistogramVec,
}

impl Default for Metrics {
    fn default() -> Self {
        let admission_duration = HistogramVec::new(
            histogram_opts!(
                "lbcf_admission_duration_seconds",
                "The duration of an admission decision in seconds"
            )
            .buckets(vec![0.001, 0.01, 0.1, 0.25, 0.5, 1., 5., 15., 60.]),
            &["kind"],
        )
        .expect("valid histogram options");
        let admissions = IntCounterVec::new(
            opts!(
                "lbcf_admission_requests_total",
                "Total count of admission requests",
            ),
            &["kind", "operation", "allowed"],
        )
        .expect("valid counter options");
        let denials = IntCounterVec::new(
            opts!("lbcf_admission_denials_total", "admission denials by reason",),
            &["kind", "reason"],
        )
        .expect("valid counter options");
        let webhook_calls = IntCounterVec::new(
            opts!(
                "lbcf_driver_webhook_calls_total",
                "Total count of driver webhook calls",
            ),
            &["webhook", "result"],
        )
        .expect("valid counter options");
        Metrics {
            admissions,
            denials,
            webhook_calls,
            admission_duration,
        }
    }
}

impl Metrics {
    pub fn register(self, registry: &Registry) -> Result<Self, prometheus::Error> {
        registry.register(Box::new(self.admissions.clone()))?;
        registry.register(Box::new(self.denials.clone()))?;
        registry.register(Box::new(self.webhook_calls.clone()))?;
        registry.register(Box::new(self.admission_duration.clone()))?;
        Ok(self)
    }

    pub fn admission(&self, kind: &str, operation: &str, allowed: bool) {
        self.admissions
            .with_label_values(&[kind, operation, if allowed { "true" } else { "false" }])
            .inc()
    }

    pub fn denial(&self, kind: &str, reason: &str) {
        self.denials.with_label_values(&[kind, reason]).inc()
    }

    pub fn webhook_call(&self, webhook: &str, result: &str) {
        self.webhook_calls.with_label_values(&[webhook, result]).inc()
    }

    pub fn measure(&self, kind: &str) -> AdmissionMeasurer {
        AdmissionMeasurer {
            start: Instant::now(),
            metric: self.admission_duration.clone(),
            kind: kind.to_string(),
        }
    }
}

/// Smart function duration measurer
///
/// Relies on Drop to calculate duration and register the observation in the histogram
pub struct AdmissionMeasurer {
    start: Instant,
    metric: HistogramVec,
    kind: String,
}

impl Drop for AdmissionMeasurer {
    fn drop(&mut self) {
        #[allow(clippy::cast_precision_loss)]
        let duration = self.start.elapsed().as_millis() as f64 / 1000.0;
        self.metric.with_label_values(&[&self.kind]).observe(duration);
    }
}
