use prometheus::{Encoder, HistogramVec, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};

#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    pub dispatch_operations_total: IntCounterVec,
    pub assignment_latency_seconds: HistogramVec,
    pub notification_sends_total: IntCounterVec,
    pub proximity_alerts_total: IntCounter,
}

impl Metrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let dispatch_operations_total = IntCounterVec::new(
            Opts::new(
                "dispatch_operations_total",
                "Dispatch operations by operation and outcome",
            ),
            &["operation", "outcome"],
        )
        .expect("valid dispatch_operations_total metric");

        let assignment_latency_seconds = HistogramVec::new(
            prometheus::HistogramOpts::new(
                "assignment_latency_seconds",
                "Latency of driver assignment in seconds",
            ),
            &["outcome"],
        )
        .expect("valid assignment_latency_seconds metric");

        let notification_sends_total = IntCounterVec::new(
            Opts::new(
                "notification_sends_total",
                "Notification sends by channel and outcome",
            ),
            &["channel", "outcome"],
        )
        .expect("valid notification_sends_total metric");

        let proximity_alerts_total = IntCounter::new(
            "proximity_alerts_total",
            "One-time driver-nearby alerts fired",
        )
        .expect("valid proximity_alerts_total metric");

        registry
            .register(Box::new(dispatch_operations_total.clone()))
            .expect("register dispatch_operations_total");
        registry
            .register(Box::new(assignment_latency_seconds.clone()))
            .expect("register assignment_latency_seconds");
        registry
            .register(Box::new(notification_sends_total.clone()))
            .expect("register notification_sends_total");
        registry
            .register(Box::new(proximity_alerts_total.clone()))
            .expect("register proximity_alerts_total");

        Self {
            registry,
            dispatch_operations_total,
            assignment_latency_seconds,
            notification_sends_total,
            proximity_alerts_total,
        }
    }

    pub fn record_operation(&self, operation: &str, ok: bool) {
        let outcome = if ok { "success" } else { "error" };
        self.dispatch_operations_total
            .with_label_values(&[operation, outcome])
            .inc();
    }

    pub fn encode(&self) -> Result<String, String> {
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();

        TextEncoder::new()
            .encode(&metric_families, &mut buffer)
            .map_err(|err| format!("failed to encode metrics: {err}"))?;

        String::from_utf8(buffer).map_err(|err| format!("metrics are not valid utf8: {err}"))
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}
