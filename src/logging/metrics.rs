use once_cell::sync::OnceCell;

/// Metrics interface allowing pluggable sinks, defaulting to a no-op.
pub trait EngineMetrics: Send + Sync {
    /// Record that a FAILED/PASSED assertion was dropped by the display or
    /// global cap instead of being appended to the report.
    fn record_dropped_check(&self, _rule_id: &str) {}
    /// Record that a run ended via cancellation.
    fn record_cancelled(&self, _reason: &str) {}
    /// Record that a sandbox expression evaluation faulted.
    fn record_sandbox_fault(&self, _error_code: &str) {}
}

struct NoopMetrics;

impl EngineMetrics for NoopMetrics {}

static METRICS_SINK: OnceCell<Box<dyn EngineMetrics>> = OnceCell::new();

fn metrics_sink() -> &'static dyn EngineMetrics {
    METRICS_SINK
        .get_or_init(|| Box::new(NoopMetrics) as Box<dyn EngineMetrics>)
        .as_ref()
}

/// Install a custom metrics sink. Intended for embedding or tests.
#[cfg_attr(not(test), allow(dead_code))]
pub fn install_metrics(metrics: Box<dyn EngineMetrics>) -> Result<(), Box<dyn EngineMetrics>> {
    METRICS_SINK.set(metrics)
}

/// Record that an assertion was dropped by a display or global cap.
pub fn record_dropped_check(rule_id: &str) {
    metrics_sink().record_dropped_check(rule_id);
}

/// Record that a run ended via cancellation.
pub fn record_cancelled(reason: &str) {
    metrics_sink().record_cancelled(reason);
}

/// Record that a sandbox expression evaluation faulted.
pub fn record_sandbox_fault(error_code: &str) {
    metrics_sink().record_sandbox_fault(error_code);
}

#[cfg(test)]
pub mod test_support {
    use super::*;
    use once_cell::sync::OnceCell;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    pub struct CapturingMetrics {
        events: Arc<Mutex<Vec<MetricEvent>>>,
    }

    #[derive(Clone, Debug, PartialEq, Eq)]
    pub enum MetricEvent {
        Dropped(String),
        Cancelled(String),
        SandboxFault(String),
    }

    impl CapturingMetrics {
        pub fn take(&self) -> Vec<MetricEvent> {
            let mut guard = self.events.lock().expect("metrics events lock");
            let events = guard.clone();
            guard.clear();
            events
        }
    }

    impl EngineMetrics for CapturingMetrics {
        fn record_dropped_check(&self, rule_id: &str) {
            self.events
                .lock()
                .expect("metrics events lock")
                .push(MetricEvent::Dropped(rule_id.to_string()));
        }

        fn record_cancelled(&self, reason: &str) {
            self.events
                .lock()
                .expect("metrics events lock")
                .push(MetricEvent::Cancelled(reason.to_string()));
        }

        fn record_sandbox_fault(&self, error_code: &str) {
            self.events
                .lock()
                .expect("metrics events lock")
                .push(MetricEvent::SandboxFault(error_code.to_string()));
        }
    }

    static CAPTURING: OnceCell<CapturingMetrics> = OnceCell::new();

    pub fn install() -> &'static CapturingMetrics {
        CAPTURING.get_or_init(|| {
            let metrics = CapturingMetrics::default();
            let _ = super::install_metrics(Box::new(metrics.clone()));
            metrics
        })
    }
}
