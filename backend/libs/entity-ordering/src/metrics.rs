use prometheus::{IntCounterVec, Opts, Registry};
use tracing::warn;

#[derive(Clone)]
pub struct OrderingMetrics {
    pub operations: IntCounterVec,
    pub rows_shifted: IntCounterVec,
    pub batch_item_failures: IntCounterVec,
}

impl OrderingMetrics {
    /// Metrics registered on the process-wide default registry.
    pub fn new() -> Self {
        Self::with_registry(prometheus::default_registry())
    }

    pub fn with_registry(registry: &Registry) -> Self {
        let operations = IntCounterVec::new(
            Opts::new(
                "entity_ordering_operations_total",
                "Ordering operations by entity, operation and outcome",
            ),
            &["entity", "operation", "outcome"],
        )
        .expect("valid metric opts for entity_ordering_operations_total");

        let rows_shifted = IntCounterVec::new(
            Opts::new(
                "entity_ordering_rows_shifted_total",
                "Rows whose order value was changed by a bulk shift",
            ),
            &["entity"],
        )
        .expect("valid metric opts for entity_ordering_rows_shifted_total");

        let batch_item_failures = IntCounterVec::new(
            Opts::new(
                "entity_ordering_batch_item_failures_total",
                "Batch reorder items that failed and were skipped",
            ),
            &["entity"],
        )
        .expect("valid metric opts for entity_ordering_batch_item_failures_total");

        for metric in [
            Box::new(operations.clone()) as Box<dyn prometheus::core::Collector>,
            Box::new(rows_shifted.clone()),
            Box::new(batch_item_failures.clone()),
        ] {
            if let Err(e) = registry.register(metric) {
                warn!("Failed to register entity ordering metric: {}", e);
            }
        }

        Self {
            operations,
            rows_shifted,
            batch_item_failures,
        }
    }

    pub fn record_operation(&self, entity: &str, operation: &str, outcome: &str) {
        self.operations
            .with_label_values(&[entity, operation, outcome])
            .inc();
    }

    pub fn record_rows_shifted(&self, entity: &str, rows: u64) {
        self.rows_shifted.with_label_values(&[entity]).inc_by(rows);
    }

    pub fn record_batch_item_failure(&self, entity: &str) {
        self.batch_item_failures.with_label_values(&[entity]).inc();
    }
}

impl Default for OrderingMetrics {
    fn default() -> Self {
        Self::new()
    }
}
