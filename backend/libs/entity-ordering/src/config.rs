//! Tuning knobs for the ordering service.

use tracing::info;

/// Rows loaded and flushed per step of a validate-and-fix pass.
pub const DEFAULT_BATCH_SIZE: usize = 1000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderingConfig {
    /// Ids renumbered per batch during validate-and-fix
    pub batch_size: usize,
    /// Take a transaction-scoped advisory lock per order column (PostgreSQL only)
    pub advisory_lock: bool,
}

impl Default for OrderingConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            advisory_lock: false,
        }
    }
}

impl OrderingConfig {
    /// Read `ORDERING_BATCH_SIZE` and `ORDERING_ADVISORY_LOCK`, falling back to defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            batch_size: std::env::var("ORDERING_BATCH_SIZE")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|size: &usize| *size > 0)
                .unwrap_or(defaults.batch_size),
            advisory_lock: std::env::var("ORDERING_ADVISORY_LOCK")
                .ok()
                .map(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
                .unwrap_or(defaults.advisory_lock),
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn log_config(&self) {
        info!(
            batch_size = self.batch_size,
            advisory_lock = self.advisory_lock,
            "Entity ordering configuration"
        );
    }
}
