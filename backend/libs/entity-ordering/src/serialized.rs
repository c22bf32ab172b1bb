//! Opt-in serialisation of ordering calls within one process.
//!
//! [`EntityOrderingService`](crate::EntityOrderingService) takes no lock
//! across calls, so two concurrent insert-reorders on the same column can
//! interleave and lose an update. Wrapping the service here makes every call
//! wait for the previous one. For several processes sharing one database use
//! [`PgUnitOfWork::with_advisory_lock`](crate::PgUnitOfWork::with_advisory_lock)
//! instead.

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::error::OrderingResult;
use crate::model::{BatchReorderSummary, OrderColumn, Orderable, ReorderItem};
use crate::service::OrderingService;

pub struct SerializedOrderingService<S> {
    inner: S,
    gate: Mutex<()>,
}

impl<S> SerializedOrderingService<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            gate: Mutex::new(()),
        }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }
}

#[async_trait]
impl<T, S> OrderingService<T> for SerializedOrderingService<S>
where
    T: Orderable,
    S: OrderingService<T>,
{
    async fn reorder_after_insert(
        &self,
        entity_id: &str,
        new_order: i32,
        column: &OrderColumn,
    ) -> OrderingResult<()> {
        let _guard = self.gate.lock().await;
        self.inner
            .reorder_after_insert(entity_id, new_order, column)
            .await
    }

    async fn reorder_after_delete(
        &self,
        deleted_order: i32,
        column: &OrderColumn,
    ) -> OrderingResult<()> {
        let _guard = self.gate.lock().await;
        self.inner.reorder_after_delete(deleted_order, column).await
    }

    async fn validate_and_fix_order(&self, column: &OrderColumn) -> OrderingResult<usize> {
        let _guard = self.gate.lock().await;
        self.inner.validate_and_fix_order(column).await
    }

    async fn process_batch_reorder(
        &self,
        items: &[ReorderItem],
        column: &OrderColumn,
    ) -> BatchReorderSummary {
        // Held for the whole batch; the inner service does not re-enter the gate.
        let _guard = self.gate.lock().await;
        self.inner.process_batch_reorder(items, column).await
    }
}
