//! Display-order maintenance for one entity type.

use async_trait::async_trait;
use std::collections::HashMap;
use std::marker::PhantomData;
use tracing::{debug, error, info, warn};

use crate::config::OrderingConfig;
use crate::error::{OrderingError, OrderingResult};
use crate::metrics::OrderingMetrics;
use crate::model::{BatchReorderSummary, OrderColumn, Orderable, ReorderItem};
use crate::unit_of_work::{OrderingTransaction, UnitOfWork};

/// Operations that keep an order column contiguous (`1..N`) for entity type `T`.
#[async_trait]
pub trait OrderingService<T: Orderable>: Send + Sync {
    /// Make room at `new_order`: every row at or after it moves down one slot.
    ///
    /// Does not insert anything; the caller writes the new row itself.
    /// `entity_id` is only used for logging.
    async fn reorder_after_insert(
        &self,
        entity_id: &str,
        new_order: i32,
        column: &OrderColumn,
    ) -> OrderingResult<()>;

    /// Close the gap left at `deleted_order`: every row after it moves up one slot.
    async fn reorder_after_delete(
        &self,
        deleted_order: i32,
        column: &OrderColumn,
    ) -> OrderingResult<()>;

    /// Renumber every row to `1..N`, keeping the current relative order.
    ///
    /// Returns the number of rows renumbered.
    async fn validate_and_fix_order(&self, column: &OrderColumn) -> OrderingResult<usize>;

    /// Best-effort insert-reorder of several items, each in its own transaction.
    ///
    /// Failures are logged and counted, never returned.
    async fn process_batch_reorder(
        &self,
        items: &[ReorderItem],
        column: &OrderColumn,
    ) -> BatchReorderSummary;
}

/// [`OrderingService`] running every operation through a [`UnitOfWork`].
///
/// Single-item operations and validate-and-fix each run in one transaction
/// that is rolled back on error. No locking is done across calls unless the
/// unit of work provides it.
pub struct EntityOrderingService<T, U> {
    uow: U,
    config: OrderingConfig,
    metrics: Option<OrderingMetrics>,
    _entity: PhantomData<fn() -> T>,
}

impl<T, U> EntityOrderingService<T, U>
where
    T: Orderable,
    U: UnitOfWork<T>,
{
    pub fn new(uow: U) -> Self {
        Self::with_config(uow, OrderingConfig::default())
    }

    pub fn with_config(uow: U, config: OrderingConfig) -> Self {
        Self {
            uow,
            config,
            metrics: None,
            _entity: PhantomData,
        }
    }

    pub fn with_metrics(mut self, metrics: OrderingMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn unit_of_work(&self) -> &U {
        &self.uow
    }

    pub fn config(&self) -> &OrderingConfig {
        &self.config
    }

    /// One bulk shift in its own transaction.
    async fn shift(
        &self,
        column: &OrderColumn,
        from_inclusive: i32,
        delta: i32,
    ) -> OrderingResult<u64> {
        let mut tx = self.uow.begin(column).await?;
        let result = tx.shift_orders(column, from_inclusive, delta).await;
        finish::<T, _, _>(tx, result).await
    }

    async fn renumber(
        &self,
        tx: &mut U::Transaction,
        column: &OrderColumn,
    ) -> OrderingResult<usize> {
        let ranked: Vec<(String, i32)> = tx
            .ordered_ids(column)
            .await?
            .into_iter()
            .zip(1..)
            .collect();
        // `batch_size` is a public field and may be zero.
        let batch_size = self.config.batch_size.max(1);

        for (batch, chunk) in ranked.chunks(batch_size).enumerate() {
            let ranks: HashMap<&str, i32> = chunk
                .iter()
                .map(|(id, rank)| (id.as_str(), *rank))
                .collect();
            let ids: Vec<String> = chunk.iter().map(|(id, _)| id.clone()).collect();

            let mut entities = tx.load_by_ids(&ids).await?;
            for entity in entities.iter_mut() {
                if let Some(rank) = ranks.get(entity.id()) {
                    entity.set_order(*rank);
                }
            }

            tx.save_orders(column, &entities).await?;

            debug!(
                entity = T::TABLE,
                column = %column,
                batch = batch + 1,
                batch_rows = entities.len(),
                "Renumbered ordering batch"
            );
        }

        Ok(ranked.len())
    }

    async fn ensure_exists(&self, entity_id: &str, column: &OrderColumn) -> OrderingResult<()> {
        let mut tx = self.uow.begin(column).await?;
        let result = tx.exists(entity_id).await;
        match finish::<T, _, _>(tx, result).await? {
            true => Ok(()),
            false => Err(OrderingError::EntityNotFound(entity_id.to_string())),
        }
    }

    fn record<R>(&self, operation: &str, result: &OrderingResult<R>) {
        if let Some(metrics) = &self.metrics {
            let outcome = match result {
                Ok(_) => "success",
                Err(e) => e.kind(),
            };
            metrics.record_operation(T::TABLE, operation, outcome);
        }
    }

    fn record_shifted(&self, rows: u64) {
        if let Some(metrics) = &self.metrics {
            metrics.record_rows_shifted(T::TABLE, rows);
        }
    }
}

#[async_trait]
impl<T, U> OrderingService<T> for EntityOrderingService<T, U>
where
    T: Orderable,
    U: UnitOfWork<T>,
{
    async fn reorder_after_insert(
        &self,
        entity_id: &str,
        new_order: i32,
        column: &OrderColumn,
    ) -> OrderingResult<()> {
        if new_order <= 0 {
            warn!(
                entity = T::TABLE,
                entity_id = %entity_id,
                new_order,
                "Insert position is not positive; every row will shift"
            );
        }

        let result = self.shift(column, new_order, 1).await;
        self.record("reorder_after_insert", &result);

        match result {
            Ok(rows) => {
                self.record_shifted(rows);
                info!(
                    entity = T::TABLE,
                    column = %column,
                    entity_id = %entity_id,
                    new_order,
                    rows_affected = rows,
                    "Reordered after insert"
                );
                Ok(())
            }
            Err(e) => {
                error!(
                    entity = T::TABLE,
                    column = %column,
                    entity_id = %entity_id,
                    new_order,
                    error = %e,
                    "Reorder after insert failed"
                );
                Err(e)
            }
        }
    }

    async fn reorder_after_delete(
        &self,
        deleted_order: i32,
        column: &OrderColumn,
    ) -> OrderingResult<()> {
        // `> deleted_order` over integers is `>= deleted_order + 1`.
        let result = match deleted_order.checked_add(1) {
            Some(from) => self.shift(column, from, -1).await,
            None => Ok(0),
        };
        self.record("reorder_after_delete", &result);

        match result {
            Ok(rows) => {
                self.record_shifted(rows);
                info!(
                    entity = T::TABLE,
                    column = %column,
                    deleted_order,
                    rows_affected = rows,
                    "Reordered after delete"
                );
                Ok(())
            }
            Err(e) => {
                error!(
                    entity = T::TABLE,
                    column = %column,
                    deleted_order,
                    error = %e,
                    "Reorder after delete failed"
                );
                Err(e)
            }
        }
    }

    async fn validate_and_fix_order(&self, column: &OrderColumn) -> OrderingResult<usize> {
        let result: OrderingResult<usize> = async {
            let mut tx = self.uow.begin(column).await?;
            let result = self.renumber(&mut tx, column).await;
            finish::<T, _, _>(tx, result).await
        }
        .await;
        self.record("validate_and_fix_order", &result);

        match &result {
            Ok(total) => info!(
                entity = T::TABLE,
                column = %column,
                total_rows = total,
                batch_size = self.config.batch_size,
                "Order column validated and renumbered"
            ),
            Err(e) => error!(
                entity = T::TABLE,
                column = %column,
                error = %e,
                "Order validation failed; renumbering rolled back"
            ),
        }

        result
    }

    async fn process_batch_reorder(
        &self,
        items: &[ReorderItem],
        column: &OrderColumn,
    ) -> BatchReorderSummary {
        let mut summary = BatchReorderSummary::default();

        for item in items {
            let result = match self.ensure_exists(&item.entity_id, column).await {
                Ok(()) => {
                    self.reorder_after_insert(&item.entity_id, item.new_order, column)
                        .await
                }
                Err(e) => Err(e),
            };

            match result {
                Ok(()) => summary.processed += 1,
                Err(e) => {
                    summary.failed += 1;
                    if let Some(metrics) = &self.metrics {
                        metrics.record_batch_item_failure(T::TABLE);
                    }
                    warn!(
                        entity = T::TABLE,
                        entity_id = %item.entity_id,
                        new_order = item.new_order,
                        error = %e,
                        "Batch reorder item failed, continuing"
                    );
                }
            }
        }

        info!(
            entity = T::TABLE,
            column = %column,
            processed = summary.processed,
            failed = summary.failed,
            "Batch reorder finished"
        );

        summary
    }
}

/// Commit on success; otherwise roll back and hand back the original error.
async fn finish<T, X, R>(tx: X, result: OrderingResult<R>) -> OrderingResult<R>
where
    T: Orderable,
    X: OrderingTransaction<T>,
{
    match result {
        Ok(value) => {
            tx.commit().await?;
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback_err) = tx.rollback().await {
                error!(
                    entity = T::TABLE,
                    error = %rollback_err,
                    "Rollback failed after ordering error"
                );
            }
            Err(err)
        }
    }
}
