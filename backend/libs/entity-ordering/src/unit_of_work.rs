//! Transaction boundary the ordering service runs inside.
//!
//! A [`UnitOfWork`] hands out one [`OrderingTransaction`] per ordering call.
//! Everything done through the transaction becomes visible on `commit` and
//! is discarded on `rollback` (or when the transaction is dropped).

use async_trait::async_trait;

use crate::error::OrderingResult;
use crate::model::{OrderColumn, Orderable};

/// Repository operations available inside a transaction, scoped to entity type `T`.
#[async_trait]
pub trait OrderingTransaction<T: Orderable>: Send {
    /// Add `delta` to the order column of every row whose value is `>= from_inclusive`.
    ///
    /// Must be a single bulk statement; rows are not materialised.
    /// Returns the number of rows changed.
    async fn shift_orders(
        &mut self,
        column: &OrderColumn,
        from_inclusive: i32,
        delta: i32,
    ) -> OrderingResult<u64>;

    /// All ids of type `T`, ascending by order value, ties by id ascending.
    async fn ordered_ids(&mut self, column: &OrderColumn) -> OrderingResult<Vec<String>>;

    async fn exists(&mut self, id: &str) -> OrderingResult<bool>;

    /// Load the entities for `ids`. Missing ids are skipped; result order is unspecified.
    async fn load_by_ids(&mut self, ids: &[String]) -> OrderingResult<Vec<T>>;

    /// Persist the current [`Orderable::order`] of each entity into `column`.
    async fn save_orders(&mut self, column: &OrderColumn, entities: &[T]) -> OrderingResult<()>;

    async fn commit(self) -> OrderingResult<()>;

    async fn rollback(self) -> OrderingResult<()>;
}

/// Source of ordering transactions for entity type `T`.
#[async_trait]
pub trait UnitOfWork<T: Orderable>: Send + Sync {
    type Transaction: OrderingTransaction<T>;

    /// Begin a transaction that will touch `column`.
    async fn begin(&self, column: &OrderColumn) -> OrderingResult<Self::Transaction>;
}
