//! # Entity Display-Order Maintenance
//!
//! Keeps an integer order column (e.g. `display_order`) contiguous across
//! inserts and deletes for any entity type implementing [`Orderable`].
//!
//! ## Invariant
//!
//! At any stable point the order values of all rows of one entity type are
//! exactly `1..=N`. The service maintains it when callers go through it:
//!
//! - **Insert at k**: [`OrderingService::reorder_after_insert`] shifts every
//!   row with order `>= k` up by one in a single bulk `UPDATE`. The caller then
//!   writes its new row with order `k`.
//! - **Delete at k**: after deleting the row, the caller runs
//!   [`OrderingService::reorder_after_delete`], which shifts every row with
//!   order `> k` down by one.
//! - **Repair**: [`OrderingService::validate_and_fix_order`] renumbers all rows
//!   to `1..=N` in the current relative order, in bounded-size batches inside
//!   one transaction.
//! - **Batch**: [`OrderingService::process_batch_reorder`] applies several
//!   insert-reorders, each in its own transaction, skipping failed items.
//!
//! ## Concurrency
//!
//! Each call is atomic, but nothing serialises separate calls: two concurrent
//! insert-reorders on one column can lose an update, and the "shift then
//! insert" pair performed by callers is two transactions. Use
//! [`SerializedOrderingService`] (one process) or
//! [`PgUnitOfWork::with_advisory_lock`] (many processes) to opt in to
//! serialisation.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use entity_ordering::{
//!     EntityOrderingService, ImmediateJobScheduler, OrderColumn, Orderable,
//!     OrderingJobService, OrderingService, PgUnitOfWork,
//! };
//! use sqlx::PgPool;
//! use std::sync::Arc;
//!
//! #[derive(Clone, sqlx::FromRow)]
//! struct Sponsor {
//!     id: String,
//!     name: String,
//!     display_order: i32,
//! }
//!
//! impl Orderable for Sponsor {
//!     const TABLE: &'static str = "sponsors";
//!
//!     fn id(&self) -> &str {
//!         &self.id
//!     }
//!
//!     fn order(&self) -> i32 {
//!         self.display_order
//!     }
//!
//!     fn set_order(&mut self, order: i32) {
//!         self.display_order = order;
//!     }
//! }
//!
//! # async fn example(pool: PgPool) -> Result<(), Box<dyn std::error::Error>> {
//! let column = OrderColumn::display_order();
//! let ordering = Arc::new(EntityOrderingService::<Sponsor, _>::new(PgUnitOfWork::new(pool)));
//!
//! // Wait for the shift, then insert the new sponsor at position 2.
//! ordering.reorder_after_insert("sponsor-42", 2, &column).await?;
//!
//! // Or let it happen in the background.
//! let jobs = OrderingJobService::new(ordering, Arc::new(ImmediateJobScheduler::new()));
//! let job_id = jobs.schedule_validate_and_fix(&column);
//! assert!(!job_id.is_empty());
//! # Ok(())
//! # }
//! ```

pub mod config;
mod error;
pub mod jobs;
pub mod memory;
pub mod metrics;
pub mod model;
pub mod postgres;
pub mod serialized;
pub mod service;
pub mod unit_of_work;

pub use config::OrderingConfig;
pub use error::{OrderingError, OrderingResult};
pub use jobs::{ImmediateJobScheduler, Job, JobScheduler, ManualJobScheduler, OrderingJobService};
pub use memory::{FaultPoint, InMemoryUnitOfWork};
pub use metrics::OrderingMetrics;
pub use model::{BatchReorderSummary, OrderColumn, Orderable, ReorderItem};
pub use postgres::PgUnitOfWork;
pub use serialized::SerializedOrderingService;
pub use service::{EntityOrderingService, OrderingService};
pub use unit_of_work::{OrderingTransaction, UnitOfWork};
