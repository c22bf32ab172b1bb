//! In-memory unit of work.
//!
//! Each transaction works on a private snapshot of the rows taken at `begin`
//! and replaces the shared rows on `commit`. Two overlapping transactions on
//! the same store therefore behave like un-locked SQL transactions: the last
//! commit wins. Faults can be injected to exercise rollback paths.

use async_trait::async_trait;
use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::error::{OrderingError, OrderingResult};
use crate::model::{OrderColumn, Orderable};
use crate::unit_of_work::{OrderingTransaction, UnitOfWork};

/// Where an injected fault fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultPoint {
    /// The bulk shift statement
    Shift,
    /// The n-th (1-based) `save_orders` call inside one transaction
    SaveBatch(usize),
    /// The existence probe used by batch reorder
    Exists,
    Commit,
}

#[derive(Debug, Clone, Default)]
struct FaultPlan {
    points: Vec<FaultPoint>,
}

impl FaultPlan {
    fn trips(&self, point: FaultPoint) -> OrderingResult<()> {
        if self.points.contains(&point) {
            Err(OrderingError::Storage(format!("injected fault at {:?}", point)))
        } else {
            Ok(())
        }
    }
}

pub struct InMemoryUnitOfWork<T> {
    rows: Arc<Mutex<Vec<T>>>,
    faults: Arc<Mutex<FaultPlan>>,
    commits: Arc<AtomicUsize>,
    rollbacks: Arc<AtomicUsize>,
}

impl<T> Clone for InMemoryUnitOfWork<T> {
    fn clone(&self) -> Self {
        Self {
            rows: Arc::clone(&self.rows),
            faults: Arc::clone(&self.faults),
            commits: Arc::clone(&self.commits),
            rollbacks: Arc::clone(&self.rollbacks),
        }
    }
}

impl<T> Default for InMemoryUnitOfWork<T> {
    fn default() -> Self {
        Self::with_rows(Vec::new())
    }
}

impl<T> InMemoryUnitOfWork<T> {
    pub fn with_rows(rows: Vec<T>) -> Self {
        Self {
            rows: Arc::new(Mutex::new(rows)),
            faults: Arc::new(Mutex::new(FaultPlan::default())),
            commits: Arc::new(AtomicUsize::new(0)),
            rollbacks: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub async fn inject_fault(&self, point: FaultPoint) {
        self.faults.lock().await.points.push(point);
    }

    pub async fn clear_faults(&self) {
        self.faults.lock().await.points.clear();
    }

    pub fn committed_transactions(&self) -> usize {
        self.commits.load(Ordering::SeqCst)
    }

    pub fn rolled_back_transactions(&self) -> usize {
        self.rollbacks.load(Ordering::SeqCst)
    }
}

impl<T: Orderable> InMemoryUnitOfWork<T> {
    /// Committed rows, in storage order.
    pub async fn snapshot(&self) -> Vec<T> {
        self.rows.lock().await.clone()
    }

    /// Committed order value of every row, keyed by id.
    pub async fn orders(&self) -> BTreeMap<String, i32> {
        self.rows
            .lock()
            .await
            .iter()
            .map(|row| (row.id().to_string(), row.order()))
            .collect()
    }

    /// Committed order values, ascending.
    pub async fn sorted_orders(&self) -> Vec<i32> {
        let mut orders: Vec<i32> = self.rows.lock().await.iter().map(|r| r.order()).collect();
        orders.sort_unstable();
        orders
    }

    /// Insert a row outside any ordering transaction, as a CRUD caller would.
    pub async fn insert(&self, row: T) {
        self.rows.lock().await.push(row);
    }

    /// Delete a row outside any ordering transaction, returning it.
    pub async fn remove(&self, id: &str) -> Option<T> {
        let mut rows = self.rows.lock().await;
        let position = rows.iter().position(|row| row.id() == id)?;
        Some(rows.remove(position))
    }
}

#[async_trait]
impl<T: Orderable> UnitOfWork<T> for InMemoryUnitOfWork<T> {
    type Transaction = InMemoryTransaction<T>;

    async fn begin(&self, _column: &OrderColumn) -> OrderingResult<Self::Transaction> {
        Ok(InMemoryTransaction {
            working: self.rows.lock().await.clone(),
            faults: self.faults.lock().await.clone(),
            saves: 0,
            store: self.clone(),
        })
    }
}

/// A snapshot of the store that is written back on commit.
pub struct InMemoryTransaction<T> {
    working: Vec<T>,
    faults: FaultPlan,
    saves: usize,
    store: InMemoryUnitOfWork<T>,
}

#[async_trait]
impl<T: Orderable> OrderingTransaction<T> for InMemoryTransaction<T> {
    async fn shift_orders(
        &mut self,
        _column: &OrderColumn,
        from_inclusive: i32,
        delta: i32,
    ) -> OrderingResult<u64> {
        self.faults.trips(FaultPoint::Shift)?;

        let mut changed = 0;
        for row in self.working.iter_mut().filter(|r| r.order() >= from_inclusive) {
            let shifted = row.order().checked_add(delta).ok_or_else(|| {
                OrderingError::Storage(format!("order overflow on row {}", row.id()))
            })?;
            row.set_order(shifted);
            changed += 1;
        }

        Ok(changed)
    }

    async fn ordered_ids(&mut self, _column: &OrderColumn) -> OrderingResult<Vec<String>> {
        let mut keyed: Vec<(i32, &str)> = self
            .working
            .iter()
            .map(|r| (r.order(), r.id()))
            .collect();
        keyed.sort_unstable();
        Ok(keyed.into_iter().map(|(_, id)| id.to_string()).collect())
    }

    async fn exists(&mut self, id: &str) -> OrderingResult<bool> {
        self.faults.trips(FaultPoint::Exists)?;
        Ok(self.working.iter().any(|row| row.id() == id))
    }

    async fn load_by_ids(&mut self, ids: &[String]) -> OrderingResult<Vec<T>> {
        let wanted: HashSet<&str> = ids.iter().map(String::as_str).collect();
        // Storage order, not request order, like an unsorted SQL `IN` lookup.
        Ok(self
            .working
            .iter()
            .filter(|row| wanted.contains(row.id()))
            .cloned()
            .collect())
    }

    async fn save_orders(&mut self, _column: &OrderColumn, entities: &[T]) -> OrderingResult<()> {
        self.saves += 1;
        self.faults.trips(FaultPoint::SaveBatch(self.saves))?;

        for entity in entities {
            let row = self
                .working
                .iter_mut()
                .find(|row| row.id() == entity.id())
                .ok_or_else(|| OrderingError::EntityNotFound(entity.id().to_string()))?;
            row.set_order(entity.order());
        }

        Ok(())
    }

    async fn commit(self) -> OrderingResult<()> {
        self.faults.trips(FaultPoint::Commit)?;
        *self.store.rows.lock().await = self.working;
        self.store.commits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn rollback(self) -> OrderingResult<()> {
        self.store.rollbacks.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
