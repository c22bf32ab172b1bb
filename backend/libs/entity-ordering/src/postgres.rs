//! PostgreSQL unit of work backed by sqlx.

use anyhow::Context;
use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use std::marker::PhantomData;
use tracing::debug;

use crate::config::OrderingConfig;
use crate::error::{OrderingError, OrderingResult};
use crate::model::{is_plain_identifier, OrderColumn, Orderable};
use crate::unit_of_work::{OrderingTransaction, UnitOfWork};

/// SQLx-based implementation of [`UnitOfWork`] using PostgreSQL.
///
/// Every ordering call runs in its own pooled transaction. With
/// `advisory_lock` enabled, each transaction first takes
/// `pg_advisory_xact_lock` keyed on `<table>.<column>`, which serialises
/// ordering calls for that column across processes. Without it, concurrent
/// calls on the same column can interleave and lose updates.
#[derive(Clone)]
pub struct PgUnitOfWork {
    pool: PgPool,
    advisory_lock: bool,
}

impl PgUnitOfWork {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            advisory_lock: false,
        }
    }

    pub fn from_config(pool: PgPool, config: &OrderingConfig) -> Self {
        Self {
            pool,
            advisory_lock: config.advisory_lock,
        }
    }

    /// Serialise ordering transactions per column with a PostgreSQL advisory lock.
    pub fn with_advisory_lock(mut self) -> Self {
        self.advisory_lock = true;
        self
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl<T> UnitOfWork<T> for PgUnitOfWork
where
    T: Orderable + for<'r> FromRow<'r, PgRow> + Unpin,
{
    type Transaction = PgOrderingTransaction<T>;

    async fn begin(&self, column: &OrderColumn) -> OrderingResult<Self::Transaction> {
        let table = checked_table::<T>()?;
        let mut tx = self.pool.begin().await?;

        if self.advisory_lock {
            let lock_key = format!("{}.{}", table, column);
            sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1))")
                .bind(&lock_key)
                .execute(&mut *tx)
                .await
                .context("Failed to acquire ordering advisory lock")?;
            debug!(lock_key = %lock_key, "Ordering advisory lock acquired");
        }

        Ok(PgOrderingTransaction {
            tx,
            table,
            id_column: checked_id_column::<T>()?,
            _entity: PhantomData,
        })
    }
}

/// An open PostgreSQL transaction scoped to entity type `T`.
///
/// Dropping it without `commit` rolls back.
pub struct PgOrderingTransaction<T> {
    tx: Transaction<'static, Postgres>,
    table: &'static str,
    id_column: &'static str,
    _entity: PhantomData<fn() -> T>,
}

#[async_trait]
impl<T> OrderingTransaction<T> for PgOrderingTransaction<T>
where
    T: Orderable + for<'r> FromRow<'r, PgRow> + Unpin,
{
    async fn shift_orders(
        &mut self,
        column: &OrderColumn,
        from_inclusive: i32,
        delta: i32,
    ) -> OrderingResult<u64> {
        let sql = format!(
            r#"UPDATE "{table}" SET "{col}" = "{col}" + $1 WHERE "{col}" >= $2"#,
            table = self.table,
            col = column,
        );

        let result = sqlx::query(&sql)
            .bind(delta)
            .bind(from_inclusive)
            .execute(&mut *self.tx)
            .await?;

        Ok(result.rows_affected())
    }

    async fn ordered_ids(&mut self, column: &OrderColumn) -> OrderingResult<Vec<String>> {
        let sql = format!(
            r#"SELECT "{id}"::text FROM "{table}"
               ORDER BY "{col}" ASC, "{id}"::text COLLATE "C" ASC"#,
            id = self.id_column,
            table = self.table,
            col = column,
        );

        let ids = sqlx::query_scalar::<_, String>(&sql)
            .fetch_all(&mut *self.tx)
            .await?;

        Ok(ids)
    }

    async fn exists(&mut self, id: &str) -> OrderingResult<bool> {
        let sql = format!(
            r#"SELECT EXISTS (SELECT 1 FROM "{table}" WHERE "{id}"::text = $1)"#,
            table = self.table,
            id = self.id_column,
        );

        let found = sqlx::query_scalar::<_, bool>(&sql)
            .bind(id)
            .fetch_one(&mut *self.tx)
            .await?;

        Ok(found)
    }

    async fn load_by_ids(&mut self, ids: &[String]) -> OrderingResult<Vec<T>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let sql = format!(
            r#"SELECT * FROM "{table}" WHERE "{id}"::text = ANY($1)"#,
            table = self.table,
            id = self.id_column,
        );

        let entities = sqlx::query_as::<_, T>(&sql)
            .bind(ids.to_vec())
            .fetch_all(&mut *self.tx)
            .await?;

        Ok(entities)
    }

    async fn save_orders(&mut self, column: &OrderColumn, entities: &[T]) -> OrderingResult<()> {
        if entities.is_empty() {
            return Ok(());
        }

        let ids: Vec<String> = entities.iter().map(|e| e.id().to_string()).collect();
        let orders: Vec<i32> = entities.iter().map(Orderable::order).collect();

        let sql = format!(
            r#"
            UPDATE "{table}" AS t
            SET "{col}" = v.new_order
            FROM UNNEST($1::text[], $2::int4[]) AS v(id, new_order)
            WHERE t."{id}"::text = v.id
            "#,
            table = self.table,
            col = column,
            id = self.id_column,
        );

        let result = sqlx::query(&sql)
            .bind(&ids)
            .bind(&orders)
            .execute(&mut *self.tx)
            .await?;

        if result.rows_affected() != entities.len() as u64 {
            return Err(OrderingError::Storage(format!(
                "batch update on {} touched {} of {} rows",
                self.table,
                result.rows_affected(),
                entities.len()
            )));
        }

        Ok(())
    }

    async fn commit(self) -> OrderingResult<()> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self) -> OrderingResult<()> {
        self.tx.rollback().await?;
        Ok(())
    }
}

fn checked_table<T: Orderable>() -> OrderingResult<&'static str> {
    if is_plain_identifier(T::TABLE) {
        Ok(T::TABLE)
    } else {
        Err(OrderingError::InvalidColumn(format!("table {}", T::TABLE)))
    }
}

fn checked_id_column<T: Orderable>() -> OrderingResult<&'static str> {
    if is_plain_identifier(T::ID_COLUMN) {
        Ok(T::ID_COLUMN)
    } else {
        Err(OrderingError::InvalidColumn(format!("id column {}", T::ID_COLUMN)))
    }
}
