/// Article service - creation, deletion, and display-order upkeep
use crate::db::article_repo;
use crate::error::{AppError, Result};
use crate::models::{Article, ArticlePlacement, NewArticle};
use entity_ordering::{OrderColumn, OrderingJobService, OrderingService, ReorderItem};
use sqlx::PgPool;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;
use validator::Validate;

/// Result of comparing stored display orders against `1..=N`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderReport {
    pub total: usize,
    /// Rows whose order differs from their position in the listing
    pub misplaced: usize,
}

impl OrderReport {
    /// `orders` must already be sorted by display order, ties by id.
    pub fn from_sorted_orders(orders: &[i32]) -> Self {
        let misplaced = orders
            .iter()
            .zip(1..)
            .filter(|(order, expected)| **order != *expected)
            .count();

        Self {
            total: orders.len(),
            misplaced,
        }
    }

    pub fn is_contiguous(&self) -> bool {
        self.misplaced == 0
    }
}

pub struct ArticleService<S> {
    pool: PgPool,
    ordering: Arc<S>,
    jobs: OrderingJobService<Article, S>,
    column: OrderColumn,
}

impl<S> ArticleService<S>
where
    S: OrderingService<Article> + 'static,
{
    pub fn new(pool: PgPool, jobs: OrderingJobService<Article, S>) -> Self {
        Self {
            pool,
            ordering: Arc::clone(jobs.ordering()),
            jobs,
            column: OrderColumn::display_order(),
        }
    }

    pub async fn list_articles(&self) -> Result<Vec<Article>> {
        Ok(article_repo::list_articles(&self.pool).await?)
    }

    pub async fn get_article(&self, id: &str) -> Result<Article> {
        article_repo::find_article_by_id(&self.pool, id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("article {}", id)))
    }

    /// Create an article at `placement`.
    ///
    /// Rows at or after the target position are shifted before the insert.
    /// The shift is awaited here rather than scheduled through the job
    /// service: a shift running after the insert would move the new row too.
    /// Shift failures are returned and no row is inserted.
    pub async fn create_article(
        &self,
        input: NewArticle,
        placement: ArticlePlacement,
    ) -> Result<Article> {
        input.validate()?;

        let id = Uuid::new_v4().to_string();
        let count = article_repo::count_articles(&self.pool).await?;
        let (display_order, needs_shift) = placement.resolve(count);

        if needs_shift {
            self.ordering
                .reorder_after_insert(&id, display_order, &self.column)
                .await?;
        }

        let article = article_repo::insert_article(
            &self.pool,
            &id,
            &input.title,
            input.summary.as_deref(),
            display_order,
        )
        .await?;

        info!(
            article_id = %article.id,
            display_order = article.display_order,
            "Article created"
        );
        Ok(article)
    }

    /// Delete an article and schedule closing the gap it leaves.
    ///
    /// Returns the id of the background job; empty if it could not be scheduled.
    pub async fn delete_article(&self, id: &str) -> Result<String> {
        let deleted_order = article_repo::delete_article(&self.pool, id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("article {}", id)))?;

        let job_id = self
            .jobs
            .schedule_reorder_after_delete(deleted_order, &self.column);
        if job_id.is_empty() {
            warn!(
                article_id = %id,
                deleted_order,
                "Gap left by deleted article was not scheduled for closing"
            );
        }

        info!(article_id = %id, deleted_order, job_id = %job_id, "Article deleted");
        Ok(job_id)
    }

    /// Schedule a full renumbering of the article order.
    pub fn repair_order(&self) -> String {
        self.jobs.schedule_validate_and_fix(&self.column)
    }

    /// Schedule moving each listed article to its new position.
    pub fn reorder_articles(&self, items: Vec<ReorderItem>) -> String {
        self.jobs.schedule_batch_reorder(items, &self.column)
    }

    /// Compare stored orders against `1..=N` without changing anything.
    pub async fn check_order(&self) -> Result<OrderReport> {
        let orders: Vec<i32> = self
            .list_articles()
            .await?
            .iter()
            .map(|article| article.display_order)
            .collect();

        Ok(OrderReport::from_sorted_orders(&orders))
    }
}
