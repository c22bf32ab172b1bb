use crate::models::Article;
use sqlx::PgPool;

/// Insert an article with an already-resolved display order
pub async fn insert_article(
    pool: &PgPool,
    id: &str,
    title: &str,
    summary: Option<&str>,
    display_order: i32,
) -> Result<Article, sqlx::Error> {
    sqlx::query_as::<_, Article>(
        r#"
        INSERT INTO articles (id, title, summary, display_order)
        VALUES ($1, $2, $3, $4)
        RETURNING id, title, summary, display_order, created_at, updated_at
        "#,
    )
    .bind(id)
    .bind(title)
    .bind(summary)
    .bind(display_order)
    .fetch_one(pool)
    .await
}

pub async fn find_article_by_id(pool: &PgPool, id: &str) -> Result<Option<Article>, sqlx::Error> {
    sqlx::query_as::<_, Article>(
        r#"
        SELECT id, title, summary, display_order, created_at, updated_at
        FROM articles
        WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await
}

/// All articles by display order, ties by id
pub async fn list_articles(pool: &PgPool) -> Result<Vec<Article>, sqlx::Error> {
    sqlx::query_as::<_, Article>(
        r#"
        SELECT id, title, summary, display_order, created_at, updated_at
        FROM articles
        ORDER BY display_order, id COLLATE "C"
        "#,
    )
    .fetch_all(pool)
    .await
}

pub async fn count_articles(pool: &PgPool) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM articles")
        .fetch_one(pool)
        .await
}

/// Delete an article, returning the display order it held
pub async fn delete_article(pool: &PgPool, id: &str) -> Result<Option<i32>, sqlx::Error> {
    sqlx::query_scalar::<_, i32>(
        r#"
        DELETE FROM articles
        WHERE id = $1
        RETURNING display_order
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await
}
