/// Membership Service Library
///
/// Member-facing articles kept in a stable display order.
///
/// # Modules
///
/// - `config`: Configuration management
/// - `db`: Connection pool and article repository
/// - `error`: Error types
/// - `models`: Article and its placement
/// - `services`: Article operations wired to display-order maintenance
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod services;

pub use config::Config;
pub use error::{AppError, Result};
pub use models::{Article, ArticlePlacement, NewArticle};
pub use services::{ArticleService, OrderReport};
