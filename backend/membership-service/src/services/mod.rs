/// Business logic layer for membership-service
pub mod articles;

pub use articles::{ArticleService, OrderReport};
