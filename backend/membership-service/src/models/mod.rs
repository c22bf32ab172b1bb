/// Data models for membership-service
use chrono::{DateTime, Utc};
use entity_ordering::Orderable;
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Article shown on the member home page
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Article {
    pub id: String,
    pub title: String,
    pub summary: Option<String>,
    pub display_order: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Orderable for Article {
    const TABLE: &'static str = "articles";

    fn id(&self) -> &str {
        &self.id
    }

    fn order(&self) -> i32 {
        self.display_order
    }

    fn set_order(&mut self, order: i32) {
        self.display_order = order;
    }
}

/// Input for creating an article
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewArticle {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[validate(length(max = 2000))]
    pub summary: Option<String>,
}

impl NewArticle {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            summary: None,
        }
    }

    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = Some(summary.into());
        self
    }
}

/// Where a new article goes in the display order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArticlePlacement {
    First,
    At(i32),
    Last,
}

impl ArticlePlacement {
    /// Resolve against the current article count.
    ///
    /// Returns the order for the new row and whether existing rows must be
    /// shifted to make room for it.
    pub fn resolve(self, count: i64) -> (i32, bool) {
        let last = i32::try_from(count.saturating_add(1)).unwrap_or(i32::MAX);
        match self {
            ArticlePlacement::First => (1, count > 0),
            ArticlePlacement::At(k) => {
                let k = k.clamp(1, last);
                (k, k < last)
            }
            ArticlePlacement::Last => (last, false),
        }
    }
}

impl std::str::FromStr for ArticlePlacement {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "first" => Ok(ArticlePlacement::First),
            "last" => Ok(ArticlePlacement::Last),
            other => other
                .parse::<i32>()
                .map(ArticlePlacement::At)
                .map_err(|_| {
                    format!(
                        "invalid placement '{}': expected first, last or a position",
                        s
                    )
                }),
        }
    }
}
