//! Entity capability trait and the value types passed to ordering operations.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{OrderingError, OrderingResult};

/// PostgreSQL truncates identifiers longer than this.
const MAX_IDENTIFIER_LEN: usize = 63;

/// A persisted record that occupies a position in a display-ordered list.
///
/// The order attribute is read and written through this trait; the column it
/// is stored in is a persistence detail carried by [`OrderColumn`].
pub trait Orderable: Clone + Send + Sync + 'static {
    /// Table holding every row of this entity type.
    const TABLE: &'static str;

    /// Primary key column. Must hold text-compatible values.
    const ID_COLUMN: &'static str = "id";

    fn id(&self) -> &str;

    fn order(&self) -> i32;

    fn set_order(&mut self, order: i32);
}

/// Name of the integer column that stores the display order.
///
/// Validated once at construction so it can be interpolated into SQL.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct OrderColumn(String);

impl OrderColumn {
    pub fn new(name: impl Into<String>) -> OrderingResult<Self> {
        let name = name.into();
        if is_plain_identifier(&name) {
            Ok(Self(name))
        } else {
            Err(OrderingError::InvalidColumn(name))
        }
    }

    /// The conventional `display_order` column.
    pub fn display_order() -> Self {
        Self(String::from("display_order"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OrderColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for OrderColumn {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let name = String::deserialize(deserializer)?;
        OrderColumn::new(name).map_err(serde::de::Error::custom)
    }
}

/// `[A-Za-z_][A-Za-z0-9_]*`, at most 63 bytes.
pub(crate) fn is_plain_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    let head_ok = matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_');
    head_ok
        && name.len() <= MAX_IDENTIFIER_LEN
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// One entry of a batch reorder request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReorderItem {
    pub entity_id: String,
    pub new_order: i32,
}

impl ReorderItem {
    pub fn new(entity_id: impl Into<String>, new_order: i32) -> Self {
        Self {
            entity_id: entity_id.into(),
            new_order,
        }
    }
}

/// Tally of a best-effort batch reorder.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatchReorderSummary {
    pub processed: usize,
    pub failed: usize,
}

impl BatchReorderSummary {
    pub fn total(&self) -> usize {
        self.processed + self.failed
    }
}
