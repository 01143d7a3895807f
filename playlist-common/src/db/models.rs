//! Database models

use serde::{Deserialize, Serialize};

/// One playlist entry
///
/// Ordering lives in the `prev`/`next` links; `0` means "none" in both.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Track {
    pub id: i64,
    pub description: String,
    /// Length in seconds
    pub duration: i64,
    pub prev: i64,
    pub next: i64,
}

impl Track {
    /// True when no track precedes this one
    pub fn is_head(&self) -> bool {
        self.prev == 0
    }

    /// True when no track follows this one
    pub fn is_tail(&self) -> bool {
        self.next == 0
    }
}
