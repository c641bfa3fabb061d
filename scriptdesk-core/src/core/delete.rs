//! Delete strategy and result types for cascading removals.
//!
//! ## Strategies
//!
//! - [`DeleteStrategy::DeleteAll`]: removes the container and everything filed
//!   inside it.
//! - [`DeleteStrategy::PromoteChildren`]: removes only the container and moves
//!   its members up to the root (or, for character groups, to "ungrouped").
//!
//! Project and script-folder deletion always use `DeleteAll`; character groups
//! always promote. Note folders accept either.
//!
//! ## Serialization
//!
//! `DeleteStrategy` variants serialize as PascalCase strings and `DeleteResult`
//! fields as camelCase, matching the rest of the persisted JSON.
//!
//! ```rust
//! use scriptdesk_core::{DeleteResult, DeleteStrategy};
//!
//! let json = serde_json::to_string(&DeleteStrategy::PromoteChildren).unwrap();
//! assert_eq!(json, r#""PromoteChildren""#);
//!
//! let result = DeleteResult::default();
//! let json = serde_json::to_string(&result).unwrap();
//! assert!(json.contains("deletedCount"));
//! assert!(json.contains("reparentedIds"));
//! ```

use serde::{Deserialize, Serialize};

/// Determines what happens to the members of a container being deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum DeleteStrategy {
    /// Delete the container and all of its members.
    DeleteAll,

    /// Delete only the container and detach its members to the root.
    PromoteChildren,
}

/// The outcome of a cascading delete.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteResult {
    /// Total number of entities permanently removed, across all collections.
    pub deleted_count: usize,

    /// IDs of every removed entity.
    pub affected_ids: Vec<String>,

    /// IDs of entities that survived but lost their container.
    pub reparented_ids: Vec<String>,
}

impl DeleteResult {
    pub(crate) fn record_deleted(&mut self, ids: impl IntoIterator<Item = String>) {
        let before = self.affected_ids.len();
        self.affected_ids.extend(ids);
        self.deleted_count += self.affected_ids.len() - before;
    }

    pub(crate) fn record_reparented(&mut self, ids: impl IntoIterator<Item = String>) {
        self.reparented_ids.extend(ids);
    }

    /// True when the delete found nothing to remove.
    pub fn is_empty(&self) -> bool {
        self.deleted_count == 0 && self.reparented_ids.is_empty()
    }
}
