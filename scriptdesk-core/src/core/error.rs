//! Error types for the Scriptdesk core library.

use crate::core::script::BlockKind;
use thiserror::Error;

/// All errors that can occur within the Scriptdesk core library.
#[derive(Debug, Error)]
pub enum ScriptdeskError {
    /// A SQLite operation failed.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// A collection could not be serialized or deserialized.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// An I/O operation on the filesystem failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The opened file is not a valid Scriptdesk workspace.
    #[error("Invalid workspace: {0}")]
    InvalidWorkspace(String),

    /// A stored collection was written by a newer version of the library.
    #[error("Collection '{key}' has version {found}, this build supports up to {supported}")]
    UnsupportedVersion {
        key: String,
        found: u32,
        supported: u32,
    },

    /// A flow needed an entity that does not exist.
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    /// Input was rejected before any mutation happened.
    #[error("Validation failed: {0}")]
    ValidationFailed(String),

    /// A block update supplied a different variant than the stored block.
    #[error("Cannot replace a {expected} block with a {found} block")]
    BlockKindMismatch { expected: BlockKind, found: BlockKind },
}

/// Convenience alias that pins the error type to [`ScriptdeskError`].
pub type Result<T> = std::result::Result<T, ScriptdeskError>;

impl ScriptdeskError {
    pub(crate) fn not_found(kind: &'static str, id: &str) -> Self {
        Self::NotFound {
            kind,
            id: id.to_string(),
        }
    }

    /// Returns a short, human-readable message suitable for display to the end user.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Database(e) => format!("Failed to save: {e}"),
            Self::Json(e) => format!("Data format error: {e}"),
            Self::Io(e) => format!("File error: {e}"),
            Self::InvalidWorkspace(_) => "Could not open workspace file".to_string(),
            Self::UnsupportedVersion { .. } => {
                "This workspace was saved by a newer version of Scriptdesk".to_string()
            }
            Self::NotFound { kind, .. } => format!("{kind} no longer exists"),
            Self::ValidationFailed(msg) => msg.clone(),
            Self::BlockKindMismatch { expected, .. } => {
                format!("This block can only be edited as a {expected} block")
            }
        }
    }
}
