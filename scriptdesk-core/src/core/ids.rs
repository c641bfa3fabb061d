//! Opaque identifiers for stored entities.

use uuid::Uuid;

/// Returns a fresh, globally unique identifier.
pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}
