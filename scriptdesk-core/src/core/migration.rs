//! Versioned encoding of persisted collections.
//!
//! Each entity family declares its current [`Entity::VERSION`]. Collections are
//! written at that version; on load, items stored at an older version are stepped
//! forward one version at a time through [`Entity::upgrade`] before being
//! deserialized into the current shape.

use crate::core::collection::Entity;
use crate::core::storage::StoredCollection;
use crate::{Result, ScriptdeskError};
use serde_json::Value;

/// Serializes `items` into a record tagged with the entity's current version.
pub fn encode<T: Entity>(items: &[T]) -> Result<StoredCollection> {
    Ok(StoredCollection {
        key: T::KEY.to_string(),
        version: T::VERSION,
        data: serde_json::to_string(items)?,
    })
}

/// Deserializes a stored record, migrating it to the current version first.
///
/// # Errors
///
/// Returns [`ScriptdeskError::UnsupportedVersion`] if the record was written by
/// a newer build, or [`ScriptdeskError::Json`] if the data does not match the
/// expected shape after migration.
pub fn decode<T: Entity>(record: &StoredCollection) -> Result<Vec<T>> {
    if record.version > T::VERSION {
        return Err(ScriptdeskError::UnsupportedVersion {
            key: record.key.clone(),
            found: record.version,
            supported: T::VERSION,
        });
    }

    let raw: Vec<Value> = serde_json::from_str(&record.data)?;
    if record.version == T::VERSION {
        return raw
            .into_iter()
            .map(|item| serde_json::from_value(item).map_err(Into::into))
            .collect();
    }

    log::info!(
        "Migrating '{}' from version {} to {}",
        record.key,
        record.version,
        T::VERSION
    );
    // Version 0 is treated like 1: rows written before versioning existed.
    let start = record.version.max(1);
    raw.into_iter()
        .map(|mut item| -> Result<T> {
            for from in start..T::VERSION {
                item = T::upgrade(from, item)?;
            }
            serde_json::from_value(item).map_err(Into::into)
        })
        .collect()
}

/// Inserts `field` with `default` into a JSON object when it is missing.
pub(crate) fn with_default(mut item: Value, field: &str, default: Value) -> Value {
    if let Value::Object(map) = &mut item {
        map.entry(field.to_string()).or_insert(default);
    }
    item
}
