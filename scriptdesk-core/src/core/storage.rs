//! Durable key-value storage for serialized collections.
//!
//! Every entity family is persisted as one row of the `collections` table, keyed
//! by the family name and holding the whole collection as a JSON array together
//! with the version it was written at.

use crate::{clock, Result, ScriptdeskError};
use rusqlite::{Connection, OptionalExtension};
use std::path::Path;

/// One persisted collection as it sits in the `collections` table.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredCollection {
    pub key: String,
    pub version: u32,
    pub data: String,
}

pub struct Storage {
    conn: Connection,
}

impl Storage {
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch(include_str!("schema.sql"))?;
        Ok(Self { conn })
    }

    /// Opens a throwaway database that lives only as long as the returned value.
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(include_str!("schema.sql"))?;
        Ok(Self { conn })
    }

    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;

        let table_count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master
             WHERE type='table'
             AND name IN ('collections', 'workspace_meta')",
            [],
            |row| row.get(0),
        )?;

        if table_count != 2 {
            return Err(ScriptdeskError::InvalidWorkspace(
                "Not a valid Scriptdesk database".to_string(),
            ));
        }

        // Migrate: early workspaces stored collections without a version column
        let column_exists: bool = conn.query_row(
            "SELECT COUNT(*) FROM pragma_table_info('collections') WHERE name='version'",
            [],
            |row| row.get::<_, i64>(0).map(|count| count > 0),
        )?;

        if !column_exists {
            log::info!("Adding version column to collections table");
            conn.execute(
                "ALTER TABLE collections ADD COLUMN version INTEGER NOT NULL DEFAULT 1",
                [],
            )?;
        }

        Ok(Self { conn })
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Reads the collection stored under `key`, if it has ever been written.
    pub fn load(&self, key: &str) -> Result<Option<StoredCollection>> {
        let record = self
            .conn
            .query_row(
                "SELECT key, version, data FROM collections WHERE key = ?1",
                [key],
                |row| {
                    Ok(StoredCollection {
                        key: row.get(0)?,
                        version: row.get(1)?,
                        data: row.get(2)?,
                    })
                },
            )
            .optional()?;
        Ok(record)
    }

    pub fn store(&self, record: &StoredCollection) -> Result<()> {
        self.store_all(std::slice::from_ref(record))
    }

    /// Writes every record in a single transaction; either all land or none do.
    pub fn store_all(&self, records: &[StoredCollection]) -> Result<()> {
        let saved_at = clock::now().to_rfc3339();
        let tx = self.conn.unchecked_transaction()?;
        for record in records {
            tx.execute(
                "INSERT INTO collections (key, version, data, saved_at) VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(key) DO UPDATE SET
                    version = excluded.version,
                    data = excluded.data,
                    saved_at = excluded.saved_at",
                rusqlite::params![record.key, record.version, record.data, saved_at],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    pub fn get_meta(&self, key: &str) -> Result<Option<String>> {
        let value = self
            .conn
            .query_row(
                "SELECT value FROM workspace_meta WHERE key = ?1",
                [key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    pub fn set_meta(&self, key: &str, value: &str) -> Result<()> {
        self.conn.execute(
            "INSERT INTO workspace_meta (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            [key, value],
        )?;
        Ok(())
    }
}
