//! Generic write-through collection store.
//!
//! A [`Collection`] keeps one entity family in memory as an ordered `Vec` and
//! writes the whole collection back to [`Storage`] after every mutation. Absent
//! ids are never an error: updates and deletes against them are silent no-ops.
//! A mutation whose write fails leaves the in-memory contents as they were.

use crate::core::migration;
use crate::core::storage::{Storage, StoredCollection};
use crate::{clock, ids, Result, Timestamp};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::rc::Rc;

/// A record type that lives in a [`Collection`].
pub trait Entity: Clone + Serialize + DeserializeOwned {
    /// Storage key the collection is persisted under.
    const KEY: &'static str;

    /// Current on-disk version of the collection.
    const VERSION: u32 = 1;

    fn id(&self) -> &str;

    /// Refreshes modification bookkeeping after a mutation.
    ///
    /// Entities without an `updated_at` keep the default no-op.
    fn touch(&mut self) {}

    /// Migrates one serialized item from version `from` to `from + 1`.
    fn upgrade(from: u32, item: Value) -> Result<Value> {
        let _ = from;
        Ok(item)
    }
}

/// Where newly created entities are inserted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    /// Insertion order is display order.
    Append,
    /// Newest first.
    Prepend,
}

pub struct Collection<T: Entity> {
    items: Vec<T>,
    storage: Rc<Storage>,
    placement: Placement,
}

impl<T: Entity> Collection<T> {
    /// Loads the collection from `storage`, migrating older versions.
    ///
    /// A key that has never been written yields an empty collection.
    pub fn load(storage: Rc<Storage>, placement: Placement) -> Result<Self> {
        let items = match storage.load(T::KEY)? {
            Some(record) => migration::decode::<T>(&record)?,
            None => Vec::new(),
        };
        log::debug!("Loaded {} entries from '{}'", items.len(), T::KEY);
        Ok(Self {
            items,
            storage,
            placement,
        })
    }

    /// Creates an entity from a fresh id and creation time, then persists it.
    ///
    /// `build` receives the id and timestamp and must use them as the entity's
    /// `id` and `created_at` (and `updated_at`, where present).
    pub fn create(&mut self, build: impl FnOnce(String, Timestamp) -> T) -> Result<T> {
        let entity = build(ids::new_id(), clock::now());
        let mut next = self.items.clone();
        match self.placement {
            Placement::Append => next.push(entity.clone()),
            Placement::Prepend => next.insert(0, entity.clone()),
        }
        self.commit(next)?;
        log::debug!("Created {} in '{}'", entity.id(), T::KEY);
        Ok(entity)
    }

    /// Applies `merge` to the entity with `id`, refreshes it, and persists.
    ///
    /// Returns `false` without writing when no entity has that id.
    pub fn update(&mut self, id: &str, merge: impl FnOnce(&mut T)) -> Result<bool> {
        let Some(index) = self.position(id) else {
            return Ok(false);
        };
        let mut candidate = self.items[index].clone();
        merge(&mut candidate);
        self.replace_at(index, candidate)?;
        Ok(true)
    }

    /// Like [`update`](Self::update) but lets `merge` veto the change by
    /// returning an error; nothing is written in that case.
    pub fn try_update<E>(
        &mut self,
        id: &str,
        merge: impl FnOnce(&mut T) -> std::result::Result<(), E>,
    ) -> Result<std::result::Result<bool, E>> {
        let Some(index) = self.position(id) else {
            return Ok(Ok(false));
        };
        let mut candidate = self.items[index].clone();
        if let Err(e) = merge(&mut candidate) {
            return Ok(Err(e));
        }
        self.replace_at(index, candidate)?;
        Ok(Ok(true))
    }

    /// Applies `merge` to every matching entity and persists once.
    ///
    /// Returns the ids that were changed.
    pub fn update_where(
        &mut self,
        predicate: impl Fn(&T) -> bool,
        merge: impl FnMut(&mut T),
    ) -> Result<Vec<String>> {
        let mut next = self.items.clone();
        let changed = merge_matching(&mut next, predicate, merge);
        if !changed.is_empty() {
            self.commit(next)?;
        }
        Ok(changed)
    }

    /// Removes the entity with `id`. Returns `false` if it was already gone.
    pub fn delete(&mut self, id: &str) -> Result<bool> {
        let removed = self.delete_where(|e| e.id() == id)?;
        Ok(!removed.is_empty())
    }

    /// Removes every matching entity and returns their ids.
    pub fn delete_where(&mut self, predicate: impl Fn(&T) -> bool) -> Result<Vec<String>> {
        let (removed, kept): (Vec<T>, Vec<T>) =
            self.items.iter().cloned().partition(|e| predicate(e));
        if removed.is_empty() {
            return Ok(Vec::new());
        }
        self.commit(kept)?;
        log::debug!("Removed {} from '{}'", removed.len(), T::KEY);
        Ok(removed.iter().map(|e| e.id().to_string()).collect())
    }

    pub fn get(&self, id: &str) -> Option<&T> {
        self.items.iter().find(|e| e.id() == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    /// Returns matching entities in collection order.
    pub fn query(&self, predicate: impl Fn(&T) -> bool) -> Vec<&T> {
        self.items.iter().filter(|e| predicate(e)).collect()
    }

    pub fn all(&self) -> &[T] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Writes the current contents to storage.
    pub fn save(&self) -> Result<()> {
        self.storage.store(&self.snapshot()?)
    }

    pub(crate) fn snapshot(&self) -> Result<StoredCollection> {
        migration::encode(&self.items)
    }

    pub(crate) fn storage(&self) -> &Rc<Storage> {
        &self.storage
    }

    /// Copy of the current contents, for undoing an unsaved multi-collection edit.
    pub(crate) fn checkpoint(&self) -> Checkpoint<T> {
        Checkpoint(self.items.clone())
    }

    pub(crate) fn rollback(&mut self, checkpoint: Checkpoint<T>) {
        self.items = checkpoint.0;
    }

    /// In-memory removal for flows that persist several collections together.
    pub(crate) fn remove_where_unsaved(&mut self, predicate: impl Fn(&T) -> bool) -> Vec<String> {
        let mut removed = Vec::new();
        self.items.retain(|e| {
            if predicate(e) {
                removed.push(e.id().to_string());
                false
            } else {
                true
            }
        });
        removed
    }

    /// In-memory update for flows that persist several collections together.
    pub(crate) fn update_where_unsaved(
        &mut self,
        predicate: impl Fn(&T) -> bool,
        merge: impl FnMut(&mut T),
    ) -> Vec<String> {
        merge_matching(&mut self.items, predicate, merge)
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.items.iter().position(|e| e.id() == id)
    }

    fn replace_at(&mut self, index: usize, mut entity: T) -> Result<()> {
        entity.touch();
        let mut next = self.items.clone();
        next[index] = entity;
        self.commit(next)
    }

    /// Persists `items` and only then makes them the live contents.
    fn commit(&mut self, items: Vec<T>) -> Result<()> {
        self.storage.store(&migration::encode(&items)?)?;
        self.items = items;
        Ok(())
    }
}

/// Contents of a [`Collection`] captured before an unsaved edit.
pub(crate) struct Checkpoint<T>(Vec<T>);

fn merge_matching<T: Entity>(
    items: &mut [T],
    predicate: impl Fn(&T) -> bool,
    mut merge: impl FnMut(&mut T),
) -> Vec<String> {
    let mut changed = Vec::new();
    for entity in items.iter_mut().filter(|e| predicate(e)) {
        merge(entity);
        entity.touch();
        changed.push(entity.id().to_string());
    }
    changed
}
