//! Freeform notes and the folders that hold them.
//!
//! Notes form a hierarchy of their own, unrelated to projects. New notes are
//! listed first.

use crate::core::collection::{Collection, Entity, Placement};
use crate::core::migration::with_default;
use crate::core::storage::Storage;
use crate::{clock, Result, Timestamp};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::rc::Rc;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub id: String,
    pub title: String,
    pub content: String,
    /// `None` for a root-level note.
    pub folder_id: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Entity for Note {
    const KEY: &'static str = "notes";
    const VERSION: u32 = 2;

    fn id(&self) -> &str {
        &self.id
    }

    fn touch(&mut self) {
        self.updated_at = clock::refreshed(self.updated_at);
    }

    fn upgrade(from: u32, item: Value) -> Result<Value> {
        match from {
            // Folders did not exist in v1; every note was at the root.
            1 => Ok(with_default(item, "folderId", Value::Null)),
            _ => Ok(item),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteFolder {
    pub id: String,
    pub name: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Entity for NoteFolder {
    const KEY: &'static str = "note_folders";

    fn id(&self) -> &str {
        &self.id
    }

    fn touch(&mut self) {
        self.updated_at = clock::refreshed(self.updated_at);
    }
}

/// Partial update for a note; `None` fields are left as they are.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NotePatch {
    pub title: Option<String>,
    pub content: Option<String>,
}

impl NotePatch {
    pub fn title(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            content: None,
        }
    }

    pub fn content(content: impl Into<String>) -> Self {
        Self {
            title: None,
            content: Some(content.into()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.content.is_none()
    }

    /// Folds a later patch into this one; later fields win.
    pub fn merge(&mut self, later: NotePatch) {
        if later.title.is_some() {
            self.title = later.title;
        }
        if later.content.is_some() {
            self.content = later.content;
        }
    }

    fn apply(self, note: &mut Note) {
        if let Some(title) = self.title {
            note.title = title;
        }
        if let Some(content) = self.content {
            note.content = content;
        }
    }
}

pub struct NoteStore {
    notes: Collection<Note>,
}

impl NoteStore {
    pub fn load(storage: Rc<Storage>) -> Result<Self> {
        Ok(Self {
            notes: Collection::load(storage, Placement::Prepend)?,
        })
    }

    /// Creates an empty note at the top of the list.
    pub fn create_note(&mut self, title: &str, folder_id: Option<&str>) -> Result<Note> {
        self.notes.create(|id, now| Note {
            id,
            title: title.to_string(),
            content: String::new(),
            folder_id: folder_id.map(str::to_string),
            created_at: now,
            updated_at: now,
        })
    }

    pub fn update_note(&mut self, id: &str, patch: NotePatch) -> Result<bool> {
        self.notes.update(id, |n| patch.apply(n))
    }

    /// Applies several patches with a single write. Returns the ids that changed.
    pub fn update_notes(&mut self, patches: &HashMap<String, NotePatch>) -> Result<Vec<String>> {
        self.notes.update_where(
            |n| patches.get(&n.id).is_some_and(|p| !p.is_empty()),
            |n| {
                if let Some(patch) = patches.get(&n.id).cloned() {
                    patch.apply(n);
                }
            },
        )
    }

    pub fn move_note(&mut self, id: &str, folder_id: Option<&str>) -> Result<bool> {
        self.notes.update(id, |n| n.folder_id = folder_id.map(str::to_string))
    }

    pub fn delete_note(&mut self, id: &str) -> Result<bool> {
        self.notes.delete(id)
    }

    pub fn delete_notes_by_folder(&mut self, folder_id: &str) -> Result<Vec<String>> {
        self.notes
            .delete_where(|n| n.folder_id.as_deref() == Some(folder_id))
    }

    /// Detaches every note in `folder_id` to the root.
    pub fn move_notes_to_root(&mut self, folder_id: &str) -> Result<Vec<String>> {
        self.notes.update_where(
            |n| n.folder_id.as_deref() == Some(folder_id),
            |n| n.folder_id = None,
        )
    }

    pub fn get_note(&self, id: &str) -> Option<&Note> {
        self.notes.get(id)
    }

    pub fn all(&self) -> &[Note] {
        self.notes.all()
    }

    pub fn root_notes(&self) -> Vec<&Note> {
        self.notes.query(|n| n.folder_id.is_none())
    }

    pub fn notes_by_folder(&self, folder_id: &str) -> Vec<&Note> {
        self.notes
            .query(|n| n.folder_id.as_deref() == Some(folder_id))
    }

    pub(crate) fn collection_mut(&mut self) -> &mut Collection<Note> {
        &mut self.notes
    }
}

pub struct NoteFolderStore {
    folders: Collection<NoteFolder>,
}

impl NoteFolderStore {
    pub fn load(storage: Rc<Storage>) -> Result<Self> {
        Ok(Self {
            folders: Collection::load(storage, Placement::Append)?,
        })
    }

    pub fn create_note_folder(&mut self, name: &str) -> Result<NoteFolder> {
        self.folders.create(|id, now| NoteFolder {
            id,
            name: name.to_string(),
            created_at: now,
            updated_at: now,
        })
    }

    pub fn rename_note_folder(&mut self, id: &str, name: &str) -> Result<bool> {
        self.folders.update(id, |f| f.name = name.to_string())
    }

    /// Removes the folder record only; its notes are handled by the caller.
    pub fn delete_note_folder(&mut self, id: &str) -> Result<bool> {
        self.folders.delete(id)
    }

    pub fn get_note_folder(&self, id: &str) -> Option<&NoteFolder> {
        self.folders.get(id)
    }

    pub fn all(&self) -> &[NoteFolder] {
        self.folders.all()
    }

    pub(crate) fn collection_mut(&mut self) -> &mut Collection<NoteFolder> {
        &mut self.folders
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::migration;
    use crate::core::storage::StoredCollection;

    fn notes() -> NoteStore {
        NoteStore::load(Rc::new(Storage::in_memory().unwrap())).unwrap()
    }

    #[test]
    fn test_new_notes_are_listed_first() {
        let mut store = notes();
        store.create_note("older", None).unwrap();
        store.create_note("newer", None).unwrap();
        assert_eq!(store.all()[0].title, "newer");
        assert!(store.all()[0].content.is_empty());
    }

    #[test]
    fn test_patch_only_changes_given_fields() {
        let mut store = notes();
        let note = store.create_note("Title", None).unwrap();
        std::thread::sleep(std::time::Duration::from_millis(5));
        store
            .update_note(&note.id, NotePatch::content("body text"))
            .unwrap();

        let updated = store.get_note(&note.id).unwrap();
        assert_eq!(updated.title, "Title");
        assert_eq!(updated.content, "body text");
        assert!(updated.updated_at > note.updated_at);
    }

    #[test]
    fn test_patch_merge_later_wins() {
        let mut patch = NotePatch::title("a");
        patch.merge(NotePatch::content("b"));
        patch.merge(NotePatch::title("c"));
        assert_eq!(patch.title.as_deref(), Some("c"));
        assert_eq!(patch.content.as_deref(), Some("b"));
        assert!(!patch.is_empty());
        assert!(NotePatch::default().is_empty());
    }

    #[test]
    fn test_update_notes_applies_each_patch() {
        let mut store = notes();
        let a = store.create_note("a", None).unwrap();
        let b = store.create_note("b", None).unwrap();
        let untouched = store.create_note("c", None).unwrap();

        let patches = HashMap::from([
            (a.id.clone(), NotePatch::content("first")),
            (b.id.clone(), NotePatch::title("second")),
            (untouched.id.clone(), NotePatch::default()),
            ("missing".to_string(), NotePatch::title("x")),
        ]);
        let mut changed = store.update_notes(&patches).unwrap();
        changed.sort();
        let mut expected = vec![a.id.clone(), b.id.clone()];
        expected.sort();
        assert_eq!(changed, expected);
        assert_eq!(store.get_note(&a.id).unwrap().content, "first");
        assert_eq!(store.get_note(&b.id).unwrap().title, "second");
        assert_eq!(store.get_note(&untouched.id), Some(&untouched));
    }

    #[test]
    fn test_root_and_folder_queries() {
        let mut store = notes();
        store.create_note("root", None).unwrap();
        let filed = store.create_note("filed", Some("f1")).unwrap();
        assert_eq!(store.root_notes().len(), 1);
        assert_eq!(store.notes_by_folder("f1"), vec![&filed]);
    }

    #[test]
    fn test_move_notes_to_root() {
        let mut store = notes();
        store.create_note("a", Some("f1")).unwrap();
        store.create_note("b", Some("f1")).unwrap();
        store.create_note("c", Some("f2")).unwrap();

        let moved = store.move_notes_to_root("f1").unwrap();
        assert_eq!(moved.len(), 2);
        assert_eq!(store.root_notes().len(), 2);
        assert_eq!(store.notes_by_folder("f2").len(), 1);
    }

    #[test]
    fn test_delete_notes_by_folder() {
        let mut store = notes();
        store.create_note("a", Some("f1")).unwrap();
        let kept = store.create_note("b", None).unwrap();
        store.delete_notes_by_folder("f1").unwrap();
        assert_eq!(store.all(), &[kept]);
    }

    #[test]
    fn test_note_folder_rename() {
        let mut store = NoteFolderStore::load(Rc::new(Storage::in_memory().unwrap())).unwrap();
        let folder = store.create_note_folder("Ideas").unwrap();
        std::thread::sleep(std::time::Duration::from_millis(5));
        assert!(store.rename_note_folder(&folder.id, "Drafts").unwrap());
        let renamed = store.get_note_folder(&folder.id).unwrap();
        assert_eq!(renamed.name, "Drafts");
        assert!(renamed.updated_at > folder.updated_at);
        assert!(store.delete_note_folder(&folder.id).unwrap());
        assert!(store.all().is_empty());
    }

    #[test]
    fn test_v1_notes_gain_root_folder() {
        let record = StoredCollection {
            key: "notes".to_string(),
            version: 1,
            data: r#"[{"id":"n1","title":"t","content":"c","createdAt":"2024-01-01T00:00:00Z","updatedAt":"2024-01-02T00:00:00Z"}]"#
                .to_string(),
        };
        let notes: Vec<Note> = migration::decode(&record).unwrap();
        assert!(notes[0].folder_id.is_none());
        assert_eq!(notes[0].content, "c");
    }
}
