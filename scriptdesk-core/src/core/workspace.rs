//! High-level workspace operations over a Scriptdesk SQLite database.

use crate::{
    AppSettings, CharacterStore, Debouncer, DeleteResult, DeleteStrategy, FolderStore, Note,
    NoteFolderStore, NotePatch, NoteStore, ProjectStore, QuickEditor, Result, Script, ScriptStore,
    ScriptdeskError, Storage,
};
use std::collections::HashMap;
use std::path::Path;
use std::rc::Rc;
use std::time::Instant;

const APP_VERSION: &str = env!("CARGO_PKG_VERSION");
const DEFAULT_UNTITLED_TITLE: &str = "Untitled Script";

/// An open Scriptdesk workspace backed by a SQLite database.
///
/// `Workspace` owns one store per entity family, all sharing a single
/// [`Storage`] handle. Single-collection edits go through the stores directly;
/// flows that span several collections (cascading deletes, filing a draft,
/// debounced note saves) live here.
pub struct Workspace {
    storage: Rc<Storage>,
    projects: ProjectStore,
    folders: FolderStore,
    scripts: ScriptStore,
    characters: CharacterStore,
    notes: NoteStore,
    note_folders: NoteFolderStore,
    note_drafts: HashMap<String, NotePatch>,
    note_autosave: Debouncer<String>,
    untitled_script_title: String,
}

impl Workspace {
    /// Creates a new workspace database at `path` and records the app version.
    ///
    /// # Errors
    ///
    /// Returns [`crate::ScriptdeskError::Database`] for any SQLite failure.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let storage = Storage::create(&path)?;
        storage.set_meta("app_version", APP_VERSION)?;
        storage.set_meta("created_at", &crate::clock::now().to_rfc3339())?;
        log::info!("Created workspace at {}", path.as_ref().display());
        Self::from_storage(storage)
    }

    /// Opens an existing workspace, migrating older collections as they load.
    ///
    /// # Errors
    ///
    /// Returns [`crate::ScriptdeskError::InvalidWorkspace`] if the file is not a
    /// Scriptdesk database, or [`crate::ScriptdeskError::UnsupportedVersion`] if
    /// a collection was written by a newer build.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let storage = Storage::open(&path)?;
        let written_by = storage.get_meta("app_version")?;
        let workspace = Self::from_storage(storage)?;
        if written_by.as_deref() != Some(APP_VERSION) {
            log::info!(
                "Workspace last written by {}, now {APP_VERSION}",
                written_by.as_deref().unwrap_or("an unknown version")
            );
            workspace.storage.set_meta("app_version", APP_VERSION)?;
        }
        log::info!("Opened workspace at {}", path.as_ref().display());
        Ok(workspace)
    }

    /// Opens `path` if it exists, otherwise creates it along with any missing
    /// parent directories.
    pub fn open_or_create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            return Self::open(path);
        }
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Self::create(path)
    }

    /// Opens the workspace named in `settings` and applies its preferences.
    pub fn open_with_settings(settings: &AppSettings) -> Result<Self> {
        let mut workspace = Self::open_or_create(&settings.workspace_path)?;
        workspace.apply_settings(settings);
        Ok(workspace)
    }

    /// A workspace that is discarded when dropped.
    pub fn in_memory() -> Result<Self> {
        Self::from_storage(Storage::in_memory()?)
    }

    fn from_storage(storage: Storage) -> Result<Self> {
        let storage = Rc::new(storage);
        Ok(Self {
            projects: ProjectStore::load(Rc::clone(&storage))?,
            folders: FolderStore::load(Rc::clone(&storage))?,
            scripts: ScriptStore::load(Rc::clone(&storage))?,
            characters: CharacterStore::load(Rc::clone(&storage))?,
            notes: NoteStore::load(Rc::clone(&storage))?,
            note_folders: NoteFolderStore::load(Rc::clone(&storage))?,
            note_drafts: HashMap::new(),
            note_autosave: Debouncer::default(),
            untitled_script_title: DEFAULT_UNTITLED_TITLE.to_string(),
            storage,
        })
    }

    /// Applies user preferences. Already pending saves keep their deadlines.
    pub fn apply_settings(&mut self, settings: &AppSettings) {
        self.note_autosave.set_delay(settings.auto_save_delay());
        let title = settings.untitled_script_title.trim();
        self.untitled_script_title = if title.is_empty() {
            DEFAULT_UNTITLED_TITLE.to_string()
        } else {
            title.to_string()
        };
    }

    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    pub fn projects(&self) -> &ProjectStore {
        &self.projects
    }

    pub fn projects_mut(&mut self) -> &mut ProjectStore {
        &mut self.projects
    }

    pub fn folders(&self) -> &FolderStore {
        &self.folders
    }

    pub fn folders_mut(&mut self) -> &mut FolderStore {
        &mut self.folders
    }

    pub fn scripts(&self) -> &ScriptStore {
        &self.scripts
    }

    pub fn scripts_mut(&mut self) -> &mut ScriptStore {
        &mut self.scripts
    }

    pub fn characters(&self) -> &CharacterStore {
        &self.characters
    }

    pub fn characters_mut(&mut self) -> &mut CharacterStore {
        &mut self.characters
    }

    /// Read access to notes. Edits go through [`edit_note`](Self::edit_note)
    /// or [`notes_mut`](Self::notes_mut).
    pub fn notes(&self) -> &NoteStore {
        &self.notes
    }

    pub fn notes_mut(&mut self) -> &mut NoteStore {
        &mut self.notes
    }

    pub fn note_folders(&self) -> &NoteFolderStore {
        &self.note_folders
    }

    pub fn note_folders_mut(&mut self) -> &mut NoteFolderStore {
        &mut self.note_folders
    }

    /// Deletes a project together with its scripts, folders, characters and
    /// character groups.
    ///
    /// All five collections are written in one transaction. If it fails, both
    /// the file and the in-memory stores are left as they were.
    ///
    /// # Errors
    ///
    /// Returns [`crate::ScriptdeskError::Database`] if the transaction fails.
    pub fn delete_project(&mut self, project_id: &str) -> Result<DeleteResult> {
        let scripts = self.scripts.collection_mut().checkpoint();
        let folders = self.folders.collection_mut().checkpoint();
        let characters = self.characters.characters_mut().checkpoint();
        let groups = self.characters.groups_mut().checkpoint();
        let projects = self.projects.collection_mut().checkpoint();
        let mut result = DeleteResult::default();
        result.record_deleted(
            self.scripts
                .collection_mut()
                .remove_where_unsaved(|s| s.project_id == project_id),
        );
        result.record_deleted(
            self.folders
                .collection_mut()
                .remove_where_unsaved(|f| f.project_id == project_id),
        );
        result.record_deleted(
            self.characters
                .characters_mut()
                .remove_where_unsaved(|c| c.project_id == project_id),
        );
        result.record_deleted(
            self.characters
                .groups_mut()
                .remove_where_unsaved(|g| g.project_id == project_id),
        );
        result.record_deleted(
            self.projects
                .collection_mut()
                .remove_where_unsaved(|p| p.id == project_id),
        );

        if result.is_empty() {
            return Ok(result);
        }
        let written = [
            self.scripts.collection_mut().snapshot(),
            self.folders.collection_mut().snapshot(),
            self.characters.characters_mut().snapshot(),
            self.characters.groups_mut().snapshot(),
            self.projects.collection_mut().snapshot(),
        ]
        .into_iter()
        .collect::<Result<Vec<_>>>()
        .and_then(|records| self.storage.store_all(&records));
        if let Err(e) = written {
            self.scripts.collection_mut().rollback(scripts);
            self.folders.collection_mut().rollback(folders);
            self.characters.characters_mut().rollback(characters);
            self.characters.groups_mut().rollback(groups);
            self.projects.collection_mut().rollback(projects);
            return Err(e);
        }
        log::info!(
            "Deleted project {project_id} and {} dependent entities",
            result.deleted_count.saturating_sub(1)
        );
        Ok(result)
    }

    /// Deletes a script folder and every script filed in it.
    pub fn delete_folder(&mut self, folder_id: &str) -> Result<DeleteResult> {
        let scripts = self.scripts.collection_mut().checkpoint();
        let folders = self.folders.collection_mut().checkpoint();
        let mut result = DeleteResult::default();
        result.record_deleted(
            self.scripts
                .collection_mut()
                .remove_where_unsaved(|s| s.folder_id.as_deref() == Some(folder_id)),
        );
        result.record_deleted(
            self.folders
                .collection_mut()
                .remove_where_unsaved(|f| f.id == folder_id),
        );

        if result.is_empty() {
            return Ok(result);
        }
        let written = [
            self.scripts.collection_mut().snapshot(),
            self.folders.collection_mut().snapshot(),
        ]
        .into_iter()
        .collect::<Result<Vec<_>>>()
        .and_then(|records| self.storage.store_all(&records));
        if let Err(e) = written {
            self.scripts.collection_mut().rollback(scripts);
            self.folders.collection_mut().rollback(folders);
            return Err(e);
        }
        log::info!("Deleted folder {folder_id} ({} entities)", result.deleted_count);
        Ok(result)
    }

    /// Deletes a character group; its members become ungrouped.
    pub fn delete_character_group(&mut self, group_id: &str) -> Result<DeleteResult> {
        let result = self.characters.delete_group(group_id)?;
        if !result.is_empty() {
            log::info!(
                "Deleted character group {group_id}, ungrouped {} characters",
                result.reparented_ids.len()
            );
        }
        Ok(result)
    }

    /// Deletes a note folder, handling its notes according to `strategy`.
    ///
    /// [`DeleteStrategy::DeleteAll`] removes the notes along with the folder and
    /// discards their pending drafts. [`DeleteStrategy::PromoteChildren`] moves
    /// them to the root and reports them in `reparented_ids`.
    pub fn delete_note_folder(
        &mut self,
        folder_id: &str,
        strategy: DeleteStrategy,
    ) -> Result<DeleteResult> {
        let notes = self.notes.collection_mut().checkpoint();
        let note_folders = self.note_folders.collection_mut().checkpoint();
        let mut result = DeleteResult::default();
        let in_folder = |n: &Note| n.folder_id.as_deref() == Some(folder_id);
        match strategy {
            DeleteStrategy::DeleteAll => {
                result.record_deleted(self.notes.collection_mut().remove_where_unsaved(in_folder));
            }
            DeleteStrategy::PromoteChildren => {
                result.record_reparented(
                    self.notes
                        .collection_mut()
                        .update_where_unsaved(in_folder, |n| n.folder_id = None),
                );
            }
        }
        result.record_deleted(
            self.note_folders
                .collection_mut()
                .remove_where_unsaved(|f| f.id == folder_id),
        );

        if result.is_empty() {
            return Ok(result);
        }
        let written = [
            self.notes.collection_mut().snapshot(),
            self.note_folders.collection_mut().snapshot(),
        ]
        .into_iter()
        .collect::<Result<Vec<_>>>()
        .and_then(|records| self.storage.store_all(&records));
        if let Err(e) = written {
            self.notes.collection_mut().rollback(notes);
            self.note_folders.collection_mut().rollback(note_folders);
            return Err(e);
        }
        for id in &result.affected_ids {
            self.discard_note_draft(id);
        }
        log::info!("Deleted note folder {folder_id} ({strategy:?})");
        Ok(result)
    }

    /// Deletes a note and drops any unsaved draft for it.
    pub fn delete_note(&mut self, note_id: &str) -> Result<bool> {
        let deleted = self.notes.delete_note(note_id)?;
        self.discard_note_draft(note_id);
        Ok(deleted)
    }

    /// Files a quick-editor draft as a new script and clears the editor.
    ///
    /// The draft's blocks are copied in order and its roster is carried over.
    /// A blank title is replaced with the configured untitled title.
    ///
    /// # Errors
    ///
    /// Returns [`crate::ScriptdeskError::ValidationFailed`] if the draft has no
    /// blocks, or [`crate::ScriptdeskError::NotFound`] if the project does not
    /// exist or the folder is not part of it. The editor is left untouched on
    /// error.
    pub fn file_draft(
        &mut self,
        editor: &mut QuickEditor,
        project_id: &str,
        folder_id: Option<&str>,
    ) -> Result<Script> {
        if editor.blocks().is_empty() {
            return Err(ScriptdeskError::ValidationFailed(
                "A draft needs at least one block before it can be filed".to_string(),
            ));
        }
        if self.projects.get_project(project_id).is_none() {
            return Err(ScriptdeskError::not_found("Project", project_id));
        }
        if let Some(folder_id) = folder_id {
            match self.folders.get_folder(folder_id) {
                Some(folder) if folder.project_id == project_id => {}
                _ => return Err(ScriptdeskError::not_found("Folder", folder_id)),
            }
        }

        let title = match editor.title().trim() {
            "" => self.untitled_script_title.clone(),
            title => title.to_string(),
        };
        let filed = self.scripts.import_script(
            project_id,
            folder_id,
            &title,
            editor.bodies(),
            editor.characters(),
        )?;
        editor.clear();
        log::info!(
            "Filed draft '{}' with {} blocks into project {project_id}",
            filed.title,
            filed.blocks.len()
        );
        Ok(filed)
    }

    /// Speaker names to offer while writing dialogue.
    ///
    /// The script roster comes first, followed by display names of the
    /// project's characters that are not already in it.
    pub fn speaker_choices(&self, script_id: &str, project_id: Option<&str>) -> Vec<String> {
        let mut choices: Vec<String> = self
            .scripts
            .get_script(script_id)
            .map(|s| s.characters.clone())
            .unwrap_or_default();
        let project_id = project_id.or_else(|| {
            self.scripts
                .get_script(script_id)
                .map(|s| s.project_id.as_str())
        });
        if let Some(project_id) = project_id {
            for character in self.characters.characters_by_project(project_id) {
                let name = character.display_name();
                if !choices.iter().any(|c| c == name) {
                    choices.push(name.to_string());
                }
            }
        }
        choices
    }

    /// Records an edit to a note and (re)arms its auto-save timer.
    ///
    /// Successive edits are merged into one pending draft; nothing is written
    /// until [`run_due_saves`](Self::run_due_saves) or
    /// [`flush_pending_saves`](Self::flush_pending_saves) commits it. Returns
    /// `false` if the note does not exist.
    pub fn edit_note(&mut self, note_id: &str, patch: NotePatch, now: Instant) -> bool {
        if self.notes.get_note(note_id).is_none() {
            return false;
        }
        self.note_drafts
            .entry(note_id.to_string())
            .or_default()
            .merge(patch);
        self.note_autosave.schedule(note_id.to_string(), now);
        true
    }

    /// The uncommitted edits for a note, if any.
    pub fn pending_note_draft(&self, note_id: &str) -> Option<&NotePatch> {
        self.note_drafts.get(note_id)
    }

    /// When the next pending note save falls due.
    pub fn next_save_deadline(&self) -> Option<Instant> {
        self.note_autosave.next_deadline()
    }

    /// Commits every draft whose timer has expired by `now`.
    ///
    /// Returns the number of notes written.
    ///
    /// All due drafts are written together. If the write fails they stay
    /// pending and are retried after another delay.
    pub fn run_due_saves(&mut self, now: Instant) -> Result<usize> {
        let due = self.note_autosave.take_due(now);
        self.commit_note_drafts(due, now)
    }

    /// Commits every pending draft immediately.
    pub fn flush_pending_saves(&mut self) -> Result<usize> {
        let pending = self.note_autosave.drain();
        self.commit_note_drafts(pending, Instant::now())
    }

    /// Flushes pending saves and closes the workspace.
    pub fn close(mut self) -> Result<()> {
        let saved = self.flush_pending_saves()?;
        log::info!("Closed workspace ({saved} pending notes saved)");
        Ok(())
    }

    fn commit_note_drafts(&mut self, ids: Vec<String>, now: Instant) -> Result<usize> {
        let patches: HashMap<String, NotePatch> = ids
            .iter()
            .filter_map(|id| self.note_drafts.get(id).map(|p| (id.clone(), p.clone())))
            .collect();
        match self.notes.update_notes(&patches) {
            Ok(saved) => {
                for id in &ids {
                    self.note_drafts.remove(id);
                }
                if !saved.is_empty() {
                    log::debug!("Auto-saved {} notes", saved.len());
                }
                Ok(saved.len())
            }
            Err(e) => {
                for id in patches.into_keys() {
                    self.note_autosave.schedule(id, now);
                }
                Err(e)
            }
        }
    }

    fn discard_note_draft(&mut self, note_id: &str) {
        let id = note_id.to_string();
        self.note_autosave.cancel(&id);
        self.note_drafts.remove(&id);
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        if self.note_autosave.pending_count() == 0 {
            return;
        }
        if let Err(e) = self.flush_pending_saves() {
            log::warn!("Failed to save pending notes on drop: {e}");
        }
    }
}
