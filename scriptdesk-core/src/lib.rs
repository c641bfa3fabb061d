//! Core library for Scriptdesk, a local-first screenplay drafting tool.
//!
//! The primary entry point is [`Workspace`], which represents an open
//! `.scriptdesk` database file. It owns one store per entity family (projects,
//! folders, scripts, characters, notes) and runs the flows that span several of
//! them, such as cascading deletes and filing a quick-editor draft.
//!
//! Types are re-exported from their respective sub-modules for convenience;
//! consumers should import from the crate root rather than the `core` module.

pub mod core;

// Re-export commonly used types.
#[doc(inline)]
pub use core::{
    autosave::{Debouncer, DEFAULT_AUTO_SAVE_DELAY},
    character::{Character, CharacterGroup, CharacterStore},
    clock::{self, Timestamp},
    collection::{Collection, Entity, Placement},
    delete::{DeleteResult, DeleteStrategy},
    error::{Result, ScriptdeskError},
    ids,
    note::{Note, NoteFolder, NoteFolderStore, NotePatch, NoteStore},
    project::{Folder, FolderStore, Project, ProjectStore},
    quick_editor::QuickEditor,
    script::{Block, BlockBody, BlockKind, Script, ScriptStore},
    settings::{
        default_workspace_path, load_settings, load_settings_from, save_settings,
        save_settings_to, settings_file_path, AppSettings,
    },
    storage::{Storage, StoredCollection},
    workspace::Workspace,
};
