//! Internal domain modules for the Scriptdesk core library.
//!
//! All public types from these modules are re-exported at the crate root
//! with `#[doc(inline)]`; import from there in preference to this module.

pub mod autosave;
pub mod character;
pub mod clock;
pub mod collection;
pub mod delete;
pub mod error;
pub mod ids;
pub(crate) mod migration;
pub mod note;
pub mod project;
pub mod quick_editor;
pub mod script;
pub mod settings;
pub mod storage;
pub mod workspace;

#[doc(inline)]
pub use autosave::{Debouncer, DEFAULT_AUTO_SAVE_DELAY};
#[doc(inline)]
pub use character::{Character, CharacterGroup, CharacterStore};
#[doc(inline)]
pub use clock::Timestamp;
#[doc(inline)]
pub use collection::{Collection, Entity, Placement};
#[doc(inline)]
pub use delete::{DeleteResult, DeleteStrategy};
#[doc(inline)]
pub use error::{Result, ScriptdeskError};
#[doc(inline)]
pub use note::{Note, NoteFolder, NoteFolderStore, NotePatch, NoteStore};
#[doc(inline)]
pub use project::{Folder, FolderStore, Project, ProjectStore};
#[doc(inline)]
pub use quick_editor::QuickEditor;
#[doc(inline)]
pub use script::{Block, BlockBody, BlockKind, Script, ScriptStore};
#[doc(inline)]
pub use settings::AppSettings;
#[doc(inline)]
pub use storage::{Storage, StoredCollection};
#[doc(inline)]
pub use workspace::Workspace;
