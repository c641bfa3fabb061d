//! Projects and the script folders inside them.

use crate::core::collection::{Collection, Entity, Placement};
use crate::core::storage::Storage;
use crate::{clock, Result, Timestamp};
use serde::{Deserialize, Serialize};
use std::rc::Rc;

/// Root of a script hierarchy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: String,
    pub name: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Entity for Project {
    const KEY: &'static str = "projects";

    fn id(&self) -> &str {
        &self.id
    }

    fn touch(&mut self) {
        self.updated_at = clock::refreshed(self.updated_at);
    }
}

/// A script folder; belongs to exactly one project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Folder {
    pub id: String,
    pub name: String,
    pub project_id: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Entity for Folder {
    const KEY: &'static str = "folders";

    fn id(&self) -> &str {
        &self.id
    }

    fn touch(&mut self) {
        self.updated_at = clock::refreshed(self.updated_at);
    }
}

pub struct ProjectStore {
    projects: Collection<Project>,
}

impl ProjectStore {
    pub fn load(storage: Rc<Storage>) -> Result<Self> {
        Ok(Self {
            projects: Collection::load(storage, Placement::Append)?,
        })
    }

    pub fn create_project(&mut self, name: &str) -> Result<Project> {
        self.projects.create(|id, now| Project {
            id,
            name: name.to_string(),
            created_at: now,
            updated_at: now,
        })
    }

    pub fn rename_project(&mut self, id: &str, name: &str) -> Result<bool> {
        self.projects.update(id, |p| p.name = name.to_string())
    }

    /// Removes the project record only; dependents are handled by the caller.
    pub fn delete_project(&mut self, id: &str) -> Result<bool> {
        self.projects.delete(id)
    }

    pub fn get_project(&self, id: &str) -> Option<&Project> {
        self.projects.get(id)
    }

    pub fn all(&self) -> &[Project] {
        self.projects.all()
    }

    pub(crate) fn collection_mut(&mut self) -> &mut Collection<Project> {
        &mut self.projects
    }
}

pub struct FolderStore {
    folders: Collection<Folder>,
}

impl FolderStore {
    pub fn load(storage: Rc<Storage>) -> Result<Self> {
        Ok(Self {
            folders: Collection::load(storage, Placement::Append)?,
        })
    }

    pub fn create_folder(&mut self, project_id: &str, name: &str) -> Result<Folder> {
        self.folders.create(|id, now| Folder {
            id,
            name: name.to_string(),
            project_id: project_id.to_string(),
            created_at: now,
            updated_at: now,
        })
    }

    pub fn rename_folder(&mut self, id: &str, name: &str) -> Result<bool> {
        self.folders.update(id, |f| f.name = name.to_string())
    }

    /// Removes the folder record only; its scripts are handled by the caller.
    pub fn delete_folder(&mut self, id: &str) -> Result<bool> {
        self.folders.delete(id)
    }

    pub fn delete_folders_by_project(&mut self, project_id: &str) -> Result<Vec<String>> {
        self.folders.delete_where(|f| f.project_id == project_id)
    }

    pub fn get_folder(&self, id: &str) -> Option<&Folder> {
        self.folders.get(id)
    }

    pub fn folders_by_project(&self, project_id: &str) -> Vec<&Folder> {
        self.folders.query(|f| f.project_id == project_id)
    }

    pub fn all(&self) -> &[Folder] {
        self.folders.all()
    }

    pub(crate) fn collection_mut(&mut self) -> &mut Collection<Folder> {
        &mut self.folders
    }
}
