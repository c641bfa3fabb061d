//! Per-project character roster, optionally organized into groups.
//!
//! This registry is independent from the free-text speaker roster each
//! [`Script`](crate::Script) keeps. [`CharacterStore::resolve_speaker`] joins the
//! two, preferring an alias match over a name match.

use crate::core::collection::{Collection, Entity, Placement};
use crate::core::migration::with_default;
use crate::core::storage::Storage;
use crate::{DeleteResult, Result, Timestamp};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::rc::Rc;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Character {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub alias: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    pub project_id: String,
    /// `None` means ungrouped.
    pub group_id: Option<String>,
    pub created_at: Timestamp,
}

impl Character {
    /// The alias when one is set, otherwise the name.
    pub fn display_name(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }
}

impl Entity for Character {
    const KEY: &'static str = "characters";
    const VERSION: u32 = 2;

    fn id(&self) -> &str {
        &self.id
    }

    fn upgrade(from: u32, item: Value) -> Result<Value> {
        match from {
            // v1 stored "" for a missing alias or description
            1 => {
                let mut item = with_default(item, "alias", Value::Null);
                item = with_default(item, "description", Value::Null);
                if let Value::Object(map) = &mut item {
                    for field in ["alias", "description"] {
                        if map.get(field).and_then(Value::as_str) == Some("") {
                            map.insert(field.to_string(), Value::Null);
                        }
                    }
                }
                Ok(item)
            }
            _ => Ok(item),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CharacterGroup {
    pub id: String,
    pub name: String,
    pub project_id: String,
    pub created_at: Timestamp,
}

impl Entity for CharacterGroup {
    const KEY: &'static str = "character_groups";

    fn id(&self) -> &str {
        &self.id
    }
}

/// Blank optional text is stored as absent.
fn non_blank(value: Option<&str>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty()).map(str::to_string)
}

pub struct CharacterStore {
    characters: Collection<Character>,
    groups: Collection<CharacterGroup>,
}

impl CharacterStore {
    pub fn load(storage: Rc<Storage>) -> Result<Self> {
        Ok(Self {
            characters: Collection::load(Rc::clone(&storage), Placement::Append)?,
            groups: Collection::load(storage, Placement::Append)?,
        })
    }

    // ── Characters ────────────────────────────────────────────────

    pub fn add_character(
        &mut self,
        project_id: &str,
        name: &str,
        group_id: Option<&str>,
        description: Option<&str>,
        alias: Option<&str>,
    ) -> Result<Character> {
        self.characters.create(|id, now| Character {
            id,
            name: name.to_string(),
            alias: non_blank(alias),
            description: non_blank(description),
            project_id: project_id.to_string(),
            group_id: group_id.map(str::to_string),
            created_at: now,
        })
    }

    pub fn rename_character(&mut self, id: &str, name: &str) -> Result<bool> {
        self.characters.update(id, |c| c.name = name.to_string())
    }

    pub fn update_alias(&mut self, id: &str, alias: Option<&str>) -> Result<bool> {
        self.characters.update(id, |c| c.alias = non_blank(alias))
    }

    pub fn update_description(&mut self, id: &str, description: Option<&str>) -> Result<bool> {
        self.characters
            .update(id, |c| c.description = non_blank(description))
    }

    /// Reassigns the character's group. The group is not checked against the
    /// character's project.
    pub fn move_character(&mut self, id: &str, group_id: Option<&str>) -> Result<bool> {
        self.characters
            .update(id, |c| c.group_id = group_id.map(str::to_string))
    }

    pub fn delete_character(&mut self, id: &str) -> Result<bool> {
        self.characters.delete(id)
    }

    pub fn delete_characters_by_project(&mut self, project_id: &str) -> Result<Vec<String>> {
        self.characters.delete_where(|c| c.project_id == project_id)
    }

    pub fn get_character(&self, id: &str) -> Option<&Character> {
        self.characters.get(id)
    }

    pub fn characters(&self) -> &[Character] {
        self.characters.all()
    }

    pub fn characters_by_project(&self, project_id: &str) -> Vec<&Character> {
        self.characters.query(|c| c.project_id == project_id)
    }

    pub fn characters_by_group(&self, group_id: &str) -> Vec<&Character> {
        self.characters
            .query(|c| c.group_id.as_deref() == Some(group_id))
    }

    pub fn ungrouped_characters(&self, project_id: &str) -> Vec<&Character> {
        self.characters
            .query(|c| c.project_id == project_id && c.group_id.is_none())
    }

    /// Finds the project character a script speaker name refers to.
    ///
    /// An alias match wins over a name match, so a character whose alias is
    /// "Doc" is found for "Doc" even if another character is named "Doc".
    pub fn resolve_speaker(&self, project_id: &str, speaker: &str) -> Option<&Character> {
        let in_project = self.characters_by_project(project_id);
        in_project
            .iter()
            .find(|c| c.alias.as_deref() == Some(speaker))
            .or_else(|| in_project.iter().find(|c| c.name == speaker))
            .copied()
    }

    // ── Groups ────────────────────────────────────────────────────

    pub fn add_group(&mut self, project_id: &str, name: &str) -> Result<CharacterGroup> {
        self.groups.create(|id, now| CharacterGroup {
            id,
            name: name.to_string(),
            project_id: project_id.to_string(),
            created_at: now,
        })
    }

    pub fn rename_group(&mut self, id: &str, name: &str) -> Result<bool> {
        self.groups.update(id, |g| g.name = name.to_string())
    }

    /// Removes the group and moves its members to ungrouped.
    ///
    /// Both collections are written in one transaction; if it fails, neither
    /// changes. Deleting a group that does not exist still ungroups any
    /// character that points at it.
    pub fn delete_group(&mut self, id: &str) -> Result<DeleteResult> {
        let groups = self.groups.checkpoint();
        let characters = self.characters.checkpoint();
        let mut result = DeleteResult::default();
        result.record_deleted(self.groups.remove_where_unsaved(|g| g.id == id));
        result.record_reparented(self.characters.update_where_unsaved(
            |c| c.group_id.as_deref() == Some(id),
            |c| c.group_id = None,
        ));

        if !result.is_empty() {
            let written = [self.groups.snapshot(), self.characters.snapshot()]
                .into_iter()
                .collect::<Result<Vec<_>>>()
                .and_then(|records| self.groups.storage().store_all(&records));
            if let Err(e) = written {
                self.groups.rollback(groups);
                self.characters.rollback(characters);
                return Err(e);
            }
            log::debug!(
                "Deleted group {id}, ungrouped {} characters",
                result.reparented_ids.len()
            );
        }
        Ok(result)
    }

    pub fn delete_groups_by_project(&mut self, project_id: &str) -> Result<Vec<String>> {
        self.groups.delete_where(|g| g.project_id == project_id)
    }

    pub fn get_group(&self, id: &str) -> Option<&CharacterGroup> {
        self.groups.get(id)
    }

    pub fn groups(&self) -> &[CharacterGroup] {
        self.groups.all()
    }

    pub fn groups_by_project(&self, project_id: &str) -> Vec<&CharacterGroup> {
        self.groups.query(|g| g.project_id == project_id)
    }

    pub(crate) fn characters_mut(&mut self) -> &mut Collection<Character> {
        &mut self.characters
    }

    pub(crate) fn groups_mut(&mut self) -> &mut Collection<CharacterGroup> {
        &mut self.groups
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::migration;
    use crate::core::storage::StoredCollection;

    fn store() -> CharacterStore {
        CharacterStore::load(Rc::new(Storage::in_memory().unwrap())).unwrap()
    }

    #[test]
    fn test_add_character_defaults_to_ungrouped() {
        let mut store = store();
        let bob = store
            .add_character("p1", "Bob", None, Some("villain"), None)
            .unwrap();
        assert!(bob.group_id.is_none());
        assert_eq!(bob.description.as_deref(), Some("villain"));
        assert!(bob.alias.is_none());
        assert_eq!(store.ungrouped_characters("p1"), vec![&bob]);
    }

    #[test]
    fn test_blank_alias_is_stored_as_none() {
        let mut store = store();
        let c = store.add_character("p1", "Ann", None, None, Some("  ")).unwrap();
        assert!(c.alias.is_none());
        assert_eq!(c.display_name(), "Ann");

        store.update_alias(&c.id, Some("Annie")).unwrap();
        assert_eq!(store.get_character(&c.id).unwrap().display_name(), "Annie");
    }

    #[test]
    fn test_move_then_delete_group_ungroups_members() {
        let mut store = store();
        let bob = store
            .add_character("p1", "Bob", None, Some("villain"), None)
            .unwrap();
        let group = store.add_group("p1", "Villains").unwrap();
        store.move_character(&bob.id, Some(&group.id)).unwrap();
        assert_eq!(store.characters_by_group(&group.id).len(), 1);

        let result = store.delete_group(&group.id).unwrap();
        assert_eq!(result.deleted_count, 1);
        assert_eq!(result.reparented_ids, vec![bob.id.clone()]);
        assert!(store.get_group(&group.id).is_none());
        assert!(store.get_character(&bob.id).unwrap().group_id.is_none());
    }

    #[test]
    fn test_delete_group_persists_both_collections() {
        let storage = Rc::new(Storage::in_memory().unwrap());
        let mut store = CharacterStore::load(Rc::clone(&storage)).unwrap();
        let group = store.add_group("p1", "Crew").unwrap();
        for name in ["A", "B", "C"] {
            store
                .add_character("p1", name, Some(&group.id), None, None)
                .unwrap();
        }
        store.delete_group(&group.id).unwrap();

        let reloaded = CharacterStore::load(storage).unwrap();
        assert!(reloaded.groups().is_empty());
        assert_eq!(reloaded.ungrouped_characters("p1").len(), 3);
    }

    #[test]
    fn test_delete_missing_group_is_noop() {
        let mut store = store();
        let result = store.delete_group("missing").unwrap();
        assert!(result.is_empty());
    }

    #[test]
    fn test_resolve_speaker_prefers_alias() {
        let mut store = store();
        let doc_by_name = store.add_character("p1", "Doc", None, None, None).unwrap();
        let doc_by_alias = store
            .add_character("p1", "Emmett Brown", None, None, Some("Doc"))
            .unwrap();
        store.add_character("p2", "Marty", None, None, None).unwrap();

        assert_eq!(store.resolve_speaker("p1", "Doc"), Some(&doc_by_alias));
        assert_ne!(store.resolve_speaker("p1", "Doc"), Some(&doc_by_name));
        assert!(store.resolve_speaker("p1", "Marty").is_none());
    }

    #[test]
    fn test_delete_by_project_spares_other_projects() {
        let mut store = store();
        store.add_character("p1", "A", None, None, None).unwrap();
        store.add_character("p2", "B", None, None, None).unwrap();
        store.add_group("p1", "G1").unwrap();
        store.add_group("p2", "G2").unwrap();

        store.delete_characters_by_project("p1").unwrap();
        store.delete_groups_by_project("p1").unwrap();
        assert_eq!(store.characters().len(), 1);
        assert_eq!(store.groups().len(), 1);
        assert_eq!(store.groups_by_project("p2")[0].name, "G2");
    }

    #[test]
    fn test_v1_characters_are_migrated() {
        let record = StoredCollection {
            key: "characters".to_string(),
            version: 1,
            data: r#"[
                {"id":"c1","name":"Ann","alias":"","description":"lead","projectId":"p1","groupId":null,"createdAt":"2024-01-01T00:00:00Z"},
                {"id":"c2","name":"Ben","projectId":"p1","groupId":"g1","createdAt":"2024-01-01T00:00:00Z"}
            ]"#
            .to_string(),
        };
        let characters: Vec<Character> = migration::decode(&record).unwrap();
        assert!(characters[0].alias.is_none());
        assert_eq!(characters[0].description.as_deref(), Some("lead"));
        assert!(characters[1].alias.is_none());
        assert_eq!(characters[1].group_id.as_deref(), Some("g1"));
    }

    #[test]
    fn test_failed_group_delete_keeps_members_grouped() {
        let storage = Rc::new(Storage::in_memory().unwrap());
        let mut store = CharacterStore::load(Rc::clone(&storage)).unwrap();
        let group = store.add_group("p1", "Crew").unwrap();
        let member = store
            .add_character("p1", "A", Some(&group.id), None, None)
            .unwrap();

        storage
            .connection()
            .execute("ALTER TABLE collections RENAME TO collections_offline", [])
            .unwrap();
        assert!(store.delete_group(&group.id).is_err());
        assert!(store.get_group(&group.id).is_some());
        assert_eq!(store.get_character(&member.id), Some(&member));
    }
}
