//! Scripts and their ordered block sequences.

use crate::core::collection::{Collection, Entity, Placement};
use crate::core::storage::Storage;
use crate::{clock, ids, Result, ScriptdeskError, Timestamp};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::rc::Rc;

/// Discriminant of a [`BlockBody`], used for error reporting and UI dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockKind {
    SceneHeading,
    Dialogue,
    Action,
}

impl fmt::Display for BlockKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::SceneHeading => "scene heading",
            Self::Dialogue => "dialogue",
            Self::Action => "action",
        };
        f.write_str(label)
    }
}

/// Content of a block. Serialized with an internal `type` tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BlockBody {
    SceneHeading { location: String },
    Dialogue { character: String, text: String },
    Action { text: String },
}

impl BlockBody {
    pub fn kind(&self) -> BlockKind {
        match self {
            Self::SceneHeading { .. } => BlockKind::SceneHeading,
            Self::Dialogue { .. } => BlockKind::Dialogue,
            Self::Action { .. } => BlockKind::Action,
        }
    }

    /// The speaking character, for dialogue.
    pub fn speaker(&self) -> Option<&str> {
        match self {
            Self::Dialogue { character, .. } => Some(character),
            Self::SceneHeading { .. } | Self::Action { .. } => None,
        }
    }
}

/// One element of a script. The id and creation time never change; only the
/// body can be replaced, and only by a body of the same kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    id: String,
    created_at: Timestamp,
    #[serde(flatten)]
    body: BlockBody,
}

impl Block {
    pub(crate) fn new(body: BlockBody) -> Self {
        Self {
            id: ids::new_id(),
            created_at: clock::now(),
            body,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn created_at(&self) -> Timestamp {
        self.created_at
    }

    pub fn body(&self) -> &BlockBody {
        &self.body
    }

    pub fn kind(&self) -> BlockKind {
        self.body.kind()
    }

    /// Swaps in `body` if it has the same kind as the current one.
    pub(crate) fn replace_body(&mut self, body: BlockBody) -> Result<()> {
        if body.kind() != self.kind() {
            return Err(ScriptdeskError::BlockKindMismatch {
                expected: self.kind(),
                found: body.kind(),
            });
        }
        self.body = body;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Script {
    pub id: String,
    pub title: String,
    pub project_id: String,
    /// `None` places the script at the project root.
    pub folder_id: Option<String>,
    pub blocks: Vec<Block>,
    /// Speaker names used in this script, in order of first use.
    pub characters: Vec<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Script {
    /// Adds `name` to the roster unless it is already present.
    pub fn add_speaker(&mut self, name: &str) -> bool {
        if self.characters.iter().any(|c| c == name) {
            return false;
        }
        self.characters.push(name.to_string());
        true
    }

    pub fn block(&self, block_id: &str) -> Option<&Block> {
        self.blocks.iter().find(|b| b.id == block_id)
    }

    fn push_block(&mut self, block: Block) {
        if let Some(speaker) = block.body.speaker() {
            let speaker = speaker.to_string();
            self.add_speaker(&speaker);
        }
        self.blocks.push(block);
    }
}

impl Entity for Script {
    const KEY: &'static str = "scripts";

    fn id(&self) -> &str {
        &self.id
    }

    fn touch(&mut self) {
        self.updated_at = clock::refreshed(self.updated_at);
    }
}

/// Why an in-script edit did not go ahead.
enum Skip {
    /// Nothing to change; not an error.
    Unchanged,
    Rejected(ScriptdeskError),
}

type Edit = std::result::Result<(), Skip>;

pub struct ScriptStore {
    scripts: Collection<Script>,
}

impl ScriptStore {
    pub fn load(storage: Rc<Storage>) -> Result<Self> {
        Ok(Self {
            scripts: Collection::load(storage, Placement::Append)?,
        })
    }

    pub fn create_script(
        &mut self,
        project_id: &str,
        title: &str,
        folder_id: Option<&str>,
    ) -> Result<Script> {
        self.import_script(project_id, folder_id, title, Vec::new(), &[])
    }

    /// Creates a script already holding `bodies`, in order, with one write.
    ///
    /// Dialogue speakers join the roster first, then any `roster` names not
    /// already present.
    pub fn import_script(
        &mut self,
        project_id: &str,
        folder_id: Option<&str>,
        title: &str,
        bodies: Vec<BlockBody>,
        roster: &[String],
    ) -> Result<Script> {
        self.scripts.create(|id, now| {
            let mut script = Script {
                id,
                title: title.to_string(),
                project_id: project_id.to_string(),
                folder_id: folder_id.map(str::to_string),
                blocks: Vec::with_capacity(bodies.len()),
                characters: Vec::new(),
                created_at: now,
                updated_at: now,
            };
            for body in bodies {
                script.push_block(Block::new(body));
            }
            for name in roster {
                script.add_speaker(name);
            }
            script
        })
    }

    pub fn rename_script(&mut self, id: &str, title: &str) -> Result<bool> {
        self.scripts.update(id, |s| s.title = title.to_string())
    }

    /// Moves a script into `folder_id`, or to the project root when `None`.
    pub fn move_script(&mut self, id: &str, folder_id: Option<&str>) -> Result<bool> {
        self.scripts.update(id, |s| s.folder_id = folder_id.map(str::to_string))
    }

    pub fn delete_script(&mut self, id: &str) -> Result<bool> {
        self.scripts.delete(id)
    }

    pub fn delete_scripts_by_folder(&mut self, folder_id: &str) -> Result<Vec<String>> {
        self.scripts
            .delete_where(|s| s.folder_id.as_deref() == Some(folder_id))
    }

    pub fn delete_scripts_by_project(&mut self, project_id: &str) -> Result<Vec<String>> {
        self.scripts.delete_where(|s| s.project_id == project_id)
    }

    pub fn get_script(&self, id: &str) -> Option<&Script> {
        self.scripts.get(id)
    }

    pub fn all(&self) -> &[Script] {
        self.scripts.all()
    }

    pub fn scripts_by_folder(&self, folder_id: &str) -> Vec<&Script> {
        self.scripts
            .query(|s| s.folder_id.as_deref() == Some(folder_id))
    }

    pub fn scripts_by_project(&self, project_id: &str) -> Vec<&Script> {
        self.scripts.query(|s| s.project_id == project_id)
    }

    /// Scripts of `project_id` that are not inside any folder.
    pub fn root_scripts(&self, project_id: &str) -> Vec<&Script> {
        self.scripts
            .query(|s| s.project_id == project_id && s.folder_id.is_none())
    }

    /// Appends a block to the end of the script.
    ///
    /// Returns `None` when the script does not exist. Dialogue adds its speaker
    /// to the script roster if the name is new.
    pub fn add_block(&mut self, script_id: &str, body: BlockBody) -> Result<Option<Block>> {
        let block = Block::new(body);
        let appended = self
            .scripts
            .update(script_id, |s| s.push_block(block.clone()))?;
        Ok(appended.then_some(block))
    }

    /// Replaces the body of a block in place; its position does not change.
    ///
    /// Returns `Ok(false)` when the script or block does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`ScriptdeskError::BlockKindMismatch`] if `body` is a different
    /// kind than the stored block; the script is left untouched.
    pub fn update_block(&mut self, script_id: &str, block_id: &str, body: BlockBody) -> Result<bool> {
        let outcome = self.scripts.try_update(script_id, |s| -> Edit {
            let speaker = body.speaker().map(str::to_string);
            let block = s
                .blocks
                .iter_mut()
                .find(|b| b.id == block_id)
                .ok_or(Skip::Unchanged)?;
            block.replace_body(body).map_err(Skip::Rejected)?;
            if let Some(name) = speaker {
                s.add_speaker(&name);
            }
            Ok(())
        })?;
        Self::settle(outcome)
    }

    /// Removes a block by id; a missing block is a no-op.
    pub fn remove_block(&mut self, script_id: &str, block_id: &str) -> Result<bool> {
        let outcome = self.scripts.try_update(script_id, |s| -> Edit {
            let before = s.blocks.len();
            s.blocks.retain(|b| b.id != block_id);
            if s.blocks.len() == before {
                return Err(Skip::Unchanged);
            }
            Ok(())
        })?;
        Self::settle(outcome)
    }

    /// Adds `name` to the script's roster if it is not already there.
    pub fn add_character(&mut self, script_id: &str, name: &str) -> Result<bool> {
        let outcome = self.scripts.try_update(script_id, |s| -> Edit {
            if s.add_speaker(name) {
                Ok(())
            } else {
                Err(Skip::Unchanged)
            }
        })?;
        Self::settle(outcome)
    }

    pub(crate) fn collection_mut(&mut self) -> &mut Collection<Script> {
        &mut self.scripts
    }

    fn settle(outcome: std::result::Result<bool, Skip>) -> Result<bool> {
        match outcome {
            Ok(changed) => Ok(changed),
            Err(Skip::Unchanged) => Ok(false),
            Err(Skip::Rejected(e)) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> ScriptStore {
        ScriptStore::load(Rc::new(Storage::in_memory().unwrap())).unwrap()
    }

    fn dialogue(character: &str, text: &str) -> BlockBody {
        BlockBody::Dialogue {
            character: character.to_string(),
            text: text.to_string(),
        }
    }

    fn heading(location: &str) -> BlockBody {
        BlockBody::SceneHeading {
            location: location.to_string(),
        }
    }

    #[test]
    fn test_block_serializes_with_type_tag() {
        let block = Block::new(dialogue("Alice", "Hi"));
        let json = serde_json::to_value(&block).unwrap();
        assert_eq!(json["type"], "dialogue");
        assert_eq!(json["character"], "Alice");
        assert_eq!(json["text"], "Hi");
        assert!(json.get("createdAt").is_some());

        let back: Block = serde_json::from_value(json).unwrap();
        assert_eq!(back, block);
    }

    #[test]
    fn test_scene_heading_json_shape() {
        let json = serde_json::json!({
            "id": "b1",
            "type": "scene_heading",
            "createdAt": "2024-05-01T12:00:00Z",
            "location": "INT. KITCHEN"
        });
        let block: Block = serde_json::from_value(json).unwrap();
        assert_eq!(block.kind(), BlockKind::SceneHeading);
        assert_eq!(block.id(), "b1");
    }

    #[test]
    fn test_add_blocks_in_order_and_collect_roster() {
        let mut store = store();
        let script = store.create_script("p1", "S1", None).unwrap();
        store.add_block(&script.id, heading("Room")).unwrap();
        store.add_block(&script.id, dialogue("Alice", "Hi")).unwrap();

        let script = store.get_script(&script.id).unwrap();
        assert_eq!(script.blocks.len(), 2);
        assert_eq!(script.blocks[0].kind(), BlockKind::SceneHeading);
        assert_eq!(script.blocks[1].kind(), BlockKind::Dialogue);
        assert_eq!(script.characters, vec!["Alice".to_string()]);
    }

    #[test]
    fn test_add_block_to_missing_script_returns_none() {
        let mut store = store();
        assert!(store.add_block("missing", heading("X")).unwrap().is_none());
    }

    #[test]
    fn test_add_character_twice_keeps_one() {
        let mut store = store();
        let script = store.create_script("p1", "S1", None).unwrap();
        assert!(store.add_character(&script.id, "Alice").unwrap());
        assert!(!store.add_character(&script.id, "Alice").unwrap());
        assert_eq!(store.get_script(&script.id).unwrap().characters, vec!["Alice"]);
    }

    #[test]
    fn test_update_block_keeps_position_and_id() {
        let mut store = store();
        let script = store.create_script("p1", "S1", None).unwrap();
        let first = store.add_block(&script.id, heading("Room")).unwrap().unwrap();
        store.add_block(&script.id, heading("Hall")).unwrap();

        assert!(store
            .update_block(&script.id, first.id(), heading("Attic"))
            .unwrap());

        let script = store.get_script(&script.id).unwrap();
        assert_eq!(script.blocks[0].id(), first.id());
        assert_eq!(script.blocks[0].created_at(), first.created_at());
        assert_eq!(script.blocks[0].body(), &heading("Attic"));
    }

    #[test]
    fn test_update_block_rejects_other_kind() {
        let mut store = store();
        let script = store.create_script("p1", "S1", None).unwrap();
        let block = store
            .add_block(&script.id, dialogue("Alice", "Hi"))
            .unwrap()
            .unwrap();
        let before = store.get_script(&script.id).unwrap().clone();

        let result = store.update_block(&script.id, block.id(), heading("Room"));
        assert!(matches!(
            result,
            Err(ScriptdeskError::BlockKindMismatch {
                expected: BlockKind::Dialogue,
                found: BlockKind::SceneHeading
            })
        ));
        assert_eq!(store.get_script(&script.id).unwrap(), &before);
    }

    #[test]
    fn test_update_dialogue_adds_new_speaker() {
        let mut store = store();
        let script = store.create_script("p1", "S1", None).unwrap();
        let block = store
            .add_block(&script.id, dialogue("Alice", "Hi"))
            .unwrap()
            .unwrap();
        store
            .update_block(&script.id, block.id(), dialogue("Bob", "Hello"))
            .unwrap();
        assert_eq!(
            store.get_script(&script.id).unwrap().characters,
            vec!["Alice", "Bob"]
        );
    }

    #[test]
    fn test_update_missing_block_is_noop() {
        let mut store = store();
        let script = store.create_script("p1", "S1", None).unwrap();
        assert!(!store.update_block(&script.id, "nope", heading("X")).unwrap());
        assert_eq!(store.get_script(&script.id).unwrap(), &script);
    }

    #[test]
    fn test_remove_block_is_idempotent() {
        let mut store = store();
        let script = store.create_script("p1", "S1", None).unwrap();
        let block = store.add_block(&script.id, heading("Room")).unwrap().unwrap();
        assert!(store.remove_block(&script.id, block.id()).unwrap());
        assert!(!store.remove_block(&script.id, block.id()).unwrap());
        assert!(store.get_script(&script.id).unwrap().blocks.is_empty());
    }

    #[test]
    fn test_remove_block_refreshes_updated_at() {
        let mut store = store();
        let script = store.create_script("p1", "S1", None).unwrap();
        let block = store.add_block(&script.id, heading("Room")).unwrap().unwrap();
        let before = store.get_script(&script.id).unwrap().updated_at;
        std::thread::sleep(std::time::Duration::from_millis(5));
        store.remove_block(&script.id, block.id()).unwrap();
        assert!(store.get_script(&script.id).unwrap().updated_at > before);
    }

    #[test]
    fn test_add_block_refreshes_updated_at() {
        let mut store = store();
        let script = store.create_script("p1", "S1", None).unwrap();
        std::thread::sleep(std::time::Duration::from_millis(5));
        store.add_block(&script.id, heading("Room")).unwrap();
        let after = store.get_script(&script.id).unwrap();
        assert!(after.updated_at > script.updated_at);
        assert_eq!(after.created_at, script.created_at);
    }

    #[test]
    fn test_folder_and_root_queries() {
        let mut store = store();
        store.create_script("p1", "In folder", Some("f1")).unwrap();
        store.create_script("p1", "At root", None).unwrap();
        store.create_script("p2", "Other project", None).unwrap();

        assert_eq!(store.scripts_by_folder("f1").len(), 1);
        assert_eq!(store.root_scripts("p1")[0].title, "At root");
        assert_eq!(store.scripts_by_project("p1").len(), 2);
    }

    #[test]
    fn test_move_script_to_root() {
        let mut store = store();
        let script = store.create_script("p1", "S", Some("f1")).unwrap();
        assert!(store.move_script(&script.id, None).unwrap());
        assert!(store.scripts_by_folder("f1").is_empty());
        assert_eq!(store.root_scripts("p1").len(), 1);
    }

    #[test]
    fn test_import_script_keeps_order_and_roster() {
        let mut store = store();
        let script = store
            .import_script(
                "p1",
                None,
                "Draft",
                vec![
                    heading("Street"),
                    dialogue("Bob", "Hey"),
                    BlockBody::Action {
                        text: "Bob waves.".to_string(),
                    },
                    dialogue("Bob", "Bye"),
                ],
                &["Narrator".to_string(), "Bob".to_string()],
            )
            .unwrap();
        assert_eq!(script.blocks.len(), 4);
        assert_eq!(script.blocks[2].kind(), BlockKind::Action);
        assert_eq!(script.characters, vec!["Bob", "Narrator"]);
        assert_eq!(store.get_script(&script.id), Some(&script));
    }

    #[test]
    fn test_delete_scripts_by_folder_and_project() {
        let mut store = store();
        store.create_script("p1", "A", Some("f1")).unwrap();
        store.create_script("p1", "B", None).unwrap();
        store.create_script("p2", "C", Some("f2")).unwrap();

        assert_eq!(store.delete_scripts_by_folder("f1").unwrap().len(), 1);
        assert_eq!(store.delete_scripts_by_project("p1").unwrap().len(), 1);
        assert_eq!(store.all().len(), 1);
        assert_eq!(store.all()[0].title, "C");
    }
}
