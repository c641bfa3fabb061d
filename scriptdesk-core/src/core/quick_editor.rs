//! Scratch drafting of a script before it is filed into a project.
//!
//! A [`QuickEditor`] holds its title, blocks and speaker roster in memory only.
//! Filing it is done by [`Workspace::file_draft`](crate::Workspace::file_draft),
//! which copies the blocks into a new script and clears the draft.

use crate::core::script::{Block, BlockBody};
use crate::Result;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct QuickEditor {
    title: String,
    blocks: Vec<Block>,
    characters: Vec<String>,
}

impl QuickEditor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = title.into();
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn characters(&self) -> &[String] {
        &self.characters
    }

    /// Appends a block; dialogue registers its speaker.
    pub fn add_block(&mut self, body: BlockBody) -> Block {
        if let Some(speaker) = body.speaker() {
            let speaker = speaker.to_string();
            self.add_character(&speaker);
        }
        let block = Block::new(body);
        self.blocks.push(block.clone());
        block
    }

    /// Replaces a block's body in place. Returns `Ok(false)` if no block has
    /// `block_id`.
    ///
    /// # Errors
    ///
    /// Returns [`ScriptdeskError::BlockKindMismatch`](crate::ScriptdeskError::BlockKindMismatch)
    /// when `body` is a different kind from the existing block.
    pub fn update_block(&mut self, block_id: &str, body: BlockBody) -> Result<bool> {
        let speaker = body.speaker().map(str::to_string);
        let Some(block) = self.blocks.iter_mut().find(|b| b.id() == block_id) else {
            return Ok(false);
        };
        block.replace_body(body)?;
        if let Some(name) = speaker {
            self.add_character(&name);
        }
        Ok(true)
    }

    pub fn remove_block(&mut self, block_id: &str) -> bool {
        let before = self.blocks.len();
        self.blocks.retain(|b| b.id() != block_id);
        self.blocks.len() != before
    }

    /// Adds a speaker name to the draft roster unless it is already there.
    pub fn add_character(&mut self, name: &str) -> bool {
        if self.characters.iter().any(|c| c == name) {
            return false;
        }
        self.characters.push(name.to_string());
        true
    }

    /// A draft with a non-blank title or any block would be lost on discard.
    pub fn has_unsaved_work(&self) -> bool {
        !self.title.trim().is_empty() || !self.blocks.is_empty()
    }

    pub fn clear(&mut self) {
        self.title.clear();
        self.blocks.clear();
        self.characters.clear();
    }

    pub(crate) fn bodies(&self) -> Vec<BlockBody> {
        self.blocks.iter().map(|b| b.body().clone()).collect()
    }
}
