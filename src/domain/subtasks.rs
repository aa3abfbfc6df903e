use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::error::{FieldError, JoinError};

/// Stable identifier for a subtask within its task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubtaskId(Uuid);

impl SubtaskId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SubtaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SubtaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A checklist entry on a task card
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subtask {
    /// Records written before subtasks had ids get a fresh one on load
    #[serde(default)]
    pub id: SubtaskId,
    pub text: String,
    #[serde(default)]
    pub done: bool,
}

impl Subtask {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            id: SubtaskId::new(),
            text: text.into(),
            done: false,
        }
    }

    pub fn toggle(&mut self) {
        self.done = !self.done;
    }
}

/// Ordered subtask entries while a task is being composed or edited
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubtaskList {
    entries: Vec<Subtask>,
}

impl SubtaskList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_vec(entries: Vec<Subtask>) -> Self {
        Self { entries }
    }

    /// Appends a new, unfinished entry and returns its id
    pub fn push(&mut self, text: impl Into<String>) -> Result<SubtaskId, JoinError> {
        let text = text.into();
        let text = text.trim();
        if text.is_empty() {
            return Err(JoinError::Validation(vec![FieldError::new(
                "subtasks",
                "Subtask text must not be empty",
            )]));
        }
        let subtask = Subtask::new(text);
        let id = subtask.id;
        self.entries.push(subtask);
        Ok(id)
    }

    /// Replaces the text of an entry in place, keeping its position and `done` flag
    pub fn edit(&mut self, id: SubtaskId, text: impl Into<String>) -> Result<(), JoinError> {
        let text = text.into();
        if text.trim().is_empty() {
            // Clearing the text in the inline editor removes the entry.
            return self.remove(id).map(|_| ());
        }
        let entry = self.find_mut(id)?;
        entry.text = text.trim().to_string();
        Ok(())
    }

    pub fn remove(&mut self, id: SubtaskId) -> Result<Subtask, JoinError> {
        let pos = self
            .entries
            .iter()
            .position(|s| s.id == id)
            .ok_or_else(|| not_found(id))?;
        Ok(self.entries.remove(pos))
    }

    /// Removes the first entry whose text equals `text`.
    ///
    /// Ambiguous when several entries share the same text; prefer [`Self::remove`].
    pub fn remove_by_text(&mut self, text: &str) -> Option<Subtask> {
        let pos = self.entries.iter().position(|s| s.text == text)?;
        Some(self.entries.remove(pos))
    }

    pub fn toggle(&mut self, id: SubtaskId) -> Result<bool, JoinError> {
        let entry = self.find_mut(id)?;
        entry.toggle();
        Ok(entry.done)
    }

    pub fn get(&self, id: SubtaskId) -> Option<&Subtask> {
        self.entries.iter().find(|s| s.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Subtask> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn into_vec(self) -> Vec<Subtask> {
        self.entries
    }

    fn find_mut(&mut self, id: SubtaskId) -> Result<&mut Subtask, JoinError> {
        self.entries
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or_else(|| not_found(id))
    }
}

fn not_found(id: SubtaskId) -> JoinError {
    JoinError::Validation(vec![FieldError::new(
        "subtasks",
        format!("Subtask {} not found", id),
    )])
}
