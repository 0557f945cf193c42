//! Change events that drive build triggers.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Kind of change observed in the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeType {
    Add,
    Change,
    Delete,
    /// Requested through the trigger endpoint or CLI
    Manual,
}

impl ChangeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Add => "add",
            Self::Change => "change",
            Self::Delete => "delete",
            Self::Manual => "manual",
        }
    }
}

impl fmt::Display for ChangeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single change to dispatch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeEvent {
    pub change_type: ChangeType,
    pub file_name: String,
}

impl ChangeEvent {
    pub fn new(change_type: ChangeType, file_name: impl Into<String>) -> Self {
        Self {
            change_type,
            file_name: file_name.into(),
        }
    }

    /// The event used for manually requested builds.
    pub fn manual() -> Self {
        Self::new(ChangeType::Manual, "manual trigger")
    }

    /// Whether the event concerns a markdown file.
    pub fn is_markdown(&self) -> bool {
        self.change_type != ChangeType::Manual && self.file_name.ends_with(".md")
    }

    /// Commit message used for auto-commits.
    pub fn commit_message(&self) -> String {
        format!("Auto-update: {} {}", self.change_type, self.file_name)
    }
}
