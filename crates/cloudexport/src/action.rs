//! Reconciliation actions

use serde::{Deserialize, Serialize};

/// What a reconciliation does to a managed export
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    /// Create a new export
    Create,
    /// Submit changed configuration for an existing export
    Update,
    /// Delete the export
    Delete,
    /// No changes needed
    NoOp,
}

impl ActionType {
    /// Whether the action writes to the remote service
    pub fn is_change(&self) -> bool {
        !matches!(self, ActionType::NoOp)
    }
}

impl std::fmt::Display for ActionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ActionType::Create => write!(f, "create"),
            ActionType::Update => write!(f, "update"),
            ActionType::Delete => write!(f, "delete"),
            ActionType::NoOp => write!(f, "no-op"),
        }
    }
}
