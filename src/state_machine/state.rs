//! Step player state

use serde::{Deserialize, Serialize};

/// Where the conversation is
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EngineState {
    /// Nothing played yet, or a restart is propagating
    #[default]
    Idle,

    /// A step has been played and its widgets are live
    ActiveStep { key: String },

    /// A widget of the active step is suspended on a bus event
    AwaitingInput { key: String, event: String },

    /// The active key names no step; nothing will play until it changes
    Stalled { key: String },

    /// The conversation reached `END`
    Ended,
}

impl EngineState {
    /// Check if the conversation is over
    pub fn is_terminal(&self) -> bool {
        matches!(self, EngineState::Ended)
    }

    pub fn is_awaiting_input(&self) -> bool {
        matches!(self, EngineState::AwaitingInput { .. })
    }

    /// Key of the step currently on stage, if any
    pub fn step_key(&self) -> Option<&str> {
        match self {
            EngineState::ActiveStep { key } | EngineState::AwaitingInput { key, .. } => Some(key),
            EngineState::Idle | EngineState::Stalled { .. } | EngineState::Ended => None,
        }
    }
}
