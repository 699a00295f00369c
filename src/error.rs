//! Error types for the step player

use thiserror::Error;

/// Errors raised while playing a conversation.
///
/// None of these reach the rendering surface: the engine logs them, keeps the
/// most recent one for inspection and keeps running.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error("Step not found in script: {key}")]
    UnknownStep { key: String },
    #[error("Widget with type \"{kind}\" not found (step {key})")]
    WidgetNotFound { kind: String, key: String },
    #[error("Step {key} has neither a type nor an inline renderer")]
    NothingToRender { key: String },
    #[error("Wait for event \"{event}\" was cancelled by a restart")]
    WaitCancelled { event: String },
}

/// Errors raised while loading a script
#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("Failed to read script: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid script JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Script has no steps")]
    Empty,
    #[error("Initial step {0} is not defined in the script")]
    UnknownInitialStep(String),
}
