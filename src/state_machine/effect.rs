//! Effects produced by state transitions

use crate::error::EngineError;

/// Effects to be executed after a state transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Resolve the step's widgets and append to the ledgers
    PlayStep { key: String },

    /// Hand the final snapshot to the `on_end` callback
    NotifyEnd,

    /// Log a recoverable error and keep it as the engine's last error
    ReportError(EngineError),
}

impl Effect {
    pub fn play(key: impl Into<String>) -> Self {
        Effect::PlayStep { key: key.into() }
    }

    pub fn unknown_step(key: impl Into<String>) -> Self {
        Effect::ReportError(EngineError::UnknownStep { key: key.into() })
    }
}
