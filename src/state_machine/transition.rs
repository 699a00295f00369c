//! Pure state transition function
//!
//! The player is declarative over the *current* key: it never decides what
//! comes next. Widgets move the conversation by setting the active key, and
//! this function only reacts to that.

use super::{Effect, EngineState, Event};
use crate::step::{StepMap, END, RESTARTING};
use thiserror::Error;

/// Result of a state transition
#[derive(Debug)]
pub struct TransitionResult {
    pub new_state: EngineState,
    pub effects: Vec<Effect>,
}

impl TransitionResult {
    pub fn new(state: EngineState) -> Self {
        Self {
            new_state: state,
            effects: vec![],
        }
    }

    #[must_use]
    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }
}

/// Events the current state cannot accept
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("No step is active to wait for \"{event}\"")]
    NoActiveStep { event: String },
    #[error("Nothing is waiting for \"{event}\"")]
    NotAwaiting { event: String },
}

/// Pure transition function
///
/// Given the same state, step mapping and event it always produces the same
/// result, and it performs no I/O.
pub fn transition(
    state: &EngineState,
    steps: &StepMap,
    event: Event,
) -> Result<TransitionResult, TransitionError> {
    match (state, event) {
        // ============================================================
        // Active key changes
        // ============================================================
        (_, Event::KeyChanged { key }) if key == END => {
            Ok(TransitionResult::new(EngineState::Ended).with_effect(Effect::NotifyEnd))
        }

        (_, Event::KeyChanged { key }) if key == RESTARTING => {
            Ok(TransitionResult::new(EngineState::Idle))
        }

        (_, Event::KeyChanged { key }) if steps.contains_key(&key) => {
            Ok(TransitionResult::new(EngineState::ActiveStep { key: key.clone() })
                .with_effect(Effect::play(key)))
        }

        (_, Event::KeyChanged { key }) => Ok(TransitionResult::new(EngineState::Stalled {
            key: key.clone(),
        })
        .with_effect(Effect::unknown_step(key))),

        // ============================================================
        // Waiting for input
        // ============================================================

        // A new wait replaces an older one: there is a single input flag
        (
            EngineState::ActiveStep { key } | EngineState::AwaitingInput { key, .. },
            Event::InputRequested { event },
        ) => Ok(TransitionResult::new(EngineState::AwaitingInput {
            key: key.clone(),
            event,
        })),

        (_, Event::InputRequested { event }) => Err(TransitionError::NoActiveStep { event }),

        (EngineState::AwaitingInput { key, event }, Event::InputReceived { event: received })
            if *event == received =>
        {
            Ok(TransitionResult::new(EngineState::ActiveStep { key: key.clone() }))
        }

        (_, Event::InputReceived { event }) => Err(TransitionError::NotAwaiting { event }),
    }
}
