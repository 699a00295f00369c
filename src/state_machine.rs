//! Step transition state machine
//!
//! Pure transitions in the Elm style: the engine feeds an event in, stores
//! the returned state and then runs the returned effects.

mod effect;
pub mod event;
pub mod state;
pub(crate) mod transition;

#[cfg(test)]
mod proptests;

pub use effect::Effect;
pub use event::Event;
pub use state::EngineState;
pub use transition::{transition, TransitionError, TransitionResult};
