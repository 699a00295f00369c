//! stepchat - scripted chatbot step player
//!
//! A conversation is a mapping of named steps. The engine plays the active
//! step by resolving it to a widget and appending the rendered message to the
//! transcript; widgets advance the conversation themselves, often after
//! waiting for the user through a one-shot event bus.

pub mod bus;
pub mod config;
pub mod engine;
pub mod error;
pub mod registry;
pub mod script;
pub mod state_machine;
pub mod step;
pub mod store;
pub mod surface;
pub mod widget;
pub mod widgets;

#[cfg(test)]
mod testing;

pub use bus::{EventBus, PendingEvent, FORM_SUBMISSION};
pub use config::EngineConfig;
pub use engine::{ChatEngine, EngineProps};
pub use error::{EngineError, ScriptError};
pub use registry::{with_all_widgets, WidgetRegistry};
pub use script::{Script, ScriptIssue};
pub use step::{HistoryEntry, Message, Step, StepMap, END};
pub use store::{ConversationSnapshot, ConversationStore, InternalState};
pub use surface::RenderingSurface;
pub use widget::{Widget, WidgetCatalog, WidgetProps};
