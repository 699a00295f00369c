//! Rendering surface contract
//!
//! The engine never paints anything itself. A surface reads the transcript
//! from the snapshot, shows an input affordance while `input_is_active` is
//! set, and reports submissions back through
//! [`ChatEngine::handle_form_submit`](crate::engine::ChatEngine::handle_form_submit).

pub mod terminal;

use crate::store::ConversationSnapshot;

/// Something that can show a conversation
pub trait RenderingSurface: Send + Sync {
    /// Redraw from the given state
    fn paint(&self, snapshot: &ConversationSnapshot);

    /// Bring the newest message into view
    fn scroll_to_bottom(&self);
}
