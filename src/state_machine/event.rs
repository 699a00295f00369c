//! Events that drive the step player

/// Events that trigger state transitions
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// The active key cell took a new value
    KeyChanged { key: String },

    /// A widget started waiting on the bus
    InputRequested { event: String },

    /// Something was published for a waiting widget
    InputReceived { event: String },
}

impl Event {
    pub fn key_changed(key: impl Into<String>) -> Self {
        Event::KeyChanged { key: key.into() }
    }
}
