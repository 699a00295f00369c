//! Widgets: the renderers steps select by type
//!
//! A widget turns resolved props into a message body, and may then run
//! behaviour of its own (wait for input, advance the conversation). The
//! player never decides the next step; widgets do.

mod resolve;

pub use resolve::{resolve, Resolution, ResolvedWidget, INLINE};

use crate::engine::ChatEngine;
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Trait for rendering units registered in a catalog or carried by a step
#[async_trait]
pub trait Widget: Send + Sync {
    /// Type string steps use to select this widget
    fn kind(&self) -> &str;

    /// Produce the message body for one play
    fn render(&self, props: &WidgetProps) -> Value;

    /// Runs once the rendered message is in the transcript.
    ///
    /// Cancelled when the conversation restarts.
    async fn activate(&self, _props: WidgetProps) {}
}

/// Everything a widget sees: the engine handle plus merged props
#[derive(Clone)]
pub struct WidgetProps {
    /// Handle to the conversation; widgets advance it through this
    pub chat: ChatEngine,
    /// Key of the step being played
    pub step_key: String,
    /// Conversation values, overlaid with step data, overlaid with derived props
    pub values: Map<String, Value>,
}

impl WidgetProps {
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn str(&self, name: &str) -> Option<&str> {
        self.values.get(name).and_then(Value::as_str)
    }

    pub fn flag(&self, name: &str) -> bool {
        self.values.get(name).and_then(Value::as_bool).unwrap_or(false)
    }

    /// Declared `delay` hint, if any
    pub fn delay(&self) -> Option<Duration> {
        crate::step::delay_hint(&self.values)
    }
}

impl fmt::Debug for WidgetProps {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WidgetProps")
            .field("step_key", &self.step_key)
            .field("values", &self.values)
            .finish_non_exhaustive()
    }
}

/// Widgets available to one engine, searched in order
#[derive(Clone, Default)]
pub struct WidgetCatalog {
    widgets: Vec<Arc<dyn Widget>>,
}

impl WidgetCatalog {
    pub fn new(widgets: Vec<Arc<dyn Widget>>) -> Self {
        Self { widgets }
    }

    /// First widget registered for `kind`
    pub fn find(&self, kind: &str) -> Option<&Arc<dyn Widget>> {
        self.widgets.iter().find(|w| w.kind() == kind)
    }

    pub fn kinds(&self) -> impl Iterator<Item = &str> {
        self.widgets.iter().map(|w| w.kind())
    }

    /// Types registered more than once; only the first registration is reachable
    pub fn duplicates(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut duplicates = Vec::new();
        for kind in self.kinds() {
            if !seen.insert(kind) && !duplicates.iter().any(|d| d == kind) {
                duplicates.push(kind.to_string());
            }
        }
        duplicates
    }

    pub fn len(&self) -> usize {
        self.widgets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.widgets.is_empty()
    }
}

impl fmt::Debug for WidgetCatalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.kinds()).finish()
    }
}
