//! Mock implementations for testing
//!
//! These mocks let engine tests observe renders and paints without a real
//! rendering layer.

use crate::engine::ChatEngine;
use crate::step::{Step, StepMap};
use crate::store::ConversationSnapshot;
use crate::surface::RenderingSurface;
use crate::widget::{Widget, WidgetProps};
use async_trait::async_trait;
use serde_json::{json, Map, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier, Mutex};
use std::time::Duration;

/// Generous upper bound for conditions in paused-time tests
pub const TIMEOUT: Duration = Duration::from_secs(30);

/// Build a step mapping in the given order
pub fn steps(entries: Vec<(&str, Step)>) -> StepMap {
    entries
        .into_iter()
        .map(|(key, step)| (key.to_string(), step))
        .collect()
}

/// Poll the engine until `predicate` holds or `timeout` elapses
pub async fn wait_for(
    engine: &ChatEngine,
    timeout: Duration,
    predicate: impl Fn(&ConversationSnapshot) -> bool,
) -> bool {
    tokio::time::timeout(timeout, async {
        loop {
            if predicate(&engine.snapshot()) {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .is_ok()
}

// ============================================================================
// Recording Widget
// ============================================================================

/// Widget that records the props of every render and can advance the
/// conversation once activated
pub struct RecordingWidget {
    kind: String,
    advance_to: Option<String>,
    after: Duration,
    renders: Mutex<Vec<Map<String, Value>>>,
}

impl RecordingWidget {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            advance_to: None,
            after: Duration::ZERO,
            renders: Mutex::new(Vec::new()),
        }
    }

    /// Set the active key to `key` when activated
    #[must_use]
    pub fn advancing_to(mut self, key: impl Into<String>) -> Self {
        self.advance_to = Some(key.into());
        self
    }

    /// Wait this long before advancing
    #[must_use]
    pub fn after(mut self, delay: Duration) -> Self {
        self.after = delay;
        self
    }

    /// Props of every render so far
    pub fn renders(&self) -> Vec<Map<String, Value>> {
        self.renders.lock().unwrap().clone()
    }
}

#[async_trait]
impl Widget for RecordingWidget {
    fn kind(&self) -> &str {
        &self.kind
    }

    fn render(&self, props: &WidgetProps) -> Value {
        self.renders.lock().unwrap().push(props.values.clone());
        json!({ "widget": self.kind, "text": props.str("text") })
    }

    async fn activate(&self, props: WidgetProps) {
        if let Some(next) = &self.advance_to {
            if !self.after.is_zero() {
                tokio::time::sleep(self.after).await;
            }
            props.chat.set_active_key(next.clone());
        }
    }
}

// ============================================================================
// Gate Widget
// ============================================================================

/// Widget whose render blocks on a two-party barrier twice: once to signal
/// that rendering has started, once to wait until it is let go.
pub struct GateWidget {
    kind: String,
    gate: Arc<Barrier>,
}

impl GateWidget {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            gate: Arc::new(Barrier::new(2)),
        }
    }

    /// Meet the render at the barrier, off the async threads
    pub async fn meet(&self) {
        let gate = Arc::clone(&self.gate);
        tokio::task::spawn_blocking(move || {
            gate.wait();
        })
        .await
        .unwrap();
    }
}

#[async_trait]
impl Widget for GateWidget {
    fn kind(&self) -> &str {
        &self.kind
    }

    fn render(&self, _props: &WidgetProps) -> Value {
        self.gate.wait();
        self.gate.wait();
        json!({ "widget": self.kind })
    }

    async fn activate(&self, _props: WidgetProps) {}
}

// ============================================================================
// Recording Surface
// ============================================================================

/// Surface that remembers the last painted transcript length and counts scrolls
#[derive(Default)]
pub struct RecordingSurface {
    painted: Mutex<Option<usize>>,
    scrolls: AtomicUsize,
}

impl RecordingSurface {
    pub fn painted_len(&self) -> Option<usize> {
        *self.painted.lock().unwrap()
    }

    pub fn scrolls(&self) -> usize {
        self.scrolls.load(Ordering::SeqCst)
    }
}

impl RenderingSurface for RecordingSurface {
    fn paint(&self, snapshot: &ConversationSnapshot) {
        *self.painted.lock().unwrap() = Some(snapshot.messages.len());
    }

    fn scroll_to_bottom(&self) {
        self.scrolls.fetch_add(1, Ordering::SeqCst);
    }
}
