//! Steps, history entries and transcript messages

use crate::store::ConversationSnapshot;
use crate::widget::Widget;
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Reserved key: the conversation has terminated
pub const END: &str = "END";

/// Reserved transient key used while a restart propagates
pub const RESTARTING: &str = "";

/// Step definitions in script order. The first entry is the default start.
pub type StepMap = IndexMap<String, Step>;

/// Props computed from the conversation state at render time
pub type DeriveProps = Arc<dyn Fn(&ConversationSnapshot) -> Map<String, Value> + Send + Sync>;

/// One scripted turn of the conversation.
///
/// `type` picks a widget from the catalog; everything else in the definition
/// is free-form data handed to that widget as props.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct Step {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(flatten)]
    pub data: Map<String, Value>,
    /// Renderer carried by the step itself, independent of the catalog
    #[serde(skip)]
    pub renderer: Option<Arc<dyn Widget>>,
    /// Extra props derived from the conversation state, merged last
    #[serde(skip)]
    pub derive: Option<DeriveProps>,
}

impl Step {
    /// Step rendered by the catalog widget registered for `kind`
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: Some(kind.into()),
            ..Self::default()
        }
    }

    /// Step rendered only by its own renderer
    pub fn inline(renderer: Arc<dyn Widget>) -> Self {
        Self {
            renderer: Some(renderer),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn with_renderer(mut self, renderer: Arc<dyn Widget>) -> Self {
        self.renderer = Some(renderer);
        self
    }

    #[must_use]
    pub fn with_derive(
        mut self,
        derive: impl Fn(&ConversationSnapshot) -> Map<String, Value> + Send + Sync + 'static,
    ) -> Self {
        self.derive = Some(Arc::new(derive));
        self
    }

    /// The `delay` hint in milliseconds, if the step declares one
    pub fn delay(&self) -> Option<Duration> {
        delay_hint(&self.data)
    }
}

/// Read a `delay` field (milliseconds) from a data bag.
///
/// Numbers and numeric strings are accepted. Negative or non-numeric values
/// give `None`, so the caller's default pacing applies.
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_precision_loss,
    clippy::cast_sign_loss
)] // non-negative, checked
pub fn delay_hint(data: &Map<String, Value>) -> Option<Duration> {
    let millis = match data.get("delay")? {
        Value::Number(n) => n.as_u64().map_or_else(|| n.as_f64(), |ms| Some(ms as f64)),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    (millis.is_finite() && millis >= 0.0).then(|| Duration::from_millis(millis as u64))
}

impl fmt::Debug for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Step")
            .field("kind", &self.kind)
            .field("data", &self.data)
            .field("renderer", &self.renderer.as_ref().map(|r| r.kind().to_string()))
            .field("derive", &self.derive.is_some())
            .finish()
    }
}

impl PartialEq for Step {
    fn eq(&self, other: &Self) -> bool {
        fn same<T: ?Sized>(a: Option<&Arc<T>>, b: Option<&Arc<T>>) -> bool {
            match (a, b) {
                (Some(a), Some(b)) => Arc::ptr_eq(a, b),
                (None, None) => true,
                _ => false,
            }
        }
        self.kind == other.kind
            && self.data == other.data
            && same(self.renderer.as_ref(), other.renderer.as_ref())
            && same(self.derive.as_ref(), other.derive.as_ref())
    }
}

impl PartialEq for HistoryEntry {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key && self.step == other.step
    }
}

/// A played step together with the key it was played under
#[derive(Debug, Clone, Serialize)]
pub struct HistoryEntry {
    #[serde(flatten)]
    pub step: Step,
    pub key: String,
}

/// One renderable unit of the transcript
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Positional key, stable for the lifetime of the message
    pub key: String,
    /// Step that produced this message
    pub step_key: String,
    /// Catalog type of the widget, or `inline` for a step's own renderer
    pub widget: String,
    pub body: Value,
    pub created_at: DateTime<Utc>,
}
