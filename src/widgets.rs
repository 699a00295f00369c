//! Built-in widgets
//!
//! Each renders a chat bubble `{ "role", "text" }`. `text` and `input`
//! advance the conversation to the step named by their `next` prop.

mod input;
mod text;
mod user;

pub use input::InputWidget;
pub use text::TextWidget;
pub use user::UserWidget;

use crate::widget::{Widget, WidgetProps};
use serde_json::{json, Map, Value};
use std::sync::Arc;

/// Catalog of the built-in widgets
pub fn builtin() -> Vec<Arc<dyn Widget>> {
    vec![
        Arc::new(TextWidget),
        Arc::new(InputWidget),
        Arc::new(UserWidget),
    ]
}

/// Message body for one bubble
pub fn bubble(role: &str, text: &str) -> Value {
    json!({ "role": role, "text": text })
}

/// Fill `{{name}}` placeholders from `values`.
///
/// Strings are inserted as is, other values as JSON. Unknown names become
/// empty; an unterminated `{{` is kept verbatim.
pub fn interpolate(template: &str, values: &Map<String, Value>) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some((before, after)) = rest.split_once("{{") {
        out.push_str(before);
        let Some((name, tail)) = after.split_once("}}") else {
            out.push_str("{{");
            out.push_str(after);
            return out;
        };
        match values.get(name.trim()) {
            Some(Value::String(s)) => out.push_str(s),
            Some(Value::Null) | None => {}
            Some(other) => out.push_str(&other.to_string()),
        }
        rest = tail;
    }
    out.push_str(rest);
    out
}

/// The `text` prop with placeholders filled from the internal state
fn prompt(props: &WidgetProps) -> String {
    let template = props.str("text").unwrap_or_default();
    match props.get("internalState") {
        Some(Value::Object(state)) => interpolate(template, state),
        _ => template.to_string(),
    }
}

/// Move to the `next` prop, if the step names one
fn advance(props: &WidgetProps) {
    if let Some(next) = props.str("next") {
        tracing::debug!(from = %props.step_key, to = %next, "Advancing");
        props.chat.set_active_key(next);
    }
}
