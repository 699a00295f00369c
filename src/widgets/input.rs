//! Prompt that waits for the user
//!
//! Props: `text` (the prompt), `name` (internal state key for the answer),
//! `next` (step to advance to), `required` (re-wait on an empty answer).

use super::{advance, bubble, prompt};
use crate::step::Step;
use crate::widget::{Widget, WidgetProps};
use async_trait::async_trait;
use serde_json::Value;

pub struct InputWidget;

/// Submitted payload as text
fn answer_text(payload: &Value) -> String {
    match payload {
        Value::String(s) => s.trim().to_string(),
        Value::Object(fields) => fields
            .get("value")
            .and_then(Value::as_str)
            .map(|s| s.trim().to_string())
            .unwrap_or_else(|| payload.to_string()),
        other => other.to_string(),
    }
}

#[async_trait]
impl Widget for InputWidget {
    fn kind(&self) -> &'static str {
        "input"
    }

    fn render(&self, props: &WidgetProps) -> Value {
        bubble("bot", &prompt(props))
    }

    async fn activate(&self, props: WidgetProps) {
        let chat = &props.chat;
        let answer = loop {
            let payload = match chat.wait_for_user_response().await {
                Ok(payload) => payload,
                Err(e) => {
                    tracing::debug!(key = %props.step_key, error = %e, "Input abandoned");
                    return;
                }
            };
            let answer = answer_text(&payload);
            if answer.is_empty() && props.flag("required") {
                tracing::debug!(key = %props.step_key, "Empty answer to required input");
                continue;
            }
            break answer;
        };

        if let Some(name) = props.str("name") {
            chat.update_internal_state(|state| {
                let mut state = state.clone();
                state.insert(name.to_string(), Value::String(answer.clone()));
                state
            });
        }
        chat.send_message(&Step::new("user").with("text", answer)).await;
        advance(&props);
    }
}
