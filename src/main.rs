//! stepchat - play a conversation script in the terminal
//!
//! The transcript goes to stdout, logs go to stderr as JSON.

use serde_json::Value;
use std::sync::Arc;
use stepchat::surface::terminal::TerminalSurface;
use stepchat::{EngineConfig, Script, WidgetRegistry};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::Notify;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const BUILTIN_SCRIPT: &str = include_str!("../scripts/onboarding.json");

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "stepchat=info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false)
                .with_writer(std::io::stderr),
        )
        .init();

    // Configuration
    let script = match std::env::var("STEPCHAT_SCRIPT") {
        Ok(path) => {
            tracing::info!(path = %path, "Loading script");
            Script::load(&path)?
        }
        Err(_) => Script::from_json(BUILTIN_SCRIPT)?,
    };
    let config = EngineConfig::from_env();
    tracing::debug!(?config, "Engine configuration");

    let ended = Arc::new(Notify::new());
    let on_end = Arc::clone(&ended);
    let props = script
        .into_props()
        .with_config(config)
        .on_end(move |_| on_end.notify_one());

    let engine = WidgetRegistry::builtin().start(props, None);
    engine.attach_surface(Arc::new(TerminalSurface::new()));

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            () = ended.notified() => break,
            line = lines.next_line() => {
                let Some(line) = line? else {
                    break;
                };
                let line = line.trim();
                if line == "/restart" {
                    engine.restart();
                } else if engine.input_is_active() {
                    engine.handle_form_submit(Value::String(line.to_string()));
                } else {
                    tracing::debug!("Input ignored, no step is waiting");
                }
            }
        }
    }

    let snapshot = engine.snapshot();
    let state = Value::Object(snapshot.internal_state);
    tracing::info!(
        messages = snapshot.messages.len(),
        internal_state = %state,
        "Conversation finished"
    );
    Ok(())
}
