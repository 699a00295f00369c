//! Scripts: step mappings loaded from JSON, and their validation

use crate::engine::EngineProps;
use crate::error::ScriptError;
use crate::step::{StepMap, END};
use crate::widget::WidgetCatalog;
use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

/// A conversation script as stored on disk
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Script {
    #[serde(default)]
    pub initial_step_key: Option<String>,
    pub steps: StepMap,
}

impl Script {
    /// Parse a script and check that it can start.
    ///
    /// # Errors
    /// Fails on malformed JSON, an empty step mapping, or an initial key that
    /// names no step.
    pub fn from_json(text: &str) -> Result<Self, ScriptError> {
        let script: Script = serde_json::from_str(text)?;
        if script.steps.is_empty() {
            return Err(ScriptError::Empty);
        }
        if let Some(initial) = &script.initial_step_key {
            if initial != END && !script.steps.contains_key(initial) {
                return Err(ScriptError::UnknownInitialStep(initial.clone()));
            }
        }
        Ok(script)
    }

    /// Read and parse a script file
    ///
    /// # Errors
    /// Fails if the file cannot be read or does not parse, see [`Script::from_json`].
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ScriptError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    /// Configuration problems against the given catalog
    pub fn validate(&self, catalog: &WidgetCatalog) -> Vec<ScriptIssue> {
        validate(&self.steps, catalog)
    }

    pub fn into_props(self) -> EngineProps {
        EngineProps {
            steps: self.steps,
            initial_step_key: self.initial_step_key,
            ..EngineProps::default()
        }
    }
}

/// A configuration problem found before playing
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScriptIssue {
    #[error("step {key} uses widget type \"{kind}\" which is not registered")]
    UnknownWidget { key: String, kind: String },
    #[error("step {key} has neither a type nor an inline renderer")]
    NothingToRender { key: String },
    #[error("widget type \"{kind}\" is registered more than once, the first wins")]
    DuplicateWidget { kind: String },
}

/// Check every step against the catalog. `END` is never played and is skipped.
pub fn validate(steps: &StepMap, catalog: &WidgetCatalog) -> Vec<ScriptIssue> {
    let mut issues: Vec<ScriptIssue> = catalog
        .duplicates()
        .into_iter()
        .map(|kind| ScriptIssue::DuplicateWidget { kind })
        .collect();

    for (key, step) in steps.iter().filter(|(key, _)| key.as_str() != END) {
        if step.renderer.is_some() {
            continue;
        }
        match &step.kind {
            Some(kind) if catalog.find(kind).is_none() => {
                issues.push(ScriptIssue::UnknownWidget {
                    key: key.clone(),
                    kind: kind.clone(),
                });
            }
            Some(_) => {}
            None => issues.push(ScriptIssue::NothingToRender { key: key.clone() }),
        }
    }
    issues
}
