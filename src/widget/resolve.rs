//! Widget resolution: step descriptor in, renderers plus props out

use super::{Widget, WidgetCatalog};
use crate::error::EngineError;
use crate::step::Step;
use crate::store::ConversationSnapshot;
use serde_json::{Map, Value};
use std::sync::Arc;

/// Label recorded on messages produced by a step's own renderer
pub const INLINE: &str = "inline";

/// A renderer chosen for a step, with the props it will receive
pub struct ResolvedWidget {
    pub widget: Arc<dyn Widget>,
    /// Catalog type, or [`INLINE`]
    pub label: String,
    pub props: Map<String, Value>,
}

/// Outcome of resolving one step
#[derive(Default)]
pub struct Resolution {
    /// Renderers in message order: catalog widget first, then inline
    pub widgets: Vec<ResolvedWidget>,
    /// Configuration problem to report; the step is still recorded
    pub error: Option<EngineError>,
}

/// Pick the renderers for `step`.
///
/// The catalog widget matching the step's type gets the conversation values
/// overlaid with the step data and then with the derived props. A step's
/// inline renderer is used as well, with conversation values only, so one
/// step may produce two messages.
pub fn resolve(
    key: &str,
    step: &Step,
    catalog: &WidgetCatalog,
    snapshot: &ConversationSnapshot,
) -> Resolution {
    let mut resolution = Resolution::default();

    match &step.kind {
        Some(kind) => match catalog.find(kind) {
            Some(widget) => resolution.widgets.push(ResolvedWidget {
                widget: Arc::clone(widget),
                label: kind.clone(),
                props: catalog_props(step, snapshot),
            }),
            None if step.renderer.is_none() => {
                resolution.error = Some(EngineError::WidgetNotFound {
                    kind: kind.clone(),
                    key: key.to_string(),
                });
            }
            None => {
                tracing::debug!(key, widget = %kind, "No catalog widget, using inline renderer only");
            }
        },
        None if step.renderer.is_none() => {
            resolution.error = Some(EngineError::NothingToRender {
                key: key.to_string(),
            });
        }
        None => {}
    }

    if let Some(renderer) = &step.renderer {
        resolution.widgets.push(ResolvedWidget {
            widget: Arc::clone(renderer),
            label: INLINE.to_string(),
            props: snapshot.base_props(),
        });
    }

    resolution
}

/// Shallow merge, last wins: conversation values, step data, derived props
fn catalog_props(step: &Step, snapshot: &ConversationSnapshot) -> Map<String, Value> {
    let mut props = snapshot.base_props();
    if let Some(kind) = &step.kind {
        props.insert("type".into(), Value::String(kind.clone()));
    }
    props.extend(step.data.clone());
    if let Some(derive) = &step.derive {
        props.extend(derive(snapshot));
    }
    props
}
