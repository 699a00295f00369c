//! Widget registry: a fixed catalog bound to engine construction

use crate::engine::{ChatEngine, EngineProps};
use crate::widget::Widget;
use crate::widgets;
use std::sync::Arc;

/// Catalog of widgets shared by every engine it starts
#[derive(Clone, Default)]
pub struct WidgetRegistry {
    widgets: Vec<Arc<dyn Widget>>,
}

impl WidgetRegistry {
    pub fn new(widgets: Vec<Arc<dyn Widget>>) -> Self {
        Self { widgets }
    }

    /// Registry holding the built-in `text`, `input` and `user` widgets
    pub fn builtin() -> Self {
        Self::new(widgets::builtin())
    }

    #[must_use]
    pub fn register(mut self, widget: Arc<dyn Widget>) -> Self {
        self.widgets.push(widget);
        self
    }

    /// Catalog entries whose type is in `accessible`.
    ///
    /// `None` or an empty list keeps the whole catalog.
    pub fn select(&self, accessible: Option<&[&str]>) -> Vec<Arc<dyn Widget>> {
        match accessible {
            Some(types) if !types.is_empty() => self
                .widgets
                .iter()
                .filter(|w| types.contains(&w.kind()))
                .cloned()
                .collect(),
            _ => self.widgets.clone(),
        }
    }

    /// Start an engine with the selected catalog followed by `props.widgets`.
    ///
    /// Catalog entries come first, so they win over a caller widget of the
    /// same type.
    pub fn start(&self, props: EngineProps, accessible: Option<&[&str]>) -> ChatEngine {
        let mut widgets = self.select(accessible);
        tracing::debug!(
            catalog = widgets.len(),
            extra = props.widgets.len(),
            "Binding widget catalog"
        );
        widgets.extend(props.widgets);
        ChatEngine::start(EngineProps { widgets, ..props })
    }
}

/// Pre-bound engine constructor over `all`
pub fn with_all_widgets(
    all: Vec<Arc<dyn Widget>>,
) -> impl Fn(EngineProps, Option<&[&str]>) -> ChatEngine {
    let registry = WidgetRegistry::new(all);
    move |props: EngineProps, accessible: Option<&[&str]>| registry.start(props, accessible)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::step::Step;
    use crate::testing::{steps, wait_for, RecordingWidget, TIMEOUT};

    fn registry() -> WidgetRegistry {
        WidgetRegistry::new(vec![
            Arc::new(RecordingWidget::new("text")),
            Arc::new(RecordingWidget::new("input")),
            Arc::new(RecordingWidget::new("user")),
        ])
    }

    fn kinds(widgets: &[Arc<dyn Widget>]) -> Vec<&str> {
        widgets.iter().map(|w| w.kind()).collect()
    }

    #[test]
    fn test_select_filters_by_type() {
        let registry = registry();
        assert_eq!(
            kinds(&registry.select(Some(&["user", "text"]))),
            vec!["text", "user"]
        );
    }

    #[test]
    fn test_empty_or_missing_filter_keeps_catalog() {
        let registry = registry();
        assert_eq!(registry.select(None).len(), 3);
        assert_eq!(registry.select(Some(&[])).len(), 3);
    }

    #[test]
    fn test_builtin_catalog() {
        let registry = WidgetRegistry::builtin();
        assert_eq!(kinds(&registry.select(None)), vec!["text", "input", "user"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_catalog_precedes_caller_widgets() {
        let extra = Arc::new(RecordingWidget::new("text"));
        let start_chat = with_all_widgets(vec![Arc::new(RecordingWidget::new("text"))]);
        let engine = start_chat(
            EngineProps::new(steps(vec![("greet", Step::new("text"))]))
                .with_widget(extra.clone()),
            None,
        );

        assert!(wait_for(&engine, TIMEOUT, |s| s.messages.len() == 1).await);
        assert!(extra.renders().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_filtered_out_type_is_missing() {
        let engine = registry().start(
            EngineProps::new(steps(vec![("greet", Step::new("input"))])),
            Some(&["text"]),
        );

        assert!(wait_for(&engine, TIMEOUT, |s| s.history.len() == 1).await);
        assert!(engine.snapshot().messages.is_empty());
        assert!(engine.last_error().is_some());
    }
}
