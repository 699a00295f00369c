use super::bubble;
use crate::widget::{Widget, WidgetProps};
use async_trait::async_trait;
use serde_json::Value;

/// Echo of what the user typed
pub struct UserWidget;

#[async_trait]
impl Widget for UserWidget {
    fn kind(&self) -> &'static str {
        "user"
    }

    fn render(&self, props: &WidgetProps) -> Value {
        bubble("user", props.str("text").unwrap_or_default())
    }
}
