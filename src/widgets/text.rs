//! Bot bubble that moves on by itself

use super::{advance, bubble, prompt};
use crate::widget::{Widget, WidgetProps};
use async_trait::async_trait;
use serde_json::Value;

pub struct TextWidget;

#[async_trait]
impl Widget for TextWidget {
    fn kind(&self) -> &'static str {
        "text"
    }

    fn render(&self, props: &WidgetProps) -> Value {
        bubble("bot", &prompt(props))
    }

    /// Wait out the step's pacing, then advance to `next`
    async fn activate(&self, props: WidgetProps) {
        if props.str("next").is_none() {
            return;
        }
        let pacing = props.chat.config().pacing(props.delay());
        tokio::time::sleep(pacing).await;
        advance(&props);
    }
}
