//! Response shaping: the success body returned to the front end.

use serde::Serialize;
use serde_json::Value;

use crate::chart::{self, ChartDescription, ChartError, ModelReply};

/// Success body for a chat request.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatReply {
    /// Narrative text: `txtResponse` when present, else the raw model output.
    pub content: String,
    pub has_tool_use: bool,
    /// The chart description as the model produced it.
    pub tool_use: Option<Value>,
    /// The normalized chart.
    pub chart_data: Option<ChartDescription>,
}

impl From<ModelReply> for ChatReply {
    fn from(reply: ModelReply) -> Self {
        let content = reply.narrative();
        match reply {
            ModelReply::Unparsed { .. } | ModelReply::Text { .. } => Self {
                content,
                has_tool_use: false,
                tool_use: None,
                chart_data: None,
            },
            ModelReply::Chart { parsed, chart, .. } => Self {
                content,
                has_tool_use: true,
                tool_use: Some(parsed),
                chart_data: Some(chart),
            },
        }
    }
}

impl ChatReply {
    /// Run the chart pipeline over raw model output.
    pub fn from_model_output(raw: &str) -> Result<Self, ChartError> {
        chart::interpret(raw).map(Self::from)
    }
}
