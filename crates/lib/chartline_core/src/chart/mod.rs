//! Chart descriptions produced by the model, and their normalization.
//!
//! # Public API
//!
//! - [`interpret`]: parse a raw model reply into a [`ModelReply`]
//! - [`normalize::normalize_chart`]: pie remapping and series colors
//! - [`canonical`]: provider drift adapters (code fences, snake_case keys)

pub mod canonical;
pub mod normalize;

use indexmap::IndexMap;
use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::warn;

/// Chart types the system prompt offers.
pub const CHART_TYPES: [&str; 6] = ["bar", "multiBar", "line", "pie", "area", "stackedArea"];

/// Keys whose presence marks a reply as carrying a chart.
const CHART_KEYS: [&str; 3] = ["chartType", "data", "chartConfig"];

/// Chart JSON that parsed but does not describe a usable chart.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ChartError {
    #[error("chartType is required")]
    MissingChartType,

    #[error("data must be an array")]
    DataNotArray,
}

/// Canonical chart description.
///
/// Only `chartType` and `data` are checked. `config` and each `chartConfig`
/// entry are carried as raw JSON: normalization reads or writes
/// `config.xAxisKey` and series `color`, nothing else. Unknown top-level
/// fields are kept in `extra`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartDescription {
    pub chart_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config: Option<Value>,
    pub data: Vec<Value>,
    pub chart_config: IndexMap<String, Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub txt_response: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ChartDescription {
    pub fn is_pie(&self) -> bool {
        self.chart_type == "pie"
    }

    /// `config.xAxisKey` when it is a string.
    pub fn x_axis_key(&self) -> Option<&str> {
        self.config
            .as_ref()
            .and_then(|config| config.get("xAxisKey"))
            .and_then(Value::as_str)
    }

    /// Set `config.xAxisKey`, creating `config` when it is absent or not an
    /// object.
    pub fn set_x_axis_key(&mut self, key: &str) {
        let config = self
            .config
            .get_or_insert_with(|| Value::Object(Map::new()));
        if !config.is_object() {
            *config = Value::Object(Map::new());
        }
        if let Value::Object(fields) = config {
            fields.insert("xAxisKey".into(), Value::String(key.into()));
        }
    }
}

/// What the model sent back, after parsing.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelReply {
    /// Not JSON. The raw text is all there is.
    Unparsed { raw: String },
    /// JSON without chart content.
    Text { raw: String, parsed: Value },
    /// JSON carrying a chart. `parsed` is the canonicalized description as
    /// received; `chart` is its normalized form.
    Chart {
        raw: String,
        parsed: Value,
        chart: ChartDescription,
    },
}

impl ModelReply {
    /// Narrative text for the caller.
    pub fn narrative(&self) -> String {
        match self {
            ModelReply::Unparsed { raw } => raw.clone(),
            ModelReply::Text { raw, parsed } | ModelReply::Chart { raw, parsed, .. } => {
                match parsed {
                    Value::String(text) => text.clone(),
                    _ => parsed
                        .get("txtResponse")
                        .and_then(Value::as_str)
                        .map(str::to_string)
                        .unwrap_or_else(|| raw.clone()),
                }
            }
        }
    }
}

/// Parse and normalize a raw model reply.
///
/// Invalid JSON is not an error: it yields [`ModelReply::Unparsed`]. JSON
/// that looks like a chart but lacks `chartType` or an array `data` is.
pub fn interpret(raw: &str) -> Result<ModelReply, ChartError> {
    let body = canonical::strip_code_fence(raw);
    let parsed: Value = match serde_json::from_str(body) {
        Ok(v) => v,
        Err(e) => {
            warn!(error = %e, "model reply is not valid JSON, returning text only");
            return Ok(ModelReply::Unparsed {
                raw: raw.to_string(),
            });
        }
    };
    let parsed = canonical::canonicalize(parsed);

    if !carries_chart(&parsed) {
        return Ok(ModelReply::Text {
            raw: raw.to_string(),
            parsed,
        });
    }

    let chart = validate(&parsed)?;
    if !CHART_TYPES.contains(&chart.chart_type.as_str()) {
        warn!(chart_type = %chart.chart_type, "model used an unknown chart type");
    }

    Ok(ModelReply::Chart {
        raw: raw.to_string(),
        chart: normalize::normalize_chart(chart),
        parsed,
    })
}

fn carries_chart(parsed: &Value) -> bool {
    parsed
        .as_object()
        .is_some_and(|obj| CHART_KEYS.iter().any(|k| obj.contains_key(*k)))
}

/// Check the two required fields and split the reply into its parts.
pub fn validate(parsed: &Value) -> Result<ChartDescription, ChartError> {
    let chart_type = match parsed.get("chartType").and_then(Value::as_str) {
        Some(chart_type) if !chart_type.trim().is_empty() => chart_type.to_string(),
        _ => return Err(ChartError::MissingChartType),
    };
    let data = parsed
        .get("data")
        .and_then(Value::as_array)
        .cloned()
        .ok_or(ChartError::DataNotArray)?;

    let mut extra = parsed.as_object().cloned().unwrap_or_default();
    extra.shift_remove("chartType");
    extra.shift_remove("data");
    let config = extra.shift_remove("config");
    let chart_config = match extra.shift_remove("chartConfig") {
        Some(Value::Object(series)) => series.into_iter().collect(),
        None | Some(Value::Null) => IndexMap::new(),
        Some(other) => {
            warn!(chart_config = %other, "chartConfig is not an object, ignoring it");
            IndexMap::new()
        }
    };
    let txt_response = extra.shift_remove("txtResponse");

    Ok(ChartDescription {
        chart_type,
        config,
        data,
        chart_config,
        txt_response,
        extra,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn malformed_json_is_unparsed_not_error() {
        let reply = interpret("Sure! Here is your chart: {oops").unwrap();
        assert_eq!(
            reply,
            ModelReply::Unparsed {
                raw: "Sure! Here is your chart: {oops".into()
            }
        );
        assert_eq!(reply.narrative(), "Sure! Here is your chart: {oops");
    }

    #[test]
    fn json_without_chart_keys_is_text() {
        let reply = interpret(r#"{"txtResponse": "No chart needed."}"#).unwrap();
        assert!(matches!(reply, ModelReply::Text { .. }));
        assert_eq!(reply.narrative(), "No chart needed.");
    }

    #[test]
    fn json_string_reply_is_its_own_narrative() {
        let reply = interpret(r#""just words""#).unwrap();
        assert_eq!(reply.narrative(), "just words");
    }

    #[test]
    fn missing_chart_type_is_invalid() {
        let err = interpret(r#"{"data": [], "chartConfig": {}}"#).unwrap_err();
        assert_eq!(err, ChartError::MissingChartType);
    }

    #[test]
    fn empty_chart_type_is_invalid() {
        let err = interpret(r#"{"chartType": "  ", "data": []}"#).unwrap_err();
        assert_eq!(err, ChartError::MissingChartType);
    }

    #[test]
    fn non_array_data_is_invalid() {
        let err = interpret(r#"{"chartType": "bar", "data": {"a": 1}}"#).unwrap_err();
        assert_eq!(err, ChartError::DataNotArray);
        let err = interpret(r#"{"chartType": "bar"}"#).unwrap_err();
        assert_eq!(err, ChartError::DataNotArray);
    }

    #[test]
    fn chart_reply_keeps_parsed_and_normalized() {
        let raw = json!({
            "txtResponse": "Revenue grew.",
            "chartType": "bar",
            "config": {"title": "Revenue", "description": "By quarter", "xAxisKey": "quarter"},
            "data": [{"quarter": "Q1", "revenue": 10}],
            "chartConfig": {"revenue": {"label": "Revenue"}}
        })
        .to_string();
        let reply = interpret(&raw).unwrap();
        let ModelReply::Chart { parsed, chart, .. } = &reply else {
            panic!("expected chart, got {reply:?}");
        };
        assert!(parsed["chartConfig"]["revenue"].get("color").is_none());
        assert_eq!(
            chart.chart_config["revenue"]["color"],
            "hsl(var(--chart-1))"
        );
        assert_eq!(reply.narrative(), "Revenue grew.");
    }

    #[test]
    fn unknown_fields_survive_decoding() {
        let parsed = json!({
            "chartType": "line",
            "config": {"title": "T", "unit": "USD"},
            "data": [],
            "chartConfig": {"a": {"label": "A", "dashed": true}},
            "source": "ledger"
        });
        let chart = validate(&parsed).unwrap();
        assert_eq!(chart.extra["source"], "ledger");
        assert_eq!(chart.config.unwrap()["unit"], "USD");
        assert_eq!(chart.chart_config["a"]["dashed"], true);
    }

    #[test]
    fn trend_keeps_integer_percentage() {
        let parsed = json!({
            "chartType": "area",
            "config": {"trend": {"percentage": 5, "direction": "down"}},
            "data": []
        });
        let chart = validate(&parsed).unwrap();
        let out = serde_json::to_value(&chart).unwrap();
        assert_eq!(out["config"]["trend"], json!({"percentage": 5, "direction": "down"}));
    }

    #[test]
    fn loosely_typed_metadata_is_accepted() {
        for (config, chart_config) in [
            (json!({"trend": {"percentage": "5.2", "direction": "up"}}), json!({})),
            (json!({"trend": {"percentage": 5.2, "direction": "flat"}}), json!({})),
            (json!({"title": 2024, "footer": ["a"]}), json!({"2024": {"label": 2024}})),
            (Value::Null, json!({"v": {"label": "V", "stacked": "yes"}})),
        ] {
            let raw = json!({
                "chartType": "bar",
                "config": config,
                "data": [{"x": "a", "v": 1}],
                "chartConfig": chart_config
            })
            .to_string();
            let reply = interpret(&raw).unwrap();
            let ModelReply::Chart { chart, .. } = reply else {
                panic!("expected chart for {raw}");
            };
            assert_eq!(chart.config, Some(config));
            for (slot, (key, series)) in chart.chart_config.iter().enumerate() {
                let mut expected = chart_config[key].clone();
                expected["color"] = json!(normalize::palette_color(slot + 1));
                assert_eq!(series, &expected);
            }
        }
    }

    #[test]
    fn non_object_records_are_kept() {
        let chart = validate(&json!({"chartType": "bar", "data": [1, "two", null]})).unwrap();
        assert_eq!(chart.data, vec![json!(1), json!("two"), Value::Null]);
    }

    #[test]
    fn non_object_chart_config_is_ignored() {
        let chart = validate(&json!({"chartType": "bar", "data": [], "chartConfig": "v"})).unwrap();
        assert!(chart.chart_config.is_empty());
    }
}
