//! Chart normalization.
//!
//! Pie records are reduced to `{segment, value}` and every series gets a
//! palette color derived from its position in `chartConfig`.

use indexmap::IndexMap;
use serde_json::{Map, Value};
use tracing::warn;

use super::ChartDescription;

/// Field names tried, in order, after `config.xAxisKey` when resolving a pie
/// segment.
const SEGMENT_FALLBACKS: [&str; 3] = ["segment", "category", "name"];

/// Canonical pie field names.
pub const PIE_SEGMENT_KEY: &str = "segment";
pub const PIE_VALUE_KEY: &str = "value";

/// Color token for a 1-based palette slot.
pub fn palette_color(slot: usize) -> String {
    format!("hsl(var(--chart-{slot}))")
}

/// Apply pie remapping (pie charts only) and reassign series colors.
pub fn normalize_chart(mut chart: ChartDescription) -> ChartDescription {
    if chart.is_pie() {
        remap_pie(&mut chart);
    }
    chart.chart_config = assign_colors(std::mem::take(&mut chart.chart_config));
    chart
}

fn remap_pie(chart: &mut ChartDescription) {
    let x_axis_key = chart.x_axis_key().map(str::to_string);
    let value_key = chart.chart_config.keys().next().cloned();

    chart.data = chart
        .data
        .iter()
        .enumerate()
        .map(|(index, record)| {
            let segment = x_axis_key
                .as_deref()
                .into_iter()
                .chain(SEGMENT_FALLBACKS)
                .find_map(|key| present(record, key));
            let value = value_key
                .as_deref()
                .into_iter()
                .chain([PIE_VALUE_KEY])
                .find_map(|key| present(record, key));

            if segment.is_none() {
                warn!(index, "pie record has no segment field");
            }
            if value.is_none() {
                warn!(index, "pie record has no value field");
            }

            let mut out = Map::new();
            out.insert(PIE_SEGMENT_KEY.into(), segment.cloned().unwrap_or(Value::Null));
            out.insert(PIE_VALUE_KEY.into(), value.cloned().unwrap_or(Value::Null));
            Value::Object(out)
        })
        .collect();

    chart.set_x_axis_key(PIE_SEGMENT_KEY);
}

fn present<'a>(record: &'a Value, key: &str) -> Option<&'a Value> {
    record.get(key).filter(|v| !v.is_null())
}

/// Rebuild the series map in insertion order, slot N for the Nth entry.
///
/// Only `color` is written. A series that is not an object becomes
/// `{"color": ...}`.
fn assign_colors(chart_config: IndexMap<String, Value>) -> IndexMap<String, Value> {
    chart_config
        .into_iter()
        .enumerate()
        .map(|(index, (key, series))| {
            let color = Value::String(palette_color(index + 1));
            let colored = match series {
                Value::Object(mut fields) => {
                    fields.insert("color".into(), color);
                    Value::Object(fields)
                }
                other => {
                    if !other.is_null() {
                        warn!(series = %key, "series config is not an object, replacing it");
                    }
                    let mut fields = Map::new();
                    fields.insert("color".into(), color);
                    Value::Object(fields)
                }
            };
            (key, colored)
        })
        .collect()
}
