//! Tolerant parsing of the endpoint's free-text reply
//!
//! The JSON object is located with a greedy first-`{`-to-last-`}` span. When
//! that span does not decode, the first bracket-balanced object that does is
//! used instead. If nothing decodes the manual-review placeholder is returned.
//! Parsing never fails.

use serde_json::{Map, Value};

use crate::models::{AnalysisResult, UNKNOWN};

/// Parse a raw reply into a result, substituting defaults field by field
pub fn parse(raw: &str) -> AnalysisResult {
    match extract_object(raw) {
        Some(object) => result_from_object(&object, raw),
        None => {
            tracing::warn!(
                reply_len = raw.len(),
                "No structured content in inference reply, storing manual-review placeholder"
            );
            AnalysisResult::manual_review(raw)
        }
    }
}

fn extract_object(raw: &str) -> Option<Map<String, Value>> {
    if let Some(object) = greedy_span(raw).and_then(decode_object) {
        return Some(object);
    }
    balanced_spans(raw).into_iter().find_map(decode_object)
}

fn decode_object(span: &str) -> Option<Map<String, Value>> {
    match serde_json::from_str::<Value>(span) {
        Ok(Value::Object(object)) => Some(object),
        _ => None,
    }
}

/// Span from the first `{` to the last `}`
fn greedy_span(raw: &str) -> Option<&str> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    (end > start).then(|| &raw[start..=end])
}

/// Top-level `{...}` spans whose braces balance, ignoring braces inside strings
fn balanced_spans(raw: &str) -> Vec<&str> {
    let mut spans = Vec::new();
    let mut depth = 0usize;
    let mut start = None;
    let mut in_string = false;
    let mut escaped = false;

    for (i, ch) in raw.char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }

        match ch {
            '"' if depth > 0 => in_string = true,
            '{' => {
                if depth == 0 {
                    start = Some(i);
                }
                depth += 1;
            }
            '}' if depth > 0 => {
                depth -= 1;
                if depth == 0 {
                    if let Some(s) = start.take() {
                        spans.push(&raw[s..=i]);
                    }
                }
            }
            _ => {}
        }
    }

    spans
}

fn result_from_object(object: &Map<String, Value>, raw: &str) -> AnalysisResult {
    AnalysisResult {
        hs_code: field(object, &["hsCode", "hs_code"])
            .and_then(as_text)
            .unwrap_or_else(|| UNKNOWN.to_string()),
        tariff_rate: field(object, &["tariffRate", "tariff_rate"])
            .and_then(as_number)
            .unwrap_or(0.0),
        requirements: field(object, &["requirements"]).map(as_list).unwrap_or_default(),
        restrictions: field(object, &["restrictions"]).map(as_list).unwrap_or_default(),
        documentation: field(object, &["documentation"]).map(as_list).unwrap_or_default(),
        estimated_processing_time: field(
            object,
            &["estimatedProcessingTime", "estimated_processing_time", "processingTime"],
        )
        .and_then(as_text)
        .unwrap_or_else(|| UNKNOWN.to_string()),
        confidence: field(object, &["confidence", "confidenceScore", "confidence_score"])
            .and_then(as_number)
            .map(|c| c.clamp(0.0, 1.0))
            .unwrap_or(0.0),
        analysis_text: field(object, &["analysis", "analysisText", "analysis_text"])
            .and_then(as_text)
            .unwrap_or_else(|| raw.to_string()),
    }
}

fn field<'a>(object: &'a Map<String, Value>, names: &[&str]) -> Option<&'a Value> {
    names
        .iter()
        .filter_map(|name| object.get(*name))
        .find(|value| !value.is_null())
}

/// Non-empty string, or a number rendered as text
fn as_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Finite number, or a numeric string such as `"6.5"` or `"6.5%"`
fn as_number(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().trim_end_matches('%').trim().parse::<f64>().ok(),
        _ => None,
    }?;
    number.is_finite().then_some(number)
}

fn as_list(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items
            .iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s.trim().to_string()),
                Value::Null => None,
                Value::Number(_) | Value::Bool(_) => Some(item.to_string()),
                Value::Array(_) | Value::Object(_) => Some(item.to_string()),
            })
            .filter(|s| !s.is_empty())
            .collect(),
        Value::String(s) if !s.trim().is_empty() => vec![s.trim().to_string()],
        _ => Vec::new(),
    }
}
