use serde::de::DeserializeOwned;
use serde_json::Value;

use super::GenerationError;

/// Parse the model's reply into a JSON object.
///
/// Accepts bare JSON, JSON inside markdown fences, or a JSON object embedded in
/// surrounding prose (located by its outermost braces).
pub fn parse_json_response(response: &str) -> Result<Value, GenerationError> {
    let text = strip_code_fences(response.trim());
    if text.is_empty() {
        return Err(GenerationError::MalformedResponse("Empty response".into()));
    }

    let value = match serde_json::from_str::<Value>(text) {
        Ok(value) => value,
        Err(direct_err) => {
            let embedded = extract_outer_object(text).ok_or_else(|| {
                GenerationError::MalformedResponse("No JSON object found".into())
            })?;
            serde_json::from_str::<Value>(embedded).map_err(|e| {
                GenerationError::JsonParsing(format!("{direct_err}; embedded object: {e}"))
            })?
        }
    };

    if !value.is_object() {
        return Err(GenerationError::MalformedResponse(
            "Top-level JSON is not an object".into(),
        ));
    }
    Ok(value)
}

/// Remove a leading ```/```json fence and its closing fence.
fn strip_code_fences(text: &str) -> &str {
    if !text.starts_with("```") {
        return text;
    }
    let after_open = match text.find('\n') {
        Some(newline) => &text[newline + 1..],
        None => return "",
    };
    match after_open.rfind("```") {
        Some(close) => after_open[..close].trim(),
        None => after_open.trim(),
    }
}

fn extract_outer_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

/// Deserialize a value, falling back to the type's default on shape mismatch.
pub fn from_value_lenient<T: DeserializeOwned + Default>(value: Option<&Value>) -> T {
    value
        .and_then(|v| serde_json::from_value(v.clone()).ok())
        .unwrap_or_default()
}

/// Normalize a model-reported confidence to [0, 1].
///
/// Models are prompted with a 0–100 scale; anything above 1 is treated as a
/// percentage. Numeric strings ("85", "85%") are accepted.
pub fn normalize_confidence(value: &Value) -> Option<f32> {
    let raw = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().trim_end_matches('%').trim().parse::<f64>().ok()?,
        _ => return None,
    };
    if !raw.is_finite() || raw < 0.0 {
        return None;
    }
    let scaled = if raw > 1.0 { raw / 100.0 } else { raw };
    Some(scaled.clamp(0.0, 1.0) as f32)
}

/// Collect a JSON array of strings, skipping non-string items.
pub fn string_list(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|v| v.as_str())
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect(),
        _ => Vec::new(),
    }
}
