//! JSON parsing helpers for model responses
//!
//! Extraction is asked for JSON only, but models still wrap it in chatter or
//! return nothing usable. Parsing runs in two stages: strict parse of the
//! whole text, then recovery of the outermost `{ ... }` span. Whatever
//! survives is coerced field by field into a [`ReceiptInput`], so malformed
//! output degrades to defaults instead of failing.

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::category::normalize_category;
use crate::models::{to_iso, ReceiptInput, UNKNOWN_MERCHANT};
use crate::month::parse_iso_datetime;

/// Fields of a parsed JSON object
pub type Fields = Map<String, Value>;

/// Stage one: the whole response is a JSON object
pub fn parse_strict(response: &str) -> Option<Fields> {
    match serde_json::from_str::<Value>(response.trim()) {
        Ok(Value::Object(fields)) => Some(fields),
        _ => None,
    }
}

/// Stage two: parse the span from the first `{` to the last `}`
pub fn recover_embedded(response: &str) -> Option<Fields> {
    let start = response.find('{')?;
    let end = response.rfind('}')?;
    if start >= end {
        return None;
    }

    match serde_json::from_str::<Value>(&response[start..=end]) {
        Ok(Value::Object(fields)) => Some(fields),
        _ => None,
    }
}

/// Run both stages; an empty object when nothing parses
pub fn extract_fields(response: &str) -> Fields {
    if let Some(fields) = parse_strict(response) {
        return fields;
    }

    if let Some(fields) = recover_embedded(response) {
        debug!("Recovered JSON object embedded in model response");
        return fields;
    }

    warn!(raw = %truncate(response, 200), "No JSON object in model response, using defaults");
    Fields::new()
}

/// Coerce extracted fields into a receipt, filling defaults
///
/// `now` is used when the date is missing or unparsable.
pub fn coerce_receipt(fields: &Fields, now: DateTime<Utc>) -> ReceiptInput {
    let merchant = match fields.get("merchant") {
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    };

    let date_time = fields
        .get("dateTime")
        .and_then(Value::as_str)
        .and_then(parse_iso_datetime)
        .unwrap_or(now);

    ReceiptInput {
        total: coerce_total(fields.get("total")),
        date_time: to_iso(&date_time),
        merchant: if merchant.is_empty() {
            UNKNOWN_MERCHANT.to_string()
        } else {
            merchant
        },
        category: normalize_category(fields.get("category").and_then(Value::as_str)),
    }
}

/// Full pipeline from model text to receipt data
pub fn parse_receipt_response(response: &str, now: DateTime<Utc>) -> ReceiptInput {
    coerce_receipt(&extract_fields(response), now)
}

/// Numbers and numeric strings; anything else, negative or non-finite is 0
fn coerce_total(value: Option<&Value>) -> f64 {
    let total = match value {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => s.trim().parse::<f64>().unwrap_or(0.0),
        _ => 0.0,
    };

    if total.is_finite() && total > 0.0 {
        total
    } else {
        0.0
    }
}

/// Truncate to at most `max_chars` characters, ending in "..." when cut
pub fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_chars.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
