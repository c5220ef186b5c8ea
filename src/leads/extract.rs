//! Recovery of a typed lead list from the oracle's free-text reply.
//!
//! Extraction runs as a fixed chain: strip code fences, parse the whole
//! text as a JSON array, then parse the greedy `[` .. `]` span. Only when
//! both attempts miss does it fail. A reply with no text at all counts as
//! an empty array. Each array entry is then checked on its own; malformed
//! entries are dropped and counted.

use super::types::{BusinessLead, LeadBatch};
use crate::error::{LeadError, Result};
use serde_json::{Map, Value};
use tracing::{debug, warn};

const PREVIEW_CHARS: usize = 200;

/// Which attempt produced the array.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Tier {
    Direct,
    BracketScan,
}

/// Removes every ```` ```json ```` and ```` ``` ```` marker and trims.
pub(crate) fn strip_code_fences(raw: &str) -> String {
    raw.replace("```json", "").replace("```", "").trim().to_string()
}

pub(crate) fn parse_direct(text: &str) -> Option<Vec<Value>> {
    serde_json::from_str::<Vec<Value>>(text).ok()
}

/// Parses the span from the first `[` to the last `]`.
pub(crate) fn parse_bracket_scan(text: &str) -> Option<Vec<Value>> {
    let start = text.find('[')?;
    let end = text.rfind(']')?;
    if end <= start {
        return None;
    }
    parse_direct(&text[start..=end])
}

/// Runs the extraction tiers in order and fails when none yields an array.
pub(crate) fn extract_array(raw: &str) -> Result<(Tier, Vec<Value>)> {
    let cleaned = strip_code_fences(raw);
    if cleaned.is_empty() {
        debug!("Empty reply, treating as no matches");
        return Ok((Tier::Direct, Vec::new()));
    }

    if let Some(entries) = parse_direct(&cleaned) {
        return Ok((Tier::Direct, entries));
    }
    debug!("Reply is not a bare JSON array, scanning for a bracketed span");

    if let Some(entries) = parse_bracket_scan(&cleaned) {
        return Ok((Tier::BracketScan, entries));
    }

    Err(LeadError::UnparseableResponse { preview: cleaned.chars().take(PREVIEW_CHARS).collect() })
}

/// Extracts and validates leads from a raw oracle reply.
pub fn extract_leads(raw: &str) -> Result<LeadBatch> {
    let (tier, entries) = extract_array(raw)?;
    debug!("Extracted {} entries via {:?}", entries.len(), tier);

    let mut batch = LeadBatch::default();
    for (index, entry) in entries.iter().enumerate() {
        match validate_entry(entry) {
            Ok(lead) => batch.leads.push(lead),
            Err(reason) => {
                warn!("Discarding lead entry {}: {}", index, reason);
                batch.discarded += 1;
            }
        }
    }
    Ok(batch)
}

/// Checks one array element and coerces it into a [`BusinessLead`].
///
/// Ratings outside 1.0..=5.0 are kept; only non-numeric ones are rejected.
pub(crate) fn validate_entry(entry: &Value) -> std::result::Result<BusinessLead, String> {
    let obj = entry.as_object().ok_or_else(|| format!("expected an object, got {}", kind(entry)))?;

    Ok(BusinessLead {
        company_name: required_text(obj, "companyName")?,
        rating: rating(obj)?,
        review_count: review_count(obj)?,
        phone_number: optional_text(obj, "phoneNumber")?,
        address: required_text(obj, "address")?,
        postal_code: optional_text(obj, "postalCode")?,
        google_maps_url: optional_text(obj, "googleMapsUrl")?,
        website: Some(optional_text(obj, "website")?).filter(|w| !w.is_empty()),
    })
}

fn required_text(obj: &Map<String, Value>, key: &str) -> std::result::Result<String, String> {
    let text = optional_text(obj, key)?;
    if text.is_empty() {
        return Err(format!("\"{key}\" is missing or empty"));
    }
    Ok(text)
}

fn optional_text(obj: &Map<String, Value>, key: &str) -> std::result::Result<String, String> {
    match obj.get(key) {
        None | Some(Value::Null) => Ok(String::new()),
        Some(Value::String(s)) => Ok(s.trim().to_string()),
        Some(Value::Number(n)) => Ok(n.to_string()),
        Some(other) => Err(format!("\"{key}\" must be a string, got {}", kind(other))),
    }
}

fn rating(obj: &Map<String, Value>) -> std::result::Result<f64, String> {
    let value = match obj.get("rating") {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    value
        .filter(|v| v.is_finite())
        .ok_or_else(|| "\"rating\" must be a number".to_string())
}

fn review_count(obj: &Map<String, Value>) -> std::result::Result<u64, String> {
    let err = || "\"reviewCount\" must be a non-negative integer".to_string();
    match obj.get("reviewCount") {
        Some(Value::Number(n)) => {
            if let Some(v) = n.as_u64() {
                return Ok(v);
            }
            match n.as_f64() {
                Some(f) if f.is_finite() && f >= 0.0 && f.fract() == 0.0 => Ok(f as u64),
                _ => Err(err()),
            }
        }
        Some(Value::String(s)) => s.trim().replace(',', "").parse::<u64>().map_err(|_| err()),
        _ => Err(err()),
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
