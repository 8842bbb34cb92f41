//! Turning a model's free-form reply into a structured answer record.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The structured record the model is asked to return for each turn.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParsedAnswer {
    #[serde(default)]
    pub used_cells: Vec<String>,
    #[serde(default)]
    pub calculation: String,
    /// Literal numeric-answer token before coercion.
    #[serde(default)]
    pub answer: String,
}

/// Outcome of [`extract`]: either the reply decoded as the expected JSON
/// object, or the trimmed raw text kept as a fallback answer string so a
/// bare numeric reply is still usable.
#[derive(Debug, Clone, PartialEq)]
pub enum Extraction {
    Decoded(ParsedAnswer),
    Fallback(String),
}

impl Extraction {
    pub fn into_parsed(self) -> ParsedAnswer {
        match self {
            Extraction::Decoded(parsed) => parsed,
            Extraction::Fallback(raw) => ParsedAnswer {
                answer: raw,
                ..ParsedAnswer::default()
            },
        }
    }
}

/// Decode a raw model reply. Never fails: formatting noise is stripped,
/// missing fields default to empty, and undecodable text falls back to the
/// trimmed reply itself.
pub fn extract(raw: &str) -> Extraction {
    let cleaned = strip_code_fences(raw);

    let Ok(Value::Object(fields)) = serde_json::from_str::<Value>(cleaned) else {
        return Extraction::Fallback(cleaned.to_string());
    };

    let used_cells = fields
        .get("used_cells")
        .and_then(Value::as_array)
        .map(|cells| cells.iter().map(value_to_text).collect())
        .unwrap_or_default();
    let calculation = fields
        .get("calculation")
        .map(value_to_text)
        .unwrap_or_default();
    let answer = fields.get("answer").map(value_to_text).unwrap_or_default();

    Extraction::Decoded(ParsedAnswer {
        used_cells,
        calculation,
        answer,
    })
}

/// Models routinely emit numbers where strings are expected; keep the
/// literal token either way.
fn value_to_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Number(number) => number.to_string(),
        Value::Bool(flag) => flag.to_string(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // An opening fence may carry a language tag on the same line.
    let rest = match rest.find('\n') {
        Some(pos) if rest[..pos].chars().all(|c| c.is_ascii_alphanumeric()) => &rest[pos + 1..],
        _ => rest.strip_prefix("json").unwrap_or(rest),
    };
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

static NUMERIC_CRUFT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[$€£,\s]+").expect("numeric cruft pattern is valid")
});

/// Coerce an answer token to a number. Tolerates a leading currency symbol,
/// thousands separators, accounting-style parentheses for negation, a
/// trailing `%` (kept as the literal numeral, matching the gold-answer
/// convention), and surrounding whitespace.
pub fn coerce_numeric(answer: &str) -> Option<f64> {
    let mut text = answer.trim();
    let mut negated = false;
    if let Some(inner) = text.strip_prefix('(').and_then(|t| t.strip_suffix(')')) {
        negated = true;
        text = inner;
    }

    let cleaned = NUMERIC_CRUFT.replace_all(text, "");
    let cleaned = cleaned.trim_end_matches('%');
    if cleaned.is_empty() {
        return None;
    }

    cleaned
        .parse::<f64>()
        .ok()
        .map(|value| if negated { -value } else { value })
}
