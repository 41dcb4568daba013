use serde_json::{Number, Value};

/// Integral floats beyond this magnitude stay floats.
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

/// Why a cell could not be turned into its declared type.
#[derive(Debug, thiserror::Error)]
pub enum CoercionError {
    #[error("not a number: {0:?}")]
    InvalidNumber(String),

    #[error("number is not finite: {0:?}")]
    NonFinite(String),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// ## Summary
/// Converts a raw sheet cell into a JSON value according to its type column.
///
/// The type is trimmed and matched case-insensitively; a blank type and any
/// unrecognised type (`html`, `url`, `path`, ...) keep the raw string.
///
/// ## Errors
/// Returns `CoercionError` for `number` cells that are unparseable or
/// non-finite, and for `json` cells with invalid syntax. A blank `number`
/// cell is `0`.
pub fn coerce_value(kind: &str, raw: &str) -> Result<Value, CoercionError> {
    match kind.trim().to_ascii_lowercase().as_str() {
        "null" => Ok(Value::Null),
        "boolean" => Ok(Value::Bool(is_truthy(raw))),
        "number" => coerce_number(raw),
        "json" => Ok(serde_json::from_str(raw)?),
        _ => Ok(Value::String(raw.to_string())),
    }
}

fn is_truthy(raw: &str) -> bool {
    let trimmed = raw.trim();
    ["true", "1", "yes"]
        .iter()
        .any(|candidate| trimmed.eq_ignore_ascii_case(candidate))
}

#[expect(
    clippy::cast_possible_truncation,
    reason = "only integral values within the safe integer range are cast"
)]
fn coerce_number(raw: &str) -> Result<Value, CoercionError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(Value::from(0));
    }
    let parsed = trimmed
        .parse::<f64>()
        .ok()
        .ok_or_else(|| CoercionError::InvalidNumber(raw.to_string()))?;

    if !parsed.is_finite() {
        return Err(CoercionError::NonFinite(raw.to_string()));
    }

    if parsed.fract() == 0.0 && parsed.abs() <= MAX_SAFE_INTEGER {
        return Ok(Value::from(parsed as i64));
    }

    Number::from_f64(parsed)
        .map(Value::Number)
        .ok_or_else(|| CoercionError::NonFinite(raw.to_string()))
}
