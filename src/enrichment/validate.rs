use crate::error::EnrichmentError;
use crate::models::{parse_timestamp, ListingRecord};
use serde_json::{Map, Value};

/// Id reported for rows whose id column could not be read
pub const UNKNOWN_ID: &str = "unknown";

/// A fetched row after shape validation
#[derive(Debug, Clone, PartialEq)]
pub enum ValidatedRow {
    Valid(ListingRecord),
    Invalid { raw: Value, reason: String },
}

/// Best-effort id for reporting a row, even an invalid one
pub fn reported_id(raw: &Value, id_column: &str) -> String {
    read_id(raw, id_column).unwrap_or_else(|| UNKNOWN_ID.to_string())
}

/// Validate one raw row
pub fn validate_row(raw: Value, id_column: &str) -> ValidatedRow {
    match decode(&raw, id_column) {
        Ok(record) => ValidatedRow::Valid(record),
        Err(err) => ValidatedRow::Invalid {
            raw,
            reason: err.to_string(),
        },
    }
}

fn decode(raw: &Value, id_column: &str) -> Result<ListingRecord, EnrichmentError> {
    let fields = raw
        .as_object()
        .ok_or_else(|| EnrichmentError::validation("row is not a JSON object"))?;

    let id = read_id(raw, id_column).ok_or_else(|| {
        EnrichmentError::validation(format!("{id_column} must be a non-empty string"))
    })?;

    Ok(ListingRecord {
        id,
        status: optional(fields, "status", |v| v.as_str().map(str::to_string), "a string")?,
        list_price: optional(fields, "list_price", Value::as_f64, "a number")?,
        expired: optional(fields, "expired", Value::as_bool, "a boolean")?,
        active: optional(fields, "active", Value::as_bool, "a boolean")?,
        updated_at: optional(
            fields,
            "updated_at",
            |v| v.as_str().and_then(parse_timestamp),
            "a timestamp",
        )?,
        last_scraped_at: optional(
            fields,
            "last_scraped_at",
            |v| v.as_str().and_then(parse_timestamp),
            "a timestamp",
        )?,
    })
}

/// Integer keys are accepted and stringified; anything else must be a non-blank string
pub fn read_id(raw: &Value, id_column: &str) -> Option<String> {
    match raw.get(id_column)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) if n.is_i64() || n.is_u64() => Some(n.to_string()),
        _ => None,
    }
}

/// Absent and null both read as `None`; a present value must convert
fn optional<T>(
    fields: &Map<String, Value>,
    key: &str,
    convert: impl Fn(&Value) -> Option<T>,
    expected: &str,
) -> Result<Option<T>, EnrichmentError> {
    match fields.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => convert(value).map(Some).ok_or_else(|| {
            EnrichmentError::validation(format!("{key} must be {expected}, got {value}"))
        }),
    }
}
