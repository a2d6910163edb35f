//! Row-to-entity parsing helpers, grounded on `zen-db::helpers`.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::DatabaseError;

/// Parse a required TEXT column as `DateTime<Utc>`. Accepts RFC 3339 and
/// SQLite's default `datetime('now')` format.
pub fn parse_datetime(s: &str) -> Result<DateTime<Utc>, DatabaseError> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
        .map(|naive| naive.and_utc())
        .map_err(|e| DatabaseError::Query(format!("failed to parse datetime '{s}': {e}")))
}

pub fn parse_optional_datetime(s: Option<&str>) -> Result<Option<DateTime<Utc>>, DatabaseError> {
    match s {
        Some(s) if !s.is_empty() => Ok(Some(parse_datetime(s)?)),
        _ => Ok(None),
    }
}

/// Serialize a value to its JSON-column representation.
pub fn to_json<T: Serialize>(value: &T) -> Result<String, DatabaseError> {
    serde_json::to_string(value).map_err(|e| DatabaseError::Query(format!("failed to serialize JSON column: {e}")))
}

/// Deserialize a JSON column into `T`, defaulting on an empty string.
pub fn from_json<T: DeserializeOwned + Default>(s: &str) -> Result<T, DatabaseError> {
    if s.is_empty() {
        return Ok(T::default());
    }
    serde_json::from_str(s).map_err(|e| DatabaseError::Query(format!("failed to parse JSON column '{s}': {e}")))
}
