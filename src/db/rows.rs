//! Column decoding helpers shared by the row mappers.

use std::collections::BTreeSet;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::Row;

use crate::errors::CyberHuntError;
use crate::utils::time;

fn conversion_error(row: &Row<'_>, column: &str, err: CyberHuntError) -> rusqlite::Error {
    let idx = row.as_ref().column_index(column).unwrap_or(0);
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(err))
}

/// Decode a text column into one of the workflow enums.
pub fn parse<T>(row: &Row<'_>, column: &str) -> rusqlite::Result<T>
where
    T: FromStr<Err = CyberHuntError>,
{
    let raw: String = row.get(column)?;
    raw.parse().map_err(|e| conversion_error(row, column, e))
}

pub fn parse_opt<T>(row: &Row<'_>, column: &str) -> rusqlite::Result<Option<T>>
where
    T: FromStr<Err = CyberHuntError>,
{
    let raw: Option<String> = row.get(column)?;
    raw.map(|s| s.parse().map_err(|e| conversion_error(row, column, e)))
        .transpose()
}

pub fn timestamp(row: &Row<'_>, column: &str) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(column)?;
    time::from_db(&raw).map_err(|e| conversion_error(row, column, e))
}

pub fn opt_timestamp(row: &Row<'_>, column: &str) -> rusqlite::Result<Option<DateTime<Utc>>> {
    let raw: Option<String> = row.get(column)?;
    time::opt_from_db(raw).map_err(|e| conversion_error(row, column, e))
}

/// String sets are stored as JSON arrays.
pub fn string_set(row: &Row<'_>, column: &str) -> rusqlite::Result<BTreeSet<String>> {
    let raw: String = row.get(column)?;
    serde_json::from_str(&raw).map_err(|e| conversion_error(row, column, e.into()))
}

pub fn encode_set(set: &BTreeSet<String>) -> Result<String, CyberHuntError> {
    Ok(serde_json::to_string(set)?)
}

pub fn u32_col(row: &Row<'_>, column: &str) -> rusqlite::Result<u32> {
    let raw: i64 = row.get(column)?;
    u32::try_from(raw).map_err(|_| {
        conversion_error(
            row,
            column,
            CyberHuntError::Database(format!("{} out of range: {}", column, raw)),
        )
    })
}

pub fn opt_u32_col(row: &Row<'_>, column: &str) -> rusqlite::Result<Option<u32>> {
    let raw: Option<i64> = row.get(column)?;
    raw.map(|v| {
        u32::try_from(v).map_err(|_| {
            conversion_error(
                row,
                column,
                CyberHuntError::Database(format!("{} out of range: {}", column, v)),
            )
        })
    })
    .transpose()
}
