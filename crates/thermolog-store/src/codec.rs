//! Row codec for day files.
//!
//! A day file is CSV with a fixed three-column layout:
//!
//! ```text
//! "Id","Temperature","Timestamp"
//! "norte-a","4.5","2021-11-27T10:00:00Z"
//! ```
//!
//! The column order never changes, so files written at any time remain
//! append-compatible. Decoding is by position, not by header name.

use csv::StringRecord;
use time::format_description::well_known::Rfc3339;

use thermolog_types::Reading;

use crate::error::{Error, Result};
use crate::models::StoredReading;

/// Number of columns in every data row.
pub const COLUMNS: usize = 3;

/// Column keys and display labels, in file order.
pub const HEADER: [(&str, &str); COLUMNS] = [
    ("id", "Id"),
    ("temperature", "Temperature"),
    ("timestamp", "Timestamp"),
];

/// The header row as written to a new day file.
pub fn header_row() -> [&'static str; COLUMNS] {
    HEADER.map(|(_, label)| label)
}

/// Encode a reading as `[id, temperature, timestamp]`.
///
/// Temperature uses the shortest decimal form that parses back to the same
/// value (`5`, `22.5`); `NaN` and infinities fail with
/// [`Error::InvalidTemperature`]. The timestamp is RFC 3339; offsets that
/// RFC 3339 cannot express fail with [`Error::InvalidTimestamp`].
pub fn encode_row(reading: &Reading) -> Result<[String; COLUMNS]> {
    if !reading.temperature.is_finite() {
        return Err(Error::InvalidTemperature {
            entity: reading.id.clone(),
            value: reading.temperature.to_string(),
        });
    }

    let timestamp = reading
        .timestamp
        .format(&Rfc3339)
        .map_err(|e| Error::InvalidTimestamp(format!("{}: {}", reading.timestamp, e)))?;

    Ok([reading.id.clone(), reading.temperature.to_string(), timestamp])
}

/// Decode a row by column position.
///
/// Rows with fewer than [`COLUMNS`] cells fail with
/// [`Error::MalformedRecord`]; extra cells are ignored. Cell contents are
/// not validated here.
pub fn decode_row(record: &StringRecord) -> Result<StoredReading> {
    let cell = |i: usize| record.get(i).map(str::to_string);

    match (cell(0), cell(1), cell(2)) {
        (Some(id), Some(temperature), Some(timestamp)) => Ok(StoredReading {
            id,
            temperature,
            timestamp,
        }),
        _ => Err(Error::MalformedRecord {
            path: Default::default(),
            line: record.position().map(|p| p.line()),
            reason: format!("expected {} fields, found {}", COLUMNS, record.len()),
        }),
    }
}
