//! Data models for stored data.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use thermolog_types::Reading;

use crate::error::{Error, Result};

/// A reading as persisted in a day file.
///
/// Cells are kept exactly as stored. Numeric and timestamp conversion is
/// deferred to [`StoredReading::temperature`] and
/// [`StoredReading::captured_at`], which report failures explicitly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredReading {
    /// Entity identifier (first column).
    pub id: String,
    /// Temperature as written (second column).
    pub temperature: String,
    /// RFC 3339 timestamp as written (third column).
    pub timestamp: String,
}

impl StoredReading {
    /// Parse the temperature cell.
    ///
    /// Surrounding whitespace is ignored. Non-numeric and non-finite values
    /// fail with [`Error::InvalidTemperature`].
    pub fn temperature(&self) -> Result<f64> {
        self.temperature
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|t| t.is_finite())
            .ok_or_else(|| Error::InvalidTemperature {
                entity: self.id.clone(),
                value: self.temperature.clone(),
            })
    }

    /// Parse the timestamp cell.
    pub fn captured_at(&self) -> Result<OffsetDateTime> {
        OffsetDateTime::parse(self.timestamp.trim(), &Rfc3339)
            .map_err(|e| Error::InvalidTimestamp(format!("'{}': {}", self.timestamp, e)))
    }

    /// Convert to a typed [`Reading`].
    pub fn to_reading(&self) -> Result<Reading> {
        Ok(Reading::new(
            self.id.clone(),
            self.temperature()?,
            self.captured_at()?,
        ))
    }
}
