//! Error types for thermolog-store.

use std::fmt;
use std::path::{Path, PathBuf};

use thermolog_types::{DayKey, ParseError};

/// Result type for thermolog-store operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in thermolog-store.
///
/// Every variant is scoped to the single entity or day file being processed.
/// Nothing is retried internally; low-level I/O causes are kept as the
/// error source.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// The requested entity or day has no data.
    #[error("No data found for {entity}{}", on_day(.day))]
    NotFound {
        entity: String,
        day: Option<DayKey>,
    },

    /// The day file exists but holds no data rows.
    #[error("Day file for {entity} on {day} has no readings")]
    EmptyDay { entity: String, day: DayKey },

    /// A row could not be decoded.
    #[error("Malformed record in {}{}: {reason}", .path.display(), at_line(.line))]
    MalformedRecord {
        path: PathBuf,
        line: Option<u64>,
        reason: String,
    },

    /// The underlying storage could not be read or written.
    #[error("Store unavailable at {}: {source}", .path.display())]
    StoreUnavailable {
        path: PathBuf,
        source: std::io::Error,
    },

    /// A stored temperature cell is not a finite number.
    #[error("Invalid temperature '{value}' for {entity}")]
    InvalidTemperature { entity: String, value: String },

    /// A timestamp could not be rendered or parsed as RFC 3339.
    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(String),

    /// Caller-supplied entity id or day key was rejected.
    #[error(transparent)]
    InvalidInput(#[from] ParseError),
}

/// Coarse classification of [`Error`] for callers that only branch on kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    EmptyDay,
    MalformedRecord,
    StoreUnavailable,
    InvalidTemperature,
    InvalidTimestamp,
    InvalidInput,
}

impl ErrorKind {
    /// Stable snake_case name, suitable for API responses.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::NotFound => "not_found",
            ErrorKind::EmptyDay => "empty_day",
            ErrorKind::MalformedRecord => "malformed_record",
            ErrorKind::StoreUnavailable => "store_unavailable",
            ErrorKind::InvalidTemperature => "invalid_temperature",
            ErrorKind::InvalidTimestamp => "invalid_timestamp",
            ErrorKind::InvalidInput => "invalid_input",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Error {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::NotFound { .. } => ErrorKind::NotFound,
            Error::EmptyDay { .. } => ErrorKind::EmptyDay,
            Error::MalformedRecord { .. } => ErrorKind::MalformedRecord,
            Error::StoreUnavailable { .. } => ErrorKind::StoreUnavailable,
            Error::InvalidTemperature { .. } => ErrorKind::InvalidTemperature,
            Error::InvalidTimestamp(_) => ErrorKind::InvalidTimestamp,
            Error::InvalidInput(_) => ErrorKind::InvalidInput,
        }
    }

    /// Whether this error means "no data" rather than a failure.
    pub fn is_no_data(&self) -> bool {
        matches!(self.kind(), ErrorKind::NotFound | ErrorKind::EmptyDay)
    }

    pub(crate) fn unavailable(path: &Path, source: std::io::Error) -> Self {
        Error::StoreUnavailable {
            path: path.to_path_buf(),
            source,
        }
    }

    /// Map a CSV reader error for `path` onto the store taxonomy.
    pub(crate) fn from_csv(err: csv::Error, path: &Path) -> Self {
        let line = err.position().map(|p| p.line());
        let reason = err.to_string();
        match err.into_kind() {
            csv::ErrorKind::Io(source) => Error::unavailable(path, source),
            _ => Error::MalformedRecord {
                path: path.to_path_buf(),
                line,
                reason,
            },
        }
    }

    /// Attach the file a malformed record was read from.
    pub(crate) fn in_file(self, file: &Path) -> Self {
        match self {
            Error::MalformedRecord { line, reason, .. } => Error::MalformedRecord {
                path: file.to_path_buf(),
                line,
                reason,
            },
            other => other,
        }
    }
}

fn on_day(day: &Option<DayKey>) -> String {
    day.map(|d| format!(" on {d}")).unwrap_or_default()
}

fn at_line(line: &Option<u64>) -> String {
    line.map(|l| format!(" line {l}")).unwrap_or_default()
}
