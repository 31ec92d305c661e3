//! Local time-series persistence for thermolog temperature readings.
//!
//! This crate stores readings as append-only CSV day files, one directory
//! per entity:
//!
//! ```text
//! <base>/<entity>/<YYYY-MM-DD>.csv
//!   "Id","Temperature","Timestamp"
//!   "norte-a","4.5","2021-11-27T10:00:00Z"
//! ```
//!
//! # Features
//!
//! - Append readings to the day file derived from their timestamp
//! - Read back a whole day in append order
//! - Find an entity's most recent day and its current value
//! - Resolve current values for many entities with per-entity outcomes
//!
//! # Example
//!
//! ```no_run
//! use thermolog_store::TimeSeriesStore;
//! use thermolog_types::Reading;
//!
//! let store = TimeSeriesStore::open("/var/lib/thermolog/readings")?;
//! store.append(&Reading::now("norte-a", 4.5))?;
//!
//! let current = store.resolver().current_temperature("norte-a")?;
//! assert_eq!(current, 4.5);
//! # Ok::<(), thermolog_store::Error>(())
//! ```

mod append_log;
pub mod codec;
mod error;
mod models;
mod resolver;
mod store;

pub use append_log::Durability;
pub use error::{Error, ErrorKind, Result};
pub use models::StoredReading;
pub use resolver::{LatestLookup, LatestReadingResolver};
pub use store::{DAY_FILE_EXTENSION, TimeSeriesStore};

/// Default store directory following platform conventions.
///
/// - Linux: `~/.local/share/thermolog/readings`
/// - macOS: `~/Library/Application Support/thermolog/readings`
/// - Windows: `C:\Users\<user>\AppData\Local\thermolog\readings`
pub fn default_data_dir() -> std::path::PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| std::path::PathBuf::from("."))
        .join("thermolog")
        .join("readings")
}
