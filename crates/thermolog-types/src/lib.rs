//! Shared types for thermolog temperature series.
//!
//! This crate provides the types passed between the store
//! (thermolog-store) and its consumers such as the HTTP service
//! (thermolog-service).
//!
//! # Features
//!
//! - [`Reading`]: one temperature measurement for an entity
//! - [`DayKey`]: the `YYYY-MM-DD` partition key of a day file
//! - [`validate_entity_id`]: entity id rules for the on-disk layout
//! - Error types for input parsing
//!
//! # Example
//!
//! ```
//! use thermolog_types::{DayKey, Reading};
//! use time::macros::datetime;
//!
//! let reading = Reading::new("norte-a", 4.5, datetime!(2021-11-27 23:30 -3));
//! assert_eq!(reading.day_key(), "2021-11-27".parse::<DayKey>()?);
//! # Ok::<(), thermolog_types::ParseError>(())
//! ```

pub mod error;
pub mod types;

pub use error::{ParseError, ParseResult};
pub use types::{DayKey, Reading, validate_entity_id};
