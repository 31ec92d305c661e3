//! HTTP REST API for sensor temperature readings.
//!
//! This crate provides a service that:
//! - Appends readings to the per-sensor day files of a [`TimeSeriesStore`]
//! - Serves a sensor's day history and current value
//! - Resolves current values for every sensor concurrently
//!
//! # REST API Endpoints
//!
//! - `GET /api/health` - Service health check
//! - `POST /api/sensors/{id}/temperature/{temperature}` - Record a reading now
//! - `GET /api/sensors/{id}/days` - Days with data for a sensor
//! - `GET /api/sensors/{id}/days/{date}` - Readings of one day (`YYYY-MM-DD`)
//! - `GET /api/sensors/{id}/current` - Latest reading for a sensor
//! - `GET /api/sensors/current` - Latest reading for every sensor
//!
//! # Configuration
//!
//! The service reads configuration from `~/.config/thermolog/server.toml`:
//!
//! ```toml
//! [server]
//! bind = "127.0.0.1:8080"
//! bulk_concurrency = 16
//!
//! [storage]
//! path = "~/.local/share/thermolog/readings"
//! durability = "flush"
//! ```
//!
//! [`TimeSeriesStore`]: thermolog_store::TimeSeriesStore

pub mod api;
pub mod bulk;
pub mod config;
pub mod state;

pub use bulk::{CurrentOutcome, CurrentValue, SensorCurrent};
pub use config::{Config, ConfigError, ServerConfig, StorageConfig};
pub use state::AppState;
