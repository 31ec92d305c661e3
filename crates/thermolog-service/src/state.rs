//! Application state shared across handlers.
//!
//! The store keeps no open handles or caches, so handlers share it without
//! a lock. Every store call is blocking and runs on the blocking thread pool.

use std::sync::Arc;

use thermolog_store::{LatestReadingResolver, TimeSeriesStore};
use time::OffsetDateTime;

use crate::config::Config;

/// Shared application state.
pub struct AppState {
    /// The time-series store.
    pub store: TimeSeriesStore,
    /// Configuration the service was started with.
    pub config: Config,
    /// When the state was created.
    pub started_at: OffsetDateTime,
}

impl AppState {
    /// Create new application state.
    pub fn new(store: TimeSeriesStore, config: Config) -> Arc<Self> {
        Arc::new(Self {
            store,
            config,
            started_at: OffsetDateTime::now_utc(),
        })
    }

    /// Resolver over the shared store.
    pub fn resolver(&self) -> LatestReadingResolver {
        self.store.resolver()
    }
}
