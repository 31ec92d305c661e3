//! Concurrent current-value lookup for many sensors.
//!
//! Each sensor is resolved on its own blocking task. At most
//! `server.bulk_concurrency` lookups are in flight; results come back in
//! input order and every sensor carries its own outcome, so a broken or
//! empty series never hides the others.

use futures::stream::{self, StreamExt};
use serde::Serialize;
use tracing::{debug, warn};

use thermolog_store::{LatestReadingResolver, StoredReading};

/// Latest reading of a sensor together with its numeric temperature.
#[derive(Debug, Clone, Serialize)]
pub struct CurrentValue {
    /// The last-appended row of the most recent day.
    pub reading: StoredReading,
    /// The row's temperature, parsed.
    pub current_temperature: f64,
}

/// Resolve the current value of one sensor (blocking).
pub fn resolve_current(
    resolver: &LatestReadingResolver,
    id: &str,
) -> thermolog_store::Result<CurrentValue> {
    let reading = resolver.latest(id)?;
    let current_temperature = reading.temperature()?;
    Ok(CurrentValue {
        reading,
        current_temperature,
    })
}

/// Per-sensor entry of a bulk listing.
#[derive(Debug, Clone, Serialize)]
pub struct SensorCurrent {
    /// Sensor id.
    pub id: String,
    /// What the lookup produced.
    #[serde(flatten)]
    pub outcome: CurrentOutcome,
}

/// Outcome of one lookup in a bulk listing.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CurrentOutcome {
    /// The sensor has a current value.
    Ok {
        reading: StoredReading,
        current_temperature: f64,
    },
    /// The lookup failed; `kind` is a stable error kind name.
    Error { kind: &'static str, message: String },
}

impl SensorCurrent {
    /// Whether this entry holds a value.
    pub fn is_ok(&self) -> bool {
        matches!(self.outcome, CurrentOutcome::Ok { .. })
    }
}

/// Resolve current values for `ids`, returning one entry per id in order.
pub async fn resolve_latest(
    resolver: LatestReadingResolver,
    ids: Vec<String>,
    concurrency: usize,
) -> Vec<SensorCurrent> {
    let total = ids.len();

    let results: Vec<SensorCurrent> = stream::iter(ids)
        .map(|id| {
            let resolver = resolver.clone();
            async move {
                let lookup_id = id.clone();
                let joined =
                    tokio::task::spawn_blocking(move || resolve_current(&resolver, &lookup_id))
                        .await;

                let outcome = match joined {
                    Ok(Ok(value)) => CurrentOutcome::Ok {
                        reading: value.reading,
                        current_temperature: value.current_temperature,
                    },
                    Ok(Err(e)) => {
                        debug!("No current value for {}: {}", id, e);
                        CurrentOutcome::Error {
                            kind: e.kind().as_str(),
                            message: e.to_string(),
                        }
                    }
                    Err(e) => {
                        warn!("Lookup task for {} failed: {}", id, e);
                        CurrentOutcome::Error {
                            kind: "internal",
                            message: e.to_string(),
                        }
                    }
                };

                SensorCurrent { id, outcome }
            }
        })
        .buffered(concurrency.max(1))
        .collect()
        .await;

    let ok = results.iter().filter(|r| r.is_ok()).count();
    debug!("Resolved {}/{} sensor(s)", ok, total);

    results
}
