//! Current-value lookup.
//!
//! The current reading of an entity is the last row of its most recent day
//! file. Rows are taken in append order; timestamps are not re-sorted.

use tracing::debug;

use crate::error::{Error, Result};
use crate::models::StoredReading;
use crate::store::TimeSeriesStore;

/// Resolves the latest reading of an entity from a [`TimeSeriesStore`].
#[derive(Debug, Clone)]
pub struct LatestReadingResolver {
    store: TimeSeriesStore,
}

/// Result of resolving one entity in a batch.
#[derive(Debug)]
pub struct LatestLookup {
    /// The entity that was resolved.
    pub entity: String,
    /// Its latest reading, or why there is none.
    pub result: Result<StoredReading>,
}

impl LatestReadingResolver {
    /// Create a resolver over `store`.
    pub fn new(store: TimeSeriesStore) -> Self {
        Self { store }
    }

    /// The underlying store.
    pub fn store(&self) -> &TimeSeriesStore {
        &self.store
    }

    /// Last-appended reading in the entity's most recent day file.
    ///
    /// Fails with [`Error::NotFound`] if the entity has no day files and
    /// with [`Error::EmptyDay`] if the most recent one has no data rows.
    pub fn latest(&self, entity: &str) -> Result<StoredReading> {
        let day = self.store.latest_day_key(entity)?;
        let mut readings = self.store.read_day(entity, &day)?;

        let reading = readings.pop().ok_or_else(|| Error::EmptyDay {
            entity: entity.to_string(),
            day,
        })?;

        debug!("Latest reading for {} is from {}", entity, day);
        Ok(reading)
    }

    /// Numeric temperature of the latest reading.
    ///
    /// A stored temperature that is not a finite number fails with
    /// [`Error::InvalidTemperature`].
    pub fn current_temperature(&self, entity: &str) -> Result<f64> {
        self.latest(entity)?.temperature()
    }

    /// Resolve several entities, one result per entity in input order.
    ///
    /// Failures are recorded per entity and never stop the batch.
    pub fn latest_many<I, S>(&self, entities: I) -> Vec<LatestLookup>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        entities
            .into_iter()
            .map(|entity| {
                let entity = entity.into();
                let result = self.latest(&entity);
                LatestLookup { entity, result }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use thermolog_types::Reading;
    use time::macros::datetime;

    fn open_temp() -> (tempfile::TempDir, LatestReadingResolver) {
        let dir = tempfile::tempdir().unwrap();
        let store = TimeSeriesStore::open(dir.path()).unwrap();
        (dir, store.resolver())
    }

    #[test]
    fn test_latest_returns_last_appended() {
        let (_dir, resolver) = open_temp();
        let store = resolver.store();

        store
            .append(&Reading::new("s1", 5.0, datetime!(2021-11-27 10:00 UTC)))
            .unwrap();
        store
            .append(&Reading::new("s1", 7.0, datetime!(2021-11-27 11:00 UTC)))
            .unwrap();

        let latest = resolver.latest("s1").unwrap();
        assert_eq!(latest.temperature().unwrap(), 7.0);
        assert_eq!(latest.timestamp, "2021-11-27T11:00:00Z");
        assert_eq!(resolver.current_temperature("s1").unwrap(), 7.0);
    }

    #[test]
    fn test_latest_does_not_resort_by_timestamp() {
        let (_dir, resolver) = open_temp();
        let store = resolver.store();

        store
            .append(&Reading::new("s1", 7.0, datetime!(2021-11-27 11:00 UTC)))
            .unwrap();
        store
            .append(&Reading::new("s1", 5.0, datetime!(2021-11-27 10:00 UTC)))
            .unwrap();

        assert_eq!(resolver.current_temperature("s1").unwrap(), 5.0);
    }

    #[test]
    fn test_latest_uses_most_recent_day() {
        let (_dir, resolver) = open_temp();
        let store = resolver.store();

        store
            .append(&Reading::new("s1", 9.0, datetime!(2021-11-28 01:00 UTC)))
            .unwrap();
        store
            .append(&Reading::new("s1", 3.0, datetime!(2021-11-27 23:00 UTC)))
            .unwrap();

        assert_eq!(resolver.current_temperature("s1").unwrap(), 9.0);
    }

    #[test]
    fn test_latest_unknown_entity() {
        let (_dir, resolver) = open_temp();

        let err = resolver.latest("unknown-entity").unwrap_err();
        assert!(matches!(err, Error::NotFound { .. }));
        assert!(err.is_no_data());
    }

    #[test]
    fn test_latest_header_only_day_is_empty_day() {
        let (_dir, resolver) = open_temp();
        let store = resolver.store();

        store
            .append(&Reading::new("s1", 5.0, datetime!(2021-11-27 10:00 UTC)))
            .unwrap();
        let dir = store.entity_dir("s1").unwrap();
        fs::write(
            dir.join("2021-11-28.csv"),
            "\"Id\",\"Temperature\",\"Timestamp\"\n",
        )
        .unwrap();

        let err = resolver.latest("s1").unwrap_err();
        match err {
            Error::EmptyDay { entity, day } => {
                assert_eq!(entity, "s1");
                assert_eq!(day.to_string(), "2021-11-28");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_current_temperature_non_numeric() {
        let (_dir, resolver) = open_temp();
        let dir = resolver.store().entity_dir("s1").unwrap();
        fs::create_dir(&dir).unwrap();
        fs::write(
            dir.join("2021-11-27.csv"),
            "Id,Temperature,Timestamp\ns1,warm,2021-11-27T10:00:00Z\n",
        )
        .unwrap();

        // Decoding is permissive, conversion is not
        assert_eq!(resolver.latest("s1").unwrap().temperature, "warm");
        let err = resolver.current_temperature("s1").unwrap_err();
        assert!(matches!(err, Error::InvalidTemperature { .. }));
    }

    #[test]
    fn test_latest_many_isolates_failures() {
        let (_dir, resolver) = open_temp();
        let store = resolver.store();

        store
            .append(&Reading::new("a", 1.0, datetime!(2021-11-27 10:00 UTC)))
            .unwrap();
        store
            .append(&Reading::new("c", 3.0, datetime!(2021-11-27 10:00 UTC)))
            .unwrap();

        let results = resolver.latest_many(["a", "missing", "c"]);

        let entities: Vec<&str> = results.iter().map(|r| r.entity.as_str()).collect();
        assert_eq!(entities, ["a", "missing", "c"]);
        assert_eq!(results[0].result.as_ref().unwrap().temperature, "1");
        assert!(matches!(results[1].result, Err(Error::NotFound { .. })));
        assert_eq!(results[2].result.as_ref().unwrap().temperature, "3");
    }
}
