//! Main store implementation.

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use thermolog_types::{DayKey, Reading, validate_entity_id};

use crate::append_log::{AppendLog, Appended, Durability};
use crate::codec;
use crate::error::{Error, Result};
use crate::models::StoredReading;
use crate::resolver::LatestReadingResolver;

/// File extension of day files.
pub const DAY_FILE_EXTENSION: &str = "csv";

/// File-based time-series store with one directory per entity and one CSV
/// file per day.
///
/// ```text
/// <base>/<entity>/<YYYY-MM-DD>.csv
/// ```
///
/// The store holds no open handles and no in-memory state beyond its
/// configuration, so it is cheap to clone and safe to share between
/// threads. Every call is a separate blocking filesystem operation.
#[derive(Debug, Clone)]
pub struct TimeSeriesStore {
    base: PathBuf,
    durability: Durability,
}

impl TimeSeriesStore {
    /// Open or create a store rooted at `base`.
    pub fn open<P: AsRef<Path>>(base: P) -> Result<Self> {
        Self::with_durability(base, Durability::default())
    }

    /// Open or create a store with an explicit append durability.
    pub fn with_durability<P: AsRef<Path>>(base: P, durability: Durability) -> Result<Self> {
        let base = base.as_ref();

        if !base.exists() {
            fs::create_dir_all(base).map_err(|e| Error::unavailable(base, e))?;
        }

        info!(
            "Opening time-series store at {} ({:?})",
            base.display(),
            durability
        );

        Ok(Self {
            base: base.to_path_buf(),
            durability,
        })
    }

    /// Open the default store location.
    pub fn open_default() -> Result<Self> {
        Self::open(crate::default_data_dir())
    }

    /// Base directory of the store.
    pub fn base_dir(&self) -> &Path {
        &self.base
    }

    /// Durability applied to appends.
    pub fn durability(&self) -> Durability {
        self.durability
    }

    /// Resolver for current values backed by this store.
    pub fn resolver(&self) -> LatestReadingResolver {
        LatestReadingResolver::new(self.clone())
    }

    /// Directory holding an entity's day files.
    pub fn entity_dir(&self, entity: &str) -> Result<PathBuf> {
        validate_entity_id(entity)?;
        Ok(self.base.join(entity))
    }

    /// Path of the day file for `entity` on `day`.
    pub fn day_path(&self, entity: &str, day: &DayKey) -> Result<PathBuf> {
        Ok(self
            .entity_dir(entity)?
            .join(format!("{day}.{DAY_FILE_EXTENSION}")))
    }
}

// Write operations
impl TimeSeriesStore {
    /// Append a reading to its entity's day file.
    ///
    /// The entity directory and the day file are created on first use; the
    /// day file starts with the header row. Later calls for the same day
    /// append further rows. Returns the day key the reading was filed under.
    pub fn append(&self, reading: &Reading) -> Result<DayKey> {
        let dir = self.entity_dir(&reading.id)?;
        let row = codec::encode_row(reading)?;

        match fs::create_dir(&dir) {
            Ok(()) => debug!("Created entity directory {}", dir.display()),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {}
            Err(e) => return Err(Error::unavailable(&dir, e)),
        }

        let day = reading.day_key();
        let path = dir.join(format!("{day}.{DAY_FILE_EXTENSION}"));
        let log = AppendLog::new(path, self.durability);

        if log.append(&codec::header_row(), &[row])? == Appended::Created {
            info!("Started day file {} for {}", day, reading.id);
        }

        Ok(day)
    }
}

// Read operations
impl TimeSeriesStore {
    /// Read every reading of `entity` on `day`, oldest physical row first.
    ///
    /// The header row is skipped. The result is all-or-nothing: any read or
    /// decode failure discards rows decoded so far.
    pub fn read_day(&self, entity: &str, day: &DayKey) -> Result<Vec<StoredReading>> {
        let path = self.day_path(entity, day)?;

        let file = match File::open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(Error::NotFound {
                    entity: entity.to_string(),
                    day: Some(*day),
                });
            }
            Err(e) => return Err(Error::unavailable(&path, e)),
        };

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(file);

        let readings = reader
            .records()
            .map(|record| {
                let record = record.map_err(|e| Error::from_csv(e, &path))?;
                codec::decode_row(&record).map_err(|e| e.in_file(&path))
            })
            .collect::<Result<Vec<_>>>()?;

        debug!(
            "Read {} reading(s) from {}",
            readings.len(),
            path.display()
        );

        Ok(readings)
    }

    /// Most recent day key with a day file for `entity`.
    ///
    /// Only regular `.csv` files whose stem is a valid `YYYY-MM-DD` count.
    /// Fails with [`Error::NotFound`] when the entity directory is missing
    /// or holds no day files.
    pub fn latest_day_key(&self, entity: &str) -> Result<DayKey> {
        self.scan_days(entity)?
            .into_iter()
            .max()
            .ok_or_else(|| Error::NotFound {
                entity: entity.to_string(),
                day: None,
            })
    }

    /// All day keys for `entity`, oldest first.
    ///
    /// An existing entity directory without day files yields an empty list.
    pub fn list_days(&self, entity: &str) -> Result<Vec<DayKey>> {
        let mut days = self.scan_days(entity)?;
        days.sort_unstable();
        Ok(days)
    }

    /// Ids of all entities with a directory in the store, sorted.
    pub fn list_entities(&self) -> Result<Vec<String>> {
        let entries = fs::read_dir(&self.base).map_err(|e| Error::unavailable(&self.base, e))?;

        let mut entities = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| Error::unavailable(&self.base, e))?;
            let file_type = entry
                .file_type()
                .map_err(|e| Error::unavailable(&entry.path(), e))?;
            if !file_type.is_dir() {
                continue;
            }

            match entry.file_name().into_string() {
                Ok(name) if validate_entity_id(&name).is_ok() => entities.push(name),
                Ok(_) | Err(_) => {
                    warn!("Skipping unexpected entry {}", entry.path().display());
                }
            }
        }

        entities.sort();
        Ok(entities)
    }

    /// Day keys of an entity's directory in listing order.
    fn scan_days(&self, entity: &str) -> Result<Vec<DayKey>> {
        let dir = self.entity_dir(entity)?;

        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(Error::NotFound {
                    entity: entity.to_string(),
                    day: None,
                });
            }
            Err(e) => return Err(Error::unavailable(&dir, e)),
        };

        let mut days = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| Error::unavailable(&dir, e))?;
            let path = entry.path();

            if entry.file_type().map(|t| t.is_dir()).unwrap_or(true) {
                continue;
            }
            if path.extension().and_then(|e| e.to_str()) != Some(DAY_FILE_EXTENSION) {
                continue;
            }

            match path
                .file_stem()
                .and_then(|s| s.to_str())
                .map(DayKey::parse)
            {
                Some(Ok(day)) => days.push(day),
                _ => debug!("Ignoring non-day file {}", path.display()),
            }
        }

        Ok(days)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    fn day(s: &str) -> DayKey {
        s.parse().unwrap()
    }

    fn open_temp() -> (tempfile::TempDir, TimeSeriesStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = TimeSeriesStore::open(dir.path().join("csv")).unwrap();
        (dir, store)
    }

    #[test]
    fn test_open_creates_base_dir() {
        let (_dir, store) = open_temp();
        assert!(store.base_dir().is_dir());
        assert!(store.list_entities().unwrap().is_empty());
    }

    #[test]
    fn test_append_writes_header_and_row() {
        let (_dir, store) = open_temp();
        let reading = Reading::new("norte-a", 4.5, datetime!(2021-11-27 10:00 UTC));

        let key = store.append(&reading).unwrap();
        assert_eq!(key, day("2021-11-27"));

        let path = store.day_path("norte-a", &key).unwrap();
        assert!(path.ends_with("norte-a/2021-11-27.csv"));

        let content = fs::read_to_string(path).unwrap();
        assert_eq!(
            content,
            "\"Id\",\"Temperature\",\"Timestamp\"\n\
             \"norte-a\",\"4.5\",\"2021-11-27T10:00:00Z\"\n"
        );
    }

    #[test]
    fn test_append_then_read_preserves_order() {
        let (_dir, store) = open_temp();
        let readings: Vec<Reading> = [(5.0, 10), (7.0, 11), (6.5, 9)]
            .into_iter()
            .map(|(t, h)| {
                Reading::new(
                    "s1",
                    t,
                    datetime!(2021-11-27 00:00 UTC) + time::Duration::hours(h),
                )
            })
            .collect();

        for reading in &readings {
            store.append(reading).unwrap();
        }

        let stored = store.read_day("s1", &day("2021-11-27")).unwrap();
        let decoded: Vec<Reading> = stored.iter().map(|s| s.to_reading().unwrap()).collect();

        // File order, not timestamp order
        assert_eq!(decoded, readings);
    }

    #[test]
    fn test_append_existing_directory_is_idempotent() {
        let (_dir, store) = open_temp();
        fs::create_dir(store.entity_dir("s1").unwrap()).unwrap();

        store
            .append(&Reading::new("s1", 1.0, datetime!(2021-11-26 08:00 UTC)))
            .unwrap();
        store
            .append(&Reading::new("s1", 2.0, datetime!(2021-11-27 08:00 UTC)))
            .unwrap();
        store
            .append(&Reading::new("s1", 3.0, datetime!(2021-11-27 09:00 UTC)))
            .unwrap();

        assert_eq!(store.read_day("s1", &day("2021-11-26")).unwrap().len(), 1);
        assert_eq!(store.read_day("s1", &day("2021-11-27")).unwrap().len(), 2);
    }

    #[test]
    fn test_latest_day_key_ignores_creation_order() {
        let (_dir, store) = open_temp();
        for ts in [
            datetime!(2021-11-27 10:00 UTC),
            datetime!(2021-11-28 10:00 UTC),
            datetime!(2021-11-26 10:00 UTC),
        ] {
            store.append(&Reading::new("e", 1.0, ts)).unwrap();
        }

        assert_eq!(store.latest_day_key("e").unwrap(), day("2021-11-28"));
        assert_eq!(
            store.list_days("e").unwrap(),
            vec![day("2021-11-26"), day("2021-11-27"), day("2021-11-28")]
        );
    }

    #[test]
    fn test_latest_day_key_ignores_stray_files() {
        let (_dir, store) = open_temp();
        store
            .append(&Reading::new("e", 1.0, datetime!(2021-11-27 10:00 UTC)))
            .unwrap();

        let dir = store.entity_dir("e").unwrap();
        fs::write(dir.join("notes.csv"), "x").unwrap();
        fs::write(dir.join("2099-01-01.bak"), "x").unwrap();
        fs::create_dir(dir.join("2099-01-02.csv")).unwrap();

        assert_eq!(store.latest_day_key("e").unwrap(), day("2021-11-27"));
    }

    #[test]
    fn test_latest_day_key_not_found() {
        let (_dir, store) = open_temp();

        let err = store.latest_day_key("unknown-entity").unwrap_err();
        assert!(matches!(err, Error::NotFound { day: None, .. }));

        // Directory present but no day files
        fs::create_dir(store.entity_dir("empty").unwrap()).unwrap();
        let err = store.latest_day_key("empty").unwrap_err();
        assert!(matches!(err, Error::NotFound { .. }));
        assert!(store.list_days("empty").unwrap().is_empty());
    }

    #[test]
    fn test_read_day_not_found() {
        let (_dir, store) = open_temp();

        let err = store
            .read_day("unknown-entity", &day("2021-01-01"))
            .unwrap_err();
        match err {
            Error::NotFound { entity, day: Some(d) } => {
                assert_eq!(entity, "unknown-entity");
                assert_eq!(d.to_string(), "2021-01-01");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_cross_day_isolation() {
        let (_dir, store) = open_temp();
        store
            .append(&Reading::new("e", 1.0, datetime!(2021-11-27 23:59 UTC)))
            .unwrap();
        store
            .append(&Reading::new("e", 2.0, datetime!(2021-11-28 00:01 UTC)))
            .unwrap();

        let next_day = store.read_day("e", &day("2021-11-28")).unwrap();
        assert_eq!(next_day.len(), 1);
        assert_eq!(next_day[0].temperature, "2");
        assert!(next_day.iter().all(|r| r.timestamp.starts_with("2021-11-28")));
    }

    #[test]
    fn test_read_day_header_only_is_empty() {
        let (_dir, store) = open_temp();
        let dir = store.entity_dir("e").unwrap();
        fs::create_dir(&dir).unwrap();
        fs::write(dir.join("2021-11-27.csv"), "\"Id\",\"Temperature\",\"Timestamp\"\n").unwrap();
        fs::write(dir.join("2021-11-28.csv"), "").unwrap();

        assert!(store.read_day("e", &day("2021-11-27")).unwrap().is_empty());
        assert!(store.read_day("e", &day("2021-11-28")).unwrap().is_empty());
    }

    #[test]
    fn test_read_day_accepts_unquoted_rows() {
        let (_dir, store) = open_temp();
        let dir = store.entity_dir("norte-a").unwrap();
        fs::create_dir(&dir).unwrap();
        fs::write(
            dir.join("2021-11-27.csv"),
            "Id,Temperature,Timestamp\nnorte-a,3,2021-11-27T02:44:26.017Z\n",
        )
        .unwrap();

        let readings = store.read_day("norte-a", &day("2021-11-27")).unwrap();
        assert_eq!(readings.len(), 1);
        assert_eq!(readings[0].temperature().unwrap(), 3.0);
        assert_eq!(readings[0].timestamp, "2021-11-27T02:44:26.017Z");
    }

    #[test]
    fn test_read_day_short_row_is_malformed() {
        let (_dir, store) = open_temp();
        store
            .append(&Reading::new("e", 1.0, datetime!(2021-11-27 10:00 UTC)))
            .unwrap();
        let path = store.day_path("e", &day("2021-11-27")).unwrap();
        let mut content = fs::read_to_string(&path).unwrap();
        content.push_str("\"e\",\"2\"\n");
        fs::write(&path, content).unwrap();

        let err = store.read_day("e", &day("2021-11-27")).unwrap_err();
        match err {
            Error::MalformedRecord { path: p, line, .. } => {
                assert_eq!(p, path);
                assert_eq!(line, Some(3));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_invalid_entity_ids_are_rejected() {
        let (_dir, store) = open_temp();

        let err = store
            .append(&Reading::new("../escape", 1.0, datetime!(2021-11-27 10:00 UTC)))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));

        let err = store.read_day("", &day("2021-11-27")).unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
        assert!(store.list_entities().unwrap().is_empty());
    }

    #[test]
    fn test_append_non_finite_temperature_leaves_store_untouched() {
        let (_dir, store) = open_temp();
        store
            .append(&Reading::new("s1", 4.0, datetime!(2021-11-27 10:00 UTC)))
            .unwrap();

        let err = store
            .append(&Reading::new("s1", f64::INFINITY, datetime!(2021-11-27 11:00 UTC)))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidTemperature { .. }));

        let err = store
            .append(&Reading::new("s2", f64::NAN, datetime!(2021-11-27 11:00 UTC)))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidTemperature { .. }));

        assert_eq!(store.read_day("s1", &day("2021-11-27")).unwrap().len(), 1);
        assert_eq!(store.resolver().current_temperature("s1").unwrap(), 4.0);
        assert_eq!(store.list_entities().unwrap(), vec!["s1"]);
    }

    #[test]
    fn test_unopenable_day_file_is_unavailable() {
        let (_dir, store) = open_temp();
        store
            .append(&Reading::new("e", 1.0, datetime!(2021-11-26 10:00 UTC)))
            .unwrap();
        // A directory where the day file should be cannot be appended to.
        let path = store.day_path("e", &day("2021-11-27")).unwrap();
        fs::create_dir(&path).unwrap();

        let err = store
            .append(&Reading::new("e", 2.0, datetime!(2021-11-27 10:00 UTC)))
            .unwrap_err();
        match err {
            Error::StoreUnavailable { path: p, .. } => assert_eq!(p, path),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_missing_base_is_unavailable() {
        let (_dir, store) = open_temp();
        fs::remove_dir(store.base_dir()).unwrap();

        let err = store
            .append(&Reading::new("e", 1.0, datetime!(2021-11-27 10:00 UTC)))
            .unwrap_err();
        assert!(matches!(err, Error::StoreUnavailable { .. }));

        let err = store.list_entities().unwrap_err();
        assert!(matches!(err, Error::StoreUnavailable { .. }));
    }

    #[test]
    fn test_list_entities() {
        let (_dir, store) = open_temp();
        for id in ["sul-b", "norte-a"] {
            store
                .append(&Reading::new(id, 1.0, datetime!(2021-11-27 10:00 UTC)))
                .unwrap();
        }
        fs::write(store.base_dir().join("README"), "x").unwrap();

        assert_eq!(store.list_entities().unwrap(), vec!["norte-a", "sul-b"]);
    }

    #[test]
    fn test_concurrent_appends_all_land() {
        let (_dir, store) = open_temp();
        let base = datetime!(2021-11-27 10:00 UTC);

        std::thread::scope(|s| {
            for worker in 0..4 {
                let store = store.clone();
                s.spawn(move || {
                    for i in 0..25 {
                        let ts = base + time::Duration::seconds(worker * 100 + i);
                        store.append(&Reading::new("shared", i as f64, ts)).unwrap();
                    }
                });
            }
        });

        let readings = store.read_day("shared", &day("2021-11-27")).unwrap();
        assert_eq!(readings.len(), 100);
    }
}
