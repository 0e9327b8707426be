//! Durable key→value watermark store (spec §4.1).
//!
//! Backed by a single JSON file. `set` never leaves the file partially
//! written after a crash: the new contents are written to a temp file in
//! the same directory and renamed over the target, which is atomic on
//! the platforms this runs on (the same write-temp-then-rename shape
//! `ferrex-server`'s config loader uses for its own on-disk artifacts).
//! A missing file is treated as an empty map; concurrent writers are
//! explicitly out of scope (spec §4.1, single-writer assumption §9).

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, TimeZone, Utc};
use tracing::debug;

use crate::error::{CatalogError, Result};

/// The sentinel watermark value used before any row has ever been seen
/// for a given key (spec §3: "year 0001 UTC").
pub fn epoch_sentinel() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(1, 1, 1, 0, 0, 0).single().expect("year 1 is representable")
}

/// Formats a timestamp so that it round-trips through a lexicographic
/// string compare: fixed-width fractional seconds and an explicit
/// offset, mirroring the original ETL's `strftime('%Y-%m-%d %H:%M:%S.%f %z')`.
pub fn format_watermark(ts: DateTime<Utc>) -> String {
    ts.format("%Y-%m-%dT%H:%M:%S%.6f %z").to_string()
}

/// Parses a watermark string previously produced by [`format_watermark`].
pub fn parse_watermark(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f %z")
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|err| CatalogError::Internal(format!("malformed watermark `{raw}`: {err}")))
}

pub struct State {
    path: PathBuf,
    values: BTreeMap<String, String>,
}

impl State {
    /// Loads the state file at `path`, treating a missing file as an
    /// empty map.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let values = match fs::read_to_string(&path) {
            Ok(contents) => serde_json::from_str(&contents)?,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(err) => return Err(CatalogError::Internal(format!("reading state file: {err}"))),
        };
        Ok(Self { path, values })
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Returns the watermark for `key`, defaulting to [`epoch_sentinel`]
    /// when the key has never been set.
    pub fn get_watermark(&self, key: &str) -> Result<DateTime<Utc>> {
        match self.get(key) {
            Some(raw) => parse_watermark(raw),
            None => Ok(epoch_sentinel()),
        }
    }

    /// Durably persists `key -> value`, replacing the whole file.
    pub fn set(&mut self, key: &str, value: impl Into<String>) -> Result<()> {
        self.values.insert(key.to_string(), value.into());
        self.flush()
    }

    pub fn set_watermark(&mut self, key: &str, ts: DateTime<Utc>) -> Result<()> {
        self.set(key, format_watermark(ts))
    }

    fn flush(&self) -> Result<()> {
        let serialized = serde_json::to_string_pretty(&self.values)?;
        atomic_write(&self.path, serialized.as_bytes())
    }
}

fn atomic_write(path: &Path, contents: &[u8]) -> Result<()> {
    let dir = path.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or_else(|| Path::new("."));
    let mut temp = tempfile::NamedTempFile::new_in(dir)
        .map_err(|err| CatalogError::Internal(format!("creating temp state file: {err}")))?;
    use std::io::Write;
    temp.write_all(contents)
        .map_err(|err| CatalogError::Internal(format!("writing temp state file: {err}")))?;
    temp.flush()
        .map_err(|err| CatalogError::Internal(format!("flushing temp state file: {err}")))?;
    temp.persist(path)
        .map_err(|err| CatalogError::Internal(format!("renaming state file: {err}")))?;
    debug!(path = %path.display(), "state file persisted");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_is_empty_map() {
        let dir = tempfile::tempdir().unwrap();
        let state = State::open(dir.path().join("state.json")).unwrap();
        assert_eq!(state.get("films_modified"), None);
        assert_eq!(state.get_watermark("films_modified").unwrap(), epoch_sentinel());
    }

    #[test]
    fn set_then_get_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        let mut state = State::open(&path).unwrap();
        let ts = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        state.set_watermark("films_modified", ts).unwrap();

        let reopened = State::open(&path).unwrap();
        assert_eq!(reopened.get_watermark("films_modified").unwrap(), ts);
    }

    #[test]
    fn watermark_is_monotonic_under_lexicographic_compare() {
        let earlier = format_watermark(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());
        let later = format_watermark(Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap());
        assert!(earlier < later);
    }

    #[test]
    fn set_survives_across_instances_and_only_touches_target_key() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        let mut state = State::open(&path).unwrap();
        state.set("persons_modified", "a").unwrap();
        state.set("genres_modified", "b").unwrap();

        let reopened = State::open(&path).unwrap();
        assert_eq!(reopened.get("persons_modified"), Some("a"));
        assert_eq!(reopened.get("genres_modified"), Some("b"));
    }
}
