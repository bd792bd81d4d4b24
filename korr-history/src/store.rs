use crate::codec::{read_key_and_timestamp, read_u32, write_key_and_timestamp};
use crate::error::HistoryError;
use korr_core::key::AlertTypeKey;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

/// Chronological occurrence list for one alert type. `count` is always
/// `occurrences.len()` — kept as a separate getter rather than a field to
/// make the invariant unconditionally true rather than merely maintained.
#[derive(Debug, Clone, Default)]
pub struct HistoryEntry {
    occurrences: Vec<i64>,
}

impl HistoryEntry {
    pub fn count(&self) -> usize {
        self.occurrences.len()
    }

    pub fn occurrences(&self) -> &[i64] {
        &self.occurrences
    }

    fn insert_sorted(&mut self, timestamp: i64) {
        let pos = self
            .occurrences
            .iter()
            .position(|&t| t > timestamp)
            .unwrap_or(self.occurrences.len());
        self.occurrences.insert(pos, timestamp);
    }
}

/// Flat-file AlertTypeKey -> HistoryEntry store (spec.md §4.3).
#[derive(Debug)]
pub struct HistoryStore {
    path: PathBuf,
    entries: RwLock<HashMap<AlertTypeKey, HistoryEntry>>,
}

impl HistoryStore {
    /// Rebuild the in-memory map from disk. Missing file starts empty;
    /// a present but malformed file is a fatal error.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, HistoryError> {
        let path = path.into();
        let entries = if path.exists() {
            Self::read_file(&path)?
        } else {
            HashMap::new()
        };
        Ok(Self {
            path,
            entries: RwLock::new(entries),
        })
    }

    fn read_file(path: &Path) -> Result<HashMap<AlertTypeKey, HistoryEntry>, HistoryError> {
        let path_str = path.display().to_string();
        let file = std::fs::File::open(path).map_err(|source| HistoryError::Io {
            path: path_str.clone(),
            source,
        })?;
        let mut reader = BufReader::new(file);

        let num_type_keys = read_u32(&mut reader, &path_str)?;
        let mut map = HashMap::with_capacity(num_type_keys as usize);

        for _ in 0..num_type_keys {
            let list_length = read_u32(&mut reader, &path_str)?;
            let mut entry = HistoryEntry::default();
            let mut group_key: Option<AlertTypeKey> = None;

            for _ in 0..list_length {
                let (key, timestamp) = read_key_and_timestamp(&mut reader, &path_str)?;
                match group_key {
                    None => group_key = Some(key),
                    Some(expected) if expected != key => {
                        return Err(HistoryError::Malformed {
                            path: path_str.clone(),
                            reason: format!(
                                "inconsistent type key within group: {expected} vs {key}"
                            ),
                        })
                    }
                    _ => {}
                }
                entry.occurrences.push(timestamp);
            }

            let Some(key) = group_key else {
                continue;
            };
            map.insert(key, entry);
        }

        Ok(map)
    }

    /// Insert each `(key, timestamp)` occurrence in chronological order,
    /// then atomically rewrite the whole file.
    pub fn append(&self, batch: &[(AlertTypeKey, i64)]) -> Result<(), HistoryError> {
        {
            let mut entries = self.entries.write();
            for &(key, timestamp) in batch {
                entries.entry(key).or_default().insert_sorted(timestamp);
            }
        }
        self.rewrite()
    }

    fn rewrite(&self) -> Result<(), HistoryError> {
        let path_str = self.path.display().to_string();
        let dir = self
            .path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));

        let tmp = tempfile::NamedTempFile::new_in(dir).map_err(|source| HistoryError::Io {
            path: path_str.clone(),
            source,
        })?;

        {
            let mut writer = BufWriter::new(&tmp);
            let entries = self.entries.read();
            writer
                .write_all(&(entries.len() as u32).to_ne_bytes())
                .map_err(|source| HistoryError::Io {
                    path: path_str.clone(),
                    source,
                })?;

            for (key, entry) in entries.iter() {
                writer
                    .write_all(&(entry.occurrences.len() as u32).to_ne_bytes())
                    .map_err(|source| HistoryError::Io {
                        path: path_str.clone(),
                        source,
                    })?;
                for &timestamp in &entry.occurrences {
                    write_key_and_timestamp(&mut writer, *key, timestamp).map_err(|source| {
                        HistoryError::Io {
                            path: path_str.clone(),
                            source,
                        }
                    })?;
                }
            }
        }

        tmp.persist(&self.path)
            .map_err(|e| HistoryError::Io {
                path: path_str.clone(),
                source: e.error,
            })?;
        Ok(())
    }

    pub fn find(&self, key: &AlertTypeKey) -> Option<HistoryEntry> {
        self.entries.read().get(key).cloned()
    }

    /// Sum of all entry counts.
    pub fn total(&self) -> u64 {
        self.entries.read().values().map(|e| e.count() as u64).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_missing_file_starts_empty() {
        let store = HistoryStore::load("/nonexistent/history.db").unwrap();
        assert_eq!(store.total(), 0);
    }

    #[test]
    fn append_persists_and_reloads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.db");
        let store = HistoryStore::load(&path).unwrap();

        let key = AlertTypeKey::new(1, 1000, 1);
        store.append(&[(key, 100), (key, 50)]).unwrap();

        let entry = store.find(&key).unwrap();
        assert_eq!(entry.occurrences(), &[50, 100]);
        assert_eq!(entry.count(), 2);
        assert_eq!(store.total(), 2);

        let reloaded = HistoryStore::load(&path).unwrap();
        let entry = reloaded.find(&key).unwrap();
        assert_eq!(entry.occurrences(), &[50, 100]);
    }

    #[test]
    fn occurrences_stay_sorted_across_multiple_appends() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.db");
        let store = HistoryStore::load(&path).unwrap();
        let key = AlertTypeKey::new(1, 1000, 1);

        store.append(&[(key, 10)]).unwrap();
        store.append(&[(key, 5)]).unwrap();
        store.append(&[(key, 20)]).unwrap();

        let entry = store.find(&key).unwrap();
        assert_eq!(entry.occurrences(), &[5, 10, 20]);
    }

    #[test]
    fn find_missing_key_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.db");
        let store = HistoryStore::load(&path).unwrap();
        assert!(store.find(&AlertTypeKey::new(9, 9, 9)).is_none());
    }
}
