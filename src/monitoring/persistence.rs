use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

use crate::control_system::q_learning::QTable;
use crate::error::{SimError, SimResult};
use crate::global_variables::{STORE_KEY_Q_TABLE, STORE_KEY_SESSION_TIME};

/// Minimal string key-value storage for learned state.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> SimResult<Option<String>>;
    fn set(&mut self, key: &str, value: String) -> SimResult<()>;
    fn remove(&mut self, key: &str) -> SimResult<()>;
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    values: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> SimResult<Option<String>> {
        Ok(self.values.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: String) -> SimResult<()> {
        self.values.insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&mut self, key: &str) -> SimResult<()> {
        self.values.remove(key);
        Ok(())
    }
}

/// All entries in one JSON object on disk. The file is re-read on every access so that
/// external edits are picked up; a missing file reads as empty.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> SimResult<BTreeMap<String, String>> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let json = fs::read_to_string(&self.path)?;
        if json.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        Ok(serde_json::from_str(&json)?)
    }

    fn write_all(&self, values: &BTreeMap<String, String>) -> SimResult<()> {
        let json = serde_json::to_string_pretty(values)?;
        fs::write(&self.path, json)?;
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> SimResult<Option<String>> {
        Ok(self.read_all()?.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: String) -> SimResult<()> {
        let mut values = self.read_all()?;
        values.insert(key.to_string(), value);
        self.write_all(&values)
    }

    fn remove(&mut self, key: &str) -> SimResult<()> {
        let mut values = self.read_all()?;
        if values.remove(key).is_some() {
            self.write_all(&values)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadOutcome {
    pub merged_entries: usize,
    pub session_seconds: Option<u64>,
}

/// Merges the persisted Q-table into `table` and reads the session timer. Failures are
/// logged and leave `table` as it was.
pub fn load_learning(store: &dyn KeyValueStore, table: &mut QTable) -> LoadOutcome {
    let mut outcome = LoadOutcome::default();

    match store.get(STORE_KEY_Q_TABLE) {
        Ok(Some(json)) => match table.merge_json(&json) {
            Ok(merged) => {
                log::info!("Loaded {} learned states", merged);
                outcome.merged_entries = merged;
            }
            Err(e) => log::warn!("Could not parse stored Q-table, starting fresh: {}", e),
        },
        Ok(None) => log::info!("No stored Q-table, starting fresh"),
        Err(e) => log::warn!("Could not read stored Q-table: {}", e),
    }

    match read_session_seconds(store) {
        Ok(seconds) => outcome.session_seconds = seconds,
        Err(e) => log::warn!("Could not read stored session time: {}", e),
    }
    outcome
}

fn read_session_seconds(store: &dyn KeyValueStore) -> SimResult<Option<u64>> {
    match store.get(STORE_KEY_SESSION_TIME)? {
        Some(raw) => raw
            .trim()
            .parse::<u64>()
            .map(Some)
            .map_err(|_| SimError::MalformedEntry(STORE_KEY_SESSION_TIME.to_string())),
        None => Ok(None),
    }
}

/// Writes the Q-table and session timer. Returns whether both writes succeeded; failures are
/// only logged.
pub fn save_learning(store: &mut dyn KeyValueStore, table: &QTable, session_seconds: u64) -> bool {
    let table_saved = table
        .to_json()
        .and_then(|json| store.set(STORE_KEY_Q_TABLE, json));
    if let Err(e) = &table_saved {
        log::warn!("Could not save Q-table: {}", e);
    }

    let time_saved = store.set(STORE_KEY_SESSION_TIME, session_seconds.to_string());
    if let Err(e) = &time_saved {
        log::warn!("Could not save session time: {}", e);
    }

    table_saved.is_ok() && time_saved.is_ok()
}

/// Drops the persisted session timer.
pub fn clear_session_time(store: &mut dyn KeyValueStore) -> bool {
    match store.remove(STORE_KEY_SESSION_TIME) {
        Ok(()) => true,
        Err(e) => {
            log::warn!("Could not clear session time: {}", e);
            false
        }
    }
}
