//! Shared preference store.
//!
//! A flat string-keyed map persisted as JSON. Every surface holds its own
//! [`PrefHandle`]; a write through one handle replaces the stored value and is
//! announced to every *other* handle over a channel. Writes from other
//! processes are picked up by [`PreferenceStore::reload`], which announces the
//! keys that differ to every handle.
//!
//! The store does not validate values. Receivers do, and keep their previous
//! value when a change does not parse.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::sync::mpsc;

use flightwall_core::prefs::{PrefKey, Preferences};
use flightwall_core::types::{FlightwallError, Result};

/// One stored value changed. `value` is `None` when the key was removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrefChange {
    pub key: String,
    pub value: Option<String>,
}

struct Subscriber {
    id: u64,
    tx: mpsc::UnboundedSender<PrefChange>,
}

struct Shared {
    path: Option<PathBuf>,
    values: BTreeMap<String, String>,
    subscribers: Vec<Subscriber>,
    next_id: u64,
}

impl Shared {
    /// Notify every subscriber except `origin`, dropping closed ones.
    fn broadcast(&mut self, change: &PrefChange, origin: Option<u64>) {
        self.subscribers.retain(|s| {
            if Some(s.id) == origin {
                return true;
            }
            s.tx.send(change.clone()).is_ok()
        });
    }

    /// Write `values` to the backing file. The in-memory map is untouched.
    fn persist(&self, values: &BTreeMap<String, String>) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        let text = serde_json::to_string_pretty(values)
            .map_err(|e| FlightwallError::Decode(e.to_string()))?;
        std::fs::write(path, text)?;
        Ok(())
    }
}

fn read_file(path: &Path) -> Result<BTreeMap<String, String>> {
    if !path.exists() {
        return Ok(BTreeMap::new());
    }
    let text = std::fs::read_to_string(path)?;
    if text.trim().is_empty() {
        return Ok(BTreeMap::new());
    }
    serde_json::from_str(&text).map_err(|e| FlightwallError::Decode(e.to_string()))
}

#[derive(Clone)]
pub struct PreferenceStore {
    shared: Arc<Mutex<Shared>>,
}

impl PreferenceStore {
    /// Open (or create on first write) a JSON-backed store.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let values = read_file(&path)?;
        tracing::debug!(path = %path.display(), keys = values.len(), "preference store opened");
        Ok(Self::with_values(Some(path), values))
    }

    pub fn in_memory() -> Self {
        Self::with_values(None, BTreeMap::new())
    }

    fn with_values(path: Option<PathBuf>, values: BTreeMap<String, String>) -> Self {
        PreferenceStore {
            shared: Arc::new(Mutex::new(Shared {
                path,
                values,
                subscribers: Vec::new(),
                next_id: 0,
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Shared> {
        self.shared.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// A new handle that is notified of writes made through any other handle.
    pub fn subscribe(&self) -> PrefHandle {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut shared = self.lock();
        shared.next_id += 1;
        let id = shared.next_id;
        shared.subscribers.push(Subscriber { id, tx });
        PrefHandle {
            id,
            store: self.clone(),
            rx,
        }
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.lock().values.get(key).cloned()
    }

    pub fn entries(&self) -> Vec<(String, String)> {
        self.lock()
            .values
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    /// Preferences decoded from the stored values.
    pub fn preferences(&self) -> Preferences {
        let shared = self.lock();
        Preferences::from_entries(shared.values.iter().map(|(k, v)| (k.as_str(), v.as_str())))
    }

    fn write(&self, origin: Option<u64>, key: &str, value: Option<&str>) -> Result<()> {
        let mut shared = self.lock();
        if shared.values.get(key).map(String::as_str) == value {
            return Ok(());
        }
        // commit only once the file holds the new value
        let mut next = shared.values.clone();
        match value {
            Some(v) => next.insert(key.to_string(), v.to_string()),
            None => next.remove(key),
        };
        shared.persist(&next)?;
        shared.values = next;
        let change = PrefChange {
            key: key.to_string(),
            value: value.map(str::to_string),
        };
        shared.broadcast(&change, origin);
        Ok(())
    }

    /// Write without an originating handle; every handle is notified.
    pub fn set(&self, key: &str, value: &str) -> Result<()> {
        self.write(None, key, Some(value))
    }

    /// Drop a stored value so readers fall back to the default; every handle is notified.
    pub fn remove(&self, key: &str) -> Result<()> {
        self.write(None, key, None)
    }

    /// Re-read the backing file and announce every key that differs.
    /// Returns how many keys changed.
    pub fn reload(&self) -> Result<usize> {
        let mut shared = self.lock();
        let Some(path) = shared.path.clone() else {
            return Ok(0);
        };
        let fresh = read_file(&path)?;
        let mut changes = Vec::new();
        for (key, value) in &fresh {
            if shared.values.get(key) != Some(value) {
                changes.push(PrefChange {
                    key: key.clone(),
                    value: Some(value.clone()),
                });
            }
        }
        for key in shared.values.keys() {
            if !fresh.contains_key(key) {
                changes.push(PrefChange {
                    key: key.clone(),
                    value: None,
                });
            }
        }
        shared.values = fresh;
        for change in &changes {
            shared.broadcast(change, None);
        }
        if !changes.is_empty() {
            tracing::debug!(changed = changes.len(), "preferences reloaded from disk");
        }
        Ok(changes.len())
    }

    /// Spawn a task that reloads the file every `period`.
    pub fn watch(&self, period: Duration) -> tokio::task::JoinHandle<()> {
        let store = self.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                if let Err(e) = store.reload() {
                    tracing::warn!(error = %e, "preference reload failed");
                }
            }
        })
    }
}

/// One surface's view of the store.
pub struct PrefHandle {
    id: u64,
    store: PreferenceStore,
    rx: mpsc::UnboundedReceiver<PrefChange>,
}

impl PrefHandle {
    pub fn store(&self) -> &PreferenceStore {
        &self.store
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.store.get(key)
    }

    pub fn preferences(&self) -> Preferences {
        self.store.preferences()
    }

    /// Replace one value. Other handles are notified; this one is not.
    pub fn set(&self, key: &str, value: &str) -> Result<()> {
        self.store.write(Some(self.id), key, Some(value))
    }

    /// Store one field of `prefs` under its storage key.
    pub fn set_pref(&self, key: PrefKey, prefs: &Preferences) -> Result<()> {
        self.set(key.storage_key(), &prefs.encode(key))
    }

    /// Wait for the next change made elsewhere.
    pub async fn changed(&mut self) -> Option<PrefChange> {
        self.rx.recv().await
    }

    pub fn try_changed(&mut self) -> Option<PrefChange> {
        self.rx.try_recv().ok()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_writer_not_notified() {
        let store = PreferenceStore::in_memory();
        let mut a = store.subscribe();
        let mut b = store.subscribe();
        a.set("flightwall.range", "25").unwrap();
        assert!(a.try_changed().is_none());
        assert_eq!(
            b.try_changed(),
            Some(PrefChange {
                key: "flightwall.range".into(),
                value: Some("25".into())
            })
        );
        assert_eq!(b.get("flightwall.range").as_deref(), Some("25"));
    }

    #[test]
    fn test_unchanged_write_is_silent() {
        let store = PreferenceStore::in_memory();
        let a = store.subscribe();
        let mut b = store.subscribe();
        a.set("flightwall.speedUnit", "kts").unwrap();
        b.try_changed();
        a.set("flightwall.speedUnit", "kts").unwrap();
        assert!(b.try_changed().is_none());
    }

    #[test]
    fn test_last_writer_wins() {
        let store = PreferenceStore::in_memory();
        let a = store.subscribe();
        let b = store.subscribe();
        a.set("flightwall.range", "20").unwrap();
        b.set("flightwall.range", "30").unwrap();
        assert_eq!(store.preferences().range_nm, 30);
    }

    #[test]
    fn test_invalid_value_ignored_by_receiver() {
        let store = PreferenceStore::in_memory();
        let writer = store.subscribe();
        let mut reader = store.subscribe();
        let mut prefs = reader.preferences();
        assert_eq!(prefs.range_nm, 10);

        for raw in ["0", "51", "25"] {
            writer.set("flightwall.range", raw).unwrap();
            let change = reader.try_changed().unwrap();
            let _ = prefs.apply_storage(&change.key, change.value.as_deref().unwrap_or(""));
            if raw != "25" {
                assert_eq!(prefs.range_nm, 10, "{raw} should be rejected");
            }
        }
        assert_eq!(prefs.range_nm, 25);
    }

    #[test]
    fn test_persist_and_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prefs.json");
        let store = PreferenceStore::open(&path).unwrap();
        let handle = store.subscribe();
        let mut prefs = Preferences::default();
        prefs.apply(PrefKey::AltitudeUnit, "m").unwrap();
        handle.set_pref(PrefKey::AltitudeUnit, &prefs).unwrap();

        let reopened = PreferenceStore::open(&path).unwrap();
        assert_eq!(reopened.preferences(), prefs);
    }

    #[test]
    fn test_reload_announces_external_writes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prefs.json");
        let ours = PreferenceStore::open(&path).unwrap();
        let mut handle = ours.subscribe();

        // another process
        let theirs = PreferenceStore::open(&path).unwrap();
        theirs.set("flightwall.labelVerbosity", "full").unwrap();

        assert_eq!(ours.reload().unwrap(), 1);
        assert_eq!(
            handle.try_changed().unwrap().value.as_deref(),
            Some("full")
        );
        assert_eq!(ours.reload().unwrap(), 0);
    }

    #[test]
    fn test_remove_notifies_with_none() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prefs.json");
        let store = PreferenceStore::open(&path).unwrap();
        store.set("flightwall.range", "25").unwrap();
        let mut reader = store.subscribe();

        store.remove("flightwall.range").unwrap();
        assert_eq!(
            reader.try_changed(),
            Some(PrefChange {
                key: "flightwall.range".into(),
                value: None
            })
        );
        assert_eq!(PreferenceStore::open(&path).unwrap().get("flightwall.range"), None);

        // removing an absent key is silent
        store.remove("flightwall.range").unwrap();
        assert!(reader.try_changed().is_none());
    }

    #[test]
    fn test_dropped_handle_pruned() {
        let store = PreferenceStore::in_memory();
        let a = store.subscribe();
        drop(store.subscribe());
        a.set("k", "v").unwrap();
        assert_eq!(store.lock().subscribers.len(), 1);
    }

    #[test]
    fn test_failed_persist_keeps_previous_value() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "not a directory").unwrap();
        let store = PreferenceStore::open(blocker.join("prefs.json")).unwrap();
        let writer = store.subscribe();
        let mut reader = store.subscribe();

        assert!(writer.set("flightwall.range", "25").is_err());
        assert_eq!(store.get("flightwall.range"), None);
        assert!(reader.try_changed().is_none());

        // still not stored, so a retry fails again instead of passing silently
        assert!(writer.set("flightwall.range", "25").is_err());
        assert!(reader.try_changed().is_none());
    }

    #[tokio::test]
    async fn test_changed_awaits() {
        let store = PreferenceStore::in_memory();
        let mut reader = store.subscribe();
        let writer = store.subscribe();
        tokio::spawn(async move {
            writer.set("flightwall.range", "12").unwrap();
        });
        let change = reader.changed().await.unwrap();
        assert_eq!(change.value.as_deref(), Some("12"));
    }
}
