//! Settings store: synchronous reads plus change subscription

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::watch;
use tracing::info;

use crate::settings::{SettingKey, Settings};

/// Source of feature flags. Consumers read an immutable snapshot and subscribe to
/// replacements; a change never mutates a snapshot already handed out.
pub trait SettingsStore: Send + Sync {
    fn get(&self, keys: &[SettingKey]) -> HashMap<SettingKey, bool> {
        let snapshot = self.snapshot();
        keys.iter().map(|key| (*key, snapshot.get(*key))).collect()
    }

    fn snapshot(&self) -> Arc<Settings>;

    fn subscribe(&self) -> watch::Receiver<Arc<Settings>>;

    fn set(&self, key: SettingKey, value: bool);
}

/// In-process store publishing snapshots through a watch channel
pub struct MemorySettingsStore {
    tx: watch::Sender<Arc<Settings>>,
}

impl MemorySettingsStore {
    pub fn new(settings: Settings) -> Self {
        let (tx, _rx) = watch::channel(Arc::new(settings));
        Self { tx }
    }

    /// Replace every flag at once
    pub fn replace(&self, settings: Settings) {
        self.tx.send_replace(Arc::new(settings));
    }
}

impl Default for MemorySettingsStore {
    fn default() -> Self {
        Self::new(Settings::default())
    }
}

impl SettingsStore for MemorySettingsStore {
    fn snapshot(&self) -> Arc<Settings> {
        self.tx.borrow().clone()
    }

    fn subscribe(&self) -> watch::Receiver<Arc<Settings>> {
        self.tx.subscribe()
    }

    fn set(&self, key: SettingKey, value: bool) {
        let current = *self.snapshot();
        if current.get(key) == value {
            return;
        }
        info!(%key, value, "setting changed");
        self.tx.send_replace(Arc::new(current.with(key, value)));
    }
}
