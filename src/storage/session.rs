//! Per-session key/value storage.

use std::collections::HashMap;
use std::sync::Mutex;

/// Key/value storage scoped to one client session.
pub trait SessionStorage: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: String) -> anyhow::Result<()>;
}

/// In-process session storage. Contents go away with the value.
#[derive(Debug, Default)]
pub struct MemorySessionStorage {
    entries: Mutex<HashMap<String, String>>,
}

impl MemorySessionStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStorage for MemorySessionStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.entries
            .lock()
            .ok()
            .and_then(|entries| entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: String) -> anyhow::Result<()> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| anyhow::anyhow!("session storage lock poisoned"))?;
        entries.insert(key.to_string(), value);
        Ok(())
    }
}
