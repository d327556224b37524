use std::collections::BTreeMap;
use std::sync::Mutex;

use super::KvStore;
use crate::error::Result;

/// Process-local key-value store. Contents vanish with the value.
#[derive(Debug, Default)]
pub struct MemoryKvStore {
    entries: Mutex<BTreeMap<String, String>>,
}

impl MemoryKvStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_entries<T>(&self, f: impl FnOnce(&mut BTreeMap<String, String>) -> T) -> T {
        let mut entries = self
            .entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        f(&mut entries)
    }
}

impl KvStore for MemoryKvStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.with_entries(|entries| entries.get(key).cloned()))
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.with_entries(|entries| entries.insert(key.to_string(), value.to_string()));
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.with_entries(|entries| entries.remove(key));
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>> {
        Ok(self.with_entries(|entries| entries.keys().cloned().collect()))
    }

    fn clear(&self) -> Result<()> {
        self.with_entries(|entries| entries.clear());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_get_remove() {
        let kv = MemoryKvStore::new();
        kv.set("a", "1").unwrap();
        assert_eq!(kv.get("a").unwrap().as_deref(), Some("1"));

        kv.remove("a").unwrap();
        assert!(kv.get("a").unwrap().is_none());
    }

    #[test]
    fn test_clear_drops_every_key() {
        let kv = MemoryKvStore::new();
        kv.set("a", "1").unwrap();
        kv.set("b", "2").unwrap();
        assert_eq!(kv.keys().unwrap(), vec!["a".to_string(), "b".to_string()]);

        kv.clear().unwrap();
        assert!(kv.keys().unwrap().is_empty());
    }
}
