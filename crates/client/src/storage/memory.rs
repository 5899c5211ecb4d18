//! Process-lifetime storage, used as the session tier

use super::StorageTier;
use crate::error::StorageError;
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

/// In-memory storage tier
#[derive(Debug, Default)]
pub struct MemoryStorage {
    items: RwLock<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored items
    pub fn len(&self) -> usize {
        self.items
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl StorageTier for MemoryStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        let items = self.items.read().unwrap_or_else(PoisonError::into_inner);
        Ok(items.get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut items = self.items.write().unwrap_or_else(PoisonError::into_inner);
        items.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        let mut items = self.items.write().unwrap_or_else(PoisonError::into_inner);
        items.remove(key);
        Ok(())
    }

    fn clear(&self) -> Result<(), StorageError> {
        let mut items = self.items.write().unwrap_or_else(PoisonError::into_inner);
        items.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_get_remove() {
        let storage = MemoryStorage::new();
        assert_eq!(storage.get_item("a").unwrap(), None);

        storage.set_item("a", "1").unwrap();
        storage.set_item("a", "2").unwrap();
        assert_eq!(storage.get_item("a").unwrap().as_deref(), Some("2"));

        storage.remove_item("a").unwrap();
        storage.remove_item("a").unwrap();
        assert!(storage.is_empty());
    }

    #[test]
    fn test_clear() {
        let storage = MemoryStorage::new();
        storage.set_item("a", "1").unwrap();
        storage.set_item("b", "2").unwrap();
        assert_eq!(storage.len(), 2);

        storage.clear().unwrap();
        assert!(storage.is_empty());
    }
}
