//! Credential storage tiers
//!
//! A tier is a small string key/value store with the same surface as the
//! browser `Storage` interface. The token store keeps a durable tier (survives
//! restarts) and a session tier (lives as long as the process).

mod file;
mod memory;

pub use file::FileStorage;
pub use memory::MemoryStorage;

use crate::error::StorageError;

/// Which tier a token pair lives in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    Session,
    Durable,
}

impl Tier {
    /// Tier selected by the "remember me" choice at login
    pub const fn from_remember(remember: bool) -> Self {
        if remember { Self::Durable } else { Self::Session }
    }
}

/// A key/value credential store
pub trait StorageTier: Send + Sync {
    /// Read a value
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Write a value, replacing any previous one
    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Remove a value; removing an absent key is not an error
    fn remove_item(&self, key: &str) -> Result<(), StorageError>;

    /// Remove every value in this tier
    fn clear(&self) -> Result<(), StorageError>;
}
