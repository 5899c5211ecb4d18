//! CLI configuration utilities

use anyhow::{Context, Result};
use keystone_admin_client::{ClientConfig, FileStorage, MemoryStorage, TokenStore};
use std::path::{Path, PathBuf};
use std::sync::Arc;

const CREDENTIALS_FILE: &str = "credentials.json";

/// Fallback data directory when neither `--data-dir` nor `KEYSTONE_STATE_DIR` is set
pub fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("keystone-admin")
}

/// Load client configuration from an explicit file or the default sources
pub fn load_client_config(path: Option<&Path>) -> Result<ClientConfig> {
    match path {
        Some(path) => ClientConfig::load_from_file(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display())),
        None => ClientConfig::load().context("Failed to load configuration"),
    }
}

/// Path of the remembered-credentials file under `data_dir`
pub fn credentials_path(data_dir: &Path) -> PathBuf {
    data_dir.join(CREDENTIALS_FILE)
}

/// Token store for one CLI invocation.
///
/// The durable tier is the credentials file; the session tier lives only as
/// long as the process.
pub fn token_store(data_dir: &Path) -> Arc<TokenStore> {
    Arc::new(TokenStore::new(
        Arc::new(FileStorage::new(credentials_path(data_dir))),
        Arc::new(MemoryStorage::new()),
    ))
}
