pub mod auth;
pub mod config;
pub mod get;
pub mod search;
pub mod sources;

use pantry_core::auth_store::FileCredentialStore;
use pantry_core::connectors::build_client;
use pantry_core::{build_registry, AdapterRegistry, CatalogConfig, ConfigStore, CredentialManager};
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum CommandError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Export failed: {0}")]
    Export(String),

    #[error(transparent)]
    Catalog(#[from] pantry_core::CatalogError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML serialization error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

pub type Result<T> = std::result::Result<T, CommandError>;

/// Everything a command needs, assembled from the effective configuration.
pub struct Runtime {
    pub config: CatalogConfig,
    pub credentials: Arc<CredentialManager>,
    pub registry: Arc<AdapterRegistry>,
}

impl Runtime {
    pub fn load() -> Result<Self> {
        let config = ConfigStore::new_default().load_effective()?;
        let client = build_client(config.search.timeout())?;
        let credentials = Arc::new(CredentialManager::new(
            client.clone(),
            config.primary.token_url.clone(),
            Arc::new(FileCredentialStore::new_default()),
        ));
        let registry = Arc::new(build_registry(&config, client, Arc::clone(&credentials)));
        debug!(sources = ?registry.sources(), "adapters registered");
        Ok(Self {
            config,
            credentials,
            registry,
        })
    }
}
