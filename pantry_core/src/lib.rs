// src/lib.rs
pub mod auth_store;
pub mod config;
pub mod connectors;
pub mod credentials;
pub mod error;
pub mod export;
pub mod federated;
pub mod query;
pub mod session;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::io::AsyncWrite;

pub use config::{CatalogConfig, ConfigStore};
pub use credentials::{BearerToken, CredentialManager};
pub use error::{CatalogError, Result};
pub use export::{ExportReport, SelectionExportCoordinator, SelectionSet};
pub use federated::{
    normalize, normalize_batch, CatalogItem, PageMeta, PaginationController, RawSearchResponse,
    ReportedTotal, SearchOrchestrator, SearchResultPage,
};
pub use query::{CanonicalQuery, Source};
pub use session::{CompletionStatus, SearchSession};

/// Writable byte sink for streamed exports.
pub type ExportSink<'a> = dyn AsyncWrite + Unpin + Send + 'a;

/// One external catalog provider.
///
/// Adapters own a provider's auth scheme, request shape and response envelope.
/// They return raw items untouched; normalization happens downstream.
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    /// Provenance tag for items from this adapter.
    fn source(&self) -> Source;

    fn description(&self) -> &'static str;

    /// Run one page of a search.
    async fn search(&self, query: &CanonicalQuery) -> Result<RawSearchResponse>;

    /// Fetch a single raw item by native or qualified id. Fails with `NotFound`.
    async fn lookup_by_identifier(&self, id: &str) -> Result<Value>;

    /// Whether the provider can produce an export file server-side.
    fn supports_export(&self) -> bool {
        false
    }

    /// Stream a server-generated export of `ids` into `sink`, returning bytes written.
    async fn export(
        &self,
        _query: &CanonicalQuery,
        _ids: &[String],
        _sink: &mut ExportSink<'_>,
    ) -> Result<u64> {
        Err(CatalogError::ExportUnsupported(self.source()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AdapterInfo {
    pub source: Source,
    pub description: String,
    pub supports_export: bool,
}

/// Registered adapters, one per source.
#[derive(Clone, Default)]
pub struct AdapterRegistry {
    adapters: HashMap<Source, Arc<dyn SourceAdapter>>,
}

impl AdapterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an adapter, replacing any previous one for the same source.
    pub fn register(&mut self, adapter: Arc<dyn SourceAdapter>) {
        self.adapters.insert(adapter.source(), adapter);
    }

    pub fn get(&self, source: Source) -> Option<Arc<dyn SourceAdapter>> {
        self.adapters.get(&source).cloned()
    }

    pub fn contains(&self, source: Source) -> bool {
        self.adapters.contains_key(&source)
    }

    /// Registered sources in natural order.
    pub fn sources(&self) -> Vec<Source> {
        let mut sources: Vec<Source> = self.adapters.keys().copied().collect();
        sources.sort();
        sources
    }

    pub fn list(&self) -> Vec<AdapterInfo> {
        self.sources()
            .into_iter()
            .filter_map(|source| self.adapters.get(&source))
            .map(|adapter| AdapterInfo {
                source: adapter.source(),
                description: adapter.description().to_string(),
                supports_export: adapter.supports_export(),
            })
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }
}

/// Register every adapter the configuration has credentials for.
///
/// Sources left out are reported as `NotConfigured` when a search asks for them.
pub fn build_registry(
    config: &CatalogConfig,
    client: reqwest::Client,
    credentials: Arc<CredentialManager>,
) -> AdapterRegistry {
    use connectors::{nutrition::NutritionAdapter, primary::PrimaryAdapter, upc::UpcAdapter, usda::UsdaAdapter};

    let mut registry = AdapterRegistry::new();
    registry.register(Arc::new(PrimaryAdapter::new(
        client.clone(),
        config.primary.clone(),
        credentials,
    )));
    registry.register(Arc::new(UpcAdapter::new(client.clone(), config.upc.clone())));

    match UsdaAdapter::new(client.clone(), config.usda.clone()) {
        Ok(adapter) => registry.register(Arc::new(adapter)),
        Err(e) => tracing::debug!(error = %e, "usda adapter not registered"),
    }
    match NutritionAdapter::new(client, config.nutrition.clone()) {
        Ok(adapter) => registry.register(Arc::new(adapter)),
        Err(e) => tracing::debug!(error = %e, "nutrition adapter not registered"),
    }
    registry
}
