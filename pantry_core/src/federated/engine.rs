//! Federated search execution.
//!
//! Fans one canonical query out to every requested adapter in parallel, each
//! under its own deadline, and folds the answers into a single page.

use super::normalize::normalize_batch;
use super::pagination::PaginationController;
use super::types::{RawSearchResponse, SearchResultPage, SourceSummary};
use crate::config::CatalogConfig;
use crate::error::{CatalogError, Result, SourceError};
use crate::query::{CanonicalQuery, Source};
use crate::{AdapterRegistry, SourceAdapter};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::timeout;
use tracing::{debug, info, warn};

pub const DEFAULT_ADAPTER_TIMEOUT: Duration = Duration::from_secs(20);

/// Runs federated searches across the registered adapters.
#[derive(Clone)]
pub struct SearchOrchestrator {
    registry: Arc<AdapterRegistry>,
    priority: Vec<Source>,
    adapter_timeout: Duration,
}

impl SearchOrchestrator {
    pub fn new(registry: Arc<AdapterRegistry>) -> Self {
        Self {
            registry,
            priority: Source::ALL.to_vec(),
            adapter_timeout: DEFAULT_ADAPTER_TIMEOUT,
        }
    }

    /// Orchestrator using the configured priority and (clamped) timeout.
    pub fn from_config(registry: Arc<AdapterRegistry>, config: &CatalogConfig) -> Self {
        Self::new(registry)
            .with_priority(config.priority())
            .with_timeout(config.search.timeout())
    }

    pub fn with_priority(mut self, priority: Vec<Source>) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_timeout(mut self, adapter_timeout: Duration) -> Self {
        self.adapter_timeout = adapter_timeout;
        self
    }

    pub fn registry(&self) -> &AdapterRegistry {
        &self.registry
    }

    pub fn adapter_timeout(&self) -> Duration {
        self.adapter_timeout
    }

    /// `sources` in priority order, deduplicated. Unlisted sources keep their natural order at the end.
    pub fn ordered(&self, sources: &[Source]) -> Vec<Source> {
        let mut ordered: Vec<Source> = self
            .priority
            .iter()
            .filter(|s| sources.contains(s))
            .copied()
            .collect();
        let mut rest: Vec<Source> = sources
            .iter()
            .filter(|s| !ordered.contains(s))
            .copied()
            .collect();
        rest.sort();
        rest.dedup();
        ordered.extend(rest);
        ordered
    }

    /// Run one page of a federated search.
    ///
    /// An empty `sources` slice means "use the query's own source set".
    /// Individual source failures are reported on the page; the call only
    /// fails when every requested source failed.
    pub async fn run(&self, query: &CanonicalQuery, sources: &[Source]) -> Result<SearchResultPage> {
        let start = Instant::now();
        query.validate()?;

        let requested = if sources.is_empty() {
            query.sources()
        } else {
            sources
        };
        if requested.is_empty() {
            return Err(CatalogError::InvalidInput("no sources selected".into()));
        }
        let order = self.ordered(requested);
        debug!(sources = ?order, page = query.page_number(), "federated search");

        let limit = self.adapter_timeout;
        let futures: Vec<_> = order
            .iter()
            .map(|source| {
                let source = *source;
                let adapter = self.registry.get(source);
                async move {
                    let started = Instant::now();
                    let outcome = match adapter {
                        Some(adapter) => search_one(adapter, query, limit).await,
                        None => Err(CatalogError::NotConfigured(source)),
                    };
                    (source, outcome, started.elapsed().as_millis() as u64)
                }
            })
            .collect();

        let results = futures::future::join_all(futures).await;

        let row_offset = u64::from(query.page_number().saturating_sub(1)) * u64::from(query.page_size());
        let mut items = Vec::new();
        let mut completed = Vec::new();
        let mut errors: Vec<SourceError> = Vec::new();

        for (source, outcome, elapsed) in results {
            match outcome {
                Ok(raw) => {
                    let normalized = normalize_batch(&raw.items, source, row_offset);
                    debug!(%source, count = normalized.len(), ms = elapsed, "source answered");
                    completed.push(SourceSummary {
                        source,
                        count: normalized.len(),
                        total: raw.total,
                        duration_ms: Some(elapsed),
                    });
                    items.extend(normalized);
                }
                Err(error) => {
                    warn!(%source, code = error.code_str(), ms = elapsed, error = %error, "source failed");
                    errors.push(SourceError::new(source, error));
                }
            }
        }

        if completed.is_empty() {
            return Err(CatalogError::AggregateSearch(errors));
        }

        let totals: Vec<_> = completed.iter().map(|c| c.total).collect();
        let page = PaginationController::page_meta(query.page_number(), query.page_size(), &totals);
        let duration_ms = start.elapsed().as_millis() as u64;
        info!(
            items = items.len(),
            answered = completed.len(),
            failed = errors.len(),
            page = page.current_page,
            pages = page.total_pages,
            ms = duration_ms,
            "federated search complete"
        );

        Ok(SearchResultPage {
            items,
            page,
            completed,
            partial: !errors.is_empty(),
            failures: errors.iter().map(SourceError::to_failure).collect(),
            duration_ms: Some(duration_ms),
        })
    }
}

async fn search_one(
    adapter: Arc<dyn SourceAdapter>,
    query: &CanonicalQuery,
    limit: Duration,
) -> Result<RawSearchResponse> {
    match timeout(limit, adapter.search(query)).await {
        Ok(result) => result,
        Err(_) => Err(CatalogError::timeout(format!(
            "{} did not answer within {}ms",
            adapter.source(),
            limit.as_millis()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ordering_follows_priority() {
        let orchestrator = SearchOrchestrator::new(Arc::new(AdapterRegistry::new()))
            .with_priority(vec![Source::Upc, Source::Primary]);
        assert_eq!(
            orchestrator.ordered(&[Source::Nutrition, Source::Primary, Source::Usda, Source::Upc]),
            vec![Source::Upc, Source::Primary, Source::Usda, Source::Nutrition]
        );
        assert_eq!(
            orchestrator.ordered(&[Source::Usda, Source::Usda]),
            vec![Source::Usda]
        );
    }

    #[test]
    fn test_timeout_from_config_is_clamped() {
        let mut config = CatalogConfig::default();
        config.search.timeout_ms = 100;
        let orchestrator = SearchOrchestrator::from_config(Arc::new(AdapterRegistry::new()), &config);
        assert_eq!(orchestrator.adapter_timeout(), Duration::from_secs(15));
    }

    #[tokio::test]
    async fn test_blank_query_is_rejected() {
        let orchestrator = SearchOrchestrator::new(Arc::new(AdapterRegistry::new()));
        let query = CanonicalQuery::builder().item_name("   ").build();
        assert!(matches!(
            orchestrator.run(&query, &[Source::Primary]).await,
            Err(CatalogError::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn test_unregistered_sources_fail_in_aggregate() {
        let orchestrator = SearchOrchestrator::new(Arc::new(AdapterRegistry::new()));
        let query = CanonicalQuery::builder().item_name("rice").build();
        match orchestrator.run(&query, &[Source::Usda]).await {
            Err(CatalogError::AggregateSearch(errors)) => {
                assert_eq!(errors.len(), 1);
                assert!(matches!(errors[0].error, CatalogError::NotConfigured(Source::Usda)));
            }
            other => panic!("unexpected: {:?}", other.map(|p| p.items.len())),
        }
    }
}
