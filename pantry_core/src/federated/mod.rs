//! Federated search across the catalog providers.
//!
//! This module provides:
//! - `CatalogItem`: the canonical item every provider payload is mapped onto
//! - `normalize`: declarative per-provider alias tables
//! - `SearchOrchestrator`: parallel multi-adapter search with partial failure
//! - `PaginationController`: page reconciliation across paging contracts
//!
//! # Example
//!
//! ```ignore
//! use pantry_core::federated::SearchOrchestrator;
//! use pantry_core::{CanonicalQuery, Source};
//!
//! let orchestrator = SearchOrchestrator::from_config(registry, &config);
//! let query = CanonicalQuery::builder().item_name("quinoa").build();
//! let page = orchestrator.run(&query, &[Source::Primary, Source::Usda]).await?;
//! ```

mod engine;
pub mod normalize;
mod pagination;
mod types;

pub use engine::{SearchOrchestrator, DEFAULT_ADAPTER_TIMEOUT};
pub use normalize::{normalize, normalize_batch};
pub use pagination::{PageMeta, PaginationController, ReportedTotal};
pub use types::{CatalogItem, NutritionFact, RawSearchResponse, SearchResultPage, SourceSummary};
