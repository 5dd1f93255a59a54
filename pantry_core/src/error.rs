// src/error.rs
use crate::query::Source;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serde JSON error: {0}")]
    SerdeJson(#[from] serde_json::Error),

    #[error("Authentication error: {0}")]
    Authentication(String),

    #[error("Rate limited by provider{}", retry_hint(.retry_after))]
    RateLimit { retry_after: Option<u64> },

    #[error("Network error: {message}")]
    Network { message: String, timeout: bool },

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Resource not found")]
    NotFound,

    #[error("All {} requested sources failed: {}", .0.len(), summarize(.0))]
    AggregateSearch(Vec<SourceError>),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Source '{0}' is not configured")]
    NotConfigured(Source),

    #[error("Source '{0}' has no server-side export")]
    ExportUnsupported(Source),

    #[error("Export failed: {0}")]
    Export(String),

    #[error("Credential store error: {0}")]
    Store(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

fn retry_hint(retry_after: &Option<u64>) -> String {
    match retry_after {
        Some(secs) => format!(" (retry after {}s)", secs),
        None => String::new(),
    }
}

fn summarize(errors: &[SourceError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

impl CatalogError {
    pub fn network(message: impl Into<String>) -> Self {
        CatalogError::Network {
            message: message.into(),
            timeout: false,
        }
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        CatalogError::Network {
            message: message.into(),
            timeout: true,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, CatalogError::Network { timeout: true, .. })
    }

    pub fn code_str(&self) -> &'static str {
        match self {
            CatalogError::Authentication(_) => "auth_failed",
            CatalogError::RateLimit { .. } => "rate_limited",
            CatalogError::Network { timeout: true, .. } => "timeout",
            CatalogError::Network { .. } => "network",
            CatalogError::MalformedResponse(_) | CatalogError::SerdeJson(_) => "malformed_response",
            CatalogError::NotFound => "not_found",
            CatalogError::AggregateSearch(_) => "all_sources_failed",
            CatalogError::InvalidInput(_) => "invalid_input",
            CatalogError::NotConfigured(_) => "not_configured",
            CatalogError::ExportUnsupported(_) => "export_unsupported",
            CatalogError::Export(_) => "export_failed",
            CatalogError::Store(_) => "store_error",
            CatalogError::Config(_) => "config_error",
            CatalogError::Io(_) => "io_error",
        }
    }
}

impl From<reqwest::Error> for CatalogError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            CatalogError::timeout(err.to_string())
        } else if err.is_decode() {
            CatalogError::MalformedResponse(err.to_string())
        } else {
            CatalogError::network(err.to_string())
        }
    }
}

/// A failure recorded for one source during a federated search.
///
/// The error itself is kept so callers that receive an `AggregateSearch`
/// can still match on what went wrong per source.
#[derive(Debug)]
pub struct SourceError {
    pub source: Source,
    pub error: CatalogError,
}

impl SourceError {
    pub fn new(source: Source, error: CatalogError) -> Self {
        Self { source, error }
    }

    /// Serializable flag form used in result pages.
    pub fn to_failure(&self) -> SourceFailure {
        SourceFailure {
            source: self.source,
            kind: self.error.code_str().to_string(),
            message: self.error.to_string(),
            is_timeout: self.error.is_timeout(),
        }
    }
}

impl fmt::Display for SourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.source, self.error)
    }
}

/// Per-source failure flag attached to a (partial) result page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceFailure {
    pub source: Source,
    /// Stable machine code, see [`CatalogError::code_str`].
    pub kind: String,
    pub message: String,
    #[serde(default)]
    pub is_timeout: bool,
}

pub type Result<T> = std::result::Result<T, CatalogError>;
