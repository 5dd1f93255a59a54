//! UPC lookup provider (UPCitemdb style).
//!
//! No paging: every call returns a capped item list. The trial endpoint needs
//! no key; paid plans send `user_key` and `key_type` headers.

use super::{array_field, read_json, shape_of};
use crate::config::{join_url, UpcConfig};
use crate::error::{CatalogError, Result};
use crate::federated::RawSearchResponse;
use crate::query::{CanonicalQuery, Source};
use crate::SourceAdapter;
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde_json::Value;
use tracing::debug;

const PROVIDER: &str = "upc lookup";

pub struct UpcAdapter {
    client: Client,
    config: UpcConfig,
}

/// Which endpoint a query maps onto.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpcRequest {
    /// `lookup?upc=<code>`
    Lookup(String),
    /// `search?s=<text>`
    Search(String),
}

impl UpcRequest {
    pub fn for_query(query: &CanonicalQuery) -> Self {
        if let Some(code) = query.numeric_gtin() {
            return UpcRequest::Lookup(code.to_string());
        }
        UpcRequest::Search(query.free_text().unwrap_or_default())
    }
}

impl UpcAdapter {
    pub fn new(client: Client, config: UpcConfig) -> Self {
        Self { client, config }
    }

    fn request(&self, request: &UpcRequest) -> RequestBuilder {
        let builder = match request {
            UpcRequest::Lookup(code) => self
                .client
                .get(join_url(&self.config.base_url, "lookup"))
                .query(&[("upc", code.as_str())]),
            UpcRequest::Search(text) => self
                .client
                .get(join_url(&self.config.base_url, "search"))
                .query(&[("s", text.as_str()), ("type", "product")]),
        };
        match self.config.user_key.as_deref() {
            Some(key) => builder
                .header("user_key", key)
                .header("key_type", self.config.key_type.as_str()),
            None => builder,
        }
    }

    async fn send(&self, request: &UpcRequest) -> Result<Vec<Value>> {
        debug!(?request, "upc request");
        let response = self.request(request).send().await?;
        parse_items(read_json(PROVIDER, response).await?)
    }
}

/// Parse `{code, total, offset, items: [...]}`. `total`/`offset` describe the
/// capped list only and are ignored.
pub fn parse_items(body: Value) -> Result<Vec<Value>> {
    let map = match body {
        Value::Object(map) => map,
        other => {
            return Err(CatalogError::MalformedResponse(format!(
                "{}: expected object, got {}",
                PROVIDER,
                shape_of(&other)
            )))
        }
    };
    if !map.contains_key("items") {
        let detail = map
            .get("message")
            .or_else(|| map.get("code"))
            .and_then(Value::as_str)
            .unwrap_or("no 'items' in body");
        return Err(CatalogError::MalformedResponse(format!("{}: {}", PROVIDER, detail)));
    }
    array_field(&map, "items")
        .ok_or_else(|| CatalogError::MalformedResponse(format!("{}: 'items' is not an array", PROVIDER)))
}

#[async_trait]
impl SourceAdapter for UpcAdapter {
    fn source(&self) -> Source {
        Source::Upc
    }

    fn description(&self) -> &'static str {
        "UPC barcode lookup (capped result list, no paging)"
    }

    async fn search(&self, query: &CanonicalQuery) -> Result<RawSearchResponse> {
        let items = self.send(&UpcRequest::for_query(query)).await?;
        Ok(RawSearchResponse::returned_only(items))
    }

    async fn lookup_by_identifier(&self, id: &str) -> Result<Value> {
        let code = Source::Upc.native_id(id).trim();
        if code.is_empty() {
            return Err(CatalogError::InvalidInput("empty identifier".into()));
        }
        self.send(&UpcRequest::Lookup(code.to_string()))
            .await?
            .into_iter()
            .next()
            .ok_or(CatalogError::NotFound)
    }
}
