//! Nutrition lookup provider (Nutritionix style).
//!
//! Authenticates with an `x-app-id`/`x-app-key` header pair. Text search
//! returns capped `branded` and `common` lists; code lookups return `foods`.

pub mod nutrients;

use super::{array_field, read_json, shape_of};
use crate::config::{join_url, NutritionConfig};
use crate::error::{CatalogError, Result};
use crate::federated::RawSearchResponse;
use crate::query::{is_numeric_code, CanonicalQuery, Source};
use crate::SourceAdapter;
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde_json::Value;
use tracing::debug;

const PROVIDER: &str = "nutrition lookup";

pub struct NutritionAdapter {
    client: Client,
    config: NutritionConfig,
    app_id: String,
    app_key: String,
}

/// Endpoint a call maps onto.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NutritionRequest {
    /// `search/item?upc=`
    ByUpc(String),
    /// `search/item?nix_item_id=`
    ByItemId(String),
    /// `search/instant?query=`
    Instant(String),
}

impl NutritionRequest {
    pub fn for_query(query: &CanonicalQuery) -> Self {
        match query.numeric_gtin() {
            Some(code) => NutritionRequest::ByUpc(code.to_string()),
            None => NutritionRequest::Instant(query.free_text().unwrap_or_default()),
        }
    }

    pub fn for_identifier(id: &str) -> Self {
        if is_numeric_code(id) {
            NutritionRequest::ByUpc(id.to_string())
        } else {
            NutritionRequest::ByItemId(id.to_string())
        }
    }
}

/// Known response bodies.
#[derive(Debug, PartialEq)]
pub enum Envelope {
    /// `{branded: [...], common: [...]}` from instant search
    Instant { branded: Vec<Value>, common: Vec<Value> },
    /// `{foods: [...]}` from item lookup
    Foods(Vec<Value>),
}

impl Envelope {
    pub fn parse(body: Value) -> Result<Self> {
        let malformed = |what: &str| CatalogError::MalformedResponse(format!("{}: {}", PROVIDER, what));
        let map = match body {
            Value::Object(map) => map,
            other => return Err(malformed(&format!("expected object, got {}", shape_of(&other)))),
        };
        if map.contains_key("foods") {
            let foods = array_field(&map, "foods").ok_or_else(|| malformed("'foods' is not an array"))?;
            return Ok(Envelope::Foods(foods));
        }
        if map.contains_key("branded") || map.contains_key("common") {
            let branded = array_field(&map, "branded").ok_or_else(|| malformed("'branded' is not an array"))?;
            let common = array_field(&map, "common").ok_or_else(|| malformed("'common' is not an array"))?;
            return Ok(Envelope::Instant { branded, common });
        }
        let detail = map
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("no 'foods', 'branded' or 'common' in body");
        Err(malformed(detail))
    }

    /// Branded items first, then common foods.
    pub fn into_items(self) -> Vec<Value> {
        match self {
            Envelope::Instant { mut branded, common } => {
                branded.extend(common);
                branded
            }
            Envelope::Foods(foods) => foods,
        }
    }
}

impl NutritionAdapter {
    /// Fails with `NotConfigured` unless both app id and key are set.
    pub fn new(client: Client, config: NutritionConfig) -> Result<Self> {
        let present = |v: &Option<String>| v.clone().filter(|s| !s.trim().is_empty());
        let (Some(app_id), Some(app_key)) = (present(&config.app_id), present(&config.app_key)) else {
            return Err(CatalogError::NotConfigured(Source::Nutrition));
        };
        Ok(Self {
            client,
            config,
            app_id,
            app_key,
        })
    }

    fn request(&self, request: &NutritionRequest) -> RequestBuilder {
        let builder = match request {
            NutritionRequest::ByUpc(code) => self
                .client
                .get(join_url(&self.config.base_url, "search/item"))
                .query(&[("upc", code.as_str())]),
            NutritionRequest::ByItemId(id) => self
                .client
                .get(join_url(&self.config.base_url, "search/item"))
                .query(&[("nix_item_id", id.as_str())]),
            NutritionRequest::Instant(text) => self
                .client
                .get(join_url(&self.config.base_url, "search/instant"))
                .query(&[("query", text.as_str())]),
        };
        builder
            .header("x-app-id", self.app_id.as_str())
            .header("x-app-key", self.app_key.as_str())
            .header("x-remote-user-id", "0")
    }

    async fn send(&self, request: &NutritionRequest) -> Result<Vec<Value>> {
        debug!(?request, "nutrition request");
        let response = self.request(request).send().await?;
        Ok(Envelope::parse(read_json(PROVIDER, response).await?)?.into_items())
    }
}

#[async_trait]
impl SourceAdapter for NutritionAdapter {
    fn source(&self) -> Source {
        Source::Nutrition
    }

    fn description(&self) -> &'static str {
        "Nutrition facts lookup (app id/key headers, capped result list)"
    }

    async fn search(&self, query: &CanonicalQuery) -> Result<RawSearchResponse> {
        let request = NutritionRequest::for_query(query);
        match self.send(&request).await {
            Ok(items) => Ok(RawSearchResponse::returned_only(items)),
            // an unknown barcode is an empty result, not a failure
            Err(CatalogError::NotFound) if matches!(request, NutritionRequest::ByUpc(_)) => {
                Ok(RawSearchResponse::returned_only(Vec::new()))
            }
            Err(e) => Err(e),
        }
    }

    async fn lookup_by_identifier(&self, id: &str) -> Result<Value> {
        let native = Source::Nutrition.native_id(id).trim();
        if native.is_empty() {
            return Err(CatalogError::InvalidInput("empty identifier".into()));
        }
        self.send(&NutritionRequest::for_identifier(native))
            .await?
            .into_iter()
            .next()
            .ok_or(CatalogError::NotFound)
    }
}
