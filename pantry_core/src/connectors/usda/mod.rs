//! USDA FoodData Central style provider.
//!
//! API key travels as a query parameter. Search pages server-side and
//! declares `totalHits`.

use super::{array_field, count_field, read_json, shape_of};
use crate::config::{join_url, UsdaConfig};
use crate::error::{CatalogError, Result};
use crate::federated::RawSearchResponse;
use crate::query::{CanonicalQuery, Source};
use crate::SourceAdapter;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use tracing::debug;

const PROVIDER: &str = "usda";

pub struct UsdaAdapter {
    client: Client,
    config: UsdaConfig,
    api_key: String,
}

impl UsdaAdapter {
    /// Fails with `NotConfigured` when no API key is available.
    pub fn new(client: Client, config: UsdaConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or(CatalogError::NotConfigured(Source::Usda))?;
        Ok(Self {
            client,
            config,
            api_key,
        })
    }

    /// Query parameters for a search, without the key.
    pub fn search_params(&self, query: &CanonicalQuery) -> Vec<(&'static str, String)> {
        let mut params: Vec<(&'static str, String)> = Vec::new();
        let text = query
            .item_name()
            .map(str::to_string)
            .or_else(|| query.free_text())
            .unwrap_or_default();
        params.push(("query", text));
        if let Some(brand) = query.brand() {
            params.push(("brandName", brand.to_string()));
        }
        if let Some(owner) = query.manufacturer() {
            params.push(("brandOwner", owner.to_string()));
        }
        if let Some(gtin) = query.numeric_gtin() {
            params.push(("gtinUpc", gtin.to_string()));
        }
        if !self.config.data_types.is_empty() {
            params.push(("dataType", self.config.data_types.join(",")));
        }
        params.push(("pageSize", query.page_size().to_string()));
        params.push(("pageNumber", query.page_number().to_string()));
        params
    }
}

/// Parse a `foods/search` body: `{foods: [...], totalHits, currentPage, totalPages}`.
pub fn parse_search(body: Value) -> Result<RawSearchResponse> {
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
    if !map.contains_key("foods") {
        return Err(CatalogError::MalformedResponse(format!(
            "{}: search body has no 'foods'",
            PROVIDER
        )));
    }
    let foods = array_field(&map, "foods")
        .ok_or_else(|| CatalogError::MalformedResponse(format!("{}: 'foods' is not an array", PROVIDER)))?;
    Ok(match count_field(&map, "totalHits") {
        Some(total) => RawSearchResponse::declared(foods, total),
        None => RawSearchResponse::returned_only(foods),
    })
}

/// Parse a `food/{fdcId}` body: a single object.
pub fn parse_detail(body: Value) -> Result<Value> {
    match body {
        Value::Object(map) if map.is_empty() => Err(CatalogError::NotFound),
        Value::Object(map) => Ok(Value::Object(map)),
        // some deployments wrap single lookups in a one-element list
        Value::Array(mut items) if items.len() <= 1 => items.pop().ok_or(CatalogError::NotFound),
        other => Err(CatalogError::MalformedResponse(format!(
            "{}: detail body is {}",
            PROVIDER,
            shape_of(&other)
        ))),
    }
}

#[async_trait]
impl SourceAdapter for UsdaAdapter {
    fn source(&self) -> Source {
        Source::Usda
    }

    fn description(&self) -> &'static str {
        "USDA FoodData Central (API key, server-side paging)"
    }

    async fn search(&self, query: &CanonicalQuery) -> Result<RawSearchResponse> {
        let url = join_url(&self.config.base_url, "foods/search");
        let params = self.search_params(query);
        debug!(%url, ?params, "usda search");
        let response = self
            .client
            .get(&url)
            .query(&[("api_key", self.api_key.as_str())])
            .query(&params)
            .send()
            .await?;
        parse_search(read_json(PROVIDER, response).await?)
    }

    async fn lookup_by_identifier(&self, id: &str) -> Result<Value> {
        let native = Source::Usda.native_id(id).trim();
        if native.is_empty() || !native.bytes().all(|b| b.is_ascii_digit()) {
            return Err(CatalogError::InvalidInput(format!(
                "'{}' is not an FDC id",
                native
            )));
        }
        let url = join_url(&self.config.base_url, &format!("food/{}", urlencoding::encode(native)));
        debug!(%url, "usda lookup");
        let response = self
            .client
            .get(&url)
            .query(&[("api_key", self.api_key.as_str())])
            .send()
            .await?;
        parse_detail(read_json(PROVIDER, response).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::federated::ReportedTotal;
    use serde_json::json;

    fn adapter() -> UsdaAdapter {
        UsdaAdapter::new(
            Client::new(),
            UsdaConfig {
                api_key: Some("DEMO_KEY".into()),
                ..UsdaConfig::default()
            },
        )
        .unwrap()
    }

    #[test]
    fn test_requires_key() {
        assert!(matches!(
            UsdaAdapter::new(Client::new(), UsdaConfig::default()),
            Err(CatalogError::NotConfigured(Source::Usda))
        ));
    }

    #[test]
    fn test_search_params() {
        let query = CanonicalQuery::builder()
            .item_name("quinoa")
            .brand("Bob's")
            .gtin("039978005335")
            .page_number(2)
            .page_size(10)
            .build();
        let params = adapter().search_params(&query);
        let get = |k: &str| params.iter().find(|(key, _)| *key == k).map(|(_, v)| v.as_str());
        assert_eq!(get("query"), Some("quinoa"));
        assert_eq!(get("brandName"), Some("Bob's"));
        assert_eq!(get("gtinUpc"), Some("039978005335"));
        assert_eq!(get("dataType"), Some("Branded"));
        assert_eq!(get("pageNumber"), Some("2"));
        assert_eq!(get("pageSize"), Some("10"));
        assert!(params.iter().all(|(k, _)| *k != "api_key"));
    }

    #[test]
    fn test_query_falls_back_to_other_fields() {
        let query = CanonicalQuery::builder().category("Cereal").build();
        let params = adapter().search_params(&query);
        assert_eq!(params[0], ("query", "Cereal".to_string()));
    }

    #[test]
    fn test_parse_search() {
        let body = json!({"totalHits": 57, "currentPage": 1, "foods": [{"fdcId": 1}, {"fdcId": 2}]});
        let raw = parse_search(body).unwrap();
        assert_eq!(raw.items.len(), 2);
        assert_eq!(raw.total, ReportedTotal::Declared(57));

        let raw = parse_search(json!({"foods": []})).unwrap();
        assert_eq!(raw.total, ReportedTotal::ReturnedOnly(0));
    }

    #[test]
    fn test_parse_search_rejects_unknown_shapes() {
        assert!(matches!(parse_search(json!([])), Err(CatalogError::MalformedResponse(_))));
        assert!(matches!(
            parse_search(json!({"error": "bad key"})),
            Err(CatalogError::MalformedResponse(_))
        ));
        assert!(parse_search(json!({"foods": {"fdcId": 1}})).is_err());
    }

    #[test]
    fn test_parse_detail() {
        assert_eq!(parse_detail(json!({"fdcId": 5})).unwrap(), json!({"fdcId": 5}));
        assert!(matches!(parse_detail(json!({})), Err(CatalogError::NotFound)));
        assert!(matches!(parse_detail(json!([])), Err(CatalogError::NotFound)));
        assert!(matches!(parse_detail(json!(7)), Err(CatalogError::MalformedResponse(_))));
    }
}
