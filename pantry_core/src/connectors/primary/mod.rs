//! Primary catalog provider.
//!
//! Bearer-authenticated POST search with server-side paging. The same request
//! body drives lookups (`gtinNos=[id]`, `pageSize=1`) and spreadsheet export
//! (`pageSize=0`, `selectedrows=[ids]`).

use super::{check_status, read_json, shape_of};
use crate::config::PrimaryConfig;
use crate::credentials::CredentialManager;
use crate::error::{CatalogError, Result};
use crate::federated::RawSearchResponse;
use crate::query::{CanonicalQuery, Source};
use crate::{ExportSink, SourceAdapter};
use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use reqwest::{Client, Response, StatusCode};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

const PROVIDER: &str = "primary catalog";

pub struct PrimaryAdapter {
    client: Client,
    config: PrimaryConfig,
    credentials: Arc<CredentialManager>,
}

impl PrimaryAdapter {
    pub fn new(client: Client, config: PrimaryConfig, credentials: Arc<CredentialManager>) -> Self {
        Self {
            client,
            config,
            credentials,
        }
    }

    async fn post(&self, url: &str, body: &SearchBody<'_>) -> Result<Response> {
        let token = self.credentials.valid_token()?;
        debug!(url, page = body.page_number, size = body.page_size, "primary request");
        let response = self
            .client
            .post(url)
            .header(AUTHORIZATION, token.header_value())
            .json(body)
            .send()
            .await?;

        if response.status() == StatusCode::UNAUTHORIZED {
            warn!("primary catalog rejected the bearer credential; discarding it");
            if let Err(e) = self.credentials.invalidate() {
                warn!(error = %e, "could not discard rejected credential");
            }
        }
        Ok(response)
    }
}

/// Request body shared by search, lookup and export.
#[derive(Debug, Default, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SearchBody<'a> {
    pub gtin_nos: Vec<&'a str>,
    pub item_names: Vec<&'a str>,
    pub manufacturer_names: Vec<&'a str>,
    pub brand_names: Vec<&'a str>,
    pub item_categories: Vec<&'a str>,
    #[serde(rename = "vendornames")]
    pub vendor_names: Vec<&'a str>,
    pub page_number: u32,
    pub page_size: u32,
    #[serde(rename = "selectedrows")]
    pub selected_rows: Vec<&'a str>,
}

impl<'a> SearchBody<'a> {
    pub fn from_query(query: &'a CanonicalQuery) -> Self {
        fn one(value: Option<&str>) -> Vec<&str> {
            value.map(str::trim).filter(|v| !v.is_empty()).into_iter().collect()
        }
        Self {
            gtin_nos: one(query.gtin()),
            item_names: one(query.item_name()),
            manufacturer_names: one(query.manufacturer()),
            brand_names: one(query.brand()),
            item_categories: one(query.category()),
            vendor_names: one(query.vendor()),
            page_number: query.page_number(),
            page_size: query.page_size(),
            selected_rows: Vec::new(),
        }
    }

    pub fn lookup(gtin: &'a str) -> Self {
        Self {
            gtin_nos: vec![gtin],
            page_number: 1,
            page_size: 1,
            ..Default::default()
        }
    }
}

/// The response shapes the primary provider is known to return.
#[derive(Debug, PartialEq)]
pub enum Envelope {
    /// `{data: [...], totalCount, totalPages}`
    Paged {
        data: Vec<Value>,
        total_count: Option<u64>,
        total_pages: Option<u64>,
    },
    /// `[...]`
    List(Vec<Value>),
    /// `{...}`; an empty object means no result
    Single(Value),
}

impl Envelope {
    pub fn parse(body: Value) -> Result<Self> {
        match body {
            Value::Array(items) => Ok(Envelope::List(items)),
            Value::Object(map) if map.contains_key("data") => {
                let data = super::array_field(&map, "data").ok_or_else(|| {
                    CatalogError::MalformedResponse(format!(
                        "{}: 'data' is {}, expected array",
                        PROVIDER,
                        map.get("data").map(shape_of).unwrap_or("missing")
                    ))
                })?;
                Ok(Envelope::Paged {
                    data,
                    total_count: super::count_field(&map, "totalCount"),
                    total_pages: super::count_field(&map, "totalPages"),
                })
            }
            Value::Object(map) => Ok(Envelope::Single(Value::Object(map))),
            other => Err(CatalogError::MalformedResponse(format!(
                "{}: unexpected {} body",
                PROVIDER,
                shape_of(&other)
            ))),
        }
    }

    pub fn into_response(self, page_size: u32) -> RawSearchResponse {
        match self {
            Envelope::Paged {
                data,
                total_count: Some(total),
                ..
            } => RawSearchResponse::declared(data, total),
            Envelope::Paged {
                data,
                total_count: None,
                total_pages: Some(pages),
            } => RawSearchResponse::declared(data, pages.saturating_mul(u64::from(page_size))),
            Envelope::Paged { data, .. } => RawSearchResponse::returned_only(data),
            Envelope::List(items) => RawSearchResponse::returned_only(items),
            Envelope::Single(Value::Object(map)) if map.is_empty() => {
                RawSearchResponse::returned_only(Vec::new())
            }
            Envelope::Single(item) => RawSearchResponse::returned_only(vec![item]),
        }
    }
}

#[async_trait]
impl SourceAdapter for PrimaryAdapter {
    fn source(&self) -> Source {
        Source::Primary
    }

    fn description(&self) -> &'static str {
        "Primary product catalog (bearer credential, server-side paging and export)"
    }

    async fn search(&self, query: &CanonicalQuery) -> Result<RawSearchResponse> {
        let body = SearchBody::from_query(query);
        let response = self.post(&self.config.search_url(), &body).await?;
        let json = read_json(PROVIDER, response).await?;
        Ok(Envelope::parse(json)?.into_response(query.page_size()))
    }

    async fn lookup_by_identifier(&self, id: &str) -> Result<Value> {
        let native = Source::Primary.native_id(id).trim();
        if native.is_empty() {
            return Err(CatalogError::InvalidInput("empty identifier".into()));
        }
        let body = SearchBody::lookup(native);
        let response = self.post(&self.config.search_url(), &body).await?;
        let json = read_json(PROVIDER, response).await?;
        Envelope::parse(json)?
            .into_response(1)
            .items
            .into_iter()
            .next()
            .ok_or(CatalogError::NotFound)
    }

    fn supports_export(&self) -> bool {
        true
    }

    async fn export(&self, query: &CanonicalQuery, ids: &[String], sink: &mut ExportSink<'_>) -> Result<u64> {
        let mut body = SearchBody::from_query(query);
        body.page_number = 1;
        body.page_size = 0;
        body.selected_rows = ids.iter().map(|id| Source::Primary.native_id(id)).collect();

        let response = self.post(&self.config.export_url(), &body).await?;
        let mut response = check_status(PROVIDER, response)?;

        let mut written: u64 = 0;
        while let Some(chunk) = response.chunk().await? {
            sink.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        sink.flush().await?;
        debug!(bytes = written, rows = ids.len(), "primary export streamed");
        Ok(written)
    }
}
