//! Cross-page selection and export.
//!
//! Sources with a server-side export get the selected ids and stream their
//! own spreadsheet straight into the caller's sink. For everything else a
//! delimited file is synthesized from the rows already fetched; selected ids
//! that are not on the current page are reported back, not dropped silently.

use crate::error::{CatalogError, Result};
use crate::federated::{CatalogItem, SearchResultPage};
use crate::query::{CanonicalQuery, Source};
use crate::{AdapterRegistry, ExportSink};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tracing::{info, warn};

/// Selected canonical ids. Session-scoped, never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionSet {
    ids: BTreeSet<String>,
}

impl SelectionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flip membership of `id`; returns whether it is selected afterwards.
    pub fn toggle(&mut self, id: &str) -> bool {
        if self.ids.remove(id) {
            false
        } else {
            self.ids.insert(id.to_string());
            true
        }
    }

    pub fn select(&mut self, id: impl Into<String>) {
        self.ids.insert(id.into());
    }

    /// Select every id on the current page. Earlier selections are kept.
    pub fn select_all<I, S>(&mut self, current_page_ids: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ids.extend(current_page_ids.into_iter().map(Into::into));
    }

    pub fn clear(&mut self) {
        self.ids.clear();
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.ids.iter().map(String::as_str)
    }
}

/// What an export produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ExportReport {
    /// Provider streamed its own file. `skipped` holds selected ids from
    /// other sources, which a provider export cannot carry.
    ServerStreamed { bytes: u64, skipped: Vec<String> },
    /// Delimited file built from fetched rows
    Synthesized { rows: usize, missing: Vec<String> },
}

pub const EXPORT_COLUMNS: [&str; 12] = [
    "id",
    "source",
    "name",
    "brand",
    "manufacturer",
    "gtin",
    "category",
    "vendor",
    "serving_size",
    "ingredients",
    "allergens",
    "nutrition",
];

pub struct SelectionExportCoordinator {
    registry: Arc<AdapterRegistry>,
    delimiter: char,
}

impl SelectionExportCoordinator {
    pub fn new(registry: Arc<AdapterRegistry>) -> Self {
        Self {
            registry,
            delimiter: ',',
        }
    }

    pub fn with_delimiter(mut self, delimiter: char) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Export the selection for `active_source` into `sink`.
    ///
    /// `page` is the last fetched page and `query` the query that produced it.
    pub async fn export(
        &self,
        selection: &SelectionSet,
        active_source: Source,
        page: &SearchResultPage,
        query: &CanonicalQuery,
        sink: &mut ExportSink<'_>,
    ) -> Result<ExportReport> {
        if selection.is_empty() {
            return Err(CatalogError::InvalidInput("nothing selected to export".into()));
        }

        if let Some(adapter) = self.registry.get(active_source).filter(|a| a.supports_export()) {
            let (ids, skipped) = server_ids(selection, active_source, page);
            if ids.is_empty() {
                return Err(CatalogError::InvalidInput(format!(
                    "no selected items come from {}",
                    active_source
                )));
            }
            let bytes = adapter
                .export(query, &ids, sink)
                .await
                .map_err(|e| CatalogError::Export(format!("{}: {}", active_source, e)))?;
            if !skipped.is_empty() {
                warn!(
                    source = %active_source,
                    skipped = skipped.len(),
                    ids = ?skipped,
                    "selected items from other sources were not exported"
                );
            }
            info!(source = %active_source, rows = ids.len(), bytes, "server export streamed");
            return Ok(ExportReport::ServerStreamed { bytes, skipped });
        }

        self.synthesize(selection, page, sink).await
    }

    /// Build a delimited file from the selected rows of `page`, whatever their source.
    pub async fn synthesize(
        &self,
        selection: &SelectionSet,
        page: &SearchResultPage,
        sink: &mut ExportSink<'_>,
    ) -> Result<ExportReport> {
        if selection.is_empty() {
            return Err(CatalogError::InvalidInput("nothing selected to export".into()));
        }
        let (rows, missing) = fetched_rows(selection, page);
        if !missing.is_empty() {
            warn!(
                missing = missing.len(),
                ids = ?missing,
                "selected items are not on the current page and were not exported"
            );
        }
        let content = write_delimited(&rows, self.delimiter);
        sink.write_all(content.as_bytes())
            .await
            .map_err(|e| CatalogError::Export(e.to_string()))?;
        sink.flush()
            .await
            .map_err(|e| CatalogError::Export(e.to_string()))?;
        info!(rows = rows.len(), "export synthesized from fetched rows");
        Ok(ExportReport::Synthesized {
            rows: rows.len(),
            missing,
        })
    }
}

/// Native ids for a server export: page order first, then selected ids of
/// that source from earlier pages. Selected ids that belong to another
/// source come back as the second list.
fn server_ids(
    selection: &SelectionSet,
    source: Source,
    page: &SearchResultPage,
) -> (Vec<String>, Vec<String>) {
    let mut ids: Vec<String> = page
        .items
        .iter()
        .filter(|item| item.provenance == source && selection.contains(&item.id))
        .map(|item| item.native_id().to_string())
        .collect();
    let mut skipped = Vec::new();
    for id in selection.ids() {
        match page.item(id) {
            Some(item) if item.provenance == source => continue,
            Some(_) => {
                skipped.push(id.to_string());
                continue;
            }
            None => {}
        }
        let native = source.native_id(id);
        if native.len() == id.len() {
            skipped.push(id.to_string());
        } else if !ids.iter().any(|known| known == native) {
            ids.push(native.to_string());
        }
    }
    (ids, skipped)
}

/// Selected rows in page order, plus selected ids not on the page.
pub fn fetched_rows<'a>(
    selection: &SelectionSet,
    page: &'a SearchResultPage,
) -> (Vec<&'a CatalogItem>, Vec<String>) {
    let rows: Vec<&CatalogItem> = page
        .items
        .iter()
        .filter(|item| selection.contains(&item.id))
        .collect();
    let missing = selection
        .ids()
        .filter(|id| page.item(id).is_none())
        .map(str::to_string)
        .collect();
    (rows, missing)
}

/// Header row plus one row per item, RFC 4180 quoting, CRLF line endings.
pub fn write_delimited(items: &[&CatalogItem], delimiter: char) -> String {
    let mut out = String::new();
    push_record(&mut out, EXPORT_COLUMNS.iter().map(|c| c.to_string()), delimiter);
    for item in items {
        let nutrition = item
            .nutrition
            .iter()
            .map(|f| match &f.unit {
                Some(unit) => format!("{} {} {}", f.name, f.amount, unit),
                None => format!("{} {}", f.name, f.amount),
            })
            .collect::<Vec<_>>()
            .join("; ");
        let opt = |v: &Option<String>| v.clone().unwrap_or_default();
        let fields = [
            item.id.clone(),
            item.provenance.to_string(),
            opt(&item.name),
            opt(&item.brand),
            opt(&item.manufacturer),
            opt(&item.gtin),
            opt(&item.category),
            opt(&item.vendor),
            opt(&item.serving_size),
            opt(&item.ingredients),
            opt(&item.allergens),
            nutrition,
        ];
        push_record(&mut out, fields.into_iter(), delimiter);
    }
    out
}

fn push_record(out: &mut String, fields: impl Iterator<Item = String>, delimiter: char) {
    for (i, field) in fields.enumerate() {
        if i > 0 {
            out.push(delimiter);
        }
        out.push_str(&quote(&field, delimiter));
    }
    out.push_str("\r\n");
}

fn quote(field: &str, delimiter: char) -> String {
    if field.contains(delimiter) || field.contains(['"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}
