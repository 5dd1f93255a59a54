//! Core types for federated catalog results.

use super::pagination::{PageMeta, ReportedTotal};
use crate::error::SourceFailure;
use crate::query::Source;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// An adapter's parsed response: raw items plus whatever total the provider reported.
#[derive(Debug, Clone, PartialEq)]
pub struct RawSearchResponse {
    pub items: Vec<Value>,
    pub total: ReportedTotal,
}

impl RawSearchResponse {
    /// Response from a provider that declares a server-side total.
    pub fn declared(items: Vec<Value>, total: u64) -> Self {
        Self {
            items,
            total: ReportedTotal::Declared(total),
        }
    }

    /// Response from a provider that only tells us what it returned.
    pub fn returned_only(items: Vec<Value>) -> Self {
        let count = items.len() as u64;
        Self {
            items,
            total: ReportedTotal::ReturnedOnly(count),
        }
    }
}

/// One nutrient line, e.g. `Protein 12.5 g`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NutritionFact {
    pub name: String,
    pub amount: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
}

/// A canonical catalog item from any provider.
///
/// Every field except `id` and `provenance` is optional. Absent fields are
/// omitted from serialized output, never written as null.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogItem {
    /// Provider-qualified id, e.g. `usda:2345678`
    pub id: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub brand: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub manufacturer: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub gtin: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub vendor: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub serving_size: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub ingredients: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub allergens: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub nutrition: Vec<NutritionFact>,

    /// Which provider produced this item
    pub provenance: Source,

    /// Untouched provider payload for detail views
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub raw: Value,
}

impl CatalogItem {
    /// Empty item carrying only identity.
    pub fn new(id: impl Into<String>, provenance: Source) -> Self {
        Self {
            id: id.into(),
            name: None,
            brand: None,
            manufacturer: None,
            gtin: None,
            category: None,
            vendor: None,
            serving_size: None,
            ingredients: None,
            allergens: None,
            nutrition: Vec::new(),
            provenance,
            raw: Value::Null,
        }
    }

    /// The provider's own id, without the source prefix.
    pub fn native_id(&self) -> &str {
        self.provenance.native_id(&self.id)
    }

    /// Copy without the raw payload, for compact listings.
    pub fn without_raw(&self) -> Self {
        Self {
            raw: Value::Null,
            ..self.clone()
        }
    }
}

/// Results from one source within a page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceSummary {
    pub source: Source,
    pub count: usize,
    pub total: ReportedTotal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
}

/// One merged page of federated results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResultPage {
    /// Items in source priority order
    pub items: Vec<CatalogItem>,

    #[serde(flatten)]
    pub page: PageMeta,

    /// Sources that answered
    pub completed: Vec<SourceSummary>,

    /// Sources that failed (partial results)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<SourceFailure>,

    /// Whether any requested source failed
    #[serde(default)]
    pub partial: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
}

impl SearchResultPage {
    pub fn failed(&self, source: Source) -> bool {
        self.failures.iter().any(|f| f.source == source)
    }

    pub fn failure_for(&self, source: Source) -> Option<&SourceFailure> {
        self.failures.iter().find(|f| f.source == source)
    }

    /// Canonical ids in page order.
    pub fn ids(&self) -> Vec<String> {
        self.items.iter().map(|i| i.id.clone()).collect()
    }

    pub fn item(&self, id: &str) -> Option<&CatalogItem> {
        self.items.iter().find(|i| i.id == id)
    }

    pub fn total_pages(&self) -> u32 {
        self.page.total_pages
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_absent_fields_are_omitted() {
        let mut item = CatalogItem::new("upc:0001", Source::Upc);
        item.name = Some("Rolled Oats".into());
        let json = serde_json::to_value(&item).unwrap();
        let obj = json.as_object().unwrap();
        assert_eq!(obj.get("provenance"), Some(&json!("upc")));
        assert_eq!(obj.get("name"), Some(&json!("Rolled Oats")));
        assert!(!obj.contains_key("brand"));
        assert!(!obj.contains_key("nutrition"));
        assert!(!obj.contains_key("raw"));
        assert!(obj.values().all(|v| !v.is_null()));
    }

    #[test]
    fn test_native_id() {
        let item = CatalogItem::new("nutrition:abc:1", Source::Nutrition);
        assert_eq!(item.native_id(), "abc:1");
    }

    #[test]
    fn test_returned_only_counts_items() {
        let raw = RawSearchResponse::returned_only(vec![json!({}), json!({})]);
        assert_eq!(raw.total, ReportedTotal::ReturnedOnly(2));
    }
}
