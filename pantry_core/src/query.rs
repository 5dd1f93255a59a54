//! Canonical query model shared by every provider adapter.

use crate::error::CatalogError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Default page size when a caller does not pick one.
pub const DEFAULT_PAGE_SIZE: u32 = 20;

/// Provenance tag identifying which external provider produced an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Source {
    /// Primary catalog provider (bearer credential)
    Primary,
    /// USDA-style food data provider (API key query parameter)
    Usda,
    /// UPC lookup provider (fixed result cap)
    Upc,
    /// Nutrition lookup provider (app-id/app-key header pair)
    Nutrition,
}

impl Source {
    pub const ALL: [Source; 4] = [Source::Primary, Source::Usda, Source::Upc, Source::Nutrition];

    pub fn as_str(&self) -> &'static str {
        match self {
            Source::Primary => "primary",
            Source::Usda => "usda",
            Source::Upc => "upc",
            Source::Nutrition => "nutrition",
        }
    }

    /// Qualify a provider-native id so it cannot collide with another source.
    pub fn qualify(&self, native_id: &str) -> String {
        format!("{}:{}", self.as_str(), native_id)
    }

    /// Strip this source's prefix from a qualified id. Unqualified ids pass through.
    pub fn native_id<'a>(&self, id: &'a str) -> &'a str {
        id.strip_prefix(self.as_str())
            .and_then(|rest| rest.strip_prefix(':'))
            .unwrap_or(id)
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Source {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "primary" | "catalog" => Ok(Source::Primary),
            "usda" | "fdc" => Ok(Source::Usda),
            "upc" | "upcitemdb" => Ok(Source::Upc),
            "nutrition" | "nutritionix" => Ok(Source::Nutrition),
            other => Err(CatalogError::InvalidInput(format!(
                "unknown source '{}' (expected one of: primary, usda, upc, nutrition)",
                other
            ))),
        }
    }
}

/// Parse a comma-separated source list (`"primary, usda"`).
pub fn parse_sources(list: &str) -> Result<Vec<Source>, CatalogError> {
    let mut sources = Vec::new();
    for part in list.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let source: Source = part.parse()?;
        if !sources.contains(&source) {
            sources.push(source);
        }
    }
    Ok(sources)
}

/// Immutable search request. Build with [`CanonicalQuery::builder`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalQuery {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    item_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    brand: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    manufacturer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    gtin: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    vendor: Option<String>,
    #[serde(default)]
    sources: Vec<Source>,
    page_number: u32,
    page_size: u32,
}

impl Default for CanonicalQuery {
    fn default() -> Self {
        Self {
            item_name: None,
            brand: None,
            manufacturer: None,
            gtin: None,
            category: None,
            vendor: None,
            sources: Vec::new(),
            page_number: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl CanonicalQuery {
    pub fn builder() -> CanonicalQueryBuilder {
        CanonicalQueryBuilder::default()
    }

    pub fn item_name(&self) -> Option<&str> {
        self.item_name.as_deref()
    }
    pub fn brand(&self) -> Option<&str> {
        self.brand.as_deref()
    }
    pub fn manufacturer(&self) -> Option<&str> {
        self.manufacturer.as_deref()
    }
    pub fn gtin(&self) -> Option<&str> {
        self.gtin.as_deref()
    }
    pub fn category(&self) -> Option<&str> {
        self.category.as_deref()
    }
    pub fn vendor(&self) -> Option<&str> {
        self.vendor.as_deref()
    }
    pub fn sources(&self) -> &[Source] {
        &self.sources
    }
    pub fn page_number(&self) -> u32 {
        self.page_number
    }
    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    /// Copy of this query at another page. Everything else is unchanged.
    pub fn with_page(&self, page_number: u32) -> Self {
        Self {
            page_number: page_number.max(1),
            ..self.clone()
        }
    }

    /// Copy of this query targeting a different source set.
    pub fn with_sources(&self, sources: Vec<Source>) -> Self {
        Self {
            sources,
            ..self.clone()
        }
    }

    fn text_fields(&self) -> [Option<&str>; 6] {
        [
            self.item_name(),
            self.brand(),
            self.manufacturer(),
            self.gtin(),
            self.category(),
            self.vendor(),
        ]
    }

    /// True when no text field carries anything but whitespace.
    pub fn is_blank(&self) -> bool {
        self.text_fields()
            .iter()
            .all(|f| f.map(|s| s.trim().is_empty()).unwrap_or(true))
    }

    /// Reject queries that must never reach an adapter.
    pub fn validate(&self) -> Result<(), CatalogError> {
        if self.is_blank() {
            return Err(CatalogError::InvalidInput(
                "query has no search terms; fill at least one of name, brand, manufacturer, gtin, category or vendor".into(),
            ));
        }
        if self.page_size == 0 {
            return Err(CatalogError::InvalidInput("page size must be at least 1".into()));
        }
        Ok(())
    }

    /// Free text used by providers that only take a single search string.
    ///
    /// Name and brand are joined; other fields are only used when both are empty.
    pub fn free_text(&self) -> Option<String> {
        let primary: Vec<&str> = [self.item_name(), self.brand()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect();
        if !primary.is_empty() {
            return Some(primary.join(" "));
        }
        [self.manufacturer(), self.category(), self.vendor(), self.gtin()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .find(|s| !s.is_empty())
            .map(str::to_string)
    }

    /// The gtin when it is a plain 8-14 digit code.
    pub fn numeric_gtin(&self) -> Option<&str> {
        self.gtin().map(str::trim).filter(|g| is_numeric_code(g))
    }
}

/// 8-14 digit GTIN/UPC/EAN.
pub fn is_numeric_code(value: &str) -> bool {
    (8..=14).contains(&value.len()) && value.bytes().all(|b| b.is_ascii_digit())
}

#[derive(Debug, Default, Clone)]
pub struct CanonicalQueryBuilder {
    query: CanonicalQuery,
}

fn clean(value: impl Into<String>) -> Option<String> {
    let value = value.into();
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

impl CanonicalQueryBuilder {
    pub fn item_name(mut self, value: impl Into<String>) -> Self {
        self.query.item_name = clean(value);
        self
    }
    pub fn brand(mut self, value: impl Into<String>) -> Self {
        self.query.brand = clean(value);
        self
    }
    pub fn manufacturer(mut self, value: impl Into<String>) -> Self {
        self.query.manufacturer = clean(value);
        self
    }
    pub fn gtin(mut self, value: impl Into<String>) -> Self {
        self.query.gtin = clean(value);
        self
    }
    pub fn category(mut self, value: impl Into<String>) -> Self {
        self.query.category = clean(value);
        self
    }
    pub fn vendor(mut self, value: impl Into<String>) -> Self {
        self.query.vendor = clean(value);
        self
    }
    pub fn sources(mut self, sources: impl IntoIterator<Item = Source>) -> Self {
        let mut deduped = Vec::new();
        for source in sources {
            if !deduped.contains(&source) {
                deduped.push(source);
            }
        }
        self.query.sources = deduped;
        self
    }
    pub fn page_number(mut self, page_number: u32) -> Self {
        self.query.page_number = page_number.max(1);
        self
    }
    pub fn page_size(mut self, page_size: u32) -> Self {
        self.query.page_size = page_size;
        self
    }
    pub fn build(self) -> CanonicalQuery {
        self.query
    }
}
