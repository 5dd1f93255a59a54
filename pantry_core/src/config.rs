//! Catalog configuration.
//!
//! Stored as YAML at `~/.config/pantry/config.yaml`. Every field has a
//! default, so a missing or partial file is fine. Secrets and endpoints can be
//! overridden from the environment.

use crate::error::{CatalogError, Result};
use crate::query::{Source, DEFAULT_PAGE_SIZE};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

pub const DEFAULT_TIMEOUT_MS: u64 = 20_000;
pub const MIN_TIMEOUT_MS: u64 = 15_000;
pub const MAX_TIMEOUT_MS: u64 = 30_000;

/// Environment overrides, applied on top of the file.
pub const ENV_PRIMARY_URL: &str = "PANTRY_PRIMARY_URL";
pub const ENV_TOKEN_URL: &str = "PANTRY_TOKEN_URL";
pub const ENV_USDA_API_KEY: &str = "USDA_API_KEY";
pub const ENV_UPC_USER_KEY: &str = "UPCITEMDB_USER_KEY";
pub const ENV_NUTRITION_APP_ID: &str = "NUTRITIONIX_APP_ID";
pub const ENV_NUTRITION_APP_KEY: &str = "NUTRITIONIX_APP_KEY";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrimaryConfig {
    pub base_url: String,
    pub search_path: String,
    pub export_path: String,
    pub token_url: String,
}

impl Default for PrimaryConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5000/api".to_string(),
            search_path: "/catalog/items/search".to_string(),
            export_path: "/catalog/items/export".to_string(),
            token_url: "http://localhost:5000/token".to_string(),
        }
    }
}

impl PrimaryConfig {
    pub fn search_url(&self) -> String {
        join_url(&self.base_url, &self.search_path)
    }

    pub fn export_url(&self) -> String {
        join_url(&self.base_url, &self.export_path)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UsdaConfig {
    pub base_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// `dataType` filter, e.g. `Branded`, `Foundation`
    pub data_types: Vec<String>,
}

impl Default for UsdaConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.nal.usda.gov/fdc/v1".to_string(),
            api_key: None,
            data_types: vec!["Branded".to_string()],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UpcConfig {
    pub base_url: String,
    /// Paid-plan key; the trial endpoint works without one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_key: Option<String>,
    pub key_type: String,
}

impl Default for UpcConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.upcitemdb.com/prod/trial".to_string(),
            user_key: None,
            key_type: "3scale".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NutritionConfig {
    pub base_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub app_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub app_key: Option<String>,
}

impl Default for NutritionConfig {
    fn default() -> Self {
        Self {
            base_url: "https://trackapi.nutritionix.com/v2".to_string(),
            app_id: None,
            app_key: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchSettings {
    /// Merge order for results; unlisted sources follow in their natural order
    pub source_priority: Vec<Source>,
    pub page_size: u32,
    pub timeout_ms: u64,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            source_priority: Source::ALL.to_vec(),
            page_size: DEFAULT_PAGE_SIZE,
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }
}

impl SearchSettings {
    /// Per-adapter deadline, clamped into the supported window.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms.clamp(MIN_TIMEOUT_MS, MAX_TIMEOUT_MS))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportSettings {
    pub delimiter: char,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self { delimiter: ',' }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    pub primary: PrimaryConfig,
    pub usda: UsdaConfig,
    pub upc: UpcConfig,
    pub nutrition: NutritionConfig,
    pub search: SearchSettings,
    pub export: ExportSettings,
}

impl CatalogConfig {
    /// Apply overrides from the process environment.
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary lookup. Blank values are ignored.
    pub fn with_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(url) = get(ENV_PRIMARY_URL) {
            self.primary.base_url = url;
        }
        if let Some(url) = get(ENV_TOKEN_URL) {
            self.primary.token_url = url;
        }
        if let Some(key) = get(ENV_USDA_API_KEY) {
            self.usda.api_key = Some(key);
        }
        if let Some(key) = get(ENV_UPC_USER_KEY) {
            self.upc.user_key = Some(key);
        }
        if let Some(id) = get(ENV_NUTRITION_APP_ID) {
            self.nutrition.app_id = Some(id);
        }
        if let Some(key) = get(ENV_NUTRITION_APP_KEY) {
            self.nutrition.app_key = Some(key);
        }
        self
    }

    /// Whether the adapter for `source` has what it needs to make calls.
    pub fn is_configured(&self, source: Source) -> bool {
        match source {
            Source::Primary | Source::Upc => true,
            Source::Usda => present(&self.usda.api_key),
            Source::Nutrition => present(&self.nutrition.app_id) && present(&self.nutrition.app_key),
        }
    }

    /// Configured priority, completed with any source it leaves out.
    pub fn priority(&self) -> Vec<Source> {
        let mut order: Vec<Source> = Vec::with_capacity(Source::ALL.len());
        for source in self.search.source_priority.iter().chain(Source::ALL.iter()) {
            if !order.contains(source) {
                order.push(*source);
            }
        }
        order
    }

    pub fn validate(&self) -> Result<()> {
        if self.search.page_size == 0 {
            return Err(CatalogError::Config("search.page_size must be at least 1".into()));
        }
        if self.export.delimiter == '"' || self.export.delimiter == '\n' || self.export.delimiter == '\r' {
            return Err(CatalogError::Config(format!(
                "export.delimiter {:?} is not usable",
                self.export.delimiter
            )));
        }
        for (name, url) in [
            ("primary.base_url", &self.primary.base_url),
            ("primary.token_url", &self.primary.token_url),
            ("usda.base_url", &self.usda.base_url),
            ("upc.base_url", &self.upc.base_url),
            ("nutrition.base_url", &self.nutrition.base_url),
        ] {
            url::Url::parse(url)
                .map_err(|e| CatalogError::Config(format!("{} '{}': {}", name, url, e)))?;
        }
        Ok(())
    }
}

/// Join a base URL and a path without doubling or dropping the slash.
pub fn join_url(base: &str, path: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'))
}

/// Loads and saves [`CatalogConfig`] as YAML.
pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    /// Store at `~/.config/pantry/config.yaml`.
    pub fn new_default() -> Self {
        Self {
            path: config_dir().join("config.yaml"),
        }
    }

    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Load the file, or defaults if it does not exist.
    pub fn load(&self) -> Result<CatalogConfig> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "no config file; using defaults");
                return Ok(CatalogConfig::default());
            }
            Err(e) => return Err(e.into()),
        };
        if content.trim().is_empty() {
            return Ok(CatalogConfig::default());
        }
        let config: CatalogConfig = serde_yaml::from_str(&content)
            .map_err(|e| CatalogError::Config(format!("{}: {}", self.path.display(), e)))?;
        Ok(config)
    }

    /// Load the file and apply environment overrides.
    pub fn load_effective(&self) -> Result<CatalogConfig> {
        let config = self.load()?.with_env_overrides();
        if let Err(e) = config.validate() {
            warn!(error = %e, "configuration problem");
            return Err(e);
        }
        Ok(config)
    }

    pub fn save(&self, config: &CatalogConfig) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_yaml::to_string(config)
            .map_err(|e| CatalogError::Config(format!("serialize config: {}", e)))?;
        std::fs::write(&self.path, content)?;
        Ok(())
    }
}

/// `~/.config/pantry`
pub fn config_dir() -> PathBuf {
    dirs::config_dir()
        .or_else(|| dirs::home_dir().map(|p| p.join(".config")))
        .unwrap_or_else(|| PathBuf::from("."))
        .join("pantry")
}

fn present(value: &Option<String>) -> bool {
    value.as_deref().is_some_and(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = CatalogConfig::default();
        assert_eq!(config.search.page_size, 20);
        assert_eq!(config.search.timeout(), Duration::from_millis(20_000));
        assert_eq!(config.export.delimiter, ',');
        assert_eq!(config.priority(), Source::ALL.to_vec());
        assert!(config.validate().is_ok());
        assert!(!config.is_configured(Source::Usda));
        assert!(config.is_configured(Source::Upc));
    }

    #[test]
    fn test_blank_keys_are_not_configured() {
        let mut config = CatalogConfig::default();
        config.usda.api_key = Some("   ".into());
        config.nutrition.app_id = Some("app".into());
        config.nutrition.app_key = Some("".into());
        assert!(!config.is_configured(Source::Usda));
        assert!(!config.is_configured(Source::Nutrition));

        config.usda.api_key = Some("DEMO_KEY".into());
        config.nutrition.app_key = Some("key".into());
        assert!(config.is_configured(Source::Usda));
        assert!(config.is_configured(Source::Nutrition));
    }

    #[test]
    fn test_timeout_is_clamped() {
        let mut settings = SearchSettings::default();
        settings.timeout_ms = 1;
        assert_eq!(settings.timeout(), Duration::from_millis(MIN_TIMEOUT_MS));
        settings.timeout_ms = 600_000;
        assert_eq!(settings.timeout(), Duration::from_millis(MAX_TIMEOUT_MS));
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let yaml = "usda:\n  api_key: DEMO\nsearch:\n  source_priority: [usda, primary]\n";
        let config: CatalogConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.usda.api_key.as_deref(), Some("DEMO"));
        assert_eq!(config.usda.data_types, vec!["Branded".to_string()]);
        assert_eq!(config.search.page_size, 20);
        assert_eq!(
            config.priority(),
            vec![Source::Usda, Source::Primary, Source::Upc, Source::Nutrition]
        );
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            (ENV_USDA_API_KEY, "k1"),
            (ENV_NUTRITION_APP_ID, "id"),
            (ENV_NUTRITION_APP_KEY, "key"),
            (ENV_PRIMARY_URL, "https://catalog.internal/api"),
            (ENV_UPC_USER_KEY, "  "),
        ]
        .into_iter()
        .collect();
        let config = CatalogConfig::default().with_overrides(|k| env.get(k).map(|v| v.to_string()));
        assert_eq!(config.usda.api_key.as_deref(), Some("k1"));
        assert!(config.is_configured(Source::Nutrition));
        assert!(config.upc.user_key.is_none());
        assert_eq!(
            config.primary.search_url(),
            "https://catalog.internal/api/catalog/items/search"
        );
    }

    #[test]
    fn test_invalid_values_rejected() {
        let mut config = CatalogConfig::default();
        config.export.delimiter = '"';
        assert!(matches!(config.validate(), Err(CatalogError::Config(_))));

        let mut config = CatalogConfig::default();
        config.upc.base_url = "not a url".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = ConfigStore::new(dir.path().join("nested").join("config.yaml"));
        assert!(!store.exists());
        assert_eq!(store.load().unwrap(), CatalogConfig::default());

        let mut config = CatalogConfig::default();
        config.export.delimiter = ';';
        config.usda.api_key = Some("abc".into());
        store.save(&config).unwrap();
        assert_eq!(store.load().unwrap(), config);
    }

    #[test]
    fn test_store_reports_bad_yaml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "search: [this is not a map").unwrap();
        assert!(matches!(
            ConfigStore::new(path).load(),
            Err(CatalogError::Config(_))
        ));
    }
}
