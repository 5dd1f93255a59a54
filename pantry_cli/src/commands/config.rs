use crate::cli::{Cli, ConfigAction, OutputFormat};
use crate::commands::{CommandError, Result};
use crate::output::{format_output, OutputData};
use owo_colors::OwoColorize;
use pantry_core::{CatalogConfig, ConfigStore};
use serde_json::{json, Value};

pub async fn run(cli: &Cli, action: ConfigAction) -> Result<()> {
    let store = ConfigStore::new_default();
    match action {
        ConfigAction::Show => show_config(cli, &store),
        ConfigAction::Path => format_output(
            &OutputData::Message(store.path().display().to_string()),
            &cli.output,
        ),
        ConfigAction::Init { force } => init_config(cli, &store, force),
    }
}

fn show_config(cli: &Cli, store: &ConfigStore) -> Result<()> {
    let config = store.load()?.with_env_overrides();
    let value = masked(&config)?;
    if cli.output == OutputFormat::Pretty {
        let origin = if store.exists() {
            store.path().display().to_string()
        } else {
            format!("{} (not created; defaults)", store.path().display())
        };
        println!("{} {}", "Config file:".dimmed(), origin.dimmed());
        println!();
    }
    format_output(&OutputData::ConfigInfo(value), &cli.output)
}

fn init_config(cli: &Cli, store: &ConfigStore, force: bool) -> Result<()> {
    if store.exists() && !force {
        return Err(CommandError::InvalidInput(format!(
            "{} already exists (use --force to overwrite)",
            store.path().display()
        )));
    }
    store.save(&CatalogConfig::default())?;
    format_output(
        &OutputData::Message(format!("Wrote {}", store.path().display())),
        &cli.output,
    )
}

/// Config as JSON with secrets replaced by `***`.
fn masked(config: &CatalogConfig) -> Result<Value> {
    let mut value = serde_json::to_value(config)?;
    for pointer in ["/usda/api_key", "/upc/user_key", "/nutrition/app_key"] {
        if let Some(secret) = value.pointer_mut(pointer) {
            if !secret.is_null() {
                *secret = json!("***");
            }
        }
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secrets_are_masked() {
        let mut config = CatalogConfig::default();
        config.usda.api_key = Some("real-key".into());
        config.nutrition.app_id = Some("app".into());
        config.nutrition.app_key = Some("secret".into());
        let value = masked(&config).unwrap();
        assert_eq!(value["usda"]["api_key"], "***");
        assert_eq!(value["nutrition"]["app_key"], "***");
        assert_eq!(value["nutrition"]["app_id"], "app");
        assert!(value["upc"].get("user_key").is_none());
    }
}
