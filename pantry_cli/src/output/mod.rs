use crate::cli::OutputFormat;
use crate::commands::Result;
use pantry_core::{CatalogItem, ExportReport, SearchResultPage, Source};
use serde::{Deserialize, Serialize};
use serde_json::Value;

mod pretty;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenStatus {
    pub present: bool,
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issued_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub age_days: Option<i64>,
    pub endpoint: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceStatus {
    pub source: Source,
    pub description: String,
    pub configured: bool,
    pub supports_export: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportSummary {
    pub path: String,
    #[serde(flatten)]
    pub report: ExportReport,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum OutputData {
    SearchPage(SearchResultPage),
    Item(CatalogItem),
    Sources(Vec<SourceStatus>),
    Token(TokenStatus),
    Export(ExportSummary),
    ConfigInfo(Value),
    Message(String),
}

pub fn format_output(data: &OutputData, format: &OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(data)?);
        }
        OutputFormat::Yaml => {
            println!("{}", serde_yaml::to_string(data)?);
        }
        OutputFormat::Text => {
            format_text_output(data)?;
        }
        OutputFormat::Pretty => {
            pretty::format_pretty_output(data)?;
        }
    }
    Ok(())
}

fn format_text_output(data: &OutputData) -> Result<()> {
    match data {
        OutputData::SearchPage(page) => {
            for item in &page.items {
                println!(
                    "{}\t{}\t{}\t{}",
                    item.id,
                    item.name.as_deref().unwrap_or(""),
                    item.brand.as_deref().unwrap_or(""),
                    item.gtin.as_deref().unwrap_or("")
                );
            }
            for failure in &page.failures {
                eprintln!("failed\t{}\t{}", failure.source, failure.message);
            }
        }
        OutputData::Item(item) => {
            println!("{}", serde_json::to_string_pretty(item)?);
        }
        OutputData::Sources(sources) => {
            for s in sources {
                println!(
                    "{}\t{}\t{}",
                    s.source,
                    if s.configured { "configured" } else { "not configured" },
                    s.description
                );
            }
        }
        OutputData::Token(status) => {
            println!("valid\t{}", status.valid);
            if let Some(ref at) = status.expires_at {
                println!("expires_at\t{}", at);
            }
            if let Some(days) = status.age_days {
                println!("age_days\t{}", days);
            }
        }
        OutputData::Export(summary) => match &summary.report {
            ExportReport::ServerStreamed { bytes, skipped } => {
                println!("{}\t{} bytes", summary.path, bytes);
                for id in skipped {
                    eprintln!("skipped\t{}", id);
                }
            }
            ExportReport::Synthesized { rows, missing } => {
                println!("{}\t{} rows", summary.path, rows);
                for id in missing {
                    eprintln!("missing\t{}", id);
                }
            }
        },
        OutputData::ConfigInfo(config) => {
            println!("{}", serde_yaml::to_string(config)?);
        }
        OutputData::Message(msg) => {
            println!("{}", msg);
        }
    }
    Ok(())
}
