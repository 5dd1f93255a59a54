use crate::cli::Cli;
use crate::commands::{Result, Runtime};
use crate::output::{format_output, OutputData, SourceStatus};
use pantry_core::Source;

pub async fn run(cli: &Cli) -> Result<()> {
    let runtime = Runtime::load()?;
    let registered = runtime.registry.list();

    let sources: Vec<SourceStatus> = Source::ALL
        .iter()
        .map(|source| match registered.iter().find(|info| info.source == *source) {
            Some(info) => SourceStatus {
                source: *source,
                description: info.description.clone(),
                configured: runtime.config.is_configured(*source),
                supports_export: info.supports_export,
            },
            None => SourceStatus {
                source: *source,
                description: missing_hint(*source).to_string(),
                configured: false,
                supports_export: false,
            },
        })
        .collect();

    format_output(&OutputData::Sources(sources), &cli.output)
}

fn missing_hint(source: Source) -> &'static str {
    match source {
        Source::Usda => "Set USDA_API_KEY or usda.api_key",
        Source::Nutrition => "Set NUTRITIONIX_APP_ID and NUTRITIONIX_APP_KEY",
        Source::Primary | Source::Upc => "Not registered",
    }
}
