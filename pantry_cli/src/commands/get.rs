use crate::cli::Cli;
use crate::commands::{Result, Runtime};
use crate::output::{format_output, OutputData};
use pantry_core::{normalize, CatalogError, Source};

pub async fn run(cli: &Cli, source: &str, id: &str, raw: bool) -> Result<()> {
    let source: Source = source.parse()?;
    let runtime = Runtime::load()?;
    let adapter = runtime
        .registry
        .get(source)
        .ok_or(CatalogError::NotConfigured(source))?;

    let payload = adapter.lookup_by_identifier(id).await?;
    let mut item = normalize(&payload, source);
    if !raw {
        item = item.without_raw();
    }
    format_output(&OutputData::Item(item), &cli.output)
}
