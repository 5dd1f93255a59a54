use crate::cli::{Cli, OutputFormat, SearchTerms};
use crate::commands::{CommandError, Result, Runtime};
use crate::output::{format_output, ExportSummary, OutputData};
use indicatif::{ProgressBar, ProgressStyle};
use pantry_core::export::SelectionExportCoordinator;
use pantry_core::federated::SearchOrchestrator;
use pantry_core::query::parse_sources;
use pantry_core::{CanonicalQuery, CatalogError, ExportReport, SearchSession, Source};
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::warn;

pub struct SearchArgs<'a> {
    pub terms: &'a SearchTerms,
    pub sources: Option<&'a str>,
    pub page: u32,
    pub page_size: Option<u32>,
    pub select: Option<&'a str>,
    pub select_all: bool,
    pub export: Option<&'a Path>,
}

pub fn build_query(terms: &SearchTerms, page: u32, page_size: u32) -> CanonicalQuery {
    let mut builder = CanonicalQuery::builder().page_number(page).page_size(page_size);
    if let Some(ref v) = terms.name {
        builder = builder.item_name(v.as_str());
    }
    if let Some(ref v) = terms.brand {
        builder = builder.brand(v.as_str());
    }
    if let Some(ref v) = terms.manufacturer {
        builder = builder.manufacturer(v.as_str());
    }
    if let Some(ref v) = terms.gtin {
        builder = builder.gtin(v.as_str());
    }
    if let Some(ref v) = terms.category {
        builder = builder.category(v.as_str());
    }
    if let Some(ref v) = terms.vendor {
        builder = builder.vendor(v.as_str());
    }
    builder.build()
}

pub async fn run(cli: &Cli, args: SearchArgs<'_>) -> Result<()> {
    let runtime = Runtime::load()?;

    let sources: Vec<Source> = match args.sources {
        Some(list) => parse_sources(list)?,
        None => runtime.registry.sources(),
    };
    let page_size = args.page_size.unwrap_or(runtime.config.search.page_size);
    let query = build_query(args.terms, args.page, page_size);
    if args.export.is_some() && args.select.is_none() && !args.select_all {
        return Err(CommandError::InvalidInput(
            "--export needs --select <ids> or --select-all".to_string(),
        ));
    }

    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
        spinner.set_style(style);
    }
    let names: Vec<&str> = sources.iter().map(Source::as_str).collect();
    spinner.set_message(format!("Searching {}...", names.join(", ")));
    spinner.enable_steady_tick(std::time::Duration::from_millis(100));

    let orchestrator = SearchOrchestrator::from_config(runtime.registry.clone(), &runtime.config);
    let mut session = SearchSession::new(orchestrator);
    let outcome = session.search(query, sources).await.map(|_| ());
    spinner.finish_and_clear();
    outcome?;

    let Some(page) = session.current_page() else {
        return Ok(());
    };
    format_output(&OutputData::SearchPage(page.clone()), &cli.output)?;

    if args.select_all {
        let ids = page.ids();
        session.selection_mut().select_all(ids);
    }
    if let Some(list) = args.select {
        for id in list.split(',').map(str::trim).filter(|id| !id.is_empty()) {
            session.selection_mut().select(id);
        }
    }

    if let Some(path) = args.export {
        let summary = export(&runtime, &session, path).await?;
        if cli.output == OutputFormat::Pretty {
            println!();
        }
        format_output(&OutputData::Export(summary), &cli.output)?;
    }
    Ok(())
}

async fn export(runtime: &Runtime, session: &SearchSession, path: &Path) -> Result<ExportSummary> {
    let coordinator = SelectionExportCoordinator::new(runtime.registry.clone())
        .with_delimiter(runtime.config.export.delimiter);
    let report = export_to(&coordinator, session, path).await?;
    Ok(ExportSummary {
        path: path.display().to_string(),
        report,
    })
}

/// Server export when every selected id belongs to one exporting source,
/// otherwise a delimited file from the fetched rows.
///
/// Bytes go to a staging file next to `path`, which replaces `path` only
/// once the export has succeeded. On failure `path` is left as it was.
async fn export_to(
    coordinator: &SelectionExportCoordinator,
    session: &SearchSession,
    path: &Path,
) -> Result<ExportReport> {
    let staging = staging_path(path);
    let mut file = tokio::fs::File::create(&staging).await?;
    let written = match single_provenance(session.selection().ids()) {
        Some(source) => session.export(coordinator, source, &mut file).await,
        None => match session.current_page() {
            Some(page) => coordinator.synthesize(session.selection(), page, &mut file).await,
            None => Err(CatalogError::InvalidInput("no results to export".into())),
        },
    };
    let written = match written {
        Ok(report) => file.flush().await.map(|_| report).map_err(CatalogError::from),
        Err(e) => Err(e),
    };
    drop(file);

    match written {
        Ok(report) => {
            if let Err(e) = tokio::fs::rename(&staging, path).await {
                let _ = tokio::fs::remove_file(&staging).await;
                return Err(e.into());
            }
            Ok(report)
        }
        Err(e) => {
            if let Err(cleanup) = tokio::fs::remove_file(&staging).await {
                warn!(path = %staging.display(), error = %cleanup, "staging file left behind");
            }
            Err(export_error(e))
        }
    }
}

fn staging_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "export".to_string());
    path.with_file_name(format!(".{}.part", name))
}

/// The top-level handler already prints "Export failed", so keep the bare reason.
fn export_error(error: CatalogError) -> CommandError {
    match error {
        CatalogError::Export(reason) => CommandError::Export(reason),
        other => CommandError::Export(other.to_string()),
    }
}

fn single_provenance<'a>(ids: impl Iterator<Item = &'a str>) -> Option<Source> {
    let mut found: Option<Source> = None;
    for id in ids {
        let source: Source = id.split_once(':')?.0.parse().ok()?;
        match found {
            Some(existing) if existing != source => return None,
            _ => found = Some(source),
        }
    }
    found
}
