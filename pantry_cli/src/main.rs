use clap::Parser;
use owo_colors::OwoColorize;
use std::process;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod cli;
mod commands;
mod output;

use cli::{Cli, Commands, OutputFormat};
use commands::*;

#[tokio::main]
async fn main() {
    let mut cli = Cli::parse();

    // pretty output is the only colored format
    if cli.no_color && cli.output == OutputFormat::Pretty {
        cli.output = OutputFormat::Text;
    }

    // RUST_LOG wins; otherwise -v raises verbosity
    let default_filter = match cli.verbose {
        0 => "pantry_cli=info,pantry_core=warn",
        1 => "pantry_cli=debug,pantry_core=debug",
        _ => "pantry_cli=trace,pantry_core=trace",
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let result = match &cli.command {
        Commands::Login { username, password } => {
            auth::login(&cli, username.as_deref(), password.as_deref()).await
        }
        Commands::Logout => auth::logout(&cli).await,
        Commands::Token => auth::token(&cli).await,
        Commands::Search {
            terms,
            sources,
            page,
            page_size,
            select,
            select_all,
            export,
        } => {
            search::run(
                &cli,
                search::SearchArgs {
                    terms,
                    sources: sources.as_deref(),
                    page: *page,
                    page_size: *page_size,
                    select: select.as_deref(),
                    select_all: *select_all,
                    export: export.as_deref(),
                },
            )
            .await
        }
        Commands::Get { source, id, raw } => get::run(&cli, source, id, *raw).await,
        Commands::Config { action } => config::run(&cli, action.clone()).await,
        Commands::Sources => sources::run(&cli).await,
    };

    if let Err(e) = result {
        match e {
            CommandError::Export(ref msg) => {
                eprintln!("{}: {}", "Export failed".red().bold(), msg);
            }
            CommandError::Catalog(pantry_core::CatalogError::AggregateSearch(ref errors)) => {
                eprintln!("{}: every requested source failed", "Error".red().bold());
                for err in errors {
                    eprintln!("   {} {}", "•".dimmed(), err);
                }
            }
            ref other => eprintln!("{}: {}", "Error".red().bold(), other),
        }
        process::exit(1);
    }
}
