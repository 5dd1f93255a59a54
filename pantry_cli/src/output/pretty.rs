//! Pretty formatter for terminal output.
//!
//! Results render as numbered cards grouped under a rule; partial failures
//! are listed at the end where the eye settles.

use super::{OutputData, SourceStatus, TokenStatus};
use crate::commands::Result;
use comfy_table::{presets::UTF8_FULL_CONDENSED, Cell, ContentArrangement, Table};
use owo_colors::OwoColorize;
use pantry_core::{CatalogItem, ExportReport, SearchResultPage};

/// Terminal width for formatting (default fallback)
const DEFAULT_WIDTH: usize = 80;

/// Indent for card content (after number)
const CARD_INDENT: usize = 6;

pub fn format_pretty_output(data: &OutputData) -> Result<()> {
    match data {
        OutputData::SearchPage(page) => print_page(page),
        OutputData::Item(item) => print_item(item),
        OutputData::Sources(sources) => print_sources(sources),
        OutputData::Token(status) => print_token(status),
        OutputData::Export(summary) => match &summary.report {
            ExportReport::ServerStreamed { bytes, skipped } => {
                println!(
                    "{} {} {}",
                    "✓".green(),
                    summary.path.cyan(),
                    format!("({} bytes, server export)", bytes).dimmed()
                );
                if !skipped.is_empty() {
                    println!(
                        "{}",
                        format!(
                            "⚠ {} selected item(s) come from other sources and were not exported:",
                            skipped.len()
                        )
                        .yellow()
                    );
                    for id in skipped {
                        println!("   {} {}", "•".dimmed(), id);
                    }
                }
            }
            ExportReport::Synthesized { rows, missing } => {
                println!(
                    "{} {} {}",
                    "✓".green(),
                    summary.path.cyan(),
                    format!("({} rows)", rows).dimmed()
                );
                if !missing.is_empty() {
                    println!(
                        "{}",
                        format!(
                            "⚠ {} selected item(s) are not on the fetched page and were not exported:",
                            missing.len()
                        )
                        .yellow()
                    );
                    for id in missing {
                        println!("   {} {}", "•".dimmed(), id);
                    }
                }
            }
        },
        OutputData::ConfigInfo(config) => {
            println!("{}", "Configuration".cyan().bold());
            println!();
            println!("{}", serde_yaml::to_string(config)?);
        }
        OutputData::Message(msg) => println!("{}", msg),
    }
    Ok(())
}

fn print_page(page: &SearchResultPage) {
    let width = terminal_width();
    let total = if page.page.total_exact {
        format!("{} total", page.page.total_count)
    } else {
        format!("~{} total", page.page.total_count)
    };
    let header = format!(
        "Page {}/{} ({} shown, {})",
        page.page.current_page,
        page.page.total_pages,
        page.items.len(),
        total
    );
    let line_len = width.saturating_sub(header.len() + 6).min(60);
    println!(
        "{} {} {}",
        "──".cyan(),
        header.green().bold(),
        "─".repeat(line_len).cyan()
    );
    println!();

    if page.items.is_empty() {
        println!("   {}", "No results".dimmed());
        println!();
    }

    for (i, item) in page.items.iter().enumerate() {
        let title = item.name.as_deref().unwrap_or("(unnamed)");
        println!(
            " {:>3}. {} {}",
            (i + 1).to_string().cyan().bold(),
            truncate_text(title, 60).bold(),
            format!("[{}]", item.provenance).dimmed()
        );
        println!("{}{}", " ".repeat(CARD_INDENT), item.id.blue());

        let meta: Vec<String> = [
            item.brand.as_deref(),
            item.gtin.as_deref(),
            item.category.as_deref(),
            item.serving_size.as_deref(),
        ]
        .into_iter()
        .flatten()
        .map(str::to_string)
        .collect();
        if !meta.is_empty() {
            let line = truncate_text(&meta.join(" · "), width.saturating_sub(CARD_INDENT).max(20));
            println!("{}{}", " ".repeat(CARD_INDENT), line.dimmed());
        }
        println!();
    }

    if page.partial && !page.failures.is_empty() {
        println!("{}", "⚠ Partial results - some sources failed:".yellow());
        for failure in &page.failures {
            let timeout_marker = if failure.is_timeout { " (timeout)" } else { "" };
            println!(
                "   {} {}: {}{}",
                "•".dimmed(),
                failure.source.to_string().yellow(),
                failure.message.dimmed(),
                timeout_marker.dimmed()
            );
        }
        println!();
    }

    let answered: Vec<String> = page
        .completed
        .iter()
        .map(|c| format!("{} {}", c.source, c.count))
        .collect();
    if !answered.is_empty() {
        println!("{} {}", "Sources:".dimmed(), answered.join(", ").dimmed());
    }
    if let Some(duration) = page.duration_ms {
        println!("{}", format!("Completed in {}ms", duration).dimmed());
    }
}

fn print_item(item: &CatalogItem) {
    let width = terminal_width().min(100);
    println!(
        "{} {}",
        item.name.as_deref().unwrap_or("(unnamed)").bold().cyan(),
        format!("[{}]", item.provenance).dimmed()
    );
    println!("{}", item.id.blue());
    println!();

    let fields = [
        ("Brand", &item.brand),
        ("Manufacturer", &item.manufacturer),
        ("GTIN", &item.gtin),
        ("Category", &item.category),
        ("Vendor", &item.vendor),
        ("Serving", &item.serving_size),
    ];
    for (label, value) in fields {
        if let Some(value) = value {
            println!("  {:<14}{}", format!("{}:", label).dimmed(), value);
        }
    }

    for (label, value) in [("Ingredients", &item.ingredients), ("Allergens", &item.allergens)] {
        if let Some(value) = value {
            println!();
            println!("  {}", label.bold());
            for line in textwrap::wrap(value, width.saturating_sub(4)) {
                println!("    {}", line);
            }
        }
    }

    if !item.nutrition.is_empty() {
        println!();
        let mut table = Table::new();
        table
            .load_preset(UTF8_FULL_CONDENSED)
            .set_content_arrangement(ContentArrangement::Dynamic)
            .set_header(vec!["Nutrient", "Amount", "Unit"]);
        for fact in &item.nutrition {
            table.add_row(vec![
                Cell::new(&fact.name),
                Cell::new(fact.amount),
                Cell::new(fact.unit.as_deref().unwrap_or("")),
            ]);
        }
        println!("{table}");
    }

    if !item.raw.is_null() {
        println!();
        println!("{}", "Raw payload".dimmed());
        match serde_json::to_string_pretty(&item.raw) {
            Ok(raw) => println!("{}", raw.dimmed()),
            Err(e) => println!("{}", format!("(unprintable: {})", e).dimmed()),
        }
    }
}

fn print_sources(sources: &[SourceStatus]) {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["Source", "Status", "Export", "Description"]);
    for s in sources {
        let status = if s.configured { "ready" } else { "not configured" };
        let export = if s.supports_export { "server" } else { "local" };
        table.add_row(vec![
            Cell::new(s.source),
            Cell::new(status),
            Cell::new(export),
            Cell::new(&s.description),
        ]);
    }
    println!("{table}");
}

fn print_token(status: &TokenStatus) {
    if !status.present {
        println!("{} {}", "✗".red(), "No credential stored. Run `pantry login`.".yellow());
        return;
    }
    if status.valid {
        println!("{} {}", "✓".green(), "Credential is valid".green().bold());
    } else {
        println!("{} {}", "✗".red(), "Credential is expired or unreadable".red().bold());
    }
    if let Some(ref at) = status.issued_at {
        println!("  {:<12}{}", "Issued:".dimmed(), at);
    }
    if let Some(days) = status.age_days {
        println!("  {:<12}{} day(s)", "Age:".dimmed(), days);
    }
    match status.expires_at {
        Some(ref at) => println!("  {:<12}{}", "Expires:".dimmed(), at),
        None => println!("  {:<12}{}", "Expires:".dimmed(), "unknown".dimmed()),
    }
    println!("  {:<12}{}", "Endpoint:".dimmed(), status.endpoint.dimmed());
}

/// Truncate text to max length, adding ellipsis if needed
fn truncate_text(s: &str, max_len: usize) -> String {
    let first_line = s.lines().next().unwrap_or(s);
    if first_line.chars().count() <= max_len {
        first_line.to_string()
    } else {
        let truncated: String = first_line.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", truncated)
    }
}

fn terminal_width() -> usize {
    terminal_size::terminal_size()
        .map(|(w, _)| w.0 as usize)
        .unwrap_or(DEFAULT_WIDTH)
}
