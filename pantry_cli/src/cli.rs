use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "pantry")]
#[command(about = "Pantry - federated food-catalog search")]
#[command(version)]
#[command(after_help = "\x1b[1;36mQuick Start:\x1b[0m
  pantry login                                Issue a catalog credential
  pantry search --name quinoa                 Search every configured source
  pantry search --gtin 039978005335 -s usda   Look up a barcode on one source
  pantry get usda 2345678                     Show one item in full

\x1b[1;36mConfiguration:\x1b[0m
  pantry config init                          Write a default config file
  pantry config show                          Show the effective configuration
  pantry sources                              List configured sources")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output format
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Pretty)]
    pub output: OutputFormat,

    /// Disable colored output (plain text instead of pretty)
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Verbose output (-v debug, -vv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Issue a bearer credential for the primary catalog
    #[command(after_help = "\x1b[1;33mExamples:\x1b[0m
  pantry login                       Prompt for username and password
  pantry login --username ops        Prompt for the password only")]
    Login {
        #[arg(short, long, env = "PANTRY_USERNAME")]
        username: Option<String>,
        /// Read from the prompt when omitted
        #[arg(long, env = "PANTRY_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },

    /// Discard the stored credential
    Logout,

    /// Show the stored credential's status
    Token,

    /// Search the catalog across sources
    #[command(after_help = "\x1b[1;33mExamples:\x1b[0m
  pantry search --name \"greek yogurt\" --brand fage
  pantry search --name oats -s primary,usda --page 2
  pantry search --name oats --select-all --export oats.csv
  pantry search --gtin 012345678905 --select upc:0012345678905 --export one.csv")]
    Search {
        #[command(flatten)]
        terms: SearchTerms,

        /// Comma-separated sources (primary, usda, upc, nutrition); default: all configured
        #[arg(short = 's', long)]
        sources: Option<String>,

        /// Page number (1-based)
        #[arg(long, default_value_t = 1)]
        page: u32,

        /// Results per page; default from config
        #[arg(long)]
        page_size: Option<u32>,

        /// Comma-separated item ids to select for export
        #[arg(long)]
        select: Option<String>,

        /// Select every item on the fetched page
        #[arg(long)]
        select_all: bool,

        /// Write the selection to this file
        #[arg(long, value_name = "FILE")]
        export: Option<std::path::PathBuf>,
    },

    /// Fetch one item by source and id
    #[command(after_help = "\x1b[1;33mExamples:\x1b[0m
  pantry get usda 2345678
  pantry get upc 012345678905 --raw")]
    Get {
        /// Source name
        source: String,
        /// Native or qualified id (usda:2345678)
        id: String,
        /// Include the untouched provider payload
        #[arg(long)]
        raw: bool,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// List sources and whether they are configured
    Sources,
}

#[derive(clap::Args, Clone, Debug, Default)]
pub struct SearchTerms {
    /// Item name (free text)
    #[arg(short, long)]
    pub name: Option<String>,
    #[arg(short, long)]
    pub brand: Option<String>,
    #[arg(short, long)]
    pub manufacturer: Option<String>,
    /// GTIN / UPC / EAN
    #[arg(short, long)]
    pub gtin: Option<String>,
    #[arg(short, long)]
    pub category: Option<String>,
    #[arg(long)]
    pub vendor: Option<String>,
}

#[derive(Subcommand, Clone)]
pub enum ConfigAction {
    /// Show the effective configuration (secrets masked)
    Show,
    /// Print the config file location
    Path,
    /// Write a default config file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable formatted output
    Pretty,
    /// JSON output
    Json,
    /// YAML output
    Yaml,
    /// Plain text output
    Text,
}
