//! CLI argument definitions using clap
//!
//! Commands:
//! - tabula query <FILE> [--eq col=value]... [--order spec] [--limit N] ...

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// tabula - query CSV and JSON files as immutable tables
#[derive(Parser, Debug)]
#[command(name = "tabula")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to an engine configuration file (JSON)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Load a CSV or JSON file and print the matching rows as JSON lines
    Query(QueryArgs),
}

#[derive(Args, Debug, Clone, Default)]
pub struct QueryArgs {
    /// Input file; `.json` is read as an array of objects, anything else as CSV
    pub file: PathBuf,

    /// Equality filter `column=value` (repeatable)
    #[arg(long = "eq", value_name = "COLUMN=VALUE")]
    pub eq: Vec<String>,

    /// Case-insensitive pattern filter `column=pattern` (repeatable)
    #[arg(long = "like", value_name = "COLUMN=PATTERN")]
    pub like: Vec<String>,

    /// Order specification, e.g. "city ASC, name DESC"
    #[arg(long)]
    pub order: Option<String>,

    /// Comma-separated list of columns to print
    #[arg(long, value_delimiter = ',')]
    pub columns: Vec<String>,

    #[arg(long)]
    pub limit: Option<usize>,

    #[arg(long)]
    pub offset: Option<usize>,

    /// Drop duplicate rows
    #[arg(long)]
    pub distinct: bool,

    /// Print the number of matching rows instead of the rows
    #[arg(long, conflicts_with = "explain")]
    pub count: bool,

    /// Print the operator tree instead of the rows
    #[arg(long)]
    pub explain: bool,
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
