//! CLI module for tabula
//!
//! Provides command-line interface for:
//! - query: load a CSV or JSON file, apply operators, print JSON lines

mod args;
mod commands;
mod errors;

pub use args::{Cli, Command, QueryArgs};
pub use commands::{query, run, run_command};
pub use errors::{CliError, CliResult};
