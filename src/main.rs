//! tabula CLI entry point
//!
//! Parses arguments and delegates to `cli::run`; errors go to stderr with
//! a non-zero exit code.

use tabula::cli;

fn main() {
    if let Err(e) = cli::run() {
        eprintln!("{}: {}", e.code(), e);
        std::process::exit(1);
    }
}
