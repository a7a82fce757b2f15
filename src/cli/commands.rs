//! CLI command implementations
//!
//! `query` loads the whole file into a static table, applies the operators
//! in a fixed order (filters, distinct, order, projection, pagination) and
//! writes one JSON object per row.

use std::io::{self, Write};
use std::path::Path;

use super::args::{Cli, Command, QueryArgs};
use super::errors::{CliError, CliResult};
use crate::backend::{CsvTable, JsonTable};
use crate::config::EngineConfig;
use crate::table::{Table, TableError};
use crate::value::Value;

/// Parse arguments and run the selected command
pub fn run() -> CliResult<()> {
    let cli = Cli::parse_args();
    run_command(cli)
}

pub fn run_command(cli: Cli) -> CliResult<()> {
    let config = match &cli.config {
        Some(path) => EngineConfig::load(path).map_err(|source| CliError::Config {
            path: path.clone(),
            source,
        })?,
        None => EngineConfig::default(),
    };
    config.apply_logging();
    match cli.command {
        Command::Query(args) => {
            let stdout = io::stdout();
            let mut out = stdout.lock();
            query(&args, &config, &mut out)
        }
    }
}

/// Runs one query and writes its output to `out`
pub fn query<W: Write>(args: &QueryArgs, config: &EngineConfig, out: &mut W) -> CliResult<()> {
    let table = load(&args.file, config)?;
    let table = shape(table, args)?;
    if args.explain {
        writeln!(out, "{}", table.explain())?;
    } else if args.count {
        writeln!(out, "{}", table.count()?)?;
    } else {
        for item in table.iter() {
            let (_, row) = item?;
            writeln!(out, "{}", row.to_json())?;
        }
    }
    out.flush()?;
    Ok(())
}

fn load(path: &Path, config: &EngineConfig) -> CliResult<Table> {
    let is_json = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("json"))
        .unwrap_or(false);
    let table = if is_json {
        JsonTable::from_path(path, None)?
    } else {
        CsvTable::from_path(path, None)?
    };
    Ok(Table::with_config(table.source().clone(), config.clone()))
}

fn shape(mut table: Table, args: &QueryArgs) -> CliResult<Table> {
    for pair in &args.eq {
        let (column, value) = split_pair(pair)?;
        let value = typed(&table, column, value)?;
        table = table.eq(column, value)?;
    }
    for pair in &args.like {
        let (column, pattern) = split_pair(pair)?;
        table = table.like(column, pattern)?;
    }
    if args.distinct {
        table = table.distinct()?;
    }
    if let Some(order) = &args.order {
        table = table.order(order)?;
    }
    if !args.columns.is_empty() {
        let names: Vec<&str> = args.columns.iter().map(|c| c.trim()).collect();
        table = table.columns(&names)?;
    }
    if let Some(limit) = args.limit {
        table = table.limit(limit);
    }
    if let Some(offset) = args.offset {
        table = table.offset(offset);
    }
    Ok(table)
}

fn split_pair(pair: &str) -> CliResult<(&str, &str)> {
    pair.split_once('=')
        .map(|(c, v)| (c.trim(), v))
        .filter(|(c, _)| !c.is_empty())
        .ok_or_else(|| CliError::Usage(pair.to_string()))
}

/// Command-line text coerced to the column's type
fn typed(table: &Table, column: &str, text: &str) -> CliResult<Value> {
    let schema = table.schema();
    match schema.get(column) {
        Some(def) => Ok(def
            .column_type
            .coerce(column, Value::from(text))
            .map_err(TableError::from)?),
        // Unknown columns are reported by the filter itself
        None => Ok(Value::from(text)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write_file(dir: &TempDir, name: &str, content: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, content).unwrap();
        path
    }

    fn run_query(args: QueryArgs) -> CliResult<Vec<String>> {
        let mut out = Vec::new();
        query(&args, &EngineConfig::default(), &mut out)?;
        Ok(String::from_utf8(out)
            .unwrap()
            .lines()
            .map(str::to_string)
            .collect())
    }

    const PEOPLE_CSV: &str = "name,city\nAda,Oslo\nBo,Bergen\nCy,Oslo\nAda,Oslo\n";

    #[test]
    fn test_csv_filter_order_project() {
        let dir = TempDir::new().unwrap();
        let file = write_file(&dir, "people.csv", PEOPLE_CSV);
        let lines = run_query(QueryArgs {
            file,
            eq: vec!["city=Oslo".into()],
            order: Some("name DESC".into()),
            columns: vec!["name".into()],
            distinct: true,
            ..Default::default()
        })
        .unwrap();
        assert_eq!(lines, vec![r#"{"name":"Cy"}"#, r#"{"name":"Ada"}"#]);
    }

    #[test]
    fn test_json_typed_equality_and_count() {
        let dir = TempDir::new().unwrap();
        let file = write_file(
            &dir,
            "people.json",
            r#"[{"name":"Ada","age":36},{"name":"Bo","age":41},{"name":"Cy","age":36}]"#,
        );
        let lines = run_query(QueryArgs {
            file,
            eq: vec!["age=36".into()],
            count: true,
            ..Default::default()
        })
        .unwrap();
        assert_eq!(lines, vec!["2"]);
    }

    #[test]
    fn test_like_and_pagination() {
        let dir = TempDir::new().unwrap();
        let file = write_file(&dir, "people.csv", PEOPLE_CSV);
        let lines = run_query(QueryArgs {
            file,
            like: vec!["name=a%".into()],
            limit: Some(1),
            offset: Some(1),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].contains("Ada"));
    }

    #[test]
    fn test_explain_names_operators() {
        let dir = TempDir::new().unwrap();
        let file = write_file(&dir, "people.csv", PEOPLE_CSV);
        let lines = run_query(QueryArgs {
            file,
            eq: vec!["city=Oslo".into()],
            explain: true,
            ..Default::default()
        })
        .unwrap();
        let text = lines.join("\n");
        assert!(text.contains("Filter"));
        assert!(text.contains("CsvScan"));
    }

    #[test]
    fn test_malformed_pair_is_usage_error() {
        let dir = TempDir::new().unwrap();
        let file = write_file(&dir, "people.csv", PEOPLE_CSV);
        let err = run_query(QueryArgs {
            file,
            eq: vec!["city".into()],
            ..Default::default()
        })
        .unwrap_err();
        assert_eq!(err.code(), "TABULA_CLI_USAGE_ERROR");
    }

    #[test]
    fn test_unknown_column_fails() {
        let dir = TempDir::new().unwrap();
        let file = write_file(&dir, "people.csv", PEOPLE_CSV);
        let err = run_query(QueryArgs {
            file,
            eq: vec!["country=NO".into()],
            ..Default::default()
        })
        .unwrap_err();
        assert!(matches!(err, CliError::Query(TableError::UnknownColumn(_))));
    }
}
