//! CSV-backed static tables
//!
//! The first record is the header. Without a schema every column is text.
//! With one, fields are coerced to the declared types and an empty field in
//! a non-text column reads as NULL.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use super::rows::RowsTable;
use crate::observability::Logger;
use crate::schema::{ColumnDef, ColumnSet, ColumnType};
use crate::table::{Table, TableError, TableResult};
use crate::value::{Row, RowKey, Value};

pub struct CsvTable;

impl CsvTable {
    pub fn from_reader<R: Read>(reader: R, schema: Option<ColumnSet>) -> TableResult<Table> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .from_reader(reader);
        let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();

        let columns = match schema {
            Some(columns) => {
                if let Some(unknown) = headers.iter().find(|h| !columns.contains(h)) {
                    return Err(TableError::UnknownColumn(unknown.clone()));
                }
                columns
            }
            None => ColumnSet::new(
                headers
                    .iter()
                    .map(|h| ColumnDef::new(h.clone(), ColumnType::Text))
                    .collect(),
            )?,
        };

        let mut rows = Vec::new();
        for (position, record) in reader.records().enumerate() {
            let record = record?;
            let mut row = Row::new();
            for (header, field) in headers.iter().zip(record.iter()) {
                let text_column = columns
                    .get(header)
                    .is_some_and(|d| d.column_type == ColumnType::Text);
                let value = if field.is_empty() && !text_column {
                    Value::Null
                } else {
                    Value::Text(field.to_string())
                };
                row.set(header.clone(), value);
            }
            rows.push((RowKey::from(position), row));
        }

        Logger::trace(
            "CSV_LOADED",
            &[
                ("columns", &headers.len().to_string()),
                ("rows", &rows.len().to_string()),
            ],
        );
        Ok(Table::new(RowsTable::new(columns, rows, "CsvScan")?))
    }

    pub fn from_path(path: impl AsRef<Path>, schema: Option<ColumnSet>) -> TableResult<Table> {
        Self::from_reader(File::open(path)?, schema)
    }

    pub fn from_str(text: &str, schema: Option<ColumnSet>) -> TableResult<Table> {
        Self::from_reader(text.as_bytes(), schema)
    }
}
