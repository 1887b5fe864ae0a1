//! Column-labeled in-memory tables and their CSV encoding.
//!
//! Every loader produces a `Table`; the combiner concatenates them. Cells are
//! `Value`s so null, text, and numeric states survive the round trip through
//! per-source checkpoints.

use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use indexmap::IndexMap;

use crate::errors::PipelineError;
use crate::types::ColumnName;

/// A single table cell.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    /// Missing or unparseable value. Encoded as an empty CSV field.
    Null,
    /// Raw text as read from a source.
    Text(String),
    /// Coerced numeric value.
    Number(f64),
}

impl Value {
    /// Build a text value.
    pub fn text(value: impl Into<String>) -> Self {
        Value::Text(value.into())
    }

    /// Build a numeric value.
    pub fn number(value: f64) -> Self {
        Value::Number(value)
    }

    /// True when the cell holds no value.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Borrow the text content, if any.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(value) => Some(value),
            _ => None,
        }
    }

    /// Numeric content, parsing text cells permissively.
    ///
    /// `Number` returns its value, `Text` is trimmed and parsed, anything
    /// unparseable and `Null` return `None`.
    pub fn coerced_number(&self) -> Option<f64> {
        match self {
            Value::Number(value) => Some(*value),
            Value::Text(value) => value.trim().parse::<f64>().ok(),
            Value::Null => None,
        }
    }

    /// Decode a CSV field: empty fields become `Null`, everything else text.
    pub fn from_csv_field(field: &str) -> Self {
        if field.is_empty() {
            Value::Null
        } else {
            Value::Text(field.to_string())
        }
    }

    /// Encode for CSV output.
    pub fn to_csv_field(&self) -> String {
        match self {
            Value::Null => String::new(),
            Value::Text(value) => value.clone(),
            Value::Number(value) => format_number(*value),
        }
    }
}

/// Render a number the way the output CSV expects: integral values without a
/// fractional part, everything else in shortest form.
pub fn format_number(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}

/// An ordered set of named columns plus rows of cells.
///
/// Row arity always matches the column count.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Table {
    columns: Vec<ColumnName>,
    rows: Vec<Vec<Value>>,
}

impl Table {
    /// Create an empty table with the given columns.
    pub fn new(columns: impl IntoIterator<Item = impl Into<ColumnName>>) -> Self {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    /// Create a table with no columns and no rows.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// True when the table has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Column names in order.
    pub fn columns(&self) -> &[ColumnName] {
        &self.columns
    }

    /// Rows in order.
    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    /// Position of a column by exact name.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|column| column == name)
    }

    /// Cell at `(row, column)`, if both exist.
    pub fn value(&self, row: usize, column: &str) -> Option<&Value> {
        let idx = self.column_index(column)?;
        self.rows.get(row).and_then(|cells| cells.get(idx))
    }

    /// Append a row. The row arity must match the column count.
    pub fn push_row(&mut self, row: Vec<Value>) -> Result<(), PipelineError> {
        if row.len() != self.columns.len() {
            return Err(PipelineError::Table(format!(
                "row arity {} does not match {} columns",
                row.len(),
                self.columns.len()
            )));
        }
        self.rows.push(row);
        Ok(())
    }

    /// Rename columns per the map; names without an entry are unchanged.
    pub fn rename_columns(&mut self, renames: &IndexMap<ColumnName, ColumnName>) {
        for column in &mut self.columns {
            if let Some(renamed) = renames.get(column.as_str()) {
                *column = renamed.clone();
            }
        }
    }

    /// Ensure a column exists, appending a null-filled one when missing.
    ///
    /// Returns the column's position.
    pub fn ensure_column(&mut self, name: &str) -> usize {
        if let Some(idx) = self.column_index(name) {
            return idx;
        }
        self.columns.push(name.to_string());
        for row in &mut self.rows {
            row.push(Value::Null);
        }
        self.columns.len() - 1
    }

    /// Remove the named columns; unknown names are ignored.
    pub fn drop_columns(&mut self, names: &[&str]) {
        let keep: Vec<usize> = (0..self.columns.len())
            .filter(|idx| !names.contains(&self.columns[*idx].as_str()))
            .collect();
        self.columns = keep.iter().map(|idx| self.columns[*idx].clone()).collect();
        for row in &mut self.rows {
            *row = keep.iter().map(|idx| row[*idx].clone()).collect();
        }
    }

    /// Project onto the named columns, skipping names the table lacks.
    pub fn select_existing(&self, keep: &[&str]) -> Table {
        let indices: Vec<usize> = keep
            .iter()
            .filter_map(|name| self.column_index(name))
            .collect();
        let columns: Vec<ColumnName> = indices
            .iter()
            .map(|idx| self.columns[*idx].clone())
            .collect();
        let rows = self
            .rows
            .iter()
            .map(|row| indices.iter().map(|idx| row[*idx].clone()).collect())
            .collect();
        Table { columns, rows }
    }

    /// Rewrite one column in place; no-op when the column is missing.
    pub fn map_column(&mut self, name: &str, mut f: impl FnMut(&Value) -> Value) {
        let Some(idx) = self.column_index(name) else {
            return;
        };
        for row in &mut self.rows {
            row[idx] = f(&row[idx]);
        }
    }

    /// Compute a column from each full row, creating it when missing.
    ///
    /// The closure sees the row with the target column already present (null
    /// on first derivation), so rules may read their own prior value.
    pub fn derive_column(&mut self, target: &str, mut f: impl FnMut(&[Value]) -> Value) {
        let target_idx = self.ensure_column(target);
        for row in &mut self.rows {
            let value = f(row);
            row[target_idx] = value;
        }
    }

    /// Keep only rows matching the predicate.
    pub fn retain_rows(&mut self, mut pred: impl FnMut(&[Value]) -> bool) {
        self.rows.retain(|row| pred(row));
    }

    /// Concatenate tables, aligning on the union of columns in first-seen
    /// order. Missing cells become null.
    pub fn concat(tables: Vec<Table>) -> Table {
        let mut columns: Vec<ColumnName> = Vec::new();
        for table in &tables {
            for column in table.columns() {
                if !columns.contains(column) {
                    columns.push(column.clone());
                }
            }
        }
        let mut combined = Table::new(columns.clone());
        for table in tables {
            let indices: Vec<Option<usize>> = columns
                .iter()
                .map(|column| table.column_index(column))
                .collect();
            for row in table.rows {
                let aligned: Vec<Value> = indices
                    .iter()
                    .map(|idx| idx.map(|i| row[i].clone()).unwrap_or(Value::Null))
                    .collect();
                combined.rows.push(aligned);
            }
        }
        combined
    }

    /// Read a headered CSV stream into a table.
    ///
    /// Short records are padded with nulls and long records truncated, so a
    /// ragged source never aborts a load.
    pub fn from_csv(reader: impl Read) -> Result<Table, PipelineError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_reader(reader);
        let columns: Vec<ColumnName> = csv_reader
            .headers()
            .map_err(|err| PipelineError::Table(format!("failed reading CSV header: {err}")))?
            .iter()
            .map(|name| name.trim().to_string())
            .collect();
        let mut table = Table::new(columns);
        let width = table.columns.len();
        for record in csv_reader.records() {
            let record = record
                .map_err(|err| PipelineError::Table(format!("failed reading CSV record: {err}")))?;
            let mut row: Vec<Value> = record
                .iter()
                .take(width)
                .map(Value::from_csv_field)
                .collect();
            row.resize(width, Value::Null);
            table.rows.push(row);
        }
        Ok(table)
    }

    /// Read a CSV file into a table.
    pub fn from_csv_file(path: &Path) -> Result<Table, PipelineError> {
        let file = File::open(path)?;
        Self::from_csv(file)
    }

    /// Write the table as headered CSV.
    pub fn write_csv(&self, writer: impl Write) -> Result<(), PipelineError> {
        if self.columns.is_empty() {
            return Ok(());
        }
        let mut csv_writer = csv::Writer::from_writer(writer);
        csv_writer
            .write_record(&self.columns)
            .map_err(|err| PipelineError::Table(format!("failed writing CSV header: {err}")))?;
        for row in &self.rows {
            let fields: Vec<String> = row.iter().map(Value::to_csv_field).collect();
            csv_writer
                .write_record(&fields)
                .map_err(|err| PipelineError::Table(format!("failed writing CSV record: {err}")))?;
        }
        csv_writer
            .flush()
            .map_err(|err| PipelineError::Table(format!("failed flushing CSV output: {err}")))?;
        Ok(())
    }

    /// Write the table to a CSV file, replacing any existing file.
    pub fn write_csv_file(&self, path: &Path) -> Result<(), PipelineError> {
        let file = File::create(path)?;
        self.write_csv(file)
    }
}
