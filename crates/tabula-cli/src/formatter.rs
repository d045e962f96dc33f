//! Output formatting for selected rows.
//!
//! Supports table, JSON, CSV, and raw output formats.

use comfy_table::{Cell, ContentArrangement, Table};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use tabula_common::EMPTY_FIELD_VALUE;
use tabula_storage::Row;

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Formatted table output.
    #[default]
    Table,
    /// JSON output.
    Json,
    /// CSV output.
    Csv,
    /// Raw output (values separated by tabs).
    Raw,
}

/// Rows of one table, ready for printing.
#[derive(Debug, Clone, Default)]
pub struct RowSet {
    /// Column names in header order.
    pub columns: Vec<String>,
    /// Values in column order.
    pub rows: Vec<Vec<String>>,
}

impl RowSet {
    /// Builds a row set from decoded rows.
    pub fn new(columns: Vec<String>, rows: &[Row]) -> Self {
        let rows = rows
            .iter()
            .map(|row| {
                columns
                    .iter()
                    .map(|c| row.get_or_empty(c).to_string())
                    .collect()
            })
            .collect();
        Self { columns, rows }
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }
}

/// Formats a row set according to the specified format.
pub fn format_rows(rows: &RowSet, format: OutputFormat) -> String {
    match format {
        OutputFormat::Table => format_table(rows),
        OutputFormat::Json => format_json(rows),
        OutputFormat::Csv => format_csv(rows),
        OutputFormat::Raw => format_raw(rows),
    }
}

fn format_table(rows: &RowSet) -> String {
    let mut table = Table::new();

    table
        .set_content_arrangement(ContentArrangement::Dynamic)
        .load_preset(comfy_table::presets::UTF8_FULL)
        .apply_modifier(comfy_table::modifiers::UTF8_ROUND_CORNERS);

    if !rows.columns.is_empty() {
        table.set_header(rows.columns.iter().map(Cell::new));
    }

    for row in &rows.rows {
        table.add_row(row.iter().map(Cell::new));
    }

    table.to_string()
}

fn format_json(rows: &RowSet) -> String {
    let objects: Vec<JsonValue> = rows
        .rows
        .iter()
        .map(|row| {
            let object = rows
                .columns
                .iter()
                .zip(row)
                .map(|(column, value)| (column.clone(), value_to_json(value)))
                .collect();
            JsonValue::Object(object)
        })
        .collect();

    serde_json::to_string_pretty(&objects).unwrap_or_else(|_| "[]".to_string())
}

/// The empty-field sentinel becomes JSON `null`.
fn value_to_json(value: &str) -> JsonValue {
    if value == EMPTY_FIELD_VALUE {
        JsonValue::Null
    } else {
        JsonValue::String(value.to_string())
    }
}

fn format_csv(rows: &RowSet) -> String {
    let mut output = String::new();

    if !rows.columns.is_empty() {
        let header: Vec<String> = rows.columns.iter().map(|c| escape_csv(c)).collect();
        output.push_str(&header.join(","));
        output.push('\n');
    }

    for row in &rows.rows {
        let values: Vec<String> = row.iter().map(|v| escape_csv(v)).collect();
        output.push_str(&values.join(","));
        output.push('\n');
    }

    output
}

/// Escapes a value for CSV output.
fn escape_csv(value: &str) -> String {
    if value.contains(',') || value.contains('"') || value.contains('\n') || value.contains('\r') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

fn format_raw(rows: &RowSet) -> String {
    let mut output = String::new();

    if !rows.columns.is_empty() {
        output.push_str(&rows.columns.join("\t"));
        output.push('\n');
    }

    for row in &rows.rows {
        output.push_str(&row.join("\t"));
        output.push('\n');
    }

    output
}
