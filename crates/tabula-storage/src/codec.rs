//! Record encoding and decoding.
//!
//! A table file starts with a header line describing every column, followed
//! by one data line per row:
//!
//! ```text
//! id+a|name+pk|surname+pk|patronymic+pk
//! 1|Ann|Lee|null
//! 2|Bob|Stone|null
//! ```
//!
//! Header fields are `<name>+<flags>` where flags are `u`, `pk`, `a` in that
//! order. Data fields are the raw values; nothing is escaped, so values must
//! never contain the data separator.

use std::collections::HashMap;
use std::fmt;

use tabula_common::{
    COLUMN_METADATA_SEPARATOR, EMPTY_FIELD_VALUE, FLAG_AUTO_INCREMENT, FLAG_PRIMARY_KEY,
    FLAG_UNIQUE, RESERVED_VALUE_SYMBOLS, TABLE_DATA_SEPARATOR,
};
use tracing::debug;

/// Unordered column/value pairs used for conditions and new values.
pub type Fields = HashMap<String, String>;

/// A column definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    /// Column name, unique within its table.
    pub name: String,
    /// No two rows may hold the same value.
    pub unique: bool,
    /// Member of the composite primary key.
    pub primary_key: bool,
    /// Filled from the table sequence on insert.
    pub auto_increment: bool,
}

impl Column {
    /// Creates a column without flags.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            unique: false,
            primary_key: false,
            auto_increment: false,
        }
    }

    /// Marks the column unique.
    #[must_use]
    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// Marks the column as a primary-key member.
    #[must_use]
    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    /// Marks the column auto-increment.
    #[must_use]
    pub fn auto_increment(mut self) -> Self {
        self.auto_increment = true;
        self
    }

    /// Returns true if changing this column requires a constraint check.
    pub fn is_constrained(&self) -> bool {
        self.unique || self.primary_key
    }

    /// Parses a header field such as `name+upk`.
    ///
    /// Returns `None` if the metadata separator is missing, the name is
    /// empty, or the flags contain unknown tokens.
    pub fn parse(field: &str) -> Option<Self> {
        let (name, mut flags) = field.split_once(COLUMN_METADATA_SEPARATOR)?;
        if name.is_empty() {
            return None;
        }

        let mut column = Column::new(name);
        if let Some(rest) = flags.strip_prefix(FLAG_UNIQUE) {
            column.unique = true;
            flags = rest;
        }
        if let Some(rest) = flags.strip_prefix(FLAG_PRIMARY_KEY) {
            column.primary_key = true;
            flags = rest;
        }
        if let Some(rest) = flags.strip_prefix(FLAG_AUTO_INCREMENT) {
            column.auto_increment = true;
            flags = rest;
        }

        flags.is_empty().then_some(column)
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.name, COLUMN_METADATA_SEPARATOR)?;
        if self.unique {
            f.write_str(FLAG_UNIQUE)?;
        }
        if self.primary_key {
            f.write_str(FLAG_PRIMARY_KEY)?;
        }
        if self.auto_increment {
            f.write_str(FLAG_AUTO_INCREMENT)?;
        }
        Ok(())
    }
}

/// A decoded row: column names mapped to values, in column order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Row {
    fields: Vec<(String, String)>,
}

impl Row {
    /// Creates an empty row.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the value of a column.
    pub fn get(&self, column: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value.as_str())
    }

    /// Returns the value of a column, or the empty-field sentinel.
    pub fn get_or_empty(&self, column: &str) -> &str {
        self.get(column).unwrap_or(EMPTY_FIELD_VALUE)
    }

    /// Sets a column value, appending the column if it is new.
    pub fn set(&mut self, column: impl Into<String>, value: impl Into<String>) {
        let column = column.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(name, _)| *name == column) {
            Some((_, slot)) => *slot = value,
            None => self.fields.push((column, value)),
        }
    }

    /// Returns true if every condition names a value this row holds.
    ///
    /// Only conditions on the row's own columns are considered; a condition
    /// on an unknown column never excludes the row.
    pub fn satisfies(&self, conditions: &Fields) -> bool {
        self.fields.iter().all(|(name, value)| {
            conditions
                .get(name)
                .map_or(true, |expected| expected == value)
        })
    }

    /// Iterates over `(column, value)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(c, v)| (c.as_str(), v.as_str()))
    }

    /// Iterates over values in column order.
    pub fn values(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(_, v)| v.as_str())
    }

    /// Returns the number of fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns true if the row has no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Converts the row into unordered fields.
    pub fn into_fields(self) -> Fields {
        self.fields.into_iter().collect()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Row {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut row = Row::new();
        for (column, value) in iter {
            row.set(column, value);
        }
        row
    }
}

/// Encodes a header line from a column list.
pub fn encode_header(columns: &[Column]) -> String {
    columns
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(&TABLE_DATA_SEPARATOR.to_string())
}

/// Decodes a header line into columns.
///
/// Returns the offending field on failure.
pub fn decode_header(line: &str) -> Result<Vec<Column>, String> {
    line.split(TABLE_DATA_SEPARATOR)
        .map(|field| Column::parse(field).ok_or_else(|| field.to_string()))
        .collect()
}

/// Encodes a row in column order, using the sentinel for missing values.
pub fn encode_row(columns: &[Column], row: &Row) -> String {
    columns
        .iter()
        .map(|column| row.get_or_empty(&column.name))
        .collect::<Vec<_>>()
        .join(&TABLE_DATA_SEPARATOR.to_string())
}

/// Decodes a data line against the column list.
///
/// Returns `None` if the field count does not match the column count.
pub fn decode_row(columns: &[Column], line: &str) -> Option<Row> {
    let values: Vec<&str> = line.split(TABLE_DATA_SEPARATOR).collect();
    if values.len() != columns.len() {
        debug!(
            expected = columns.len(),
            actual = values.len(),
            "Row does not match columns"
        );
        return None;
    }

    Some(
        columns
            .iter()
            .zip(values)
            .map(|(column, value)| (column.name.clone(), value))
            .collect(),
    )
}

/// Returns the first reserved symbol in `value`, if any.
///
/// The data separator splits fields and a line terminator splits records,
/// so neither can be stored.
pub fn reserved_symbol(value: &str) -> Option<char> {
    value.chars().find(|c| RESERVED_VALUE_SYMBOLS.contains(c))
}
