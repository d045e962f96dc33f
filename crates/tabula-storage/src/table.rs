//! Table engine over a single plain-text file.
//!
//! Every operation is a full scan of the backing file. Inserts append one
//! line; updates, deletes and column additions rewrite the whole file
//! through a temp file that is renamed over the original.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use tabula_common::{
    TabulaError, TabulaResult, TABLE_DATA_SEPARATOR, TABLE_FILE_EXTENSION, TEMP_FILE_SUFFIX,
};
use tracing::{debug, info, warn};

use crate::codec::{self, Column, Fields, Row};
use crate::sequence::Sequence;

/// A table backed by one record file.
#[derive(Debug)]
pub struct Table {
    /// Table name (file stem).
    name: String,
    /// Backing file.
    path: PathBuf,
    /// Columns in file order.
    columns: Vec<Column>,
    /// Next auto-increment value.
    sequence: Sequence,
    /// Sync rewritten files before renaming them into place.
    sync_writes: bool,
}

impl Table {
    /// Opens a table file, creating it empty if it does not exist.
    pub fn open(path: impl AsRef<Path>) -> TabulaResult<Self> {
        Self::open_with(path, true)
    }

    /// Opens a table file with explicit write syncing.
    ///
    /// Fails if the path is a directory, the header is malformed, or an
    /// auto-increment value cannot be read as a number.
    pub fn open_with(path: impl AsRef<Path>, sync_writes: bool) -> TabulaResult<Self> {
        let path = path.as_ref().to_path_buf();
        let name = table_name_from_path(&path);

        let mut table = Self {
            name,
            path,
            columns: Vec::new(),
            sequence: Sequence::new(),
            sync_writes,
        };

        if table.path.is_dir() {
            return Err(TabulaError::table_init(
                &table.name,
                &table.path,
                "it is a directory",
            ));
        }

        if table.path.exists() {
            table.load()?;
        } else {
            File::create(&table.path)?;
        }

        info!(table = %table.name, "Table has been initialized successfully");
        Ok(table)
    }

    /// Parses the header and recovers the sequence.
    fn load(&mut self) -> TabulaResult<()> {
        let lines = self.read_lines()?;
        let Some(header) = lines.first() else {
            return Ok(());
        };

        self.columns = codec::decode_header(header).map_err(|field| {
            TabulaError::table_init(
                &self.name,
                &self.path,
                format!("incorrect columns format near '{field}'"),
            )
        })?;

        if let Some(index) = self.columns.iter().position(|c| c.auto_increment) {
            for line in lines.iter().skip(1) {
                let Some(value) = line.split(TABLE_DATA_SEPARATOR).nth(index) else {
                    continue;
                };
                let value: u64 = value.parse().map_err(|_| {
                    TabulaError::table_init(
                        &self.name,
                        &self.path,
                        format!("auto-increment value '{value}' is not a number"),
                    )
                })?;
                if !self.sequence.observe(value) {
                    return Err(TabulaError::table_init(
                        &self.name,
                        &self.path,
                        format!("auto-increment value '{value}' is out of range"),
                    ));
                }
            }
        }

        Ok(())
    }

    /// Returns the table name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the backing file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the columns in file order.
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Returns the column names in file order.
    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    /// Finds a column by name.
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Returns the auto-increment sequence.
    pub fn sequence(&self) -> Sequence {
        self.sequence
    }

    // =========================================================================
    // Row Operations
    // =========================================================================

    /// Inserts a row.
    ///
    /// Auto-increment columns take the sequence value regardless of what the
    /// caller supplied; other missing columns take the empty-field sentinel.
    /// Returns the stored row, or `None` if the row was empty or violates a
    /// unique or primary-key constraint.
    pub fn insert(&mut self, row: &Fields) -> TabulaResult<Option<Row>> {
        if row.is_empty() {
            warn!(table = %self.name, "Row to be inserted cannot be empty");
            return Ok(None);
        }
        if self.columns.is_empty() {
            warn!(table = %self.name, "Table has no columns, nothing can be inserted");
            return Ok(None);
        }
        ensure_valid_values(row.values())?;

        let candidate: Row = self
            .columns
            .iter()
            .map(|column| {
                let value = if column.auto_increment {
                    self.sequence.current().to_string()
                } else {
                    row.get(&column.name)
                        .cloned()
                        .unwrap_or_else(|| tabula_common::EMPTY_FIELD_VALUE.to_string())
                };
                (column.name.clone(), value)
            })
            .collect();

        let lines = self.read_lines()?;
        if self.violates_constraints(&candidate, &lines, None) {
            warn!(table = %self.name, "Unable to insert new row because it violates table constraints");
            return Ok(None);
        }

        let mut file = OpenOptions::new().append(true).open(&self.path)?;
        let separator = if lines.is_empty() { "" } else { "\n" };
        write!(file, "{separator}{}", codec::encode_row(&self.columns, &candidate))?;
        self.sequence.advance();

        info!(table = %self.name, row = ?candidate, "Row has been inserted successfully");
        Ok(Some(candidate))
    }

    /// Updates every row matching `conditions` with `new_values`.
    ///
    /// A row whose constrained column changes is checked against every other
    /// row; on violation that row is left untouched and the next one is
    /// processed. Returns the number of rows updated.
    pub fn update(&mut self, conditions: &Fields, new_values: &Fields) -> TabulaResult<usize> {
        ensure_valid_values(new_values.values())?;

        let mut lines = self.read_lines()?;
        let mut matched = 0;
        let mut updated = 0;

        for index in 1..lines.len() {
            let Some(row) = codec::decode_row(&self.columns, &lines[index]) else {
                continue;
            };
            if !row.satisfies(conditions) {
                continue;
            }
            matched += 1;

            let mut modified = row.clone();
            let mut constrained = false;
            for (column, value) in new_values {
                if let Some(col) = self.column(column) {
                    constrained |= col.is_constrained();
                    modified.set(column.clone(), value.clone());
                }
            }

            if constrained && self.violates_constraints(&modified, &lines, Some(index)) {
                warn!(table = %self.name, row = ?modified, "Row violates table constraints");
                continue;
            }

            lines[index] = codec::encode_row(&self.columns, &modified);
            updated += 1;
            debug!(table = %self.name, row = ?row, "Row has been updated successfully");
        }

        if matched == 0 {
            info!(table = %self.name, "0 rows have been updated");
            return Ok(0);
        }
        if updated > 0 {
            self.rewrite(&lines)?;
        }

        info!(table = %self.name, rows = updated, "Rows have been updated");
        Ok(updated)
    }

    /// Deletes every row matching `conditions`. Returns the number removed.
    pub fn delete_rows(&mut self, conditions: &Fields) -> TabulaResult<usize> {
        let lines = self.read_lines()?;
        let mut kept = Vec::with_capacity(lines.len());
        let mut removed = 0;

        for (index, line) in lines.into_iter().enumerate() {
            let matches = index > 0
                && codec::decode_row(&self.columns, &line)
                    .is_some_and(|row| row.satisfies(conditions));
            if matches {
                removed += 1;
            } else {
                kept.push(line);
            }
        }

        if removed == 0 {
            info!(table = %self.name, ?conditions, "Found 0 rows satisfying conditions");
            return Ok(0);
        }

        self.rewrite(&kept)?;
        info!(table = %self.name, rows = removed, "Rows have been deleted");
        Ok(removed)
    }

    /// Returns every row matching `conditions`, in file order.
    pub fn scan(&self, conditions: &Fields) -> TabulaResult<Vec<Row>> {
        let lines = self.read_lines()?;
        let mut rows = Vec::new();

        for line in lines.iter().skip(1) {
            match codec::decode_row(&self.columns, line) {
                Some(row) if row.satisfies(conditions) => rows.push(row),
                Some(_) => {}
                None => warn!(table = %self.name, line = %line, "Skipping malformed line"),
            }
        }

        Ok(rows)
    }

    /// Returns every row, in file order.
    pub fn rows(&self) -> TabulaResult<Vec<Row>> {
        self.scan(&Fields::new())
    }

    // =========================================================================
    // Structure
    // =========================================================================

    /// Adds a column and rewrites the header.
    ///
    /// Existing rows cannot be migrated: if the table holds rows they are
    /// discarded, and the caller must pass `allow_data_loss` to accept that.
    pub fn add_column(&mut self, column: Column, allow_data_loss: bool) -> TabulaResult<()> {
        if self.column(&column.name).is_some() {
            return Err(TabulaError::ColumnExists {
                table: self.name.clone(),
                column: column.name,
            });
        }

        let rows = self.read_lines()?.len().saturating_sub(1);
        if rows > 0 {
            if !allow_data_loss {
                return Err(TabulaError::DestructiveChange {
                    table: self.name.clone(),
                    column: column.name,
                    rows,
                });
            }
            warn!(table = %self.name, rows, "Discarding existing rows to add a column");
        }

        self.columns.push(column);
        self.rewrite(&[codec::encode_header(&self.columns)])
    }

    /// Removes the backing file.
    pub fn delete(self) -> TabulaResult<()> {
        fs::remove_file(&self.path)?;
        info!(table = %self.name, "Table has been deleted successfully");
        Ok(())
    }

    // =========================================================================
    // Internals
    // =========================================================================

    /// Returns true if `candidate` clashes with any row other than `skip`.
    ///
    /// `lines` includes the header at index 0. A clash is either an equal
    /// value in a unique column, or equal values in all primary-key columns
    /// of the same row.
    fn violates_constraints(&self, candidate: &Row, lines: &[String], skip: Option<usize>) -> bool {
        let key_columns = self.columns.iter().filter(|c| c.primary_key).count();

        for (index, line) in lines.iter().enumerate().skip(1) {
            if skip == Some(index) {
                continue;
            }
            let stored: Vec<&str> = line.split(TABLE_DATA_SEPARATOR).collect();
            if stored.len() != self.columns.len() {
                continue;
            }

            let mut key_matches = 0;
            for (column, stored) in self.columns.iter().zip(&stored) {
                let value = candidate.get_or_empty(&column.name);
                if column.unique && value == *stored {
                    return true;
                }
                if column.primary_key && value == *stored {
                    key_matches += 1;
                }
            }
            if key_columns != 0 && key_matches == key_columns {
                return true;
            }
        }

        false
    }

    fn read_lines(&self) -> TabulaResult<Vec<String>> {
        let content = fs::read_to_string(&self.path)?;
        Ok(content.lines().map(str::to_string).collect())
    }

    /// Replaces the file contents through a temp file and rename.
    fn rewrite(&self, lines: &[String]) -> TabulaResult<()> {
        let tmp_path = temp_path(&self.path);

        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&tmp_path)?;
        file.write_all(lines.join("\n").as_bytes())?;
        if self.sync_writes {
            file.sync_all()?;
        }
        drop(file);

        fs::rename(&tmp_path, &self.path)?;
        // Sync the directory so the rename survives a crash
        if self.sync_writes {
            if let Some(dir) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
                if let Ok(dir) = File::open(dir) {
                    let _ = dir.sync_all();
                }
            }
        }
        Ok(())
    }
}

/// Derives a table name from its file path.
pub fn table_name_from_path(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Returns true if `path` carries the table file extension.
pub fn has_table_extension(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext == TABLE_FILE_EXTENSION)
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".");
    name.push(TEMP_FILE_SUFFIX);
    PathBuf::from(name)
}

fn ensure_valid_values<'a>(values: impl Iterator<Item = &'a String>) -> TabulaResult<()> {
    for value in values {
        if let Some(symbol) = codec::reserved_symbol(value) {
            return Err(TabulaError::InvalidValue {
                value: value.clone(),
                symbol,
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn fields(pairs: &[(&str, &str)]) -> Fields {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn students(dir: &TempDir) -> Table {
        let mut table = Table::open(dir.path().join("students.txt")).unwrap();
        table.add_column(Column::new("id").auto_increment(), false).unwrap();
        table.add_column(Column::new("name").primary_key(), false).unwrap();
        table.add_column(Column::new("surname").primary_key(), false).unwrap();
        table
    }

    fn variants(dir: &TempDir) -> Table {
        let mut table = Table::open(dir.path().join("variants.txt")).unwrap();
        table.add_column(Column::new("id").auto_increment(), false).unwrap();
        table.add_column(Column::new("path_to_file").unique(), false).unwrap();
        table
    }

    #[test]
    fn test_open_creates_empty_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("students.txt");

        let table = Table::open(&path).unwrap();
        assert!(path.is_file());
        assert_eq!(table.name(), "students");
        assert!(table.columns().is_empty());
        assert!(table.rows().unwrap().is_empty());
    }

    #[test]
    fn test_open_directory_fails() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("students.txt");
        fs::create_dir(&path).unwrap();

        let err = Table::open(&path).unwrap_err();
        assert!(err.is_structural());
    }

    #[test]
    fn test_open_malformed_header_fails() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("students.txt");
        fs::write(&path, "id+a|name").unwrap();

        assert!(matches!(
            Table::open(&path),
            Err(TabulaError::TableInitialization { .. })
        ));
    }

    #[test]
    fn test_insert_assigns_sequence_and_sentinel() {
        let tmp = TempDir::new().unwrap();
        let mut table = students(&tmp);

        let row = table
            .insert(&fields(&[("name", "Ann"), ("id", "42")]))
            .unwrap()
            .unwrap();
        assert_eq!(row.get("id"), Some("1"));
        assert_eq!(row.get("surname"), Some("null"));

        let content = fs::read_to_string(table.path()).unwrap();
        assert_eq!(content, "id+a|name+pk|surname+pk\n1|Ann|null");
    }

    #[test]
    fn test_insert_empty_row_rejected() {
        let tmp = TempDir::new().unwrap();
        let mut table = students(&tmp);
        assert!(table.insert(&Fields::new()).unwrap().is_none());
        assert_eq!(table.sequence().current(), 1);
    }

    #[test]
    fn test_insert_rejects_separator() {
        let tmp = TempDir::new().unwrap();
        let mut table = students(&tmp);
        let err = table.insert(&fields(&[("name", "A|nn")])).unwrap_err();
        assert!(matches!(err, TabulaError::InvalidValue { .. }));
        assert!(table.rows().unwrap().is_empty());
    }

    #[test]
    fn test_insert_rejects_newline() {
        let tmp = TempDir::new().unwrap();
        let mut table = variants(&tmp);
        table.insert(&fields(&[("path_to_file", "v1")])).unwrap();

        for value in ["a\nb", "a\rb"] {
            let err = table.insert(&fields(&[("path_to_file", value)])).unwrap_err();
            assert!(matches!(err, TabulaError::InvalidValue { .. }));
        }

        let reopened = Table::open(table.path()).unwrap();
        assert_eq!(reopened.rows().unwrap().len(), 1);
        assert_eq!(reopened.sequence().current(), 2);
    }

    #[test]
    fn test_composite_primary_key() {
        let tmp = TempDir::new().unwrap();
        let mut table = students(&tmp);

        let ann_lee = fields(&[("name", "Ann"), ("surname", "Lee")]);
        assert!(table.insert(&ann_lee).unwrap().is_some());
        // Same name, different surname: only one key column matches.
        assert!(table
            .insert(&fields(&[("name", "Ann"), ("surname", "Smith")]))
            .unwrap()
            .is_some());
        assert!(table
            .insert(&fields(&[("name", "Bob"), ("surname", "Lee")]))
            .unwrap()
            .is_some());
        // All key columns match a single row.
        assert!(table.insert(&ann_lee).unwrap().is_none());

        assert_eq!(table.rows().unwrap().len(), 3);
    }

    #[test]
    fn test_unique_column() {
        let tmp = TempDir::new().unwrap();
        let mut table = variants(&tmp);

        assert!(table.insert(&fields(&[("path_to_file", "v1")])).unwrap().is_some());
        assert!(table.insert(&fields(&[("path_to_file", "v1")])).unwrap().is_none());
        assert!(table.insert(&fields(&[("path_to_file", "v2")])).unwrap().is_some());
        assert_eq!(table.rows().unwrap().len(), 2);
    }

    #[test]
    fn test_sequence_never_reused() {
        let tmp = TempDir::new().unwrap();
        let mut table = variants(&tmp);

        for name in ["a", "b", "c"] {
            table.insert(&fields(&[("path_to_file", name)])).unwrap();
        }
        assert_eq!(table.delete_rows(&fields(&[("id", "3")])).unwrap(), 1);

        let row = table.insert(&fields(&[("path_to_file", "d")])).unwrap().unwrap();
        assert_eq!(row.get("id"), Some("4"));
    }

    #[test]
    fn test_sequence_recovered_on_open() {
        let tmp = TempDir::new().unwrap();
        {
            let mut table = variants(&tmp);
            for name in ["a", "b", "c"] {
                table.insert(&fields(&[("path_to_file", name)])).unwrap();
            }
            table.delete_rows(&fields(&[("id", "1")])).unwrap();
        }

        let mut table = Table::open(tmp.path().join("variants.txt")).unwrap();
        assert_eq!(table.columns().len(), 2);
        assert_eq!(table.sequence().current(), 4);

        let row = table.insert(&fields(&[("path_to_file", "d")])).unwrap().unwrap();
        assert_eq!(row.get("id"), Some("4"));
    }

    #[test]
    fn test_open_rejects_non_numeric_sequence() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("variants.txt");
        fs::write(&path, "id+a|path_to_file+u\nx|v1").unwrap();

        assert!(Table::open(&path).unwrap_err().is_structural());
    }

    #[test]
    fn test_scan_with_conditions() {
        let tmp = TempDir::new().unwrap();
        let mut table = students(&tmp);
        table.insert(&fields(&[("name", "Ann"), ("surname", "Lee")])).unwrap();
        table.insert(&fields(&[("name", "Bob"), ("surname", "Lee")])).unwrap();
        table.insert(&fields(&[("name", "Ann"), ("surname", "Smith")])).unwrap();

        assert_eq!(table.scan(&fields(&[("surname", "Lee")])).unwrap().len(), 2);
        assert_eq!(
            table
                .scan(&fields(&[("name", "Ann"), ("surname", "Smith")]))
                .unwrap()
                .len(),
            1
        );
        // Unknown columns never exclude a row.
        assert_eq!(table.scan(&fields(&[("age", "20")])).unwrap().len(), 3);
    }

    #[test]
    fn test_update_rows() {
        let tmp = TempDir::new().unwrap();
        let mut table = students(&tmp);
        table.insert(&fields(&[("name", "Ann"), ("surname", "Lee")])).unwrap();
        table.insert(&fields(&[("name", "Bob"), ("surname", "Lee")])).unwrap();

        let updated = table
            .update(&fields(&[("name", "Ann")]), &fields(&[("surname", "Smith")]))
            .unwrap();
        assert_eq!(updated, 1);

        let rows = table.rows().unwrap();
        assert_eq!(rows[0].get("surname"), Some("Smith"));
        assert_eq!(rows[1].get("surname"), Some("Lee"));
    }

    #[test]
    fn test_update_no_match() {
        let tmp = TempDir::new().unwrap();
        let mut table = students(&tmp);
        table.insert(&fields(&[("name", "Ann"), ("surname", "Lee")])).unwrap();

        let updated = table
            .update(&fields(&[("name", "Zed")]), &fields(&[("surname", "X")]))
            .unwrap();
        assert_eq!(updated, 0);
    }

    #[test]
    fn test_update_skips_violating_row() {
        let tmp = TempDir::new().unwrap();
        let mut table = variants(&tmp);
        table.insert(&fields(&[("path_to_file", "v1")])).unwrap();
        table.insert(&fields(&[("path_to_file", "v2")])).unwrap();

        let updated = table
            .update(&fields(&[("id", "2")]), &fields(&[("path_to_file", "v1")]))
            .unwrap();
        assert_eq!(updated, 0);

        let rows = table.rows().unwrap();
        assert_eq!(rows[1].get("path_to_file"), Some("v2"));
    }

    #[test]
    fn test_update_to_own_value_is_not_a_violation() {
        let tmp = TempDir::new().unwrap();
        let mut table = variants(&tmp);
        table.insert(&fields(&[("path_to_file", "v1")])).unwrap();

        let updated = table
            .update(&fields(&[("id", "1")]), &fields(&[("path_to_file", "v1")]))
            .unwrap();
        assert_eq!(updated, 1);
    }

    #[test]
    fn test_update_checks_rows_updated_earlier() {
        let tmp = TempDir::new().unwrap();
        let mut table = variants(&tmp);
        table.insert(&fields(&[("path_to_file", "v1")])).unwrap();
        table.insert(&fields(&[("path_to_file", "v2")])).unwrap();

        // Both rows match; only the first may take the unique value.
        let updated = table
            .update(&Fields::new(), &fields(&[("path_to_file", "same")]))
            .unwrap();
        assert_eq!(updated, 1);
    }

    #[test]
    fn test_update_rejects_separator() {
        let tmp = TempDir::new().unwrap();
        let mut table = students(&tmp);
        table.insert(&fields(&[("name", "Ann"), ("surname", "Lee")])).unwrap();

        let result = table.update(&fields(&[("name", "Ann")]), &fields(&[("surname", "a|b")]));
        assert!(matches!(result, Err(TabulaError::InvalidValue { .. })));
    }

    #[test]
    fn test_update_rejects_newline() {
        let tmp = TempDir::new().unwrap();
        let mut table = variants(&tmp);
        table.insert(&fields(&[("path_to_file", "v1")])).unwrap();

        let result = table.update(
            &fields(&[("path_to_file", "v1")]),
            &fields(&[("path_to_file", "a\nb")]),
        );
        assert!(matches!(
            result,
            Err(TabulaError::InvalidValue { symbol: '\n', .. })
        ));

        let content = fs::read_to_string(table.path()).unwrap();
        assert_eq!(content, "id+a|path_to_file+u\n1|v1");
    }

    #[test]
    fn test_open_rejects_exhausted_sequence() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("variants.txt");
        fs::write(&path, format!("id+a|path_to_file+u\n{}|v1", u64::MAX)).unwrap();

        let err = Table::open(&path).unwrap_err();
        assert!(matches!(err, TabulaError::TableInitialization { .. }));
        assert!(err.to_string().contains("out of range"));
    }

    #[test]
    fn test_rewrite_with_sync_writes() {
        let tmp = TempDir::new().unwrap();
        let mut table = variants(&tmp);
        table.insert(&fields(&[("path_to_file", "v1")])).unwrap();
        table.insert(&fields(&[("path_to_file", "v2")])).unwrap();

        assert_eq!(table.delete_rows(&fields(&[("id", "1")])).unwrap(), 1);
        assert!(!temp_path(table.path()).exists());
        let content = fs::read_to_string(table.path()).unwrap();
        assert_eq!(content, "id+a|path_to_file+u\n2|v2");
    }

    #[test]
    fn test_delete_rows() {
        let tmp = TempDir::new().unwrap();
        let mut table = students(&tmp);
        table.insert(&fields(&[("name", "Ann"), ("surname", "Lee")])).unwrap();
        table.insert(&fields(&[("name", "Bob"), ("surname", "Lee")])).unwrap();
        table.insert(&fields(&[("name", "Cid"), ("surname", "Ray")])).unwrap();

        assert_eq!(table.delete_rows(&fields(&[("surname", "Lee")])).unwrap(), 2);
        assert_eq!(table.delete_rows(&fields(&[("surname", "Lee")])).unwrap(), 0);

        let rows = table.rows().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("name"), Some("Cid"));

        let content = fs::read_to_string(table.path()).unwrap();
        assert_eq!(content, "id+a|name+pk|surname+pk\n3|Cid|Ray");
    }

    #[test]
    fn test_add_column_existing() {
        let tmp = TempDir::new().unwrap();
        let mut table = students(&tmp);
        let err = table.add_column(Column::new("name"), false).unwrap_err();
        assert!(matches!(err, TabulaError::ColumnExists { .. }));
    }

    #[test]
    fn test_add_column_requires_opt_in_when_rows_exist() {
        let tmp = TempDir::new().unwrap();
        let mut table = students(&tmp);
        table.insert(&fields(&[("name", "Ann"), ("surname", "Lee")])).unwrap();

        let err = table.add_column(Column::new("patronymic"), false).unwrap_err();
        assert!(matches!(err, TabulaError::DestructiveChange { rows: 1, .. }));
        assert_eq!(table.rows().unwrap().len(), 1);

        table.add_column(Column::new("patronymic"), true).unwrap();
        assert_eq!(table.columns().len(), 4);
        assert!(table.rows().unwrap().is_empty());

        let content = fs::read_to_string(table.path()).unwrap();
        assert_eq!(content, "id+a|name+pk|surname+pk|patronymic+");
    }

    #[test]
    fn test_delete_removes_file() {
        let tmp = TempDir::new().unwrap();
        let table = students(&tmp);
        let path = table.path().to_path_buf();

        table.delete().unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn test_rewrite_leaves_no_temp_file() {
        let tmp = TempDir::new().unwrap();
        let mut table = students(&tmp);
        table.insert(&fields(&[("name", "Ann"), ("surname", "Lee")])).unwrap();
        table.delete_rows(&fields(&[("name", "Ann")])).unwrap();

        assert!(!temp_path(table.path()).exists());
    }

    #[test]
    fn test_table_name_helpers() {
        let path = Path::new("/data/school/students.txt");
        assert_eq!(table_name_from_path(path), "students");
        assert!(has_table_extension(path));
        assert!(!has_table_extension(Path::new("students.csv")));
    }
}
