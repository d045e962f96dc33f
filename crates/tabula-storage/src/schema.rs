//! Schema registry.
//!
//! A schema is a directory holding at most one file per [`TableKind`].
//! Row operations that cascade across tables live in [`crate::cascade`].

use std::fs;
use std::path::{Path, PathBuf};

use tabula_common::{StoreConfig, TabulaError, TabulaResult, TABLE_FILE_EXTENSION};
use tracing::{info, warn};

use crate::codec::Column;
use crate::fs::copy_dir_recursive;
use crate::kind::TableKind;
use crate::table::{has_table_extension, table_name_from_path, Table};

/// A named collection of tables backed by one directory.
#[derive(Debug)]
pub struct Schema {
    name: String,
    directory: PathBuf,
    pub(crate) tables: Vec<Table>,
    pub(crate) config: StoreConfig,
}

impl Schema {
    /// Opens a schema directory, creating it if absent.
    ///
    /// Only the top level is scanned. Files named after a table kind are
    /// loaded; anything else is ignored. A table that fails to load aborts
    /// the whole schema.
    pub fn open(directory: impl AsRef<Path>, config: StoreConfig) -> TabulaResult<Self> {
        let directory = directory.as_ref().to_path_buf();
        let name = directory
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let mut schema = Self {
            name,
            directory,
            tables: Vec::new(),
            config,
        };

        if schema.directory.is_file() {
            return Err(TabulaError::schema_init(
                &schema.name,
                &schema.directory,
                "it is a file",
            ));
        }

        if schema.directory.exists() {
            for kind in TableKind::ALL {
                let path = schema.table_path(kind.table_name());
                if path.is_file() {
                    let table = schema.open_table(kind, &path)?;
                    schema.tables.push(table);
                }
            }
        } else {
            fs::create_dir_all(&schema.directory)?;
        }

        info!(schema = %schema.name, tables = schema.tables.len(), "Schema has been initialized successfully");
        Ok(schema)
    }

    /// Opens a table file and makes sure it carries its kind's columns.
    fn open_table(&self, kind: TableKind, path: &Path) -> TabulaResult<Table> {
        let mut table = Table::open_with(path, self.config.sync_writes)?;

        if table.columns().is_empty() {
            for column in kind.columns() {
                table.add_column(column, false)?;
            }
        } else if let Some(missing) = kind
            .columns()
            .into_iter()
            .find(|column| table.column(&column.name).is_none())
        {
            return Err(TabulaError::table_init(
                kind.table_name(),
                path,
                format!("missing column '{}'", missing.name),
            ));
        }

        Ok(table)
    }

    /// Returns the schema name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the backing directory.
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Returns the store configuration in effect.
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    fn table_path(&self, table: &str) -> PathBuf {
        self.directory
            .join(format!("{table}.{TABLE_FILE_EXTENSION}"))
    }

    // =========================================================================
    // Table Lifecycle
    // =========================================================================

    /// Creates a table of a known kind, loading its file if one exists.
    pub fn create_table(&mut self, name: &str) -> TabulaResult<&mut Table> {
        let kind = TableKind::parse(name)?;
        if self.contains_table(name) {
            return Err(TabulaError::TableExists {
                schema: self.name.clone(),
                table: name.to_string(),
            });
        }

        let path = self.table_path(name);
        let table = self.open_table(kind, &path)?;
        info!(schema = %self.name, table = name, "Table has been created");

        self.tables.push(table);
        let index = self.tables.len() - 1;
        Ok(&mut self.tables[index])
    }

    /// Creates the table of `kind` unless it is already registered.
    pub(crate) fn ensure_table(&mut self, kind: TableKind) -> TabulaResult<()> {
        if !self.contains_table(kind.table_name()) {
            self.create_table(kind.table_name())?;
        }
        Ok(())
    }

    /// Finds a table by name.
    pub fn find_table(&self, name: &str) -> Option<&Table> {
        self.tables.iter().find(|t| t.name() == name)
    }

    /// Finds a table by name for mutation.
    pub fn find_table_mut(&mut self, name: &str) -> Option<&mut Table> {
        self.tables.iter_mut().find(|t| t.name() == name)
    }

    /// Returns true if a table is registered under `name`.
    pub fn contains_table(&self, name: &str) -> bool {
        self.find_table(name).is_some()
    }

    /// Returns the registered tables in load order.
    pub fn tables(&self) -> &[Table] {
        &self.tables
    }

    /// Deletes a table and its file. Returns false if no such table exists.
    pub fn delete_table(&mut self, name: &str) -> TabulaResult<bool> {
        let Some(index) = self.tables.iter().position(|t| t.name() == name) else {
            info!(schema = %self.name, table = name, "There is no such table in schema");
            return Ok(false);
        };

        self.tables.remove(index).delete()?;
        Ok(true)
    }

    /// Adds a column to a table.
    ///
    /// Discarding existing rows requires `force` or the
    /// `allow_destructive_add_column` setting.
    pub fn add_column(&mut self, table: &str, column: Column, force: bool) -> TabulaResult<()> {
        let allow = force || self.config.allow_destructive_add_column;
        let schema = self.name.clone();
        self.find_table_mut(table)
            .ok_or_else(|| TabulaError::table_not_found(schema, table))?
            .add_column(column, allow)
    }

    /// Deletes every table, then the directory itself.
    pub fn delete(mut self) -> TabulaResult<()> {
        for table in self.tables.drain(..) {
            table.delete()?;
        }
        fs::remove_dir_all(&self.directory)?;
        info!(schema = %self.name, "Schema has been deleted successfully");
        Ok(())
    }

    // =========================================================================
    // Copy And Load
    // =========================================================================

    /// Copies a table file into this schema and registers it.
    ///
    /// The file must exist, carry the table extension and be named after a
    /// table kind not yet present. If the copied file cannot be loaded it is
    /// removed again.
    pub fn load_table_from_file(&mut self, path: impl AsRef<Path>) -> TabulaResult<&mut Table> {
        let source = path.as_ref();
        if !source.exists() {
            return Err(TabulaError::invalid_path(source, "no such file"));
        }
        if source.is_dir() {
            return Err(TabulaError::invalid_path(
                source,
                "table must be a file, but found directory",
            ));
        }
        if !has_table_extension(source) {
            return Err(TabulaError::invalid_path(
                source,
                format!("table must be a file with .{TABLE_FILE_EXTENSION} extension"),
            ));
        }

        let name = table_name_from_path(source);
        TableKind::parse(&name)?;
        if self.contains_table(&name) {
            return Err(TabulaError::TableExists {
                schema: self.name.clone(),
                table: name,
            });
        }

        let target = self.table_path(&name);
        fs::copy(source, &target)?;

        let created = self.create_table(&name).map(|_| ());
        if let Err(e) = created {
            warn!(schema = %self.name, table = %name, error = %e, "Removing table file that failed to load");
            fs::remove_file(&target)?;
            return Err(e);
        }

        info!(schema = %self.name, table = %name, source = %source.display(), "Table has been loaded from file");
        let index = self.tables.len() - 1;
        Ok(&mut self.tables[index])
    }

    /// Copies the schema directory to `<directory>/<schema name>`.
    pub fn copy_to(&self, directory: impl AsRef<Path>) -> TabulaResult<PathBuf> {
        let directory = directory.as_ref();
        if !directory.exists() {
            return Err(TabulaError::invalid_path(directory, "directory doesn't exist"));
        }
        if !directory.is_dir() {
            return Err(TabulaError::invalid_path(
                directory,
                "expected path to directory, not to file",
            ));
        }

        let target = directory.join(&self.name);
        copy_dir_recursive(&self.directory, &target)?;
        info!(schema = %self.name, target = %target.display(), "Schema has been copied");
        Ok(target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kind::{STUDENTS, VARIANTS};
    use tempfile::TempDir;

    fn open(tmp: &TempDir) -> Schema {
        Schema::open(tmp.path().join("school"), StoreConfig::default()).unwrap()
    }

    #[test]
    fn test_open_creates_directory() {
        let tmp = TempDir::new().unwrap();
        let schema = open(&tmp);
        assert_eq!(schema.name(), "school");
        assert!(schema.directory().is_dir());
        assert!(schema.tables().is_empty());
    }

    #[test]
    fn test_open_file_fails() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("school");
        fs::write(&path, "").unwrap();

        let err = Schema::open(&path, StoreConfig::default()).unwrap_err();
        assert!(err.is_structural());
    }

    #[test]
    fn test_create_table_writes_kind_header() {
        let tmp = TempDir::new().unwrap();
        let mut schema = open(&tmp);

        let table = schema.create_table(STUDENTS).unwrap();
        let content = fs::read_to_string(table.path()).unwrap();
        assert_eq!(content, "id+a|name+pk|surname+pk|patronymic+pk");
        assert!(schema.contains_table(STUDENTS));
    }

    #[test]
    fn test_create_unknown_table_fails() {
        let tmp = TempDir::new().unwrap();
        let mut schema = open(&tmp);

        let err = schema.create_table("grades").unwrap_err();
        assert!(matches!(err, TabulaError::UnknownTableKind { .. }));
        assert!(schema.tables().is_empty());
        assert!(!schema.directory().join("grades.txt").exists());
    }

    #[test]
    fn test_create_existing_table_fails() {
        let tmp = TempDir::new().unwrap();
        let mut schema = open(&tmp);
        schema.create_table(VARIANTS).unwrap();

        let err = schema.create_table(VARIANTS).unwrap_err();
        assert!(matches!(err, TabulaError::TableExists { .. }));
        assert_eq!(schema.tables().len(), 1);
    }

    #[test]
    fn test_reopen_loads_known_tables_only() {
        let tmp = TempDir::new().unwrap();
        {
            let mut schema = open(&tmp);
            schema.create_table(STUDENTS).unwrap();
            schema.create_table(VARIANTS).unwrap();
        }
        fs::write(tmp.path().join("school").join("notes.txt"), "x+").unwrap();

        let schema = open(&tmp);
        let names: Vec<_> = schema.tables().iter().map(|t| t.name()).collect();
        assert_eq!(names, vec![STUDENTS, VARIANTS]);
    }

    #[test]
    fn test_open_rejects_table_missing_kind_columns() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("school");
        fs::create_dir(&dir).unwrap();
        fs::write(dir.join("variants.txt"), "id+a").unwrap();

        let err = Schema::open(&dir, StoreConfig::default()).unwrap_err();
        assert!(err.is_structural());
    }

    #[test]
    fn test_delete_table() {
        let tmp = TempDir::new().unwrap();
        let mut schema = open(&tmp);
        let path = schema.create_table(STUDENTS).unwrap().path().to_path_buf();

        assert!(schema.delete_table(STUDENTS).unwrap());
        assert!(!path.exists());
        assert!(!schema.delete_table(STUDENTS).unwrap());
    }

    #[test]
    fn test_delete_schema() {
        let tmp = TempDir::new().unwrap();
        let mut schema = open(&tmp);
        schema.create_table(STUDENTS).unwrap();
        let dir = schema.directory().to_path_buf();

        schema.delete().unwrap();
        assert!(!dir.exists());
    }

    #[test]
    fn test_add_column_respects_opt_in() {
        let tmp = TempDir::new().unwrap();
        let mut schema = open(&tmp);
        schema.create_table(VARIANTS).unwrap();
        schema
            .find_table_mut(VARIANTS)
            .unwrap()
            .insert(&[("path_to_file".to_string(), "v1".to_string())].into_iter().collect())
            .unwrap();

        let err = schema
            .add_column(VARIANTS, Column::new("weight"), false)
            .unwrap_err();
        assert!(matches!(err, TabulaError::DestructiveChange { .. }));

        schema.add_column(VARIANTS, Column::new("weight"), true).unwrap();
        assert_eq!(schema.find_table(VARIANTS).unwrap().columns().len(), 3);

        let err = schema.add_column("students", Column::new("x"), true).unwrap_err();
        assert!(matches!(err, TabulaError::TableNotFound { .. }));
    }

    #[test]
    fn test_load_table_from_file() {
        let tmp = TempDir::new().unwrap();
        let source = tmp.path().join("variants.txt");
        fs::write(&source, "id+a|path_to_file+u\n1|v1\n2|v2").unwrap();

        let mut schema = open(&tmp);
        let table = schema.load_table_from_file(&source).unwrap();
        assert_eq!(table.rows().unwrap().len(), 2);
        assert_eq!(table.sequence().current(), 3);
        assert!(schema.directory().join("variants.txt").is_file());
    }

    #[test]
    fn test_load_table_from_file_rejections() {
        let tmp = TempDir::new().unwrap();
        let mut schema = open(&tmp);

        let missing = schema.load_table_from_file(tmp.path().join("none.txt"));
        assert!(matches!(missing, Err(TabulaError::InvalidPath { .. })));

        let csv = tmp.path().join("students.csv");
        fs::write(&csv, "").unwrap();
        assert!(matches!(
            schema.load_table_from_file(&csv),
            Err(TabulaError::InvalidPath { .. })
        ));

        let unknown = tmp.path().join("grades.txt");
        fs::write(&unknown, "x+").unwrap();
        assert!(matches!(
            schema.load_table_from_file(&unknown),
            Err(TabulaError::UnknownTableKind { .. })
        ));
        assert!(!schema.directory().join("grades.txt").exists());
    }

    #[test]
    fn test_load_malformed_table_removes_copy() {
        let tmp = TempDir::new().unwrap();
        let source = tmp.path().join("students.txt");
        fs::write(&source, "id+a|name").unwrap();

        let mut schema = open(&tmp);
        let err = schema.load_table_from_file(&source).unwrap_err();
        assert!(err.is_structural());
        assert!(!schema.directory().join("students.txt").exists());
        assert!(!schema.contains_table(STUDENTS));
    }

    #[test]
    fn test_copy_to() {
        let tmp = TempDir::new().unwrap();
        let backup = TempDir::new().unwrap();
        let mut schema = open(&tmp);
        schema.create_table(STUDENTS).unwrap();

        let target = schema.copy_to(backup.path()).unwrap();
        assert_eq!(target, backup.path().join("school"));
        assert!(target.join("students.txt").is_file());

        let err = schema.copy_to(backup.path().join("missing")).unwrap_err();
        assert!(matches!(err, TabulaError::InvalidPath { .. }));
    }
}
