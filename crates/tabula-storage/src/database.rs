//! Process context: every schema under the working directory plus the
//! current default schema.

use std::fs;
use std::path::{Path, PathBuf};

use tabula_common::{StoreConfig, TabulaError, TabulaResult};
use tracing::{info, warn};

use crate::fs::copy_dir_recursive;
use crate::schema::Schema;

/// Where a restore put its tables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Restored {
    /// The directory became a new schema of this name.
    Schema(String),
    /// These tables were loaded into the default schema.
    Tables(Vec<String>),
}

/// All schemas of one working directory.
#[derive(Debug)]
pub struct Database {
    config: StoreConfig,
    schemas: Vec<Schema>,
    default_schema: Option<String>,
}

impl Database {
    /// Opens the working directory, creating it if absent.
    ///
    /// Every sub-directory is opened as a schema. A schema that fails to
    /// open is skipped with a warning so the rest stay usable.
    pub fn open(config: StoreConfig) -> TabulaResult<Self> {
        let workdir = config.workdir.clone();
        if workdir.is_file() {
            return Err(TabulaError::invalid_path(
                &workdir,
                "working directory is a file",
            ));
        }
        fs::create_dir_all(&workdir)?;

        let mut paths: Vec<PathBuf> = fs::read_dir(&workdir)?
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.is_dir())
            .collect();
        paths.sort();

        let mut schemas = Vec::with_capacity(paths.len());
        for path in paths {
            match Schema::open(&path, config.clone()) {
                Ok(schema) => schemas.push(schema),
                Err(e) => warn!(path = %path.display(), error = %e, "Skipping schema that failed to load"),
            }
        }

        info!(workdir = %workdir.display(), schemas = schemas.len(), "Database has been opened");
        Ok(Self {
            config,
            schemas,
            default_schema: None,
        })
    }

    /// Returns the store configuration.
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Returns the working directory.
    pub fn workdir(&self) -> &Path {
        &self.config.workdir
    }

    /// Returns every schema in load order.
    pub fn schemas(&self) -> &[Schema] {
        &self.schemas
    }

    /// Finds a schema by name.
    pub fn find_schema(&self, name: &str) -> Option<&Schema> {
        self.schemas.iter().find(|s| s.name() == name)
    }

    /// Finds a schema by name for mutation.
    pub fn find_schema_mut(&mut self, name: &str) -> Option<&mut Schema> {
        self.schemas.iter_mut().find(|s| s.name() == name)
    }

    /// Creates a schema directory under the working directory.
    pub fn create_schema(&mut self, name: &str) -> TabulaResult<&mut Schema> {
        validate_schema_name(name)?;
        if self.find_schema(name).is_some() {
            return Err(TabulaError::SchemaExists(name.to_string()));
        }

        let schema = Schema::open(self.workdir().join(name), self.config.clone())?;
        self.schemas.push(schema);
        let index = self.schemas.len() - 1;
        Ok(&mut self.schemas[index])
    }

    /// Deletes a schema with all of its tables.
    ///
    /// Clears the default schema if it was the one deleted.
    pub fn delete_schema(&mut self, name: &str) -> TabulaResult<()> {
        let index = self
            .schemas
            .iter()
            .position(|s| s.name() == name)
            .ok_or_else(|| TabulaError::SchemaNotFound(name.to_string()))?;

        self.schemas.remove(index).delete()?;
        if self.default_schema.as_deref() == Some(name) {
            self.default_schema = None;
        }
        Ok(())
    }

    // =========================================================================
    // Default Schema
    // =========================================================================

    /// Makes an existing schema the default.
    pub fn set_default_schema(&mut self, name: &str) -> TabulaResult<()> {
        if self.find_schema(name).is_none() {
            return Err(TabulaError::SchemaNotFound(name.to_string()));
        }
        self.default_schema = Some(name.to_string());
        Ok(())
    }

    /// Unsets the default schema.
    pub fn reset_default_schema(&mut self) {
        self.default_schema = None;
    }

    /// Returns the default schema name.
    pub fn default_schema_name(&self) -> Option<&str> {
        self.default_schema.as_deref()
    }

    /// Returns the default schema.
    pub fn default_schema(&self) -> Option<&Schema> {
        self.default_schema
            .as_deref()
            .and_then(|name| self.find_schema(name))
    }

    /// Returns the default schema for mutation.
    pub fn default_schema_mut(&mut self) -> Option<&mut Schema> {
        let name = self.default_schema.clone()?;
        self.find_schema_mut(&name)
    }

    // =========================================================================
    // Backup
    // =========================================================================

    /// Restores tables from a backup directory.
    ///
    /// With a default schema, every file of `source` is loaded into it as a
    /// table; a nested directory aborts the restore. Without one, `source`
    /// is copied into the working directory and opened as a new schema.
    pub fn restore_from(&mut self, source: impl AsRef<Path>) -> TabulaResult<Restored> {
        let source = source.as_ref();
        if !source.is_dir() {
            return Err(TabulaError::invalid_path(source, "expected path to directory"));
        }

        if let Some(schema) = self.default_schema_mut() {
            let mut files: Vec<PathBuf> = fs::read_dir(source)?
                .filter_map(|e| e.ok())
                .map(|e| e.path())
                .collect();
            files.sort();

            if let Some(nested) = files.iter().find(|p| p.is_dir()) {
                return Err(TabulaError::invalid_path(
                    nested,
                    "expected files only, but found directory",
                ));
            }

            let mut loaded = Vec::with_capacity(files.len());
            for file in files {
                let table = schema.load_table_from_file(&file)?;
                loaded.push(table.name().to_string());
            }
            return Ok(Restored::Tables(loaded));
        }

        let name = source
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| TabulaError::invalid_path(source, "cannot derive schema name"))?;
        validate_schema_name(&name)?;
        if self.find_schema(&name).is_some() {
            return Err(TabulaError::SchemaExists(name));
        }

        let target = self.workdir().join(&name);
        copy_dir_recursive(source, &target)?;
        match Schema::open(&target, self.config.clone()) {
            Ok(schema) => {
                self.schemas.push(schema);
                info!(schema = %name, "Schema has been restored");
                Ok(Restored::Schema(name))
            }
            Err(e) => {
                fs::remove_dir_all(&target)?;
                Err(e)
            }
        }
    }
}

fn validate_schema_name(name: &str) -> TabulaResult<()> {
    let valid = !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains(['/', '\\']);
    if valid {
        Ok(())
    } else {
        Err(TabulaError::invalid_argument(format!(
            "'{name}' is not a valid schema name"
        )))
    }
}
