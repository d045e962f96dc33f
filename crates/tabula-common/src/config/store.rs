//! Store configuration structures.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::constants::WORKDIR_NAME;

/// What happens to assignment-view rows when their variant is deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CatalogDeletePolicy {
    /// Replace the view row's variant descriptor with the empty-field sentinel.
    #[default]
    ClearDescriptor,
    /// Delete the view row outright.
    RemoveRow,
}

/// How a student's full name maps to name parts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FullNamePolicy {
    /// One to three space-separated parts; missing parts are the sentinel.
    #[default]
    Flexible,
    /// Exactly three parts, sentinel parts included verbatim.
    FixedThreeParts,
}

/// Configuration of the storage layer.
///
/// # Example
///
/// ```rust
/// use tabula_common::config::{CatalogDeletePolicy, StoreConfig};
///
/// let config = StoreConfig::default().with_catalog_delete(CatalogDeletePolicy::RemoveRow);
/// assert_eq!(config.catalog_delete, CatalogDeletePolicy::RemoveRow);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Directory holding one sub-directory per schema.
    pub workdir: PathBuf,

    /// Sync rewritten table files before renaming them into place.
    pub sync_writes: bool,

    /// Cascade applied to the assignment view on catalog deletes.
    pub catalog_delete: CatalogDeletePolicy,

    /// Full-name construction used by roster and view triggers.
    pub full_name: FullNamePolicy,

    /// Permit `add_column` on a table that already holds rows.
    pub allow_destructive_add_column: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            workdir: PathBuf::from(".").join(WORKDIR_NAME),
            sync_writes: true,
            catalog_delete: CatalogDeletePolicy::default(),
            full_name: FullNamePolicy::default(),
            allow_destructive_add_column: false,
        }
    }
}

impl StoreConfig {
    /// Creates a configuration rooted at the given working directory.
    #[must_use]
    pub fn with_workdir(workdir: impl Into<PathBuf>) -> Self {
        Self {
            workdir: workdir.into(),
            ..Default::default()
        }
    }

    /// Sets the catalog delete policy.
    #[must_use]
    pub fn with_catalog_delete(mut self, policy: CatalogDeletePolicy) -> Self {
        self.catalog_delete = policy;
        self
    }

    /// Sets the full-name policy.
    #[must_use]
    pub fn with_full_name(mut self, policy: FullNamePolicy) -> Self {
        self.full_name = policy;
        self
    }

    /// Enables or disables syncing of rewritten files.
    #[must_use]
    pub fn with_sync_writes(mut self, sync: bool) -> Self {
        self.sync_writes = sync;
        self
    }

    /// Allows `add_column` to discard existing rows.
    #[must_use]
    pub fn with_destructive_add_column(mut self, allow: bool) -> Self {
        self.allow_destructive_add_column = allow;
        self
    }
}
