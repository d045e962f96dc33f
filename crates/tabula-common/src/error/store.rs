//! Store error types.
//!
//! Constraint violations and "no rows matched" outcomes are not errors:
//! the table engine reports them as status values. Everything here is a
//! structural, I/O, or usage failure.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Error codes for categorizing errors.
///
/// These codes can be used for programmatic error handling and
/// are stable across versions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum ErrorCode {
    // General errors (0x0000 - 0x00FF)
    /// Invalid argument provided.
    InvalidArgument = 0x0003,

    // I/O errors (0x0100 - 0x01FF)
    /// General I/O error.
    Io = 0x0100,
    /// Path is missing or of the wrong type.
    InvalidPath = 0x0101,

    // Storage errors (0x0200 - 0x02FF)
    /// Table file could not be initialized.
    TableInitialization = 0x0200,
    /// Value contains a reserved character.
    InvalidValue = 0x0201,
    /// Operation would discard existing rows.
    DestructiveChange = 0x0202,
    /// Column already exists.
    ColumnExists = 0x0203,

    // Schema errors (0x0300 - 0x03FF)
    /// Schema directory could not be initialized.
    SchemaInitialization = 0x0300,
    /// Table name is not one of the known kinds.
    UnknownTableKind = 0x0301,
    /// Table not found in schema.
    TableNotFound = 0x0302,
    /// Table already exists in schema.
    TableExists = 0x0303,
    /// Schema not found.
    SchemaNotFound = 0x0304,
    /// Schema already exists.
    SchemaExists = 0x0305,
}

impl ErrorCode {
    /// Returns the numeric code.
    #[inline]
    #[must_use]
    pub const fn as_u16(self) -> u16 {
        self as u16
    }

    /// Returns the error category name.
    #[must_use]
    pub const fn category(&self) -> &'static str {
        match (*self as u16) >> 8 {
            0x00 => "General",
            0x01 => "I/O",
            0x02 => "Storage",
            0x03 => "Schema",
            _ => "Unknown",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// The main error type for Tabula.
#[derive(Debug, Error)]
pub enum TabulaError {
    // ==========================================================================
    // General Errors
    // ==========================================================================
    /// Invalid argument provided.
    #[error("invalid argument: {message}")]
    InvalidArgument {
        /// Error message.
        message: String,
    },

    // ==========================================================================
    // I/O Errors
    // ==========================================================================
    /// I/O error from the underlying system.
    #[error("I/O error: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Path is missing or not of the expected type.
    #[error("invalid path {}: {reason}", path.display())]
    InvalidPath {
        /// The offending path.
        path: PathBuf,
        /// Why the path was rejected.
        reason: String,
    },

    // ==========================================================================
    // Storage Errors
    // ==========================================================================
    /// A table file could not be initialized.
    #[error("cannot initialize table '{table}' from {}: {reason}", path.display())]
    TableInitialization {
        /// Table name.
        table: String,
        /// Backing file path.
        path: PathBuf,
        /// Reason for failure.
        reason: String,
    },

    /// A value contains a reserved symbol.
    #[error("value {value:?} cannot contain symbol {symbol:?}")]
    InvalidValue {
        /// The rejected value.
        value: String,
        /// The reserved character.
        symbol: char,
    },

    /// Adding a column would discard existing rows.
    #[error("adding column '{column}' to table '{table}' would discard {rows} existing row(s)")]
    DestructiveChange {
        /// Table name.
        table: String,
        /// Column being added.
        column: String,
        /// Number of rows that would be lost.
        rows: usize,
    },

    /// Column already exists.
    #[error("column '{column}' already exists in table '{table}'")]
    ColumnExists {
        /// Table name.
        table: String,
        /// Column name.
        column: String,
    },

    // ==========================================================================
    // Schema Errors
    // ==========================================================================
    /// A schema directory could not be initialized.
    #[error("cannot initialize schema '{schema}' from {}: {reason}", path.display())]
    SchemaInitialization {
        /// Schema name.
        schema: String,
        /// Backing directory path.
        path: PathBuf,
        /// Reason for failure.
        reason: String,
    },

    /// Table name is not a recognized table kind.
    #[error("unknown table '{name}', expected one of: {expected}")]
    UnknownTableKind {
        /// The requested name.
        name: String,
        /// Comma-separated list of known names.
        expected: String,
    },

    /// Table not found.
    #[error("there is no table '{table}' in schema '{schema}'")]
    TableNotFound {
        /// Schema name.
        schema: String,
        /// Table name.
        table: String,
    },

    /// Table already exists.
    #[error("table '{table}' already exists in schema '{schema}'")]
    TableExists {
        /// Schema name.
        schema: String,
        /// Table name.
        table: String,
    },

    /// Schema not found.
    #[error("there is no schema '{0}'")]
    SchemaNotFound(String),

    /// Schema already exists.
    #[error("schema '{0}' already exists")]
    SchemaExists(String),
}

impl TabulaError {
    /// Creates an invalid argument error.
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Creates an invalid path error.
    pub fn invalid_path(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::InvalidPath {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Creates a table initialization error.
    pub fn table_init(
        table: impl Into<String>,
        path: impl Into<PathBuf>,
        reason: impl Into<String>,
    ) -> Self {
        Self::TableInitialization {
            table: table.into(),
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Creates a schema initialization error.
    pub fn schema_init(
        schema: impl Into<String>,
        path: impl Into<PathBuf>,
        reason: impl Into<String>,
    ) -> Self {
        Self::SchemaInitialization {
            schema: schema.into(),
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Creates a table not found error.
    pub fn table_not_found(schema: impl Into<String>, table: impl Into<String>) -> Self {
        Self::TableNotFound {
            schema: schema.into(),
            table: table.into(),
        }
    }

    /// Returns the error code for this error.
    #[must_use]
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::InvalidArgument { .. } => ErrorCode::InvalidArgument,
            Self::Io { .. } => ErrorCode::Io,
            Self::InvalidPath { .. } => ErrorCode::InvalidPath,
            Self::TableInitialization { .. } => ErrorCode::TableInitialization,
            Self::InvalidValue { .. } => ErrorCode::InvalidValue,
            Self::DestructiveChange { .. } => ErrorCode::DestructiveChange,
            Self::ColumnExists { .. } => ErrorCode::ColumnExists,
            Self::SchemaInitialization { .. } => ErrorCode::SchemaInitialization,
            Self::UnknownTableKind { .. } => ErrorCode::UnknownTableKind,
            Self::TableNotFound { .. } => ErrorCode::TableNotFound,
            Self::TableExists { .. } => ErrorCode::TableExists,
            Self::SchemaNotFound(_) => ErrorCode::SchemaNotFound,
            Self::SchemaExists(_) => ErrorCode::SchemaExists,
        }
    }

    /// Returns true if this error aborts construction of a table or schema.
    #[must_use]
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            Self::TableInitialization { .. } | Self::SchemaInitialization { .. }
        )
    }
}
