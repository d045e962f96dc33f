//! System-wide constants for Tabula.
//!
//! These values define the on-disk format and are shared by every
//! component that reads or writes table files.

// =============================================================================
// Record Format
// =============================================================================

/// Separator between fields of a header or data line.
///
/// Values containing this character are rejected, never escaped.
pub const TABLE_DATA_SEPARATOR: char = '|';

/// Symbols a stored value cannot contain: the data separator and the
/// line terminators.
pub const RESERVED_VALUE_SYMBOLS: [char; 3] = [TABLE_DATA_SEPARATOR, '\n', '\r'];

/// Separator between a column name and its flags in the header line.
pub const COLUMN_METADATA_SEPARATOR: char = '+';

/// Value stored for a column the caller did not supply.
pub const EMPTY_FIELD_VALUE: &str = "null";

/// Flag token for a unique column.
pub const FLAG_UNIQUE: &str = "u";

/// Flag token for a primary-key member column.
pub const FLAG_PRIMARY_KEY: &str = "pk";

/// Flag token for an auto-increment column.
pub const FLAG_AUTO_INCREMENT: &str = "a";

/// First value handed out by a fresh sequence.
pub const SEQUENCE_START: u64 = 1;

// =============================================================================
// File Layout
// =============================================================================

/// Extension of table files, without the leading dot.
pub const TABLE_FILE_EXTENSION: &str = "txt";

/// Suffix appended to a table path while it is being rewritten.
pub const TEMP_FILE_SUFFIX: &str = "tmp";

/// Default name of the directory holding all schemas.
pub const WORKDIR_NAME: &str = "workdir";

// =============================================================================
// Command Input
// =============================================================================

/// Quote character delimiting literals that contain spaces.
pub const QUOTE: char = '\'';
