//! The closed set of table kinds a schema can hold.

use std::fmt;

use tabula_common::{TabulaError, TabulaResult};

use crate::codec::Column;

/// Roster table name.
pub const STUDENTS: &str = "students";
/// Catalog table name.
pub const VARIANTS: &str = "variants";
/// Assignment table name.
pub const STUDENTS_VARIANTS: &str = "students_variants";
/// Assignment view table name.
pub const STUDENTS_VARIANTS_FULL: &str = "students_variants_full";

/// Column names shared across kinds.
pub mod col {
    /// Auto-increment id of roster and catalog rows.
    pub const ID: &str = "id";
    /// Roster first name.
    pub const NAME: &str = "name";
    /// Roster surname.
    pub const SURNAME: &str = "surname";
    /// Roster patronymic.
    pub const PATRONYMIC: &str = "patronymic";
    /// Catalog variant descriptor, also carried by the view.
    pub const PATH_TO_FILE: &str = "path_to_file";
    /// Assignment reference to a roster id.
    pub const STUDENT_ID: &str = "student_id";
    /// Assignment reference to a catalog id.
    pub const VARIANT_ID: &str = "variant_id";
    /// View key built from the roster name parts.
    pub const FULL_NAME: &str = "full_name";
    /// View grade.
    pub const MARK: &str = "mark";
}

/// A recognized table kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TableKind {
    /// Students: `id`, `name`, `surname`, `patronymic`.
    Roster,
    /// Variants: `id`, `path_to_file`.
    Catalog,
    /// Student to variant links: `student_id`, `variant_id`.
    Assignment,
    /// Denormalized join: `full_name`, `path_to_file`, `mark`.
    AssignmentView,
}

impl TableKind {
    /// All kinds, in cascade dependency order.
    pub const ALL: [TableKind; 4] = [
        TableKind::Roster,
        TableKind::Catalog,
        TableKind::Assignment,
        TableKind::AssignmentView,
    ];

    /// Maps an exact table name to its kind.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.table_name() == name)
    }

    /// Like [`TableKind::from_name`], but an unknown name is an error.
    pub fn parse(name: &str) -> TabulaResult<Self> {
        Self::from_name(name).ok_or_else(|| TabulaError::UnknownTableKind {
            name: name.to_string(),
            expected: Self::ALL
                .iter()
                .map(|kind| kind.table_name())
                .collect::<Vec<_>>()
                .join(", "),
        })
    }

    /// Returns the fixed table name.
    pub const fn table_name(self) -> &'static str {
        match self {
            TableKind::Roster => STUDENTS,
            TableKind::Catalog => VARIANTS,
            TableKind::Assignment => STUDENTS_VARIANTS,
            TableKind::AssignmentView => STUDENTS_VARIANTS_FULL,
        }
    }

    /// Returns the columns a freshly created table of this kind carries.
    pub fn columns(self) -> Vec<Column> {
        match self {
            TableKind::Roster => vec![
                Column::new(col::ID).auto_increment(),
                Column::new(col::NAME).primary_key(),
                Column::new(col::SURNAME).primary_key(),
                Column::new(col::PATRONYMIC).primary_key(),
            ],
            TableKind::Catalog => vec![
                Column::new(col::ID).auto_increment(),
                Column::new(col::PATH_TO_FILE).unique(),
            ],
            TableKind::Assignment => vec![
                Column::new(col::STUDENT_ID).unique().primary_key(),
                Column::new(col::VARIANT_ID),
            ],
            TableKind::AssignmentView => vec![
                Column::new(col::FULL_NAME).unique().primary_key(),
                Column::new(col::PATH_TO_FILE),
                Column::new(col::MARK),
            ],
        }
    }
}

impl fmt::Display for TableKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.table_name())
    }
}
