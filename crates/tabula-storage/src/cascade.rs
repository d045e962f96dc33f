//! Cascading row operations.
//!
//! The roster, catalog and assignment tables keep the assignment view in
//! step with themselves. Each operation runs its cascade in a fixed order
//! before or after the base table operation:
//!
//! | Table      | insert                     | update                      | delete                            |
//! |------------|----------------------------|-----------------------------|-----------------------------------|
//! | roster     | base, then random link     | rename view rows, then base | unlink + drop view rows, then base|
//! | catalog    | base                       | rename descriptors, then base | apply delete policy, then base  |
//! | assignment | validate, base, then view  | validate, view, then base   | view, then base                   |
//! | view       | validate, base             | validate, base              | base                              |
//!
//! Cascades are best-effort. Nothing is rolled back when a later step is
//! rejected; the stale table is reported with a warning instead.

use rand::seq::SliceRandom;
use tabula_common::{
    CatalogDeletePolicy, FullNamePolicy, TabulaError, TabulaResult, EMPTY_FIELD_VALUE,
};
use tracing::{info, warn};

use crate::codec::{Fields, Row};
use crate::kind::{col, TableKind, STUDENTS_VARIANTS};
use crate::schema::Schema;
use crate::table::Table;

/// Builds a condition or value map from column/value pairs.
pub fn fields<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Fields {
    pairs
        .into_iter()
        .map(|(column, value)| (column.to_string(), value.to_string()))
        .collect()
}

/// Builds the view key of a roster row.
pub fn full_name(policy: FullNamePolicy, student: &Row) -> String {
    let parts = [col::NAME, col::SURNAME, col::PATRONYMIC].map(|c| student.get_or_empty(c));
    match policy {
        FullNamePolicy::Flexible => parts
            .into_iter()
            .filter(|part| *part != EMPTY_FIELD_VALUE)
            .collect::<Vec<_>>()
            .join(" "),
        FullNamePolicy::FixedThreeParts => parts.join(" "),
    }
}

/// Splits a view key back into roster conditions.
///
/// Returns `None` if the number of parts is not accepted by the policy.
pub fn name_conditions(policy: FullNamePolicy, full_name: &str) -> Option<Fields> {
    let parts: Vec<&str> = full_name.split_whitespace().collect();
    let accepted = match policy {
        FullNamePolicy::Flexible => (1..=3).contains(&parts.len()),
        FullNamePolicy::FixedThreeParts => parts.len() == 3,
    };
    if !accepted {
        return None;
    }

    Some(
        [col::NAME, col::SURNAME, col::PATRONYMIC]
            .into_iter()
            .enumerate()
            .map(|(i, column)| {
                let value = parts.get(i).copied().unwrap_or(EMPTY_FIELD_VALUE);
                (column.to_string(), value.to_string())
            })
            .collect(),
    )
}

/// Returns the first name column whose value would not survive the split
/// of a full name back into its parts.
fn malformed_name_part(values: &Fields) -> Option<&'static str> {
    [col::NAME, col::SURNAME, col::PATRONYMIC]
        .into_iter()
        .find(|column| {
            values
                .get(*column)
                .is_some_and(|v| v.is_empty() || v.chars().any(char::is_whitespace))
        })
}

impl Schema {
    // =========================================================================
    // Row Operations
    // =========================================================================

    /// Inserts a row into a table, running its cascade.
    ///
    /// Returns the stored row, or `None` if the table or a cascade
    /// validation rejected it.
    pub fn insert(&mut self, table: &str, row: &Fields) -> TabulaResult<Option<Row>> {
        match self.resolve(table)? {
            TableKind::Roster => self.insert_student(row),
            TableKind::Catalog => self.base_mut(TableKind::Catalog)?.insert(row),
            TableKind::Assignment => self.insert_assignment(row),
            TableKind::AssignmentView => self.insert_view(row),
        }
    }

    /// Updates matching rows of a table, running its cascade.
    ///
    /// Returns the number of rows the base table updated.
    pub fn update(
        &mut self,
        table: &str,
        conditions: &Fields,
        new_values: &Fields,
    ) -> TabulaResult<usize> {
        match self.resolve(table)? {
            TableKind::Roster => self.update_student(conditions, new_values),
            TableKind::Catalog => self.update_variant(conditions, new_values),
            TableKind::Assignment => self.update_assignment(conditions, new_values),
            TableKind::AssignmentView => self.update_view(conditions, new_values),
        }
    }

    /// Deletes matching rows of a table, running its cascade.
    pub fn delete_rows(&mut self, table: &str, conditions: &Fields) -> TabulaResult<usize> {
        match self.resolve(table)? {
            TableKind::Roster => self.delete_student(conditions),
            TableKind::Catalog => self.delete_variant(conditions),
            TableKind::Assignment => self.delete_assignment(conditions),
            TableKind::AssignmentView => {
                self.base_mut(TableKind::AssignmentView)?.delete_rows(conditions)
            }
        }
    }

    /// Returns matching rows of a table.
    pub fn select(&self, table: &str, conditions: &Fields) -> TabulaResult<Vec<Row>> {
        let kind = self.resolve(table)?;
        self.base(kind)?.scan(conditions)
    }

    /// Builds the view key of a roster row under the configured policy.
    pub fn full_name(&self, student: &Row) -> String {
        full_name(self.config.full_name, student)
    }

    // =========================================================================
    // Roster
    // =========================================================================

    fn insert_student(&mut self, row: &Fields) -> TabulaResult<Option<Row>> {
        for required in [col::NAME, col::SURNAME] {
            let present = row
                .get(required)
                .is_some_and(|v| !v.is_empty() && v != EMPTY_FIELD_VALUE);
            if !present {
                warn!(schema = %self.name(), column = required, "Column cannot be empty");
                return Ok(None);
            }
        }
        if let Some(column) = malformed_name_part(row) {
            warn!(schema = %self.name(), column, "Name parts cannot be empty or contain spaces");
            return Ok(None);
        }

        let Some(student) = self.base_mut(TableKind::Roster)?.insert(row)? else {
            return Ok(None);
        };

        let variants = match self.table_of(TableKind::Catalog) {
            Some(catalog) => catalog.rows()?,
            None => Vec::new(),
        };
        let Some(variant) = variants.choose(&mut rand::thread_rng()) else {
            info!(schema = %self.name(), "No variants to assign");
            return Ok(Some(student));
        };

        self.ensure_table(TableKind::AssignmentView)?;
        self.ensure_table(TableKind::Assignment)?;
        let link = fields([
            (col::STUDENT_ID, student.get_or_empty(col::ID)),
            (col::VARIANT_ID, variant.get_or_empty(col::ID)),
        ]);
        if self.insert_assignment(&link)?.is_none() {
            warn!(schema = %self.name(), table = STUDENTS_VARIANTS, "Student has been inserted without a variant");
        }

        Ok(Some(student))
    }

    fn update_student(&mut self, conditions: &Fields, new_values: &Fields) -> TabulaResult<usize> {
        if new_values.contains_key(col::ID) {
            warn!(schema = %self.name(), "Column 'id' cannot be changed");
            return Ok(0);
        }
        if let Some(column) = malformed_name_part(new_values) {
            warn!(schema = %self.name(), column, "Name parts cannot be empty or contain spaces");
            return Ok(0);
        }

        let policy = self.config.full_name;
        let rows = self.base(TableKind::Roster)?.scan(conditions)?;
        let renames: Vec<(String, String)> = rows
            .iter()
            .filter_map(|row| {
                let mut renamed = row.clone();
                for (column, value) in new_values {
                    if row.get(column).is_some() {
                        renamed.set(column.clone(), value.clone());
                    }
                }
                let old = full_name(policy, row);
                let new = full_name(policy, &renamed);
                (old != new).then_some((old, new))
            })
            .collect();

        if let Some(view) = self.table_of_mut(TableKind::AssignmentView) {
            for (old, new) in &renames {
                view.update(
                    &fields([(col::FULL_NAME, old.as_str())]),
                    &fields([(col::FULL_NAME, new.as_str())]),
                )?;
            }
        }

        let updated = self.base_mut(TableKind::Roster)?.update(conditions, new_values)?;
        if updated < rows.len() && !renames.is_empty() {
            self.warn_stale(TableKind::AssignmentView);
        }
        Ok(updated)
    }

    fn delete_student(&mut self, conditions: &Fields) -> TabulaResult<usize> {
        let policy = self.config.full_name;
        let rows = self.base(TableKind::Roster)?.scan(conditions)?;

        for row in &rows {
            if self.contains_table(STUDENTS_VARIANTS) {
                self.delete_assignment(&fields([(col::STUDENT_ID, row.get_or_empty(col::ID))]))?;
            }
            if let Some(view) = self.table_of_mut(TableKind::AssignmentView) {
                let name = full_name(policy, row);
                view.delete_rows(&fields([(col::FULL_NAME, name.as_str())]))?;
            }
        }

        self.base_mut(TableKind::Roster)?.delete_rows(conditions)
    }

    // =========================================================================
    // Catalog
    // =========================================================================

    fn update_variant(&mut self, conditions: &Fields, new_values: &Fields) -> TabulaResult<usize> {
        if new_values.contains_key(col::ID) {
            warn!(schema = %self.name(), "Column 'id' cannot be changed");
            return Ok(0);
        }

        let rows = self.base(TableKind::Catalog)?.scan(conditions)?;
        let mut renamed = false;

        if let Some(new) = new_values.get(col::PATH_TO_FILE) {
            let olds: Vec<&str> = rows
                .iter()
                .map(|row| row.get_or_empty(col::PATH_TO_FILE))
                .filter(|old| *old != new.as_str())
                .collect();
            if let Some(view) = self.table_of_mut(TableKind::AssignmentView) {
                for old in olds {
                    renamed |= view.update(
                        &fields([(col::PATH_TO_FILE, old)]),
                        &fields([(col::PATH_TO_FILE, new.as_str())]),
                    )? > 0;
                }
            }
        }

        let updated = self.base_mut(TableKind::Catalog)?.update(conditions, new_values)?;
        if updated < rows.len() && renamed {
            self.warn_stale(TableKind::AssignmentView);
        }
        Ok(updated)
    }

    fn delete_variant(&mut self, conditions: &Fields) -> TabulaResult<usize> {
        let policy = self.config.catalog_delete;
        let rows = self.base(TableKind::Catalog)?.scan(conditions)?;

        if let Some(view) = self.table_of_mut(TableKind::AssignmentView) {
            for row in &rows {
                let referencing = fields([(col::PATH_TO_FILE, row.get_or_empty(col::PATH_TO_FILE))]);
                match policy {
                    CatalogDeletePolicy::ClearDescriptor => {
                        view.update(
                            &referencing,
                            &fields([(col::PATH_TO_FILE, EMPTY_FIELD_VALUE)]),
                        )?;
                    }
                    CatalogDeletePolicy::RemoveRow => {
                        view.delete_rows(&referencing)?;
                    }
                }
            }
        }

        self.base_mut(TableKind::Catalog)?.delete_rows(conditions)
    }

    // =========================================================================
    // Assignment
    // =========================================================================

    fn insert_assignment(&mut self, row: &Fields) -> TabulaResult<Option<Row>> {
        let student_id = row.get(col::STUDENT_ID).map_or(EMPTY_FIELD_VALUE, String::as_str);
        let Some(student) = self.row_by_id(TableKind::Roster, student_id)? else {
            warn!(schema = %self.name(), student_id, "There is no student with such id");
            return Ok(None);
        };

        let variant_id = row.get(col::VARIANT_ID).map_or(EMPTY_FIELD_VALUE, String::as_str);
        let Some(variant) = self.row_by_id(TableKind::Catalog, variant_id)? else {
            warn!(schema = %self.name(), variant_id, "There is no variant with such id");
            return Ok(None);
        };

        let Some(link) = self.base_mut(TableKind::Assignment)?.insert(row)? else {
            return Ok(None);
        };

        self.ensure_table(TableKind::AssignmentView)?;
        let name = self.full_name(&student);
        let entry = fields([
            (col::FULL_NAME, name.as_str()),
            (col::PATH_TO_FILE, variant.get_or_empty(col::PATH_TO_FILE)),
        ]);
        if self.insert_view(&entry)?.is_none() {
            self.warn_stale(TableKind::AssignmentView);
        }

        Ok(Some(link))
    }

    fn update_assignment(
        &mut self,
        conditions: &Fields,
        new_values: &Fields,
    ) -> TabulaResult<usize> {
        if new_values.contains_key(col::STUDENT_ID) {
            warn!(schema = %self.name(), "Column 'student_id' cannot be changed");
            return Ok(0);
        }
        let Some(variant_id) = new_values.get(col::VARIANT_ID) else {
            warn!(schema = %self.name(), "Column 'variant_id' cannot be empty");
            return Ok(0);
        };
        let Some(variant) = self.row_by_id(TableKind::Catalog, variant_id)? else {
            warn!(schema = %self.name(), variant_id = %variant_id, "Variant with such id not found");
            return Ok(0);
        };

        let names = self.assigned_names(conditions)?;
        if let Some(view) = self.table_of_mut(TableKind::AssignmentView) {
            let descriptor = fields([(col::PATH_TO_FILE, variant.get_or_empty(col::PATH_TO_FILE))]);
            for name in &names {
                view.update(&fields([(col::FULL_NAME, name.as_str())]), &descriptor)?;
            }
        }

        self.base_mut(TableKind::Assignment)?.update(conditions, new_values)
    }

    fn delete_assignment(&mut self, conditions: &Fields) -> TabulaResult<usize> {
        let names = self.assigned_names(conditions)?;
        if let Some(view) = self.table_of_mut(TableKind::AssignmentView) {
            for name in &names {
                view.delete_rows(&fields([(col::FULL_NAME, name.as_str())]))?;
            }
        }

        self.base_mut(TableKind::Assignment)?.delete_rows(conditions)
    }

    /// Full names of the students linked by matching assignment rows.
    fn assigned_names(&self, conditions: &Fields) -> TabulaResult<Vec<String>> {
        let mut names = Vec::new();
        for link in self.base(TableKind::Assignment)?.scan(conditions)? {
            let student_id = link.get_or_empty(col::STUDENT_ID);
            if let Some(student) = self.row_by_id(TableKind::Roster, student_id)? {
                names.push(self.full_name(&student));
            }
        }
        Ok(names)
    }

    // =========================================================================
    // Assignment View
    // =========================================================================

    fn insert_view(&mut self, row: &Fields) -> TabulaResult<Option<Row>> {
        let Some(name) = row.get(col::FULL_NAME) else {
            warn!(schema = %self.name(), "Column 'full_name' cannot be empty");
            return Ok(None);
        };
        if !self.is_student(name)? {
            return Ok(None);
        }

        let Some(descriptor) = row.get(col::PATH_TO_FILE) else {
            warn!(schema = %self.name(), "Column 'path_to_file' cannot be empty");
            return Ok(None);
        };
        if !self.is_variant(descriptor)? {
            return Ok(None);
        }

        self.base_mut(TableKind::AssignmentView)?.insert(row)
    }

    fn update_view(&mut self, conditions: &Fields, new_values: &Fields) -> TabulaResult<usize> {
        if let Some(descriptor) = new_values.get(col::PATH_TO_FILE) {
            if !self.is_variant(descriptor)? {
                return Ok(0);
            }
        }
        if let Some(name) = new_values.get(col::FULL_NAME) {
            if !self.is_student(name)? {
                return Ok(0);
            }
        }

        self.base_mut(TableKind::AssignmentView)?
            .update(conditions, new_values)
    }

    /// Returns true if a full name resolves to a roster row.
    fn is_student(&self, name: &str) -> TabulaResult<bool> {
        let Some(conditions) = name_conditions(self.config.full_name, name) else {
            warn!(schema = %self.name(), full_name = name, "Incorrect value passed to 'full_name'");
            return Ok(false);
        };
        let found = match self.table_of(TableKind::Roster) {
            Some(roster) => !roster.scan(&conditions)?.is_empty(),
            None => false,
        };
        if !found {
            warn!(schema = %self.name(), full_name = name, "There is no such student");
        }
        Ok(found)
    }

    /// Returns true if a descriptor is present in the catalog.
    fn is_variant(&self, descriptor: &str) -> TabulaResult<bool> {
        let found = match self.table_of(TableKind::Catalog) {
            Some(catalog) => !catalog
                .scan(&fields([(col::PATH_TO_FILE, descriptor)]))?
                .is_empty(),
            None => false,
        };
        if !found {
            warn!(schema = %self.name(), path_to_file = descriptor, "There is no such variant");
        }
        Ok(found)
    }

    // =========================================================================
    // Lookups
    // =========================================================================

    /// Maps a registered table name to its kind.
    fn resolve(&self, table: &str) -> TabulaResult<TableKind> {
        TableKind::from_name(table)
            .filter(|_| self.contains_table(table))
            .ok_or_else(|| TabulaError::table_not_found(self.name(), table))
    }

    fn table_of(&self, kind: TableKind) -> Option<&Table> {
        self.find_table(kind.table_name())
    }

    fn table_of_mut(&mut self, kind: TableKind) -> Option<&mut Table> {
        self.find_table_mut(kind.table_name())
    }

    fn base(&self, kind: TableKind) -> TabulaResult<&Table> {
        self.table_of(kind)
            .ok_or_else(|| TabulaError::table_not_found(self.name(), kind.table_name()))
    }

    fn base_mut(&mut self, kind: TableKind) -> TabulaResult<&mut Table> {
        let schema = self.name().to_string();
        self.table_of_mut(kind)
            .ok_or_else(|| TabulaError::table_not_found(schema, kind.table_name()))
    }

    /// First row of a roster or catalog table with the given id.
    fn row_by_id(&self, kind: TableKind, id: &str) -> TabulaResult<Option<Row>> {
        match self.table_of(kind) {
            Some(table) => Ok(table.scan(&fields([(col::ID, id)]))?.into_iter().next()),
            None => Ok(None),
        }
    }

    fn warn_stale(&self, kind: TableKind) {
        warn!(schema = %self.name(), table = %kind, "Cascade was not completed, table may be stale");
    }
}
