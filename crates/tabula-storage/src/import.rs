//! Bulk loading of the roster and catalog, and random variant assignment.

use std::fs;
use std::path::Path;

use rand::seq::SliceRandom;
use tabula_common::{TabulaError, TabulaResult};
use tracing::{info, warn};

use crate::cascade::fields;
use crate::codec::Fields;
use crate::kind::{col, TableKind, STUDENTS, STUDENTS_VARIANTS, VARIANTS};
use crate::schema::Schema;

/// Creates the roster from a file holding one full name per line.
///
/// Each line is a name and surname, optionally followed by a patronymic.
/// A malformed line aborts the import; rows inserted before it are kept.
/// Returns the number of rows inserted.
pub fn import_roster(schema: &mut Schema, path: impl AsRef<Path>) -> TabulaResult<usize> {
    let lines = read_source(path.as_ref())?;
    schema.create_table(STUDENTS)?;

    let mut inserted = 0;
    for (number, line) in lines.iter().enumerate() {
        let parts: Vec<&str> = line.split_whitespace().collect();
        if !(2..=3).contains(&parts.len()) {
            return Err(TabulaError::invalid_argument(format!(
                "line {}: expected 'name surname [patronymic]', found '{line}'",
                number + 1
            )));
        }

        let row = fields(
            [col::NAME, col::SURNAME, col::PATRONYMIC]
                .into_iter()
                .zip(parts),
        );
        if schema.insert(STUDENTS, &row)?.is_some() {
            inserted += 1;
        }
    }

    info!(schema = %schema.name(), rows = inserted, "Students have been imported");
    Ok(inserted)
}

/// Creates the catalog from a file holding one variant descriptor per line.
///
/// Returns the number of rows inserted.
pub fn import_catalog(schema: &mut Schema, path: impl AsRef<Path>) -> TabulaResult<usize> {
    let lines = read_source(path.as_ref())?;
    schema.create_table(VARIANTS)?;

    let mut inserted = 0;
    for line in lines.iter().map(|l| l.trim()).filter(|l| !l.is_empty()) {
        if schema.insert(VARIANTS, &fields([(col::PATH_TO_FILE, line)]))?.is_some() {
            inserted += 1;
        }
    }

    info!(schema = %schema.name(), rows = inserted, "Variants have been imported");
    Ok(inserted)
}

/// Gives every unassigned student a random variant.
///
/// Variants are drawn without replacement and the pool is refilled once
/// exhausted, so they are spread evenly. Creates the assignment table and
/// view if absent. Returns the number of assignments made.
pub fn assign_variants(schema: &mut Schema) -> TabulaResult<usize> {
    if !schema.contains_table(STUDENTS) || !schema.contains_table(VARIANTS) {
        return Err(TabulaError::invalid_argument(format!(
            "create tables '{STUDENTS}' and '{VARIANTS}' or load them from files first"
        )));
    }
    schema.ensure_table(TableKind::AssignmentView)?;
    schema.ensure_table(TableKind::Assignment)?;

    let none = Fields::new();
    let students = schema.select(STUDENTS, &none)?;
    let variant_ids: Vec<String> = schema
        .select(VARIANTS, &none)?
        .iter()
        .map(|row| row.get_or_empty(col::ID).to_string())
        .collect();
    if variant_ids.is_empty() {
        warn!(schema = %schema.name(), "There are no variants to assign");
        return Ok(0);
    }

    let assigned: Vec<String> = schema
        .select(STUDENTS_VARIANTS, &none)?
        .iter()
        .map(|row| row.get_or_empty(col::STUDENT_ID).to_string())
        .collect();

    let mut rng = rand::thread_rng();
    let mut pool: Vec<&String> = Vec::new();
    let mut created = 0;

    for student in &students {
        let student_id = student.get_or_empty(col::ID);
        if assigned.iter().any(|id| id == student_id) {
            continue;
        }
        if pool.is_empty() {
            pool.extend(variant_ids.iter());
            pool.shuffle(&mut rng);
        }
        let Some(variant_id) = pool.pop() else {
            break;
        };

        let link = fields([(col::STUDENT_ID, student_id), (col::VARIANT_ID, variant_id.as_str())]);
        if schema.insert(STUDENTS_VARIANTS, &link)?.is_some() {
            created += 1;
        }
    }

    info!(schema = %schema.name(), rows = created, "Variants have been assigned");
    Ok(created)
}

fn read_source(path: &Path) -> TabulaResult<Vec<String>> {
    if !path.exists() {
        return Err(TabulaError::invalid_path(path, "file does not exist"));
    }
    if path.is_dir() {
        return Err(TabulaError::invalid_path(
            path,
            "expected a file, but found directory",
        ));
    }
    Ok(fs::read_to_string(path)?
        .lines()
        .map(str::to_string)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kind::STUDENTS_VARIANTS_FULL;
    use std::collections::HashMap;
    use tabula_common::StoreConfig;
    use tempfile::TempDir;

    fn setup(tmp: &TempDir) -> Schema {
        Schema::open(tmp.path().join("school"), StoreConfig::default()).unwrap()
    }

    #[test]
    fn test_import_roster() {
        let tmp = TempDir::new().unwrap();
        let source = tmp.path().join("students.list");
        fs::write(&source, "Ann Lee\nBob Ray Jr\nAnn Lee").unwrap();

        let mut schema = setup(&tmp);
        assert_eq!(import_roster(&mut schema, &source).unwrap(), 2);

        let rows = schema.select(STUDENTS, &Fields::new()).unwrap();
        assert_eq!(rows[1].get(col::PATRONYMIC), Some("Jr"));
        assert_eq!(rows[0].get(col::PATRONYMIC), Some("null"));

        assert!(matches!(
            import_roster(&mut schema, &source),
            Err(TabulaError::TableExists { .. })
        ));
    }

    #[test]
    fn test_import_roster_rejects_malformed_line() {
        let tmp = TempDir::new().unwrap();
        let source = tmp.path().join("students.list");
        fs::write(&source, "Ann Lee\nCher\nBob Ray").unwrap();

        let mut schema = setup(&tmp);
        assert!(matches!(
            import_roster(&mut schema, &source),
            Err(TabulaError::InvalidArgument { .. })
        ));
        assert_eq!(schema.select(STUDENTS, &Fields::new()).unwrap().len(), 1);
    }

    #[test]
    fn test_import_missing_file() {
        let tmp = TempDir::new().unwrap();
        let mut schema = setup(&tmp);
        assert!(matches!(
            import_catalog(&mut schema, tmp.path().join("none")),
            Err(TabulaError::InvalidPath { .. })
        ));
        assert!(!schema.contains_table(VARIANTS));
    }

    #[test]
    fn test_assign_variants_spreads_evenly() {
        let tmp = TempDir::new().unwrap();
        let students = tmp.path().join("students.list");
        let variants = tmp.path().join("variants.list");
        fs::write(&students, "A One\nB Two\nC Three\nD Four").unwrap();
        fs::write(&variants, "v1\nv2\n").unwrap();

        let mut schema = setup(&tmp);
        import_roster(&mut schema, &students).unwrap();
        assert_eq!(import_catalog(&mut schema, &variants).unwrap(), 2);

        assert_eq!(assign_variants(&mut schema).unwrap(), 4);
        assert_eq!(assign_variants(&mut schema).unwrap(), 0);

        let mut per_variant: HashMap<String, usize> = HashMap::new();
        for row in schema.select(STUDENTS_VARIANTS, &Fields::new()).unwrap() {
            *per_variant
                .entry(row.get_or_empty(col::VARIANT_ID).to_string())
                .or_default() += 1;
        }
        assert_eq!(per_variant.get("1"), Some(&2));
        assert_eq!(per_variant.get("2"), Some(&2));

        assert_eq!(
            schema.select(STUDENTS_VARIANTS_FULL, &Fields::new()).unwrap().len(),
            4
        );
    }

    #[test]
    fn test_assign_variants_requires_tables() {
        let tmp = TempDir::new().unwrap();
        let mut schema = setup(&tmp);
        schema.create_table(STUDENTS).unwrap();
        assert!(assign_variants(&mut schema).is_err());
    }
}
