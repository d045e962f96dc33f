//! Executes parsed commands against a [`Database`].
//!
//! Every outcome, success or diagnostic, is written as text to the output
//! sink. Only failures of the sink itself are returned to the caller.

use std::io::{self, Write};

use tabula_storage::import::{assign_variants, import_catalog, import_roster};
use tabula_storage::{Database, Restored, Schema};
use tracing::debug;

use crate::command::{Command, CommandError, ImportTarget, HELP};
use crate::formatter::{format_rows, OutputFormat, RowSet};

/// What the caller should do after a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Read the next line.
    Continue,
    /// Stop reading.
    Exit,
}

/// Line interpreter holding the database context.
pub struct Interpreter<W: Write> {
    db: Database,
    out: W,
    format: OutputFormat,
}

impl<W: Write> Interpreter<W> {
    /// Creates an interpreter writing to `out`.
    pub fn new(db: Database, out: W, format: OutputFormat) -> Self {
        Self { db, out, format }
    }

    /// Returns the database.
    pub fn database(&self) -> &Database {
        &self.db
    }

    #[cfg(test)]
    pub fn output(&self) -> &W {
        &self.out
    }

    /// Returns the prompt, which names the default schema when one is set.
    pub fn prompt(&self) -> String {
        match self.db.default_schema_name() {
            Some(name) => format!("tabula[{name}]> "),
            None => "tabula> ".to_string(),
        }
    }

    /// Parses and executes one line.
    pub fn execute_line(&mut self, line: &str) -> io::Result<Flow> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(Flow::Continue);
        }
        debug!(line, "Executing command");

        let result = Command::parse(line).and_then(|command| self.execute(command));
        match result {
            Ok(flow) => Ok(flow),
            Err(CommandError::Io(e)) => Err(e),
            Err(e) => {
                if let CommandError::Store(err) = &e {
                    debug!(code = %err.code(), "Command failed");
                }
                writeln!(self.out, "{e}")?;
                Ok(Flow::Continue)
            }
        }
    }

    fn execute(&mut self, command: Command) -> Result<Flow, CommandError> {
        match command {
            Command::CreateSchema(name) => {
                self.db.create_schema(&name)?;
                writeln!(self.out, "Schema '{name}' has been created")?;
            }
            Command::DeleteSchema(name) => {
                self.db.delete_schema(&name)?;
                writeln!(self.out, "Schema '{name}' has been deleted")?;
            }
            Command::SetDefaultSchema(name) => {
                self.db.set_default_schema(&name)?;
                writeln!(self.out, "Default schema is '{name}'")?;
            }
            Command::ShowDefault => match self.db.default_schema_name() {
                Some(name) => writeln!(self.out, "{name}")?,
                None => writeln!(self.out, "No default schema")?,
            },
            Command::ResetDefault => {
                self.db.reset_default_schema();
                writeln!(self.out, "Default schema has been reset")?;
            }
            Command::ListSchemas => {
                if self.db.schemas().is_empty() {
                    writeln!(self.out, "No schemas")?;
                }
                for schema in self.db.schemas() {
                    writeln!(self.out, "{}", schema.name())?;
                }
            }
            Command::ListTables => {
                let schema = self.db.default_schema().ok_or(CommandError::NoDefaultSchema)?;
                if schema.tables().is_empty() {
                    writeln!(self.out, "No tables in schema '{}'", schema.name())?;
                }
                for table in schema.tables() {
                    writeln!(self.out, "{}", table.name())?;
                }
            }
            Command::CreateTable(name) => {
                let schema = self.schema_mut()?;
                schema.create_table(&name)?;
                let schema = schema.name().to_string();
                writeln!(self.out, "Table '{name}' has been created in schema '{schema}'")?;
            }
            Command::DeleteTable(name) => {
                let schema = self.schema_mut()?;
                let deleted = schema.delete_table(&name)?;
                let schema = schema.name().to_string();
                if deleted {
                    writeln!(self.out, "Table '{name}' has been deleted")?;
                } else {
                    writeln!(self.out, "There is no table '{name}' in schema '{schema}'")?;
                }
            }
            Command::AddColumn {
                table,
                column,
                force,
            } => {
                let name = column.name.clone();
                self.schema_mut()?.add_column(&table, column, force)?;
                writeln!(self.out, "Column '{name}' has been added to '{table}'")?;
            }
            Command::LoadTable(path) => {
                let table = self.schema_mut()?.load_table_from_file(&path)?.name().to_string();
                writeln!(self.out, "Table '{table}' has been loaded")?;
            }
            Command::Insert { table, values } => {
                let inserted = self.schema_mut()?.insert(&table, &values)?;
                match inserted {
                    Some(_) => writeln!(self.out, "1 row inserted")?,
                    None => writeln!(self.out, "Row was rejected")?,
                }
            }
            Command::Update {
                table,
                values,
                conditions,
            } => {
                let updated = self.schema_mut()?.update(&table, &conditions, &values)?;
                writeln!(self.out, "{} updated", rows(updated))?;
            }
            Command::DeleteRows { table, conditions } => {
                let deleted = self.schema_mut()?.delete_rows(&table, &conditions)?;
                writeln!(self.out, "{} deleted", rows(deleted))?;
            }
            Command::Select { table, conditions } => {
                let schema = self.db.default_schema().ok_or(CommandError::NoDefaultSchema)?;
                let selected = schema.select(&table, &conditions)?;
                let columns = schema
                    .find_table(&table)
                    .map(|t| t.column_names())
                    .unwrap_or_default();
                let set = RowSet::new(columns, &selected);
                writeln!(self.out, "{}", format_rows(&set, self.format).trim_end())?;
                writeln!(self.out, "({})", rows(set.len()))?;
            }
            Command::BackupTo(dir) => {
                let schema = self.db.default_schema().ok_or(CommandError::NoDefaultSchema)?;
                let target = schema.copy_to(&dir)?;
                let name = schema.name().to_string();
                writeln!(self.out, "Schema '{name}' has been copied to {}", target.display())?;
            }
            Command::BackupFrom(dir) => match self.db.restore_from(&dir)? {
                Restored::Schema(name) => writeln!(self.out, "Schema '{name}' has been restored")?,
                Restored::Tables(tables) if tables.is_empty() => {
                    writeln!(self.out, "No tables found in {}", dir.display())?
                }
                Restored::Tables(tables) => {
                    writeln!(self.out, "Tables loaded: {}", tables.join(", "))?
                }
            },
            Command::Import { target, path } => {
                let schema = self.schema_mut()?;
                let (count, what) = match target {
                    ImportTarget::Students => (import_roster(schema, &path)?, "students"),
                    ImportTarget::Variants => (import_catalog(schema, &path)?, "variants"),
                };
                writeln!(self.out, "{count} {what} imported")?;
            }
            Command::AssignVariants => {
                let assigned = assign_variants(self.schema_mut()?)?;
                writeln!(self.out, "{assigned} variants assigned")?;
            }
            Command::Help => writeln!(self.out, "{HELP}")?,
            Command::Exit => return Ok(Flow::Exit),
        }
        Ok(Flow::Continue)
    }

    fn schema_mut(&mut self) -> Result<&mut Schema, CommandError> {
        self.db
            .default_schema_mut()
            .ok_or(CommandError::NoDefaultSchema)
    }
}

fn rows(count: usize) -> String {
    if count == 1 {
        "1 row".to_string()
    } else {
        format!("{count} rows")
    }
}
