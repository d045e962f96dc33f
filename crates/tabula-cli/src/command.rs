//! Command grammar.
//!
//! Every command is a fixed sequence of lowercase keywords followed by
//! names, paths, or `<column>=<value>` lists. A list runs until the next
//! keyword or the end of the line.

use std::path::PathBuf;

use tabula_common::TabulaError;
use tabula_storage::{Column, Fields};
use thiserror::Error;

use crate::lexer::tokenize;

/// Keywords that end a `<column>=<value>` list.
const KEYWORDS: &[&str] = &[
    "create", "schema", "table", "set", "default", "update", "where", "delete", "from", "insert",
    "into", "values", "select", "backup", "to", "file", "import", "assign", "alter", "add",
    "column", "force",
];

/// An interpreter diagnostic.
#[derive(Debug, Error)]
pub enum CommandError {
    /// A quote was opened but never closed.
    #[error("Unterminated quote")]
    UnterminatedQuote,

    /// A required token is missing or wrong.
    #[error("Expected {expected} after '{after}'")]
    Expected {
        /// What was expected.
        expected: String,
        /// The token it should have followed.
        after: String,
    },

    /// A token was left over after a complete command.
    #[error("Unexpected token '{0}'")]
    Unexpected(String),

    /// A list item without `=`.
    #[error("Malformed assignment '{0}', expected <column>=<value>")]
    MalformedAssignment(String),

    /// A list keyword followed by no items.
    #[error("Expected at least one <column>=<value> after '{0}'")]
    EmptyAssignments(String),

    /// A column definition that does not parse.
    #[error("Malformed column '{0}', expected <name>+[u][pk][a]")]
    MalformedColumn(String),

    /// The first token is not a command.
    #[error("Unknown command. Type 'help' to see all available commands")]
    UnknownCommand,

    /// A table command was issued without a default schema.
    #[error("No default schema. Use 'set default schema <name>' first")]
    NoDefaultSchema,

    /// The store rejected the command.
    #[error("{0}")]
    Store(#[from] TabulaError),

    /// Writing output failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Which table a bulk import fills.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportTarget {
    /// The roster, one full name per line.
    Students,
    /// The catalog, one descriptor per line.
    Variants,
}

/// A parsed command.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// `create schema <name>`
    CreateSchema(String),
    /// `create table <name>`
    CreateTable(String),
    /// `set default schema <name>`
    SetDefaultSchema(String),
    /// `update table <name> set ... where ...`
    Update {
        /// Target table.
        table: String,
        /// New values.
        values: Fields,
        /// Row filter.
        conditions: Fields,
    },
    /// `delete schema <name>`
    DeleteSchema(String),
    /// `delete table <name>`
    DeleteTable(String),
    /// `delete from table <name> where ...`
    DeleteRows {
        /// Target table.
        table: String,
        /// Row filter.
        conditions: Fields,
    },
    /// `insert into table <name> values ...`
    Insert {
        /// Target table.
        table: String,
        /// Row values.
        values: Fields,
    },
    /// `insert into schema table from file <path>`
    LoadTable(PathBuf),
    /// `select from table <name> [where ...]`
    Select {
        /// Target table.
        table: String,
        /// Row filter, empty for all rows.
        conditions: Fields,
    },
    /// `alter table <name> add column <column> [force]`
    AddColumn {
        /// Target table.
        table: String,
        /// Column definition.
        column: Column,
        /// Accept losing existing rows.
        force: bool,
    },
    /// `backup to <dir>`
    BackupTo(PathBuf),
    /// `backup from <dir>`
    BackupFrom(PathBuf),
    /// `import students|variants from file <path>`
    Import {
        /// Table to fill.
        target: ImportTarget,
        /// Source file.
        path: PathBuf,
    },
    /// `assign variants`
    AssignVariants,
    /// `schemas`
    ListSchemas,
    /// `tables`
    ListTables,
    /// `default schema`
    ShowDefault,
    /// `reset default`
    ResetDefault,
    /// `help`
    Help,
    /// `exit`
    Exit,
}

impl Command {
    /// Parses one line of input.
    pub fn parse(line: &str) -> Result<Self, CommandError> {
        let mut parser = Parser::new(tokenize(line)?);
        let Some(first) = parser.next() else {
            return Err(CommandError::UnknownCommand);
        };

        let command = match first.as_str() {
            "create" => match parser.one_of(&["schema", "table"])? {
                "schema" => Command::CreateSchema(parser.name("schema name")?),
                _ => Command::CreateTable(parser.name("table name")?),
            },
            "set" => {
                parser.keyword("default")?;
                parser.keyword("schema")?;
                Command::SetDefaultSchema(parser.name("schema name")?)
            }
            "update" => {
                parser.keyword("table")?;
                let table = parser.name("table name")?;
                parser.keyword("set")?;
                let values = parser.assignments()?;
                parser.keyword("where")?;
                let conditions = parser.assignments()?;
                Command::Update {
                    table,
                    values,
                    conditions,
                }
            }
            "delete" => match parser.one_of(&["schema", "table", "from"])? {
                "schema" => Command::DeleteSchema(parser.name("schema name")?),
                "table" => Command::DeleteTable(parser.name("table name")?),
                _ => {
                    parser.keyword("table")?;
                    let table = parser.name("table name")?;
                    parser.keyword("where")?;
                    let conditions = parser.assignments()?;
                    Command::DeleteRows { table, conditions }
                }
            },
            "insert" => {
                parser.keyword("into")?;
                match parser.one_of(&["table", "schema"])? {
                    "table" => {
                        let table = parser.name("table name")?;
                        parser.keyword("values")?;
                        let values = parser.assignments()?;
                        Command::Insert { table, values }
                    }
                    _ => {
                        parser.keyword("table")?;
                        parser.keyword("from")?;
                        parser.keyword("file")?;
                        Command::LoadTable(parser.name("file path")?.into())
                    }
                }
            }
            "select" => {
                parser.keyword("from")?;
                parser.keyword("table")?;
                let table = parser.name("table name")?;
                let conditions = if parser.peek() == Some("where") {
                    parser.next();
                    parser.assignments()?
                } else {
                    Fields::new()
                };
                Command::Select { table, conditions }
            }
            "alter" => {
                parser.keyword("table")?;
                let table = parser.name("table name")?;
                parser.keyword("add")?;
                parser.keyword("column")?;
                let column = parser.column()?;
                let force = parser.peek() == Some("force");
                if force {
                    parser.next();
                }
                Command::AddColumn {
                    table,
                    column,
                    force,
                }
            }
            "backup" => match parser.one_of(&["to", "from"])? {
                "to" => Command::BackupTo(parser.name("directory path")?.into()),
                _ => Command::BackupFrom(parser.name("directory path")?.into()),
            },
            "import" => {
                let target = match parser.one_of(&["students", "variants"])? {
                    "students" => ImportTarget::Students,
                    _ => ImportTarget::Variants,
                };
                parser.keyword("from")?;
                parser.keyword("file")?;
                Command::Import {
                    target,
                    path: parser.name("file path")?.into(),
                }
            }
            "assign" => {
                parser.keyword("variants")?;
                Command::AssignVariants
            }
            "default" => {
                parser.keyword("schema")?;
                Command::ShowDefault
            }
            "reset" => {
                parser.keyword("default")?;
                Command::ResetDefault
            }
            "schemas" => Command::ListSchemas,
            "tables" => Command::ListTables,
            "help" => Command::Help,
            "exit" => Command::Exit,
            _ => return Err(CommandError::UnknownCommand),
        };

        parser.finish()?;
        Ok(command)
    }
}

/// Cursor over the tokens of one line.
struct Parser {
    tokens: Vec<String>,
    pos: usize,
}

impl Parser {
    fn new(tokens: Vec<String>) -> Self {
        Self { tokens, pos: 0 }
    }

    fn peek(&self) -> Option<&str> {
        self.tokens.get(self.pos).map(String::as_str)
    }

    fn next(&mut self) -> Option<String> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    /// The last consumed token, used in diagnostics.
    fn previous(&self) -> String {
        self.pos
            .checked_sub(1)
            .and_then(|i| self.tokens.get(i))
            .cloned()
            .unwrap_or_default()
    }

    fn expected(&self, expected: impl Into<String>) -> CommandError {
        CommandError::Expected {
            expected: expected.into(),
            after: self.previous(),
        }
    }

    fn keyword(&mut self, keyword: &str) -> Result<(), CommandError> {
        if self.peek() == Some(keyword) {
            self.pos += 1;
            Ok(())
        } else {
            Err(self.expected(format!("'{keyword}'")))
        }
    }

    /// Consumes one of `choices` and returns it.
    fn one_of(&mut self, choices: &[&'static str]) -> Result<&'static str, CommandError> {
        let found = self
            .peek()
            .and_then(|token| choices.iter().copied().find(|c| *c == token));
        match found {
            Some(choice) => {
                self.pos += 1;
                Ok(choice)
            }
            None => {
                let listed: Vec<String> = choices.iter().map(|c| format!("'{c}'")).collect();
                Err(self.expected(listed.join(" or ")))
            }
        }
    }

    fn name(&mut self, what: &str) -> Result<String, CommandError> {
        match self.peek() {
            Some(token) if !KEYWORDS.contains(&token) => {
                let token = token.to_string();
                self.pos += 1;
                Ok(token)
            }
            _ => Err(self.expected(what)),
        }
    }

    fn column(&mut self) -> Result<Column, CommandError> {
        let token = self.name("column definition")?;
        Column::parse(&token).ok_or(CommandError::MalformedColumn(token))
    }

    /// Consumes `<column>=<value>` items up to the next keyword.
    fn assignments(&mut self) -> Result<Fields, CommandError> {
        let after = self.previous();
        let mut fields = Fields::new();

        while let Some(token) = self.peek() {
            if KEYWORDS.contains(&token) {
                break;
            }
            let (column, value) = token
                .split_once('=')
                .filter(|(column, _)| !column.is_empty())
                .ok_or_else(|| CommandError::MalformedAssignment(token.to_string()))?;
            fields.insert(column.to_string(), value.to_string());
            self.pos += 1;
        }

        if fields.is_empty() {
            return Err(CommandError::EmptyAssignments(after));
        }
        Ok(fields)
    }

    fn finish(&self) -> Result<(), CommandError> {
        match self.peek() {
            Some(token) => Err(CommandError::Unexpected(token.to_string())),
            None => Ok(()),
        }
    }
}

/// Text printed by `help`.
pub const HELP: &str = r#"Tabula commands
===============

Schemas:
  create schema <name>                       Create a schema
  delete schema <name>                       Delete a schema and its tables
  set default schema <name>                  Make a schema the default
  default schema                             Show the default schema
  reset default                              Unset the default schema
  schemas                                    List schemas

Tables (in the default schema):
  create table <name>                        Create students, variants,
                                             students_variants or
                                             students_variants_full
  delete table <name>                        Delete a table
  tables                                     List tables
  alter table <name> add column <col>+<flags> [force]
                                             Add a column; force discards rows
  insert into schema table from file <path>  Load a table file

Rows:
  insert into table <name> values <c>=<v> ...
  update table <name> set <c>=<v> ... where <c>=<v> ...
  delete from table <name> where <c>=<v> ...
  select from table <name> [where <c>=<v> ...]

Bulk:
  import students from file <path>           One 'name surname [patronymic]' per line
  import variants from file <path>           One variant per line
  assign variants                            Give every student a random variant

Backup:
  backup to <dir>                            Copy the default schema into <dir>
  backup from <dir>                          Restore tables or a schema from <dir>

  help                                       Show this help
  exit                                       Quit

Quote values containing spaces: path_to_file='labs/lab 1.pdf'"#;

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(pairs: &[(&str, &str)]) -> Fields {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_parse_schema_commands() {
        assert_eq!(
            Command::parse("create schema S").unwrap(),
            Command::CreateSchema("S".into())
        );
        assert_eq!(
            Command::parse("set default schema S").unwrap(),
            Command::SetDefaultSchema("S".into())
        );
        assert_eq!(Command::parse("default schema").unwrap(), Command::ShowDefault);
        assert_eq!(Command::parse("reset default").unwrap(), Command::ResetDefault);
        assert_eq!(Command::parse("schemas").unwrap(), Command::ListSchemas);
        assert_eq!(Command::parse("exit").unwrap(), Command::Exit);
    }

    #[test]
    fn test_parse_update() {
        let command =
            Command::parse("update table students set surname=Smith where name=Ann").unwrap();
        assert_eq!(
            command,
            Command::Update {
                table: "students".into(),
                values: fields(&[("surname", "Smith")]),
                conditions: fields(&[("name", "Ann")]),
            }
        );
    }

    #[test]
    fn test_parse_insert_with_quotes() {
        let command =
            Command::parse("insert into table students values name='Mary Ann' surname=Lee")
                .unwrap();
        assert_eq!(
            command,
            Command::Insert {
                table: "students".into(),
                values: fields(&[("name", "Mary Ann"), ("surname", "Lee")]),
            }
        );
    }

    #[test]
    fn test_parse_select() {
        assert_eq!(
            Command::parse("select from table variants").unwrap(),
            Command::Select {
                table: "variants".into(),
                conditions: Fields::new(),
            }
        );
        assert_eq!(
            Command::parse("select from table variants where id=2").unwrap(),
            Command::Select {
                table: "variants".into(),
                conditions: fields(&[("id", "2")]),
            }
        );
    }

    #[test]
    fn test_parse_delete_variants() {
        assert_eq!(
            Command::parse("delete table students").unwrap(),
            Command::DeleteTable("students".into())
        );
        assert_eq!(
            Command::parse("delete from table students where name=Ann").unwrap(),
            Command::DeleteRows {
                table: "students".into(),
                conditions: fields(&[("name", "Ann")]),
            }
        );
    }

    #[test]
    fn test_parse_load_and_import() {
        assert_eq!(
            Command::parse("insert into schema table from file /tmp/variants.txt").unwrap(),
            Command::LoadTable("/tmp/variants.txt".into())
        );
        assert_eq!(
            Command::parse("import students from file list.txt").unwrap(),
            Command::Import {
                target: ImportTarget::Students,
                path: "list.txt".into(),
            }
        );
        assert_eq!(Command::parse("assign variants").unwrap(), Command::AssignVariants);
    }

    #[test]
    fn test_parse_add_column() {
        match Command::parse("alter table variants add column weight+u force").unwrap() {
            Command::AddColumn {
                table,
                column,
                force,
            } => {
                assert_eq!(table, "variants");
                assert_eq!(column, Column::new("weight").unique());
                assert!(force);
            }
            other => panic!("Expected AddColumn, got {other:?}"),
        }
        assert!(matches!(
            Command::parse("alter table variants add column weight"),
            Err(CommandError::MalformedColumn(_))
        ));
    }

    #[test]
    fn test_parse_diagnostics() {
        let err = Command::parse("create index x").unwrap_err();
        assert_eq!(err.to_string(), "Expected 'schema' or 'table' after 'create'");

        let err = Command::parse("create schema").unwrap_err();
        assert_eq!(err.to_string(), "Expected schema name after 'schema'");

        let err = Command::parse("update table students set where name=Ann").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Expected at least one <column>=<value> after 'set'"
        );

        let err = Command::parse("delete from table students").unwrap_err();
        assert_eq!(err.to_string(), "Expected 'where' after 'students'");

        let err = Command::parse("insert into table students values name").unwrap_err();
        assert!(matches!(err, CommandError::MalformedAssignment(_)));

        let err = Command::parse("schemas now").unwrap_err();
        assert!(matches!(err, CommandError::Unexpected(_)));

        let err = Command::parse("drop table x").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Unknown command. Type 'help' to see all available commands"
        );
    }
}
