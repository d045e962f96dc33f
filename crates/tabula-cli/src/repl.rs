//! Interactive REPL (Read-Eval-Print-Loop) for Tabula.
//!
//! Provides a line editor with command history and keyword completion.

use std::borrow::Cow;
use std::io::{self, Stdout};
use std::path::PathBuf;

use anyhow::Result;
use rustyline::completion::{Completer, Pair};
use rustyline::error::ReadlineError;
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::history::DefaultHistory;
use rustyline::validate::Validator;
use rustyline::{CompletionType, Config, EditMode, Editor, Helper};
use tracing::{debug, error};

use crate::config::CliConfig;
use crate::interpreter::{Flow, Interpreter};

/// Words offered by tab completion.
const KEYWORDS: &[&str] = &[
    "create",
    "delete",
    "update",
    "insert",
    "select",
    "alter",
    "backup",
    "import",
    "assign",
    "schema",
    "schemas",
    "table",
    "tables",
    "set",
    "default",
    "reset",
    "where",
    "from",
    "into",
    "values",
    "file",
    "to",
    "add",
    "column",
    "force",
    "students",
    "variants",
    "students_variants",
    "students_variants_full",
    "help",
    "exit",
];

/// REPL helper for rustyline.
struct ReplHelper;

impl Completer for ReplHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &rustyline::Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let start = line[..pos]
            .rfind(char::is_whitespace)
            .map(|i| i + 1)
            .unwrap_or(0);
        let word = &line[start..pos];

        let matches = KEYWORDS
            .iter()
            .filter(|kw| kw.starts_with(word))
            .map(|kw| Pair {
                display: kw.to_string(),
                replacement: kw.to_string(),
            })
            .collect();

        Ok((start, matches))
    }
}

impl Hinter for ReplHelper {
    type Hint = String;

    fn hint(&self, _line: &str, _pos: usize, _ctx: &rustyline::Context<'_>) -> Option<Self::Hint> {
        None
    }
}

impl Highlighter for ReplHelper {
    fn highlight<'l>(&self, line: &'l str, _pos: usize) -> Cow<'l, str> {
        Cow::Borrowed(line)
    }

    fn highlight_char(&self, _line: &str, _pos: usize, _forced: bool) -> bool {
        false
    }
}

impl Validator for ReplHelper {}

impl Helper for ReplHelper {}

/// Interactive REPL for Tabula.
pub struct Repl {
    interpreter: Interpreter<Stdout>,
    editor: Editor<ReplHelper, DefaultHistory>,
    history_file: Option<PathBuf>,
}

impl Repl {
    /// Creates a new REPL around an interpreter writing to stdout.
    pub fn new(config: &CliConfig, interpreter: Interpreter<Stdout>) -> Result<Self> {
        let rl_config = Config::builder()
            .history_ignore_space(true)
            .completion_type(CompletionType::List)
            .edit_mode(EditMode::Emacs)
            .max_history_size(config.history_size)?
            .build();

        let mut editor = Editor::with_config(rl_config)?;
        editor.set_helper(Some(ReplHelper));

        let history_file = history_path(config);
        if let Some(ref path) = history_file {
            if path.exists() {
                if let Err(e) = editor.load_history(path) {
                    debug!(path = %path.display(), error = %e, "Could not load history");
                }
            }
        }

        Ok(Self {
            interpreter,
            editor,
            history_file,
        })
    }

    /// Prints the welcome banner.
    pub fn print_banner(&self) {
        println!("Tabula v{}", env!("CARGO_PKG_VERSION"));
        println!(
            "Working directory: {}",
            self.interpreter.database().workdir().display()
        );
        println!("Type 'help' for the list of commands, 'exit' to quit.\n");
    }

    /// Runs the main loop until `exit` or end of input.
    pub fn run(&mut self) -> Result<()> {
        loop {
            let prompt = self.interpreter.prompt();

            match self.editor.readline(&prompt) {
                Ok(line) => {
                    let line = line.trim();
                    if line.is_empty() {
                        continue;
                    }

                    let _ = self.editor.add_history_entry(line);

                    if self.interpreter.execute_line(line)? == Flow::Exit {
                        break;
                    }
                }
                Err(ReadlineError::Interrupted) => {
                    println!("^C");
                    continue;
                }
                Err(ReadlineError::Eof) => {
                    println!("exit");
                    break;
                }
                Err(e) => {
                    error!("Readline error: {}", e);
                    break;
                }
            }
        }

        self.save_history();
        Ok(())
    }

    fn save_history(&mut self) {
        let Some(ref path) = self.history_file else {
            return;
        };
        if let Some(parent) = path.parent() {
            if let Err(e) = std::fs::create_dir_all(parent) {
                debug!(path = %parent.display(), error = %e, "Could not create history directory");
                return;
            }
        }
        if let Err(e) = self.editor.save_history(path) {
            debug!(path = %path.display(), error = %e, "Could not save history");
        }
    }
}

/// Runs lines from a non-interactive source, stopping at `exit`.
///
/// Blank lines and lines starting with `#` are skipped.
pub fn run_script(interpreter: &mut Interpreter<impl io::Write>, script: &str) -> io::Result<()> {
    for line in script.lines().map(str::trim) {
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if interpreter.execute_line(line)? == Flow::Exit {
            break;
        }
    }
    Ok(())
}

/// History location: the configured file, else the user's data directory.
fn history_path(config: &CliConfig) -> Option<PathBuf> {
    config
        .history_file
        .clone()
        .or_else(|| dirs::data_local_dir().map(|dir| dir.join("tabula").join("history")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formatter::OutputFormat;
    use tabula_common::StoreConfig;
    use tabula_storage::Database;
    use tempfile::TempDir;

    #[test]
    fn test_history_path_prefers_config() {
        let config = CliConfig {
            history_file: Some(PathBuf::from("/tmp/tabula-history")),
            ..CliConfig::default()
        };
        assert_eq!(history_path(&config), Some(PathBuf::from("/tmp/tabula-history")));
    }

    #[test]
    fn test_completion_candidates() {
        let matching: Vec<&str> = KEYWORDS
            .iter()
            .copied()
            .filter(|kw| kw.starts_with("sch"))
            .collect();
        assert_eq!(matching, vec!["schema", "schemas"]);
    }

    #[test]
    fn test_run_script_stops_at_exit() {
        let tmp = TempDir::new().unwrap();
        let db = Database::open(StoreConfig::with_workdir(tmp.path().join("workdir"))).unwrap();
        let mut interpreter = Interpreter::new(db, Vec::new(), OutputFormat::Raw);

        let script = "# setup\ncreate schema S\n\nexit\ncreate schema T\n";
        run_script(&mut interpreter, script).unwrap();

        let names: Vec<&str> = interpreter
            .database()
            .schemas()
            .iter()
            .map(|s| s.name())
            .collect();
        assert_eq!(names, vec!["S"]);
    }
}
