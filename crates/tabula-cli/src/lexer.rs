//! Splits an input line into tokens.
//!
//! Tokens are separated by whitespace. Text between single quotes keeps its
//! spaces, so `path_to_file='lab 1.pdf'` is one token `path_to_file=lab 1.pdf`.

use tabula_common::QUOTE;

use crate::command::CommandError;

/// Tokenizes one line of input.
pub fn tokenize(line: &str) -> Result<Vec<String>, CommandError> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut quoted = false;
    let mut in_token = false;

    for c in line.chars() {
        if c == QUOTE {
            quoted = !quoted;
            in_token = true;
        } else if c.is_whitespace() && !quoted {
            if in_token {
                tokens.push(std::mem::take(&mut current));
                in_token = false;
            }
        } else {
            current.push(c);
            in_token = true;
        }
    }

    if quoted {
        return Err(CommandError::UnterminatedQuote);
    }
    if in_token {
        tokens.push(current);
    }

    Ok(tokens)
}
