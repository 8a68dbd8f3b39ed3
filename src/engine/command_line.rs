//! Splitting raw engine command strings into argument vectors.
//!
//! Whitespace separates arguments. Single quotes preserve their contents
//! verbatim; double quotes preserve whitespace and honour `\"` and `\\`
//! escapes. Any other backslash is literal, so Windows paths such as
//! `C:\data` pass through unchanged.

use crate::error::EngineError;

#[derive(Clone, Copy, PartialEq, Eq)]
enum Quote {
    None,
    Single,
    Double,
}

/// Split `command` into arguments.
///
/// # Errors
///
/// Returns [`EngineError::MalformedCommand`] when a quote is left open.
pub fn split(command: &str) -> Result<Vec<String>, EngineError> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut in_word = false;
    let mut quote = Quote::None;
    let mut chars = command.chars();

    while let Some(c) = chars.next() {
        match (quote, c) {
            (Quote::None, ws) if ws.is_whitespace() => {
                if in_word {
                    args.push(std::mem::take(&mut current));
                    in_word = false;
                }
            }
            (Quote::None, '\'') => {
                quote = Quote::Single;
                in_word = true;
            }
            (Quote::None, '"') => {
                quote = Quote::Double;
                in_word = true;
            }
            (Quote::Single, '\'') | (Quote::Double, '"') => quote = Quote::None,
            (Quote::Double, '\\') => match chars.next() {
                Some(next @ ('"' | '\\')) => current.push(next),
                Some(next) => {
                    current.push('\\');
                    current.push(next);
                }
                None => current.push('\\'),
            },
            (_, other) => {
                current.push(other);
                in_word = true;
            }
        }
    }

    if quote != Quote::None {
        return Err(EngineError::MalformedCommand {
            reason: String::from("unterminated quote"),
        });
    }
    if in_word {
        args.push(current);
    }
    Ok(args)
}

/// Join arguments into a command string that [`split`] turns back into the
/// same arguments.
#[must_use]
pub fn join<S: AsRef<str>>(args: &[S]) -> String {
    args.iter()
        .map(|arg| quote_argument(arg.as_ref()))
        .collect::<Vec<_>>()
        .join(" ")
}

fn quote_argument(arg: &str) -> String {
    let needs_quotes = arg.is_empty()
        || arg
            .chars()
            .any(|c| c.is_whitespace() || matches!(c, '\'' | '"'));
    if !needs_quotes {
        return arg.to_owned();
    }
    let mut quoted = String::with_capacity(arg.len() + 2);
    quoted.push('"');
    let mut chars = arg.chars().peekable();
    while let Some(c) = chars.next() {
        // A backslash is only an escape before `"`, `\` or the closing quote.
        let escape = match c {
            '"' => true,
            '\\' => matches!(chars.peek(), None | Some('"' | '\\')),
            _ => false,
        };
        if escape {
            quoted.push('\\');
        }
        quoted.push(c);
    }
    quoted.push('"');
    quoted
}
