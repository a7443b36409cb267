//! The Command Builder
//!
//! The builder pulls words from a [`Scanner`] in command mode and assembles them into
//! fully substituted [`Command`]s, one per call to [`Builder::next_command`].
//!
//! Substitution is performed through a [`Substitutor`], which the execution core
//! implements: it resolves variable references and executes nested scripts.  The builder
//! itself never touches interpreter state, which keeps the dependency between the two
//! layers one-way.
//!
//! Per-word rules:
//!
//! * Literals and braced blocks are used verbatim.
//! * `$name` is replaced by the variable's value; an array index is itself substituted
//!   first.
//! * `[script]` is replaced by the script's result.
//! * `"text"` is split again in quoted-string mode and each piece substituted.
//!
//! Adjacent words with no blank between them concatenate into a single argument.  When an
//! argument consists of exactly one substituted word its [`Value`] is passed through as-is,
//! so a list or number produced by a nested script keeps its representation.

use crate::scanner::{Scanner, Word, WordKind};
use crate::types::*;
use crate::util::split_var_name;
use crate::value::Value;
use alloc::format;
use alloc::string::String;

/// The capability the builder needs from the execution core.
pub trait Substitutor {
    /// Returns the value of the named variable.  The name may be an array element
    /// reference `name(index)` whose index has already been substituted.
    fn resolve(&mut self, name: &str) -> TickleResult;

    /// Executes a nested script and returns its result.
    fn execute(&mut self, script: &str) -> TickleResult;
}

/// One fully substituted command.
#[derive(Debug, Clone, PartialEq)]
pub struct Command {
    /// The command's words; `words[0]` is the command name.
    pub words: TickleList,
    /// The command's source text, before substitution.
    pub source: String,
    /// The 1-based line on which the command starts.
    pub line: usize,
}

/// Builds commands from script text.
pub struct Builder<'a> {
    scanner: Scanner<'a>,
    done: bool,
}

/// An argument under construction.
enum Arg {
    Empty,
    One(Value),
    Many(String),
}

impl Arg {
    fn push(&mut self, value: Value) {
        *self = match core::mem::replace(self, Arg::Empty) {
            Arg::Empty => Arg::One(value),
            Arg::One(first) => {
                let mut text = first.as_str().into_owned();
                text.push_str(&value.as_str());
                Arg::Many(text)
            }
            Arg::Many(mut text) => {
                text.push_str(&value.as_str());
                Arg::Many(text)
            }
        };
    }

    fn finish(&mut self, words: &mut TickleList) {
        match core::mem::replace(self, Arg::Empty) {
            Arg::Empty => (),
            Arg::One(value) => words.push(value),
            Arg::Many(text) => words.push(Value::from(text)),
        }
    }
}

impl<'a> Builder<'a> {
    pub fn new(script: &'a str) -> Self {
        Self {
            scanner: Scanner::new(script),
            done: false,
        }
    }

    /// Builds the next command, consuming its words through the terminating separator.
    /// Returns `Ok(None)` at the end of the script.
    pub fn next_command<S: Substitutor>(
        &mut self,
        sub: &mut S,
    ) -> Result<Option<Command>, Exception> {
        while !self.done {
            let mut words = TickleList::new();
            let mut arg = Arg::Empty;
            let mut first: Option<(usize, usize)> = None;
            let mut end = 0;

            loop {
                let word = self.scanner.scan();
                match word.kind {
                    WordKind::Eof => {
                        self.done = true;
                        break;
                    }
                    WordKind::Eol => break,
                    WordKind::Blank => {
                        arg.finish(&mut words);
                        continue;
                    }
                    WordKind::Comment => continue,
                    WordKind::Illegal => {
                        self.done = true;
                        return Err(syntax_error(&word));
                    }
                    _ => (),
                }

                first.get_or_insert((word.span.start, word.line));
                end = word.span.end;
                arg.push(substitute_word(&word, sub)?);
            }
            arg.finish(&mut words);

            if let Some((start, line)) = first {
                if !words.is_empty() {
                    return Ok(Some(Command {
                        words,
                        source: String::from(&self.scanner.source()[start..end]),
                        line,
                    }));
                }
            }
        }

        Ok(None)
    }
}

/// Substitutes a single word produced by the scanner in command or list mode.
fn substitute_word<S: Substitutor>(word: &Word, sub: &mut S) -> TickleResult {
    match word.kind {
        WordKind::Variable => substitute_variable(&word.text, sub),
        WordKind::Script => sub.execute(&word.text),
        WordKind::Quote => substitute(&word.text, sub),
        _ => Ok(Value::from(word.text.as_str())),
    }
}

pub(crate) fn substitute_variable<S: Substitutor>(name: &str, sub: &mut S) -> TickleResult {
    match split_var_name(name) {
        (array, Some(index)) => {
            let index = substitute(index, sub)?;
            sub.resolve(&format!("{}({})", array, index.as_str()))
        }
        (_, None) => sub.resolve(name),
    }
}

/// Performs variable and command substitution on text, as for the contents of a quoted
/// string.  Whitespace is preserved.
pub fn substitute<S: Substitutor>(text: &str, sub: &mut S) -> TickleResult {
    let mut scanner = Scanner::new(text);
    let mut arg = Arg::Empty;

    loop {
        let word = scanner.split();
        match word.kind {
            WordKind::Eof => break,
            WordKind::Illegal => return Err(syntax_error(&word)),
            WordKind::Variable => arg.push(substitute_variable(&word.text, sub)?),
            WordKind::Script => arg.push(sub.execute(&word.text)?),
            _ => arg.push(Value::from(word.text)),
        }
    }

    Ok(match arg {
        Arg::Empty => Value::empty(),
        Arg::One(value) => value,
        Arg::Many(text) => Value::from(text),
    })
}

/// Returns true if the script has no unterminated quote, brace, or bracket.
pub fn is_complete(script: &str) -> bool {
    let mut scanner = Scanner::new(script);
    loop {
        match scanner.scan().kind {
            WordKind::Eof => return true,
            WordKind::Illegal => return false,
            _ => (),
        }
    }
}

fn syntax_error(word: &Word) -> Exception {
    Exception::error(
        ErrorKind::Syntax,
        format!("{} at line {} column {}", word.text, word.line, word.column),
    )
}
