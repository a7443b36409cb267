//! Internal utilities: argument checking and name parsing.

use crate::types::*;
use crate::value::Value;
use alloc::format;
use alloc::string::String;

/// Checks the number of arguments passed to a command.
///
/// * `namec` is the number of words that make up the command's name, e.g. 2 for
///   `string length`.
/// * `min` and `max` bound `argv.len()`; a `max` of zero means there's no upper bound.
/// * `argsig` describes the arguments, e.g. `"varName ?value?"`.
///
/// On failure the error is an `ArgumentCount` error with the standard message.
///
/// ```
/// use tickle::*;
///
/// let argv = [Value::from("set")];
/// let err = check_args(1, &argv, 2, 3, "varName ?newValue?").unwrap_err();
/// assert_eq!(err.error_kind(), Some(ErrorKind::ArgumentCount));
/// assert_eq!(
///     err.value().as_str(),
///     "wrong # args: should be \"set varName ?newValue?\""
/// );
/// ```
pub fn check_args(
    namec: usize,
    argv: &[Value],
    min: usize,
    max: usize,
    argsig: &str,
) -> TickleResult {
    debug_assert!(namec >= 1 && namec <= min);

    if argv.len() < min || (max > 0 && argv.len() > max) {
        let mut msg = String::from("wrong # args: should be \"");
        for (i, word) in argv.iter().take(namec).enumerate() {
            if i > 0 {
                msg.push(' ');
            }
            msg.push_str(&word.as_str());
        }
        if !argsig.is_empty() {
            msg.push(' ');
            msg.push_str(argsig);
        }
        msg.push('"');
        return Err(Exception::error(ErrorKind::ArgumentCount, msg));
    }

    Ok(Value::empty())
}

/// Splits a variable name into its array name and element index, if it has one:
/// `a(b)` is element `b` of array `a`.
pub(crate) fn split_var_name(name: &str) -> (&str, Option<&str>) {
    if let Some(open) = name.find('(') {
        if open > 0 && name.ends_with(')') {
            return (&name[..open], Some(&name[open + 1..name.len() - 1]));
        }
    }
    (name, None)
}

/// Splits a possibly qualified name into its namespace qualifiers and its tail:
/// `a::b::c` is `(Some("a::b"), "c")`, `::c` is `(Some(""), "c")`, and `c` is
/// `(None, "c")`.
pub(crate) fn split_qualified(name: &str) -> (Option<&str>, &str) {
    match name.rfind("::") {
        Some(pos) => (Some(name[..pos].trim_end_matches(':')), &name[pos + 2..]),
        None => (None, name),
    }
}

/// Parses a level specifier as used by `uplevel`, `upvar`, and `info level`: `#n` is the
/// absolute level n, and a plain `n` is n levels above `current`.
pub(crate) fn parse_level(spec: &str, current: usize) -> Result<usize, Exception> {
    let bad_level = || Exception::error(ErrorKind::LinkScope, format!("bad level \"{}\"", spec));

    if let Some(absolute) = spec.strip_prefix('#') {
        let level: usize = absolute.parse().map_err(|_| bad_level())?;
        if level > current {
            return Err(bad_level());
        }
        Ok(level)
    } else {
        let relative: usize = spec.parse().map_err(|_| bad_level())?;
        current.checked_sub(relative).ok_or_else(bad_level)
    }
}

/// True if `spec` looks like a level specifier rather than a script or variable name.
pub(crate) fn is_level(spec: &str) -> bool {
    let digits = spec.strip_prefix('#').unwrap_or(spec);
    !digits.is_empty() && digits.bytes().all(|c| c.is_ascii_digit())
}
