//! The Standard Command Set
//!
//! Every command here is an ordinary [`CommandFunc`], registered by name in the
//! [`CommandRegistry`] returned by [`CommandRegistry::standard`].  The commands are thin:
//! they check their arguments, then call the interpreter's public API.
//!
//! Commands that reach the host system (`exec`, `open`, `close`, `source`, `exit`) are
//! registered as unsafe, so safe interpreters refuse them.  The remaining I/O commands
//! only work on channels that are already open and are safe.

use crate::command::CommandRegistry;
use crate::types::*;
use crate::tickle_err;
use alloc::format;
use alloc::string::String;
use alloc::vec::Vec;

mod array;
mod control;
#[cfg(feature = "info")]
mod info;
mod interp;
mod io;
mod list;
mod namespace;
#[cfg(feature = "string-command")]
mod string;

pub use self::array::cmd_array;
pub use self::control::*;
#[cfg(feature = "info")]
pub use self::info::cmd_info;
pub use self::interp::cmd_interp;
pub use self::io::*;
pub use self::list::*;
pub use self::namespace::{cmd_namespace, cmd_variable};
#[cfg(feature = "string-command")]
pub use self::string::cmd_string;

/// Adds the standard commands to a registry.
pub fn register_standard<Ctx>(registry: &mut CommandRegistry<Ctx>) {
    registry
        .register("append", cmd_append)
        .register("array", cmd_array)
        .register("break", cmd_break)
        .register("catch", cmd_catch)
        .register("concat", cmd_concat)
        .register("continue", cmd_continue)
        .register("defer", cmd_defer)
        .register("error", cmd_error)
        .register("eval", cmd_eval)
        .register("for", cmd_for)
        .register("foreach", cmd_foreach)
        .register("global", cmd_global)
        .register("if", cmd_if)
        .register("incr", cmd_incr)
        .register("interp", cmd_interp)
        .register("join", cmd_join)
        .register("lappend", cmd_lappend)
        .register("lindex", cmd_lindex)
        .register("list", cmd_list)
        .register("llength", cmd_llength)
        .register("namespace", cmd_namespace)
        .register("proc", cmd_proc)
        .register("rename", cmd_rename)
        .register("return", cmd_return)
        .register("set", cmd_set)
        .register("time", cmd_time)
        .register("unset", cmd_unset)
        .register("uplevel", cmd_uplevel)
        .register("upvar", cmd_upvar)
        .register("variable", cmd_variable)
        .register("while", cmd_while);

    #[cfg(feature = "expr")]
    registry.register("expr", cmd_expr);

    #[cfg(feature = "info")]
    registry.register("info", cmd_info);

    #[cfg(feature = "string-command")]
    registry.register("string", cmd_string);

    // Channel commands
    registry
        .register("eof", cmd_eof)
        .register("flush", cmd_flush)
        .register("gets", cmd_gets)
        .register("puts", cmd_puts)
        .register("read", cmd_read)
        .register("seek", cmd_seek)
        .register("tell", cmd_tell);

    // Host access
    registry
        .register_unsafe("close", cmd_close)
        .register_unsafe("exec", cmd_exec)
        .register_unsafe("exit", cmd_exit)
        .register_unsafe("open", cmd_open)
        .register_unsafe("source", cmd_source);
}

/// Parses an index into a sequence of length `len`: an integer, `end`, `end-n`, or
/// `end+n`.  The result may lie outside the sequence; callers decide what that means.
pub(crate) fn parse_index(index: &Value, len: usize) -> Result<TickleInt, Exception> {
    let text = index.as_str();
    let end = len as TickleInt - 1;

    let parsed = match text.strip_prefix("end") {
        Some("") => Some(end),
        Some(offset) => {
            let (sign, digits) = offset.split_at(1.min(offset.len()));
            let n: Option<TickleInt> = digits.parse().ok();
            match sign {
                "-" => n.map(|n| end - n),
                "+" => n.map(|n| end + n),
                _ => None,
            }
        }
        None => index.to_int().ok(),
    };

    match parsed {
        Some(i) => Ok(i),
        None => tickle_err!(
            "bad index \"{}\": must be integer?[+-]integer? or end?[+-]integer?",
            text
        ),
    }
}

/// Joins values the way `concat` does: each trimmed of surrounding whitespace, empty ones
/// dropped, and the rest separated by single spaces.
pub(crate) fn concat_values(values: &[Value]) -> String {
    let mut out = String::new();
    for value in values {
        let text = value.as_str();
        let text = text.trim();
        if text.is_empty() {
            continue;
        }
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(text);
    }
    out
}

/// The script argument of commands that accept either one script or several words to be
/// concatenated into one.
pub(crate) fn script_arg(args: &[Value]) -> Value {
    match args {
        [script] => script.clone(),
        _ => Value::from(concat_values(args)),
    }
}

/// A `wrong # args` error for commands whose arity can't be checked with `check_args`.
pub(crate) fn wrong_args(argv: &[Value], namec: usize, argsig: &str) -> Exception {
    let words: Vec<String> = argv
        .iter()
        .take(namec)
        .map(|word| word.as_str().into_owned())
        .collect();
    Exception::error(
        ErrorKind::ArgumentCount,
        format!("wrong # args: should be \"{} {}\"", words.join(" "), argsig),
    )
}
