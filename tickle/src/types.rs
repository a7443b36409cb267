//! Public type declarations
//!
//! This module defines the result and exception types shared by every layer of the
//! interpreter, along with the signatures of Rust command functions.

use crate::interp::Interp;
use crate::tickle_err;
pub use crate::value::Value;
use alloc::boxed::Box;
use alloc::format;
use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;
use core::hash::BuildHasherDefault;
use fnv::FnvHasher;
use indexmap::IndexMap;

/// The hasher used by all of the interpreter's internal tables.
pub type TickleHasher = BuildHasherDefault<FnvHasher>;

/// The integer type used by expressions and integer-valued commands.
pub type TickleInt = i64;

/// The floating point type used by numeric values.
pub type TickleFloat = f64;

/// A list of values.
pub type TickleList = Vec<Value>;

/// An array: a mapping from element names to values.
pub type TickleArray = IndexMap<String, Value, TickleHasher>;

/// The result of evaluating a script, an expression, or a command.
pub type TickleResult = Result<Value, Exception>;

/// The result of a command function; `None` is the empty value.
pub type TickleOptResult = Result<Option<Value>, Exception>;

/// A command defined in Rust: called with the interpreter, the command's words
/// (`argv[0]` is the command name), and the application context.
pub type CommandFunc<Ctx> = fn(&mut Interp<Ctx>, &[Value], &mut Ctx) -> TickleOptResult;

/// A command defined as a Rust closure.
#[cfg(feature = "closure-commands")]
pub type CommandClosure<Ctx> = Box<dyn Fn(&mut Interp<Ctx>, &[Value], &mut Ctx) -> TickleOptResult>;

/// The kind of exceptional return produced by a command.
///
/// `Okay` is used only inside `return -code ok`; normal results are `Ok(value)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultCode {
    Okay,
    Error,
    Return,
    Break,
    Continue,
    /// The script asked the process to exit with the given status.
    Exit(i32),
    Other(TickleInt),
}

impl ResultCode {
    /// Parses a `return -code` value: a code name or an integer.
    pub fn from_value(value: &Value) -> Result<Self, Exception> {
        let code = value.as_str();
        match &*code {
            "ok" => return Ok(ResultCode::Okay),
            "error" => return Ok(ResultCode::Error),
            "return" => return Ok(ResultCode::Return),
            "break" => return Ok(ResultCode::Break),
            "continue" => return Ok(ResultCode::Continue),
            _ => (),
        }

        match value.to_int() {
            Ok(0) => Ok(ResultCode::Okay),
            Ok(1) => Ok(ResultCode::Error),
            Ok(2) => Ok(ResultCode::Return),
            Ok(3) => Ok(ResultCode::Break),
            Ok(4) => Ok(ResultCode::Continue),
            Ok(num) => Ok(ResultCode::Other(num)),
            Err(_) => tickle_err!(
                "bad completion code \"{}\": must be ok, error, return, break, continue, or an integer",
                code
            ),
        }
    }

    /// The integer form of the code, as returned by `catch`.
    pub fn as_int(&self) -> TickleInt {
        match self {
            ResultCode::Okay => 0,
            ResultCode::Error => 1,
            ResultCode::Return => 2,
            ResultCode::Break => 3,
            ResultCode::Continue => 4,
            ResultCode::Exit(code) => TickleInt::from(*code),
            ResultCode::Other(num) => *num,
        }
    }
}

/// The classes of error the interpreter itself raises.  Errors raised by scripts via
/// `error` are `Generic`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Illegal token, unterminated quote/brace/bracket, malformed number or expression.
    Syntax,
    UndefinedVariable,
    UndefinedCommand,
    /// An operator or command was applied to an incompatible value.
    Type,
    /// A value could not be converted to the requested representation.
    Cast,
    DivisionByZero,
    /// An operator that isn't defined for its operand type, e.g. `<<` on a real.
    UnsupportedOperation,
    ArgumentCount,
    /// A safe interpreter tried to run a command not marked safe.
    UnsafeCommand,
    /// An `upvar`/`global`/`uplevel` level that can't be linked or reached.
    LinkScope,
    Generic,
}

impl ErrorKind {
    /// The `errorCode` value reported for errors of this kind.
    pub fn error_code(&self) -> &'static str {
        match self {
            ErrorKind::Syntax => "TCL PARSE",
            ErrorKind::UndefinedVariable => "TCL LOOKUP VARNAME",
            ErrorKind::UndefinedCommand => "TCL LOOKUP COMMAND",
            ErrorKind::Type => "TCL VALUE TYPE",
            ErrorKind::Cast => "TCL VALUE CAST",
            ErrorKind::DivisionByZero => "ARITH DIVZERO {divide by zero}",
            ErrorKind::UnsupportedOperation => "ARITH UNSUPPORTED",
            ErrorKind::ArgumentCount => "TCL WRONGARGS",
            ErrorKind::UnsafeCommand => "TCL SAFE UNSAFE",
            ErrorKind::LinkScope => "TCL LOOKUP LEVEL",
            ErrorKind::Generic => "NONE",
        }
    }
}

/// Additional data carried by error exceptions.
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorData {
    kind: ErrorKind,
    error_code: Value,
    error_info: String,
    is_new: bool,
}

impl ErrorData {
    fn new(kind: ErrorKind, error_code: Value, error_msg: &str) -> Self {
        Self {
            kind,
            error_code,
            error_info: error_msg.into(),
            is_new: true,
        }
    }

    /// The error's kind.
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// The error's `errorCode`.
    pub fn error_code(&self) -> Value {
        self.error_code.clone()
    }

    /// The accumulated stack trace, i.e. the `errorInfo`.
    pub fn error_info(&self) -> Value {
        Value::from(self.error_info.as_str())
    }

    /// True if no stack trace lines have been added yet.
    pub fn is_new(&self) -> bool {
        self.is_new
    }
}

/// Any exceptional return from a command or script: an error, or one of the control
/// codes produced by `return`, `break`, `continue`, and `exit`.
#[derive(Debug, Clone, PartialEq)]
pub struct Exception {
    code: ResultCode,
    value: Value,
    level: usize,
    next_code: ResultCode,
    error_data: Option<ErrorData>,
}

impl Exception {
    /// Creates a generic error with the given message.
    pub fn tickle_err(msg: Value) -> Self {
        let data = ErrorData::new(ErrorKind::Generic, Value::from("NONE"), &msg.as_str());
        Self {
            code: ResultCode::Error,
            value: msg,
            level: 0,
            next_code: ResultCode::Error,
            error_data: Some(data),
        }
    }

    /// Creates a generic error with an explicit `errorCode`, as the `error` command does.
    pub fn tickle_err2(error_code: Value, msg: Value) -> Self {
        let data = ErrorData::new(ErrorKind::Generic, error_code, &msg.as_str());
        Self {
            code: ResultCode::Error,
            value: msg,
            level: 0,
            next_code: ResultCode::Error,
            error_data: Some(data),
        }
    }

    /// Creates an error of the given kind.
    pub fn error(kind: ErrorKind, msg: impl Into<String>) -> Self {
        let msg: String = msg.into();
        let data = ErrorData::new(kind, Value::from(kind.error_code()), &msg);
        Self {
            code: ResultCode::Error,
            value: Value::from(msg),
            level: 0,
            next_code: ResultCode::Error,
            error_data: Some(data),
        }
    }

    /// A plain `return value`.
    pub fn tickle_return(value: Value) -> Self {
        Self {
            code: ResultCode::Return,
            value,
            level: 1,
            next_code: ResultCode::Okay,
            error_data: None,
        }
    }

    /// A `return` with explicit `-level` and `-code` options.
    pub fn tickle_return_ext(value: Value, level: usize, next_code: ResultCode) -> Self {
        Self {
            code: ResultCode::Return,
            value,
            level,
            next_code,
            error_data: None,
        }
    }

    /// A `return -code error`: an error that surfaces `level` procedures up.
    pub fn tickle_return_err(
        msg: Value,
        level: usize,
        error_code: Option<Value>,
        error_info: Option<Value>,
    ) -> Self {
        let error_code = error_code.unwrap_or_else(|| Value::from("NONE"));
        let mut data = ErrorData::new(ErrorKind::Generic, error_code, &msg.as_str());
        if let Some(info) = error_info {
            data.error_info = info.as_str().into_owned();
        }

        if level == 0 {
            Self {
                code: ResultCode::Error,
                value: msg,
                level: 0,
                next_code: ResultCode::Error,
                error_data: Some(data),
            }
        } else {
            Self {
                code: ResultCode::Return,
                value: msg,
                level,
                next_code: ResultCode::Error,
                error_data: Some(data),
            }
        }
    }

    pub fn tickle_break() -> Self {
        Self {
            code: ResultCode::Break,
            value: Value::empty(),
            level: 0,
            next_code: ResultCode::Break,
            error_data: None,
        }
    }

    pub fn tickle_continue() -> Self {
        Self {
            code: ResultCode::Continue,
            value: Value::empty(),
            level: 0,
            next_code: ResultCode::Continue,
            error_data: None,
        }
    }

    /// The exit signal; unwinds every frame, running deferred actions, up to the caller
    /// of the outermost `eval`.
    pub fn tickle_exit(status: i32) -> Self {
        Self {
            code: ResultCode::Exit(status),
            value: Value::empty(),
            level: 0,
            next_code: ResultCode::Exit(status),
            error_data: None,
        }
    }

    pub fn is_error(&self) -> bool {
        self.code == ResultCode::Error
    }

    pub fn code(&self) -> ResultCode {
        self.code
    }

    /// The exception's value: the error message, or the returned value.
    pub fn value(&self) -> Value {
        self.value.clone()
    }

    /// The remaining `return -level`.
    pub fn level(&self) -> usize {
        self.level
    }

    /// The code the exception becomes when its `return -level` reaches zero.
    pub fn next_code(&self) -> ResultCode {
        self.next_code
    }

    pub fn error_data(&self) -> Option<&ErrorData> {
        self.error_data.as_ref()
    }

    /// The error's kind, if this exception is (or will become) an error.
    pub fn error_kind(&self) -> Option<ErrorKind> {
        self.error_data.as_ref().map(|data| data.kind)
    }

    /// Called as a `return` passes a procedure boundary.
    pub(crate) fn decrement_level(&mut self) {
        debug_assert!(self.code == ResultCode::Return && self.level > 0);
        self.level -= 1;
        if self.level == 0 {
            self.code = self.next_code;
        }
    }

    /// True if no stack trace lines have been added to the error yet.
    pub fn is_new_error(&self) -> bool {
        self.error_data.as_ref().is_some_and(|data| data.is_new)
    }

    /// Appends a line to the error's stack trace.
    pub fn add_error_info(&mut self, line: &str) {
        if let Some(data) = &mut self.error_data {
            data.is_new = false;
            data.error_info.push('\n');
            data.error_info.push_str(line);
        }
    }
}

impl fmt::Display for Exception {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value)
    }
}

/// A subcommand of an ensemble command: its name and implementation.
pub struct Subcommand<Ctx>(pub &'static str, pub CommandFunc<Ctx>);

impl<Ctx> Clone for Subcommand<Ctx> {
    fn clone(&self) -> Self {
        Subcommand(self.0, self.1)
    }
}

impl<Ctx> Subcommand<Ctx> {
    /// Looks up a subcommand by exact name.  On failure the error lists the valid names.
    pub fn find<'a>(
        ensemble: &'a [Subcommand<Ctx>],
        sub_name: &str,
    ) -> Result<&'a Subcommand<Ctx>, Exception> {
        if let Some(subcmd) = ensemble.iter().find(|subcmd| subcmd.0 == sub_name) {
            return Ok(subcmd);
        }

        let names: Vec<&str> = ensemble.iter().map(|subcmd| subcmd.0).collect();
        let names = match names.split_last() {
            None => String::new(),
            Some((last, [])) => String::from(*last),
            Some((last, [first])) => format!("{} or {}", first, last),
            Some((last, rest)) => format!("{}, or {}", rest.join(", "), last),
        };

        Err(Exception::error(
            ErrorKind::Generic,
            format!(
                "unknown or ambiguous subcommand \"{}\": must be {}",
                sub_name, names
            ),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_result_code_from_value() {
        assert_eq!(ResultCode::from_value(&"ok".into()), Ok(ResultCode::Okay));
        assert_eq!(ResultCode::from_value(&"break".into()), Ok(ResultCode::Break));
        assert_eq!(ResultCode::from_value(&"1".into()), Ok(ResultCode::Error));
        assert_eq!(ResultCode::from_value(&"7".into()), Ok(ResultCode::Other(7)));
        assert!(ResultCode::from_value(&"nonesuch".into()).is_err());
    }

    #[test]
    fn test_error_kinds() {
        let exception = Exception::error(ErrorKind::DivisionByZero, "divide by zero");
        assert!(exception.is_error());
        assert_eq!(exception.error_kind(), Some(ErrorKind::DivisionByZero));
        assert_eq!(exception.value().as_str(), "divide by zero");

        let data = exception.error_data().expect("error data");
        assert_eq!(data.error_code().as_str(), "ARITH DIVZERO {divide by zero}");
        assert!(data.is_new());
    }

    #[test]
    fn test_add_error_info() {
        let mut exception = Exception::tickle_err("oops".into());
        assert!(exception.is_new_error());
        exception.add_error_info("    while executing");
        assert!(!exception.is_new_error());
        assert_eq!(
            exception.error_data().unwrap().error_info().as_str(),
            "oops\n    while executing"
        );
    }

    #[test]
    fn test_return_levels() {
        let mut exception = Exception::tickle_return_ext("x".into(), 2, ResultCode::Break);
        exception.decrement_level();
        assert_eq!(exception.code(), ResultCode::Return);
        exception.decrement_level();
        assert_eq!(exception.code(), ResultCode::Break);
    }

    fn dummy(_: &mut Interp<()>, _: &[Value], _: &mut ()) -> TickleOptResult {
        Ok(None)
    }

    #[test]
    fn test_subcommand_find() {
        let ensemble = [
            Subcommand("alpha", dummy),
            Subcommand("beta", dummy),
            Subcommand("gamma", dummy),
        ];
        assert_eq!(Subcommand::find(&ensemble, "beta").map(|s| s.0), Ok("beta"));

        let err = Subcommand::find(&ensemble, "delta").map(|s| s.0).unwrap_err();
        assert_eq!(
            err.value().as_str(),
            "unknown or ambiguous subcommand \"delta\": must be alpha, beta, or gamma"
        );
    }
}
