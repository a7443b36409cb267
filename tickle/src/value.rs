//! The Value Type
//!
//! Every value in a script is a [`Value`]: a tagged variant that is a string, a number, a
//! boolean, a list, or an array.  Every variant has a canonical string form, and each can be
//! coerced into the others according to fixed rules:
//!
//! | From \ To   | Number          | Boolean              | List                 | Array               |
//! |-------------|-----------------|----------------------|----------------------|---------------------|
//! | String      | parse as float  | boolean word/number  | re-scan as words     | via List            |
//! | Number      | itself          | `int(n) == 0`        | one element          | error               |
//! | Boolean     | `0` or `1`      | itself               | one element          | error               |
//! | List        | single element  | single element       | itself               | key/value pairs     |
//! | Array       | error           | error                | flattened pairs      | itself              |
//!
//! Coercions never mutate the source value.  A string is converted to a list by running it
//! through the scanner's list-splitting mode (see [`list`](../list/index.html)), which is the
//! "everything is a string, but structured on demand" contract.
//!
//! The `Link` variant is not a real value: it is stored in a frame's environment to make a
//! name an alias for a variable in another frame (see `upvar` and `global`).

use crate::list::{list_to_string, parse_list};
use crate::tickle_throw;
use crate::types::*;
use alloc::borrow::Cow;
use alloc::borrow::ToOwned;
use alloc::format;
use alloc::rc::Rc;
use alloc::string::{String, ToString};
use core::fmt;

/// Marks a variable as an alias for `name` as seen from the frame at absolute `depth`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    pub(crate) name: Rc<str>,
    pub(crate) depth: usize,
}

impl Link {
    pub fn new(name: &str, depth: usize) -> Self {
        Self {
            name: name.into(),
            depth,
        }
    }

    /// The aliased variable's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The absolute frame depth the alias resolves from.
    pub fn depth(&self) -> usize {
        self.depth
    }
}

/// A script value.  Cloning is cheap: payloads are reference counted.
#[derive(Debug, Clone)]
pub enum Value {
    String(Rc<str>),
    Number(TickleFloat),
    Boolean(bool),
    List(Rc<TickleList>),
    Array(Rc<TickleArray>),
    Link(Link),
}

impl Default for Value {
    fn default() -> Self {
        Value::empty()
    }
}

/// Values compare by their string forms, except that two numbers compare numerically.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            _ => self.as_str() == other.as_str(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_str())
    }
}

impl Value {
    /// The empty string.
    pub fn empty() -> Value {
        Value::String("".into())
    }

    /// The canonical string form of the value.  Strings are borrowed; every other variant
    /// is rendered.
    pub fn as_str(&self) -> Cow<'_, str> {
        match self {
            Value::String(s) => Cow::Borrowed(s),
            Value::Number(n) => Cow::Owned(format_number(*n)),
            Value::Boolean(b) => Cow::Borrowed(if *b { "1" } else { "0" }),
            Value::List(list) => Cow::Owned(list_to_string(list)),
            Value::Array(array) => Cow::Owned(list_to_string(&flatten_array(array))),
            Value::Link(link) => Cow::Borrowed(&link.name),
        }
    }

    /// Returns true if the value is the empty string or an empty list or array.
    pub fn is_empty(&self) -> bool {
        match self {
            Value::String(s) => s.is_empty(),
            Value::List(list) => list.is_empty(),
            Value::Array(array) => array.is_empty(),
            _ => false,
        }
    }

    /// A short name for the variant, used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::String(_) => "string",
            Value::Number(_) => "number",
            Value::Boolean(_) => "boolean",
            Value::List(_) => "list",
            Value::Array(_) => "array",
            Value::Link(_) => "link",
        }
    }

    /// Coerces the value to a number.
    ///
    /// ```
    /// use tickle::Value;
    /// assert_eq!(Value::from("2.5").to_number().unwrap(), 2.5);
    /// assert_eq!(Value::from(true).to_number().unwrap(), 1.0);
    /// assert!(Value::from("abc").to_number().is_err());
    /// ```
    pub fn to_number(&self) -> Result<TickleFloat, Exception> {
        match self {
            Value::Number(n) => Ok(*n),
            Value::Boolean(b) => Ok(if *b { 1.0 } else { 0.0 }),
            Value::String(s) => parse_float(s),
            Value::List(list) if list.len() == 1 => list[0].to_number(),
            _ => Err(self.cast_error("number")),
        }
    }

    /// Coerces the value to a boolean.
    ///
    /// A `Number` is true when its integer part is *zero*; this inverted rule is kept as
    /// the value model defines it.  Expressions use their own, conventional truthiness.
    /// Strings accept the usual boolean words (`true`/`false`, `yes`/`no`, `on`/`off`) or
    /// any number, where nonzero is true.
    pub fn to_boolean(&self) -> Result<bool, Exception> {
        match self {
            Value::Boolean(b) => Ok(*b),
            Value::Number(n) => Ok(n.trunc() == 0.0),
            Value::String(s) => match parse_boolean(s) {
                Some(flag) => Ok(flag),
                None => match parse_float(s) {
                    Ok(n) => Ok(n != 0.0),
                    Err(_) => tickle_throw!(
                        ErrorKind::Cast,
                        "expected boolean value but got \"{}\"",
                        s
                    ),
                },
            },
            Value::List(list) if list.len() == 1 => list[0].to_boolean(),
            _ => Err(self.cast_error("boolean")),
        }
    }

    /// Coerces the value to an integer.  Integer strings may use the `0x`, `0o`, and `0b`
    /// prefixes; numbers with a fractional part are rejected.
    pub fn to_int(&self) -> Result<TickleInt, Exception> {
        match self {
            Value::Number(n) if n.fract() == 0.0 && n.is_finite() => Ok(*n as TickleInt),
            Value::Boolean(b) => Ok(TickleInt::from(*b)),
            Value::String(s) => parse_int(s).ok_or_else(|| {
                Exception::error(
                    ErrorKind::Cast,
                    format!("expected integer but got \"{}\"", s),
                )
            }),
            Value::List(list) if list.len() == 1 => list[0].to_int(),
            _ => Err(self.cast_error("integer")),
        }
    }

    /// Coerces the value to a list.  Strings are split into words; numbers and booleans
    /// become one-element lists; arrays flatten into key/value pairs.
    ///
    /// ```
    /// use tickle::Value;
    /// let list = Value::from("a {b c} d").to_list().unwrap();
    /// assert_eq!(list.len(), 3);
    /// assert_eq!(list[1].as_str(), "b c");
    /// ```
    pub fn to_list(&self) -> Result<Rc<TickleList>, Exception> {
        match self {
            Value::List(list) => Ok(Rc::clone(list)),
            Value::String(s) => Ok(Rc::new(parse_list(s)?)),
            Value::Number(_) | Value::Boolean(_) => Ok(Rc::new(alloc::vec![self.clone()])),
            Value::Array(array) => Ok(Rc::new(flatten_array(array))),
            Value::Link(_) => Err(self.cast_error("list")),
        }
    }

    /// Coerces the value to an array.  Lists (and strings, via lists) must have an even
    /// number of elements, taken as key/value pairs.
    pub fn to_array(&self) -> Result<Rc<TickleArray>, Exception> {
        match self {
            Value::Array(array) => Ok(Rc::clone(array)),
            Value::List(list) => pairs_to_array(list),
            Value::String(_) => pairs_to_array(&self.to_list()?),
            _ => Err(self.cast_error("array")),
        }
    }

    /// Returns the link, if the value is one.
    pub(crate) fn as_link(&self) -> Option<&Link> {
        match self {
            Value::Link(link) => Some(link),
            _ => None,
        }
    }

    fn cast_error(&self, target: &str) -> Exception {
        Exception::error(
            ErrorKind::Cast,
            format!("can't convert {} \"{}\" to {}", self.type_name(), self.as_str(), target),
        )
    }
}

fn flatten_array(array: &TickleArray) -> TickleList {
    let mut list = TickleList::with_capacity(array.len() * 2);
    for (key, value) in array {
        list.push(Value::from(key.as_str()));
        list.push(value.clone());
    }
    list
}

fn pairs_to_array(list: &[Value]) -> Result<Rc<TickleArray>, Exception> {
    if list.len() % 2 != 0 {
        return tickle_throw!(ErrorKind::Cast, "list must have an even number of elements");
    }

    let mut array = TickleArray::default();
    for pair in list.chunks(2) {
        array.insert(pair[0].as_str().into_owned(), pair[1].clone());
    }
    Ok(Rc::new(array))
}

/// Renders a number: integral values without a fractional part, others in the shortest
/// form that round-trips.
pub(crate) fn format_number(n: TickleFloat) -> String {
    if n.is_nan() {
        "NaN".to_owned()
    } else if n.is_infinite() {
        String::from(if n > 0.0 { "Inf" } else { "-Inf" })
    } else if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as TickleInt)
    } else {
        n.to_string()
    }
}

/// Renders a real that must keep reading as a real: `3.0`, not `3`.
pub(crate) fn format_real(n: TickleFloat) -> String {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{:.1}", n)
    } else {
        format_number(n)
    }
}

pub(crate) fn parse_float(s: &str) -> Result<TickleFloat, Exception> {
    let trimmed = s.trim();
    match trimmed.parse::<TickleFloat>() {
        Ok(n) if !trimmed.is_empty() => Ok(n),
        _ => match parse_int(trimmed) {
            Some(i) => Ok(i as TickleFloat),
            None => tickle_throw!(
                ErrorKind::Cast,
                "expected floating-point number but got \"{}\"",
                s
            ),
        },
    }
}

/// Parses an integer with an optional sign and an optional `0x`/`0o`/`0b` radix prefix.
pub(crate) fn parse_int(s: &str) -> Option<TickleInt> {
    let s = s.trim();
    let (negative, digits) = match s.as_bytes().first()? {
        b'-' => (true, &s[1..]),
        b'+' => (false, &s[1..]),
        _ => (false, s),
    };

    let (radix, digits) = match digits.get(..2) {
        Some("0x") | Some("0X") => (16, &digits[2..]),
        Some("0o") | Some("0O") => (8, &digits[2..]),
        Some("0b") | Some("0B") => (2, &digits[2..]),
        _ => (10, digits),
    };

    if digits.is_empty() || !digits.chars().all(|c| c.is_digit(radix)) {
        return None;
    }

    let magnitude = u64::from_str_radix(digits, radix).ok()?;
    if negative {
        if magnitude == 1 << 63 {
            Some(TickleInt::MIN)
        } else {
            TickleInt::try_from(magnitude).ok().map(|i| -i)
        }
    } else {
        TickleInt::try_from(magnitude).ok()
    }
}

/// Parses the boolean words, case-insensitively.
pub(crate) fn parse_boolean(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.into())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s.into())
    }
}

impl From<&String> for Value {
    fn from(s: &String) -> Self {
        Value::String(s.as_str().into())
    }
}

impl From<Cow<'_, str>> for Value {
    fn from(s: Cow<'_, str>) -> Self {
        Value::String(s.as_ref().into())
    }
}

impl From<TickleFloat> for Value {
    fn from(n: TickleFloat) -> Self {
        Value::Number(n)
    }
}

/// Integers that a float can't hold exactly are kept as strings.
impl From<TickleInt> for Value {
    fn from(i: TickleInt) -> Self {
        const EXACT: TickleInt = 1 << 53;
        if (-EXACT..=EXACT).contains(&i) {
            Value::Number(i as TickleFloat)
        } else {
            Value::String(i.to_string().into())
        }
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Number(TickleFloat::from(i))
    }
}

impl From<usize> for Value {
    fn from(n: usize) -> Self {
        Value::from(n as TickleInt)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<TickleList> for Value {
    fn from(list: TickleList) -> Self {
        Value::List(Rc::new(list))
    }
}

impl From<&[Value]> for Value {
    fn from(list: &[Value]) -> Self {
        Value::List(Rc::new(list.to_vec()))
    }
}

impl From<TickleArray> for Value {
    fn from(array: TickleArray) -> Self {
        Value::Array(Rc::new(array))
    }
}
