//! The Expression Evaluator
//!
//! Expressions have their own small type system, [`ExprValue`]: integers, reals, and
//! booleans.  Operands taken from variables, nested scripts, and quoted or braced strings
//! are converted into it on the way in, and the result is converted back into a [`Value`]
//! on the way out.
//!
//! Parsing is by precedence climbing over the scanner's expression-mode tokens.  From
//! lowest to highest binding power:
//!
//! | Operators        | Associativity |
//! |------------------|---------------|
//! | `?:`             | right         |
//! | `\|\|`           | left          |
//! | `&&`             | left          |
//! | `\|`             | left          |
//! | `^`              | left          |
//! | `&`              | left          |
//! | `==` `!=`        | left          |
//! | `<` `<=` `>` `>=`| left          |
//! | `<<` `>>`        | left          |
//! | `+` `-`          | left          |
//! | `*` `/` `%`      | left          |
//! | `**`             | right         |
//! | unary `- + ! ~`  |               |
//!
//! The expression is parsed completely before any of it is evaluated, so that `&&`, `||`,
//! and `?:` evaluate only the operands they need.
//!
//! Typing rules:
//!
//! * Mixed integer/real arithmetic promotes to real; booleans count as 0 or 1.
//! * `int ** int` is computed in reals and truncated back to an integer.
//! * Integer `/` and `%` round towards negative infinity, so `a/b*b + a%b == a`.
//! * Division or modulo by zero is a `DivisionByZero` error.
//! * Bitwise and shift operators accept only integers; anything else is an
//!   `UnsupportedOperation` error.
//! * `<`, `<=`, `>`, `>=` require both operands to have the same type.  Mixing integers
//!   and reals is a `Type` error, even though arithmetic allows it.
//! * `==` and `!=` compare integers and reals numerically; booleans compare as 0 or 1.

use crate::builder::{substitute, substitute_variable, Substitutor};
use crate::scanner::{Scanner, Word, WordKind};
use crate::stack::ensure_sufficient_stack;
use crate::tickle_throw;
use crate::types::*;
use crate::value::{format_real, parse_boolean, parse_int, Value};
use alloc::boxed::Box;
use alloc::format;
use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;

/// A value computed by an expression.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ExprValue {
    Integer(TickleInt),
    Real(TickleFloat),
    Boolean(bool),
}

impl ExprValue {
    /// Conventional truthiness: nonzero numbers are true.
    pub fn is_true(&self) -> bool {
        match *self {
            ExprValue::Integer(i) => i != 0,
            ExprValue::Real(r) => r != 0.0,
            ExprValue::Boolean(b) => b,
        }
    }

    /// Converts an operand into an expression value.
    ///
    /// ```
    /// use tickle::Value;
    /// use tickle::expr::ExprValue;
    ///
    /// assert_eq!(ExprValue::from_value(&Value::from("0x10")), Ok(ExprValue::Integer(16)));
    /// assert_eq!(ExprValue::from_value(&Value::from("2.5")), Ok(ExprValue::Real(2.5)));
    /// assert_eq!(ExprValue::from_value(&Value::from("no")), Ok(ExprValue::Boolean(false)));
    /// assert!(ExprValue::from_value(&Value::from("abc")).is_err());
    /// ```
    pub fn from_value(value: &Value) -> Result<ExprValue, Exception> {
        match value {
            Value::Number(n) => Ok(from_float(*n)),
            Value::Boolean(b) => Ok(ExprValue::Boolean(*b)),
            Value::String(s) => from_str(s),
            Value::List(list) if list.len() == 1 => ExprValue::from_value(&list[0]),
            _ => tickle_throw!(
                ErrorKind::Type,
                "can't use {} \"{}\" as an operand",
                value.type_name(),
                value.as_str()
            ),
        }
    }

    fn type_name(&self) -> &'static str {
        match self {
            ExprValue::Integer(_) => "integer",
            ExprValue::Real(_) => "real",
            ExprValue::Boolean(_) => "boolean",
        }
    }

    /// The value as a real, for promoted arithmetic.
    fn as_real(&self) -> TickleFloat {
        match *self {
            ExprValue::Integer(i) => i as TickleFloat,
            ExprValue::Real(r) => r,
            ExprValue::Boolean(b) => TickleFloat::from(u8::from(b)),
        }
    }

    /// Booleans become 0 or 1; other values are unchanged.
    fn numeric(self) -> ExprValue {
        match self {
            ExprValue::Boolean(b) => ExprValue::Integer(TickleInt::from(b)),
            other => other,
        }
    }
}

impl fmt::Display for ExprValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExprValue::Integer(i) => write!(f, "{}", i),
            ExprValue::Real(r) => f.write_str(&format_real(*r)),
            ExprValue::Boolean(b) => f.write_str(if *b { "1" } else { "0" }),
        }
    }
}

/// Reals are rendered so that they read back as reals: `3.0`, not `3`.
impl From<ExprValue> for Value {
    fn from(value: ExprValue) -> Self {
        match value {
            ExprValue::Integer(i) => Value::from(i),
            ExprValue::Real(r) => Value::from(format_real(r)),
            ExprValue::Boolean(b) => Value::from(b),
        }
    }
}

fn from_float(n: TickleFloat) -> ExprValue {
    if n.fract() == 0.0 && n.abs() < 9.0e18 {
        ExprValue::Integer(n as TickleInt)
    } else {
        ExprValue::Real(n)
    }
}

fn from_str(s: &str) -> Result<ExprValue, Exception> {
    if let Some(i) = parse_int(s) {
        return Ok(ExprValue::Integer(i));
    }
    if let Some(b) = parse_boolean(s) {
        return Ok(ExprValue::Boolean(b));
    }
    let trimmed = s.trim();
    match trimmed.parse::<TickleFloat>() {
        Ok(r) if !trimmed.is_empty() => Ok(ExprValue::Real(r)),
        _ => tickle_throw!(ErrorKind::Type, "expected number but got \"{}\"", s),
    }
}

//------------------------------------------------------------------------------------------
// Syntax tree

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum UnaryOp {
    Negate,
    Plus,
    Not,
    BitNot,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    BitAnd,
    BitOr,
    BitXor,
    Shl,
    Shr,
}

impl BinaryOp {
    fn symbol(&self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "%",
            BinaryOp::Pow => "**",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::BitAnd => "&",
            BinaryOp::BitOr => "|",
            BinaryOp::BitXor => "^",
            BinaryOp::Shl => "<<",
            BinaryOp::Shr => ">>",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Node {
    Literal(ExprValue),
    Variable(String),
    Script(String),
    Quote(String),
    Block(String),
    Unary(UnaryOp, Box<Node>),
    Binary(BinaryOp, Box<Node>, Box<Node>),
    And(Box<Node>, Box<Node>),
    Or(Box<Node>, Box<Node>),
    Ternary(Box<Node>, Box<Node>, Box<Node>),
    Call(String, Vec<Node>),
}

/// What an infix token does once its left operand has been parsed.
#[derive(Clone, Copy)]
enum Infix {
    Binary(BinaryOp),
    And,
    Or,
    Ternary,
}

const UNARY_POWER: u8 = 13;

/// How deeply subexpressions may nest before parsing gives up.
const MAX_NESTING: usize = 1000;

/// The infix table: the operation, binding power, and right-associativity of each infix
/// token.
fn infix(kind: WordKind) -> Option<(Infix, u8, bool)> {
    use WordKind::*;
    let entry = match kind {
        Question => (Infix::Ternary, 1, true),
        Or => (Infix::Or, 2, false),
        And => (Infix::And, 3, false),
        BitOr => (Infix::Binary(BinaryOp::BitOr), 4, false),
        Caret => (Infix::Binary(BinaryOp::BitXor), 5, false),
        BitAnd => (Infix::Binary(BinaryOp::BitAnd), 6, false),
        Equal => (Infix::Binary(BinaryOp::Eq), 7, false),
        NotEqual => (Infix::Binary(BinaryOp::Ne), 7, false),
        Less => (Infix::Binary(BinaryOp::Lt), 8, false),
        LessEqual => (Infix::Binary(BinaryOp::Le), 8, false),
        Greater => (Infix::Binary(BinaryOp::Gt), 8, false),
        GreaterEqual => (Infix::Binary(BinaryOp::Ge), 8, false),
        ShiftLeft => (Infix::Binary(BinaryOp::Shl), 9, false),
        ShiftRight => (Infix::Binary(BinaryOp::Shr), 9, false),
        Plus => (Infix::Binary(BinaryOp::Add), 10, false),
        Minus => (Infix::Binary(BinaryOp::Sub), 10, false),
        Star => (Infix::Binary(BinaryOp::Mul), 11, false),
        Slash => (Infix::Binary(BinaryOp::Div), 11, false),
        Percent => (Infix::Binary(BinaryOp::Mod), 11, false),
        Power => (Infix::Binary(BinaryOp::Pow), 12, true),
        _ => return None,
    };
    Some(entry)
}

struct Parser<'a> {
    scanner: Scanner<'a>,
    peeked: Option<Word>,
    depth: usize,
}

impl<'a> Parser<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            scanner: Scanner::new(text),
            peeked: None,
            depth: 0,
        }
    }

    fn peek(&mut self) -> &Word {
        let scanner = &mut self.scanner;
        self.peeked.get_or_insert_with(|| scanner.tokenize())
    }

    fn next(&mut self) -> Word {
        match self.peeked.take() {
            Some(word) => word,
            None => self.scanner.tokenize(),
        }
    }

    fn parse(mut self) -> Result<Node, Exception> {
        if self.peek().kind == WordKind::Eof {
            return tickle_throw!(ErrorKind::Syntax, "empty expression");
        }
        let node = self.expression(0)?;
        let word = self.next();
        if word.kind != WordKind::Eof {
            return Err(unexpected(&word));
        }
        Ok(node)
    }

    fn expression(&mut self, min_power: u8) -> Result<Node, Exception> {
        if self.depth == MAX_NESTING {
            return tickle_throw!(ErrorKind::Syntax, "expression nested too deeply");
        }

        self.depth += 1;
        let node = ensure_sufficient_stack(|| self.operators(min_power));
        self.depth -= 1;
        node
    }

    /// Parses an operand followed by any infix operators binding tighter than `min_power`.
    fn operators(&mut self, min_power: u8) -> Result<Node, Exception> {
        let mut lhs = self.prefix()?;

        while let Some((op, power, right)) = infix(self.peek().kind) {
            if power <= min_power {
                break;
            }
            self.next();
            let next_min = if right { power - 1 } else { power };

            lhs = match op {
                Infix::Binary(op) => {
                    Node::Binary(op, Box::new(lhs), Box::new(self.expression(next_min)?))
                }
                Infix::And => Node::And(Box::new(lhs), Box::new(self.expression(next_min)?)),
                Infix::Or => Node::Or(Box::new(lhs), Box::new(self.expression(next_min)?)),
                Infix::Ternary => {
                    let then = self.expression(0)?;
                    self.expect(WordKind::Colon, "\":\"")?;
                    let otherwise = self.expression(next_min)?;
                    Node::Ternary(Box::new(lhs), Box::new(then), Box::new(otherwise))
                }
            };
        }

        Ok(lhs)
    }

    /// The prefix table: literals, operands, grouping, unary operators, and function calls.
    fn prefix(&mut self) -> Result<Node, Exception> {
        let word = self.next();
        let node = match word.kind {
            WordKind::Integer => match parse_int(&word.text) {
                Some(i) => Node::Literal(ExprValue::Integer(i)),
                None => {
                    return tickle_throw!(
                        ErrorKind::Syntax,
                        "integer value too large to represent: \"{}\"",
                        word.text
                    )
                }
            },
            WordKind::Float => match word.text.parse::<TickleFloat>() {
                Ok(r) => Node::Literal(ExprValue::Real(r)),
                Err(_) => return Err(unexpected(&word)),
            },
            WordKind::Variable => Node::Variable(word.text),
            WordKind::Script => Node::Script(word.text),
            WordKind::Quote => Node::Quote(word.text),
            WordKind::Block => Node::Block(word.text),
            WordKind::LeftParen => {
                let inner = self.expression(0)?;
                self.expect(WordKind::RightParen, "\")\"")?;
                inner
            }
            WordKind::Minus => self.unary(UnaryOp::Negate)?,
            WordKind::Plus => self.unary(UnaryOp::Plus)?,
            WordKind::Bang => self.unary(UnaryOp::Not)?,
            WordKind::Tilde => self.unary(UnaryOp::BitNot)?,
            WordKind::Literal => {
                if self.peek().kind == WordKind::LeftParen {
                    self.next();
                    self.call(word.text)?
                } else {
                    match parse_boolean(&word.text) {
                        Some(b) => Node::Literal(ExprValue::Boolean(b)),
                        None => {
                            return tickle_throw!(
                                ErrorKind::Syntax,
                                "invalid bareword \"{}\"",
                                word.text
                            )
                        }
                    }
                }
            }
            WordKind::Eof => {
                return tickle_throw!(ErrorKind::Syntax, "premature end of expression")
            }
            _ => return Err(unexpected(&word)),
        };

        Ok(node)
    }

    fn unary(&mut self, op: UnaryOp) -> Result<Node, Exception> {
        Ok(Node::Unary(op, Box::new(self.expression(UNARY_POWER)?)))
    }

    /// Parses a function's argument list; the opening parenthesis has been consumed.
    fn call(&mut self, name: String) -> Result<Node, Exception> {
        let mut args = Vec::new();
        if self.peek().kind == WordKind::RightParen {
            self.next();
            return Ok(Node::Call(name, args));
        }

        loop {
            args.push(self.expression(0)?);
            let word = self.next();
            match word.kind {
                WordKind::Comma => continue,
                WordKind::RightParen => break,
                _ => return Err(unexpected(&word)),
            }
        }

        Ok(Node::Call(name, args))
    }

    fn expect(&mut self, kind: WordKind, what: &str) -> Result<(), Exception> {
        let word = self.next();
        if word.kind == kind {
            Ok(())
        } else if word.kind == WordKind::Eof {
            tickle_throw!(ErrorKind::Syntax, "missing {} in expression", what)
        } else {
            Err(unexpected(&word))
        }
    }
}

fn unexpected(word: &Word) -> Exception {
    let msg = match word.kind {
        WordKind::Illegal => word.text.clone(),
        WordKind::Eof => String::from("premature end of expression"),
        _ => format!("unexpected \"{}\" in expression", word.text),
    };
    Exception::error(ErrorKind::Syntax, msg)
}

//------------------------------------------------------------------------------------------
// Evaluation

/// Parses and evaluates an expression, using `sub` for variables and nested scripts.
///
/// ```
/// use tickle::expr::{expr, ExprValue};
/// use tickle::builder::Substitutor;
/// use tickle::*;
///
/// struct NoVars;
/// impl Substitutor for NoVars {
///     fn resolve(&mut self, name: &str) -> TickleResult {
///         tickle_err!("no such variable: {}", name)
///     }
///     fn execute(&mut self, _: &str) -> TickleResult {
///         tickle_ok!()
///     }
/// }
///
/// assert_eq!(expr("1 + 2 * 3", &mut NoVars), Ok(ExprValue::Integer(7)));
/// assert_eq!(expr("7 / 2.0", &mut NoVars), Ok(ExprValue::Real(3.5)));
/// ```
pub fn expr<S: Substitutor>(text: &str, sub: &mut S) -> Result<ExprValue, Exception> {
    let node = Parser::new(text).parse()?;
    eval(&node, sub)
}

fn eval<S: Substitutor>(node: &Node, sub: &mut S) -> Result<ExprValue, Exception> {
    ensure_sufficient_stack(|| eval_node(node, sub))
}

fn eval_node<S: Substitutor>(node: &Node, sub: &mut S) -> Result<ExprValue, Exception> {
    match node {
        Node::Literal(value) => Ok(*value),
        Node::Variable(name) => ExprValue::from_value(&substitute_variable(name, sub)?),
        Node::Script(script) => ExprValue::from_value(&sub.execute(script)?),
        Node::Quote(text) => ExprValue::from_value(&substitute(text, sub)?),
        Node::Block(text) => from_str(text),
        Node::Unary(op, operand) => unary(*op, eval(operand, sub)?),
        Node::Binary(op, lhs, rhs) => {
            let lhs = eval(lhs, sub)?;
            let rhs = eval(rhs, sub)?;
            binary(*op, lhs, rhs)
        }
        Node::And(lhs, rhs) => {
            Ok(ExprValue::Boolean(eval(lhs, sub)?.is_true() && eval(rhs, sub)?.is_true()))
        }
        Node::Or(lhs, rhs) => {
            Ok(ExprValue::Boolean(eval(lhs, sub)?.is_true() || eval(rhs, sub)?.is_true()))
        }
        Node::Ternary(cond, then, otherwise) => {
            if eval(cond, sub)?.is_true() {
                eval(then, sub)
            } else {
                eval(otherwise, sub)
            }
        }
        Node::Call(name, args) => {
            let mut values = Vec::with_capacity(args.len());
            for arg in args {
                values.push(eval(arg, sub)?);
            }
            call(name, &values)
        }
    }
}

fn unary(op: UnaryOp, value: ExprValue) -> Result<ExprValue, Exception> {
    match op {
        UnaryOp::Not => Ok(ExprValue::Boolean(!value.is_true())),
        UnaryOp::Plus => Ok(value.numeric()),
        UnaryOp::Negate => match value.numeric() {
            ExprValue::Real(r) => Ok(ExprValue::Real(-r)),
            ExprValue::Integer(i) => Ok(ExprValue::Integer(i.wrapping_neg())),
            ExprValue::Boolean(_) => unsupported("-", value),
        },
        UnaryOp::BitNot => match value {
            ExprValue::Integer(i) => Ok(ExprValue::Integer(!i)),
            _ => unsupported("~", value),
        },
    }
}

fn binary(op: BinaryOp, lhs: ExprValue, rhs: ExprValue) -> Result<ExprValue, Exception> {
    use ExprValue::*;

    match op {
        BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul => {
            match (lhs.numeric(), rhs.numeric()) {
                (Integer(a), Integer(b)) => Ok(Integer(match op {
                    BinaryOp::Add => a.wrapping_add(b),
                    BinaryOp::Sub => a.wrapping_sub(b),
                    _ => a.wrapping_mul(b),
                })),
                (a, b) => {
                    let (a, b) = (a.as_real(), b.as_real());
                    Ok(Real(match op {
                        BinaryOp::Add => a + b,
                        BinaryOp::Sub => a - b,
                        _ => a * b,
                    }))
                }
            }
        }
        BinaryOp::Div => match (lhs.numeric(), rhs.numeric()) {
            (Integer(_), Integer(0)) => divide_by_zero(),
            (Integer(a), Integer(b)) => Ok(Integer(floor_div(a, b))),
            (a, b) => {
                let b = b.as_real();
                if b == 0.0 {
                    divide_by_zero()
                } else {
                    Ok(Real(a.as_real() / b))
                }
            }
        },
        BinaryOp::Mod => match (lhs.numeric(), rhs.numeric()) {
            (Integer(_), Integer(0)) => divide_by_zero(),
            (Integer(a), Integer(b)) => Ok(Integer(floor_mod(a, b))),
            (Real(_), _) => unsupported("%", lhs),
            _ => unsupported("%", rhs),
        },
        BinaryOp::Pow => match (lhs.numeric(), rhs.numeric()) {
            (Integer(a), Integer(b)) => {
                Ok(Integer((a as TickleFloat).powf(b as TickleFloat) as TickleInt))
            }
            (a, b) => Ok(Real(a.as_real().powf(b.as_real()))),
        },
        BinaryOp::Eq | BinaryOp::Ne => {
            let equal = match (lhs.numeric(), rhs.numeric()) {
                (Integer(a), Integer(b)) => a == b,
                (a, b) => a.as_real() == b.as_real(),
            };
            Ok(Boolean(equal == (op == BinaryOp::Eq)))
        }
        BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
            let ordering = match (lhs, rhs) {
                (Integer(a), Integer(b)) => a.partial_cmp(&b),
                (Real(a), Real(b)) => a.partial_cmp(&b),
                (Boolean(a), Boolean(b)) => a.partial_cmp(&b),
                _ => {
                    return tickle_throw!(
                        ErrorKind::Type,
                        "can't compare {} with {} using \"{}\"",
                        lhs.type_name(),
                        rhs.type_name(),
                        op.symbol()
                    )
                }
            };
            let result = ordering.is_some_and(|ordering| match op {
                BinaryOp::Lt => ordering.is_lt(),
                BinaryOp::Le => ordering.is_le(),
                BinaryOp::Gt => ordering.is_gt(),
                _ => ordering.is_ge(),
            });
            Ok(Boolean(result))
        }
        BinaryOp::BitAnd | BinaryOp::BitOr | BinaryOp::BitXor | BinaryOp::Shl | BinaryOp::Shr => {
            let (a, b) = match (lhs, rhs) {
                (Integer(a), Integer(b)) => (a, b),
                (Integer(_), _) => return unsupported(op.symbol(), rhs),
                _ => return unsupported(op.symbol(), lhs),
            };
            match op {
                BinaryOp::BitAnd => Ok(Integer(a & b)),
                BinaryOp::BitOr => Ok(Integer(a | b)),
                BinaryOp::BitXor => Ok(Integer(a ^ b)),
                _ if b < 0 => tickle_throw!(ErrorKind::Type, "negative shift argument"),
                BinaryOp::Shl => Ok(Integer(u32::try_from(b)
                    .ok()
                    .and_then(|b| a.checked_shl(b))
                    .unwrap_or(0))),
                _ => Ok(Integer(u32::try_from(b)
                    .ok()
                    .and_then(|b| a.checked_shr(b))
                    .unwrap_or(if a < 0 { -1 } else { 0 }))),
            }
        }
    }
}

/// Integer division rounding towards negative infinity.
fn floor_div(a: TickleInt, b: TickleInt) -> TickleInt {
    let q = a.wrapping_div(b);
    if a.wrapping_rem(b) != 0 && ((a < 0) != (b < 0)) {
        q - 1
    } else {
        q
    }
}

/// The remainder matching `floor_div`: it takes the sign of the divisor.
fn floor_mod(a: TickleInt, b: TickleInt) -> TickleInt {
    let r = a.wrapping_rem(b);
    if r != 0 && ((r < 0) != (b < 0)) {
        r + b
    } else {
        r
    }
}

fn call(name: &str, args: &[ExprValue]) -> Result<ExprValue, Exception> {
    use ExprValue::*;

    let arity = match name {
        "abs" | "int" | "double" | "round" | "floor" | "ceil" | "sqrt" | "bool" => 1,
        "pow" => 2,
        "min" | "max" => {
            if args.is_empty() {
                return tickle_throw!(
                    ErrorKind::ArgumentCount,
                    "too few arguments to math function \"{}\"",
                    name
                );
            }
            args.len()
        }
        _ => return tickle_throw!(ErrorKind::Syntax, "unknown math function \"{}\"", name),
    };

    if args.len() != arity {
        return tickle_throw!(
            ErrorKind::ArgumentCount,
            "too {} arguments to math function \"{}\"",
            if args.len() < arity { "few" } else { "many" },
            name
        );
    }

    let result = match (name, args[0].numeric()) {
        ("abs", Integer(i)) => Integer(i.wrapping_abs()),
        ("abs", x) => Real(x.as_real().abs()),
        ("int", Integer(i)) => Integer(i),
        ("int", x) => Integer(x.as_real().trunc() as TickleInt),
        ("round", Integer(i)) => Integer(i),
        ("round", x) => Integer(x.as_real().round() as TickleInt),
        ("double", x) => Real(x.as_real()),
        ("floor", x) => Real(x.as_real().floor()),
        ("ceil", x) => Real(x.as_real().ceil()),
        ("sqrt", x) => Real(x.as_real().sqrt()),
        ("bool", _) => Boolean(args[0].is_true()),
        ("pow", x) => Real(x.as_real().powf(args[1].as_real())),
        _ => {
            let pick_max = name == "max";
            let all_ints = args.iter().all(|a| matches!(a.numeric(), Integer(_)));
            let mut best = args[0].numeric();
            for arg in &args[1..] {
                let arg = arg.numeric();
                let better = if pick_max {
                    arg.as_real() > best.as_real()
                } else {
                    arg.as_real() < best.as_real()
                };
                if better {
                    best = arg;
                }
            }
            if all_ints {
                best
            } else {
                Real(best.as_real())
            }
        }
    };

    match result {
        Real(r) if r.is_nan() => tickle_throw!(
            ErrorKind::UnsupportedOperation,
            "domain error: argument not in valid range"
        ),
        _ => Ok(result),
    }
}

fn divide_by_zero() -> Result<ExprValue, Exception> {
    tickle_throw!(ErrorKind::DivisionByZero, "divide by zero")
}

fn unsupported(op: &str, value: ExprValue) -> Result<ExprValue, Exception> {
    tickle_throw!(
        ErrorKind::UnsupportedOperation,
        "can't use {} \"{}\" as operand of \"{}\"",
        value.type_name(),
        value,
        op
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tickle_ok;
    use pretty_assertions::assert_eq;

    struct Vars;

    impl Substitutor for Vars {
        fn resolve(&mut self, name: &str) -> TickleResult {
            match name {
                "x" => tickle_ok!(2.0),
                "r" => tickle_ok!("1.5"),
                "s" => tickle_ok!("hello"),
                "flag" => tickle_ok!(true),
                _ => tickle_throw!(
                    ErrorKind::UndefinedVariable,
                    "can't read \"{}\": no such variable",
                    name
                ),
            }
        }

        fn execute(&mut self, script: &str) -> TickleResult {
            match script {
                "boom" => tickle_throw!(ErrorKind::Generic, "boom"),
                _ => tickle_ok!("10"),
            }
        }
    }

    fn run(text: &str) -> Result<ExprValue, Exception> {
        expr(text, &mut Vars)
    }

    fn kind(text: &str) -> Option<ErrorKind> {
        run(text).unwrap_err().error_kind()
    }

    use ExprValue::*;

    #[test]
    fn test_precedence() {
        assert_eq!(run("1 + 2 * 3"), Ok(Integer(7)));
        assert_eq!(run("(1 + 2) * 3"), Ok(Integer(9)));
        assert_eq!(run("10 - 4 - 3"), Ok(Integer(3)));
        assert_eq!(run("2 ** 3 ** 2"), Ok(Integer(512)));
        assert_eq!(run("-2 ** 2"), Ok(Integer(4)));
        assert_eq!(run("1 | 2 ^ 3 & 1"), Ok(Integer(3)));
        assert_eq!(run("1 << 2 + 1"), Ok(Integer(8)));
        assert_eq!(run("1 < 2 == 1"), Ok(Boolean(true)));
    }

    #[test]
    fn test_promotion() {
        assert_eq!(run("1 + 2.5"), Ok(Real(3.5)));
        assert_eq!(run("7 / 2"), Ok(Integer(3)));
        assert_eq!(run("7 / 2.0"), Ok(Real(3.5)));
        assert_eq!(run("2 ** 0.5 > 1.0"), Ok(Boolean(true)));
        assert_eq!(run("2 ** -1"), Ok(Integer(0)));
        assert_eq!(run("true + 1"), Ok(Integer(2)));
    }

    #[test]
    fn test_floor_division() {
        assert_eq!(run("-7 / 2"), Ok(Integer(-4)));
        assert_eq!(run("-7 % 2"), Ok(Integer(1)));
        assert_eq!(run("7 % -2"), Ok(Integer(-1)));

        for a in [-9, -7, -1, 0, 1, 5, 13] {
            for b in [-4, -3, -1, 1, 2, 5] {
                let text = format!("({a} / {b}) * {b} + ({a} % {b})");
                assert_eq!(run(&text), Ok(Integer(a)), "{}", text);
            }
        }
    }

    #[test]
    fn test_division_by_zero() {
        assert_eq!(kind("1 / 0"), Some(ErrorKind::DivisionByZero));
        assert_eq!(kind("1 % 0"), Some(ErrorKind::DivisionByZero));
        assert_eq!(kind("1.0 / 0"), Some(ErrorKind::DivisionByZero));
    }

    #[test]
    fn test_bitwise_requires_integers() {
        assert_eq!(run("6 & 3"), Ok(Integer(2)));
        assert_eq!(run("~0"), Ok(Integer(-1)));
        assert_eq!(run("-8 >> 1"), Ok(Integer(-4)));
        assert_eq!(kind("1.5 << 1"), Some(ErrorKind::UnsupportedOperation));
        assert_eq!(kind("1 | true"), Some(ErrorKind::UnsupportedOperation));
        assert_eq!(kind("~1.0"), Some(ErrorKind::UnsupportedOperation));
        assert_eq!(kind("5.5 % 2"), Some(ErrorKind::UnsupportedOperation));
    }

    #[test]
    fn test_relational_requires_same_type() {
        assert_eq!(run("1 < 2"), Ok(Boolean(true)));
        assert_eq!(run("2.5 >= 2.5"), Ok(Boolean(true)));
        assert_eq!(kind("1 < 2.0"), Some(ErrorKind::Type));
        assert_eq!(run("1 == 1.0"), Ok(Boolean(true)));
        assert_eq!(run("true != 0"), Ok(Boolean(true)));
    }

    #[test]
    fn test_logical_short_circuit() {
        assert_eq!(run("0 && [boom]"), Ok(Boolean(false)));
        assert_eq!(run("1 || [boom]"), Ok(Boolean(true)));
        assert_eq!(run("2 && 3"), Ok(Boolean(true)));
        assert!(run("1 && [boom]").is_err());
        assert_eq!(run("!0"), Ok(Boolean(true)));
    }

    #[test]
    fn test_ternary() {
        assert_eq!(run("1 ? 2 : 3"), Ok(Integer(2)));
        assert_eq!(run("0 ? [boom] : 3"), Ok(Integer(3)));
        assert_eq!(run("0 ? 1 : 0 ? 2 : 3"), Ok(Integer(3)));
        assert_eq!(kind("1 ? 2"), Some(ErrorKind::Syntax));
    }

    #[test]
    fn test_operands() {
        assert_eq!(run("$x * 2"), Ok(Integer(4)));
        assert_eq!(run("$r + 1"), Ok(Real(2.5)));
        assert_eq!(run("[f] + 1"), Ok(Integer(11)));
        assert_eq!(run("\"$x\" + {3}"), Ok(Integer(5)));
        assert_eq!(run("!$flag"), Ok(Boolean(false)));
        assert_eq!(kind("$s + 1"), Some(ErrorKind::Type));
        assert_eq!(kind("$nope"), Some(ErrorKind::UndefinedVariable));
    }

    #[test]
    fn test_functions() {
        assert_eq!(run("abs(-3)"), Ok(Integer(3)));
        assert_eq!(run("int(3.7)"), Ok(Integer(3)));
        assert_eq!(run("round(2.5)"), Ok(Integer(3)));
        assert_eq!(run("double(2)"), Ok(Real(2.0)));
        assert_eq!(run("floor(-1.5)"), Ok(Real(-2.0)));
        assert_eq!(run("sqrt(16)"), Ok(Real(4.0)));
        assert_eq!(run("pow(2, 10)"), Ok(Real(1024.0)));
        assert_eq!(run("max(1, 7, 3)"), Ok(Integer(7)));
        assert_eq!(run("min(2, 1.5)"), Ok(Real(1.5)));
        assert_eq!(run("bool(5)"), Ok(Boolean(true)));
        assert_eq!(kind("nope(1)"), Some(ErrorKind::Syntax));
        assert_eq!(kind("abs(1, 2)"), Some(ErrorKind::ArgumentCount));
        assert_eq!(kind("sqrt(-1)"), Some(ErrorKind::UnsupportedOperation));
    }

    #[test]
    fn test_nesting_limit() {
        let nested = |depth: usize| format!("{}1{}", "(".repeat(depth), ")".repeat(depth));
        assert_eq!(run(&nested(500)), Ok(Integer(1)));

        let exception = run(&nested(100_000)).unwrap_err();
        assert_eq!(exception.error_kind(), Some(ErrorKind::Syntax));
        assert_eq!(exception.value().as_str(), "expression nested too deeply");

        let negations = format!("{}1", "- ".repeat(100_000));
        assert_eq!(kind(&negations), Some(ErrorKind::Syntax));
    }

    #[test]
    fn test_syntax_errors() {
        assert_eq!(kind(""), Some(ErrorKind::Syntax));
        assert_eq!(kind("1 +"), Some(ErrorKind::Syntax));
        assert_eq!(kind("(1"), Some(ErrorKind::Syntax));
        assert_eq!(kind("1 2"), Some(ErrorKind::Syntax));
        assert_eq!(kind("a + b"), Some(ErrorKind::Syntax));
        assert_eq!(kind("12abc"), Some(ErrorKind::Syntax));
    }

    #[test]
    fn test_result_values() {
        assert_eq!(Value::from(Integer(5)).as_str(), "5");
        assert_eq!(Value::from(Real(3.0)).as_str(), "3.0");
        assert_eq!(Value::from(Real(0.25)).as_str(), "0.25");
        assert_eq!(Value::from(Boolean(true)).as_str(), "1");
    }
}
