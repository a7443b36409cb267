//! Commands and the Command Registry
//!
//! Every command the interpreter can dispatch to is an [`Executable`]: a Rust function, a
//! Rust closure, or a procedure defined by a script.  All three are called the same way,
//! with the interpreter, the command's words, and the application context.
//!
//! Each executable also says whether it is *safe*.  A safe interpreter (one created with
//! `interp create -safe`) refuses to run unsafe commands; the check happens at dispatch
//! time, so renaming a command doesn't change its safety.
//!
//! A [`CommandRegistry`] is the set of Rust commands an interpreter starts with.  It is an
//! ordinary value: build one, hand it to [`Interp::with_registry`], and the interpreter and
//! all of its child interpreters install their commands from it.
//!
//! ```
//! use tickle::*;
//!
//! fn cmd_square(_: &mut Interp<()>, argv: &[Value], _: &mut ()) -> TickleOptResult {
//!     check_args(1, argv, 2, 2, "x")?;
//!     let x = argv[1].to_int()?;
//!     tickle_opt_ok!(x * x)
//! }
//!
//! let mut registry = CommandRegistry::new();
//! registry.register("square", cmd_square);
//!
//! let mut ctx = ();
//! let mut interp = Interp::with_registry(registry);
//! assert_eq!(interp.eval("square 7", &mut ctx).unwrap().as_str(), "49");
//! ```
//!
//! [`Interp::with_registry`]: crate::Interp::with_registry

use crate::frame::Vars;
use crate::interp::Interp;
use crate::namespace::NsId;
use crate::scope::Scope;
use crate::tickle_err;
use crate::types::*;
use crate::value::Value;
use alloc::string::String;
use alloc::vec::Vec;

/// A dispatchable command.
pub enum Executable<Ctx> {
    /// A command implemented as a Rust function.
    Native { func: CommandFunc<Ctx>, safe: bool },

    /// A command implemented as a Rust closure.
    #[cfg(feature = "closure-commands")]
    Closure { func: CommandClosure<Ctx>, safe: bool },

    /// A procedure defined with `proc`.
    Proc(Procedure),
}

impl<Ctx> Executable<Ctx> {
    /// Executes the command according to its kind.
    pub fn execute(&self, interp: &mut Interp<Ctx>, argv: &[Value], ctx: &mut Ctx) -> TickleResult {
        match self {
            Executable::Native { func, .. } => Ok(func(interp, argv, ctx)?.unwrap_or_default()),
            #[cfg(feature = "closure-commands")]
            Executable::Closure { func, .. } => Ok(func(interp, argv, ctx)?.unwrap_or_default()),
            Executable::Proc(proc) => proc.execute(interp, argv, ctx),
        }
    }

    /// True if a safe interpreter may run the command.  Procedures are always safe: the
    /// commands in their bodies are checked individually.
    pub fn is_safe(&self) -> bool {
        match self {
            Executable::Native { safe, .. } => *safe,
            #[cfg(feature = "closure-commands")]
            Executable::Closure { safe, .. } => *safe,
            Executable::Proc(_) => true,
        }
    }

    /// A value naming the kind of command.
    pub fn cmdtype(&self) -> Value {
        match self {
            Executable::Native { .. } => Value::from("native"),
            #[cfg(feature = "closure-commands")]
            Executable::Closure { .. } => Value::from("closure"),
            Executable::Proc(_) => Value::from("proc"),
        }
    }

    pub fn as_proc(&self) -> Option<&Procedure> {
        match self {
            Executable::Proc(proc) => Some(proc),
            _ => None,
        }
    }

    pub fn is_proc(&self) -> bool {
        matches!(self, Executable::Proc(_))
    }
}

/// One formal parameter of a procedure.
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub name: String,
    pub default: Option<Value>,
}

/// A procedure: a parameter list and a body script, bound to the namespace it was
/// defined in.
///
/// The procedure doesn't know its own name; the name lives only in the command table and
/// can be changed freely with `rename`.
#[derive(Debug, Clone)]
pub struct Procedure {
    params: Vec<Param>,
    body: Value,
    namespace: NsId,
}

impl Procedure {
    /// Validates a parameter list and builds the procedure.  Each parameter is a name or a
    /// two-element list of name and default value; the default may contain spaces.  A
    /// final parameter named `args` collects any remaining arguments.
    pub(crate) fn new(name: &str, params: &Value, body: Value, namespace: NsId) -> Result<Self, Exception> {
        let mut parsed = Vec::new();

        for spec in params.to_list()?.iter() {
            let spec = spec.to_list()?;
            match spec.as_slice() {
                [param] => parsed.push(Param {
                    name: param.as_str().into_owned(),
                    default: None,
                }),
                [param, default] => parsed.push(Param {
                    name: param.as_str().into_owned(),
                    default: Some(default.clone()),
                }),
                [] => {
                    return tickle_err!(
                        "argument with no name in procedure \"{}\"",
                        name
                    )
                }
                _ => {
                    return tickle_err!(
                        "too many fields in argument specifier \"{}\"",
                        Value::from(spec.as_slice())
                    )
                }
            }
        }

        Ok(Self {
            params: parsed,
            body,
            namespace,
        })
    }

    pub fn params(&self) -> &[Param] {
        &self.params
    }

    pub fn body(&self) -> &Value {
        &self.body
    }

    fn is_variadic(&self, index: usize) -> bool {
        index + 1 == self.params.len() && self.params[index].name == "args"
    }

    /// Pushes a frame for the call, binds the arguments, evaluates the body, and pops the
    /// frame again, running its deferred scripts whatever the outcome.
    fn execute<Ctx>(&self, interp: &mut Interp<Ctx>, argv: &[Value], ctx: &mut Ctx) -> TickleResult {
        let locals = self.bind(argv)?;
        interp.push_frame(Vars::Local(locals), self.namespace, argv.to_vec());

        let result = interp.eval_value(&self.body, ctx);
        let result = interp.pop_frame(result, ctx);

        if let Err(mut exception) = result {
            // Handle the return -code, -level protocol.
            if exception.code() == ResultCode::Return {
                exception.decrement_level();
            }

            return match exception.code() {
                ResultCode::Okay => Ok(exception.value()),
                ResultCode::Error | ResultCode::Return | ResultCode::Exit(_) => Err(exception),
                ResultCode::Break => tickle_err!("invoked \"break\" outside of a loop"),
                ResultCode::Continue => tickle_err!("invoked \"continue\" outside of a loop"),
                ResultCode::Other(code) => tickle_err!("unexpected result code {}", code),
            };
        }

        result
    }

    /// Binds the call's arguments to the parameters in a fresh scope.
    fn bind(&self, argv: &[Value]) -> Result<Scope, Exception> {
        let mut locals = Scope::new();
        let mut argi = 1;

        for (i, param) in self.params.iter().enumerate() {
            if self.is_variadic(i) {
                let rest = argv.get(argi..).unwrap_or(&[]);
                locals.set("args", Value::from(rest));
                argi = argv.len();
                break;
            }

            if argi < argv.len() {
                locals.set(&param.name, argv[argi].clone());
                argi += 1;
            } else if let Some(default) = &param.default {
                locals.set(&param.name, default.clone());
            } else {
                return Err(self.wrong_num_args(&argv[0]));
            }
        }

        if argi != argv.len() {
            return Err(self.wrong_num_args(&argv[0]));
        }

        Ok(locals)
    }

    // The name is passed in because `rename` can change it.
    fn wrong_num_args(&self, name: &Value) -> Exception {
        let mut msg = String::from("wrong # args: should be \"");
        msg.push_str(&name.as_str());

        for (i, param) in self.params.iter().enumerate() {
            msg.push(' ');
            if self.is_variadic(i) {
                msg.push_str("?arg ...?");
            } else if param.default.is_some() {
                msg.push('?');
                msg.push_str(&param.name);
                msg.push('?');
            } else {
                msg.push_str(&param.name);
            }
        }
        msg.push('"');

        Exception::error(ErrorKind::ArgumentCount, msg)
    }
}

struct Registration<Ctx> {
    name: &'static str,
    func: CommandFunc<Ctx>,
    safe: bool,
}

impl<Ctx> Clone for Registration<Ctx> {
    fn clone(&self) -> Self {
        Self {
            name: self.name,
            func: self.func,
            safe: self.safe,
        }
    }
}

/// The set of Rust commands installed in a new interpreter.
pub struct CommandRegistry<Ctx> {
    entries: Vec<Registration<Ctx>>,
}

impl<Ctx> Clone for CommandRegistry<Ctx> {
    fn clone(&self) -> Self {
        Self {
            entries: self.entries.clone(),
        }
    }
}

impl<Ctx> Default for CommandRegistry<Ctx> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Ctx> CommandRegistry<Ctx> {
    /// An empty registry.
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// The standard command set.
    pub fn standard() -> Self {
        let mut registry = Self::new();
        crate::commands::register_standard(&mut registry);
        registry
    }

    /// Registers a safe command, replacing any earlier registration of the same name.
    pub fn register(&mut self, name: &'static str, func: CommandFunc<Ctx>) -> &mut Self {
        self.insert(name, func, true)
    }

    /// Registers a command that safe interpreters may not run.
    pub fn register_unsafe(&mut self, name: &'static str, func: CommandFunc<Ctx>) -> &mut Self {
        self.insert(name, func, false)
    }

    fn insert(&mut self, name: &'static str, func: CommandFunc<Ctx>, safe: bool) -> &mut Self {
        let entry = Registration { name, func, safe };
        match self.entries.iter_mut().find(|entry| entry.name == name) {
            Some(existing) => *existing = entry,
            None => self.entries.push(entry),
        }
        self
    }

    /// Removes a command from the registry.
    pub fn unregister(&mut self, name: &str) -> &mut Self {
        self.entries.retain(|entry| entry.name != name);
        self
    }

    /// Looks up a registered command.
    pub fn lookup(&self, name: &str) -> Option<Executable<Ctx>> {
        self.entries
            .iter()
            .find(|entry| entry.name == name)
            .map(|entry| Executable::Native {
                func: entry.func,
                safe: entry.safe,
            })
    }

    /// The registered names, in registration order.
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.iter().map(|entry| entry.name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::namespace::ROOT;
    use pretty_assertions::assert_eq;

    fn cmd_nop(_: &mut Interp<()>, _: &[Value], _: &mut ()) -> TickleOptResult {
        Ok(None)
    }

    #[test]
    fn test_registry() {
        let mut registry = CommandRegistry::<()>::new();
        registry.register("a", cmd_nop).register_unsafe("b", cmd_nop);
        assert_eq!(registry.names().collect::<Vec<_>>(), ["a", "b"]);
        assert!(registry.lookup("a").unwrap().is_safe());
        assert!(!registry.lookup("b").unwrap().is_safe());
        assert!(registry.lookup("c").is_none());

        registry.register("b", cmd_nop);
        assert_eq!(registry.len(), 2);
        assert!(registry.lookup("b").unwrap().is_safe());

        registry.unregister("a");
        assert_eq!(registry.names().collect::<Vec<_>>(), ["b"]);
    }

    #[test]
    fn test_standard_registry_gates_host_commands() {
        let registry = CommandRegistry::<()>::standard();
        assert!(registry.lookup("set").unwrap().is_safe());
        assert!(registry.lookup("puts").unwrap().is_safe());
        assert!(!registry.lookup("exec").unwrap().is_safe());
        assert!(!registry.lookup("open").unwrap().is_safe());
        assert!(!registry.lookup("source").unwrap().is_safe());
        assert!(!registry.lookup("exit").unwrap().is_safe());
    }

    #[test]
    fn test_param_parsing() {
        let params = Value::from("a {b 2} {c {two words}} args");
        let proc = Procedure::new("p", &params, Value::empty(), ROOT).unwrap();
        let defaults: Vec<Option<String>> = proc
            .params()
            .iter()
            .map(|p| p.default.as_ref().map(|d| d.as_str().into_owned()))
            .collect();
        assert_eq!(
            defaults,
            [None, Some("2".into()), Some("two words".into()), None]
        );
        assert!(proc.is_variadic(3));

        assert!(Procedure::new("p", &Value::from("{a b c}"), Value::empty(), ROOT).is_err());
        assert!(Procedure::new("p", &Value::from("{}"), Value::empty(), ROOT).is_err());
    }

    #[test]
    fn test_bind() {
        let params = Value::from("a {b 2} args");
        let proc = Procedure::new("p", &params, Value::empty(), ROOT).unwrap();

        let argv: Vec<Value> = ["p", "1"].iter().map(|s| Value::from(*s)).collect();
        let locals = proc.bind(&argv).unwrap();
        assert_eq!(locals.get("b").unwrap().as_str(), "2");
        assert_eq!(locals.get("args").unwrap().as_str(), "");

        let argv: Vec<Value> = ["p", "1", "3", "x", "y"].iter().map(|s| Value::from(*s)).collect();
        let locals = proc.bind(&argv).unwrap();
        assert_eq!(locals.get("args").unwrap().as_str(), "x y");

        let err = proc.bind(&[Value::from("p")]).unwrap_err();
        assert_eq!(err.error_kind(), Some(ErrorKind::ArgumentCount));
        assert_eq!(
            err.value().as_str(),
            "wrong # args: should be \"p a ?b? ?arg ...?\""
        );
    }
}
