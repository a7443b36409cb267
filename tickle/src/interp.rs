//! The Tickle Interpreter
//!
//! The [`Interp`] struct is the primary API for embedding Tickle into a Rust application.
//! Given an `Interp`, the application may:
//!
//! * Evaluate scripts and expressions
//! * Check scripts for completeness
//! * Extend the language by defining new commands in Rust
//! * Set and get variables
//! * Create and drive child interpreters, including safe ones
//!
//! # Interp is not Sync!
//!
//! An `Interp` is intended for use in a single thread.  It is fine to have interpreters in
//! different threads, but [`Value`] is not `Sync`; pass `String`s between them.
//!
//! # Creating an Interpreter
//!
//! [`Interp::new`] creates an interpreter populated with the standard commands.
//! [`Interp::empty`] creates one with no commands at all, and [`Interp::with_registry`]
//! installs exactly the commands of a caller-built [`CommandRegistry`].  Child interpreters
//! created with `interp create` are built from their parent's registry.
//!
//! ```
//! use tickle::Interp;
//! let mut interp = Interp::<()>::new();
//! assert!(interp.has_command("set"));
//! ```
//!
//! # Frames and Variables
//!
//! The interpreter keeps a stack of frames; frame 0 is the global frame, whose variables
//! are those of the root namespace.  Calling a procedure pushes a frame, as does
//! `namespace eval`.  Rust commands run in the caller's frame.
//!
//! Variable lookup is dynamic: reading `x` searches the current frame, then each frame
//! below it down to the global frame.  Setting a variable rewrites an existing binding in
//! whichever frame owns it, and otherwise creates the variable in the current frame.
//! Names qualified with `::` bypass the frames and go straight to namespace storage.
//!
//! `global` and `upvar` store a [`Link`](crate::value::Link) in the current frame.  A link
//! names its target variable and the absolute depth of the frame it is resolved from, so
//! reads, writes, and unsets of the linked name land in that frame.
//!
//! ```
//! use tickle::Interp;
//!
//! let mut ctx = ();
//! let mut interp = Interp::new();
//! interp.eval("proc bump {name} { upvar 1 $name v; incr v }", &mut ctx).unwrap();
//! interp.eval("set counter 41; bump counter", &mut ctx).unwrap();
//! assert_eq!(interp.eval("set counter", &mut ctx).unwrap().as_str(), "42");
//! ```

use crate::builder::{is_complete, Builder, Command, Substitutor};
use crate::channel::ChannelTable;
use crate::command::{CommandRegistry, Executable, Procedure};
use crate::frame::{Frame, Vars};
use crate::namespace::{Namespaces, NsId, ROOT};
use crate::scope::Scope;
use crate::stack::ensure_sufficient_stack;
use crate::types::*;
use crate::util::{check_args, split_qualified, split_var_name};
use crate::value::{Link, Value};
use crate::{tickle_err, tickle_ok, tickle_throw};
use alloc::borrow::Cow;
use alloc::format;
use alloc::rc::Rc;
use alloc::string::{String, ToString};
use alloc::vec::Vec;

/// How many `upvar`/`global` links a variable reference may pass through.
const MAX_LINK_HOPS: usize = 100;

/// The Tickle interpreter.
///
/// # Example
///
/// ```
/// use tickle::types::*;
/// use tickle::Interp;
/// use tickle::tickle_ok;
/// # fn dummy() -> TickleResult {
/// let mut ctx = ();
/// let mut interp = Interp::new();
/// let four = interp.eval("expr {2 + 2}", &mut ctx)?;
/// assert_eq!(four, Value::from(4));
/// # tickle_ok!()
/// # }
/// ```
pub struct Interp<Ctx = ()> {
    // The commands every interpreter in this tree starts with.
    registry: Rc<CommandRegistry<Ctx>>,

    // Command and variable tables, by namespace.
    namespaces: Namespaces<Ctx>,

    // The call stack; frames[0] is the global frame.
    frames: Vec<Frame>,

    // Child interpreters, sorted by name.
    children: Vec<Child<Ctx>>,

    channels: ChannelTable,

    // Whether unsafe commands are refused.
    safe: bool,

    last_result: Value,
    last_error: Option<Exception>,
    cmd_count: usize,

    // Defines the recursion limit for Interp::eval().
    recursion_limit: usize,

    // Current number of eval levels.
    num_levels: usize,
}

struct Child<Ctx> {
    name: String,
    interp: Interp<Ctx>,
}

/// Where a variable lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    Frame(usize),
    Namespace(NsId),
}

/// A variable reference with its links followed.
struct Target {
    slot: Slot,
    name: String,
    index: Option<String>,
    exists: bool,
}

/// Lets the command builder and the expression evaluator reach back into the interpreter.
struct Subst<'a, Ctx> {
    interp: &'a mut Interp<Ctx>,
    ctx: &'a mut Ctx,
}

impl<Ctx> Substitutor for Subst<'_, Ctx> {
    fn resolve(&mut self, name: &str) -> TickleResult {
        self.interp.var_str(name)
    }

    fn execute(&mut self, script: &str) -> TickleResult {
        self.interp.eval_script(script, self.ctx)
    }
}

impl<Ctx> Default for Interp<Ctx> {
    fn default() -> Self {
        Self::new()
    }
}

// NOTE: The order of methods in the generated RustDoc depends on the order in this block.
impl<Ctx> Interp<Ctx> {
    //--------------------------------------------------------------------------------------------
    // Constructors

    /// Creates an interpreter with no commands defined.  Use this when crafting command
    /// languages that shouldn't include the normal commands.
    ///
    /// ```
    /// # use tickle::interp::Interp;
    /// let interp = Interp::<()>::empty();
    /// assert!(interp.command_names().is_empty());
    /// ```
    pub fn empty() -> Self {
        Self::with_registry(CommandRegistry::new())
    }

    /// Creates an interpreter populated with the standard commands.
    pub fn new() -> Self {
        Self::with_registry(CommandRegistry::standard())
    }

    /// Creates an interpreter whose initial commands are exactly those in `registry`.
    pub fn with_registry(registry: CommandRegistry<Ctx>) -> Self {
        Self::from_registry(Rc::new(registry), false)
    }

    fn from_registry(registry: Rc<CommandRegistry<Ctx>>, safe: bool) -> Self {
        let mut namespaces = Namespaces::new();
        let root = namespaces.get_mut(ROOT);
        for name in registry.names() {
            if let Some(command) = registry.lookup(name) {
                root.commands.insert(name.into(), Rc::new(command));
            }
        }
        root.vars.set("errorInfo", Value::empty());

        Self {
            registry,
            namespaces,
            frames: alloc::vec![Frame::global(ROOT)],
            children: Vec::new(),
            channels: ChannelTable::new(),
            safe,
            last_result: Value::empty(),
            last_error: None,
            cmd_count: 0,
            recursion_limit: 1000,
            num_levels: 0,
        }
    }

    //--------------------------------------------------------------------------------------------
    // Script and Expression Evaluation

    /// Evaluates a script one command at a time.  Returns the value of the last command in
    /// the script, the value of any explicit `return`, or the error thrown by the script.
    /// `break` and `continue` outside of a loop become errors; `exit` unwinds every frame,
    /// running its deferred scripts, and is returned as an `Exit` exception.
    ///
    /// ```
    /// # use tickle::Interp;
    /// let mut ctx = ();
    /// let mut interp = Interp::new();
    ///
    /// match interp.eval("set a 1", &mut ctx) {
    ///     Ok(val) => println!("Value: {}", val),
    ///     Err(exception) if exception.is_error() => println!("Error: {}", exception.value()),
    ///     Err(exception) => println!("Other: {:?}", exception.code()),
    /// }
    /// ```
    pub fn eval(&mut self, script: &str, ctx: &mut Ctx) -> TickleResult {
        self.eval_value(&Value::from(script), ctx)
    }

    /// Evaluates the string form of a [`Value`] as a script; see [`eval`](#method.eval).
    pub fn eval_value(&mut self, value: &Value, ctx: &mut Ctx) -> TickleResult {
        self.num_levels += 1;

        if self.num_levels > self.recursion_limit {
            self.num_levels -= 1;
            return tickle_err!("too many nested calls to Interp::eval (infinite loop?)");
        }

        let mut result = self.eval_script(&value.as_str(), ctx);

        self.num_levels -= 1;

        if self.num_levels == 0 {
            if let Err(mut exception) = result {
                // Handle the return -code, -level protocol.
                if exception.code() == ResultCode::Return {
                    exception.decrement_level();
                }

                result = match exception.code() {
                    ResultCode::Okay => Ok(exception.value()),
                    ResultCode::Error | ResultCode::Return => Err(exception),
                    ResultCode::Exit(status) => {
                        tracing::debug!(status, "exit requested");
                        self.run_defers(Err(exception), ctx)
                    }
                    ResultCode::Break => tickle_err!("invoked \"break\" outside of a loop"),
                    ResultCode::Continue => tickle_err!("invoked \"continue\" outside of a loop"),
                    ResultCode::Other(code) => tickle_err!("unexpected result code {}", code),
                };
            }
        }

        if let Err(exception) = &result {
            if exception.is_error() {
                self.set_global_error_data(exception);
            }
        }

        result
    }

    /// Saves the error's errorInfo and errorCode in the global variables of the same names.
    fn set_global_error_data(&mut self, exception: &Exception) {
        if let Some(data) = exception.error_data() {
            let globals = &mut self.namespaces.get_mut(ROOT).vars;
            globals.set("errorInfo", data.error_info());
            globals.set("errorCode", data.error_code());
        }
        self.last_error = Some(exception.clone());
    }

    /// Evaluates script text in the current frame, without the top-level translation of
    /// result codes done by `eval`.  Also used for nested `[script]` substitution.
    pub(crate) fn eval_script(&mut self, script: &str, ctx: &mut Ctx) -> TickleResult {
        ensure_sufficient_stack(|| self.eval_commands(script, ctx))
    }

    fn eval_commands(&mut self, script: &str, ctx: &mut Ctx) -> TickleResult {
        let mut builder = Builder::new(script);
        let mut result = Value::empty();

        loop {
            let mut sub = Subst {
                interp: &mut *self,
                ctx: &mut *ctx,
            };
            let command = match builder.next_command(&mut sub)? {
                Some(command) => command,
                None => break,
            };

            result = self.execute_command(&command, ctx)?;
            self.last_result = result.clone();
        }

        Ok(result)
    }

    /// Dispatches one fully substituted command.
    fn execute_command(&mut self, command: &Command, ctx: &mut Ctx) -> TickleResult {
        self.cmd_count += 1;

        let name = command.words[0].as_str();
        let (cmd, argv): (_, Cow<[Value]>) = match self.find_command(&name) {
            Some(cmd) => (cmd, Cow::Borrowed(&command.words)),
            None => match self.find_command("unknown") {
                Some(handler) => {
                    let mut argv = alloc::vec![Value::from("unknown")];
                    argv.extend(command.words.iter().cloned());
                    (handler, Cow::Owned(argv))
                }
                None => {
                    return tickle_throw!(
                        ErrorKind::UndefinedCommand,
                        "invalid command name \"{}\"",
                        name
                    )
                }
            },
        };

        if self.safe && !cmd.is_safe() {
            tracing::debug!(command = %name, "safe interpreter refused unsafe command");
            return tickle_throw!(
                ErrorKind::UnsafeCommand,
                "permission denied: \"{}\" can't be used in a safe interpreter",
                name
            );
        }

        if let Some(frame) = self.frames.last_mut() {
            frame.command = argv.to_vec();
        }
        tracing::trace!(command = %name, depth = self.depth(), "dispatch");

        let result = cmd.execute(self, &argv, ctx);

        #[cfg(feature = "error-stack-trace")]
        if let Err(mut exception) = result {
            if exception.is_error() {
                if exception.is_new_error() {
                    exception.add_error_info("    while executing");
                } else if cmd.is_proc() {
                    exception.add_error_info(&format!("    (procedure \"{}\")", name));
                    exception.add_error_info("    invoked from within");
                } else {
                    return Err(exception);
                }
                exception.add_error_info(&format!("\"{}\"", command.source));
            }
            return Err(exception);
        }

        result
    }

    /// Determines whether the script is syntactically complete, i.e., has no unmatched
    /// quotes, brackets, or braces.  REPLs use this to decide whether to ask for another
    /// line of input.
    ///
    /// ```
    /// # use tickle::interp::Interp;
    /// let interp = Interp::<()>::new();
    /// assert!(interp.complete("set a [expr {1+1}]"));
    /// assert!(!interp.complete("set a [expr {1+1"));
    /// ```
    pub fn complete(&self, script: &str) -> bool {
        is_complete(script)
    }

    /// Evaluates an expression and returns its value.
    ///
    /// ```
    /// use tickle::Interp;
    /// use tickle::types::*;
    /// # fn dummy() -> Result<String, Exception> {
    /// let mut ctx = ();
    /// let mut interp = Interp::new();
    /// let sum = interp.expr(&Value::from("2 + 2"), &mut ctx)?.to_int()?;
    /// assert_eq!(sum, 4);
    /// # Ok("dummy".to_string())
    /// # }
    /// ```
    #[cfg(feature = "expr")]
    pub fn expr(&mut self, expr: &Value, ctx: &mut Ctx) -> TickleResult {
        let result = self.expr_value(expr, ctx).map(Value::from);

        if let Err(exception) = &result {
            self.set_global_error_data(exception);
        }

        result
    }

    #[cfg(feature = "expr")]
    fn expr_value(
        &mut self,
        expr: &Value,
        ctx: &mut Ctx,
    ) -> Result<crate::expr::ExprValue, Exception> {
        let mut sub = Subst { interp: self, ctx };
        crate::expr::expr(&expr.as_str(), &mut sub)
    }

    /// Evaluates a boolean expression.  Without the `expr` feature the condition is
    /// evaluated as a script and its result coerced to a boolean.
    ///
    /// ```
    /// use tickle::Interp;
    /// use tickle::types::*;
    /// # fn dummy() -> Result<String, Exception> {
    /// let mut ctx = ();
    /// let mut interp = Interp::new();
    /// assert!(interp.expr_bool(&Value::from("1 < 2"), &mut ctx)?);
    /// # Ok("dummy".to_string())
    /// # }
    /// ```
    pub fn expr_bool(&mut self, expr: &Value, ctx: &mut Ctx) -> Result<bool, Exception> {
        cfg_if::cfg_if! {
            if #[cfg(feature = "expr")] {
                let result = self.expr_value(expr, ctx).map(|value| value.is_true());
                if let Err(exception) = &result {
                    self.set_global_error_data(exception);
                }
                result
            } else {
                self.eval_value(expr, ctx)?.to_boolean()
            }
        }
    }

    /// Evaluates an expression whose value must be an integer.
    #[cfg(feature = "expr")]
    pub fn expr_int(&mut self, expr: &Value, ctx: &mut Ctx) -> Result<TickleInt, Exception> {
        self.expr(expr, ctx)?.to_int()
    }

    /// Evaluates an expression whose value must be numeric.
    #[cfg(feature = "expr")]
    pub fn expr_float(&mut self, expr: &Value, ctx: &mut Ctx) -> Result<TickleFloat, Exception> {
        self.expr(expr, ctx)?.to_number()
    }

    /// The result of the most recent successful command.
    pub fn last_result(&self) -> &Value {
        &self.last_result
    }

    /// The most recent error to reach the top of an evaluation.
    pub fn last_error(&self) -> Option<&Exception> {
        self.last_error.as_ref()
    }

    /// How many commands the interpreter has dispatched.
    pub fn cmd_count(&self) -> usize {
        self.cmd_count
    }

    //--------------------------------------------------------------------------------------------
    // Variable Handling

    /// Retrieves the value of the named variable in the current scope.  The name may be a
    /// scalar `x`, an element `a(k)`, or a qualified name `::ns::x`.
    ///
    /// ```
    /// # use tickle::types::*;
    /// # use tickle::Interp;
    /// # use tickle::tickle_ok;
    /// # fn dummy() -> TickleResult {
    /// let mut ctx = ();
    /// let mut interp = Interp::new();
    /// interp.eval("set a(1) one", &mut ctx)?;
    /// assert_eq!(interp.var(&Value::from("a(1)"))?.as_str(), "one");
    /// # tickle_ok!()
    /// # }
    /// ```
    pub fn var(&self, var_name: &Value) -> TickleResult {
        self.var_str(&var_name.as_str())
    }

    fn var_str(&self, name: &str) -> TickleResult {
        let target = self.locate(name)?;
        let value = match self.scope(target.slot).get(&target.name) {
            Some(value) if target.exists => value,
            _ => {
                return tickle_throw!(
                    ErrorKind::UndefinedVariable,
                    "can't read \"{}\": no such variable",
                    name
                )
            }
        };

        match (value, &target.index) {
            (Value::Array(array), Some(index)) => array.get(index).cloned().ok_or_else(|| {
                Exception::error(
                    ErrorKind::UndefinedVariable,
                    format!("can't read \"{}\": no such element in array", name),
                )
            }),
            (Value::Array(_), None) => {
                tickle_throw!(ErrorKind::Type, "can't read \"{}\": variable is array", name)
            }
            (_, Some(_)) => {
                tickle_throw!(ErrorKind::Type, "can't read \"{}\": variable isn't array", name)
            }
            (value, None) => Ok(value.clone()),
        }
    }

    /// Returns true if the named variable (or array element) exists.
    pub fn var_exists(&self, var_name: &Value) -> bool {
        let name = var_name.as_str();
        let target = match self.locate(&name) {
            Ok(target) if target.exists => target,
            _ => return false,
        };

        match (self.scope(target.slot).get(&target.name), &target.index) {
            (Some(Value::Array(array)), Some(index)) => array.contains_key(index.as_str()),
            (Some(_), Some(_)) => false,
            (Some(_), None) => true,
            (None, _) => false,
        }
    }

    /// Sets the value of the named variable.  Setting an element of a missing variable
    /// creates an array.
    pub fn set_var(&mut self, var_name: &Value, value: Value) -> Result<(), Exception> {
        self.set_var_str(&var_name.as_str(), value)
    }

    /// Sets the value of the named variable and returns the value, as the `set` command
    /// does.
    pub fn set_var_return(&mut self, var_name: &Value, value: Value) -> TickleResult {
        self.set_var(var_name, value.clone())?;
        Ok(value)
    }

    fn set_var_str(&mut self, name: &str, value: Value) -> Result<(), Exception> {
        let target = self.locate(name)?;
        let scope = self.scope_mut(target.slot);

        match target.index {
            None => {
                if let Some(Value::Array(_)) = scope.get(&target.name) {
                    return tickle_throw!(ErrorKind::Type, "can't set \"{}\": variable is array", name);
                }
                scope.set(&target.name, value);
            }
            Some(index) => match scope.get_mut(&target.name) {
                Some(Value::Array(array)) => {
                    Rc::make_mut(array).insert(index, value);
                }
                Some(_) => {
                    return tickle_throw!(
                        ErrorKind::Type,
                        "can't set \"{}\": variable isn't array",
                        name
                    )
                }
                None => {
                    let mut array = TickleArray::default();
                    array.insert(index, value);
                    scope.set(&target.name, Value::from(array));
                }
            },
        }

        Ok(())
    }

    /// Unsets the named variable or array element.  Unsetting a linked name unsets the
    /// variable it refers to.
    pub fn unset_var(&mut self, var_name: &Value) -> Result<(), Exception> {
        let name = var_name.as_str();
        let target = self.locate(&name)?;
        if !target.exists {
            return tickle_throw!(
                ErrorKind::UndefinedVariable,
                "can't unset \"{}\": no such variable",
                name
            );
        }

        let scope = self.scope_mut(target.slot);
        match target.index {
            None => {
                scope.remove(&target.name);
            }
            Some(index) => match scope.get_mut(&target.name) {
                Some(Value::Array(array)) => {
                    if Rc::make_mut(array).shift_remove(&index).is_none() {
                        return tickle_throw!(
                            ErrorKind::UndefinedVariable,
                            "can't unset \"{}\": no such element in array",
                            name
                        );
                    }
                }
                _ => {
                    return tickle_throw!(
                        ErrorKind::Type,
                        "can't unset \"{}\": variable isn't array",
                        name
                    )
                }
            },
        }

        Ok(())
    }

    /// Makes `local` in the current frame an alias for `target` as seen from the frame at
    /// absolute `level`.  This is the mechanism behind `upvar`.
    pub fn link_var(&mut self, level: usize, target: &str, local: &str) -> Result<(), Exception> {
        let depth = self.depth();
        if depth == 0 {
            return tickle_throw!(ErrorKind::LinkScope, "cannot link variables at global level");
        }
        if level > depth {
            return tickle_throw!(ErrorKind::LinkScope, "bad level \"#{}\"", level);
        }
        if level == depth && target == local {
            return tickle_throw!(
                ErrorKind::LinkScope,
                "can't upvar from variable to itself"
            );
        }
        if split_var_name(local).1.is_some() {
            return tickle_throw!(
                ErrorKind::LinkScope,
                "bad variable name \"{}\": can't create a scalar variable that looks like an array element",
                local
            );
        }

        let scope = self.scope_mut(Slot::Frame(depth));
        if let Some(existing) = scope.get(local) {
            if existing.as_link().is_none() {
                return tickle_throw!(
                    ErrorKind::LinkScope,
                    "variable \"{}\" already exists",
                    local
                );
            }
        }
        scope.set(local, Value::Link(Link::new(target, level)));
        Ok(())
    }

    /// Links a name in the current frame to the global variable of the same name.  At the
    /// global level the name already refers to the global variable, so nothing is done.
    pub fn global_var(&mut self, name: &str) -> Result<(), Exception> {
        if self.depth() == 0 {
            return Ok(());
        }
        let (_, tail) = split_qualified(name);
        self.link_var(0, name, tail)
    }

    /// Declares a namespace variable: in a procedure, links `name` to the variable of the
    /// same name in the current namespace.  If a value is given the variable is set.
    pub fn declare_variable(&mut self, name: &str, value: Option<Value>) -> Result<(), Exception> {
        let (qualifiers, tail) = split_qualified(name);
        let ns = match qualifiers {
            Some("") => ROOT,
            Some(qualifiers) => self.lookup_namespace(qualifiers)?,
            None => self.current_namespace(),
        };
        let qualified = if ns == ROOT {
            format!("::{}", tail)
        } else {
            format!("{}::{}", self.namespaces.path(ns), tail)
        };

        if self.frames.last().is_some_and(Frame::is_local) {
            self.link_var(self.depth(), &qualified, tail)?;
        }

        match value {
            Some(value) => self.set_var_str(&qualified, value),
            None => Ok(()),
        }
    }

    /// Gets a list of the names of the variables visible in the current frame.
    pub fn vars_in_scope(&self) -> TickleList {
        self.scope(Slot::Frame(self.depth()))
            .names()
            .map(Value::from)
            .collect()
    }

    /// Gets a list of the names of the global variables.
    pub fn vars_in_global_scope(&self) -> TickleList {
        self.namespaces
            .get(ROOT)
            .vars
            .names()
            .map(Value::from)
            .collect()
    }

    /// Gets a list of the names of the current procedure's own variables, excluding names
    /// linked to other frames.  Empty outside of a procedure.
    pub fn vars_in_local_scope(&self) -> TickleList {
        match self.frames.last().map(|frame| &frame.vars) {
            Some(Vars::Local(scope)) => scope
                .names()
                .filter(|name| scope.get(name).is_some_and(|v| v.as_link().is_none()))
                .map(Value::from)
                .collect(),
            _ => TickleList::new(),
        }
    }

    /// Follows a variable reference through any links to the slot that holds it.
    fn locate(&self, name: &str) -> Result<Target, Exception> {
        let (base, index) = split_var_name(name);
        let mut base = String::from(base);
        let mut index = index.map(String::from);
        let mut depth = self.depth();

        for _ in 0..MAX_LINK_HOPS {
            let (slot, key) = match split_qualified(&base) {
                (Some(qualifiers), tail) => {
                    let ns = if qualifiers.is_empty() {
                        ROOT
                    } else {
                        self.namespaces
                            .find(self.frames[depth].namespace, qualifiers)
                            .ok_or_else(|| {
                                Exception::error(
                                    ErrorKind::UndefinedVariable,
                                    format!(
                                        "can't access \"{}\": parent namespace doesn't exist",
                                        name
                                    ),
                                )
                            })?
                    };
                    (Slot::Namespace(ns), String::from(tail))
                }
                (None, _) => {
                    let owner = (0..=depth)
                        .rev()
                        .find(|&d| self.scope(Slot::Frame(d)).contains(&base));
                    (Slot::Frame(owner.unwrap_or(depth)), base.clone())
                }
            };

            let link = match self.scope(slot).get(&key) {
                None => {
                    return Ok(Target {
                        slot,
                        name: key,
                        index,
                        exists: false,
                    })
                }
                Some(value) => match value.as_link() {
                    Some(link) => link.clone(),
                    None => {
                        return Ok(Target {
                            slot,
                            name: key,
                            index,
                            exists: true,
                        })
                    }
                },
            };

            let (link_base, link_index) = split_var_name(link.name());
            if link_index.is_some() {
                if index.is_some() {
                    return tickle_throw!(
                        ErrorKind::Type,
                        "can't access \"{}\": variable isn't array",
                        name
                    );
                }
                index = link_index.map(String::from);
            }
            base = String::from(link_base);
            depth = link.depth().min(self.depth());
        }

        tickle_throw!(
            ErrorKind::LinkScope,
            "can't access \"{}\": too many nested variable links",
            name
        )
    }

    fn scope(&self, slot: Slot) -> &Scope {
        let ns = match slot {
            Slot::Frame(depth) => match &self.frames[depth].vars {
                Vars::Local(scope) => return scope,
                Vars::Namespace(ns) => *ns,
            },
            Slot::Namespace(ns) => ns,
        };
        &self.namespaces.get(ns).vars
    }

    fn scope_mut(&mut self, slot: Slot) -> &mut Scope {
        let ns = match slot {
            Slot::Frame(depth) => match &mut self.frames[depth].vars {
                Vars::Local(scope) => return scope,
                Vars::Namespace(ns) => *ns,
            },
            Slot::Namespace(ns) => ns,
        };
        &mut self.namespaces.get_mut(ns).vars
    }

    //--------------------------------------------------------------------------------------------
    // Array Manipulation

    fn array_value(&self, array_name: &str) -> Option<Rc<TickleArray>> {
        let target = self.locate(array_name).ok()?;
        if target.index.is_some() {
            return None;
        }
        match self.scope(target.slot).get(&target.name) {
            Some(Value::Array(array)) => Some(Rc::clone(array)),
            _ => None,
        }
    }

    /// Returns true if the named variable exists and is an array.
    pub fn array_exists(&self, array_name: &str) -> bool {
        self.array_value(array_name).is_some()
    }

    /// Returns a flat list of the array's keys and values, or an empty list if there's no
    /// such array.
    pub fn array_get(&self, array_name: &str) -> TickleList {
        match self.array_value(array_name) {
            Some(array) => array
                .iter()
                .flat_map(|(key, value)| [Value::from(key), value.clone()])
                .collect(),
            None => TickleList::new(),
        }
    }

    /// Merges a flat list of keys and values into the named array, creating it if need be.
    pub fn array_set(&mut self, array_name: &str, kvlist: &[Value]) -> Result<(), Exception> {
        if kvlist.len() % 2 != 0 {
            return tickle_err!("list must have an even number of elements");
        }

        if kvlist.is_empty() && !self.var_exists(&Value::from(array_name)) {
            return self.set_var_str(array_name, Value::from(TickleArray::default()));
        }

        for pair in kvlist.chunks(2) {
            let element = format!("{}({})", array_name, pair[0].as_str());
            self.set_var_str(&element, pair[1].clone())?;
        }
        Ok(())
    }

    /// The array's keys, in insertion order.
    pub fn array_names(&self, array_name: &str) -> TickleList {
        match self.array_value(array_name) {
            Some(array) => array.keys().map(Value::from).collect(),
            None => TickleList::new(),
        }
    }

    pub fn array_size(&self, array_name: &str) -> usize {
        self.array_value(array_name).map_or(0, |array| array.len())
    }

    /// Unsets the whole array, if it exists.
    pub fn array_unset(&mut self, array_name: &str) {
        if self.array_exists(array_name) {
            let _ = self.unset_var(&Value::from(array_name));
        }
    }

    //--------------------------------------------------------------------------------------------
    // Frames

    /// The depth of the current frame; the global frame is depth 0.
    pub fn depth(&self) -> usize {
        self.frames.len().saturating_sub(1)
    }

    pub(crate) fn push_frame(&mut self, vars: Vars, namespace: NsId, invocation: TickleList) {
        tracing::debug!(
            depth = self.frames.len(),
            namespace = %self.namespaces.path(namespace),
            "push frame"
        );
        self.frames.push(Frame::new(vars, namespace, invocation));
    }

    /// Runs the top frame's deferred scripts and pops it.  A deferred script's error
    /// replaces `result`.
    pub(crate) fn pop_frame(&mut self, result: TickleResult, ctx: &mut Ctx) -> TickleResult {
        let result = self.run_defers(result, ctx);
        if self.frames.len() > 1 {
            self.frames.pop();
            tracing::debug!(depth = self.frames.len(), "pop frame");
        }
        result
    }

    /// Runs the top frame's deferred scripts, last first, while the frame is still in place.
    fn run_defers(&mut self, mut result: TickleResult, ctx: &mut Ctx) -> TickleResult {
        let saved = self.last_result.clone();

        while let Some(script) = self.frames.last_mut().and_then(|frame| frame.defers.pop()) {
            if let Err(exception) = self.eval_value(&script, ctx) {
                result = Err(exception);
            }
        }

        self.last_result = saved;
        result
    }

    /// Registers a script to run when the current frame is popped.  Scripts deferred in
    /// the global frame run when the interpreter exits.
    pub fn defer(&mut self, script: Value) {
        if let Some(frame) = self.frames.last_mut() {
            frame.defers.push(script);
        }
    }

    /// Evaluates a script in the frame at absolute `level`, as though the frames above it
    /// weren't there.  They are put back afterwards, however the script completes.
    pub fn uplevel(&mut self, level: usize, script: &Value, ctx: &mut Ctx) -> TickleResult {
        if level > self.depth() {
            return tickle_throw!(ErrorKind::LinkScope, "bad level \"#{}\"", level);
        }

        let hidden = self.frames.split_off(level + 1);
        let command = self.frames[level].command.clone();

        let result = self.eval_value(script, ctx);

        self.frames.truncate(level + 1);
        self.frames[level].command = command;
        self.frames.extend(hidden);
        result
    }

    /// The words of the command that created the frame at `level`, or the words of the
    /// command now executing there if the frame is the global frame.
    pub fn level_command(&self, level: usize) -> Option<Value> {
        let frame = self.frames.get(level)?;
        if level == 0 {
            Some(Value::from(frame.command.clone()))
        } else {
            Some(Value::from(frame.invocation.clone()))
        }
    }

    /// The words of the command executing in the current frame.
    pub fn current_command(&self) -> TickleList {
        self.frames
            .last()
            .map(|frame| frame.command.clone())
            .unwrap_or_default()
    }

    //--------------------------------------------------------------------------------------------
    // Namespaces

    pub(crate) fn current_namespace(&self) -> NsId {
        self.frames.last().map_or(ROOT, |frame| frame.namespace)
    }

    /// The fully qualified name of the current namespace.
    pub fn current_namespace_name(&self) -> String {
        self.namespaces.path(self.current_namespace())
    }

    fn lookup_namespace(&self, path: &str) -> Result<NsId, Exception> {
        if path.is_empty() {
            return Ok(self.current_namespace());
        }
        self.namespaces
            .find(self.current_namespace(), path)
            .filter(|&ns| !self.namespaces.get(ns).deleted)
            .ok_or_else(|| {
                Exception::error(ErrorKind::Generic, format!("namespace \"{}\" not found", path))
            })
    }

    /// Evaluates a script in the named namespace, creating it if it doesn't exist.
    pub fn namespace_eval(&mut self, path: &str, script: &Value, ctx: &mut Ctx) -> TickleResult {
        let ns = self.namespaces.ensure(self.current_namespace(), path);
        let invocation = self.current_command();
        self.push_frame(Vars::Namespace(ns), ns, invocation);
        let result = self.eval_value(script, ctx);
        self.pop_frame(result, ctx)
    }

    pub fn namespace_exists(&self, path: &str) -> bool {
        self.namespaces
            .find(self.current_namespace(), path)
            .is_some()
    }

    /// The fully qualified names of a namespace's children; the current namespace's if
    /// `path` is empty.
    pub fn namespace_children(&self, path: &str) -> Result<TickleList, Exception> {
        let ns = self.lookup_namespace(path)?;
        Ok(self
            .namespaces
            .get(ns)
            .children()
            .map(|child| Value::from(self.namespaces.path(child)))
            .collect())
    }

    /// The fully qualified name of a namespace's parent; empty for the root.
    pub fn namespace_parent(&self, path: &str) -> Result<Value, Exception> {
        let ns = self.lookup_namespace(path)?;
        Ok(match self.namespaces.get(ns).parent {
            Some(parent) => Value::from(self.namespaces.path(parent)),
            None => Value::empty(),
        })
    }

    /// Deletes a namespace with its commands, variables, and descendants.
    pub fn namespace_delete(&mut self, path: &str) -> Result<(), Exception> {
        let ns = self.lookup_namespace(path)?;
        if ns == ROOT {
            return tickle_err!("can't delete the global namespace");
        }
        self.namespaces.delete(ns);
        Ok(())
    }

    //--------------------------------------------------------------------------------------------
    // Command Definition and Handling

    /// Finds the command a name refers to.  Qualified names are looked up in the named
    /// namespace; unqualified names in the current namespace and then the root.
    fn find_command_slot<'n>(&self, name: &'n str) -> Option<(NsId, &'n str)> {
        let current = self.current_namespace();
        match split_qualified(name) {
            (Some(""), tail) => Some((ROOT, tail)),
            (Some(qualifiers), tail) => {
                let ns = self.namespaces.find(current, qualifiers)?;
                Some((ns, tail))
            }
            (None, tail) => {
                if self.namespaces.get(current).commands.contains_key(tail) {
                    Some((current, tail))
                } else {
                    Some((ROOT, tail))
                }
            }
        }
        .filter(|(ns, tail)| self.namespaces.get(*ns).commands.contains_key(*tail))
    }

    fn find_command(&self, name: &str) -> Option<Rc<Executable<Ctx>>> {
        let (ns, tail) = self.find_command_slot(name)?;
        self.namespaces.get(ns).commands.get(tail).cloned()
    }

    /// Where a new command with this name goes; missing namespaces are created if
    /// `create` is set.
    fn command_home<'n>(&mut self, name: &'n str, create: bool) -> Result<(NsId, &'n str), Exception> {
        let current = self.current_namespace();
        match split_qualified(name) {
            (Some(""), tail) => Ok((ROOT, tail)),
            (Some(qualifiers), tail) if create => Ok((self.namespaces.ensure(current, qualifiers), tail)),
            (Some(qualifiers), tail) => match self.namespaces.find(current, qualifiers) {
                Some(ns) => Ok((ns, tail)),
                None => tickle_err!("unknown namespace \"{}\"", qualifiers),
            },
            (None, tail) => Ok((current, tail)),
        }
    }

    fn install(&mut self, name: &str, command: Executable<Ctx>) {
        if let Ok((ns, tail)) = self.command_home(name, true) {
            self.namespaces
                .get_mut(ns)
                .commands
                .insert(tail.into(), Rc::new(command));
        }
    }

    /// Adds a command defined as a Rust closure.  Closure commands are safe.
    #[cfg(feature = "closure-commands")]
    pub fn add_command_closure(
        &mut self,
        name: &str,
        func: impl (Fn(&mut Self, &[Value], &mut Ctx) -> TickleOptResult) + 'static,
    ) {
        self.install(
            name,
            Executable::Closure {
                func: alloc::boxed::Box::new(func),
                safe: true,
            },
        );
    }

    /// Adds a Rust command that safe interpreters may run.
    pub fn add_command(&mut self, name: &str, func: CommandFunc<Ctx>) {
        self.install(name, Executable::Native { func, safe: true });
    }

    /// Adds a Rust command that safe interpreters refuse to run.
    pub fn add_unsafe_command(&mut self, name: &str, func: CommandFunc<Ctx>) {
        self.install(name, Executable::Native { func, safe: false });
    }

    /// Defines a procedure, as the `proc` command does.  The procedure belongs to the
    /// namespace it is defined in, and its body runs there.
    pub fn add_proc(&mut self, name: &str, params: &Value, body: &Value) -> Result<(), Exception> {
        let (ns, tail) = match self.command_home(name, false) {
            Ok(home) => home,
            Err(_) => return tickle_err!("can't create procedure \"{}\": unknown namespace", name),
        };
        let proc = Procedure::new(name, params, body.clone(), ns)?;

        tracing::debug!(procedure = name, namespace = %self.namespaces.path(ns), "defined procedure");
        self.namespaces
            .get_mut(ns)
            .commands
            .insert(tail.into(), Rc::new(Executable::Proc(proc)));
        Ok(())
    }

    /// Determines whether a command with the given name is visible from the current
    /// namespace.
    pub fn has_command(&self, name: &str) -> bool {
        self.find_command_slot(name).is_some()
    }

    /// Renames a command.  An empty new name deletes the command.
    ///
    /// ```
    /// use tickle::Interp;
    /// use tickle::types::*;
    /// use tickle::tickle_ok;
    /// # fn dummy() -> TickleResult {
    /// let mut ctx = ();
    /// let mut interp = Interp::new();
    /// interp.rename_command("expr", "=")?;
    /// let sum = interp.eval("= {1 + 1}", &mut ctx)?.to_int()?;
    /// assert_eq!(sum, 2);
    /// # tickle_ok!()
    /// # }
    /// ```
    pub fn rename_command(&mut self, old_name: &str, new_name: &str) -> Result<(), Exception> {
        let (old_ns, old_tail) = match self.find_command_slot(old_name) {
            Some(slot) => slot,
            None => return tickle_err!("can't rename \"{}\": command doesn't exist", old_name),
        };

        if new_name.is_empty() {
            self.namespaces.get_mut(old_ns).commands.shift_remove(old_tail);
            return Ok(());
        }

        let (new_ns, new_tail) = self.command_home(new_name, false)?;
        if self.namespaces.get(new_ns).commands.contains_key(new_tail) {
            return tickle_err!("can't rename to \"{}\": command already exists", new_name);
        }

        if let Some(cmd) = self.namespaces.get_mut(old_ns).commands.shift_remove(old_tail) {
            self.namespaces
                .get_mut(new_ns)
                .commands
                .insert(new_tail.into(), cmd);
        }
        Ok(())
    }

    /// Removes the command with the given name.
    pub fn remove_command(&mut self, name: &str) {
        if let Some((ns, tail)) = self.find_command_slot(name) {
            self.namespaces.get_mut(ns).commands.shift_remove(tail);
        }
    }

    /// The commands visible from the current namespace: its own, then the root's that it
    /// doesn't shadow.
    fn visible_commands(&self) -> Vec<(&String, &Rc<Executable<Ctx>>)> {
        let current = self.current_namespace();
        let local = &self.namespaces.get(current).commands;
        let mut visible: Vec<_> = local.iter().collect();

        if current != ROOT {
            visible.extend(
                self.namespaces
                    .get(ROOT)
                    .commands
                    .iter()
                    .filter(|(name, _)| !local.contains_key(name.as_str())),
            );
        }
        visible
    }

    /// Gets the names of the commands visible from the current namespace.
    pub fn command_names(&self) -> TickleList {
        self.visible_commands()
            .into_iter()
            .map(|(name, _)| Value::from(name))
            .collect()
    }

    /// Returns the type of the named command: `native`, `closure`, or `proc`.
    pub fn command_type(&self, command: &str) -> TickleResult {
        match self.find_command(command) {
            Some(cmd) => tickle_ok!(cmd.cmdtype()),
            None => tickle_err!("\"{}\" isn't a command", command),
        }
    }

    /// Gets the names of the procedures visible from the current namespace.
    pub fn proc_names(&self) -> TickleList {
        self.visible_commands()
            .into_iter()
            .filter(|(_, cmd)| cmd.is_proc())
            .map(|(name, _)| Value::from(name))
            .collect()
    }

    fn find_proc(&self, procname: &str) -> Result<Rc<Executable<Ctx>>, Exception> {
        match self.find_command(procname) {
            Some(cmd) if cmd.is_proc() => Ok(cmd),
            _ => tickle_err!("\"{}\" isn't a procedure", procname),
        }
    }

    /// Returns the body of the named procedure.
    pub fn proc_body(&self, procname: &str) -> TickleResult {
        let cmd = self.find_proc(procname)?;
        match cmd.as_proc() {
            Some(proc) => Ok(proc.body().clone()),
            None => tickle_err!("\"{}\" isn't a procedure", procname),
        }
    }

    /// Returns the names of the named procedure's parameters.
    pub fn proc_args(&self, procname: &str) -> TickleResult {
        let cmd = self.find_proc(procname)?;
        let names: TickleList = cmd
            .as_proc()
            .map(|proc| proc.params().iter().map(|p| Value::from(&p.name)).collect())
            .unwrap_or_default();
        Ok(Value::from(names))
    }

    /// Returns the default value of a procedure's parameter, if it has one.
    pub fn proc_default(&self, procname: &str, arg: &str) -> Result<Option<Value>, Exception> {
        let cmd = self.find_proc(procname)?;
        let param = cmd
            .as_proc()
            .and_then(|proc| proc.params().iter().find(|p| p.name == arg).cloned());

        match param {
            Some(param) => Ok(param.default),
            None => tickle_err!(
                "procedure \"{}\" doesn't have an argument \"{}\"",
                procname,
                arg
            ),
        }
    }

    /// Calls a subcommand of the current command, looking up its name in an array of
    /// `Subcommand` tuples.  `subc` is the index of the subcommand's name in `argv`.
    ///
    /// If the name isn't found, the error lists the valid subcommands.
    pub fn call_subcommand(
        &mut self,
        argv: &[Value],
        subc: usize,
        subcommands: &[Subcommand<Ctx>],
        ctx: &mut Ctx,
    ) -> TickleOptResult {
        check_args(subc, argv, subc + 1, 0, "subcommand ?arg ...?")?;
        let rec = Subcommand::find(subcommands, &argv[subc].as_str())?;
        (rec.1)(self, argv, ctx)
    }

    //--------------------------------------------------------------------------------------------
    // Child Interpreters

    /// True if this interpreter refuses unsafe commands.
    pub fn is_safe(&self) -> bool {
        self.safe
    }

    fn child_index(&self, name: &str) -> Result<usize, usize> {
        self.children
            .binary_search_by(|child| child.name.as_str().cmp(name))
    }

    /// Finds a descendant interpreter by path; the empty path is this interpreter.
    pub fn child(&self, path: &[String]) -> Option<&Interp<Ctx>> {
        match path.split_first() {
            None => Some(self),
            Some((first, rest)) => {
                let i = self.child_index(first).ok()?;
                self.children[i].interp.child(rest)
            }
        }
    }

    pub fn child_mut(&mut self, path: &[String]) -> Option<&mut Interp<Ctx>> {
        match path.split_first() {
            None => Some(self),
            Some((first, rest)) => {
                let i = self.child_index(first).ok()?;
                self.children[i].interp.child_mut(rest)
            }
        }
    }

    /// Creates a child interpreter at `path`.  The child gets a fresh copy of the
    /// registry's commands.  Children of safe interpreters are always safe.
    pub fn create_child(&mut self, path: &[String], safe: bool) -> Result<(), Exception> {
        let (name, parent_path) = match path.split_last() {
            Some(split) => split,
            None => return tickle_err!("can't create an interpreter with an empty name"),
        };

        let parent = match self.child_mut(parent_path) {
            Some(parent) => parent,
            None => return Err(child_not_found(parent_path)),
        };

        match parent.child_index(name) {
            Ok(_) => tickle_err!(
                "interpreter named \"{}\" already exists, cannot create",
                Value::from(path.iter().map(Value::from).collect::<TickleList>())
            ),
            Err(pos) => {
                let safe = safe || parent.safe;
                let interp = Interp::from_registry(Rc::clone(&parent.registry), safe);
                parent.children.insert(
                    pos,
                    Child {
                        name: name.clone(),
                        interp,
                    },
                );
                tracing::debug!(path = %path.join(" "), safe, "created child interpreter");
                Ok(())
            }
        }
    }

    /// Deletes the child interpreter at `path`, with all of its descendants.
    pub fn delete_child(&mut self, path: &[String]) -> Result<(), Exception> {
        let missing = || child_not_found(path);
        let (name, parent_path) = path.split_last().ok_or_else(missing)?;
        let parent = self.child_mut(parent_path).ok_or_else(missing)?;
        let index = parent.child_index(name).map_err(|_| missing())?;
        parent.children.remove(index);
        tracing::debug!(path = %path.join(" "), "deleted child interpreter");
        Ok(())
    }

    /// The names of this interpreter's children, in sorted order.
    pub fn child_names(&self) -> TickleList {
        self.children
            .iter()
            .map(|child| Value::from(&child.name))
            .collect()
    }

    /// Evaluates a script in the descendant interpreter at `path`.
    pub fn eval_in(&mut self, path: &[String], script: &Value, ctx: &mut Ctx) -> TickleResult {
        match self.child_mut(path) {
            Some(child) => child.eval_value(script, ctx),
            None => Err(child_not_found(path)),
        }
    }

    //--------------------------------------------------------------------------------------------
    // Channels

    /// The interpreter's open I/O channels.
    pub fn channels(&mut self) -> &mut ChannelTable {
        &mut self.channels
    }

    //--------------------------------------------------------------------------------------------
    // Interpreter Configuration

    /// Gets the interpreter's recursion limit: how deep the stack of script evaluations may
    /// be.  Each call to [`eval`](#method.eval) or [`eval_value`](#method.eval_value),
    /// including those made for procedure bodies, adds a level.
    ///
    /// ```
    /// # use tickle::interp::Interp;
    /// let interp = Interp::<()>::new();
    /// assert_eq!(interp.recursion_limit(), 1000);
    /// ```
    pub fn recursion_limit(&self) -> usize {
        self.recursion_limit
    }

    /// Sets the interpreter's recursion limit.  The default is 1000.
    pub fn set_recursion_limit(&mut self, limit: usize) {
        self.recursion_limit = limit;
    }
}

/// Parses an interpreter path: a list of names, or a single name using `::` or `.` as
/// separators.  The empty path names the current interpreter.
pub fn parse_child_path(path: &Value) -> Result<Vec<String>, Exception> {
    let list = path.to_list()?;
    if list.len() > 1 {
        return Ok(list.iter().map(|name| name.as_str().into_owned()).collect());
    }

    let text = path.as_str();
    Ok(text
        .split("::")
        .flat_map(|part| part.split('.'))
        .filter(|part| !part.is_empty())
        .map(ToString::to_string)
        .collect())
}

fn child_not_found(path: &[String]) -> Exception {
    Exception::error(
        ErrorKind::Generic,
        format!("could not find interpreter \"{}\"", path.join(" ")),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_empty() {
        let interp = Interp::<()>::empty();
        assert!(interp.command_names().is_empty());
    }

    #[test]
    fn test_new() {
        let interp = Interp::<()>::new();
        assert!(!interp.command_names().is_empty());
        assert!(interp.has_command("proc"));
    }

    #[test]
    fn test_eval() {
        let mut ctx = ();
        let mut interp = Interp::new();

        assert_eq!(interp.eval("set a 1", &mut ctx), Ok(Value::from("1")));
        assert!(ex_match(
            &interp.eval("error 2", &mut ctx),
            Exception::tickle_err(Value::from("2"))
        ));
        assert_eq!(interp.eval("return 3", &mut ctx), Ok(Value::from("3")));
        assert!(ex_match(
            &interp.eval("break", &mut ctx),
            Exception::tickle_err(Value::from("invoked \"break\" outside of a loop"))
        ));
        assert!(ex_match(
            &interp.eval("continue", &mut ctx),
            Exception::tickle_err(Value::from("invoked \"continue\" outside of a loop"))
        ));
    }

    // Shows that the result matches the given exception, ignoring its ErrorData.
    fn ex_match(r: &TickleResult, expected: Exception) -> bool {
        if let Err(e) = r {
            e.code() == expected.code() && e.value() == expected.value()
        } else {
            false
        }
    }

    fn kind_of(r: &TickleResult) -> Option<ErrorKind> {
        r.as_ref().err().and_then(|e| e.error_kind())
    }

    #[test]
    fn test_eval_value() {
        let mut ctx = ();
        let mut interp = Interp::new();

        assert_eq!(
            interp.eval_value(&Value::from("set a 1"), &mut ctx),
            Ok(Value::from("1"))
        );
        assert!(ex_match(
            &interp.eval_value(&Value::from("error 2"), &mut ctx),
            Exception::tickle_err(Value::from("2"))
        ));
        assert_eq!(
            interp.eval_value(&Value::from("return 3"), &mut ctx),
            Ok(Value::from("3"))
        );
    }

    #[test]
    fn test_error_info() {
        let mut ctx = ();
        let mut interp = Interp::new();
        interp.eval("proc fail {} { error oops }", &mut ctx).unwrap();

        assert!(interp.eval("fail", &mut ctx).is_err());
        let info = interp.var(&Value::from("errorInfo")).unwrap();
        assert_eq!(
            info.as_str(),
            "oops\n    while executing\n\"error oops\"\n    (procedure \"fail\")\n    invoked from within\n\"fail\""
        );
        assert_eq!(interp.var(&Value::from("errorCode")).unwrap().as_str(), "NONE");
        assert_eq!(interp.last_error().map(|e| e.value()), Some(Value::from("oops")));
    }

    #[test]
    fn test_undefined_command() {
        let mut ctx = ();
        let mut interp = Interp::new();
        let result = interp.eval("nonesuch 1 2", &mut ctx);
        assert_eq!(kind_of(&result), Some(ErrorKind::UndefinedCommand));
        assert!(ex_match(
            &result,
            Exception::tickle_err(Value::from("invalid command name \"nonesuch\""))
        ));
    }

    #[test]
    fn test_unknown_handler() {
        let mut ctx = ();
        let mut interp = Interp::new();
        interp
            .eval("proc unknown {args} { return \"unknown: $args\" }", &mut ctx)
            .unwrap();
        assert_eq!(
            interp.eval("frobnicate a b", &mut ctx).unwrap().as_str(),
            "unknown: frobnicate a b"
        );
    }

    #[test]
    fn test_complete() {
        let interp = Interp::<()>::new();

        assert!(interp.complete("abc"));
        assert!(interp.complete("a {bc} [def] \"ghi\" xyz"));

        assert!(!interp.complete("a {bc"));
        assert!(!interp.complete("a [bc"));
        assert!(!interp.complete("a \"bc"));
    }

    #[test]
    fn test_expr() {
        let mut ctx = ();
        let mut interp = Interp::new();
        assert_eq!(interp.expr(&Value::from("1 + 2"), &mut ctx), Ok(Value::from(3)));

        let result = interp.expr(&Value::from("a + b"), &mut ctx);
        assert_eq!(kind_of(&result), Some(ErrorKind::Syntax));
    }

    #[test]
    fn test_expr_bool() {
        let mut ctx = ();
        let mut interp = Interp::new();
        assert_eq!(interp.expr_bool(&Value::from("1"), &mut ctx), Ok(true));
        assert_eq!(interp.expr_bool(&Value::from("0"), &mut ctx), Ok(false));
        assert_eq!(interp.expr_bool(&Value::from("2.5"), &mut ctx), Ok(true));
        assert!(interp.expr_bool(&Value::from("a"), &mut ctx).is_err());
    }

    #[test]
    fn test_expr_int() {
        let mut ctx = ();
        let mut interp = Interp::new();
        assert_eq!(interp.expr_int(&Value::from("1 + 2"), &mut ctx), Ok(3));
        assert!(interp.expr_int(&Value::from("1.5"), &mut ctx).is_err());
    }

    #[test]
    fn test_expr_float() {
        let mut ctx = ();
        let mut interp = Interp::new();
        let val = interp
            .expr_float(&Value::from("1.1 + 2.2"), &mut ctx)
            .expect("floating point value");

        assert!((val - 3.3).abs() < 0.001);
        assert!(interp.expr_float(&Value::from("a"), &mut ctx).is_err());
    }

    #[test]
    fn test_recursion_limit() {
        let mut ctx = ();
        let mut interp = Interp::new();

        assert_eq!(interp.recursion_limit(), 1000);
        interp.set_recursion_limit(100);
        assert_eq!(interp.recursion_limit(), 100);

        assert!(interp.eval("proc myproc {} { myproc }", &mut ctx).is_ok());
        assert!(ex_match(
            &interp.eval("myproc", &mut ctx),
            Exception::tickle_err(Value::from(
                "too many nested calls to Interp::eval (infinite loop?)"
            ))
        ));
        assert_eq!(interp.depth(), 0);
    }

    #[test]
    fn test_default_recursion_limit_on_small_stack() {
        let worker = std::thread::Builder::new()
            .stack_size(512 * 1024)
            .spawn(|| {
                let mut ctx = ();
                let mut interp = Interp::new();
                interp
                    .eval("proc spin {} { spin }; proc count {n} { count [expr {$n + 1}] }", &mut ctx)
                    .unwrap();

                let mut messages = Vec::new();
                for script in ["spin", "count 0"] {
                    let exception = interp.eval(script, &mut ctx).unwrap_err();
                    messages.push(exception.value().as_str().into_owned());
                    assert_eq!(interp.depth(), 0);
                }
                messages
            })
            .unwrap();

        let messages = worker.join().unwrap();
        for message in messages {
            assert_eq!(message, "too many nested calls to Interp::eval (infinite loop?)");
        }
    }

    #[test]
    fn test_variables() {
        let mut interp = Interp::<()>::new();
        let x = Value::from("x");

        assert!(!interp.var_exists(&x));
        assert_eq!(
            kind_of(&interp.var(&x)),
            Some(ErrorKind::UndefinedVariable)
        );

        interp.set_var(&x, Value::from("1")).unwrap();
        assert!(interp.var_exists(&x));
        assert_eq!(interp.var(&x).unwrap().as_str(), "1");

        interp.unset_var(&x).unwrap();
        assert!(!interp.var_exists(&x));
        assert!(interp.unset_var(&x).is_err());
    }

    #[test]
    fn test_array_variables() {
        let mut interp = Interp::<()>::new();

        interp.set_var(&Value::from("a(1)"), Value::from("one")).unwrap();
        interp.set_var(&Value::from("a(2)"), Value::from("two")).unwrap();
        assert!(interp.array_exists("a"));
        assert_eq!(interp.array_size("a"), 2);
        assert_eq!(interp.array_names("a"), [Value::from("1"), Value::from("2")]);
        assert!(interp.var(&Value::from("a")).is_err());
        assert!(interp.set_var(&Value::from("a"), Value::from("x")).is_err());

        interp.set_var(&Value::from("s"), Value::from("x")).unwrap();
        assert!(interp.set_var(&Value::from("s(1)"), Value::from("y")).is_err());

        interp.unset_var(&Value::from("a(1)")).unwrap();
        assert_eq!(interp.array_get("a"), [Value::from("2"), Value::from("two")]);

        interp.array_set("b", &[Value::from("k"), Value::from("v")]).unwrap();
        assert_eq!(interp.var(&Value::from("b(k)")).unwrap().as_str(), "v");
        assert!(interp.array_set("b", &[Value::from("k")]).is_err());

        interp.array_unset("b");
        assert!(!interp.array_exists("b"));
    }

    #[test]
    fn test_dynamic_scope() {
        let mut ctx = ();
        let mut interp = Interp::new();

        // A procedure sees its caller's variables and rewrites them in place.
        interp.eval("set shared 1; proc touch {} { set shared 2 }", &mut ctx).unwrap();
        interp.eval("touch", &mut ctx).unwrap();
        assert_eq!(interp.eval("set shared", &mut ctx).unwrap().as_str(), "2");

        // A new variable lives only as long as the frame that created it.
        interp.eval("proc make {} { set fresh 1; set fresh }", &mut ctx).unwrap();
        assert_eq!(interp.eval("make", &mut ctx).unwrap().as_str(), "1");
        let result = interp.eval("set fresh", &mut ctx);
        assert_eq!(kind_of(&result), Some(ErrorKind::UndefinedVariable));
    }

    #[test]
    fn test_link_var() {
        let mut ctx = ();
        let mut interp = Interp::new();

        let result = interp.eval("upvar 0 x y", &mut ctx);
        assert_eq!(kind_of(&result), Some(ErrorKind::LinkScope));

        interp
            .eval("proc setit {} { upvar 1 x y; set y 5 }; setit", &mut ctx)
            .unwrap();
        assert_eq!(interp.eval("set x", &mut ctx).unwrap().as_str(), "5");

        interp
            .eval("proc clear {} { upvar 1 x y; unset y }; clear", &mut ctx)
            .unwrap();
        assert!(!interp.var_exists(&Value::from("x")));
    }

    #[test]
    fn test_global_var() {
        let mut ctx = ();
        let mut interp = Interp::new();

        interp.eval("global g", &mut ctx).unwrap();
        interp
            .eval("proc g_set {} { global g; set g 10 }; g_set", &mut ctx)
            .unwrap();
        assert_eq!(interp.eval("set g", &mut ctx).unwrap().as_str(), "10");
    }

    #[test]
    fn test_qualified_variables() {
        let mut ctx = ();
        let mut interp = Interp::new();

        interp.eval("namespace eval ns { variable v 7 }", &mut ctx).unwrap();
        assert_eq!(interp.eval("set ::ns::v", &mut ctx).unwrap().as_str(), "7");
        interp.eval("set ::top 1", &mut ctx).unwrap();
        assert_eq!(interp.eval("set top", &mut ctx).unwrap().as_str(), "1");
        assert!(interp.eval("set ::missing::v 1", &mut ctx).is_err());
    }

    #[test]
    fn test_uplevel_restores_frames() {
        let mut ctx = ();
        let mut interp = Interp::new();

        interp
            .eval(
                "proc inner {} { uplevel 1 { set seen [info level] }; error boom }
                 proc outer {} { catch inner; set seen }",
                &mut ctx,
            )
            .unwrap();
        assert_eq!(interp.eval("outer", &mut ctx).unwrap().as_str(), "1");
        assert_eq!(interp.depth(), 0);
    }

    #[test]
    fn test_defer_runs_last_first() {
        let mut ctx = ();
        let mut interp = Interp::new();

        interp
            .eval(
                "set log {}
                 proc work {} { defer { lappend ::log a }; defer { lappend ::log b }; error fail }",
                &mut ctx,
            )
            .unwrap();
        assert!(interp.eval("work", &mut ctx).is_err());
        assert_eq!(interp.eval("set log", &mut ctx).unwrap().as_str(), "b a");
    }

    #[test]
    fn test_defer_preserves_result() {
        let mut ctx = ();
        let mut interp = Interp::new();

        interp
            .eval("proc f {} { defer { set ignored 1 }; return done }", &mut ctx)
            .unwrap();
        assert_eq!(interp.eval("f", &mut ctx).unwrap().as_str(), "done");

        interp
            .eval("proc g {} { defer { error late }; return done }", &mut ctx)
            .unwrap();
        assert!(ex_match(
            &interp.eval("g", &mut ctx),
            Exception::tickle_err(Value::from("late"))
        ));
    }

    #[test]
    fn test_exit_runs_global_defers() {
        let mut ctx = ();
        let mut interp = Interp::new();

        interp.eval("defer { set ::cleaned 1 }", &mut ctx).unwrap();
        let result = interp.eval("proc quit {} { exit 3 }; quit", &mut ctx);
        assert_eq!(result.unwrap_err().code(), ResultCode::Exit(3));
        assert_eq!(interp.eval("set cleaned", &mut ctx).unwrap().as_str(), "1");
    }

    #[test]
    fn test_commands() {
        let mut ctx = ();
        let mut interp = Interp::new();

        interp.eval("proc p {a {b 2}} { return $a$b }", &mut ctx).unwrap();
        assert_eq!(interp.command_type("p").unwrap().as_str(), "proc");
        assert_eq!(interp.command_type("set").unwrap().as_str(), "native");
        assert_eq!(interp.proc_args("p").unwrap().as_str(), "a b");
        assert_eq!(interp.proc_default("p", "b").unwrap(), Some(Value::from("2")));
        assert_eq!(interp.proc_default("p", "a").unwrap(), None);
        assert!(interp.proc_default("p", "c").is_err());
        assert!(interp.proc_body("set").is_err());
        assert!(interp.proc_names().contains(&Value::from("p")));

        interp.rename_command("p", "q").unwrap();
        assert!(!interp.has_command("p"));
        assert_eq!(interp.eval("q 1", &mut ctx).unwrap().as_str(), "12");
        assert!(interp.rename_command("q", "set").is_err());
        interp.rename_command("q", "").unwrap();
        assert!(!interp.has_command("q"));

        interp.remove_command("set");
        assert!(!interp.has_command("set"));
    }

    #[test]
    fn test_namespaced_commands() {
        let mut ctx = ();
        let mut interp = Interp::new();

        interp
            .eval("namespace eval a::b { proc f {} { return [namespace current] } }", &mut ctx)
            .unwrap();
        assert_eq!(interp.eval("a::b::f", &mut ctx).unwrap().as_str(), "::a::b");
        assert_eq!(interp.eval("::a::b::f", &mut ctx).unwrap().as_str(), "::a::b");
        assert!(interp.eval("f", &mut ctx).is_err());
        assert!(interp.has_command("a::b::f"));

        interp.namespace_delete("a").unwrap();
        assert!(!interp.namespace_exists("a::b"));
        assert!(interp.eval("a::b::f", &mut ctx).is_err());
    }

    #[test]
    fn test_closure_command() {
        let mut ctx = ();
        let mut interp = Interp::new();
        let greeting = String::from("hello");
        interp.add_command_closure("greet", move |_, argv, _| {
            Ok(Some(Value::from(format!("{} {}", greeting, argv[1]))))
        });
        assert_eq!(interp.eval("greet world", &mut ctx).unwrap().as_str(), "hello world");
        assert_eq!(interp.command_type("greet").unwrap().as_str(), "closure");
    }

    #[test]
    fn test_children() {
        let mut ctx = ();
        let mut interp = Interp::<()>::new();
        let a = vec![String::from("a")];
        let ab = vec![String::from("a"), String::from("b")];

        interp.create_child(&a, false).unwrap();
        interp.create_child(&ab, true).unwrap();
        assert!(interp.create_child(&a, false).is_err());
        assert!(interp.create_child(&[String::from("x"), String::from("y")], false).is_err());

        assert!(!interp.child(&a).unwrap().is_safe());
        assert!(interp.child(&ab).unwrap().is_safe());
        assert_eq!(interp.child_names(), [Value::from("a")]);

        assert_eq!(
            interp.eval_in(&ab, &Value::from("expr {1+1}"), &mut ctx).unwrap().as_str(),
            "2"
        );
        let result = interp.eval_in(&ab, &Value::from("exec ls"), &mut ctx);
        assert_eq!(kind_of(&result), Some(ErrorKind::UnsafeCommand));

        interp.delete_child(&a).unwrap();
        assert!(interp.child(&ab).is_none());
        assert!(interp.delete_child(&a).is_err());
    }

    #[test]
    fn test_parse_child_path() {
        assert_eq!(parse_child_path(&Value::from("a::b")).unwrap(), ["a", "b"]);
        assert_eq!(parse_child_path(&Value::from("a.b")).unwrap(), ["a", "b"]);
        assert_eq!(parse_child_path(&Value::from("{a} {b}")).unwrap(), ["a", "b"]);
        assert!(parse_child_path(&Value::from("")).unwrap().is_empty());
    }

    #[test]
    fn test_cmd_count() {
        let mut ctx = ();
        let mut interp = Interp::new();
        let before = interp.cmd_count();
        interp.eval("set a 1; set b 2", &mut ctx).unwrap();
        assert_eq!(interp.cmd_count() - before, 2);
        assert_eq!(interp.last_result().as_str(), "2");
    }
}
