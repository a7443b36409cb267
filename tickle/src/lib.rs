//! # Tickle: an embeddable Tcl-like command language
//!
//! Tickle is a small execution engine for a Tcl-like language.  Scripts are plain UTF-8
//! text; every value can be rendered as a string, and structured representations (numbers,
//! booleans, lists, arrays) are produced on demand.
//!
//! The crate is layered leaf-first:
//!
//! * [`scanner`]: the context-sensitive tokenizer.  It yields [`Word`](scanner::Word)s lazily
//!   in command mode, expression mode, quoted-string mode, and list mode.
//! * [`value`]: the tagged [`Value`] type and its coercion rules.
//! * [`builder`]: turns the word stream into fully substituted commands, given a
//!   [`Substitutor`](builder::Substitutor) that can resolve variables and run nested scripts.
//! * [`expr`]: the arithmetic expression sub-language with its own typed values.
//! * [`interp`]: the execution core.  [`Interp`] owns the frame stack, the namespace tree,
//!   the command tables, and a tree of child interpreters.
//!
//! The standard command set lives in [`commands`] and is installed through an explicit
//! [`CommandRegistry`] handed to the interpreter at construction time.
//!
//! ```
//! use tickle::Interp;
//!
//! let mut ctx = ();
//! let mut interp = Interp::new();
//! let sum = interp.eval("proc add {a b} { expr {$a + $b} }; add 2 3", &mut ctx);
//! assert_eq!(sum.unwrap().as_str(), "5");
//! ```

#![forbid(unsafe_code)]

extern crate alloc;

pub use crate::command::CommandRegistry;
pub use crate::command::Executable;
pub use crate::interp::Interp;
pub use crate::types::*;
pub use crate::util::check_args;
pub use crate::value::Value;

pub mod builder;
pub mod channel;
pub mod command;
pub mod commands;
#[cfg(feature = "expr")]
pub mod expr;
mod frame;
pub mod interp;
pub mod list;
mod macros;
mod namespace;
pub mod scanner;
mod scope;
mod stack;
pub mod types;
mod util;
pub mod value;
