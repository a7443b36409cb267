//! Stack growth for the interpreter's recursive paths.
//!
//! Script evaluation recurses through procedure bodies, command substitution, and the
//! expression parser, and a debug build spends a lot of stack on each level.  Wrapping
//! those paths in [`ensure_sufficient_stack`] lets the interpreter's own limits
//! ([`Interp::recursion_limit`] and the expression nesting limit) be reached before the
//! thread's stack runs out.
//!
//! [`Interp::recursion_limit`]: crate::Interp::recursion_limit

/// Grow the stack when less than this much remains.
const RED_ZONE: usize = 128 * 1024;

/// The size of each newly allocated stack segment.
const STACK_PER_RECURSION: usize = 1024 * 1024;

/// Runs `f`, first moving to a fresh stack segment if the current one is nearly used up.
#[inline]
#[cfg(not(target_arch = "wasm32"))]
pub(crate) fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    stacker::maybe_grow(RED_ZONE, STACK_PER_RECURSION, f)
}

#[inline]
#[cfg(target_arch = "wasm32")]
pub(crate) fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    f()
}
