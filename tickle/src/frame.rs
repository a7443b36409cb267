//! Call frames.
//!
//! The interpreter keeps its frames in a `Vec`, indexed by depth; frame 0 is the global
//! frame.  A variable [`Link`](crate::value::Link) names its target frame by that index, so
//! the index of a frame must never change while the frame is live.  Frames are only ever
//! pushed and popped at the top, and `uplevel` moves the frames above its target level
//! aside and puts them back in place afterwards.

use crate::namespace::NsId;
use crate::scope::Scope;
use crate::types::TickleList;
use crate::value::Value;
use alloc::vec::Vec;

/// Where a frame keeps its variables.
#[derive(Debug)]
pub(crate) enum Vars {
    /// A procedure's own variables, discarded when the frame is popped.
    Local(Scope),
    /// The variables of a namespace: the global frame, and `namespace eval` bodies.
    Namespace(NsId),
}

#[derive(Debug)]
pub(crate) struct Frame {
    pub vars: Vars,
    /// The namespace in which commands are resolved.
    pub namespace: NsId,
    /// The command that created the frame; empty for the global frame.
    pub invocation: TickleList,
    /// The command currently executing in the frame.
    pub command: TickleList,
    /// Scripts to run, last first, when the frame is popped.
    pub defers: Vec<Value>,
}

impl Frame {
    pub fn new(vars: Vars, namespace: NsId, invocation: TickleList) -> Self {
        Self {
            vars,
            namespace,
            invocation,
            command: TickleList::new(),
            defers: Vec::new(),
        }
    }

    /// The global frame, whose variables are the root namespace's.
    pub fn global(root: NsId) -> Self {
        Self::new(Vars::Namespace(root), root, TickleList::new())
    }

    pub fn is_local(&self) -> bool {
        matches!(self.vars, Vars::Local(_))
    }
}
