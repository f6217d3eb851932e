//! Diagnostic traces.
//!
//! A trace is the path of relations and method pairs the engine visited on
//! the way to a failure. It is diagnostics only, never load-bearing: the
//! decision procedure appends on entry, truncates on exit, and failures
//! snapshot whatever was active at the point they were constructed.

use std::fmt;

use scarp_core::MethodType;

use crate::relation::Relation;

/// One visited step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TraceStep {
    /// A type-level relation under test.
    Type(Relation),
    /// Entry into comparing two methods of this name.
    Method { name: String },
    /// One overload pair under test.
    MethodType {
        name: String,
        sub: MethodType,
        sup: MethodType,
    },
}

impl fmt::Display for TraceStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TraceStep::Type(relation) => write!(f, "{relation}"),
            TraceStep::Method { name } => write!(f, "{name}"),
            TraceStep::MethodType { name, sub, sup } => {
                write!(f, "{name}: {sub} <: {sup}")
            }
        }
    }
}

/// An ordered, appendable, LIFO-scoped sequence of visited steps.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Trace {
    steps: Vec<TraceStep>,
}

impl Trace {
    pub fn empty() -> Trace {
        Trace::default()
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn steps(&self) -> &[TraceStep] {
        &self.steps
    }

    pub fn push_relation(&mut self, relation: Relation) {
        self.steps.push(TraceStep::Type(relation));
    }

    pub fn push_method(&mut self, name: &str) {
        self.steps.push(TraceStep::Method {
            name: name.to_string(),
        });
    }

    pub fn push_method_type(&mut self, name: &str, sub: MethodType, sup: MethodType) {
        self.steps.push(TraceStep::MethodType {
            name: name.to_string(),
            sub,
            sup,
        });
    }

    /// Cut the trace back to `len` steps. Used to restore the pre-call
    /// depth when a scoped check returns.
    pub fn truncate(&mut self, len: usize) {
        self.steps.truncate(len);
    }

    /// Drop the first `n` steps, leaving the path from the failing
    /// sub-check downward.
    pub fn drop_front(mut self, n: usize) -> Trace {
        if n > 0 {
            self.steps.drain(..n.min(self.steps.len()));
        }
        self
    }

    /// `prefix` followed by this trace's steps. Used to refresh a cached
    /// failure with the caller's context.
    pub fn with_prefix(&self, prefix: &Trace) -> Trace {
        let mut steps = Vec::with_capacity(prefix.steps.len() + self.steps.len());
        steps.extend(prefix.steps.iter().cloned());
        steps.extend(self.steps.iter().cloned());
        Trace { steps }
    }
}

impl fmt::Display for Trace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (depth, step) in self.steps.iter().enumerate() {
            writeln!(f, "{:indent$}{step}", "", indent = depth * 2)?;
        }
        Ok(())
    }
}
