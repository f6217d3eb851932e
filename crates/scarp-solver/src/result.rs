//! Check outcomes and the two error channels.
//!
//! Genuine type-relation failures are values: [`CheckResult::Failure`]
//! carries a closed [`CheckError`] taxonomy plus the [`Trace`] active at
//! the point of failure, and is cached and replayed like any other result.
//!
//! Contract violations by the engine's own callers travel on a separate
//! channel: [`FatalError`] is returned as the `Err` of engine methods and
//! aborts the whole check. Asking to structurally resolve an open type, or
//! naming an undeclared nominal, is a bug upstream, not a type error to
//! report to an end user.

use std::error::Error;
use std::fmt;

use scarp_core::{Type, TypeName};

use crate::relation::Relation;
use crate::trace::Trace;

/// Why a relation does not hold.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckError {
    /// No subtyping rule matches the shape pair, or a type variable was
    /// referenced outside its registered scope.
    UnknownPair { relation: Relation },
    /// The super interface requires a method the sub interface lacks.
    MethodMissing { name: String },
    /// Generic-method overloads have incompatible type-parameter arities.
    PolyMethodSubtyping { name: String },
    /// Block presence/optionality mismatch between overloads.
    BlockMismatch { name: String },
    /// Positional/keyword parameter shapes cannot be reconciled.
    ParameterMismatch { name: String },
}

impl fmt::Display for CheckError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CheckError::UnknownPair { relation } => {
                write!(f, "no subtyping rule for {relation}")
            }
            CheckError::MethodMissing { name } => {
                write!(f, "method `{name}` is missing")
            }
            CheckError::PolyMethodSubtyping { name } => {
                write!(f, "type parameter arities of `{name}` overloads do not match")
            }
            CheckError::BlockMismatch { name } => {
                write!(f, "block of `{name}` does not match")
            }
            CheckError::ParameterMismatch { name } => {
                write!(f, "parameters of `{name}` cannot be reconciled")
            }
        }
    }
}

/// A failed check: the error plus the visited path that led to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure {
    pub error: CheckError,
    pub trace: Trace,
}

impl Failure {
    /// Snapshot the currently active trace together with `error`.
    pub fn new(error: CheckError, trace: &Trace) -> Failure {
        Failure {
            error,
            trace: trace.clone(),
        }
    }

    /// Remove the first `n` trace steps, leaving the path from the failing
    /// sub-check downward.
    pub fn drop_front(mut self, n: usize) -> Failure {
        self.trace = self.trace.drop_front(n);
        self
    }

    /// Attach the caller's trace in front of the stored one. Cache hits
    /// use this so a replayed failure reports the current context rather
    /// than the one it was first discovered in.
    pub fn merge_trace(mut self, trace: &Trace) -> Failure {
        self.trace = self.trace.with_prefix(trace);
        self
    }
}

/// Outcome of a subtype check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckResult {
    Success,
    Failure(Failure),
}

impl CheckResult {
    pub fn is_success(&self) -> bool {
        matches!(self, CheckResult::Success)
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, CheckResult::Failure(_))
    }

    pub fn failure(&self) -> Option<&Failure> {
        match self {
            CheckResult::Success => None,
            CheckResult::Failure(failure) => Some(failure),
        }
    }

    pub fn error(&self) -> Option<&CheckError> {
        self.failure().map(|failure| &failure.error)
    }
}

/// A caller contract violation or unknown nominal reference.
///
/// These abort the current check instead of being recovered: they indicate
/// a bug in the engine's caller, not a type error in the checked program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FatalError {
    /// `resolve` was asked to structurally project an inherently
    /// unresolvable open type (`any`, a bare variable, or a bare
    /// `instance`/`class` marker).
    CannotResolve { ty: Type },
    /// The signature builder has no declaration under this name.
    UnknownTypeName { name: TypeName },
    /// An alias reference names no known alias declaration.
    UnknownAlias { name: String },
}

impl fmt::Display for FatalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FatalError::CannotResolve { ty } => {
                write!(f, "type {ty} cannot resolve to an interface")
            }
            FatalError::UnknownTypeName { name } => {
                write!(f, "unknown type name: {name}")
            }
            FatalError::UnknownAlias { name } => {
                write!(f, "unknown alias name: {name}")
            }
        }
    }
}

impl Error for FatalError {}
