//! Structural subtyping engine.
//!
//! The engine answers "is `sub <: super`?" over the type model in
//! `scarp-core`, accumulating type-variable bounds as it goes. The pieces:
//!
//! - [`Relation`]: an ordered `(sub, super)` pair of types under test.
//! - [`SubtypeChecker`]: the decision procedure, generic over an
//!   [`InterfaceBuilder`] that supplies nominal interface templates. Holds
//!   the memo cache for closed relations.
//! - [`Constraints`]: registered inference variables and the lower/upper
//!   bounds discovered for them.
//! - [`Assumption`]: the in-progress relation set that makes recursive
//!   nominal graphs terminate coinductively.
//! - [`Trace`] and [`CheckResult`]: diagnostics and the recoverable
//!   failure taxonomy. Caller contract violations surface separately as
//!   [`FatalError`].
//!
//! Subtyping here is structural: two nominals relate when the resolved
//! method table of the super side is satisfied by the sub side, member by
//! member, with contravariant parameters and blocks.

pub mod builder;
pub mod check;
pub mod compact;
pub mod constraints;
pub mod method_match;
pub mod relation;
pub mod resolve;
pub mod result;
pub mod trace;

pub use builder::{AliasDecl, InterfaceBuilder};
pub use check::SubtypeChecker;
pub use constraints::Constraints;
pub use method_match::{match_method_type, match_params};
pub use relation::{Assumption, Relation};
pub use result::{CheckError, CheckResult, Failure, FatalError};
pub use trace::{Trace, TraceStep};

#[cfg(test)]
mod test_support;

#[cfg(test)]
#[path = "../tests/check_tests.rs"]
mod check_tests;

#[cfg(test)]
#[path = "../tests/method_match_tests.rs"]
mod method_match_tests;

#[cfg(test)]
#[path = "../tests/resolve_tests.rs"]
mod resolve_tests;

#[cfg(test)]
#[path = "../tests/compact_tests.rs"]
mod compact_tests;
