//! Core type and interface model for the Scarp type checker.
//!
//! This crate defines the immutable type representation shared by every
//! layer of the checker:
//!
//! - [`Type`]: the algebraic type value (nominal applications, unions,
//!   intersections, tuples, procs, literals, type variables, and the
//!   `any`/`top`/`bot`/`void` special forms)
//! - [`Substitution`]: capture-avoiding replacement of type variables and
//!   of the implicit `instance`/`class` self-type markers
//! - [`Params`]/[`MethodType`]/[`Method`]/[`Interface`]: the structural
//!   signature model that nominal declarations instantiate into
//!
//! Every transformation produces a new value; nothing in this crate
//! mutates a type in place.

pub mod interface;
pub mod subst;
pub mod types;

pub use interface::{Block, Instantiated, Interface, Method, MethodType, ParamKind, Params};
pub use subst::Substitution;
pub use types::{LiteralValue, ProcType, Type, TypeName, VarName, fresh_var_name};

#[cfg(test)]
#[path = "../tests/types_tests.rs"]
mod types_tests;

#[cfg(test)]
#[path = "../tests/interface_tests.rs"]
mod interface_tests;
