//! The seam between the engine and the signature environment.
//!
//! The engine never reads declarations directly. It asks an
//! [`InterfaceBuilder`] for the generic interface template behind a type
//! name, for alias definitions, and for the kind and type parameters of
//! class-level names. Production code implements this over the loaded
//! signature environment; tests implement it over a hand-built table.

use scarp_core::{Interface, Type, TypeName, VarName};

use crate::result::FatalError;

/// A named type alias declaration: `params` are the alias's own type
/// parameters, `ty` its right-hand side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AliasDecl {
    pub params: Vec<VarName>,
    pub ty: Type,
}

/// Supplies interface templates and declaration metadata to the engine.
pub trait InterfaceBuilder {
    /// Build the generic interface template for `name`.
    ///
    /// `with_initialize` controls whether constructor-only methods are
    /// included; structural comparisons between distinct nominals pass
    /// `false`.
    fn build(&self, name: &TypeName, with_initialize: bool) -> Result<Interface, FatalError>;

    /// True when `name` declares a class.
    fn is_class(&self, name: &str) -> bool;

    /// True when `name` declares a module.
    fn is_module(&self, name: &str) -> bool;

    /// The alias declaration behind `name`, if any.
    fn find_alias(&self, name: &str) -> Option<AliasDecl>;

    /// Type parameter names of the class or module declared under `name`.
    fn class_or_module_params(&self, name: &str) -> Option<Vec<VarName>>;
}
