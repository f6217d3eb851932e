//! The constraint accumulator for type variable inference.
//!
//! One `Constraints` value lives for one top-level inference request and is
//! threaded mutably through the whole recursive descent. A caller doing
//! multi-step inference (checking several arguments against one generic
//! method) shares a single accumulator across `check` calls so bounds keep
//! accumulating.
//!
//! A variable may only receive a bound after it has been registered via
//! [`Constraints::add_var`]; the decision procedure reports a bind attempt
//! on an unregistered variable as an `UnknownPair` failure, which prevents
//! accidental capture of variables from an unrelated scope.

use rustc_hash::{FxHashMap, FxHashSet};
use scarp_core::{Type, VarName};

#[derive(Debug, Clone, Default)]
pub struct Constraints {
    vars: FxHashSet<VarName>,
    lower_bounds: FxHashMap<VarName, Vec<Type>>,
    upper_bounds: FxHashMap<VarName, Vec<Type>>,
}

impl Constraints {
    pub fn empty() -> Constraints {
        Constraints::default()
    }

    /// Register variable names as knowable for this inference pass.
    pub fn add_var(&mut self, names: impl IntoIterator<Item = VarName>) {
        self.vars.extend(names);
    }

    /// True when `name` has never been registered via [`Constraints::add_var`].
    pub fn unknown(&self, name: &str) -> bool {
        !self.vars.contains(name)
    }

    /// Record `ty` as a lower bound of `name` (discovered with `name` on
    /// the super side of a relation).
    pub fn add_sub_type(&mut self, name: &str, ty: Type) {
        debug_assert!(!self.unknown(name), "bound added for unknown variable {name}");
        self.lower_bounds.entry(name.to_string()).or_default().push(ty);
    }

    /// Record `ty` as an upper bound of `name` (discovered with `name` on
    /// the sub side of a relation).
    pub fn add_super_type(&mut self, name: &str, ty: Type) {
        debug_assert!(!self.unknown(name), "bound added for unknown variable {name}");
        self.upper_bounds.entry(name.to_string()).or_default().push(ty);
    }

    /// Union of the recorded lower bounds; `bot` when there are none.
    pub fn lower_bound(&self, name: &str) -> Type {
        match self.lower_bounds.get(name) {
            Some(bounds) => Type::union(bounds.clone()),
            None => Type::Bot,
        }
    }

    /// Intersection of the recorded upper bounds; `top` when there are none.
    pub fn upper_bound(&self, name: &str) -> Type {
        match self.upper_bounds.get(name) {
            Some(bounds) => Type::intersection(bounds.clone()),
            None => Type::Top,
        }
    }

    pub fn has_bounds(&self, name: &str) -> bool {
        self.lower_bounds.contains_key(name) || self.upper_bounds.contains_key(name)
    }

    /// True when nothing has been registered or recorded. Only checks
    /// against an empty accumulator may consult the relation cache: a
    /// non-empty one can still observe binding side effects.
    pub fn is_empty(&self) -> bool {
        self.vars.is_empty() && self.lower_bounds.is_empty() && self.upper_bounds.is_empty()
    }
}
