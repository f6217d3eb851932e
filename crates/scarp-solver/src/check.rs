//! The subtype decision procedure.
//!
//! [`SubtypeChecker::check`] is the single entry point: it handles the
//! result cache and the coinductive assumption set, then dispatches to
//! `check0`, one exhaustive pass over every shape pair in a fixed
//! precedence order. Recursive nominal graphs terminate because a relation
//! already in the assumption set is accepted without re-derivation.
//!
//! Results for closed relations (no type variables on either side) are
//! memoized for the checker's lifetime; [`SubtypeChecker::invalidate_cache`]
//! resets the memo when the signature environment changes.

use rustc_hash::FxHashMap;
use scarp_core::Type;

use crate::builder::InterfaceBuilder;
use crate::constraints::Constraints;
use crate::relation::{Assumption, Relation};
use crate::result::{CheckError, CheckResult, Failure, FatalError};
use crate::trace::Trace;

pub struct SubtypeChecker<'a, B: InterfaceBuilder> {
    pub(crate) builder: &'a B,
    pub(crate) cache: FxHashMap<Relation, CheckResult>,
}

impl<'a, B: InterfaceBuilder> SubtypeChecker<'a, B> {
    pub fn new(builder: &'a B) -> SubtypeChecker<'a, B> {
        SubtypeChecker {
            builder,
            cache: FxHashMap::default(),
        }
    }

    pub fn builder(&self) -> &B {
        self.builder
    }

    /// Drop every memoized result. Call when the signature environment
    /// behind the builder changes.
    pub fn invalidate_cache(&mut self) {
        self.cache.clear();
    }

    /// Decide whether `relation` holds, accumulating variable bounds into
    /// `constraints`.
    ///
    /// The cache is consulted only when `constraints` is empty: a non-empty
    /// accumulator can observe binding side effects a replayed result would
    /// skip. Cached failures carry the trace suffix below their own
    /// relation, so a hit re-attaches the caller's current trace.
    pub fn check(
        &mut self,
        relation: &Relation,
        constraints: &mut Constraints,
        assumption: &Assumption,
        trace: &mut Trace,
    ) -> Result<CheckResult, FatalError> {
        let span = tracing::debug_span!("check", relation = %relation);
        let _enter = span.enter();

        let prefix = trace.len();

        if constraints.is_empty() {
            if let Some(cached) = self.cache.get(relation) {
                tracing::trace!(success = cached.is_success(), "cache hit");
                return Ok(match cached.clone() {
                    CheckResult::Success => CheckResult::Success,
                    CheckResult::Failure(failure) => {
                        CheckResult::Failure(failure.merge_trace(trace))
                    }
                });
            }
        }

        if assumption.contains(relation) {
            return Ok(CheckResult::Success);
        }

        trace.push_relation(relation.clone());
        let assumption = assumption.with(relation.clone());

        let result = self.check0(relation, constraints, &assumption, trace);

        trace.truncate(prefix);

        let result = result?;
        tracing::debug!(success = result.is_success(), "checked");

        if relation.is_closed() {
            let memo = match &result {
                CheckResult::Success => CheckResult::Success,
                CheckResult::Failure(failure) => {
                    CheckResult::Failure(failure.clone().drop_front(prefix))
                }
            };
            self.cache.insert(relation.clone(), memo);
        }

        Ok(result)
    }

    /// One dispatch step. Arms are tried top to bottom; the order is the
    /// rule precedence.
    fn check0(
        &mut self,
        relation: &Relation,
        constraints: &mut Constraints,
        assumption: &Assumption,
        trace: &mut Trace,
    ) -> Result<CheckResult, FatalError> {
        if self.same_type(relation, assumption) {
            return Ok(CheckResult::Success);
        }

        match (&relation.sub_type, &relation.super_type) {
            (Type::Any, _) | (_, Type::Any) => Ok(CheckResult::Success),

            (_, Type::Void) => Ok(CheckResult::Success),

            (_, Type::Top) => Ok(CheckResult::Success),

            (Type::Bot, _) => Ok(CheckResult::Success),

            (_, Type::Boolean) => Ok(CheckResult::Success),

            (Type::Name { name, .. }, _) if name.is_alias() => {
                let expanded = self.expand_alias(&relation.sub_type)?;
                let rel = Relation::new(expanded, relation.super_type.clone());
                self.check0(&rel, constraints, assumption, trace)
            }

            (_, Type::Name { name, .. }) if name.is_alias() => {
                let expanded = self.expand_alias(&relation.super_type)?;
                let rel = Relation::new(relation.sub_type.clone(), expanded);
                self.check0(&rel, constraints, assumption, trace)
            }

            (Type::Literal(lit), _) => {
                let rel = Relation::new(lit.back_type(), relation.super_type.clone());
                self.check0(&rel, constraints, assumption, trace)
            }

            (Type::Union(types), _) => {
                let results = types
                    .iter()
                    .map(|sub_type| {
                        let rel = Relation::new(sub_type.clone(), relation.super_type.clone());
                        self.check0(&rel, constraints, assumption, trace)
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(all_of(results))
            }

            (_, Type::Union(types)) => {
                let results = types
                    .iter()
                    .map(|super_type| {
                        let rel = Relation::new(relation.sub_type.clone(), super_type.clone());
                        self.check0(&rel, constraints, assumption, trace)
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(any_of(results))
            }

            (Type::Intersection(types), _) => {
                let results = types
                    .iter()
                    .map(|sub_type| {
                        let rel = Relation::new(sub_type.clone(), relation.super_type.clone());
                        self.check0(&rel, constraints, assumption, trace)
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(any_of(results))
            }

            (_, Type::Intersection(types)) => {
                let results = types
                    .iter()
                    .map(|super_type| {
                        let rel = Relation::new(relation.sub_type.clone(), super_type.clone());
                        self.check0(&rel, constraints, assumption, trace)
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(all_of(results))
            }

            (_, Type::Var(name)) => {
                if !constraints.unknown(name) {
                    constraints.add_sub_type(name, relation.sub_type.clone());
                    Ok(CheckResult::Success)
                } else {
                    Ok(self.unknown_pair(relation, trace))
                }
            }

            (Type::Var(name), _) => {
                if !constraints.unknown(name) {
                    constraints.add_super_type(name, relation.super_type.clone());
                    Ok(CheckResult::Success)
                } else {
                    Ok(self.unknown_pair(relation, trace))
                }
            }

            (
                Type::Name {
                    name: sub_name,
                    args: sub_args,
                },
                Type::Name {
                    name: super_name,
                    args: super_args,
                },
            ) => {
                if sub_name == super_name && sub_args.len() == super_args.len() {
                    // Type arguments are invariant: each pair is checked in
                    // both directions.
                    let mut results = Vec::with_capacity(sub_args.len() * 2);
                    for (sub, sup) in sub_args.iter().zip(super_args.iter()) {
                        let rel = Relation::new(sub.clone(), sup.clone());
                        let flipped = rel.flip();
                        results.push(self.check0(&rel, constraints, assumption, trace)?);
                        results.push(self.check0(&flipped, constraints, assumption, trace)?);
                    }
                    Ok(all_of(results))
                } else {
                    let sub_interface = self.resolve(&relation.sub_type, false)?;
                    let super_interface = self.resolve(&relation.super_type, false)?;
                    self.check_interface(
                        &sub_interface,
                        &super_interface,
                        constraints,
                        assumption,
                        trace,
                    )
                }
            }

            (Type::Proc(sub_proc), Type::Proc(super_proc)) => {
                let result = self.check_method_params(
                    "__proc__",
                    &sub_proc.params,
                    &super_proc.params,
                    constraints,
                    assumption,
                    trace,
                )?;
                if result.is_failure() {
                    return Ok(result);
                }
                let rel = Relation::new(
                    (*sub_proc.return_type).clone(),
                    (*super_proc.return_type).clone(),
                );
                self.check0(&rel, constraints, assumption, trace)
            }

            (Type::Tuple(sub_types), Type::Tuple(super_types)) => {
                if sub_types.len() >= super_types.len() {
                    // Elements are invariant over the common prefix; extra
                    // sub elements are allowed.
                    let mut results = Vec::with_capacity(super_types.len() * 2);
                    for (sub, sup) in sub_types.iter().zip(super_types.iter()) {
                        let rel = Relation::new(sub.clone(), sup.clone());
                        let flipped = rel.flip();
                        results.push(self.check0(&rel, constraints, assumption, trace)?);
                        results.push(self.check0(&flipped, constraints, assumption, trace)?);
                    }
                    if results.iter().all(CheckResult::is_success) {
                        Ok(CheckResult::Success)
                    } else {
                        Ok(first_failure(results))
                    }
                } else {
                    Ok(self.unknown_pair(relation, trace))
                }
            }

            (Type::Tuple(_), _) => {
                let sub_interface = self.resolve(&relation.sub_type, false)?;
                let super_interface = self.resolve(&relation.super_type, false)?;
                self.check_interface(
                    &sub_interface,
                    &super_interface,
                    constraints,
                    assumption,
                    trace,
                )
            }

            _ => Ok(self.unknown_pair(relation, trace)),
        }
    }

    fn unknown_pair(&self, relation: &Relation, trace: &Trace) -> CheckResult {
        CheckResult::Failure(Failure::new(
            CheckError::UnknownPair {
                relation: relation.clone(),
            },
            trace,
        ))
    }

    /// Structural type equality, modulo the assumption set: a relation
    /// assumed in both directions counts as equal.
    fn same_type(&self, relation: &Relation, assumption: &Assumption) -> bool {
        if assumption.contains(relation) && assumption.contains(&relation.flip()) {
            return true;
        }

        if relation.sub_type == relation.super_type {
            return true;
        }

        match (&relation.sub_type, &relation.super_type) {
            (
                Type::Name {
                    name: sub_name,
                    args: sub_args,
                },
                Type::Name {
                    name: super_name,
                    args: super_args,
                },
            ) => {
                sub_name == super_name
                    && sub_args.len() == super_args.len()
                    && sub_args.iter().zip(super_args.iter()).all(|(s, t)| {
                        self.same_type(&Relation::new(s.clone(), t.clone()), assumption)
                    })
            }
            _ => false,
        }
    }
}

/// Conjunctive fold: every result must succeed; otherwise the first
/// failure is the answer.
pub(crate) fn all_of(results: Vec<CheckResult>) -> CheckResult {
    if results.iter().all(CheckResult::is_success) {
        CheckResult::Success
    } else {
        first_failure(results)
    }
}

/// Disjunctive fold: any success wins; otherwise the first result is the
/// answer.
pub(crate) fn any_of(results: Vec<CheckResult>) -> CheckResult {
    if results.iter().any(CheckResult::is_success) {
        CheckResult::Success
    } else {
        results.into_iter().next().unwrap_or(CheckResult::Success)
    }
}

pub(crate) fn first_failure(results: Vec<CheckResult>) -> CheckResult {
    results
        .into_iter()
        .find(CheckResult::is_failure)
        .unwrap_or(CheckResult::Success)
}
