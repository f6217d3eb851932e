//! Interface, method, and parameter comparison.
//!
//! Given two instantiated interfaces, every method the super side names
//! must be present on the sub side with at least one compatible overload
//! per super overload. Parameters are contravariant and blocks swap roles
//! once more, so block parameters end up covariant again.
//!
//! Generic overloads are compared by instantiating the sub side with fresh
//! variables, structurally matching parameter positions to recover a
//! substitution, and re-checking the substituted overload.

use scarp_core::{
    Block, Instantiated, Method, MethodType, ParamKind, Params, Substitution, Type, VarName,
    fresh_var_name,
};

use crate::builder::InterfaceBuilder;
use crate::check::{SubtypeChecker, first_failure};
use crate::constraints::Constraints;
use crate::relation::{Assumption, Relation};
use crate::result::{CheckError, CheckResult, Failure, FatalError};
use crate::trace::Trace;

impl<B: InterfaceBuilder> SubtypeChecker<'_, B> {
    /// Method-by-method comparison of two instantiated interfaces.
    ///
    /// A missing method fails before any signature is compared; otherwise
    /// methods are checked in the super side's declaration order and the
    /// first failing method is the answer.
    pub(crate) fn check_interface(
        &mut self,
        sub_type: &Instantiated,
        super_type: &Instantiated,
        constraints: &mut Constraints,
        assumption: &Assumption,
        trace: &mut Trace,
    ) -> Result<CheckResult, FatalError> {
        let mut method_pairs = Vec::with_capacity(super_type.methods.len());

        for (name, sup_method) in &super_type.methods {
            match sub_type.methods.get(name) {
                Some(sub_method) => method_pairs.push((sub_method, sup_method)),
                None => {
                    return Ok(CheckResult::Failure(Failure::new(
                        CheckError::MethodMissing { name: name.clone() },
                        trace,
                    )));
                }
            }
        }

        for (sub_method, sup_method) in method_pairs {
            let result = self.check_method(
                &sub_method.name,
                sub_method,
                sup_method,
                constraints,
                assumption,
                trace,
            )?;
            if result.is_failure() {
                return Ok(result);
            }
        }

        Ok(CheckResult::Success)
    }

    /// Every super overload must be satisfied by some sub overload.
    ///
    /// All candidate pairs are evaluated before any verdict is taken, so
    /// constraint side effects of failed candidates are observable; this
    /// keeps inference deterministic across overload orderings.
    pub(crate) fn check_method(
        &mut self,
        name: &str,
        sub_method: &Method,
        super_method: &Method,
        constraints: &mut Constraints,
        assumption: &Assumption,
        trace: &mut Trace,
    ) -> Result<CheckResult, FatalError> {
        let depth = trace.len();
        trace.push_method(name);

        let mut rows: Vec<Vec<CheckResult>> = Vec::with_capacity(super_method.types.len());
        let mut fatal = None;

        'rows: for super_type in &super_method.types {
            let mut row = Vec::with_capacity(sub_method.types.len());
            for sub_type in &sub_method.types {
                let pair_depth = trace.len();
                trace.push_method_type(name, sub_type.clone(), super_type.clone());
                let result = self.check_overload_pair(
                    name,
                    sub_type,
                    super_type,
                    constraints,
                    assumption,
                    trace,
                );
                trace.truncate(pair_depth);
                match result {
                    Ok(result) => row.push(result),
                    Err(error) => {
                        fatal = Some(error);
                        break 'rows;
                    }
                }
            }
            rows.push(row);
        }

        trace.truncate(depth);

        if let Some(error) = fatal {
            return Err(error);
        }

        for row in rows {
            if !row.iter().any(CheckResult::is_success) {
                return Ok(first_failure(row));
            }
        }

        Ok(CheckResult::Success)
    }

    fn check_overload_pair(
        &mut self,
        name: &str,
        sub_type: &MethodType,
        super_type: &MethodType,
        constraints: &mut Constraints,
        assumption: &Assumption,
        trace: &mut Trace,
    ) -> Result<CheckResult, FatalError> {
        if super_type.type_params.is_empty() && sub_type.type_params.is_empty() {
            return self.check_method_type(name, sub_type, super_type, constraints, assumption, trace);
        }

        if super_type.type_params.is_empty() {
            // Only the sub overload is generic: instantiate it with fresh
            // variables, recover a substitution from positionally matched
            // parameter pairs, and re-check the substituted overload.
            let fresh: Vec<VarName> = sub_type
                .type_params
                .iter()
                .map(|x| fresh_var_name(x))
                .collect();
            let args: Vec<Type> = fresh.iter().cloned().map(Type::Var).collect();
            let sub_type = sub_type.instantiate(&Substitution::build(&sub_type.type_params, &args));

            constraints.add_var(fresh.iter().cloned());

            return match match_method_type(name, &sub_type, super_type, trace) {
                Ok(pairs) => {
                    let mut subst = Substitution::empty();
                    for (sub, sup) in &pairs {
                        match (sub, sup) {
                            (Type::Var(n), _) if fresh.contains(n) => {
                                subst.add(n.clone(), sup.clone());
                            }
                            (_, Type::Var(n)) if fresh.contains(n) => {
                                subst.add(n.clone(), sub.clone());
                            }
                            _ => {}
                        }
                    }

                    let sub_type = sub_type.subst(&subst);
                    self.check_method_type(name, &sub_type, super_type, constraints, assumption, trace)
                }
                Err(failure) => Ok(CheckResult::Failure(failure)),
            };
        }

        if super_type.type_params.len() == sub_type.type_params.len() {
            // Both generic with the same arity: instantiate both with one
            // shared set of fresh variables.
            let fresh: Vec<VarName> = sub_type
                .type_params
                .iter()
                .map(|x| fresh_var_name(x))
                .collect();
            let args: Vec<Type> = fresh.iter().cloned().map(Type::Var).collect();

            let sub_type = sub_type.instantiate(&Substitution::build(&sub_type.type_params, &args));
            let super_type =
                super_type.instantiate(&Substitution::build(&super_type.type_params, &args));

            constraints.add_var(fresh);

            return self.check_method_type(name, &sub_type, &super_type, constraints, assumption, trace);
        }

        Ok(CheckResult::Failure(Failure::new(
            CheckError::PolyMethodSubtyping {
                name: name.to_string(),
            },
            trace,
        )))
    }

    pub(crate) fn check_method_type(
        &mut self,
        name: &str,
        sub_type: &MethodType,
        super_type: &MethodType,
        constraints: &mut Constraints,
        assumption: &Assumption,
        trace: &mut Trace,
    ) -> Result<CheckResult, FatalError> {
        let span = tracing::debug_span!("check_method_type", method = name, sub = %sub_type, sup = %super_type);
        let _enter = span.enter();

        let result = self.check_method_params(
            name,
            &sub_type.params,
            &super_type.params,
            constraints,
            assumption,
            trace,
        )?;
        if result.is_failure() {
            return Ok(result);
        }

        let result =
            check_block_given(name, sub_type.block.as_ref(), super_type.block.as_ref(), trace);
        if result.is_failure() {
            return Ok(result);
        }

        let result = self.check_block_params(
            name,
            sub_type.block.as_ref(),
            super_type.block.as_ref(),
            constraints,
            assumption,
            trace,
        )?;
        if result.is_failure() {
            return Ok(result);
        }

        let result = self.check_block_return(
            sub_type.block.as_ref(),
            super_type.block.as_ref(),
            constraints,
            assumption,
            trace,
        )?;
        if result.is_failure() {
            return Ok(result);
        }

        let relation = Relation::new(sub_type.return_type.clone(), super_type.return_type.clone());
        self.check(&relation, constraints, assumption, trace)
    }

    /// Parameters are contravariant: each matched pair is checked with the
    /// super side's type as the sub type.
    pub(crate) fn check_method_params(
        &mut self,
        name: &str,
        sub_params: &Params,
        super_params: &Params,
        constraints: &mut Constraints,
        assumption: &Assumption,
        trace: &mut Trace,
    ) -> Result<CheckResult, FatalError> {
        match match_params(name, sub_params, super_params, trace) {
            Ok(pairs) => {
                for (sub_ty, super_ty) in pairs {
                    let relation = Relation::new(super_ty, sub_ty);
                    let result = self.check(&relation, constraints, assumption, trace)?;
                    if result.is_failure() {
                        return Ok(result);
                    }
                }
                Ok(CheckResult::Success)
            }
            Err(failure) => Ok(CheckResult::Failure(failure)),
        }
    }

    /// Block parameters swap roles: the super block's params must be
    /// acceptable where the sub block's params are expected.
    fn check_block_params(
        &mut self,
        name: &str,
        sub_block: Option<&Block>,
        super_block: Option<&Block>,
        constraints: &mut Constraints,
        assumption: &Assumption,
        trace: &mut Trace,
    ) -> Result<CheckResult, FatalError> {
        match (sub_block, super_block) {
            (Some(sub), Some(sup)) => {
                self.check_method_params(name, &sup.params, &sub.params, constraints, assumption, trace)
            }
            _ => Ok(CheckResult::Success),
        }
    }

    /// Block return types are contravariant like parameters.
    fn check_block_return(
        &mut self,
        sub_block: Option<&Block>,
        super_block: Option<&Block>,
        constraints: &mut Constraints,
        assumption: &Assumption,
        trace: &mut Trace,
    ) -> Result<CheckResult, FatalError> {
        match (sub_block, super_block) {
            (Some(sub), Some(sup)) => {
                let relation = Relation::new(sup.return_type.clone(), sub.return_type.clone());
                self.check(&relation, constraints, assumption, trace)
            }
            _ => Ok(CheckResult::Success),
        }
    }
}

/// Block presence and optionality compatibility.
fn check_block_given(
    name: &str,
    sub_block: Option<&Block>,
    super_block: Option<&Block>,
    trace: &Trace,
) -> CheckResult {
    match (sub_block, super_block) {
        (None, None) => CheckResult::Success,
        (Some(sub), Some(sup)) if sub.optional == sup.optional => CheckResult::Success,
        (Some(sub), _) if sub.optional => CheckResult::Success,
        _ => CheckResult::Failure(Failure::new(
            CheckError::BlockMismatch {
                name: name.to_string(),
            },
            trace,
        )),
    }
}

/// Structurally pair up every type position of two overloads: parameters,
/// return types, and block positions (with the block's sides swapped).
/// Used to recover a substitution for generic overload matching; no
/// subtype checks happen here.
pub fn match_method_type(
    name: &str,
    sub_type: &MethodType,
    super_type: &MethodType,
    trace: &Trace,
) -> Result<Vec<(Type, Type)>, Failure> {
    let mut pairs = match_params(name, &sub_type.params, &super_type.params, trace)?;
    pairs.push((sub_type.return_type.clone(), super_type.return_type.clone()));

    match (&sub_type.block, &super_type.block) {
        (None, None) => {}
        (Some(sub_block), Some(super_block)) => {
            let block_pairs = match_params(name, &super_block.params, &sub_block.params, trace)?;
            pairs.extend(block_pairs);
            pairs.push((
                super_block.return_type.clone(),
                sub_block.return_type.clone(),
            ));
        }
        _ => {
            return Err(Failure::new(
                CheckError::BlockMismatch {
                    name: name.to_string(),
                },
                trace,
            ));
        }
    }

    Ok(pairs)
}

/// Pair up parameter positions of two signatures.
///
/// Positionals align by index with rest parameters absorbing the
/// overflow; a sub side without a rest cannot satisfy a super side with
/// one, and leftover required sub positionals are a mismatch. Keywords
/// align by name with the sub side's keyword rest absorbing unmatched
/// super keywords, and a keyword the sub side requires must be required
/// by the super side too.
pub fn match_params(
    name: &str,
    sub_params: &Params,
    super_params: &Params,
    trace: &Trace,
) -> Result<Vec<(Type, Type)>, Failure> {
    let mismatch = || {
        Failure::new(
            CheckError::ParameterMismatch {
                name: name.to_string(),
            },
            trace,
        )
    };

    let mut pairs: Vec<(Type, Type)> = Vec::new();

    let sub_flat = sub_params.flat_positionals();
    let sup_flat = super_params.flat_positionals();

    if let Some(super_rest) = &super_params.rest {
        let Some(sub_rest) = &sub_params.rest else {
            return Err(mismatch());
        };

        for (i, (_, sub_ty)) in sub_flat.iter().enumerate() {
            match sup_flat.get(i) {
                Some((_, sup_ty)) => pairs.push(((*sub_ty).clone(), (*sup_ty).clone())),
                None => pairs.push(((*sub_ty).clone(), (**super_rest).clone())),
            }
        }

        pairs.push(((**sub_rest).clone(), (**super_rest).clone()));
    } else if let Some(sub_rest) = &sub_params.rest {
        let n = sub_flat.len().min(sup_flat.len());
        for i in 0..n {
            pairs.push((sub_flat[i].1.clone(), sup_flat[i].1.clone()));
        }

        for (_, sup_ty) in &sup_flat[n..] {
            pairs.push(((**sub_rest).clone(), (*sup_ty).clone()));
        }
    } else if sub_params.fixed_arity() >= super_params.fixed_arity() {
        for (i, (kind, sub_ty)) in sub_flat.iter().enumerate() {
            match sup_flat.get(i) {
                Some((_, sup_ty)) => pairs.push(((*sub_ty).clone(), (*sup_ty).clone())),
                None => {
                    if *kind == ParamKind::Required {
                        return Err(mismatch());
                    }
                    break;
                }
            }
        }
    } else {
        return Err(mismatch());
    }

    for (kw_name, sup_ty) in super_params.flat_keywords() {
        if let Some(sub_ty) = sub_params.keyword(kw_name) {
            pairs.push((sub_ty.clone(), sup_ty.clone()));
        } else if let Some(sub_rest) = &sub_params.rest_keywords {
            pairs.push(((**sub_rest).clone(), sup_ty.clone()));
        } else {
            return Err(mismatch());
        }
    }

    for (kw_name, _) in &sub_params.required_keywords {
        if !super_params.has_required_keyword(kw_name) {
            return Err(mismatch());
        }
    }

    if let (Some(sub_rest), Some(sup_rest)) =
        (&sub_params.rest_keywords, &super_params.rest_keywords)
    {
        pairs.push(((**sub_rest).clone(), (**sup_rest).clone()));
    }

    Ok(pairs)
}
