//! Redundancy elimination over type lists.

use scarp_core::Type;

use crate::builder::InterfaceBuilder;
use crate::check::SubtypeChecker;
use crate::constraints::Constraints;
use crate::relation::{Assumption, Relation};
use crate::result::FatalError;
use crate::trace::Trace;

impl<B: InterfaceBuilder> SubtypeChecker<'_, B> {
    /// Drop members subsumed by another member, preserving first-seen
    /// order. `any` members are removed up front; a list of nothing but
    /// `any` compacts to `[any]`.
    pub fn compact(&mut self, types: &[Type]) -> Result<Vec<Type>, FatalError> {
        let types: Vec<Type> = types
            .iter()
            .filter(|ty| !matches!(ty, Type::Any))
            .cloned()
            .collect();

        if types.is_empty() {
            Ok(vec![Type::Any])
        } else {
            self.compact0(&types)
        }
    }

    fn compact0(&mut self, types: &[Type]) -> Result<Vec<Type>, FatalError> {
        let Some((head, rest)) = types.split_first() else {
            return Ok(Vec::new());
        };
        if rest.is_empty() {
            return Ok(types.to_vec());
        }

        let compacted = self.compact0(rest)?;

        let mut out: Vec<Type> = Vec::new();
        for other in compacted {
            if *head == other {
                out.push(head.clone());
            } else if self.closed_subtype(&other, head)? {
                out.push(head.clone());
            } else if self.closed_subtype(head, &other)? {
                out.push(other);
            } else {
                out.push(head.clone());
                out.push(other);
            }
        }

        let mut unique: Vec<Type> = Vec::with_capacity(out.len());
        for ty in out {
            if !unique.contains(&ty) {
                unique.push(ty);
            }
        }
        Ok(unique)
    }

    /// Plain subtype query with no inference, assumptions, or trace.
    fn closed_subtype(&mut self, sub: &Type, sup: &Type) -> Result<bool, FatalError> {
        let mut constraints = Constraints::empty();
        let mut trace = Trace::empty();
        let relation = Relation::new(sub.clone(), sup.clone());
        let result = self.check(&relation, &mut constraints, &Assumption::empty(), &mut trace)?;
        Ok(result.is_success())
    }
}
