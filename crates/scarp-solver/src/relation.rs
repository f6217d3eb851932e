//! Subtyping relations and the coinductive assumption set.

use std::fmt;

use rustc_hash::FxHashSet;
use scarp_core::Type;

/// An ordered `(sub_type, super_type)` pair under test.
///
/// Relations are value objects: structural equality and hashing make them
/// usable as cache keys and as members of the assumption set.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Relation {
    pub sub_type: Type,
    pub super_type: Type,
}

impl Relation {
    pub fn new(sub_type: Type, super_type: Type) -> Relation {
        Relation {
            sub_type,
            super_type,
        }
    }

    /// The same pair with the two sides swapped.
    pub fn flip(&self) -> Relation {
        Relation {
            sub_type: self.super_type.clone(),
            super_type: self.sub_type.clone(),
        }
    }

    /// True when neither side mentions a type variable. Only closed
    /// relations are eligible for the result cache.
    pub fn is_closed(&self) -> bool {
        self.sub_type.is_closed() && self.super_type.is_closed()
    }
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} <: {}", self.sub_type, self.super_type)
    }
}

/// The set of relations currently being proved.
///
/// Re-encountering a member lets the engine conclude coinductively instead
/// of re-deriving forever on recursive nominal type graphs. Extension is
/// copy-on-write ([`Assumption::with`]), never shared mutation, so a failed
/// branch leaves its siblings' assumption sets untouched.
#[derive(Debug, Clone, Default)]
pub struct Assumption {
    relations: FxHashSet<Relation>,
}

impl Assumption {
    pub fn empty() -> Assumption {
        Assumption::default()
    }

    pub fn contains(&self, relation: &Relation) -> bool {
        self.relations.contains(relation)
    }

    /// A new assumption set extended with `relation`.
    pub fn with(&self, relation: Relation) -> Assumption {
        let mut relations = self.relations.clone();
        relations.insert(relation);
        Assumption { relations }
    }
}
