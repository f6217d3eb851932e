//! The type representation.
//!
//! Types are closed, immutable values with structural equality and hashing,
//! so they can serve directly as cache keys and members of assumption sets.
//! Smart constructors ([`Type::union`], [`Type::intersection`]) normalize as
//! they build: nested members of the same shape are flattened, duplicates
//! dropped, singletons collapsed, and the empty union/intersection falls
//! back to `bot`/`top` respectively.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};

use crate::interface::{Block, Params};
use crate::subst::Substitution;

/// Name of a type variable.
pub type VarName = String;

static FRESH_VAR_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Mint a globally unique type variable name derived from `base`.
///
/// Fresh names are used to instantiate generic method overloads for
/// matching, and to mask unrelated type parameters during union
/// resolution. The only guarantee is uniqueness within the process.
pub fn fresh_var_name(base: &str) -> VarName {
    let n = FRESH_VAR_COUNTER.fetch_add(1, Ordering::Relaxed);
    format!("{base}({n})")
}

/// A literal type such as `1`, `"foo"`, or `:sym`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LiteralValue {
    Int(i64),
    Str(String),
    Sym(String),
    Bool(bool),
}

impl LiteralValue {
    /// The nominal instance type this literal widens to.
    pub fn back_type(&self) -> Type {
        let name = match self {
            LiteralValue::Int(_) => "::Integer",
            LiteralValue::Str(_) => "::String",
            LiteralValue::Sym(_) => "::Symbol",
            LiteralValue::Bool(true) => "::TrueClass",
            LiteralValue::Bool(false) => "::FalseClass",
        };
        Type::instance(name, vec![])
    }
}

impl fmt::Display for LiteralValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LiteralValue::Int(n) => write!(f, "{n}"),
            LiteralValue::Str(s) => write!(f, "{s:?}"),
            LiteralValue::Sym(s) => write!(f, ":{s}"),
            LiteralValue::Bool(b) => write!(f, "{b}"),
        }
    }
}

/// The kind of a nominal type reference.
///
/// `Alias` references are transparently expandable to their definition;
/// the others resolve through the signature builder.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TypeName {
    Instance(String),
    Class {
        name: String,
        /// `Some(true)` requires a constructor, `Some(false)` forbids one,
        /// `None` leaves it unconstrained.
        constructor: Option<bool>,
    },
    Module(String),
    Interface(String),
    Alias(String),
}

impl TypeName {
    /// The underlying declaration name, without the kind decoration.
    pub fn name(&self) -> &str {
        match self {
            TypeName::Instance(name)
            | TypeName::Class { name, .. }
            | TypeName::Module(name)
            | TypeName::Interface(name)
            | TypeName::Alias(name) => name,
        }
    }

    pub fn is_alias(&self) -> bool {
        matches!(self, TypeName::Alias(_))
    }
}

impl fmt::Display for TypeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeName::Instance(name) | TypeName::Interface(name) | TypeName::Alias(name) => {
                write!(f, "{name}")
            }
            TypeName::Class { name, constructor } => {
                let k = match constructor {
                    None => "",
                    Some(true) => " constructor",
                    Some(false) => " noconstructor",
                };
                write!(f, "{name}.class{k}")
            }
            TypeName::Module(name) => write!(f, "{name}.module"),
        }
    }
}

/// A proc (callable object) type: `^(params) { block } -> return`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProcType {
    pub params: Params,
    pub block: Option<Box<Block>>,
    pub return_type: Box<Type>,
}

impl ProcType {
    /// The callable-object interface procs resolve through.
    pub fn back_type(&self) -> Type {
        Type::instance("::Proc", vec![])
    }
}

/// A type expression.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Type {
    /// The gradual escape hatch: subtype and supertype of everything.
    Any,
    /// Supertype of everything.
    Top,
    /// Subtype of everything.
    Bot,
    Void,
    /// `bool`; absorbs any sub type when used as a super type.
    Boolean,
    Nil,
    /// Implicit-instance self-type marker; replaced at instantiation time.
    Instance,
    /// Implicit-class self-type marker; replaced at instantiation time.
    Class,
    Literal(LiteralValue),
    Var(VarName),
    Name { name: TypeName, args: Vec<Type> },
    Union(Vec<Type>),
    Intersection(Vec<Type>),
    Tuple(Vec<Type>),
    Proc(ProcType),
}

impl Type {
    pub fn instance(name: impl Into<String>, args: Vec<Type>) -> Type {
        Type::Name {
            name: TypeName::Instance(name.into()),
            args,
        }
    }

    pub fn class_of(name: impl Into<String>, constructor: Option<bool>) -> Type {
        Type::Name {
            name: TypeName::Class {
                name: name.into(),
                constructor,
            },
            args: vec![],
        }
    }

    pub fn module_of(name: impl Into<String>) -> Type {
        Type::Name {
            name: TypeName::Module(name.into()),
            args: vec![],
        }
    }

    pub fn interface(name: impl Into<String>, args: Vec<Type>) -> Type {
        Type::Name {
            name: TypeName::Interface(name.into()),
            args,
        }
    }

    pub fn alias(name: impl Into<String>, args: Vec<Type>) -> Type {
        Type::Name {
            name: TypeName::Alias(name.into()),
            args,
        }
    }

    pub fn var(name: impl Into<String>) -> Type {
        Type::Var(name.into())
    }

    /// A type variable with a globally unique name derived from `base`.
    pub fn fresh_var(base: &str) -> Type {
        Type::Var(fresh_var_name(base))
    }

    /// Build a union, flattening nested unions, dropping duplicates, and
    /// collapsing singletons. The empty union is `bot`.
    pub fn union(types: Vec<Type>) -> Type {
        let mut members: Vec<Type> = Vec::with_capacity(types.len());
        flatten_unions(types, &mut members);
        match members.len() {
            0 => Type::Bot,
            1 => members.pop().unwrap_or(Type::Bot),
            _ => Type::Union(members),
        }
    }

    /// Build an intersection with the same normalization as [`Type::union`].
    /// The empty intersection is `top`.
    pub fn intersection(types: Vec<Type>) -> Type {
        let mut members: Vec<Type> = Vec::with_capacity(types.len());
        flatten_intersections(types, &mut members);
        match members.len() {
            0 => Type::Top,
            1 => members.pop().unwrap_or(Type::Top),
            _ => Type::Intersection(members),
        }
    }

    /// The nominal instance type a special-form type widens to for
    /// structural purposes. `None` for types that have no back type.
    pub fn back_type(&self) -> Option<Type> {
        match self {
            Type::Nil => Some(Type::instance("::NilClass", vec![])),
            Type::Boolean => Some(Type::union(vec![
                Type::instance("::TrueClass", vec![]),
                Type::instance("::FalseClass", vec![]),
            ])),
            Type::Literal(lit) => Some(lit.back_type()),
            Type::Proc(proc) => Some(proc.back_type()),
            _ => None,
        }
    }

    /// The exact set of unbound variable names reachable in this tree.
    pub fn free_variables(&self) -> FxHashSet<VarName> {
        let mut set = FxHashSet::default();
        self.collect_free_variables(&mut set);
        set
    }

    pub(crate) fn collect_free_variables(&self, set: &mut FxHashSet<VarName>) {
        match self {
            Type::Var(name) => {
                set.insert(name.clone());
            }
            Type::Name { args, .. } => {
                for arg in args {
                    arg.collect_free_variables(set);
                }
            }
            Type::Union(types) | Type::Intersection(types) | Type::Tuple(types) => {
                for ty in types {
                    ty.collect_free_variables(set);
                }
            }
            Type::Proc(proc) => {
                proc.params.collect_free_variables(set);
                if let Some(block) = &proc.block {
                    block.collect_free_variables(set);
                }
                proc.return_type.collect_free_variables(set);
            }
            _ => {}
        }
    }

    /// Allocation-free check that no variable occurs in this tree.
    ///
    /// Emptiness of [`Type::free_variables`] is the sole gate for cache
    /// eligibility, and this is the fast path for it.
    pub fn is_closed(&self) -> bool {
        match self {
            Type::Var(_) => false,
            Type::Name { args, .. } => args.iter().all(Type::is_closed),
            Type::Union(types) | Type::Intersection(types) | Type::Tuple(types) => {
                types.iter().all(Type::is_closed)
            }
            Type::Proc(proc) => {
                proc.params.is_closed()
                    && proc.block.as_deref().is_none_or(Block::is_closed)
                    && proc.return_type.is_closed()
            }
            _ => true,
        }
    }

    /// Apply a substitution, producing a new type.
    pub fn subst(&self, s: &Substitution) -> Type {
        if s.is_empty() {
            return self.clone();
        }
        match self {
            Type::Var(name) => s.get(name).cloned().unwrap_or_else(|| self.clone()),
            Type::Instance => s.instance_type().cloned().unwrap_or(Type::Instance),
            Type::Class => s.module_type().cloned().unwrap_or(Type::Class),
            Type::Name { name, args } => Type::Name {
                name: name.clone(),
                args: args.iter().map(|arg| arg.subst(s)).collect(),
            },
            Type::Union(types) => Type::union(types.iter().map(|ty| ty.subst(s)).collect()),
            Type::Intersection(types) => {
                Type::intersection(types.iter().map(|ty| ty.subst(s)).collect())
            }
            Type::Tuple(types) => Type::Tuple(types.iter().map(|ty| ty.subst(s)).collect()),
            Type::Proc(proc) => Type::Proc(ProcType {
                params: proc.params.subst(s),
                block: proc.block.as_ref().map(|b| Box::new(b.subst(s))),
                return_type: Box::new(proc.return_type.subst(s)),
            }),
            _ => self.clone(),
        }
    }
}

fn flatten_unions(types: Vec<Type>, members: &mut Vec<Type>) {
    for ty in types {
        match ty {
            Type::Union(inner) => flatten_unions(inner, members),
            other => push_unique(members, other),
        }
    }
}

fn flatten_intersections(types: Vec<Type>, members: &mut Vec<Type>) {
    for ty in types {
        match ty {
            Type::Intersection(inner) => flatten_intersections(inner, members),
            other => push_unique(members, other),
        }
    }
}

fn push_unique(members: &mut Vec<Type>, ty: Type) {
    if !members.contains(&ty) {
        members.push(ty);
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Any => write!(f, "any"),
            Type::Top => write!(f, "top"),
            Type::Bot => write!(f, "bot"),
            Type::Void => write!(f, "void"),
            Type::Boolean => write!(f, "bool"),
            Type::Nil => write!(f, "nil"),
            Type::Instance => write!(f, "instance"),
            Type::Class => write!(f, "class"),
            Type::Literal(lit) => write!(f, "{lit}"),
            Type::Var(name) => write!(f, "{name}"),
            Type::Name { name, args } => {
                if args.is_empty() {
                    write!(f, "{name}")
                } else {
                    let args = args
                        .iter()
                        .map(|a| a.to_string())
                        .collect::<Vec<_>>()
                        .join(", ");
                    match name {
                        TypeName::Class { name, .. } => write!(f, "{name}[{args}].class"),
                        TypeName::Module(name) => write!(f, "{name}[{args}].module"),
                        _ => write!(f, "{name}[{args}]"),
                    }
                }
            }
            Type::Union(types) => write_joined(f, types, " | "),
            Type::Intersection(types) => write_joined(f, types, " & "),
            Type::Tuple(types) => {
                write!(f, "[")?;
                write_joined(f, types, ", ")?;
                write!(f, "]")
            }
            Type::Proc(proc) => {
                write!(f, "^({})", proc.params)?;
                if let Some(block) = &proc.block {
                    write!(f, " {block}")?;
                }
                write!(f, " -> {}", proc.return_type)
            }
        }
    }
}

fn write_joined(f: &mut fmt::Formatter<'_>, types: &[Type], sep: &str) -> fmt::Result {
    for (i, ty) in types.iter().enumerate() {
        if i > 0 {
            write!(f, "{sep}")?;
        }
        write!(f, "{ty}")?;
    }
    Ok(())
}
