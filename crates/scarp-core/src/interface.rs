//! The structural interface model.
//!
//! A nominal declaration resolves to an [`Interface`] template: type
//! parameters plus an ordered method table. Instantiating the template
//! against concrete type arguments (and the synthesized instance/module
//! self types) yields an [`Instantiated`] interface, which is what the
//! subtyping engine compares method-by-method.
//!
//! Method tables are `IndexMap`s so iteration order is the declaration
//! order; deterministic iteration is what makes first-failure reporting
//! reproducible.

use std::fmt;

use indexmap::IndexMap;
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::subst::Substitution;
use crate::types::{Type, VarName};

/// Positional parameter classification used when flattening.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    Required,
    Optional,
}

/// Parameters of a method type or proc type.
///
/// Keyword tables are ordered pair lists rather than maps so the whole
/// structure stays hashable and keeps declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Params {
    pub required: Vec<Type>,
    pub optional: Vec<Type>,
    pub rest: Option<Box<Type>>,
    pub required_keywords: Vec<(String, Type)>,
    pub optional_keywords: Vec<(String, Type)>,
    pub rest_keywords: Option<Box<Type>>,
}

impl Params {
    pub fn empty() -> Params {
        Params::default()
    }

    /// Positional-only parameters, all required.
    pub fn positional(required: Vec<Type>) -> Params {
        Params {
            required,
            ..Params::default()
        }
    }

    /// Required and optional positionals in declaration order, tagged with
    /// their kind.
    pub fn flat_positionals(&self) -> Vec<(ParamKind, &Type)> {
        self.required
            .iter()
            .map(|ty| (ParamKind::Required, ty))
            .chain(self.optional.iter().map(|ty| (ParamKind::Optional, ty)))
            .collect()
    }

    /// Required and optional keywords merged, declaration order preserved.
    pub fn flat_keywords(&self) -> Vec<(&str, &Type)> {
        self.required_keywords
            .iter()
            .chain(self.optional_keywords.iter())
            .map(|(name, ty)| (name.as_str(), ty))
            .collect()
    }

    pub fn keyword(&self, name: &str) -> Option<&Type> {
        self.flat_keywords()
            .into_iter()
            .find(|(n, _)| *n == name)
            .map(|(_, ty)| ty)
    }

    pub fn has_required_keyword(&self, name: &str) -> bool {
        self.required_keywords.iter().any(|(n, _)| n == name)
    }

    /// Number of fixed (non-rest) positional slots.
    pub fn fixed_arity(&self) -> usize {
        self.required.len() + self.optional.len()
    }

    pub fn subst(&self, s: &Substitution) -> Params {
        Params {
            required: self.required.iter().map(|ty| ty.subst(s)).collect(),
            optional: self.optional.iter().map(|ty| ty.subst(s)).collect(),
            rest: self.rest.as_ref().map(|ty| Box::new(ty.subst(s))),
            required_keywords: subst_keywords(&self.required_keywords, s),
            optional_keywords: subst_keywords(&self.optional_keywords, s),
            rest_keywords: self.rest_keywords.as_ref().map(|ty| Box::new(ty.subst(s))),
        }
    }

    pub(crate) fn collect_free_variables(&self, set: &mut FxHashSet<VarName>) {
        for ty in self.each_type() {
            ty.collect_free_variables(set);
        }
    }

    pub fn is_closed(&self) -> bool {
        self.each_type().all(Type::is_closed)
    }

    /// Every type mentioned by these parameters, in declaration order.
    pub fn each_type(&self) -> impl Iterator<Item = &Type> {
        self.required
            .iter()
            .chain(self.optional.iter())
            .chain(self.rest.as_deref())
            .chain(self.required_keywords.iter().map(|(_, ty)| ty))
            .chain(self.optional_keywords.iter().map(|(_, ty)| ty))
            .chain(self.rest_keywords.as_deref())
    }
}

fn subst_keywords(keywords: &[(String, Type)], s: &Substitution) -> Vec<(String, Type)> {
    keywords
        .iter()
        .map(|(name, ty)| (name.clone(), ty.subst(s)))
        .collect()
}

impl fmt::Display for Params {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts: Vec<String> = Vec::new();
        parts.extend(self.required.iter().map(|ty| ty.to_string()));
        parts.extend(self.optional.iter().map(|ty| format!("?{ty}")));
        if let Some(rest) = &self.rest {
            parts.push(format!("*{rest}"));
        }
        parts.extend(
            self.required_keywords
                .iter()
                .map(|(name, ty)| format!("{name}: {ty}")),
        );
        parts.extend(
            self.optional_keywords
                .iter()
                .map(|(name, ty)| format!("?{name}: {ty}")),
        );
        if let Some(rest) = &self.rest_keywords {
            parts.push(format!("**{rest}"));
        }
        write!(f, "{}", parts.join(", "))
    }
}

/// A block signature attached to a method type or proc type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Block {
    pub params: Params,
    pub return_type: Type,
    pub optional: bool,
}

impl Block {
    pub fn subst(&self, s: &Substitution) -> Block {
        Block {
            params: self.params.subst(s),
            return_type: self.return_type.subst(s),
            optional: self.optional,
        }
    }

    pub(crate) fn collect_free_variables(&self, set: &mut FxHashSet<VarName>) {
        self.params.collect_free_variables(set);
        self.return_type.collect_free_variables(set);
    }

    pub fn is_closed(&self) -> bool {
        self.params.is_closed() && self.return_type.is_closed()
    }
}

impl fmt::Display for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let q = if self.optional { "?" } else { "" };
        write!(f, "{q}{{ ({}) -> {} }}", self.params, self.return_type)
    }
}

/// One overload of a method: optional type parameters, parameters, an
/// optional block, and a return type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MethodType {
    pub type_params: SmallVec<[VarName; 2]>,
    pub params: Params,
    pub block: Option<Block>,
    pub return_type: Type,
}

impl MethodType {
    /// Substitute without touching the bound type parameters: the enclosing
    /// substitution is shielded from capturing them.
    pub fn subst(&self, s: &Substitution) -> MethodType {
        let s = if self.type_params.is_empty() {
            s.clone()
        } else {
            s.without(&self.type_params)
        };
        MethodType {
            type_params: self.type_params.clone(),
            params: self.params.subst(&s),
            block: self.block.as_ref().map(|b| b.subst(&s)),
            return_type: self.return_type.subst(&s),
        }
    }

    /// Replace the bound type parameters via `s` and clear them; the result
    /// is a monomorphic overload over whatever `s` put in their place.
    pub fn instantiate(&self, s: &Substitution) -> MethodType {
        MethodType {
            type_params: SmallVec::new(),
            params: self.params.subst(s),
            block: self.block.as_ref().map(|b| b.subst(s)),
            return_type: self.return_type.subst(s),
        }
    }

    pub fn with_return_type(&self, return_type: Type) -> MethodType {
        MethodType {
            return_type,
            ..self.clone()
        }
    }

    /// Does any type in this overload mention the variable `name`?
    pub fn contains_var(&self, name: &str) -> bool {
        let mut set = FxHashSet::default();
        self.params.collect_free_variables(&mut set);
        if let Some(block) = &self.block {
            block.collect_free_variables(&mut set);
        }
        self.return_type.collect_free_variables(&mut set);
        set.contains(name)
    }
}

impl fmt::Display for MethodType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.type_params.is_empty() {
            write!(f, "[{}] ", self.type_params.join(", "))?;
        }
        write!(f, "({})", self.params)?;
        if let Some(block) = &self.block {
            write!(f, " {block}")?;
        }
        write!(f, " -> {}", self.return_type)
    }
}

/// A named method with one or more overloads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Method {
    pub name: String,
    pub types: Vec<MethodType>,
}

impl Method {
    pub fn new(name: impl Into<String>, types: Vec<MethodType>) -> Method {
        Method {
            name: name.into(),
            types,
        }
    }

    pub fn with_types(&self, types: Vec<MethodType>) -> Method {
        Method {
            name: self.name.clone(),
            types,
        }
    }

    pub fn subst(&self, s: &Substitution) -> Method {
        Method {
            name: self.name.clone(),
            types: self.types.iter().map(|ty| ty.subst(s)).collect(),
        }
    }
}

/// An uninstantiated structural template for a nominal declaration.
#[derive(Debug, Clone, Default)]
pub struct Interface {
    pub type_params: Vec<VarName>,
    pub methods: IndexMap<String, Method>,
    pub ivar_chains: IndexMap<String, Vec<Type>>,
}

impl Interface {
    /// Substitute the template's type parameters with `args` and replace
    /// the implicit self-type markers, yielding a concrete interface.
    ///
    /// `instance_type`/`module_type` specialize the `instance`/`class`
    /// markers in member signatures; `self_type` becomes the resolved type
    /// the instantiated interface reports for itself.
    pub fn instantiate(
        &self,
        self_type: &Type,
        args: &[Type],
        instance_type: Option<Type>,
        module_type: Option<Type>,
    ) -> Instantiated {
        let s = Substitution::build(&self.type_params, args)
            .with_instance_type(instance_type)
            .with_module_type(module_type);

        let methods = self
            .methods
            .iter()
            .map(|(name, method)| (name.clone(), method.subst(&s)))
            .collect();

        let ivar_chains = self
            .ivar_chains
            .iter()
            .map(|(name, chain)| {
                let chain = chain.iter().map(|ty| ty.subst(&s)).collect();
                (name.clone(), chain)
            })
            .collect();

        Instantiated {
            ty: self_type.clone(),
            methods,
            ivar_chains,
        }
    }
}

/// The structural projection of a type: method name to method, plus the
/// instance-variable chain used by assignment checking in the consuming
/// layer. Derived interfaces are always fresh copies.
#[derive(Debug, Clone)]
pub struct Instantiated {
    pub ty: Type,
    pub methods: IndexMap<String, Method>,
    pub ivar_chains: IndexMap<String, Vec<Type>>,
}

impl Instantiated {
    pub fn empty(ty: Type) -> Instantiated {
        Instantiated {
            ty,
            methods: IndexMap::new(),
            ivar_chains: IndexMap::new(),
        }
    }

    /// Keep only the overloads satisfying `pred`; methods left with no
    /// overloads are removed entirely.
    pub fn select_method_types(mut self, pred: impl Fn(&MethodType) -> bool) -> Instantiated {
        let mut methods = IndexMap::with_capacity(self.methods.len());
        for (name, method) in self.methods {
            let types: Vec<MethodType> = method.types.into_iter().filter(&pred).collect();
            if !types.is_empty() {
                methods.insert(
                    name,
                    Method {
                        name: method.name,
                        types,
                    },
                );
            }
        }
        self.methods = methods;
        self
    }
}
