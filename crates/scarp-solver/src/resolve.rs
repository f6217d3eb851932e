//! Structural resolution of types to instantiated interfaces.
//!
//! `resolve` turns any resolvable type into the [`Instantiated`] interface
//! the engine compares against. Nominal types go through the signature
//! builder; unions intersect their members' method tables, intersections
//! union them; tuples and procs resolve through their backing nominals and
//! then override the element/application methods with exact signatures.
//!
//! Inherently open types (`any`, bare variables, the `instance`/`class`
//! markers) cannot resolve; asking is a caller bug, reported as
//! [`FatalError::CannotResolve`].

use indexmap::IndexMap;
use scarp_core::{
    Instantiated, LiteralValue, Method, MethodType, Params, Substitution, Type, TypeName,
    fresh_var_name,
};
use smallvec::SmallVec;

use crate::builder::InterfaceBuilder;
use crate::check::SubtypeChecker;
use crate::constraints::Constraints;
use crate::relation::Assumption;
use crate::result::FatalError;
use crate::trace::Trace;

impl<B: InterfaceBuilder> SubtypeChecker<'_, B> {
    /// Resolve `ty` to its structural interface.
    pub fn resolve(&mut self, ty: &Type, with_initialize: bool) -> Result<Instantiated, FatalError> {
        self.resolve_with(ty, ty, None, None, with_initialize)
    }

    fn resolve_with(
        &mut self,
        ty: &Type,
        self_type: &Type,
        instance_type: Option<&Type>,
        module_type: Option<&Type>,
        with_initialize: bool,
    ) -> Result<Instantiated, FatalError> {
        tracing::debug!(ty = %ty, "resolve");

        match ty {
            Type::Any | Type::Var(_) | Type::Class | Type::Instance => {
                Err(FatalError::CannotResolve { ty: ty.clone() })
            }

            Type::Nil | Type::Literal(_) | Type::Boolean => match ty.back_type() {
                Some(back) => {
                    self.resolve_with(&back, self_type, instance_type, module_type, with_initialize)
                }
                None => Err(FatalError::CannotResolve { ty: ty.clone() }),
            },

            Type::Name { name, args } => match name {
                TypeName::Alias(_) => {
                    let expanded = self.expand_alias(ty)?;
                    self.resolve_with(
                        &expanded,
                        self_type,
                        instance_type,
                        module_type,
                        with_initialize,
                    )
                }
                TypeName::Instance(_) | TypeName::Interface(_) => {
                    let template = self.builder.build(name, with_initialize)?;
                    let module_type = module_type.cloned().or_else(|| self.module_type(ty));
                    Ok(template.instantiate(self_type, args, Some(ty.clone()), module_type))
                }
                TypeName::Class { .. } | TypeName::Module(_) => {
                    let template = self.builder.build(name, with_initialize)?;
                    let params = self
                        .builder
                        .class_or_module_params(name.name())
                        .unwrap_or_default();
                    let instance_args: Vec<Type> = params.into_iter().map(Type::Var).collect();
                    let instance = Type::instance(name.name(), instance_args);
                    let module_type = module_type.cloned().or_else(|| self.module_type(ty));
                    Ok(template.instantiate(self_type, &[], Some(instance), module_type))
                }
            },

            Type::Union(types) => {
                // Each member is resolved with a fresh variable masking the
                // self-type markers; overloads that mention the mask depend
                // on the concrete member and are excluded from the common
                // interface.
                let mut interfaces = Vec::with_capacity(types.len());
                for member in types {
                    let mask = fresh_var_name("___");
                    let mask_ty = Type::Var(mask.clone());
                    let resolved = self.resolve_with(
                        member,
                        ty,
                        Some(&mask_ty),
                        Some(&mask_ty),
                        with_initialize,
                    )?;
                    interfaces.push(resolved.select_method_types(|mt| !mt.contains_var(&mask)));
                }

                let mut methods: Option<IndexMap<String, Method>> = None;
                for interface in interfaces {
                    methods = Some(match methods {
                        None => interface.methods,
                        Some(existing) => {
                            self.intersect_methods(existing, &interface.methods)?
                        }
                    });
                }

                Ok(Instantiated {
                    ty: ty.clone(),
                    methods: methods.unwrap_or_default(),
                    ivar_chains: IndexMap::new(),
                })
            }

            Type::Intersection(types) => {
                let mut interfaces = Vec::with_capacity(types.len());
                for member in types {
                    interfaces.push(self.resolve(member, with_initialize)?);
                }

                let mut methods: Option<IndexMap<String, Method>> = None;
                for interface in &interfaces {
                    methods = Some(match methods {
                        None => interface.methods.clone(),
                        Some(existing) => self.union_methods(existing, &interface.methods)?,
                    });
                }

                let mut ivar_chains = IndexMap::new();
                for interface in &interfaces {
                    for (name, chain) in &interface.ivar_chains {
                        ivar_chains.insert(name.clone(), chain.clone());
                    }
                }

                Ok(Instantiated {
                    ty: ty.clone(),
                    methods: methods.unwrap_or_default(),
                    ivar_chains,
                })
            }

            Type::Void => Ok(Instantiated::empty(ty.clone())),

            Type::Tuple(types) => {
                let element = Type::union(types.clone());
                let array = Type::instance("::Array", vec![element]);
                let mut interface =
                    self.resolve_with(&array, self_type, None, None, with_initialize)?;

                // Exact per-index signatures shadow the element-union ones.
                if let Some(aref) = interface.methods.get("[]").cloned() {
                    let mut overloads: Vec<MethodType> = types
                        .iter()
                        .enumerate()
                        .map(|(index, elem)| MethodType {
                            type_params: SmallVec::new(),
                            params: Params::positional(vec![Type::Literal(LiteralValue::Int(
                                index as i64,
                            ))]),
                            block: None,
                            return_type: elem.clone(),
                        })
                        .collect();
                    overloads.extend(aref.types.iter().cloned());
                    interface
                        .methods
                        .insert("[]".to_string(), aref.with_types(overloads));
                }

                if let Some(aset) = interface.methods.get("[]=").cloned() {
                    let mut overloads: Vec<MethodType> = types
                        .iter()
                        .enumerate()
                        .map(|(index, elem)| MethodType {
                            type_params: SmallVec::new(),
                            params: Params::positional(vec![
                                Type::Literal(LiteralValue::Int(index as i64)),
                                elem.clone(),
                            ]),
                            block: None,
                            return_type: elem.clone(),
                        })
                        .collect();
                    overloads.extend(aset.types.iter().cloned());
                    interface
                        .methods
                        .insert("[]=".to_string(), aset.with_types(overloads));
                }

                Ok(interface)
            }

            Type::Proc(proc) => {
                let back = proc.back_type();
                let mut interface =
                    self.resolve_with(&back, self_type, None, None, with_initialize)?;

                let apply_type = MethodType {
                    type_params: SmallVec::new(),
                    params: proc.params.clone(),
                    block: None,
                    return_type: (*proc.return_type).clone(),
                };

                for name in ["[]", "call"] {
                    if let Some(method) = interface.methods.get(name).cloned() {
                        interface
                            .methods
                            .insert(name.to_string(), method.with_types(vec![apply_type.clone()]));
                    }
                }

                Ok(interface)
            }

            Type::Top | Type::Bot => Err(FatalError::CannotResolve { ty: ty.clone() }),
        }
    }

    /// Methods available on every member: keep the more general signature
    /// when one side subsumes the other, merge same-shape overloads into a
    /// union-return overload, and drop what cannot be reconciled.
    fn intersect_methods(
        &mut self,
        existing: IndexMap<String, Method>,
        new: &IndexMap<String, Method>,
    ) -> Result<IndexMap<String, Method>, FatalError> {
        let mut intersection = IndexMap::new();

        for (name, new_method) in new {
            let Some(existing_method) = existing.get(name) else {
                continue;
            };

            if new_method == existing_method {
                intersection.insert(name.clone(), new_method.clone());
            } else if self.method_subtype(name, new_method, existing_method)? {
                intersection.insert(name.clone(), existing_method.clone());
            } else if self.method_subtype(name, existing_method, new_method)? {
                intersection.insert(name.clone(), new_method.clone());
            } else {
                let mut merged = Vec::new();
                for existing_type in &existing_method.types {
                    for new_type in &new_method.types {
                        if existing_type.params == new_type.params
                            && existing_type.block == new_type.block
                            && existing_type.type_params == new_type.type_params
                        {
                            merged.push(existing_type.with_return_type(Type::union(vec![
                                existing_type.return_type.clone(),
                                new_type.return_type.clone(),
                            ])));
                        }
                    }
                }

                if merged.is_empty() {
                    tracing::debug!(method = %name, "incompatible signatures, method dropped from union interface");
                } else {
                    intersection.insert(name.clone(), Method::new(name.clone(), merged));
                }
            }
        }

        Ok(intersection)
    }

    /// Methods available on any member: the more specific signature wins,
    /// and incomparable signatures keep both overload lists.
    fn union_methods(
        &mut self,
        mut existing: IndexMap<String, Method>,
        new: &IndexMap<String, Method>,
    ) -> Result<IndexMap<String, Method>, FatalError> {
        for (name, method) in new {
            match existing.get(name) {
                None => {
                    existing.insert(name.clone(), method.clone());
                }
                Some(current) if current == method => {}
                Some(current) => {
                    let current = current.clone();
                    if self.method_subtype(name, method, &current)? {
                        existing.insert(name.clone(), method.clone());
                    } else if self.method_subtype(name, &current, method)? {
                        // keep the existing entry
                    } else {
                        let mut types = current.types.clone();
                        types.extend(method.types.iter().cloned());
                        existing.insert(name.clone(), Method::new(name.clone(), types));
                    }
                }
            }
        }

        Ok(existing)
    }

    /// Self-contained method comparison for interface synthesis: fresh
    /// constraints, no assumptions, throwaway trace.
    fn method_subtype(&mut self, name: &str, sub: &Method, sup: &Method) -> Result<bool, FatalError> {
        let mut constraints = Constraints::empty();
        let mut trace = Trace::empty();
        let result = self.check_method(
            name,
            sub,
            sup,
            &mut constraints,
            &Assumption::empty(),
            &mut trace,
        )?;
        Ok(result.is_success())
    }

    /// The class-side type of a nominal, when its declaration is known.
    pub(crate) fn module_type(&self, ty: &Type) -> Option<Type> {
        let Type::Name { name, .. } = ty else {
            return None;
        };
        let decl_name = name.name();
        if self.builder.is_class(decl_name) {
            Some(Type::class_of(decl_name, None))
        } else if self.builder.is_module(decl_name) {
            Some(Type::module_of(decl_name))
        } else {
            None
        }
    }

    /// Expand alias references transparently, including inside unions and
    /// intersections, applying the alias's own type arguments.
    pub fn expand_alias(&self, ty: &Type) -> Result<Type, FatalError> {
        match ty {
            Type::Union(types) => {
                let members = types
                    .iter()
                    .map(|t| self.expand_alias(t))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Type::union(members))
            }
            Type::Intersection(types) => {
                let members = types
                    .iter()
                    .map(|t| self.expand_alias(t))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Type::intersection(members))
            }
            Type::Name {
                name: TypeName::Alias(alias_name),
                args,
            } => {
                let decl =
                    self.builder
                        .find_alias(alias_name)
                        .ok_or_else(|| FatalError::UnknownAlias {
                            name: alias_name.clone(),
                        })?;
                let args = args
                    .iter()
                    .map(|t| self.expand_alias(t))
                    .collect::<Result<Vec<_>, _>>()?;
                let s = Substitution::build(&decl.params, &args);
                self.expand_alias(&decl.ty.subst(&s))
            }
            _ => Ok(ty.clone()),
        }
    }
}
