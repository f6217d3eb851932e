//! Hand-built signature environment for engine tests.

use indexmap::IndexMap;
use scarp_core::{
    Block, Interface, Method, MethodType, Params, Type, TypeName, VarName,
};
use smallvec::SmallVec;

use crate::builder::{AliasDecl, InterfaceBuilder};
use crate::check::SubtypeChecker;
use crate::constraints::Constraints;
use crate::relation::{Assumption, Relation};
use crate::result::{CheckResult, FatalError};
use crate::trace::Trace;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DeclKind {
    Class,
    Module,
}

#[derive(Debug, Clone)]
pub(crate) struct Decl {
    pub(crate) params: Vec<VarName>,
    pub(crate) kind: DeclKind,
    pub(crate) methods: Vec<(String, Vec<MethodType>)>,
}

/// In-memory signature table.
#[derive(Debug, Clone, Default)]
pub(crate) struct TestBuilder {
    decls: IndexMap<String, Decl>,
    aliases: IndexMap<String, AliasDecl>,
}

impl TestBuilder {
    pub(crate) fn new() -> TestBuilder {
        TestBuilder::default()
    }

    pub(crate) fn add_class(
        &mut self,
        name: &str,
        params: Vec<VarName>,
        methods: Vec<(&str, Vec<MethodType>)>,
    ) {
        self.decls.insert(
            name.to_string(),
            Decl {
                params,
                kind: DeclKind::Class,
                methods: methods
                    .into_iter()
                    .map(|(name, types)| (name.to_string(), types))
                    .collect(),
            },
        );
    }

    pub(crate) fn add_module(
        &mut self,
        name: &str,
        methods: Vec<(&str, Vec<MethodType>)>,
    ) {
        self.decls.insert(
            name.to_string(),
            Decl {
                params: vec![],
                kind: DeclKind::Module,
                methods: methods
                    .into_iter()
                    .map(|(name, types)| (name.to_string(), types))
                    .collect(),
            },
        );
    }

    pub(crate) fn add_alias(&mut self, name: &str, params: Vec<VarName>, ty: Type) {
        self.aliases
            .insert(name.to_string(), AliasDecl { params, ty });
    }

    /// The environment most tests run against.
    pub(crate) fn standard() -> TestBuilder {
        let mut builder = TestBuilder::new();
        let string = inst("::String");
        let integer = inst("::Integer");

        builder.add_class("::Object", vec![], vec![("to_s", vec![mt(Params::empty(), string.clone())])]);
        builder.add_class(
            "::Integer",
            vec![],
            vec![
                ("to_s", vec![mt(Params::empty(), string.clone())]),
                ("+", vec![mt(pos(vec![integer.clone()]), integer.clone())]),
            ],
        );
        builder.add_class(
            "::String",
            vec![],
            vec![
                ("to_s", vec![mt(Params::empty(), string.clone())]),
                ("size", vec![mt(Params::empty(), integer.clone())]),
            ],
        );
        builder.add_class("::Symbol", vec![], vec![("to_s", vec![mt(Params::empty(), string.clone())])]);
        builder.add_class("::TrueClass", vec![], vec![("to_s", vec![mt(Params::empty(), string.clone())])]);
        builder.add_class("::FalseClass", vec![], vec![("to_s", vec![mt(Params::empty(), string.clone())])]);
        builder.add_class("::NilClass", vec![], vec![("to_s", vec![mt(Params::empty(), string.clone())])]);

        let elem = Type::var("A");
        builder.add_class(
            "::Array",
            vec!["A".to_string()],
            vec![
                ("[]", vec![mt(pos(vec![integer.clone()]), elem.clone())]),
                (
                    "[]=",
                    vec![mt(pos(vec![integer.clone(), elem.clone()]), elem.clone())],
                ),
                ("size", vec![mt(Params::empty(), integer.clone())]),
                (
                    "map",
                    vec![MethodType {
                        type_params: SmallVec::from_vec(vec!["X".to_string()]),
                        params: Params::empty(),
                        block: Some(Block {
                            params: pos(vec![elem.clone()]),
                            return_type: Type::var("X"),
                            optional: false,
                        }),
                        return_type: Type::instance("::Array", vec![Type::var("X")]),
                    }],
                ),
            ],
        );

        let any_rest = Params {
            rest: Some(Box::new(Type::Any)),
            ..Params::default()
        };
        builder.add_class(
            "::Proc",
            vec![],
            vec![
                ("call", vec![mt(any_rest.clone(), Type::Any)]),
                ("[]", vec![mt(any_rest, Type::Any)]),
            ],
        );

        builder.add_class(
            "::A",
            vec![],
            vec![
                ("foo", vec![mt(Params::empty(), integer.clone())]),
                ("bar", vec![mt(Params::empty(), string.clone())]),
            ],
        );
        builder.add_class(
            "::B",
            vec![],
            vec![("foo", vec![mt(Params::empty(), integer.clone())])],
        );

        builder.add_class(
            "::StreamA",
            vec![],
            vec![("next", vec![mt(Params::empty(), inst("::StreamA"))])],
        );
        builder.add_class(
            "::StreamB",
            vec![],
            vec![("next", vec![mt(Params::empty(), inst("::StreamB"))])],
        );

        builder.add_module(
            "::Greeting",
            vec![("greet", vec![mt(Params::empty(), string.clone())])],
        );

        builder.add_alias(
            "str_or_int",
            vec![],
            Type::union(vec![string, integer]),
        );
        builder.add_alias(
            "list",
            vec!["A".to_string()],
            Type::instance("::Array", vec![Type::var("A")]),
        );

        builder
    }
}

impl InterfaceBuilder for TestBuilder {
    fn build(&self, name: &TypeName, with_initialize: bool) -> Result<Interface, FatalError> {
        let decl = self
            .decls
            .get(name.name())
            .ok_or_else(|| FatalError::UnknownTypeName { name: name.clone() })?;

        match name {
            TypeName::Instance(_) | TypeName::Interface(_) => {
                let methods = decl
                    .methods
                    .iter()
                    .filter(|(method_name, _)| with_initialize || method_name != "initialize")
                    .map(|(method_name, types)| {
                        (
                            method_name.clone(),
                            Method::new(method_name.clone(), types.clone()),
                        )
                    })
                    .collect();
                Ok(Interface {
                    type_params: decl.params.clone(),
                    methods,
                    ivar_chains: IndexMap::new(),
                })
            }
            TypeName::Class { .. } | TypeName::Module(_) => {
                let mut methods = IndexMap::new();
                methods.insert(
                    "new".to_string(),
                    Method::new("new", vec![mt(Params::empty(), Type::Instance)]),
                );
                Ok(Interface {
                    type_params: vec![],
                    methods,
                    ivar_chains: IndexMap::new(),
                })
            }
            TypeName::Alias(alias_name) => Err(FatalError::UnknownAlias {
                name: alias_name.clone(),
            }),
        }
    }

    fn is_class(&self, name: &str) -> bool {
        self.decls
            .get(name)
            .is_some_and(|decl| decl.kind == DeclKind::Class)
    }

    fn is_module(&self, name: &str) -> bool {
        self.decls
            .get(name)
            .is_some_and(|decl| decl.kind == DeclKind::Module)
    }

    fn find_alias(&self, name: &str) -> Option<AliasDecl> {
        self.aliases.get(name).cloned()
    }

    fn class_or_module_params(&self, name: &str) -> Option<Vec<VarName>> {
        self.decls.get(name).map(|decl| decl.params.clone())
    }
}

pub(crate) fn inst(name: &str) -> Type {
    Type::instance(name, vec![])
}

pub(crate) fn pos(types: Vec<Type>) -> Params {
    Params::positional(types)
}

pub(crate) fn mt(params: Params, return_type: Type) -> MethodType {
    MethodType {
        type_params: SmallVec::new(),
        params,
        block: None,
        return_type,
    }
}

/// Install a subscriber once so `RUST_LOG` controls engine tracing in
/// test runs.
pub(crate) fn init_tracing() {
    use std::sync::Once;
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .try_init();
    });
}

/// Run a plain check: empty constraints, assumptions, and trace.
pub(crate) fn run_check(
    checker: &mut SubtypeChecker<'_, TestBuilder>,
    sub: Type,
    sup: Type,
) -> CheckResult {
    init_tracing();
    let mut constraints = Constraints::empty();
    let mut trace = Trace::empty();
    checker
        .check(
            &Relation::new(sub, sup),
            &mut constraints,
            &Assumption::empty(),
            &mut trace,
        )
        .expect("check should not hit a fatal error")
}
