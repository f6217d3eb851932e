use scarp_core::{Block, Method, MethodType, Params, Type};
use smallvec::SmallVec;

use crate::check::SubtypeChecker;
use crate::constraints::Constraints;
use crate::method_match::{match_method_type, match_params};
use crate::relation::Assumption;
use crate::result::{CheckError, CheckResult};
use crate::test_support::{TestBuilder, inst, mt, pos};
use crate::trace::Trace;

fn run_method(
    checker: &mut SubtypeChecker<'_, TestBuilder>,
    sub: &Method,
    sup: &Method,
) -> CheckResult {
    let mut constraints = Constraints::empty();
    let mut trace = Trace::empty();
    checker
        .check_method("m", sub, sup, &mut constraints, &Assumption::empty(), &mut trace)
        .expect("check_method should not hit a fatal error")
}

#[test]
fn match_params_pairs_positionals_by_index() {
    let trace = Trace::empty();
    let sub = pos(vec![inst("::Integer"), inst("::String")]);
    let sup = pos(vec![inst("::Object"), inst("::Object")]);

    let pairs = match_params("m", &sub, &sup, &trace).expect("should match");
    assert_eq!(
        pairs,
        vec![
            (inst("::Integer"), inst("::Object")),
            (inst("::String"), inst("::Object")),
        ]
    );
}

#[test]
fn match_params_leftover_optional_is_fine_leftover_required_is_not() {
    let trace = Trace::empty();

    let sub = Params {
        required: vec![inst("::Integer")],
        optional: vec![inst("::String")],
        ..Params::default()
    };
    let sup = pos(vec![inst("::Integer")]);
    let pairs = match_params("m", &sub, &sup, &trace).expect("should match");
    assert_eq!(pairs, vec![(inst("::Integer"), inst("::Integer"))]);

    let sub = pos(vec![inst("::Integer"), inst("::String")]);
    let result = match_params("m", &sub, &sup, &trace);
    assert!(matches!(
        result,
        Err(failure) if matches!(failure.error, CheckError::ParameterMismatch { .. })
    ));
}

#[test]
fn match_params_sub_needs_rest_when_super_has_one() {
    let trace = Trace::empty();

    let sup = Params {
        rest: Some(Box::new(inst("::Object"))),
        ..Params::default()
    };

    assert!(match_params("m", &Params::empty(), &sup, &trace).is_err());

    let sub = Params {
        required: vec![inst("::Integer")],
        rest: Some(Box::new(inst("::String"))),
        ..Params::default()
    };
    let pairs = match_params("m", &sub, &sup, &trace).expect("should match");
    assert_eq!(
        pairs,
        vec![
            (inst("::Integer"), inst("::Object")),
            (inst("::String"), inst("::Object")),
        ]
    );
}

#[test]
fn match_params_sub_rest_absorbs_extra_super_positionals() {
    let trace = Trace::empty();

    let sub = Params {
        required: vec![inst("::Integer")],
        rest: Some(Box::new(inst("::Object"))),
        ..Params::default()
    };
    let sup = pos(vec![inst("::Integer"), inst("::String"), inst("::Symbol")]);

    let pairs = match_params("m", &sub, &sup, &trace).expect("should match");
    assert_eq!(
        pairs,
        vec![
            (inst("::Integer"), inst("::Integer")),
            (inst("::Object"), inst("::String")),
            (inst("::Object"), inst("::Symbol")),
        ]
    );
}

#[test]
fn match_params_keywords_align_by_name() {
    let trace = Trace::empty();

    let sub = Params {
        required_keywords: vec![("size".to_string(), inst("::Integer"))],
        optional_keywords: vec![("name".to_string(), inst("::String"))],
        ..Params::default()
    };
    let sup = Params {
        required_keywords: vec![
            ("size".to_string(), inst("::Integer")),
            ("name".to_string(), inst("::String")),
        ],
        ..Params::default()
    };

    let pairs = match_params("m", &sub, &sup, &trace).expect("should match");
    assert_eq!(
        pairs,
        vec![
            (inst("::Integer"), inst("::Integer")),
            (inst("::String"), inst("::String")),
        ]
    );

    // a keyword the super side never mentions but the sub side requires
    let sup = Params {
        required_keywords: vec![("size".to_string(), inst("::Integer"))],
        optional_keywords: vec![("name".to_string(), inst("::String"))],
        ..Params::default()
    };
    assert!(match_params("m", &sub, &sup, &trace).is_err());
}

#[test]
fn match_params_keyword_rest_absorbs_unmatched_keywords() {
    let trace = Trace::empty();

    let sub = Params {
        rest_keywords: Some(Box::new(inst("::Object"))),
        ..Params::default()
    };
    let sup = Params {
        required_keywords: vec![("size".to_string(), inst("::Integer"))],
        rest_keywords: Some(Box::new(inst("::String"))),
        ..Params::default()
    };

    let pairs = match_params("m", &sub, &sup, &trace).expect("should match");
    assert_eq!(
        pairs,
        vec![
            (inst("::Object"), inst("::Integer")),
            (inst("::Object"), inst("::String")),
        ]
    );

    let bare = Params::empty();
    assert!(match_params("m", &bare, &sup, &trace).is_err());
}

#[test]
fn match_method_type_appends_returns_and_swaps_blocks() {
    let trace = Trace::empty();

    let sub = MethodType {
        type_params: SmallVec::new(),
        params: pos(vec![inst("::Integer")]),
        block: Some(Block {
            params: pos(vec![inst("::String")]),
            return_type: inst("::Symbol"),
            optional: false,
        }),
        return_type: inst("::Object"),
    };
    let sup = MethodType {
        type_params: SmallVec::new(),
        params: pos(vec![inst("::Integer")]),
        block: Some(Block {
            params: pos(vec![inst("::String")]),
            return_type: inst("::Symbol"),
            optional: false,
        }),
        return_type: inst("::Object"),
    };

    let pairs = match_method_type("m", &sub, &sup, &trace).expect("should match");
    assert_eq!(
        pairs,
        vec![
            (inst("::Integer"), inst("::Integer")),
            (inst("::Object"), inst("::Object")),
            (inst("::String"), inst("::String")),
            (inst("::Symbol"), inst("::Symbol")),
        ]
    );

    let blockless = mt(pos(vec![inst("::Integer")]), inst("::Object"));
    let result = match_method_type("m", &blockless, &sup, &trace);
    assert!(matches!(
        result,
        Err(failure) if matches!(failure.error, CheckError::BlockMismatch { .. })
    ));
}

#[test]
fn method_params_are_contravariant() {
    let builder = TestBuilder::standard();
    let mut checker = SubtypeChecker::new(&builder);

    let sub = Method::new("m", vec![mt(pos(vec![inst("::Object")]), inst("::String"))]);
    let sup = Method::new("m", vec![mt(pos(vec![inst("::Integer")]), inst("::String"))]);
    assert!(run_method(&mut checker, &sub, &sup).is_success());
    assert!(run_method(&mut checker, &sup, &sub).is_failure());
}

#[test]
fn any_sub_overload_satisfies_a_super_overload() {
    let builder = TestBuilder::standard();
    let mut checker = SubtypeChecker::new(&builder);

    let sub = Method::new(
        "m",
        vec![
            mt(Params::empty(), inst("::String")),
            mt(Params::empty(), inst("::Integer")),
        ],
    );
    let sup = Method::new("m", vec![mt(Params::empty(), inst("::Integer"))]);
    assert!(run_method(&mut checker, &sub, &sup).is_success());

    let sub = Method::new("m", vec![mt(Params::empty(), inst("::String"))]);
    assert!(run_method(&mut checker, &sub, &sup).is_failure());
}

#[test]
fn block_optionality() {
    let builder = TestBuilder::standard();
    let mut checker = SubtypeChecker::new(&builder);

    let block = Block {
        params: pos(vec![inst("::Integer")]),
        return_type: inst("::Object"),
        optional: true,
    };
    let with_optional_block = Method::new(
        "m",
        vec![MethodType {
            type_params: SmallVec::new(),
            params: Params::empty(),
            block: Some(block),
            return_type: inst("::Object"),
        }],
    );
    let blockless = Method::new("m", vec![mt(Params::empty(), inst("::Object"))]);

    // an optional block can satisfy a blockless signature
    assert!(run_method(&mut checker, &with_optional_block, &blockless).is_success());

    // a blockless method cannot satisfy one that takes a block
    let result = run_method(&mut checker, &blockless, &with_optional_block);
    assert!(matches!(
        result.error(),
        Some(CheckError::BlockMismatch { .. })
    ));
}

#[test]
fn block_params_are_covariant_and_block_returns_contravariant() {
    let builder = TestBuilder::standard();
    let mut checker = SubtypeChecker::new(&builder);

    let method = |param: Type, ret: Type| {
        Method::new(
            "m",
            vec![MethodType {
                type_params: SmallVec::new(),
                params: Params::empty(),
                block: Some(Block {
                    params: pos(vec![param]),
                    return_type: ret,
                    optional: false,
                }),
                return_type: inst("::Object"),
            }],
        )
    };

    // sub block yields a narrower value to the caller's block
    let sub = method(inst("::Integer"), inst("::Object"));
    let sup = method(inst("::Object"), inst("::Object"));
    assert!(run_method(&mut checker, &sub, &sup).is_success());
    assert!(run_method(&mut checker, &sup, &sub).is_failure());

    // sub block may demand less of the block's result
    let sub = method(inst("::Integer"), inst("::Object"));
    let sup = method(inst("::Integer"), inst("::Integer"));
    assert!(run_method(&mut checker, &sub, &sup).is_success());
    assert!(run_method(&mut checker, &sup, &sub).is_failure());
}

#[test]
fn generic_sub_overload_binds_against_monomorphic_super() {
    let builder = TestBuilder::standard();
    let mut checker = SubtypeChecker::new(&builder);

    let generic = Method::new(
        "m",
        vec![MethodType {
            type_params: SmallVec::from_vec(vec!["X".to_string()]),
            params: pos(vec![Type::var("X")]),
            block: None,
            return_type: Type::var("X"),
        }],
    );

    let identity_on_integers =
        Method::new("m", vec![mt(pos(vec![inst("::Integer")]), inst("::Integer"))]);
    assert!(run_method(&mut checker, &generic, &identity_on_integers).is_success());

    // the recovered binding must be consistent across positions
    let mixed = Method::new("m", vec![mt(pos(vec![inst("::String")]), inst("::Integer"))]);
    assert!(run_method(&mut checker, &generic, &mixed).is_failure());
}

#[test]
fn generic_method_binds_through_params_block_and_return() {
    let builder = TestBuilder::standard();
    let mut checker = SubtypeChecker::new(&builder);

    // [A, B] (A) { (A) -> B } -> B
    let generic = Method::new(
        "m",
        vec![MethodType {
            type_params: SmallVec::from_vec(vec!["A".to_string(), "B".to_string()]),
            params: pos(vec![Type::var("A")]),
            block: Some(Block {
                params: pos(vec![Type::var("A")]),
                return_type: Type::var("B"),
                optional: false,
            }),
            return_type: Type::var("B"),
        }],
    );

    // the call-site view: (::Integer) { (::Integer) -> ::String } -> ::String
    let call_site = Method::new(
        "m",
        vec![MethodType {
            type_params: SmallVec::new(),
            params: pos(vec![inst("::Integer")]),
            block: Some(Block {
                params: pos(vec![inst("::Integer")]),
                return_type: inst("::String"),
                optional: false,
            }),
            return_type: inst("::String"),
        }],
    );

    assert!(run_method(&mut checker, &generic, &call_site).is_success());
}

#[test]
fn generic_overloads_with_matching_arity_share_fresh_variables() {
    let builder = TestBuilder::standard();
    let mut checker = SubtypeChecker::new(&builder);

    let make = |name: &str| {
        Method::new(
            "m",
            vec![MethodType {
                type_params: SmallVec::from_vec(vec![name.to_string()]),
                params: pos(vec![Type::var(name)]),
                block: None,
                return_type: Type::var(name),
            }],
        )
    };

    assert!(run_method(&mut checker, &make("X"), &make("Y")).is_success());
}

#[test]
fn generic_arity_mismatch_is_poly_method_subtyping() {
    let builder = TestBuilder::standard();
    let mut checker = SubtypeChecker::new(&builder);

    let two = Method::new(
        "m",
        vec![MethodType {
            type_params: SmallVec::from_vec(vec!["X".to_string(), "Y".to_string()]),
            params: pos(vec![Type::var("X"), Type::var("Y")]),
            block: None,
            return_type: Type::var("X"),
        }],
    );
    let one = Method::new(
        "m",
        vec![MethodType {
            type_params: SmallVec::from_vec(vec!["X".to_string()]),
            params: pos(vec![Type::var("X"), Type::var("X")]),
            block: None,
            return_type: Type::var("X"),
        }],
    );

    let result = run_method(&mut checker, &two, &one);
    assert!(matches!(
        result.error(),
        Some(CheckError::PolyMethodSubtyping { .. })
    ));
}
