//! Public API checks for pointcut parsing and designator interpretation.

#![expect(clippy::expect_used, reason = "tests assert the success path")]

use regex::Regex;

use weaver_pointcut::{
    Designator, Expr, PointcutError, TypePattern, build_type_regex, parse, parse_pointcut,
};

#[test]
fn parse_smoke_test() {
    let expr = parse("A & (B | C)").expect("pointcut should parse");
    assert_eq!(
        expr,
        Expr::and(
            Expr::identifier("A"),
            Expr::or(Expr::identifier("B"), Expr::identifier("C")),
        )
    );
    assert!(parse("(A | B) & C").is_err());
}

#[test]
fn parse_is_stable_through_the_printer() {
    let text = "execution:public app..*Service->get* & within:app.Repo+ | initialization:app.Repo";
    let expr = parse(text).expect("pointcut should parse");
    let reparsed = parse(&expr.to_string()).expect("printed pointcut should parse");
    assert_eq!(reparsed, expr);
}

#[test]
fn interprets_every_leaf() {
    let (_, leaves) = parse_pointcut("@execution:Cacheable & within:app.. | function:app.util.*")
        .expect("pointcut should parse");
    assert_eq!(
        leaves,
        vec![
            Designator::ExecutionTag("Cacheable".into()),
            Designator::Within(TypePattern {
                glob: "app..".into(),
                include_subtypes: false,
            }),
            Designator::Function("app.util.*".into()),
        ]
    );
}

#[test]
fn separates_syntax_errors_from_designator_errors() {
    let syntax = parse_pointcut("within:app.* &").expect_err("dangling operator");
    assert!(syntax.is_syntax());

    let designator = parse_pointcut("within:app.* & nonsense").expect_err("unknown designator");
    assert!(matches!(designator, PointcutError::Designator(_)));
}

#[test]
fn type_regex_compiles() {
    let source = build_type_regex("app..Repo").expect("pattern should compile");
    let regex = Regex::new(&source).expect("regex should compile");
    assert!(regex.is_match("app.storage.Repo"));
}
