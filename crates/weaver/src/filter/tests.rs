//! Unit tests for filter evaluation and designator compilation.

use std::rc::Rc;

use rstest::{fixture, rstest};
use weaver_pointcut::{ArgumentCount, parse, parse_designator};

use super::*;
use crate::Value;
use crate::call_site::JoinPointKind;

fn yes() -> Filter {
    Filter::True
}

fn no() -> Filter {
    Filter::not(Filter::True)
}

#[fixture]
fn method() -> CallSite {
    CallSite::method("app.UserRepo", "findById")
        .with_visibility(Visibility::Protected)
        .with_interface("app.Repository")
        .with_tag("Cacheable")
}

fn compiled(text: &str) -> Filter {
    let expr = parse(text).unwrap_or_else(|err| panic!("`{text}` should parse: {err}"));
    compile_expr(&expr, &PatternCache::new())
        .unwrap_or_else(|err| panic!("`{text}` should compile: {err}"))
}

#[rstest]
#[case(yes(), yes(), true)]
#[case(yes(), no(), false)]
#[case(no(), yes(), false)]
#[case(no(), no(), false)]
fn and_truth_table(
    method: CallSite,
    #[case] lhs: Filter,
    #[case] rhs: Filter,
    #[case] expected: bool,
) {
    assert_eq!(Filter::and(lhs, rhs).matches(&method), expected);
}

#[rstest]
#[case(yes(), yes(), true)]
#[case(yes(), no(), true)]
#[case(no(), yes(), true)]
#[case(no(), no(), false)]
fn or_truth_table(
    method: CallSite,
    #[case] lhs: Filter,
    #[case] rhs: Filter,
    #[case] expected: bool,
) {
    assert_eq!(Filter::or(lhs, rhs).matches(&method), expected);
}

#[rstest]
fn negated_true_never_matches(method: CallSite) {
    assert!(!no().matches(&method));
    assert!(!no().matches(&CallSite::static_init("app.UserRepo")));
    assert!(Filter::always().matches(&method));
}

#[test]
fn kind_masks_follow_the_combinators() {
    let method_only = Filter::Kind(KindMask::METHOD);
    let function_only = Filter::Kind(KindMask::FUNCTION);
    assert_eq!(
        Filter::and(method_only.clone(), function_only.clone()).kind(),
        KindMask::NONE
    );
    assert_eq!(
        Filter::or(method_only.clone(), function_only).kind(),
        KindMask::METHOD | KindMask::FUNCTION
    );
    assert_eq!(Filter::not(method_only).kind(), KindMask::METHOD);
    assert_eq!(Filter::all([]).kind(), KindMask::ALL);
}

#[rstest]
fn kind_outside_mask_is_no_match(method: CallSite) {
    let property_filter = Filter::Kind(KindMask::PROPERTY);
    assert!(!property_filter.matches(&method));
    // negation does not widen the selectable kinds
    assert!(!Filter::not(property_filter).matches(&method));
}

fn kind(mask: KindMask) -> Filter {
    Filter::Kind(mask)
}

#[rstest]
#[case::empty_intersection(
    Filter::and(kind(KindMask::METHOD), kind(KindMask::PROPERTY)),
    Verdict::No
)]
#[case::rejected_left_operand(Filter::and(kind(KindMask::PROPERTY), yes()), Verdict::No)]
#[case::short_circuit_inside_mask(Filter::and(no(), kind(KindMask::METHOD)), Verdict::Yes)]
#[case::short_circuit_outside_mask(Filter::and(no(), kind(KindMask::PROPERTY)), Verdict::No)]
#[case::union_inside_mask(Filter::or(kind(KindMask::PROPERTY), no()), Verdict::Yes)]
#[case::union_outside_mask(
    Filter::or(kind(KindMask::PROPERTY), kind(KindMask::FUNCTION)),
    Verdict::No
)]
#[case::double_negation(Filter::not(Filter::not(kind(KindMask::PROPERTY))), Verdict::No)]
fn negated_composites_respect_their_kind_mask(
    method: CallSite,
    #[case] inner: Filter,
    #[case] expected: Verdict,
) {
    let negated = Filter::not(inner);
    assert_eq!(negated.evaluate(&method, None), expected, "{negated}");
    assert_eq!(negated.kind().contains(method.kind), expected == Verdict::Yes);
}

#[rstest]
fn deep_filters_evaluate_in_one_pass(method: CallSite) {
    let chain = Filter::all((0..512).map(|_| kind(KindMask::METHOD | KindMask::PROPERTY)));
    assert_eq!(chain.evaluate(&method, None), Verdict::Yes);
    let nested = (0..512).fold(yes(), |inner, _| Filter::not(inner));
    assert_eq!(nested.evaluate(&method, None), Verdict::Yes);
    let closed = Filter::and(chain, kind(KindMask::PROPERTY));
    assert_eq!(Filter::not(closed).evaluate(&method, None), Verdict::No);
}

#[rstest]
#[case("execution:app.UserRepo->find*", true)]
#[case("execution:protected app.*Repo->find*", true)]
#[case("execution:public app.UserRepo->find*", false)]
#[case("execution:app.UserRepo::find*", false)]
#[case("execution:app.Repository->*", false)]
#[case("execution:app.Repository+->*", true)]
#[case("within:app..", true)]
#[case("within:other..", false)]
#[case("@execution:Cacheable", true)]
#[case("@access:Cacheable", false)]
#[case("access:app.UserRepo->findById", false)]
#[case("function:app.*", false)]
fn designators_select_methods(method: CallSite, #[case] text: &str, #[case] expected: bool) {
    assert_eq!(compiled(text).matches(&method), expected, "`{text}`");
}

#[rstest]
#[case(CallSite::function("app.util", "slugify"), "function:app.util.slug*", true)]
#[case(CallSite::function("app.util", "slugify"), "function:app..slugify", true)]
#[case(CallSite::function("app.util", "slugify"), "function:app.slug*", false)]
#[case(CallSite::instance_init("app.UserRepo"), "initialization:app.*Repo", true)]
#[case(CallSite::instance_init("app.UserRepo"), "staticinitialization:app.*Repo", false)]
#[case(CallSite::static_init("app.UserRepo"), "staticinitialization:app.*Repo", true)]
#[case(CallSite::property("app.Config", "DEFAULT").as_static(), "access:app.Config::DEF*", true)]
#[case(CallSite::property("app.Config", "debug").with_tag("Lazy"), "@access:Lazy", true)]
fn designators_select_other_kinds(
    #[case] call_site: CallSite,
    #[case] text: &str,
    #[case] expected: bool,
) {
    assert_eq!(compiled(text).matches(&call_site), expected, "`{text}` on {call_site}");
}

#[rstest]
fn within_distributes_over_member_alternatives(method: CallSite) {
    let filter = compiled("within:app.* & (execution:..->save | execution:..->find*)");
    assert!(filter.matches(&method));
    assert!(!filter.matches(&CallSite::method("lib.UserRepo", "findById")));
}

#[rstest]
fn dynamic_leaves_defer_to_call_time(method: CallSite) {
    let filter = Filter::and(
        compiled("execution:app.UserRepo->*"),
        Filter::Arguments(ArgumentCount::Exactly(1)),
    );
    assert!(filter.is_dynamic());
    assert_eq!(filter.evaluate(&method, None), Verdict::Maybe);
    assert!(filter.matches(&method));

    let one = vec![Rc::new(7_u32) as Value];
    let context = DynamicContext {
        call_site: &method,
        instance: None,
        arguments: &one,
    };
    assert!(filter.matches_dynamic(&context));

    let none: Vec<Value> = Vec::new();
    let context = DynamicContext {
        arguments: &none,
        ..context
    };
    assert!(!filter.matches_dynamic(&context));
}

#[rstest]
fn negated_dynamic_leaf_stays_undecided(method: CallSite) {
    let filter = Filter::not(Filter::Arguments(ArgumentCount::AtLeast(2)));
    assert_eq!(filter.evaluate(&method, None), Verdict::Maybe);
    let static_rejection = Filter::and(no(), filter);
    assert_eq!(static_rejection.evaluate(&method, None), Verdict::No);
}

#[test]
fn arguments_never_select_properties() {
    let filter = Filter::Arguments(ArgumentCount::AtLeast(0));
    assert!(!filter.matches(&CallSite::property("app.Config", "debug")));
    assert!(filter.kind().contains(JoinPointKind::InstanceInit));
}

#[test]
fn pattern_cache_reuses_compiled_regexes() {
    let cache = PatternCache::new();
    assert!(cache.is_empty());
    for text in ["within:app.*", "initialization:app.*", "within:app.*+"] {
        let designator = parse_designator(text).unwrap_or_else(|err| panic!("{err}"));
        compile_designator(&designator, &cache).unwrap_or_else(|err| panic!("{err}"));
    }
    assert_eq!(cache.len(), 1);
}

#[test]
fn unknown_designator_fails_to_compile() {
    let expr = parse("within:app.* & bogus:thing").unwrap_or_else(|err| panic!("{err}"));
    assert!(compile_expr(&expr, &PatternCache::new()).is_err());
}
