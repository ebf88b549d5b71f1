// Property tests: well-typed filter trees validate, mistyped ones do not

use proptest::prelude::*;
use quarry_core::errors::QuarryError;
use quarry_core::rules::validation::{validate_filter, MAX_FILTER_DEPTH};
use quarry_core::{Entity, Filter, Predicate, Quantifier};

fn category_filter() -> impl Strategy<Value = Filter> {
    prop_oneof![
        "[a-zA-Z %_]{0,8}".prop_map(|s| Filter::field("name", Predicate::contains(s))),
        (0i64..10).prop_map(|id| Filter::equals("id", id)),
    ]
}

fn user_filter() -> impl Strategy<Value = Filter> {
    prop_oneof![
        "[a-z]{1,6}".prop_map(|s| Filter::equals("name", s)),
        prop::sample::select(vec!["USER", "ADMIN"]).prop_map(|r| Filter::equals("role", r)),
    ]
}

/// Leaves on Post: scalar predicates and quantified relation filters
fn post_leaf() -> impl Strategy<Value = Filter> {
    prop_oneof![
        (-5i64..50).prop_map(|n| Filter::field("likeNum", Predicate::gt(n))),
        "[a-z ]{0,8}".prop_map(|s| Filter::field("title", Predicate::starts_with(s))),
        any::<bool>().prop_map(|b| Filter::equals("published", b)),
        prop::collection::vec(0i64..10, 0..4).prop_map(|ids| {
            Filter::field("authorId", Predicate::In(ids.into_iter().map(Into::into).collect()))
        }),
        user_filter().prop_map(|f| Filter::is("author", f)),
        user_filter().prop_map(|f| Filter::is_not("author", f)),
        (
            prop::sample::select(vec![Quantifier::Every, Quantifier::Some, Quantifier::None]),
            category_filter()
        )
            .prop_map(|(q, f)| Filter::relation("categories", q, f)),
    ]
}

fn post_filter() -> impl Strategy<Value = Filter> {
    post_leaf().prop_recursive(4, 24, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(Filter::and),
            prop::collection::vec(inner.clone(), 0..4).prop_map(Filter::or),
            inner.prop_map(Filter::negate),
        ]
    })
}

proptest! {
    #[test]
    fn prop_well_typed_post_filters_validate(filter in post_filter()) {
        prop_assert!(filter.depth() <= MAX_FILTER_DEPTH);
        prop_assert!(validate_filter(Entity::Post, &filter).is_ok(), "{:?}", filter);
    }

    #[test]
    fn prop_to_many_quantifier_on_author_rejected(
        filter in post_filter(),
        inner in user_filter(),
        quantifier in prop::sample::select(vec![Quantifier::Every, Quantifier::Some, Quantifier::None]),
    ) {
        // A single bad node anywhere poisons the whole tree
        let poisoned = filter.and_also(Filter::relation("author", quantifier, inner));
        let err = validate_filter(Entity::Post, &poisoned).unwrap_err();
        let is_mismatch = matches!(err, QuarryError::QuantifierMismatch { .. });
        prop_assert!(is_mismatch);
    }
}

#[test]
fn test_filter_deeper_than_limit_rejected() {
    let mut filter = Filter::equals("published", true);
    for _ in 0..MAX_FILTER_DEPTH {
        filter = Filter::negate(filter);
    }

    let err = validate_filter(Entity::Post, &filter).unwrap_err();

    assert!(matches!(err, QuarryError::InvalidDescriptor { .. }));
}
