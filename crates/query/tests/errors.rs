//! Semantic (bind-time) error classification.

mod common;
use common::{expect_error, people, shop};
use tether_query::{Error, KeyPathMapping, Query};

#[test]
fn unknown_property_names_the_class() {
    let fixture = shop();
    let store = &fixture.store;

    let err = expect_error(store, fixture.people, "missing_property > 2");
    match err {
        Error::InvalidQuery(message) => {
            assert!(message.contains("Person"), "got: {}", message);
            assert!(!message.contains("class_Person"), "got: {}", message);
            assert!(message.contains("missing_property"), "got: {}", message);
        }
        other => panic!("expected InvalidQuery, got {:?}", other),
    }

    let err = expect_error(store, fixture.people, "items.absent_property > 2");
    match err {
        Error::InvalidQuery(message) => {
            assert!(message.contains("Items"), "got: {}", message);
            assert!(message.contains("absent_property"), "got: {}", message);
        }
        other => panic!("expected InvalidQuery, got {:?}", other),
    }

    let err = expect_error(store, fixture.people, "items.discount.nonexistent > 2");
    assert!(matches!(err, Error::InvalidQuery(_)));
}

#[test]
fn non_link_properties_cannot_be_traversed() {
    let fixture = shop();
    let store = &fixture.store;

    let err = expect_error(store, fixture.people, "customer_id.property > 2");
    match err {
        Error::InvalidQuery(message) => {
            assert!(message.contains("customer_id"), "got: {}", message);
        }
        other => panic!("expected InvalidQuery, got {:?}", other),
    }
    let err = expect_error(store, fixture.items, "price.property > 2");
    assert!(matches!(err, Error::InvalidQuery(_)));
}

#[test]
fn link_collections_cannot_compare_with_null() {
    let fixture = shop();
    let store = &fixture.store;

    assert!(matches!(
        expect_error(store, fixture.people, "items == NULL"),
        Error::InvalidQuery(_)
    ));
    assert!(matches!(
        expect_error(store, fixture.people, "items != NULL"),
        Error::InvalidQuery(_)
    ));
}

#[test]
fn aggregate_misuse() {
    let fixture = shop();
    let store = &fixture.store;
    let t = fixture.people;

    // min/max/sum/avg need a target property through a link collection
    for q in [
        "items.@min <= 41",
        "items.@max <= 41",
        "items.@sum <= 41",
        "items.@avg <= 41",
    ] {
        assert!(matches!(expect_error(store, t, q), Error::InvalidQuery(_)), "{}", q);
    }
    // strings cannot be aggregated
    for q in [
        "items.@min.name > 2",
        "items.@max.name > 2",
        "items.@sum.name > 2",
        "items.@avg.name > 2",
    ] {
        assert!(matches!(expect_error(store, t, q), Error::InvalidQuery(_)), "{}", q);
    }
    // links cannot be aggregated
    assert!(matches!(
        expect_error(store, t, "items.@min.discount > 2"),
        Error::InvalidQuery(_)
    ));
    // aggregates need a collection
    let err = expect_error(store, t, "customer_id.@min <= 41");
    match err {
        Error::InvalidQuery(message) => {
            assert!(message.contains("list"), "got: {}", message);
            assert!(message.contains("customer_id"), "got: {}", message);
        }
        other => panic!("expected InvalidQuery, got {:?}", other),
    }
    // @size applies to strings, binaries and collections only
    assert!(matches!(
        expect_error(store, t, "customer_id.@size <= 2"),
        Error::InvalidQuery(_)
    ));
    assert!(matches!(
        expect_error(store, fixture.items, "price.@size == 2"),
        Error::InvalidQuery(_)
    ));
}

#[test]
fn incompatible_static_types() {
    let fixture = people();
    let (store, t) = (&fixture.store, fixture.table);

    assert!(matches!(
        expect_error(store, t, "name == 3"),
        Error::InvalidQuery(_)
    ));
    assert!(matches!(
        expect_error(store, t, "age == 'three'"),
        Error::InvalidQuery(_)
    ));
    assert!(matches!(
        expect_error(store, t, "age BEGINSWITH 'x'"),
        Error::InvalidQuery(_)
    ));
    assert!(matches!(
        expect_error(store, t, "time == 7"),
        Error::InvalidQuery(_)
    ));
    // numeric cross-type comparisons are fine
    assert!(Query::from_text(store, t, "fees > age", &[], &common::mapping()).is_ok());
}

#[test]
fn all_and_none_restrictions() {
    let fixture = shop();
    let store = &fixture.store;
    let t = fixture.people;

    assert!(matches!(
        expect_error(store, t, "ALL items.price == NONE items.price"),
        Error::InvalidQuery(_)
    ));
    assert!(matches!(
        expect_error(store, t, "ALL customer_id == 1"),
        Error::InvalidQuery(_)
    ));
}

#[test]
fn in_requires_a_collection() {
    let fixture = people();
    let (store, t) = (&fixture.store, fixture.table);

    assert!(matches!(
        expect_error(store, t, "age IN 5"),
        Error::InvalidQuery(_)
    ));
    assert!(matches!(
        expect_error(store, t, "age IN name"),
        Error::InvalidQuery(_)
    ));
}

#[test]
fn type_attribute_string_is_validated() {
    let mut store = tether_store::Store::new();
    let t = store.add_table("any").unwrap();
    store
        .add_column(
            t,
            tether_store::ColumnSpec::new("value", tether_store::ColumnType::Mixed),
        )
        .unwrap();

    let err = expect_error(&store, t, "value.@type == 'integer'");
    assert!(matches!(err, Error::InvalidQueryArg(_)));
    assert!(Query::from_text(&store, t, "value.@type == 'int'", &[], &common::mapping()).is_ok());
}

#[test]
fn alias_substitution_and_cycles() {
    let fixture = people();
    let (store, t) = (&fixture.store, fixture.table);

    let mut mapping = KeyPathMapping::with_class_prefix("class_");
    mapping.add_alias(t, "nickname", "name");
    mapping.add_alias(t, "pal", "buddy");
    mapping.add_alias(t, "pal_name", "buddy.name");

    let query = Query::from_text(store, t, "nickname == 'Bob'", &[], &mapping).unwrap();
    assert_eq!(query.count(store).unwrap(), 1);
    let query = Query::from_text(store, t, "pal.age > 0", &[], &mapping).unwrap();
    assert_eq!(query.count(store).unwrap(), 1);
    let query = Query::from_text(store, t, "pal_name == 'Bob'", &[], &mapping).unwrap();
    assert_eq!(query.count(store).unwrap(), 1);

    // a substitution cycle is a bind-time error
    let mut cyclic = KeyPathMapping::new();
    cyclic.add_alias(t, "a", "b");
    cyclic.add_alias(t, "b", "a");
    let err = Query::from_text(store, t, "a == 1", &[], &cyclic).unwrap_err();
    assert!(matches!(err, Error::InvalidQuery(_)));
}

#[test]
fn primitive_lists_cannot_compare_directly() {
    let fixture = common::scores();
    let (store, t) = (&fixture.store, fixture.table);

    assert!(matches!(
        expect_error(store, t, "scores == scores"),
        Error::InvalidQuery(_)
    ));
}
