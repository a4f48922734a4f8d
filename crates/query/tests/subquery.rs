//! SUBQUERY expressions and variable scoping.

mod common;
use common::{expect_error, shop, verify_query};
use tether_query::Error;

#[test]
fn subquery_counts_matching_elements() {
    let fixture = shop();
    let store = &fixture.store;
    let t = fixture.people;

    // people with at least one item over $5
    verify_query(store, t, "SUBQUERY(items, $x, $x.price > 5.0).@count > 0", 3);
    // people with more than one pizza
    verify_query(
        store,
        t,
        "SUBQUERY(items, $x, $x.name == 'pizza').@count > 1",
        1,
    );
    // discounted items that are active
    verify_query(
        store,
        t,
        "SUBQUERY(items, $x, $x.discount.active == true).@count > 0",
        3,
    );
    // nothing matches
    verify_query(
        store,
        t,
        "SUBQUERY(items, $x, $x.price > 100.0).@count > 0",
        0,
    );
    // combined with an outer predicate on the same row
    verify_query(
        store,
        t,
        "customer_id < 2 && SUBQUERY(items, $x, $x.price > 9.0).@count > 0",
        1,
    );
}

#[test]
fn unqualified_names_resolve_on_the_element_table() {
    let fixture = shop();
    let store = &fixture.store;
    let t = fixture.people;

    // inside the subquery, `price` is a property of the items table
    verify_query(store, t, "SUBQUERY(items, $x, price > 5.0).@count > 0", 3);
}

#[test]
fn nested_subqueries_use_distinct_variables() {
    let fixture = shop();
    let store = &fixture.store;
    let t = fixture.people;

    // every person owns at least one discounted item whose discount also
    // covers an item over $5
    verify_query(
        store,
        t,
        "SUBQUERY(items, $x, SUBQUERY($x.discount.@links.class_Items.discount, $y, \
         $y.price > 5.0).@count > 0).@count > 0",
        3,
    );
}

#[test]
fn variable_collision_is_a_bind_error() {
    let fixture = shop();
    let store = &fixture.store;
    let t = fixture.people;

    // same variable bound twice over the same table in one scope chain
    let err = expect_error(
        store,
        t,
        "SUBQUERY(items, $x, SUBQUERY($x.discount.@links.class_Items.discount, $x, \
         $x.price > 5.0).@count > 0).@count > 0",
    );
    assert!(matches!(err, Error::InvalidQuery(_)));
}

#[test]
fn subquery_requires_an_object_collection() {
    let fixture = shop();
    let store = &fixture.store;

    let err = expect_error(
        store,
        fixture.people,
        "SUBQUERY(customer_id, $x, $x == 1).@count > 0",
    );
    assert!(matches!(err, Error::InvalidQuery(_)));
    let err = expect_error(
        store,
        fixture.items,
        "SUBQUERY(discount, $x, $x.active == true).@count > 0",
    );
    assert!(matches!(err, Error::InvalidQuery(_)));
}

#[test]
fn undefined_variable_is_a_bind_error() {
    let fixture = shop();
    let err = expect_error(&fixture.store, fixture.people, "$x.price > 5.0");
    assert!(matches!(err, Error::InvalidQuery(_)));
}
