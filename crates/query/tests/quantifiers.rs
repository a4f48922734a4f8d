//! ANY/SOME/ALL/NONE over collections, including the vacuous-truth rules
//! for empty collections.

mod common;
use common::{scores, verify_query};

// score lists: [10,20] [10,10] [30] [20,30,40] [10] [] [null]

#[test]
fn any_is_the_implicit_quantifier() {
    let fixture = scores();
    let (store, t) = (&fixture.store, fixture.table);

    verify_query(store, t, "scores == 10", 3);
    verify_query(store, t, "ANY scores == 10", 3);
    verify_query(store, t, "SOME scores == 10", 3);
    verify_query(store, t, "ANY scores > 25", 2);
    // ANY over the empty list is false; the null-element list matches
    // nothing but null
    verify_query(store, t, "ANY scores == 0", 0);
}

#[test]
fn all_is_vacuously_true_on_empty() {
    let fixture = scores();
    let (store, t) = (&fixture.store, fixture.table);

    // [10,10], [10] and the empty list
    verify_query(store, t, "ALL scores == 10", 3);
    // every populated list has elements >= 10, nulls never satisfy ordering
    verify_query(store, t, "ALL scores >= 10", 6);
    verify_query(store, t, "ALL scores > 100", 1); // only the empty list
}

#[test]
fn none_is_vacuously_true_on_empty() {
    let fixture = scores();
    let (store, t) = (&fixture.store, fixture.table);

    // rows without a 10: [30], [20,30,40], [], [null]
    verify_query(store, t, "NONE scores == 10", 4);
    verify_query(store, t, "NONE scores > 100", 7);
}

#[test]
fn null_elements_participate_in_equality() {
    let fixture = scores();
    let (store, t) = (&fixture.store, fixture.table);

    // only the list holding a null element matches
    verify_query(store, t, "ANY scores == NULL", 1);
    verify_query(store, t, "NONE scores == NULL", 6);
}

#[test]
fn quantified_link_collections() {
    let fixture = common::shop();
    let store = &fixture.store;
    let t = fixture.people;

    // person 1 buys only milk
    verify_query(store, t, "ALL items.name == 'milk'", 1);
    verify_query(store, t, "NONE items.name == 'milk'", 1);
    verify_query(store, t, "ANY items.price > 9.0", 2);
    verify_query(store, t, "ALL items.price > 5.0", 2);
}
