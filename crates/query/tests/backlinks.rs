//! Backlink keypaths: @links.Class.property and @links.@count.

mod common;
use common::{shop, verify_query};

#[test]
fn backlink_traversal() {
    let fixture = shop();
    let store = &fixture.store;

    // items bought by a person with a low customer id (implicit ANY over
    // the backlink fan-out)
    verify_query(
        store,
        fixture.items,
        "@links.class_Person.items.customer_id == 0",
        4,
    );
    // items bought by anyone
    verify_query(store, fixture.items, "@links.class_Person.items.@count > 0", 4);
    // items bought by more than one person
    verify_query(
        store,
        fixture.items,
        "SUBQUERY(@links.class_Person.items, $buyer, $buyer.account_balance > 15.0).@count > 0",
        3,
    );
}

#[test]
fn backlink_count_across_all_origins() {
    let fixture = shop();
    let store = &fixture.store;

    // discounts: d0 and d1 and d2 are referenced by one item each, d3 by
    // none
    verify_query(store, fixture.discounts, "@links.@count == 0", 1);
    verify_query(store, fixture.discounts, "@links.@count == 1", 3);
    // items: milk is in person 0's list once and person 1's ten times
    verify_query(store, fixture.items, "@links.@count == 11", 1);
    verify_query(store, fixture.items, "@links.@count == 0", 0);
}

#[test]
fn backlinks_through_a_chain() {
    let fixture = shop();
    let store = &fixture.store;

    // discounts whose items are owned by person 2
    verify_query(
        store,
        fixture.discounts,
        "@links.class_Items.discount.@links.class_Person.items.customer_id == 2",
        2,
    );
}
