//! Collection aggregates and their null handling.

mod common;
use common::{scores, shop, verify_query};

#[test]
fn link_collection_aggregates() {
    let fixture = shop();
    let store = &fixture.store;
    let t = fixture.people;

    // item prices per person: [5.5,4.0,9.5,6.5], [5.5]*10, [9.5,9.5,6.5]
    verify_query(store, t, "items.@min.price == 4.0", 1);
    verify_query(store, t, "items.@min.price == 5.5", 1);
    verify_query(store, t, "items.@max.price == 9.5", 2);
    verify_query(store, t, "items.@sum.price > 30", 1);
    verify_query(store, t, "items.@avg.price > 6", 2);
    verify_query(store, t, "items.@count == 10", 1);
    verify_query(store, t, "items.@size == 10", 1);
    verify_query(store, t, "customer_id < items.@count", 3);
    verify_query(store, t, "items.@count < account_balance", 3);
    verify_query(store, t, "items.@count == 3.1", 0);
}

#[test]
fn primitive_collection_aggregates() {
    let fixture = scores();
    let (store, t) = (&fixture.store, fixture.table);

    // lists: [10,20] [10,10] [30] [20,30,40] [10] [] [null]
    verify_query(store, t, "scores.@min == 10", 3);
    verify_query(store, t, "scores.@max == 40", 1);
    verify_query(store, t, "scores.@sum == 20", 1);
    verify_query(store, t, "scores.@avg == 30", 2);
    verify_query(store, t, "scores.@count == 2", 2);
    // null elements count as elements
    verify_query(store, t, "scores.@count == 1", 3);
}

#[test]
fn aggregate_null_handling() {
    let fixture = scores();
    let (store, t) = (&fixture.store, fixture.table);

    // sum of an empty or all-null list is zero
    verify_query(store, t, "scores.@sum == 0", 2);
    // avg/min/max are null exactly for the empty and all-null lists
    verify_query(store, t, "scores.@avg == NULL", 2);
    verify_query(store, t, "scores.@min == NULL", 2);
    verify_query(store, t, "scores.@max == NULL", 2);
    verify_query(store, t, "scores.@avg != NULL", 5);
}

#[test]
fn string_and_binary_sizes() {
    let fixture = common::people();
    let (store, t) = (&fixture.store, fixture.table);

    // names: Billy(5) Bob(3) Joe(3) Jane(4) Joel(4)
    verify_query(store, t, "name.@size > 3", 3);
    verify_query(store, t, "name.@count > 3", 3);
    verify_query(store, t, "name.@size == 0", 0);
    // binary: "oe", "eo", null, null, null
    verify_query(store, t, "binary.@size == 2", 2);
    // a null has no size
    verify_query(store, t, "binary.@size == NULL", 3);
}

#[test]
fn scalar_link_count() {
    let fixture = common::people();
    let (store, t) = (&fixture.store, fixture.table);

    // buddy set on two rows only
    verify_query(store, t, "buddy.@count == 1", 2);
    verify_query(store, t, "buddy.@count == 0", 3);
    verify_query(store, t, "age == list.@count", 1); // row 1: age 1, one entry
}

#[test]
fn type_of_mixed() {
    let mut store = tether_store::Store::new();
    let t = store.add_table("any").unwrap();
    let value = store
        .add_column(
            t,
            tether_store::ColumnSpec::new("value", tether_store::ColumnType::Mixed),
        )
        .unwrap();
    let rows: Vec<_> = (0..4).map(|_| store.create_object(t).unwrap()).collect();
    store.set(rows[0], value, tether_store::Value::Int(7)).unwrap();
    store
        .set(rows[1], value, tether_store::Value::String("x".into()))
        .unwrap();
    store
        .set(rows[2], value, tether_store::Value::Double(1.5))
        .unwrap();
    // rows[3] stays null

    verify_query(&store, t, "value.@type == 'int'", 1);
    verify_query(&store, t, "value.@type == 'string'", 1);
    verify_query(&store, t, "value.@type == 'double'", 1);
    verify_query(&store, t, "value.@type == 'null'", 1);
    // mixed columns compare across types: only the int matches
    verify_query(&store, t, "value == 7", 1);
    verify_query(&store, t, "value != 7", 3);
}
