//! Shared fixtures for the query integration tests.

#![allow(dead_code)]

use chrono::NaiveDateTime;
use tether_query::{KeyPathMapping, Query};
use tether_store::{ColKey, ColumnSpec, ColumnType, GraphAccessor, ObjLink, Store, TableKey, Value};

pub fn ts(sec: i64, nanos: u32) -> NaiveDateTime {
    chrono::DateTime::from_timestamp(sec, nanos).unwrap().naive_utc()
}

pub fn col(store: &Store, table: TableKey, name: &str) -> ColKey {
    store
        .table_spec(table)
        .unwrap()
        .column_key(name)
        .unwrap_or_else(|| panic!("no column '{}'", name))
}

pub fn mapping() -> KeyPathMapping {
    KeyPathMapping::with_class_prefix("class_")
}

/// Builds and runs `text`, checks the match count, then re-parses the
/// query's description and checks that it selects the same number of rows.
pub fn verify_query(store: &Store, table: TableKey, text: &str, expected: usize) -> Query {
    verify_query_args(store, table, text, &[], expected)
}

pub fn verify_query_args(
    store: &Store,
    table: TableKey,
    text: &str,
    args: &[Value],
    expected: usize,
) -> Query {
    let mapping = mapping();
    let query = Query::from_text(store, table, text, args, &mapping)
        .unwrap_or_else(|err| panic!("query `{}` failed to build: {}", text, err));
    let view = query.find_all(store).unwrap();
    assert_eq!(view.len(), expected, "query `{}`", text);

    let description = query.description(store).unwrap();
    let round = Query::from_text(store, table, &description, &[], &mapping).unwrap_or_else(|err| {
        panic!(
            "description `{}` of `{}` failed to re-parse: {}",
            description, text, err
        )
    });
    let round_view = round.find_all(store).unwrap();
    assert_eq!(
        round_view.len(),
        expected,
        "description `{}` of `{}`",
        description,
        text
    );
    query
}

pub fn expect_error(store: &Store, table: TableKey, text: &str) -> tether_query::Error {
    expect_error_args(store, table, text, &[])
}

pub fn expect_error_args(
    store: &Store,
    table: TableKey,
    text: &str,
    args: &[Value],
) -> tether_query::Error {
    match Query::from_text(store, table, text, args, &mapping()) {
        Ok(_) => panic!("query `{}` should not bind", text),
        Err(err) => err,
    }
}

/// Five people with ages 0..5, a self-table link, a link list and a spread
/// of nullable columns.
pub struct People {
    pub store: Store,
    pub table: TableKey,
    pub rows: Vec<ObjLink>,
}

pub fn people() -> People {
    let mut store = Store::new();
    let t = store.add_table("person").unwrap();
    let age = store.add_column(t, ColumnSpec::new("age", ColumnType::Int)).unwrap();
    let name = store
        .add_column(t, ColumnSpec::new("name", ColumnType::String))
        .unwrap();
    let fees = store
        .add_column(t, ColumnSpec::new("fees", ColumnType::Double))
        .unwrap();
    let paid = store
        .add_column(t, ColumnSpec::new("paid", ColumnType::Bool).nullable())
        .unwrap();
    let time = store
        .add_column(t, ColumnSpec::new("time", ColumnType::Timestamp).nullable())
        .unwrap();
    let binary = store
        .add_column(t, ColumnSpec::new("binary", ColumnType::Binary).nullable())
        .unwrap();
    let floats = store
        .add_column(t, ColumnSpec::new("floats", ColumnType::Float).nullable())
        .unwrap();
    let buddy = store.add_column(t, ColumnSpec::link("buddy", t)).unwrap();
    let list = store.add_column(t, ColumnSpec::link("list", t).list()).unwrap();

    let names = ["Billy", "Bob", "Joe", "Jane", "Joel"];
    let fee_values = [2.0, 2.23, 2.22, 2.25, 3.73];
    let mut rows = Vec::new();
    for i in 0..5 {
        let row = store.create_object(t).unwrap();
        store.set(row, age, Value::Int(i as i64)).unwrap();
        store.set(row, name, Value::String(names[i].into())).unwrap();
        store.set(row, fees, Value::Double(fee_values[i])).unwrap();
        rows.push(row);
    }
    store.set(rows[0], paid, Value::Bool(true)).unwrap();
    store.set(rows[1], paid, Value::Bool(false)).unwrap();
    store
        .set(rows[1], time, Value::Timestamp(ts(1512130073, 505)))
        .unwrap();
    store
        .set(rows[0], binary, Value::Binary(b"oe".to_vec()))
        .unwrap();
    store
        .set(rows[1], binary, Value::Binary(b"eo".to_vec()))
        .unwrap();
    store.set(rows[0], floats, Value::Float(2.33)).unwrap();
    store.set(rows[1], floats, Value::Float(2.22)).unwrap();
    store.set(rows[0], buddy, Value::Link(rows[1])).unwrap();
    store.set(rows[1], buddy, Value::Link(rows[0])).unwrap();
    for target in [rows[0], rows[1], rows[2]] {
        store.list_push(rows[0], list, Value::Link(target)).unwrap();
    }
    store.list_push(rows[1], list, Value::Link(rows[0])).unwrap();

    People {
        store,
        table: t,
        rows,
    }
}

/// Discounts/Items/Person, for link-chain and aggregate queries.
pub struct Shop {
    pub store: Store,
    pub discounts: TableKey,
    pub items: TableKey,
    pub people: TableKey,
}

pub fn shop() -> Shop {
    let mut store = Store::new();
    let discounts = store.add_table("class_Discounts").unwrap();
    let promotion = store
        .add_column(
            discounts,
            ColumnSpec::new("promotion", ColumnType::String).nullable(),
        )
        .unwrap();
    let reduced_by = store
        .add_column(discounts, ColumnSpec::new("reduced_by", ColumnType::Double))
        .unwrap();
    let active = store
        .add_column(discounts, ColumnSpec::new("active", ColumnType::Bool))
        .unwrap();

    let items = store.add_table("class_Items").unwrap();
    let item_name = store
        .add_column(items, ColumnSpec::new("name", ColumnType::String))
        .unwrap();
    let price = store
        .add_column(items, ColumnSpec::new("price", ColumnType::Double))
        .unwrap();
    let discount = store
        .add_column(items, ColumnSpec::link("discount", discounts))
        .unwrap();

    let people = store.add_table("class_Person").unwrap();
    let customer_id = store
        .add_column(people, ColumnSpec::new("customer_id", ColumnType::Int))
        .unwrap();
    let balance = store
        .add_column(people, ColumnSpec::new("account_balance", ColumnType::Double))
        .unwrap();
    let person_items = store
        .add_column(people, ColumnSpec::link("items", items).list())
        .unwrap();

    let discount_rows: Vec<ObjLink> = [(3.0, false), (2.5, true), (0.50, true), (1.50, true)]
        .iter()
        .map(|(off, is_active)| {
            let row = store.create_object(discounts).unwrap();
            store.set(row, reduced_by, Value::Double(*off)).unwrap();
            store.set(row, active, Value::Bool(*is_active)).unwrap();
            row
        })
        .collect();
    store
        .set(
            discount_rows[0],
            promotion,
            Value::String("back to school".into()),
        )
        .unwrap();
    store
        .set(
            discount_rows[1],
            promotion,
            Value::String("manager's special".into()),
        )
        .unwrap();

    let item_rows: Vec<ObjLink> = [("milk", 5.5), ("oranges", 4.0), ("pizza", 9.5), ("cereal", 6.5)]
        .iter()
        .map(|(n, p)| {
            let row = store.create_object(items).unwrap();
            store.set(row, item_name, Value::String((*n).into())).unwrap();
            store.set(row, price, Value::Double(*p)).unwrap();
            row
        })
        .collect();
    store
        .set(item_rows[0], discount, Value::Link(discount_rows[2]))
        .unwrap();
    store
        .set(item_rows[2], discount, Value::Link(discount_rows[1]))
        .unwrap();
    store
        .set(item_rows[3], discount, Value::Link(discount_rows[0]))
        .unwrap();

    let person_rows: Vec<ObjLink> = (0..3)
        .map(|i| {
            let row = store.create_object(people).unwrap();
            store.set(row, customer_id, Value::Int(i)).unwrap();
            store
                .set(row, balance, Value::Double((i + 1) as f64 * 10.0))
                .unwrap();
            row
        })
        .collect();
    for target in [item_rows[0], item_rows[1], item_rows[2], item_rows[3]] {
        store
            .list_push(person_rows[0], person_items, Value::Link(target))
            .unwrap();
    }
    for _ in 0..10 {
        store
            .list_push(person_rows[1], person_items, Value::Link(item_rows[0]))
            .unwrap();
    }
    for target in [item_rows[2], item_rows[2], item_rows[3]] {
        store
            .list_push(person_rows[2], person_items, Value::Link(target))
            .unwrap();
    }

    Shop {
        store,
        discounts,
        items,
        people,
    }
}

/// A table with a primitive int list: five populated rows, one row with an
/// empty list and one whose list holds a single null.
pub struct Scores {
    pub store: Store,
    pub table: TableKey,
    pub rows: Vec<ObjLink>,
}

pub fn scores() -> Scores {
    let mut store = Store::new();
    let t = store.add_table("student").unwrap();
    let name = store
        .add_column(t, ColumnSpec::new("name", ColumnType::String))
        .unwrap();
    let scores = store
        .add_column(
            t,
            ColumnSpec::new("scores", ColumnType::Int).nullable().list(),
        )
        .unwrap();

    let data: [&[i64]; 5] = [&[10, 20], &[10, 10], &[30], &[20, 30, 40], &[10]];
    let mut rows = Vec::new();
    for (i, values) in data.iter().enumerate() {
        let row = store.create_object(t).unwrap();
        store
            .set(row, name, Value::String(format!("s{}", i)))
            .unwrap();
        for v in values.iter() {
            store.list_push(row, scores, Value::Int(*v)).unwrap();
        }
        rows.push(row);
    }
    // one row with an empty list
    let empty = store.create_object(t).unwrap();
    store.set(empty, name, Value::String("empty".into())).unwrap();
    rows.push(empty);
    // one row whose list contains only null
    let nulls = store.create_object(t).unwrap();
    store.set(nulls, name, Value::String("nulls".into())).unwrap();
    store.list_push(nulls, scores, Value::Null).unwrap();
    rows.push(nulls);

    Scores {
        store,
        table: t,
        rows,
    }
}
