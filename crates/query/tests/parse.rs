//! Syntactic parser corpus tests.

use tether_query::parse;

static VALID_QUERIES: &[&str] = &[
    // true/false predicates
    "truepredicate",
    "falsepredicate",
    " TRUEPREDICATE ",
    " FALSEPREDICATE ",
    "truepredicates = falsepredicates", // keypaths
    // characters/strings
    "\"\" = ''",
    "'azAZ09/ :()[]{}<>,.^@-+=*&~`' = '\\\" \\' \\\\ \\/ \\b \\f \\n \\r \\t \\0'",
    "\"azAZ09/\" = \"\\\" \\' \\\\ \\/ \\b \\f \\n \\r \\t \\0\"",
    "'\\uffFf' = '\\u0020'",
    "'\\u01111' = 'asdf\\u0111asdf'",
    // expressions (numbers, bools, keypaths, arguments)
    "-1 = 12",
    "0 = 001",
    "0x0 = -0X398235fcAb",
    "10. = -.034",
    "10.0 = 5.034",
    "true = false",
    "truelove = false",
    "true = falsey",
    "nullified = null",
    "_ = a",
    "_a = _.aZ",
    "a09._br.z = __-__.Z-9",
    "$0 = $19",
    "$0=$0",
    // operators
    "0=0",
    "0 = 0",
    "0 =[c] 0",
    "0!=0",
    "0 != 0",
    "0 !=[c] 0",
    "0!=[c]0",
    "0 <> 0",
    "0<>0",
    "0 <>[c] 0",
    "0==0",
    "0 == 0",
    "0==[c]0",
    "0 == [c] 0",
    "0>0",
    "0 > 0",
    "0>=0",
    "0 >= 0",
    "0 => 0",
    "0=>0",
    "0<0",
    "0 < 0",
    "0<=0",
    "0 <= 0",
    "0 =< 0",
    "0 contains 0",
    "a CONTAINS[c] b",
    "a contains [c] b",
    "'a'CONTAINS[c]b",
    "0 BeGiNsWiTh 0",
    "0 ENDSWITH 0",
    "contains contains 'contains'",
    "beginswith beginswith 'beginswith'",
    "AND == 'AND' AND OR == 'OR'",
    // atoms/groups
    "(0=0)",
    "( 0=0 )",
    "((0=0))",
    "!0=0",
    "! 0=0",
    "!(0=0)",
    "! (0=0)",
    "NOT0=0",    // keypath NOT0
    "NOT0.a=0",  // keypath NOT0
    "NOT0a.b=0", // keypath NOT0a
    "not-1=1",
    "not 0=0",
    "NOT(0=0)",
    "not (0=0)",
    "NOT (!0=0)",
    // compound
    "a==a && a==a",
    "a==a || a==a",
    "a==a&&a==a||a=a",
    "a==a and a==a",
    "a==a OR a==a",
    "and=='AND'&&'or'=='||'",
    "and == or && ORE > GRAND",
    "a=1AND NOTb=2",
    // literals
    "t == T399:0",
    "t == 2017-12-01@12:07:53:505",
    "t > 1969-12-31@23:59:59",
    "u == uuid(3b241101-e2bb-4255-8caf-4136c566a962)",
    "o == oid(61f0289d2f34b2a47e0b1e3c)",
    "f == inf",
    "f == -inFinity",
    "f == NaN",
    "b == B64\"YWJj\"",
    // collections, quantifiers, aggregates, subqueries
    "age BETWEEN {2, 4}",
    "age IN {1, 2, 3}",
    "ANY list.age > 2",
    "SOME list.age > 2",
    "ALL list.age > 2",
    "NONE list.age > 2",
    "list.@count > 2",
    "list.@size > 2",
    "list.@min.age < 2",
    "list.@max.age < 2",
    "list.@sum.age < 2",
    "list.@avg.age < 2",
    "prims.@min < 2",
    "name.@size > 3",
    "mixed.@type == 'int'",
    "@links.@count == 0",
    "@links.Person.items.age > 2",
    "@links.Person.items.@count > 1",
    "dict['key'] == 7",
    "SUBQUERY(items, $x, $x.price > 5).@count > 1",
    // descriptors
    "TRUEPREDICATE SORT(age ASC)",
    "TRUEPREDICATE SORT(age ASC, name DESCENDING)",
    "TRUEPREDICATE DISTINCT(age)",
    "TRUEPREDICATE LIMIT(5)",
    "age > 2 SORT(age ASC) DISTINCT(name) LIMIT(2) SORT(fees DESC) LIMIT(1)",
];

static INVALID_QUERIES: &[&str] = &[
    "predicate",
    "'\\a' = ''", // invalid escape
    "'\\u0' = ''",
    // invalid strings
    "\"' = ''",
    "\" = ''",
    "' = ''",
    // expressions
    "03a = 1",
    "1..0 = 1",
    "1.0. = 1",
    "1-0 = 1",
    "0x = 1",
    "- = a",
    "a..b = a",
    "a$a = a",
    "$-1 = $0",
    "$ = $",
    // operators
    "0===>0",
    "0 contains1",
    "a contains_something",
    "endswith 0",
    // atoms/groups
    "0=0)",
    "(0=0",
    "(0=0))",
    "! =0",
    "NOTNOT(0=0)",
    "not.a=0",
    "0=0 !",
    // compound
    "a==a & a==a",
    "a==a | a==a",
    "a==a &| a==a",
    "a==a && OR a==a",
    "a==aORa==a",
    "a==a ORa==a",
    "a==a AND==a",
    "a==a ANDa==a",
    "a=1ANDNOT b=2",
    "truepredicate &&",
    "truepredicate & truepredicate",
    // literals
    "t == T1:",
    "t == T:1",
    "t == 1970-1-1",
    "t == 1970-1-1@",
    "t == 1970-1-1@0",
    "t == 1970-1-1@0:",
    "t == 1970-1-1@0:0",
    "t == 1970-1-1@0:0:",
    "t == T1:-1",
    "t == 1969-12-31@23:59:59:-1",
    "u == uuid(3b241101)",
    "o == oid(xyz)",
    // aggregates and subqueries
    "name.@count.hours <= 2",
    "SUBQUERY(items, $x, $x.price > 5) > 1",
    "SUBQUERY(items, x, $x.price > 5).@count > 1",
    // descriptors
    "TRUEPREDICATE SORT(age)",
    "TRUEPREDICATE SORT(age bad)",
    "TRUEPREDICATE LIMIT(a)",
    "TRUEPREDICATE LIMIT(-1)",
];

#[test]
fn valid_queries() {
    for query in VALID_QUERIES {
        if let Err(err) = parse(query) {
            panic!("query `{}` should parse, got: {}", query, err);
        }
    }
}

#[test]
fn invalid_queries() {
    for query in INVALID_QUERIES {
        if parse(query).is_ok() {
            panic!("query `{}` should not parse", query);
        }
    }
}

#[test]
fn syntax_errors_name_the_offending_fragment() {
    let err = parse("age >").unwrap_err();
    assert!(matches!(err, tether_query::Error::Syntax(_)));
    let err = parse("age > 2 garbage").unwrap_err();
    let text = err.to_string();
    assert!(text.contains("garbage"), "got: {}", text);
}
