use pretty_assertions::assert_eq;
use sqlsplice::prelude::*;
use sqlsplice::{Combinator, Parameter, ParameterComparer, Template, Value};
use std::sync::Arc;

fn reuse() -> Arc<Options> {
    Options::builder().reuse_identical_parameters(true).build()
}

#[test]
fn test_literal_templates_render_unchanged() {
    let samples = [
        "SELECT * FROM users",
        "SELECT '{x}' AS braces, '}}' FROM t",
        "UPDATE t SET a = 'it''s' /**where**/",
        "",
    ];
    for text in samples {
        let b = SqlBuilder::parse(text);
        assert_eq!(b.render().sql, text);
        assert!(b.render().parameters.is_empty());
    }
}

#[test]
fn test_parameter_counts_by_mode() {
    let distinct = || sql!("{} {} {}", 1, 2, 3).unwrap();
    let equal = || sql!("{} {} {}", 5, 5, 5).unwrap();

    assert_eq!(SqlBuilder::parse(equal()).render().parameters.len(), 3);
    assert_eq!(SqlBuilder::parse_with(reuse(), distinct()).render().parameters.len(), 3);

    let b = SqlBuilder::parse_with(reuse(), equal());
    assert_eq!(b.render().sql, "@p0 @p0 @p0");
    assert_eq!(b.render().parameters.names(), vec!["p0"]);
}

#[test]
fn test_reuse_respects_kind_and_annotation() {
    let template = Template::new()
        .arg(1)
        .lit(" ")
        .arg(1.0)
        .lit(" ")
        .arg_as(1, "display")
        .lit(" ")
        .arg(Value::Null)
        .lit(" ")
        .arg(Value::Null);
    let b = SqlBuilder::parse_with(reuse(), template);
    assert_eq!(b.render().sql, "@p0 @p1 @p2 @p3 @p3");
}

#[test]
fn test_merge_appends_shifted_parameters() {
    let mut a = SqlBuilder::parse(sql!("Y {}", "u").unwrap());
    let b = SqlBuilder::parse(sql!("X {}", "v").unwrap());
    a.append(&b);

    assert_eq!(a.skeleton(), "Y {0} X {1}");
    let values: Vec<_> = a.params().iter().map(|p| p.value.clone()).collect();
    assert_eq!(values, vec![Value::from("u"), Value::from("v")]);
    // the source is untouched
    assert_eq!(b.skeleton(), "X {0}");
}

#[test]
fn test_nested_fragments() {
    let inner = SqlBuilder::parse(sql!("SELECT id FROM teams WHERE region = {}", "eu").unwrap());
    let middle = SqlBuilder::parse(sql!("team_id IN ({})", &inner).unwrap());
    let mut outer = SqlBuilder::parse(sql!("SELECT * FROM users WHERE age > {} AND", 30).unwrap());
    outer.append(&middle);

    assert_eq!(
        outer.render().sql,
        "SELECT * FROM users WHERE age > @p0 AND team_id IN (SELECT id FROM teams WHERE region = @p1)"
    );
    assert_eq!(outer.render().parameters.len(), 2);
}

#[test]
fn test_quote_stripping() {
    let one = SqlBuilder::parse(sql!("SELECT * FROM t WHERE name='{}' AND x", "bob").unwrap());
    assert_eq!(one.render().sql, "SELECT * FROM t WHERE name=@p0 AND x");

    let two = SqlBuilder::parse(sql!("SELECT * FROM t WHERE name='{}{}'", "a", "b").unwrap());
    assert_eq!(two.render().sql, "SELECT * FROM t WHERE name='@p0@p1'");
}

#[test]
fn test_injection_attempt_stays_a_value() {
    let evil = "x'; DROP TABLE users; --";
    let b = SqlBuilder::parse(sql!("SELECT * FROM t WHERE name = '{}'", evil).unwrap());
    assert_eq!(b.render().sql, "SELECT * FROM t WHERE name = @p0");
    assert_eq!(
        b.render().parameters.get("p0").map(|p| &p.value),
        Some(&Value::from(evil))
    );
}

#[test]
fn test_filter_tree_rendering() {
    let mut tree = Filters::or([
        Filters::and([
            Filter::new(sql!("A>={}", 1).unwrap()),
            Filter::new(sql!("A<={}", 2).unwrap()),
        ]),
        Filters::new(Combinator::Or),
    ]);
    tree.push(Filters::or([
        Filter::new(sql!("C<={}", 3).unwrap()),
        Filter::new(sql!("D={}", 4).unwrap()),
    ]));

    let built = tree.build(Options::shared_default());
    assert_eq!(built.render().sql, "(A>=@p0 AND A<=@p1) OR (C<=@p2 OR D=@p3)");
}

#[test]
fn test_clause_markers() {
    let untouched = QueryBuilder::from_template("SELECT * FROM t /**where**/");
    assert_eq!(untouched.render().sql, "SELECT * FROM t /**where**/");

    let mut one = QueryBuilder::from_template("SELECT * FROM t /**where**/");
    one.where_(sql!("a = {}", 1).unwrap());
    assert_eq!(one.render().sql, "SELECT * FROM t WHERE a = @p0");

    let mut more = QueryBuilder::from_template("SELECT * FROM t WHERE a = 1 /**where_additional**/");
    more.where_(sql!("b = {}", 2).unwrap());
    assert_eq!(more.render().sql, "SELECT * FROM t WHERE a = 1 AND b = @p0");
}

#[test]
fn test_render_idempotent_until_mutated() {
    let mut b = SqlBuilder::parse(sql!("SELECT {}", 1).unwrap());
    let first = b.render().clone();
    assert_eq!(b.render(), &first);

    b.append(sql!("+ {}", 2).unwrap());
    assert_ne!(b.render(), &first);
    assert_eq!(b.render().sql, "SELECT @p0 + @p1");
}

#[test]
fn test_sequence_reference_names() {
    let b = SqlBuilder::parse(sql!("WHERE id IN {} AND kind = {}", vec![1, 2, 3], "a").unwrap());
    assert_eq!(b.render().sql, "WHERE id IN @parray0 AND kind = @p1");
}

#[derive(Debug)]
struct CaseInsensitive;

impl ParameterComparer for CaseInsensitive {
    fn equals(&self, a: &Parameter, b: &Parameter) -> bool {
        match (a.value.as_str(), b.value.as_str()) {
            (Some(x), Some(y)) => x.eq_ignore_ascii_case(y),
            _ => a == b,
        }
    }
}

#[test]
fn test_custom_comparer() {
    let options = Options::builder()
        .reuse_identical_parameters(true)
        .comparer(Arc::new(CaseInsensitive))
        .build();
    let b = SqlBuilder::parse_with(options, sql!("{} {} {}", "Bob", "BOB", "alice").unwrap());
    assert_eq!(b.render().sql, "@p0 @p0 @p1");
}

#[test]
fn test_typed_annotation_is_bound() {
    let b = SqlBuilder::parse(sql!("code = {:varchar(10)}", "A1").unwrap());
    let param = &b.render().parameters.get("p0").unwrap().value;
    match param {
        Value::Typed(t) => {
            assert_eq!(t.db_type, DbType::AnsiString);
            assert_eq!(t.value, Value::from("A1"));
        }
        other => panic!("expected typed value, got {:?}", other),
    }
}

#[test]
fn test_raw_annotation_is_inlined() {
    let table = "audit_2024";
    let b = SqlBuilder::parse(sql!("SELECT * FROM {:raw} WHERE id = {}", table, 9).unwrap());
    assert_eq!(b.render().sql, "SELECT * FROM audit_2024 WHERE id = @p0");
}
