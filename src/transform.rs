//! Argument type transformer.
//!
//! Reads the annotation attached to an embedded value (`{name:nvarchar(50)}`,
//! `{table:raw}`) and turns the raw value into a typed descriptor, or into
//! plain query text for `raw`.
//!
//! ```text
//! annotation  := segment ((',' | '|') segment)*
//! segment     := "raw"
//!              | ("varchar" | "nvarchar" | "char" | "nchar") width?
//!              | "text" | "ntext"
//!              | type-name ('(' args ')')?
//! width       := '(' (digits | "max") ')'
//! ```
//!
//! Segments that match nothing are kept as display metadata.

use nom::{
    IResult,
    branch::alt,
    bytes::complete::{is_not, tag_no_case},
    character::complete::{alphanumeric1, char, digit1, multispace0},
    combinator::{all_consuming, map, map_opt, map_res, opt, value},
    sequence::{delimited, pair, terminated},
};
use std::fmt;

use crate::params::Parameter;
use crate::value::{DEFAULT_STRING_WIDTH, DbType, TypedValue, Value, Width};

/// Result of transforming one embedded value.
#[derive(Debug, Clone, PartialEq)]
pub enum Transformed {
    /// Bind as a captured parameter.
    Parameter(Parameter),
    /// Write into the query text unparameterized.
    Literal(String),
}

/// Extension point for how annotations shape captured values.
pub trait ArgumentTransformer: fmt::Debug + Send + Sync {
    fn transform(&self, value: Value, annotation: Option<&str>) -> Transformed;
}

/// The built-in annotation grammar.
#[derive(Debug, Default, Clone, Copy)]
pub struct AnnotationTransformer;

impl ArgumentTransformer for AnnotationTransformer {
    fn transform(&self, value: Value, annotation: Option<&str>) -> Transformed {
        let Some(annotation) = annotation.filter(|a| !a.trim().is_empty()) else {
            return Transformed::Parameter(Parameter::new(value));
        };

        let mut value = value;
        let mut raw = false;
        let mut unmatched = Vec::new();

        for segment in split_segments(annotation) {
            match parse_directive(segment) {
                Some(Directive::Raw) => raw = true,
                Some(Directive::StringType { db_type, width }) => {
                    value = wrap_strings(value, db_type, width);
                }
                Some(Directive::Named(db_type)) => value = wrap_named(value, db_type),
                None => unmatched.push(segment.trim()),
            }
        }

        if raw {
            return Transformed::Literal(value.raw_text());
        }
        let rest = (!unmatched.is_empty()).then(|| unmatched.join(","));
        Transformed::Parameter(Parameter::with_annotation(value, rest))
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Directive {
    Raw,
    /// `width` is `None` when the annotation gives none.
    StringType { db_type: DbType, width: Option<Width> },
    Named(DbType),
}

/// Split on `,` and `|` outside parentheses, so `decimal(10,2)` stays whole.
fn split_segments(annotation: &str) -> Vec<&str> {
    let mut segments = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (i, c) in annotation.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            ',' | '|' if depth == 0 => {
                segments.push(&annotation[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    segments.push(&annotation[start..]);
    segments.retain(|s| !s.trim().is_empty());
    segments
}

fn parse_directive(segment: &str) -> Option<Directive> {
    alt((
        all_consuming(parse_raw),
        all_consuming(parse_string_type),
        all_consuming(parse_named_type),
    ))(segment.trim())
    .ok()
    .map(|(_, d)| d)
}

fn parse_raw(input: &str) -> IResult<&str, Directive> {
    value(Directive::Raw, tag_no_case("raw"))(input)
}

/// Parse `varchar(50)`, `nchar`, `nvarchar(max)`, `text`, ...
fn parse_string_type(input: &str) -> IResult<&str, Directive> {
    alt((
        map(
            pair(parse_string_type_name, opt(parse_width)),
            |(db_type, width)| Directive::StringType { db_type, width },
        ),
        map(
            alt((
                value(DbType::String, tag_no_case("ntext")),
                value(DbType::AnsiString, tag_no_case("text")),
            )),
            |db_type| Directive::StringType {
                db_type,
                width: Some(Width::Max),
            },
        ),
    ))(input)
}

fn parse_string_type_name(input: &str) -> IResult<&str, DbType> {
    alt((
        value(DbType::String, tag_no_case("nvarchar")),
        value(DbType::StringFixedLength, tag_no_case("nchar")),
        value(DbType::AnsiString, tag_no_case("varchar")),
        value(DbType::AnsiStringFixedLength, tag_no_case("char")),
    ))(input)
}

fn parse_width(input: &str) -> IResult<&str, Width> {
    delimited(
        pair(char('('), multispace0),
        alt((
            value(Width::Max, tag_no_case("max")),
            map_res(digit1, |d: &str| d.parse::<u32>().map(Width::Chars)),
        )),
        pair(multispace0, char(')')),
    )(input)
}

/// Parse any other known type name, with an ignored argument list.
fn parse_named_type(input: &str) -> IResult<&str, Directive> {
    map(
        map_opt(
            terminated(
                alphanumeric1,
                opt(delimited(char('('), is_not(")"), char(')'))),
            ),
            DbType::from_name,
        ),
        Directive::Named,
    )(input)
}

fn wrap_strings(value: Value, db_type: DbType, width: Option<Width>) -> Value {
    match value {
        Value::String(_) | Value::Null => wrap_string(value, db_type, width),
        Value::Array(items) if items.iter().all(|v| matches!(v, Value::String(_) | Value::Null)) => {
            Value::Array(
                items
                    .into_iter()
                    .map(|v| wrap_string(v, db_type, width))
                    .collect(),
            )
        }
        other => other,
    }
}

fn wrap_string(value: Value, db_type: DbType, width: Option<Width>) -> Value {
    let width = width.or_else(|| {
        let len = value.as_str().map(|s| s.chars().count()).unwrap_or(0);
        (len <= DEFAULT_STRING_WIDTH as usize).then_some(Width::Chars(DEFAULT_STRING_WIDTH))
    });
    TypedValue::new(value, db_type, width).into()
}

fn wrap_named(value: Value, db_type: DbType) -> Value {
    match value {
        typed @ Value::Typed(_) => typed,
        other => TypedValue::new(other, db_type, None).into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transform(value: impl Into<Value>, annotation: &str) -> Transformed {
        AnnotationTransformer.transform(value.into(), Some(annotation))
    }

    fn typed(t: Transformed) -> TypedValue {
        match t {
            Transformed::Parameter(Parameter {
                value: Value::Typed(t),
                ..
            }) => *t,
            other => panic!("expected typed parameter, got {:?}", other),
        }
    }

    #[test]
    fn test_no_annotation_passes_through() {
        let t = AnnotationTransformer.transform(Value::Int(3), None);
        assert_eq!(t, Transformed::Parameter(Parameter::new(3)));
    }

    #[test]
    fn test_raw_becomes_literal() {
        assert_eq!(
            transform("users", "raw"),
            Transformed::Literal("users".into())
        );
        assert_eq!(transform(42, "RAW"), Transformed::Literal("42".into()));
    }

    #[test]
    fn test_varchar_with_width() {
        let t = typed(transform("abc", "varchar(20)"));
        assert_eq!(t.db_type, DbType::AnsiString);
        assert_eq!(t.width, Some(Width::Chars(20)));
        assert!(t.is_ansi());
        assert!(!t.is_fixed_length());
    }

    #[test]
    fn test_nchar_max_and_text() {
        let t = typed(transform("abc", "nchar(max)"));
        assert_eq!(t.db_type, DbType::StringFixedLength);
        assert_eq!(t.width, Some(Width::Max));

        let t = typed(transform("abc", "ntext"));
        assert_eq!(t.db_type, DbType::String);
        assert_eq!(t.width, Some(Width::Max));
    }

    #[test]
    fn test_default_width_only_for_short_values() {
        let t = typed(transform("abc", "nvarchar"));
        assert_eq!(t.width, Some(Width::Chars(DEFAULT_STRING_WIDTH)));

        let long = "x".repeat(DEFAULT_STRING_WIDTH as usize + 1);
        let t = typed(transform(long, "nvarchar"));
        assert_eq!(t.width, None);
    }

    #[test]
    fn test_string_sequence_wraps_each_element() {
        match transform(vec!["a", "b"], "varchar(5)") {
            Transformed::Parameter(Parameter {
                value: Value::Array(items),
                annotation: None,
            }) => {
                assert_eq!(items.len(), 2);
                assert!(items.iter().all(|v| matches!(v, Value::Typed(t) if t.width == Some(Width::Chars(5)))));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_string_type_leaves_non_strings_alone() {
        assert_eq!(
            transform(7, "varchar(10)"),
            Transformed::Parameter(Parameter::new(7))
        );
    }

    #[test]
    fn test_other_type_names() {
        let t = typed(transform(5, "bigint"));
        assert_eq!(t.db_type, DbType::Int64);
        assert_eq!(t.width, None);

        let t = typed(transform(1.5, "decimal(10,2)"));
        assert_eq!(t.db_type, DbType::Decimal);
    }

    #[test]
    fn test_unrecognized_kept_as_metadata() {
        assert_eq!(
            transform("x", "lowercase"),
            Transformed::Parameter(Parameter::with_annotation("x", Some("lowercase".into())))
        );
    }

    #[test]
    fn test_segments_evaluated_independently() {
        match transform("abc", "varchar(3)|trimmed") {
            Transformed::Parameter(p) => {
                assert!(matches!(p.value, Value::Typed(_)));
                assert_eq!(p.annotation.as_deref(), Some("trimmed"));
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(
            transform("abc", "varchar(3),raw"),
            Transformed::Literal("abc".into())
        );
    }

    #[test]
    fn test_split_respects_parentheses() {
        assert_eq!(
            split_segments("decimal(10,2)|raw"),
            vec!["decimal(10,2)", "raw"]
        );
        assert_eq!(split_segments(" a , ,b"), vec![" a ", "b"]);
    }
}
