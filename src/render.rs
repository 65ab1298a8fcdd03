//! Renderer.
//!
//! Converts a skeleton and its parameters into final query text plus the
//! parameter collection an execution adapter binds. Pure: the same input
//! always renders the same output.

use serde::Serialize;

use crate::options::Options;
use crate::params::{Direction, ExplicitParameter, Parameter, ParameterList};
use crate::skeleton::{self, Token};
use crate::value::Value;

/// One entry of the exported parameter collection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoundParameter {
    /// Reference name without the symbol (`p0`, `parray1`, `total`).
    pub name: String,
    pub value: Value,
    pub direction: Direction,
    pub annotation: Option<String>,
}

/// Ordered parameter collection, keyed by name.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ParameterSet {
    entries: Vec<BoundParameter>,
}

impl ParameterSet {
    pub fn get(&self, name: &str) -> Option<&BoundParameter> {
        self.entries.iter().find(|p| p.name == name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, BoundParameter> {
        self.entries.iter()
    }

    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|p| p.name.as_str()).collect()
    }
}

impl<'a> IntoIterator for &'a ParameterSet {
    type Item = &'a BoundParameter;
    type IntoIter = std::slice::Iter<'a, BoundParameter>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// Final query text and its parameters.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Rendered {
    pub sql: String,
    pub parameters: ParameterSet,
}

/// Reference name for the captured parameter at `index`.
pub fn reference_name(index: usize, value: &Value, options: &Options) -> String {
    if value.is_sequence() {
        format!(
            "{}{}{}",
            options.auto_parameter_prefix, options.array_suffix, index
        )
    } else {
        format!("{}{}", options.auto_parameter_prefix, index)
    }
}

fn resolve(params: &ParameterList, index: usize) -> &Parameter {
    params.get(index).unwrap_or_else(|| {
        panic!(
            "placeholder {{{}}} has no parameter ({} captured)",
            index,
            params.len()
        )
    })
}

/// Render a skeleton with generated parameter references.
pub fn render(
    skeleton: &str,
    params: &ParameterList,
    explicit: &[ExplicitParameter],
    options: &Options,
) -> Rendered {
    let mut sql = String::with_capacity(skeleton.len());
    for (_, token) in skeleton::tokenize(skeleton) {
        match token {
            Token::Text(s) => sql.push_str(s),
            Token::Escaped(c) => sql.push(c),
            Token::Placeholder(i) => {
                let param = resolve(params, i);
                sql.push_str(&options.parameter_symbol);
                sql.push_str(&reference_name(i, &param.value, options));
            }
        }
    }

    let captured = params.iter().enumerate().map(|(i, p)| BoundParameter {
        name: reference_name(i, &p.value, options),
        value: p.value.clone(),
        direction: Direction::Input,
        annotation: p.annotation.clone(),
    });
    let named = explicit.iter().map(|p| BoundParameter {
        name: p.name.clone(),
        value: p.value.clone(),
        direction: p.direction,
        annotation: None,
    });

    Rendered {
        sql,
        parameters: ParameterSet {
            entries: captured.chain(named).collect(),
        },
    }
}

/// Debug text with each value inlined as a SQL literal.
pub fn preview(skeleton: &str, params: &ParameterList) -> String {
    let mut out = String::with_capacity(skeleton.len());
    for (_, token) in skeleton::tokenize(skeleton) {
        match token {
            Token::Text(s) => out.push_str(s),
            Token::Escaped(c) => out.push(c),
            Token::Placeholder(i) => out.push_str(&resolve(params, i).value.to_string()),
        }
    }
    out
}
