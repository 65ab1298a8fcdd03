//! Captured and explicit parameters, and the rule for reusing them.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::mem;

use crate::value::Value;

/// A value captured from an embedded expression, referenced by position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    pub value: Value,
    /// Annotation text left after type transformation; display metadata only.
    pub annotation: Option<String>,
}

impl Parameter {
    pub fn new(value: impl Into<Value>) -> Self {
        Self {
            value: value.into(),
            annotation: None,
        }
    }

    pub fn with_annotation(value: impl Into<Value>, annotation: Option<String>) -> Self {
        Self {
            value: value.into(),
            annotation: annotation.filter(|a| !a.is_empty()),
        }
    }
}

/// Direction of an explicit parameter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    #[default]
    Input,
    Output,
    InputOutput,
    ReturnValue,
}

/// A parameter added by name. Never appears as a placeholder; the
/// query text refers to it directly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExplicitParameter {
    pub name: String,
    pub value: Value,
    pub direction: Direction,
}

/// Decides whether two captured parameters may share one bound value.
pub trait ParameterComparer: fmt::Debug + Send + Sync {
    fn equals(&self, a: &Parameter, b: &Parameter) -> bool;
}

/// Equal annotations, and either both values null or both of the same
/// kind and value-equal.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultComparer;

impl ParameterComparer for DefaultComparer {
    fn equals(&self, a: &Parameter, b: &Parameter) -> bool {
        if a.annotation != b.annotation {
            return false;
        }
        match (&a.value, &b.value) {
            (Value::Null, Value::Null) => true,
            (Value::Null, _) | (_, Value::Null) => false,
            (x, y) => mem::discriminant(x) == mem::discriminant(y) && x == y,
        }
    }
}

/// Ordered list of captured parameters.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParameterList {
    items: Vec<Parameter>,
}

impl ParameterList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a parameter and return the index placeholders should use.
    ///
    /// With a comparer the list is scanned first and the first equal entry
    /// is reused; without one the parameter is always appended.
    pub fn add(&mut self, param: Parameter, comparer: Option<&dyn ParameterComparer>) -> usize {
        if let Some(cmp) = comparer {
            if let Some(index) = self.items.iter().position(|p| cmp.equals(p, &param)) {
                tracing::trace!("Reusing parameter {} for {}", index, param.value);
                return index;
            }
        }
        self.items.push(param);
        self.items.len() - 1
    }

    pub fn get(&self, index: usize) -> Option<&Parameter> {
        self.items.get(index)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Parameter> {
        self.items.iter()
    }

    pub fn as_slice(&self) -> &[Parameter] {
        &self.items
    }
}

impl From<Vec<Parameter>> for ParameterList {
    fn from(items: Vec<Parameter>) -> Self {
        Self { items }
    }
}

impl<'a> IntoIterator for &'a ParameterList {
    type Item = &'a Parameter;
    type IntoIter = std::slice::Iter<'a, Parameter>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}
