//! Filter tree: conditions grouped with AND/OR.
//!
//! ```text
//! Filters(OR)
//! ├── Filters(AND) ── A >= {} , A <= {}      → (A >= @p0 AND A <= @p1)
//! └── Filters(OR)  ── C <= {} , D = {}       → (C <= @p2 OR D = @p3)
//! ```
//!
//! A nested group is parenthesized only when it has more than one member.
//! Whether the top level is wrapped is up to the caller.

use std::sync::Arc;

use crate::builder::SqlBuilder;
use crate::options::Options;
use crate::template::Template;

/// Logical operator joining the members of a [`Filters`] group.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Combinator {
    #[default]
    And,
    Or,
}

impl Combinator {
    pub fn keyword(self) -> &'static str {
        match self {
            Combinator::And => "AND",
            Combinator::Or => "OR",
        }
    }
}

/// One condition.
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    template: Template,
}

impl Filter {
    pub fn new(template: impl Into<Template>) -> Self {
        Self {
            template: template.into(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.template.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FilterNode {
    Filter(Filter),
    Group(Filters),
}

impl FilterNode {
    pub fn is_empty(&self) -> bool {
        match self {
            FilterNode::Filter(f) => f.is_empty(),
            FilterNode::Group(g) => g.is_empty(),
        }
    }
}

impl From<Filter> for FilterNode {
    fn from(f: Filter) -> Self {
        FilterNode::Filter(f)
    }
}

impl From<Filters> for FilterNode {
    fn from(g: Filters) -> Self {
        FilterNode::Group(g)
    }
}

/// Ordered conditions and groups joined by one combinator.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filters {
    combinator: Combinator,
    items: Vec<FilterNode>,
}

impl Filters {
    pub fn new(combinator: Combinator) -> Self {
        Self {
            combinator,
            items: Vec::new(),
        }
    }

    pub fn and<I, N>(items: I) -> Self
    where
        I: IntoIterator<Item = N>,
        N: Into<FilterNode>,
    {
        Self::new(Combinator::And).extend_with(items)
    }

    pub fn or<I, N>(items: I) -> Self
    where
        I: IntoIterator<Item = N>,
        N: Into<FilterNode>,
    {
        Self::new(Combinator::Or).extend_with(items)
    }

    fn extend_with<I, N>(mut self, items: I) -> Self
    where
        I: IntoIterator<Item = N>,
        N: Into<FilterNode>,
    {
        self.items.extend(items.into_iter().map(Into::into));
        self
    }

    pub fn combinator(&self) -> Combinator {
        self.combinator
    }

    pub fn push(&mut self, item: impl Into<FilterNode>) -> &mut Self {
        self.items.push(item.into());
        self
    }

    pub fn items(&self) -> &[FilterNode] {
        &self.items
    }

    /// Number of non-empty members.
    pub fn len(&self) -> usize {
        self.items.iter().filter(|i| !i.is_empty()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Write the members into `builder`, combinator between them.
    pub fn write_into(&self, builder: &mut SqlBuilder) {
        let separator = format!(" {} ", self.combinator.keyword());
        let mut first = true;
        for item in self.items.iter().filter(|i| !i.is_empty()) {
            if !first {
                builder.append_literal(&separator);
            }
            first = false;
            match item {
                FilterNode::Filter(f) => {
                    builder.append_unspaced(f.template.clone());
                }
                FilterNode::Group(group) if group.len() > 1 => {
                    builder.append_literal("(");
                    group.write_into(builder);
                    builder.append_literal(")");
                }
                FilterNode::Group(group) => group.write_into(builder),
            }
        }
    }

    /// The members alone, unwrapped.
    pub fn build(&self, options: Arc<Options>) -> SqlBuilder {
        let mut builder = SqlBuilder::with_options(options);
        self.write_into(&mut builder);
        builder
    }

    /// The members prefixed by `keyword` (`WHERE`, `HAVING`), unless empty
    /// or the first member already starts with it.
    pub fn build_clause(&self, options: Arc<Options>, keyword: &str) -> SqlBuilder {
        let body = self.build(options.clone());
        if body.is_empty() || starts_with_keyword(body.skeleton(), keyword) {
            return body;
        }
        let mut clause = SqlBuilder::with_options(options);
        clause
            .append_literal(keyword)
            .append_literal(" ")
            .append_unspaced(&body);
        clause
    }

    /// The members as a continuation of an existing clause: `AND ...`,
    /// parenthesized when an OR group has several members.
    pub fn build_continuation(&self, options: Arc<Options>) -> SqlBuilder {
        let body = self.build(options.clone());
        let mut out = SqlBuilder::with_options(options);
        if body.is_empty() {
            return out;
        }
        out.append_literal("AND ");
        if self.combinator == Combinator::Or && self.len() > 1 {
            out.append_literal("(")
                .append_unspaced(&body)
                .append_literal(")");
        } else {
            out.append_unspaced(&body);
        }
        out
    }
}

/// Case-insensitive check for `keyword` as the first word of `text`.
fn starts_with_keyword(text: &str, keyword: &str) -> bool {
    let text = text.trim_start();
    let Some(head) = text.get(..keyword.len()) else {
        return false;
    };
    head.eq_ignore_ascii_case(keyword)
        && text[keyword.len()..]
            .chars()
            .next()
            .is_none_or(char::is_whitespace)
}
