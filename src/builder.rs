//! Builder core.
//!
//! A [`SqlBuilder`] owns one skeleton, its captured parameters, its explicit
//! parameters and a shared [`Options`]. Every edit goes through the template
//! parser or the merge algorithm, so placeholders always resolve against
//! the builder's own parameter list.
//!
//! ```
//! use sqlsplice::{SqlBuilder, Template};
//!
//! let mut q = SqlBuilder::new();
//! q.append("SELECT * FROM users WHERE")
//!     .append(Template::new().lit("id = ").arg(42));
//! assert_eq!(q.render().sql, "SELECT * FROM users WHERE id = @p0");
//! ```

use std::cell::OnceCell;
use std::fmt;
use std::ops::Range;
use std::sync::Arc;

use crate::options::Options;
use crate::params::{Direction, ExplicitParameter, Parameter, ParameterList};
use crate::parser;
use crate::render::{self, Rendered};
use crate::skeleton::{self, Token};
use crate::template::{Arg, Fragment, Template};
use crate::value::Value;

/// Mutable query text with captured parameters.
#[derive(Debug, Clone)]
pub struct SqlBuilder {
    skeleton: String,
    params: ParameterList,
    explicit: Vec<ExplicitParameter>,
    options: Arc<Options>,
    rendered: OnceCell<Rendered>,
    preview: OnceCell<String>,
}

impl Default for SqlBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SqlBuilder {
    /// Empty builder using the shared default options.
    pub fn new() -> Self {
        Self::with_options(Options::shared_default())
    }

    pub fn with_options(options: Arc<Options>) -> Self {
        Self {
            skeleton: String::new(),
            params: ParameterList::new(),
            explicit: Vec::new(),
            options,
            rendered: OnceCell::new(),
            preview: OnceCell::new(),
        }
    }

    /// Builder holding a parsed initial template.
    pub fn parse(template: impl Into<Template>) -> Self {
        Self::parse_with(Options::shared_default(), template)
    }

    pub fn parse_with(options: Arc<Options>, template: impl Into<Template>) -> Self {
        let mut builder = Self::with_options(options);
        builder.append(template);
        builder
    }

    pub fn options(&self) -> &Arc<Options> {
        &self.options
    }

    /// Replace the options used by later edits. Existing content is kept as parsed.
    pub fn set_options(&mut self, options: Arc<Options>) -> &mut Self {
        self.options = options;
        self.invalidate();
        self
    }

    pub fn skeleton(&self) -> &str {
        &self.skeleton
    }

    pub fn params(&self) -> &ParameterList {
        &self.params
    }

    pub fn explicit_params(&self) -> &[ExplicitParameter] {
        &self.explicit
    }

    pub fn is_empty(&self) -> bool {
        self.skeleton.is_empty()
    }

    /// Skeleton length in bytes; positions for `insert`/`remove` use this scale.
    pub fn len(&self) -> usize {
        self.skeleton.len()
    }

    /// Snapshot of the content, embeddable in another template.
    pub fn to_fragment(&self) -> Fragment {
        Fragment {
            skeleton: self.skeleton.clone(),
            params: self.params.clone(),
            explicit: self.explicit.clone(),
        }
    }

    /// The content as a template holding one fragment.
    pub fn to_template(&self) -> Template {
        Template::new().arg(self.to_fragment())
    }

    pub fn into_fragment(self) -> Fragment {
        Fragment {
            skeleton: self.skeleton,
            params: self.params,
            explicit: self.explicit,
        }
    }

    // ----- edits -----

    /// Append a template, separated from existing text by one space when
    /// neither side already provides spacing.
    pub fn append(&mut self, template: impl Into<Template>) -> &mut Self {
        let end = self.skeleton.len();
        self.write_at(end, template.into(), true);
        self
    }

    pub fn append_if(&mut self, condition: bool, template: impl Into<Template>) -> &mut Self {
        if condition {
            self.append(template);
        }
        self
    }

    /// Append a line break, then the template.
    pub fn append_line(&mut self, template: impl Into<Template>) -> &mut Self {
        self.append_literal("\n");
        self.append(template)
    }

    /// Append a template exactly where the text ends, with no auto-spacing.
    pub fn append_unspaced(&mut self, template: impl Into<Template>) -> &mut Self {
        let end = self.skeleton.len();
        self.write_at(end, template.into(), false);
        self
    }

    /// Append literal text verbatim. No spacing, no parameters.
    pub fn append_literal(&mut self, text: &str) -> &mut Self {
        let end = self.skeleton.len();
        self.insert_text(end, &skeleton::escape(text), false);
        self
    }

    /// First call writes the template bare; later calls put `separator` first.
    pub fn append_separated(
        &mut self,
        separator: &str,
        template: impl Into<Template>,
    ) -> &mut Self {
        if !self.is_empty() {
            self.append_literal(separator);
        }
        let end = self.skeleton.len();
        self.write_at(end, template.into(), false);
        self
    }

    pub fn prepend(&mut self, template: impl Into<Template>) -> &mut Self {
        self.insert(0, template)
    }

    /// Insert a template at a skeleton byte position, spaced on both sides
    /// like `append`.
    pub fn insert(&mut self, pos: usize, template: impl Into<Template>) -> &mut Self {
        self.write_at(pos, template.into(), true);
        self
    }

    /// Delete skeleton text. Parameters stay registered.
    ///
    /// # Panics
    ///
    /// If either end of `span` falls inside a placeholder or escape.
    pub fn remove(&mut self, span: Range<usize>) -> &mut Self {
        skeleton::assert_boundary(&self.skeleton, span.start);
        skeleton::assert_boundary(&self.skeleton, span.end);
        self.skeleton.replace_range(span, "");
        self.invalidate();
        self
    }

    /// Replace the first literal occurrence of `marker`.
    /// Returns whether the marker was found.
    pub fn replace(&mut self, marker: &str, template: impl Into<Template>) -> bool {
        let needle = skeleton::escape(marker);
        match skeleton::find_literal(&self.skeleton, &needle, 0) {
            Some(pos) => {
                self.skeleton.replace_range(pos..pos + needle.len(), "");
                self.write_at(pos, template.into(), false);
                true
            }
            None => false,
        }
    }

    /// Replace every occurrence of `marker`; returns how many were replaced.
    pub fn replace_all(&mut self, marker: &str, template: impl Into<Template>) -> usize {
        let needle = skeleton::escape(marker);
        let template = template.into();
        let mut from = 0;
        let mut count = 0;
        while let Some(pos) = skeleton::find_literal(&self.skeleton, &needle, from) {
            self.skeleton.replace_range(pos..pos + needle.len(), "");
            let written = self.write_at(pos, template.clone(), false);
            from = pos + written;
            count += 1;
        }
        count
    }

    /// Remove trailing whitespace.
    pub fn trim_end(&mut self) -> &mut Self {
        let len = self.skeleton.trim_end().len();
        self.skeleton.truncate(len);
        self.invalidate();
        self
    }

    /// Add a named parameter. The query text refers to it by name; names
    /// are not checked for duplicates.
    pub fn add_parameter(
        &mut self,
        name: impl Into<String>,
        value: impl Into<Value>,
        direction: Direction,
    ) -> &mut Self {
        self.explicit.push(ExplicitParameter {
            name: name.into(),
            value: value.into(),
            direction,
        });
        self.invalidate();
        self
    }

    // ----- output -----

    /// Render to query text and parameters. Cached until the next edit.
    pub fn render(&self) -> &Rendered {
        self.rendered.get_or_init(|| {
            render::render(&self.skeleton, &self.params, &self.explicit, &self.options)
        })
    }

    pub fn sql(&self) -> &str {
        &self.render().sql
    }

    /// Query text with values inlined as literals. For logs only.
    pub fn preview(&self) -> &str {
        self.preview
            .get_or_init(|| render::preview(&self.skeleton, &self.params))
    }

    // ----- internals shared with the parser -----

    /// Register a captured parameter, reusing an equal one when enabled.
    pub(crate) fn register(&mut self, param: Parameter) -> usize {
        self.params.add(param, self.options.active_comparer())
    }

    /// Merge a fragment's parameters into this builder and return its
    /// skeleton with placeholders renumbered for this builder.
    pub(crate) fn absorb(&mut self, fragment: &Fragment) -> String {
        self.explicit.extend(fragment.explicit.iter().cloned());
        if fragment.params.is_empty() {
            return fragment.skeleton.clone();
        }

        let before = self.params.len();
        let comparer = self.options.active_comparer();
        let remap: Vec<usize> = fragment
            .params
            .iter()
            .map(|p| self.params.add(p.clone(), comparer))
            .collect();

        let added = self.params.len() - before;
        if added < remap.len() {
            tracing::debug!(
                "Merged fragment reused {} of {} parameters",
                remap.len() - added,
                remap.len()
            );
        }

        skeleton::remap(&fragment.skeleton, |i| match remap.get(i) {
            Some(index) => *index,
            None => panic!(
                "fragment placeholder {{{}}} has no parameter ({} captured)",
                i,
                remap.len()
            ),
        })
    }

    /// Parse `template` and insert it at `pos`. Returns bytes inserted.
    fn write_at(&mut self, pos: usize, template: Template, spaced: bool) -> usize {
        skeleton::assert_boundary(&self.skeleton, pos);
        let text = parser::parse_template(self, template);
        self.insert_text(pos, &text, spaced)
    }

    fn insert_text(&mut self, pos: usize, text: &str, spaced: bool) -> usize {
        self.invalidate();
        if text.is_empty() {
            return 0;
        }
        let symbol = &self.options.parameter_symbol;
        let (lead, trail) = if spaced {
            (
                self.needs_space(last_char(&self.skeleton[..pos]), first_char(text, symbol)),
                self.needs_space(last_char(text), first_char(&self.skeleton[pos..], symbol)),
            )
        } else {
            (false, false)
        };

        let mut inserted = String::with_capacity(text.len() + 2);
        if lead {
            inserted.push(' ');
        }
        inserted.push_str(text);
        if trail {
            inserted.push(' ');
        }
        self.skeleton.insert_str(pos, &inserted);
        inserted.len()
    }

    fn needs_space(&self, before: Option<char>, after: Option<char>) -> bool {
        let spacing = &self.options.auto_spacing;
        match (before, after) {
            (Some(b), Some(a)) => !spacing.is_neutral(b) && !spacing.is_neutral(a),
            _ => false,
        }
    }

    fn invalidate(&mut self) {
        self.rendered.take();
        self.preview.take();
    }
}

/// Last rendered character of skeleton text; a placeholder ends in a digit.
fn last_char(text: &str) -> Option<char> {
    match text.chars().last()? {
        '}' if skeleton::ends_with_placeholder(text) => Some('0'),
        c => Some(c),
    }
}

/// First rendered character of skeleton text.
fn first_char(text: &str, symbol: &str) -> Option<char> {
    match skeleton::first_token(text)? {
        Token::Text(s) => s.chars().next(),
        Token::Escaped(c) => Some(c),
        Token::Placeholder(_) => symbol.chars().next(),
    }
}

/// Structural equality: skeleton and parameters, not caches or options.
impl PartialEq for SqlBuilder {
    fn eq(&self, other: &Self) -> bool {
        self.skeleton == other.skeleton
            && self.params == other.params
            && self.explicit == other.explicit
    }
}

impl fmt::Display for SqlBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.sql())
    }
}

impl From<&SqlBuilder> for Fragment {
    fn from(b: &SqlBuilder) -> Self {
        b.to_fragment()
    }
}

impl From<SqlBuilder> for Fragment {
    fn from(b: SqlBuilder) -> Self {
        b.into_fragment()
    }
}

impl From<&SqlBuilder> for Arg {
    fn from(b: &SqlBuilder) -> Self {
        Arg::Fragment(b.to_fragment())
    }
}

impl From<SqlBuilder> for Arg {
    fn from(b: SqlBuilder) -> Self {
        Arg::Fragment(b.into_fragment())
    }
}

impl From<&SqlBuilder> for Template {
    fn from(b: &SqlBuilder) -> Self {
        b.to_template()
    }
}

impl From<SqlBuilder> for Template {
    fn from(b: SqlBuilder) -> Self {
        Template::new().arg(b)
    }
}
