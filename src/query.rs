//! Clause assembly.
//!
//! A [`QueryBuilder`] wraps a template builder and collects clause
//! contributions (select columns, sources, filters, grouping, having
//! conditions, ordering). On build it substitutes each clause at its marker
//! in the template, or appends the canonical clause when no marker exists.
//!
//! Markers for clause `c` (`select`, `from`, `where`, `groupby`, `having`,
//! `orderby`), tried in order:
//!
//! | marker                | replaced with                        |
//! |-----------------------|--------------------------------------|
//! | `/**c**/`, `{c}`      | the whole clause, keyword included   |
//! | `/**c_additional**/`, `{c_additional}` | a continuation (`, ...` or `AND ...`) |

use std::cell::OnceCell;
use std::sync::Arc;

use crate::builder::SqlBuilder;
use crate::filters::{Filter, Filters};
use crate::options::Options;
use crate::render::Rendered;
use crate::template::Template;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Clause {
    Select,
    From,
    Where,
    GroupBy,
    Having,
    OrderBy,
}

impl Clause {
    /// Assembly order.
    pub const ALL: [Clause; 6] = [
        Clause::Select,
        Clause::From,
        Clause::Where,
        Clause::GroupBy,
        Clause::Having,
        Clause::OrderBy,
    ];

    pub fn keyword(self) -> &'static str {
        match self {
            Clause::Select => "SELECT",
            Clause::From => "FROM",
            Clause::Where => "WHERE",
            Clause::GroupBy => "GROUP BY",
            Clause::Having => "HAVING",
            Clause::OrderBy => "ORDER BY",
        }
    }

    pub fn marker_name(self) -> &'static str {
        match self {
            Clause::Select => "select",
            Clause::From => "from",
            Clause::Where => "where",
            Clause::GroupBy => "groupby",
            Clause::Having => "having",
            Clause::OrderBy => "orderby",
        }
    }

    /// Markers in lookup order; `true` marks the continuation forms.
    pub fn markers(self) -> [(String, bool); 4] {
        let name = self.marker_name();
        [
            (format!("/**{}**/", name), false),
            (format!("{{{}}}", name), false),
            (format!("/**{}_additional**/", name), true),
            (format!("{{{}_additional}}", name), true),
        ]
    }
}

/// A comma- or space-joined clause list.
#[derive(Debug, Clone)]
struct ClauseList {
    items: SqlBuilder,
    /// Separator of the first entry, used to continue an existing clause.
    lead: &'static str,
}

impl ClauseList {
    fn new(options: Arc<Options>) -> Self {
        Self {
            items: SqlBuilder::with_options(options),
            lead: ", ",
        }
    }

    fn push(&mut self, separator: &'static str, template: Template) {
        if self.items.is_empty() {
            self.lead = separator;
        }
        self.items.append_separated(separator, template);
    }

    fn set_options(&mut self, options: Arc<Options>) {
        self.items.set_options(options);
    }

    fn whole(&self, keyword: &str) -> SqlBuilder {
        let mut out = SqlBuilder::with_options(self.items.options().clone());
        out.append_literal(keyword)
            .append_literal(" ")
            .append_unspaced(&self.items);
        out
    }

    fn continuation(&self) -> SqlBuilder {
        let mut out = SqlBuilder::with_options(self.items.options().clone());
        out.append_literal(self.lead).append_unspaced(&self.items);
        out
    }
}

/// Template builder plus clause accumulators.
///
/// ```
/// use sqlsplice::{QueryBuilder, sql};
///
/// let mut q = QueryBuilder::from_template("SELECT * FROM users /**where**/ ORDER BY id");
/// q.where_(sql!("age > {}", 18).unwrap())
///     .where_(sql!("name = {}", "bob").unwrap());
/// assert_eq!(
///     q.render().sql,
///     "SELECT * FROM users WHERE age > @p0 AND name = @p1 ORDER BY id"
/// );
/// ```
#[derive(Debug, Clone)]
pub struct QueryBuilder {
    options: Arc<Options>,
    template: SqlBuilder,
    select: ClauseList,
    from: ClauseList,
    filters: Filters,
    group_by: ClauseList,
    having: Filters,
    order_by: ClauseList,
    built: OnceCell<SqlBuilder>,
}

impl Default for QueryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl QueryBuilder {
    /// Empty template; every clause is appended in canonical order.
    pub fn new() -> Self {
        Self::with_options(Options::shared_default())
    }

    pub fn with_options(options: Arc<Options>) -> Self {
        Self::from_builder(SqlBuilder::with_options(options))
    }

    pub fn from_template(template: impl Into<Template>) -> Self {
        Self::from_builder(SqlBuilder::parse(template))
    }

    pub fn from_template_with(options: Arc<Options>, template: impl Into<Template>) -> Self {
        Self::from_builder(SqlBuilder::parse_with(options, template))
    }

    /// Wrap an existing builder as the template. Its options apply to
    /// every clause.
    pub fn from_builder(template: SqlBuilder) -> Self {
        let options = template.options().clone();
        Self {
            select: ClauseList::new(options.clone()),
            from: ClauseList::new(options.clone()),
            filters: Filters::default(),
            group_by: ClauseList::new(options.clone()),
            having: Filters::default(),
            order_by: ClauseList::new(options.clone()),
            options,
            template,
            built: OnceCell::new(),
        }
    }

    pub fn options(&self) -> &Arc<Options> {
        &self.options
    }

    pub fn set_options(&mut self, options: Arc<Options>) -> &mut Self {
        self.template.set_options(options.clone());
        for list in [
            &mut self.select,
            &mut self.from,
            &mut self.group_by,
            &mut self.order_by,
        ] {
            list.set_options(options.clone());
        }
        self.options = options;
        self.invalidate()
    }

    pub fn template(&self) -> &SqlBuilder {
        &self.template
    }

    /// Add to the template itself.
    pub fn append(&mut self, template: impl Into<Template>) -> &mut Self {
        self.template.append(template);
        self.invalidate()
    }

    pub fn select(&mut self, column: impl Into<Template>) -> &mut Self {
        self.select.push(", ", column.into());
        self.invalidate()
    }

    /// Add a comma-separated source.
    pub fn from_table(&mut self, source: impl Into<Template>) -> &mut Self {
        self.from.push(", ", source.into());
        self.invalidate()
    }

    /// Add a join; `join` carries its own keyword (`LEFT JOIN b ON ...`).
    pub fn join(&mut self, join: impl Into<Template>) -> &mut Self {
        self.from.push(" ", join.into());
        self.invalidate()
    }

    /// AND a condition into the WHERE clause.
    pub fn where_(&mut self, condition: impl Into<Template>) -> &mut Self {
        self.filters.push(Filter::new(condition));
        self.invalidate()
    }

    /// AND an OR group into the WHERE clause.
    pub fn where_any<I, T>(&mut self, conditions: I) -> &mut Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Template>,
    {
        self.filters
            .push(Filters::or(conditions.into_iter().map(Filter::new)));
        self.invalidate()
    }

    pub fn group_by(&mut self, column: impl Into<Template>) -> &mut Self {
        self.group_by.push(", ", column.into());
        self.invalidate()
    }

    pub fn having(&mut self, condition: impl Into<Template>) -> &mut Self {
        self.having.push(Filter::new(condition));
        self.invalidate()
    }

    pub fn order_by(&mut self, column: impl Into<Template>) -> &mut Self {
        self.order_by.push(", ", column.into());
        self.invalidate()
    }

    /// Direct access to the WHERE filter tree, e.g. to switch the top level
    /// to OR. Invalidates the built query.
    pub fn filters_mut(&mut self) -> &mut Filters {
        self.built.take();
        &mut self.filters
    }

    pub fn filters(&self) -> &Filters {
        &self.filters
    }

    /// The assembled builder. Built once, reused until the next change.
    ///
    /// Each clause uses one marker spelling: the first found in the order
    /// `/**c**/`, `{c}`, `/**c_additional**/`, `{c_additional}`. Every
    /// occurrence of that spelling is replaced. Other spellings of the same
    /// clause stay in the text as they are.
    pub fn build(&self) -> &SqlBuilder {
        self.built.get_or_init(|| self.assemble())
    }

    pub fn render(&self) -> &Rendered {
        self.build().render()
    }

    pub fn sql(&self) -> &str {
        self.build().sql()
    }

    fn invalidate(&mut self) -> &mut Self {
        self.built.take();
        self
    }

    /// Whole clause and its continuation form, or `None` when nothing was
    /// contributed.
    fn clause_parts(&self, clause: Clause) -> Option<(SqlBuilder, SqlBuilder)> {
        let list = match clause {
            Clause::Select => &self.select,
            Clause::From => &self.from,
            Clause::GroupBy => &self.group_by,
            Clause::OrderBy => &self.order_by,
            Clause::Where | Clause::Having => {
                let filters = if clause == Clause::Where {
                    &self.filters
                } else {
                    &self.having
                };
                if filters.is_empty() {
                    return None;
                }
                return Some((
                    filters.build_clause(self.options.clone(), clause.keyword()),
                    filters.build_continuation(self.options.clone()),
                ));
            }
        };
        if list.items.is_empty() {
            return None;
        }
        Some((list.whole(clause.keyword()), list.continuation()))
    }

    fn assemble(&self) -> SqlBuilder {
        let mut out = self.template.clone();
        for clause in Clause::ALL {
            let Some((whole, continuation)) = self.clause_parts(clause) else {
                continue;
            };
            let placed = clause.markers().into_iter().find_map(|(marker, is_continuation)| {
                let content = if is_continuation { &continuation } else { &whole };
                let count = out.replace_all(&marker, content);
                (count > 0).then_some((marker, count))
            });
            match placed {
                Some((marker, count)) => {
                    tracing::debug!(
                        "{} placed at {} ({} occurrence(s))",
                        clause.keyword(),
                        marker,
                        count
                    );
                }
                None => {
                    tracing::debug!("{} has no marker, appending", clause.keyword());
                    out.append(&whole);
                }
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sql;
    use crate::value::Value;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_canonical_order_without_markers() {
        let mut q = QueryBuilder::new();
        q.order_by("name")
            .where_(sql!("age > {}", 18).unwrap())
            .from_table("users u")
            .select("u.id")
            .select("u.name")
            .join("JOIN teams t ON t.id = u.team_id")
            .group_by("u.id")
            .group_by("u.name")
            .having(sql!("COUNT(*) > {}", 1).unwrap());
        assert_eq!(
            q.render().sql,
            "SELECT u.id, u.name FROM users u JOIN teams t ON t.id = u.team_id \
             WHERE age > @p0 GROUP BY u.id, u.name HAVING COUNT(*) > @p1 ORDER BY name"
        );
    }

    #[test]
    fn test_marker_replaced() {
        let mut q = QueryBuilder::from_template("SELECT * FROM users {where} ORDER BY id");
        q.where_(sql!("id = {}", 3).unwrap());
        assert_eq!(q.render().sql, "SELECT * FROM users WHERE id = @p0 ORDER BY id");
    }

    #[test]
    fn test_unused_marker_left_untouched() {
        let q = QueryBuilder::from_template("SELECT * FROM users /**where**/");
        assert_eq!(q.render().sql, "SELECT * FROM users /**where**/");
    }

    #[test]
    fn test_additional_marker_continues_clause() {
        let mut q = QueryBuilder::from_template(
            "SELECT a /**select_additional**/ FROM t WHERE x = 1 /**where_additional**/",
        );
        q.select("b").select("c").where_(sql!("y = {}", 2).unwrap());
        assert_eq!(
            q.render().sql,
            "SELECT a , b, c FROM t WHERE x = 1 AND y = @p0"
        );
    }

    #[test]
    fn test_additional_or_group_parenthesized() {
        let mut q = QueryBuilder::from_template("SELECT * FROM t WHERE x = 1 {where_additional}");
        *q.filters_mut() = Filters::or([Filter::new("a = 1"), Filter::new("b = 2")]);
        assert_eq!(
            q.render().sql,
            "SELECT * FROM t WHERE x = 1 AND (a = 1 OR b = 2)"
        );
    }

    #[test]
    fn test_where_any_group() {
        let mut q = QueryBuilder::from_template("SELECT * FROM t");
        q.where_("active")
            .where_any([sql!("a = {}", 1).unwrap(), sql!("b = {}", 2).unwrap()]);
        assert_eq!(
            q.render().sql,
            "SELECT * FROM t WHERE active AND (a = @p0 OR b = @p1)"
        );
    }

    #[test]
    fn test_marker_replaced_everywhere() {
        let mut q = QueryBuilder::from_template(
            "SELECT * FROM a /**where**/ UNION SELECT * FROM b /**where**/",
        );
        q.where_(sql!("k = {}", 9).unwrap());
        let rendered = q.render();
        assert_eq!(
            rendered.sql,
            "SELECT * FROM a WHERE k = @p0 UNION SELECT * FROM b WHERE k = @p1"
        );
        assert_eq!(rendered.parameters.len(), 2);
    }

    #[test]
    fn test_template_params_come_first() {
        let template = sql!("SELECT * FROM t WHERE tenant = {} /**where_additional**/", 7).unwrap();
        let mut q = QueryBuilder::from_template(template);
        q.where_(sql!("id = {}", 1).unwrap());
        let rendered = q.render();
        assert_eq!(
            rendered.sql,
            "SELECT * FROM t WHERE tenant = @p0 AND id = @p1"
        );
        assert_eq!(
            rendered.parameters.get("p1").map(|p| &p.value),
            Some(&Value::Int(1))
        );
    }

    #[test]
    fn test_build_cached_until_changed() {
        let mut q = QueryBuilder::from_template("SELECT * FROM t");
        let first: *const SqlBuilder = q.build();
        let second: *const SqlBuilder = q.build();
        assert!(std::ptr::eq(first, second));

        q.where_("x = 1");
        assert_eq!(q.sql(), "SELECT * FROM t WHERE x = 1");
    }

    #[test]
    fn test_build_is_structurally_stable() {
        let mut q = QueryBuilder::from_template("SELECT * FROM t {where}");
        q.where_(sql!("a = {}", 1).unwrap());
        let once = q.build().clone();
        q.append("");
        assert_eq!(q.build(), &once);
    }

    #[test]
    fn test_empty_where_ignored() {
        let mut q = QueryBuilder::from_template("SELECT * FROM t");
        q.where_(sql!("a = {}", 1).unwrap());
        q.where_(&SqlBuilder::new());
        assert_eq!(q.sql(), "SELECT * FROM t WHERE a = @p0");
    }

    #[test]
    fn test_from_marker() {
        let mut q = QueryBuilder::from_template("SELECT * /**from**/");
        q.from_table("t");
        assert_eq!(q.sql(), "SELECT * FROM t");
    }

    #[test]
    fn test_from_additional_after_table() {
        let mut q = QueryBuilder::from_template("SELECT * FROM a{from_additional} WHERE x = 1");
        q.from_table("b").join("JOIN c ON c.id = b.id");
        assert_eq!(q.sql(), "SELECT * FROM a, b JOIN c ON c.id = b.id WHERE x = 1");
    }

    #[test]
    fn test_from_additional_after_join() {
        let mut q = QueryBuilder::from_template("SELECT * FROM a{from_additional}");
        q.join("JOIN b ON b.a_id = a.id");
        assert_eq!(q.sql(), "SELECT * FROM a JOIN b ON b.a_id = a.id");
    }

    #[test]
    fn test_having_and_orderby_markers() {
        let mut q = QueryBuilder::from_template(
            "SELECT a, COUNT(*) FROM t GROUP BY a {having} /**orderby**/",
        );
        q.having(sql!("COUNT(*) > {}", 1).unwrap()).order_by("a");
        assert_eq!(
            q.sql(),
            "SELECT a, COUNT(*) FROM t GROUP BY a HAVING COUNT(*) > @p0 ORDER BY a"
        );
    }

    #[test]
    fn test_groupby_additional_marker() {
        let mut q = QueryBuilder::from_template("SELECT a, b FROM t GROUP BY a/**groupby_additional**/");
        q.group_by("b");
        assert_eq!(q.sql(), "SELECT a, b FROM t GROUP BY a, b");
    }

    #[test]
    fn test_having_additional_marker() {
        let mut q = QueryBuilder::from_template(
            "SELECT a FROM t GROUP BY a HAVING SUM(x) > 0 /**having_additional**/",
        );
        q.having("COUNT(*) > 1");
        assert_eq!(
            q.sql(),
            "SELECT a FROM t GROUP BY a HAVING SUM(x) > 0 AND COUNT(*) > 1"
        );
    }

    #[test]
    fn test_first_marker_spelling_wins() {
        let mut q = QueryBuilder::from_template(
            "SELECT * FROM a WHERE x = 1 /**where_additional**/ UNION SELECT * FROM b /**where**/",
        );
        q.where_("y = 2");
        assert_eq!(
            q.sql(),
            "SELECT * FROM a WHERE x = 1 /**where_additional**/ UNION SELECT * FROM b WHERE y = 2"
        );
    }
}
