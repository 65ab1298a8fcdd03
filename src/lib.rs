//! # sqlsplice: injection-safe SQL templates
//!
//! > **Write SQL. Keep values out of it.**
//!
//! Embedded values never become query text. Each one is captured as a
//! parameter and referenced by a generated name (`@p0`, `@parray1`), so
//! the final text is safe to hand to any driver together with its
//! [`ParameterSet`].
//!
//! ## Quick Example
//!
//! ```rust
//! use sqlsplice::prelude::*;
//!
//! let name = "O'Neil";
//! let mut q = SqlBuilder::new();
//! q.append(sql!("SELECT * FROM users WHERE name = {}", name)?)
//!     .append(sql!("AND age > {}", 18)?);
//!
//! let rendered = q.render();
//! assert_eq!(rendered.sql, "SELECT * FROM users WHERE name = @p0 AND age > @p1");
//! assert_eq!(rendered.parameters.names(), vec!["p0", "p1"]);
//! # Ok::<(), sqlsplice::SpliceError>(())
//! ```
//!
//! ## Format strings
//!
//! | Form          | Meaning                                   |
//! |---------------|-------------------------------------------|
//! | `{}`          | next argument                             |
//! | `{N}`         | argument N                                |
//! | `{:ann}`      | argument with annotation (`raw`, `varchar(20)`, ...) |
//! | `{{` `}}`     | literal braces                            |
//! | `{where}`     | kept verbatim, usable as a clause marker  |

/// Build a [`Template`] from a format string and arguments.
///
/// Expands to [`Template::format`], so it returns a
/// [`SpliceResult`]`<Template>`.
#[macro_export]
macro_rules! sql {
    ($fmt:expr $(,)?) => {
        $crate::Template::format($fmt, ::std::vec::Vec::new())
    };
    ($fmt:expr, $($arg:expr),+ $(,)?) => {
        $crate::Template::format($fmt, ::std::vec![$($crate::Arg::from($arg)),+])
    };
}

pub mod builder;
pub mod error;
pub mod filters;
pub mod options;
pub mod params;
mod parser;
pub mod query;
pub mod render;
pub mod skeleton;
pub mod template;
pub mod transform;
pub mod value;

pub use builder::SqlBuilder;
pub use error::{SpliceError, SpliceResult};
pub use filters::{Combinator, Filter, FilterNode, Filters};
pub use options::{AutoSpacing, Options, OptionsBuilder};
pub use params::{
    DefaultComparer, Direction, ExplicitParameter, Parameter, ParameterComparer, ParameterList,
};
pub use query::{Clause, QueryBuilder};
pub use render::{BoundParameter, ParameterSet, Rendered};
pub use template::{Arg, Fragment, Part, Template};
pub use transform::{AnnotationTransformer, ArgumentTransformer, Transformed};
pub use value::{DbType, TypedValue, Value, Width};

pub mod prelude {
    pub use crate::builder::SqlBuilder;
    pub use crate::error::*;
    pub use crate::filters::{Filter, Filters};
    pub use crate::options::Options;
    pub use crate::query::QueryBuilder;
    pub use crate::render::Rendered;
    pub use crate::sql;
    pub use crate::template::{Arg, Template};
    pub use crate::value::{DbType, TypedValue, Value};
}

/// Parse a template into a new builder with the shared default options.
///
/// # Example
///
/// ```rust
/// let q = sqlsplice::parse(sqlsplice::sql!("DELETE FROM t WHERE id = {}", 1)?);
/// assert_eq!(q.sql(), "DELETE FROM t WHERE id = @p0");
/// # Ok::<(), sqlsplice::SpliceError>(())
/// ```
pub fn parse(template: impl Into<Template>) -> SqlBuilder {
    SqlBuilder::parse(template)
}
