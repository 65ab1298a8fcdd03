//! Templates: literal text interleaved with embedded values.
//!
//! A [`Template`] is the ordered list of (literal, value, annotation)
//! pieces the parser consumes. Build one fluently or decompose a format
//! string:
//!
//! ```text
//! "SELECT * FROM users WHERE id = {} AND name = {1:nvarchar(50)} {where}"
//!                                 ─┬      ─────────┬──────────   ──┬──
//!                                  │               │               └── passthrough (marker)
//!                                  │               └── argument 1 with annotation
//!                                  └── next positional argument
//! ```

use nom::{
    IResult,
    branch::alt,
    bytes::complete::{is_not, tag, take_till, take_while},
    character::complete::{char, digit1, satisfy},
    combinator::{map, map_res, opt, recognize, value},
    sequence::{delimited, pair, preceded, tuple},
};

use crate::error::{SpliceError, SpliceResult};
use crate::params::{ExplicitParameter, ParameterList};
use crate::value::{TypedValue, Value};

/// Content of a built builder, embeddable in another template.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Fragment {
    pub(crate) skeleton: String,
    pub(crate) params: ParameterList,
    pub(crate) explicit: Vec<ExplicitParameter>,
}

impl Fragment {
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
        self.skeleton.is_empty() && self.explicit.is_empty()
    }
}

/// An embedded value: a scalar to capture or a fragment to splice.
#[derive(Debug, Clone, PartialEq)]
pub enum Arg {
    Value(Value),
    Fragment(Fragment),
}

impl From<Value> for Arg {
    fn from(v: Value) -> Self {
        Arg::Value(v)
    }
}

impl From<Fragment> for Arg {
    fn from(f: Fragment) -> Self {
        Arg::Fragment(f)
    }
}

impl<T: Into<Value>> From<Option<T>> for Arg {
    fn from(opt: Option<T>) -> Self {
        Arg::Value(opt.into())
    }
}

impl<T: Into<Value>> From<Vec<T>> for Arg {
    fn from(items: Vec<T>) -> Self {
        Arg::Value(items.into())
    }
}

macro_rules! impl_arg_from_value {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for Arg {
                fn from(v: $ty) -> Self {
                    Arg::Value(Value::from(v))
                }
            }
        )*
    };
}

impl_arg_from_value!(
    bool,
    i16,
    i32,
    i64,
    u32,
    f32,
    f64,
    &str,
    String,
    &String,
    &[u8],
    uuid::Uuid,
    chrono::NaiveDateTime,
    chrono::NaiveDate,
    serde_json::Value,
    TypedValue,
);

/// One piece of a template.
#[derive(Debug, Clone, PartialEq)]
pub enum Part {
    Literal(String),
    Arg {
        arg: Arg,
        annotation: Option<String>,
    },
}

/// Literal text interleaved with embedded values.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Template {
    parts: Vec<Part>,
}

impl Template {
    pub fn new() -> Self {
        Self::default()
    }

    /// A template with no embedded values.
    pub fn literal(text: impl Into<String>) -> Self {
        Self::new().lit(text)
    }

    /// Append literal text.
    pub fn lit(mut self, text: impl Into<String>) -> Self {
        let text = text.into();
        if text.is_empty() {
            return self;
        }
        match self.parts.last_mut() {
            Some(Part::Literal(last)) => last.push_str(&text),
            _ => self.parts.push(Part::Literal(text)),
        }
        self
    }

    /// Append an embedded value or fragment.
    pub fn arg(mut self, arg: impl Into<Arg>) -> Self {
        self.parts.push(Part::Arg {
            arg: arg.into(),
            annotation: None,
        });
        self
    }

    /// Splice a built fragment.
    pub fn fragment(self, fragment: impl Into<Fragment>) -> Self {
        self.arg(Arg::Fragment(fragment.into()))
    }

    /// Append an embedded value with an annotation (`varchar(20)`, `raw`, ...).
    pub fn arg_as(mut self, arg: impl Into<Arg>, annotation: impl Into<String>) -> Self {
        self.parts.push(Part::Arg {
            arg: arg.into(),
            annotation: Some(annotation.into()),
        });
        self
    }

    pub fn parts(&self) -> &[Part] {
        &self.parts
    }

    pub fn into_parts(self) -> Vec<Part> {
        self.parts
    }

    pub fn from_parts(parts: Vec<Part>) -> Self {
        Self { parts }
    }

    /// True when parsing would produce no text: only empty literals and
    /// empty fragments.
    pub fn is_empty(&self) -> bool {
        self.parts.iter().all(|p| match p {
            Part::Literal(s) => s.is_empty(),
            Part::Arg { arg: Arg::Fragment(f), .. } => f.is_empty(),
            Part::Arg { .. } => false,
        })
    }

    /// Decompose a format string into a template.
    ///
    /// `{}` takes the next positional argument, `{N}` argument N; either may
    /// carry `:annotation`. `{{` and `}}` are literal braces, and a brace
    /// group holding an identifier (`{where}`) is kept as literal text.
    pub fn format(fmt: &str, args: Vec<Arg>) -> SpliceResult<Self> {
        let mut template = Template::new();
        let mut used = vec![false; args.len()];
        let mut next = 0;
        let mut rest = fmt;

        while !rest.is_empty() {
            let position = fmt.len() - rest.len();
            let (remaining, piece) = parse_piece(rest).map_err(|_| {
                let message = if rest.starts_with('}') {
                    "unmatched '}'"
                } else {
                    "invalid or unterminated '{'"
                };
                SpliceError::format(position, message)
            })?;
            rest = remaining;

            template = match piece {
                Piece::Text(text) | Piece::Passthrough(text) => template.lit(text),
                Piece::Brace(c) => template.lit(c),
                Piece::Arg { index, annotation } => {
                    let index = index.unwrap_or_else(|| {
                        next += 1;
                        next - 1
                    });
                    let arg = args.get(index).ok_or(SpliceError::MissingArgument {
                        index,
                        available: args.len(),
                    })?;
                    used[index] = true;
                    let annotation = annotation.filter(|a| !a.is_empty());
                    match annotation {
                        Some(a) => template.arg_as(arg.clone(), a),
                        None => template.arg(arg.clone()),
                    }
                }
            };
        }

        if let Some(unused) = used.iter().position(|u| !u) {
            return Err(SpliceError::UnusedArgument(unused));
        }
        Ok(template)
    }
}

impl From<&str> for Template {
    fn from(text: &str) -> Self {
        Template::literal(text)
    }
}

impl From<String> for Template {
    fn from(text: String) -> Self {
        Template::literal(text)
    }
}

impl From<Fragment> for Template {
    fn from(fragment: Fragment) -> Self {
        Template::new().arg(fragment)
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Piece<'a> {
    Text(&'a str),
    Brace(char),
    Passthrough(&'a str),
    Arg {
        index: Option<usize>,
        annotation: Option<&'a str>,
    },
}

fn parse_piece(input: &str) -> IResult<&str, Piece<'_>> {
    alt((
        value(Piece::Brace('{'), tag("{{")),
        value(Piece::Brace('}'), tag("}}")),
        parse_arg,
        map(parse_passthrough, Piece::Passthrough),
        map(is_not("{}"), Piece::Text),
    ))(input)
}

/// Parse `{}`, `{2}`, `{:raw}`, `{0:varchar(10)}`.
fn parse_arg(input: &str) -> IResult<&str, Piece<'_>> {
    map(
        delimited(
            char('{'),
            pair(
                opt(map_res(digit1, str::parse::<usize>)),
                opt(preceded(char(':'), take_till(|c| c == '}'))),
            ),
            char('}'),
        ),
        |(index, annotation)| Piece::Arg { index, annotation },
    )(input)
}

/// Parse `{identifier}`, kept verbatim.
fn parse_passthrough(input: &str) -> IResult<&str, &str> {
    recognize(tuple((
        char('{'),
        satisfy(|c| c.is_alphabetic() || c == '_'),
        take_while(|c: char| c.is_alphanumeric() || c == '_'),
        char('}'),
    )))(input)
}
