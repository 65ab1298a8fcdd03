//! Skeleton text: literal SQL with positional placeholders.
//!
//! ```text
//! WHERE name = {0} AND tags @> {1} -- literal braces are doubled: {{ }}
//! ```
//!
//! Skeletons are only ever produced by this crate, so a token that fails
//! to parse is a broken invariant and panics.

use nom::{
    IResult,
    branch::alt,
    bytes::complete::{is_not, tag},
    character::complete::{char, digit1},
    combinator::{map, map_res, value},
    sequence::delimited,
};

/// One lexical unit of a skeleton.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token<'a> {
    Text(&'a str),
    /// A doubled `{{` or `}}`, standing for one brace.
    Escaped(char),
    Placeholder(usize),
}

fn parse_escaped(input: &str) -> IResult<&str, Token<'_>> {
    alt((
        value(Token::Escaped('{'), tag("{{")),
        value(Token::Escaped('}'), tag("}}")),
    ))(input)
}

fn parse_placeholder(input: &str) -> IResult<&str, Token<'_>> {
    map_res(delimited(char('{'), digit1, char('}')), |d: &str| {
        d.parse::<usize>().map(Token::Placeholder)
    })(input)
}

fn parse_text(input: &str) -> IResult<&str, Token<'_>> {
    map(is_not("{}"), Token::Text)(input)
}

fn parse_token(input: &str) -> IResult<&str, Token<'_>> {
    alt((parse_escaped, parse_placeholder, parse_text))(input)
}

fn malformed(skeleton: &str, offset: usize) -> ! {
    panic!(
        "malformed skeleton at byte {}: {:?}",
        offset,
        &skeleton[offset..]
    )
}

/// Tokenize a skeleton, pairing each token with its byte offset.
pub fn tokenize(skeleton: &str) -> Vec<(usize, Token<'_>)> {
    let mut tokens = Vec::new();
    let mut rest = skeleton;
    while !rest.is_empty() {
        let offset = skeleton.len() - rest.len();
        match parse_token(rest) {
            Ok((next, token)) => {
                tokens.push((offset, token));
                rest = next;
            }
            Err(_) => malformed(skeleton, offset),
        }
    }
    tokens
}

/// The first token only, without walking the rest of the text.
pub fn first_token(skeleton: &str) -> Option<Token<'_>> {
    if skeleton.is_empty() {
        return None;
    }
    match parse_token(skeleton) {
        Ok((_, token)) => Some(token),
        Err(_) => malformed(skeleton, 0),
    }
}

/// Escape literal text so its braces survive as text.
pub fn escape(text: &str) -> String {
    if !text.contains(['{', '}']) {
        return text.to_string();
    }
    text.replace('{', "{{").replace('}', "}}")
}

/// Placeholder syntax for a parameter index.
pub fn placeholder(index: usize) -> String {
    format!("{{{}}}", index)
}

/// Rewrite every placeholder through `map`.
pub fn remap(skeleton: &str, mut map: impl FnMut(usize) -> usize) -> String {
    let mut out = String::with_capacity(skeleton.len() + 8);
    for (_, token) in tokenize(skeleton) {
        match token {
            Token::Text(s) => out.push_str(s),
            Token::Escaped(c) => {
                out.push(c);
                out.push(c);
            }
            Token::Placeholder(i) => out.push_str(&placeholder(map(i))),
        }
    }
    out
}

/// Placeholder indices in order of appearance.
pub fn placeholders(skeleton: &str) -> Vec<usize> {
    tokenize(skeleton)
        .into_iter()
        .filter_map(|(_, t)| match t {
            Token::Placeholder(i) => Some(i),
            _ => None,
        })
        .collect()
}

/// Start of the run of `b` bytes ending at `end`.
fn run_start(bytes: &[u8], end: usize, b: u8) -> usize {
    let mut start = end;
    while start > 0 && bytes[start - 1] == b {
        start -= 1;
    }
    start
}

/// Start of the run of digits ending just before `end`.
fn digits_start(bytes: &[u8], end: usize) -> usize {
    let mut start = end;
    while start > 0 && bytes[start - 1].is_ascii_digit() {
        start -= 1;
    }
    start
}

/// The `{` at `idx` opens a placeholder. Escapes pair up from the start of
/// a brace run, so only an odd run's last brace can open one.
fn opens_placeholder(bytes: &[u8], idx: usize) -> bool {
    bytes.get(idx + 1).is_some_and(u8::is_ascii_digit)
        && (idx + 1 - run_start(bytes, idx, b'{')) % 2 == 1
}

/// The `}` at `idx` closes a placeholder.
fn closes_placeholder(bytes: &[u8], idx: usize) -> bool {
    let start = digits_start(bytes, idx);
    start < idx && start > 0 && bytes[start - 1] == b'{' && opens_placeholder(bytes, start - 1)
}

/// True if the skeleton text ends with a placeholder.
pub fn ends_with_placeholder(skeleton: &str) -> bool {
    let bytes = skeleton.as_bytes();
    bytes.last() == Some(&b'}') && closes_placeholder(bytes, bytes.len() - 1)
}

/// True if an edit may start or end at `pos`: a token boundary or a
/// position inside plain text. Only the bytes around `pos` are read.
pub fn is_boundary(skeleton: &str, pos: usize) -> bool {
    if pos == 0 || pos == skeleton.len() {
        return true;
    }
    if pos > skeleton.len() || !skeleton.is_char_boundary(pos) {
        return false;
    }
    let bytes = skeleton.as_bytes();

    // inside `{N}`
    let start = digits_start(bytes, pos);
    if start > 0 && bytes[start - 1] == b'{' && opens_placeholder(bytes, start - 1) {
        return false;
    }

    // between the two braces of an escape
    match (bytes[pos - 1], bytes[pos]) {
        (b'{', b'{') => (pos - run_start(bytes, pos - 1, b'{')) % 2 == 0,
        (b'}', b'}') => {
            let mut start = run_start(bytes, pos - 1, b'}');
            if closes_placeholder(bytes, start) {
                start += 1;
            }
            pos <= start || (pos - start) % 2 == 0
        }
        _ => true,
    }
}

/// Panic unless `pos` is a valid edit position.
pub fn assert_boundary(skeleton: &str, pos: usize) {
    if !is_boundary(skeleton, pos) {
        panic!(
            "edit position {} splits a placeholder or escape in {:?}",
            pos, skeleton
        );
    }
}

/// Find `needle` (already escaped) in `skeleton`, starting at `from`, at a
/// position that does not begin inside a placeholder.
pub fn find_literal(skeleton: &str, needle: &str, from: usize) -> Option<usize> {
    if needle.is_empty() {
        return None;
    }
    let mut start = from;
    while let Some(found) = skeleton.get(start..)?.find(needle) {
        let pos = start + found;
        if is_boundary(skeleton, pos) {
            return Some(pos);
        }
        start = pos + 1;
        while !skeleton.is_char_boundary(start) {
            start += 1;
        }
    }
    None
}
