//! Template parser.
//!
//! Turns a [`Template`] into skeleton text for a target builder. Literal
//! pieces are escaped, scalar values go through the argument transformer
//! and become placeholders, and embedded fragments are merged so their
//! placeholders point at the target's parameter list.

use crate::builder::SqlBuilder;
use crate::skeleton;
use crate::template::{Arg, Part, Template};
use crate::transform::Transformed;

/// Parse `template`, registering its values with `target`, and return the
/// skeleton text to insert. The target's skeleton is left untouched.
pub(crate) fn parse_template(target: &mut SqlBuilder, template: Template) -> String {
    let options = target.options().clone();
    let mut parts = template.into_parts();

    if options.auto_dedent {
        dedent(&mut parts);
    }

    let mut out = String::new();
    let mut prev_quoted = false;
    let mut strip_next_quote = false;
    let mut parts = parts.into_iter().peekable();

    while let Some(part) = parts.next() {
        match part {
            Part::Literal(text) => {
                let text = if strip_next_quote {
                    &text[1..]
                } else {
                    text.as_str()
                };
                strip_next_quote = false;
                prev_quoted = ends_with_single_quote(text);
                out.push_str(&skeleton::escape(text));
            }
            Part::Arg {
                arg: Arg::Fragment(fragment),
                ..
            } => {
                prev_quoted = false;
                out.push_str(&target.absorb(&fragment));
            }
            Part::Arg {
                arg: Arg::Value(value),
                annotation,
            } => {
                let quoted = prev_quoted;
                prev_quoted = false;
                match options.transformer.transform(value, annotation.as_deref()) {
                    Transformed::Literal(text) => out.push_str(&skeleton::escape(&text)),
                    Transformed::Parameter(param) => {
                        let closes = matches!(
                            parts.peek(),
                            Some(Part::Literal(next)) if starts_with_single_quote(next)
                        );
                        if options.auto_strip_quotes && quoted && closes {
                            out.pop();
                            strip_next_quote = true;
                        }
                        let index = target.register(param);
                        out.push_str(&skeleton::placeholder(index));
                    }
                }
            }
        }
    }
    out
}

/// A single quote that is not part of a doubled `''`.
fn ends_with_single_quote(text: &str) -> bool {
    text.ends_with('\'') && !text.ends_with("''")
}

fn starts_with_single_quote(text: &str) -> bool {
    text.starts_with('\'') && !text.starts_with("''")
}

/// Remove the indentation shared by all non-blank lines, a leading blank
/// line, and a trailing whitespace-only line.
fn dedent(parts: &mut [Part]) {
    let last = parts.len().saturating_sub(1);

    if let Some(Part::Literal(first)) = parts.first_mut() {
        if let Some(nl) = first.find('\n') {
            if first[..nl].trim().is_empty() {
                first.drain(..=nl);
            }
        }
    }
    if let Some(Part::Literal(tail)) = parts.last_mut() {
        if let Some(nl) = tail.rfind('\n') {
            if tail[nl + 1..].trim().is_empty() {
                tail.truncate(nl);
                if tail.ends_with('\r') {
                    tail.pop();
                }
            }
        }
    }

    let mut indent: Option<usize> = None;
    for (i, part) in parts.iter().enumerate() {
        let Part::Literal(text) = part else { continue };
        for start in line_starts(text, i == 0) {
            let line = &text[start..];
            let width = line.chars().take_while(|c| *c == ' ' || *c == '\t').count();
            let rest = &line[width..];
            let blank = rest.starts_with('\n')
                || rest.starts_with("\r\n")
                || (rest.is_empty() && i == last);
            if !blank {
                indent = Some(indent.map_or(width, |w| w.min(width)));
            }
        }
    }

    let Some(indent) = indent.filter(|w| *w > 0) else {
        return;
    };
    for (i, part) in parts.iter_mut().enumerate() {
        let Part::Literal(text) = part else { continue };
        let mut out = String::with_capacity(text.len());
        let mut skip = if i == 0 { indent } else { 0 };
        for c in text.chars() {
            if skip > 0 && (c == ' ' || c == '\t') {
                skip -= 1;
                continue;
            }
            skip = 0;
            out.push(c);
            if c == '\n' {
                skip = indent;
            }
        }
        *text = out;
    }
}

/// Byte offsets where a line begins inside `text`.
fn line_starts(text: &str, starts_template: bool) -> Vec<usize> {
    let mut starts: Vec<usize> = text.match_indices('\n').map(|(i, _)| i + 1).collect();
    if starts_template {
        starts.insert(0, 0);
    }
    starts
}
