// Copyright © SixtyFPS GmbH <info@slint.dev>
// SPDX-License-Identifier: GPL-3.0-only OR LicenseRef-Slint-Royalty-free-2.0 OR LicenseRef-Slint-Software-3.0

//! Boolean condition language evaluated over string properties.
//!
//! Grammar, loosest binding last: `!atom`, `a + b` (and), `a | b` (or),
//! `[…]` for grouping. Atoms test a property: bare name for non-empty,
//! `prop=value`, `prop~value` (substring), `prop IN a,b,c`, `prop EMPTY`.
//! The keyword forms `AND`/`OR`/`NOT`/`EQUALS`/`CONTAINS` are rewritten to
//! the symbols up front. The evaluator is total: anything malformed
//! evaluates to `false`, an empty condition to `true`.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::context::PropertyLookup;

pub fn evaluate(condition: &str, properties: &dyn PropertyLookup) -> bool {
    let trimmed = condition.trim();
    if trimmed.is_empty() {
        return true;
    }
    let normalized = normalize_keywords(trimmed);
    let expanded = expand_compact_or(&normalized);
    let mut parser = Parser { input: expanded.as_bytes(), source: &expanded, pos: 0, properties };
    match parser.parse_or() {
        Some(value) if parser.at_end() => value,
        _ => false,
    }
}

/// Convenience for optional condition fields: absent means unconditional.
pub fn evaluate_opt(condition: Option<&str>, properties: &dyn PropertyLookup) -> bool {
    condition.is_none_or(|c| evaluate(c, properties))
}

static KEYWORD_AND: Lazy<Regex> = Lazy::new(|| Regex::new(r"\bAND\b").unwrap());
static KEYWORD_OR: Lazy<Regex> = Lazy::new(|| Regex::new(r"\bOR\b").unwrap());
static KEYWORD_NOT: Lazy<Regex> = Lazy::new(|| Regex::new(r"\bNOT\b").unwrap());
static KEYWORD_EQUALS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\bEQUALS\b").unwrap());
static KEYWORD_CONTAINS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\bCONTAINS\b").unwrap());

/// Word-boundary-aware rewrite of the keyword operators to their symbol
/// forms, so that keywords embedded in larger words survive.
fn normalize_keywords(condition: &str) -> String {
    let s = KEYWORD_AND.replace_all(condition, "+");
    let s = KEYWORD_OR.replace_all(&s, "|");
    let s = KEYWORD_NOT.replace_all(&s, "!");
    let s = KEYWORD_EQUALS.replace_all(&s, "=");
    KEYWORD_CONTAINS.replace_all(&s, "~").into_owned()
}

/// Expand the compact OR shorthand: `prop=v1 | v2 | v3` becomes
/// `prop=v1 | prop=v2 | prop=v3`. The carried property survives into and
/// out of bracketed groups.
pub fn expand_compact_or(condition: &str) -> String {
    let mut carry = None;
    expand_segments(condition, &mut carry)
}

fn expand_segments(input: &str, carry: &mut Option<(String, char)>) -> String {
    let segments = split_top_level(input, '|');
    if segments.len() == 1 {
        return expand_bracket_groups(input, carry);
    }
    let mut out = Vec::with_capacity(segments.len());
    for segment in segments {
        let trimmed = segment.trim();
        if let Some(inner) = strip_outer_brackets(trimmed) {
            out.push(format!("[{}]", expand_segments(inner, carry)));
        } else if let Some((prop, op)) = comparison_carry(trimmed) {
            *carry = Some((prop, op));
            out.push(trimmed.to_string());
        } else if is_bare_value(trimmed) {
            match carry {
                Some((prop, op)) => out.push(format!("{prop}{op}{trimmed}")),
                None => out.push(trimmed.to_string()),
            }
        } else {
            *carry = None;
            let expanded = expand_bracket_groups(trimmed, carry);
            out.push(expanded);
        }
    }
    out.join(" | ")
}

/// Recurse into embedded `[…]` groups of a segment that is not itself an
/// OR list, preserving everything around them.
fn expand_bracket_groups(segment: &str, carry: &mut Option<(String, char)>) -> String {
    let mut out = String::with_capacity(segment.len());
    let mut rest = segment;
    while let Some(open) = rest.find('[') {
        let bytes = rest.as_bytes();
        let mut depth = 1usize;
        let mut close = open + 1;
        while close < bytes.len() && depth > 0 {
            match bytes[close] {
                b'[' => depth += 1,
                b']' => depth -= 1,
                _ => {}
            }
            close += 1;
        }
        if depth != 0 {
            break;
        }
        out.push_str(&rest[..open]);
        out.push('[');
        out.push_str(&expand_segments(&rest[open + 1..close - 1], carry));
        out.push(']');
        rest = &rest[close..];
    }
    out.push_str(rest);
    out
}

fn split_top_level(input: &str, separator: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (i, c) in input.char_indices() {
        match c {
            '[' => depth += 1,
            ']' => depth = depth.saturating_sub(1),
            c if c == separator && depth == 0 => {
                parts.push(&input[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&input[start..]);
    parts
}

fn strip_outer_brackets(segment: &str) -> Option<&str> {
    let inner = segment.strip_prefix('[')?.strip_suffix(']')?;
    // the brackets must belong together
    let mut depth = 0i32;
    for c in inner.chars() {
        match c {
            '[' => depth += 1,
            ']' => {
                depth -= 1;
                if depth < 0 {
                    return None;
                }
            }
            _ => {}
        }
    }
    (depth == 0).then_some(inner)
}

fn is_identifier(s: &str) -> bool {
    !s.is_empty()
        && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.')
}

/// A plain `prop=value` / `prop~value` comparison whose property can be
/// carried into the following OR operands.
fn comparison_carry(segment: &str) -> Option<(String, char)> {
    let op_index = segment.find(['=', '~'])?;
    let prop = segment[..op_index].trim();
    if !is_identifier(prop) {
        return None;
    }
    let op = segment.as_bytes()[op_index] as char;
    Some((prop.to_string(), op))
}

fn is_bare_value(segment: &str) -> bool {
    !segment.is_empty()
        && !segment.contains(['=', '~', '+', '!', '[', ']'])
        && !segment.contains(" IN ")
        && segment.split_whitespace().last() != Some("EMPTY")
}

struct Parser<'a> {
    input: &'a [u8],
    source: &'a str,
    pos: usize,
    properties: &'a dyn PropertyLookup,
}

impl Parser<'_> {
    fn skip_whitespace(&mut self) {
        while self.pos < self.input.len() && self.input[self.pos].is_ascii_whitespace() {
            self.pos += 1;
        }
    }

    fn eat(&mut self, byte: u8) -> bool {
        self.skip_whitespace();
        if self.pos < self.input.len() && self.input[self.pos] == byte {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn at_end(&mut self) -> bool {
        self.skip_whitespace();
        self.pos == self.input.len()
    }

    fn parse_or(&mut self) -> Option<bool> {
        let mut value = self.parse_and()?;
        while self.eat(b'|') {
            let rhs = self.parse_and()?;
            value = value || rhs;
        }
        Some(value)
    }

    fn parse_and(&mut self) -> Option<bool> {
        let mut value = self.parse_not()?;
        while self.eat(b'+') {
            let rhs = self.parse_not()?;
            value = value && rhs;
        }
        Some(value)
    }

    fn parse_not(&mut self) -> Option<bool> {
        if self.eat(b'!') {
            return Some(!self.parse_not()?);
        }
        self.parse_atom()
    }

    fn parse_atom(&mut self) -> Option<bool> {
        if self.eat(b'[') {
            let value = self.parse_or()?;
            if !self.eat(b']') {
                return None;
            }
            return Some(value);
        }
        self.skip_whitespace();
        let start = self.pos;
        let mut depth = 0usize;
        while self.pos < self.input.len() {
            match self.input[self.pos] {
                b'[' => depth += 1,
                b']' if depth > 0 => depth -= 1,
                b'|' | b'+' | b']' if depth == 0 => break,
                _ => {}
            }
            self.pos += 1;
        }
        let predicate = self.source[start..self.pos].trim();
        if predicate.is_empty() {
            return None;
        }
        Some(evaluate_predicate(predicate, self.properties))
    }
}

fn evaluate_predicate(predicate: &str, properties: &dyn PropertyLookup) -> bool {
    if let Some((prop, values)) = predicate.split_once(" IN ") {
        let current = properties.property(prop.trim()).unwrap_or("");
        return values.split(',').any(|v| v.trim() == current);
    }
    let mut tokens = predicate.split_whitespace();
    if let (Some(prop), Some("EMPTY"), None) = (tokens.next(), tokens.next(), tokens.next()) {
        return properties.property(prop).unwrap_or("").is_empty();
    }
    let eq = predicate.find('=');
    let tilde = predicate.find('~');
    match (eq, tilde) {
        (Some(e), t) if t.is_none_or(|t| e < t) => {
            let (prop, value) = (predicate[..e].trim(), predicate[e + 1..].trim());
            let current = properties.property(prop).unwrap_or("");
            if value.is_empty() {
                current.is_empty()
            } else {
                current == value
            }
        }
        (_, Some(t)) => {
            let (prop, value) = (predicate[..t].trim(), predicate[t + 1..].trim());
            properties.property(prop).unwrap_or("").contains(value)
        }
        (None, None) => !properties.property(predicate).unwrap_or("").is_empty(),
        (Some(_), None) => unreachable!(),
    }
}
