// Copyright © SixtyFPS GmbH <info@slint.dev>
// SPDX-License-Identifier: GPL-3.0-only OR LicenseRef-Slint-Royalty-free-2.0 OR LicenseRef-Slint-Software-3.0

//! The `$MATH[…]` and `$IF[…]` mini languages plus the placeholder
//! substitution helpers shared by the template processor.
//!
//! Both evaluators are total. A `$MATH` expression that cannot be
//! evaluated (parse error, unresolved identifier, division by zero) leaves
//! the whole placeholder in place; a `$IF` chain without a matching branch
//! and without `ELSE` yields the empty string.

use indexmap::IndexMap;
use smol_str::SmolStr;

use crate::condition;
use crate::context::PropertyLookup;

pub const MATH: &str = "$MATH[";
pub const IF: &str = "$IF[";
pub const PROPERTY: &str = "$PROPERTY[";
pub const INCLUDE: &str = "$INCLUDE[";
pub const EXP: &str = "$EXP[";
pub const PARAM: &str = "$PARAM[";
pub const PARENT: &str = "$PARENT[";

/// How often a substitution pass will run over one text node before giving
/// up on pathologically self-producing input.
const SUBSTITUTION_LIMIT: usize = 50;

/// Locate the first `marker…]` occurrence with balanced inner brackets.
/// Returns (marker start, payload start, payload end).
pub fn find_bracketed(text: &str, marker: &str) -> Option<(usize, usize, usize)> {
    find_bracketed_from(text, marker, 0)
}

fn find_bracketed_from(text: &str, marker: &str, from: usize) -> Option<(usize, usize, usize)> {
    let start = text[from..].find(marker)? + from;
    let payload = start + marker.len();
    let mut depth = 1usize;
    for (i, b) in text.as_bytes()[payload..].iter().enumerate() {
        match *b {
            b'[' => depth += 1,
            b']' => {
                depth -= 1;
                if depth == 0 {
                    return Some((start, payload, payload + i));
                }
            }
            _ => {}
        }
    }
    None
}

/// Replace every `marker…]` occurrence through `resolve`; a `None` result
/// leaves the occurrence untouched. Replacement text is not rescanned.
pub fn substitute_placeholder(
    text: &str,
    marker: &str,
    mut resolve: impl FnMut(&str) -> Option<String>,
) -> String {
    if !text.contains(marker) {
        return text.to_string();
    }
    let mut out = text.to_string();
    let mut search = 0;
    for _ in 0..SUBSTITUTION_LIMIT {
        let Some((start, payload, end)) = find_bracketed_from(&out, marker, search) else {
            break;
        };
        match resolve(&out[payload..end]) {
            Some(replacement) => {
                out.replace_range(start..=end, &replacement);
                search = start + replacement.len();
            }
            None => search = end + 1,
        }
    }
    out
}

pub fn substitute_math(text: &str, properties: &dyn PropertyLookup) -> String {
    substitute_placeholder(text, MATH, |expr| evaluate_math(expr, properties))
}

pub fn substitute_if(text: &str, properties: &dyn PropertyLookup) -> String {
    substitute_placeholder(text, IF, |body| evaluate_if(body, properties))
}

pub fn substitute_property(text: &str, properties: &dyn PropertyLookup) -> String {
    substitute_placeholder(text, PROPERTY, |name| {
        Some(properties.property(name.trim()).unwrap_or("").to_string())
    })
}

/// Inline named expression strings; groups of expressions may reference
/// each other, so run a bounded number of passes.
pub fn inline_expressions(text: &str, expressions: &IndexMap<SmolStr, String>) -> String {
    let mut out = text.to_string();
    for _ in 0..10 {
        if !out.contains(EXP) {
            break;
        }
        out = substitute_placeholder(&out, EXP, |name| {
            Some(expressions.get(name.trim()).cloned().unwrap_or_else(|| {
                log::warn!("unknown expression '{}'", name.trim());
                String::new()
            }))
        });
    }
    out
}

pub fn substitute_params(text: &str, params: &IndexMap<SmolStr, String>) -> String {
    substitute_placeholder(text, PARAM, |name| {
        Some(params.get(name.trim()).cloned().unwrap_or_default())
    })
}

/// Evaluate an arithmetic expression over the property environment.
/// Integral results are formatted without a trailing `.0`.
pub fn evaluate_math(expr: &str, properties: &dyn PropertyLookup) -> Option<String> {
    let mut parser = MathParser { input: expr.as_bytes(), source: expr, pos: 0, properties };
    let value = parser.parse_expression()?;
    parser.skip_whitespace();
    if parser.pos != parser.input.len() {
        return None;
    }
    Some(format_number(value))
}

fn format_number(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 9.0e15 {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}

struct MathParser<'a> {
    input: &'a [u8],
    source: &'a str,
    pos: usize,
    properties: &'a dyn PropertyLookup,
}

impl MathParser<'_> {
    fn skip_whitespace(&mut self) {
        while self.pos < self.input.len() && self.input[self.pos].is_ascii_whitespace() {
            self.pos += 1;
        }
    }

    fn peek(&mut self) -> Option<u8> {
        self.skip_whitespace();
        self.input.get(self.pos).copied()
    }

    fn parse_expression(&mut self) -> Option<f64> {
        let mut value = self.parse_term()?;
        loop {
            match self.peek() {
                Some(b'+') => {
                    self.pos += 1;
                    value += self.parse_term()?;
                }
                Some(b'-') => {
                    self.pos += 1;
                    value -= self.parse_term()?;
                }
                _ => return Some(value),
            }
        }
    }

    fn parse_term(&mut self) -> Option<f64> {
        let mut value = self.parse_unary()?;
        loop {
            match self.peek() {
                Some(b'*') => {
                    self.pos += 1;
                    value *= self.parse_unary()?;
                }
                Some(b'/') => {
                    let floor = self.input.get(self.pos + 1) == Some(&b'/');
                    self.pos += if floor { 2 } else { 1 };
                    let rhs = self.parse_unary()?;
                    if rhs == 0.0 {
                        return None;
                    }
                    value = if floor { (value / rhs).floor() } else { value / rhs };
                }
                Some(b'%') => {
                    self.pos += 1;
                    let rhs = self.parse_unary()?;
                    if rhs == 0.0 {
                        return None;
                    }
                    value -= rhs * (value / rhs).floor();
                }
                _ => return Some(value),
            }
        }
    }

    fn parse_unary(&mut self) -> Option<f64> {
        match self.peek() {
            Some(b'-') => {
                self.pos += 1;
                Some(-self.parse_unary()?)
            }
            Some(b'+') => {
                self.pos += 1;
                self.parse_unary()
            }
            _ => self.parse_primary(),
        }
    }

    fn parse_primary(&mut self) -> Option<f64> {
        match self.peek()? {
            b'(' => {
                self.pos += 1;
                let value = self.parse_expression()?;
                if self.peek() != Some(b')') {
                    return None;
                }
                self.pos += 1;
                Some(value)
            }
            b'0'..=b'9' | b'.' => self.parse_number(),
            b if b.is_ascii_alphabetic() || b == b'_' => self.parse_identifier(),
            _ => None,
        }
    }

    fn parse_number(&mut self) -> Option<f64> {
        let start = self.pos;
        let mut seen_dot = false;
        while let Some(&b) = self.input.get(self.pos) {
            match b {
                b'0'..=b'9' => self.pos += 1,
                b'.' if !seen_dot => {
                    seen_dot = true;
                    self.pos += 1;
                }
                _ => break,
            }
        }
        self.source[start..self.pos].parse().ok()
    }

    fn parse_identifier(&mut self) -> Option<f64> {
        let start = self.pos;
        while let Some(&b) = self.input.get(self.pos) {
            if b.is_ascii_alphanumeric() || b == b'_' || b == b'.' {
                self.pos += 1;
            } else {
                break;
            }
        }
        let value = self.properties.property(&self.source[start..self.pos])?;
        value.trim().parse().ok()
    }
}

/// Evaluate a `cond THEN value (ELIF cond THEN value)* (ELSE value)?`
/// chain. Returns `None` only for malformed input (missing `THEN`).
pub fn evaluate_if(body: &str, properties: &dyn PropertyLookup) -> Option<String> {
    let mut rest = body;
    loop {
        let then_pos = find_top_level(rest, " THEN ")?;
        let cond = &rest[..then_pos];
        let after = &rest[then_pos + " THEN ".len()..];
        let elif_pos = find_top_level(after, " ELIF ");
        let else_pos = find_top_level(after, " ELSE ");
        let value_end = [elif_pos, else_pos].into_iter().flatten().min().unwrap_or(after.len());
        if condition::evaluate(cond, properties) {
            return Some(after[..value_end].trim().to_string());
        }
        match (elif_pos, else_pos) {
            (Some(i), j) if j.is_none_or(|j| i < j) => rest = &after[i + " ELIF ".len()..],
            (_, Some(j)) => return Some(after[j + " ELSE ".len()..].trim().to_string()),
            (None, None) => return Some(String::new()),
            (Some(_), None) => unreachable!(),
        }
    }
}

fn find_top_level(text: &str, token: &str) -> Option<usize> {
    let bytes = text.as_bytes();
    let mut depth = 0usize;
    for i in 0..bytes.len() {
        match bytes[i] {
            b'[' => depth += 1,
            b']' => depth = depth.saturating_sub(1),
            _ if depth == 0 && text[i..].starts_with(token) => return Some(i),
            _ => {}
        }
    }
    None
}
