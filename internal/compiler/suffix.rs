// Copyright © SixtyFPS GmbH <info@slint.dev>
// SPDX-License-Identifier: GPL-3.0-only OR LicenseRef-Slint-Royalty-free-2.0 OR LicenseRef-Slint-Software-3.0

//! Rewrites property references with a slot suffix (conventionally `.N`).
//!
//! Multiple parallel slots on one item (say two widgets) are namespaced by
//! appending the suffix to the property identifiers a condition or a
//! `from` source refers to. Iteration built-ins are never rewritten.

/// Identifiers the suffix must not be appended to.
pub const RESERVED_IDENTIFIERS: [&str; 7] =
    ["name", "default", "menu", "index", "id", "idprefix", "suffix"];

pub fn is_reserved(identifier: &str) -> bool {
    RESERVED_IDENTIFIERS.contains(&identifier)
}

fn is_identifier_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'.'
}

/// Append `suffix` to every identifier that precedes an `=` or `~`
/// operator, except the reserved ones. The value side of each comparison is
/// left untouched. An empty suffix is the identity.
pub fn apply_suffix_to_condition(condition: &str, suffix: &str) -> String {
    if suffix.is_empty() || condition.is_empty() {
        return condition.to_string();
    }
    let bytes = condition.as_bytes();
    let mut out = String::with_capacity(condition.len() + suffix.len() * 2);
    let mut copied = 0;
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'=' | b'~' => {
                let mut end = i;
                while end > copied && bytes[end - 1].is_ascii_whitespace() {
                    end -= 1;
                }
                let mut start = end;
                while start > copied && is_identifier_byte(bytes[start - 1]) {
                    start -= 1;
                }
                let identifier = &condition[start..end];
                out.push_str(&condition[copied..end]);
                if !identifier.is_empty() && !is_reserved(identifier) {
                    out.push_str(suffix);
                }
                out.push_str(&condition[end..=i]);
                copied = i + 1;
                // skip over the value so identifiers inside it stay as-is
                i += 1;
                while i < bytes.len() && !matches!(bytes[i], b'|' | b'+' | b'[' | b']') {
                    i += 1;
                }
            }
            _ => i += 1,
        }
    }
    out.push_str(&condition[copied..]);
    out
}

/// Strip trailing `.N` slot segments from an identifier:
/// `widgetPath.2` reads property `widgetPath` through slot 2.
pub fn strip_slot_suffix(name: &str) -> &str {
    let mut base = name;
    while let Some((head, tail)) = base.rsplit_once('.') {
        if head.is_empty() || tail.is_empty() || !tail.bytes().all(|b| b.is_ascii_digit()) {
            break;
        }
        base = head;
    }
    base
}

/// The slot suffix of an identifier (`".2"` for `widgetPath.2`), empty when
/// there is none.
pub fn slot_suffix(name: &str) -> &str {
    &name[strip_slot_suffix(name).len()..]
}

/// Suffix a `from` source name. Reserved names pass through, preset bracket
/// syntax gets the suffix spliced in front of the `[`.
pub fn apply_suffix_to_from(name: &str, suffix: &str) -> String {
    if suffix.is_empty() || is_reserved(name) {
        return name.to_string();
    }
    match name.find('[') {
        Some(bracket) => format!("{}{}{}", &name[..bracket], suffix, &name[bracket..]),
        None => format!("{name}{suffix}"),
    }
}
