// Copyright © SixtyFPS GmbH <info@slint.dev>
// SPDX-License-Identifier: GPL-3.0-only OR LicenseRef-Slint-Royalty-free-2.0 OR LicenseRef-Slint-Software-3.0

//! The per-file configuration loaders.
//!
//! Every loader turns one XML file into its typed slice of the
//! configuration graph. A missing file yields the empty default
//! configuration; anything unparsable is a fatal [`crate::Error`] naming
//! the file and, when known, the source line.

pub mod backgrounds;
pub mod menus;
pub mod properties;
pub mod templates;
pub mod views;
pub mod widgets;

use std::path::Path;

use crate::diagnostics::{ConfigError, ConfigFile, Error};
use crate::object_tree::{ContentDescriptor, Grouping, GroupingEntry, ShortcutRecord};
use crate::xmltree::Element;

/// Read and parse a configuration file; `None` when the file is absent.
pub(crate) fn read_root(path: &Path, file: ConfigFile) -> Result<Option<Element>, Error> {
    if !path.exists() {
        log::debug!("{} not present, using defaults", path.display());
        return Ok(None);
    }
    let source = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
    let root = Element::parse_str(&source)
        .map_err(|e| ConfigError::from_parse(file, path, e))?;
    Ok(Some(root))
}

pub(crate) fn required_attr<'e>(
    element: &'e Element,
    name: &str,
    file: ConfigFile,
    path: &Path,
) -> Result<&'e str, Error> {
    element.attr(name).ok_or_else(|| {
        ConfigError::new(
            file,
            path,
            format!("<{}> is missing required attribute '{name}'", element.tag),
        )
        .with_line(element.line)
        .into()
    })
}

pub(crate) fn attr_bool(element: &Element, name: &str, default: bool) -> bool {
    match element.attr(name) {
        Some(value) => value.eq_ignore_ascii_case("true"),
        None => default,
    }
}

pub(crate) fn opt_attr(element: &Element, name: &str) -> Option<String> {
    element.attr(name).filter(|v| !v.is_empty()).map(str::to_string)
}

pub(crate) fn opt_condition(element: &Element) -> Option<String> {
    opt_attr(element, "condition")
}

/// Shared shape of the `<groupings>` trees in menus.xml, widgets.xml and
/// backgrounds.xml: nested groups holding static shortcuts and dynamic
/// `<content>` references.
pub(crate) fn parse_groupings(parent: &Element) -> Vec<Grouping> {
    parent
        .children_named("groupings")
        .flat_map(|g| g.children_named("group"))
        .map(parse_group)
        .collect()
}

fn parse_group(element: &Element) -> Grouping {
    let mut grouping = Grouping {
        label: element.attr("label").unwrap_or_default().to_string(),
        condition: opt_condition(element),
        entries: Vec::new(),
    };
    for child in &element.children {
        match child.tag.as_str() {
            "group" => grouping.entries.push(GroupingEntry::Group(parse_group(child))),
            "shortcut" => grouping.entries.push(GroupingEntry::Shortcut(ShortcutRecord {
                label: child.attr("label").unwrap_or_default().to_string(),
                action: child
                    .attr("action")
                    .map(str::to_string)
                    .unwrap_or_else(|| child.text().trim().to_string()),
                icon: opt_attr(child, "icon"),
                condition: opt_condition(child),
            })),
            "content" => {
                let mut content = ContentDescriptor {
                    source: child.attr("source").unwrap_or_default().to_string(),
                    target: opt_attr(child, "target"),
                    path: opt_attr(child, "path"),
                    extra: Default::default(),
                };
                for (key, value) in &child.attributes {
                    if !matches!(key.as_str(), "source" | "target" | "path") {
                        content.extra.insert(key.clone(), value.clone());
                    }
                }
                grouping.entries.push(GroupingEntry::Content(content));
            }
            _ => {}
        }
    }
    grouping
}
