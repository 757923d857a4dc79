// Copyright © SixtyFPS GmbH <info@slint.dev>
// SPDX-License-Identifier: GPL-3.0-only OR LicenseRef-Slint-Royalty-free-2.0 OR LicenseRef-Slint-Software-3.0

//! Loader for `properties.xml`: property definitions with their options,
//! button mappings and fallback rules.
//!
//! `<include content="…"/>` references are expanded in place before the
//! sections are read; a `suffix` attribute on the reference rewrites every
//! `condition` attribute of the copied body.

use std::path::Path;

use indexmap::IndexMap;
use smol_str::SmolStr;

use super::{attr_bool, opt_attr, opt_condition, read_root, required_attr};
use crate::diagnostics::{ConfigError, ConfigFile, Error};
use crate::object_tree::{
    ButtonMapping, FallbackRule, PropertyDefinition, PropertyOption, PropertySchema,
};
use crate::suffix::apply_suffix_to_condition;
use crate::xmltree::Element;

const FILE: ConfigFile = ConfigFile::Property;

/// Include references cannot nest deeper than this; anything beyond is a
/// reference loop in the configuration.
const MAX_INCLUDE_DEPTH: usize = 10;

pub fn load(path: &Path) -> Result<PropertySchema, Error> {
    let Some(mut root) = read_root(path, FILE)? else {
        return Ok(PropertySchema::default());
    };

    let mut includes = IndexMap::new();
    for section in root.children_named("includes") {
        for include in section.children_named("include") {
            let name = required_attr(include, "name", FILE, path)?;
            includes.insert(SmolStr::new(name), include.clone());
        }
    }
    root.children.retain(|c| c.tag != "includes");
    expand_includes(&mut root, &includes, 0);

    let mut schema = PropertySchema::default();
    for child in &root.children {
        match child.tag.as_str() {
            "property" => {
                let definition = parse_property(child, path)?;
                schema.definitions.insert(definition.name.clone(), definition);
            }
            "buttons" => {
                let group_suffix = child.attr("suffix").unwrap_or_default().to_string();
                for button in child.children_named("button") {
                    schema.buttons.push(parse_button(button, &group_suffix, path)?);
                }
            }
            "fallbacks" => {
                for fallback in child.children_named("fallback") {
                    let property = required_attr(fallback, "property", FILE, path)?;
                    let value = required_attr(fallback, "value", FILE, path)?;
                    schema
                        .fallbacks
                        .entry(property.into())
                        .or_default()
                        .push(FallbackRule {
                            value: value.to_string(),
                            condition: opt_condition(fallback),
                        });
                }
            }
            _ => {}
        }
    }
    Ok(schema)
}

fn expand_includes(element: &mut Element, includes: &IndexMap<SmolStr, Element>, depth: usize) {
    if depth > MAX_INCLUDE_DEPTH {
        log::warn!("include expansion depth exceeded, reference loop?");
        return;
    }
    let mut i = 0;
    while i < element.children.len() {
        let child = &element.children[i];
        if child.tag == "include" && child.attr("content").is_some() {
            let name = child.attr("content").unwrap_or_default().to_string();
            let suffix = child.attr("suffix").unwrap_or_default().to_string();
            element.children.remove(i);
            let Some(definition) = includes.get(name.as_str()) else {
                log::warn!("unknown include '{name}' in properties configuration");
                continue;
            };
            let mut body = definition.clone();
            expand_includes(&mut body, includes, depth + 1);
            if !suffix.is_empty() {
                apply_suffix_recursive(&mut body, &suffix);
            }
            let spliced = body.children.len();
            for (offset, grandchild) in body.children.into_iter().enumerate() {
                element.children.insert(i + offset, grandchild);
            }
            i += spliced;
        } else {
            expand_includes(&mut element.children[i], includes, depth);
            i += 1;
        }
    }
}

fn apply_suffix_recursive(element: &mut Element, suffix: &str) {
    if let Some(condition) = element.attributes.get_mut("condition") {
        *condition = apply_suffix_to_condition(condition, suffix);
    }
    for child in &mut element.children {
        apply_suffix_recursive(child, suffix);
    }
}

fn parse_property(element: &Element, path: &Path) -> Result<PropertyDefinition, Error> {
    let name = required_attr(element, "name", FILE, path)?;
    let kind = match element.attr("type") {
        None => Default::default(),
        Some(raw) => raw.parse().map_err(|_| {
            ConfigError::new(FILE, path, format!("property '{name}' has unknown type '{raw}'"))
                .with_line(element.line)
        })?,
    };
    let mut definition = PropertyDefinition {
        name: name.into(),
        kind,
        requires: element.attr("requires").map(SmolStr::new),
        template_only: attr_bool(element, "templateonly", false),
        options: Vec::new(),
    };
    for option in element.children_named("option") {
        definition.options.push(PropertyOption {
            value: required_attr(option, "value", FILE, path)?.to_string(),
            label: opt_attr(option, "label"),
            condition: opt_condition(option),
            icon: opt_attr(option, "icon"),
        });
    }
    Ok(definition)
}

fn parse_button(element: &Element, group_suffix: &str, path: &Path) -> Result<ButtonMapping, Error> {
    let property = required_attr(element, "property", FILE, path)?;
    let id = match element.attr("id") {
        None => None,
        Some(raw) => Some(raw.parse().map_err(|_| {
            ConfigError::new(FILE, path, format!("button for '{property}' has non-numeric id"))
                .with_line(element.line)
        })?),
    };
    let kind = match element.attr("type") {
        None => None,
        Some(raw) => Some(raw.parse().map_err(|_| {
            ConfigError::new(FILE, path, format!("button for '{property}' has unknown type '{raw}'"))
                .with_line(element.line)
        })?),
    };
    Ok(ButtonMapping {
        id,
        property: property.into(),
        // the enclosing <buttons> suffix is inherited unless overridden
        suffix: element.attr("suffix").unwrap_or(group_suffix).to_string(),
        kind,
        requires: element.attr("requires").map(SmolStr::new),
    })
}
