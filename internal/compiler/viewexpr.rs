// Copyright © SixtyFPS GmbH <info@slint.dev>
// SPDX-License-Identifier: GPL-3.0-only OR LicenseRef-Slint-Royalty-free-2.0 OR LicenseRef-Slint-Software-3.0

//! Generation of the view-locking boolean expressions.
//!
//! For every view some content rule can select, two expressions are
//! emitted: `{prefix}{view}` is true while that view is the effective one
//! for the current listing, `{prefix}{view}_Include` gates conditional
//! loading of the view's control. Plugin-specific user selections
//! additionally produce `{prefix}{content}_HasPluginOverride` and
//! `{prefix}{content}_IsGenericPlugin`.
//!
//! The `<visible>` predicates of the content rules are host-runtime
//! strings and are composed opaquely.

use itertools::Itertools;

use crate::object_tree::{ContentRule, ViewConfig};
use crate::userdata::UserData;
use crate::xmltree::Element;

/// Sources with fixed meaning in the view-selection overlay; everything
/// else is a concrete add-on identifier.
const SOURCE_LIBRARY: &str = "library";
const SOURCE_PLUGINS: &str = "plugins";

/// Host predicate for "the listing comes from an add-on".
const PLUGIN_CONTEXT: &str = "!String.IsEmpty(Container.PluginName)";

pub fn build_expressions(config: &ViewConfig, userdata: &UserData) -> Vec<Element> {
    let mut expressions = Vec::new();
    if config.rules.is_empty() {
        return expressions;
    }

    for view in &config.views {
        if !config.rules.iter().any(|rule| rule.views.contains(&view.id)) {
            continue;
        }
        expressions.push(expression(
            format!("{}{}", config.prefix, view.id),
            selection_terms(config, userdata, &view.id),
        ));
        expressions.push(expression(
            format!("{}{}_Include", config.prefix, view.id),
            config
                .rules
                .iter()
                .filter(|rule| rule.views.contains(&view.id))
                .map(|rule| rule.visible.clone())
                .collect(),
        ));
    }

    for rule in &config.rules {
        let overrides = plugin_overrides(userdata, rule);
        if overrides.is_empty() {
            continue;
        }
        let terms: Vec<String> = overrides
            .iter()
            .map(|(addon, _)| format!("String.IsEqual(Container.PluginName,{addon})"))
            .collect();
        expressions.push(expression(
            format!("{}{}_HasPluginOverride", config.prefix, rule.name),
            terms.clone(),
        ));
        expressions.push(expression(
            format!("{}{}_IsGenericPlugin", config.prefix, rule.name),
            vec![format!("![{}]", terms.join(" | "))],
        ));
    }
    expressions
}

/// The disjuncts making `view` the effective view of some content rule
/// under the current overlay selections.
fn selection_terms(config: &ViewConfig, userdata: &UserData, view: &str) -> Vec<String> {
    let mut terms = Vec::new();
    for rule in &config.rules {
        let library = effective_library_view(userdata, rule);
        let generic_plugin = effective_plugin_view(userdata, rule);
        let overrides = plugin_overrides(userdata, rule);

        let uniform = library.as_deref() == Some(view)
            && generic_plugin.as_deref() == Some(view)
            && overrides.iter().all(|(_, v)| v == view);
        if uniform {
            terms.push(rule.visible.clone());
            continue;
        }

        let exclusions = overrides
            .iter()
            .map(|(addon, _)| format!("!String.IsEqual(Container.PluginName,{addon})"))
            .join(" + ");
        if library.as_deref() == Some(view) {
            terms.push(format!("[{} + ![{PLUGIN_CONTEXT}]]", rule.visible));
        }
        if generic_plugin.as_deref() == Some(view) {
            let mut term = format!("{} + {PLUGIN_CONTEXT}", rule.visible);
            if !exclusions.is_empty() {
                term = format!("{term} + {exclusions}");
            }
            terms.push(format!("[{term}]"));
        }
        for (addon, selected) in &overrides {
            if selected == view {
                terms.push(format!(
                    "[{} + String.IsEqual(Container.PluginName,{addon})]",
                    rule.visible
                ));
            }
        }
    }
    terms
}

/// User selection for the library source, else the rule's library default.
fn effective_library_view(userdata: &UserData, rule: &ContentRule) -> Option<String> {
    userdata
        .view_selection(SOURCE_LIBRARY, &rule.name)
        .map(str::to_string)
        .or_else(|| rule.library_default.as_ref().map(|v| v.to_string()))
}

/// Generic plugin selection; the plugin default overrides the library
/// default in plugin contexts, which itself is the last resort.
fn effective_plugin_view(userdata: &UserData, rule: &ContentRule) -> Option<String> {
    userdata
        .view_selection(SOURCE_PLUGINS, &rule.name)
        .map(str::to_string)
        .or_else(|| rule.plugin_default.as_ref().map(|v| v.to_string()))
        .or_else(|| effective_library_view(userdata, rule))
}

/// Concrete add-on selections for a content rule, in overlay order.
fn plugin_overrides(userdata: &UserData, rule: &ContentRule) -> Vec<(String, String)> {
    userdata
        .views
        .iter()
        .filter(|(source, _)| source.as_str() != SOURCE_LIBRARY && source.as_str() != SOURCE_PLUGINS)
        .filter_map(|(source, selections)| {
            selections.get(rule.name.as_str()).map(|view| (source.clone(), view.clone()))
        })
        .collect()
}

fn expression(name: String, terms: Vec<String>) -> Element {
    let mut element = Element::with_text(
        "expression",
        if terms.is_empty() { "false".to_string() } else { terms.join(" | ") },
    );
    element.set_attr("name", name);
    element
}
