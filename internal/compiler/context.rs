// Copyright © SixtyFPS GmbH <info@slint.dev>
// SPDX-License-Identifier: GPL-3.0-only OR LicenseRef-Slint-Royalty-free-2.0 OR LicenseRef-Slint-Software-3.0

//! Assembly of the per-iteration property context.
//!
//! For every (template output, item) pair the processor sees, a fresh
//! property map is layered up in a fixed order: menu defaults, item
//! properties, iteration built-ins, schema fallbacks, then the template's
//! own properties, vars, preset references and property-group references.
//! From the fallbacks on, every step only writes keys that are still
//! unset, so earlier steps always win.

use indexmap::IndexMap;
use smol_str::SmolStr;

use crate::condition;
use crate::expression;
use crate::object_tree::{
    Menu, MenuItem, Preset, PropertyGroupEntry, PropertySchema, PropertyValue, Reference, Template,
    TemplateOutput, TemplateProperty, TemplateSchema, TemplateVar,
};
use crate::suffix::{apply_suffix_to_condition, apply_suffix_to_from, slot_suffix};

pub type PropertyMap = IndexMap<SmolStr, String>;

/// Read access to string properties; the seam shared by the condition and
/// expression evaluators so they can run against plain maps, context+item
/// chains and suffixed views alike.
pub trait PropertyLookup {
    fn property(&self, name: &str) -> Option<&str>;
}

impl PropertyLookup for PropertyMap {
    fn property(&self, name: &str) -> Option<&str> {
        self.get(name).map(String::as_str)
    }
}

impl PropertyLookup for MenuItem {
    fn property(&self, name: &str) -> Option<&str> {
        self.properties.get(name).map(String::as_str)
    }
}

/// Lookup with nothing in it.
pub struct EmptyLookup;

impl PropertyLookup for EmptyLookup {
    fn property(&self, _: &str) -> Option<&str> {
        None
    }
}

pub const EMPTY_LOOKUP: EmptyLookup = EmptyLookup;

/// Two layers, the first one wins on key presence.
pub struct Layered<'a> {
    pub over: &'a dyn PropertyLookup,
    pub under: &'a dyn PropertyLookup,
}

impl PropertyLookup for Layered<'_> {
    fn property(&self, name: &str) -> Option<&str> {
        self.over.property(name).or_else(|| self.under.property(name))
    }
}

/// Prefers the slot-suffixed variant of every queried name.
pub struct Suffixed<'a> {
    pub inner: &'a dyn PropertyLookup,
    pub suffix: &'a str,
}

impl PropertyLookup for Suffixed<'_> {
    fn property(&self, name: &str) -> Option<&str> {
        if !self.suffix.is_empty() {
            let suffixed = format!("{name}{}", self.suffix);
            if let Some(value) = self.inner.property(&suffixed) {
                return Some(value);
            }
        }
        self.inner.property(name)
    }
}

/// What a template (or submenu template) contributes to the context.
#[derive(Clone, Copy, Default)]
pub struct TemplateBody<'a> {
    pub properties: &'a [TemplateProperty],
    pub vars: &'a [TemplateVar],
    pub preset_refs: &'a [Reference],
    pub group_refs: &'a [Reference],
}

impl<'a> From<&'a Template> for TemplateBody<'a> {
    fn from(template: &'a Template) -> Self {
        TemplateBody {
            properties: &template.properties,
            vars: &template.vars,
            preset_refs: &template.preset_refs,
            group_refs: &template.group_refs,
        }
    }
}

/// Where in the iteration the context is being built.
#[derive(Clone, Copy, Default)]
pub struct ContextScope<'a> {
    pub menu: Option<&'a Menu>,
    pub item: Option<&'a MenuItem>,
    /// 1-based position of the item in its menu or list.
    pub index: Option<usize>,
}

pub struct ContextBuilder<'a> {
    pub property_schema: &'a PropertySchema,
    pub template_schema: Option<&'a TemplateSchema>,
}

impl ContextBuilder<'_> {
    pub fn build(
        &self,
        scope: &ContextScope,
        output: &TemplateOutput,
        body: &TemplateBody,
    ) -> PropertyMap {
        let mut context = PropertyMap::new();

        // menu defaults, then item properties on top
        if let Some(menu) = scope.menu {
            for (key, value) in &menu.defaults.properties {
                context.insert(key.clone(), value.clone());
            }
        }
        if let Some(item) = scope.item {
            for (key, value) in &item.properties {
                context.insert(key.clone(), value.clone());
            }
        }

        let index = scope.index.map(|i| i.to_string()).unwrap_or_default();
        let name = scope.item.map(|i| i.name.to_string()).unwrap_or_default();
        let menu_name = scope.menu.map(|m| m.name.to_string()).unwrap_or_default();
        context.insert("index".into(), index.clone());
        context.insert("name".into(), name);
        context.insert("menu".into(), menu_name);
        context.insert("idprefix".into(), output.id_prefix.clone());
        context.insert("id".into(), format!("{}{index}", output.id_prefix));
        context.insert("suffix".into(), output.suffix.clone());

        self.apply_fallbacks(&mut context, scope);
        self.apply_body(&mut context, scope, output, body);
        context
    }

    fn apply_fallbacks(&self, context: &mut PropertyMap, scope: &ContextScope) {
        let suffixes = observed_suffixes(scope.item);
        for (property, rules) in &self.property_schema.fallbacks {
            for suffix in &suffixes {
                let key = SmolStr::new(format!("{property}{suffix}"));
                if context.get(&key).is_some_and(|v| !v.is_empty()) {
                    continue;
                }
                let mut default = None;
                let mut matched = None;
                for rule in rules {
                    match &rule.condition {
                        None => {
                            if default.is_none() {
                                default = Some(&rule.value);
                            }
                        }
                        Some(cond) => {
                            let cond = apply_suffix_to_condition(cond, suffix);
                            let lookup = Layered {
                                over: &*context,
                                under: item_lookup(scope.item),
                            };
                            if condition::evaluate(&cond, &lookup) {
                                matched = Some(&rule.value);
                                break;
                            }
                        }
                    }
                }
                if let Some(value) = matched.or(default) {
                    context.insert(key, value.clone());
                }
            }
        }
    }

    fn apply_body(
        &self,
        context: &mut PropertyMap,
        scope: &ContextScope,
        output: &TemplateOutput,
        body: &TemplateBody,
    ) {
        for property in body.properties {
            self.apply_property(context, scope, property, &output.suffix);
        }
        for var in body.vars {
            self.apply_var(context, scope, var, &output.suffix);
        }
        for reference in body.preset_refs {
            self.apply_preset_reference(context, scope, reference, &output.suffix);
        }
        for reference in body.group_refs {
            self.apply_group_reference(context, scope, reference, &output.suffix);
        }
    }

    fn apply_property(
        &self,
        context: &mut PropertyMap,
        scope: &ContextScope,
        property: &TemplateProperty,
        suffix: &str,
    ) {
        let passes = property.condition.as_deref().is_none_or(|cond| {
            let cond = apply_suffix_to_condition(cond, suffix);
            condition::evaluate(&cond, &Layered { over: &*context, under: item_lookup(scope.item) })
        });
        if !passes || context.contains_key(&property.name) {
            return;
        }
        let value = match &property.value {
            PropertyValue::Literal(literal) => {
                let layered = Layered { over: &*context, under: item_lookup(scope.item) };
                let suffixed = Suffixed { inner: &layered, suffix };
                expression::substitute_property(literal, &suffixed)
            }
            PropertyValue::From(source) => {
                let source = apply_suffix_to_from(source, suffix);
                self.resolve_from(&source, context, scope)
            }
        };
        context.insert(property.name.clone(), value);
    }

    fn apply_var(
        &self,
        context: &mut PropertyMap,
        scope: &ContextScope,
        var: &TemplateVar,
        suffix: &str,
    ) {
        if context.contains_key(&var.name) {
            return;
        }
        for case in &var.cases {
            let passes = case.condition.as_deref().is_none_or(|cond| {
                let cond = apply_suffix_to_condition(cond, suffix);
                condition::evaluate(
                    &cond,
                    &Layered { over: &*context, under: item_lookup(scope.item) },
                )
            });
            if passes {
                context.insert(var.name.clone(), case.value.clone());
                return;
            }
        }
    }

    fn apply_preset_reference(
        &self,
        context: &mut PropertyMap,
        scope: &ContextScope,
        reference: &Reference,
        output_suffix: &str,
    ) {
        let Some(schema) = self.template_schema else { return };
        let suffix = if reference.suffix.is_empty() { output_suffix } else { &reference.suffix };
        if !self.reference_applies(context, scope, reference, suffix) {
            return;
        }
        let Some(preset) = schema.presets.get(&reference.name) else {
            log::warn!("unknown preset '{}'", reference.name);
            return;
        };
        if let Some(row) = self.matching_preset_row(preset, context, scope, suffix) {
            for (key, value) in &row.values {
                if !context.contains_key(key) {
                    context.insert(key.clone(), value.clone());
                }
            }
        }
    }

    fn matching_preset_row<'p>(
        &self,
        preset: &'p Preset,
        context: &PropertyMap,
        scope: &ContextScope,
        suffix: &str,
    ) -> Option<&'p crate::object_tree::PresetValues> {
        preset.rows.iter().find(|row| {
            let cond = apply_suffix_to_condition(&row.condition, suffix);
            condition::evaluate(&cond, &Layered { over: context, under: item_lookup(scope.item) })
        })
    }

    fn apply_group_reference(
        &self,
        context: &mut PropertyMap,
        scope: &ContextScope,
        reference: &Reference,
        output_suffix: &str,
    ) {
        let Some(schema) = self.template_schema else { return };
        let suffix = if reference.suffix.is_empty() { output_suffix } else { &reference.suffix };
        if !self.reference_applies(context, scope, reference, suffix) {
            return;
        }
        let Some(group) = schema.property_groups.get(&reference.name) else {
            log::warn!("unknown property group '{}'", reference.name);
            return;
        };
        for entry in &group.entries {
            match entry {
                PropertyGroupEntry::Property(property) => {
                    self.apply_property(context, scope, property, suffix)
                }
                PropertyGroupEntry::Var(var) => self.apply_var(context, scope, var, suffix),
            }
        }
    }

    fn reference_applies(
        &self,
        context: &PropertyMap,
        scope: &ContextScope,
        reference: &Reference,
        suffix: &str,
    ) -> bool {
        reference.condition.as_deref().is_none_or(|cond| {
            let cond = apply_suffix_to_condition(cond, suffix);
            condition::evaluate(&cond, &Layered { over: context, under: item_lookup(scope.item) })
        })
    }

    /// Resolve a `from` source, first hit wins: preset attribute (bracket
    /// or dot syntax), built-in or context value, item property, empty.
    /// The source arrives with any slot suffix already applied.
    pub fn resolve_from(
        &self,
        source: &str,
        context: &PropertyMap,
        scope: &ContextScope,
    ) -> String {
        if let Some(value) = self.resolve_preset_attribute(source, context, scope) {
            return value;
        }
        if let Some(value) = context.get(source) {
            return value.clone();
        }
        if let Some(value) = scope.item.and_then(|item| item.properties.get(source)) {
            return value.clone();
        }
        String::new()
    }

    fn resolve_preset_attribute(
        &self,
        source: &str,
        context: &PropertyMap,
        scope: &ContextScope,
    ) -> Option<String> {
        let schema = self.template_schema?;
        if let Some(bracket) = source.find('[') {
            let attribute = source[bracket + 1..].strip_suffix(']')?;
            let (preset, suffix) = schema.preset_with_suffix(&source[..bracket])?;
            let row = self.matching_preset_row(preset, context, scope, &suffix)?;
            return row.values.get(attribute).cloned();
        }
        // dot syntax: the first split that names a preset wins
        for (dot, _) in source.match_indices('.') {
            let Some((preset, mut suffix)) = schema.preset_with_suffix(&source[..dot]) else {
                continue;
            };
            let mut attribute = &source[dot + 1..];
            if suffix.is_empty() {
                let slot = slot_suffix(attribute);
                if !slot.is_empty() {
                    suffix = slot.to_string();
                    attribute = &attribute[..attribute.len() - slot.len()];
                }
            }
            let row = self.matching_preset_row(preset, context, scope, &suffix)?;
            return row.values.get(attribute).cloned();
        }
        None
    }
}

fn item_lookup<'a>(item: Option<&'a MenuItem>) -> &'a dyn PropertyLookup {
    match item {
        Some(item) => item,
        None => &EMPTY_LOOKUP,
    }
}

/// The slot suffixes in use on an item, always starting with the bare slot.
fn observed_suffixes(item: Option<&MenuItem>) -> Vec<String> {
    let mut suffixes = vec![String::new()];
    if let Some(item) = item {
        for key in item.properties.keys() {
            let slot = slot_suffix(key);
            if !slot.is_empty() && !suffixes.iter().any(|s| s == slot) {
                suffixes.push(slot.to_string());
            }
        }
    }
    suffixes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object_tree::{FallbackRule, MenuDefaults, PresetValues, VarCase};

    fn item_with(props: &[(&str, &str)]) -> MenuItem {
        MenuItem {
            name: "movies".into(),
            label: "Movies".into(),
            properties: props.iter().map(|(k, v)| ((*k).into(), (*v).to_string())).collect(),
            ..Default::default()
        }
    }

    fn menu_with_defaults(props: &[(&str, &str)]) -> Menu {
        Menu {
            name: "main".into(),
            defaults: MenuDefaults {
                properties: props.iter().map(|(k, v)| ((*k).into(), (*v).to_string())).collect(),
                actions: Vec::new(),
            },
            ..Default::default()
        }
    }

    fn output(id_prefix: &str, suffix: &str) -> TemplateOutput {
        TemplateOutput {
            include: "test".into(),
            id_prefix: id_prefix.into(),
            suffix: suffix.into(),
        }
    }

    #[test]
    fn builtins_and_layering() {
        let schema = PropertySchema::default();
        let builder = ContextBuilder { property_schema: &schema, template_schema: None };
        let menu = menu_with_defaults(&[("widgetArt", "Landscape"), ("rows", "2")]);
        let item = item_with(&[("widgetArt", "Poster")]);
        let scope = ContextScope { menu: Some(&menu), item: Some(&item), index: Some(3) };
        let context = builder.build(&scope, &output("80", ""), &TemplateBody::default());

        // item properties override menu defaults
        assert_eq!(context.get("widgetArt").unwrap(), "Poster");
        assert_eq!(context.get("rows").unwrap(), "2");
        assert_eq!(context.get("index").unwrap(), "3");
        assert_eq!(context.get("name").unwrap(), "movies");
        assert_eq!(context.get("menu").unwrap(), "main");
        assert_eq!(context.get("idprefix").unwrap(), "80");
        assert_eq!(context.get("id").unwrap(), "803");
        assert_eq!(context.get("suffix").unwrap(), "");
    }

    #[test]
    fn fallbacks_fill_unset_slots() {
        let mut schema = PropertySchema::default();
        schema.fallbacks.insert(
            "widgetTarget".into(),
            vec![
                FallbackRule {
                    value: "music".into(),
                    condition: Some("widgetType=albums".into()),
                },
                FallbackRule { value: "videos".into(), condition: None },
            ],
        );
        let builder = ContextBuilder { property_schema: &schema, template_schema: None };
        let menu = menu_with_defaults(&[]);
        let item = item_with(&[("widgetType", "movies"), ("widgetType.2", "albums")]);
        let scope = ContextScope { menu: Some(&menu), item: Some(&item), index: Some(1) };
        let context = builder.build(&scope, &output("", ""), &TemplateBody::default());

        assert_eq!(context.get("widgetTarget").unwrap(), "videos");
        // the `.2` slot was observed, so its fallback is computed too
        assert_eq!(context.get("widgetTarget.2").unwrap(), "music");
    }

    #[test]
    fn fallbacks_never_override() {
        let mut schema = PropertySchema::default();
        schema
            .fallbacks
            .insert("widgetTarget".into(), vec![FallbackRule { value: "videos".into(), condition: None }]);
        let builder = ContextBuilder { property_schema: &schema, template_schema: None };
        let menu = menu_with_defaults(&[]);
        let item = item_with(&[("widgetTarget", "pictures")]);
        let scope = ContextScope { menu: Some(&menu), item: Some(&item), index: Some(1) };
        let context = builder.build(&scope, &output("", ""), &TemplateBody::default());
        assert_eq!(context.get("widgetTarget").unwrap(), "pictures");
    }

    #[test]
    fn template_properties_write_if_absent() {
        let schema = PropertySchema::default();
        let builder = ContextBuilder { property_schema: &schema, template_schema: None };
        let menu = menu_with_defaults(&[]);
        let item = item_with(&[("existing", "kept")]);
        let scope = ContextScope { menu: Some(&menu), item: Some(&item), index: Some(1) };
        let properties = vec![
            TemplateProperty {
                name: "existing".into(),
                value: PropertyValue::Literal("ignored".into()),
                condition: None,
            },
            TemplateProperty {
                name: "greeting".into(),
                value: PropertyValue::Literal("hello $PROPERTY[name]".into()),
                condition: None,
            },
            TemplateProperty {
                name: "gated".into(),
                value: PropertyValue::Literal("nope".into()),
                condition: Some("existing=other".into()),
            },
        ];
        let body = TemplateBody { properties: &properties, ..Default::default() };
        let context = builder.build(&scope, &output("", ""), &body);

        assert_eq!(context.get("existing").unwrap(), "kept");
        assert_eq!(context.get("greeting").unwrap(), "hello movies");
        assert!(!context.contains_key("gated"));
    }

    #[test]
    fn vars_take_first_matching_case() {
        let schema = PropertySchema::default();
        let builder = ContextBuilder { property_schema: &schema, template_schema: None };
        let menu = menu_with_defaults(&[]);
        let item = item_with(&[("widgetType", "albums")]);
        let scope = ContextScope { menu: Some(&menu), item: Some(&item), index: Some(1) };
        let vars = vec![TemplateVar {
            name: "target".into(),
            cases: vec![
                VarCase { condition: Some("widgetType=movies".into()), value: "videos".into() },
                VarCase { condition: Some("widgetType=albums".into()), value: "music".into() },
                VarCase { condition: None, value: "unknown".into() },
            ],
        }];
        let body = TemplateBody { vars: &vars, ..Default::default() };
        let context = builder.build(&scope, &output("", ""), &body);
        assert_eq!(context.get("target").unwrap(), "music");
    }

    fn dimensions_schema() -> TemplateSchema {
        let mut schema = TemplateSchema::default();
        schema.presets.insert(
            "dimensions".into(),
            Preset {
                name: "dimensions".into(),
                rows: vec![
                    PresetValues {
                        condition: "widgetArt=Poster".into(),
                        values: [("top".into(), "70".to_string())].into_iter().collect(),
                    },
                    PresetValues {
                        condition: String::new(),
                        values: [("top".into(), "471".to_string())].into_iter().collect(),
                    },
                ],
            },
        );
        schema
    }

    #[test]
    fn preset_reference_with_suffix() {
        let property_schema = PropertySchema::default();
        let schema = dimensions_schema();
        let builder =
            ContextBuilder { property_schema: &property_schema, template_schema: Some(&schema) };
        let menu = menu_with_defaults(&[]);
        let item = item_with(&[("widgetArt.2", "Poster")]);
        let scope = ContextScope { menu: Some(&menu), item: Some(&item), index: Some(1) };
        let refs =
            vec![Reference { name: "dimensions".into(), suffix: ".2".into(), condition: None }];
        let body = TemplateBody { preset_refs: &refs, ..Default::default() };
        let context = builder.build(&scope, &output("", ""), &body);
        assert_eq!(context.get("top").unwrap(), "70");

        // any other slot value falls through to the default row
        let item = item_with(&[("widgetArt.2", "Landscape")]);
        let scope = ContextScope { menu: Some(&menu), item: Some(&item), index: Some(1) };
        let context = builder.build(&scope, &output("", ""), &body);
        assert_eq!(context.get("top").unwrap(), "471");
    }

    #[test]
    fn from_source_resolution_order() {
        let property_schema = PropertySchema::default();
        let schema = dimensions_schema();
        let builder =
            ContextBuilder { property_schema: &property_schema, template_schema: Some(&schema) };
        let menu = menu_with_defaults(&[]);
        let item = item_with(&[("widgetArt", "Poster"), ("own", "itemvalue")]);
        let scope = ContextScope { menu: Some(&menu), item: Some(&item), index: Some(2) };
        let context = builder.build(&scope, &output("90", ""), &TemplateBody::default());

        assert_eq!(builder.resolve_from("dimensions[top]", &context, &scope), "70");
        assert_eq!(builder.resolve_from("dimensions.top", &context, &scope), "70");
        assert_eq!(builder.resolve_from("id", &context, &scope), "902");
        assert_eq!(builder.resolve_from("own", &context, &scope), "itemvalue");
        assert_eq!(builder.resolve_from("nosuch", &context, &scope), "");
    }

    #[test]
    fn output_suffix_reaches_from_sources() {
        let schema = PropertySchema::default();
        let builder = ContextBuilder { property_schema: &schema, template_schema: None };
        let menu = menu_with_defaults(&[]);
        let item = item_with(&[("widgetPath", "p1"), ("widgetPath.2", "p2")]);
        let scope = ContextScope { menu: Some(&menu), item: Some(&item), index: Some(1) };
        let properties = vec![TemplateProperty {
            name: "slotPath".into(),
            value: PropertyValue::From("widgetPath".into()),
            condition: None,
        }];
        let body = TemplateBody { properties: &properties, ..Default::default() };

        let first = builder.build(&scope, &output("8011", ""), &body);
        assert_eq!(first.get("slotPath").unwrap(), "p1");
        assert_eq!(first.get("id").unwrap(), "80111");

        let second = builder.build(&scope, &output("8021", ".2"), &body);
        assert_eq!(second.get("slotPath").unwrap(), "p2");
        assert_eq!(second.get("id").unwrap(), "80211");
    }
}
