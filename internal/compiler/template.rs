// Copyright © SixtyFPS GmbH <info@slint.dev>
// SPDX-License-Identifier: GPL-3.0-only OR LicenseRef-Slint-Royalty-free-2.0 OR LicenseRef-Slint-Software-3.0

/*!
 The template processor.

 For every template output and every matching iteration (menu item, list
 row or single raw pass) the processor builds a property context, deep
 copies the template's `controls` payload, rewrites it element by element
 and appends the result to the output's accumulator include. Directive
 elements (`<skinshortcuts>`) splice reusable fragments, generate
 visibility predicates or iterate an item's submenu in place; everything
 else is plain substitution over text, tails and attribute values.
*/

use std::collections::HashSet;

use indexmap::IndexMap;
use smol_str::SmolStr;

use crate::condition;
use crate::context::{
    ContextBuilder, ContextScope, Layered, PropertyLookup, PropertyMap, Suffixed, TemplateBody,
    EMPTY_LOOKUP,
};
use crate::diagnostics::Error;
use crate::expression;
use crate::object_tree::{
    BuildMode, Menu, MenuItem, PropertySchema, Reference, SubmenuTemplate, Template, TemplateOnly,
    TemplateOutput, TemplateSchema, VariableDefinition, VariableGroupEntry,
};
use crate::suffix::apply_suffix_to_condition;
use crate::xmltree::Element;

/// Nested variable groups and include references deeper than this are
/// reference loops in the configuration.
const MAX_GROUP_DEPTH: usize = 10;

pub struct TemplateProcessor<'a> {
    schema: &'a TemplateSchema,
    property_schema: &'a PropertySchema,
    menus: &'a [Menu],
    includes: IndexMap<SmolStr, Element>,
    variables: Vec<Element>,
    emitted_variables: HashSet<(String, String)>,
}

/// Everything one element-processing pass needs to resolve placeholders.
struct ProcessContext<'p> {
    context: &'p PropertyMap,
    item: Option<&'p MenuItem>,
    /// Context of the enclosing iteration inside an `items` directive.
    parent: Option<&'p PropertyMap>,
    menu: Option<&'p Menu>,
    params: Option<&'p IndexMap<SmolStr, String>>,
    suffix: &'p str,
}

impl<'p> ProcessContext<'p> {
    fn layered(&self) -> Layered<'p> {
        Layered {
            over: self.context,
            under: match self.item {
                Some(item) => item,
                None => &EMPTY_LOOKUP,
            },
        }
    }
}

impl<'a> TemplateProcessor<'a> {
    pub fn new(
        schema: &'a TemplateSchema,
        property_schema: &'a PropertySchema,
        menus: &'a [Menu],
    ) -> Self {
        TemplateProcessor {
            schema,
            property_schema,
            menus,
            includes: IndexMap::new(),
            variables: Vec::new(),
            emitted_variables: HashSet::new(),
        }
    }

    /// Process every template and submenu template; returns the template
    /// includes (encounter order) and the emitted variables.
    pub fn run(mut self) -> Result<(Vec<Element>, Vec<Element>), Error> {
        let schema = self.schema;
        for template in &schema.templates {
            self.process_template(template)?;
        }
        for submenu_template in &schema.submenus {
            self.process_submenu_template(submenu_template)?;
        }
        let mut includes: Vec<Element> = self.includes.into_values().collect();
        for include in &mut includes {
            if include.children.is_empty() {
                include.push(Element::with_text("description", "No items"));
            }
        }
        Ok((includes, self.variables))
    }

    fn process_template(&mut self, template: &Template) -> Result<(), Error> {
        let menus = self.menus;
        for output in &template.outputs {
            let emit_controls = match template.template_only {
                TemplateOnly::Yes => false,
                TemplateOnly::Auto => self.template_is_referenced(&output.include),
                TemplateOnly::No => true,
            };
            if emit_controls && template.controls.is_some() {
                // materialize the include even when no iteration matches
                self.accumulator(&output.include);
            }
            match template.build_mode {
                BuildMode::Menu => {
                    for menu in menus.iter().filter(|m| !m.is_submenu) {
                        if template.menu_filter.as_ref().is_some_and(|f| *f != menu.name) {
                            continue;
                        }
                        for (position, item) in menu.enabled_items().enumerate() {
                            if !self.check_conditions(&template.conditions, item, &output.suffix) {
                                continue;
                            }
                            let scope = ContextScope {
                                menu: Some(menu),
                                item: Some(item),
                                index: Some(position + 1),
                            };
                            self.emit_iteration(template, output, &scope, emit_controls, None)?;
                        }
                    }
                }
                BuildMode::List => {
                    for (position, row) in template.list_items.iter().enumerate() {
                        let synthetic = synthetic_item(row);
                        if !self.check_conditions(&template.conditions, &synthetic, &output.suffix)
                        {
                            continue;
                        }
                        let scope = ContextScope {
                            menu: None,
                            item: Some(&synthetic),
                            index: Some(position + 1),
                        };
                        self.emit_iteration(template, output, &scope, emit_controls, None)?;
                    }
                }
                BuildMode::Raw => {
                    let passes = template.conditions.iter().all(|cond| {
                        let cond = expression::inline_expressions(cond, &self.schema.expressions);
                        condition::evaluate(&cond, &EMPTY_LOOKUP)
                    });
                    if !passes {
                        continue;
                    }
                    let params: IndexMap<SmolStr, String> = template
                        .params
                        .iter()
                        .map(|p| (p.name.clone(), p.default.clone()))
                        .collect();
                    let scope = ContextScope::default();
                    self.emit_iteration(template, output, &scope, emit_controls, Some(&params))?;
                }
            }
        }
        Ok(())
    }

    fn process_submenu_template(&mut self, submenu_template: &SubmenuTemplate) -> Result<(), Error> {
        let menus = self.menus;
        let output = TemplateOutput {
            include: submenu_template.include.clone(),
            ..Default::default()
        };
        if submenu_template.controls.is_some() {
            self.accumulator(&output.include);
        }
        for menu in menus.iter().filter(|m| !m.is_submenu) {
            for parent_item in menu.enabled_items() {
                let Some(submenu_name) = &parent_item.submenu else { continue };
                let Some(submenu) = menus.iter().find(|m| m.name == *submenu_name) else {
                    continue;
                };
                for (position, item) in submenu.enabled_items().enumerate() {
                    if !self.check_conditions(&submenu_template.conditions, item, "") {
                        continue;
                    }
                    let scope = ContextScope {
                        menu: Some(submenu),
                        item: Some(item),
                        index: Some(position + 1),
                    };
                    let builder = ContextBuilder {
                        property_schema: self.property_schema,
                        template_schema: Some(self.schema),
                    };
                    let body = TemplateBody {
                        properties: &submenu_template.properties,
                        vars: &submenu_template.vars,
                        ..Default::default()
                    };
                    let mut context = builder.build(&scope, &output, &body);
                    context
                        .entry("parent".into())
                        .or_insert_with(|| parent_item.name.to_string());
                    if let Some(controls) = &submenu_template.controls {
                        let process = ProcessContext {
                            context: &context,
                            item: Some(item),
                            parent: None,
                            menu: Some(submenu),
                            params: None,
                            suffix: "",
                        };
                        let children = self.process_children(controls.children.clone(), &process)?;
                        self.accumulator(&output.include).children.extend(children);
                    }
                }
            }
        }
        Ok(())
    }

    fn emit_iteration(
        &mut self,
        template: &Template,
        output: &TemplateOutput,
        scope: &ContextScope,
        emit_controls: bool,
        params: Option<&IndexMap<SmolStr, String>>,
    ) -> Result<(), Error> {
        let builder = ContextBuilder {
            property_schema: self.property_schema,
            template_schema: Some(self.schema),
        };
        let context = builder.build(scope, output, &TemplateBody::from(template));

        if emit_controls {
            if let Some(controls) = &template.controls {
                let process = ProcessContext {
                    context: &context,
                    item: scope.item,
                    parent: None,
                    menu: scope.menu,
                    params,
                    suffix: &output.suffix,
                };
                let children = self.process_children(controls.children.clone(), &process)?;
                self.accumulator(&output.include).children.extend(children);
            }
        }

        for reference in &template.variable_group_refs {
            self.emit_variable_group(reference, &context, scope, &output.suffix, 0)?;
        }
        for definition in &template.variables {
            self.emit_variable(definition, &context, scope, &output.suffix)?;
        }
        Ok(())
    }

    fn accumulator(&mut self, include: &SmolStr) -> &mut Element {
        self.includes.entry(include.clone()).or_insert_with(|| {
            let mut element = Element::new("include");
            element.set_attr("name", format!("skinshortcuts-template-{include}"));
            element
        })
    }

    /// A template marked `auto` is only emitted when some item property
    /// references its include by name.
    fn template_is_referenced(&self, include: &str) -> bool {
        let needle = format!("$INCLUDE[skinshortcuts-template-{include}]");
        self.menus.iter().any(|menu| {
            menu.items
                .iter()
                .any(|item| item.properties.values().any(|value| value.contains(&needle)))
        })
    }

    fn check_conditions(&self, conditions: &[String], item: &MenuItem, suffix: &str) -> bool {
        conditions.iter().all(|cond| {
            let cond = expression::inline_expressions(cond, &self.schema.expressions);
            let cond = apply_suffix_to_condition(&cond, suffix);
            let suffixed = Suffixed { inner: item, suffix };
            condition::evaluate(&cond, &suffixed)
        })
    }

    /// Rewrite one level of copied template children, recursing into
    /// ordinary elements and expanding directives in place.
    fn process_children(
        &self,
        children: Vec<Element>,
        process: &ProcessContext,
    ) -> Result<Vec<Element>, Error> {
        let mut out: Vec<Element> = Vec::with_capacity(children.len());
        for mut child in children {
            if child.tag == "skinshortcuts" {
                self.process_directive(child, process, &mut out)?;
                continue;
            }
            child.children = self.process_children(std::mem::take(&mut child.children), process)?;
            for (name, value) in child.attributes.clone() {
                let substituted = self.substitute(&value, process, name == "condition");
                child.attributes.insert(name, substituted);
            }
            let condition_like = matches!(child.tag.as_str(), "visible" | "enable");
            if let Some(text) = child.text.take() {
                child.text = Some(self.substitute(&text, process, condition_like));
            }
            if let Some(tail) = child.tail.take() {
                child.tail = Some(self.substitute(&tail, process, false));
            }
            self.extract_include_references(&mut child);
            let trailing = take_tail_includes(&mut child);
            out.push(child);
            out.extend(trailing);
        }
        Ok(out)
    }

    fn process_directive(
        &self,
        directive: Element,
        process: &ProcessContext,
        out: &mut Vec<Element>,
    ) -> Result<(), Error> {
        if let Some(name) = directive.attr("include") {
            if !self.directive_condition_passes(&directive, process) {
                return Ok(());
            }
            let Some(definition) = self.schema.includes.get(name) else {
                log::warn!("unknown include definition '{name}'");
                return Ok(());
            };
            let body = self.process_children(definition.children.clone(), process)?;
            if directive.attr("wrap").is_some_and(|w| w.eq_ignore_ascii_case("true")) {
                let mut wrapper = Element::new("include");
                wrapper.set_attr("name", name);
                wrapper.children = body;
                out.push(wrapper);
            } else {
                out.extend(body);
            }
            return Ok(());
        }

        if let Some(subkey) = directive.attr("items") {
            if !self.directive_condition_passes(&directive, process) {
                return Ok(());
            }
            let Some(parent_item) = process.item else { return Ok(()) };
            let submenu_name = format!("{}.{subkey}", parent_item.name);
            let Some(submenu) = self.menus.iter().find(|m| m.name == submenu_name) else {
                return Ok(());
            };
            let filter = directive.attr("filter");
            let builder = ContextBuilder {
                property_schema: self.property_schema,
                template_schema: Some(self.schema),
            };
            for (position, subitem) in submenu.enabled_items().enumerate() {
                if !condition::evaluate_opt(filter, subitem) {
                    continue;
                }
                let scope = ContextScope {
                    menu: Some(submenu),
                    item: Some(subitem),
                    index: Some(position + 1),
                };
                let nested = builder.build(&scope, &Default::default(), &TemplateBody::default());
                let nested_process = ProcessContext {
                    context: &nested,
                    item: Some(subitem),
                    parent: Some(process.context),
                    menu: Some(submenu),
                    params: process.params,
                    suffix: "",
                };
                out.extend(self.process_children(directive.children.clone(), &nested_process)?);
            }
            return Ok(());
        }

        if directive.text().trim() == "visibility" {
            if let (Some(menu), Some(item)) = (process.menu, process.item) {
                if let Some(container) = &menu.container {
                    out.push(Element::with_text(
                        "visible",
                        format!(
                            "String.IsEqual(Container({container}).ListItem.Property(name),{})",
                            item.name
                        ),
                    ));
                }
            }
            return Ok(());
        }

        log::warn!("ignoring unrecognized <skinshortcuts> directive");
        Ok(())
    }

    fn directive_condition_passes(&self, directive: &Element, process: &ProcessContext) -> bool {
        directive.attr("condition").is_none_or(|cond| {
            let cond = expression::inline_expressions(cond, &self.schema.expressions);
            let cond = apply_suffix_to_condition(&cond, process.suffix);
            let layered = process.layered();
            let suffixed = Suffixed { inner: &layered, suffix: process.suffix };
            condition::evaluate(&cond, &suffixed)
        })
    }

    /// Placeholder substitution for one text fragment, in the fixed order
    /// `$MATH`, `$IF`, `$PROPERTY`, then `$PARENT` and `$PARAM`.
    /// `$EXP` is inlined up front in condition-like positions only.
    fn substitute(&self, text: &str, process: &ProcessContext, condition_like: bool) -> String {
        let mut out = if condition_like {
            expression::inline_expressions(text, &self.schema.expressions)
        } else {
            text.to_string()
        };
        let layered = process.layered();
        let lookup = Suffixed { inner: &layered, suffix: process.suffix };
        out = expression::substitute_math(&out, &lookup);
        out = expression::substitute_if(&out, &lookup);
        out = expression::substitute_property(&out, &lookup);
        if let Some(parent) = process.parent {
            out = expression::substitute_placeholder(&out, expression::PARENT, |name| {
                Some(parent.get(name.trim()).cloned().unwrap_or_default())
            });
        }
        if let Some(params) = process.params {
            out = expression::substitute_params(&out, params);
        }
        out
    }

    /// Convert `$INCLUDE[name]` occurrences in the element's text into
    /// leading `<include>` children.
    fn extract_include_references(&self, element: &mut Element) {
        let Some(text) = element.text.as_deref() else { return };
        if !text.contains(expression::INCLUDE) {
            return;
        }
        let mut remaining = text.to_string();
        let mut includes = Vec::new();
        while let Some((start, payload, end)) =
            expression::find_bracketed(&remaining, expression::INCLUDE)
        {
            includes.push(Element::with_text("include", remaining[payload..end].to_string()));
            remaining.replace_range(start..=end, "");
        }
        element.text = (!remaining.trim().is_empty()).then_some(remaining);
        for (position, include) in includes.into_iter().enumerate() {
            element.children.insert(position, include);
        }
    }

    fn emit_variable_group(
        &mut self,
        reference: &Reference,
        context: &PropertyMap,
        scope: &ContextScope,
        inherited_suffix: &str,
        depth: usize,
    ) -> Result<(), Error> {
        if depth > MAX_GROUP_DEPTH {
            log::warn!("variable group nesting too deep, reference loop?");
            return Ok(());
        }
        let schema = self.schema;
        let suffix =
            if reference.suffix.is_empty() { inherited_suffix } else { reference.suffix.as_str() };
        if !self.variable_condition_passes(reference.condition.as_deref(), context, scope, suffix) {
            return Ok(());
        }
        let Some(group) = schema.variable_groups.get(&reference.name) else {
            log::warn!("unknown variable group '{}'", reference.name);
            return Ok(());
        };
        for entry in &group.entries {
            match entry {
                VariableGroupEntry::Variable(var_ref) => {
                    let suffix =
                        if var_ref.suffix.is_empty() { suffix } else { var_ref.suffix.as_str() };
                    if !self.variable_condition_passes(
                        var_ref.condition.as_deref(),
                        context,
                        scope,
                        suffix,
                    ) {
                        continue;
                    }
                    let Some(definition) = schema.variables.get(&var_ref.name) else {
                        log::warn!("unknown variable '{}'", var_ref.name);
                        continue;
                    };
                    self.emit_variable(definition, context, scope, suffix)?;
                }
                VariableGroupEntry::Group(group_ref) => {
                    self.emit_variable_group(group_ref, context, scope, suffix, depth + 1)?;
                }
            }
        }
        Ok(())
    }

    fn variable_condition_passes(
        &self,
        condition: Option<&str>,
        context: &PropertyMap,
        scope: &ContextScope,
        suffix: &str,
    ) -> bool {
        condition.is_none_or(|cond| {
            let cond = expression::inline_expressions(cond, &self.schema.expressions);
            let cond = apply_suffix_to_condition(&cond, suffix);
            let layered = Layered {
                over: context,
                under: match scope.item {
                    Some(item) => item,
                    None => &EMPTY_LOOKUP,
                },
            };
            let suffixed = Suffixed { inner: &layered, suffix };
            condition::evaluate(&cond, &suffixed)
        })
    }

    fn emit_variable(
        &mut self,
        definition: &VariableDefinition,
        context: &PropertyMap,
        scope: &ContextScope,
        suffix: &str,
    ) -> Result<(), Error> {
        if !self.variable_condition_passes(definition.condition.as_deref(), context, scope, suffix)
        {
            return Ok(());
        }
        let layered = Layered {
            over: context,
            under: match scope.item {
                Some(item) => item,
                None => &EMPTY_LOOKUP,
            },
        };
        let lookup = Suffixed { inner: &layered, suffix };
        let name = match &definition.output {
            Some(output) => expression::substitute_property(output, &lookup),
            None => definition.name.to_string(),
        };
        let mut variable = Element::new("variable");
        variable.set_attr("name", name.clone());
        for mut child in definition.body.children.clone() {
            substitute_properties_recursive(&mut child, &lookup);
            variable.push(child);
        }
        let mut serialized = String::new();
        for child in &variable.children {
            serialized.push_str(&format!("{child:?}"));
        }
        if self.emitted_variables.insert((name, serialized)) {
            self.variables.push(variable);
        }
        Ok(())
    }
}

fn substitute_properties_recursive(element: &mut Element, lookup: &dyn PropertyLookup) {
    for value in element.attributes.values_mut() {
        *value = expression::substitute_property(value, lookup);
    }
    if let Some(text) = element.text.take() {
        element.text = Some(expression::substitute_property(&text, lookup));
    }
    if let Some(tail) = element.tail.take() {
        element.tail = Some(expression::substitute_property(&tail, lookup));
    }
    for child in &mut element.children {
        substitute_properties_recursive(child, lookup);
    }
}

/// LIST rows iterate as items whose property map is the row itself.
fn synthetic_item(row: &PropertyMap) -> MenuItem {
    MenuItem {
        name: row.get("name").cloned().map(SmolStr::from).unwrap_or_default(),
        label: row.get("label").cloned().unwrap_or_default(),
        properties: row.clone(),
        ..Default::default()
    }
}

/// `$INCLUDE` references sitting in an element's tail become siblings
/// right after it.
fn take_tail_includes(element: &mut Element) -> Vec<Element> {
    let Some(tail) = element.tail.as_deref() else { return Vec::new() };
    if !tail.contains(expression::INCLUDE) {
        return Vec::new();
    }
    let mut remaining = tail.to_string();
    let mut includes = Vec::new();
    while let Some((start, payload, end)) =
        expression::find_bracketed(&remaining, expression::INCLUDE)
    {
        includes.push(Element::with_text("include", remaining[payload..end].to_string()));
        remaining.replace_range(start..=end, "");
    }
    element.tail = (!remaining.trim().is_empty()).then_some(remaining);
    includes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object_tree::{TemplateParam, VariableGroup};

    fn controls(xml: &str) -> Element {
        Element::parse_str(xml).unwrap()
    }

    fn row(pairs: &[(&str, &str)]) -> PropertyMap {
        pairs.iter().map(|(k, v)| ((*k).into(), (*v).to_string())).collect()
    }

    fn menu_with_items(name: &str, items: &[(&str, &[(&str, &str)])]) -> Menu {
        Menu {
            name: name.into(),
            items: items
                .iter()
                .map(|(item_name, props)| MenuItem {
                    name: (*item_name).into(),
                    label: item_name.to_uppercase(),
                    properties: row(props),
                    ..Default::default()
                })
                .collect(),
            ..Default::default()
        }
    }

    fn run(schema: &TemplateSchema, menus: &[Menu]) -> (Vec<Element>, Vec<Element>) {
        let property_schema = PropertySchema::default();
        TemplateProcessor::new(schema, &property_schema, menus).run().unwrap()
    }

    #[test]
    fn list_mode_iterates_rows() {
        let mut schema = TemplateSchema::default();
        schema.templates.push(Template {
            build_mode: BuildMode::List,
            outputs: vec![TemplateOutput {
                include: "static".into(),
                id_prefix: "60".into(),
                suffix: String::new(),
            }],
            list_items: vec![
                row(&[("label", "Movies"), ("path", "videodb://movies/")]),
                row(&[("label", "Shows")]),
            ],
            controls: Some(controls(
                r#"<controls><item id="$PROPERTY[id]"><label>$PROPERTY[label]</label></item></controls>"#,
            )),
            ..Default::default()
        });
        let (includes, _) = run(&schema, &[]);
        assert_eq!(includes.len(), 1);
        assert_eq!(includes[0].attr("name"), Some("skinshortcuts-template-static"));
        assert_eq!(includes[0].children.len(), 2);
        assert_eq!(includes[0].children[0].attr("id"), Some("601"));
        assert_eq!(includes[0].children[0].child("label").unwrap().text(), "Movies");
        assert_eq!(includes[0].children[1].attr("id"), Some("602"));
    }

    #[test]
    fn raw_mode_resolves_params_once() {
        let mut schema = TemplateSchema::default();
        schema.templates.push(Template {
            build_mode: BuildMode::Raw,
            outputs: vec![TemplateOutput {
                include: "grid".into(),
                id_prefix: "61".into(),
                suffix: String::new(),
            }],
            params: vec![TemplateParam { name: "rows".into(), default: "4".into() }],
            controls: Some(controls(
                r#"<controls><control id="$PROPERTY[id]"><rows>$PARAM[rows]-$PARAM[missing]</rows></control></controls>"#,
            )),
            ..Default::default()
        });
        let (includes, _) = run(&schema, &[]);
        let control = &includes[0].children[0];
        // no iteration index in raw mode, the id is the bare prefix
        assert_eq!(control.attr("id"), Some("61"));
        assert_eq!(control.child("rows").unwrap().text(), "4-");
        assert_eq!(includes[0].children.len(), 1);
    }

    #[test]
    fn items_directive_iterates_the_named_submenu() {
        let mut schema = TemplateSchema::default();
        schema.templates.push(Template {
            outputs: vec![TemplateOutput {
                include: "widgets".into(),
                id_prefix: "62".into(),
                suffix: String::new(),
            }],
            menu_filter: Some("main".into()),
            controls: Some(controls(
                r#"<controls><control type="list">
  <skinshortcuts items="widgets"><item>$PROPERTY[name]:$PARENT[name]</item></skinshortcuts>
</control></controls>"#,
            )),
            ..Default::default()
        });
        let menus = vec![
            menu_with_items("main", &[("movies", &[])]),
            Menu { is_submenu: true, ..menu_with_items("movies.widgets", &[("w1", &[]), ("w2", &[])]) },
        ];
        let (includes, _) = run(&schema, &menus);
        let control = &includes[0].children[0];
        let texts: Vec<_> = control.children.iter().map(|c| c.text()).collect();
        assert_eq!(texts, ["w1:movies", "w2:movies"]);
    }

    #[test]
    fn include_text_becomes_child_elements() {
        let mut schema = TemplateSchema::default();
        schema.templates.push(Template {
            outputs: vec![TemplateOutput {
                include: "deco".into(),
                id_prefix: "63".into(),
                suffix: String::new(),
            }],
            controls: Some(controls(
                "<controls><control>$INCLUDE[CommonFade]rest</control></controls>",
            )),
            ..Default::default()
        });
        let menus = vec![menu_with_items("main", &[("movies", &[])])];
        let (includes, _) = run(&schema, &menus);
        let control = &includes[0].children[0];
        assert_eq!(control.children[0].tag, "include");
        assert_eq!(control.children[0].text(), "CommonFade");
        assert_eq!(control.text(), "rest");
    }

    #[test]
    fn variable_groups_compose_suffixes() {
        let mut schema = TemplateSchema::default();
        schema.variables.insert(
            "header".into(),
            VariableDefinition {
                name: "header".into(),
                body: controls("<variable><value>x</value></variable>"),
                output: Some("hdr-$PROPERTY[widgetPath]".into()),
                condition: Some("widgetPath".into()),
            },
        );
        schema.variable_groups.insert(
            "headers".into(),
            VariableGroup {
                name: "headers".into(),
                entries: vec![
                    VariableGroupEntry::Variable(Reference {
                        name: "header".into(),
                        ..Default::default()
                    }),
                    VariableGroupEntry::Variable(Reference {
                        name: "header".into(),
                        suffix: ".2".into(),
                        ..Default::default()
                    }),
                ],
            },
        );
        schema.templates.push(Template {
            template_only: TemplateOnly::Yes,
            outputs: vec![TemplateOutput {
                include: "vars".into(),
                id_prefix: "64".into(),
                suffix: String::new(),
            }],
            variable_group_refs: vec![Reference { name: "headers".into(), ..Default::default() }],
            ..Default::default()
        });
        let menus = vec![menu_with_items(
            "main",
            &[("movies", &[("widgetPath", "p1"), ("widgetPath.2", "p2")]), ("bare", &[])],
        )];
        let (includes, variables) = run(&schema, &menus);
        // template_only templates contribute no include
        assert!(includes.is_empty());
        let names: Vec<_> = variables.iter().filter_map(|v| v.attr("name")).collect();
        // the bare item fails the variable condition in both slots
        assert_eq!(names, ["hdr-p1", "hdr-p2"]);
    }

    #[test]
    fn identical_variables_are_emitted_once() {
        let mut schema = TemplateSchema::default();
        schema.templates.push(Template {
            template_only: TemplateOnly::Yes,
            outputs: vec![TemplateOutput {
                include: "vars".into(),
                id_prefix: "65".into(),
                suffix: String::new(),
            }],
            variables: vec![VariableDefinition {
                name: "constant".into(),
                body: controls("<variable><value>fixed</value></variable>"),
                output: None,
                condition: None,
            }],
            ..Default::default()
        });
        let menus = vec![menu_with_items("main", &[("a", &[]), ("b", &[])])];
        let (_, variables) = run(&schema, &menus);
        assert_eq!(variables.len(), 1);
        assert_eq!(variables[0].attr("name"), Some("constant"));
    }

    #[test]
    fn colliding_include_names_merge_in_encounter_order() {
        let mut schema = TemplateSchema::default();
        for marker in ["one", "two"] {
            schema.templates.push(Template {
                outputs: vec![TemplateOutput {
                    include: "merged".into(),
                    id_prefix: "66".into(),
                    suffix: String::new(),
                }],
                controls: Some(controls(&format!(
                    "<controls><item>{marker}</item></controls>"
                ))),
                ..Default::default()
            });
        }
        let menus = vec![menu_with_items("main", &[("movies", &[])])];
        let (includes, _) = run(&schema, &menus);
        assert_eq!(includes.len(), 1);
        let texts: Vec<_> = includes[0].children.iter().map(|c| c.text()).collect();
        assert_eq!(texts, ["one", "two"]);
    }

    #[test]
    fn expressions_inline_in_condition_positions_only() {
        let mut schema = TemplateSchema::default();
        schema.expressions.insert("hasMovies".into(), "Library.HasContent(Movies)".to_string());
        schema.templates.push(Template {
            outputs: vec![TemplateOutput {
                include: "gated".into(),
                id_prefix: "68".into(),
                suffix: String::new(),
            }],
            controls: Some(controls(
                "<controls><control><visible>$EXP[hasMovies]</visible><label>$EXP[hasMovies]</label></control></controls>",
            )),
            ..Default::default()
        });
        let menus = vec![menu_with_items("main", &[("movies", &[])])];
        let (includes, _) = run(&schema, &menus);
        let control = &includes[0].children[0];
        assert_eq!(control.child("visible").unwrap().text(), "Library.HasContent(Movies)");
        // a plain label is not a condition position, the token stays
        assert_eq!(control.child("label").unwrap().text(), "$EXP[hasMovies]");
    }

    #[test]
    fn empty_template_include_gets_a_description() {
        let mut schema = TemplateSchema::default();
        schema.templates.push(Template {
            outputs: vec![TemplateOutput {
                include: "empty".into(),
                id_prefix: "67".into(),
                suffix: String::new(),
            }],
            conditions: vec!["neverset".into()],
            controls: Some(controls("<controls><item>x</item></controls>")),
            ..Default::default()
        });
        let menus = vec![menu_with_items("main", &[("movies", &[])])];
        let (includes, _) = run(&schema, &menus);
        assert_eq!(includes[0].children[0].tag, "description");
    }
}
