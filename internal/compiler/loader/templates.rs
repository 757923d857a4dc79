// Copyright © SixtyFPS GmbH <info@slint.dev>
// SPDX-License-Identifier: GPL-3.0-only OR LicenseRef-Slint-Royalty-free-2.0 OR LicenseRef-Slint-Software-3.0

//! Loader for `templates.xml`.
//!
//! The file is sectioned: `<expressions>`, `<presets>`, `<propertyGroups>`,
//! `<variables>` (definitions and variable groups), `<includes>`
//! (reusable fragments), then the `<template>` and `<submenu>` records in
//! declaration order.

use std::path::Path;

use super::{opt_attr, opt_condition, read_root, required_attr};
use crate::diagnostics::{ConfigError, ConfigFile, Error};
use crate::object_tree::{
    Preset, PresetValues, PropertyGroup, PropertyGroupEntry, PropertyValue, Reference,
    SubmenuTemplate, Template, TemplateOnly, TemplateOutput, TemplateParam, TemplateProperty,
    TemplateSchema, TemplateVar, VarCase, VariableDefinition, VariableGroup, VariableGroupEntry,
};
use crate::xmltree::Element;

const FILE: ConfigFile = ConfigFile::Template;

pub fn load(path: &Path) -> Result<TemplateSchema, Error> {
    let Some(root) = read_root(path, FILE)? else {
        return Ok(TemplateSchema::default());
    };
    let mut schema = TemplateSchema::default();
    for section in &root.children {
        match section.tag.as_str() {
            "expressions" => {
                for expression in section.children_named("expression") {
                    let name = required_attr(expression, "name", FILE, path)?;
                    schema.expressions.insert(name.into(), expression.text().trim().to_string());
                }
            }
            "presets" => {
                for preset in section.children_named("preset") {
                    let name = required_attr(preset, "name", FILE, path)?;
                    let mut rows = Vec::new();
                    for values in preset.children_named("values") {
                        let mut row = PresetValues {
                            condition: values.attr("condition").unwrap_or_default().to_string(),
                            values: Default::default(),
                        };
                        for (key, value) in &values.attributes {
                            if key != "condition" {
                                row.values.insert(key.clone(), value.clone());
                            }
                        }
                        rows.push(row);
                    }
                    schema.presets.insert(name.into(), Preset { name: name.into(), rows });
                }
            }
            "propertyGroups" => {
                for group in section.children_named("propertyGroup") {
                    let name = required_attr(group, "name", FILE, path)?;
                    let mut entries = Vec::new();
                    for child in &group.children {
                        match child.tag.as_str() {
                            "property" => entries.push(PropertyGroupEntry::Property(
                                parse_template_property(child, path)?,
                            )),
                            "var" => {
                                entries.push(PropertyGroupEntry::Var(parse_var(child, path)?))
                            }
                            _ => {}
                        }
                    }
                    schema
                        .property_groups
                        .insert(name.into(), PropertyGroup { name: name.into(), entries });
                }
            }
            "variables" => {
                for child in &section.children {
                    match child.tag.as_str() {
                        "variable" => {
                            let definition = parse_variable_definition(child, path)?;
                            schema.variables.insert(definition.name.clone(), definition);
                        }
                        "variableGroup" => {
                            let name = required_attr(child, "name", FILE, path)?;
                            let mut entries = Vec::new();
                            for entry in &child.children {
                                match entry.tag.as_str() {
                                    "variable" => entries.push(VariableGroupEntry::Variable(
                                        parse_reference(entry, path)?,
                                    )),
                                    "group" => entries.push(VariableGroupEntry::Group(
                                        parse_reference(entry, path)?,
                                    )),
                                    _ => {}
                                }
                            }
                            schema
                                .variable_groups
                                .insert(name.into(), VariableGroup { name: name.into(), entries });
                        }
                        _ => {}
                    }
                }
            }
            "includes" => {
                for include in section.children_named("include") {
                    let name = required_attr(include, "name", FILE, path)?;
                    schema.includes.insert(name.into(), include.clone());
                }
            }
            "template" => schema.templates.push(parse_template(section, path)?),
            "submenu" => schema.submenus.push(parse_submenu(section, path)?),
            _ => {}
        }
    }
    Ok(schema)
}

fn parse_template_property(element: &Element, path: &Path) -> Result<TemplateProperty, Error> {
    let name = required_attr(element, "name", FILE, path)?;
    let value = match (element.attr("value"), element.attr("from")) {
        (Some(_), Some(_)) => {
            return Err(ConfigError::new(
                FILE,
                path,
                format!("property '{name}' declares both 'value' and 'from'"),
            )
            .with_line(element.line)
            .into());
        }
        (Some(value), None) => PropertyValue::Literal(value.to_string()),
        (None, Some(source)) => PropertyValue::From(source.to_string()),
        (None, None) => PropertyValue::Literal(element.text().trim().to_string()),
    };
    Ok(TemplateProperty { name: name.into(), value, condition: opt_condition(element) })
}

fn parse_var(element: &Element, path: &Path) -> Result<TemplateVar, Error> {
    let name = required_attr(element, "name", FILE, path)?;
    let cases = element
        .children_named("value")
        .map(|value| VarCase {
            condition: opt_condition(value),
            value: value.text().trim().to_string(),
        })
        .collect();
    Ok(TemplateVar { name: name.into(), cases })
}

fn parse_reference(element: &Element, path: &Path) -> Result<Reference, Error> {
    Ok(Reference {
        name: required_attr(element, "name", FILE, path)?.into(),
        suffix: element.attr("suffix").unwrap_or_default().to_string(),
        condition: opt_condition(element),
    })
}

fn parse_variable_definition(element: &Element, path: &Path) -> Result<VariableDefinition, Error> {
    let name = required_attr(element, "name", FILE, path)?;
    Ok(VariableDefinition {
        name: name.into(),
        body: element.clone(),
        output: opt_attr(element, "output"),
        condition: opt_condition(element),
    })
}

fn parse_template(element: &Element, path: &Path) -> Result<Template, Error> {
    let mut template = Template {
        build_mode: match element.attr("mode") {
            None => Default::default(),
            Some(raw) => raw.parse().map_err(|_| {
                ConfigError::new(FILE, path, format!("unknown template mode '{raw}'"))
                    .with_line(element.line)
            })?,
        },
        menu_filter: element.attr("menu").map(Into::into),
        template_only: match element.attr("templateonly") {
            Some(raw) if raw.eq_ignore_ascii_case("true") => TemplateOnly::Yes,
            Some(raw) if raw.eq_ignore_ascii_case("auto") => TemplateOnly::Auto,
            _ => TemplateOnly::No,
        },
        ..Default::default()
    };
    if let Some(include) = element.attr("include") {
        template.outputs.push(TemplateOutput {
            include: include.into(),
            id_prefix: element.attr("idprefix").unwrap_or_default().to_string(),
            suffix: element.attr("suffix").unwrap_or_default().to_string(),
        });
    }
    for child in &element.children {
        match child.tag.as_str() {
            "output" => template.outputs.push(TemplateOutput {
                include: required_attr(child, "include", FILE, path)?.into(),
                id_prefix: child.attr("idprefix").unwrap_or_default().to_string(),
                suffix: child.attr("suffix").unwrap_or_default().to_string(),
            }),
            "condition" => template.conditions.push(child.text().trim().to_string()),
            "param" => template.params.push(TemplateParam {
                name: required_attr(child, "name", FILE, path)?.into(),
                default: child.attr("default").unwrap_or_default().to_string(),
            }),
            "property" => template.properties.push(parse_template_property(child, path)?),
            "var" => template.vars.push(parse_var(child, path)?),
            "preset" => template.preset_refs.push(parse_reference(child, path)?),
            "propertyGroup" => template.group_refs.push(parse_reference(child, path)?),
            "variableGroup" => template.variable_group_refs.push(parse_reference(child, path)?),
            "variable" => template.variables.push(parse_variable_definition(child, path)?),
            "listitem" => {
                let mut row = crate::context::PropertyMap::new();
                for (key, value) in &child.attributes {
                    row.insert(key.clone(), value.clone());
                }
                template.list_items.push(row);
            }
            "controls" => template.controls = Some(child.clone()),
            _ => {}
        }
    }
    if template.outputs.is_empty() {
        return Err(ConfigError::new(FILE, path, "template declares no output include")
            .with_line(element.line)
            .into());
    }
    Ok(template)
}

fn parse_submenu(element: &Element, path: &Path) -> Result<SubmenuTemplate, Error> {
    let mut submenu = SubmenuTemplate {
        include: required_attr(element, "include", FILE, path)?.into(),
        ..Default::default()
    };
    for child in &element.children {
        match child.tag.as_str() {
            "condition" => submenu.conditions.push(child.text().trim().to_string()),
            "property" => submenu.properties.push(parse_template_property(child, path)?),
            "var" => submenu.vars.push(parse_var(child, path)?),
            "controls" => submenu.controls = Some(child.clone()),
            _ => {}
        }
    }
    Ok(submenu)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object_tree::BuildMode;

    fn load_str(source: &str) -> Result<TemplateSchema, Error> {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("templates.xml");
        std::fs::write(&path, source).unwrap();
        load(&path)
    }

    #[test]
    fn parses_all_sections() {
        let schema = load_str(
            r#"<templates>
  <expressions>
    <expression name="isWide">widgetArt=Landscape</expression>
  </expressions>
  <presets>
    <preset name="dimensions">
      <values condition="widgetArt=Poster" top="70" height="460"/>
      <values top="471" height="230"/>
    </preset>
  </presets>
  <propertyGroups>
    <propertyGroup name="art">
      <property name="artwork" from="widgetArt"/>
      <var name="aspect">
        <value condition="widgetArt=Poster">poster</value>
        <value>landscape</value>
      </var>
    </propertyGroup>
  </propertyGroups>
  <variables>
    <variable name="widgetheader" output="skinshortcuts-header-$PROPERTY[name]">
      <value condition="Integer.IsGreater(Container(80).NumItems,0)">$PROPERTY[widgetLabel]</value>
    </variable>
    <variableGroup name="headers">
      <variable name="widgetheader"/>
      <variable name="widgetheader" suffix=".2" condition="widgetPath.2"/>
    </variableGroup>
  </variables>
  <includes>
    <include name="pausedOverlay"><control type="image"><texture>paused.png</texture></control></include>
  </includes>
  <template include="widget" idprefix="8011" menu="main" templateonly="auto">
    <condition>widgetPath</condition>
    <output include="widget2" idprefix="8021" suffix=".2"/>
    <property name="style" value="Panel" condition="widgetStyle="/>
    <var name="rows"><value>4</value></var>
    <preset name="dimensions" suffix=".2"/>
    <propertyGroup name="art"/>
    <variableGroup name="headers"/>
    <controls><control type="panel" id="$PROPERTY[id]"/></controls>
  </template>
  <template include="static" mode="list">
    <listitem label="Movies" path="videodb://movies/"/>
    <listitem label="Shows" path="videodb://tvshows/"/>
    <controls><item>$PROPERTY[label]</item></controls>
  </template>
  <submenu include="submenuList">
    <condition>submenuVisible</condition>
    <controls><item>$PROPERTY[name]</item></controls>
  </submenu>
</templates>"#,
        )
        .unwrap();

        assert_eq!(schema.expressions.get("isWide").unwrap(), "widgetArt=Landscape");
        assert_eq!(schema.presets.get("dimensions").unwrap().rows.len(), 2);
        assert_eq!(schema.property_groups.get("art").unwrap().entries.len(), 2);
        assert!(schema.variables.contains_key("widgetheader"));
        assert_eq!(schema.variable_groups.get("headers").unwrap().entries.len(), 2);
        assert!(schema.includes.contains_key("pausedOverlay"));
        assert_eq!(schema.submenus.len(), 1);

        let widget = &schema.templates[0];
        assert_eq!(widget.build_mode, BuildMode::Menu);
        assert_eq!(widget.template_only, TemplateOnly::Auto);
        assert_eq!(widget.menu_filter.as_deref(), Some("main"));
        assert_eq!(widget.outputs.len(), 2);
        assert_eq!(widget.outputs[0].include, "widget");
        assert_eq!(widget.outputs[0].id_prefix, "8011");
        assert_eq!(widget.outputs[1].suffix, ".2");
        assert_eq!(widget.conditions, ["widgetPath"]);
        assert_eq!(widget.preset_refs[0].suffix, ".2");
        assert!(widget.controls.is_some());

        let list = &schema.templates[1];
        assert_eq!(list.build_mode, BuildMode::List);
        assert_eq!(list.list_items.len(), 2);
        assert_eq!(list.list_items[0].get("label").unwrap(), "Movies");
    }

    #[test]
    fn template_without_output_is_fatal() {
        let err = load_str(r#"<templates><template><controls/></template></templates>"#)
            .unwrap_err();
        assert!(err.to_string().contains("no output include"));
    }

    #[test]
    fn property_with_both_value_forms_is_fatal() {
        let err = load_str(
            r#"<templates><template include="t">
  <property name="x" value="a" from="b"/>
</template></templates>"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("both 'value' and 'from'"));
    }
}
