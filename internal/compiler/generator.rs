// Copyright © SixtyFPS GmbH <info@slint.dev>
// SPDX-License-Identifier: GPL-3.0-only OR LicenseRef-Slint-Royalty-free-2.0 OR LicenseRef-Slint-Software-3.0

/*!
The module responsible for assembling and writing the output document.

The root `<includes>` holds, in order: the generated view expressions, the
template variables, one include per menu, the combined submenu includes,
the custom-widget includes and finally the template includes.
*/

use std::path::PathBuf;

use crate::diagnostics::Error;
use crate::fileio;
use crate::object_tree::{
    Action, ActionPlacement, Menu, MenuItem, PropertySchema, TemplateSchema, ViewConfig,
};
use crate::template::TemplateProcessor;
use crate::userdata::UserData;
use crate::viewexpr;
use crate::xmltree::Element;

/// Custom widget slots probed per item: `{item}.customwidget`,
/// `{item}.customwidget.2` … `.10`.
const CUSTOM_WIDGET_SLOTS: usize = 10;

pub struct IncludeGenerator<'a> {
    pub menus: &'a [Menu],
    pub property_schema: &'a PropertySchema,
    pub template_schema: Option<&'a TemplateSchema>,
    pub view_config: &'a ViewConfig,
    pub userdata: &'a UserData,
}

impl IncludeGenerator<'_> {
    pub fn build_document(&self) -> Result<Element, Error> {
        let mut root = Element::new("includes");

        root.children.extend(viewexpr::build_expressions(self.view_config, self.userdata));

        let mut includes = Vec::new();
        for menu in self.menus.iter().filter(|m| !m.is_submenu) {
            includes.push(self.menu_include(menu));
        }
        for menu in self.menus.iter().filter(|m| !m.is_submenu) {
            includes.push(self.submenu_include(menu));
        }
        for menu in self.menus.iter().filter(|m| !m.is_submenu) {
            for item in menu.enabled_items() {
                includes.extend(self.custom_widget_includes(item));
            }
        }

        let (template_includes, variables) = match self.template_schema {
            Some(schema) => {
                TemplateProcessor::new(schema, self.property_schema, self.menus).run()?
            }
            None => (Vec::new(), Vec::new()),
        };

        root.children.extend(variables);
        root.children.extend(includes);
        root.children.extend(template_includes);
        Ok(root)
    }

    fn menu_include(&self, menu: &Menu) -> Element {
        let mut include = Element::new("include");
        include.set_attr("name", format!("skinshortcuts-{}", menu.name));
        for (position, item) in menu.enabled_items().enumerate() {
            include.push(self.build_item(menu, item, position + 1, None));
        }
        finish_include(include)
    }

    /// All submenu items of a menu, flattened into one include, each
    /// carrying its parent item and a visibility link to it.
    fn submenu_include(&self, menu: &Menu) -> Element {
        let mut include = Element::new("include");
        include.set_attr("name", format!("skinshortcuts-{}-submenu", menu.name));
        let mut position = 0;
        for parent in menu.enabled_items() {
            let Some(submenu_name) = &parent.submenu else { continue };
            let Some(submenu) = self.menus.iter().find(|m| m.name == *submenu_name) else {
                log::debug!("item '{}' references unknown submenu '{submenu_name}'", parent.name);
                continue;
            };
            for item in submenu.enabled_items() {
                position += 1;
                include.push(self.build_item(submenu, item, position, Some((menu, parent))));
            }
        }
        finish_include(include)
    }

    fn custom_widget_includes(&self, item: &MenuItem) -> Vec<Element> {
        let mut includes = Vec::new();
        for slot in 1..=CUSTOM_WIDGET_SLOTS {
            let menu_name = match slot {
                1 => format!("{}.customwidget", item.name),
                _ => format!("{}.customwidget.{slot}", item.name),
            };
            let Some(menu) = self.menus.iter().find(|m| m.name == menu_name.as_str()) else {
                continue;
            };
            let mut include = Element::new("include");
            let slot_label = if slot == 1 { String::new() } else { slot.to_string() };
            include.set_attr("name", format!("skinshortcuts-{}-customwidget{slot_label}", item.name));
            for (position, widget_item) in menu.enabled_items().enumerate() {
                include.push(self.build_item(menu, widget_item, position + 1, None));
            }
            includes.push(finish_include(include));
        }
        includes
    }

    fn build_item(
        &self,
        menu: &Menu,
        item: &MenuItem,
        index: usize,
        parent: Option<(&Menu, &MenuItem)>,
    ) -> Element {
        let control_mode = menu.controltype.is_some();
        let mut element = match &menu.controltype {
            Some(controltype) => {
                let mut control = Element::new("control");
                control.set_attr("type", controltype.to_string());
                control.set_attr("id", (menu.start_id.unwrap_or(0) + index as i64).to_string());
                control
            }
            None => {
                let mut item_element = Element::new("item");
                item_element.set_attr("id", index.to_string());
                item_element
            }
        };

        element.push(Element::with_text("label", item.label.clone()));
        if let Some(label2) = &item.label2 {
            element.push(Element::with_text("label2", label2.clone()));
        }
        if let Some(icon) = &item.icon {
            element.push(Element::with_text("icon", icon.clone()));
        }
        if let Some(thumb) = &item.thumb {
            element.push(Element::with_text("thumb", thumb.clone()));
        }

        for action in self.ordered_actions(menu, item) {
            let mut onclick = Element::with_text("onclick", action.action.clone());
            if let Some(condition) = &action.condition {
                onclick.set_attr("condition", condition.clone());
            }
            element.push(onclick);
        }

        let mut visibility = Vec::new();
        if let Some(visible) = &item.visible {
            visibility.push(visible.clone());
        }
        if let Some((parent_menu, parent_item)) = parent {
            if let Some(container) = &parent_menu.container {
                visibility.push(format!(
                    "String.IsEqual(Container({container}).ListItem.Property(name),{})",
                    parent_item.name
                ));
            }
        }
        match visibility.len() {
            0 => {}
            1 => element.push(Element::with_text("visible", visibility.remove(0))),
            _ => element.push(Element::with_text(
                "visible",
                visibility.iter().map(|v| format!("[{v}]")).collect::<Vec<_>>().join(" + "),
            )),
        }

        let mut push_property = |name: &str, value: String| {
            let mut property = Element::with_text("property", value);
            property.set_attr("name", name);
            element.push(property);
        };
        if !control_mode {
            push_property("id", index.to_string());
        }
        push_property("name", item.name.to_string());
        push_property("menu", menu.name.to_string());
        push_property("path", item.first_action().unwrap_or_default().to_string());
        if let Some((_, parent_item)) = parent {
            push_property("parent", parent_item.name.to_string());
        }
        for (key, value) in &item.properties {
            if self.property_schema.is_template_only(key) {
                continue;
            }
            push_property(key, value.clone());
        }
        element
    }

    /// Emission order: before-defaults, conditional item actions,
    /// unconditional item actions, after-defaults.
    fn ordered_actions(&self, menu: &Menu, item: &MenuItem) -> Vec<Action> {
        let defaults = &menu.defaults.actions;
        let mut ordered: Vec<Action> = Vec::new();
        for default in defaults.iter().filter(|d| d.placement == ActionPlacement::Before) {
            ordered
                .push(Action { action: default.action.clone(), condition: default.condition.clone() });
        }
        ordered.extend(item.actions.iter().filter(|a| a.condition.is_some()).cloned());
        ordered.extend(item.actions.iter().filter(|a| a.condition.is_none()).cloned());
        for default in defaults.iter().filter(|d| d.placement == ActionPlacement::After) {
            ordered
                .push(Action { action: default.action.clone(), condition: default.condition.clone() });
        }
        ordered
    }
}

fn finish_include(mut include: Element) -> Element {
    if include.children.is_empty() {
        include.push(Element::with_text("description", "No items"));
    }
    include
}

/// Serialize and atomically write the document to every output path.
pub fn write_document(document: &Element, output_paths: &[PathBuf]) -> Result<(), Error> {
    let serialized = document.to_document_string();
    for path in output_paths {
        fileio::write_atomic(path, serialized.as_bytes())?;
    }
    Ok(())
}
