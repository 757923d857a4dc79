// Copyright © SixtyFPS GmbH <info@slint.dev>
// SPDX-License-Identifier: GPL-3.0-only OR LicenseRef-Slint-Royalty-free-2.0 OR LicenseRef-Slint-Software-3.0

//! Loader for `menus.xml`: menus, submenus, their items, plus the
//! dialog-side extras (shortcut groupings, icon sources, subdialog
//! descriptors, action overrides and the context-menu toggle).

use std::collections::HashSet;
use std::path::Path;

use smol_str::SmolStr;

use super::{attr_bool, opt_attr, opt_condition, parse_groupings, read_root, required_attr};
use crate::diagnostics::{ConfigError, ConfigFile, Error};
use crate::object_tree::{
    Action, ActionOverride, ActionPlacement, DefaultAction, IconSource, Menu, MenuAllow,
    MenuConfig, MenuDefaults, MenuItem, Protection, SubDialog,
};
use crate::xmltree::Element;

const FILE: ConfigFile = ConfigFile::Menu;

pub fn load(path: &Path) -> Result<MenuConfig, Error> {
    let Some(root) = read_root(path, FILE)? else {
        return Ok(MenuConfig::default());
    };
    let mut config = MenuConfig::default();
    let mut seen_menus = HashSet::new();
    for child in &root.children {
        match child.tag.as_str() {
            "menu" | "submenu" => {
                let menu = parse_menu(child, child.tag == "submenu", path)?;
                if !seen_menus.insert(menu.name.clone()) {
                    return Err(ConfigError::new(
                        FILE,
                        path,
                        format!("duplicate menu '{}'", menu.name),
                    )
                    .with_line(child.line)
                    .into());
                }
                config.menus.push(menu);
            }
            "contextmenu" => config.context_menu = child.text().trim().eq_ignore_ascii_case("true"),
            "actionoverride" => config.action_overrides.push(ActionOverride {
                replace: required_attr(child, "replace", FILE, path)?.to_string(),
                with: required_attr(child, "with", FILE, path)?.to_string(),
            }),
            "iconsource" => config.icon_sources.push(IconSource {
                label: child.attr("label").unwrap_or_default().to_string(),
                path: required_attr(child, "path", FILE, path)?.to_string(),
            }),
            "subdialog" => config.subdialogs.push(SubDialog {
                name: required_attr(child, "name", FILE, path)?.into(),
                window: opt_attr(child, "window"),
                property: child.attr("property").map(SmolStr::new),
            }),
            _ => {}
        }
    }
    config.groupings = parse_groupings(&root);
    Ok(config)
}

fn parse_menu(element: &Element, is_submenu: bool, path: &Path) -> Result<Menu, Error> {
    let name = required_attr(element, "name", FILE, path)?;
    let mut menu = Menu {
        name: name.into(),
        is_submenu,
        container: element.attr("container").map(SmolStr::new),
        controltype: element.attr("controltype").map(SmolStr::new),
        ..Default::default()
    };
    if let Some(id) = element.attr("id") {
        menu.start_id = Some(id.parse().map_err(|_| {
            ConfigError::new(FILE, path, format!("menu '{name}' has non-numeric id '{id}'"))
                .with_line(element.line)
        })?);
    }

    if let Some(defaults) = element.child("defaults") {
        menu.defaults = parse_defaults(defaults, path)?;
    }
    if let Some(allow) = element.child("allow") {
        menu.allow = MenuAllow {
            add: attr_bool(allow, "add", true),
            remove: attr_bool(allow, "remove", true),
            reorder: attr_bool(allow, "reorder", true),
        };
    }

    let mut seen_items = HashSet::new();
    for item_element in element.children_named("item") {
        let item = parse_item(item_element, path)?;
        if !seen_items.insert(item.name.clone()) {
            return Err(ConfigError::new(
                FILE,
                path,
                format!("duplicate item '{}' in menu '{name}'", item.name),
            )
            .with_line(item_element.line)
            .into());
        }
        menu.items.push(item);
    }

    // menu-level widget/background selections become item properties
    for attribute in ["widget", "background"] {
        if let Some(value) = element.attr(attribute) {
            for item in &mut menu.items {
                if !item.properties.contains_key(attribute) {
                    item.properties.insert(attribute.into(), value.to_string());
                }
            }
        }
    }
    Ok(menu)
}

fn parse_defaults(element: &Element, path: &Path) -> Result<MenuDefaults, Error> {
    let mut defaults = MenuDefaults::default();
    for child in &element.children {
        match child.tag.as_str() {
            "property" => {
                let name = required_attr(child, "name", FILE, path)?;
                defaults.properties.insert(name.into(), child.text().trim().to_string());
            }
            "action" => {
                let placement = match child.attr("placement") {
                    None => ActionPlacement::Before,
                    Some(raw) => raw.parse().map_err(|_| {
                        ConfigError::new(
                            FILE,
                            path,
                            format!("invalid action placement '{raw}'"),
                        )
                        .with_line(child.line)
                    })?,
                };
                defaults.actions.push(DefaultAction {
                    action: child.text().trim().to_string(),
                    condition: opt_condition(child),
                    placement,
                });
            }
            _ => {}
        }
    }
    Ok(defaults)
}

fn parse_item(element: &Element, path: &Path) -> Result<MenuItem, Error> {
    let name = required_attr(element, "name", FILE, path)?;
    let mut item = MenuItem {
        name: name.into(),
        label: element.attr("label").unwrap_or(name).to_string(),
        label2: opt_attr(element, "label2"),
        icon: opt_attr(element, "icon"),
        thumb: opt_attr(element, "thumb"),
        visible: opt_attr(element, "visible"),
        dialog_visible: opt_attr(element, "dialogvisible"),
        disabled: attr_bool(element, "disabled", false),
        required: attr_bool(element, "required", false),
        submenu: element.attr("submenu").map(SmolStr::new),
        ..Default::default()
    };
    for child in &element.children {
        match child.tag.as_str() {
            "action" => item.actions.push(Action {
                action: child.text().trim().to_string(),
                condition: opt_condition(child),
            }),
            "property" => {
                let prop = required_attr(child, "name", FILE, path)?;
                item.properties.insert(prop.into(), child.text().trim().to_string());
            }
            "protection" => {
                item.protection = Some(Protection {
                    pin: opt_attr(child, "pin"),
                    condition: opt_condition(child),
                });
            }
            _ => {}
        }
    }
    // item-level widget/background selections are property sugar as well
    for attribute in ["widget", "background"] {
        if let Some(value) = element.attr(attribute) {
            if !item.properties.contains_key(attribute) {
                item.properties.insert(attribute.into(), value.to_string());
            }
        }
    }
    item.original_action = item.first_action().map(str::to_string);
    Ok(item)
}
