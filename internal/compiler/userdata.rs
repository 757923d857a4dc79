// Copyright © SixtyFPS GmbH <info@slint.dev>
// SPDX-License-Identifier: GPL-3.0-only OR LicenseRef-Slint-Royalty-free-2.0 OR LicenseRef-Slint-Software-3.0

//! The user-customization overlay and its merge onto the default menus.
//!
//! The overlay is a JSON document; decoding is deliberately lenient. A
//! malformed file degrades to the empty overlay, a malformed entry is
//! skipped, both with a logged warning, so one broken record never blocks
//! the build. The default menu list is never mutated: the merge produces a
//! fresh list, which keeps reset-to-defaults available.

use std::path::Path;

use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;
use smol_str::SmolStr;

use crate::context::PropertyMap;
use crate::diagnostics::Error;
use crate::fileio;
use crate::object_tree::{
    Action, ActionOverride, BackgroundConfig, Menu, MenuConfig, MenuItem, PropertyKind,
    PropertySchema, WidgetConfig,
};
use crate::suffix::{slot_suffix, strip_slot_suffix};

/// Default action for user-created items that never got one assigned.
const NOOP_ACTION: &str = "noop";
/// Default icon for user-created items.
const DEFAULT_ICON: &str = "DefaultShortcut.png";

#[derive(Debug, Clone, Default, Serialize)]
pub struct UserData {
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub menus: IndexMap<String, MenuOverride>,
    /// view selections: source (`library`, `plugins` or an add-on id)
    /// → content type → view id
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub views: IndexMap<String, IndexMap<String, String>>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct MenuOverride {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub items: Vec<MenuItemOverride>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub removed: Vec<String>,
}

/// Every field except `name` means "inherit the default" when unset.
#[derive(Debug, Clone, Default, Serialize)]
pub struct MenuItemOverride {
    pub name: SmolStr,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actions: Option<Vec<OverrideAction>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disabled: Option<bool>,
    #[serde(skip_serializing_if = "PropertyMap::is_empty")]
    pub properties: PropertyMap,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<usize>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub is_new: bool,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct OverrideAction {
    pub action: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
}

impl UserData {
    /// Load the overlay; any kind of failure degrades to the empty overlay.
    pub fn load(path: &Path) -> UserData {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return UserData::default(),
            Err(e) => {
                log::warn!("could not read user data {}: {e}", path.display());
                return UserData::default();
            }
        };
        match serde_json::from_str::<Value>(&text) {
            Ok(value) => Self::from_value(&value),
            Err(e) => {
                log::warn!("malformed user data {}: {e}", path.display());
                UserData::default()
            }
        }
    }

    /// Per-entry decoding: a bad menu or item entry is skipped, the rest
    /// of the document stays usable.
    pub fn from_value(value: &Value) -> UserData {
        let mut data = UserData::default();
        if let Some(menus) = value.get("menus").and_then(Value::as_object) {
            for (name, entry) in menus {
                match decode_menu_override(entry) {
                    Some(override_) => {
                        data.menus.insert(name.clone(), override_);
                    }
                    None => log::warn!("skipping malformed override for menu '{name}'"),
                }
            }
        }
        if let Some(views) = value.get("views").and_then(Value::as_object) {
            for (source, selections) in views {
                let Some(selections) = selections.as_object() else {
                    log::warn!("skipping malformed view selections for '{source}'");
                    continue;
                };
                let decoded = selections
                    .iter()
                    .filter_map(|(content, view)| {
                        Some((content.clone(), view.as_str()?.to_string()))
                    })
                    .collect();
                data.views.insert(source.clone(), decoded);
            }
        }
        data
    }

    pub fn save(&self, path: &Path) -> Result<(), Error> {
        let text = serde_json::to_string_pretty(self)
            .map_err(|e| Error::io(path, std::io::Error::other(e)))?;
        fileio::write_atomic(path, text.as_bytes())
    }

    pub fn view_selection(&self, source: &str, content: &str) -> Option<&str> {
        self.views.get(source)?.get(content).map(String::as_str)
    }
}

fn decode_menu_override(value: &Value) -> Option<MenuOverride> {
    let object = value.as_object()?;
    let mut override_ = MenuOverride::default();
    if let Some(items) = object.get("items") {
        for item in items.as_array()? {
            match decode_item_override(item) {
                Some(item) => override_.items.push(item),
                None => log::warn!("skipping malformed item override"),
            }
        }
    }
    if let Some(removed) = object.get("removed") {
        override_.removed = removed
            .as_array()?
            .iter()
            .filter_map(|v| v.as_str().map(str::to_string))
            .collect();
    }
    Some(override_)
}

fn decode_item_override(value: &Value) -> Option<MenuItemOverride> {
    let object = value.as_object()?;
    let name = object.get("name")?.as_str()?;
    let mut item = MenuItemOverride { name: name.into(), ..Default::default() };
    if let Some(label) = object.get("label") {
        item.label = Some(label.as_str()?.to_string());
    }
    if let Some(actions) = object.get("actions") {
        let mut decoded = Vec::new();
        for action in actions.as_array()? {
            let action = action.as_object()?;
            decoded.push(OverrideAction {
                action: action.get("action")?.as_str()?.to_string(),
                condition: action
                    .get("condition")
                    .and_then(Value::as_str)
                    .map(str::to_string),
            });
        }
        item.actions = Some(decoded);
    }
    if let Some(icon) = object.get("icon") {
        item.icon = Some(icon.as_str()?.to_string());
    }
    if let Some(disabled) = object.get("disabled") {
        item.disabled = Some(disabled.as_bool()?);
    }
    if let Some(properties) = object.get("properties").and_then(Value::as_object) {
        for (key, value) in properties {
            item.properties.insert(key.as_str().into(), value.as_str()?.to_string());
        }
    }
    if let Some(position) = object.get("position") {
        item.position = Some(position.as_u64()? as usize);
    }
    item.is_new = object.get("is_new").and_then(Value::as_bool).unwrap_or(false);
    Some(item)
}

/// Overlay the user data onto the default menu list, producing the
/// effective list the processor works from. Defaults stay untouched.
pub fn merge_menus(config: &MenuConfig, userdata: &UserData) -> Vec<Menu> {
    let mut menus = Vec::with_capacity(config.menus.len());
    for menu in &config.menus {
        let mut merged = menu.clone();
        if let Some(override_) = userdata.menus.get(menu.name.as_str()) {
            merged.items = merge_items(&menu.items, override_);
        }
        menus.push(merged);
    }
    // menus that only exist in the user data (custom submenus, custom widgets)
    for (name, override_) in &userdata.menus {
        if config.menu(name).is_none() {
            let menu = Menu {
                name: name.as_str().into(),
                // dotted names are per-item attachments, only emitted when
                // referenced, like declared submenus
                is_submenu: name.contains('.'),
                items: merge_items(&[], override_),
                ..Default::default()
            };
            menus.push(menu);
        }
    }
    apply_action_overrides(&mut menus, &config.action_overrides);
    menus
}

fn merge_items(defaults: &[MenuItem], override_: &MenuOverride) -> Vec<MenuItem> {
    let mut items = Vec::with_capacity(defaults.len());
    for default in defaults {
        if override_.removed.iter().any(|r| r == default.name.as_str()) {
            continue;
        }
        let mut item = default.clone();
        if let Some(entry) = override_.items.iter().find(|o| o.name == item.name) {
            apply_item_override(&mut item, entry);
        }
        items.push(item);
    }
    for entry in &override_.items {
        if entry.is_new && !items.iter().any(|i| i.name == entry.name) {
            items.push(new_item(entry));
        }
    }
    reposition(&mut items, override_);
    items
}

fn apply_item_override(item: &mut MenuItem, entry: &MenuItemOverride) {
    if let Some(label) = &entry.label {
        item.label = label.clone();
    }
    if let Some(actions) = &entry.actions {
        item.actions = actions
            .iter()
            .map(|a| Action { action: a.action.clone(), condition: a.condition.clone() })
            .collect();
    }
    if let Some(icon) = &entry.icon {
        item.icon = Some(icon.clone());
    }
    if let Some(disabled) = entry.disabled {
        item.disabled = disabled;
    }
    for (key, value) in &entry.properties {
        item.properties.insert(key.clone(), value.clone());
    }
}

fn new_item(entry: &MenuItemOverride) -> MenuItem {
    let mut item = MenuItem {
        name: entry.name.clone(),
        label: entry.label.clone().unwrap_or_else(|| entry.name.to_string()),
        icon: Some(entry.icon.clone().unwrap_or_else(|| DEFAULT_ICON.to_string())),
        disabled: entry.disabled.unwrap_or(false),
        properties: entry.properties.clone(),
        ..Default::default()
    };
    item.actions = match &entry.actions {
        Some(actions) => actions
            .iter()
            .map(|a| Action { action: a.action.clone(), condition: a.condition.clone() })
            .collect(),
        None => vec![Action::unconditional(NOOP_ACTION)],
    };
    item.original_action = item.first_action().map(str::to_string);
    item
}

/// Items with an override `position` land at that position, everything
/// else keeps its relative order.
fn reposition(items: &mut Vec<MenuItem>, override_: &MenuOverride) {
    let mut moved: Vec<(usize, MenuItem)> = Vec::new();
    let mut index = 0;
    while index < items.len() {
        let position = override_
            .items
            .iter()
            .find(|o| o.name == items[index].name)
            .and_then(|o| o.position);
        match position {
            Some(position) => moved.push((position, items.remove(index))),
            None => index += 1,
        }
    }
    moved.sort_by_key(|(position, _)| *position);
    for (position, item) in moved {
        let position = position.min(items.len());
        items.insert(position, item);
    }
}

/// Rewrite legacy action strings, matching case-insensitively.
pub fn apply_action_overrides(menus: &mut [Menu], overrides: &[ActionOverride]) {
    if overrides.is_empty() {
        return;
    }
    for menu in menus {
        for item in &mut menu.items {
            for action in &mut item.actions {
                if let Some(rule) =
                    overrides.iter().find(|r| r.replace.eq_ignore_ascii_case(&action.action))
                {
                    action.action = rule.with.clone();
                }
            }
        }
    }
}

/// Expand widget/background selections into their property bundles:
/// an item property whose schema type is `widget` or `background` and
/// whose value names a known record contributes that record's fixed
/// properties, without overwriting anything the item already sets.
pub fn resolve_property_selections(
    menus: &mut [Menu],
    schema: &PropertySchema,
    widgets: &WidgetConfig,
    backgrounds: &BackgroundConfig,
) {
    for menu in menus {
        for item in &mut menu.items {
            let selections: Vec<(SmolStr, String)> = item
                .properties
                .iter()
                .filter(|(key, _)| {
                    schema.definition(key).is_some_and(|def| {
                        matches!(def.kind, PropertyKind::Widget | PropertyKind::Background)
                    })
                })
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect();
            for (key, value) in selections {
                let kind = schema.definition(&key).map(|def| def.kind);
                let base = strip_slot_suffix(&key);
                let suffix = slot_suffix(&key);
                let bundle = match kind {
                    Some(PropertyKind::Widget) => {
                        widgets.widget(&value).map(|w| w.to_properties(base, suffix))
                    }
                    Some(PropertyKind::Background) => {
                        backgrounds.background(&value).map(|b| b.to_properties(base, suffix))
                    }
                    _ => None,
                };
                let Some(bundle) = bundle else { continue };
                for (prop, prop_value) in bundle {
                    if !item.properties.contains_key(&prop) {
                        item.properties.insert(prop, prop_value);
                    }
                }
            }
        }
    }
}
