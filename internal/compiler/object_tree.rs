// Copyright © SixtyFPS GmbH <info@slint.dev>
// SPDX-License-Identifier: GPL-3.0-only OR LicenseRef-Slint-Royalty-free-2.0 OR LicenseRef-Slint-Software-3.0

/*!
 This module contains the typed configuration graph the loaders produce and
 the rest of the pipeline consumes: menus and their items, widget and
 background records, the property schema and the template schema.

 Everything in here is plain owned data. The graph is loaded once per build
 invocation, held immutably, and dropped afterwards.
*/

use indexmap::IndexMap;
use smol_str::SmolStr;

use crate::context::PropertyMap;
use crate::xmltree::Element;

/// One action attached to a menu item, optionally gated by a condition that
/// the host runtime evaluates.
#[derive(Debug, Clone, PartialEq)]
pub struct Action {
    pub action: String,
    pub condition: Option<String>,
}

impl Action {
    pub fn unconditional(action: impl Into<String>) -> Self {
        Action { action: action.into(), condition: None }
    }
}

/// Opaque protection record, consumed by the management dialog only.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Protection {
    pub pin: Option<String>,
    pub condition: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct MenuItem {
    pub name: SmolStr,
    pub label: String,
    pub label2: Option<String>,
    pub icon: Option<String>,
    pub thumb: Option<String>,
    pub actions: Vec<Action>,
    /// Visibility written to the output document.
    pub visible: Option<String>,
    /// Visibility only honored by the management dialog.
    pub dialog_visible: Option<String>,
    pub disabled: bool,
    /// Deletion-forbidden in the management dialog.
    pub required: bool,
    pub protection: Option<Protection>,
    pub submenu: Option<SmolStr>,
    pub properties: PropertyMap,
    /// The action as declared before user overrides were applied.
    pub original_action: Option<String>,
}

impl MenuItem {
    pub fn first_action(&self) -> Option<&str> {
        self.actions.first().map(|a| a.action.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::EnumString, strum::Display)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum ActionPlacement {
    Before,
    After,
}

/// Menu-wide action emitted around every item's own actions.
#[derive(Debug, Clone)]
pub struct DefaultAction {
    pub action: String,
    pub condition: Option<String>,
    pub placement: ActionPlacement,
}

#[derive(Debug, Clone, Default)]
pub struct MenuDefaults {
    pub properties: PropertyMap,
    pub actions: Vec<DefaultAction>,
}

/// Feature switches for the management dialog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MenuAllow {
    pub add: bool,
    pub remove: bool,
    pub reorder: bool,
}

impl Default for MenuAllow {
    fn default() -> Self {
        MenuAllow { add: true, remove: true, reorder: true }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Menu {
    pub name: SmolStr,
    pub items: Vec<MenuItem>,
    /// Container control the skin binds this menu to; drives the
    /// generated visibility expressions.
    pub container: Option<SmolStr>,
    /// Submenus are only emitted when referenced by an item.
    pub is_submenu: bool,
    pub defaults: MenuDefaults,
    pub allow: MenuAllow,
    pub controltype: Option<SmolStr>,
    pub start_id: Option<i64>,
}

impl Menu {
    pub fn enabled_items(&self) -> impl Iterator<Item = &MenuItem> {
        self.items.iter().filter(|item| !item.disabled)
    }

    pub fn item(&self, name: &str) -> Option<&MenuItem> {
        self.items.iter().find(|item| item.name == name)
    }
}

/// Static shortcut offered by the management dialog's picker.
#[derive(Debug, Clone, Default)]
pub struct ShortcutRecord {
    pub label: String,
    pub action: String,
    pub icon: Option<String>,
    pub condition: Option<String>,
}

/// Reference to dynamically provided shortcuts (library nodes, playlists,
/// add-ons). Resolved by an external [`ContentProvider`]; the compiler
/// treats the payload opaquely.
#[derive(Debug, Clone, Default)]
pub struct ContentDescriptor {
    pub source: String,
    pub target: Option<String>,
    pub path: Option<String>,
    pub extra: IndexMap<SmolStr, String>,
}

#[derive(Debug, Clone)]
pub enum GroupingEntry {
    Shortcut(ShortcutRecord),
    Group(Grouping),
    Content(ContentDescriptor),
}

#[derive(Debug, Clone, Default)]
pub struct Grouping {
    pub label: String,
    pub condition: Option<String>,
    pub entries: Vec<GroupingEntry>,
}

/// Dialog-side collaborator that expands a [`ContentDescriptor`] into
/// concrete shortcut records. Implementations typically query the host
/// media library; caching is up to them.
pub trait ContentProvider {
    fn resolve(&self, content: &ContentDescriptor) -> Vec<ShortcutRecord>;
}

#[derive(Debug, Clone, Default)]
pub struct IconSource {
    pub label: String,
    pub path: String,
}

/// Descriptor for an auxiliary management window.
#[derive(Debug, Clone, Default)]
pub struct SubDialog {
    pub name: SmolStr,
    pub window: Option<String>,
    pub property: Option<SmolStr>,
}

/// Rule rewriting a legacy action string, matched case-insensitively.
#[derive(Debug, Clone)]
pub struct ActionOverride {
    pub replace: String,
    pub with: String,
}

#[derive(Debug, Clone)]
pub struct MenuConfig {
    pub menus: Vec<Menu>,
    pub groupings: Vec<Grouping>,
    pub icon_sources: Vec<IconSource>,
    pub subdialogs: Vec<SubDialog>,
    pub action_overrides: Vec<ActionOverride>,
    pub context_menu: bool,
}

impl Default for MenuConfig {
    fn default() -> Self {
        MenuConfig {
            menus: Vec::new(),
            groupings: Vec::new(),
            icon_sources: Vec::new(),
            subdialogs: Vec::new(),
            action_overrides: Vec::new(),
            context_menu: true,
        }
    }
}

impl MenuConfig {
    pub fn menu(&self, name: &str) -> Option<&Menu> {
        self.menus.iter().find(|menu| menu.name == name)
    }
}

#[derive(Debug, Clone, Default)]
pub struct Widget {
    pub name: SmolStr,
    pub label: String,
    pub kind: Option<String>,
    pub path: Option<String>,
    pub target: Option<String>,
}

impl Widget {
    /// The fixed property bundle a selected widget contributes to an item,
    /// namespaced by the selecting property and its slot suffix.
    pub fn to_properties(&self, prefix: &str, suffix: &str) -> PropertyMap {
        let mut map = PropertyMap::new();
        map.insert(SmolStr::new(format!("{prefix}{suffix}")), self.name.to_string());
        map.insert(
            SmolStr::new(format!("{prefix}Path{suffix}")),
            self.path.clone().unwrap_or_default(),
        );
        map.insert(SmolStr::new(format!("{prefix}Label{suffix}")), self.label.clone());
        map.insert(
            SmolStr::new(format!("{prefix}Type{suffix}")),
            self.kind.clone().unwrap_or_default(),
        );
        map.insert(
            SmolStr::new(format!("{prefix}Target{suffix}")),
            self.target.clone().unwrap_or_default(),
        );
        map
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, strum::EnumString, strum::Display)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum BackgroundKind {
    #[default]
    Static,
    Playlist,
    Browse,
    Multi,
    Property,
    Live,
    #[strum(serialize = "live-playlist")]
    LivePlaylist,
}

#[derive(Debug, Clone, Default)]
pub struct Background {
    pub name: SmolStr,
    pub label: String,
    pub kind: BackgroundKind,
    pub path: Option<String>,
}

impl Background {
    pub fn to_properties(&self, prefix: &str, suffix: &str) -> PropertyMap {
        let mut map = PropertyMap::new();
        map.insert(SmolStr::new(format!("{prefix}{suffix}")), self.name.to_string());
        map.insert(SmolStr::new(format!("{prefix}Name{suffix}")), self.label.clone());
        map.insert(
            SmolStr::new(format!("{prefix}Path{suffix}")),
            self.path.clone().unwrap_or_default(),
        );
        map.insert(SmolStr::new(format!("{prefix}Type{suffix}")), self.kind.to_string());
        map
    }
}

#[derive(Debug, Clone, Default)]
pub struct WidgetConfig {
    pub widgets: Vec<Widget>,
    pub groupings: Vec<Grouping>,
}

impl WidgetConfig {
    pub fn widget(&self, name: &str) -> Option<&Widget> {
        self.widgets.iter().find(|w| w.name == name)
    }
}

#[derive(Debug, Clone, Default)]
pub struct BackgroundConfig {
    pub backgrounds: Vec<Background>,
    pub groupings: Vec<Grouping>,
}

impl BackgroundConfig {
    pub fn background(&self, name: &str) -> Option<&Background> {
        self.backgrounds.iter().find(|b| b.name == name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, strum::EnumString, strum::Display)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum PropertyKind {
    #[default]
    Options,
    Toggle,
    Widget,
    Background,
}

#[derive(Debug, Clone, Default)]
pub struct PropertyOption {
    pub value: String,
    pub label: Option<String>,
    pub condition: Option<String>,
    pub icon: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct PropertyDefinition {
    pub name: SmolStr,
    pub kind: PropertyKind,
    /// Another property that must be non-empty for this one to be offered.
    pub requires: Option<SmolStr>,
    /// Kept out of the generated `<property>` children.
    pub template_only: bool,
    pub options: Vec<PropertyOption>,
}

/// One candidate value for an unset property.
#[derive(Debug, Clone, PartialEq)]
pub struct FallbackRule {
    pub value: String,
    pub condition: Option<String>,
}

/// Dialog button wired to a property editor.
#[derive(Debug, Clone, Default)]
pub struct ButtonMapping {
    pub id: Option<i64>,
    pub property: SmolStr,
    pub suffix: String,
    pub kind: Option<PropertyKind>,
    pub requires: Option<SmolStr>,
}

#[derive(Debug, Clone, Default)]
pub struct PropertySchema {
    pub definitions: IndexMap<SmolStr, PropertyDefinition>,
    pub fallbacks: IndexMap<SmolStr, Vec<FallbackRule>>,
    pub buttons: Vec<ButtonMapping>,
}

impl PropertySchema {
    /// Look up a definition, tolerating a slot suffix on the queried name.
    pub fn definition(&self, name: &str) -> Option<&PropertyDefinition> {
        self.definitions
            .get(name)
            .or_else(|| self.definitions.get(crate::suffix::strip_slot_suffix(name)))
    }

    pub fn is_template_only(&self, name: &str) -> bool {
        self.definition(name).is_some_and(|def| def.template_only)
    }
}

#[derive(Debug, Clone)]
pub enum PropertyValue {
    Literal(String),
    From(String),
}

#[derive(Debug, Clone)]
pub struct TemplateProperty {
    pub name: SmolStr,
    pub value: PropertyValue,
    pub condition: Option<String>,
}

#[derive(Debug, Clone)]
pub struct VarCase {
    pub condition: Option<String>,
    pub value: String,
}

/// First matching case wins; a trailing unconditional case is the default.
#[derive(Debug, Clone)]
pub struct TemplateVar {
    pub name: SmolStr,
    pub cases: Vec<VarCase>,
}

#[derive(Debug, Clone)]
pub struct PresetValues {
    pub condition: String,
    pub values: IndexMap<SmolStr, String>,
}

/// Conditioned lookup table writing several context entries per match.
#[derive(Debug, Clone, Default)]
pub struct Preset {
    pub name: SmolStr,
    pub rows: Vec<PresetValues>,
}

#[derive(Debug, Clone)]
pub enum PropertyGroupEntry {
    Property(TemplateProperty),
    Var(TemplateVar),
}

#[derive(Debug, Clone, Default)]
pub struct PropertyGroup {
    pub name: SmolStr,
    pub entries: Vec<PropertyGroupEntry>,
}

/// Suffix- and condition-tagged reference to a preset, property group or
/// variable group.
#[derive(Debug, Clone, Default)]
pub struct Reference {
    pub name: SmolStr,
    pub suffix: String,
    pub condition: Option<String>,
}

#[derive(Debug, Clone)]
pub struct VariableDefinition {
    pub name: SmolStr,
    /// The `<variable>` payload, copied per emission.
    pub body: Element,
    /// Name template of the emitted variable; the definition name when absent.
    pub output: Option<String>,
    pub condition: Option<String>,
}

#[derive(Debug, Clone)]
pub enum VariableGroupEntry {
    Variable(Reference),
    Group(Reference),
}

#[derive(Debug, Clone, Default)]
pub struct VariableGroup {
    pub name: SmolStr,
    pub entries: Vec<VariableGroupEntry>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, strum::EnumString, strum::Display)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum BuildMode {
    #[default]
    Menu,
    List,
    Raw,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TemplateOnly {
    #[default]
    No,
    Yes,
    /// Emitted only when something references the template by name.
    Auto,
}

/// One declared output of a template: its include name, the id prefix for
/// generated control ids and the slot suffix its property reads use.
#[derive(Debug, Clone, Default)]
pub struct TemplateOutput {
    pub include: SmolStr,
    pub id_prefix: String,
    pub suffix: String,
}

#[derive(Debug, Clone, Default)]
pub struct TemplateParam {
    pub name: SmolStr,
    pub default: String,
}

#[derive(Debug, Clone, Default)]
pub struct Template {
    pub build_mode: BuildMode,
    /// Restrict MENU iteration to a single menu.
    pub menu_filter: Option<SmolStr>,
    pub template_only: TemplateOnly,
    /// ANDed; checked per item with the output's suffix applied.
    pub conditions: Vec<String>,
    pub outputs: Vec<TemplateOutput>,
    pub params: Vec<TemplateParam>,
    pub properties: Vec<TemplateProperty>,
    pub vars: Vec<TemplateVar>,
    pub preset_refs: Vec<Reference>,
    pub group_refs: Vec<Reference>,
    pub variable_group_refs: Vec<Reference>,
    pub variables: Vec<VariableDefinition>,
    pub list_items: Vec<PropertyMap>,
    pub controls: Option<Element>,
}

/// Template iterated over every (parent item, submenu item) pair.
#[derive(Debug, Clone, Default)]
pub struct SubmenuTemplate {
    pub include: SmolStr,
    pub conditions: Vec<String>,
    pub properties: Vec<TemplateProperty>,
    pub vars: Vec<TemplateVar>,
    pub controls: Option<Element>,
}

#[derive(Debug, Clone, Default)]
pub struct TemplateSchema {
    pub expressions: IndexMap<SmolStr, String>,
    pub presets: IndexMap<SmolStr, Preset>,
    pub property_groups: IndexMap<SmolStr, PropertyGroup>,
    pub variables: IndexMap<SmolStr, VariableDefinition>,
    pub variable_groups: IndexMap<SmolStr, VariableGroup>,
    pub includes: IndexMap<SmolStr, Element>,
    pub templates: Vec<Template>,
    pub submenus: Vec<SubmenuTemplate>,
}

impl TemplateSchema {
    /// Resolve a preset reference that may carry a slot suffix on the name
    /// (`dimensions.2` reads preset `dimensions` through slot 2). Returns
    /// the preset and the effective suffix.
    pub fn preset_with_suffix<'a>(&'a self, name: &str) -> Option<(&'a Preset, String)> {
        if let Some(preset) = self.presets.get(name) {
            return Some((preset, String::new()));
        }
        let base = crate::suffix::strip_slot_suffix(name);
        if base != name {
            if let Some(preset) = self.presets.get(base) {
                return Some((preset, name[base.len()..].to_string()));
            }
        }
        None
    }
}

#[derive(Debug, Clone, Default)]
pub struct View {
    pub id: SmolStr,
    pub label: String,
}

/// Which views a given content type may use and which one is the default,
/// split between the local library and plugin-provided listings.
#[derive(Debug, Clone, Default)]
pub struct ContentRule {
    pub name: SmolStr,
    pub visible: String,
    pub views: Vec<SmolStr>,
    pub library_default: Option<SmolStr>,
    pub plugin_default: Option<SmolStr>,
}

#[derive(Debug, Clone, Default)]
pub struct ViewConfig {
    pub prefix: String,
    pub views: Vec<View>,
    pub rules: Vec<ContentRule>,
}
