// Copyright © SixtyFPS GmbH <info@slint.dev>
// SPDX-License-Identifier: GPL-3.0-only OR LicenseRef-Slint-Royalty-free-2.0 OR LicenseRef-Slint-Software-3.0

//! End-to-end scenarios driving [`skinshortcuts_compiler::build`] against
//! real files in a scratch directory.

use std::path::Path;

use skinshortcuts_compiler::xmltree::Element;
use skinshortcuts_compiler::{build, CompilerConfiguration};

fn write(dir: &Path, name: &str, content: &str) {
    std::fs::write(dir.join(name), content).unwrap();
}

fn configuration(dir: &Path) -> CompilerConfiguration {
    CompilerConfiguration::new(dir, dir.join("output").join("script-skinshortcuts-includes.xml"))
}

fn build_and_read(config: &CompilerConfiguration) -> String {
    assert!(build(config).unwrap());
    std::fs::read_to_string(&config.output_paths[0]).unwrap()
}

fn find_include<'e>(root: &'e Element, name: &str) -> &'e Element {
    root.children_named("include")
        .find(|e| e.attr("name") == Some(name))
        .unwrap_or_else(|| panic!("no include named '{name}'"))
}

#[test]
fn simple_item_emission() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "menus.xml",
        r#"<menus>
  <menu name="main">
    <item name="movies" label="Movies" icon="m.png">
      <action>Go()</action>
    </item>
  </menu>
</menus>"#,
    );
    let config = configuration(dir.path());
    let output = build_and_read(&config);
    assert_eq!(
        output,
        r#"<?xml version="1.0" encoding="UTF-8"?>
<includes>
  <include name="skinshortcuts-main">
    <item id="1">
      <label>Movies</label>
      <icon>m.png</icon>
      <onclick>Go()</onclick>
      <property name="id">1</property>
      <property name="name">movies</property>
      <property name="menu">main</property>
      <property name="path">Go()</property>
    </item>
  </include>
  <include name="skinshortcuts-main-submenu">
    <description>No items</description>
  </include>
</includes>
"#
    );
}

#[test]
fn builds_are_deterministic() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "menus.xml",
        r#"<menus>
  <menu name="main">
    <item name="a" label="A"><action>Go(a)</action></item>
    <item name="b" label="B"><action>Go(b)</action></item>
  </menu>
</menus>"#,
    );
    let mut config = configuration(dir.path());
    let first = build_and_read(&config);
    let first_hash = std::fs::read_to_string(&config.hash_path).unwrap();
    config.force = true;
    let second = build_and_read(&config);
    let second_hash = std::fs::read_to_string(&config.hash_path).unwrap();
    assert_eq!(first, second);
    assert_eq!(first_hash, second_hash);
}

#[test]
fn include_order_follows_menu_declaration_order() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "menus.xml",
        r#"<menus>
  <menu name="second-alphabetically"><item name="x" label="X"/></menu>
  <menu name="first-alphabetically"><item name="y" label="Y"/></menu>
</menus>"#,
    );
    let config = configuration(dir.path());
    let root = Element::parse_str(&build_and_read(&config)).unwrap();
    let names: Vec<_> = root
        .children_named("include")
        .filter_map(|e| e.attr("name"))
        .filter(|n| !n.ends_with("-submenu"))
        .collect();
    assert_eq!(
        names,
        ["skinshortcuts-second-alphabetically", "skinshortcuts-first-alphabetically"]
    );
}

#[test]
fn user_overrides_merge_into_output() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "menus.xml",
        r#"<menus>
  <menu name="main">
    <item name="a" label="A"><action>Go(a)</action></item>
    <item name="b" label="B"><action>Go(b)</action></item>
    <item name="c" label="C"><action>Go(c)</action></item>
  </menu>
</menus>"#,
    );
    write(
        dir.path(),
        "userdata.json",
        r#"{ "menus": { "main": {
  "items": [ { "name": "a", "label": "A′", "position": 2 } ],
  "removed": ["c"]
} } }"#,
    );
    let config = configuration(dir.path());
    let root = Element::parse_str(&build_and_read(&config)).unwrap();
    let main = find_include(&root, "skinshortcuts-main");
    let labels: Vec<_> =
        main.children.iter().map(|item| item.child("label").unwrap().text()).collect();
    assert_eq!(labels, ["B", "A′"]);
}

#[test]
fn submenu_items_link_to_their_parent() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "menus.xml",
        r#"<menus>
  <menu name="main" container="9000">
    <item name="movies" label="Movies" submenu="movies-sub"><action>Go()</action></item>
  </menu>
  <submenu name="movies-sub">
    <item name="recent" label="Recent"><action>Go(recent)</action></item>
  </submenu>
</menus>"#,
    );
    let config = configuration(dir.path());
    let root = Element::parse_str(&build_and_read(&config)).unwrap();

    // the submenu does not produce a top-level include of its own
    assert!(root
        .children_named("include")
        .all(|e| e.attr("name") != Some("skinshortcuts-movies-sub")));

    let submenu = find_include(&root, "skinshortcuts-main-submenu");
    let item = &submenu.children[0];
    assert_eq!(item.child("label").unwrap().text(), "Recent");
    assert_eq!(
        item.child("visible").unwrap().text(),
        "String.IsEqual(Container(9000).ListItem.Property(name),movies)"
    );
    let parent_property = item
        .children_named("property")
        .find(|p| p.attr("name") == Some("parent"))
        .unwrap();
    assert_eq!(parent_property.text(), "movies");
}

#[test]
fn custom_widget_menus_emit_their_includes() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "menus.xml",
        r#"<menus>
  <menu name="main">
    <item name="movies" label="Movies"><action>Go()</action></item>
  </menu>
</menus>"#,
    );
    write(
        dir.path(),
        "userdata.json",
        r#"{ "menus": {
  "movies.customwidget": { "items": [ { "name": "w1", "label": "Widget 1", "is_new": true } ] },
  "movies.customwidget.2": { "items": [ { "name": "w2", "label": "Widget 2", "is_new": true } ] }
} }"#,
    );
    let config = configuration(dir.path());
    let root = Element::parse_str(&build_and_read(&config)).unwrap();

    let first = find_include(&root, "skinshortcuts-movies-customwidget");
    assert_eq!(first.children[0].child("label").unwrap().text(), "Widget 1");
    // user-created items get the default action and icon
    assert_eq!(first.children[0].child("onclick").unwrap().text(), "noop");
    assert_eq!(first.children[0].child("icon").unwrap().text(), "DefaultShortcut.png");

    let second = find_include(&root, "skinshortcuts-movies-customwidget2");
    assert_eq!(second.children[0].child("label").unwrap().text(), "Widget 2");
}

#[test]
fn template_multi_output_with_suffix() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "menus.xml",
        r#"<menus>
  <menu name="main">
    <item name="movies" label="Movies">
      <action>Go()</action>
      <property name="widgetPath">p1</property>
      <property name="widgetPath.2">p2</property>
    </item>
    <item name="nowidget" label="No widget"><action>Go()</action></item>
  </menu>
</menus>"#,
    );
    write(
        dir.path(),
        "templates.xml",
        r#"<templates>
  <template include="widget" idprefix="8011">
    <condition>widgetPath</condition>
    <output include="widget2" idprefix="8021" suffix=".2"/>
    <property name="slotPath" from="widgetPath"/>
    <controls>
      <control type="panel" id="$PROPERTY[id]">
        <path>$PROPERTY[slotPath]</path>
      </control>
    </controls>
  </template>
</templates>"#,
    );
    let config = configuration(dir.path());
    let root = Element::parse_str(&build_and_read(&config)).unwrap();

    let first = find_include(&root, "skinshortcuts-template-widget");
    assert_eq!(first.children.len(), 1, "item without widgetPath must not iterate");
    assert_eq!(first.children[0].attr("id"), Some("80111"));
    assert_eq!(first.children[0].child("path").unwrap().text(), "p1");

    let second = find_include(&root, "skinshortcuts-template-widget2");
    assert_eq!(second.children[0].attr("id"), Some("80211"));
    assert_eq!(second.children[0].child("path").unwrap().text(), "p2");
}

#[test]
fn template_only_emits_variables_but_no_include() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "menus.xml",
        r#"<menus>
  <menu name="main">
    <item name="movies" label="Movies"><action>Go()</action></item>
  </menu>
</menus>"#,
    );
    write(
        dir.path(),
        "templates.xml",
        r#"<templates>
  <template include="labels" idprefix="90" templateonly="true">
    <variable name="labelvar" output="skinshortcuts-label-$PROPERTY[name]">
      <value>$PROPERTY[label]</value>
    </variable>
    <controls><item>never emitted</item></controls>
  </template>
</templates>"#,
    );
    let config = configuration(dir.path());
    let raw = build_and_read(&config);
    eprintln!("RAWXML:\n{}", raw);
    let root = Element::parse_str(&raw).unwrap();

    assert!(root
        .children_named("include")
        .all(|e| e.attr("name") != Some("skinshortcuts-template-labels")));
    let variable = root
        .children_named("variable")
        .find(|v| v.attr("name") == Some("skinshortcuts-label-movies"))
        .expect("variable must still be emitted");
    assert_eq!(variable.child("value").unwrap().text(), "Movies");
    // variables come before includes at the document root
    let first_include = root.children.iter().position(|c| c.tag == "include").unwrap();
    let last_variable = root.children.iter().rposition(|c| c.tag == "variable").unwrap();
    assert!(last_variable < first_include);
}

#[test]
fn template_auto_requires_a_reference() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "menus.xml",
        r#"<menus>
  <menu name="main">
    <item name="movies" label="Movies">
      <action>Go()</action>
      <property name="widgetInclude">$INCLUDE[skinshortcuts-template-referenced]</property>
    </item>
  </menu>
</menus>"#,
    );
    write(
        dir.path(),
        "templates.xml",
        r#"<templates>
  <template include="referenced" idprefix="70" templateonly="auto">
    <controls><item>here</item></controls>
  </template>
  <template include="unreferenced" idprefix="71" templateonly="auto">
    <controls><item>gone</item></controls>
  </template>
</templates>"#,
    );
    let config = configuration(dir.path());
    let root = Element::parse_str(&build_and_read(&config)).unwrap();
    assert!(root
        .children_named("include")
        .any(|e| e.attr("name") == Some("skinshortcuts-template-referenced")));
    assert!(root
        .children_named("include")
        .all(|e| e.attr("name") != Some("skinshortcuts-template-unreferenced")));
}

#[test]
fn directives_visibility_and_include_splice() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "menus.xml",
        r#"<menus>
  <menu name="main" container="9000">
    <item name="movies" label="Movies"><action>Go()</action></item>
  </menu>
</menus>"#,
    );
    write(
        dir.path(),
        "templates.xml",
        r#"<templates>
  <includes>
    <include name="overlay"><image>paused.png</image></include>
  </includes>
  <template include="deco" idprefix="70">
    <controls>
      <control type="group">
        <skinshortcuts>visibility</skinshortcuts>
        <skinshortcuts include="overlay"/>
        <skinshortcuts include="overlay" wrap="true" condition="neverset"/>
      </control>
    </controls>
  </template>
</templates>"#,
    );
    let config = configuration(dir.path());
    let root = Element::parse_str(&build_and_read(&config)).unwrap();
    let deco = find_include(&root, "skinshortcuts-template-deco");
    let group = &deco.children[0];
    assert_eq!(
        group.child("visible").unwrap().text(),
        "String.IsEqual(Container(9000).ListItem.Property(name),movies)"
    );
    // unwrapped include splices its children directly
    assert_eq!(group.child("image").unwrap().text(), "paused.png");
    // the conditional wrapped one was removed
    assert!(group.child("include").is_none());
}

#[test]
fn math_if_and_view_expressions_flow_through() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "menus.xml",
        r#"<menus>
  <menu name="main">
    <item name="movies" label="Movies">
      <action>Go()</action>
      <property name="widgetType">music</property>
    </item>
  </menu>
</menus>"#,
    );
    write(
        dir.path(),
        "templates.xml",
        r#"<templates>
  <template include="calc" idprefix="80">
    <controls>
      <control id="$MATH[index * 100 + 50]">
        <target>$IF[widgetType IN movies,tvshows THEN videos ELSE music]</target>
      </control>
    </controls>
  </template>
</templates>"#,
    );
    write(
        dir.path(),
        "views.xml",
        r#"<views prefix="SkinViews_">
  <view id="50" label="List"/>
  <content name="movies">
    <visible>Container.Content(movies)</visible>
    <views>50</views>
    <default library="50"/>
  </content>
</views>"#,
    );
    let config = configuration(dir.path());
    let root = Element::parse_str(&build_and_read(&config)).unwrap();

    let calc = find_include(&root, "skinshortcuts-template-calc");
    assert_eq!(calc.children[0].attr("id"), Some("150"));
    assert_eq!(calc.children[0].child("target").unwrap().text(), "music");

    let expression = root
        .children_named("expression")
        .find(|e| e.attr("name") == Some("SkinViews_50"))
        .expect("view expression missing");
    assert_eq!(expression.text(), "Container.Content(movies)");
    // expressions precede everything else
    assert_eq!(root.children[0].tag, "expression");
}

#[test]
fn hash_gate_short_circuits_until_inputs_change() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "menus.xml",
        r#"<menus><menu name="main"><item name="a" label="A"/></menu></menus>"#,
    );
    let config = configuration(dir.path());
    build_and_read(&config);
    let first_mtime = std::fs::metadata(&config.output_paths[0]).unwrap().modified().unwrap();

    // unchanged inputs: the output file is left alone
    assert!(build(&config).unwrap());
    let second_mtime = std::fs::metadata(&config.output_paths[0]).unwrap().modified().unwrap();
    assert_eq!(first_mtime, second_mtime);

    // touching an input reruns the pipeline
    write(
        dir.path(),
        "menus.xml",
        r#"<menus><menu name="main"><item name="b" label="B"/></menu></menus>"#,
    );
    let output = build_and_read(&config);
    assert!(output.contains("<label>B</label>"));
}

#[test]
fn loader_errors_are_fatal_and_name_the_file() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "menus.xml", "<menus><menu></menus>");
    let config = configuration(dir.path());
    let error = build(&config).unwrap_err();
    assert!(error.to_string().contains("menus.xml"));
    // the output was never written
    assert!(!config.output_paths[0].exists());
}

#[test]
fn widget_selection_expands_and_fallbacks_fill() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "menus.xml",
        r#"<menus>
  <menu name="main">
    <item name="movies" label="Movies" widget="recentmovies"><action>Go()</action></item>
  </menu>
</menus>"#,
    );
    write(
        dir.path(),
        "widgets.xml",
        r#"<widgets>
  <widget name="recentmovies" label="Recent movies" type="movies"
          path="videodb://recentlyaddedmovies/"/>
</widgets>"#,
    );
    write(
        dir.path(),
        "properties.xml",
        r#"<properties>
  <property name="widget" type="widget"/>
  <fallbacks>
    <fallback property="widgetTarget" value="videos" condition="widgetType=movies"/>
    <fallback property="widgetTarget" value="music"/>
  </fallbacks>
</properties>"#,
    );
    write(
        dir.path(),
        "templates.xml",
        r#"<templates>
  <template include="widget" idprefix="80">
    <condition>widgetPath</condition>
    <controls>
      <content target="$PROPERTY[widgetTarget]">$PROPERTY[widgetPath]</content>
    </controls>
  </template>
</templates>"#,
    );
    let config = configuration(dir.path());
    let root = Element::parse_str(&build_and_read(&config)).unwrap();

    // the widget record expanded into item properties visible in the output
    let main = find_include(&root, "skinshortcuts-main");
    let path_property = main.children[0]
        .children_named("property")
        .find(|p| p.attr("name") == Some("widgetPath"))
        .unwrap();
    assert_eq!(path_property.text(), "videodb://recentlyaddedmovies/");

    // the template context saw the expansion and the schema fallback
    let widget = find_include(&root, "skinshortcuts-template-widget");
    let content = &widget.children[0];
    assert_eq!(content.text(), "videodb://recentlyaddedmovies/");
    assert_eq!(content.attr("target"), Some("videos"));
}

#[test]
fn preset_rows_select_by_condition() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "menus.xml",
        r#"<menus>
  <menu name="main">
    <item name="tall" label="Tall"><property name="widgetArt">Poster</property></item>
    <item name="wide" label="Wide"><property name="widgetArt">Landscape</property></item>
  </menu>
</menus>"#,
    );
    write(
        dir.path(),
        "templates.xml",
        r#"<templates>
  <presets>
    <preset name="dimensions">
      <values condition="widgetArt=Poster" top="70"/>
      <values top="471"/>
    </preset>
  </presets>
  <template include="panel" idprefix="81">
    <preset name="dimensions"/>
    <controls><control><top>$PROPERTY[top]</top></control></controls>
  </template>
</templates>"#,
    );
    let config = configuration(dir.path());
    let root = Element::parse_str(&build_and_read(&config)).unwrap();
    let panel = find_include(&root, "skinshortcuts-template-panel");
    let tops: Vec<_> =
        panel.children.iter().map(|c| c.child("top").unwrap().text()).collect();
    assert_eq!(tops, ["70", "471"]);
}

#[test]
fn submenu_templates_iterate_parent_submenu_pairs() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "menus.xml",
        r#"<menus>
  <menu name="main">
    <item name="movies" label="Movies" submenu="movies-sub"><action>Go()</action></item>
  </menu>
  <submenu name="movies-sub">
    <item name="recent" label="Recent"/>
    <item name="genres" label="Genres"/>
  </submenu>
</menus>"#,
    );
    write(
        dir.path(),
        "templates.xml",
        r#"<templates>
  <submenu include="submenuList">
    <controls><item>$PROPERTY[parent]/$PROPERTY[name]</item></controls>
  </submenu>
</templates>"#,
    );
    let config = configuration(dir.path());
    let root = Element::parse_str(&build_and_read(&config)).unwrap();
    let list = find_include(&root, "skinshortcuts-template-submenuList");
    let texts: Vec<_> = list.children.iter().map(|c| c.text()).collect();
    assert_eq!(texts, ["movies/recent", "movies/genres"]);
}

#[test]
fn disabled_items_are_skipped() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "menus.xml",
        r#"<menus>
  <menu name="main">
    <item name="a" label="A"/>
    <item name="b" label="B" disabled="true"/>
    <item name="c" label="C"/>
  </menu>
</menus>"#,
    );
    let config = configuration(dir.path());
    let root = Element::parse_str(&build_and_read(&config)).unwrap();
    let main = find_include(&root, "skinshortcuts-main");
    let labels: Vec<_> =
        main.children.iter().map(|item| item.child("label").unwrap().text()).collect();
    assert_eq!(labels, ["A", "C"]);
    // positions renumber over the enabled items only
    assert_eq!(main.children[1].attr("id"), Some("2"));
}
