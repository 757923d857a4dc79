// Copyright © SixtyFPS GmbH <info@slint.dev>
// SPDX-License-Identifier: GPL-3.0-only OR LicenseRef-Slint-Royalty-free-2.0 OR LicenseRef-Slint-Software-3.0

#![doc = include_str!("README.md")]
// It would be nice to keep the compiler free of unsafe code
#![deny(unsafe_code)]

use std::path::PathBuf;

use indexmap::IndexMap;

pub mod condition;
pub mod context;
pub mod diagnostics;
pub mod expression;
pub mod fileio;
pub mod generator;
pub mod hashgate;
pub mod loader;
pub mod object_tree;
pub mod suffix;
pub mod template;
pub mod userdata;
pub mod viewexpr;
pub mod xmltree;

pub use diagnostics::{ConfigError, ConfigFile, Error};
pub use userdata::UserData;

/// The configuration files read from the shortcuts directory.
const CONFIG_FILES: [&str; 6] = [
    "menus.xml",
    "widgets.xml",
    "backgrounds.xml",
    "properties.xml",
    "templates.xml",
    "views.xml",
];

/// CompilerConfiguration allows configuring different aspects of the compiler.
#[derive(Clone, Debug)]
pub struct CompilerConfiguration {
    /// Directory holding the declarative configuration files.
    pub shortcuts_dir: PathBuf,
    /// The user-customization overlay document.
    pub userdata_path: PathBuf,
    /// Where the fingerprint map of the last successful build lives.
    pub hash_path: PathBuf,
    /// Every path the generated document is written to.
    pub output_paths: Vec<PathBuf>,
    /// Version of the compiler, part of the rebuild fingerprint.
    pub script_version: String,
    /// Skin directory name, part of the rebuild fingerprint.
    pub skin_dir: String,
    /// Host application version, part of the rebuild fingerprint.
    pub host_version: String,
    /// Run the pipeline even when the hash gate says nothing changed.
    pub force: bool,
}

impl CompilerConfiguration {
    pub fn new(shortcuts_dir: impl Into<PathBuf>, output_path: impl Into<PathBuf>) -> Self {
        let shortcuts_dir = shortcuts_dir.into();
        CompilerConfiguration {
            userdata_path: shortcuts_dir.join("userdata.json"),
            hash_path: shortcuts_dir.join("skinshortcuts.hash"),
            shortcuts_dir,
            output_paths: vec![output_path.into()],
            script_version: env!("CARGO_PKG_VERSION").to_string(),
            skin_dir: String::new(),
            host_version: String::new(),
            force: false,
        }
    }

    fn hash_gate(&self) -> hashgate::HashGate {
        let mut inputs: Vec<PathBuf> =
            CONFIG_FILES.iter().map(|name| self.shortcuts_dir.join(name)).collect();
        inputs.push(self.userdata_path.clone());
        let metadata: IndexMap<String, String> = [
            ("script_version".to_string(), self.script_version.clone()),
            ("skin_dir".to_string(), self.skin_dir.clone()),
            ("host_version".to_string(), self.host_version.clone()),
        ]
        .into_iter()
        .collect();
        hashgate::HashGate {
            inputs,
            metadata,
            outputs: self.output_paths.clone(),
            hash_path: self.hash_path.clone(),
        }
    }
}

/// Run the whole pipeline: gate, load, merge, assemble, write.
///
/// Returns `Ok(true)` both after a build and when the gate decided
/// nothing needed to be done.
pub fn build(config: &CompilerConfiguration) -> Result<bool, Error> {
    let gate = config.hash_gate();
    if !config.force && !gate.needs_rebuild() {
        log::debug!("configuration unchanged, skipping build");
        return Ok(true);
    }

    let dir = &config.shortcuts_dir;
    let menu_config = loader::menus::load(&dir.join("menus.xml"))?;
    let widget_config = loader::widgets::load(&dir.join("widgets.xml"))?;
    let background_config = loader::backgrounds::load(&dir.join("backgrounds.xml"))?;
    let property_schema = loader::properties::load(&dir.join("properties.xml"))?;
    let template_schema = loader::templates::load(&dir.join("templates.xml"))?;
    let view_config = loader::views::load(&dir.join("views.xml"))?;

    let userdata = UserData::load(&config.userdata_path);
    let mut menus = userdata::merge_menus(&menu_config, &userdata);
    userdata::resolve_property_selections(
        &mut menus,
        &property_schema,
        &widget_config,
        &background_config,
    );

    let generator = generator::IncludeGenerator {
        menus: &menus,
        property_schema: &property_schema,
        template_schema: Some(&template_schema),
        view_config: &view_config,
        userdata: &userdata,
    };
    let document = generator.build_document()?;
    generator::write_document(&document, &config.output_paths)?;

    if let Err(e) = gate.persist() {
        // the next invocation just rebuilds
        log::warn!("could not persist fingerprints: {e}");
    }
    log::debug!("build finished, {} output(s) written", config.output_paths.len());
    Ok(true)
}

/// Drop the whole user customization and rebuild.
pub fn reset_all(config: &CompilerConfiguration) -> Result<bool, Error> {
    match std::fs::remove_file(&config.userdata_path) {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => return Err(Error::io(&config.userdata_path, e)),
    }
    rebuild(config)
}

/// Drop the menu customizations, keep the view selections, rebuild.
pub fn reset_menus(config: &CompilerConfiguration) -> Result<bool, Error> {
    let mut userdata = UserData::load(&config.userdata_path);
    userdata.menus.clear();
    userdata.save(&config.userdata_path)?;
    rebuild(config)
}

/// Drop the view selections, keep the menu customizations, rebuild.
pub fn reset_views(config: &CompilerConfiguration) -> Result<bool, Error> {
    let mut userdata = UserData::load(&config.userdata_path);
    userdata.views.clear();
    userdata.save(&config.userdata_path)?;
    rebuild(config)
}

/// Remove the custom-widget menus a user attached to `item_name` and
/// rebuild.
pub fn clear_custom_widget(config: &CompilerConfiguration, item_name: &str) -> Result<bool, Error> {
    let mut userdata = UserData::load(&config.userdata_path);
    let prefix = format!("{item_name}.customwidget");
    userdata.menus.retain(|name, _| name != &prefix && !name.starts_with(&format!("{prefix}.")));
    userdata.save(&config.userdata_path)?;
    rebuild(config)
}

fn rebuild(config: &CompilerConfiguration) -> Result<bool, Error> {
    let forced = CompilerConfiguration { force: true, ..config.clone() };
    build(&forced)
}
