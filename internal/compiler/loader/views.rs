// Copyright © SixtyFPS GmbH <info@slint.dev>
// SPDX-License-Identifier: GPL-3.0-only OR LicenseRef-Slint-Royalty-free-2.0 OR LicenseRef-Slint-Software-3.0

//! Loader for `views.xml`: the expression name prefix, the available
//! views and the per-content selection rules.

use std::path::Path;

use smol_str::SmolStr;

use super::{read_root, required_attr};
use crate::diagnostics::{ConfigFile, Error};
use crate::object_tree::{ContentRule, View, ViewConfig};

const FILE: ConfigFile = ConfigFile::View;

pub fn load(path: &Path) -> Result<ViewConfig, Error> {
    let Some(root) = read_root(path, FILE)? else {
        return Ok(ViewConfig::default());
    };
    let mut config =
        ViewConfig { prefix: root.attr("prefix").unwrap_or_default().to_string(), ..Default::default() };
    for child in &root.children {
        match child.tag.as_str() {
            "view" => config.views.push(View {
                id: required_attr(child, "id", FILE, path)?.into(),
                label: child.attr("label").unwrap_or_default().to_string(),
            }),
            "content" => {
                let name = required_attr(child, "name", FILE, path)?;
                let mut rule = ContentRule { name: name.into(), ..Default::default() };
                if let Some(visible) = child.child("visible") {
                    rule.visible = visible.text().trim().to_string();
                }
                if let Some(views) = child.child("views") {
                    rule.views = views
                        .text()
                        .split(',')
                        .map(str::trim)
                        .filter(|v| !v.is_empty())
                        .map(SmolStr::new)
                        .collect();
                }
                if let Some(default) = child.child("default") {
                    rule.library_default = default.attr("library").map(SmolStr::new);
                    rule.plugin_default = default.attr("plugin").map(SmolStr::new);
                }
                config.rules.push(rule);
            }
            _ => {}
        }
    }
    Ok(config)
}
