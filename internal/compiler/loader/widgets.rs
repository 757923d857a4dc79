// Copyright © SixtyFPS GmbH <info@slint.dev>
// SPDX-License-Identifier: GPL-3.0-only OR LicenseRef-Slint-Royalty-free-2.0 OR LicenseRef-Slint-Software-3.0

//! Loader for `widgets.xml`: flat widget records plus picker groupings.

use std::path::Path;

use super::{opt_attr, parse_groupings, read_root, required_attr};
use crate::diagnostics::{ConfigFile, Error};
use crate::object_tree::{Widget, WidgetConfig};

const FILE: ConfigFile = ConfigFile::Widget;

pub fn load(path: &Path) -> Result<WidgetConfig, Error> {
    let Some(root) = read_root(path, FILE)? else {
        return Ok(WidgetConfig::default());
    };
    let mut config = WidgetConfig::default();
    for element in root.children_named("widget") {
        let name = required_attr(element, "name", FILE, path)?;
        config.widgets.push(Widget {
            name: name.into(),
            label: element.attr("label").unwrap_or(name).to_string(),
            kind: opt_attr(element, "type"),
            path: opt_attr(element, "path"),
            target: opt_attr(element, "target"),
        });
    }
    config.groupings = parse_groupings(&root);
    Ok(config)
}
