// Copyright © SixtyFPS GmbH <info@slint.dev>
// SPDX-License-Identifier: GPL-3.0-only OR LicenseRef-Slint-Royalty-free-2.0 OR LicenseRef-Slint-Software-3.0

//! Loader for `backgrounds.xml`: flat background records plus groupings.

use std::path::Path;

use super::{opt_attr, parse_groupings, read_root, required_attr};
use crate::diagnostics::{ConfigError, ConfigFile, Error};
use crate::object_tree::{Background, BackgroundConfig, BackgroundKind};

const FILE: ConfigFile = ConfigFile::Background;

pub fn load(path: &Path) -> Result<BackgroundConfig, Error> {
    let Some(root) = read_root(path, FILE)? else {
        return Ok(BackgroundConfig::default());
    };
    let mut config = BackgroundConfig::default();
    for element in root.children_named("background") {
        let name = required_attr(element, "name", FILE, path)?;
        let kind = match element.attr("type") {
            None => BackgroundKind::default(),
            Some(raw) => raw.parse().map_err(|_| {
                ConfigError::new(
                    FILE,
                    path,
                    format!("background '{name}' has unknown type '{raw}'"),
                )
                .with_line(element.line)
            })?,
        };
        config.backgrounds.push(Background {
            name: name.into(),
            label: element.attr("label").unwrap_or(name).to_string(),
            kind,
            path: opt_attr(element, "path"),
        });
    }
    config.groupings = parse_groupings(&root);
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_background_kinds() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("backgrounds.xml");
        std::fs::write(
            &path,
            r#"<backgrounds>
  <background name="fanart" label="Fanart" type="property" path="ListItem.Art(fanart)"/>
  <background name="slideshow" type="live-playlist" path="special://profile/playlist.xsp"/>
  <background name="plain"/>
</backgrounds>"#,
        )
        .unwrap();

        let config = load(&path).unwrap();
        assert_eq!(config.background("fanart").unwrap().kind, BackgroundKind::Property);
        assert_eq!(config.background("slideshow").unwrap().kind, BackgroundKind::LivePlaylist);
        assert_eq!(config.background("plain").unwrap().kind, BackgroundKind::Static);
    }

    #[test]
    fn unknown_kind_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("backgrounds.xml");
        std::fs::write(&path, r#"<backgrounds><background name="x" type="spinning"/></backgrounds>"#)
            .unwrap();
        let err = load(&path).unwrap_err();
        assert!(err.to_string().contains("unknown type 'spinning'"));
    }
}
