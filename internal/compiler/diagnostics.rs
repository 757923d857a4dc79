// Copyright © SixtyFPS GmbH <info@slint.dev>
// SPDX-License-Identifier: GPL-3.0-only OR LicenseRef-Slint-Royalty-free-2.0 OR LicenseRef-Slint-Software-3.0

//! Error taxonomy of the compiler.
//!
//! Loader faults are fatal and carry the offending file plus, when the
//! reader can tell, the 1-based source line. Faults inside the template
//! processor carry only a message, and I/O faults carry the path they
//! tripped over.

use std::path::{Path, PathBuf};

use crate::xmltree::XmlParseError;

/// Which configuration file a [`ConfigError`] belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::Display)]
pub enum ConfigFile {
    #[display("menu")]
    Menu,
    #[display("widget")]
    Widget,
    #[display("background")]
    Background,
    #[display("property")]
    Property,
    #[display("template")]
    Template,
    #[display("view")]
    View,
}

#[derive(Debug)]
pub struct ConfigError {
    pub file: ConfigFile,
    pub path: PathBuf,
    pub line: Option<usize>,
    pub message: String,
}

impl ConfigError {
    pub fn new(file: ConfigFile, path: &Path, message: impl Into<String>) -> Self {
        Self { file, path: path.to_path_buf(), line: None, message: message.into() }
    }

    pub fn with_line(mut self, line: usize) -> Self {
        self.line = Some(line);
        self
    }

    pub fn from_parse(file: ConfigFile, path: &Path, err: XmlParseError) -> Self {
        Self { file, path: path.to_path_buf(), line: err.line, message: err.message }
    }
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.line {
            Some(line) => {
                write!(
                    f,
                    "{} configuration error in {}:{}: {}",
                    self.file,
                    self.path.display(),
                    line,
                    self.message
                )
            }
            None => {
                write!(
                    f,
                    "{} configuration error in {}: {}",
                    self.file,
                    self.path.display(),
                    self.message
                )
            }
        }
    }
}

impl std::error::Error for ConfigError {}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("template processing failed: {0}")]
    Template(String),
    #[error("i/o error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    pub fn io(path: &Path, source: std::io::Error) -> Self {
        Error::Io { path: path.to_path_buf(), source }
    }
}

#[test]
fn config_error_formatting() {
    let err = ConfigError::new(ConfigFile::Menu, Path::new("menus.xml"), "missing attribute 'name'")
        .with_line(12);
    assert_eq!(
        err.to_string(),
        "menu configuration error in menus.xml:12: missing attribute 'name'"
    );
    let err = ConfigError::new(ConfigFile::View, Path::new("views.xml"), "bad view id");
    assert_eq!(err.to_string(), "view configuration error in views.xml: bad view id");
}
