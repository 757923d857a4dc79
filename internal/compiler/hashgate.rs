// Copyright © SixtyFPS GmbH <info@slint.dev>
// SPDX-License-Identifier: GPL-3.0-only OR LicenseRef-Slint-Royalty-free-2.0 OR LicenseRef-Slint-Software-3.0

//! The rebuild gate.
//!
//! Every input file is fingerprinted with a content digest, the build
//! metadata is recorded verbatim, and the whole map is compared against
//! the one persisted by the previous successful build. Only a difference
//! (or a missing output) makes the pipeline run.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use sha2::{Digest, Sha256};

use crate::diagnostics::Error;
use crate::fileio;

/// Sentinel digest for inputs that do not exist.
pub const MISSING: &str = "missing";

pub struct HashGate {
    pub inputs: Vec<PathBuf>,
    pub metadata: IndexMap<String, String>,
    pub outputs: Vec<PathBuf>,
    pub hash_path: PathBuf,
}

impl HashGate {
    /// Digest every input file and append the metadata entries.
    pub fn generate_fingerprints(&self) -> IndexMap<String, String> {
        let mut fingerprints = IndexMap::new();
        for path in &self.inputs {
            fingerprints.insert(path.display().to_string(), fingerprint(path));
        }
        for (key, value) in &self.metadata {
            fingerprints.insert(key.clone(), value.clone());
        }
        fingerprints
    }

    /// True when any output is missing, no fingerprint map was persisted,
    /// or any fingerprint changed since then.
    pub fn needs_rebuild(&self) -> bool {
        if self.outputs.iter().any(|output| !output.exists()) {
            return true;
        }
        match self.load_stored() {
            None => true,
            Some(stored) => stored != self.generate_fingerprints(),
        }
    }

    /// An unreadable or malformed hash file counts as absent.
    fn load_stored(&self) -> Option<IndexMap<String, String>> {
        let text = std::fs::read_to_string(&self.hash_path).ok()?;
        serde_json::from_str(&text).ok()
    }

    /// Persist the current fingerprint map; called after a successful
    /// build only, so a failed build re-runs next time.
    pub fn persist(&self) -> Result<(), Error> {
        let fingerprints = self.generate_fingerprints();
        let text = serde_json::to_string_pretty(&fingerprints)
            .map_err(|e| Error::io(&self.hash_path, std::io::Error::other(e)))?;
        fileio::write_atomic(&self.hash_path, text.as_bytes())
    }
}

fn fingerprint(path: &Path) -> String {
    match std::fs::read(path) {
        Ok(bytes) => {
            let digest = Sha256::digest(&bytes);
            let mut hex = String::with_capacity(digest.len() * 2);
            for byte in digest {
                let _ = write!(hex, "{byte:02x}");
            }
            hex
        }
        Err(_) => MISSING.to_string(),
    }
}
