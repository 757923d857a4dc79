// Copyright © SixtyFPS GmbH <info@slint.dev>
// SPDX-License-Identifier: GPL-3.0-only OR LicenseRef-Slint-Royalty-free-2.0 OR LicenseRef-Slint-Software-3.0

use std::path::PathBuf;

use clap::Parser;
use skinshortcuts_compiler::CompilerConfiguration;

#[derive(Parser)]
#[command(author, version, about = "Compile skin shortcut menus into runtime include files")]
struct Cli {
    /// Directory containing menus.xml and the other configuration files
    shortcuts_dir: PathBuf,

    /// Path the generated includes document is written to (repeatable)
    #[arg(short = 'o', long = "output", required = true)]
    outputs: Vec<PathBuf>,

    /// The user customization document
    #[arg(long)]
    userdata: Option<PathBuf>,

    /// Where the rebuild fingerprints are kept
    #[arg(long)]
    hash_file: Option<PathBuf>,

    /// Skin directory name, part of the rebuild fingerprint
    #[arg(long, default_value = "")]
    skin_dir: String,

    /// Host application version, part of the rebuild fingerprint
    #[arg(long, default_value = "")]
    host_version: String,

    /// Build even when no input changed
    #[arg(short, long)]
    force: bool,
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    let mut config = CompilerConfiguration::new(cli.shortcuts_dir, PathBuf::new());
    config.output_paths = cli.outputs;
    if let Some(userdata) = cli.userdata {
        config.userdata_path = userdata;
    }
    if let Some(hash_file) = cli.hash_file {
        config.hash_path = hash_file;
    }
    config.skin_dir = cli.skin_dir;
    config.host_version = cli.host_version;
    config.force = cli.force;

    if let Err(error) = skinshortcuts_compiler::build(&config) {
        log::error!("build failed: {error}");
        eprintln!("error: {error}");
        std::process::exit(1);
    }
}
