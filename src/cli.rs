use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::hooks::HookEvent;
use crate::sentinel::DEFAULT_SENTINEL_DIR;

/// zinstall - Text-mode installer for Linux on mainframe hosts
#[derive(Parser, Debug)]
#[command(name = "zinstall")]
#[command(about = "Installs or upgrades a Linux system and configures it for first boot")]
#[command(version)]
pub struct Cli {
    /// Directory for the install-failed/-info/-progress/-success markers
    #[arg(long, global = true, default_value = DEFAULT_SENTINEL_DIR)]
    pub sentinel_dir: PathBuf,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run an installation (interactive unless an answer file is given)
    Install {
        /// Answer file to use (skips the wizard)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Save the wizard answers to this file before installing
        #[arg(long, conflicts_with = "config")]
        save_config: Option<PathBuf>,

        /// Target root for an interactive run
        #[arg(long, default_value = "/mnt/sysimage")]
        mount_dir: String,
    },
    /// Upgrade an installed system
    Upgrade {
        /// Answer file describing the installed system
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Fire a single lifecycle event (pre_install, prepare_install, post_install, post_upgrade)
    Hook {
        event: HookEvent,

        /// Answer file used to seed the context
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Validate an answer file
    Validate {
        /// Path to the answer file
        config: PathBuf,
    },
    /// Parse a size string (e.g. 512, 0.5G, 20GiB) and print it in MiB
    Size {
        value: String,
    },
    /// Check a mountpoint against the ones already in use
    Mountpoint {
        mountpoint: String,

        /// Mountpoints already assigned, comma separated
        #[arg(long, value_delimiter = ',')]
        used: Vec<String>,
    },
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
