//! modlayer - mod catalog and installer
#![allow(missing_docs)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::missing_panics_doc)]
//!
//! Keeps a BepInEx plugin directory in step with a curated list of mod
//! repositories.
//!
//! # Directory Layout
//!
//! ```text
//! <game>/
//! ├── BepInEx/
//! │   ├── plugins/            # enabled mods
//! │   └── disabled-plugins/   # disabled mods
//! └── .modlayer/
//!     ├── config.toml
//!     └── catalog.json
//! ```

pub mod cmd;
pub mod lookup;
pub mod ui;

pub use modlayer_core::paths::*;

use clap::{Parser, Subcommand};

/// Version reported by `--version`, derived from git tags at build time.
pub const VERSION: &str = env!("MODLAYER_VERSION");

#[derive(Debug, Parser)]
#[command(name = "modlayer")]
#[command(author, version = VERSION, about = "modlayer - mod catalog and installer")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Refresh the catalog, or a single mod, from the remote source
    Fetch {
        /// Mod to refresh (the whole catalog if omitted)
        #[arg(value_name = "MOD")]
        name: Option<String>,
        /// Fetch even if the last fetch is recent
        #[arg(long, short = 'f')]
        force: bool,
    },
    /// List mods, or the releases of one mod
    List {
        /// Mod whose releases to list
        #[arg(value_name = "MOD")]
        name: Option<String>,
        /// Page to show
        #[arg(long, short = 'p', default_value_t = 1)]
        page: usize,
    },
    /// Show details of a mod
    Info {
        /// Mod name or repository
        #[arg(value_name = "MOD")]
        name: String,
    },
    /// Install a mod, optionally at a given release
    Install {
        /// Mod name or repository
        #[arg(value_name = "MOD")]
        name: String,
        /// Release tag or title (latest on the mod's channel if omitted)
        version: Option<String>,
    },
    /// Delete an installed mod
    Uninstall {
        /// Mod name or repository
        #[arg(value_name = "MOD")]
        name: String,
        /// Confirm deleting a local mod, which cannot be reinstalled
        #[arg(long, short = 'y')]
        yes: bool,
    },
    /// Move a mod into the active plugin directory
    Enable {
        /// Mod name or repository
        #[arg(value_name = "MOD")]
        name: String,
    },
    /// Move a mod out of the active plugin directory
    Disable {
        /// Mod name or repository
        #[arg(value_name = "MOD")]
        name: String,
    },
    /// Update one mod, or every mod with a newer release
    Update {
        /// Mod to update (all outdated mods if omitted)
        #[arg(value_name = "MOD")]
        name: Option<String>,
    },
    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        shell: clap_complete::Shell,
    },
}
