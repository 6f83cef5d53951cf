//! CLI argument definitions using clap

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueHint};

use crate::domain::ChangePolicy;

/// Release lineage trees: per-platform version forests and net change-sets between releases
#[derive(Parser, Debug)]
#[command(name = "reltree")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Turn debugging information on (-d info, -dd debug, -ddd trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub debug: u8,

    /// Release catalog file (overrides config and RELTREE_CATALOG)
    #[arg(long, global = true, value_hint = ValueHint::FilePath)]
    pub catalog: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Change-items introduced after <start> up to and including <end>
    Diff {
        /// Newer release
        end: String,
        /// Older release
        start: String,
        /// Treatment of change-items found only on the start path
        #[arg(long, value_parser = parse_policy)]
        policy: Option<ChangePolicy>,
        /// Emit a JSON array
        #[arg(long)]
        json: bool,
    },

    /// Lowest common ancestor of two releases
    Lca {
        platform: String,
        a: String,
        b: String,
    },

    /// Ancestors of a release, from the release up to the root
    #[command(disable_version_flag = true)]
    Path { platform: String, version: String },

    /// Show the lineage tree of a platform
    Tree { platform: String },

    /// Snapshot of a platform tree with per-node change-items
    Dump {
        platform: String,
        /// Emit JSON
        #[arg(long)]
        json: bool,
    },

    /// List platforms with releases
    Platforms,

    /// List the releases of a platform
    Versions { platform: String },

    /// Distinct change domains and impacts of a platform
    Filters {
        platform: String,
        /// Emit JSON
        #[arg(long)]
        json: bool,
    },

    /// Add or replace a release
    #[command(disable_version_flag = true)]
    Submit {
        /// Release version (unique across platforms)
        #[arg(long)]
        version: String,
        #[arg(long)]
        platform: String,
        /// Parent release; omit for the platform root
        #[arg(long = "from", default_value = "")]
        from_ver: String,
        /// Release date (YYYY-MM-DD)
        #[arg(long)]
        date: Option<chrono::NaiveDate>,
        /// Submitter name
        #[arg(long = "by", default_value = "")]
        submitted_by: String,
        /// JSON array of change details: [{"id", "title", "domain", "impact", "relnotes"}]
        #[arg(long, value_hint = ValueHint::FilePath)]
        changes_file: Option<PathBuf>,
        /// Change-item ids introduced by this release
        changes: Vec<String>,
    },

    /// Delete a release and rebuild its platform tree
    #[command(disable_version_flag = true)]
    Delete { version: String },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Generate shell completions
    Completion {
        /// Shell type
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show merged config
    Show,

    /// Create config template
    Init {
        /// Create global config
        #[arg(short, long)]
        global: bool,
    },

    /// Show config paths
    Path,
}

fn parse_policy(s: &str) -> Result<ChangePolicy, String> {
    s.parse()
}
