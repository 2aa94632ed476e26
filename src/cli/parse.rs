//! CLI parse: clap types for macroenv. No behavior; definitions only.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Macroenv CLI - inspect and edit a macro environment
#[derive(Parser, Debug)]
#[command(name = "macroenv")]
#[command(about = "Hierarchical environment store for macros and doors")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Workspace root directory
    #[arg(long, default_value = ".")]
    pub workspace: PathBuf,

    /// Configuration file path (overrides default config loading)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Environment file (overrides storage.env_file)
    #[arg(long)]
    pub env_file: Option<PathBuf>,

    /// Routing tag for change events (overrides notify.tag)
    #[arg(long)]
    pub tag: Option<String>,

    /// Enable verbose logging (default: off)
    #[arg(long, default_value = "false")]
    pub verbose: bool,

    /// Disable logging entirely
    #[arg(long, short, default_value = "false")]
    pub quiet: bool,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Log format (json, text)
    #[arg(long)]
    pub log_format: Option<String>,

    /// Log output (stdout, stderr, file)
    #[arg(long)]
    pub log_output: Option<String>,

    /// Log file path (if output is "file")
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Resolve one property through the precedence chain
    Get {
        /// Property name
        name: String,
        /// Macro scope
        #[arg(long = "macro")]
        macro_name: Option<String>,
        /// Door scope
        #[arg(long)]
        door: Option<String>,
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Report whether a property resolves in a scope
    Has {
        name: String,
        #[arg(long = "macro")]
        macro_name: Option<String>,
        #[arg(long)]
        door: Option<String>,
    },
    /// Show the composite environment of a scope (flat contents when unscoped)
    List {
        #[arg(long = "macro")]
        macro_name: Option<String>,
        #[arg(long)]
        door: Option<String>,
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Store one value (parsed as a literal when possible)
    Set { key: String, value: String },
    /// Store several values and notify once
    SetBatch {
        /// Alternating KEY VALUE tokens
        #[arg(required = true, num_args = 1..)]
        pairs: Vec<String>,
    },
    /// Remove keys; stops at the first key that is not stored
    Unset {
        #[arg(required = true, num_args = 1..)]
        keys: Vec<String>,
    },
    /// Environment of a macro running on a door
    Lookup {
        #[arg(long)]
        door: String,
        #[arg(long = "macro")]
        macro_name: String,
        /// Restrict to these property names
        keys: Vec<String>,
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Exact stored value of a scoped key (`m.x`, `door.x` or `door.m.x`)
    Property { key: String },
    /// Verify the in-memory index against the environment file
    Check,
    /// Print the effective configuration as TOML
    Config,
}
