//! CLI argument definitions for Termkeep.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

const LONG_VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("TERMKEEP_GIT_COMMIT"),
    ")"
);

/// Termkeep - saved sessions, trusted host keys and the random seed for a
/// remote terminal client.
#[derive(Parser, Debug)]
#[command(name = "termkeep")]
#[command(author, version, long_version = LONG_VERSION, about = "Inspect and edit terminal client session settings, host key trust and seed", long_about = None)]
pub struct Cli {
    /// Output in human-readable format instead of JSON
    #[arg(short = 'H', long = "human", global = true)]
    pub human_readable: bool,

    /// Directory holding sessions/, sshhostkeys and randomseed.
    /// Defaults to ~/.termkeep.
    #[arg(long = "root", global = true, env = "TERMKEEP_HOME")]
    pub root: Option<PathBuf>,

    /// Resource string overriding a setting default, e.g. 'termkeep.Font: fixed'.
    /// May be repeated; later strings win.
    #[arg(short = 'r', long = "resource", global = true)]
    pub resources: Vec<String>,

    /// File of resource strings, one per line. Applied before --resource.
    #[arg(long = "resource-file", global = true)]
    pub resource_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Saved session settings
    Session {
        #[command(subcommand)]
        command: SessionCommands,
    },

    /// Trusted host keys
    Hostkey {
        #[command(subcommand)]
        command: HostkeyCommands,
    },

    /// Random seed file
    Seed {
        #[command(subcommand)]
        command: SeedCommands,
    },
}

/// Session subcommands
#[derive(Subcommand, Debug)]
pub enum SessionCommands {
    /// List saved sessions
    List,

    /// Show every setting stored in a session
    Show {
        /// Session name (omit for "Default Settings")
        name: Option<String>,
    },

    /// Look up one setting (session file, then resources, then defaults)
    Get {
        /// Session name
        name: String,

        /// Setting key (case-sensitive)
        key: String,
    },

    /// Set one or more settings, keeping the rest of the session
    Set {
        /// Session name
        name: String,

        /// Assignments of the form key=value
        #[arg(required = true)]
        assignments: Vec<String>,
    },

    /// Delete a saved session
    Delete {
        /// Session name
        name: String,
    },

    /// Show the file name a session is stored under
    Encode {
        /// Session name (omit for "Default Settings")
        name: Option<String>,
    },

    /// Show the session name for a stored file name
    Decode {
        /// Encoded file name
        token: String,
    },
}

/// Host key subcommands
#[derive(Subcommand, Debug)]
pub enum HostkeyCommands {
    /// Check a host key against the trust store.
    ///
    /// Exit status: 0 match, 3 mismatch, 4 no record, 1 error.
    Verify {
        hostname: String,
        port: u16,
        keytype: String,
        key: String,
    },

    /// Append a host key to the trust store.
    ///
    /// An earlier record for the same host still takes precedence; use
    /// `replace` to supersede it.
    Store {
        hostname: String,
        port: u16,
        keytype: String,
        key: String,
    },

    /// Store a host key, removing earlier records for the same host
    Replace {
        hostname: String,
        port: u16,
        keytype: String,
        key: String,
    },

    /// List stored host keys
    List,
}

/// Seed subcommands
#[derive(Subcommand, Debug)]
pub enum SeedCommands {
    /// Show the stored seed as base64
    Show,

    /// Write a base64-encoded seed over the start of the seed file
    Write {
        /// Seed bytes, base64-encoded
        data: String,
    },
}
