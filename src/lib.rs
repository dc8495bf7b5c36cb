//! Termkeep - persistent settings and trust state for remote terminal clients.
//!
//! This library provides the storage layer behind the `termkeep` CLI:
//! per-session settings files, the host key trust store, and the random
//! seed file, all kept under a single root directory.

pub mod cli;
pub mod codec;
pub mod commands;
pub mod config;
pub mod hostkeys;
pub mod paths;
pub mod seed;
pub mod settings;


/// Library-level error type for Termkeep operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Could not determine home directory; set TERMKEEP_HOME or pass --root")]
    NoHomeDirectory,

    #[error("Expected a colon in resource string \"{0}\"")]
    MalformedResource(String),

    #[error("Cannot write host key store {path}: {source}")]
    TrustStoreWrite {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Result type alias for Termkeep operations.
pub type Result<T> = std::result::Result<T, Error>;
