//! On-disk layout.
//!
//! Everything lives under a single root directory:
//!
//! ```text
//! <root>/sessions/<token>   one settings file per session
//! <root>/sshhostkeys        host key trust store
//! <root>/randomseed         entropy seed
//! ```
//!
//! The root is resolved once at startup: explicit path > `TERMKEEP_HOME` >
//! `~/.termkeep`.

use std::fs::{self, DirBuilder, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

use crate::codec;
use crate::{Error, Result};

/// Environment variable overriding the root directory.
pub const TERMKEEP_HOME_ENV: &str = "TERMKEEP_HOME";

/// Directory name used below the home directory.
pub const DEFAULT_DIR_NAME: &str = ".termkeep";

pub const SESSIONS_DIR: &str = "sessions";
pub const HOST_KEYS_FILE: &str = "sshhostkeys";
pub const RANDOM_SEED_FILE: &str = "randomseed";

/// Permission mode for directories we create (owner only).
#[cfg(unix)]
pub const DIR_MODE: u32 = 0o700;

/// Permission mode for the trust store and seed file (owner read/write).
#[cfg(unix)]
pub const FILE_MODE: u32 = 0o600;

/// Resolved file locations for one root directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreLayout {
    root: PathBuf,
}

impl StoreLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Resolve the root from an explicit path, the environment, or the home
    /// directory, in that order.
    pub fn resolve(explicit: Option<PathBuf>) -> Result<Self> {
        if let Some(root) = explicit {
            return Ok(Self::new(root));
        }
        if let Ok(root) = std::env::var(TERMKEEP_HOME_ENV) {
            if !root.is_empty() {
                return Ok(Self::new(root));
            }
        }
        let home = dirs::home_dir().ok_or(Error::NoHomeDirectory)?;
        Ok(Self::new(home.join(DEFAULT_DIR_NAME)))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn sessions_dir(&self) -> PathBuf {
        self.root.join(SESSIONS_DIR)
    }

    /// Settings file for a session; `None` means the default session.
    pub fn session_file(&self, session: Option<&str>) -> PathBuf {
        self.sessions_dir().join(codec::encode(session))
    }

    pub fn host_keys_file(&self) -> PathBuf {
        self.root.join(HOST_KEYS_FILE)
    }

    pub fn random_seed_file(&self) -> PathBuf {
        self.root.join(RANDOM_SEED_FILE)
    }
}

/// Create a single directory with owner-only permissions.
///
/// An already existing directory is not an error. The parent must exist.
pub fn ensure_dir(path: &Path) -> io::Result<()> {
    let mut builder = DirBuilder::new();
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(DIR_MODE);
    }
    match builder.create(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => Ok(()),
        Err(e) => Err(e),
    }
}

/// Open options for private files: owner read/write on unix.
pub fn private_file_options() -> OpenOptions {
    let mut options = OpenOptions::new();
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(FILE_MODE);
    }
    options
}

/// Tighten permissions on a file we created through `tempfile`.
pub fn set_private_permissions(path: &Path) -> io::Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(FILE_MODE))?;
    }
    #[cfg(not(unix))]
    {
        let _ = path;
    }
    Ok(())
}
