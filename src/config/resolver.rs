//! Precedence resolution for session settings.
//!
//! ## Setting Precedence (highest to lowest)
//!
//! 1. Session file (`<root>/sessions/<token>`)
//! 2. Resource strings (`--resource`, `--resource-file`)
//! 3. Platform defaults ([`DefaultResolver`])
//! 4. Caller-supplied default (e.g. `read_int(key, 80)`)

use std::collections::HashMap;

use serde::Serialize;

use crate::config::ResourceOverlay;
use crate::settings::SettingsSnapshot;

/// Prefix of the environment variables read by [`EnvDefaults`].
pub const DEFAULT_ENV_PREFIX: &str = "TERMKEEP_DEFAULT_";

/// Platform-supplied default values, consulted last.
pub trait DefaultResolver {
    fn resolve_default(&self, key: &str) -> Option<String>;
}

/// Resolver that never has a value.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoDefaults;

impl DefaultResolver for NoDefaults {
    fn resolve_default(&self, _key: &str) -> Option<String> {
        None
    }
}

impl<F> DefaultResolver for F
where
    F: Fn(&str) -> Option<String>,
{
    fn resolve_default(&self, key: &str) -> Option<String> {
        self(key)
    }
}

impl DefaultResolver for HashMap<String, String> {
    fn resolve_default(&self, key: &str) -> Option<String> {
        self.get(key).cloned()
    }
}

/// Reads defaults from `TERMKEEP_DEFAULT_<KEY>` environment variables.
///
/// The key is upper-cased and every non-alphanumeric byte becomes `_`, so
/// `TerminalType` is looked up as `TERMKEEP_DEFAULT_TERMINALTYPE`.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvDefaults;

impl EnvDefaults {
    pub fn var_name(key: &str) -> String {
        let mut name = String::from(DEFAULT_ENV_PREFIX);
        name.extend(key.chars().map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_uppercase()
            } else {
                '_'
            }
        }));
        name
    }
}

impl DefaultResolver for EnvDefaults {
    fn resolve_default(&self, key: &str) -> Option<String> {
        std::env::var(Self::var_name(key)).ok()
    }
}

/// Tracks where a resolved value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueSource {
    /// Value from the session file
    Session,
    /// Value from a resource string
    Resource,
    /// Value from the platform default resolver
    Default,
}

impl std::fmt::Display for ValueSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValueSource::Session => write!(f, "session"),
            ValueSource::Resource => write!(f, "resource"),
            ValueSource::Default => write!(f, "default"),
        }
    }
}

/// A resolved value with its source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Resolved<T> {
    /// The resolved value
    pub value: T,
    /// Where the value came from
    pub source: ValueSource,
}

impl<T> Resolved<T> {
    pub fn new(value: T, source: ValueSource) -> Self {
        Self { value, source }
    }
}

/// Resolve one setting through the full precedence chain.
///
/// `snapshot` is `None` when the session has no file; the lookup then starts
/// at the resource layer.
pub fn resolve_setting(
    snapshot: Option<&SettingsSnapshot>,
    overlay: &ResourceOverlay,
    key: &str,
) -> Option<Resolved<String>> {
    if let Some(value) = snapshot.and_then(|s| s.get(key)) {
        return Some(Resolved::new(value.into_owned(), ValueSource::Session));
    }
    overlay.resolve(key)
}
