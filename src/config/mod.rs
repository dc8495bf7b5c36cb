//! Fallback configuration for session settings.
//!
//! A settings lookup that misses the session file falls through to two
//! further layers, both owned by a [`ResourceOverlay`] that the caller
//! builds once at startup and passes to every reader:
//!
//! ## Resource strings
//!
//! Lines in X resource notation, `path.key: value` or `path*key: value`,
//! supplied on the command line or from a resource file. Only the final
//! component before the colon is used as the key. A later string for the
//! same key replaces the earlier one.
//!
//! ## Platform defaults
//!
//! Anything implementing [`DefaultResolver`]. The CLI uses [`EnvDefaults`],
//! which reads `TERMKEEP_DEFAULT_<KEY>` environment variables.
//!
//! ## Precedence
//!
//! session file > resource strings > platform defaults > caller default
//!
//! Use the [`resolver`] module for source-tracked resolution.

pub mod overlay;
pub mod resolver;

pub use overlay::{ResourceOverlay, parse_resource};
pub use resolver::{
    DEFAULT_ENV_PREFIX, DefaultResolver, EnvDefaults, NoDefaults, Resolved, ValueSource,
    resolve_setting,
};
