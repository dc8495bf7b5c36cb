//! In-memory resource overrides.

use std::collections::HashMap;
use std::path::Path;

use crate::config::resolver::{DefaultResolver, Resolved, ValueSource};
use crate::{Error, Result};

/// Split a resource string into `(key, value)`.
///
/// The key runs from just after the last `.` or `*` before the first colon
/// up to that colon; the value is everything after the colon with leading
/// whitespace removed. Returns `None` if there is no colon.
pub fn parse_resource(resource: &str) -> Option<(&str, &str)> {
    let colon = resource.find(':')?;
    let head = &resource[..colon];
    let key_start = head.rfind(['.', '*']).map_or(0, |i| i + 1);
    let key = &head[key_start..];
    let value = trim_ascii_start(&resource[colon + 1..]);
    Some((key, value))
}

/// Strip leading C-locale whitespace (space, `\t`, `\n`, `\v`, `\f`, `\r`).
fn trim_ascii_start(s: &str) -> &str {
    s.trim_start_matches(|c: char| c.is_ascii_whitespace() || c == '\x0b')
}

/// Resource-string overrides layered over a platform default resolver.
///
/// Built once at startup and passed explicitly to settings readers.
pub struct ResourceOverlay {
    overrides: HashMap<String, String>,
    defaults: Box<dyn DefaultResolver>,
}

impl ResourceOverlay {
    pub fn new(defaults: impl DefaultResolver + 'static) -> Self {
        Self {
            overrides: HashMap::new(),
            defaults: Box::new(defaults),
        }
    }

    /// Register one resource string. A later string for the same key
    /// replaces the earlier value.
    pub fn provide(&mut self, resource: &str) -> Result<()> {
        let (key, value) = parse_resource(resource)
            .ok_or_else(|| Error::MalformedResource(resource.to_string()))?;
        tracing::debug!(key, value, "resource override");
        self.overrides.insert(key.to_string(), value.to_string());
        Ok(())
    }

    /// Register every resource string in a file.
    ///
    /// Blank lines and lines starting with `!` or `#` are skipped. Lines
    /// without a colon are logged and skipped; the remaining lines are
    /// still applied. Returns the number of strings applied.
    pub fn provide_file(&mut self, path: &Path) -> Result<usize> {
        let contents = std::fs::read_to_string(path)?;
        let mut applied = 0;
        for line in contents.lines() {
            let trimmed = trim_ascii_start(line);
            if trimmed.is_empty() || trimmed.starts_with('!') || trimmed.starts_with('#') {
                continue;
            }
            match self.provide(trimmed) {
                Ok(()) => applied += 1,
                Err(e) => tracing::warn!(path = %path.display(), "{e}"),
            }
        }
        Ok(applied)
    }

    /// Exact-match override lookup, then the platform default.
    pub fn get(&self, key: &str) -> Option<String> {
        self.resolve(key).map(|resolved| resolved.value)
    }

    /// Like [`get`](Self::get) but reports which layer answered.
    pub fn resolve(&self, key: &str) -> Option<Resolved<String>> {
        if let Some(value) = self.overrides.get(key) {
            return Some(Resolved::new(value.clone(), ValueSource::Resource));
        }
        self.defaults
            .resolve_default(key)
            .map(|value| Resolved::new(value, ValueSource::Default))
    }

    /// Number of registered overrides.
    pub fn len(&self) -> usize {
        self.overrides.len()
    }

    pub fn is_empty(&self) -> bool {
        self.overrides.is_empty()
    }
}

impl std::fmt::Debug for ResourceOverlay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceOverlay")
            .field("overrides", &self.overrides)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::NoDefaults;
    use tempfile::TempDir;

    #[test]
    fn test_parse_resource_dotted() {
        assert_eq!(
            parse_resource("pterm.Font: fixed"),
            Some(("Font", "fixed"))
        );
    }

    #[test]
    fn test_parse_resource_wildcard() {
        assert_eq!(
            parse_resource("*TerminalType:\t xterm"),
            Some(("TerminalType", "xterm"))
        );
        assert_eq!(
            parse_resource("app.sub*ScrollbackLines: 2000"),
            Some(("ScrollbackLines", "2000"))
        );
    }

    #[test]
    fn test_parse_resource_bare_key() {
        assert_eq!(parse_resource("Font:fixed"), Some(("Font", "fixed")));
    }

    #[test]
    fn test_parse_resource_value_keeps_later_colons() {
        assert_eq!(
            parse_resource("x.ProxyHost: proxy:8080"),
            Some(("ProxyHost", "proxy:8080"))
        );
    }

    #[test]
    fn test_parse_resource_empty_value() {
        assert_eq!(parse_resource("x.Empty:"), Some(("Empty", "")));
    }

    #[test]
    fn test_parse_resource_strips_only_ascii_whitespace() {
        assert_eq!(
            parse_resource("x.K:\u{A0}v"),
            Some(("K", "\u{A0}v"))
        );
        assert_eq!(parse_resource("x.K:\x0b\x0c v"), Some(("K", "v")));
    }

    #[test]
    fn test_parse_resource_no_colon() {
        assert_eq!(parse_resource("pterm.Font fixed"), None);
    }

    #[test]
    fn test_provide_rejects_missing_colon() {
        let mut overlay = ResourceOverlay::new(NoDefaults);
        let err = overlay.provide("no colon here").unwrap_err();
        assert!(matches!(err, Error::MalformedResource(_)));
        assert!(overlay.is_empty());
    }

    #[test]
    fn test_last_registration_wins() {
        let mut overlay = ResourceOverlay::new(NoDefaults);
        overlay.provide("a.Font: first").unwrap();
        overlay.provide("b*Font: second").unwrap();
        assert_eq!(overlay.get("Font").as_deref(), Some("second"));
        assert_eq!(overlay.len(), 1);
    }

    #[test]
    fn test_lookup_is_case_sensitive() {
        let mut overlay = ResourceOverlay::new(NoDefaults);
        overlay.provide("x.Font: fixed").unwrap();
        assert_eq!(overlay.get("font"), None);
    }

    #[test]
    fn test_falls_through_to_defaults() {
        let mut overlay = ResourceOverlay::new(|key: &str| {
            (key == "Colour0").then(|| "187,187,187".to_string())
        });
        overlay.provide("x.Font: fixed").unwrap();

        let font = overlay.resolve("Font").unwrap();
        assert_eq!(font.value, "fixed");
        assert_eq!(font.source, ValueSource::Resource);

        let colour = overlay.resolve("Colour0").unwrap();
        assert_eq!(colour.value, "187,187,187");
        assert_eq!(colour.source, ValueSource::Default);

        assert!(overlay.resolve("Missing").is_none());
    }

    #[test]
    fn test_override_shadows_default() {
        let mut overlay =
            ResourceOverlay::new(|_: &str| Some("from-default".to_string()));
        overlay.provide("x.Key: from-resource").unwrap();
        assert_eq!(overlay.get("Key").as_deref(), Some("from-resource"));
    }

    #[test]
    fn test_provide_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("resources");
        std::fs::write(
            &path,
            "! comment\n# also a comment\n\ntk.Font: fixed\nbroken line\ntk*Font: bold\ntk.Rows: 40\n",
        )
        .unwrap();

        let mut overlay = ResourceOverlay::new(NoDefaults);
        let applied = overlay.provide_file(&path).unwrap();

        assert_eq!(applied, 3);
        assert_eq!(overlay.get("Font").as_deref(), Some("bold"));
        assert_eq!(overlay.get("Rows").as_deref(), Some("40"));
    }

    #[test]
    fn test_provide_file_ignores_leading_indent() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("resources");
        std::fs::write(&path, "  Font: x\n\tRows: 24\n").unwrap();

        let mut overlay = ResourceOverlay::new(NoDefaults);
        assert_eq!(overlay.provide_file(&path).unwrap(), 2);
        assert_eq!(overlay.get("Font").as_deref(), Some("x"));
        assert_eq!(overlay.get("Rows").as_deref(), Some("24"));
        assert_eq!(overlay.get("  Font"), None);
    }

    #[test]
    fn test_provide_file_missing() {
        let temp = TempDir::new().unwrap();
        let mut overlay = ResourceOverlay::new(NoDefaults);
        assert!(matches!(
            overlay.provide_file(&temp.path().join("nope")),
            Err(Error::Io(_))
        ));
    }
}
