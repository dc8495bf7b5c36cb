//! Command implementations for the Termkeep CLI.
//!
//! Each command returns a result struct that can be printed as JSON (the
//! default) or as human-readable text:
//! - `session_*` - settings files
//! - `hostkey_*` - host key trust store
//! - `seed_*` - random seed file

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::Serialize;

use crate::codec;
use crate::config::{ResourceOverlay, ValueSource};
use crate::hostkeys::{HostKeyRecord, HostKeyStore, Verdict};
use crate::seed::SeedFile;
use crate::settings::SettingsStore;
use crate::{Error, Result};

/// Command results that can be serialized to JSON or formatted for humans.
pub trait Output {
    /// Serialize to JSON string.
    fn to_json(&self) -> String;

    /// Format for human-readable output.
    fn to_human(&self) -> String;
}

fn json<T: Serialize>(value: &T) -> String {
    serde_json::to_string(value)
        .unwrap_or_else(|e| format!(r#"{{"error": "serialization failed: {}"}}"#, e))
}

/// Session name as typed on the command line.
fn display_session(session: Option<&str>) -> String {
    session.unwrap_or(codec::DEFAULT_SESSION).to_string()
}

fn reject_newlines(field: &str, value: &str) -> Result<()> {
    if value.contains(['\n', '\r']) {
        return Err(Error::InvalidInput(format!("{} must not contain a line break", field)));
    }
    Ok(())
}

// === Session Commands ===

#[derive(Serialize)]
pub struct SessionList {
    pub sessions: Vec<String>,
    pub count: usize,
}

impl Output for SessionList {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        if self.sessions.is_empty() {
            return "No saved sessions.".to_string();
        }
        let mut lines = vec![format!("{} saved session(s):", self.count)];
        lines.extend(self.sessions.iter().map(|s| format!("  {}", s)));
        lines.join("\n")
    }
}

/// List saved sessions, sorted by name.
pub fn session_list(store: &SettingsStore) -> Result<SessionList> {
    let mut sessions: Vec<String> = store.sessions()?.collect();
    sessions.sort();
    Ok(SessionList {
        count: sessions.len(),
        sessions,
    })
}

#[derive(Serialize)]
pub struct SessionShow {
    pub session: String,
    pub exists: bool,
    pub settings: Vec<SettingEntry>,
}

#[derive(Serialize)]
pub struct SettingEntry {
    pub key: String,
    pub value: String,
}

impl Output for SessionShow {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        if !self.exists {
            return format!("No such session: {}", self.session);
        }
        let mut lines = vec![format!("Session: {}", self.session)];
        lines.extend(
            self.settings
                .iter()
                .map(|entry| format!("  {} = {}", entry.key, entry.value)),
        );
        lines.join("\n")
    }
}

/// Show every setting stored in a session file, in file order.
pub fn session_show(store: &SettingsStore, session: Option<&str>) -> Result<SessionShow> {
    let snapshot = store.load(session)?;
    let settings = snapshot
        .as_ref()
        .map(|snap| {
            snap.iter()
                .map(|(key, value)| SettingEntry {
                    key: String::from_utf8_lossy(key).into_owned(),
                    value: String::from_utf8_lossy(value).into_owned(),
                })
                .collect()
        })
        .unwrap_or_default();
    Ok(SessionShow {
        session: display_session(session),
        exists: snapshot.is_some(),
        settings,
    })
}

#[derive(Serialize)]
pub struct SettingValue {
    pub session: String,
    pub key: String,
    pub value: Option<String>,
    pub source: Option<ValueSource>,
}

impl Output for SettingValue {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        match (&self.value, &self.source) {
            (Some(value), Some(source)) => format!("{} = {} (from {})", self.key, value, source),
            _ => format!("{} is not set", self.key),
        }
    }
}

/// Look up one setting through the session file and the overlay.
pub fn session_get(
    store: &SettingsStore,
    overlay: &ResourceOverlay,
    session: Option<&str>,
    key: &str,
) -> Result<SettingValue> {
    let reader = store.open_read(session, overlay)?;
    let resolved = reader.resolve(key);
    Ok(SettingValue {
        session: display_session(session),
        key: key.to_string(),
        source: resolved.as_ref().map(|r| r.source),
        value: resolved.map(|r| r.value),
    })
}

#[derive(Serialize)]
pub struct SessionSet {
    pub session: String,
    pub updated: Vec<String>,
    pub path: String,
}

impl Output for SessionSet {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        format!(
            "Updated {} in session {} ({})",
            self.updated.join(", "),
            self.session,
            self.path
        )
    }
}

/// Parse a `key=value` assignment; the key ends at the first `=`.
pub fn parse_assignment(assignment: &str) -> Result<(String, String)> {
    let (key, value) = assignment.split_once('=').ok_or_else(|| {
        Error::InvalidInput(format!("expected key=value, got: {}", assignment))
    })?;
    if key.is_empty() {
        return Err(Error::InvalidInput("setting key must not be empty".to_string()));
    }
    reject_newlines("setting", assignment)?;
    Ok((key.to_string(), value.to_string()))
}

/// Update settings in a session, keeping every other stored setting.
///
/// Existing keys keep their position in the file; new keys are appended in
/// the order given.
pub fn session_set(
    store: &SettingsStore,
    session: Option<&str>,
    assignments: &[String],
) -> Result<SessionSet> {
    let mut updates: Vec<(String, String)> = Vec::new();
    for assignment in assignments {
        let (key, value) = parse_assignment(assignment)?;
        match updates.iter_mut().find(|(k, _)| *k == key) {
            Some(existing) => existing.1 = value,
            None => updates.push((key, value)),
        }
    }

    let existing = store.load(session)?.unwrap_or_default();
    let mut writer = store.open_write(session)?;
    for (key, value) in existing.iter() {
        let value = updates
            .iter()
            .find(|(k, _)| k.as_bytes() == key)
            .map_or(value, |(_, v)| v.as_bytes());
        writer.write_bytes(key, value)?;
    }
    for (key, value) in &updates {
        if existing.get_bytes(key.as_bytes()).is_none() {
            writer.write_str(key, value)?;
        }
    }
    let path = writer.target().display().to_string();
    writer.close()?;

    Ok(SessionSet {
        session: display_session(session),
        updated: updates.into_iter().map(|(k, _)| k).collect(),
        path,
    })
}

#[derive(Serialize)]
pub struct SessionDeleted {
    pub session: String,
    pub deleted: bool,
}

impl Output for SessionDeleted {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        if self.deleted {
            format!("Deleted session {}", self.session)
        } else {
            format!("No such session: {}", self.session)
        }
    }
}

/// Delete a session; reports whether a file was there to delete.
pub fn session_delete(store: &SettingsStore, session: Option<&str>) -> Result<SessionDeleted> {
    let existed = store.session_path(session).exists();
    store.delete(session)?;
    Ok(SessionDeleted {
        session: display_session(session),
        deleted: existed,
    })
}

#[derive(Serialize)]
pub struct Encoded {
    pub session: String,
    pub token: String,
}

impl Output for Encoded {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        format!("{} <-> {}", self.session, self.token)
    }
}

pub fn session_encode(session: Option<&str>) -> Encoded {
    Encoded {
        session: display_session(session),
        token: codec::encode(session),
    }
}

pub fn session_decode(token: &str) -> Encoded {
    Encoded {
        session: codec::decode_lossy(token),
        token: token.to_string(),
    }
}

// === Host Key Commands ===

#[derive(Serialize)]
pub struct HostKeyCheck {
    pub hostname: String,
    pub port: u16,
    pub keytype: String,
    pub verdict: Verdict,
}

impl Output for HostKeyCheck {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        match self.verdict {
            Verdict::Match => format!(
                "{} key for {}:{} matches the stored key",
                self.keytype, self.hostname, self.port
            ),
            Verdict::NoRecord => format!(
                "No {} key stored for {}:{}",
                self.keytype, self.hostname, self.port
            ),
            Verdict::Mismatch => format!(
                "WARNING: {} key for {}:{} does NOT match the stored key.\n\
                 The server's host key has changed, or someone is intercepting the connection.",
                self.keytype, self.hostname, self.port
            ),
        }
    }
}

fn check_host_key_input(hostname: &str, keytype: &str, key: &str) -> Result<()> {
    reject_newlines("hostname", hostname)?;
    reject_newlines("key type", keytype)?;
    reject_newlines("key", key)?;
    if hostname.contains(' ') {
        return Err(Error::InvalidInput("hostname must not contain spaces".to_string()));
    }
    if keytype.contains('@') {
        return Err(Error::InvalidInput("key type must not contain '@'".to_string()));
    }
    Ok(())
}

pub fn hostkey_verify(
    store: &HostKeyStore,
    hostname: &str,
    port: u16,
    keytype: &str,
    key: &str,
) -> Result<HostKeyCheck> {
    let verdict = store.verify(hostname, port, keytype, key)?;
    Ok(HostKeyCheck {
        hostname: hostname.to_string(),
        port,
        keytype: keytype.to_string(),
        verdict,
    })
}

#[derive(Serialize)]
pub struct HostKeySaved {
    pub hostname: String,
    pub port: u16,
    pub keytype: String,
    pub replaced: bool,
}

impl Output for HostKeySaved {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        let action = if self.replaced { "Replaced" } else { "Stored" };
        format!(
            "{} {} key for {}:{}",
            action, self.keytype, self.hostname, self.port
        )
    }
}

/// Record a host key. With `replace`, earlier records for the same host are
/// removed; otherwise the record is appended and earlier ones still win.
pub fn hostkey_save(
    store: &HostKeyStore,
    hostname: &str,
    port: u16,
    keytype: &str,
    key: &str,
    replace: bool,
) -> Result<HostKeySaved> {
    check_host_key_input(hostname, keytype, key)?;
    if replace {
        store.replace(hostname, port, keytype, key)?;
    } else {
        store.store(hostname, port, keytype, key)?;
    }
    Ok(HostKeySaved {
        hostname: hostname.to_string(),
        port,
        keytype: keytype.to_string(),
        replaced: replace,
    })
}

#[derive(Serialize)]
pub struct HostKeyList {
    pub records: Vec<HostKeyRecord>,
    pub count: usize,
}

impl Output for HostKeyList {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        if self.records.is_empty() {
            return "No stored host keys.".to_string();
        }
        let mut lines = vec![format!("{} stored host key(s):", self.count)];
        lines.extend(self.records.iter().map(|r| {
            format!("  {}@{}:{} {}", r.keytype, r.port, r.hostname, r.key)
        }));
        lines.join("\n")
    }
}

pub fn hostkey_list(store: &HostKeyStore) -> Result<HostKeyList> {
    let records = store.records()?;
    Ok(HostKeyList {
        count: records.len(),
        records,
    })
}

// === Seed Commands ===

#[derive(Serialize)]
pub struct SeedShow {
    pub path: String,
    pub length: usize,
    pub base64: String,
}

impl Output for SeedShow {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        if self.length == 0 {
            return format!("No seed stored at {}", self.path);
        }
        format!("{} bytes at {}\n{}", self.length, self.path, self.base64)
    }
}

pub fn seed_show(seed: &SeedFile) -> SeedShow {
    let mut data = Vec::new();
    let length = seed.read(|chunk| data.extend_from_slice(chunk));
    SeedShow {
        path: seed.path().display().to_string(),
        length,
        base64: BASE64.encode(&data),
    }
}

#[derive(Serialize)]
pub struct SeedWritten {
    pub requested: usize,
    pub written: usize,
}

impl Output for SeedWritten {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        if self.written == self.requested {
            format!("Wrote {} seed bytes", self.written)
        } else {
            format!(
                "Wrote {} of {} seed bytes",
                self.written, self.requested
            )
        }
    }
}

/// Write base64-encoded seed data. A short or failed write is reported in
/// the result, not as an error.
pub fn seed_write(seed: &SeedFile, encoded: &str) -> Result<SeedWritten> {
    let data = BASE64
        .decode(encoded.trim())
        .map_err(|e| Error::InvalidInput(format!("seed is not valid base64: {}", e)))?;
    let written = seed.write(&data);
    Ok(SeedWritten {
        requested: data.len(),
        written,
    })
}
