//! Per-session settings files.
//!
//! Each session is a flat file of `key=value` lines under
//! `<root>/sessions/<token>`, where the token is the encoded session name
//! (see [`crate::codec`]).
//!
//! Writing replaces the whole file: a [`SettingsWriter`] streams lines into
//! a temporary file next to the target and renames it into place on
//! [`SettingsWriter::close`]. A writer dropped without closing leaves the
//! previous file untouched.
//!
//! Reading parses the file once into an immutable [`SettingsSnapshot`].
//! Lines without `=` are ignored and the first occurrence of a key wins.
//! [`SettingsReader`] layers the snapshot over a [`ResourceOverlay`].

use std::borrow::Cow;
use std::collections::HashMap;
use std::fs::{self, File, ReadDir};
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use crate::codec;
use crate::config::{Resolved, ResourceOverlay, resolve_setting};
use crate::paths::{StoreLayout, ensure_dir};
use crate::{Error, Result};

/// Prefix of in-flight writer files. `%t` never occurs in an encoded token,
/// so these can't collide with a session and are skipped by enumeration.
pub const TEMP_PREFIX: &str = "%tmp";

/// Settings storage rooted at a [`StoreLayout`].
#[derive(Debug, Clone)]
pub struct SettingsStore {
    layout: StoreLayout,
}

impl SettingsStore {
    pub fn new(layout: StoreLayout) -> Self {
        Self { layout }
    }

    pub fn layout(&self) -> &StoreLayout {
        &self.layout
    }

    /// Path of the settings file for `session` (`None` = default session).
    pub fn session_path(&self, session: Option<&str>) -> PathBuf {
        self.layout.session_file(session)
    }

    /// Start writing a session, replacing any previous contents on close.
    ///
    /// Directory creation failures are not reported here; they surface as
    /// the failure to create the temporary file.
    pub fn open_write(&self, session: Option<&str>) -> Result<SettingsWriter> {
        let dir = self.layout.sessions_dir();
        for path in [self.layout.root(), dir.as_path()] {
            if let Err(e) = ensure_dir(path) {
                tracing::debug!(path = %path.display(), "could not create directory: {e}");
            }
        }

        let temp = tempfile::Builder::new()
            .prefix(TEMP_PREFIX)
            .tempfile_in(&dir)?;

        Ok(SettingsWriter {
            target: self.session_path(session),
            out: BufWriter::new(temp),
        })
    }

    /// Load a session's snapshot.
    ///
    /// Returns `Ok(None)` when the session has no file.
    pub fn load(&self, session: Option<&str>) -> Result<Option<SettingsSnapshot>> {
        let path = self.session_path(session);
        let file = match File::open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        SettingsSnapshot::parse(BufReader::new(file)).map(Some)
    }

    /// Open a session for reading with `overlay` as the fallback layer.
    ///
    /// A missing session is not an error: the reader then answers from the
    /// overlay alone and [`SettingsReader::is_session_present`] is false.
    pub fn open_read<'a>(
        &self,
        session: Option<&str>,
        overlay: &'a ResourceOverlay,
    ) -> Result<SettingsReader<'a>> {
        let snapshot = self.load(session)?;
        Ok(SettingsReader::new(snapshot, overlay))
    }

    /// Delete a session. Deleting a session that doesn't exist is a no-op.
    pub fn delete(&self, session: Option<&str>) -> Result<()> {
        match fs::remove_file(self.session_path(session)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Iterate the names of all stored sessions.
    ///
    /// A missing sessions directory yields nothing.
    pub fn sessions(&self) -> Result<SessionIter> {
        let dir = self.layout.sessions_dir();
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => Some(entries),
            Err(e) if e.kind() == io::ErrorKind::NotFound => None,
            Err(e) => return Err(e.into()),
        };
        Ok(SessionIter { entries })
    }
}

/// Open write handle for one session.
pub struct SettingsWriter {
    target: PathBuf,
    out: BufWriter<NamedTempFile>,
}

impl SettingsWriter {
    pub fn write_str(&mut self, key: &str, value: &str) -> Result<()> {
        self.write_bytes(key.as_bytes(), value.as_bytes())
    }

    /// Write a setting whose key or value need not be UTF-8.
    pub fn write_bytes(&mut self, key: &[u8], value: &[u8]) -> Result<()> {
        self.out.write_all(key)?;
        self.out.write_all(b"=")?;
        self.out.write_all(value)?;
        self.out.write_all(b"\n")?;
        Ok(())
    }

    pub fn write_int(&mut self, key: &str, value: i32) -> Result<()> {
        writeln!(self.out, "{}={}", key, value)?;
        Ok(())
    }

    pub fn write_path(&mut self, key: &str, value: &Path) -> Result<()> {
        self.write_str(key, &value.to_string_lossy())
    }

    /// Final path the session will be written to.
    pub fn target(&self) -> &Path {
        &self.target
    }

    /// Flush and move the new contents into place.
    pub fn close(self) -> Result<()> {
        let temp = self.out.into_inner().map_err(|e| Error::Io(e.into_error()))?;
        temp.as_file().sync_all()?;
        temp.persist(&self.target).map_err(|e| Error::Io(e.error))?;
        tracing::debug!(path = %self.target.display(), "session written");
        Ok(())
    }
}

/// Immutable key/value view of one session file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SettingsSnapshot {
    values: HashMap<Vec<u8>, Vec<u8>>,
    order: Vec<Vec<u8>>,
}

impl SettingsSnapshot {
    /// Parse `key=value` lines. Lines without `=` are dropped; the value
    /// stops at the first CR or LF; duplicate keys keep the first value.
    pub fn parse(mut reader: impl BufRead) -> Result<Self> {
        let mut snapshot = Self::default();
        let mut line = Vec::new();
        loop {
            line.clear();
            if reader.read_until(b'\n', &mut line)? == 0 {
                break;
            }
            let Some(eq) = line.iter().position(|&b| b == b'=') else {
                continue;
            };
            let key = &line[..eq];
            let rest = &line[eq + 1..];
            let end = rest
                .iter()
                .position(|&b| b == b'\r' || b == b'\n')
                .unwrap_or(rest.len());
            if snapshot.values.contains_key(key) {
                continue;
            }
            snapshot.order.push(key.to_vec());
            snapshot.values.insert(key.to_vec(), rest[..end].to_vec());
        }
        Ok(snapshot)
    }

    /// Raw value bytes for `key`, compared byte-for-byte.
    pub fn get_bytes(&self, key: &[u8]) -> Option<&[u8]> {
        self.values.get(key).map(Vec::as_slice)
    }

    /// Value for `key`, with invalid UTF-8 replaced for display.
    pub fn get(&self, key: &str) -> Option<Cow<'_, str>> {
        self.get_bytes(key.as_bytes()).map(String::from_utf8_lossy)
    }

    /// Entries in the order their keys first appeared in the file.
    pub fn iter(&self) -> impl Iterator<Item = (&[u8], &[u8])> {
        self.order
            .iter()
            .map(|key| (key.as_slice(), self.values[key].as_slice()))
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

/// Layered settings lookup: session snapshot, then the overlay.
///
/// Dropping the reader releases the snapshot.
#[derive(Debug)]
pub struct SettingsReader<'a> {
    snapshot: Option<SettingsSnapshot>,
    overlay: &'a ResourceOverlay,
}

impl<'a> SettingsReader<'a> {
    pub fn new(snapshot: Option<SettingsSnapshot>, overlay: &'a ResourceOverlay) -> Self {
        Self { snapshot, overlay }
    }

    /// Whether a session file was found when the reader was opened.
    pub fn is_session_present(&self) -> bool {
        self.snapshot.is_some()
    }

    pub fn snapshot(&self) -> Option<&SettingsSnapshot> {
        self.snapshot.as_ref()
    }

    pub fn resolve(&self, key: &str) -> Option<Resolved<String>> {
        resolve_setting(self.snapshot.as_ref(), self.overlay, key)
    }

    pub fn read_str(&self, key: &str) -> Option<String> {
        self.resolve(key).map(|resolved| resolved.value)
    }

    /// Integer setting, `default` only when no layer has the key.
    ///
    /// A present value converts like C `atoi`: anything unparseable is 0.
    pub fn read_int(&self, key: &str, default: i32) -> i32 {
        self.read_str(key).map_or(default, |value| atoi(&value))
    }

    pub fn read_path(&self, key: &str) -> Option<PathBuf> {
        self.read_str(key).map(PathBuf::from)
    }
}

/// Leading-integer conversion: optional whitespace, optional sign, digits.
/// Stops at the first non-digit, saturates at the `i32` bounds.
pub fn atoi(value: &str) -> i32 {
    let bytes = value
        .trim_start_matches(|c: char| c.is_ascii_whitespace() || c == '\x0b')
        .as_bytes();
    let (negative, digits) = match bytes.first() {
        Some(b'-') => (true, &bytes[1..]),
        Some(b'+') => (false, &bytes[1..]),
        _ => (false, bytes),
    };
    let mut acc: i64 = 0;
    for &b in digits.iter().take_while(|b| b.is_ascii_digit()) {
        acc = (acc * 10 + i64::from(b - b'0')).min(i64::from(i32::MAX) + 1);
    }
    let signed = if negative { -acc } else { acc };
    signed.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32
}

/// Iterator over stored session names, decoded from their file names.
///
/// Only regular files (after following symlinks) are reported. The
/// directory handle is released when the iterator is dropped.
pub struct SessionIter {
    entries: Option<ReadDir>,
}

impl Iterator for SessionIter {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        let entries = self.entries.as_mut()?;
        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::debug!("skipping unreadable session entry: {e}");
                    continue;
                }
            };
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if name.starts_with(TEMP_PREFIX) {
                continue;
            }
            match fs::metadata(entry.path()) {
                Ok(meta) if meta.is_file() => return Some(codec::decode_lossy(&name)),
                Ok(_) => continue,
                Err(e) => {
                    tracing::debug!(name = %name, "skipping session entry: {e}");
                    continue;
                }
            }
        }
        None
    }
}
