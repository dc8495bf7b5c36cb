//! Host key trust store.
//!
//! Lines in the host keys file are of the form
//!
//! ```text
//! type@port:hostname keydata
//! ```
//!
//! e.g.
//!
//! ```text
//! rsa@22:foovax.example.org 0x23,0x293487364395345345....2343
//! ```
//!
//! The file is append-only under [`HostKeyStore::store`]. Verification
//! takes the first record for an identity as authoritative, so a record
//! appended later for the same identity never changes the verdict. Use
//! [`HostKeyStore::replace`] to deliberately supersede an old key.

use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::paths::{StoreLayout, ensure_dir, private_file_options, set_private_permissions};
use crate::{Error, Result};

/// Outcome of checking a host key against the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    /// The first record for this identity has the same key.
    Match,
    /// No record exists for this identity.
    NoRecord,
    /// The first record for this identity has a different key.
    Mismatch,
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Verdict::Match => write!(f, "match"),
            Verdict::NoRecord => write!(f, "no record"),
            Verdict::Mismatch => write!(f, "mismatch"),
        }
    }
}

/// One parsed line of the trust store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HostKeyRecord {
    pub keytype: String,
    pub port: u16,
    pub hostname: String,
    pub key: String,
}

impl HostKeyRecord {
    /// Parse a line (without its newline). Returns `None` for malformed lines.
    pub fn parse(line: &str) -> Option<Self> {
        let (keytype, rest) = line.split_once('@')?;
        let (port, rest) = rest.split_once(':')?;
        let (hostname, key) = rest.split_once(' ')?;
        if port.is_empty() || !port.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        Some(Self {
            keytype: keytype.to_string(),
            port: port.parse().ok()?,
            hostname: hostname.to_string(),
            key: key.to_string(),
        })
    }

    /// The record as a file line, including the trailing newline.
    pub fn to_line(&self) -> String {
        format!("{}{}\n", identity_prefix(&self.hostname, self.port, &self.keytype), self.key)
    }
}

/// The exact line prefix identifying a host: `type@port:hostname `.
pub fn identity_prefix(hostname: &str, port: u16, keytype: &str) -> String {
    format!("{}@{}:{} ", keytype, port, hostname)
}

/// Trust store backed by `<root>/sshhostkeys`.
#[derive(Debug, Clone)]
pub struct HostKeyStore {
    path: PathBuf,
    root: PathBuf,
}

impl HostKeyStore {
    pub fn new(layout: &StoreLayout) -> Self {
        Self {
            path: layout.host_keys_file(),
            root: layout.root().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Check `key` against the first record for this host identity.
    ///
    /// A missing store means first contact ([`Verdict::NoRecord`]). Any other
    /// failure to read the store is returned as an error rather than
    /// classified.
    pub fn verify(&self, hostname: &str, port: u16, keytype: &str, key: &str) -> Result<Verdict> {
        let Some(mut reader) = self.open_reader()? else {
            return Ok(Verdict::NoRecord);
        };
        let prefix = identity_prefix(hostname, port, keytype);
        let mut line = Vec::new();
        loop {
            line.clear();
            if reader.read_until(b'\n', &mut line)? == 0 {
                return Ok(Verdict::NoRecord);
            }
            let text = strip_newline(&line);
            if let Some(stored) = text.strip_prefix(prefix.as_bytes()) {
                let verdict = if stored == key.as_bytes() {
                    Verdict::Match
                } else {
                    Verdict::Mismatch
                };
                tracing::debug!(hostname, port, keytype, %verdict, "host key checked");
                return Ok(verdict);
            }
        }
    }

    /// Append a record. Earlier records for the same identity are kept and
    /// still take precedence in [`verify`](Self::verify).
    ///
    /// If the store can't be opened, the root directory is created and the
    /// open retried once; a second failure is [`Error::TrustStoreWrite`].
    pub fn store(&self, hostname: &str, port: u16, keytype: &str, key: &str) -> Result<()> {
        let record = HostKeyRecord {
            keytype: keytype.to_string(),
            port,
            hostname: hostname.to_string(),
            key: key.to_string(),
        };
        let line = record.to_line();
        let mut file = self.open_append()?;
        // One write call per record so concurrent appenders don't interleave.
        file.write_all(line.as_bytes())
            .map_err(|source| self.write_error(source))?;
        tracing::debug!(hostname, port, keytype, "host key stored");
        Ok(())
    }

    /// Store a key, removing every earlier record for the same identity.
    ///
    /// The file is rewritten through a temporary file and renamed into
    /// place, so readers see either the old or the new store.
    pub fn replace(&self, hostname: &str, port: u16, keytype: &str, key: &str) -> Result<()> {
        let prefix = identity_prefix(hostname, port, keytype);
        let mut kept = Vec::new();
        let mut removed = 0usize;
        if let Some(mut reader) = self.open_reader()? {
            let mut line = Vec::new();
            loop {
                line.clear();
                if reader.read_until(b'\n', &mut line)? == 0 {
                    break;
                }
                if strip_newline(&line).starts_with(prefix.as_bytes()) {
                    removed += 1;
                    continue;
                }
                kept.extend_from_slice(&line);
                if !line.ends_with(b"\n") {
                    kept.push(b'\n');
                }
            }
        }
        kept.extend_from_slice(prefix.as_bytes());
        kept.extend_from_slice(key.as_bytes());
        kept.push(b'\n');

        if let Err(e) = ensure_dir(&self.root) {
            tracing::debug!(path = %self.root.display(), "could not create directory: {e}");
        }
        let mut temp = tempfile::NamedTempFile::new_in(&self.root)
            .map_err(|source| self.write_error(source))?;
        temp.write_all(&kept)
            .and_then(|()| temp.as_file().sync_all())
            .and_then(|()| set_private_permissions(temp.path()))
            .map_err(|source| self.write_error(source))?;
        temp.persist(&self.path)
            .map_err(|e| self.write_error(e.error))?;
        tracing::debug!(hostname, port, keytype, removed, "host key replaced");
        Ok(())
    }

    /// All well-formed records in file order.
    pub fn records(&self) -> Result<Vec<HostKeyRecord>> {
        let Some(mut reader) = self.open_reader()? else {
            return Ok(Vec::new());
        };
        let mut records = Vec::new();
        let mut line = Vec::new();
        loop {
            line.clear();
            if reader.read_until(b'\n', &mut line)? == 0 {
                break;
            }
            let text = String::from_utf8_lossy(strip_newline(&line));
            match HostKeyRecord::parse(&text) {
                Some(record) => records.push(record),
                None => tracing::debug!(line = %text, "skipping malformed host key line"),
            }
        }
        Ok(records)
    }

    fn open_reader(&self) -> Result<Option<BufReader<File>>> {
        match File::open(&self.path) {
            Ok(file) => Ok(Some(BufReader::new(file))),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn open_append(&self) -> Result<File> {
        let open = || {
            private_file_options()
                .create(true)
                .append(true)
                .open(&self.path)
        };
        match open() {
            Ok(file) => Ok(file),
            Err(first) => {
                tracing::debug!(path = %self.path.display(), "retrying after: {first}");
                if let Err(e) = ensure_dir(&self.root) {
                    tracing::debug!(path = %self.root.display(), "could not create directory: {e}");
                }
                open().map_err(|source| self.write_error(source))
            }
        }
    }

    fn write_error(&self, source: io::Error) -> Error {
        Error::TrustStoreWrite {
            path: self.path.clone(),
            source,
        }
    }
}

fn strip_newline(line: &[u8]) -> &[u8] {
    line.strip_suffix(b"\n").unwrap_or(line)
}
