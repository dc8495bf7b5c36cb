//! Random seed persistence.
//!
//! The seed file is an opaque blob read once at startup and written back at
//! shutdown. Failures here never reach the caller: a missing or unwritable
//! seed only means less carried-over entropy.
//!
//! The file is not truncated before writing. If writing fails half way
//! through, the old data is left behind rather than an empty file, and a
//! seed shorter than the previous one leaves the old tail in place.

use std::fs::File;
use std::io::{ErrorKind, Read, Write};
use std::path::{Path, PathBuf};

use crate::paths::{StoreLayout, ensure_dir, private_file_options};

/// Size of the chunks handed to the read consumer.
pub const SEED_CHUNK: usize = 512;

/// Seed file at `<root>/randomseed`.
#[derive(Debug, Clone)]
pub struct SeedFile {
    path: PathBuf,
    root: PathBuf,
}

impl SeedFile {
    pub fn new(layout: &StoreLayout) -> Self {
        Self {
            path: layout.random_seed_file(),
            root: layout.root().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Feed the stored seed to `consumer` in chunks of at most
    /// [`SEED_CHUNK`] bytes. Returns the number of bytes delivered.
    pub fn read(&self, mut consumer: impl FnMut(&[u8])) -> usize {
        let mut file = match File::open(&self.path) {
            Ok(file) => file,
            Err(e) => {
                if e.kind() != ErrorKind::NotFound {
                    tracing::debug!(path = %self.path.display(), "cannot open seed: {e}");
                }
                return 0;
            }
        };
        let mut buf = [0u8; SEED_CHUNK];
        let mut total = 0;
        loop {
            match file.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => {
                    consumer(&buf[..n]);
                    total += n;
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => {
                    tracing::debug!(path = %self.path.display(), "seed read stopped: {e}");
                    break;
                }
            }
        }
        total
    }

    /// Write `data` over the start of the seed file. Returns the number of
    /// bytes written, which is short if the file couldn't be opened or a
    /// write stopped early.
    pub fn write(&self, data: &[u8]) -> usize {
        let Some(mut file) = self.open_for_write() else {
            return 0;
        };
        let mut written = 0;
        while written < data.len() {
            match file.write(&data[written..]) {
                Ok(0) => break,
                Ok(n) => written += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => {
                    tracing::debug!(path = %self.path.display(), "seed write stopped: {e}");
                    break;
                }
            }
        }
        if written < data.len() {
            tracing::debug!(written, expected = data.len(), "partial seed write");
        }
        written
    }

    fn open_for_write(&self) -> Option<File> {
        let open = || private_file_options().create(true).write(true).open(&self.path);
        match open() {
            Ok(file) => Some(file),
            Err(_) => {
                if let Err(e) = ensure_dir(&self.root) {
                    tracing::debug!(path = %self.root.display(), "could not create directory: {e}");
                }
                match open() {
                    Ok(file) => Some(file),
                    Err(e) => {
                        tracing::debug!(path = %self.path.display(), "seed not saved: {e}");
                        None
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::TestEnv;

    fn read_all(seed: &SeedFile) -> (Vec<u8>, usize) {
        let mut data = Vec::new();
        let mut calls = 0;
        seed.read(|chunk| {
            data.extend_from_slice(chunk);
            calls += 1;
        });
        (data, calls)
    }

    #[test]
    fn test_missing_seed_never_calls_consumer() {
        let env = TestEnv::new();
        let (data, calls) = read_all(&env.seed());
        assert!(data.is_empty());
        assert_eq!(calls, 0);
    }

    #[test]
    fn test_write_then_read() {
        let env = TestEnv::new();
        let seed = env.seed();
        assert_eq!(seed.write(b"0123456789"), 10);
        let (data, calls) = read_all(&seed);
        assert_eq!(data, b"0123456789");
        assert_eq!(calls, 1);
    }

    #[test]
    fn test_read_in_chunks() {
        let env = TestEnv::new();
        let blob: Vec<u8> = (0..1300u32).map(|i| (i % 251) as u8).collect();
        env.write_raw("randomseed", &blob);

        let mut sizes = Vec::new();
        let mut data = Vec::new();
        let total = env.seed().read(|chunk| {
            sizes.push(chunk.len());
            data.extend_from_slice(chunk);
        });

        assert_eq!(total, 1300);
        assert_eq!(data, blob);
        assert!(sizes.iter().all(|&n| n > 0 && n <= SEED_CHUNK));
        assert_eq!(sizes.iter().sum::<usize>(), 1300);
    }

    #[test]
    fn test_shorter_write_keeps_stale_tail() {
        let env = TestEnv::new();
        let seed = env.seed();
        seed.write(b"ABCDEFGHIJ");
        seed.write(b"wxyz");

        let (data, _) = read_all(&seed);
        assert_eq!(data.len(), 10);
        assert_eq!(&data[..4], b"wxyz");
        assert_eq!(&data[4..], b"EFGHIJ");
    }

    #[test]
    fn test_longer_write_extends() {
        let env = TestEnv::new();
        let seed = env.seed();
        seed.write(b"abc");
        seed.write(b"0123456");
        assert_eq!(env.read_raw("randomseed"), b"0123456");
    }

    #[test]
    fn test_write_creates_root() {
        let env = TestEnv::new();
        assert!(!env.root().exists());
        assert_eq!(env.seed().write(b"seed"), 4);
        assert_eq!(env.read_raw("randomseed"), b"seed");
    }

    #[test]
    fn test_unwritable_seed_is_silent() {
        let env = TestEnv::new();
        std::fs::write(env.root(), b"blocking file").unwrap();
        assert_eq!(env.seed().write(b"seed"), 0);
    }

    #[test]
    fn test_empty_write() {
        let env = TestEnv::new();
        let seed = env.seed();
        assert_eq!(seed.write(b""), 0);
        assert!(seed.path().is_file());
        assert_eq!(read_all(&seed).1, 0);
    }

    #[cfg(unix)]
    #[test]
    fn test_seed_file_mode() {
        use std::os::unix::fs::PermissionsExt;

        let env = TestEnv::new();
        let seed = env.seed();
        seed.write(b"seed");
        let mode = std::fs::metadata(seed.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, crate::paths::FILE_MODE);
    }
}
