//! Common test utilities for termkeep integration tests.
//!
//! Provides `TestEnv` for isolated test environments that don't touch the
//! user's `~/.termkeep/` directory.

#![allow(dead_code)]

use assert_cmd::Command;
pub use tempfile::TempDir;

/// A test environment with an isolated store root.
///
/// The `tk()` method returns a `Command` that sets `TERMKEEP_HOME`
/// per-invocation, making tests parallel-safe.
pub struct TestEnv {
    pub data_dir: TempDir,
}

impl TestEnv {
    /// Create a new test environment with an isolated directory.
    pub fn new() -> Self {
        Self {
            data_dir: TempDir::new().unwrap(),
        }
    }

    /// Get a Command for the termkeep binary with an isolated root.
    pub fn tk(&self) -> Command {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_termkeep"));
        cmd.current_dir(self.data_dir.path());
        cmd.env("TERMKEEP_HOME", self.root());
        cmd.env_remove("TERMKEEP_LOG");
        cmd
    }

    /// Root directory the binary stores into (not created up front).
    pub fn root(&self) -> std::path::PathBuf {
        self.data_dir.path().join("store")
    }

    /// Parse a command's stdout as JSON.
    pub fn json(&self, args: &[&str]) -> serde_json::Value {
        let output = self.tk().args(args).output().unwrap();
        serde_json::from_slice(&output.stdout).unwrap_or_else(|e| {
            panic!(
                "invalid JSON from {:?}: {}\nstdout: {}\nstderr: {}",
                args,
                e,
                String::from_utf8_lossy(&output.stdout),
                String::from_utf8_lossy(&output.stderr)
            )
        })
    }

    pub fn write_file(&self, relative: &str, contents: &[u8]) {
        let path = self.root().join(relative);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, contents).unwrap();
    }

    pub fn read_file(&self, relative: &str) -> Vec<u8> {
        std::fs::read(self.root().join(relative)).unwrap()
    }
}

impl Default for TestEnv {
    fn default() -> Self {
        Self::new()
    }
}
