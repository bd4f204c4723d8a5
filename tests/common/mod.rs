//! Common test utilities for threads integration tests.
//!
//! Provides `TestEnv` for isolated test environments that don't pollute
//! the user's `~/.local/share/threads/` directory.

#![allow(dead_code)]

use assert_cmd::Command;
pub use tempfile::TempDir;

/// A test environment with isolated data storage.
///
/// Each `TestEnv` creates two temporary directories:
/// - `repo_dir`: Acts as the repository root
/// - `data_dir`: Holds threads' data (via `TH_DATA_DIR`) and the system
///   config (via `TH_CONFIG_DIR`)
///
/// The `th()` method sets both variables per invocation, making tests
/// parallel-safe.
pub struct TestEnv {
    pub repo_dir: TempDir,
    pub data_dir: TempDir,
}

impl TestEnv {
    pub fn new() -> Self {
        Self {
            repo_dir: TempDir::new().unwrap(),
            data_dir: TempDir::new().unwrap(),
        }
    }

    /// Create a new test environment and run `th init`.
    pub fn init() -> Self {
        let env = Self::new();
        env.th().arg("init").assert().success();
        env
    }

    /// Get a Command for the th binary with isolated directories.
    pub fn th(&self) -> Command {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_th"));
        cmd.current_dir(self.repo_dir.path());
        cmd.env("TH_DATA_DIR", self.data_dir.path());
        cmd.env("TH_CONFIG_DIR", self.config_dir());
        cmd.env_remove("TH_REPO");
        cmd.env_remove("TH_LOG");
        cmd
    }

    /// Run `th` with `args`, assert success, and parse stdout as JSON.
    pub fn json(&self, args: &[&str]) -> serde_json::Value {
        let output = self.th().args(args).assert().success().get_output().clone();
        serde_json::from_slice(&output.stdout).unwrap()
    }

    /// Run `th -H` with `args`, assert success, and return stdout.
    pub fn human(&self, args: &[&str]) -> String {
        let output = self
            .th()
            .arg("-H")
            .args(args)
            .assert()
            .success()
            .get_output()
            .clone();
        String::from_utf8(output.stdout).unwrap()
    }

    /// Create a thread and return its ID.
    pub fn new_thread(&self, args: &[&str]) -> String {
        let mut full = vec!["thread", "new"];
        full.extend_from_slice(args);
        self.json(&full)["id"].as_str().unwrap().to_string()
    }

    /// Create a container and return its ID.
    pub fn new_container(&self, args: &[&str]) -> String {
        let mut full = vec!["container", "new"];
        full.extend_from_slice(args);
        self.json(&full)["id"].as_str().unwrap().to_string()
    }

    /// Create a group and return its ID.
    pub fn new_group(&self, name: &str) -> String {
        self.json(&["group", "new", name])["id"]
            .as_str()
            .unwrap()
            .to_string()
    }

    pub fn path(&self) -> &std::path::Path {
        self.repo_dir.path()
    }

    pub fn data_path(&self) -> &std::path::Path {
        self.data_dir.path()
    }

    /// Directory used as the system config directory.
    pub fn config_dir(&self) -> std::path::PathBuf {
        self.data_dir.path().join("system-config")
    }
}

impl Default for TestEnv {
    fn default() -> Self {
        Self::new()
    }
}
