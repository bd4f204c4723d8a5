//! Action logging for `th` commands.
//!
//! Every invocation is appended to `action.log` in the repository's data
//! directory as one JSON record per line.

use crate::Result;
use crate::storage::Storage;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, ErrorKind, Write};
use std::path::Path;

/// Represents a single action log entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionLog {
    /// ISO 8601 timestamp when the action occurred
    pub timestamp: DateTime<Utc>,

    /// Repository path where the command was executed
    pub repo_path: String,

    /// Command name (e.g., "thread new", "tree")
    pub command: String,

    /// Command arguments as JSON
    pub args: serde_json::Value,

    pub success: bool,

    /// Error message if the command failed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    pub duration_ms: u64,

    /// User who executed the command
    pub user: String,
}

impl ActionLog {
    pub fn new(
        repo_path: &Path,
        command: &str,
        args: serde_json::Value,
        success: bool,
        error: Option<String>,
        duration_ms: u64,
    ) -> Self {
        Self {
            timestamp: Utc::now(),
            repo_path: repo_path.to_string_lossy().to_string(),
            command: command.to_string(),
            args: sanitize_args(&args),
            success,
            error,
            duration_ms,
            user: get_current_user(),
        }
    }
}

/// Append an entry to the log at `path`.
pub fn log_action(path: &Path, entry: &ActionLog) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string(entry)?;
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    writeln!(file, "{}", json)?;
    Ok(())
}

/// Record an invocation for the repository at `repo_path`.
///
/// Never fails: an uninitialized repository is skipped and write errors are
/// only reported through tracing.
pub fn record(repo_path: &Path, entry: &ActionLog) {
    let storage = match Storage::open(repo_path) {
        Ok(storage) => storage,
        Err(e) => {
            tracing::debug!(error = %e, "action log skipped");
            return;
        }
    };

    let enabled = crate::config::resolve_config(&storage, &Default::default())
        .map(|config| config.action_log())
        .unwrap_or(true);
    if !enabled {
        return;
    }

    if let Err(e) = log_action(&storage.action_log_path(), entry) {
        tracing::warn!(error = %e, "failed to write action log");
    }
}

/// Read the log at `path`, oldest first. Unparseable lines are skipped.
pub fn read_actions(path: &Path) -> Result<Vec<ActionLog>> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    let mut entries = Vec::new();
    for line in BufReader::new(file).lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str(&line) {
            Ok(entry) => entries.push(entry),
            Err(e) => tracing::debug!(error = %e, "skipping unreadable action log line"),
        }
    }
    Ok(entries)
}

/// Shorten long strings and arrays, and reduce paths to their basename.
fn sanitize_args(args: &serde_json::Value) -> serde_json::Value {
    match args {
        serde_json::Value::Object(map) => serde_json::Value::Object(
            map.iter()
                .map(|(key, value)| (key.clone(), sanitize_args(value)))
                .collect(),
        ),
        serde_json::Value::Array(arr) => {
            if arr.len() > 10 {
                serde_json::Value::String(format!("[Array with {} items]", arr.len()))
            } else {
                serde_json::Value::Array(arr.iter().map(sanitize_args).collect())
            }
        }
        serde_json::Value::String(s) => {
            let sanitized = if s.contains('/') || s.contains('\\') {
                s.rsplit(['/', '\\']).next().unwrap_or(s).to_string()
            } else {
                s.clone()
            };

            let chars = sanitized.chars().count();
            if chars > 100 {
                let head: String = sanitized.chars().take(97).collect();
                serde_json::Value::String(format!("{}... ({} chars)", head, chars))
            } else {
                serde_json::Value::String(sanitized)
            }
        }
        _ => args.clone(),
    }
}

fn get_current_user() -> String {
    std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_else(|_| "unknown".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_sanitize_file_path() {
        let value = serde_json::json!("/very/long/path/to/import.json");
        assert_eq!(sanitize_args(&value), serde_json::json!("import.json"));
    }

    #[test]
    fn test_sanitize_long_string() {
        let value = serde_json::json!("é".repeat(150));
        let serde_json::Value::String(s) = sanitize_args(&value) else {
            panic!("Expected string value");
        };
        assert!(s.ends_with("... (150 chars)"));
    }

    #[test]
    fn test_sanitize_large_array() {
        let arr: Vec<i32> = (0..15).collect();
        assert_eq!(
            sanitize_args(&serde_json::json!(arr)),
            serde_json::json!("[Array with 15 items]")
        );
        assert_eq!(
            sanitize_args(&serde_json::json!([1, 2, 3])),
            serde_json::json!([1, 2, 3])
        );
    }

    #[test]
    fn test_sanitize_nested_object() {
        let value = serde_json::json!({
            "thread": {"name": "Fix login"},
            "file": "/home/user/data.json"
        });
        let sanitized = sanitize_args(&value);
        assert_eq!(sanitized["thread"]["name"], "Fix login");
        assert_eq!(sanitized["file"], "data.json");
    }

    #[test]
    fn test_log_and_read_back() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("action.log");

        let first = ActionLog::new(dir.path(), "init", serde_json::json!({}), true, None, 3);
        let second = ActionLog::new(
            dir.path(),
            "thread show",
            serde_json::json!({"id": "th-000000"}),
            false,
            Some("Entity not found: th-000000".to_string()),
            1,
        );
        log_action(&path, &first).unwrap();
        log_action(&path, &second).unwrap();
        fs::OpenOptions::new()
            .append(true)
            .open(&path)
            .unwrap()
            .write_all(b"not json\n")
            .unwrap();

        let entries = read_actions(&path).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].command, "init");
        assert!(!entries[1].success);
        assert_eq!(entries[1].args["id"], "th-000000");
    }

    #[test]
    fn test_read_missing_log_is_empty() {
        let dir = TempDir::new().unwrap();
        assert!(read_actions(&dir.path().join("action.log")).unwrap().is_empty());
    }
}
