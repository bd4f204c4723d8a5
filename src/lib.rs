//! threads - track threads of work and render them as a tree.
//!
//! This library provides the core functionality for the `th` CLI tool:
//! the entity models, the hierarchy/tree engine, JSONL storage, and the
//! command layer that ties them together.
//!
//! The tree engine ([`tree`]) and the temperature/classification helpers in
//! [`models`] are pure: they never touch the filesystem or the clock unless a
//! caller asks them to.

pub mod action_log;
pub mod cli;
pub mod commands;
pub mod config;
pub mod models;
pub mod storage;
pub mod tree;

pub use models::{
    Container, Entity, EntityKind, EntityRef, Group, Temperature, Thread, classify,
    derive_temperature, derive_temperature_str, is_container, is_thread,
};
pub use tree::{
    DataQualityWarning, Forest, Line, LineRole, TreeNode, build_forest,
    build_forest_with_warnings, render, render_at, render_text,
};


/// Library-level error type for threads operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Not initialized: run `th init` first")]
    NotInitialized,

    #[error("Entity not found: {0}")]
    NotFound(String),

    #[error("Invalid ID format: {0}")]
    InvalidId(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid timestamp: {value:?}")]
    InvalidTimestamp { value: String },

    #[error("Malformed entity{}: {reason}", .id.as_ref().map(|id| format!(" {}", id)).unwrap_or_default())]
    MalformedEntity { id: Option<String>, reason: String },

    #[error("Cycle detected in parent chain")]
    CycleDetected,

    #[error("Config error: {0}")]
    Config(String),

    #[error("{0}")]
    Other(String),
}

/// Result type alias for threads operations.
pub type Result<T> = std::result::Result<T, Error>;
