//! Configuration for threads.
//!
//! Preferences live in `config.kdl` at two levels:
//! - System: `~/.config/threads/config.kdl` (or `$TH_CONFIG_DIR/config.kdl`)
//! - Session: `~/.local/share/threads/<repo-hash>/config.kdl`
//!
//! Keys:
//! - `output-format` - "json" or "human"
//! - `default-importance` - importance for new threads (1-5)
//! - `default-size` - size for new threads
//! - `color` - color tree output
//! - `action-log` - record invocations in action.log
//!
//! Precedence: CLI flag > session config > system config > defaults.
//! Use the [`resolver`] module for resolution with source tracking.

pub mod resolver;
pub mod schema;

pub use resolver::{
    ConfigOverrides, Resolved, ResolvedConfig, ValueSource, resolve_config, resolve_from,
};
pub use schema::{KEYS, OutputFormat, ThreadsConfig};
