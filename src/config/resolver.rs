//! Precedence resolution for configuration.
//!
//! ## Precedence (highest to lowest)
//!
//! 1. CLI flags (passed at runtime)
//! 2. Session config.kdl (`~/.local/share/threads/<repo-hash>/config.kdl`)
//! 3. System config.kdl (`~/.config/threads/config.kdl`)
//! 4. Built-in defaults

use serde::Serialize;

use crate::Result;
use crate::config::{OutputFormat, ThreadsConfig};
use crate::models::ThreadSize;
use crate::storage::Storage;

/// Tracks where a resolved value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueSource {
    /// Value from CLI flag
    #[serde(rename = "cli")]
    CliFlag,
    /// Value from session-level config
    Session,
    /// Value from system-level config
    System,
    /// Built-in default value
    Default,
}

impl std::fmt::Display for ValueSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValueSource::CliFlag => write!(f, "cli"),
            ValueSource::Session => write!(f, "session"),
            ValueSource::System => write!(f, "system"),
            ValueSource::Default => write!(f, "default"),
        }
    }
}

/// A resolved value with its source.
#[derive(Debug, Clone, Serialize)]
pub struct Resolved<T> {
    pub value: T,
    pub source: ValueSource,
}

impl<T> Resolved<T> {
    pub fn new(value: T, source: ValueSource) -> Self {
        Self { value, source }
    }
}

/// Fully resolved configuration with source tracking.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct ResolvedConfig {
    pub output_format: Resolved<OutputFormat>,
    pub default_importance: Resolved<u8>,
    pub default_size: Resolved<ThreadSize>,
    pub color: Resolved<bool>,
    pub action_log: Resolved<bool>,
}

impl Default for ResolvedConfig {
    fn default() -> Self {
        Self {
            output_format: Resolved::new(OutputFormat::Json, ValueSource::Default),
            default_importance: Resolved::new(3, ValueSource::Default),
            default_size: Resolved::new(ThreadSize::Medium, ValueSource::Default),
            color: Resolved::new(true, ValueSource::Default),
            action_log: Resolved::new(true, ValueSource::Default),
        }
    }
}

impl ResolvedConfig {
    pub fn output_format(&self) -> OutputFormat {
        self.output_format.value
    }

    pub fn default_importance(&self) -> u8 {
        self.default_importance.value
    }

    pub fn default_size(&self) -> ThreadSize {
        self.default_size.value
    }

    pub fn color(&self) -> bool {
        self.color.value
    }

    pub fn action_log(&self) -> bool {
        self.action_log.value
    }

    /// Value and source of `key` as display strings.
    pub fn describe(&self, key: &str) -> Option<(String, ValueSource)> {
        let pair = match key {
            "output-format" => (
                self.output_format.value.to_string(),
                self.output_format.source,
            ),
            "default-importance" => (
                self.default_importance.value.to_string(),
                self.default_importance.source,
            ),
            "default-size" => (
                self.default_size.value.to_string(),
                self.default_size.source,
            ),
            "color" => (self.color.value.to_string(), self.color.source),
            "action-log" => (self.action_log.value.to_string(), self.action_log.source),
            _ => return None,
        };
        Some(pair)
    }
}

/// CLI overrides for configuration resolution.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub output_format: Option<OutputFormat>,
    pub color: Option<bool>,
}

impl ConfigOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_output_format(mut self, format: OutputFormat) -> Self {
        self.output_format = Some(format);
        self
    }

    pub fn with_color(mut self, color: bool) -> Self {
        self.color = Some(color);
        self
    }
}

fn pick<T: Copy>(
    cli: Option<T>,
    session: Option<T>,
    system: Option<T>,
    default: Resolved<T>,
) -> Resolved<T> {
    if let Some(value) = cli {
        Resolved::new(value, ValueSource::CliFlag)
    } else if let Some(value) = session {
        Resolved::new(value, ValueSource::Session)
    } else if let Some(value) = system {
        Resolved::new(value, ValueSource::System)
    } else {
        default
    }
}

/// Resolve from already-loaded layers.
pub fn resolve_from(
    system: &ThreadsConfig,
    session: &ThreadsConfig,
    overrides: &ConfigOverrides,
) -> ResolvedConfig {
    let defaults = ResolvedConfig::default();
    ResolvedConfig {
        output_format: pick(
            overrides.output_format,
            session.output_format,
            system.output_format,
            defaults.output_format,
        ),
        default_importance: pick(
            None,
            session.default_importance,
            system.default_importance,
            defaults.default_importance,
        ),
        default_size: pick(
            None,
            session.default_size,
            system.default_size,
            defaults.default_size,
        ),
        color: pick(overrides.color, session.color, system.color, defaults.color),
        action_log: pick(
            None,
            session.action_log,
            system.action_log,
            defaults.action_log,
        ),
    }
}

/// Resolve configuration with full precedence chain.
pub fn resolve_config(storage: &Storage, overrides: &ConfigOverrides) -> Result<ResolvedConfig> {
    let system = Storage::read_system_config()?;
    let session = storage.read_config()?;
    Ok(resolve_from(&system, &session, overrides))
}
