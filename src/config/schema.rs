//! KDL schema for config.kdl.
//!
//! This module provides:
//! - the `ThreadsConfig` struct mirroring the file
//! - conversion to and from KDL documents
//! - validation and key-based access for `th config get/set`

use kdl::{KdlDocument, KdlEntry, KdlNode, KdlValue};
use serde::{Deserialize, Serialize};

use crate::models::ThreadSize;

/// Output format preference for CLI commands.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// JSON output (default, machine-readable)
    #[default]
    Json,
    /// Human-readable output
    Human,
}

impl OutputFormat {
    /// Parse from string, case-insensitive.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "json" => Some(OutputFormat::Json),
            "human" => Some(OutputFormat::Human),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::Json => "json",
            OutputFormat::Human => "human",
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Keys accepted in config.kdl, in display order.
pub const KEYS: &[&str] = &[
    "output-format",
    "default-importance",
    "default-size",
    "color",
    "action-log",
];

/// User preferences stored in config.kdl.
///
/// # KDL Schema
///
/// ```kdl
/// output-format "human"  // or "json"
/// default-importance 3
/// default-size "medium"
/// color #true
/// action-log #true
/// ```
///
/// Every field is optional; unset fields fall through to the next layer
/// during resolution.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ThreadsConfig {
    pub output_format: Option<OutputFormat>,

    /// Importance given to new threads (1-5)
    pub default_importance: Option<u8>,

    pub default_size: Option<ThreadSize>,

    /// Color tree output when writing to a terminal
    pub color: Option<bool>,

    /// Record every invocation in the repository's action.log
    pub action_log: Option<bool>,
}

impl ThreadsConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate the config values.
    ///
    /// Returns an error message if any value is invalid.
    pub fn validate(&self) -> Result<(), String> {
        if let Some(importance) = self.default_importance {
            if !(1..=5).contains(&importance) {
                return Err(format!(
                    "default-importance must be 1-5, got {}",
                    importance
                ));
            }
        }
        Ok(())
    }

    /// Parse config from a KDL document.
    ///
    /// Unknown nodes and values of the wrong type are ignored.
    pub fn from_kdl(doc: &KdlDocument) -> Self {
        let mut config = Self::new();

        if let Some(s) = first_string(doc, "output-format") {
            config.output_format = OutputFormat::parse(s);
        }

        if let Some(value) = first_value(doc, "default-importance") {
            if let Some(i) = value.as_integer() {
                if (1..=5).contains(&i) {
                    config.default_importance = Some(i as u8);
                }
            }
        }

        if let Some(s) = first_string(doc, "default-size") {
            config.default_size = ThreadSize::parse(s);
        }

        config.color = first_value(doc, "color").and_then(KdlValue::as_bool);
        config.action_log = first_value(doc, "action-log").and_then(KdlValue::as_bool);

        config
    }

    /// Convert config to a KDL document.
    pub fn to_kdl(&self) -> KdlDocument {
        let mut doc = KdlDocument::new();

        if let Some(format) = self.output_format {
            push_node(
                &mut doc,
                "output-format",
                KdlValue::String(format.as_str().to_string()),
            );
        }
        if let Some(importance) = self.default_importance {
            push_node(
                &mut doc,
                "default-importance",
                KdlValue::Integer(importance as i128),
            );
        }
        if let Some(size) = self.default_size {
            push_node(
                &mut doc,
                "default-size",
                KdlValue::String(size.as_str().to_string()),
            );
        }
        if let Some(color) = self.color {
            push_node(&mut doc, "color", KdlValue::Bool(color));
        }
        if let Some(action_log) = self.action_log {
            push_node(&mut doc, "action-log", KdlValue::Bool(action_log));
        }

        doc
    }

    /// Merge another config into this one.
    /// Values from `other` override values in `self` if they are Some.
    pub fn merge(&mut self, other: &ThreadsConfig) {
        if other.output_format.is_some() {
            self.output_format = other.output_format;
        }
        if other.default_importance.is_some() {
            self.default_importance = other.default_importance;
        }
        if other.default_size.is_some() {
            self.default_size = other.default_size;
        }
        if other.color.is_some() {
            self.color = other.color;
        }
        if other.action_log.is_some() {
            self.action_log = other.action_log;
        }
    }

    /// Current value of `key` as a display string, if set.
    pub fn get(&self, key: &str) -> Result<Option<String>, String> {
        let value = match key {
            "output-format" => self.output_format.map(|f| f.as_str().to_string()),
            "default-importance" => self.default_importance.map(|i| i.to_string()),
            "default-size" => self.default_size.map(|s| s.as_str().to_string()),
            "color" => self.color.map(|b| b.to_string()),
            "action-log" => self.action_log.map(|b| b.to_string()),
            _ => return Err(unknown_key(key)),
        };
        Ok(value)
    }

    /// Set `key` from its string form.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), String> {
        match key {
            "output-format" => {
                self.output_format = Some(
                    OutputFormat::parse(value)
                        .ok_or_else(|| format!("output-format must be json or human, got {}", value))?,
                );
            }
            "default-importance" => {
                let importance: u8 = value
                    .parse()
                    .map_err(|_| format!("default-importance must be a number, got {}", value))?;
                self.default_importance = Some(importance);
            }
            "default-size" => {
                self.default_size = Some(
                    ThreadSize::parse(value)
                        .ok_or_else(|| format!("Unknown size: {}", value))?,
                );
            }
            "color" => self.color = Some(parse_bool(key, value)?),
            "action-log" => self.action_log = Some(parse_bool(key, value)?),
            _ => return Err(unknown_key(key)),
        }
        self.validate()
    }
}

fn first_value<'d>(doc: &'d KdlDocument, name: &str) -> Option<&'d KdlValue> {
    doc.get(name)
        .and_then(|node| node.entries().first())
        .map(KdlEntry::value)
}

fn first_string<'d>(doc: &'d KdlDocument, name: &str) -> Option<&'d str> {
    first_value(doc, name).and_then(KdlValue::as_string)
}

fn push_node(doc: &mut KdlDocument, name: &str, value: KdlValue) {
    let mut node = KdlNode::new(name);
    node.push(KdlEntry::new(value));
    doc.nodes_mut().push(node);
}

fn parse_bool(key: &str, value: &str) -> Result<bool, String> {
    match value.to_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Ok(true),
        "false" | "no" | "off" | "0" => Ok(false),
        _ => Err(format!("{} must be true or false, got {}", key, value)),
    }
}

fn unknown_key(key: &str) -> String {
    format!("Unknown config key: {} (expected one of: {})", key, KEYS.join(", "))
}
