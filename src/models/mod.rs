//! Data models for threads entities.
//!
//! This module defines the core data structures:
//! - `Thread` - Units of ongoing work with status, importance, size and a progress log
//! - `Container` - Pure organizational nodes used to shape the hierarchy
//! - `Group` - Flat labels that cut across the parent/child hierarchy
//! - `Entity` - The Thread/Container sum type, as stored and classified
//!
//! Temperature is never stored; it is derived on demand, see [`temperature`].

pub mod classify;
pub mod temperature;

pub use classify::{classify, is_container, is_thread};
pub use temperature::{Temperature, derive_temperature, derive_temperature_str};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Thread lifecycle status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThreadStatus {
    #[default]
    Active,
    Paused,
    Stopped,
    Completed,
    Archived,
}

impl ThreadStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Paused => "paused",
            Self::Stopped => "stopped",
            Self::Completed => "completed",
            Self::Archived => "archived",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "active" => Some(Self::Active),
            "paused" => Some(Self::Paused),
            "stopped" => Some(Self::Stopped),
            "completed" => Some(Self::Completed),
            "archived" => Some(Self::Archived),
            _ => None,
        }
    }
}

impl fmt::Display for ThreadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Rough size of a thread, ordered smallest to largest.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum ThreadSize {
    Tiny,
    Small,
    #[default]
    Medium,
    Large,
    Huge,
}

impl ThreadSize {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Tiny => "tiny",
            Self::Small => "small",
            Self::Medium => "medium",
            Self::Large => "large",
            Self::Huge => "huge",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "tiny" => Some(Self::Tiny),
            "small" => Some(Self::Small),
            "medium" => Some(Self::Medium),
            "large" => Some(Self::Large),
            "huge" => Some(Self::Huge),
            _ => None,
        }
    }
}

impl fmt::Display for ThreadSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One note in a thread's append-only progress log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressEntry {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub note: String,
}

/// A snapshot in an entity's append-only details log.
///
/// The last entry in the log is the current state of the details.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetailEntry {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub content: String,
}

/// A unit of ongoing work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Thread {
    /// Unique identifier (e.g., "th-a1b2c3")
    pub id: String,

    pub name: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub status: ThreadStatus,

    /// Importance from 1 (lowest) to 5 (highest)
    #[serde(default = "default_importance")]
    pub importance: u8,

    #[serde(default)]
    pub size: ThreadSize,

    /// Parent entity (thread or container)
    #[serde(default)]
    pub parent_id: Option<String>,

    #[serde(default)]
    pub group_id: Option<String>,

    /// Ordered tags; the first one is shown in the tree
    #[serde(default)]
    pub tags: Vec<String>,

    #[serde(default)]
    pub links: Vec<String>,

    /// IDs of entities this thread waits on
    #[serde(default)]
    pub dependencies: Vec<String>,

    #[serde(default)]
    pub progress: Vec<ProgressEntry>,

    #[serde(default)]
    pub details: Vec<DetailEntry>,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

fn default_importance() -> u8 {
    3
}

impl Thread {
    /// Create a new thread with the given ID and name.
    pub fn new(id: String, name: String) -> Self {
        let now = Utc::now();
        Self {
            id,
            name,
            description: String::new(),
            status: ThreadStatus::default(),
            importance: default_importance(),
            size: ThreadSize::default(),
            parent_id: None,
            group_id: None,
            tags: Vec::new(),
            links: Vec::new(),
            dependencies: Vec::new(),
            progress: Vec::new(),
            details: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// The temperature of this thread as of `now`.
    pub fn temperature_at(&self, now: DateTime<Utc>) -> Temperature {
        derive_temperature(self.updated_at, now)
    }

    /// The most recent details snapshot, if any.
    pub fn current_details(&self) -> Option<&DetailEntry> {
        self.details.last()
    }
}

/// A pure organizational node with no momentum of its own.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Container {
    /// Unique identifier (e.g., "ct-a1b2c3")
    pub id: String,

    pub name: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub parent_id: Option<String>,

    #[serde(default)]
    pub group_id: Option<String>,

    #[serde(default)]
    pub tags: Vec<String>,

    #[serde(default)]
    pub details: Vec<DetailEntry>,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

impl Container {
    /// Create a new container with the given ID and name.
    pub fn new(id: String, name: String) -> Self {
        let now = Utc::now();
        Self {
            id,
            name,
            description: String::new(),
            parent_id: None,
            group_id: None,
            tags: Vec::new(),
            details: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// The most recent details snapshot, if any.
    pub fn current_details(&self) -> Option<&DetailEntry> {
        self.details.last()
    }
}

/// A flat label; groups never nest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Group {
    /// Unique identifier (e.g., "gr-a1b2c3")
    pub id: String,

    pub name: String,

    #[serde(default)]
    pub description: String,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

impl Group {
    /// Create a new group with the given ID and name.
    pub fn new(id: String, name: String) -> Self {
        let now = Utc::now();
        Self {
            id,
            name,
            description: String::new(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// Which side of the entity union a record falls on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Thread,
    Container,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Thread => "thread",
            Self::Container => "container",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A thread or a container, as persisted.
///
/// Serialization writes a `"type"` tag. Deserialization goes through
/// [`Entity::from_value`] so that untagged legacy records are still
/// classified by shape.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Entity {
    Thread(Thread),
    Container(Container),
}

impl<'de> Deserialize<'de> for Entity {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = serde_json::Value::deserialize(deserializer)?;
        Entity::from_value(value).map_err(serde::de::Error::custom)
    }
}

impl Entity {
    pub fn id(&self) -> &str {
        self.as_entity_ref().id()
    }

    pub fn kind(&self) -> EntityKind {
        self.as_entity_ref().kind()
    }

    pub fn parent_id(&self) -> Option<&str> {
        self.as_entity_ref().parent_id()
    }

    pub fn group_id(&self) -> Option<&str> {
        self.as_entity_ref().group_id()
    }

    pub fn name(&self) -> &str {
        self.as_entity_ref().name()
    }

    /// Borrow this entity as an [`EntityRef`].
    pub fn as_entity_ref(&self) -> EntityRef<'_> {
        match self {
            Entity::Thread(t) => EntityRef::Thread(t),
            Entity::Container(c) => EntityRef::Container(c),
        }
    }

    pub fn set_parent_id(&mut self, parent_id: Option<String>) {
        match self {
            Entity::Thread(t) => t.parent_id = parent_id,
            Entity::Container(c) => c.parent_id = parent_id,
        }
    }

    pub fn set_group_id(&mut self, group_id: Option<String>) {
        match self {
            Entity::Thread(t) => t.group_id = group_id,
            Entity::Container(c) => c.group_id = group_id,
        }
    }

    pub fn details_mut(&mut self) -> &mut Vec<DetailEntry> {
        match self {
            Entity::Thread(t) => &mut t.details,
            Entity::Container(c) => &mut c.details,
        }
    }

    pub fn touch(&mut self, at: DateTime<Utc>) {
        match self {
            Entity::Thread(t) => t.updated_at = at,
            Entity::Container(c) => c.updated_at = at,
        }
    }
}

/// A borrowed thread or container.
///
/// This is what the tree builder hands around: the forest never owns the
/// entities it arranges.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum EntityRef<'a> {
    Thread(&'a Thread),
    Container(&'a Container),
}

impl<'a> EntityRef<'a> {
    pub fn id(&self) -> &'a str {
        match self {
            EntityRef::Thread(t) => &t.id,
            EntityRef::Container(c) => &c.id,
        }
    }

    pub fn name(&self) -> &'a str {
        match self {
            EntityRef::Thread(t) => &t.name,
            EntityRef::Container(c) => &c.name,
        }
    }

    pub fn kind(&self) -> EntityKind {
        match self {
            EntityRef::Thread(_) => EntityKind::Thread,
            EntityRef::Container(_) => EntityKind::Container,
        }
    }

    pub fn parent_id(&self) -> Option<&'a str> {
        match self {
            EntityRef::Thread(t) => t.parent_id.as_deref(),
            EntityRef::Container(c) => c.parent_id.as_deref(),
        }
    }

    pub fn group_id(&self) -> Option<&'a str> {
        match self {
            EntityRef::Thread(t) => t.group_id.as_deref(),
            EntityRef::Container(c) => c.group_id.as_deref(),
        }
    }

    pub fn tags(&self) -> &'a [String] {
        match self {
            EntityRef::Thread(t) => &t.tags,
            EntityRef::Container(c) => &c.tags,
        }
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        match self {
            EntityRef::Thread(t) => t.updated_at,
            EntityRef::Container(c) => c.updated_at,
        }
    }
}

/// The leading characters of an ID, as shown in the tree.
pub fn short_id(id: &str) -> &str {
    match id.char_indices().nth(8) {
        Some((idx, _)) => &id[..idx],
        None => id,
    }
}
