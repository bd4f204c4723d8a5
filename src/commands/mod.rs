//! Command implementations for the `th` CLI.
//!
//! Each command takes an open [`Storage`] (or a repository path, for
//! `init`), does its work, and returns a result struct implementing
//! [`Output`]. Commands are organized by entity type:
//! - `thread` - thread CRUD and the progress log
//! - `container` - container creation and listing
//! - `group` - group management
//! - `tree` - forest building and rendering
//! - `config` - `th config get/set/list`
//!
//! Field-level validation (importance range, reference existence, parent
//! cycles) lives here, not in the tree engine.

mod config;
mod container;
mod group;
mod thread;
mod tree;

pub use config::{ConfigEntry, ConfigList, ConfigSet, config_get, config_list, config_set};
pub use container::{ContainerList, ContainerParams, container_create, container_list};
pub use group::{GroupCreated, GroupList, GroupRemoved, GroupSummary, group_create, group_list, group_remove};
pub use thread::{
    ProgressAdded, ThreadDetail, ThreadFilter, ThreadList, ThreadParams, ThreadSummary,
    ThreadUpdate, Updated, thread_create, thread_list, thread_progress, thread_show,
    thread_update,
};
pub use tree::{TreeOutput, tree};

use crate::action_log::{self, ActionLog};
use crate::models::{Container, DetailEntry, Entity, EntityKind, Group, Thread};
use crate::storage::{self, Storage};
use crate::{Error, Result};
use chrono::Utc;
use serde::Serialize;
use std::collections::HashSet;
use std::fmt::Write as _;
use std::path::Path;

/// Command results that can be serialized to JSON or formatted for humans.
pub trait Output {
    /// Serialize to JSON string.
    fn to_json(&self) -> String;

    /// Format for human-readable output.
    fn to_human(&self) -> String;
}

/// JSON for any serializable result. Serialization of plain data cannot fail
/// in practice; if it does, the error is reported as JSON.
pub(crate) fn json_of<T: Serialize>(value: &T) -> String {
    serde_json::to_string(value)
        .unwrap_or_else(|e| serde_json::json!({ "error": e.to_string() }).to_string())
}

// === Init ===

#[derive(Serialize)]
pub struct InitResult {
    pub initialized: bool,
    pub storage_path: String,
}

impl Output for InitResult {
    fn to_json(&self) -> String {
        json_of(self)
    }

    fn to_human(&self) -> String {
        if self.initialized {
            format!("Initialized threads storage at {}", self.storage_path)
        } else {
            format!("Already initialized at {}", self.storage_path)
        }
    }
}

/// Initialize storage for the repository at `repo_path`.
pub fn init(repo_path: &Path) -> Result<InitResult> {
    let existed = Storage::exists(repo_path)?;
    let storage = Storage::init(repo_path)?;
    Ok(InitResult {
        initialized: !existed,
        storage_path: storage.root().display().to_string(),
    })
}

// === Shared validation ===

pub(crate) fn validate_importance(importance: u8) -> Result<u8> {
    if (1..=5).contains(&importance) {
        Ok(importance)
    } else {
        Err(Error::InvalidInput(format!(
            "Importance must be 1-5, got {}",
            importance
        )))
    }
}

pub(crate) fn validate_name(name: &str) -> Result<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(Error::InvalidInput("Name cannot be empty".to_string()));
    }
    Ok(trimmed.to_string())
}

/// Resolve a group reference (ID or name) to its ID.
pub(crate) fn resolve_group(storage: &Storage, id_or_name: &str) -> Result<String> {
    Ok(storage.find_group(id_or_name)?.id)
}

/// Check that `parent_id` can become the parent of `child_id`.
///
/// The parent must exist, must not be the child itself, and must not have
/// the child anywhere in its own ancestor chain. `child_id` is `None` for an
/// entity that does not exist yet.
pub(crate) fn validate_parent(
    entities: &[Entity],
    child_id: Option<&str>,
    parent_id: &str,
) -> Result<()> {
    if child_id == Some(parent_id) {
        return Err(Error::InvalidInput(format!(
            "An entity cannot be its own parent: {}",
            parent_id
        )));
    }
    if !entities.iter().any(|e| e.id() == parent_id) {
        return Err(Error::NotFound(format!("Parent not found: {}", parent_id)));
    }

    let Some(child_id) = child_id else {
        return Ok(());
    };
    let mut seen = HashSet::new();
    let mut current = Some(parent_id);
    while let Some(id) = current {
        if id == child_id {
            return Err(Error::CycleDetected);
        }
        // Stored data may already contain a cycle; stop walking once one shows up.
        if !seen.insert(id) {
            break;
        }
        current = entities
            .iter()
            .find(|e| e.id() == id)
            .and_then(Entity::parent_id);
    }
    Ok(())
}

fn new_id(prefix: &str, name: &str, storage: &Storage) -> Result<String> {
    let taken: HashSet<String> = storage
        .list_entities()?
        .iter()
        .map(|e| e.id().to_string())
        .chain(storage.list_groups()?.into_iter().map(|g| g.id))
        .collect();
    for attempt in 0..16 {
        let id = storage::generate_id(prefix, &format!("{}:{}", name, attempt));
        if !taken.contains(&id) {
            return Ok(id);
        }
    }
    Err(Error::Other(format!("Could not generate a unique {} ID", prefix)))
}

pub(crate) fn new_entity_id(storage: &Storage, kind: EntityKind, name: &str) -> Result<String> {
    let prefix = match kind {
        EntityKind::Thread => storage::THREAD_PREFIX,
        EntityKind::Container => storage::CONTAINER_PREFIX,
    };
    new_id(prefix, name, storage)
}

pub(crate) fn new_group_id(storage: &Storage, name: &str) -> Result<String> {
    new_id(storage::GROUP_PREFIX, name, storage)
}

// === Created ===

/// Result of creating a thread or container.
#[derive(Serialize)]
pub struct Created {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: EntityKind,
    pub name: String,
}

impl Output for Created {
    fn to_json(&self) -> String {
        json_of(self)
    }

    fn to_human(&self) -> String {
        format!("Created {} {} \"{}\"", self.kind, self.id, self.name)
    }
}

// === Detail ===

#[derive(Serialize)]
pub struct DetailAdded {
    pub id: String,
    pub detail_id: String,
    pub count: usize,
}

impl Output for DetailAdded {
    fn to_json(&self) -> String {
        json_of(self)
    }

    fn to_human(&self) -> String {
        format!(
            "Recorded details on {} ({} snapshot{})",
            self.id,
            self.count,
            if self.count == 1 { "" } else { "s" }
        )
    }
}

/// Append a details snapshot to a thread or container.
pub fn detail_add(storage: &mut Storage, id: &str, content: &str) -> Result<DetailAdded> {
    if content.trim().is_empty() {
        return Err(Error::InvalidInput("Details cannot be empty".to_string()));
    }
    let mut entity = storage.get_entity(id)?;
    let now = Utc::now();
    let details = entity.details_mut();
    let detail_id = format!("{}-d{}", id, details.len() + 1);
    details.push(DetailEntry {
        id: detail_id.clone(),
        timestamp: now,
        content: content.to_string(),
    });
    let count = details.len();
    entity.touch(now);
    storage.update_entity(&entity)?;

    Ok(DetailAdded {
        id: id.to_string(),
        detail_id,
        count,
    })
}

// === Remove ===

#[derive(Serialize)]
pub struct Removed {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: EntityKind,
    pub name: String,
    /// Children that now point at a missing parent and render as roots
    pub orphaned_children: Vec<String>,
}

impl Output for Removed {
    fn to_json(&self) -> String {
        json_of(self)
    }

    fn to_human(&self) -> String {
        let mut out = format!("Removed {} {} \"{}\"", self.kind, self.id, self.name);
        if !self.orphaned_children.is_empty() {
            let _ = write!(
                out,
                "\n{} child(ren) now shown as roots: {}",
                self.orphaned_children.len(),
                self.orphaned_children.join(", ")
            );
        }
        out
    }
}

/// Remove a thread or container. Children are left untouched.
pub fn remove(storage: &mut Storage, id: &str) -> Result<Removed> {
    let orphaned_children = storage
        .list_entities()?
        .iter()
        .filter(|e| e.parent_id() == Some(id))
        .map(|e| e.id().to_string())
        .collect();
    let removed = storage.delete_entity(id)?;
    tracing::info!(id, "removed entity");

    Ok(Removed {
        id: removed.id().to_string(),
        kind: removed.kind(),
        name: removed.name().to_string(),
        orphaned_children,
    })
}

// === Import ===

#[derive(Serialize)]
pub struct ImportResult {
    pub threads: usize,
    pub containers: usize,
    pub groups: usize,
    /// IDs that already existed and were left alone
    pub skipped: Vec<String>,
}

impl Output for ImportResult {
    fn to_json(&self) -> String {
        json_of(self)
    }

    fn to_human(&self) -> String {
        let mut out = format!(
            "Imported {} thread(s), {} container(s), {} group(s)",
            self.threads, self.containers, self.groups
        );
        if !self.skipped.is_empty() {
            let _ = write!(
                out,
                "\nSkipped {} existing: {}",
                self.skipped.len(),
                self.skipped.join(", ")
            );
        }
        out
    }
}

/// Import records from a JSON file.
///
/// The file holds either an array of entity records, or an object with
/// `entities` and `groups` arrays. Entity records need not carry a `"type"`
/// tag; they are classified by shape. Every record is parsed before anything
/// is written, so a malformed record aborts the whole import.
pub fn import(storage: &mut Storage, path: &Path) -> Result<ImportResult> {
    let content = std::fs::read_to_string(path)?;
    let value: serde_json::Value = serde_json::from_str(&content)?;

    let (raw_entities, raw_groups) = match value {
        serde_json::Value::Array(items) => (items, Vec::new()),
        serde_json::Value::Object(mut map) => {
            let take = |v: Option<serde_json::Value>| match v {
                Some(serde_json::Value::Array(items)) => Ok(items),
                None => Ok(Vec::new()),
                Some(_) => Err(Error::InvalidInput(
                    "`entities` and `groups` must be arrays".to_string(),
                )),
            };
            (take(map.remove("entities"))?, take(map.remove("groups"))?)
        }
        _ => {
            return Err(Error::InvalidInput(
                "Import file must contain a JSON array or object".to_string(),
            ));
        }
    };

    let entities = raw_entities
        .into_iter()
        .map(Entity::from_value)
        .collect::<Result<Vec<_>>>()?;
    let groups = raw_groups
        .into_iter()
        .map(|v| serde_json::from_value::<Group>(v).map_err(Error::from))
        .collect::<Result<Vec<_>>>()?;

    let mut existing: HashSet<String> = storage
        .list_entities()?
        .iter()
        .map(|e| e.id().to_string())
        .collect();
    let mut existing_groups: HashSet<String> =
        storage.list_groups()?.into_iter().map(|g| g.id).collect();

    let mut result = ImportResult {
        threads: 0,
        containers: 0,
        groups: 0,
        skipped: Vec::new(),
    };

    for group in &groups {
        if !existing_groups.insert(group.id.clone()) {
            result.skipped.push(group.id.clone());
            continue;
        }
        storage.add_group(group)?;
        result.groups += 1;
    }

    for entity in &entities {
        if !existing.insert(entity.id().to_string()) {
            result.skipped.push(entity.id().to_string());
            continue;
        }
        storage.add_entity(entity)?;
        match entity {
            Entity::Thread(_) => result.threads += 1,
            Entity::Container(_) => result.containers += 1,
        }
    }

    tracing::info!(
        threads = result.threads,
        containers = result.containers,
        groups = result.groups,
        skipped = result.skipped.len(),
        "import finished"
    );
    Ok(result)
}

// === Log ===

#[derive(Serialize)]
pub struct LogResult {
    pub entries: Vec<ActionLog>,
    pub count: usize,
}

impl Output for LogResult {
    fn to_json(&self) -> String {
        json_of(self)
    }

    fn to_human(&self) -> String {
        if self.entries.is_empty() {
            return "No actions logged.".to_string();
        }
        let mut out = String::new();
        for entry in &self.entries {
            let _ = writeln!(
                out,
                "{} {} {} ({}ms){}",
                entry.timestamp.format("%Y-%m-%d %H:%M:%S"),
                if entry.success { "ok  " } else { "FAIL" },
                entry.command,
                entry.duration_ms,
                entry
                    .error
                    .as_ref()
                    .map(|e| format!(": {}", e))
                    .unwrap_or_default()
            );
        }
        out.trim_end().to_string()
    }
}

/// The most recent `limit` action-log entries, oldest first.
pub fn log(storage: &Storage, limit: usize) -> Result<LogResult> {
    let mut entries = action_log::read_actions(&storage.action_log_path())?;
    let skip = entries.len().saturating_sub(limit);
    entries.drain(..skip);
    Ok(LogResult {
        count: entries.len(),
        entries,
    })
}

/// Split stored entities into threads and containers, keeping order.
pub(crate) fn partition(entities: Vec<Entity>) -> (Vec<Thread>, Vec<Container>) {
    let mut threads = Vec::new();
    let mut containers = Vec::new();
    for entity in entities {
        match entity {
            Entity::Thread(t) => threads.push(t),
            Entity::Container(c) => containers.push(c),
        }
    }
    (threads, containers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::TestEnv;
    use std::fs;

    fn add_thread(storage: &mut Storage, id: &str, parent: Option<&str>) {
        let mut thread = Thread::new(id.to_string(), format!("Thread {}", id));
        thread.parent_id = parent.map(str::to_string);
        storage.add_entity(&Entity::Thread(thread)).unwrap();
    }

    #[test]
    fn test_validate_importance() {
        assert!(validate_importance(0).is_err());
        assert_eq!(validate_importance(1).unwrap(), 1);
        assert_eq!(validate_importance(5).unwrap(), 5);
        assert!(validate_importance(6).is_err());
    }

    #[test]
    fn test_validate_parent_rejects_cycles() {
        let env = TestEnv::new();
        let mut storage = env.init_storage();
        add_thread(&mut storage, "th-00000a", None);
        add_thread(&mut storage, "th-00000b", Some("th-00000a"));
        add_thread(&mut storage, "th-00000c", Some("th-00000b"));
        let entities = storage.list_entities().unwrap();

        assert!(validate_parent(&entities, Some("th-00000c"), "th-00000a").is_ok());
        assert!(matches!(
            validate_parent(&entities, Some("th-00000a"), "th-00000c"),
            Err(Error::CycleDetected)
        ));
        assert!(matches!(
            validate_parent(&entities, Some("th-00000a"), "th-00000a"),
            Err(Error::InvalidInput(_))
        ));
        assert!(matches!(
            validate_parent(&entities, None, "th-ffffff"),
            Err(Error::NotFound(_))
        ));
    }

    #[test]
    fn test_validate_parent_tolerates_stored_cycle() {
        let env = TestEnv::new();
        let mut storage = env.init_storage();
        add_thread(&mut storage, "th-00000a", Some("th-00000b"));
        add_thread(&mut storage, "th-00000b", Some("th-00000a"));
        add_thread(&mut storage, "th-00000c", None);
        let entities = storage.list_entities().unwrap();

        assert!(validate_parent(&entities, Some("th-00000c"), "th-00000a").is_ok());
    }

    #[test]
    fn test_detail_add_appends_snapshot() {
        let env = TestEnv::new();
        let mut storage = env.init_storage();
        add_thread(&mut storage, "th-00000a", None);

        detail_add(&mut storage, "th-00000a", "first").unwrap();
        let result = detail_add(&mut storage, "th-00000a", "second").unwrap();
        assert_eq!(result.count, 2);

        let Entity::Thread(thread) = storage.get_entity("th-00000a").unwrap() else {
            panic!("expected thread");
        };
        assert_eq!(thread.current_details().unwrap().content, "second");
        assert!(detail_add(&mut storage, "th-00000a", "  ").is_err());
    }

    #[test]
    fn test_remove_reports_orphans() {
        let env = TestEnv::new();
        let mut storage = env.init_storage();
        add_thread(&mut storage, "th-00000a", None);
        add_thread(&mut storage, "th-00000b", Some("th-00000a"));

        let removed = remove(&mut storage, "th-00000a").unwrap();
        assert_eq!(removed.orphaned_children, vec!["th-00000b"]);
        assert_eq!(storage.list_entities().unwrap().len(), 1);
    }

    #[test]
    fn test_import_classifies_untagged_records() {
        let env = TestEnv::new();
        let mut storage = env.init_storage();
        add_thread(&mut storage, "th-00000a", None);

        let file = env.path().join("import.json");
        fs::write(
            &file,
            r#"{
                "groups": [{"id": "gr-00000a", "name": "Work", "createdAt": "2024-01-01T00:00:00Z", "updatedAt": "2024-01-01T00:00:00Z"}],
                "entities": [
                    {"id": "th-00000a", "name": "Dup", "importance": 2, "createdAt": "2024-01-01T00:00:00Z", "updatedAt": "2024-01-01T00:00:00Z"},
                    {"id": "old-thread", "name": "Legacy", "status": "paused", "createdAt": "2024-01-01T00:00:00Z", "updatedAt": "2024-01-01T00:00:00Z"},
                    {"id": "old-box", "name": "Folder", "groupId": "gr-00000a", "createdAt": "2024-01-01T00:00:00Z", "updatedAt": "2024-01-01T00:00:00Z"}
                ]
            }"#,
        )
        .unwrap();

        let result = import(&mut storage, &file).unwrap();
        assert_eq!(result.threads, 1);
        assert_eq!(result.containers, 1);
        assert_eq!(result.groups, 1);
        assert_eq!(result.skipped, vec!["th-00000a"]);
        assert!(matches!(
            storage.get_entity("old-box").unwrap(),
            Entity::Container(_)
        ));
    }

    #[test]
    fn test_import_is_all_or_nothing() {
        let env = TestEnv::new();
        let mut storage = env.init_storage();
        let file = env.path().join("bad.json");
        fs::write(
            &file,
            r#"[{"id": "ok", "name": "Fine", "createdAt": "2024-01-01T00:00:00Z", "updatedAt": "2024-01-01T00:00:00Z"}, {"name": "no id"}]"#,
        )
        .unwrap();

        let result = import(&mut storage, &file);
        assert!(matches!(result, Err(Error::MalformedEntity { .. })));
        assert!(storage.list_entities().unwrap().is_empty());
    }

    #[test]
    fn test_log_keeps_most_recent() {
        let env = TestEnv::new();
        let storage = env.init_storage();
        for i in 0..5 {
            let entry = ActionLog::new(
                env.path(),
                &format!("cmd{}", i),
                serde_json::json!({}),
                true,
                None,
                0,
            );
            action_log::log_action(&storage.action_log_path(), &entry).unwrap();
        }

        let result = log(&storage, 2).unwrap();
        let commands: Vec<&str> = result.entries.iter().map(|e| e.command.as_str()).collect();
        assert_eq!(commands, vec!["cmd3", "cmd4"]);
    }
}
