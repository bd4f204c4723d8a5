//! Thread commands.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt::Write as _;

use super::{Created, Output, json_of, resolve_group, validate_importance, validate_name, validate_parent};
use crate::config::ResolvedConfig;
use crate::models::{
    Entity, EntityKind, ProgressEntry, Temperature, Thread, ThreadSize, ThreadStatus,
};
use crate::storage::Storage;
use crate::{Error, Result};

fn parse_status(s: &str) -> Result<ThreadStatus> {
    ThreadStatus::parse(s).ok_or_else(|| {
        Error::InvalidInput(format!(
            "Unknown status: {} (expected active, paused, stopped, completed, archived)",
            s
        ))
    })
}

fn parse_size(s: &str) -> Result<ThreadSize> {
    ThreadSize::parse(s).ok_or_else(|| {
        Error::InvalidInput(format!(
            "Unknown size: {} (expected tiny, small, medium, large, huge)",
            s
        ))
    })
}

fn get_thread(storage: &Storage, id: &str) -> Result<Thread> {
    match storage.get_entity(id)? {
        Entity::Thread(thread) => Ok(thread),
        Entity::Container(_) => Err(Error::InvalidInput(format!(
            "{} is a container, not a thread",
            id
        ))),
    }
}

/// Fields for a new thread. Unset fields fall back to config defaults.
#[derive(Debug, Default, Clone)]
pub struct ThreadParams {
    pub name: String,
    pub description: Option<String>,
    pub importance: Option<u8>,
    pub size: Option<String>,
    pub status: Option<String>,
    pub parent: Option<String>,
    pub group: Option<String>,
    pub tags: Vec<String>,
}

/// Create a new thread.
pub fn thread_create(
    storage: &mut Storage,
    params: ThreadParams,
    config: &ResolvedConfig,
) -> Result<Created> {
    let name = validate_name(&params.name)?;
    let importance = validate_importance(params.importance.unwrap_or(config.default_importance()))?;
    let size = match params.size.as_deref() {
        Some(s) => parse_size(s)?,
        None => config.default_size(),
    };
    let status = params.status.as_deref().map(parse_status).transpose()?.unwrap_or_default();

    if let Some(parent) = params.parent.as_deref() {
        validate_parent(&storage.list_entities()?, None, parent)?;
    }
    let group_id = params
        .group
        .as_deref()
        .map(|g| resolve_group(storage, g))
        .transpose()?;

    let id = super::new_entity_id(storage, EntityKind::Thread, &name)?;
    let mut thread = Thread::new(id.clone(), name.clone());
    thread.description = params.description.unwrap_or_default();
    thread.importance = importance;
    thread.size = size;
    thread.status = status;
    thread.parent_id = params.parent;
    thread.group_id = group_id;
    thread.tags = dedup_tags(params.tags);

    storage.add_entity(&Entity::Thread(thread))?;
    tracing::info!(%id, "created thread");

    Ok(Created {
        id,
        kind: EntityKind::Thread,
        name,
    })
}

fn dedup_tags(tags: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(tags.len());
    for tag in tags {
        let tag = tag.trim().trim_start_matches('#').to_string();
        if !tag.is_empty() && !out.contains(&tag) {
            out.push(tag);
        }
    }
    out
}

// === List ===

/// One row of `th thread list`.
#[derive(Serialize)]
pub struct ThreadSummary {
    pub id: String,
    pub name: String,
    pub status: ThreadStatus,
    pub importance: u8,
    pub size: ThreadSize,
    pub temperature: Temperature,
    pub parent_id: Option<String>,
    pub group_id: Option<String>,
    pub tags: Vec<String>,
    pub updated_at: DateTime<Utc>,
}

impl ThreadSummary {
    fn from_thread(thread: Thread, now: DateTime<Utc>) -> Self {
        Self {
            temperature: thread.temperature_at(now),
            id: thread.id,
            name: thread.name,
            status: thread.status,
            importance: thread.importance,
            size: thread.size,
            parent_id: thread.parent_id,
            group_id: thread.group_id,
            tags: thread.tags,
            updated_at: thread.updated_at,
        }
    }
}

#[derive(Serialize)]
pub struct ThreadList {
    pub threads: Vec<ThreadSummary>,
    pub count: usize,
}

impl Output for ThreadList {
    fn to_json(&self) -> String {
        json_of(self)
    }

    fn to_human(&self) -> String {
        if self.threads.is_empty() {
            return "No threads found.".to_string();
        }
        let mut out = format!("{} thread(s):\n", self.count);
        for t in &self.threads {
            let _ = writeln!(
                out,
                "  {} [{}] {} · {} · importance {} · {}",
                t.id, t.status, t.name, t.temperature, t.importance, t.size
            );
        }
        out.trim_end().to_string()
    }
}

/// Filters for `th thread list`.
#[derive(Debug, Default, Clone)]
pub struct ThreadFilter {
    pub status: Option<String>,
    pub group: Option<String>,
    pub tag: Option<String>,
}

pub fn thread_list(storage: &Storage, filter: &ThreadFilter) -> Result<ThreadList> {
    let status = filter.status.as_deref().map(parse_status).transpose()?;
    let group_id = filter
        .group
        .as_deref()
        .map(|g| resolve_group(storage, g))
        .transpose()?;

    let now = Utc::now();
    let threads: Vec<ThreadSummary> = storage
        .list_threads()?
        .into_iter()
        .filter(|t| status.is_none_or(|s| t.status == s))
        .filter(|t| group_id.is_none() || t.group_id == group_id)
        .filter(|t| {
            filter
                .tag
                .as_ref()
                .is_none_or(|tag| t.tags.iter().any(|x| x == tag))
        })
        .map(|t| ThreadSummary::from_thread(t, now))
        .collect();

    Ok(ThreadList {
        count: threads.len(),
        threads,
    })
}

// === Show ===

#[derive(Serialize)]
pub struct ThreadDetail {
    #[serde(flatten)]
    pub thread: Thread,
    pub temperature: Temperature,
}

impl Output for ThreadDetail {
    fn to_json(&self) -> String {
        json_of(self)
    }

    fn to_human(&self) -> String {
        let t = &self.thread;
        let mut out = format!("{} {}\n", t.id, t.name);
        let _ = writeln!(out, "  Status: {}", t.status);
        let _ = writeln!(out, "  Importance: {}", t.importance);
        let _ = writeln!(out, "  Size: {}", t.size);
        let _ = writeln!(out, "  Temperature: {}", self.temperature);
        if !t.description.is_empty() {
            let _ = writeln!(out, "  Description: {}", t.description);
        }
        if let Some(parent) = &t.parent_id {
            let _ = writeln!(out, "  Parent: {}", parent);
        }
        if let Some(group) = &t.group_id {
            let _ = writeln!(out, "  Group: {}", group);
        }
        if !t.tags.is_empty() {
            let _ = writeln!(out, "  Tags: {}", t.tags.join(", "));
        }
        if !t.dependencies.is_empty() {
            let _ = writeln!(out, "  Depends on: {}", t.dependencies.join(", "));
        }
        if let Some(details) = t.current_details() {
            let _ = writeln!(out, "  Details: {}", details.content);
        }
        let _ = writeln!(
            out,
            "  Updated: {}",
            t.updated_at.format("%Y-%m-%d %H:%M:%S UTC")
        );
        if !t.progress.is_empty() {
            let _ = writeln!(out, "  Progress:");
            for entry in &t.progress {
                let _ = writeln!(
                    out,
                    "    {} {}",
                    entry.timestamp.format("%Y-%m-%d %H:%M"),
                    entry.note
                );
            }
        }
        out.trim_end().to_string()
    }
}

pub fn thread_show(storage: &Storage, id: &str) -> Result<ThreadDetail> {
    let thread = get_thread(storage, id)?;
    Ok(ThreadDetail {
        temperature: thread.temperature_at(Utc::now()),
        thread,
    })
}

// === Update ===

/// Changes for `th thread update`.
///
/// `parent` and `group` are doubly optional: `Some(None)` clears the field.
#[derive(Debug, Default, Clone)]
pub struct ThreadUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub status: Option<String>,
    pub importance: Option<u8>,
    pub size: Option<String>,
    pub parent: Option<Option<String>>,
    pub group: Option<Option<String>>,
    pub add_tags: Vec<String>,
    pub remove_tags: Vec<String>,
}

#[derive(Serialize)]
pub struct Updated {
    pub id: String,
    pub updated_fields: Vec<String>,
}

impl Output for Updated {
    fn to_json(&self) -> String {
        json_of(self)
    }

    fn to_human(&self) -> String {
        if self.updated_fields.is_empty() {
            format!("No changes to {}", self.id)
        } else {
            format!("Updated {}: {}", self.id, self.updated_fields.join(", "))
        }
    }
}

pub fn thread_update(storage: &mut Storage, id: &str, update: ThreadUpdate) -> Result<Updated> {
    let mut thread = get_thread(storage, id)?;
    let mut updated_fields = Vec::new();

    if let Some(name) = update.name {
        thread.name = validate_name(&name)?;
        updated_fields.push("name".to_string());
    }
    if let Some(description) = update.description {
        thread.description = description;
        updated_fields.push("description".to_string());
    }
    if let Some(status) = update.status {
        thread.status = parse_status(&status)?;
        updated_fields.push("status".to_string());
    }
    if let Some(importance) = update.importance {
        thread.importance = validate_importance(importance)?;
        updated_fields.push("importance".to_string());
    }
    if let Some(size) = update.size {
        thread.size = parse_size(&size)?;
        updated_fields.push("size".to_string());
    }
    if let Some(parent) = update.parent {
        if let Some(parent_id) = parent.as_deref() {
            validate_parent(&storage.list_entities()?, Some(id), parent_id)?;
        }
        thread.parent_id = parent;
        updated_fields.push("parent".to_string());
    }
    if let Some(group) = update.group {
        thread.group_id = group
            .as_deref()
            .map(|g| resolve_group(storage, g))
            .transpose()?;
        updated_fields.push("group".to_string());
    }
    if !update.add_tags.is_empty() || !update.remove_tags.is_empty() {
        let mut tags = thread.tags.clone();
        tags.extend(update.add_tags);
        let mut tags = dedup_tags(tags);
        tags.retain(|t| !update.remove_tags.contains(t));
        thread.tags = tags;
        updated_fields.push("tags".to_string());
    }

    if !updated_fields.is_empty() {
        thread.updated_at = Utc::now();
        storage.update_entity(&Entity::Thread(thread))?;
        tracing::info!(id, fields = ?updated_fields, "updated thread");
    }

    Ok(Updated {
        id: id.to_string(),
        updated_fields,
    })
}

// === Progress ===

#[derive(Serialize)]
pub struct ProgressAdded {
    pub id: String,
    pub entry: ProgressEntry,
    pub count: usize,
}

impl Output for ProgressAdded {
    fn to_json(&self) -> String {
        json_of(self)
    }

    fn to_human(&self) -> String {
        format!(
            "Logged progress on {} ({} entr{})",
            self.id,
            self.count,
            if self.count == 1 { "y" } else { "ies" }
        )
    }
}

/// Append a note to a thread's progress log. This also warms the thread.
pub fn thread_progress(storage: &mut Storage, id: &str, note: &str) -> Result<ProgressAdded> {
    if note.trim().is_empty() {
        return Err(Error::InvalidInput("Progress note cannot be empty".to_string()));
    }
    let mut thread = get_thread(storage, id)?;
    let now = Utc::now();
    let entry = ProgressEntry {
        id: format!("{}-p{}", id, thread.progress.len() + 1),
        timestamp: now,
        note: note.to_string(),
    };
    thread.progress.push(entry.clone());
    thread.updated_at = now;
    let count = thread.progress.len();
    storage.update_entity(&Entity::Thread(thread))?;

    Ok(ProgressAdded {
        id: id.to_string(),
        entry,
        count,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Container, Group};
    use crate::test_utils::TestEnv;
    use chrono::Duration;

    fn params(name: &str) -> ThreadParams {
        ThreadParams {
            name: name.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_create_uses_config_defaults() {
        let env = TestEnv::new();
        let mut storage = env.init_storage();
        let mut config = ResolvedConfig::default();
        config.default_importance.value = 4;
        config.default_size.value = ThreadSize::Small;

        let created = thread_create(&mut storage, params("Write docs"), &config).unwrap();
        assert!(created.id.starts_with("th-"));

        let thread = get_thread(&storage, &created.id).unwrap();
        assert_eq!(thread.importance, 4);
        assert_eq!(thread.size, ThreadSize::Small);
        assert_eq!(thread.status, ThreadStatus::Active);
    }

    #[test]
    fn test_create_validates_fields() {
        let env = TestEnv::new();
        let mut storage = env.init_storage();
        let config = ResolvedConfig::default();

        let mut bad = params("X");
        bad.importance = Some(7);
        assert!(matches!(
            thread_create(&mut storage, bad, &config),
            Err(Error::InvalidInput(_))
        ));

        let mut bad = params("X");
        bad.parent = Some("th-ffffff".to_string());
        assert!(matches!(
            thread_create(&mut storage, bad, &config),
            Err(Error::NotFound(_))
        ));

        assert!(thread_create(&mut storage, params("   "), &config).is_err());
        assert!(storage.list_entities().unwrap().is_empty());
    }

    #[test]
    fn test_create_resolves_group_by_name() {
        let env = TestEnv::new();
        let mut storage = env.init_storage();
        storage
            .add_group(&Group::new("gr-00000a".to_string(), "Backend".to_string()))
            .unwrap();

        let mut p = params("API");
        p.group = Some("Backend".to_string());
        p.tags = vec!["#api".to_string(), "api".to_string(), "v2".to_string()];
        let created = thread_create(&mut storage, p, &ResolvedConfig::default()).unwrap();

        let thread = get_thread(&storage, &created.id).unwrap();
        assert_eq!(thread.group_id.as_deref(), Some("gr-00000a"));
        assert_eq!(thread.tags, vec!["api", "v2"]);
    }

    #[test]
    fn test_update_rejects_cycle() {
        let env = TestEnv::new();
        let mut storage = env.init_storage();
        let config = ResolvedConfig::default();
        let a = thread_create(&mut storage, params("A"), &config).unwrap().id;
        let mut p = params("B");
        p.parent = Some(a.clone());
        let b = thread_create(&mut storage, p, &config).unwrap().id;

        let update = ThreadUpdate {
            parent: Some(Some(b.clone())),
            ..Default::default()
        };
        assert!(matches!(
            thread_update(&mut storage, &a, update),
            Err(Error::CycleDetected)
        ));

        let update = ThreadUpdate {
            parent: Some(None),
            ..Default::default()
        };
        let result = thread_update(&mut storage, &b, update).unwrap();
        assert_eq!(result.updated_fields, vec!["parent"]);
        assert_eq!(get_thread(&storage, &b).unwrap().parent_id, None);
    }

    #[test]
    fn test_update_tags_and_status() {
        let env = TestEnv::new();
        let mut storage = env.init_storage();
        let mut p = params("Tagged");
        p.tags = vec!["a".to_string(), "b".to_string()];
        let id = thread_create(&mut storage, p, &ResolvedConfig::default())
            .unwrap()
            .id;

        let update = ThreadUpdate {
            status: Some("paused".to_string()),
            add_tags: vec!["c".to_string()],
            remove_tags: vec!["a".to_string()],
            ..Default::default()
        };
        thread_update(&mut storage, &id, update).unwrap();

        let thread = get_thread(&storage, &id).unwrap();
        assert_eq!(thread.status, ThreadStatus::Paused);
        assert_eq!(thread.tags, vec!["b", "c"]);
    }

    #[test]
    fn test_update_without_changes_is_noop() {
        let env = TestEnv::new();
        let mut storage = env.init_storage();
        let id = thread_create(&mut storage, params("Still"), &ResolvedConfig::default())
            .unwrap()
            .id;
        let before = get_thread(&storage, &id).unwrap().updated_at;

        let result = thread_update(&mut storage, &id, ThreadUpdate::default()).unwrap();
        assert!(result.updated_fields.is_empty());
        assert_eq!(get_thread(&storage, &id).unwrap().updated_at, before);
    }

    #[test]
    fn test_progress_warms_thread() {
        let env = TestEnv::new();
        let mut storage = env.init_storage();
        let mut thread = Thread::new("th-00000a".to_string(), "Old".to_string());
        thread.updated_at = Utc::now() - Duration::days(60);
        storage.add_entity(&Entity::Thread(thread)).unwrap();
        assert_eq!(
            thread_show(&storage, "th-00000a").unwrap().temperature,
            Temperature::Frozen
        );

        let added = thread_progress(&mut storage, "th-00000a", "picked it back up").unwrap();
        assert_eq!(added.count, 1);

        let shown = thread_show(&storage, "th-00000a").unwrap();
        assert_eq!(shown.temperature, Temperature::Hot);
        assert_eq!(shown.thread.progress[0].note, "picked it back up");
    }

    #[test]
    fn test_thread_commands_reject_containers() {
        let env = TestEnv::new();
        let mut storage = env.init_storage();
        storage
            .add_entity(&Entity::Container(Container::new(
                "ct-00000a".to_string(),
                "Box".to_string(),
            )))
            .unwrap();

        assert!(matches!(
            thread_show(&storage, "ct-00000a"),
            Err(Error::InvalidInput(_))
        ));
        assert!(thread_progress(&mut storage, "ct-00000a", "note").is_err());
    }

    #[test]
    fn test_list_filters() {
        let env = TestEnv::new();
        let mut storage = env.init_storage();
        let config = ResolvedConfig::default();
        let mut p = params("One");
        p.tags = vec!["x".to_string()];
        thread_create(&mut storage, p, &config).unwrap();
        let mut p = params("Two");
        p.status = Some("completed".to_string());
        thread_create(&mut storage, p, &config).unwrap();

        let all = thread_list(&storage, &ThreadFilter::default()).unwrap();
        assert_eq!(all.count, 2);

        let completed = thread_list(
            &storage,
            &ThreadFilter {
                status: Some("completed".to_string()),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(completed.threads[0].name, "Two");

        let tagged = thread_list(
            &storage,
            &ThreadFilter {
                tag: Some("x".to_string()),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(tagged.count, 1);
        assert_eq!(tagged.threads[0].name, "One");
    }
}
