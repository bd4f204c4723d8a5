//! Group commands.

use chrono::Utc;
use serde::Serialize;
use std::fmt::Write as _;

use super::{Output, json_of, validate_name};
use crate::models::{Entity, Group};
use crate::storage::Storage;
use crate::{Error, Result};

#[derive(Serialize)]
pub struct GroupCreated {
    pub id: String,
    pub name: String,
}

impl Output for GroupCreated {
    fn to_json(&self) -> String {
        json_of(self)
    }

    fn to_human(&self) -> String {
        format!("Created group {} \"{}\"", self.id, self.name)
    }
}

/// Create a group. Names must be unique so they can be used as references.
pub fn group_create(
    storage: &mut Storage,
    name: &str,
    description: Option<String>,
) -> Result<GroupCreated> {
    let name = validate_name(name)?;
    if storage.list_groups()?.iter().any(|g| g.name == name) {
        return Err(Error::InvalidInput(format!(
            "A group named \"{}\" already exists",
            name
        )));
    }

    let id = super::new_group_id(storage, &name)?;
    let mut group = Group::new(id.clone(), name.clone());
    group.description = description.unwrap_or_default();
    group.updated_at = Utc::now();
    storage.add_group(&group)?;
    tracing::info!(%id, "created group");

    Ok(GroupCreated { id, name })
}

#[derive(Serialize)]
pub struct GroupSummary {
    #[serde(flatten)]
    pub group: Group,
    pub members: usize,
}

#[derive(Serialize)]
pub struct GroupList {
    pub groups: Vec<GroupSummary>,
    pub count: usize,
}

impl Output for GroupList {
    fn to_json(&self) -> String {
        json_of(self)
    }

    fn to_human(&self) -> String {
        if self.groups.is_empty() {
            return "No groups found.".to_string();
        }
        let mut out = format!("{} group(s):\n", self.count);
        for summary in &self.groups {
            let _ = writeln!(
                out,
                "  {} {} ({} member{})",
                summary.group.id,
                summary.group.name,
                summary.members,
                if summary.members == 1 { "" } else { "s" }
            );
        }
        out.trim_end().to_string()
    }
}

/// Groups sorted by name, with member counts.
pub fn group_list(storage: &Storage) -> Result<GroupList> {
    let entities = storage.list_entities()?;
    let mut groups: Vec<GroupSummary> = storage
        .list_groups()?
        .into_iter()
        .map(|group| GroupSummary {
            members: entities
                .iter()
                .filter(|e| e.group_id() == Some(group.id.as_str()))
                .count(),
            group,
        })
        .collect();
    groups.sort_by(|a, b| a.group.name.cmp(&b.group.name));

    Ok(GroupList {
        count: groups.len(),
        groups,
    })
}

#[derive(Serialize)]
pub struct GroupRemoved {
    pub id: String,
    pub name: String,
    /// Former members, now shown under Ungrouped
    pub ungrouped: usize,
}

impl Output for GroupRemoved {
    fn to_json(&self) -> String {
        json_of(self)
    }

    fn to_human(&self) -> String {
        format!(
            "Removed group {} \"{}\" ({} member(s) now ungrouped)",
            self.id, self.name, self.ungrouped
        )
    }
}

/// Remove a group and clear it from its members.
pub fn group_remove(storage: &mut Storage, id_or_name: &str) -> Result<GroupRemoved> {
    let group = storage.find_group(id_or_name)?;
    let members: Vec<Entity> = storage
        .list_entities()?
        .into_iter()
        .filter(|e| e.group_id() == Some(group.id.as_str()))
        .collect();

    let now = Utc::now();
    for mut entity in members.iter().cloned() {
        entity.set_group_id(None);
        entity.touch(now);
        storage.update_entity(&entity)?;
    }
    storage.delete_group(&group.id)?;
    tracing::info!(id = %group.id, members = members.len(), "removed group");

    Ok(GroupRemoved {
        id: group.id,
        name: group.name,
        ungrouped: members.len(),
    })
}
