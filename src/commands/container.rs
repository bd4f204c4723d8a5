//! Container commands.

use serde::Serialize;
use std::fmt::Write as _;

use super::{Created, Output, json_of, resolve_group, validate_name, validate_parent};
use crate::Result;
use crate::models::{Container, Entity, EntityKind};
use crate::storage::Storage;

/// Fields for a new container.
#[derive(Debug, Default, Clone)]
pub struct ContainerParams {
    pub name: String,
    pub description: Option<String>,
    pub parent: Option<String>,
    pub group: Option<String>,
    pub tags: Vec<String>,
}

pub fn container_create(storage: &mut Storage, params: ContainerParams) -> Result<Created> {
    let name = validate_name(&params.name)?;
    if let Some(parent) = params.parent.as_deref() {
        validate_parent(&storage.list_entities()?, None, parent)?;
    }
    let group_id = params
        .group
        .as_deref()
        .map(|g| resolve_group(storage, g))
        .transpose()?;

    let id = super::new_entity_id(storage, EntityKind::Container, &name)?;
    let mut container = Container::new(id.clone(), name.clone());
    container.description = params.description.unwrap_or_default();
    container.parent_id = params.parent;
    container.group_id = group_id;
    container.tags = params.tags;

    storage.add_entity(&Entity::Container(container))?;
    tracing::info!(%id, "created container");

    Ok(Created {
        id,
        kind: EntityKind::Container,
        name,
    })
}

#[derive(Serialize)]
pub struct ContainerList {
    pub containers: Vec<Container>,
    pub count: usize,
}

impl Output for ContainerList {
    fn to_json(&self) -> String {
        json_of(self)
    }

    fn to_human(&self) -> String {
        if self.containers.is_empty() {
            return "No containers found.".to_string();
        }
        let mut out = format!("{} container(s):\n", self.count);
        for c in &self.containers {
            let _ = write!(out, "  {} {}", c.id, c.name);
            if let Some(parent) = &c.parent_id {
                let _ = write!(out, " (in {})", parent);
            }
            out.push('\n');
        }
        out.trim_end().to_string()
    }
}

pub fn container_list(storage: &Storage) -> Result<ContainerList> {
    let containers = storage.list_containers()?;
    Ok(ContainerList {
        count: containers.len(),
        containers,
    })
}
