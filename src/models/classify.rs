//! Thread/Container discrimination.
//!
//! Stored records carry a `"type"` tag, but older records do not, so the tag
//! is only a hint: a record without one is classified by its shape. Fields
//! that only a thread has (lifecycle and momentum) mark a thread; a record
//! with none of them is a container.

use serde_json::Value;

use super::{Container, Entity, EntityKind, Thread};
use crate::{Error, Result};

/// Fields only a thread carries.
const THREAD_ONLY_FIELDS: [&str; 3] = ["importance", "size", "status"];

const CONTAINER_TAG: &str = "container";

/// Whether the entity is a container.
pub fn is_container(entity: &Entity) -> bool {
    matches!(entity, Entity::Container(_))
}

/// Whether the entity is a thread.
pub fn is_thread(entity: &Entity) -> bool {
    matches!(entity, Entity::Thread(_))
}

/// Decide which kind an untyped record is.
///
/// An explicit `"type": "container"` wins; any other string tag means thread.
/// Without a tag, any thread-only field means thread, otherwise container.
/// Records that are not objects or have no string `id` are malformed.
pub fn classify(value: &Value) -> Result<EntityKind> {
    let Some(object) = value.as_object() else {
        return Err(Error::MalformedEntity {
            id: None,
            reason: "record is not a JSON object".to_string(),
        });
    };

    let Some(id) = object.get("id").and_then(Value::as_str) else {
        return Err(Error::MalformedEntity {
            id: None,
            reason: "record has no string id".to_string(),
        });
    };
    if id.trim().is_empty() {
        return Err(Error::MalformedEntity {
            id: None,
            reason: "record has an empty id".to_string(),
        });
    }

    if let Some(tag) = object.get("type").and_then(Value::as_str) {
        return Ok(if tag.eq_ignore_ascii_case(CONTAINER_TAG) {
            EntityKind::Container
        } else {
            EntityKind::Thread
        });
    }

    let has_thread_fields = THREAD_ONLY_FIELDS
        .iter()
        .any(|field| object.get(*field).is_some_and(|v| !v.is_null()));

    Ok(if has_thread_fields {
        EntityKind::Thread
    } else {
        EntityKind::Container
    })
}

impl Entity {
    /// Classify and deserialize an untyped record.
    pub fn from_value(value: Value) -> Result<Self> {
        let kind = classify(&value)?;
        let id = value
            .get("id")
            .and_then(Value::as_str)
            .map(str::to_string);

        let malformed = |e: serde_json::Error| Error::MalformedEntity {
            id: id.clone(),
            reason: format!("invalid {} record: {}", kind, e),
        };

        match kind {
            EntityKind::Thread => serde_json::from_value::<Thread>(value)
                .map(Entity::Thread)
                .map_err(malformed),
            EntityKind::Container => serde_json::from_value::<Container>(value)
                .map(Entity::Container)
                .map_err(malformed),
        }
    }
}
