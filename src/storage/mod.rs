//! Storage layer for threads data.
//!
//! Data lives outside the repository, at `~/.local/share/threads/<repo-hash>/`
//! (or under `$TH_DATA_DIR` when set):
//!
//! - `entities.jsonl` - threads and containers, one JSON record per line
//! - `groups.jsonl` - groups
//! - `config.kdl` - session configuration
//! - `action.log` - JSONL audit trail of CLI invocations
//!
//! Writes append a full record; reads replay the file and keep the latest
//! record per ID, in order of first appearance. Deleting rewrites the file
//! without the record. Entity lines are read through the classifier, so
//! records written before the `"type"` tag existed still load.

use crate::config::ThreadsConfig;
use crate::models::{Container, Entity, Group, Thread};
use crate::{Error, Result};
use kdl::KdlDocument;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, ErrorKind, Write};
use std::path::{Path, PathBuf};

/// Overrides the base data directory.
pub const DATA_DIR_ENV: &str = "TH_DATA_DIR";

/// Overrides the system config directory.
pub const CONFIG_DIR_ENV: &str = "TH_CONFIG_DIR";

const ENTITIES_FILE: &str = "entities.jsonl";
const GROUPS_FILE: &str = "groups.jsonl";
const CONFIG_FILE: &str = "config.kdl";
const ACTION_LOG_FILE: &str = "action.log";

/// ID prefixes.
pub const THREAD_PREFIX: &str = "th";
pub const CONTAINER_PREFIX: &str = "ct";
pub const GROUP_PREFIX: &str = "gr";

/// Storage manager for a single repository.
#[derive(Debug)]
pub struct Storage {
    /// Root directory for this repository's data
    pub root: PathBuf,
}

impl Storage {
    /// Open existing storage for the given repository path.
    pub fn open(repo_path: &Path) -> Result<Self> {
        Self::open_with_data_dir(repo_path, &get_data_dir()?)
    }

    /// Open existing storage, using `data_dir` as the base data directory.
    pub fn open_with_data_dir(repo_path: &Path, data_dir: &Path) -> Result<Self> {
        let root = get_storage_dir_with_data_dir(repo_path, data_dir)?;
        if !root.join(ENTITIES_FILE).exists() {
            return Err(Error::NotInitialized);
        }
        Ok(Self { root })
    }

    /// Initialize storage for a repository. Safe to call more than once.
    pub fn init(repo_path: &Path) -> Result<Self> {
        Self::init_with_data_dir(repo_path, &get_data_dir()?)
    }

    /// Initialize storage, using `data_dir` as the base data directory.
    pub fn init_with_data_dir(repo_path: &Path, data_dir: &Path) -> Result<Self> {
        let root = get_storage_dir_with_data_dir(repo_path, data_dir)?;
        fs::create_dir_all(&root)?;

        for file in [ENTITIES_FILE, GROUPS_FILE] {
            let path = root.join(file);
            if !path.exists() {
                File::create(&path)?;
            }
        }

        tracing::info!(root = %root.display(), "initialized storage");
        Ok(Self { root })
    }

    /// Check if storage exists for the given repository.
    pub fn exists(repo_path: &Path) -> Result<bool> {
        Self::exists_with_data_dir(repo_path, &get_data_dir()?)
    }

    pub fn exists_with_data_dir(repo_path: &Path, data_dir: &Path) -> Result<bool> {
        let root = get_storage_dir_with_data_dir(repo_path, data_dir)?;
        Ok(root.join(ENTITIES_FILE).exists())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn entities_path(&self) -> PathBuf {
        self.root.join(ENTITIES_FILE)
    }

    fn groups_path(&self) -> PathBuf {
        self.root.join(GROUPS_FILE)
    }

    // === Entity Operations ===

    /// Add a new thread or container. Fails if the ID is taken.
    pub fn add_entity(&mut self, entity: &Entity) -> Result<()> {
        if self.find_entity(entity.id())?.is_some() {
            return Err(Error::InvalidInput(format!(
                "Entity already exists: {}",
                entity.id()
            )));
        }
        append_record(&self.entities_path(), entity)?;
        tracing::debug!(id = entity.id(), kind = %entity.kind(), "added entity");
        Ok(())
    }

    /// Get a thread or container by ID.
    pub fn get_entity(&self, id: &str) -> Result<Entity> {
        self.find_entity(id)?
            .ok_or_else(|| Error::NotFound(format!("Entity not found: {}", id)))
    }

    fn find_entity(&self, id: &str) -> Result<Option<Entity>> {
        Ok(self.list_entities()?.into_iter().find(|e| e.id() == id))
    }

    /// Replace an existing entity with a new version.
    pub fn update_entity(&mut self, entity: &Entity) -> Result<()> {
        self.get_entity(entity.id())?;
        append_record(&self.entities_path(), entity)?;
        tracing::debug!(id = entity.id(), "updated entity");
        Ok(())
    }

    /// Delete an entity. Other entities that point at it are left alone.
    pub fn delete_entity(&mut self, id: &str) -> Result<Entity> {
        let entities = self.list_entities()?;
        let Some(removed) = entities.iter().find(|e| e.id() == id).cloned() else {
            return Err(Error::NotFound(format!("Entity not found: {}", id)));
        };
        let kept: Vec<&Entity> = entities.iter().filter(|e| e.id() != id).collect();
        rewrite_records(&self.entities_path(), &kept)?;
        tracing::debug!(id, "deleted entity");
        Ok(removed)
    }

    /// All threads and containers, latest version of each.
    pub fn list_entities(&self) -> Result<Vec<Entity>> {
        replay(
            &self.entities_path(),
            |line| Entity::from_value(serde_json::from_str(line)?),
            |entity: &Entity| entity.id(),
        )
    }

    pub fn list_threads(&self) -> Result<Vec<Thread>> {
        Ok(self
            .list_entities()?
            .into_iter()
            .filter_map(|e| match e {
                Entity::Thread(t) => Some(t),
                Entity::Container(_) => None,
            })
            .collect())
    }

    pub fn list_containers(&self) -> Result<Vec<Container>> {
        Ok(self
            .list_entities()?
            .into_iter()
            .filter_map(|e| match e {
                Entity::Container(c) => Some(c),
                Entity::Thread(_) => None,
            })
            .collect())
    }

    // === Group Operations ===

    /// Add a new group. Fails if the ID is taken.
    pub fn add_group(&mut self, group: &Group) -> Result<()> {
        if self.list_groups()?.iter().any(|g| g.id == group.id) {
            return Err(Error::InvalidInput(format!(
                "Group already exists: {}",
                group.id
            )));
        }
        append_record(&self.groups_path(), group)?;
        tracing::debug!(id = %group.id, "added group");
        Ok(())
    }

    /// Get a group by ID.
    pub fn get_group(&self, id: &str) -> Result<Group> {
        self.list_groups()?
            .into_iter()
            .find(|g| g.id == id)
            .ok_or_else(|| Error::NotFound(format!("Group not found: {}", id)))
    }

    /// Find a group by ID, or failing that by exact name.
    pub fn find_group(&self, id_or_name: &str) -> Result<Group> {
        let groups = self.list_groups()?;
        groups
            .iter()
            .find(|g| g.id == id_or_name)
            .or_else(|| groups.iter().find(|g| g.name == id_or_name))
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("Group not found: {}", id_or_name)))
    }

    pub fn update_group(&mut self, group: &Group) -> Result<()> {
        self.get_group(&group.id)?;
        append_record(&self.groups_path(), group)?;
        Ok(())
    }

    /// Delete a group. Entities that reference it become ungrouped on display.
    pub fn delete_group(&mut self, id: &str) -> Result<Group> {
        let groups = self.list_groups()?;
        let Some(removed) = groups.iter().find(|g| g.id == id).cloned() else {
            return Err(Error::NotFound(format!("Group not found: {}", id)));
        };
        let kept: Vec<&Group> = groups.iter().filter(|g| g.id != id).collect();
        rewrite_records(&self.groups_path(), &kept)?;
        tracing::debug!(id, "deleted group");
        Ok(removed)
    }

    pub fn list_groups(&self) -> Result<Vec<Group>> {
        replay(
            &self.groups_path(),
            |line| Ok(serde_json::from_str::<Group>(line)?),
            |group: &Group| group.id.as_str(),
        )
    }

    // === Config ===

    /// Path to the session config.kdl for this repository.
    pub fn config_path(&self) -> PathBuf {
        self.root.join(CONFIG_FILE)
    }

    /// Read the session config. Missing file means empty config.
    pub fn read_config(&self) -> Result<ThreadsConfig> {
        read_config_file(&self.config_path())
    }

    pub fn write_config(&self, config: &ThreadsConfig) -> Result<()> {
        write_config_file(&self.config_path(), config)
    }

    /// Path to the system-wide config.kdl, if a config directory is known.
    pub fn system_config_path() -> Option<PathBuf> {
        match std::env::var_os(CONFIG_DIR_ENV) {
            Some(dir) => Some(PathBuf::from(dir).join(CONFIG_FILE)),
            None => dirs::config_dir().map(|d| d.join("threads").join(CONFIG_FILE)),
        }
    }

    /// Read the system config. Missing file means empty config.
    pub fn read_system_config() -> Result<ThreadsConfig> {
        match Self::system_config_path() {
            Some(path) => read_config_file(&path),
            None => Ok(ThreadsConfig::default()),
        }
    }

    /// Path to the action log for this repository.
    pub fn action_log_path(&self) -> PathBuf {
        self.root.join(ACTION_LOG_FILE)
    }
}

fn read_config_file(path: &Path) -> Result<ThreadsConfig> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(ThreadsConfig::default()),
        Err(e) => return Err(e.into()),
    };
    let doc: KdlDocument = content
        .parse()
        .map_err(|e| Error::Config(format!("Failed to parse KDL in {}: {}", path.display(), e)))?;
    Ok(ThreadsConfig::from_kdl(&doc))
}

fn write_config_file(path: &Path, config: &ThreadsConfig) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut doc = config.to_kdl();
    doc.autoformat();
    fs::write(path, doc.to_string())?;
    Ok(())
}

fn append_record<T: Serialize>(path: &Path, record: &T) -> Result<()> {
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    let json = serde_json::to_string(record)?;
    writeln!(file, "{}", json)?;
    Ok(())
}

/// Replace a JSONL file's contents via a temp file and rename.
fn rewrite_records<T: Serialize>(path: &Path, records: &[T]) -> Result<()> {
    let tmp = path.with_extension("jsonl.tmp");
    {
        let mut file = File::create(&tmp)?;
        for record in records {
            writeln!(file, "{}", serde_json::to_string(record)?)?;
        }
        file.sync_all()?;
    }
    fs::rename(&tmp, path)?;
    Ok(())
}

/// Read a JSONL file, keeping the latest record per ID in first-seen order.
fn replay<T>(
    path: &Path,
    parse: impl Fn(&str) -> Result<T>,
    id_of: impl Fn(&T) -> &str,
) -> Result<Vec<T>> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    let mut records: Vec<T> = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();
    for line in BufReader::new(file).lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let record = parse(&line)?;
        let existing = positions.get(id_of(&record)).copied();
        match existing {
            Some(pos) => records[pos] = record,
            None => {
                positions.insert(id_of(&record).to_string(), records.len());
                records.push(record);
            }
        }
    }
    Ok(records)
}

/// Base data directory: `$TH_DATA_DIR`, else the platform data dir + `threads`.
pub fn get_data_dir() -> Result<PathBuf> {
    if let Some(dir) = std::env::var_os(DATA_DIR_ENV) {
        return Ok(PathBuf::from(dir));
    }
    dirs::data_dir()
        .map(|d| d.join("threads"))
        .ok_or_else(|| Error::Other("Could not determine data directory".to_string()))
}

/// Get the storage directory for a repository.
pub fn get_storage_dir(repo_path: &Path) -> Result<PathBuf> {
    get_storage_dir_with_data_dir(repo_path, &get_data_dir()?)
}

/// Storage directory for a repository: `<data_dir>/<first 12 hex of sha256(path)>`.
pub fn get_storage_dir_with_data_dir(repo_path: &Path, data_dir: &Path) -> Result<PathBuf> {
    let repo_canonical = repo_path
        .canonicalize()
        .map_err(|e| Error::Other(format!("Could not canonicalize repo path: {}", e)))?;

    let mut hasher = Sha256::new();
    hasher.update(repo_canonical.to_string_lossy().as_bytes());
    let hash_hex = format!("{:x}", hasher.finalize());

    Ok(data_dir.join(&hash_hex[..12]))
}

/// Walk up from `start` looking for a directory containing `.git`.
pub fn find_git_root(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .find(|dir| dir.join(".git").exists())
        .map(Path::to_path_buf)
}

/// Generate a unique ID.
///
/// Format: `<prefix>-<6 hex chars>`
/// - Thread prefix: "th"
/// - Container prefix: "ct"
/// - Group prefix: "gr"
pub fn generate_id(prefix: &str, seed: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(seed.as_bytes());
    hasher.update(
        chrono::Utc::now()
            .timestamp_nanos_opt()
            .unwrap_or(0)
            .to_le_bytes(),
    );
    let hash_hex = format!("{:x}", hasher.finalize());
    format!("{}-{}", prefix, &hash_hex[..6])
}

/// Validate that an ID matches the expected format.
pub fn validate_id(id: &str, prefix: &str) -> Result<()> {
    let Some(suffix) = id.strip_prefix(prefix).and_then(|s| s.strip_prefix('-')) else {
        return Err(Error::InvalidId(format!(
            "ID must start with '{}-', got: {}",
            prefix, id
        )));
    };

    if suffix.len() != 6 || !suffix.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(Error::InvalidId(format!(
            "ID suffix must be 6 hex characters, got: {}",
            suffix
        )));
    }

    Ok(())
}
