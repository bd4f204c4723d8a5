//! Forest reconstruction from indexed entities.

use std::collections::{HashMap, HashSet};

use serde::Serialize;

use super::index::HierarchyIndex;
use super::{DataQualityWarning, TreeNode};
use crate::models::{Container, EntityRef, Group, Thread};

/// A built forest together with everything odd noticed while building it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Forest<'a> {
    pub nodes: Vec<TreeNode<'a>>,
    pub warnings: Vec<DataQualityWarning>,
}

/// Build the display forest, logging any data quality warnings.
///
/// Groups come first, sorted by name; the ungrouped bucket comes last. Groups
/// with no entities are left out entirely.
pub fn build_forest<'a>(
    threads: &'a [Thread],
    groups: &'a [Group],
    containers: &'a [Container],
) -> Vec<TreeNode<'a>> {
    let forest = build_forest_with_warnings(threads, groups, containers);
    for warning in &forest.warnings {
        tracing::warn!(%warning, "data quality problem while building tree");
    }
    forest.nodes
}

/// Build the display forest and hand the warnings back instead of logging.
pub fn build_forest_with_warnings<'a>(
    threads: &'a [Thread],
    groups: &'a [Group],
    containers: &'a [Container],
) -> Forest<'a> {
    let index = HierarchyIndex::new(threads, containers, groups);
    let mut warnings = Vec::new();

    // Stable: equal names keep their input order.
    let mut sorted_groups: Vec<&'a Group> = index.groups().to_vec();
    sorted_groups.sort_by(|a, b| a.name.cmp(&b.name));

    let mut nodes = Vec::new();
    for group in sorted_groups {
        let bucket = index.bucket(Some(group.id.as_str()));
        if bucket.is_empty() {
            continue;
        }
        nodes.push(TreeNode::Group {
            group,
            children: build_bucket(bucket, &mut warnings),
        });
    }

    let ungrouped = index.bucket(None);
    if !ungrouped.is_empty() {
        nodes.push(TreeNode::Ungrouped {
            children: build_bucket(ungrouped, &mut warnings),
        });
    }

    tracing::debug!(
        entities = index.len(),
        top_level = nodes.len(),
        "built forest"
    );

    let mut all_warnings = index.into_warnings();
    all_warnings.extend(warnings);
    Forest {
        nodes,
        warnings: all_warnings,
    }
}

/// Arrange one bucket (a group, or ungrouped) into trees.
///
/// Roots are entities whose parent is unset, outside this bucket, or the
/// entity itself. Anything left unplaced after walking down from the roots
/// sits on a parent cycle; those are promoted to roots in input order, which
/// cuts each cycle at its first member.
fn build_bucket<'a>(
    bucket: &[EntityRef<'a>],
    warnings: &mut Vec<DataQualityWarning>,
) -> Vec<TreeNode<'a>> {
    let members: HashSet<&'a str> = bucket.iter().map(|e| e.id()).collect();

    let mut children_of: HashMap<&'a str, Vec<EntityRef<'a>>> = HashMap::new();
    let mut roots = Vec::new();
    for entity in bucket {
        match entity.parent_id() {
            Some(parent_id) if parent_id != entity.id() && members.contains(parent_id) => {
                children_of.entry(parent_id).or_default().push(*entity);
            }
            _ => roots.push(*entity),
        }
    }

    let mut placed: HashSet<&'a str> = HashSet::with_capacity(bucket.len());
    let mut nodes: Vec<TreeNode<'a>> = roots
        .into_iter()
        .map(|root| attach(root, &children_of, &mut placed))
        .collect();

    for entity in bucket {
        if !placed.contains(entity.id()) {
            warnings.push(DataQualityWarning::CycleBroken {
                entity_id: entity.id().to_string(),
            });
            nodes.push(attach(*entity, &children_of, &mut placed));
        }
    }

    nodes
}

/// An entity whose children are still being attached.
struct Frame<'a, 'm> {
    entity: EntityRef<'a>,
    kids: &'m [EntityRef<'a>],
    next: usize,
    children: Vec<TreeNode<'a>>,
}

impl<'a, 'm> Frame<'a, 'm> {
    fn new(entity: EntityRef<'a>, children_of: &'m HashMap<&'a str, Vec<EntityRef<'a>>>) -> Self {
        Self {
            entity,
            kids: children_of.get(entity.id()).map(Vec::as_slice).unwrap_or(&[]),
            next: 0,
            children: Vec::new(),
        }
    }

    fn next_kid(&mut self) -> Option<EntityRef<'a>> {
        let kid = self.kids.get(self.next).copied();
        self.next += 1;
        kid
    }

    fn into_node(self) -> TreeNode<'a> {
        TreeNode::Entity {
            entity: self.entity,
            children: self.children,
        }
    }
}

/// Grow the subtree under `root` depth-first with an explicit stack, so
/// chain length is bounded by memory rather than by the call stack.
fn attach<'a>(
    root: EntityRef<'a>,
    children_of: &HashMap<&'a str, Vec<EntityRef<'a>>>,
    placed: &mut HashSet<&'a str>,
) -> TreeNode<'a> {
    placed.insert(root.id());
    let mut current = Frame::new(root, children_of);
    let mut ancestors: Vec<Frame<'a, '_>> = Vec::new();

    loop {
        if let Some(kid) = current.next_kid() {
            if placed.insert(kid.id()) {
                let parent = std::mem::replace(&mut current, Frame::new(kid, children_of));
                ancestors.push(parent);
            }
            continue;
        }

        let node = current.into_node();
        match ancestors.pop() {
            Some(mut parent) => {
                parent.children.push(node);
                current = parent;
            }
            None => return node,
        }
    }
}
