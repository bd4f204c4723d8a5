//! Hierarchy assembly and tree rendering.
//!
//! Flat lists of threads, containers and groups go in; an ordered forest of
//! [`TreeNode`]s comes out, and [`render`] turns that forest into indented
//! display lines:
//!
//! ```text
//! Backend
//! ├── ▣ API [ct-4f2a1] #http
//! │   ├── Rate limiting [th-9c1e0] #http · warm · ★★★★☆
//! │   └── Auth tokens [th-77b3a] · frozen · ★★☆☆☆
//! └── Schema migration [th-0d5e2] · hot · ★★★★★
//!
//! Ungrouped
//! └── Read the paper [th-31aa0] · cold · ★☆☆☆☆
//!
//! ```
//!
//! Parent/child edges that cross a group boundary are cut: each group (and
//! the ungrouped bucket) is its own set of trees. Every entity shows up
//! exactly once, even when its references dangle or its parent chain loops.

mod builder;
mod index;
mod render;
pub mod style;

pub use builder::{Forest, build_forest, build_forest_with_warnings};
pub use index::HierarchyIndex;
pub use render::{Line, LineRole, UNGROUPED_HEADER, render, render_at, render_text};

use serde::Serialize;
use std::fmt;

use crate::models::{EntityRef, Group};

/// A node in the rendered forest.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "node", rename_all = "snake_case")]
pub enum TreeNode<'a> {
    /// A group header and the trees rooted inside it.
    Group {
        group: &'a Group,
        children: Vec<TreeNode<'a>>,
    },
    /// Everything without a resolvable group.
    Ungrouped { children: Vec<TreeNode<'a>> },
    /// A thread or container and its nested children.
    Entity {
        entity: EntityRef<'a>,
        children: Vec<TreeNode<'a>>,
    },
}

impl<'a> TreeNode<'a> {
    pub fn children(&self) -> &[TreeNode<'a>] {
        match self {
            TreeNode::Group { children, .. }
            | TreeNode::Ungrouped { children }
            | TreeNode::Entity { children, .. } => children,
        }
    }

    fn children_mut(&mut self) -> &mut Vec<TreeNode<'a>> {
        match self {
            TreeNode::Group { children, .. }
            | TreeNode::Ungrouped { children }
            | TreeNode::Entity { children, .. } => children,
        }
    }

    /// IDs of every entity under (and including) this node, in pre-order.
    pub fn entity_ids(&self) -> Vec<&'a str> {
        let mut ids = Vec::new();
        let mut pending = vec![self];
        while let Some(node) = pending.pop() {
            if let TreeNode::Entity { entity, .. } = node {
                ids.push(entity.id());
            }
            pending.extend(node.children().iter().rev());
        }
        ids
    }
}

// Parent chains can be arbitrarily long, so teardown flattens the subtree
// instead of letting each level drop the next.
impl Drop for TreeNode<'_> {
    fn drop(&mut self) {
        let mut pending = std::mem::take(self.children_mut());
        while let Some(mut node) = pending.pop() {
            pending.append(node.children_mut());
        }
    }
}

/// A non-fatal problem found while assembling the forest.
///
/// These never stop a build; the affected entity is placed on a best-effort
/// basis (as a root, or under Ungrouped).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DataQualityWarning {
    /// Two entities share an ID; the later one is kept.
    DuplicateId { id: String },
    /// Two groups share an ID; the later one is kept.
    DuplicateGroupId { id: String },
    /// The entity names a group that does not exist; it is shown as ungrouped.
    DanglingGroup { entity_id: String, group_id: String },
    /// The entity names a parent that does not exist; it is shown as a root.
    DanglingParent { entity_id: String, parent_id: String },
    /// The entity names itself as parent; it is shown as a root.
    SelfParent { entity_id: String },
    /// The entity sits on a parent cycle and was promoted to a root.
    CycleBroken { entity_id: String },
}

impl fmt::Display for DataQualityWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateId { id } => write!(f, "duplicate entity id {}", id),
            Self::DuplicateGroupId { id } => write!(f, "duplicate group id {}", id),
            Self::DanglingGroup {
                entity_id,
                group_id,
            } => write!(f, "{} references missing group {}", entity_id, group_id),
            Self::DanglingParent {
                entity_id,
                parent_id,
            } => write!(f, "{} references missing parent {}", entity_id, parent_id),
            Self::SelfParent { entity_id } => write!(f, "{} is its own parent", entity_id),
            Self::CycleBroken { entity_id } => {
                write!(f, "parent cycle broken at {}", entity_id)
            }
        }
    }
}
