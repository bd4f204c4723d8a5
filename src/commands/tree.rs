//! `th tree`: build, render and style the forest.

use chrono::Utc;
use serde::Serialize;

use super::{Output, json_of, partition};
use crate::Result;
use crate::storage::Storage;
use crate::tree::style::{LineStyle, paint_lines};
use crate::tree::{DataQualityWarning, TreeNode, build_forest_with_warnings, render_at};

/// Rendered tree plus its JSON form.
///
/// The forest borrows from data loaded inside [`tree`], so it is captured
/// as JSON before that data goes away.
#[derive(Serialize)]
pub struct TreeOutput {
    pub forest: serde_json::Value,
    pub warnings: Vec<DataQualityWarning>,
    #[serde(skip)]
    pub lines: Vec<String>,
    /// Name of the group the output was narrowed to
    #[serde(skip)]
    pub group: Option<String>,
}

impl Output for TreeOutput {
    fn to_json(&self) -> String {
        json_of(self)
    }

    fn to_human(&self) -> String {
        if self.lines.is_empty() {
            return match &self.group {
                Some(name) => format!("Group \"{}\" has no threads or containers.", name),
                None => "Nothing to show. Create a thread with `th thread new <name>`.".to_string(),
            };
        }
        self.lines.join("\n").trim_end().to_string()
    }
}

/// Build the tree for the whole repository, or for a single group.
pub fn tree(storage: &Storage, group: Option<&str>, style: &dyn LineStyle) -> Result<TreeOutput> {
    let selected = group.map(|g| storage.find_group(g)).transpose()?;

    let (threads, containers) = partition(storage.list_entities()?);
    let groups = storage.list_groups()?;
    tracing::debug!(
        threads = threads.len(),
        containers = containers.len(),
        groups = groups.len(),
        "building tree"
    );

    let built = build_forest_with_warnings(&threads, &groups, &containers);
    for warning in &built.warnings {
        tracing::warn!(%warning, "data quality problem while building tree");
    }

    let nodes: Vec<TreeNode<'_>> = match &selected {
        Some(selected) => built
            .nodes
            .into_iter()
            .filter(|node| matches!(node, TreeNode::Group { group, .. } if group.id == selected.id))
            .collect(),
        None => built.nodes,
    };

    let lines = paint_lines(&render_at(&nodes, Utc::now()), style);
    Ok(TreeOutput {
        forest: serde_json::to_value(&nodes)?,
        warnings: built.warnings,
        lines,
        group: selected.map(|g| g.name),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Container, Entity, Group, Thread};
    use crate::test_utils::TestEnv;
    use crate::tree::style::PlainStyle;

    fn seed(storage: &mut Storage) {
        storage
            .add_group(&Group::new("gr-00000a".to_string(), "Work".to_string()))
            .unwrap();
        let mut boxed = Container::new("ct-00000a".to_string(), "Infra".to_string());
        boxed.group_id = Some("gr-00000a".to_string());
        storage.add_entity(&Entity::Container(boxed)).unwrap();

        let mut child = Thread::new("th-00000a".to_string(), "Upgrade CI".to_string());
        child.group_id = Some("gr-00000a".to_string());
        child.parent_id = Some("ct-00000a".to_string());
        storage.add_entity(&Entity::Thread(child)).unwrap();

        let loose = Thread::new("th-00000b".to_string(), "Read paper".to_string());
        storage.add_entity(&Entity::Thread(loose)).unwrap();
    }

    #[test]
    fn test_tree_lines() {
        let env = TestEnv::new();
        let mut storage = env.init_storage();
        seed(&mut storage);

        let output = tree(&storage, None, &PlainStyle).unwrap();
        assert_eq!(
            output.lines,
            vec![
                "Work",
                "└── ▣ Infra [ct-00000]",
                "    └── Upgrade CI [th-00000] · hot · ★★★☆☆",
                "",
                "Ungrouped",
                "└── Read paper [th-00000] · hot · ★★★☆☆",
                "",
            ]
        );
        assert!(output.warnings.is_empty());
    }

    #[test]
    fn test_tree_json_shape() {
        let env = TestEnv::new();
        let mut storage = env.init_storage();
        seed(&mut storage);

        let output = tree(&storage, None, &PlainStyle).unwrap();
        let forest = output.forest.as_array().unwrap();
        assert_eq!(forest.len(), 2);
        assert_eq!(forest[0]["node"], "group");
        assert_eq!(forest[0]["group"]["name"], "Work");
        let container = &forest[0]["children"][0];
        assert_eq!(container["entity"]["type"], "container");
        assert_eq!(container["children"][0]["entity"]["id"], "th-00000a");
        assert_eq!(forest[1]["node"], "ungrouped");
    }

    #[test]
    fn test_tree_group_filter() {
        let env = TestEnv::new();
        let mut storage = env.init_storage();
        seed(&mut storage);

        let output = tree(&storage, Some("Work"), &PlainStyle).unwrap();
        assert_eq!(output.lines[0], "Work");
        assert!(!output.lines.iter().any(|l| l == "Ungrouped"));

        assert!(tree(&storage, Some("Missing"), &PlainStyle).is_err());
    }

    #[test]
    fn test_tree_reports_warnings() {
        let env = TestEnv::new();
        let mut storage = env.init_storage();
        let mut stray = Thread::new("th-00000c".to_string(), "Stray".to_string());
        stray.group_id = Some("gr-gone00".to_string());
        storage.add_entity(&Entity::Thread(stray)).unwrap();

        let output = tree(&storage, None, &PlainStyle).unwrap();
        assert_eq!(output.lines[0], "Ungrouped");
        assert_eq!(
            output.warnings,
            vec![DataQualityWarning::DanglingGroup {
                entity_id: "th-00000c".to_string(),
                group_id: "gr-gone00".to_string(),
            }]
        );
        assert!(output.to_json().contains("dangling_group"));
    }

    #[test]
    fn test_empty_group_names_the_group() {
        let env = TestEnv::new();
        let mut storage = env.init_storage();
        seed(&mut storage);
        storage
            .add_group(&Group::new("gr-00000b".to_string(), "Idle".to_string()))
            .unwrap();

        let output = tree(&storage, Some("Idle"), &PlainStyle).unwrap();
        assert!(output.lines.is_empty());
        assert_eq!(
            output.to_human(),
            "Group \"Idle\" has no threads or containers."
        );
    }

    #[test]
    fn test_empty_tree_human_hint() {
        let env = TestEnv::new();
        let storage = env.init_storage();
        let output = tree(&storage, None, &PlainStyle).unwrap();
        assert!(output.to_human().contains("th thread new"));
    }
}
