//! Lookup tables over flat entity and group lists.

use std::collections::HashMap;

use super::DataQualityWarning;
use crate::models::{Container, EntityRef, Group, Thread};

/// Entities by ID and by group, plus groups by ID.
///
/// Built fresh from borrowed inputs; nothing is copied or mutated. Threads
/// are indexed before containers, and that combined order is the "input
/// order" used everywhere downstream.
#[derive(Debug)]
pub struct HierarchyIndex<'a> {
    entity_by_id: HashMap<&'a str, EntityRef<'a>>,
    entities_by_group: HashMap<Option<&'a str>, Vec<EntityRef<'a>>>,
    group_by_id: HashMap<&'a str, &'a Group>,
    groups: Vec<&'a Group>,
    warnings: Vec<DataQualityWarning>,
}

impl<'a> HierarchyIndex<'a> {
    pub fn new(threads: &'a [Thread], containers: &'a [Container], groups: &'a [Group]) -> Self {
        let mut warnings = Vec::new();

        // Groups: last definition of an id wins, first position is kept.
        let mut group_by_id: HashMap<&'a str, &'a Group> = HashMap::new();
        let mut group_order: Vec<&'a str> = Vec::new();
        for group in groups {
            if group_by_id.insert(group.id.as_str(), group).is_some() {
                warnings.push(DataQualityWarning::DuplicateGroupId {
                    id: group.id.clone(),
                });
            } else {
                group_order.push(group.id.as_str());
            }
        }
        let groups = group_order.iter().map(|id| group_by_id[id]).collect();

        // Entities: same rule.
        let all = threads
            .iter()
            .map(EntityRef::Thread)
            .chain(containers.iter().map(EntityRef::Container));
        let mut entity_by_id: HashMap<&'a str, EntityRef<'a>> = HashMap::new();
        let mut entity_order: Vec<&'a str> = Vec::new();
        for entity in all {
            if entity_by_id.insert(entity.id(), entity).is_some() {
                warnings.push(DataQualityWarning::DuplicateId {
                    id: entity.id().to_string(),
                });
            } else {
                entity_order.push(entity.id());
            }
        }

        let mut entities_by_group: HashMap<Option<&'a str>, Vec<EntityRef<'a>>> = HashMap::new();
        for id in &entity_order {
            let entity = entity_by_id[id];

            let bucket = match entity.group_id() {
                Some(group_id) if group_by_id.contains_key(group_id) => Some(group_id),
                Some(group_id) => {
                    warnings.push(DataQualityWarning::DanglingGroup {
                        entity_id: entity.id().to_string(),
                        group_id: group_id.to_string(),
                    });
                    None
                }
                None => None,
            };

            match entity.parent_id() {
                Some(parent_id) if parent_id == entity.id() => {
                    warnings.push(DataQualityWarning::SelfParent {
                        entity_id: entity.id().to_string(),
                    });
                }
                Some(parent_id) if !entity_by_id.contains_key(parent_id) => {
                    warnings.push(DataQualityWarning::DanglingParent {
                        entity_id: entity.id().to_string(),
                        parent_id: parent_id.to_string(),
                    });
                }
                _ => {}
            }

            entities_by_group.entry(bucket).or_default().push(entity);
        }

        Self {
            entity_by_id,
            entities_by_group,
            group_by_id,
            groups,
            warnings,
        }
    }

    pub fn entity(&self, id: &str) -> Option<EntityRef<'a>> {
        self.entity_by_id.get(id).copied()
    }

    pub fn group(&self, id: &str) -> Option<&'a Group> {
        self.group_by_id.get(id).copied()
    }

    /// Distinct groups in input order.
    pub fn groups(&self) -> &[&'a Group] {
        &self.groups
    }

    /// Entities in a group bucket, in input order.
    ///
    /// `None` is the ungrouped bucket. It also holds entities whose group ID
    /// does not resolve.
    pub fn bucket(&self, group_id: Option<&'a str>) -> &[EntityRef<'a>] {
        self.entities_by_group
            .get(&group_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.entity_by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entity_by_id.is_empty()
    }

    pub fn warnings(&self) -> &[DataQualityWarning] {
        &self.warnings
    }

    pub fn into_warnings(self) -> Vec<DataQualityWarning> {
        self.warnings
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn thread(id: &str, parent: Option<&str>, group: Option<&str>) -> Thread {
        let mut t = Thread::new(id.to_string(), format!("Thread {}", id));
        t.parent_id = parent.map(str::to_string);
        t.group_id = group.map(str::to_string);
        t
    }

    fn group(id: &str, name: &str) -> Group {
        Group::new(id.to_string(), name.to_string())
    }

    fn ids(entities: &[EntityRef<'_>]) -> Vec<String> {
        entities.iter().map(|e| e.id().to_string()).collect()
    }

    #[test]
    fn test_buckets_preserve_input_order() {
        let threads = vec![
            thread("t1", None, Some("g1")),
            thread("t2", None, None),
            thread("t3", None, Some("g1")),
        ];
        let containers = vec![Container::new("c1".to_string(), "Box".to_string())];
        let groups = vec![group("g1", "Alpha")];

        let index = HierarchyIndex::new(&threads, &containers, &groups);

        assert_eq!(ids(index.bucket(Some("g1"))), vec!["t1", "t3"]);
        assert_eq!(ids(index.bucket(None)), vec!["t2", "c1"]);
        assert_eq!(index.len(), 4);
        assert!(index.warnings().is_empty());
    }

    #[test]
    fn test_dangling_group_folds_into_ungrouped() {
        let threads = vec![thread("t1", None, Some("ghost"))];
        let index = HierarchyIndex::new(&threads, &[], &[]);

        assert_eq!(ids(index.bucket(None)), vec!["t1"]);
        assert!(index.bucket(Some("ghost")).is_empty());
        assert_eq!(
            index.warnings(),
            &[DataQualityWarning::DanglingGroup {
                entity_id: "t1".to_string(),
                group_id: "ghost".to_string(),
            }]
        );
    }

    #[test]
    fn test_duplicate_ids_last_write_wins() {
        let mut second = thread("t1", None, None);
        second.name = "Second".to_string();
        let threads = vec![thread("t1", None, None), thread("t2", None, None), second];

        let index = HierarchyIndex::new(&threads, &[], &[]);

        assert_eq!(index.len(), 2);
        assert_eq!(index.entity("t1").unwrap().name(), "Second");
        assert_eq!(ids(index.bucket(None)), vec!["t1", "t2"]);
        assert_eq!(
            index.warnings(),
            &[DataQualityWarning::DuplicateId {
                id: "t1".to_string()
            }]
        );
    }

    #[test]
    fn test_duplicate_groups_are_collapsed() {
        let groups = vec![group("g1", "Old"), group("g2", "Other"), group("g1", "New")];
        let index = HierarchyIndex::new(&[], &[], &groups);

        let names: Vec<&str> = index.groups().iter().map(|g| g.name.as_str()).collect();
        assert_eq!(names, vec!["New", "Other"]);
        assert_eq!(index.group("g1").unwrap().name, "New");
    }

    #[test]
    fn test_parent_warnings() {
        let threads = vec![thread("t1", Some("t1"), None), thread("t2", Some("nope"), None)];
        let index = HierarchyIndex::new(&threads, &[], &[]);

        assert!(index.warnings().contains(&DataQualityWarning::SelfParent {
            entity_id: "t1".to_string()
        }));
        assert!(index.warnings().contains(&DataQualityWarning::DanglingParent {
            entity_id: "t2".to_string(),
            parent_id: "nope".to_string(),
        }));
    }
}
