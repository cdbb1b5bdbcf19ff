//! Title registry: groups nodes of one kind by their user-assigned label.
//!
//! Every node belongs to at most one group. Groups are kept in the order their
//! label was first seen; a group that loses its last member is dropped, so a
//! label that comes back later is appended at the end.

use crate::id::{Label, NodeId};
use smallvec::SmallVec;
use std::collections::HashMap;

/// Members of one group, in registration order.
pub type Members = SmallVec<[NodeId; 4]>;

/// A label and the nodes currently using it.
#[derive(Debug, Clone, PartialEq)]
pub struct Group {
    pub label: Label,
    pub members: Members,
}

/// Label → ordered member set, plus the reverse node → label index.
#[derive(Debug, Default, Clone)]
pub struct TitleRegistry {
    groups: Vec<Group>,
    label_of: HashMap<NodeId, Label>,
}

impl TitleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Move `node` into the group for `label`, creating the group if needed.
    ///
    /// No-op when the node already uses `label`. An empty label only detaches
    /// the node: unnamed nodes do not form a group.
    pub fn assign(&mut self, node: NodeId, label: Label) {
        if self.label_of.get(&node) == Some(&label) {
            return;
        }
        self.remove(node);
        if label.is_empty() {
            return;
        }

        match self.groups.iter_mut().find(|g| g.label == label) {
            Some(group) => group.members.push(node),
            None => {
                let mut members = Members::new();
                members.push(node);
                self.groups.push(Group { label, members });
            }
        }
        self.label_of.insert(node, label);
    }

    /// Detach `node` from its group; drops the group if it becomes empty.
    /// Unknown nodes are ignored.
    pub fn remove(&mut self, node: NodeId) {
        let Some(label) = self.label_of.remove(&node) else {
            return;
        };
        if let Some(pos) = self.groups.iter().position(|g| g.label == label) {
            let group = &mut self.groups[pos];
            group.members.retain(|m| *m != node);
            if group.members.is_empty() {
                self.groups.remove(pos);
            }
        }
    }

    /// Members of `label`, in registration order. Empty for unknown labels.
    pub fn members_of(&self, label: Label) -> &[NodeId] {
        self.groups
            .iter()
            .find(|g| g.label == label)
            .map(|g| g.members.as_slice())
            .unwrap_or(&[])
    }

    /// The label `node` is registered under, if any.
    pub fn label_of(&self, node: NodeId) -> Option<Label> {
        self.label_of.get(&node).copied()
    }

    /// Members sharing `node`'s group (including `node` itself).
    pub fn peers_of(&self, node: NodeId) -> &[NodeId] {
        match self.label_of(node) {
            Some(label) => self.members_of(label),
            None => &[],
        }
    }

    /// All non-empty groups in first-seen order.
    pub fn snapshot(&self) -> &[Group] {
        &self.groups
    }

    pub fn contains(&self, node: NodeId) -> bool {
        self.label_of.contains_key(&node)
    }

    /// Number of registered nodes (not groups).
    pub fn len(&self) -> usize {
        self.label_of.len()
    }

    pub fn is_empty(&self) -> bool {
        self.label_of.is_empty()
    }

    /// Labels offered by the rename picker: `suggested` first (in the given
    /// order), then every other live label in registry order.
    pub fn suggestions(&self, suggested: &[&str]) -> Vec<String> {
        let mut out: Vec<String> = suggested.iter().map(|s| s.to_string()).collect();
        for group in &self.groups {
            let label = group.label.as_str();
            if !suggested.contains(&label) {
                out.push(label.to_string());
            }
        }
        out
    }

    pub fn clear(&mut self) {
        self.groups.clear();
        self.label_of.clear();
    }
}
