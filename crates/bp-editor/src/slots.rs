//! Title-keyed slot synchronization, shared by every slot node kind.
//!
//! A `SlotSync` owns the title registry of one node kind plus the mirrored
//! widget state of each member node. Local edits are propagated to every node
//! in the same group; inbound wire entries are applied to every node whose
//! group label matches. Each mutation returns the `WidgetUpdate`s the host must
//! reflect into its widgets and DOM controls.

use bp_core::{
    Label, LastSent, MessageType, NodeId, NodeMode, Priority, SlotEntry, TitleRegistry, project,
};
use serde::Serialize;
use serde_json::value::RawValue;
use std::collections::HashMap;
use std::fmt;

/// Static description of one slot node kind.
pub trait SlotKind {
    /// Widget state mirrored for each node.
    type Value: Clone + PartialEq + fmt::Debug + Serialize;

    /// Envelope key of this kind's outbound list.
    const MESSAGE: MessageType;

    /// Labels that lead the outbound list, in order.
    const PRIORITY: &'static [&'static str];

    /// Labels offered first in the rename picker.
    const SUGGESTED: &'static [&'static str] = Self::PRIORITY;

    /// Entry injected when its label has no live group.
    fn fallback() -> Option<(&'static str, Self::Value)> {
        None
    }
}

/// Mirrored state of one member node.
#[derive(Debug, Clone, PartialEq)]
pub struct Member<V> {
    pub value: V,
    pub mode: NodeMode,
}

/// New widget state the host must write into a node.
#[derive(Debug, Clone, PartialEq)]
pub struct WidgetUpdate<V> {
    pub node: NodeId,
    pub value: V,
}

/// Registry, member state, and last-sent cache of one slot kind.
pub struct SlotSync<K: SlotKind> {
    registry: TitleRegistry,
    members: HashMap<NodeId, Member<K::Value>>,
    last_sent: LastSent,
}

impl<K: SlotKind> Default for SlotSync<K> {
    fn default() -> Self {
        Self {
            registry: TitleRegistry::new(),
            members: HashMap::new(),
            last_sent: LastSent::default(),
        }
    }
}

impl<K: SlotKind> SlotSync<K> {
    pub fn new() -> Self {
        Self::default()
    }

    // ─── Lifecycle ───────────────────────────────────────────────────────

    /// Register a node added to the graph under `title`.
    ///
    /// If the group already has members the new node adopts their state.
    pub fn add_node(
        &mut self,
        node: NodeId,
        title: &str,
        mode: NodeMode,
        value: K::Value,
    ) -> Vec<WidgetUpdate<K::Value>> {
        self.members.insert(node, Member { value, mode });
        self.rename(node, title)
    }

    /// Move a node to the group for `title`, adopting that group's state when
    /// it already has other members. The old group keeps its state.
    pub fn rename(&mut self, node: NodeId, title: &str) -> Vec<WidgetUpdate<K::Value>> {
        if !self.members.contains_key(&node) {
            log::warn!("{}: rename of untracked node {node}", K::MESSAGE);
            return Vec::new();
        }
        let label = Label::intern(title);
        self.registry.assign(node, label);

        let source = match self.registry.members_of(label) {
            [first, _, ..] if *first != node => *first,
            _ => return Vec::new(),
        };
        let Some(adopted) = self.members.get(&source).map(|m| m.value.clone()) else {
            return Vec::new();
        };
        log::debug!("{}: {node} joins {label:?}, adopting state of {source}", K::MESSAGE);
        self.write(node, adopted).into_iter().collect()
    }

    /// Forget a node removed from the graph. Returns `false` if it was unknown.
    pub fn remove_node(&mut self, node: NodeId) -> bool {
        self.registry.remove(node);
        self.members.remove(&node).is_some()
    }

    /// Record a node's execution mode. Returns `true` when it changed.
    pub fn set_mode(&mut self, node: NodeId, mode: NodeMode) -> bool {
        match self.members.get_mut(&node) {
            Some(member) if member.mode != mode => {
                member.mode = mode;
                true
            }
            _ => false,
        }
    }

    pub fn clear(&mut self) {
        self.registry.clear();
        self.members.clear();
        self.last_sent.reset();
    }

    // ─── Queries ─────────────────────────────────────────────────────────

    pub fn value(&self, node: NodeId) -> Option<&K::Value> {
        self.members.get(&node).map(|m| &m.value)
    }

    pub fn mode(&self, node: NodeId) -> Option<NodeMode> {
        self.members.get(&node).map(|m| m.mode)
    }

    pub fn label_of(&self, node: NodeId) -> Option<Label> {
        self.registry.label_of(node)
    }

    pub fn registry(&self) -> &TitleRegistry {
        &self.registry
    }

    /// Labels for the rename picker of this kind.
    pub fn suggestions(&self) -> Vec<String> {
        self.registry.suggestions(K::SUGGESTED)
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    // ─── Synchronizer ────────────────────────────────────────────────────

    /// Apply `edit` to `source` and every other member of its group.
    ///
    /// A source outside any group (unnamed) is edited alone.
    pub fn propagate_with(
        &mut self,
        source: NodeId,
        edit: impl Fn(&mut K::Value),
    ) -> Vec<WidgetUpdate<K::Value>> {
        if !self.members.contains_key(&source) {
            log::warn!("{}: edit from untracked node {source}", K::MESSAGE);
            return Vec::new();
        }
        let targets: Vec<NodeId> = match self.registry.peers_of(source) {
            [] => vec![source],
            peers => peers.to_vec(),
        };
        self.edit_all(&targets, edit)
    }

    // ─── Inbound applier ─────────────────────────────────────────────────

    /// Apply `edit` to every member of the group named `title`.
    ///
    /// Unknown labels are skipped: they belong to stale or foreign groups.
    pub fn apply_to_label(
        &mut self,
        title: &str,
        edit: impl Fn(&mut K::Value),
    ) -> Vec<WidgetUpdate<K::Value>> {
        let targets = match Label::get(title) {
            Some(label) => self.registry.members_of(label).to_vec(),
            None => Vec::new(),
        };
        if targets.is_empty() {
            log::debug!("{}: no group named {title:?}; skipped", K::MESSAGE);
            return Vec::new();
        }
        self.edit_all(&targets, edit)
    }

    fn edit_all(
        &mut self,
        targets: &[NodeId],
        edit: impl Fn(&mut K::Value),
    ) -> Vec<WidgetUpdate<K::Value>> {
        let mut updates = Vec::with_capacity(targets.len());
        for &node in targets {
            if let Some(member) = self.members.get_mut(&node) {
                edit(&mut member.value);
                updates.push(WidgetUpdate {
                    node,
                    value: member.value.clone(),
                });
            }
        }
        updates
    }

    fn write(&mut self, node: NodeId, value: K::Value) -> Option<WidgetUpdate<K::Value>> {
        let member = self.members.get_mut(&node)?;
        member.value = value;
        Some(WidgetUpdate {
            node,
            value: member.value.clone(),
        })
    }

    // ─── Outbound projector ──────────────────────────────────────────────

    /// Current payload of this kind, priority labels first.
    pub fn project(&self) -> Vec<SlotEntry<K::Value>> {
        project(
            &self.registry,
            |id| self.value(id).cloned(),
            |id| self.mode(id).is_some_and(NodeMode::is_active),
            Priority {
                labels: K::PRIORITY,
                fallback: K::fallback(),
            },
        )
    }

    /// Payload to hand to the channel, or `None` when it equals the last one
    /// handed over.
    /// The text keeps the field order of `SlotEntry`.
    pub fn outbound(&mut self) -> Option<Box<RawValue>> {
        let payload = match bp_core::to_payload(&self.project()) {
            Ok(payload) => payload,
            Err(e) => {
                log::error!("{}: cannot serialize payload: {e}", K::MESSAGE);
                return None;
            }
        };
        if self.last_sent.check_and_store(payload.get()) {
            Some(payload)
        } else {
            log::debug!("{}: payload unchanged; not sent", K::MESSAGE);
            None
        }
    }

    /// Forget the last payload so the next `outbound` always yields one.
    pub fn reset_last_sent(&mut self) {
        self.last_sent.reset();
    }
}
