//! Group-toggle ("switcher") nodes: mute/bypass panels with one toggle per
//! group.
//!
//! The host reports a fresh snapshot of a switcher node after every UI event
//! that may have touched it. The tracker diffs it against the last record and
//! only reports a change when the record actually differs. The wire payload
//! is always the complete list of records.

use bp_core::{NodeId, Restriction, SwitcherUpdate, ToggleRecord, ToggleWidget};
use serde::Deserialize;
use serde_json::Value;

const RGTHREE_PREFIX: &str = "RGTHREE_";

/// A toggle widget as the host exposes it. Depending on the node class the
/// state lives in `toggle`, in `value.toggled`, or in `value` itself.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct HostWidget {
    pub name: String,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub toggle: Option<bool>,
    #[serde(default)]
    pub value: Option<Value>,
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn strip_verb(s: &str) -> String {
    s.replacen("Enable ", "", 1).replacen("Disable ", "", 1)
}

impl HostWidget {
    /// Name used on the wire. Generated `RGTHREE_*` widgets are known by
    /// their label; `None` means that label is not mounted yet.
    pub fn wire_name(&self) -> Option<String> {
        if self.name.starts_with(RGTHREE_PREFIX) {
            let label = strip_verb(self.label.as_deref().unwrap_or(""));
            (!label.is_empty()).then_some(label)
        } else {
            Some(strip_verb(&self.name))
        }
    }

    pub fn selected(&self) -> bool {
        if let Some(toggle) = self.toggle {
            return toggle;
        }
        match &self.value {
            Some(Value::Object(map)) if map.contains_key("toggled") => truthy(&map["toggled"]),
            Some(value) => truthy(value),
            None => false,
        }
    }
}

/// Everything the tracker needs to know about one switcher node.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SwitcherSnapshot {
    pub id: NodeId,
    pub title: String,
    #[serde(default)]
    pub restriction: Restriction,
    #[serde(default)]
    pub widgets: Vec<HostWidget>,
}

/// Result of diffing a snapshot against the last known record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Observation {
    pub changed: bool,
    /// Some widget label was missing; the node should be observed again.
    pub incomplete: bool,
}

/// A toggle the host must flip through the node's own mode-change action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModeChange {
    pub node: NodeId,
    pub widget: String,
    pub enabled: bool,
}

#[derive(Debug, Default)]
pub struct ToggleTracker {
    records: Vec<ToggleRecord>,
}

impl ToggleTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Diff a snapshot against the stored record and keep the new one.
    pub fn observe(&mut self, snapshot: &SwitcherSnapshot) -> Observation {
        let mut incomplete = false;
        let widgets = snapshot
            .widgets
            .iter()
            .map(|w| {
                let name = w.wire_name().unwrap_or_else(|| {
                    incomplete = true;
                    String::new()
                });
                ToggleWidget {
                    name,
                    selected: w.selected(),
                }
            })
            .collect();
        let record = ToggleRecord {
            id: snapshot.id,
            title: snapshot.title.clone(),
            restriction: snapshot.restriction,
            widgets,
        };

        let changed = match self.records.iter_mut().find(|r| r.id == snapshot.id) {
            Some(existing) if *existing == record => false,
            Some(existing) => {
                *existing = record;
                true
            }
            None => {
                self.records.push(record);
                true
            }
        };
        Observation {
            changed,
            incomplete,
        }
    }

    pub fn remove(&mut self, node: NodeId) -> bool {
        let before = self.records.len();
        self.records.retain(|r| r.id != node);
        self.records.len() != before
    }

    pub fn contains(&self, node: NodeId) -> bool {
        self.records.iter().any(|r| r.id == node)
    }

    pub fn records(&self) -> &[ToggleRecord] {
        &self.records
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Advance a node's restriction mode. The host persists the returned mode
    /// on the node.
    pub fn cycle_restriction(&mut self, node: NodeId) -> Option<Restriction> {
        let record = self.records.iter_mut().find(|r| r.id == node)?;
        record.restriction = record.restriction.next();
        Some(record.restriction)
    }

    /// Toggles to flip so the node matches `update`. Widgets already in the
    /// requested state are left alone, so echoes of our own payload are inert.
    pub fn apply_inbound(&self, update: &SwitcherUpdate) -> Vec<ModeChange> {
        let Some(record) = self.records.iter().find(|r| r.id == update.switcher_id) else {
            log::warn!("switchers: node {} not found", update.switcher_id);
            return Vec::new();
        };

        let mut changes = Vec::new();
        for remote in &update.widgets {
            match record.widgets.iter().find(|w| w.name == remote.name) {
                Some(local) if local.selected != remote.selected => changes.push(ModeChange {
                    node: record.id,
                    widget: remote.name.clone(),
                    enabled: remote.selected,
                }),
                Some(_) => {}
                None => log::warn!(
                    "switchers: no widget {:?} on node {}",
                    remote.name,
                    record.id
                ),
            }
        }
        changes
    }
}
