//! Outbound projection: registry + member values → ordered slot payload.

use crate::id::{Label, NodeId};
use crate::registry::TitleRegistry;
use serde::Serialize;

/// One group as it goes out on the wire:
/// `{title, ids, <value fields>, active}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SlotEntry<V> {
    pub title: String,
    pub ids: Vec<NodeId>,
    #[serde(flatten)]
    pub value: V,
    pub active: u8,
}

/// Ordering and fallback rules of one slot kind.
#[derive(Debug, Clone, Copy)]
pub struct Priority<'a, V> {
    /// Labels that lead the payload, in this order.
    pub labels: &'a [&'a str],
    /// Entry injected (with no members) when its label has no live group.
    pub fallback: Option<(&'a str, V)>,
}

/// Build the outbound payload.
///
/// Each group contributes one entry valued from its first member (the
/// synchronizer keeps members identical). Groups whose representative has no
/// value are skipped. Priority labels lead; everything else keeps registry
/// order.
pub fn project<V, F, A>(
    registry: &TitleRegistry,
    value_of: F,
    is_active: A,
    priority: Priority<'_, V>,
) -> Vec<SlotEntry<V>>
where
    V: Clone,
    F: Fn(NodeId) -> Option<V>,
    A: Fn(NodeId) -> bool,
{
    let mut entries: Vec<SlotEntry<V>> = Vec::with_capacity(registry.snapshot().len() + 1);
    for group in registry.snapshot() {
        let Some(&first) = group.members.first() else {
            continue;
        };
        let Some(value) = value_of(first) else {
            log::warn!("slot {:?} has no value on {first}; skipped", group.label);
            continue;
        };
        let active = group.members.iter().any(|id| is_active(*id));
        entries.push(SlotEntry {
            title: group.label.as_str().to_string(),
            ids: group.members.to_vec(),
            value,
            active: u8::from(active),
        });
    }

    if let Some((label, value)) = priority.fallback
        && Label::get(label).is_none_or(|l| registry.members_of(l).is_empty())
    {
        entries.push(SlotEntry {
            title: label.to_string(),
            ids: Vec::new(),
            value,
            active: 0,
        });
    }

    let mut ordered = Vec::with_capacity(entries.len());
    for label in priority.labels {
        if let Some(pos) = entries.iter().position(|e| e.title == *label) {
            ordered.push(entries.remove(pos));
        }
    }
    ordered.extend(entries);
    ordered
}

/// Last payload handed to the channel for one message type.
///
/// Comparison is on the serialized text, so structurally equal payloads are
/// sent once.
#[derive(Debug, Default, Clone)]
pub struct LastSent {
    text: Option<String>,
}

impl LastSent {
    /// Returns `true` (and remembers `serialized`) when it differs from the
    /// previous payload.
    pub fn check_and_store(&mut self, serialized: &str) -> bool {
        if self.text.as_deref() == Some(serialized) {
            return false;
        }
        self.text = Some(serialized.to_string());
        true
    }

    /// Forget the cached payload so the next projection is always sent.
    pub fn reset(&mut self) {
        self.text = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::slider::SliderValue;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    fn titles<V>(entries: &[SlotEntry<V>]) -> Vec<&str> {
        entries.iter().map(|e| e.title.as_str()).collect()
    }

    #[test]
    fn priority_labels_lead_rest_keep_order() {
        let mut reg = TitleRegistry::new();
        reg.assign(NodeId(1), Label::intern("A"));
        reg.assign(NodeId(2), Label::intern("MAIN"));
        reg.assign(NodeId(3), Label::intern("B"));

        let entries = project(
            &reg,
            |_| Some(SliderValue::default()),
            |_| true,
            Priority {
                labels: &["MAIN"],
                fallback: Some(("MAIN", SliderValue::default())),
            },
        );
        assert_eq!(titles(&entries), vec!["MAIN", "A", "B"]);
        assert_eq!(entries[0].ids, vec![NodeId(2)]);
    }

    #[test]
    fn missing_main_gets_synthetic_entry() {
        let mut reg = TitleRegistry::new();
        reg.assign(NodeId(1), Label::intern("A"));

        let entries = project(
            &reg,
            |_| Some(SliderValue::new(3.0, 0.0, 10.0, 1.0)),
            |_| true,
            Priority {
                labels: &["MAIN"],
                fallback: Some(("MAIN", SliderValue::default())),
            },
        );
        assert_eq!(titles(&entries), vec!["MAIN", "A"]);
        let main = &entries[0];
        assert!(main.ids.is_empty());
        assert_eq!(main.value, SliderValue::new(0.5, 0.0, 1.0, 0.01));
        assert_eq!(main.active, 0);
    }

    #[test]
    fn active_when_any_member_active() {
        let mut reg = TitleRegistry::new();
        reg.assign(NodeId(1), Label::intern("A"));
        reg.assign(NodeId(2), Label::intern("A"));
        reg.assign(NodeId(3), Label::intern("B"));
        let modes: HashMap<NodeId, bool> =
            [(NodeId(1), false), (NodeId(2), true), (NodeId(3), false)].into();

        let entries = project(
            &reg,
            |_| Some(()),
            |id| modes[&id],
            Priority {
                labels: &[],
                fallback: None,
            },
        );
        assert_eq!(entries[0].active, 1);
        assert_eq!(entries[1].active, 0);
    }

    #[test]
    fn flattened_wire_shape() {
        let entry = SlotEntry {
            title: "MAIN".to_string(),
            ids: vec![NodeId(5)],
            value: SliderValue::new(0.25, 0.0, 1.0, 0.05),
            active: 1,
        };
        assert_eq!(
            serde_json::to_string(&entry).unwrap(),
            r#"{"title":"MAIN","ids":[5],"value":0.25,"min":0.0,"max":1.0,"step":0.05,"active":1}"#
        );
    }

    #[test]
    fn last_sent_suppresses_repeat() {
        let mut last = LastSent::default();
        assert!(last.check_and_store("[1]"));
        assert!(!last.check_and_store("[1]"));
        assert!(last.check_and_store("[2]"));
        last.reset();
        assert!(last.check_and_store("[2]"));
    }
}
