//! Float slider slots (`FloatSlots`).

use crate::slots::{SlotKind, SlotSync, WidgetUpdate};
use bp_core::labels::MAIN;
use bp_core::slider::sanitize_step;
use bp_core::{FloatUpdate, MessageType, NodeId, SliderValue};

pub struct FloatKind;

impl SlotKind for FloatKind {
    type Value = SliderValue;
    const MESSAGE: MessageType = MessageType::FloatSlots;
    const PRIORITY: &'static [&'static str] = &[MAIN];

    fn fallback() -> Option<(&'static str, SliderValue)> {
        Some((MAIN, SliderValue::default()))
    }
}

pub type FloatSlots = SlotSync<FloatKind>;

impl SlotSync<FloatKind> {
    /// Slider or number-box input on `node`: snap against the node's range and
    /// push the value (not the range) to its group.
    pub fn set_value(&mut self, node: NodeId, input: f64) -> Vec<WidgetUpdate<SliderValue>> {
        if !input.is_finite() {
            return Vec::new();
        }
        let Some(current) = self.value(node) else {
            log::warn!("FloatSlots: value input on untracked node {node}");
            return Vec::new();
        };
        let value = current.snap(input);
        self.propagate_with(node, |v| v.value = value)
    }

    /// Min/max/step edit on `node`. Ignored unless `min < max`; the current
    /// value is clamped into the new range and both travel to the group.
    pub fn set_range(
        &mut self,
        node: NodeId,
        min: f64,
        max: f64,
        step: f64,
    ) -> Vec<WidgetUpdate<SliderValue>> {
        let Some(mut edited) = self.value(node).copied() else {
            log::warn!("FloatSlots: range input on untracked node {node}");
            return Vec::new();
        };
        if !edited.set_range(min, max, step) {
            log::debug!("FloatSlots: rejected range {min}..{max} on {node}");
            return Vec::new();
        }
        self.propagate_with(node, |v| *v = edited)
    }

    /// Apply inbound entries. Range fields are taken only when both `min` and
    /// `max` are present.
    pub fn apply_inbound(&mut self, updates: &[FloatUpdate]) -> Vec<WidgetUpdate<SliderValue>> {
        let mut out = Vec::new();
        for update in updates {
            let Some(title) = update.title.as_deref().filter(|t| !t.is_empty()) else {
                continue;
            };
            let Some(value) = update.value else {
                log::warn!("FloatSlots: entry {title:?} has no value; skipped");
                continue;
            };
            let range = update.min.zip(update.max);
            let step = update.step;
            out.extend(self.apply_to_label(title, |v| {
                v.value = value;
                if let Some((min, max)) = range {
                    v.min = min;
                    v.max = max;
                    if let Some(step) = step {
                        v.step = sanitize_step(step);
                    }
                }
            }));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bp_core::NodeMode;
    use pretty_assertions::assert_eq;

    fn slots_with(nodes: &[(i64, &str)]) -> FloatSlots {
        let mut slots = FloatSlots::new();
        for (id, title) in nodes {
            slots.add_node(NodeId(*id), title, NodeMode::Always, SliderValue::new(0.0, 0.0, 10.0, 2.0));
        }
        slots
    }

    #[test]
    fn value_input_snaps_and_propagates() {
        let mut slots = slots_with(&[(1, "A"), (2, "A"), (3, "B")]);
        let updates = slots.set_value(NodeId(1), 4.9);

        assert_eq!(updates.len(), 2);
        assert_eq!(slots.value(NodeId(1)).unwrap().value, 4.0);
        assert_eq!(slots.value(NodeId(2)).unwrap().value, 4.0);
        assert_eq!(slots.value(NodeId(3)).unwrap().value, 0.0);
    }

    #[test]
    fn value_input_clamps() {
        let mut slots = slots_with(&[(1, "A")]);
        slots.set_value(NodeId(1), 11.0);
        assert_eq!(slots.value(NodeId(1)).unwrap().value, 10.0);
        slots.set_value(NodeId(1), -3.0);
        assert_eq!(slots.value(NodeId(1)).unwrap().value, 0.0);
    }

    #[test]
    fn value_only_edit_keeps_member_ranges() {
        let mut slots = slots_with(&[(1, "A"), (2, "A")]);
        slots.apply_inbound(&[FloatUpdate {
            title: Some("A".into()),
            value: Some(2.0),
            min: Some(0.0),
            max: Some(4.0),
            step: Some(1.0),
        }]);
        slots.set_value(NodeId(1), 3.0);

        let v = slots.value(NodeId(2)).unwrap();
        assert_eq!((v.value, v.min, v.max, v.step), (3.0, 0.0, 4.0, 1.0));
    }

    #[test]
    fn range_edit_clamps_and_propagates_range() {
        let mut slots = slots_with(&[(1, "A"), (2, "A")]);
        slots.set_value(NodeId(1), 8.0);
        let updates = slots.set_range(NodeId(2), 0.0, 5.0, 0.0);

        assert_eq!(updates.len(), 2);
        for id in [1, 2] {
            let v = slots.value(NodeId(id)).unwrap();
            assert_eq!(*v, SliderValue::new(5.0, 0.0, 5.0, 0.01));
        }
    }

    #[test]
    fn inverted_range_is_ignored() {
        let mut slots = slots_with(&[(1, "A")]);
        assert!(slots.set_range(NodeId(1), 3.0, 3.0, 1.0).is_empty());
        assert_eq!(slots.value(NodeId(1)).unwrap().max, 10.0);
    }

    #[test]
    fn inbound_without_range_keeps_range() {
        let mut slots = slots_with(&[(1, "A")]);
        slots.apply_inbound(&[FloatUpdate {
            title: Some("A".into()),
            value: Some(6.0),
            min: Some(1.0),
            max: None,
            step: None,
        }]);
        assert_eq!(*slots.value(NodeId(1)).unwrap(), SliderValue::new(6.0, 0.0, 10.0, 2.0));
    }

    #[test]
    fn inbound_unknown_title_is_skipped() {
        let mut slots = slots_with(&[(1, "A")]);
        let updates = slots.apply_inbound(&[FloatUpdate {
            title: Some("ghost".into()),
            value: Some(1.0),
            min: None,
            max: None,
            step: None,
        }]);
        assert!(updates.is_empty());
    }
}
