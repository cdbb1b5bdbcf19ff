//! Integration tests: slot engines over the shared registry and projector
//! (bp-editor ↔ bp-core).

use bp_core::{NodeId, NodeMode, SliderValue, TextValue};
use bp_editor::floats::FloatSlots;
use bp_editor::strings::StringSlots;
use pretty_assertions::assert_eq;

fn slider(value: f64) -> SliderValue {
    SliderValue::new(value, 0.0, 10.0, 2.0)
}

// ─── Rename ──────────────────────────────────────────────────────────────

#[test]
fn rename_into_existing_group_adopts_its_value() {
    let mut slots = FloatSlots::new();
    slots.add_node(NodeId(1), "A", NodeMode::Always, slider(2.0));
    slots.add_node(NodeId(2), "A", NodeMode::Always, slider(2.0));
    slots.add_node(NodeId(3), "B", NodeMode::Always, slider(8.0));

    let updates = slots.rename(NodeId(1), "B");

    assert_eq!(updates.len(), 1);
    assert_eq!(updates[0].node, NodeId(1));
    assert_eq!(slots.value(NodeId(1)).unwrap().value, 8.0);
    assert_eq!(slots.value(NodeId(2)).unwrap().value, 2.0);
    assert_eq!(slots.registry().members_of(bp_core::Label::intern("A")), &[NodeId(2)]);
}

#[test]
fn rename_to_fresh_label_keeps_value() {
    let mut slots = FloatSlots::new();
    slots.add_node(NodeId(1), "A", NodeMode::Always, slider(6.0));
    assert!(slots.rename(NodeId(1), "C").is_empty());
    assert_eq!(slots.value(NodeId(1)).unwrap().value, 6.0);
}

// ─── Propagation ─────────────────────────────────────────────────────────

#[test]
fn edit_leaves_whole_group_identical() {
    let mut slots = FloatSlots::new();
    for id in 1..=4 {
        slots.add_node(NodeId(id), "A", NodeMode::Always, slider(0.0));
    }
    slots.set_value(NodeId(3), 7.1);
    let values: Vec<f64> = (1..=4)
        .map(|id| slots.value(NodeId(id)).unwrap().value)
        .collect();
    assert_eq!(values, vec![8.0; 4]);
}

// ─── Projection ──────────────────────────────────────────────────────────

#[test]
fn main_leads_remaining_groups_in_registry_order() {
    let mut slots = FloatSlots::new();
    for (id, title) in [(1, "A"), (2, "MAIN"), (3, "B")] {
        slots.add_node(NodeId(id), title, NodeMode::Always, SliderValue::default());
    }
    let titles: Vec<String> = slots.project().into_iter().map(|e| e.title).collect();
    assert_eq!(titles, vec!["MAIN", "A", "B"]);
}

#[test]
fn missing_main_is_synthesized() {
    let mut slots = FloatSlots::new();
    slots.add_node(NodeId(1), "A", NodeMode::Always, slider(4.0));
    let entries = slots.project();

    assert_eq!(entries[0].title, "MAIN");
    assert!(entries[0].ids.is_empty());
    assert_eq!(entries[0].value, SliderValue::new(0.5, 0.0, 1.0, 0.01));
    assert_eq!(entries[1].title, "A");
}

#[test]
fn projecting_twice_sends_once() {
    let mut slots = StringSlots::new();
    slots.add_node(
        NodeId(1),
        "+ PROMPT",
        NodeMode::Always,
        TextValue {
            value: "fog".into(),
        },
    );
    assert!(slots.outbound().is_some());
    assert!(slots.outbound().is_none());
}

#[test]
fn suggestions_list_kind_labels_first() {
    let mut slots = StringSlots::new();
    slots.add_node(NodeId(1), "style", NodeMode::Always, TextValue::default());
    slots.add_node(NodeId(2), "- PROMPT", NodeMode::Always, TextValue::default());
    assert_eq!(slots.suggestions(), vec!["+ PROMPT", "- PROMPT", "style"]);
}
