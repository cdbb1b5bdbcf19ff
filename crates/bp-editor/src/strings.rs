//! Prompt string slots (`StringSlots`).

use crate::slots::{SlotKind, SlotSync, WidgetUpdate};
use bp_core::labels::{NEGATIVE_PROMPT, POSITIVE_PROMPT};
use bp_core::{MessageType, NodeId, StringUpdate, TextValue};

pub struct StringKind;

impl SlotKind for StringKind {
    type Value = TextValue;
    const MESSAGE: MessageType = MessageType::StringSlots;
    const PRIORITY: &'static [&'static str] = &[POSITIVE_PROMPT, NEGATIVE_PROMPT];
}

pub type StringSlots = SlotSync<StringKind>;

impl SlotSync<StringKind> {
    /// Text typed into `node`'s textarea.
    pub fn set_text(&mut self, node: NodeId, text: &str) -> Vec<WidgetUpdate<TextValue>> {
        self.propagate_with(node, |v| v.value = text.to_string())
    }

    pub fn apply_inbound(&mut self, updates: &[StringUpdate]) -> Vec<WidgetUpdate<TextValue>> {
        let mut out = Vec::new();
        for update in updates {
            let Some(title) = update.title.as_deref().filter(|t| !t.is_empty()) else {
                continue;
            };
            let Some(text) = update.value.as_deref() else {
                log::warn!("StringSlots: entry {title:?} has no value; skipped");
                continue;
            };
            out.extend(self.apply_to_label(title, |v| v.value = text.to_string()));
        }
        out
    }
}
