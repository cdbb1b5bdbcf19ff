//! Image slots (`ImageSlots`). Identity only: the external editor pushes the
//! pixels to disk and nodes fetch them over HTTP.

use crate::slots::{SlotKind, SlotSync};
use bp_core::endpoints::preview_paths;
use bp_core::labels::MAIN_DOC;
use bp_core::{ImageValue, MessageType, NodeId};

pub struct ImageKind;

impl SlotKind for ImageKind {
    type Value = ImageValue;
    const MESSAGE: MessageType = MessageType::ImageSlots;
    const PRIORITY: &'static [&'static str] = &[MAIN_DOC];
}

pub type ImageSlots = SlotSync<ImageKind>;

impl SlotSync<ImageKind> {
    /// Preview image path (and selection mask path for the main document)
    /// the host should load onto `node`.
    pub fn previews(&self, node: NodeId) -> Option<(String, Option<String>)> {
        self.label_of(node).map(|label| preview_paths(label.as_str()))
    }

    /// Previews of every labelled image node, group by group. Reloaded when
    /// a prompt starts so nodes pick up what the editor last pushed.
    pub fn all_previews(&self) -> Vec<(NodeId, String, Option<String>)> {
        let mut out = Vec::new();
        for group in self.registry().snapshot() {
            let (image, selection) = preview_paths(group.label.as_str());
            for &node in &group.members {
                out.push((node, image.clone(), selection.clone()));
            }
        }
        out
    }
}
