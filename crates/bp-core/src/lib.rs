pub mod endpoints;
pub mod id;
pub mod labels;
pub mod project;
pub mod registry;
pub mod slider;
pub mod wire;

pub use id::{Label, NodeId};
pub use labels::default_label;
pub use project::{LastSent, Priority, SlotEntry, project};
pub use registry::{Group, TitleRegistry};
pub use slider::SliderValue;
pub use wire::*;
