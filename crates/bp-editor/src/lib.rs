pub mod channel;
pub mod floats;
pub mod generation;
pub mod images;
pub mod retry;
pub mod seeds;
pub mod session;
pub mod slots;
pub mod strings;
pub mod toggles;

pub use channel::{Outbox, Reconnect, Transport};
pub use session::{HostEffect, Session, SessionConfig};
pub use slots::{SlotKind, SlotSync, WidgetUpdate};
pub use toggles::{HostWidget, SwitcherSnapshot};
