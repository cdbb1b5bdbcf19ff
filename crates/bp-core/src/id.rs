use lasso::{Spur, ThreadedRodeo};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::sync::LazyLock;

/// Identifier the host graph assigns to a node. Stable for the node's lifetime.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub i64);

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl From<i64> for NodeId {
    fn from(raw: i64) -> Self {
        NodeId(raw)
    }
}

/// Global string interner for group labels. Users rename nodes into the same
/// handful of labels over and over.
static INTERNER: LazyLock<ThreadedRodeo> = LazyLock::new(ThreadedRodeo::default);

/// An interned group label (the user-editable node title used as sync key).
/// Internally a `Spur` index: 4 bytes, Copy, O(1) Eq and Hash.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Label(Spur);

impl Label {
    /// Intern a label, or return the existing handle.
    pub fn intern(s: &str) -> Self {
        Label(INTERNER.get_or_intern(s))
    }

    /// Look up a label without interning it. `None` means no node ever
    /// carried this title, so no group can match it.
    pub fn get(s: &str) -> Option<Self> {
        INTERNER.get(s).map(Label)
    }

    /// Resolve back to a string slice.
    pub fn as_str(&self) -> &str {
        INTERNER.resolve(&self.0)
    }

    pub fn is_empty(&self) -> bool {
        self.as_str().is_empty()
    }
}

impl fmt::Debug for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.as_str())
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Label {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Label {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(Label::intern(&s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interning_roundtrip() {
        let a = Label::intern("+ PROMPT");
        let b = Label::intern("+ PROMPT");
        assert_eq!(a, b);
        assert_eq!(a.as_str(), "+ PROMPT");
    }

    #[test]
    fn distinct_labels_differ() {
        assert_ne!(Label::intern("MAIN"), Label::intern("MAIN DOC"));
    }

    #[test]
    fn lookup_does_not_intern() {
        assert_eq!(Label::get("never carried by any node 7f"), None);
        assert_eq!(Label::get("never carried by any node 7f"), None);
        let known = Label::intern("+ PROMPT");
        assert_eq!(Label::get("+ PROMPT"), Some(known));
    }

    #[test]
    fn node_id_serializes_as_bare_number() {
        let json = serde_json::to_string(&vec![NodeId(3), NodeId(12)]).unwrap();
        assert_eq!(json, "[3,12]");
    }
}
