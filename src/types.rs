//! Core types for spark-bridge.
//!
//! The shared vocabulary of the reconciliation engine: object ids, attribute
//! payloads, command kinds and the per-object lifecycle.

use std::borrow::Borrow;
use std::fmt;

use serde::{Deserialize, Serialize};

// =============================================================================
// Attributes
// =============================================================================

/// Opaque key → value payload carried by every command.
///
/// The engine only ever reads `id`, `type`, `parent` and the two markers;
/// everything else is handed untouched to the object hooks.
pub type Attributes = serde_json::Map<String, serde_json::Value>;

/// Key holding the target id.
pub const ID_KEY: &str = "id";

/// Key holding the type discriminant matched by factories.
pub const TYPE_KEY: &str = "type";

/// Key holding the declared parent id.
pub const PARENT_KEY: &str = "parent";

// =============================================================================
// ObjectId
// =============================================================================

/// Caller-supplied id of a live object.
///
/// Unique among registered objects and stable for the object's lifetime.
/// Never empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectId(String);

impl ObjectId {
    /// Wrap a non-empty id. Returns `None` for the empty string.
    pub fn new(id: impl Into<String>) -> Option<Self> {
        let id = id.into();
        if id.is_empty() { None } else { Some(Self(id)) }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for ObjectId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for ObjectId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// =============================================================================
// Command Kind
// =============================================================================

/// The three mutations a script can request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandKind {
    Mount,
    Update,
    Unmount,
}

impl CommandKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Mount => "mount",
            Self::Update => "update",
            Self::Unmount => "unmount",
        }
    }
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Lifecycle
// =============================================================================

/// Where an object is in its two-phase teardown.
///
/// ```text
/// Live ──retained unmount──▶ Hidden ──mount──▶ Live
///   │
///   └──unmount──▶ PendingDestroy ──idle tick──▶ Destroyed
/// ```
///
/// Registry nodes are only ever `Live` or `Hidden`. Garbage entries are
/// `PendingDestroy` until finalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Lifecycle {
    #[default]
    Live,
    Hidden,
    PendingDestroy,
    Destroyed,
}

impl Lifecycle {
    /// Whether the object counts as mounted.
    #[inline]
    pub const fn is_mounted(self) -> bool {
        matches!(self, Self::Live)
    }
}

// =============================================================================
// Node Flags (bitflags)
// =============================================================================

bitflags::bitflags! {
    /// Per-node engine flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct NodeFlags: u8 {
        const NONE = 0;
        /// Survives unmount and environment reset; only ever hidden.
        const PERSISTENT = 1 << 0;
        /// An accessor has been installed in the script namespace.
        const EXPOSED = 1 << 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_id_rejects_empty() {
        assert!(ObjectId::new("").is_none());
        assert_eq!(ObjectId::new("a").unwrap().as_str(), "a");
    }

    #[test]
    fn test_lifecycle_mounted() {
        assert!(Lifecycle::Live.is_mounted());
        assert!(!Lifecycle::Hidden.is_mounted());
        assert!(!Lifecycle::PendingDestroy.is_mounted());
    }

    #[test]
    fn test_node_flags_combine() {
        let flags = NodeFlags::PERSISTENT | NodeFlags::EXPOSED;
        assert!(flags.contains(NodeFlags::PERSISTENT));
        assert!(!NodeFlags::default().contains(NodeFlags::EXPOSED));
    }
}
