use serde::{Deserialize, Serialize};

use crate::tree::{MindTree, Node};
use crate::Result;

/// Pan/zoom state on the wire. The layout crate owns the transform math;
/// this is just the persisted triple.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewportState {
    pub x: f64,
    pub y: f64,
    pub scale: f64,
}

impl Default for ViewportState {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            scale: 1.0,
        }
    }
}

/// The versionless persisted record: every node in insertion order, the id
/// counter, the viewport, and a write timestamp.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateBlob {
    pub nodes: Vec<Node>,
    pub node_counter: u64,
    pub viewport: ViewportState,
    pub timestamp: String,
}

impl StateBlob {
    pub fn capture(tree: &MindTree, viewport: ViewportState) -> Self {
        Self {
            nodes: tree.to_nodes(),
            node_counter: tree.node_counter(),
            viewport,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Rebuilds the tree, enforcing structural invariants (`CorruptData` on
    /// violation — the caller then bootstraps a fresh root).
    pub fn restore(&self) -> Result<MindTree> {
        MindTree::from_parts(self.nodes.clone(), self.node_counter)
    }

    /// Parses a persisted record. A malformed blob is treated as "no saved
    /// state", not an error.
    pub fn from_json(raw: &str) -> Option<Self> {
        serde_json::from_str(raw).ok()
    }

    pub fn to_json(&self) -> std::result::Result<String, WriteError> {
        serde_json::to_string(self).map_err(|e| WriteError {
            message: e.to_string(),
        })
    }
}

/// A failed persistence write. Never fatal: in-memory state stays valid and
/// the next autosave tick retries.
#[derive(Debug, thiserror::Error)]
#[error("storage write failed: {message}")]
pub struct WriteError {
    pub message: String,
}

/// Key-value persistence as seen by the core. Transport details (browser
/// storage, files, ...) live with the embedder.
pub trait Storage {
    /// `None` covers both "never saved" and "unreadable".
    fn load(&self) -> Option<StateBlob>;
    fn save(&mut self, blob: &StateBlob) -> std::result::Result<(), WriteError>;
    fn clear(&mut self);
}

/// In-memory storage holding the serialized text, so saves exercise the full
/// wire round trip. `fail_writes` simulates a full/unwritable store.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    slot: Option<String>,
    pub fail_writes: bool,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds the slot with raw text (useful for corrupt-blob scenarios).
    pub fn with_raw(raw: impl Into<String>) -> Self {
        Self {
            slot: Some(raw.into()),
            fail_writes: false,
        }
    }

    pub fn raw(&self) -> Option<&str> {
        self.slot.as_deref()
    }
}

impl Storage for MemoryStorage {
    fn load(&self) -> Option<StateBlob> {
        self.slot.as_deref().and_then(StateBlob::from_json)
    }

    fn save(&mut self, blob: &StateBlob) -> std::result::Result<(), WriteError> {
        if self.fail_writes {
            return Err(WriteError {
                message: "quota exceeded".to_string(),
            });
        }
        self.slot = Some(blob.to_json()?);
        Ok(())
    }

    fn clear(&mut self) {
        self.slot = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    fn sample_tree() -> MindTree {
        let mut tree = MindTree::with_root("Main Idea");
        let root = tree.root().unwrap().id;
        let a = tree.add_child(root, "A").unwrap();
        tree.add_child(a, "C").unwrap();
        tree
    }

    #[test]
    fn blob_round_trips_through_storage() {
        let tree = sample_tree();
        let mut storage = MemoryStorage::new();
        let blob = StateBlob::capture(&tree, ViewportState::default());
        storage.save(&blob).unwrap();

        let loaded = storage.load().unwrap();
        assert_eq!(loaded.node_counter, tree.node_counter());
        assert_eq!(loaded.restore().unwrap(), tree);
        assert_eq!(loaded.viewport, ViewportState::default());
        assert!(!loaded.timestamp.is_empty());
    }

    #[test]
    fn malformed_blob_loads_as_none() {
        let storage = MemoryStorage::with_raw("{not json");
        assert!(storage.load().is_none());
        let storage = MemoryStorage::with_raw(r#"{"unexpected":true}"#);
        assert!(storage.load().is_none());
    }

    #[test]
    fn structurally_invalid_blob_is_corrupt_data() {
        let tree = sample_tree();
        let mut blob = StateBlob::capture(&tree, ViewportState::default());
        // Drop the middle node so its child dangles.
        blob.nodes.retain(|n| n.text != "A");
        assert!(matches!(blob.restore(), Err(Error::CorruptData { .. })));
    }

    #[test]
    fn failed_write_reports_and_preserves_previous_slot() {
        let tree = sample_tree();
        let mut storage = MemoryStorage::new();
        storage
            .save(&StateBlob::capture(&tree, ViewportState::default()))
            .unwrap();

        storage.fail_writes = true;
        let err = storage
            .save(&StateBlob::capture(&tree, ViewportState::default()))
            .unwrap_err();
        assert!(err.to_string().contains("quota exceeded"));
        assert!(storage.load().is_some());
    }

    #[test]
    fn clear_empties_the_slot() {
        let mut storage = MemoryStorage::new();
        storage
            .save(&StateBlob::capture(&sample_tree(), ViewportState::default()))
            .unwrap();
        storage.clear();
        assert!(storage.load().is_none());
    }
}
