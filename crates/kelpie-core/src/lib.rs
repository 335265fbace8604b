#![forbid(unsafe_code)]

//! Mind map semantic core (headless).
//!
//! Design goals:
//! - the tree store owns structure only; rendering is an external projection
//! - deterministic, testable outputs (insertion order is the iteration order)
//! - no ambient globals: everything is threaded through explicit values

pub mod config;
pub mod error;
pub mod history;
pub mod persist;
pub mod tree;

pub use config::MapConfig;
pub use error::{Error, Result};
pub use history::{History, Snapshot};
pub use persist::{MemoryStorage, StateBlob, Storage, ViewportState, WriteError};
pub use tree::{MindTree, Node, NodeColor, NodeId};
