use std::time::Instant;

use kelpie_core::{
    History, MapConfig, MemoryStorage, MindTree, NodeColor, NodeId, Snapshot, StateBlob, Storage,
};
use kelpie_layout::geom::{Point, point};
use kelpie_layout::{LayoutReport, NodeMetrics, Viewport};

/// Label of the root created when no usable saved state exists.
pub const DEFAULT_ROOT_TEXT: &str = "Main Idea";

/// Discrete edit/view events, as mapped from device gestures by the
/// (external) input layer.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    AddChild { parent: NodeId },
    AddSibling { node: NodeId },
    Delete { node: NodeId },
    SetText { node: NodeId, text: String },
    SetColor { node: NodeId, color: NodeColor },
    /// One drag-move event; deltas are screen pixels. The first event of a
    /// sequence implicitly starts the drag.
    Drag { node: NodeId, dx: f64, dy: f64 },
    /// Pointer release ending an active drag.
    EndDrag,
    Pan { dx: f64, dy: f64 },
    Zoom {
        factor: f64,
        anchor: Point,
        screen_center: Point,
    },
    ResetView,
    Undo,
}

/// The editing session: one explicit context value owning the tree, the undo
/// stack, the viewport, and the storage handle.
///
/// Single-threaded by design — every command runs its mutation-to-layout
/// pass to completion before the next one is applied, and the layout pass
/// itself is bounded, so a command can never stall the embedder's event
/// loop.
pub struct Editor {
    tree: MindTree,
    history: History,
    viewport: Viewport,
    selected: Option<NodeId>,
    /// Node pinned by an in-flight drag, if any. At most one.
    drag: Option<NodeId>,
    config: MapConfig,
    metrics: NodeMetrics,
    storage: Box<dyn Storage>,
    last_save: Option<Instant>,
    last_report: LayoutReport,
    on_change: Option<Box<dyn FnMut(&MindTree)>>,
}

impl std::fmt::Debug for Editor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Editor")
            .field("nodes", &self.tree.len())
            .field("selected", &self.selected)
            .field("history", &self.history.len())
            .field("viewport", &self.viewport)
            .finish()
    }
}

impl Editor {
    /// Boots a session from storage. A missing blob is normal (first run);
    /// a corrupt one is discarded. Both fall back to a fresh single-root
    /// tree — neither is an error for the caller.
    pub fn new(storage: Box<dyn Storage>, config: MapConfig, metrics: NodeMetrics) -> Self {
        let mut viewport = Viewport::default();
        let tree = match storage.load() {
            Some(blob) => match blob.restore() {
                Ok(tree) => {
                    viewport = blob.viewport.into();
                    tree
                }
                Err(err) => {
                    tracing::warn!(error = %err, "discarding corrupt saved state");
                    MindTree::with_root(DEFAULT_ROOT_TEXT)
                }
            },
            None => MindTree::with_root(DEFAULT_ROOT_TEXT),
        };
        let selected = tree.root().map(|n| n.id);
        let mut editor = Self {
            tree,
            history: History::new(config.history_capacity),
            viewport,
            selected,
            drag: None,
            metrics,
            storage,
            last_save: None,
            last_report: LayoutReport::default(),
            on_change: None,
            config,
        };
        editor.relayout();
        editor
    }

    /// Session over in-memory storage with default tuning.
    pub fn in_memory() -> Self {
        Self::new(
            Box::new(MemoryStorage::new()),
            MapConfig::default(),
            NodeMetrics::default(),
        )
    }

    pub fn apply(&mut self, command: Command) {
        match command {
            Command::AddChild { parent } => {
                if let Some(id) = self.mutate(|t| t.add_child(parent, "")) {
                    self.selected = Some(id);
                }
            }
            Command::AddSibling { node } => {
                if let Some(id) = self.mutate(|t| t.add_sibling(node, "")) {
                    self.selected = Some(id);
                }
            }
            Command::Delete { node } => {
                if let Some(next) = self.mutate(|t| t.delete_subtree(node)) {
                    self.selected = next;
                }
            }
            Command::SetText { node, text } => {
                self.mutate(|t| t.set_text(node, &text));
            }
            Command::SetColor { node, color } => {
                self.mutate(|t| t.set_color(node, color));
            }
            Command::Drag { node, dx, dy } => self.drag(node, dx, dy),
            Command::EndDrag => self.end_drag(),
            Command::Pan { dx, dy } => self.viewport.pan(dx, dy),
            Command::Zoom {
                factor,
                anchor,
                screen_center,
            } => self.viewport.zoom_at(factor, anchor, screen_center),
            Command::ResetView => self.viewport.reset(),
            Command::Undo => {
                self.undo();
            }
        }
    }

    /// Runs one tree mutation in the mandated order: capture the
    /// pre-mutation snapshot, mutate, relayout, persist (best-effort).
    ///
    /// A rejected mutation (`NotFound` / `InvalidOperation`) leaves the tree
    /// untouched and is recovered locally as a logged no-op; the captured
    /// snapshot is discarded so failed commands do not consume undo depth.
    fn mutate<T>(
        &mut self,
        apply: impl FnOnce(&mut MindTree) -> kelpie_core::Result<T>,
    ) -> Option<T> {
        let snapshot = Snapshot {
            tree: self.tree.clone(),
            selected: self.selected,
        };
        match apply(&mut self.tree) {
            Ok(value) => {
                self.history.push(snapshot);
                self.relayout();
                self.persist();
                self.notify();
                Some(value)
            }
            Err(err) if err.is_recoverable_noop() => {
                tracing::debug!(error = %err, "command ignored");
                None
            }
            Err(err) => {
                tracing::warn!(error = %err, "command failed");
                None
            }
        }
    }

    /// One drag-move event. The first event of a sequence snapshots the
    /// pre-drag tree once and pins the node; screen deltas are converted to
    /// model space through the current scale.
    pub fn drag(&mut self, node: NodeId, dx: f64, dy: f64) {
        if !self.tree.contains(node) {
            tracing::debug!(%node, "drag on unknown node ignored");
            return;
        }
        if self.drag != Some(node) {
            self.end_drag();
            self.history.push(Snapshot {
                tree: self.tree.clone(),
                selected: self.selected,
            });
            self.drag = Some(node);
            self.selected = Some(node);
        }
        let scale = self.viewport.scale;
        let _ = self.tree.move_by(node, dx / scale, dy / scale);
        self.notify();
    }

    /// Release event ending an active drag. The dragged coordinates stand
    /// (they serve as hints to the next structural relayout) and are
    /// persisted; no layout pass runs here.
    pub fn end_drag(&mut self) {
        if self.drag.take().is_some() {
            self.persist();
        }
    }

    /// Pops the most recent snapshot and replaces the tree wholesale, then
    /// re-runs layout. Returns `false` when there is nothing to undo.
    pub fn undo(&mut self) -> bool {
        let Some(snapshot) = self.history.pop() else {
            tracing::debug!("nothing to undo");
            return false;
        };
        self.tree = snapshot.tree;
        self.selected = snapshot.selected.filter(|id| self.tree.contains(*id));
        self.drag = None;
        self.relayout();
        self.persist();
        self.notify();
        true
    }

    /// Registers the repaint hook. The listener runs after every applied
    /// mutation, drag move, and undo, with the post-change tree; rejected
    /// commands do not fire it.
    pub fn set_on_change(&mut self, listener: impl FnMut(&MindTree) + 'static) {
        self.on_change = Some(Box::new(listener));
    }

    fn notify(&mut self) {
        if let Some(listener) = self.on_change.as_mut() {
            listener(&self.tree);
        }
    }

    fn relayout(&mut self) {
        self.last_report = kelpie_layout::layout(&mut self.tree, self.metrics, &self.config);
    }

    fn persist(&mut self) {
        self.persist_at(Instant::now());
    }

    fn persist_at(&mut self, now: Instant) {
        let blob = StateBlob::capture(&self.tree, self.viewport.into());
        match self.storage.save(&blob) {
            Ok(()) => self.last_save = Some(now),
            Err(err) => {
                // Never surfaced: in-memory state stays valid and the next
                // autosave tick retries.
                tracing::warn!(error = %err, "state write failed");
            }
        }
    }

    /// Whether the autosave interval has elapsed since the last successful
    /// write.
    pub fn autosave_due(&self, now: Instant) -> bool {
        match self.last_save {
            None => true,
            Some(at) => now.saturating_duration_since(at) >= self.config.autosave_interval,
        }
    }

    /// Timer-driven save, called from the embedder's scheduler. Best-effort:
    /// a failed write leaves `last_save` untouched so the next tick retries.
    pub fn autosave_tick(&mut self, now: Instant) {
        if self.autosave_due(now) {
            self.persist_at(now);
        }
    }

    pub fn tree(&self) -> &MindTree {
        &self.tree
    }

    pub fn selected(&self) -> Option<NodeId> {
        self.selected
    }

    /// View-driven selection (e.g. a click); unknown ids clear it.
    pub fn select(&mut self, node: Option<NodeId>) {
        self.selected = node.filter(|id| self.tree.contains(*id));
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn layout_report(&self) -> LayoutReport {
        self.last_report
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    /// Model-space position of every node, in insertion order.
    pub fn positions(&self) -> impl Iterator<Item = (NodeId, (f64, f64))> + '_ {
        self.tree.nodes().map(|n| (n.id, (n.x, n.y)))
    }

    /// Screen-space projection of every node under the current viewport.
    pub fn screen_positions(&self, screen_center: Point) -> Vec<(NodeId, Point)> {
        self.tree
            .nodes()
            .map(|n| {
                (
                    n.id,
                    self.viewport.to_screen(point(n.x, n.y), screen_center),
                )
            })
            .collect()
    }
}
