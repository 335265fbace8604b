//! End-to-end editor scenarios: command flow, undo, persistence, bootstrap.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::{Duration, Instant};

use kelpie::layout::{NodeMetrics, geom::point};
use kelpie::{
    Command, DEFAULT_ROOT_TEXT, Editor, MapConfig, MemoryStorage, NodeColor, NodeId, StateBlob,
    Storage, ViewportState, WriteError,
};

/// Storage handle the test can keep a view into after the editor takes
/// ownership of its `Box<dyn Storage>`.
#[derive(Clone, Default)]
struct SharedStorage {
    inner: Rc<RefCell<MemoryStorage>>,
}

impl SharedStorage {
    fn set_fail_writes(&self, fail: bool) {
        self.inner.borrow_mut().fail_writes = fail;
    }

    fn saved_blob(&self) -> Option<StateBlob> {
        self.inner.borrow().load()
    }
}

impl Storage for SharedStorage {
    fn load(&self) -> Option<StateBlob> {
        self.inner.borrow().load()
    }

    fn save(&mut self, blob: &StateBlob) -> Result<(), WriteError> {
        self.inner.borrow_mut().save(blob)
    }

    fn clear(&mut self) {
        self.inner.borrow_mut().clear()
    }
}

fn add_labeled_child(editor: &mut Editor, parent: NodeId, text: &str) -> NodeId {
    editor.apply(Command::AddChild { parent });
    let id = editor.selected().expect("new child selected");
    editor.apply(Command::SetText {
        node: id,
        text: text.to_string(),
    });
    id
}

fn position(editor: &Editor, id: NodeId) -> (f64, f64) {
    let n = editor.tree().node(id).unwrap();
    (n.x, n.y)
}

#[test]
fn bootstraps_a_fresh_root_without_saved_state() {
    let editor = Editor::in_memory();
    let root = editor.tree().root().unwrap();
    assert_eq!(root.id, NodeId(1));
    assert_eq!(root.text, DEFAULT_ROOT_TEXT);
    assert_eq!(root.color, None);
    assert_eq!(editor.selected(), Some(root.id));
    assert_eq!(editor.tree().len(), 1);
}

#[test]
fn reference_scenario_layout_and_cascade_delete() {
    let mut editor = Editor::in_memory();
    let root = editor.tree().root().unwrap().id;

    let a = add_labeled_child(&mut editor, root, "A");
    let b = add_labeled_child(&mut editor, root, "B");
    let c = add_labeled_child(&mut editor, a, "C");
    assert_eq!((a, b, c), (NodeId(2), NodeId(3), NodeId(4)));

    // First root child goes right, second left; the grandchild continues one
    // branch step further right, centered on its parent.
    assert_eq!(position(&editor, root), (0.0, 0.0));
    assert_eq!(position(&editor, a).0, 320.0);
    assert_eq!(position(&editor, b).0, -320.0);
    assert_eq!(position(&editor, c).0, 320.0 + 250.0);
    assert_eq!(position(&editor, c).1, position(&editor, a).1);

    editor.apply(Command::Delete { node: a });
    assert!(!editor.tree().contains(a));
    assert!(!editor.tree().contains(c));
    assert!(editor.tree().contains(b));
    assert_eq!(editor.selected(), Some(root));
    assert_eq!(position(&editor, b).0, 320.0);
    editor.tree().validate().unwrap();
}

#[test]
fn undo_round_trips_every_mutation_kind() {
    let mut editor = Editor::in_memory();
    let root = editor.tree().root().unwrap().id;
    let a = add_labeled_child(&mut editor, root, "A");

    let mutations: Vec<Command> = vec![
        Command::AddChild { parent: a },
        Command::AddSibling { node: a },
        Command::Delete { node: a },
        Command::SetText {
            node: a,
            text: "renamed".to_string(),
        },
        Command::SetColor {
            node: a,
            color: NodeColor::Green,
        },
    ];

    for command in mutations {
        let before = editor.tree().clone();
        editor.apply(command.clone());
        assert!(editor.undo(), "undo after {command:?}");
        assert_eq!(editor.tree(), &before, "round trip failed for {command:?}");
    }
}

#[test]
fn undo_restores_the_pre_drag_positions() {
    let mut editor = Editor::in_memory();
    let root = editor.tree().root().unwrap().id;
    let a = add_labeled_child(&mut editor, root, "A");
    let before = editor.tree().clone();

    editor.apply(Command::Drag {
        node: a,
        dx: 30.0,
        dy: 45.0,
    });
    editor.apply(Command::Drag {
        node: a,
        dx: 5.0,
        dy: -5.0,
    });
    editor.apply(Command::EndDrag);
    assert_eq!(position(&editor, a), (355.0, 40.0));

    // The whole press-to-release sequence is one undo step.
    assert!(editor.undo());
    assert_eq!(editor.tree(), &before);
}

#[test]
fn drag_deltas_are_scaled_by_the_zoom_factor() {
    let mut editor = Editor::in_memory();
    let root = editor.tree().root().unwrap().id;
    let a = add_labeled_child(&mut editor, root, "A");
    let (x0, y0) = position(&editor, a);

    // Two zoom-in steps: scale 1.21.
    for _ in 0..2 {
        editor.apply(Command::Zoom {
            factor: 1.1,
            anchor: point(0.0, 0.0),
            screen_center: point(0.0, 0.0),
        });
    }
    editor.apply(Command::Drag {
        node: a,
        dx: 12.1,
        dy: 0.0,
    });
    editor.apply(Command::EndDrag);

    let (x1, y1) = position(&editor, a);
    assert!((x1 - (x0 + 12.1 / 1.21)).abs() < 1e-9);
    assert_eq!(y1, y0);
}

#[test]
fn history_is_bounded_to_the_most_recent_fifty() {
    let mut editor = Editor::in_memory();
    let root = editor.tree().root().unwrap().id;
    let a = add_labeled_child(&mut editor, root, "A");
    // 2 effective mutations so far; 55 more pushes the total well past 50.
    for i in 0..55 {
        editor.apply(Command::SetText {
            node: a,
            text: format!("label {i}"),
        });
    }
    assert_eq!(editor.history_len(), 50);

    let mut undone = 0;
    while editor.undo() {
        undone += 1;
    }
    assert_eq!(undone, 50);
    // 57 snapshots were pushed in total, so the oldest 7 were evicted and
    // the fully unwound state is the one captured before the 8th mutation.
    assert_eq!(editor.tree().node(a).unwrap().text, "label 4");
}

#[test]
fn rejected_commands_are_noops_and_consume_no_history() {
    let mut editor = Editor::in_memory();
    let root = editor.tree().root().unwrap().id;
    let before = editor.tree().clone();
    let depth = editor.history_len();

    editor.apply(Command::Delete { node: root });
    editor.apply(Command::AddSibling { node: root });
    editor.apply(Command::AddChild {
        parent: NodeId(999),
    });
    editor.apply(Command::SetColor {
        node: root,
        color: NodeColor::Red,
    });

    assert_eq!(editor.tree(), &before);
    assert_eq!(editor.history_len(), depth);
    assert!(!editor.undo());
}

#[test]
fn state_survives_a_session_restart() {
    let storage = SharedStorage::default();
    let mut editor = Editor::new(
        Box::new(storage.clone()),
        MapConfig::default(),
        NodeMetrics::default(),
    );
    let root = editor.tree().root().unwrap().id;
    let a = add_labeled_child(&mut editor, root, "A");
    add_labeled_child(&mut editor, a, "C");
    editor.apply(Command::Pan { dx: 50.0, dy: 0.0 });
    // Pan alone does not persist; the next mutation captures the viewport.
    add_labeled_child(&mut editor, root, "B");
    let saved_tree = editor.tree().clone();
    drop(editor);

    let restarted = Editor::new(
        Box::new(storage),
        MapConfig::default(),
        NodeMetrics::default(),
    );
    assert_eq!(restarted.tree(), &saved_tree);
    assert_eq!(restarted.viewport().x, 50.0);
    assert_eq!(restarted.tree().node_counter(), saved_tree.node_counter());
}

#[test]
fn corrupt_saved_state_falls_back_to_a_fresh_root() {
    // Structurally broken: a child pointing at a parent that is gone.
    let mut donor = Editor::in_memory();
    let root = donor.tree().root().unwrap().id;
    let a = add_labeled_child(&mut donor, root, "A");
    add_labeled_child(&mut donor, a, "C");
    let mut blob = StateBlob::capture(donor.tree(), ViewportState::default());
    blob.nodes.retain(|n| n.id != a);
    let raw = blob.to_json().unwrap();

    for seeded in [raw.as_str(), "{definitely not json"] {
        let editor = Editor::new(
            Box::new(MemoryStorage::with_raw(seeded)),
            MapConfig::default(),
            NodeMetrics::default(),
        );
        assert_eq!(editor.tree().len(), 1);
        assert_eq!(editor.tree().root().unwrap().text, DEFAULT_ROOT_TEXT);
    }
}

#[test]
fn failed_writes_are_swallowed_and_retried_by_autosave() {
    let storage = SharedStorage::default();
    let mut editor = Editor::new(
        Box::new(storage.clone()),
        MapConfig::default(),
        NodeMetrics::default(),
    );
    let root = editor.tree().root().unwrap().id;
    add_labeled_child(&mut editor, root, "A");
    let saved_counter = storage.saved_blob().unwrap().node_counter;

    // Writes start failing: commands still apply, the old blob stays put.
    storage.set_fail_writes(true);
    let b = add_labeled_child(&mut editor, root, "B");
    assert!(editor.tree().contains(b));
    assert_eq!(storage.saved_blob().unwrap().node_counter, saved_counter);

    // The write failure left the save clock unset for this cycle, so a later
    // tick retries and catches up.
    let later = Instant::now() + Duration::from_secs(31);
    assert!(editor.autosave_due(later));
    storage.set_fail_writes(false);
    editor.autosave_tick(later);
    assert_eq!(
        storage.saved_blob().unwrap().node_counter,
        editor.tree().node_counter()
    );
    assert!(!editor.autosave_due(later));
}

#[test]
fn change_hook_fires_for_effective_changes_only() {
    let count = Rc::new(RefCell::new(0usize));
    let mut editor = Editor::in_memory();
    let root = editor.tree().root().unwrap().id;
    let seen = count.clone();
    editor.set_on_change(move |tree| {
        *seen.borrow_mut() += 1;
        assert!(tree.root().is_some());
    });

    editor.apply(Command::AddChild { parent: root });
    let a = editor.selected().unwrap();
    editor.apply(Command::Drag {
        node: a,
        dx: 10.0,
        dy: 0.0,
    });
    editor.apply(Command::EndDrag);
    editor.apply(Command::Undo);
    assert_eq!(*count.borrow(), 3);

    // View-only commands and rejections stay silent.
    editor.apply(Command::Pan { dx: 10.0, dy: 0.0 });
    editor.apply(Command::Delete { node: root });
    assert_eq!(*count.borrow(), 3);
}

#[test]
fn reset_view_restores_the_identity_viewport() {
    let mut editor = Editor::in_memory();
    editor.apply(Command::Pan { dx: 120.0, dy: -30.0 });
    editor.apply(Command::Zoom {
        factor: 1.1,
        anchor: point(100.0, 100.0),
        screen_center: point(400.0, 300.0),
    });
    assert_ne!(editor.viewport().scale, 1.0);

    editor.apply(Command::ResetView);
    let vp = editor.viewport();
    assert_eq!((vp.x, vp.y, vp.scale), (0.0, 0.0, 1.0));

    let screens = editor.screen_positions(point(400.0, 300.0));
    let (_, root_screen) = screens[0];
    assert_eq!((root_screen.x, root_screen.y), (400.0, 300.0));
}
