//! Drag a box around with a scripted stream of mouse events.
//!
//! Run with `RUST_LOG=debug cargo run --example drag` to see every node decision.

use ::btree_engine::{Node, Root};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
struct DragState {
    is_dragging: bool,
    x: i32,
    y: i32,
    dx: i32,
    dy: i32,
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum MouseKind {
    Move,
    Up,
}

#[derive(Clone, Copy, Debug)]
struct MouseEvent {
    kind: MouseKind,
    client_x: i32,
    client_y: i32,
}

/// Bounding rectangle of the target at the time it was clicked.
#[derive(Clone, Copy, Debug)]
struct Rect {
    x: i32,
    y: i32,
}

struct Input {
    /// A mouse down on the dragged box itself.
    target: Option<(MouseEvent, Rect)>,
    /// Any mouse event on the surrounding container.
    container: Option<MouseEvent>,
}

fn drag_behavior() -> Node<DragState, Input> {
    Node::selector(vec![
        Node::sequence(vec![
            Node::condition("Is dragging", |state: &DragState, input: &Input| {
                state.is_dragging && matches!(input.container, Some(e) if e.kind == MouseKind::Move)
            }),
            Node::action("Move target", |state: &mut DragState, input: &Input| {
                if let Some(e) = input.container {
                    state.x = e.client_x - state.dx;
                    state.y = e.client_y - state.dy;
                }
            }),
        ]),
        Node::sequence(vec![
            Node::condition("Has clicked on target", |_: &DragState, input: &Input| {
                input.target.is_some()
            }),
            Node::action("Start dragging", |state: &mut DragState, input: &Input| {
                if let Some((e, rect)) = input.target {
                    state.is_dragging = true;
                    state.x = rect.x;
                    state.y = rect.y;
                    state.dx = e.client_x - rect.x;
                    state.dy = e.client_y - rect.y;
                }
            }),
        ]),
        Node::sequence(vec![
            Node::condition("Has released drag", |state: &DragState, input: &Input| {
                state.is_dragging && matches!(input.container, Some(e) if e.kind == MouseKind::Up)
            }),
            Node::action("End dragging", |state: &mut DragState, _: &Input| {
                state.is_dragging = false
            }),
        ]),
    ])
}

fn container(kind: MouseKind, client_x: i32, client_y: i32) -> Input {
    Input {
        target: None,
        container: Some(MouseEvent {
            kind,
            client_x,
            client_y,
        }),
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let mut root = Root::new("DragBehavior", DragState::default(), drag_behavior())
        .with_state_callback(|state| println!("  state: {:?}", state));

    let script = vec![
        // Moving the mouse before clicking does nothing.
        container(MouseKind::Move, 5, 5),
        Input {
            target: Some((
                MouseEvent {
                    kind: MouseKind::Move,
                    client_x: 15,
                    client_y: 12,
                },
                Rect { x: 10, y: 10 },
            )),
            container: None,
        },
        container(MouseKind::Move, 25, 22),
        container(MouseKind::Move, 40, 30),
        container(MouseKind::Up, 40, 30),
        container(MouseKind::Move, 80, 80),
    ];

    for (i, input) in script.iter().enumerate() {
        println!("tick {}: {:?}", i, input.container.or(input.target.map(|(e, _)| e)));
        let result = root.tick(input)?;
        println!("  result: {:?}", result);
    }

    let state = root.state();
    println!("Dropped at ({}, {})", state.x, state.y);
    println!("{}", serde_json::to_string_pretty(&root.snapshot())?);
    Ok(())
}
