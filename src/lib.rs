//! # btree-engine (Rust crate)
//!
//! A behavior tree interpreter over an immutable application state, with actions
//! that may finish asynchronously.
//!
//!
//! ## Overview
//!
//! A behavior tree is an extension to finite state machines that makes describing transitional behavior easier.
//! See [BehaviorTreeCPP's documentation](https://www.behaviortree.dev/) for the thorough introduction to the idea.
//!
//! This crate differs from most behavior tree libraries in where the data lives.
//! There is no blackboard. The tree is ticked against a single state value owned by
//! the [`Root`], and every action is a *recipe* that edits a draft of that state.
//! A recipe that returns synchronously is committed right away.
//! A recipe that suspends keeps its node `Running` across ticks, and once it
//! settles, its changes are replayed on top of whatever the state has become in
//! the meantime. So two long-running actions on different branches never
//! overwrite each other's work.
//!
//!
//! ## How it looks like
//!
//! First, you define the state with a data structure.
//! It needs to be `Clone` and (de)serializable with serde, because recorded
//! changes are expressed against its JSON image.
//!
//! ```rust
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Clone, Default, Serialize, Deserialize)]
//! struct Body {
//!     flag: bool,
//!     x: i32,
//!     y: i32,
//! }
//! ```
//!
//! Then, you define a behavior tree with node constructors and hand it to a root
//! together with the initial state.
//!
//! ```rust
//! # use serde::{Deserialize, Serialize};
//! # #[derive(Clone, Default, Serialize, Deserialize)]
//! # struct Body { flag: bool, x: i32, y: i32 }
//! use btree_engine::{Node, Root, Status};
//!
//! let tree = Node::selector(vec![
//!     Node::sequence(vec![
//!         Node::condition("flag", |body: &Body, _: &()| body.flag),
//!         Node::action("setX", |body: &mut Body, _: &()| body.x = 1),
//!     ]),
//!     Node::action("fallback", |body: &mut Body, _: &()| body.y = 2),
//! ]);
//!
//! let mut root = Root::new("main", Body::default(), tree);
//! ```
//!
//! and call `tick()`.
//!
//! ```rust
//! # use serde::{Deserialize, Serialize};
//! # #[derive(Clone, Default, Serialize, Deserialize)]
//! # struct Body { flag: bool, x: i32, y: i32 }
//! # use btree_engine::{Node, Root, Status};
//! # let mut root = Root::new("main", Body::default(), Node::action("fallback", |body: &mut Body, _: &()| body.y = 2));
//! let result = root.tick(&()).unwrap();
//! assert_eq!(result, Some(Status::Success));
//! assert_eq!(root.state().y, 2);
//! ```
//!
//! The argument to `tick` is the *props*: per-tick input that is not part of the
//! state, e.g. the mouse position or the elapsed time.
//! Every condition and recipe receives it as the second argument.
//! The props type is the second type parameter of [`Node`] and [`Root`] and
//! defaults to `()`.
//!
//! `tick` returns `Ok(None)` if the root was [deactivated](Root::deactivate),
//! and an error if the state could not be converted to or from its serde image.
//! An action whose recorded changes no longer fit the current state fails
//! without stopping the rest of the tree.
//!
//!
//! ## Node types
//!
//! * `Sequence` ticks its children in order until one fails.
//!   If a child is `Running`, the next tick resumes from that child.
//! * `Selector` ticks its children in order until one succeeds or is `Running`.
//!   It always starts over from the first child.
//! * `Parallel` ticks every child every tick. It succeeds if all children
//!   succeed, fails if all fail and is `Running` otherwise.
//! * `Portal` is a `Parallel` whose children can be mounted and unmounted
//!   between ticks through a shared [`Portal`] handle.
//! * `Invert` swaps `Success` and `Failure`.
//! * `Decorator` maps the child's status with an arbitrary function.
//! * `State` passes its child's status through and carries a payload for
//!   inspection tools.
//! * `Condition` and `Action` are the leaves.
//!
//! After every tick, subtrees that have finished and have nothing `Running`
//! below them are re-armed to `Ready`, so the next activation starts fresh.
//!
//!
//! ## Asynchronous actions
//!
//! A recipe that returns `()` is synchronous.
//! To suspend, return [`Produced::pending`] with a future that resolves to a
//! closure applying the rest of the changes.
//!
//! ```rust
//! # use serde::{Deserialize, Serialize};
//! use btree_engine::{Node, Produced, Root, Status};
//! use futures::channel::oneshot;
//!
//! #[derive(Clone, Default, Serialize, Deserialize)]
//! struct Doc {
//!     loading: bool,
//!     text: String,
//! }
//!
//! let (tx, rx) = oneshot::channel::<String>();
//! let rx = std::cell::RefCell::new(Some(rx));
//! let load = Node::action("load", move |doc: &mut Doc, _: &()| {
//!     doc.loading = true;
//!     let rx = rx.borrow_mut().take();
//!     Produced::<Doc>::pending(async move {
//!         let text = match rx {
//!             Some(rx) => rx.await.unwrap_or_default(),
//!             None => String::new(),
//!         };
//!         move |doc: &mut Doc| {
//!             doc.loading = false;
//!             doc.text = text;
//!         }
//!     })
//! });
//!
//! let mut root = Root::new("doc", Doc::default(), load);
//! assert_eq!(root.tick(&()).unwrap(), Some(Status::Running));
//! // The draft is not committed until the action settles.
//! assert!(!root.state().loading);
//!
//! tx.send("hello".to_string()).unwrap();
//! assert!(root.needs_tick());
//! assert_eq!(root.tick_if_woken(&()).unwrap(), Some(Status::Success));
//! assert_eq!(root.state().text, "hello");
//! ```
//!
//! The root never spawns or blocks on anything. The futures are polled on
//! ticks, and [`Root::needs_tick`] tells you when one of them made progress.
//! When an action settles, the root immediately ticks the tree once more so
//! the rest of the tree sees the new state.
//!
//!
//! ## Loading the tree structure from a source file
//!
//! We have specific file format for describing behavior tree structure of our own.
//! Conditions and actions are registered by name in a [`Registry`] first.
//!
//! ```rust
//! # use serde::{Deserialize, Serialize};
//! # #[derive(Clone, Default, Serialize, Deserialize)]
//! # struct Body { flag: bool, x: i32, y: i32 }
//! use btree_engine::{load_str, Registry, Root, Status};
//!
//! let mut registry = Registry::default();
//! registry.register_condition("flag", |body: &Body, _: &()| body.flag);
//! registry.register_action("setX", |body: &mut Body, _: &()| body.x = 1);
//! registry.register_action("setY", |body: &mut Body, _: &()| body.y = 2);
//!
//! let source = r#"
//! tree main = Selector {
//!     Sequence {
//!         flag
//!         setX
//!     }
//!     setY
//! }
//! "#;
//! let tree = load_str(source, &registry).unwrap();
//! let mut root = Root::new("main", Body::default(), tree);
//! assert_eq!(root.tick(&()).unwrap(), Some(Status::Success));
//! ```
//!
//! The built-in node names are `Sequence`, `Selector` (or `Fallback`),
//! `Parallel`, `Portal(name)`, `Invert` (or `Inverter`), `Decorator(name)`
//! and `State("payload")`. Any other name refers to a registered condition, a
//! registered action or another tree in the same source, in this order.
//!
//! ```raw
//! # This is a comment.
//! tree main = Selector {
//!     !blocked                       # `!` inverts the node that follows
//!     Decorator(ForceSuccess) { risky }
//!     State("drag") { Drag }
//!     Portal(overlay) {}
//! }
//!
//! tree Drag = Sequence { grab move }
//! ```
//!
//! Subtrees are expanded in place, and a subtree that contains itself is an error.
//! [`parse_file`] returns the AST if you want to instantiate the same source
//! several times with [`load`].
//!
//! ### Loading the tree structure from a yaml file
//!
//! The same tree can be described in YAML and loaded with [`load_yaml`],
//! which returns every tree under `behavior_tree` by name.
//!
//! ```yaml
//! behavior_tree:
//!   main:
//!     type: Selector
//!     children:
//!     - type: Sequence
//!       children:
//!       - type: flag
//!       - type: setX
//!     - type: State
//!       payload: { kind: fallback }
//!       children:
//!       - type: setY
//! ```

pub mod error;
mod interpreter;
mod nodes;
pub mod parser;
pub mod patch;
mod registry;
mod root;
mod status;
pub mod store;

pub use crate::error::TickError;
pub use crate::nodes::{ActionNode, NodeKind, NodeSnapshot, Portal, Predicate, Recipe, StatusMap};
pub use crate::patch::{Mutation, Patch, PathSegment, Produced, Settled};
pub use crate::registry::{boxify, Registry};
pub use crate::root::{ListenerId, Root, TickEvent};
pub use crate::status::Status;
pub use crate::store::{NodeId, Store, StoreKey, StoreValue};
pub use crate::{
    nodes::Node,
    parser::{load, load_str, load_yaml, parse_file},
};
