use super::*;
use crate::patch::Produced;
use futures::channel::oneshot;
use serde::Deserialize;
use std::{cell::RefCell, rc::Rc};

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
struct Flags {
    flag: bool,
    x: i32,
    y: i32,
}

fn scenario(flag: bool) -> Root<Flags> {
    let body = Node::selector(vec![
        Node::sequence(vec![
            Node::condition("a", |state: &Flags, _: &()| state.flag),
            Node::action("setX", |state: &mut Flags, _: &()| state.x = 1),
        ]),
        Node::action("fallback", |state: &mut Flags, _: &()| state.y = 2),
    ]);
    Root::new(
        "scenario",
        Flags {
            flag,
            ..Flags::default()
        },
        body,
    )
}

#[test]
fn test_scenario_fallback() {
    let mut root = scenario(false);
    assert_eq!(root.tick(&()).unwrap(), Some(Status::Success));
    assert_eq!(root.state(), &Flags { flag: false, x: 0, y: 2 });
}

#[test]
fn test_scenario_sequence() {
    let mut root = scenario(true);
    assert_eq!(root.tick(&()).unwrap(), Some(Status::Success));
    assert_eq!(root.state(), &Flags { flag: true, x: 1, y: 0 });
}

#[test]
fn test_root_store() {
    let mut root = scenario(true);
    assert_eq!(root.store().status(), Status::Ready);
    root.tick(&()).unwrap();
    root.tick(&()).unwrap();
    assert_eq!(root.store().status(), Status::Success);
    assert_eq!(root.store().run_count(), 2);
    assert_eq!(root.body().store().parent(), Some(root.id()));

    let snapshot = root.snapshot();
    assert_eq!(snapshot.kind, "Root");
    assert_eq!(snapshot.name.as_deref(), Some("scenario"));
    assert_eq!(snapshot.children[0].kind, "Selector");
}

#[test]
fn test_listeners_in_subscription_order() {
    let log = Rc::new(RefCell::new(vec![]));
    let mut root = scenario(false);
    let log2 = log.clone();
    root.on_tick_end(move |state| log2.borrow_mut().push(format!("end y={}", state.y)));
    let log2 = log.clone();
    let start = root.on_tick_start(move |state| log2.borrow_mut().push(format!("start y={}", state.y)));
    let log2 = log.clone();
    root.on_tick_start(move |_| log2.borrow_mut().push("second start".to_owned()));

    root.tick(&()).unwrap();
    assert_eq!(*log.borrow(), vec!["start y=0", "second start", "end y=2"]);

    assert!(root.remove_listener(start));
    assert!(!root.remove_listener(start));
    log.borrow_mut().clear();
    root.tick(&()).unwrap();
    assert_eq!(*log.borrow(), vec!["second start", "end y=2"]);
}

#[test]
fn test_state_callback_on_commit_only() {
    let commits = Rc::new(RefCell::new(vec![]));
    let commits2 = commits.clone();
    let mut root = scenario(false).with_state_callback(move |state| commits2.borrow_mut().push(state.clone()));
    root.tick(&()).unwrap();
    assert_eq!(*commits.borrow(), vec![Flags { flag: false, x: 0, y: 2 }]);

    let mut idle = Root::new("idle", Flags::default(), Node::condition("a", |state: &Flags, _: &()| state.flag));
    let count = Rc::new(RefCell::new(0));
    let count2 = count.clone();
    idle = idle.with_state_callback(move |_| *count2.borrow_mut() += 1);
    idle.tick(&()).unwrap();
    assert_eq!(*count.borrow(), 0);
}

#[test]
fn test_deactivated_root_is_noop() {
    let mut root = scenario(false);
    root.deactivate();
    assert!(!root.is_active());
    assert_eq!(root.tick(&()).unwrap(), None);
    assert_eq!(root.state(), &Flags::default());
    assert_eq!(root.store().run_count(), 0);

    root.activate();
    assert_eq!(root.tick(&()).unwrap(), Some(Status::Success));
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
struct Loader {
    ticks: u32,
    loaded: bool,
    value: i32,
}

#[test]
fn test_settled_action_reticks() {
    let (tx, rx) = oneshot::channel::<i32>();
    let rx = Rc::new(RefCell::new(Some(rx)));
    let body = Node::parallel(vec![
        Node::sequence(vec![
            Node::invert(Node::condition("loaded", |state: &Loader, _: &()| state.loaded)),
            Node::action("load", move |_: &mut Loader, _: &()| {
                let rx = rx.borrow_mut().take().expect("load started twice");
                Produced::<Loader>::pending(async move {
                    let value = rx.await.unwrap_or(-1);
                    move |state: &mut Loader| {
                        state.loaded = true;
                        state.value = value;
                    }
                })
            }),
        ]),
        Node::action("count", |state: &mut Loader, _: &()| state.ticks += 1),
    ]);
    let mut root = Root::new("loader", Loader::default(), body);
    let passes = Rc::new(RefCell::new(0));
    let passes2 = passes.clone();
    root.on_tick_start(move |_| *passes2.borrow_mut() += 1);

    assert_eq!(root.tick(&()).unwrap(), Some(Status::Running));
    assert!(!root.needs_tick());
    assert_eq!(root.tick_if_woken(&()).unwrap(), None);

    tx.send(42).unwrap();
    assert!(root.needs_tick());
    assert_eq!(root.tick_if_woken(&()).unwrap(), Some(Status::Success));
    assert_eq!(*passes.borrow(), 3);
    assert_eq!(
        root.state(),
        &Loader {
            ticks: 3,
            loaded: true,
            value: 42,
        }
    );
    assert!(!root.needs_tick());
    // The re-tick found the data loaded and failed the guarded branch.
    assert_eq!(root.store().status(), Status::Running);
}

#[test]
fn test_replace_state() {
    let mut root = scenario(false);
    root.replace_state(Flags {
        flag: true,
        ..Flags::default()
    });
    root.tick(&()).unwrap();
    assert_eq!(root.state().x, 1);
}
