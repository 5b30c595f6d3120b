use super::*;

type TestNode = Node<i32, ()>;

fn yes() -> TestNode {
    Node::condition("yes", |_, _| true)
}

#[test]
fn test_sequence_store_has_resume_index() {
    let seq = TestNode::sequence(vec![yes(), yes()]);
    assert_eq!(seq.store().resume_index(), Some(0));
    assert_eq!(seq.store().status(), Status::Ready);
    assert_eq!(seq.child_count(), 2);

    let sel = TestNode::selector(vec![yes()]);
    assert_eq!(sel.store().resume_index(), None);
}

#[test]
fn test_kind_names() {
    let portal = Portal::new();
    let tree = TestNode::parallel(vec![
        Node::invert(yes()),
        Node::decorator(|status| status, yes()),
        Node::state("payload", yes()),
        Node::portal(&portal),
        Node::action("noop", |_, _| ()),
    ]);
    let kinds: Vec<_> = tree.snapshot().children.iter().map(|c| c.kind).collect();
    assert_eq!(kinds, vec!["Invert", "Decorator", "State", "Portal", "Action"]);
}

#[test]
fn test_portal_mount_unmount() {
    let portal = Portal::<i32, ()>::new();
    let a = yes();
    let a_id = a.id();
    assert!(portal.mount(a));
    assert!(portal.mount(yes()));
    assert_eq!(portal.len(), 2);
    assert!(portal.contains(a_id));

    let a = portal.unmount(a_id).unwrap();
    assert!(!portal.contains(a_id));
    assert!(portal.unmount(a_id).is_none());

    // Mounting again puts it at the end.
    assert!(portal.mount(a));
    assert_eq!(portal.children.borrow()[1].id(), a_id);

    portal.clear();
    assert!(portal.is_empty());
}

#[test]
fn test_portal_mount_is_identity_deduplicated() {
    let portal = Portal::<i32, ()>::new();
    let a = yes();
    let mut impostor = yes();
    impostor.id = a.id();
    assert!(portal.mount(a));
    assert!(!portal.mount(impostor));
    assert_eq!(portal.len(), 1);
}

#[test]
fn test_portal_handle_is_shared() {
    let portal = Portal::<i32, ()>::new();
    let node = TestNode::portal(&portal);
    portal.mount(yes());
    assert_eq!(node.child_count(), 1);
}

#[test]
fn test_find_portal() {
    let portal = Portal::new();
    let tree = TestNode::selector(vec![
        yes(),
        Node::invert(Node::portal(&portal).named("overlay")),
    ]);
    let found = tree.find_portal("overlay").unwrap();
    found.mount(yes());
    assert_eq!(portal.len(), 1);
    assert!(tree.find_portal("missing").is_none());
}

#[test]
fn test_state_payload() {
    let node = TestNode::state(serde_json::json!({"kind": "drag"}), yes());
    assert_eq!(node.payload(), Some(&serde_json::json!({"kind": "drag"})));
    assert_eq!(yes().payload(), None);
}

#[test]
fn test_snapshot_serialize() {
    let leaf = yes();
    let leaf_id = leaf.id();
    let tree = TestNode::sequence(vec![leaf]).named("root seq");
    let snapshot = tree.snapshot();
    assert_eq!(snapshot.find(leaf_id).map(|s| s.kind), Some("Condition"));

    let json = serde_json::to_value(&snapshot).unwrap();
    assert_eq!(json["kind"], "Sequence");
    assert_eq!(json["name"], "root seq");
    assert_eq!(json["status"], "Ready");
    assert_eq!(json["resume_index"], 0);
    assert_eq!(json["children"][0]["name"], "yes");
    assert!(json["children"][0].get("resume_index").is_none());
}
