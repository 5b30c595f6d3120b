use crate::{
    nodes::{ActionNode, Node, NodeKind},
    patch::{self, Production},
    store::{NodeId, Settlement, Store},
    Status, TickError,
};
use log::{debug, warn};
use serde::{de::DeserializeOwned, Serialize};
use std::task::{Context, Poll, Waker};

/// Everything a single tick pass shares across the recursion.
pub(crate) struct TickContext<'a, S, P> {
    pub props: &'a P,
    pub waker: &'a Waker,
    pub on_state: &'a mut dyn FnMut(&S),
    /// Set when an asynchronous action settled and the tree should be ticked again.
    pub retick: bool,
}

impl<'a, S, P> TickContext<'a, S, P> {
    fn commit(&mut self, state: &mut S, next: S) {
        *state = next;
        (self.on_state)(state);
    }
}

/// Evaluates `node` against the canonical `state`.
///
/// Every visited node is marked as run this tick and remembers `parent` as
/// the node that evaluated it.
pub(crate) fn interpret<S, P>(
    node: &mut Node<S, P>,
    parent: Option<NodeId>,
    state: &mut S,
    cx: &mut TickContext<S, P>,
) -> Result<Status, TickError>
where
    S: Clone + Serialize + DeserializeOwned,
{
    let id = Some(node.id);
    let name = node.name.as_deref().unwrap_or("");
    let store = &mut node.store;
    store.ran_this_tick = true;
    store.parent = parent;

    match &mut node.kind {
        NodeKind::Condition(predicate) => {
            store.bump();
            store.status = Status::Running;
            let status = Status::from(predicate(state, cx.props));
            debug!("[CONDITION] {:?} {:?}", name, status);
            store.status = status;
            Ok(status)
        }
        NodeKind::Action(action) => interpret_action(action, store, name, state, cx),
        NodeKind::Invert(child) => {
            store.bump();
            store.status = Status::Running;
            let status = interpret(&mut **child, id, state, cx)?.invert();
            if status.is_done() {
                store.status = status;
            }
            Ok(status)
        }
        NodeKind::Decorator { decorator, child } => {
            store.bump();
            let status = decorator(interpret(&mut **child, id, state, cx)?);
            store.status = status;
            Ok(status)
        }
        NodeKind::State { child, .. } => {
            store.bump();
            let status = interpret(&mut **child, id, state, cx)?;
            store.status = status;
            Ok(status)
        }
        NodeKind::Parallel(children) => {
            store.bump();
            store.status = Status::Running;
            let status = interpret_parallel(children, id, state, cx)?;
            store.status = status;
            Ok(status)
        }
        NodeKind::Portal(portal) => {
            store.bump();
            store.status = Status::Running;
            let status = interpret_parallel(portal.children.borrow_mut().as_mut_slice(), id, state, cx)?;
            store.status = status;
            Ok(status)
        }
        NodeKind::Sequence(children) => {
            store.bump();
            store.status = Status::Running;
            let mut index = store.resume_index.unwrap_or(0);
            while let Some(child) = children.get_mut(index) {
                match interpret(child, id, state, cx)? {
                    Status::Success => {
                        index += 1;
                        store.resume_index = Some(index);
                    }
                    Status::Running => {
                        store.resume_index = Some(index);
                        return Ok(Status::Running);
                    }
                    // A child remapped to Ready counts as a failure.
                    Status::Failure | Status::Ready => {
                        store.resume_index = Some(0);
                        store.status = Status::Failure;
                        return Ok(Status::Failure);
                    }
                }
            }
            store.resume_index = Some(0);
            store.status = Status::Success;
            Ok(Status::Success)
        }
        NodeKind::Selector(children) => {
            store.bump();
            store.status = Status::Running;
            for child in children.iter_mut() {
                let status = interpret(child, id, state, cx)?;
                if matches!(status, Status::Success | Status::Running) {
                    store.status = status;
                    return Ok(status);
                }
            }
            store.status = Status::Failure;
            Ok(Status::Failure)
        }
    }
}

fn interpret_parallel<S, P>(
    children: &mut [Node<S, P>],
    parent: Option<NodeId>,
    state: &mut S,
    cx: &mut TickContext<S, P>,
) -> Result<Status, TickError>
where
    S: Clone + Serialize + DeserializeOwned,
{
    let (mut successes, mut failures) = (0, 0);
    for child in children.iter_mut() {
        match interpret(child, parent, state, cx)? {
            Status::Success => successes += 1,
            Status::Failure | Status::Ready => failures += 1,
            Status::Running => (),
        }
    }
    Ok(if successes == children.len() {
        Status::Success
    } else if failures == children.len() {
        Status::Failure
    } else {
        Status::Running
    })
}

fn interpret_action<S, P>(
    action: &mut ActionNode<S, P>,
    store: &mut Store,
    name: &str,
    state: &mut S,
    cx: &mut TickContext<S, P>,
) -> Result<Status, TickError>
where
    S: Clone + Serialize + DeserializeOwned,
{
    // Earlier invocations keep running across restarts, so collect whatever
    // settled since the last visit before doing anything else.
    collect_settled(action, store, cx.waker)?;

    if store.status.is_running() {
        return resume_action(store, name, state, cx);
    }

    store.bump();
    if action.is_in_flight() || !store.settlements.is_empty() {
        debug!(
            "[ASYNC_ACTION] {:?} restarted with {} unsettled and {} unconsumed invocations",
            name,
            action.in_flight.len(),
            store.settlements.len()
        );
    }

    match patch::produce(state, cx.props, &*action.recipe)? {
        Production::Complete(next) => {
            debug!("[ACTION] {:?} succeeded", name);
            cx.commit(state, next);
            store.status = Status::Success;
            Ok(Status::Success)
        }
        Production::Suspended(mut in_flight) => {
            debug!("[ASYNC_ACTION] {:?} is running", name);
            store.status = Status::Running;
            // Poll once so the computation registers the waker.
            match in_flight.poll(&mut Context::from_waker(cx.waker)) {
                Poll::Pending => action.in_flight.push(in_flight),
                Poll::Ready(settlement) => {
                    store.settlements.push_back(settlement?);
                    cx.waker.wake_by_ref();
                }
            }
            Ok(Status::Running)
        }
    }
}

/// Polls every unsettled invocation and queues the settled ones in order.
fn collect_settled<S, P>(action: &mut ActionNode<S, P>, store: &mut Store, waker: &Waker) -> Result<(), TickError>
where
    S: Serialize,
{
    let mut cx = Context::from_waker(waker);
    let mut i = 0;
    while let Some(in_flight) = action.in_flight.get_mut(i) {
        match in_flight.poll(&mut cx) {
            Poll::Pending => i += 1,
            Poll::Ready(settlement) => {
                action.in_flight.remove(i);
                store.settlements.push_back(settlement?);
            }
        }
    }
    Ok(())
}

fn resume_action<S, P>(
    store: &mut Store,
    name: &str,
    state: &mut S,
    cx: &mut TickContext<S, P>,
) -> Result<Status, TickError>
where
    S: Clone + Serialize + DeserializeOwned,
{
    match store.settlements.pop_front() {
        None => {
            debug!("[ASYNC_ACTION] {:?} is pending", name);
            Ok(Status::Running)
        }
        Some(Settlement::Resolved(patches)) => match patch::rebase(state, &patches) {
            Ok(next) => {
                debug!(
                    "[ASYNC_ACTION] {:?} resolved, rebased {} patches",
                    name,
                    patches.len()
                );
                store.status = Status::Success;
                cx.commit(state, next);
                cx.retick = true;
                Ok(Status::Success)
            }
            Err(e) => {
                warn!("[ASYNC_ACTION] {:?} could not be rebased, dropping its patches: {}", name, e);
                store.status = Status::Failure;
                cx.retick = true;
                Ok(Status::Failure)
            }
        },
        Some(Settlement::Rejected(reason)) => {
            warn!("[ASYNC_ACTION] {:?} rejected: {}", name, reason);
            store.status = Status::Failure;
            cx.retick = true;
            Ok(Status::Failure)
        }
    }
}

/// Re-arms quiescent subtrees after a tick and clears the per-tick flags of
/// every node in the tree, visited or not.
pub(crate) fn reset_final_states<S, P>(node: &mut Node<S, P>) {
    let ran = node.store.ran_this_tick;
    let store = &mut node.store;
    match &mut node.kind {
        NodeKind::Action(_) => {
            if !ran {
                store.status = Status::Ready;
            }
        }
        NodeKind::Condition(_) => (),
        NodeKind::Decorator { child, .. } | NodeKind::State { child, .. } => {
            reset_final_states(&mut **child)
        }
        NodeKind::Invert(child) => reset_composite(store, std::slice::from_mut(&mut **child), true),
        NodeKind::Sequence(children) => {
            // A sequence that finished (either way) is back at its first child.
            let finished = !ran || store.resume_index == Some(0);
            reset_composite(store, children, finished)
        }
        NodeKind::Selector(children) | NodeKind::Parallel(children) => {
            reset_composite(store, children, true)
        }
        NodeKind::Portal(portal) => reset_composite(store, portal.children.borrow_mut().as_mut_slice(), true),
    }
    node.store.ran_this_tick = false;
}

fn reset_composite<S, P>(store: &mut Store, children: &mut [Node<S, P>], finished: bool) {
    let has_running_children = children.iter().any(|child| child.store.status.is_running());
    if !has_running_children && finished {
        store.status = Status::Ready;
        if store.resume_index.is_some() {
            store.resume_index = Some(0);
        }
        for child in children.iter_mut() {
            child.store.status = Status::Ready;
        }
    }
    for child in children.iter_mut() {
        reset_final_states(child);
    }
}
