use crate::{
    interpreter::{interpret, reset_final_states, TickContext},
    nodes::{Node, NodeSnapshot},
    store::{NodeId, Store},
    Status, TickError,
};
use futures::task::{self, ArcWake};
use log::{debug, trace};
use serde::{de::DeserializeOwned, Serialize};
use std::{
    fmt,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    task::Waker,
};

/// Raised by the waker handed to pending action computations.
#[derive(Default)]
struct TickSignal {
    woken: AtomicBool,
}

impl ArcWake for TickSignal {
    fn wake_by_ref(arc_self: &Arc<Self>) {
        arc_self.woken.store(true, Ordering::SeqCst);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickEvent {
    Start,
    End,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(usize);

struct Listener<S> {
    id: ListenerId,
    event: TickEvent,
    callback: Box<dyn FnMut(&S)>,
}

/// The tick entry point. Owns the canonical state and the tree body.
pub struct Root<S, P = ()> {
    id: NodeId,
    name: String,
    state: S,
    body: Node<S, P>,
    store: Store,
    on_state: Box<dyn FnMut(&S)>,
    listeners: Vec<Listener<S>>,
    next_listener: usize,
    signal: Arc<TickSignal>,
    waker: Waker,
    active: bool,
}

impl<S: 'static, P: 'static> Root<S, P> {
    pub fn new(name: impl Into<String>, state: S, body: Node<S, P>) -> Self {
        let signal = Arc::new(TickSignal::default());
        Self {
            id: NodeId::next(),
            name: name.into(),
            state,
            body,
            store: Store::default(),
            on_state: Box::new(|_: &S| ()),
            listeners: vec![],
            next_listener: 0,
            waker: task::waker(signal.clone()),
            signal,
            active: true,
        }
    }

    /// Called with the new canonical state every time an action commits.
    pub fn with_state_callback(mut self, callback: impl FnMut(&S) + 'static) -> Self {
        self.on_state = Box::new(callback);
        self
    }

    pub fn on_tick_start(&mut self, callback: impl FnMut(&S) + 'static) -> ListenerId {
        self.add_listener(TickEvent::Start, Box::new(callback))
    }

    pub fn on_tick_end(&mut self, callback: impl FnMut(&S) + 'static) -> ListenerId {
        self.add_listener(TickEvent::End, Box::new(callback))
    }

    fn add_listener(&mut self, event: TickEvent, callback: Box<dyn FnMut(&S)>) -> ListenerId {
        let id = ListenerId(self.next_listener);
        self.next_listener += 1;
        self.listeners.push(Listener {
            id,
            event,
            callback,
        });
        id
    }
}

impl<S, P> Root<S, P> {
    /// Returns whether a listener was removed.
    pub fn remove_listener(&mut self, id: ListenerId) -> bool {
        let len = self.listeners.len();
        self.listeners.retain(|listener| listener.id != id);
        self.listeners.len() != len
    }

    pub fn activate(&mut self) {
        self.active = true;
    }

    /// Makes [`Root::tick`] a no-op until [`Root::activate`] is called.
    pub fn deactivate(&mut self) {
        self.active = false;
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Returns `true` if a pending action computation made progress since the
    /// last tick pass began.
    pub fn needs_tick(&self) -> bool {
        self.signal.woken.load(Ordering::SeqCst)
    }

    /// Replaces the canonical state from outside a tick. The state callback is not invoked.
    pub fn replace_state(&mut self, state: S) {
        self.state = state;
    }

    pub fn state(&self) -> &S {
        &self.state
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn body(&self) -> &Node<S, P> {
        &self.body
    }

    /// The root's own bookkeeping: the status and pass count of the latest tick.
    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn snapshot(&self) -> NodeSnapshot {
        NodeSnapshot {
            id: self.id,
            kind: "Root",
            name: Some(self.name.clone()),
            status: self.store.status,
            run_count: self.store.run_count,
            resume_index: None,
            payload: None,
            children: vec![self.body.snapshot()],
        }
    }

    fn dispatch(&mut self, event: TickEvent) {
        let state = &self.state;
        for listener in self.listeners.iter_mut().filter(|listener| listener.event == event) {
            (listener.callback)(state);
        }
    }
}

impl<S, P> Root<S, P>
where
    S: Clone + Serialize + DeserializeOwned,
{
    /// Evaluates the tree once with `props`, followed by one more pass for
    /// every pass in which an asynchronous action settled.
    ///
    /// Returns the status of the first pass, or `None` if the root is deactivated.
    /// An error aborts the tick before the reset pass and the tick end
    /// notification.
    pub fn tick(&mut self, props: &P) -> Result<Option<Status>, TickError> {
        if !self.active {
            debug!("[ROOT] {:?} is inactive, tick ignored", self.name);
            return Ok(None);
        }
        let (status, mut retick) = self.pass(props)?;
        while retick {
            trace!("[ROOT] {:?} re-ticking after an action settled", self.name);
            retick = self.pass(props)?.1;
        }
        Ok(Some(status))
    }

    /// Ticks only if [`Root::needs_tick`] reports progress.
    pub fn tick_if_woken(&mut self, props: &P) -> Result<Option<Status>, TickError> {
        if !self.needs_tick() {
            return Ok(None);
        }
        self.tick(props)
    }

    fn pass(&mut self, props: &P) -> Result<(Status, bool), TickError> {
        self.signal.woken.store(false, Ordering::SeqCst);
        trace!("[ROOT] {:?} tick start", self.name);
        self.dispatch(TickEvent::Start);

        let mut cx = TickContext {
            props,
            waker: &self.waker,
            on_state: &mut *self.on_state,
            retick: false,
        };
        let status = interpret(&mut self.body, Some(self.id), &mut self.state, &mut cx)?;
        let retick = cx.retick;
        reset_final_states(&mut self.body);

        self.store.bump();
        self.store.status = status;
        self.dispatch(TickEvent::End);
        trace!("[ROOT] {:?} tick end: {:?}", self.name, status);
        Ok((status, retick))
    }
}

impl<S, P> fmt::Debug for Root<S, P> {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        fmt.debug_struct("Root")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("store", &self.store)
            .field("active", &self.active)
            .field("body", &self.body)
            .finish()
    }
}

#[cfg(test)]
mod test;
