use crate::{patch::Patch, Status};
use serde::Serialize;
use std::collections::VecDeque;
use std::fmt::{self, Display, Formatter};
use std::sync::atomic::{AtomicU64, Ordering};

/// Opaque identity of a node instance. Unique within the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct NodeId(u64);

impl NodeId {
    pub(crate) fn next() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl Display for NodeId {
    fn fmt(&self, fmt: &mut Formatter) -> fmt::Result {
        write!(fmt, "#{}", self.0)
    }
}

/// How an asynchronous action invocation ended.
#[derive(Debug, Clone, PartialEq)]
pub enum Settlement {
    /// The changes the action made, captured against the state it started from.
    Resolved(Vec<Patch>),
    Rejected(String),
}

/// Keys of the values a [`Store`] exposes to inspectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreKey {
    Status,
    RunCount,
    RanThisTick,
    /// Sequence nodes only.
    ResumeIndex,
    /// Action nodes only, while the oldest unconsumed settlement is resolved.
    PendingPatches,
    Parent,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StoreValue {
    Status(Status),
    Count(usize),
    Flag(bool),
    Index(usize),
    Patches(Vec<Patch>),
    Node(NodeId),
}

/// Per-node execution bookkeeping. Each node owns exactly one store.
#[derive(Debug, Clone, Default)]
pub struct Store {
    pub(crate) status: Status,
    pub(crate) run_count: usize,
    pub(crate) ran_this_tick: bool,
    pub(crate) resume_index: Option<usize>,
    /// Settled invocations of an action, oldest first, waiting to be consumed.
    pub(crate) settlements: VecDeque<Settlement>,
    /// The node that most recently evaluated this one. Informational only.
    pub(crate) parent: Option<NodeId>,
}

impl Store {
    pub(crate) fn for_sequence() -> Self {
        Self {
            resume_index: Some(0),
            ..Self::default()
        }
    }

    pub(crate) fn bump(&mut self) {
        self.run_count += 1;
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn run_count(&self) -> usize {
        self.run_count
    }

    pub fn ran_this_tick(&self) -> bool {
        self.ran_this_tick
    }

    pub fn resume_index(&self) -> Option<usize> {
        self.resume_index
    }

    /// The settlement the action consumes on its next resume.
    pub fn settlement(&self) -> Option<&Settlement> {
        self.settlements.front()
    }

    pub fn settlement_count(&self) -> usize {
        self.settlements.len()
    }

    pub fn pending_patches(&self) -> Option<&[Patch]> {
        match self.settlement() {
            Some(Settlement::Resolved(patches)) => Some(patches),
            _ => None,
        }
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn get(&self, key: StoreKey) -> Option<StoreValue> {
        match key {
            StoreKey::Status => Some(StoreValue::Status(self.status)),
            StoreKey::RunCount => Some(StoreValue::Count(self.run_count)),
            StoreKey::RanThisTick => Some(StoreValue::Flag(self.ran_this_tick)),
            StoreKey::ResumeIndex => self.resume_index.map(StoreValue::Index),
            StoreKey::PendingPatches => self
                .pending_patches()
                .map(|patches| StoreValue::Patches(patches.to_vec())),
            StoreKey::Parent => self.parent.map(StoreValue::Node),
        }
    }

    /// Returns the value under `key`, or `default` if this kind of node does not keep one.
    pub fn get_value(&self, key: StoreKey, default: StoreValue) -> StoreValue {
        self.get(key).unwrap_or(default)
    }
}
