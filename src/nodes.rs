use crate::{
    patch::{InFlight, Produced},
    registry::boxify,
    store::{NodeId, Store},
    Status,
};
use serde::Serialize;
use serde_json::Value;
use std::{cell::RefCell, fmt, rc::Rc};

pub type Predicate<S, P> = Rc<dyn Fn(&S, &P) -> bool>;
pub type Recipe<S, P> = Rc<dyn Fn(&mut S, &P) -> Produced<S>>;
pub type StatusMap = Rc<dyn Fn(Status) -> Status>;

/// A node of the tree body. The variant is fixed at construction.
pub struct Node<S, P = ()> {
    pub(crate) id: NodeId,
    pub(crate) name: Option<String>,
    pub(crate) store: Store,
    pub(crate) kind: NodeKind<S, P>,
}

pub enum NodeKind<S, P> {
    /// Ticks children in order, resuming from the child that was Running.
    Sequence(Vec<Node<S, P>>),
    /// Ticks children in order from the first one, every tick.
    Selector(Vec<Node<S, P>>),
    /// Ticks every child, every tick.
    Parallel(Vec<Node<S, P>>),
    /// A Parallel whose children can be mounted and unmounted between ticks.
    Portal(Portal<S, P>),
    Invert(Box<Node<S, P>>),
    Decorator {
        decorator: StatusMap,
        child: Box<Node<S, P>>,
    },
    /// Pass-through wrapper carrying data for inspectors. The payload never
    /// influences evaluation.
    State {
        payload: Value,
        child: Box<Node<S, P>>,
    },
    Condition(Predicate<S, P>),
    Action(ActionNode<S, P>),
}

pub struct ActionNode<S, P> {
    pub(crate) recipe: Recipe<S, P>,
    /// Suspended invocations that have not settled yet, oldest first.
    /// Restarting the action never cancels them.
    pub(crate) in_flight: Vec<InFlight<S>>,
}

impl<S, P> ActionNode<S, P> {
    pub(crate) fn new(recipe: Recipe<S, P>) -> Self {
        Self {
            recipe,
            in_flight: Vec::new(),
        }
    }

    pub fn is_in_flight(&self) -> bool {
        !self.in_flight.is_empty()
    }

    pub fn in_flight_count(&self) -> usize {
        self.in_flight.len()
    }
}

/// Shared handle to the child list of a portal node.
///
/// Keep a clone of the handle to mount and unmount subtrees between ticks.
/// Mutating the handle from inside a tick (e.g. from a recipe) panics.
pub struct Portal<S, P = ()> {
    pub(crate) children: Rc<RefCell<Vec<Node<S, P>>>>,
}

impl<S, P> Clone for Portal<S, P> {
    fn clone(&self) -> Self {
        Self {
            children: self.children.clone(),
        }
    }
}

impl<S, P> Default for Portal<S, P> {
    fn default() -> Self {
        Self {
            children: Rc::new(RefCell::new(vec![])),
        }
    }
}

impl<S, P> Portal<S, P> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `child` unless a node with the same identity is already mounted.
    /// Returns whether the child was mounted.
    pub fn mount(&self, child: Node<S, P>) -> bool {
        let mut children = self.children.borrow_mut();
        if children.iter().any(|node| node.id == child.id) {
            return false;
        }
        children.push(child);
        true
    }

    pub fn unmount(&self, id: NodeId) -> Option<Node<S, P>> {
        let mut children = self.children.borrow_mut();
        let index = children.iter().position(|node| node.id == id)?;
        Some(children.remove(index))
    }

    pub fn clear(&self) -> &Self {
        self.children.borrow_mut().clear();
        self
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.children.borrow().iter().any(|node| node.id == id)
    }

    pub fn len(&self) -> usize {
        self.children.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.borrow().is_empty()
    }
}

impl<S: 'static, P: 'static> Node<S, P> {
    pub(crate) fn new(name: Option<String>, kind: NodeKind<S, P>) -> Self {
        let store = match &kind {
            NodeKind::Sequence(_) => Store::for_sequence(),
            _ => Store::default(),
        };
        Self {
            id: NodeId::next(),
            name,
            store,
            kind,
        }
    }

    pub fn sequence(children: Vec<Node<S, P>>) -> Self {
        Self::new(None, NodeKind::Sequence(children))
    }

    pub fn selector(children: Vec<Node<S, P>>) -> Self {
        Self::new(None, NodeKind::Selector(children))
    }

    pub fn parallel(children: Vec<Node<S, P>>) -> Self {
        Self::new(None, NodeKind::Parallel(children))
    }

    /// A portal node ticking whatever is mounted on `portal`.
    pub fn portal(portal: &Portal<S, P>) -> Self {
        Self::new(None, NodeKind::Portal(portal.clone()))
    }

    pub fn invert(child: Node<S, P>) -> Self {
        Self::new(None, NodeKind::Invert(Box::new(child)))
    }

    pub fn decorator(decorator: impl Fn(Status) -> Status + 'static, child: Node<S, P>) -> Self {
        Self::new(
            None,
            NodeKind::Decorator {
                decorator: Rc::new(decorator),
                child: Box::new(child),
            },
        )
    }

    pub fn state(payload: impl Into<Value>, child: Node<S, P>) -> Self {
        Self::new(
            None,
            NodeKind::State {
                payload: payload.into(),
                child: Box::new(child),
            },
        )
    }

    pub fn condition(name: impl Into<String>, predicate: impl Fn(&S, &P) -> bool + 'static) -> Self {
        Self::new(Some(name.into()), NodeKind::Condition(Rc::new(predicate)))
    }

    /// An action whose recipe mutates a draft of the state.
    ///
    /// Recipes returning `()` complete synchronously; return
    /// [`Produced::pending`] to suspend.
    pub fn action<R>(name: impl Into<String>, recipe: impl Fn(&mut S, &P) -> R + 'static) -> Self
    where
        R: Into<Produced<S>>,
    {
        Self::new(Some(name.into()), NodeKind::Action(ActionNode::new(boxify(recipe))))
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

impl<S, P> Node<S, P> {
    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn kind(&self) -> &NodeKind<S, P> {
        &self.kind
    }

    pub fn kind_name(&self) -> &'static str {
        match self.kind {
            NodeKind::Sequence(_) => "Sequence",
            NodeKind::Selector(_) => "Selector",
            NodeKind::Parallel(_) => "Parallel",
            NodeKind::Portal(_) => "Portal",
            NodeKind::Invert(_) => "Invert",
            NodeKind::Decorator { .. } => "Decorator",
            NodeKind::State { .. } => "State",
            NodeKind::Condition(_) => "Condition",
            NodeKind::Action(_) => "Action",
        }
    }

    /// The auxiliary data of a State wrapper.
    pub fn payload(&self) -> Option<&Value> {
        match &self.kind {
            NodeKind::State { payload, .. } => Some(payload),
            _ => None,
        }
    }

    pub(crate) fn with_children<R>(&self, f: impl FnOnce(&[Node<S, P>]) -> R) -> R {
        match &self.kind {
            NodeKind::Sequence(children) | NodeKind::Selector(children) | NodeKind::Parallel(children) => {
                f(children)
            }
            NodeKind::Portal(portal) => f(&portal.children.borrow()),
            NodeKind::Invert(child)
            | NodeKind::Decorator { child, .. }
            | NodeKind::State { child, .. } => f(std::slice::from_ref(&**child)),
            NodeKind::Condition(_) | NodeKind::Action(_) => f(&[]),
        }
    }

    pub fn child_count(&self) -> usize {
        self.with_children(|children| children.len())
    }

    /// Finds the handle of the first portal named `name` in this subtree.
    pub fn find_portal(&self, name: &str) -> Option<Portal<S, P>> {
        if let NodeKind::Portal(portal) = &self.kind {
            if self.name.as_deref() == Some(name) {
                return Some(portal.clone());
            }
        }
        self.with_children(|children| children.iter().find_map(|child| child.find_portal(name)))
    }

    pub fn snapshot(&self) -> NodeSnapshot {
        NodeSnapshot {
            id: self.id,
            kind: self.kind_name(),
            name: self.name.clone(),
            status: self.store.status,
            run_count: self.store.run_count,
            resume_index: self.store.resume_index,
            payload: self.payload().cloned(),
            children: self.with_children(|children| children.iter().map(Node::snapshot).collect()),
        }
    }
}

impl<S, P> fmt::Debug for Node<S, P> {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        fmt.debug_struct(self.kind_name())
            .field("id", &self.id)
            .field("name", &self.name)
            .field("store", &self.store)
            .finish()
    }
}

/// A read-only copy of a subtree's bookkeeping, for inspectors.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeSnapshot {
    pub id: NodeId,
    pub kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub status: Status,
    pub run_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resume_index: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
    pub children: Vec<NodeSnapshot>,
}

impl NodeSnapshot {
    pub fn find(&self, id: NodeId) -> Option<&NodeSnapshot> {
        if self.id == id {
            return Some(self);
        }
        self.children.iter().find_map(|child| child.find(id))
    }
}

#[cfg(test)]
mod test;
