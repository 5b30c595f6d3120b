//! Immutable state updates with replayable change sets.
//!
//! A recipe never touches the canonical state. It mutates a draft (a clone),
//! and the result is either committed whole (synchronous recipes) or, for
//! recipes that suspend, captured as a list of [`Patch`]es against the state the
//! recipe started from. Those patches can later be replayed on top of whatever
//! the canonical state has become in the meantime, which is what lets several
//! in-flight actions commute.

use crate::{error::PatchError, store::Settlement, TickError};
use futures::future::{FutureExt, LocalBoxFuture};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use std::{
    fmt,
    future::Future,
    task::{Context, Poll},
};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PathSegment {
    Index(usize),
    Key(String),
}

impl fmt::Display for PathSegment {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Index(i) => write!(fmt, "{}", i),
            Self::Key(key) => write!(fmt, "{}", key.replace('~', "~0").replace('/', "~1")),
        }
    }
}

/// One recorded change. Paths address the JSON image of the state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum Patch {
    Add { path: Vec<PathSegment>, value: Value },
    Replace { path: Vec<PathSegment>, value: Value },
    Remove { path: Vec<PathSegment> },
}

impl Patch {
    pub fn path(&self) -> &[PathSegment] {
        match self {
            Self::Add { path, .. } | Self::Replace { path, .. } | Self::Remove { path } => path,
        }
    }
}

/// Renders a path as a JSON pointer, e.g. `/items/0/name`.
pub(crate) fn pointer(path: &[PathSegment]) -> String {
    path.iter().map(|segment| format!("/{}", segment)).collect()
}

/// Computes the patches that turn `base` into `next`.
pub fn diff(base: &Value, next: &Value) -> Vec<Patch> {
    let mut patches = vec![];
    diff_into(&mut vec![], base, next, &mut patches);
    patches
}

fn diff_into(path: &mut Vec<PathSegment>, base: &Value, next: &Value, out: &mut Vec<Patch>) {
    if base == next {
        return;
    }
    match (base, next) {
        (Value::Object(lhs), Value::Object(rhs)) => {
            for (key, old) in lhs {
                path.push(PathSegment::Key(key.clone()));
                match rhs.get(key) {
                    Some(new) => diff_into(path, old, new, out),
                    None => out.push(Patch::Remove { path: path.clone() }),
                }
                path.pop();
            }
            for (key, new) in rhs.iter().filter(|(key, _)| !lhs.contains_key(*key)) {
                path.push(PathSegment::Key(key.clone()));
                out.push(Patch::Add {
                    path: path.clone(),
                    value: new.clone(),
                });
                path.pop();
            }
        }
        (Value::Array(lhs), Value::Array(rhs)) => {
            let common = lhs.len().min(rhs.len());
            for (i, (old, new)) in lhs.iter().zip(rhs).enumerate() {
                path.push(PathSegment::Index(i));
                diff_into(path, old, new, out);
                path.pop();
            }
            for (i, new) in rhs.iter().enumerate().skip(common) {
                path.push(PathSegment::Index(i));
                out.push(Patch::Add {
                    path: path.clone(),
                    value: new.clone(),
                });
                path.pop();
            }
            // Remove from the back so earlier indices stay valid while replaying.
            for i in (common..lhs.len()).rev() {
                path.push(PathSegment::Index(i));
                out.push(Patch::Remove { path: path.clone() });
                path.pop();
            }
        }
        _ => out.push(Patch::Replace {
            path: path.clone(),
            value: next.clone(),
        }),
    }
}

/// Replays `patches` in order on a copy of `base`.
///
/// The base may have moved on since the patches were captured, so the leaf
/// operations are lenient: an insertion past the end of an array appends,
/// a replacement past the end appends, and removing an index or key that is
/// already gone does nothing. Only a missing or incompatible parent is an error.
pub fn apply_patches(base: &Value, patches: &[Patch]) -> Result<Value, PatchError> {
    let mut doc = base.clone();
    for patch in patches {
        apply_patch(&mut doc, patch)?;
    }
    Ok(doc)
}

fn apply_patch(doc: &mut Value, patch: &Patch) -> Result<(), PatchError> {
    let Some((last, parent_path)) = patch.path().split_last() else {
        *doc = match patch {
            Patch::Add { value, .. } | Patch::Replace { value, .. } => value.clone(),
            Patch::Remove { .. } => Value::Null,
        };
        return Ok(());
    };

    let parent = resolve_mut(doc, parent_path)
        .ok_or_else(|| PatchError::MissingPath(pointer(parent_path)))?;

    match (parent, last, patch) {
        (Value::Object(map), PathSegment::Key(key), Patch::Add { value, .. })
        | (Value::Object(map), PathSegment::Key(key), Patch::Replace { value, .. }) => {
            map.insert(key.clone(), value.clone());
        }
        (Value::Object(map), PathSegment::Key(key), Patch::Remove { .. }) => {
            map.remove(key);
        }
        (Value::Array(items), PathSegment::Index(i), Patch::Add { value, .. }) => {
            let at = (*i).min(items.len());
            items.insert(at, value.clone());
        }
        (Value::Array(items), PathSegment::Index(i), Patch::Replace { value, .. }) => {
            match items.get_mut(*i) {
                Some(item) => *item = value.clone(),
                None => items.push(value.clone()),
            }
        }
        (Value::Array(items), PathSegment::Index(i), Patch::Remove { .. }) => {
            if *i < items.len() {
                items.remove(*i);
            }
        }
        _ => return Err(PatchError::TypeMismatch(pointer(patch.path()))),
    }
    Ok(())
}

fn resolve_mut<'a>(mut doc: &'a mut Value, path: &[PathSegment]) -> Option<&'a mut Value> {
    for segment in path {
        doc = match (doc, segment) {
            (Value::Object(map), PathSegment::Key(key)) => map.get_mut(key)?,
            (Value::Array(items), PathSegment::Index(i)) => items.get_mut(*i)?,
            _ => return None,
        };
    }
    Some(doc)
}

/// Changes an asynchronous recipe applies to its draft once it finishes.
pub type Mutation<S> = Box<dyn FnOnce(&mut S)>;

/// The outcome of the asynchronous part of a recipe.
pub enum Settled<S> {
    Resolved(Mutation<S>),
    Rejected(String),
}

/// What a recipe returns after its synchronous part ran against the draft.
pub enum Produced<S> {
    /// The draft is final and can be committed right away.
    Done,
    /// The recipe suspended. Changes already made to the draft are kept and
    /// the future's mutation is applied on top of them when it settles.
    Pending(LocalBoxFuture<'static, Settled<S>>),
}

impl<S: 'static> Produced<S> {
    pub fn pending<F, M>(fut: F) -> Self
    where
        F: Future<Output = M> + 'static,
        M: FnOnce(&mut S) + 'static,
    {
        Self::Pending(async move { Settled::Resolved(Box::new(fut.await) as Mutation<S>) }.boxed_local())
    }

    /// Like [`Produced::pending`], but an `Err` rejects the invocation.
    pub fn fallible<F, M, E>(fut: F) -> Self
    where
        F: Future<Output = Result<M, E>> + 'static,
        M: FnOnce(&mut S) + 'static,
        E: fmt::Display,
    {
        Self::Pending(
            async move {
                match fut.await {
                    Ok(mutation) => Settled::Resolved(Box::new(mutation) as Mutation<S>),
                    Err(e) => Settled::Rejected(e.to_string()),
                }
            }
            .boxed_local(),
        )
    }
}

impl<S> Produced<S> {
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending(_))
    }
}

impl<S> From<()> for Produced<S> {
    fn from(_: ()) -> Self {
        Self::Done
    }
}

impl<S> fmt::Debug for Produced<S> {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Done => write!(fmt, "Done"),
            Self::Pending(_) => write!(fmt, "Pending(..)"),
        }
    }
}

/// A suspended recipe invocation, together with the state image it started from.
pub struct InFlight<S> {
    base: Value,
    draft: S,
    future: LocalBoxFuture<'static, Settled<S>>,
}

impl<S: Serialize> InFlight<S> {
    /// Polls the suspended recipe. On completion the draft is finalized and
    /// captured as patches against the starting image.
    pub(crate) fn poll(&mut self, cx: &mut Context<'_>) -> Poll<Result<Settlement, TickError>> {
        match self.future.poll_unpin(cx) {
            Poll::Pending => Poll::Pending,
            Poll::Ready(Settled::Rejected(reason)) => Poll::Ready(Ok(Settlement::Rejected(reason))),
            Poll::Ready(Settled::Resolved(mutation)) => {
                mutation(&mut self.draft);
                Poll::Ready(capture(&self.base, &self.draft).map(Settlement::Resolved))
            }
        }
    }
}

pub enum Production<S> {
    Complete(S),
    Suspended(InFlight<S>),
}

/// Runs `recipe` against a draft of `base` without touching `base`.
pub fn produce<S, P>(
    base: &S,
    props: &P,
    recipe: &dyn Fn(&mut S, &P) -> Produced<S>,
) -> Result<Production<S>, TickError>
where
    S: Clone + Serialize,
{
    let mut draft = base.clone();
    Ok(match recipe(&mut draft, props) {
        Produced::Done => Production::Complete(draft),
        Produced::Pending(future) => Production::Suspended(InFlight {
            base: serde_json::to_value(base)?,
            draft,
            future,
        }),
    })
}

/// Captures the changes from `base` (a state image) to `draft` as patches.
pub fn capture<S: Serialize>(base: &Value, draft: &S) -> Result<Vec<Patch>, TickError> {
    Ok(diff(base, &serde_json::to_value(draft)?))
}

/// Replays `patches` on top of `current` and converts the result back.
pub fn rebase<S>(current: &S, patches: &[Patch]) -> Result<S, TickError>
where
    S: Serialize + DeserializeOwned,
{
    let image = serde_json::to_value(current)?;
    let next = apply_patches(&image, patches)?;
    Ok(serde_json::from_value(next)?)
}
