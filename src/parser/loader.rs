use super::nom_parser::{parse_file, TreeDef, TreeSource};
use crate::{
    error::{AddChildError, LoadError},
    nodes::{Node, Portal},
    Registry,
};
use serde_json::Value;

/// Instantiate a behavior tree from a AST of a tree.
///
/// The tree named `main` is the entry point. Every node type that is not built
/// in is looked up in `registry` first and then among the other trees of
/// `tree_source`, which are expanded in place.
pub fn load<S: 'static, P: 'static>(
    tree_source: &TreeSource,
    registry: &Registry<S, P>,
) -> Result<Node<S, P>, LoadError> {
    let main = tree_source
        .tree_defs
        .iter()
        .find(|tree| tree.name == "main")
        .ok_or(LoadError::MissingTree)?;

    let top = TreeStack {
        name: "main",
        parent: None,
    };

    load_recurse(&main.root, registry, tree_source, &top)
}

/// Parses `source` and loads its `main` tree in one go.
pub fn load_str<S: 'static, P: 'static>(
    source: &str,
    registry: &Registry<S, P>,
) -> Result<Node<S, P>, LoadError> {
    let (rest, tree_source) = parse_file(source).map_err(|e| LoadError::Parse(e.to_string()))?;
    if !rest.is_empty() {
        return Err(LoadError::Parse(rest.to_owned()));
    }
    load(&tree_source, registry)
}

/// A mechanism to detect infinite recursion. It is a linked list in call stack.
/// You can traverse the link back to enumerate all the subtree names (which is effectively function names)
/// and check if a subtree name to be inserted is already there.
///
/// Subtrees are expanded eagerly, so a recursive subtree would never finish
/// loading. We make it an error instead.
struct TreeStack<'a, 'src> {
    name: &'src str,
    parent: Option<&'a TreeStack<'a, 'src>>,
}

impl<'a, 'src> TreeStack<'a, 'src> {
    fn find(&self, name: &str) -> bool {
        if self.name == name {
            true
        } else if let Some(parent) = self.parent {
            parent.find(name)
        } else {
            false
        }
    }
}

fn load_recurse<S: 'static, P: 'static>(
    parent: &TreeDef,
    registry: &Registry<S, P>,
    tree_source: &TreeSource,
    parent_stack: &TreeStack,
) -> Result<Node<S, P>, LoadError> {
    let children = parent
        .children
        .iter()
        .map(|child| load_recurse(child, registry, tree_source, parent_stack))
        .collect::<Result<Vec<_>, _>>()?;

    let arg = parent
        .arg
        .as_ref()
        .map(|arg| Value::String(arg.as_str().to_owned()));

    if let Some(node) = build_node(parent.ty, arg, children, registry)? {
        return Ok(node);
    }

    let tree = tree_source
        .tree_defs
        .iter()
        .find(|tree| tree.name == parent.ty)
        .ok_or_else(|| LoadError::MissingNode(parent.ty.to_owned()))?;

    if !parent.children.is_empty() {
        return Err(LoadError::AddChildError(
            AddChildError::TooManyNodes,
            parent.ty.to_owned(),
        ));
    }

    // Prevent infinite recursion
    if parent_stack.find(parent.ty) {
        return Err(LoadError::InfiniteRecursion {
            node: parent.ty.to_owned(),
        });
    }
    let tree_stack = TreeStack {
        name: parent.ty,
        parent: Some(parent_stack),
    };
    let subtree = load_recurse(&tree.root, registry, tree_source, &tree_stack)?;
    Ok(if subtree.name().is_none() {
        subtree.named(parent.ty)
    } else {
        subtree
    })
}

/// Builds a built-in node or a registered leaf named `ty`.
///
/// `arg` is the portal name for `Portal`, the decorator name for `Decorator`
/// and the payload for `State`. Returns `Ok(None)` if `ty` names neither.
pub(crate) fn build_node<S: 'static, P: 'static>(
    ty: &str,
    arg: Option<Value>,
    children: Vec<Node<S, P>>,
    registry: &Registry<S, P>,
) -> Result<Option<Node<S, P>>, LoadError> {
    let node = match ty {
        "Sequence" => Node::sequence(children),
        "Selector" | "Fallback" => Node::selector(children),
        "Parallel" => Node::parallel(children),
        "Portal" => {
            let portal = Portal::new();
            for child in children {
                portal.mount(child);
            }
            let node = Node::portal(&portal);
            match arg.as_ref().and_then(Value::as_str) {
                Some(name) => node.named(name),
                None => node,
            }
        }
        "Invert" | "Inverter" => Node::invert(single_child(ty, children)?),
        "Decorator" => {
            let name = arg.as_ref().and_then(Value::as_str).unwrap_or_default();
            let decorator = registry
                .decorator(name)
                .ok_or_else(|| LoadError::MissingDecorator(name.to_owned()))?;
            let child = single_child(ty, children)?;
            Node::decorator(move |status| decorator(status), child).named(name)
        }
        "State" => Node::state(arg.unwrap_or(Value::Null), single_child(ty, children)?),
        _ => {
            let Some(leaf) = registry.build(ty) else {
                return Ok(None);
            };
            if !children.is_empty() {
                return Err(LoadError::AddChildError(
                    AddChildError::TooManyNodes,
                    ty.to_owned(),
                ));
            }
            leaf
        }
    };
    Ok(Some(node))
}

fn single_child<S, P>(ty: &str, children: Vec<Node<S, P>>) -> Result<Node<S, P>, LoadError> {
    let mut children = children.into_iter();
    match (children.next(), children.next()) {
        (Some(child), None) => Ok(child),
        (None, _) => Err(LoadError::AddChildError(
            AddChildError::MissingChild,
            ty.to_owned(),
        )),
        (Some(_), Some(_)) => Err(LoadError::AddChildError(
            AddChildError::TooManyNodes,
            ty.to_owned(),
        )),
    }
}
