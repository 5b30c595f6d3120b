use crate::{
    nodes::{ActionNode, Node, NodeKind, Predicate, Recipe, StatusMap},
    patch::Produced,
    Status,
};
use std::{collections::HashMap, rc::Rc};

/// Wraps a recipe returning anything convertible to [`Produced`] into a shared [`Recipe`].
pub fn boxify<S, P, R>(recipe: impl Fn(&mut S, &P) -> R + 'static) -> Recipe<S, P>
where
    R: Into<Produced<S>>,
{
    Rc::new(move |state: &mut S, props: &P| -> Produced<S> { recipe(state, props).into() })
}

/// Named conditions, actions and decorators that tree descriptions refer to.
pub struct Registry<S, P = ()> {
    conditions: HashMap<String, Predicate<S, P>>,
    actions: HashMap<String, Recipe<S, P>>,
    decorators: HashMap<String, StatusMap>,
}

impl<S, P> Default for Registry<S, P> {
    fn default() -> Self {
        let mut ret = Self {
            conditions: HashMap::new(),
            actions: HashMap::new(),
            decorators: HashMap::new(),
        };
        ret.register_decorator("ForceSuccess", |status| match status {
            Status::Failure => Status::Success,
            other => other,
        });
        ret.register_decorator("ForceFailure", |status| match status {
            Status::Success => Status::Failure,
            other => other,
        });
        ret.register_decorator("Inverter", Status::invert);
        ret
    }
}

impl<S, P> Registry<S, P> {
    pub fn register_condition(
        &mut self,
        name: impl ToString,
        predicate: impl Fn(&S, &P) -> bool + 'static,
    ) {
        self.conditions.insert(name.to_string(), Rc::new(predicate));
    }

    pub fn register_action<R>(&mut self, name: impl ToString, recipe: impl Fn(&mut S, &P) -> R + 'static)
    where
        R: Into<Produced<S>>,
    {
        self.actions.insert(name.to_string(), boxify(recipe));
    }

    pub fn register_decorator(&mut self, name: impl ToString, decorator: impl Fn(Status) -> Status + 'static) {
        self.decorators.insert(name.to_string(), Rc::new(decorator));
    }

    pub fn decorator(&self, name: &str) -> Option<StatusMap> {
        self.decorators.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.conditions.contains_key(name) || self.actions.contains_key(name)
    }
}

impl<S: 'static, P: 'static> Registry<S, P> {
    /// Instantiates the condition or action registered as `name`, conditions first.
    pub fn build(&self, name: &str) -> Option<Node<S, P>> {
        if let Some(predicate) = self.conditions.get(name) {
            return Some(Node::new(
                Some(name.to_owned()),
                NodeKind::Condition(predicate.clone()),
            ));
        }
        self.actions.get(name).map(|recipe| {
            Node::new(
                Some(name.to_owned()),
                NodeKind::Action(ActionNode::new(recipe.clone())),
            )
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_default_decorators() {
        let registry = Registry::<(), ()>::default();
        let force_success = registry.decorator("ForceSuccess").unwrap();
        assert_eq!(force_success(Status::Failure), Status::Success);
        assert_eq!(force_success(Status::Running), Status::Running);
        let force_failure = registry.decorator("ForceFailure").unwrap();
        assert_eq!(force_failure(Status::Success), Status::Failure);
        assert_eq!(force_failure(Status::Ready), Status::Ready);
        let inverter = registry.decorator("Inverter").unwrap();
        assert_eq!(inverter(Status::Success), Status::Failure);
        assert!(registry.decorator("Repeat").is_none());
    }

    #[test]
    fn test_build_prefers_conditions() {
        let mut registry = Registry::<i32, ()>::default();
        registry.register_action("ready", |state: &mut i32, _: &()| *state += 1);
        assert_eq!(registry.build("ready").unwrap().kind_name(), "Action");
        registry.register_condition("ready", |state, _| *state > 0);
        let node = registry.build("ready").unwrap();
        assert_eq!(node.kind_name(), "Condition");
        assert_eq!(node.name(), Some("ready"));
        assert!(registry.contains("ready"));
        assert!(registry.build("missing").is_none());
    }

    #[test]
    fn test_built_nodes_are_distinct() {
        let mut registry = Registry::<i32, ()>::default();
        registry.register_condition("positive", |state, _| *state > 0);
        let a = registry.build("positive").unwrap();
        let b = registry.build("positive").unwrap();
        assert_ne!(a.id(), b.id());
    }
}
