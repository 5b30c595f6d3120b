use super::loader::build_node;
use crate::{error::LoadError, nodes::Node, Registry};
use serde::Deserialize;
use std::collections::HashMap;

#[derive(Debug, Deserialize)]
struct YamlSource {
    behavior_tree: HashMap<String, YamlNode>,
}

#[derive(Debug, Deserialize)]
struct YamlNode {
    #[serde(rename = "type")]
    ty: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    decorator: Option<String>,
    /// Any YAML value, kept as its JSON image.
    #[serde(default)]
    payload: Option<serde_json::Value>,
    #[serde(default)]
    children: Vec<YamlNode>,
}

fn recurse_parse<S: 'static, P: 'static>(
    value: &YamlNode,
    reg: &Registry<S, P>,
) -> Result<Node<S, P>, LoadError> {
    let children = value
        .children
        .iter()
        .map(|child| recurse_parse(child, reg))
        .collect::<Result<Vec<_>, _>>()?;

    let arg = match value.ty.as_str() {
        "Portal" => value.name.clone().map(serde_json::Value::String),
        "Decorator" => value.decorator.clone().map(serde_json::Value::String),
        _ => value.payload.clone(),
    };

    let node = build_node(&value.ty, arg, children, reg)?
        .ok_or_else(|| LoadError::MissingNode(value.ty.clone()))?;

    Ok(match &value.name {
        Some(name) => node.named(name),
        None => node,
    })
}

/// Loads every tree under the `behavior_tree` mapping, keyed by tree name.
pub fn load_yaml<S: 'static, P: 'static>(
    yaml: &str,
    reg: &Registry<S, P>,
) -> Result<HashMap<String, Node<S, P>>, LoadError> {
    let source: YamlSource = serde_yaml::from_str(yaml)?;
    let mut trees = HashMap::new();
    for (name, value) in &source.behavior_tree {
        trees.insert(name.clone(), recurse_parse(value, reg)?);
    }
    Ok(trees)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{Root, Status};
    use serde::Serialize;
    use serde_json::json;

    #[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
    struct Lamp {
        on: bool,
        toggles: u32,
    }

    fn registry() -> Registry<Lamp> {
        let mut registry = Registry::default();
        registry.register_condition("isOn", |lamp: &Lamp, _: &()| lamp.on);
        registry.register_action("toggle", |lamp: &mut Lamp, _: &()| {
            lamp.on = !lamp.on;
            lamp.toggles += 1;
        });
        registry
    }

    #[test]
    fn test_load_yaml() {
        let yaml = r#"
behavior_tree:
  main:
    type: Selector
    children:
    - type: isOn
    - type: State
      payload:
        label: switch
        weight: 3
      children:
      - type: toggle
  overlay:
    type: Portal
    name: hud
"#;
        let mut trees = load_yaml(yaml, &registry()).unwrap();
        assert_eq!(trees.len(), 2);

        let overlay = trees.remove("overlay").unwrap();
        assert!(overlay.find_portal("hud").is_some());

        let main = trees.remove("main").unwrap();
        let snapshot = main.snapshot();
        assert_eq!(
            snapshot.children[1].payload,
            Some(json!({"label": "switch", "weight": 3}))
        );

        let mut root = Root::new("lamp", Lamp::default(), main);
        assert_eq!(root.tick(&()).unwrap(), Some(Status::Success));
        assert_eq!(root.state(), &Lamp { on: true, toggles: 1 });
        assert_eq!(root.tick(&()).unwrap(), Some(Status::Success));
        assert_eq!(root.state().toggles, 1);
    }

    #[test]
    fn test_yaml_decorator() {
        let yaml = r#"
behavior_tree:
  main:
    type: Decorator
    decorator: ForceFailure
    children:
    - type: toggle
"#;
        let mut trees = load_yaml(yaml, &registry()).unwrap();
        let mut root = Root::new("lamp", Lamp::default(), trees.remove("main").unwrap());
        assert_eq!(root.tick(&()).unwrap(), Some(Status::Failure));
        assert!(root.state().on);
    }

    #[test]
    fn test_yaml_errors() {
        let res = load_yaml("behavior_tree:\n  main:\n    type: Blink\n", &registry());
        assert!(matches!(res, Err(LoadError::MissingNode(ref node)) if node == "Blink"));

        let res = load_yaml("trees: {}\n", &registry());
        assert!(matches!(res, Err(LoadError::Yaml(_))));

        let res = load_yaml(
            "behavior_tree:\n  main:\n    type: Invert\n",
            &registry(),
        );
        assert!(matches!(res, Err(LoadError::AddChildError(..))));
    }
}
