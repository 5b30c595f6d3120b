use super::*;

impl<'src> TreeRootDef<'src> {
    fn new(name: &'src str, root: TreeDef<'src>) -> Self {
        Self { name, root }
    }
}

impl<'src> TreeDef<'src> {
    fn new(ty: &'src str) -> Self {
        Self {
            ty,
            arg: None,
            children: vec![],
        }
    }

    fn new_with_children(ty: &'src str, children: Vec<TreeDef<'src>>) -> Self {
        Self {
            ty,
            arg: None,
            children,
        }
    }

    fn with_arg(mut self, arg: NodeArg<'src>) -> Self {
        self.arg = Some(arg);
        self
    }
}

#[test]
fn test_trees() {
    assert_eq!(
        parse_tree(
            "tree main = Sequence {
        }"
        ),
        Ok(("", TreeRootDef::new("main", TreeDef::new("Sequence"))))
    );

    assert_eq!(
        parse_tree(
            "tree main = Sequence {
                    flag
        }"
        ),
        Ok((
            "",
            TreeRootDef::new(
                "main",
                TreeDef::new_with_child("Sequence", TreeDef::new("flag"))
            )
        ))
    );

    assert_eq!(
        parse_tree("tree leaf = flag"),
        Ok(("", TreeRootDef::new("leaf", TreeDef::new("flag"))))
    );
}

#[test]
fn test_children_on_one_line() {
    assert_eq!(
        parse_tree("tree main = Parallel { a b Sequence { c } }"),
        Ok((
            "",
            TreeRootDef::new(
                "main",
                TreeDef::new_with_children(
                    "Parallel",
                    vec![
                        TreeDef::new("a"),
                        TreeDef::new("b"),
                        TreeDef::new_with_child("Sequence", TreeDef::new("c")),
                    ]
                )
            )
        ))
    );
}

#[test]
fn test_node_args() {
    assert_eq!(
        parse_tree(
            r#"tree main = Selector {
                Decorator(ForceSuccess) { risky }
                State("drag\nstart") { sub }
                Portal(overlay) {}
            }"#
        ),
        Ok((
            "",
            TreeRootDef::new(
                "main",
                TreeDef::new_with_children(
                    "Selector",
                    vec![
                        TreeDef::new_with_child("Decorator", TreeDef::new("risky"))
                            .with_arg(NodeArg::Ref("ForceSuccess")),
                        TreeDef::new_with_child("State", TreeDef::new("sub"))
                            .with_arg(NodeArg::Literal("drag\nstart".to_owned())),
                        TreeDef::new("Portal").with_arg(NodeArg::Ref("overlay")),
                    ]
                )
            )
        ))
    );
}

#[test]
fn test_inverter_sugar() {
    assert_eq!(
        parse_tree(
            "tree main = Sequence {
                !blocked
                !!flag
            }"
        ),
        Ok((
            "",
            TreeRootDef::new(
                "main",
                TreeDef::new_with_children(
                    "Sequence",
                    vec![
                        TreeDef::new_with_child("Inverter", TreeDef::new("blocked")),
                        TreeDef::new_with_child(
                            "Inverter",
                            TreeDef::new_with_child("Inverter", TreeDef::new("flag"))
                        ),
                    ]
                )
            )
        ))
    );
}

#[test]
fn test_file() {
    let (rest, source) = parse_file(
        "tree main = Sequence {
            sub
        }
        tree sub = Selector {
            a
        }
        ",
    )
    .unwrap();
    assert_eq!(rest, "");
    assert_eq!(
        source,
        TreeSource {
            tree_defs: vec![
                TreeRootDef::new("main", TreeDef::new_with_child("Sequence", TreeDef::new("sub"))),
                TreeRootDef::new("sub", TreeDef::new_with_child("Selector", TreeDef::new("a"))),
            ],
        }
    );
    assert_eq!(source.tree_names().collect::<Vec<_>>(), vec!["main", "sub"]);
}

#[test]
fn test_line_comment() {
    let (rest, source) = parse_file(
        "# This is a comment at the top level.

tree main = Sequence { # This is a comment after opening brace.
           # This is a comment in a whole line.
    a # This is a comment after a node.
    Selector {
        b
    } # This is a comment after a closing brace.
}
# This is a comment at the end of the file.",
    )
    .unwrap();
    assert_eq!(rest, "");
    assert_eq!(
        source.tree_defs[0].root,
        TreeDef::new_with_children(
            "Sequence",
            vec![
                TreeDef::new("a"),
                TreeDef::new_with_child("Selector", TreeDef::new("b")),
            ]
        )
    );
}

#[test]
fn test_unconsumed_input() {
    let (rest, _) = parse_file("tree main = Sequence { a } }").unwrap();
    assert_eq!(rest, "}");
}
