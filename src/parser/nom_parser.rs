use nom::{
    branch::alt,
    bytes::complete::{is_not, tag},
    character::complete::{alpha1, alphanumeric1, char, multispace0, none_of, space0},
    combinator::{opt, recognize, value},
    multi::many0,
    sequence::{delimited, pair, preceded, terminated, tuple},
    IResult,
};

#[derive(Debug, PartialEq, Eq)]
pub struct TreeDef<'src> {
    pub(crate) ty: &'src str,
    pub(crate) arg: Option<NodeArg<'src>>,
    pub(crate) children: Vec<TreeDef<'src>>,
}

impl<'src> TreeDef<'src> {
    fn new_with_child(ty: &'src str, child: TreeDef<'src>) -> Self {
        Self {
            ty,
            arg: None,
            children: vec![child],
        }
    }

    pub fn ty(&self) -> &'src str {
        self.ty
    }

    pub fn children(&self) -> &[TreeDef<'src>] {
        &self.children
    }
}

/// The parenthesized argument of a built-in node, e.g. the decorator name in
/// `Decorator(ForceSuccess)` or the payload in `State("drag")`.
#[derive(Debug, PartialEq, Eq)]
pub enum NodeArg<'src> {
    /// Literal value could have decoded, so it is an owned string.
    Literal(String),
    Ref(&'src str),
}

impl<'src> NodeArg<'src> {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Literal(s) => s.as_str(),
            Self::Ref(s) => *s,
        }
    }
}

#[derive(Debug, PartialEq)]
pub struct TreeRootDef<'src> {
    pub(crate) name: &'src str,
    pub(crate) root: TreeDef<'src>,
}

#[derive(Debug, PartialEq)]
pub struct TreeSource<'src> {
    pub tree_defs: Vec<TreeRootDef<'src>>,
}

impl<'src> TreeSource<'src> {
    pub fn tree_names(&self) -> impl Iterator<Item = &'src str> + '_ {
        self.tree_defs.iter().map(|tree| tree.name)
    }
}

fn identifier(input: &str) -> IResult<&str, &str> {
    recognize(pair(
        alt((alpha1, tag("_"))),
        many0(alt((alphanumeric1, tag("_")))),
    ))(input)
}

fn open_paren(i: &str) -> IResult<&str, ()> {
    value((), delimited(space0, char('('), space0))(i)
}

fn close_paren(i: &str) -> IResult<&str, ()> {
    value((), delimited(space0, char(')'), space0))(i)
}

fn open_brace(i: &str) -> IResult<&str, ()> {
    value((), delimited(space0, char('{'), space0))(i)
}

fn close_brace(i: &str) -> IResult<&str, ()> {
    value((), delimited(multispace0, char('}'), space0))(i)
}

fn line_comment<T>(i: &str) -> IResult<&str, Option<T>> {
    let (i, _) = tuple((space0, char('#'), opt(is_not("\n\r"))))(i)?;

    Ok((i, None))
}

fn some<I, R>(f: impl Fn(I) -> IResult<I, R>) -> impl Fn(I) -> IResult<I, Option<R>> {
    move |i| {
        let (i, res) = f(i)?;
        Ok((i, Some(res)))
    }
}

fn parse_tree(i: &str) -> IResult<&str, TreeRootDef> {
    let (i, _) = delimited(multispace0, tag("tree"), space0)(i)?;

    let (i, name) = delimited(space0, identifier, space0)(i)?;

    let (i, _) = delimited(space0, tag("="), space0)(i)?;

    let (i, root) = parse_node_expr(i)?;

    Ok((i, TreeRootDef { name, root }))
}

/// Children may be separated by any whitespace, including newlines.
fn tree_children(i: &str) -> IResult<&str, Vec<TreeDef>> {
    let (i, v) = many0(delimited(
        multispace0,
        alt((line_comment, some(parse_node_expr))),
        space0,
    ))(i)?;

    Ok((i, v.into_iter().flatten().collect()))
}

fn parse_tree_node(i: &str) -> IResult<&str, TreeDef> {
    let (i, ty) = delimited(space0, identifier, space0)(i)?;

    let (i, arg) = opt(delimited(open_paren, node_arg, close_paren))(i)?;

    let (i, children) = opt(delimited(open_brace, tree_children, close_brace))(i)?;

    let (i, _) = opt(line_comment::<()>)(i)?;

    Ok((
        i,
        TreeDef {
            ty,
            arg,
            children: children.unwrap_or_default(),
        },
    ))
}

/// `!x` is sugar for `Inverter { x }`.
fn parse_node_expr(i: &str) -> IResult<&str, TreeDef> {
    let (i, excl) = opt(delimited(space0, char('!'), space0))(i)?;

    if excl.is_some() {
        let (i, res) = parse_node_expr(i)?;

        Ok((i, TreeDef::new_with_child("Inverter", res)))
    } else {
        parse_tree_node(i)
    }
}

fn node_arg(i: &str) -> IResult<&str, NodeArg> {
    delimited(space0, alt((arg_ref, str_literal)), space0)(i)
}

fn arg_ref(i: &str) -> IResult<&str, NodeArg> {
    let (i, s) = identifier(i)?;
    Ok((i, NodeArg::Ref(s)))
}

fn str_literal(input: &str) -> IResult<&str, NodeArg> {
    let (r, val) = delimited(
        preceded(multispace0, char('\"')),
        many0(none_of("\"")),
        terminated(char('"'), multispace0),
    )(input)?;
    Ok((
        r,
        NodeArg::Literal(
            val.iter()
                .collect::<String>()
                .replace("\\\\", "\\")
                .replace("\\n", "\n"),
        ),
    ))
}

pub fn parse_file(i: &str) -> IResult<&str, TreeSource> {
    let (i, stmts) = many0(alt((
        preceded(multispace0, line_comment),
        some(parse_tree),
    )))(i)?;

    // Eat up trailing newlines to indicate that the input was thoroughly consumed
    let (i, _) = multispace0(i)?;

    Ok((
        i,
        TreeSource {
            tree_defs: stmts.into_iter().flatten().collect(),
        },
    ))
}

#[cfg(test)]
mod test;
