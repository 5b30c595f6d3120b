use std::fmt::{self, Display, Formatter};

/// A patch list could not be replayed against a base state.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum PatchError {
    /// The parent container addressed by the patch does not exist in the base state.
    MissingPath(String),
    /// The parent exists but is not the kind of container the path segment addresses.
    TypeMismatch(String),
}

impl Display for PatchError {
    fn fmt(&self, fmt: &mut Formatter) -> fmt::Result {
        match self {
            Self::MissingPath(path) => write!(fmt, "Path {:?} does not exist in the base state", path),
            Self::TypeMismatch(path) => {
                write!(fmt, "Path {:?} does not address a compatible container", path)
            }
        }
    }
}

impl std::error::Error for PatchError {}

/// An error that aborted a tick before the reset pass.
#[derive(Debug)]
#[non_exhaustive]
pub enum TickError {
    /// The state could not be converted to or from its JSON image.
    State(serde_json::Error),
    /// Patches could not be replayed onto the current state.
    Patch(PatchError),
}

impl Display for TickError {
    fn fmt(&self, fmt: &mut Formatter) -> fmt::Result {
        match self {
            Self::State(e) => {
                write!(fmt, "State conversion failed: ")?;
                e.fmt(fmt)
            }
            Self::Patch(e) => {
                write!(fmt, "Rebase failed: ")?;
                e.fmt(fmt)
            }
        }
    }
}

impl std::error::Error for TickError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::State(e) => Some(e),
            Self::Patch(e) => Some(e),
        }
    }
}

impl From<serde_json::Error> for TickError {
    fn from(err: serde_json::Error) -> Self {
        Self::State(err)
    }
}

impl From<PatchError> for TickError {
    fn from(err: PatchError) -> Self {
        Self::Patch(err)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum AddChildError {
    TooManyNodes,
    MissingChild,
}

impl Display for AddChildError {
    fn fmt(&self, fmt: &mut Formatter) -> fmt::Result {
        match self {
            Self::TooManyNodes => write!(fmt, "Attempted to add too many nodes"),
            Self::MissingChild => write!(fmt, "A required child node is missing"),
        }
    }
}

impl std::error::Error for AddChildError {}

#[derive(Debug)]
#[non_exhaustive]
pub enum LoadError {
    MissingTree,
    MissingNode(String),
    MissingDecorator(String),
    AddChildError(AddChildError, String),
    InfiniteRecursion { node: String },
    /// The tree description was not fully consumed by the parser.
    Parse(String),
    Yaml(serde_yaml::Error),
}

impl Display for LoadError {
    fn fmt(&self, fmt: &mut Formatter) -> fmt::Result {
        match self {
            Self::MissingTree => write!(fmt, "The main tree does not exist"),
            Self::MissingNode(node) => {
                write!(fmt, "Node type or subtree name not found {:?}", node)
            }
            Self::MissingDecorator(name) => write!(fmt, "Decorator not found {:?}", name),
            Self::AddChildError(e, node) => {
                e.fmt(fmt)?;
                write!(fmt, " to {}", node)
            }
            Self::InfiniteRecursion { node } => {
                write!(fmt, "Infinite recursion detected in subtree {:?}", node)
            }
            Self::Parse(rest) => write!(fmt, "Unexpected input: {:?}", rest),
            Self::Yaml(e) => e.fmt(fmt),
        }
    }
}

impl std::error::Error for LoadError {}

impl From<serde_yaml::Error> for LoadError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::Yaml(err)
    }
}
