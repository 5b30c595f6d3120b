use serde::{Deserialize, Serialize};

/// The result of evaluating a node, and the status a node remembers between ticks.
#[derive(PartialEq, Eq, Debug, Clone, Copy, Hash, Default, Serialize, Deserialize)]
pub enum Status {
    /// Not evaluated since it was created or last re-armed.
    #[default]
    Ready,
    Success,
    Failure,
    /// The node should keep running in the next tick
    Running,
}

impl Status {
    /// Swaps Success and Failure. Running and Ready are fixed points.
    pub fn invert(self) -> Self {
        match self {
            Status::Success => Status::Failure,
            Status::Failure => Status::Success,
            other => other,
        }
    }

    /// Returns `true` for Success and Failure.
    pub fn is_done(self) -> bool {
        matches!(self, Status::Success | Status::Failure)
    }

    pub fn is_running(self) -> bool {
        matches!(self, Status::Running)
    }
}

impl From<bool> for Status {
    fn from(b: bool) -> Self {
        if b {
            Status::Success
        } else {
            Status::Failure
        }
    }
}
