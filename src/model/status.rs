use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle status shared by translations and iterations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResourceStatus {
    NotStarted,
    Running,
    Succeeded,
    Failed,
}

impl ResourceStatus {
    /// `Succeeded` and `Failed` never transition again
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }

    pub fn is_succeeded(self) -> bool {
        self == Self::Succeeded
    }

    pub fn is_failed(self) -> bool {
        self == Self::Failed
    }

    /// Service wire name
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NotStarted => "NotStarted",
            Self::Running => "Running",
            Self::Succeeded => "Succeeded",
            Self::Failed => "Failed",
        }
    }
}

impl fmt::Display for ResourceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A server-owned resource whose status the client observes by polling
pub trait JobResource: Clone + fmt::Debug + Send {
    /// Service-assigned id
    fn id(&self) -> &str;

    /// Status as of this snapshot
    fn status(&self) -> ResourceStatus;

    fn is_terminal(&self) -> bool {
        self.status().is_terminal()
    }
}
