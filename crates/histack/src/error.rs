//! Stack error types

use histack_host::HostError;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StackError {
    #[error("A stack is already attached to this history host")]
    AlreadyAttached,

    #[error("Cannot {op} while another navigation is in flight")]
    Busy { op: &'static str },

    #[error("Action flag mismatch: record says {record}, stack tracked {tracked}")]
    ActionMismatch { record: bool, tracked: bool },

    #[error("Expected to land at depth {expected}, landed at {actual}")]
    DepthMismatch { expected: u32, actual: u32 },

    #[error("Arrived at an action record at depth {depth} through an unsupported move")]
    UnexpectedAction { depth: u32 },

    #[error("Unsupported move of {jump} from depth {depth} while an action is open")]
    UnsupportedMove { depth: u32, jump: i64 },

    #[error("Moved forward out of an action onto an existing entry")]
    ForwardIntoKnownEntry,

    #[error("Current history entry carries no stack record")]
    MissingRecord,

    #[error("Current record has no page to pop to")]
    MissingTarget,

    #[error("Move notification without a depth change at depth {depth}")]
    ZeroMove { depth: u32 },

    #[error("Stack cannot become ready while an action is open")]
    StartedAsAction,

    #[error("Stack was dropped before the navigation completed")]
    Detached,

    #[error("Invalid path {path}: {reason}")]
    InvalidPath { path: String, reason: String },

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<HostError> for StackError {
    fn from(err: HostError) -> Self {
        match err {
            HostError::InvalidUrl { input, reason } => StackError::InvalidPath {
                path: input,
                reason,
            },
        }
    }
}

impl From<serde_json::Error> for StackError {
    fn from(err: serde_json::Error) -> Self {
        StackError::Serialization(err.to_string())
    }
}
