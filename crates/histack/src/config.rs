//! Stack configuration

use serde::{Deserialize, Serialize};

use crate::error::StackError;
use crate::Result;

/// What to do with a move notification that lands at the tracked depth.
///
/// Some hosts raise these for same-entry reloads or spuriously.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ZeroMovePolicy {
    /// Drop the notification
    #[default]
    Ignore,
    /// Treat it as a protocol violation
    Reject,
    /// Re-adopt the current record's payload and announce
    Refresh,
}

impl ZeroMovePolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            ZeroMovePolicy::Ignore => "ignore",
            ZeroMovePolicy::Reject => "reject",
            ZeroMovePolicy::Refresh => "refresh",
        }
    }
}

impl std::fmt::Display for ZeroMovePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ZeroMovePolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "ignore" => Ok(ZeroMovePolicy::Ignore),
            "reject" => Ok(ZeroMovePolicy::Reject),
            "refresh" => Ok(ZeroMovePolicy::Refresh),
            _ => Err(format!("Unknown zero-move policy: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StackConfig {
    /// Handling of notifications that do not change depth
    pub zero_move: ZeroMovePolicy,
    /// Forward push titles to the host
    pub apply_titles: bool,
}

impl StackConfig {
    pub fn new() -> Self {
        Self {
            zero_move: ZeroMovePolicy::Ignore,
            apply_titles: true,
        }
    }

    pub fn with_zero_move(mut self, policy: ZeroMovePolicy) -> Self {
        self.zero_move = policy;
        self
    }

    /// Parse from JSON, missing fields take their defaults
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| StackError::Config(e.to_string()))
    }

    /// Defaults overridden by `HISTACK_ZERO_MOVE` and `HISTACK_APPLY_TITLES`
    pub fn from_env() -> Result<Self> {
        let mut config = Self::new();

        if let Ok(policy) = std::env::var("HISTACK_ZERO_MOVE") {
            config.zero_move = policy.parse().map_err(StackError::Config)?;
        }
        if let Ok(titles) = std::env::var("HISTACK_APPLY_TITLES") {
            config.apply_titles = titles
                .parse()
                .map_err(|_| StackError::Config(format!("Invalid HISTACK_APPLY_TITLES: {}", titles)))?;
        }

        Ok(config)
    }
}

impl Default for StackConfig {
    fn default() -> Self {
        Self::new()
    }
}
