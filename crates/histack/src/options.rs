//! Arguments for `push` and `replace`

use serde::Serialize;
use serde_json::Value;

use crate::Result;

#[derive(Debug, Clone, Default)]
pub struct PushOptions {
    pub state: Option<Value>,
    pub title: Option<String>,
}

impl PushOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_state<T: Serialize + ?Sized>(mut self, state: &T) -> Result<Self> {
        self.state = Some(serde_json::to_value(state)?);
        Ok(self)
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }
}

/// `state: None` leaves the stored payload alone; `Some(Value::Null)` clears it.
#[derive(Debug, Clone, Default)]
pub struct ReplaceOptions {
    pub state: Option<Value>,
}

impl ReplaceOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_state<T: Serialize + ?Sized>(mut self, state: &T) -> Result<Self> {
        self.state = Some(serde_json::to_value(state)?);
        Ok(self)
    }
}
