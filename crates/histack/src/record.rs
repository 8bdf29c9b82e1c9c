//! Per-entry stack record
//!
//! Every host entry the stack manages carries one of these as its payload.
//! `depth` is a synthetic height tag: it grows by exactly one from a record
//! to the one pushed directly after it and says nothing about the entry's
//! position in the host's own sequence.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::Result;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryRecord {
    pub depth: u32,
    /// Transient overlay frame. Action records never carry `state`.
    #[serde(default, skip_serializing_if = "is_false")]
    pub action: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<Value>,
    /// Payload of the frame beneath, restored when this one is popped
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prev_state: Option<Value>,
    /// Location current just before this record was created
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prev_url: Option<String>,
}

fn is_false(value: &bool) -> bool {
    !*value
}

impl HistoryRecord {
    /// Record written on the very first visit.
    pub fn root() -> Self {
        Self {
            depth: 1,
            action: false,
            state: None,
            prev_state: None,
            prev_url: None,
        }
    }

    /// Ordinary page record at `depth`.
    pub fn page(depth: u32, state: Option<Value>, prev_url: Option<String>) -> Self {
        Self {
            depth,
            action: false,
            state: present(state),
            prev_state: None,
            prev_url,
        }
    }

    pub fn with_prev_state(mut self, prev_state: Option<Value>) -> Self {
        self.prev_state = present(prev_state);
        self
    }

    /// Read a record back from a host payload.
    ///
    /// Payloads without a positive depth tag are untagged entries (created
    /// by the host itself, e.g. for in-page anchors) and yield `None`.
    pub fn from_value(value: &Value) -> Option<Self> {
        let mut record: HistoryRecord = serde_json::from_value(value.clone()).ok()?;
        if record.depth == 0 {
            return None;
        }
        record.state = present(record.state);
        record.prev_state = present(record.prev_state);
        Some(record)
    }

    pub fn to_value(&self) -> Result<Value> {
        Ok(serde_json::to_value(self)?)
    }
}

/// `null` payloads are stored as absent.
pub(crate) fn present(value: Option<Value>) -> Option<Value> {
    value.filter(|v| !v.is_null())
}
