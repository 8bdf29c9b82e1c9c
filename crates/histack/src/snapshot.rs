//! Frozen caller payloads
//!
//! Caller state is copied through its JSON form on the way in and kept
//! behind an `Arc`, so what the stack hands back can never alias or mutate
//! the caller's original value, and compares structurally.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

use crate::record::present;
use crate::Result;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot(Option<Arc<Value>>);

impl Snapshot {
    pub fn empty() -> Self {
        Self(None)
    }

    /// Copy a caller value through its JSON form.
    pub fn capture<T: Serialize + ?Sized>(value: &T) -> Result<Self> {
        Ok(Self::from_value(Some(serde_json::to_value(value)?)))
    }

    pub(crate) fn from_value(value: Option<Value>) -> Self {
        Self(present(value).map(Arc::new))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_none()
    }

    pub fn get(&self) -> Option<&Value> {
        self.0.as_deref()
    }

    pub fn shared(&self) -> Option<Arc<Value>> {
        self.0.clone()
    }

    pub(crate) fn to_value(&self) -> Option<Value> {
        self.0.as_deref().cloned()
    }

    /// Decode into a caller type.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<Option<T>> {
        match self.get() {
            Some(value) => Ok(Some(serde_json::from_value(value.clone())?)),
            None => Ok(None),
        }
    }
}
