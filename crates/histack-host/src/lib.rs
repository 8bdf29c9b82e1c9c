//! Histack Host History
//!
//! The capability the navigation stack is built on: an ordered sequence of
//! entries that can only be appended to, replaced in place, or traversed by a
//! relative offset. Entries are never deleted, and traversals report back
//! asynchronously with one notification per discrete move.
//!
//! - `HistoryHost`: the injected capability
//! - `MemoryHistory`: in-memory session history with browser semantics

mod error;
mod host;
mod location;
mod memory;

pub use error::HostError;
pub use host::{HistoryHost, MoveEvent, MoveEvents};
pub use location::{page_path, resolve};
pub use memory::{HistoryEntry, MemoryHistory};

pub type Result<T> = std::result::Result<T, HostError>;
