//! Histack Navigation Stack
//!
//! An application-level navigation stack (push / pop / back / transient
//! actions) on top of a host history that can only append, replace, or jump
//! by an offset. The stack tracks its own depth in every entry it writes and
//! reconciles that model whenever the host moves, including moves it did not
//! start: browser Back/Forward, multi-step jumps and in-page anchors.
//!
//! - Pop is a jump of -2 followed by an append, since entries cannot be
//!   deleted
//! - Actions are overlays that never survive a reload
//! - Going back past an action re-materializes the frame it covered

mod config;
mod engine;
mod error;
mod handler;
mod listeners;
mod managed;
mod options;
mod record;
mod snapshot;
mod stack;

pub use config::{StackConfig, ZeroMovePolicy};
pub use engine::InitialLoad;
pub use error::StackError;
pub use options::{PushOptions, ReplaceOptions};
pub use record::HistoryRecord;
pub use snapshot::Snapshot;
pub use stack::Stack;

pub use histack_host::{HistoryHost, MemoryHistory};

pub type Result<T> = std::result::Result<T, StackError>;

/// Initialize logging
pub fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    fmt().with_env_filter(filter).with_target(true).init();
}
