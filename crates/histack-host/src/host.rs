//! Host history capability

use serde_json::Value;
use tokio::sync::mpsc;
use url::Url;

/// Raised once per discrete traversal of the host history.
///
/// Carries no indication of the traversal's source or size; consumers read
/// the host's current entry to find out where they landed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveEvent {
    /// Location current when the move landed
    pub location: Url,
}

/// Stream of move notifications handed out by a host.
pub struct MoveEvents {
    rx: mpsc::UnboundedReceiver<MoveEvent>,
}

impl MoveEvents {
    pub fn new(rx: mpsc::UnboundedReceiver<MoveEvent>) -> Self {
        Self { rx }
    }

    /// Wait for the next move. Returns `None` once the host is gone.
    pub async fn next(&mut self) -> Option<MoveEvent> {
        self.rx.recv().await
    }

    /// Take an already delivered move without waiting.
    pub fn try_next(&mut self) -> Option<MoveEvent> {
        self.rx.try_recv().ok()
    }
}

/// Append/replace/jump-only history owned by the host environment.
///
/// Each entry optionally carries a small serializable payload. The current
/// position is always the entry reached by the most recent append, replace
/// or jump. Jumps are asynchronous: they land later and raise exactly one
/// [`MoveEvent`] on the stream returned by [`HistoryHost::on_move`].
pub trait HistoryHost: Send + Sync + 'static {
    /// Payload stored against the current entry
    fn read_current(&self) -> Option<Value>;

    /// Location of the current entry
    fn location(&self) -> Url;

    /// Rewrite the current entry. `None` keeps its location.
    fn replace(&self, state: Value, url: Option<&Url>);

    /// Add an entry after the current one, discarding any forward entries.
    /// `None` reuses the current location.
    fn append(&self, state: Value, url: Option<&Url>);

    /// Traverse by a relative offset. Out-of-range requests are dropped
    /// without notification.
    fn jump_by(&self, delta: i64);

    /// Update the document title shown for the current entry
    fn set_title(&self, _title: &str) {}

    /// Hand out the move stream. Only the first caller receives it.
    fn on_move(&self) -> Option<MoveEvents>;
}
