//! In-memory session history
//!
//! Behaves like a browser tab's session history: appending truncates any
//! forward entries, traversals land immediately but are reported through the
//! move stream, and nothing is ever removed except by truncation.

use parking_lot::Mutex;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::mpsc;
use url::Url;

use crate::error::HostError;
use crate::host::{HistoryHost, MoveEvent, MoveEvents};
use crate::location::resolve;
use crate::Result;

#[derive(Debug, Clone, PartialEq)]
pub struct HistoryEntry {
    pub url: Url,
    pub state: Option<Value>,
}

struct Session {
    entries: Vec<HistoryEntry>,
    index: usize,
    title: String,
    /// Traversals requested through `HistoryHost::jump_by`
    jumps: usize,
    sender: mpsc::UnboundedSender<MoveEvent>,
    events: Option<MoveEvents>,
}

impl Session {
    fn current(&self) -> &HistoryEntry {
        &self.entries[self.index]
    }

    fn traverse(&mut self, delta: i64) -> bool {
        let target = self.index as i64 + delta;
        if target < 0 || target >= self.entries.len() as i64 {
            tracing::debug!(delta, index = self.index, "Ignoring out-of-range traversal");
            return false;
        }

        self.index = target as usize;
        let location = self.current().url.clone();
        tracing::trace!(delta, index = self.index, url = %location, "Traversed history");

        // Nobody listening is not an error; the move still happened.
        let _ = self.sender.send(MoveEvent { location });
        true
    }

    fn push_entry(&mut self, entry: HistoryEntry) {
        self.entries.truncate(self.index + 1);
        self.entries.push(entry);
        self.index += 1;
    }
}

pub struct MemoryHistory {
    session: Arc<Mutex<Session>>,
}

impl MemoryHistory {
    /// Start a fresh history with a single, untagged entry.
    pub fn new(url: &str) -> Result<Self> {
        let url = Url::parse(url).map_err(|e| HostError::InvalidUrl {
            input: url.to_string(),
            reason: e.to_string(),
        })?;

        Ok(Self::from_entries(
            vec![HistoryEntry { url, state: None }],
            0,
            String::new(),
        ))
    }

    fn from_entries(entries: Vec<HistoryEntry>, index: usize, title: String) -> Self {
        let (sender, rx) = mpsc::unbounded_channel();

        Self {
            session: Arc::new(Mutex::new(Session {
                entries,
                index,
                title,
                jumps: 0,
                sender,
                events: Some(MoveEvents::new(rx)),
            })),
        }
    }

    /// Simulate a page reload: same entries and position, new page lifetime.
    ///
    /// The returned handle has its own move stream, so a new stack may attach
    /// to it. The old handle keeps working but no longer shares state.
    pub fn reload(&self) -> Self {
        let session = self.session.lock();
        Self::from_entries(session.entries.clone(), session.index, session.title.clone())
    }

    /// User-driven traversal (browser Back/Forward or the history picker).
    ///
    /// Returns whether the traversal landed anywhere.
    pub fn go(&self, delta: i64) -> bool {
        self.session.lock().traverse(delta)
    }

    /// User activated an in-page anchor: a new untagged entry is created for
    /// the fragment and a move is reported.
    pub fn follow_fragment(&self, fragment: &str) -> Result<()> {
        let mut session = self.session.lock();
        let target = format!("#{}", fragment.trim_start_matches('#'));
        let url = resolve(&session.current().url, &target)?;

        session.push_entry(HistoryEntry {
            url: url.clone(),
            state: None,
        });
        let _ = session.sender.send(MoveEvent { location: url });
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.session.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.session.lock().entries.is_empty()
    }

    /// Position of the current entry
    pub fn index(&self) -> usize {
        self.session.lock().index
    }

    /// Number of traversals requested through the host capability
    pub fn jump_count(&self) -> usize {
        self.session.lock().jumps
    }

    pub fn entries(&self) -> Vec<HistoryEntry> {
        self.session.lock().entries.clone()
    }

    pub fn current(&self) -> HistoryEntry {
        self.session.lock().current().clone()
    }

    pub fn title(&self) -> String {
        self.session.lock().title.clone()
    }
}

impl Clone for MemoryHistory {
    fn clone(&self) -> Self {
        Self {
            session: Arc::clone(&self.session),
        }
    }
}

impl HistoryHost for MemoryHistory {
    fn read_current(&self) -> Option<Value> {
        self.session.lock().current().state.clone()
    }

    fn location(&self) -> Url {
        self.session.lock().current().url.clone()
    }

    fn replace(&self, state: Value, url: Option<&Url>) {
        let mut session = self.session.lock();
        let index = session.index;
        let entry = &mut session.entries[index];
        entry.state = Some(state);
        if let Some(url) = url {
            entry.url = url.clone();
        }
    }

    fn append(&self, state: Value, url: Option<&Url>) {
        let mut session = self.session.lock();
        let url = url.cloned().unwrap_or_else(|| session.current().url.clone());
        session.push_entry(HistoryEntry {
            url,
            state: Some(state),
        });
    }

    fn jump_by(&self, delta: i64) {
        let mut session = self.session.lock();
        session.jumps += 1;
        session.traverse(delta);
    }

    fn set_title(&self, title: &str) {
        self.session.lock().title = title.to_string();
    }

    fn on_move(&self) -> Option<MoveEvents> {
        self.session.lock().events.take()
    }
}
