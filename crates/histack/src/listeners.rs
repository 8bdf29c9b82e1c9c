//! Change listeners
//!
//! Announcements are swallowed until the stack is ready; the first
//! announcement after that reaches every listener registered so far.

use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

type Listener = Arc<dyn Fn() + Send + Sync>;

#[derive(Default)]
pub(crate) struct Listeners {
    entries: Mutex<Vec<Listener>>,
    live: AtomicBool,
}

impl Listeners {
    pub fn add(&self, listener: Listener) {
        self.entries.lock().push(listener);
    }

    pub fn go_live(&self) {
        self.live.store(true, Ordering::SeqCst);
    }

    pub fn is_live(&self) -> bool {
        self.live.load(Ordering::SeqCst)
    }

    pub fn announce(&self) {
        if !self.is_live() {
            return;
        }

        // Listeners may read the stack or add listeners; never call them under the lock.
        let entries = self.entries.lock().clone();
        for listener in entries {
            listener();
        }
    }
}
