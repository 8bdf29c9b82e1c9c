//! Public stack handle
//!
//! `Stack` is a cheap handle over one engine. Attaching spawns a pump that
//! feeds every host move notification to the engine, and a readiness task
//! that unwinds an action left open by a reload before announcing.

use futures_util::future::{self, BoxFuture, FutureExt, Shared};
use histack_host::{HistoryHost, MoveEvents};
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::future::Future;
use std::sync::{Arc, Weak};

use crate::config::StackConfig;
use crate::engine::{Engine, InitialLoad, Started};
use crate::error::StackError;
use crate::listeners::Listeners;
use crate::managed::Outcome;
use crate::options::{PushOptions, ReplaceOptions};
use crate::snapshot::Snapshot;
use crate::Result;

type Ready = Shared<BoxFuture<'static, Result<()>>>;

struct StackCore {
    engine: Mutex<Engine>,
    listeners: Listeners,
    /// Last error raised while reconciling a move nobody was waiting on
    fault: Mutex<Option<StackError>>,
}

impl StackCore {
    fn complete(&self, outcome: Outcome) {
        if outcome.announce {
            self.listeners.announce();
        }
        if let Some((done, result)) = outcome.reply {
            // The caller may have dropped its future; the move still stands.
            let _ = done.send(result);
        }
    }

    /// Turn a started operation into the caller's future. Must be called
    /// with the engine unlocked.
    fn settle(&self, started: Result<Started>) -> BoxFuture<'static, Result<bool>> {
        match started {
            Err(err) => future::ready(Err(err)).boxed(),
            Ok(Started::Finished { value, announce }) => {
                if announce {
                    self.listeners.announce();
                }
                future::ready(Ok(value)).boxed()
            }
            Ok(Started::Waiting(rx)) => async move {
                match rx.await {
                    Ok(result) => result,
                    Err(_) => Err(StackError::Detached),
                }
            }
            .boxed(),
        }
    }

    fn pop(&self) -> BoxFuture<'static, Result<bool>> {
        let started = self.engine.lock().begin_pop();
        self.settle(started)
    }

    fn finish_ready(&self) -> Result<()> {
        {
            let engine = self.engine.lock();
            let on_action = engine.current_record().map(|r| r.action).unwrap_or(false);
            if engine.in_action() || on_action {
                return Err(StackError::StartedAsAction);
            }

            tracing::info!(
                depth = engine.depth,
                initial = %engine.initial,
                url = %engine.url,
                "Stack ready"
            );
        }

        self.listeners.go_live();
        self.listeners.announce();
        Ok(())
    }
}

async fn pump(core: Weak<StackCore>, mut events: MoveEvents) {
    while let Some(event) = events.next().await {
        let Some(core) = core.upgrade() else {
            break;
        };

        let result = core.engine.lock().on_move();
        match result {
            Ok(outcome) => core.complete(outcome),
            Err(err) => {
                tracing::error!(error = %err, url = %event.location, "Failed to reconcile host move");
                *core.fault.lock() = Some(err);
            }
        }
    }

    tracing::debug!("Move stream closed");
}

#[derive(Clone)]
pub struct Stack {
    core: Arc<StackCore>,
    ready: Ready,
}

impl Stack {
    /// Bind the stack to a host. One stack per host; must be called from
    /// within a tokio runtime.
    pub fn attach(host: Arc<dyn HistoryHost>, config: StackConfig) -> Result<Self> {
        let engine = Engine::resync(Arc::clone(&host), config)?;
        // Claimed last: a failed attach must leave the stream for a retry.
        let events = host.on_move().ok_or(StackError::AlreadyAttached)?;
        let unwind = engine.in_action();

        let core = Arc::new(StackCore {
            engine: Mutex::new(engine),
            listeners: Listeners::default(),
            fault: Mutex::new(None),
        });

        tokio::spawn(pump(Arc::downgrade(&core), events));

        let ready: Ready = {
            let core = Arc::clone(&core);
            async move {
                if unwind {
                    tracing::info!("Unwinding action left open before reload");
                    core.pop().await?;
                }
                core.finish_ready()
            }
            .boxed()
            .shared()
        };
        tokio::spawn(ready.clone());

        tracing::info!(unwind, "Attached navigation stack");

        Ok(Self { core, ready })
    }

    /// Push a new page. Clears any open action first. Never jumps.
    pub fn push(&self, path: &str, options: PushOptions) -> Result<()> {
        self.core.engine.lock().push(path, options)?;
        self.core.listeners.announce();
        Ok(())
    }

    /// Open an action over the current page without changing the location.
    ///
    /// At depth 1 there is nothing to go back to, so the current entry is
    /// reused instead of appending one; host Back will then leave the site.
    pub fn set_action<T: Serialize + ?Sized>(&self, action_state: &T) -> Result<()> {
        self.open_action(None, action_state)
    }

    /// Open an action with its own overlay location.
    pub fn set_action_at<T: Serialize + ?Sized>(&self, path: &str, action_state: &T) -> Result<()> {
        self.open_action(Some(path), action_state)
    }

    fn open_action<T: Serialize + ?Sized>(&self, path: Option<&str>, action_state: &T) -> Result<()> {
        let snapshot = Snapshot::capture(action_state)?;
        self.core.engine.lock().set_action(path, snapshot)?;
        self.core.listeners.announce();
        Ok(())
    }

    /// Rewrite the current entry's location and/or payload in place.
    ///
    /// While an action is open the payload goes to the covered frame.
    pub fn replace(&self, path: Option<&str>, options: ReplaceOptions) -> Result<()> {
        self.core.engine.lock().replace(path, options)?;
        self.core.listeners.announce();
        Ok(())
    }

    /// Remove the current frame from the stack, including from forward
    /// history. Resolves `false` when there is no frame to pop to.
    ///
    /// The gate check and the host jump happen at call time; the returned
    /// future only waits for the host to land.
    pub fn pop(&self) -> BoxFuture<'static, Result<bool>> {
        self.core.pop()
    }

    /// Behave like the host's own Back, except that an open action is
    /// popped instead. Resolves `false` at depth 1.
    pub fn back(&self) -> BoxFuture<'static, Result<bool>> {
        let started = self.core.engine.lock().begin_back();
        self.core.settle(started)
    }

    /// Register a change callback. Listeners run after the stack has
    /// settled, with no internal lock held, so they may read the stack.
    ///
    /// The stack owns its listeners, so a closure holding a `Stack` clone
    /// forms a cycle and that stack is never freed. Capture a channel or
    /// other narrow handle instead.
    pub fn add_listener<F>(&self, listener: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.core.listeners.add(Arc::new(listener));
    }

    pub fn depth(&self) -> u32 {
        self.core.engine.lock().depth
    }

    /// Whether an action is open, as tracked by the stack.
    ///
    /// This does not read the host. `check_invariants` compares the tracked
    /// flag with the host's current record, and every operation does the same
    /// before it mutates anything.
    pub fn is_action(&self) -> bool {
        self.core.engine.lock().in_action()
    }

    pub fn can_pop(&self) -> bool {
        let engine = self.core.engine.lock();
        engine.in_action() || engine.depth > 2
    }

    /// Payload of the current page. Actions have none.
    pub fn state(&self) -> Option<Arc<Value>> {
        let engine = self.core.engine.lock();
        if engine.in_action() {
            return None;
        }
        engine.user_state.shared()
    }

    pub fn state_as<T: DeserializeOwned>(&self) -> Result<Option<T>> {
        let engine = self.core.engine.lock();
        if engine.in_action() {
            return Ok(None);
        }
        engine.user_state.decode()
    }

    pub fn action_state(&self) -> Option<Arc<Value>> {
        let engine = self.core.engine.lock();
        if !engine.in_action() {
            return None;
        }
        engine.action_state.shared()
    }

    pub fn action_state_as<T: DeserializeOwned>(&self) -> Result<Option<T>> {
        let engine = self.core.engine.lock();
        if !engine.in_action() {
            return Ok(None);
        }
        engine.action_state.decode()
    }

    /// Path, query and fragment of the current location
    pub fn url(&self) -> String {
        self.core.engine.lock().url.clone()
    }

    /// Page `back()` would reveal
    pub fn page_for_back(&self) -> Option<String> {
        let engine = self.core.engine.lock();
        let record = engine.current_record().ok()?;
        if record.action || engine.depth > 1 {
            record.prev_url
        } else {
            None
        }
    }

    /// Page the host's own Back would reveal. `None` means leaving the site.
    pub fn page_for_user_back(&self) -> Option<String> {
        let engine = self.core.engine.lock();
        if engine.depth <= 1 {
            return None;
        }
        engine.current_record().ok()?.prev_url
    }

    pub fn initial(&self) -> InitialLoad {
        self.core.engine.lock().initial
    }

    pub fn is_ready(&self) -> bool {
        self.core.listeners.is_live()
    }

    /// Resolves once any reload unwind has finished and the initial
    /// announcement went out.
    pub fn ready(&self) -> impl Future<Output = Result<()>> + Send + 'static {
        self.ready.clone()
    }

    /// Most recent error raised while handling a move no operation was
    /// waiting on
    pub fn last_fault(&self) -> Option<StackError> {
        self.core.fault.lock().clone()
    }

    /// Check the tracked action flag against the host's current record.
    /// Always passes while a managed operation is in flight.
    pub fn check_invariants(&self) -> Result<()> {
        let engine = self.core.engine.lock();
        if !engine.pending.is_idle() {
            return Ok(());
        }
        let record = engine.current_record()?;
        engine.verify_action_flag(&record)
    }
}
