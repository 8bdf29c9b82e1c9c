//! Reconciliation engine
//!
//! Holds the tracked model (depth, action flag, payloads) and keeps it in
//! step with the host's current record. Every method here runs to
//! completion under the stack's lock; anything that has to wait for the
//! host is parked in `pending` and resumed by `on_move`.

use histack_host::{page_path, resolve, HistoryHost};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::oneshot;
use url::Url;

use crate::config::StackConfig;
use crate::error::StackError;
use crate::managed::{Outcome, Pending};
use crate::options::{PushOptions, ReplaceOptions};
use crate::record::{present, HistoryRecord};
use crate::snapshot::Snapshot;
use crate::Result;

/// How the current page lifetime began. Diagnostic only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitialLoad {
    /// Started on an action record, which was unwound
    Unknown,
    /// Resumed an existing record (reload or return visit)
    Restore,
    /// First visit in this host context
    New,
}

impl InitialLoad {
    pub fn as_str(&self) -> &'static str {
        match self {
            InitialLoad::Unknown => "",
            InitialLoad::Restore => "restore",
            InitialLoad::New => "new",
        }
    }
}

impl std::fmt::Display for InitialLoad {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The frame an action covers, kept to rebuild it if the user travels back
/// past the action.
#[derive(Debug, Clone)]
pub(crate) struct PriorAction {
    pub record: HistoryRecord,
    pub url: String,
}

/// Result of starting a public operation.
pub(crate) enum Started {
    Finished { value: bool, announce: bool },
    Waiting(oneshot::Receiver<Result<bool>>),
}

pub(crate) struct Engine {
    pub(crate) host: Arc<dyn HistoryHost>,
    pub(crate) config: StackConfig,
    pub(crate) url: String,
    pub(crate) depth: u32,
    pub(crate) user_state: Snapshot,
    pub(crate) action_state: Snapshot,
    pub(crate) prior_action: Option<PriorAction>,
    pub(crate) pending: Pending,
    pub(crate) initial: InitialLoad,
}

impl Engine {
    /// Rebuild the model from the host's current record.
    pub fn resync(host: Arc<dyn HistoryHost>, config: StackConfig) -> Result<Self> {
        let url = page_path(&host.location());
        let current = host.read_current();
        let record = current.as_ref().and_then(HistoryRecord::from_value);

        let mut engine = Self {
            host,
            config,
            url,
            depth: 1,
            user_state: Snapshot::empty(),
            action_state: Snapshot::empty(),
            prior_action: None,
            pending: Pending::Idle,
            initial: InitialLoad::Unknown,
        };

        match record {
            None => {
                engine.host.replace(HistoryRecord::root().to_value()?, None);
                engine.initial = InitialLoad::New;
            }
            Some(record) if !record.action => {
                engine.depth = record.depth;
                engine.user_state = Snapshot::from_value(record.state);
                engine.initial = InitialLoad::Restore;
            }
            Some(record) => {
                // Reloaded with an overlay open. Actions are transient; the
                // caller unwinds this before the stack is ready.
                engine.depth = record.depth;
                engine.user_state = Snapshot::from_value(record.prev_state.clone());
                engine.prior_action = Some(PriorAction {
                    record: HistoryRecord::page(
                        record.depth.saturating_sub(1).max(1),
                        record.prev_state,
                        None,
                    ),
                    url: record.prev_url.unwrap_or_else(|| engine.url.clone()),
                });
            }
        }

        tracing::debug!(
            depth = engine.depth,
            action = engine.in_action(),
            initial = %engine.initial,
            url = %engine.url,
            "Resynced stack from host"
        );

        Ok(engine)
    }

    pub(crate) fn current_record(&self) -> Result<HistoryRecord> {
        self.host
            .read_current()
            .as_ref()
            .and_then(HistoryRecord::from_value)
            .ok_or(StackError::MissingRecord)
    }

    pub(crate) fn resolve(&self, path: &str) -> Result<Url> {
        Ok(resolve(&self.host.location(), path)?)
    }

    pub(crate) fn sync_url(&mut self) {
        self.url = page_path(&self.host.location());
    }

    pub(crate) fn ensure_idle(&self, op: &'static str) -> Result<()> {
        if self.pending.is_idle() {
            Ok(())
        } else {
            Err(StackError::Busy { op })
        }
    }

    pub(crate) fn verify_action_flag(&self, record: &HistoryRecord) -> Result<()> {
        if record.action != self.in_action() {
            return Err(StackError::ActionMismatch {
                record: record.action,
                tracked: self.in_action(),
            });
        }
        Ok(())
    }

    /// An action is open exactly when the frame it covers is known.
    pub(crate) fn in_action(&self) -> bool {
        self.prior_action.is_some()
    }

    pub(crate) fn drop_action(&mut self) {
        self.action_state = Snapshot::empty();
        self.prior_action = None;
    }

    /// Park a managed operation and issue its jump.
    pub(crate) fn begin_managed(&mut self, pending: Pending, delta: i64) {
        tracing::debug!(delta, depth = self.depth, step = pending.name(), "Issuing managed jump");
        self.pending = pending;
        self.host.jump_by(delta);
    }

    /// Turn a depth-1 action back into the record it replaced. No jump.
    pub(crate) fn clear_virtual_action(&mut self, record: HistoryRecord) -> Result<()> {
        let url = match record.prev_url.as_deref() {
            Some(path) => Some(self.resolve(path)?),
            None => None,
        };
        let restored = HistoryRecord::page(record.depth, record.prev_state, None);

        self.host.replace(restored.to_value()?, url.as_ref());
        self.depth = restored.depth;
        self.user_state = Snapshot::from_value(restored.state);
        self.drop_action();
        self.sync_url();

        tracing::debug!(url = %self.url, "Cleared virtual action");
        Ok(())
    }

    pub fn push(&mut self, path: &str, options: PushOptions) -> Result<()> {
        self.ensure_idle("push")?;
        let url = self.resolve(path)?;
        let mut record = self.current_record()?;
        self.verify_action_flag(&record)?;
        let state = present(options.state);

        if record.action {
            if self.depth > 1 {
                // Take over the slot the action occupied; depth and prevUrl stay.
                let taken = HistoryRecord {
                    depth: record.depth,
                    action: false,
                    state: state.clone(),
                    prev_state: record.prev_state,
                    prev_url: record.prev_url,
                };
                self.host.replace(taken.to_value()?, Some(&url));
                self.finish_push(state, options.title);
                return Ok(());
            }

            self.clear_virtual_action(record)?;
            record = self.current_record()?;
        }

        self.depth += 1;
        let pushed = HistoryRecord::page(self.depth, state.clone(), Some(self.url.clone()))
            .with_prev_state(record.state);
        self.host.append(pushed.to_value()?, Some(&url));
        self.finish_push(state, options.title);
        Ok(())
    }

    fn finish_push(&mut self, state: Option<Value>, title: Option<String>) {
        if let Some(title) = title.filter(|_| self.config.apply_titles) {
            self.host.set_title(&title);
        }
        self.user_state = Snapshot::from_value(state);
        self.drop_action();
        self.sync_url();

        tracing::debug!(depth = self.depth, url = %self.url, "Pushed");
    }

    pub fn set_action(&mut self, path: Option<&str>, action_state: Snapshot) -> Result<()> {
        self.ensure_idle("set_action")?;
        let url = path.map(|p| self.resolve(p)).transpose()?;
        let record = self.current_record()?;
        self.verify_action_flag(&record)?;

        self.action_state = action_state;

        if record.action {
            if let Some(url) = url {
                self.host.replace(record.to_value()?, Some(&url));
                self.sync_url();
            }
            return Ok(());
        }

        let covered = PriorAction {
            record: record.clone(),
            url: self.url.clone(),
        };

        // With nothing beneath to return to, the action reuses the root
        // slot. Forward entries are left alone: an append here would make
        // the action impossible to remove later.
        let is_virtual = self.depth == 1;
        if !is_virtual {
            self.depth += 1;
        }

        let action = HistoryRecord {
            depth: self.depth,
            action: true,
            state: None,
            prev_state: record.state,
            prev_url: Some(self.url.clone()),
        };
        if is_virtual {
            self.host.replace(action.to_value()?, url.as_ref());
        } else {
            self.host.append(action.to_value()?, url.as_ref());
        }

        self.prior_action = Some(covered);
        self.sync_url();

        tracing::debug!(depth = self.depth, is_virtual, url = %self.url, "Set action");
        Ok(())
    }

    pub fn replace(&mut self, path: Option<&str>, options: ReplaceOptions) -> Result<()> {
        self.ensure_idle("replace")?;
        let url = path.map(|p| self.resolve(p)).transpose()?;
        let mut record = self.current_record()?;
        self.verify_action_flag(&record)?;

        if let Some(state) = options.state {
            let state = present(Some(state));
            if record.action {
                // Lands on the covered frame once the action clears.
                record.prev_state = state.clone();
                if let Some(prior) = self.prior_action.as_mut() {
                    prior.record.state = state.clone();
                }
            } else {
                record.state = state.clone();
            }
            self.user_state = Snapshot::from_value(state);
        }

        self.host.replace(record.to_value()?, url.as_ref());
        self.sync_url();
        Ok(())
    }

    pub fn begin_pop(&mut self) -> Result<Started> {
        self.ensure_idle("pop")?;
        let record = self.current_record()?;
        self.verify_action_flag(&record)?;

        if record.action && self.depth == 1 {
            self.clear_virtual_action(record)?;
            return Ok(Started::Finished {
                value: true,
                announce: true,
            });
        }

        if self.depth <= 2 {
            return Ok(Started::Finished {
                value: false,
                announce: false,
            });
        }

        // Both this record and the one beneath are dead once we leave; jump
        // past both and append a corrected record for the frame beneath.
        let target = record.prev_url.as_deref().ok_or(StackError::MissingTarget)?;
        let target = self.resolve(target)?;
        let (done, rx) = oneshot::channel();
        self.begin_managed(
            Pending::Pop {
                expected_depth: self.depth - 2,
                target,
                displaced: record,
                done,
            },
            -2,
        );
        Ok(Started::Waiting(rx))
    }

    pub(crate) fn finish_pop(
        &mut self,
        expected_depth: u32,
        target: &Url,
        displaced: HistoryRecord,
    ) -> Result<bool> {
        let landed = self.expect_landing(expected_depth)?;

        self.depth = expected_depth + 1;
        let record = HistoryRecord::page(
            self.depth,
            displaced.prev_state,
            Some(page_path(&self.host.location())),
        )
        .with_prev_state(landed.state);
        self.host.append(record.to_value()?, Some(target));

        self.user_state = Snapshot::from_value(record.state);
        self.drop_action();
        self.sync_url();

        tracing::debug!(depth = self.depth, url = %self.url, "Popped");
        Ok(true)
    }

    pub fn begin_back(&mut self) -> Result<Started> {
        self.ensure_idle("back")?;
        let record = self.current_record()?;
        self.verify_action_flag(&record)?;

        if record.action {
            return self.begin_pop();
        }

        if self.depth == 1 {
            return Ok(Started::Finished {
                value: false,
                announce: false,
            });
        }

        let (done, rx) = oneshot::channel();
        self.begin_managed(Pending::Back { done }, -1);
        Ok(Started::Waiting(rx))
    }

    pub(crate) fn finish_back(&mut self) -> Result<bool> {
        let landed = self.expect_landing(self.depth - 1)?;
        self.adopt(landed, -1)?;

        tracing::debug!(depth = self.depth, url = %self.url, "Went back");
        Ok(true)
    }

    /// Read the landed record and check it sits at the expected depth.
    pub(crate) fn expect_landing(&self, expected: u32) -> Result<HistoryRecord> {
        let landed = self.current_record()?;
        if landed.depth != expected {
            return Err(StackError::DepthMismatch {
                expected,
                actual: landed.depth,
            });
        }
        Ok(landed)
    }

    /// Accept a landed record as the current frame.
    pub(crate) fn adopt(&mut self, record: HistoryRecord, jump: i64) -> Result<()> {
        if record.action {
            // The root slot is left flagged when the user goes forward out of
            // a virtual action; coming back to it restores the page it covered.
            if jump < 0 && record.depth == 1 {
                return self.clear_virtual_action(record);
            }
            return Err(StackError::UnexpectedAction {
                depth: record.depth,
            });
        }

        self.depth = record.depth;
        self.user_state = Snapshot::from_value(record.state);
        self.drop_action();
        self.sync_url();
        Ok(())
    }

    /// Dispatch one host move notification.
    pub fn on_move(&mut self) -> Result<Outcome> {
        match std::mem::replace(&mut self.pending, Pending::Idle) {
            Pending::Idle => self.on_unmanaged_move(),
            Pending::Pop {
                expected_depth,
                target,
                displaced,
                done,
            } => {
                let result = self.finish_pop(expected_depth, &target, displaced);
                Ok(Outcome::reply(done, result))
            }
            Pending::Back { done } => {
                let result = self.finish_back();
                Ok(Outcome::reply(done, result))
            }
            Pending::ActionLink { record, intended } => self.finish_action_link(record, &intended),
            Pending::Repair(step) => self.drive_repair(step),
        }
    }
}
