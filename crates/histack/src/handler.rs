//! Out-of-band navigation
//!
//! Moves the stack did not ask for: browser Back/Forward (including
//! multi-step jumps from the history picker), in-page anchors, and spurious
//! same-entry notifications. Only reached while no managed operation is
//! parked.

use histack_host::page_path;
use url::Url;

use crate::config::ZeroMovePolicy;
use crate::engine::{Engine, PriorAction};
use crate::error::StackError;
use crate::managed::{Outcome, Pending, Repair};
use crate::record::HistoryRecord;
use crate::snapshot::Snapshot;
use crate::Result;

impl Engine {
    pub(crate) fn on_unmanaged_move(&mut self) -> Result<Outcome> {
        let intended = self.host.location();

        // An untagged entry is one the host made itself, typically for an
        // anchor: tag it as a forward move of exactly one.
        let (landed, implicit) = match self.host.read_current().as_ref().and_then(HistoryRecord::from_value) {
            Some(record) => (record, false),
            None => {
                let record = HistoryRecord::page(self.depth + 1, None, Some(self.url.clone()))
                    .with_prev_state(self.user_state.to_value());
                self.host.replace(record.to_value()?, None);
                (record, true)
            }
        };

        let jump = landed.depth as i64 - self.depth as i64;
        tracing::debug!(
            jump,
            from = self.depth,
            to = landed.depth,
            implicit,
            action = self.in_action(),
            url = %intended,
            "Unmanaged move"
        );

        if jump == 0 {
            return self.on_zero_move(landed);
        }

        let Some(covered) = self.prior_action.clone() else {
            self.adopt(landed, jump)?;
            return Ok(Outcome::announce());
        };

        if jump > 0 {
            return self.leave_action_forward(landed, implicit, intended);
        }

        self.start_repair(jump, covered)
    }

    fn on_zero_move(&mut self, landed: HistoryRecord) -> Result<Outcome> {
        match self.config.zero_move {
            ZeroMovePolicy::Ignore => {
                tracing::warn!(depth = self.depth, "Ignoring move without depth change");
                Ok(Outcome::quiet())
            }
            ZeroMovePolicy::Reject => Err(StackError::ZeroMove { depth: self.depth }),
            ZeroMovePolicy::Refresh => {
                self.verify_action_flag(&landed)?;
                if !landed.action {
                    self.user_state = Snapshot::from_value(landed.state);
                }
                self.sync_url();
                Ok(Outcome::announce())
            }
        }
    }

    fn leave_action_forward(
        &mut self,
        landed: HistoryRecord,
        implicit: bool,
        intended: Url,
    ) -> Result<Outcome> {
        if self.depth == 1 {
            // Virtual action: the root slot is still flagged, and gets
            // restored if the user ever comes back to it.
            self.depth = landed.depth;
            self.user_state = Snapshot::from_value(landed.state);
            self.drop_action();
            self.sync_url();
            return Ok(Outcome::announce());
        }

        // Only a host-made entry can sit directly above an action; anything
        // else ahead of it was written behind the stack's back.
        if !implicit {
            return Err(StackError::ForwardIntoKnownEntry);
        }

        // Host is [.., covered, action, link]: go back to covered and
        // re-append the link in the action's slot.
        let record = HistoryRecord {
            depth: landed.depth - 1,
            ..landed
        };
        self.begin_managed(Pending::ActionLink { record, intended }, -2);
        Ok(Outcome::quiet())
    }

    pub(crate) fn finish_action_link(
        &mut self,
        mut record: HistoryRecord,
        intended: &Url,
    ) -> Result<Outcome> {
        let landed = self.expect_landing(record.depth - 1)?;

        record.prev_url = Some(page_path(&self.host.location()));
        record.prev_state = landed.state;
        self.host.append(record.to_value()?, Some(intended));

        self.depth = record.depth;
        self.user_state = Snapshot::from_value(record.state);
        self.drop_action();
        self.sync_url();

        tracing::debug!(depth = self.depth, url = %self.url, "Followed link out of action");
        Ok(Outcome::announce())
    }

    fn start_repair(&mut self, jump: i64, covered: PriorAction) -> Result<Outcome> {
        let action_depth = self.depth;
        if action_depth < 3 {
            return Err(StackError::UnsupportedMove {
                depth: action_depth,
                jump,
            });
        }

        let to_two_behind = Repair::jump_to_two_behind(jump);
        if to_two_behind != 0 {
            self.begin_managed(
                Pending::Repair(Repair::AwaitingJumpA {
                    jump,
                    action_depth,
                    covered,
                }),
                to_two_behind,
            );
            return Ok(Outcome::quiet());
        }

        self.drive_repair(Repair::AwaitingPushB {
            jump,
            action_depth,
            covered,
        })
    }

    /// Advance the repair from `step` until it has to wait for the host.
    pub(crate) fn drive_repair(&mut self, mut step: Repair) -> Result<Outcome> {
        loop {
            tracing::trace!(step = step.name(), "Repair step");
            step = match step {
                Repair::AwaitingJumpA {
                    jump,
                    action_depth,
                    covered,
                } => {
                    self.expect_landing(action_depth - 2)?;
                    Repair::AwaitingPushB {
                        jump,
                        action_depth,
                        covered,
                    }
                }
                Repair::AwaitingPushB {
                    jump,
                    action_depth,
                    covered,
                } => {
                    self.rematerialize_covered(covered)?;

                    let to_target = Repair::jump_to_target(jump);
                    if to_target != 0 {
                        let expected_depth = (action_depth as i64 + jump) as u32;
                        self.begin_managed(
                            Pending::Repair(Repair::AwaitingJumpC { expected_depth }),
                            to_target,
                        );
                        return Ok(Outcome::quiet());
                    }
                    Repair::Settled
                }
                Repair::AwaitingJumpC { expected_depth } => {
                    self.expect_landing(expected_depth)?;
                    Repair::Settled
                }
                Repair::Settled => {
                    let landed = self.current_record()?;
                    self.adopt(landed, -1)?;

                    tracing::debug!(depth = self.depth, url = %self.url, "Repaired history behind action");
                    return Ok(Outcome::announce());
                }
            };
        }
    }

    /// Append a fresh copy of the frame the action covered.
    fn rematerialize_covered(&mut self, prior: PriorAction) -> Result<()> {
        let landed = self.current_record()?;
        let url = self.resolve(&prior.url)?;

        let record = HistoryRecord::page(
            landed.depth + 1,
            prior.record.state,
            Some(page_path(&self.host.location())),
        )
        .with_prev_state(landed.state);
        self.host.append(record.to_value()?, Some(&url));
        Ok(())
    }
}
