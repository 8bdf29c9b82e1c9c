//! Managed operations
//!
//! At most one host jump is in flight at a time. Whatever issued it is
//! parked here as `Pending` until the next move notification arrives; while
//! parked, new managed operations fail fast and the notification is never
//! treated as a user move.

use tokio::sync::oneshot;
use url::Url;

use crate::engine::PriorAction;
use crate::record::HistoryRecord;
use crate::Result;

pub(crate) type Completion = oneshot::Sender<Result<bool>>;

pub(crate) enum Pending {
    Idle,
    /// `pop`: jumped -2, will append the frame beneath the displaced record
    Pop {
        expected_depth: u32,
        target: Url,
        displaced: HistoryRecord,
        done: Completion,
    },
    /// `back`: jumped -1
    Back { done: Completion },
    /// User followed a link out of a real action: jumped -2, will append
    /// `record` at `intended`
    ActionLink { record: HistoryRecord, intended: Url },
    /// User went back past an action
    Repair(Repair),
}

impl Pending {
    pub fn is_idle(&self) -> bool {
        matches!(self, Pending::Idle)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Pending::Idle => "idle",
            Pending::Pop { .. } => "pop",
            Pending::Back { .. } => "back",
            Pending::ActionLink { .. } => "action-link",
            Pending::Repair(step) => step.name(),
        }
    }
}

/// Steps of the back-past-an-action repair.
///
/// Before the user moved, the host looked like `[.., A, B, action]` with the
/// action at `action_depth`. Landing anywhere behind it leaves `B` and the
/// action ahead, so the repair walks to `A` (two behind the action), appends
/// a fresh `B`, then walks back to where the user meant to go. `jump` is the
/// user's (negative) move measured from the action, and `covered` is what
/// `B` held when the action opened.
#[derive(Debug, Clone)]
pub(crate) enum Repair {
    /// Jump toward `A` issued
    AwaitingJumpA {
        jump: i64,
        action_depth: u32,
        covered: PriorAction,
    },
    /// At `A`, about to append `B`
    AwaitingPushB {
        jump: i64,
        action_depth: u32,
        covered: PriorAction,
    },
    /// Jump back to the user's target issued
    AwaitingJumpC { expected_depth: u32 },
    /// At the user's target
    Settled,
}

impl Repair {
    pub fn name(&self) -> &'static str {
        match self {
            Repair::AwaitingJumpA { .. } => "repair-jump-a",
            Repair::AwaitingPushB { .. } => "repair-push-b",
            Repair::AwaitingJumpC { .. } => "repair-jump-c",
            Repair::Settled => "repair-settled",
        }
    }

    /// Jump from the user's landing spot to two behind the action.
    pub fn jump_to_two_behind(jump: i64) -> i64 {
        -jump - 2
    }

    /// Jump from the re-appended `B` back to the user's landing depth.
    pub fn jump_to_target(jump: i64) -> i64 {
        jump + 1
    }
}

/// What the stack must do once the engine lock is released.
#[must_use]
pub(crate) struct Outcome {
    pub announce: bool,
    pub reply: Option<(Completion, Result<bool>)>,
}

impl Outcome {
    pub fn quiet() -> Self {
        Self {
            announce: false,
            reply: None,
        }
    }

    pub fn announce() -> Self {
        Self {
            announce: true,
            reply: None,
        }
    }

    /// Complete a parked caller; announce only if it succeeded.
    pub fn reply(done: Completion, result: Result<bool>) -> Self {
        Self {
            announce: result.is_ok(),
            reply: Some((done, result)),
        }
    }
}
