//! Observable progress of a bridge transfer.
//!
//! A transfer moves through three user-visible steps (Approve, Bridge, Done).
//! The [`ProgressTracker`] owns that state and is the only way to mutate it;
//! presentation code holds a read-only [`ProgressView`] and is notified on
//! every change.
//!
//! The tracker enforces the step invariants itself, so a misbehaving caller
//! cannot produce a state the UI would render incorrectly:
//!
//! - at most one step is `in-progress` at a time
//! - a step may only be `in-progress` or `completed` once every earlier step is `completed`
//! - at most one step is `error`, and never one before an advanced step
//! - once any step is `error`, no step may advance until [`ProgressTracker::reset`]
//! - steps return to `pending` only through [`ProgressTracker::reset`] or [`ProgressTracker::close`]
//!
//! # Example
//!
//! ```rust
//! use lz_bridge::{ProgressTracker, StepId, StepStatus};
//!
//! let tracker = ProgressTracker::new();
//! let view = tracker.subscribe();
//!
//! tracker.open();
//! tracker.set_step_status(StepId::Approve, StepStatus::InProgress, None).unwrap();
//! assert_eq!(view.current().step(StepId::Approve).status, StepStatus::InProgress);
//! ```

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::error::{BridgeError, Result};

/// Identifies one of the three transfer steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(into = "u8")]
#[repr(u8)]
pub enum StepId {
    Approve = 1,
    Bridge = 2,
    Done = 3,
}

impl StepId {
    pub const ALL: [StepId; 3] = [StepId::Approve, StepId::Bridge, StepId::Done];

    #[inline]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    #[inline]
    pub const fn title(self) -> &'static str {
        match self {
            Self::Approve => "Approve",
            Self::Bridge => "Bridge",
            Self::Done => "Done",
        }
    }

    const fn index(self) -> usize {
        self as usize - 1
    }
}

impl From<StepId> for u8 {
    fn from(id: StepId) -> Self {
        id.as_u8()
    }
}

impl TryFrom<u8> for StepId {
    type Error = BridgeError;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            1 => Ok(Self::Approve),
            2 => Ok(Self::Bridge),
            3 => Ok(Self::Done),
            other => Err(BridgeError::InvalidIntent(format!(
                "no transfer step with id {other}"
            ))),
        }
    }
}

impl fmt::Display for StepId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.title(), self.as_u8())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum StepStatus {
    Pending,
    InProgress,
    Completed,
    Error,
}

impl StepStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in-progress",
            Self::Completed => "completed",
            Self::Error => "error",
        }
    }

    const fn advances(self) -> bool {
        matches!(self, Self::InProgress | Self::Completed)
    }
}

impl fmt::Display for StepStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One row of the progress display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Step {
    pub id: StepId,
    pub title: &'static str,
    pub status: StepStatus,
    pub error: Option<String>,
}

impl Step {
    const fn pending(id: StepId) -> Self {
        Self {
            id,
            title: id.title(),
            status: StepStatus::Pending,
            error: None,
        }
    }
}

/// Where the orchestrated flow currently is.
///
/// `Idle` is the only phase from which a new transfer may start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum TransferPhase {
    Idle,
    Approving,
    Bridging,
    Completed,
    Errored,
}

impl fmt::Display for TransferPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Approving => "approving",
            Self::Bridging => "bridging",
            Self::Completed => "completed",
            Self::Errored => "errored",
        };
        f.write_str(name)
    }
}

/// Snapshot of the transfer progress as seen by the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressState {
    pub is_open: bool,
    pub phase: TransferPhase,
    pub steps: [Step; 3],
    #[serde(skip)]
    session: u64,
}

impl ProgressState {
    fn initial(session: u64, is_open: bool) -> Self {
        Self {
            is_open,
            phase: TransferPhase::Idle,
            steps: StepId::ALL.map(Step::pending),
            session,
        }
    }

    pub fn step(&self, id: StepId) -> &Step {
        &self.steps[id.index()]
    }

    /// True once every step has completed.
    pub fn is_completed(&self) -> bool {
        self.steps.iter().all(|s| s.status == StepStatus::Completed)
    }

    /// The step currently showing an error, if any.
    pub fn error_step(&self) -> Option<&Step> {
        self.steps.iter().find(|s| s.status == StepStatus::Error)
    }

    pub fn in_progress_step(&self) -> Option<&Step> {
        self.steps.iter().find(|s| s.status == StepStatus::InProgress)
    }

    fn apply(&mut self, id: StepId, status: StepStatus, error: Option<String>) -> Result<()> {
        let later_advanced = self.steps[id.index() + 1..]
            .iter()
            .any(|s| s.status.advances());

        let blocked = match status {
            // only reset returns steps to pending
            StepStatus::Pending => true,
            StepStatus::Error => {
                later_advanced
                    || self
                        .error_step()
                        .is_some_and(|current| current.id != id)
            }
            StepStatus::InProgress | StepStatus::Completed => {
                self.error_step().is_some()
                    || self.steps[..id.index()]
                        .iter()
                        .any(|s| s.status != StepStatus::Completed)
                    || (status == StepStatus::InProgress
                        && self
                            .in_progress_step()
                            .is_some_and(|current| current.id != id))
            }
        };

        if blocked {
            return Err(BridgeError::InvalidStepTransition { step: id, status });
        }

        let step = &mut self.steps[id.index()];
        step.status = status;
        step.error = match status {
            StepStatus::Error => error,
            _ => None,
        };

        self.phase = match (id, status) {
            (_, StepStatus::Error) => TransferPhase::Errored,
            (StepId::Approve, StepStatus::InProgress) => TransferPhase::Approving,
            (StepId::Bridge, StepStatus::InProgress) => TransferPhase::Bridging,
            (StepId::Done, StepStatus::Completed) => TransferPhase::Completed,
            _ => self.phase,
        };

        Ok(())
    }
}

/// Token tying updates to the tracker session they were issued in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Session(u64);

/// Owner of the transfer progress state.
///
/// Cloning yields another handle to the same state. Reads through
/// [`ProgressView`] are always consistent because every mutation replaces the
/// state atomically.
#[derive(Debug, Clone)]
pub struct ProgressTracker {
    state: Arc<watch::Sender<ProgressState>>,
}

impl Default for ProgressTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressTracker {
    pub fn new() -> Self {
        let (sender, _) = watch::channel(ProgressState::initial(0, false));
        Self {
            state: Arc::new(sender),
        }
    }

    /// Read-only handle for the presentation layer.
    pub fn subscribe(&self) -> ProgressView {
        ProgressView {
            receiver: self.state.subscribe(),
        }
    }

    pub fn snapshot(&self) -> ProgressState {
        self.state.borrow().clone()
    }

    pub fn open(&self) {
        self.state.send_modify(|state| state.is_open = true);
    }

    /// Hides the progress display and returns to `Idle`.
    ///
    /// Transactions already broadcast keep going on-chain; their later status
    /// updates are dropped because they belong to the previous session.
    pub fn close(&self) {
        self.state.send_modify(|state| {
            *state = ProgressState::initial(state.session + 1, false);
        });
        debug!(event = "progress_closed");
    }

    /// Returns every step to `pending` and the flow to `Idle`.
    pub fn reset(&self) {
        self.state.send_modify(|state| {
            *state = ProgressState::initial(state.session + 1, state.is_open);
        });
        debug!(event = "progress_reset");
    }

    /// Sets the status of a single step.
    ///
    /// `error` is kept only when `status` is [`StepStatus::Error`].
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::InvalidStepTransition`] when the change would break
    /// the step ordering invariants; the state is left untouched in that case.
    pub fn set_step_status(
        &self,
        id: StepId,
        status: StepStatus,
        error: Option<String>,
    ) -> Result<()> {
        let mut outcome = Ok(());
        self.state.send_if_modified(|state| {
            outcome = state.apply(id, status, error);
            outcome.is_ok()
        });
        outcome
    }

    /// Claims an `Idle` flow for a new run: opens the display and puts the
    /// approval step in progress in a single update, so a concurrent caller
    /// sees a non-idle phase.
    pub(crate) fn begin(&self) -> Result<Session> {
        let mut outcome = Err(BridgeError::NotIdle {
            phase: TransferPhase::Idle,
        });
        self.state.send_if_modified(|state| {
            if state.phase != TransferPhase::Idle {
                outcome = Err(BridgeError::NotIdle { phase: state.phase });
                return false;
            }
            if let Err(e) = state.apply(StepId::Approve, StepStatus::InProgress, None) {
                outcome = Err(e);
                return false;
            }
            state.is_open = true;
            outcome = Ok(Session(state.session));
            true
        });
        if outcome.is_ok() {
            debug!(event = "transfer_begun");
        }
        outcome
    }

    /// Applies a step update on behalf of a run.
    ///
    /// Returns `Ok(false)` when the run's session has been closed or reset in
    /// the meantime and the update was dropped.
    pub(crate) fn update(
        &self,
        session: Session,
        id: StepId,
        status: StepStatus,
        error: Option<String>,
    ) -> Result<bool> {
        let mut outcome = Ok(false);
        self.state.send_if_modified(|state| {
            if state.session != session.0 {
                return false;
            }
            outcome = state.apply(id, status, error).map(|()| true);
            matches!(outcome, Ok(true))
        });

        match &outcome {
            Ok(false) => debug!(
                step = %id,
                status = %status,
                event = "stale_progress_update_dropped"
            ),
            Err(e) => warn!(
                step = %id,
                status = %status,
                error = %e,
                event = "progress_update_rejected"
            ),
            Ok(true) => debug!(step = %id, status = %status, event = "progress_updated"),
        }

        outcome
    }
}

/// Read-only projection of [`ProgressState`] for observers.
#[derive(Debug, Clone)]
pub struct ProgressView {
    receiver: watch::Receiver<ProgressState>,
}

impl ProgressView {
    pub fn current(&self) -> ProgressState {
        self.receiver.borrow().clone()
    }

    /// Waits for the next change and returns the new state.
    ///
    /// Returns `None` once every tracker handle has been dropped. Rapid
    /// successive changes may be observed as a single update.
    pub async fn changed(&mut self) -> Option<ProgressState> {
        self.receiver.changed().await.ok()?;
        Some(self.receiver.borrow_and_update().clone())
    }
}
