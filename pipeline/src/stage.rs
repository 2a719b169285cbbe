use echoscan_core::{CoreError, Stage, StageStatus};
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, warn};

/// Per-stage lock and status. Holding the lock is what "running" means, so
/// a second caller is turned away with `Busy` instead of waiting.
#[derive(Debug)]
pub(crate) struct StageSlot {
    stage: Stage,
    status: Arc<Mutex<StageStatus>>,
}

impl StageSlot {
    pub(crate) fn new(stage: Stage) -> Self {
        Self {
            stage,
            status: Arc::new(Mutex::new(StageStatus::Idle)),
        }
    }

    pub(crate) fn try_begin(&self) -> Result<StageRun, CoreError> {
        let guard = self
            .status
            .clone()
            .try_lock_owned()
            .map_err(|_| CoreError::Busy { stage: self.stage })?;

        Ok(StageRun {
            stage: self.stage,
            guard,
            started: false,
            finished: false,
        })
    }

    pub(crate) fn status(&self) -> StageStatus {
        match self.status.try_lock() {
            Ok(status) => status.clone(),
            Err(_) => StageStatus::Running,
        }
    }
}

/// Exclusive claim on a stage for the duration of one call.
pub(crate) struct StageRun {
    stage: Stage,
    guard: OwnedMutexGuard<StageStatus>,
    started: bool,
    finished: bool,
}

impl StageRun {
    /// Marks the point past which the stage has work in flight.
    pub(crate) fn start(&mut self) {
        debug!("{} running", self.stage);
        *self.guard = StageStatus::Running;
        self.started = true;
    }

    pub(crate) fn succeed(mut self) {
        *self.guard = StageStatus::Succeeded;
        self.finished = true;
    }

    pub(crate) fn fail(mut self, reason: impl Into<String>) {
        *self.guard = StageStatus::Failed(reason.into());
        self.finished = true;
    }

    /// Releases the claim without touching the recorded status.
    pub(crate) fn abandon(mut self) {
        self.finished = true;
    }
}

impl Drop for StageRun {
    fn drop(&mut self) {
        if self.started && !self.finished {
            warn!("{} dropped while in flight", self.stage);
            *self.guard = StageStatus::Failed("interrupted".to_string());
        }
    }
}
