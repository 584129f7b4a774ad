//! Trigger queue in front of the orchestrator.
//!
//! Cycles run one after another on a single task. The queue holds at most one
//! pending trigger, so requests arriving while a cycle is in flight collapse
//! into a single follow-up cycle.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::orchestrator::{CycleOutcome, Orchestrator};

/// What started a cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Trigger {
    Schedule,
    RegistryChanged,
    Manual,
}

impl Trigger {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Trigger::Schedule => "schedule",
            Trigger::RegistryChanged => "registry_changed",
            Trigger::Manual => "manual",
        }
    }
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of [`TriggerHandle::request`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerStatus {
    /// A new cycle was queued.
    Queued,
    /// A cycle was already pending; this request folds into it.
    Coalesced,
    /// The driver has stopped.
    Closed,
}

/// Cloneable sender used by the scheduler and HTTP handlers.
#[derive(Debug, Clone)]
pub struct TriggerHandle {
    tx: mpsc::Sender<Trigger>,
}

impl TriggerHandle {
    #[must_use]
    pub fn request(&self, trigger: Trigger) -> TriggerStatus {
        match self.tx.try_send(trigger) {
            Ok(()) => TriggerStatus::Queued,
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::debug!(%trigger, "cycle already pending; trigger coalesced");
                TriggerStatus::Coalesced
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                tracing::warn!(%trigger, "ingestion driver stopped; trigger dropped");
                TriggerStatus::Closed
            }
        }
    }
}

/// Spawn the task that runs one cycle per queued trigger.
#[must_use]
pub fn spawn_driver(orchestrator: Arc<Orchestrator>) -> (TriggerHandle, JoinHandle<()>) {
    let (tx, mut rx) = mpsc::channel::<Trigger>(1);

    let task = tokio::spawn(async move {
        while let Some(trigger) = rx.recv().await {
            match orchestrator.run_cycle(trigger).await {
                Ok(CycleOutcome::Completed(report)) => {
                    tracing::debug!(run_id = ?report.run_id, "driver cycle finished");
                }
                Ok(CycleOutcome::Skipped) => {}
                Err(e) => {
                    tracing::error!(%trigger, error = %e, "ingestion cycle aborted");
                }
            }
        }
        tracing::info!("ingestion driver stopped");
    });

    (TriggerHandle { tx }, task)
}
