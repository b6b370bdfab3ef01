//! Background recluster queue
//!
//! Triggers enqueue a run ticket and return at once. One worker drains tickets
//! in order, so runs never overlap. A trigger that arrives while a ticket is
//! still waiting joins that ticket instead of queueing another run.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::core::clustering::{ClusterOutcome, StyleClusterer};

/// A unit of background work the queue can run
#[async_trait]
pub trait ClusterJob: Send + Sync {
    async fn run(&self) -> Result<ClusterOutcome>;
}

#[async_trait]
impl ClusterJob for StyleClusterer {
    async fn run(&self) -> Result<ClusterOutcome> {
        StyleClusterer::run(self).await
    }
}

/// Handle returned to whoever triggered a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunTicket {
    pub run_id: u64,
    /// Joined a run that was already waiting
    pub coalesced: bool,
}

/// How a finished run ended
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "result", rename_all = "camelCase")]
pub enum RunResult {
    Finished { outcome: ClusterOutcome },
    Failed { message: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
    pub run_id: u64,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    #[serde(flatten)]
    pub result: RunResult,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueStatus {
    pub running: Option<u64>,
    pub pending: Option<u64>,
    pub last_run: Option<RunReport>,
}

pub struct ReclusterQueue {
    next_id: AtomicU64,
    sender: mpsc::Sender<u64>,
    pending: Mutex<Option<u64>>,
    running: RwLock<Option<u64>>,
    last_run: RwLock<Option<RunReport>>,
}

impl ReclusterQueue {
    /// Create the queue and spawn its worker on the current runtime
    pub fn start(job: Arc<dyn ClusterJob>) -> Arc<Self> {
        let (sender, receiver) = mpsc::channel(1);
        let queue = Arc::new(Self {
            next_id: AtomicU64::new(0),
            sender,
            pending: Mutex::new(None),
            running: RwLock::new(None),
            last_run: RwLock::new(None),
        });

        tokio::spawn(Arc::clone(&queue).work(job, receiver));

        queue
    }

    /// Ask for a run, joining the waiting one if there is one
    pub fn trigger(&self) -> Result<RunTicket> {
        let mut pending = self.pending.lock();

        if let Some(run_id) = *pending {
            tracing::debug!("Recluster trigger joined pending run {}", run_id);
            return Ok(RunTicket {
                run_id,
                coalesced: true,
            });
        }

        let run_id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        self.sender
            .try_send(run_id)
            .map_err(|e| anyhow!("recluster queue unavailable: {}", e))?;
        *pending = Some(run_id);

        tracing::info!("Queued recluster run {}", run_id);
        Ok(RunTicket {
            run_id,
            coalesced: false,
        })
    }

    pub fn status(&self) -> QueueStatus {
        QueueStatus {
            running: *self.running.read(),
            pending: *self.pending.lock(),
            last_run: self.last_run.read().clone(),
        }
    }

    async fn work(self: Arc<Self>, job: Arc<dyn ClusterJob>, mut receiver: mpsc::Receiver<u64>) {
        while let Some(run_id) = receiver.recv().await {
            {
                // hold the pending lock so a trigger never sees a stale ticket
                let mut pending = self.pending.lock();
                if *pending == Some(run_id) {
                    *pending = None;
                }
                *self.running.write() = Some(run_id);
            }

            tracing::info!("Starting recluster run {}", run_id);
            let started_at = Utc::now();

            let result = match job.run().await {
                Ok(outcome) => {
                    tracing::info!("Recluster run {} finished: {:?}", run_id, outcome);
                    RunResult::Finished { outcome }
                }
                Err(e) => {
                    tracing::error!("Recluster run {} failed: {:#}", run_id, e);
                    RunResult::Failed {
                        message: format!("{:#}", e),
                    }
                }
            };

            *self.last_run.write() = Some(RunReport {
                run_id,
                started_at,
                finished_at: Utc::now(),
                result,
            });
            *self.running.write() = None;
        }
    }
}
