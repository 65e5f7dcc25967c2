//! The claim → run → upload → complete transaction.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use thiserror::Error;
use tracing::{debug, info, warn};

use fleetd_core::{ExecutionRecord, LogsDocument, ResultDocument, TaskClaim, WorkerIdentity};
use fleetd_queue::{ArtifactUploader, QueueClient, QueueError};

use crate::executor::TaskExecutor;
use crate::lease::{LeaseRenewer, LeaseState};

const STDOUT_LOG: &str = "stdout.log";
const STDERR_LOG: &str = "stderr.log";

/// How one task cycle failed. `LeaseLost` is the one outcome that must be
/// distinguishable: the task was killed because a reclaim failed, and must
/// not be reported completed.
#[derive(Debug, Error)]
pub enum CycleError {
    #[error("failed to claim work: {0}")]
    Claim(#[source] QueueError),

    #[error("failed to fetch task definition: {0}")]
    TaskDefinition(#[source] QueueError),

    #[error("failed to start task process: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("failed waiting for task process: {0}")]
    Wait(#[source] std::io::Error),

    #[error("lease lost while task was running; task aborted")]
    LeaseLost,

    #[error("upload failed: {0}")]
    Upload(#[source] QueueError),

    #[error("completion report failed: {0}")]
    Completion(#[source] QueueError),
}

/// Successful cycle outcomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// A task was claimed, run and reported completed.
    Completed,

    /// The queue had no task available (HTTP 204).
    NoWork,
}

/// One unit of work for the processing loop. Seam for testing the loop
/// without a queue.
#[async_trait]
pub trait TaskCycle {
    async fn run_cycle(&mut self) -> Result<CycleOutcome, CycleError>;
}

/// Orchestrates a single task cycle:
/// claim → run (racing the lease renewer) → upload artifacts and
/// documents → report completed.
pub struct TaskRunner {
    client: QueueClient,
    uploader: ArtifactUploader,
    identity: WorkerIdentity,
    lease: Arc<Mutex<LeaseState>>,
    work_dir: PathBuf,
    reclaim_margin: Duration,
}

impl TaskRunner {
    pub fn new(
        client: QueueClient,
        identity: WorkerIdentity,
        work_dir: PathBuf,
        reclaim_margin: Duration,
    ) -> Self {
        let uploader = ArtifactUploader::new(client.clone());
        Self {
            client,
            uploader,
            identity,
            lease: Arc::new(Mutex::new(LeaseState::new())),
            work_dir,
            reclaim_margin,
        }
    }

    /// The lease shared with the renewer. Exposed for inspection in tests.
    pub fn lease(&self) -> Arc<Mutex<LeaseState>> {
        self.lease.clone()
    }

    fn stdout_path(&self) -> PathBuf {
        self.work_dir.join(STDOUT_LOG)
    }

    fn stderr_path(&self) -> PathBuf {
        self.work_dir.join(STDERR_LOG)
    }

    async fn claim(&self) -> Result<Option<TaskClaim>, CycleError> {
        let Some(reply) = self
            .client
            .claim_work(&self.identity)
            .await
            .map_err(CycleError::Claim)?
        else {
            debug!("no work available");
            return Ok(None);
        };

        let task = self
            .client
            .fetch_task_definition(&reply.status.task_id)
            .await
            .map_err(CycleError::TaskDefinition)?;

        info!(
            task_id = %reply.status.task_id,
            run_id = %reply.run_id,
            taken_until = %reply.status.taken_until,
            command = %task.command,
            "claimed task"
        );

        Ok(Some(TaskClaim {
            task_id: reply.status.task_id,
            run_id: reply.run_id,
            taken_until: reply.status.taken_until,
            logs_put_url: reply.logs_put_url,
            result_put_url: reply.result_put_url,
            task,
        }))
    }

    async fn run_claimed(&self, claim: &TaskClaim) -> Result<(), CycleError> {
        let mut task = TaskExecutor::spawn(
            &claim.task.command,
            &claim.task.arguments,
            &self.stdout_path(),
            &self.stderr_path(),
        )
        .map_err(CycleError::Spawn)?;
        let started = Utc::now();

        let mut renewer = LeaseRenewer::start(
            self.client.clone(),
            self.identity.clone(),
            self.lease.clone(),
            self.reclaim_margin,
        );

        // The two events racing on the running state: process exit and
        // lease loss. The select is unbiased, so a poll where both are
        // ready can take the exit branch; re-check the loss flag there.
        let (status, aborted) = tokio::select! {
            status = task.wait() => (status, renewer.is_lost()),
            _ = renewer.lease_lost() => {
                warn!(task_id = %claim.task_id, "lease lost; killing task process");
                task.kill();
                (task.wait().await, true)
            }
        };
        renewer.stop();
        let finished = Utc::now();

        let status = status.map_err(CycleError::Wait)?;
        let record = ExecutionRecord {
            started,
            finished,
            exit_code: status.code(),
            aborted,
        };
        if record.aborted {
            return Err(CycleError::LeaseLost);
        }
        info!(
            task_id = %claim.task_id,
            exit_code = ?record.exit_code,
            "task process exited"
        );

        self.upload_and_complete(claim, &record).await
    }

    async fn upload_and_complete(
        &self,
        claim: &TaskClaim,
        record: &ExecutionRecord,
    ) -> Result<(), CycleError> {
        let stdout_path = self.stdout_path();
        let stderr_path = self.stderr_path();
        let (stdout_url, stderr_url) = tokio::try_join!(
            self.uploader.upload(
                &self.identity,
                &claim.task_id,
                &claim.run_id,
                STDOUT_LOG,
                &stdout_path,
                Some("text/plain"),
            ),
            self.uploader.upload(
                &self.identity,
                &claim.task_id,
                &claim.run_id,
                STDERR_LOG,
                &stderr_path,
                Some("text/plain"),
            ),
        )
        .map_err(CycleError::Upload)?;

        let mut artifacts = BTreeMap::new();
        artifacts.insert(STDOUT_LOG.to_string(), stdout_url);
        artifacts.insert(STDERR_LOG.to_string(), stderr_url);

        // The renewer is stopped; the lease now holds the freshest signed
        // document URLs from the last successful reclaim.
        let (logs_put_url, result_put_url) = {
            let state = self.lease.lock().unwrap();
            match state.claim() {
                Some(held) => (held.logs_put_url.clone(), held.result_put_url.clone()),
                None => (claim.logs_put_url.clone(), claim.result_put_url.clone()),
            }
        };

        let logs_doc = LogsDocument::new(artifacts.clone());
        let result_doc = ResultDocument::new(&self.identity, record, artifacts);
        tokio::try_join!(
            self.uploader.put_json(&logs_put_url, &logs_doc),
            self.uploader.put_json(&result_put_url, &result_doc),
        )
        .map_err(CycleError::Upload)?;

        self.client
            .report_completed(&self.identity, &claim.task_id, &claim.run_id)
            .await
            .map_err(CycleError::Completion)?;

        info!(task_id = %claim.task_id, run_id = %claim.run_id, "task completed");
        Ok(())
    }

    /// Remove the cycle's log files; nothing persists across iterations.
    async fn discard_logs(&self) {
        let _ = tokio::fs::remove_file(self.stdout_path()).await;
        let _ = tokio::fs::remove_file(self.stderr_path()).await;
    }
}

#[async_trait]
impl TaskCycle for TaskRunner {
    async fn run_cycle(&mut self) -> Result<CycleOutcome, CycleError> {
        let Some(claim) = self.claim().await? else {
            return Ok(CycleOutcome::NoWork);
        };
        self.lease.lock().unwrap().hold(claim.clone());

        let result = self.run_claimed(&claim).await;

        // Release everything before surfacing the outcome, success or not.
        self.lease.lock().unwrap().clear();
        self.discard_logs().await;

        result.map(|()| CycleOutcome::Completed)
    }
}
