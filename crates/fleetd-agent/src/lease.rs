//! Lease holding and background renewal.
//!
//! [`LeaseState`] is the single mutable record of the currently held task.
//! [`LeaseRenewer`] is a background task that reclaims the lease before it
//! expires and signals the runner when a reclaim fails. While a task runs
//! the renewer is the only writer of the lease fields; the runner reads
//! them again only after calling [`LeaseRenewer::stop`].

use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use fleetd_core::{TaskClaim, WorkerIdentity};
use fleetd_queue::QueueClient;

/// Holds the single [`TaskClaim`] for this agent instance.
///
/// A claim is present if and only if a lease is held.
#[derive(Debug, Default)]
pub struct LeaseState {
    claim: Option<TaskClaim>,
}

impl LeaseState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a claim, replacing any existing one. Claiming again without
    /// completing is a caller error, logged but not fatal.
    pub fn hold(&mut self, claim: TaskClaim) {
        if let Some(previous) = &self.claim {
            warn!(
                task_id = %previous.task_id,
                "holding a new claim while one is already held; discarding previous state"
            );
        }
        self.claim = Some(claim);
    }

    /// Discard the claim.
    pub fn clear(&mut self) {
        self.claim = None;
    }

    pub fn is_held(&self) -> bool {
        self.claim.is_some()
    }

    pub fn claim(&self) -> Option<&TaskClaim> {
        self.claim.as_ref()
    }

    pub fn claim_mut(&mut self) -> Option<&mut TaskClaim> {
        self.claim.as_mut()
    }
}

/// Background timer that keeps a claimed lease alive.
///
/// Schedules a reclaim at `takenUntil - margin`; on success it writes the
/// new expiry and upload URLs into the shared [`LeaseState`] and
/// re-schedules, on failure it signals lease loss exactly once and stops.
/// A single failure aborts — safety over availability; the lease must
/// never be exceeded.
pub struct LeaseRenewer {
    handle: JoinHandle<()>,
    lost_rx: watch::Receiver<bool>,
}

impl LeaseRenewer {
    /// Start renewing the lease held in `lease`.
    pub fn start(
        client: QueueClient,
        identity: WorkerIdentity,
        lease: Arc<Mutex<LeaseState>>,
        margin: Duration,
    ) -> Self {
        let (lost_tx, lost_rx) = watch::channel(false);
        let handle = tokio::spawn(renewal_loop(client, identity, lease, margin, lost_tx));
        Self { handle, lost_rx }
    }

    /// Resolves when a reclaim has failed and the lease is lost. Pends
    /// forever otherwise.
    pub async fn lease_lost(&mut self) {
        loop {
            if *self.lost_rx.borrow() {
                return;
            }
            if self.lost_rx.changed().await.is_err() {
                // Renewal task ended without signaling loss.
                std::future::pending::<()>().await;
            }
        }
    }

    /// Whether loss has already been signaled. Non-blocking counterpart
    /// of [`Self::lease_lost`]; stays `true` after [`Self::stop`].
    pub fn is_lost(&self) -> bool {
        *self.lost_rx.borrow()
    }

    /// Cancel any pending reclaim. Idempotent; must be called on every
    /// path out of the running state.
    pub fn stop(&self) {
        self.handle.abort();
    }
}

async fn renewal_loop(
    client: QueueClient,
    identity: WorkerIdentity,
    lease: Arc<Mutex<LeaseState>>,
    margin: Duration,
    lost_tx: watch::Sender<bool>,
) {
    loop {
        // Snapshot what the next reclaim needs; the lock is never held
        // across an await.
        let (task_id, run_id, taken_until) = {
            let state = lease.lock().unwrap();
            match state.claim() {
                Some(claim) => (
                    claim.task_id.clone(),
                    claim.run_id.clone(),
                    claim.taken_until,
                ),
                None => {
                    warn!("lease renewer started without a held claim");
                    return;
                }
            }
        };

        let until_expiry = (taken_until - Utc::now())
            .to_std()
            .unwrap_or(Duration::ZERO);
        let delay = until_expiry.saturating_sub(margin);
        debug!(task_id = %task_id, delay_secs = delay.as_secs(), "scheduling reclaim");
        tokio::time::sleep(delay).await;

        match client.reclaim(&identity, &task_id, &run_id).await {
            Ok(reply) => {
                let mut state = lease.lock().unwrap();
                let Some(claim) = state.claim_mut() else {
                    return;
                };
                let advanced = claim.renew(
                    reply.status.taken_until,
                    reply.logs_put_url,
                    reply.result_put_url,
                );
                if advanced {
                    info!(
                        task_id = %task_id,
                        taken_until = %claim.taken_until,
                        "lease renewed"
                    );
                } else {
                    warn!(
                        task_id = %task_id,
                        taken_until = %claim.taken_until,
                        "reclaim did not advance takenUntil; claim is stale"
                    );
                }
            }
            Err(err) => {
                error!(task_id = %task_id, error = %err, "reclaim failed; lease lost");
                let _ = lost_tx.send(true);
                return;
            }
        }
    }
}
