//! The processing loop: run task cycles forever with bounded-retry
//! backpressure.

use std::time::Duration;

use thiserror::Error;
use tracing::{error, info};

use crate::runner::{CycleError, CycleOutcome, TaskCycle};

/// Why the loop ended. It never ends on a success path.
#[derive(Debug, Error)]
pub enum LoopError {
    /// Too many consecutive cycle failures; carries the last one.
    #[error("consecutive failure allowance exhausted: {0}")]
    FailuresExhausted(#[source] CycleError),

    /// The queue stayed empty for the whole claim-retry allowance.
    #[error("no tasks available after {0} consecutive empty polls")]
    NoTasksAvailable(u32),
}

/// Drives a [`TaskCycle`] repeatedly.
///
/// A success resets the failure allowance; an empty poll delays the next
/// claim without touching it. The empty-poll allowance counts consecutive
/// empty polls only, so any other outcome resets it. The loop terminates
/// only when the failure allowance or the empty-poll allowance is
/// exhausted.
pub struct ProcessingLoop<C> {
    cycle: C,
    failures_allowed: u32,
    claim_retries: u32,
    poll_delay: Duration,
}

impl<C: TaskCycle> ProcessingLoop<C> {
    pub fn new(cycle: C, failures_allowed: u32, claim_retries: u32, poll_delay: Duration) -> Self {
        Self {
            cycle,
            failures_allowed,
            claim_retries,
            poll_delay,
        }
    }

    /// Run until an allowance is exhausted. External stop is the caller's
    /// concern (select against this future).
    pub async fn run(&mut self) -> LoopError {
        let mut failures_left = self.failures_allowed;
        let mut polls_left = self.claim_retries;

        loop {
            match self.cycle.run_cycle().await {
                Ok(CycleOutcome::Completed) => {
                    info!("task cycle completed");
                    failures_left = self.failures_allowed;
                    polls_left = self.claim_retries;
                }
                Ok(CycleOutcome::NoWork) => {
                    polls_left = polls_left.saturating_sub(1);
                    if polls_left == 0 {
                        info!(
                            polls = self.claim_retries,
                            "queue stayed empty; giving up"
                        );
                        return LoopError::NoTasksAvailable(self.claim_retries);
                    }
                    info!(
                        delay_secs = self.poll_delay.as_secs(),
                        polls_left, "no work available; polling again"
                    );
                    tokio::time::sleep(self.poll_delay).await;
                }
                Err(err) => {
                    // Only consecutive empty polls count toward giving up.
                    polls_left = self.claim_retries;
                    failures_left = failures_left.saturating_sub(1);
                    error!(error = %err, failures_left, "task cycle failed");
                    if failures_left == 0 {
                        return LoopError::FailuresExhausted(err);
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use fleetd_queue::QueueError;
    use std::collections::VecDeque;

    /// Replays a scripted sequence of cycle outcomes.
    struct ScriptedCycle {
        outcomes: VecDeque<Result<CycleOutcome, CycleError>>,
        cycles_run: u32,
    }

    impl ScriptedCycle {
        fn new(outcomes: Vec<Result<CycleOutcome, CycleError>>) -> Self {
            Self {
                outcomes: outcomes.into(),
                cycles_run: 0,
            }
        }
    }

    #[async_trait]
    impl TaskCycle for ScriptedCycle {
        async fn run_cycle(&mut self) -> Result<CycleOutcome, CycleError> {
            self.cycles_run += 1;
            self.outcomes
                .pop_front()
                .expect("loop ran more cycles than scripted")
        }
    }

    fn failure() -> CycleError {
        CycleError::Claim(QueueError::UnexpectedStatus {
            endpoint: "claim-work".to_string(),
            status: reqwest::StatusCode::INTERNAL_SERVER_ERROR,
        })
    }

    #[tokio::test(start_paused = true)]
    async fn terminates_after_consecutive_failures() {
        let cycle = ScriptedCycle::new(vec![Err(failure()), Err(failure()), Err(failure())]);
        let mut lp = ProcessingLoop::new(cycle, 3, 5, Duration::from_secs(30));
        let err = lp.run().await;
        assert!(matches!(err, LoopError::FailuresExhausted(_)));
        assert_eq!(lp.cycle.cycles_run, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn success_resets_failure_allowance() {
        // Two failures, a success, then three more failures: only the
        // final run of three exhausts an allowance of 3.
        let cycle = ScriptedCycle::new(vec![
            Err(failure()),
            Err(failure()),
            Ok(CycleOutcome::Completed),
            Err(failure()),
            Err(failure()),
            Err(failure()),
        ]);
        let mut lp = ProcessingLoop::new(cycle, 3, 5, Duration::from_secs(30));
        let err = lp.run().await;
        assert!(matches!(err, LoopError::FailuresExhausted(_)));
        assert_eq!(lp.cycle.cycles_run, 6);
    }

    // Scenario: five consecutive 204s surface "no tasks available"
    // without the failure counter moving.
    #[tokio::test(start_paused = true)]
    async fn empty_queue_terminates_after_claim_retries() {
        let cycle = ScriptedCycle::new((0..5).map(|_| Ok(CycleOutcome::NoWork)).collect());
        let mut lp = ProcessingLoop::new(cycle, 5, 5, Duration::from_secs(30));
        let err = lp.run().await;
        assert!(matches!(err, LoopError::NoTasksAvailable(5)));
        assert_eq!(lp.cycle.cycles_run, 5);
    }

    #[tokio::test(start_paused = true)]
    async fn empty_polls_do_not_consume_failure_allowance() {
        // allowance 2: one failure, then empty polls, then one more
        // failure terminates — the polls in between did not decrement.
        let cycle = ScriptedCycle::new(vec![
            Err(failure()),
            Ok(CycleOutcome::NoWork),
            Ok(CycleOutcome::NoWork),
            Err(failure()),
        ]);
        let mut lp = ProcessingLoop::new(cycle, 2, 5, Duration::from_secs(30));
        let err = lp.run().await;
        assert!(matches!(err, LoopError::FailuresExhausted(_)));
        assert_eq!(lp.cycle.cycles_run, 4);
    }

    #[tokio::test(start_paused = true)]
    async fn failure_resets_empty_poll_allowance() {
        // A failure between empty polls breaks the consecutive run: the
        // loop must see three empty polls in a row after it to give up.
        let cycle = ScriptedCycle::new(vec![
            Ok(CycleOutcome::NoWork),
            Ok(CycleOutcome::NoWork),
            Err(failure()),
            Ok(CycleOutcome::NoWork),
            Ok(CycleOutcome::NoWork),
            Ok(CycleOutcome::NoWork),
        ]);
        let mut lp = ProcessingLoop::new(cycle, 5, 3, Duration::from_secs(30));
        let err = lp.run().await;
        assert!(matches!(err, LoopError::NoTasksAvailable(3)));
        assert_eq!(lp.cycle.cycles_run, 6);
    }

    #[tokio::test(start_paused = true)]
    async fn completion_resets_empty_poll_allowance() {
        let cycle = ScriptedCycle::new(vec![
            Ok(CycleOutcome::NoWork),
            Ok(CycleOutcome::NoWork),
            Ok(CycleOutcome::Completed),
            Ok(CycleOutcome::NoWork),
            Ok(CycleOutcome::NoWork),
            Ok(CycleOutcome::NoWork),
        ]);
        let mut lp = ProcessingLoop::new(cycle, 5, 3, Duration::from_secs(30));
        let err = lp.run().await;
        assert!(matches!(err, LoopError::NoTasksAvailable(3)));
        assert_eq!(lp.cycle.cycles_run, 6);
    }
}
