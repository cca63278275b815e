//! Bounded retries, partial save, and sequential batch processing.
//!
//! Each target is driven through an explicit [`TargetState`] machine:
//!
//! ```text
//! Pending → Attempting(1) → Success | Skipped
//!                         → Attempting(n + 1)      (failure, attempts left)
//!                         → Exhausted → PartialSave | Skipped | Failed
//! ```

use std::time::Duration;

use tracing::{error, info, instrument, warn};

use vanbuilder_shared::{ProcessingOutcome, Target, VanBuilderError};

use crate::duplicates::Decision;
use crate::input::TargetBatch;
use crate::pipeline::{AttemptLog, AttemptOutcome, Pipeline};
use crate::report::{RunReport, TargetReport};

// ---------------------------------------------------------------------------
// State machine
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetState {
    Pending,
    /// Running attempt number `attempt` (1-based).
    Attempting { attempt: u32 },
    /// Every attempt failed; a partial save may still be possible.
    Exhausted,
    Success,
    PartialSave,
    Failed,
    Skipped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetEvent {
    Start,
    /// The attempt completed and the record was persisted (or already up to date).
    Succeeded,
    /// The duplicate policy refused the write.
    Declined,
    /// The attempt raised an error.
    Failed,
    /// After exhaustion: the draft record was persisted.
    Salvaged,
    /// After exhaustion: nothing usable was persisted.
    Lost,
}

impl TargetState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Success | Self::PartialSave | Self::Failed | Self::Skipped
        )
    }

    /// Next state. Terminal states absorb every event; events that do not
    /// apply to the current state leave it unchanged.
    pub fn transition(self, event: TargetEvent, max_attempts: u32) -> TargetState {
        use TargetEvent as E;
        match (self, event) {
            (s, _) if s.is_terminal() => s,
            (Self::Pending, E::Start) => Self::Attempting { attempt: 1 },
            (Self::Attempting { .. }, E::Succeeded) => Self::Success,
            (Self::Attempting { .. }, E::Declined) => Self::Skipped,
            (Self::Attempting { attempt }, E::Failed) if attempt < max_attempts => {
                Self::Attempting { attempt: attempt + 1 }
            }
            (Self::Attempting { .. }, E::Failed) => Self::Exhausted,
            (Self::Exhausted, E::Salvaged) => Self::PartialSave,
            (Self::Exhausted, E::Declined) => Self::Skipped,
            (Self::Exhausted, E::Lost) => Self::Failed,
            (s, _) => s,
        }
    }

    /// Report outcome of a terminal state.
    pub fn outcome(&self) -> Option<ProcessingOutcome> {
        match self {
            Self::Success => Some(ProcessingOutcome::Success),
            Self::PartialSave => Some(ProcessingOutcome::Partial),
            Self::Failed => Some(ProcessingOutcome::Failed),
            Self::Skipped => Some(ProcessingOutcome::Skipped),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Progress
// ---------------------------------------------------------------------------

/// Progress callbacks for batch runs.
pub trait BatchProgress {
    fn target_started(&self, index: usize, total: usize, target: &Target);
    fn attempt_failed(&self, target: &Target, attempt: u32, error: &VanBuilderError);
    fn target_finished(&self, entry: &TargetReport);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl BatchProgress for SilentProgress {
    fn target_started(&self, _index: usize, _total: usize, _target: &Target) {}
    fn attempt_failed(&self, _target: &Target, _attempt: u32, _error: &VanBuilderError) {}
    fn target_finished(&self, _entry: &TargetReport) {}
}

// ---------------------------------------------------------------------------
// Orchestrator
// ---------------------------------------------------------------------------

pub struct Orchestrator<'a> {
    pipeline: Pipeline<'a>,
}

impl<'a> Orchestrator<'a> {
    pub fn new(pipeline: Pipeline<'a>) -> Self {
        Self { pipeline }
    }

    /// Drive one target to a terminal state.
    #[instrument(skip_all, fields(url = %target.url, state = %target.state))]
    pub async fn process_target(&self, target: &Target, progress: &dyn BatchProgress) -> TargetReport {
        let cfg = self.pipeline.config();
        let max_attempts = cfg.max_attempts();

        let mut state = TargetState::Pending.transition(TargetEvent::Start, max_attempts);
        let mut log = AttemptLog::default();
        let mut attempts = 0;
        let mut last_error: Option<String> = None;
        let mut saved_name: Option<String> = None;
        let mut photos = 0;
        let mut decision: Option<Decision> = None;

        while !state.is_terminal() {
            let event = match state {
                TargetState::Attempting { attempt } => {
                    attempts = attempt;
                    if attempt > 1 {
                        sleep(cfg.retry_delay).await;
                    }
                    match self.pipeline.attempt(target, &mut log).await {
                        Ok(AttemptOutcome::Saved { record, decision: d }) => {
                            saved_name = Some(record.name);
                            photos = record.photos.len();
                            decision = Some(d);
                            TargetEvent::Succeeded
                        }
                        Ok(AttemptOutcome::Declined { record }) => {
                            saved_name = Some(record.name);
                            decision = Some(Decision::Declined);
                            TargetEvent::Declined
                        }
                        Err(e) => {
                            warn!(attempt, max_attempts, error = %e, "attempt failed");
                            progress.attempt_failed(target, attempt, &e);
                            last_error = Some(e.to_string());
                            TargetEvent::Failed
                        }
                    }
                }
                TargetState::Exhausted => match log.draft.take() {
                    Some(draft) => match self.pipeline.save_partial(draft).await {
                        Ok(AttemptOutcome::Saved { record, decision: d }) => {
                            saved_name = Some(record.name);
                            photos = record.photos.len();
                            decision = Some(d);
                            TargetEvent::Salvaged
                        }
                        Ok(AttemptOutcome::Declined { record }) => {
                            saved_name = Some(record.name);
                            decision = Some(Decision::Declined);
                            TargetEvent::Declined
                        }
                        Err(e) => {
                            error!(error = %e, "partial save failed");
                            last_error = Some(format!("partial save failed: {e}"));
                            TargetEvent::Lost
                        }
                    },
                    None => TargetEvent::Lost,
                },
                // Pending never survives the initial Start transition.
                _ => break,
            };
            state = state.transition(event, max_attempts);
        }

        let outcome = state.outcome().unwrap_or(ProcessingOutcome::Failed);
        let reason = match outcome {
            ProcessingOutcome::Success => None,
            ProcessingOutcome::Partial => Some(format!(
                "retry budget exhausted after {attempts} attempts, partial record saved: {}",
                last_error.as_deref().unwrap_or("unknown error")
            )),
            ProcessingOutcome::Skipped => {
                Some("existing record kept, duplicate overwrite declined".to_string())
            }
            ProcessingOutcome::Failed => Some(
                last_error
                    .clone()
                    .unwrap_or_else(|| "no usable data extracted".to_string()),
            ),
        };

        info!(outcome = %outcome, attempts, "target finished");

        TargetReport {
            url: target.url.to_string(),
            state: target.state.clone(),
            name: saved_name.or_else(|| target.known_name.clone()),
            outcome,
            attempts,
            reason,
            photos,
            origins_added: log.origins_added,
            photos_dropped: log.photos_dropped,
            csp_error: log.csp_error,
            accuracy: log.accuracy,
            decision,
        }
    }

    /// Process a parsed input file. Rejected rows are reported as failed
    /// ahead of the processed targets.
    #[instrument(skip_all, fields(targets = batch.targets.len(), rejected = batch.rejected.len()))]
    pub async fn run_input(&self, batch: &TargetBatch, progress: &dyn BatchProgress) -> RunReport {
        let mut report = RunReport::new();
        for row in &batch.rejected {
            report.push_rejected(row);
        }
        self.run_into(report, &batch.targets, progress).await
    }

    /// Process targets one at a time with the configured delay between them.
    #[instrument(skip_all, fields(targets = targets.len()))]
    pub async fn run_batch(&self, targets: &[Target], progress: &dyn BatchProgress) -> RunReport {
        self.run_into(RunReport::new(), targets, progress).await
    }

    async fn run_into(
        &self,
        mut report: RunReport,
        targets: &[Target],
        progress: &dyn BatchProgress,
    ) -> RunReport {
        let total = targets.len();

        for (i, target) in targets.iter().enumerate() {
            if i > 0 {
                sleep(self.pipeline.config().target_delay).await;
            }
            progress.target_started(i, total, target);
            let entry = self.process_target(target, progress).await;
            progress.target_finished(&entry);
            report.push(entry);
        }

        report.finish();
        let counts = report.counts();
        info!(
            success = counts.success,
            partial = counts.partial,
            skipped = counts.skipped,
            failed = counts.failed,
            "batch complete"
        );
        report
    }
}

async fn sleep(delay: Duration) {
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_enters_first_attempt() {
        assert_eq!(
            TargetState::Pending.transition(TargetEvent::Start, 4),
            TargetState::Attempting { attempt: 1 }
        );
    }

    #[test]
    fn failures_retry_until_budget_is_spent() {
        let mut state = TargetState::Pending.transition(TargetEvent::Start, 4);
        let mut seen = Vec::new();
        while let TargetState::Attempting { attempt } = state {
            seen.push(attempt);
            state = state.transition(TargetEvent::Failed, 4);
        }
        assert_eq!(seen, vec![1, 2, 3, 4]);
        assert_eq!(state, TargetState::Exhausted);
    }

    #[test]
    fn exhaustion_outcomes() {
        let ex = TargetState::Exhausted;
        assert_eq!(ex.transition(TargetEvent::Salvaged, 4), TargetState::PartialSave);
        assert_eq!(ex.transition(TargetEvent::Lost, 4), TargetState::Failed);
        assert_eq!(ex.transition(TargetEvent::Declined, 4), TargetState::Skipped);
        assert_eq!(TargetState::PartialSave.outcome(), Some(ProcessingOutcome::Partial));
        assert_eq!(ex.outcome(), None);
    }

    #[test]
    fn terminal_states_absorb_events() {
        for terminal in [
            TargetState::Success,
            TargetState::PartialSave,
            TargetState::Failed,
            TargetState::Skipped,
        ] {
            for event in [TargetEvent::Start, TargetEvent::Failed, TargetEvent::Succeeded] {
                assert_eq!(terminal.transition(event, 4), terminal);
            }
        }
    }

    #[test]
    fn success_and_decline_end_an_attempt() {
        let attempting = TargetState::Attempting { attempt: 2 };
        assert_eq!(attempting.transition(TargetEvent::Succeeded, 4), TargetState::Success);
        assert_eq!(attempting.transition(TargetEvent::Declined, 4), TargetState::Skipped);
    }

    #[test]
    fn zero_retries_means_one_attempt() {
        let state = TargetState::Attempting { attempt: 1 }.transition(TargetEvent::Failed, 1);
        assert_eq!(state, TargetState::Exhausted);
    }
}
