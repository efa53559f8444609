use chrono::Utc;
use serde_json::Value;
use std::time::Duration;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::error::JobError;
use super::models::{Job, JobState};
use super::status::{StatusClass, StatusFetchError, StatusFetcher, StatusVocabulary};

/// Interval and attempt ceiling for one kind of job
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollConfig {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl PollConfig {
    pub fn new(interval: Duration, max_attempts: u32) -> Result<Self, String> {
        if interval.is_zero() {
            return Err("poll interval must be greater than zero".to_string());
        }
        if max_attempts == 0 {
            return Err("poll max attempts must be greater than zero".to_string());
        }
        Ok(Self {
            interval,
            max_attempts,
        })
    }
}

/// How a poll loop ended
#[derive(Debug)]
pub enum PollOutcome {
    /// Raw body of the completing status response
    Completed(Value),
    /// Provider-declared failure with its message
    Failed(String),
    TimedOut,
    PollError(StatusFetchError),
    Cancelled,
}

impl PollOutcome {
    pub fn into_result(self, job: &Job) -> Result<Value, JobError> {
        match self {
            PollOutcome::Completed(body) => Ok(body),
            PollOutcome::Failed(message) => Err(JobError::ProviderFailure(message)),
            PollOutcome::TimedOut => Err(JobError::TimedOut {
                job_id: job.job_id().to_string(),
                attempts: job.attempts(),
            }),
            PollOutcome::PollError(e) => Err(JobError::Poll {
                status: e.status,
                message: e.message,
            }),
            PollOutcome::Cancelled => Err(JobError::Cancelled),
        }
    }
}

/// Drive `job` to a terminal state
///
/// Every iteration issues one status fetch and counts it as an attempt.
/// Fetch errors end the loop at once without retry. Statuses that are
/// neither completed nor failed sleep for `config.interval` and retry until
/// `config.max_attempts` checks have been made. The cancellation token is
/// raced against both the fetch and the sleep; once it fires no further
/// fetch is issued.
pub async fn poll_until_terminal(
    job: &mut Job,
    fetcher: &dyn StatusFetcher,
    vocabulary: &StatusVocabulary,
    config: PollConfig,
    cancel: &CancellationToken,
) -> PollOutcome {
    job.advance(JobState::Processing);

    loop {
        let response = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                info!("Polling for job {} cancelled after {} attempt(s)", job.job_id(), job.attempts());
                return PollOutcome::Cancelled;
            }
            response = fetcher.fetch_status(job.job_id()) => response,
        };
        job.record_attempt();

        let body = match response {
            Ok(body) => body,
            Err(e) => {
                warn!(
                    "Status check {} for job {} failed (status={:?}): {}",
                    job.attempts(),
                    job.job_id(),
                    e.status,
                    e.message
                );
                job.advance(JobState::PollError);
                return PollOutcome::PollError(e);
            }
        };

        match vocabulary.classify(&body) {
            StatusClass::Completed => {
                info!(
                    "{:?} job {} completed after {} attempt(s) in {}s",
                    job.kind(),
                    job.job_id(),
                    job.attempts(),
                    (Utc::now() - job.submitted_at()).num_seconds()
                );
                job.advance(JobState::Completed);
                return PollOutcome::Completed(body);
            }
            StatusClass::Failed(message) => {
                warn!("Job {} failed at provider: {}", job.job_id(), message);
                job.advance(JobState::Failed);
                return PollOutcome::Failed(message);
            }
            StatusClass::Processing { status, recognized } => {
                if !recognized {
                    warn!(
                        "Job {} reported unrecognized status {:?}; treating it as processing",
                        job.job_id(),
                        status
                    );
                }

                if job.attempts() >= config.max_attempts {
                    warn!(
                        "{:?} job {} still processing after {} attempt(s), giving up",
                        job.kind(),
                        job.job_id(),
                        job.attempts()
                    );
                    job.advance(JobState::TimedOut);
                    return PollOutcome::TimedOut;
                }

                debug!(
                    "Job {} status {:?} (attempt {}/{}), retrying in {:?}",
                    job.job_id(),
                    status,
                    job.attempts(),
                    config.max_attempts,
                    config.interval
                );
            }
        }

        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                info!("Polling for job {} cancelled after {} attempt(s)", job.job_id(), job.attempts());
                return PollOutcome::Cancelled;
            }
            _ = sleep(config.interval) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobs::models::JobKind;
    use crate::jobs::status::PREDICTION_STATUS;
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Replays scripted responses; repeats the last one when the script runs out
    struct ScriptedFetcher {
        script: Mutex<VecDeque<Result<Value, StatusFetchError>>>,
        last: Result<Value, StatusFetchError>,
        calls: AtomicUsize,
    }

    impl ScriptedFetcher {
        fn new(script: Vec<Result<Value, StatusFetchError>>, last: Result<Value, StatusFetchError>) -> Self {
            Self {
                script: Mutex::new(script.into()),
                last,
                calls: AtomicUsize::new(0),
            }
        }

        fn always(response: Value) -> Self {
            Self::new(vec![], Ok(response))
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl StatusFetcher for ScriptedFetcher {
        async fn fetch_status(&self, _job_id: &str) -> Result<Value, StatusFetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let next = self.script.lock().unwrap().pop_front();
            next.unwrap_or_else(|| self.last.clone())
        }
    }

    fn config(max_attempts: u32) -> PollConfig {
        PollConfig::new(Duration::from_secs(5), max_attempts).unwrap()
    }

    fn processing() -> Value {
        json!({"id": "pred_1", "status": "processing"})
    }

    #[tokio::test(start_paused = true)]
    async fn always_processing_times_out_after_max_attempts() {
        let fetcher = ScriptedFetcher::always(processing());
        let mut job = Job::new("pred_1", JobKind::VideoGeneration);

        let outcome = poll_until_terminal(
            &mut job,
            &fetcher,
            &PREDICTION_STATUS,
            config(7),
            &CancellationToken::new(),
        )
        .await;

        assert!(matches!(outcome, PollOutcome::TimedOut));
        assert_eq!(fetcher.calls(), 7);
        assert_eq!(job.attempts(), 7);
        assert_eq!(job.state(), JobState::TimedOut);

        let err = outcome.into_result(&job).unwrap_err();
        assert_eq!(err.kind(), "timed-out");
    }

    #[tokio::test(start_paused = true)]
    async fn completes_on_the_nth_fetch() {
        let done = json!({"id": "pred_1", "status": "succeeded", "output": ["http://a/v.mp4"]});
        let fetcher = ScriptedFetcher::new(
            vec![Ok(processing()), Ok(processing()), Ok(processing())],
            Ok(done.clone()),
        );
        let mut job = Job::new("pred_1", JobKind::VideoGeneration);

        let outcome = poll_until_terminal(
            &mut job,
            &fetcher,
            &PREDICTION_STATUS,
            config(10),
            &CancellationToken::new(),
        )
        .await;

        assert_eq!(fetcher.calls(), 4);
        assert_eq!(job.state(), JobState::Completed);
        assert_eq!(outcome.into_result(&job).unwrap(), done);
    }

    #[tokio::test(start_paused = true)]
    async fn fetch_error_stops_immediately_without_retry() {
        let fetcher = ScriptedFetcher::new(
            vec![],
            Err(StatusFetchError {
                status: Some(503),
                message: "upstream unavailable".to_string(),
            }),
        );
        let mut job = Job::new("pred_1", JobKind::Transcription);

        let outcome = poll_until_terminal(
            &mut job,
            &fetcher,
            &PREDICTION_STATUS,
            config(10),
            &CancellationToken::new(),
        )
        .await;

        assert_eq!(fetcher.calls(), 1);
        assert_eq!(job.state(), JobState::PollError);
        match outcome.into_result(&job).unwrap_err() {
            JobError::Poll { status, .. } => assert_eq!(status, Some(503)),
            other => panic!("expected poll error, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn provider_failure_carries_the_message() {
        let fetcher = ScriptedFetcher::new(
            vec![Ok(processing())],
            Ok(json!({"status": "failed", "error": "motion video too long"})),
        );
        let mut job = Job::new("pred_1", JobKind::VideoGeneration);

        let outcome = poll_until_terminal(
            &mut job,
            &fetcher,
            &PREDICTION_STATUS,
            config(10),
            &CancellationToken::new(),
        )
        .await;

        assert_eq!(fetcher.calls(), 2);
        assert_eq!(job.state(), JobState::Failed);
        assert!(matches!(outcome, PollOutcome::Failed(ref m) if m == "motion video too long"));
    }

    #[tokio::test(start_paused = true)]
    async fn unknown_status_is_retried_like_processing() {
        let fetcher = ScriptedFetcher::new(
            vec![Ok(json!({"status": "warming_up"}))],
            Ok(json!({"status": "completed", "output": "http://a/v.mp4"})),
        );
        let mut job = Job::new("pred_1", JobKind::VideoGeneration);

        let outcome = poll_until_terminal(
            &mut job,
            &fetcher,
            &PREDICTION_STATUS,
            config(10),
            &CancellationToken::new(),
        )
        .await;

        assert!(matches!(outcome, PollOutcome::Completed(_)));
        assert_eq!(fetcher.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_token_issues_no_fetch() {
        let fetcher = ScriptedFetcher::always(processing());
        let mut job = Job::new("pred_1", JobKind::VideoGeneration);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let outcome =
            poll_until_terminal(&mut job, &fetcher, &PREDICTION_STATUS, config(10), &cancel).await;

        assert!(matches!(outcome, PollOutcome::Cancelled));
        assert_eq!(fetcher.calls(), 0);
        assert_eq!(job.attempts(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_during_sleep_stops_further_polls() {
        let fetcher = ScriptedFetcher::always(processing());
        let mut job = Job::new("pred_1", JobKind::VideoGeneration);
        let cancel = CancellationToken::new();

        let trigger = cancel.clone();
        tokio::spawn(async move {
            sleep(Duration::from_secs(12)).await;
            trigger.cancel();
        });

        let outcome =
            poll_until_terminal(&mut job, &fetcher, &PREDICTION_STATUS, config(100), &cancel).await;

        assert!(matches!(outcome, PollOutcome::Cancelled));
        // fetches at t=0, 5, 10; cancelled while sleeping towards t=15
        assert_eq!(fetcher.calls(), 3);
        assert_eq!(job.state(), JobState::Processing);
    }

    #[test]
    fn zero_attempts_or_interval_is_rejected() {
        assert!(PollConfig::new(Duration::ZERO, 3).is_err());
        assert!(PollConfig::new(Duration::from_millis(500), 0).is_err());
    }
}
