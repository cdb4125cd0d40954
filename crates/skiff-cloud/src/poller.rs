//! Operation poller
//!
//! Turns a fire-and-forget mutation into a synchronous outcome by probing the
//! remote side until a terminal condition holds, the attempt budget runs out,
//! or the caller cancels.
//!
//! ```text
//!   probe ──► Complete ──────────────► succeeded
//!     │  ├──► Failed(reason) ────────► OperationFailed (no further probes)
//!     │  ├──► permanent error ───────► surfaced as-is
//!     │  └──► Waiting / transient ──┐
//!     │                             ▼
//!     └────── sleep (cancellable) ◄─ budget left? ── no ──► ExhaustedAttempts
//! ```

use crate::error::{CloudError, Result};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Status reported by a single probe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationStatus {
    Pending,
    Running,
    Done,
    /// The probed resource does not exist
    NotFound,
}

impl std::fmt::Display for OperationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OperationStatus::Pending => write!(f, "pending"),
            OperationStatus::Running => write!(f, "running"),
            OperationStatus::Done => write!(f, "done"),
            OperationStatus::NotFound => write!(f, "not-found"),
        }
    }
}

/// Raw result of one successful probe call
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub status: OperationStatus,
    /// Failure reported by the remote side for the mutation itself
    pub failure: Option<String>,
}

impl Observation {
    pub fn new(status: OperationStatus) -> Self {
        Self {
            status,
            failure: None,
        }
    }

    pub fn failed(status: OperationStatus, reason: impl Into<String>) -> Self {
        Self {
            status,
            failure: Some(reason.into()),
        }
    }
}

/// Classification of an observation by a terminal-condition predicate
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// Terminal success
    Complete,
    /// Not yet; keep polling
    Waiting,
    /// Permanent failure; stop immediately
    Failed(String),
}

/// Terminal condition for create flows: the operation reached `Done`
pub fn until_done(observation: &Observation) -> Verdict {
    match (&observation.status, &observation.failure) {
        (OperationStatus::Done, Some(reason)) => Verdict::Failed(reason.clone()),
        (OperationStatus::Done, None) => Verdict::Complete,
        (OperationStatus::NotFound, _) => {
            Verdict::Failed("operation disappeared before completing".to_string())
        }
        _ => Verdict::Waiting,
    }
}

/// Terminal condition for delete flows: the resource lookup reports not-found
pub fn until_gone(observation: &Observation) -> Verdict {
    match observation.status {
        OperationStatus::NotFound => Verdict::Complete,
        _ => Verdict::Waiting,
    }
}

/// Timing configuration for the poller
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollConfig {
    /// Delay before the second probe
    pub interval: Duration,

    /// Upper bound on any single delay
    pub max_interval: Duration,

    /// Backoff multiplier (1.0 = fixed interval)
    pub multiplier: f64,

    /// Timeout applied to each probe call
    pub probe_timeout: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
            max_interval: Duration::from_secs(30),
            multiplier: 1.0,
            probe_timeout: Duration::from_secs(60),
        }
    }
}

impl PollConfig {
    /// Delay after the given zero-based attempt
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let factor = self.multiplier.max(1.0).powi(attempt as i32);
        let millis = (self.interval.as_millis() as f64 * factor)
            .min(self.max_interval.as_millis() as f64);
        Duration::from_millis(millis as u64)
    }

    /// Attempt budget that roughly fits into `timeout` with a fixed interval
    pub fn attempts_within(&self, timeout: Duration) -> u32 {
        if self.interval.is_zero() {
            return 1;
        }
        let attempts = timeout.as_millis() / self.interval.as_millis();
        attempts.clamp(1, u32::MAX as u128) as u32
    }
}

/// Result of a polling run, produced once at termination
#[derive(Debug)]
pub struct PollOutcome {
    pub succeeded: bool,
    pub last_status: Option<OperationStatus>,
    pub attempts_used: u32,
    pub elapsed: Duration,
    pub error: Option<CloudError>,
}

impl PollOutcome {
    fn success(status: OperationStatus, attempts_used: u32, elapsed: Duration) -> Self {
        Self {
            succeeded: true,
            last_status: Some(status),
            attempts_used,
            elapsed,
            error: None,
        }
    }

    fn failure(
        last_status: Option<OperationStatus>,
        attempts_used: u32,
        elapsed: Duration,
        error: CloudError,
    ) -> Self {
        Self {
            succeeded: false,
            last_status,
            attempts_used,
            elapsed,
            error: Some(error),
        }
    }

    /// `Ok(self)` on success, otherwise the terminating error
    pub fn into_result(mut self) -> Result<PollOutcome> {
        if self.succeeded {
            return Ok(self);
        }
        Err(self.error.take().unwrap_or(CloudError::ExhaustedAttempts {
            attempts: self.attempts_used,
            elapsed: self.elapsed,
        }))
    }
}

/// Run a single remote call under the probe timeout, abandoning it as soon
/// as `cancel` fires
///
/// For the requests around a poll (the mutation itself, the final lookup)
/// that would otherwise hang a shutdown. A timeout is a transient failure.
pub async fn bounded<T, Fut>(config: &PollConfig, cancel: &CancellationToken, call: Fut) -> Result<T>
where
    Fut: Future<Output = Result<T>>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(CloudError::Cancelled),
        result = tokio::time::timeout(config.probe_timeout, call) => match result {
            Ok(result) => result,
            Err(_) => Err(CloudError::Transport(format!(
                "request timed out after {:?}",
                config.probe_timeout
            ))),
        },
    }
}

/// Probe until `is_terminal` reports a terminal verdict or `max_attempts`
/// probes have been made.
///
/// `started` marks when the overall operation began (it may predate the
/// first probe, e.g. the mutation request itself) and is the origin of
/// `PollOutcome::elapsed`. Transient probe errors and probe timeouts use up
/// their attempt but do not stop the loop; any other probe error does.
pub async fn poll<F, Fut, P>(
    config: &PollConfig,
    cancel: &CancellationToken,
    started: Instant,
    max_attempts: u32,
    mut check: F,
    is_terminal: P,
) -> PollOutcome
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Observation>>,
    P: Fn(&Observation) -> Verdict,
{
    let mut attempts = 0;
    let mut last_status = None;
    let mut transient_failures = 0;
    let mut last_transient = None;

    while attempts < max_attempts {
        attempts += 1;

        let probe = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                return PollOutcome::failure(last_status, attempts, started.elapsed(), CloudError::Cancelled);
            }
            result = tokio::time::timeout(config.probe_timeout, check()) => result,
        };

        match probe {
            Ok(Ok(observation)) => {
                last_status = Some(observation.status);
                match is_terminal(&observation) {
                    Verdict::Complete => {
                        debug!("Probe {} reached terminal status {}", attempts, observation.status);
                        return PollOutcome::success(observation.status, attempts, started.elapsed());
                    }
                    Verdict::Failed(reason) => {
                        return PollOutcome::failure(
                            last_status,
                            attempts,
                            started.elapsed(),
                            CloudError::OperationFailed(reason),
                        );
                    }
                    Verdict::Waiting => {
                        debug!(
                            "Probe {}/{} status {}, waiting",
                            attempts, max_attempts, observation.status
                        );
                    }
                }
            }
            Ok(Err(err)) if err.is_transient() => {
                warn!("Probe {}/{} failed transiently: {}", attempts, max_attempts, err);
                transient_failures += 1;
                last_transient = Some(err);
            }
            Ok(Err(err)) => {
                return PollOutcome::failure(last_status, attempts, started.elapsed(), err);
            }
            Err(_) => {
                warn!(
                    "Probe {}/{} timed out after {:?}",
                    attempts, max_attempts, config.probe_timeout
                );
                transient_failures += 1;
                last_transient = Some(CloudError::Transport(format!(
                    "probe timed out after {:?}",
                    config.probe_timeout
                )));
            }
        }

        if attempts < max_attempts {
            let delay = config.delay_for_attempt(attempts - 1);
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    return PollOutcome::failure(last_status, attempts, started.elapsed(), CloudError::Cancelled);
                }
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }

    let elapsed = started.elapsed();
    let error = match last_transient {
        Some(err) if transient_failures == attempts => err,
        _ => CloudError::ExhaustedAttempts { attempts, elapsed },
    };
    PollOutcome::failure(last_status, attempts, elapsed, error)
}
