//! Polling until an asynchronous analysis reaches a terminal state
//!
//! `poll_until_terminal` fetches an observation, asks it whether it is done,
//! and sleeps between attempts. The attempt counter lives on the stack of
//! each call, so concurrent polls never share state.

use std::future::Future;
use std::time::Duration;

use shared::{AnalysisRecord, AnalysisState};
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::config::PollingConfig;
use crate::error::AppError;

/// How often and how long to poll
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(2),
            max_attempts: 30,
        }
    }
}

impl From<&PollingConfig> for PollPolicy {
    fn from(config: &PollingConfig) -> Self {
        Self {
            interval: config.interval(),
            max_attempts: config.max_attempts,
        }
    }
}

/// Outcome of classifying one observation
#[derive(Debug, Clone, PartialEq)]
pub enum PollStep<P> {
    Waiting,
    Done(P),
    Failed(String),
}

/// Something fetched while polling that knows whether it is terminal
pub trait Observation {
    type Payload;

    fn classify(self) -> PollStep<Self::Payload>;
}

impl<P> Observation for AnalysisState<P> {
    type Payload = P;

    fn classify(self) -> PollStep<P> {
        match self {
            AnalysisState::Pending | AnalysisState::Processing => PollStep::Waiting,
            AnalysisState::Completed { result } => PollStep::Done(result),
            AnalysisState::Failed { error } => PollStep::Failed(error),
        }
    }
}

impl<P> Observation for AnalysisRecord<P> {
    type Payload = P;

    fn classify(self) -> PollStep<P> {
        self.state.classify()
    }
}

#[derive(Error, Debug)]
pub enum PollError {
    /// The observed job reported failure; the message is passed through verbatim
    #[error("{0}")]
    Failed(String),

    #[error("Still not finished after {attempts} attempts")]
    TimedOut { attempts: u32 },

    #[error("Polling was cancelled")]
    Cancelled,

    #[error(transparent)]
    Fetch(#[from] AppError),
}

impl From<PollError> for AppError {
    fn from(err: PollError) -> Self {
        match err {
            PollError::Failed(message) => AppError::AnalysisFailed(message),
            PollError::TimedOut { attempts } => AppError::AnalysisTimedOut { attempts },
            PollError::Cancelled => AppError::Internal("Polling was cancelled".to_string()),
            PollError::Fetch(err) => err,
        }
    }
}

/// Fetch until the observation is terminal, the attempt budget runs out, or
/// `cancel` fires.
///
/// Fetch errors are returned immediately without retry. No sleep follows the
/// final attempt. A zero `max_attempts` is treated as one.
pub async fn poll_until_terminal<O, F, Fut>(
    policy: PollPolicy,
    cancel: &CancellationToken,
    mut fetch: F,
) -> Result<O::Payload, PollError>
where
    O: Observation,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<O, AppError>>,
{
    let max_attempts = policy.max_attempts.max(1);

    for attempt in 1..=max_attempts {
        let observation = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(PollError::Cancelled),
            fetched = fetch() => fetched?,
        };

        match observation.classify() {
            PollStep::Done(payload) => {
                tracing::debug!(attempt, "poll finished");
                return Ok(payload);
            }
            PollStep::Failed(message) => {
                tracing::warn!(attempt, error = %message, "polled job failed");
                return Err(PollError::Failed(message));
            }
            PollStep::Waiting => {
                tracing::debug!(attempt, max_attempts, "still waiting");
            }
        }

        if attempt < max_attempts {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(PollError::Cancelled),
                _ = tokio::time::sleep(policy.interval) => {}
            }
        }
    }

    tracing::warn!(attempts = max_attempts, "polling timed out");
    Err(PollError::TimedOut {
        attempts: max_attempts,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy() {
        let policy = PollPolicy::default();
        assert_eq!(policy.interval, Duration::from_secs(2));
        assert_eq!(policy.max_attempts, 30);
        assert_eq!(PollPolicy::from(&PollingConfig::default()), policy);
    }

    #[test]
    fn test_state_classification() {
        assert_eq!(AnalysisState::<u8>::Pending.classify(), PollStep::Waiting);
        assert_eq!(AnalysisState::<u8>::Processing.classify(), PollStep::Waiting);
        assert_eq!(
            AnalysisState::Completed { result: 3u8 }.classify(),
            PollStep::Done(3)
        );
        assert_eq!(
            AnalysisState::<u8>::Failed {
                error: "no imagery".into()
            }
            .classify(),
            PollStep::Failed("no imagery".into())
        );
    }

    #[test]
    fn test_poll_error_conversion() {
        assert!(matches!(
            AppError::from(PollError::TimedOut { attempts: 5 }),
            AppError::AnalysisTimedOut { attempts: 5 }
        ));
        assert!(matches!(
            AppError::from(PollError::Fetch(AppError::NotFound("Analysis".into()))),
            AppError::NotFound(_)
        ));
    }
}
