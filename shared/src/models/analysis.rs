//! Analysis lifecycle models
//!
//! An analysis is computed asynchronously by a worker. Its state is a tagged
//! union so that a completed analysis always carries its result and a failed
//! one always carries an error message:
//!
//! ```text
//! pending ──> processing ──> completed(result)
//!    │             │
//!    └─────────────┴──────> failed(error)
//! ```
//!
//! Terminal states never change again.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Kinds of analysis a user can request for a farm
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisKind {
    SoilHealth,
    Roi,
}

impl AnalysisKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnalysisKind::SoilHealth => "soil_health",
            AnalysisKind::Roi => "roi",
        }
    }
}

impl std::str::FromStr for AnalysisKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "soil_health" => Ok(AnalysisKind::SoilHealth),
            "roi" => Ok(AnalysisKind::Roi),
            _ => Err(format!("Unknown analysis kind: {}", s)),
        }
    }
}

impl std::fmt::Display for AnalysisKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Flat status discriminant, as stored and reported
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl AnalysisStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnalysisStatus::Pending => "pending",
            AnalysisStatus::Processing => "processing",
            AnalysisStatus::Completed => "completed",
            AnalysisStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, AnalysisStatus::Completed | AnalysisStatus::Failed)
    }

    /// Whether the lifecycle allows moving from `self` to `to`
    pub fn can_transition_to(&self, to: AnalysisStatus) -> bool {
        use AnalysisStatus::*;
        matches!(
            (self, to),
            (Pending, Processing) | (Pending, Failed) | (Processing, Completed) | (Processing, Failed)
        )
    }
}

impl std::str::FromStr for AnalysisStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(AnalysisStatus::Pending),
            "processing" => Ok(AnalysisStatus::Processing),
            "completed" => Ok(AnalysisStatus::Completed),
            "failed" => Ok(AnalysisStatus::Failed),
            _ => Err(format!("Unknown analysis status: {}", s)),
        }
    }
}

impl std::fmt::Display for AnalysisStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Rejected lifecycle transition
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("Analysis is already {0} and can no longer change")]
    AlreadyTerminal(AnalysisStatus),

    #[error("Cannot move analysis from {from} to {to}")]
    NotAllowed {
        from: AnalysisStatus,
        to: AnalysisStatus,
    },
}

/// Message stored when a worker fails without saying why
pub const UNKNOWN_FAILURE: &str = "Analysis failed without an error message";

/// Lifecycle state of an analysis carrying result `P` once completed
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AnalysisState<P> {
    Pending,
    Processing,
    Completed { result: P },
    Failed { error: String },
}

impl<P> AnalysisState<P> {
    pub fn status(&self) -> AnalysisStatus {
        match self {
            AnalysisState::Pending => AnalysisStatus::Pending,
            AnalysisState::Processing => AnalysisStatus::Processing,
            AnalysisState::Completed { .. } => AnalysisStatus::Completed,
            AnalysisState::Failed { .. } => AnalysisStatus::Failed,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status().is_terminal()
    }

    pub fn result(&self) -> Option<&P> {
        match self {
            AnalysisState::Completed { result } => Some(result),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            AnalysisState::Failed { error } => Some(error),
            _ => None,
        }
    }

    fn check(&self, to: AnalysisStatus) -> Result<(), TransitionError> {
        let from = self.status();
        if from.is_terminal() {
            return Err(TransitionError::AlreadyTerminal(from));
        }
        if !from.can_transition_to(to) {
            return Err(TransitionError::NotAllowed { from, to });
        }
        Ok(())
    }

    /// pending -> processing
    pub fn start(&mut self) -> Result<(), TransitionError> {
        self.check(AnalysisStatus::Processing)?;
        *self = AnalysisState::Processing;
        Ok(())
    }

    /// processing -> completed
    pub fn complete(&mut self, result: P) -> Result<(), TransitionError> {
        self.check(AnalysisStatus::Completed)?;
        *self = AnalysisState::Completed { result };
        Ok(())
    }

    /// pending | processing -> failed
    pub fn fail(&mut self, error: impl Into<String>) -> Result<(), TransitionError> {
        self.check(AnalysisStatus::Failed)?;
        let error = error.into();
        let error = if error.trim().is_empty() {
            UNKNOWN_FAILURE.to_string()
        } else {
            error
        };
        *self = AnalysisState::Failed { error };
        Ok(())
    }
}

/// A tracked analysis request
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnalysisRecord<P> {
    pub id: Uuid,
    pub farm_id: Uuid,
    pub user_id: Uuid,
    pub kind: AnalysisKind,
    pub created_at: DateTime<Utc>,
    /// Set only when the record reaches a terminal state
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub state: AnalysisState<P>,
}

impl<P> AnalysisRecord<P> {
    /// A freshly requested analysis
    pub fn pending(farm_id: Uuid, user_id: Uuid, kind: AnalysisKind) -> Self {
        Self {
            id: Uuid::new_v4(),
            farm_id,
            user_id,
            kind,
            created_at: Utc::now(),
            completed_at: None,
            state: AnalysisState::Pending,
        }
    }

    pub fn status(&self) -> AnalysisStatus {
        self.state.status()
    }

    pub fn mark_processing(&mut self) -> Result<(), TransitionError> {
        self.state.start()
    }

    pub fn complete(&mut self, result: P, at: DateTime<Utc>) -> Result<(), TransitionError> {
        self.state.complete(result)?;
        self.completed_at = Some(at);
        Ok(())
    }

    pub fn fail(&mut self, error: impl Into<String>, at: DateTime<Utc>) -> Result<(), TransitionError> {
        self.state.fail(error)?;
        self.completed_at = Some(at);
        Ok(())
    }
}

/// Payload-free view of an analysis used in history listings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnalysisSummary {
    pub id: Uuid,
    pub farm_id: Uuid,
    pub kind: AnalysisKind,
    pub status: AnalysisStatus,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub error: Option<String>,
}

/// Number of analyses in each state
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct AnalysisQueueCounts {
    pub pending: i64,
    pub processing: i64,
    pub completed: i64,
    pub failed: i64,
    pub total: i64,
}
