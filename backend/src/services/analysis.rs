//! Analysis lifecycle service
//!
//! Requests are stored as `pending` and picked up by the worker. Every state
//! change goes through the typed lifecycle in `shared` while the row is
//! locked, so a concurrent writer cannot overwrite a terminal record.
//!
//! A claim is a lease: a job left in `processing` longer than the lease by a
//! crashed worker is taken over, and failed once it has been claimed too often.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use shared::{
    AnalysisKind, AnalysisQueueCounts, AnalysisRecord, AnalysisState, AnalysisStatus,
    AnalysisSummary, CropMarketInput, PaginatedResponse, Pagination, PaginationMeta,
    SoilHealthReport,
};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::config::WorkerConfig;
use crate::error::{AppError, AppResult};
use crate::services::farm::FarmService;

/// Analysis service for requesting and tracking analyses
#[derive(Clone)]
pub struct AnalysisService {
    db: PgPool,
}

/// Body of a soil health request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SoilHealthRequest {
    pub farm_id: Uuid,
}

/// Body of an ROI request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoiRequest {
    pub farm_id: Uuid,
    /// Soil health analysis to base the recommendation on; latest completed if absent
    #[serde(default)]
    pub soil_health_analysis_id: Option<Uuid>,
    /// Market inputs per crop; regional defaults if absent
    #[serde(default)]
    pub crops: Option<Vec<CropMarketInput>>,
}

/// Parameters stored with an ROI job
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RoiParams {
    pub soil_health_analysis_id: Option<Uuid>,
    pub crops: Option<Vec<CropMarketInput>>,
}

/// Returned when a request is accepted
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnalysisAccepted {
    pub analysis_id: Uuid,
    pub status: AnalysisStatus,
}

/// A job claimed by the worker
#[derive(Debug, Clone)]
pub struct ClaimedJob {
    pub id: Uuid,
    pub farm_id: Uuid,
    pub kind: AnalysisKind,
    pub params: serde_json::Value,
    /// Taken over from a worker whose lease ran out
    pub reclaimed: bool,
}

/// Lease rules for claiming queued analyses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClaimPolicy {
    pub lease: Duration,
    pub max_claims: u32,
}

impl Default for ClaimPolicy {
    fn default() -> Self {
        Self::from(&WorkerConfig::default())
    }
}

impl From<&WorkerConfig> for ClaimPolicy {
    fn from(config: &WorkerConfig) -> Self {
        Self {
            lease: config.lease(),
            max_claims: config.max_claims,
        }
    }
}

/// What the worker does with a queue row it has locked
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClaimDecision {
    /// Pending: move it to processing
    Start,
    /// Processing past its lease: take it over
    Reclaim,
    /// Processing past its lease with no claims left: fail it
    Abandon,
    /// Held by a live worker, or already terminal
    Skip,
}

impl ClaimPolicy {
    /// Processing jobs started before this instant have lost their lease.
    /// A lease too long to represent reaches back to the epoch.
    pub fn stale_before(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        chrono::Duration::from_std(self.lease)
            .ok()
            .and_then(|lease| now.checked_sub_signed(lease))
            .map(|at| at.max(DateTime::<Utc>::default()))
            .unwrap_or_default()
    }

    pub fn decide(
        &self,
        status: AnalysisStatus,
        started_at: Option<DateTime<Utc>>,
        claims: u32,
        now: DateTime<Utc>,
    ) -> ClaimDecision {
        match status {
            AnalysisStatus::Pending => ClaimDecision::Start,
            AnalysisStatus::Processing => {
                let stale = started_at.map_or(true, |at| at < self.stale_before(now));
                if !stale {
                    ClaimDecision::Skip
                } else if claims >= self.max_claims {
                    ClaimDecision::Abandon
                } else {
                    ClaimDecision::Reclaim
                }
            }
            AnalysisStatus::Completed | AnalysisStatus::Failed => ClaimDecision::Skip,
        }
    }
}

/// Database row for an analysis
#[derive(Debug, Clone, sqlx::FromRow)]
pub(crate) struct AnalysisRow {
    pub id: Uuid,
    pub farm_id: Uuid,
    pub user_id: Uuid,
    pub kind: String,
    pub status: String,
    pub result: Option<serde_json::Value>,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub claims: i32,
    pub completed_at: Option<DateTime<Utc>>,
}

impl AnalysisRow {
    fn kind(&self) -> AppResult<AnalysisKind> {
        self.kind.parse().map_err(AppError::Internal)
    }

    fn status(&self) -> AppResult<AnalysisStatus> {
        self.status.parse().map_err(AppError::Internal)
    }

    /// Rebuild the typed record. A completed row without a result or a failed
    /// row without an error is corrupt.
    pub(crate) fn into_record<P: DeserializeOwned>(self) -> AppResult<AnalysisRecord<P>> {
        let state = match self.status()? {
            AnalysisStatus::Pending => AnalysisState::Pending,
            AnalysisStatus::Processing => AnalysisState::Processing,
            AnalysisStatus::Completed => {
                let value = self.result.clone().ok_or_else(|| {
                    AppError::Internal(format!("Analysis {} completed without a result", self.id))
                })?;
                let result = serde_json::from_value(value).map_err(|e| {
                    AppError::Internal(format!("Analysis {} has an unreadable result: {}", self.id, e))
                })?;
                AnalysisState::Completed { result }
            }
            AnalysisStatus::Failed => AnalysisState::Failed {
                error: self.error.clone().ok_or_else(|| {
                    AppError::Internal(format!("Analysis {} failed without an error", self.id))
                })?,
            },
        };

        Ok(AnalysisRecord {
            id: self.id,
            farm_id: self.farm_id,
            user_id: self.user_id,
            kind: self.kind()?,
            created_at: self.created_at,
            completed_at: self.completed_at,
            state,
        })
    }

    fn into_summary(self) -> AppResult<AnalysisSummary> {
        Ok(AnalysisSummary {
            id: self.id,
            farm_id: self.farm_id,
            kind: self.kind()?,
            status: self.status()?,
            created_at: self.created_at,
            completed_at: self.completed_at,
            error: self.error,
        })
    }
}

const ANALYSIS_COLUMNS: &str =
    "id, farm_id, user_id, kind, status, result, error, created_at, started_at, claims, completed_at";

/// An ROI request may only build on a completed soil health analysis of the same farm
fn check_soil_link(linked: &AnalysisRow, farm_id: Uuid) -> AppResult<()> {
    if linked.farm_id != farm_id || linked.kind()? != AnalysisKind::SoilHealth {
        return Err(AppError::validation(
            "soil_health_analysis_id",
            "Linked analysis must be a soil health analysis of the same farm",
        ));
    }
    if linked.status()? != AnalysisStatus::Completed {
        return Err(AppError::validation(
            "soil_health_analysis_id",
            "Linked soil health analysis has not completed",
        ));
    }
    Ok(())
}

impl AnalysisService {
    /// Create a new AnalysisService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Store a pending analysis for a farm the user owns
    pub async fn request_analysis(
        &self,
        user_id: Uuid,
        farm_id: Uuid,
        kind: AnalysisKind,
        params: serde_json::Value,
    ) -> AppResult<AnalysisAccepted> {
        FarmService::new(self.db.clone())
            .get_farm(user_id, farm_id)
            .await?;

        let record = AnalysisRecord::<serde_json::Value>::pending(farm_id, user_id, kind);

        sqlx::query(
            r#"
            INSERT INTO analyses (id, farm_id, user_id, kind, status, params, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(record.id)
        .bind(record.farm_id)
        .bind(record.user_id)
        .bind(record.kind.as_str())
        .bind(record.status().as_str())
        .bind(&params)
        .bind(record.created_at)
        .execute(&self.db)
        .await?;

        tracing::info!(analysis_id = %record.id, %farm_id, kind = %kind, "analysis requested");

        Ok(AnalysisAccepted {
            analysis_id: record.id,
            status: record.status(),
        })
    }

    /// Request a soil health analysis
    pub async fn request_soil_health(
        &self,
        user_id: Uuid,
        request: SoilHealthRequest,
    ) -> AppResult<AnalysisAccepted> {
        self.request_analysis(
            user_id,
            request.farm_id,
            AnalysisKind::SoilHealth,
            serde_json::Value::Null,
        )
        .await
    }

    /// Request an ROI analysis
    pub async fn request_roi(&self, user_id: Uuid, request: RoiRequest) -> AppResult<AnalysisAccepted> {
        if let Some(id) = request.soil_health_analysis_id {
            let linked = self.find_row(user_id, id).await?;
            check_soil_link(&linked, request.farm_id)?;
        }

        let params = RoiParams {
            soil_health_analysis_id: request.soil_health_analysis_id,
            crops: request.crops,
        };
        let params = serde_json::to_value(params).map_err(|e| AppError::Internal(e.to_string()))?;

        self.request_analysis(user_id, request.farm_id, AnalysisKind::Roi, params)
            .await
    }

    async fn find_row(&self, user_id: Uuid, analysis_id: Uuid) -> AppResult<AnalysisRow> {
        sqlx::query_as::<_, AnalysisRow>(&format!(
            "SELECT {} FROM analyses WHERE id = $1 AND user_id = $2",
            ANALYSIS_COLUMNS
        ))
        .bind(analysis_id)
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Analysis".to_string()))
    }

    /// Get an analysis of the expected kind; other users' analyses are not found
    pub async fn get_analysis<P: DeserializeOwned>(
        &self,
        user_id: Uuid,
        analysis_id: Uuid,
        kind: AnalysisKind,
    ) -> AppResult<AnalysisRecord<P>> {
        let row = self.find_row(user_id, analysis_id).await?;
        if row.kind()? != kind {
            return Err(AppError::NotFound("Analysis".to_string()));
        }
        row.into_record()
    }

    /// Analyses of a farm, newest first
    pub async fn list_farm_analyses(
        &self,
        user_id: Uuid,
        farm_id: Uuid,
        pagination: &Pagination,
    ) -> AppResult<PaginatedResponse<AnalysisSummary>> {
        FarmService::new(self.db.clone())
            .get_farm(user_id, farm_id)
            .await?;

        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM analyses WHERE farm_id = $1")
            .bind(farm_id)
            .fetch_one(&self.db)
            .await?;

        let rows = sqlx::query_as::<_, AnalysisRow>(&format!(
            "SELECT {} FROM analyses WHERE farm_id = $1 ORDER BY created_at DESC LIMIT $2 OFFSET $3",
            ANALYSIS_COLUMNS
        ))
        .bind(farm_id)
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&self.db)
        .await?;

        let data = rows
            .into_iter()
            .map(AnalysisRow::into_summary)
            .collect::<AppResult<Vec<_>>>()?;

        Ok(PaginatedResponse {
            data,
            pagination: PaginationMeta::new(pagination, total.max(0) as u64),
        })
    }

    /// Number of the user's analyses in each state
    pub async fn queue_counts(&self, user_id: Uuid) -> AppResult<AnalysisQueueCounts> {
        let rows: Vec<(String, i64)> = sqlx::query_as(
            "SELECT status, COUNT(*) FROM analyses WHERE user_id = $1 GROUP BY status",
        )
        .bind(user_id)
        .fetch_all(&self.db)
        .await?;

        let mut counts = AnalysisQueueCounts::default();
        for (status, count) in rows {
            match status.parse::<AnalysisStatus>().map_err(AppError::Internal)? {
                AnalysisStatus::Pending => counts.pending = count,
                AnalysisStatus::Processing => counts.processing = count,
                AnalysisStatus::Completed => counts.completed = count,
                AnalysisStatus::Failed => counts.failed = count,
            }
            counts.total += count;
        }
        Ok(counts)
    }

    /// Most recent completed soil health report for a farm
    pub async fn latest_soil_health(
        &self,
        farm_id: Uuid,
    ) -> AppResult<Option<AnalysisRecord<SoilHealthReport>>> {
        let row = sqlx::query_as::<_, AnalysisRow>(&format!(
            r#"
            SELECT {} FROM analyses
            WHERE farm_id = $1 AND kind = $2 AND status = $3
            ORDER BY completed_at DESC
            LIMIT 1
            "#,
            ANALYSIS_COLUMNS
        ))
        .bind(farm_id)
        .bind(AnalysisKind::SoilHealth.as_str())
        .bind(AnalysisStatus::Completed.as_str())
        .fetch_optional(&self.db)
        .await?;

        row.map(AnalysisRow::into_record).transpose()
    }

    /// A specific completed soil health report, for ROI jobs
    pub async fn soil_health_by_id(
        &self,
        analysis_id: Uuid,
    ) -> AppResult<AnalysisRecord<SoilHealthReport>> {
        let row = sqlx::query_as::<_, AnalysisRow>(&format!(
            "SELECT {} FROM analyses WHERE id = $1 AND kind = $2",
            ANALYSIS_COLUMNS
        ))
        .bind(analysis_id)
        .bind(AnalysisKind::SoilHealth.as_str())
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Soil health analysis".to_string()))?;

        row.into_record()
    }

    // ========================================================================
    // Worker-side transitions
    // ========================================================================

    /// Lock a row and rebuild its lifecycle state for a transition
    async fn lock_for_transition(
        tx: &mut Transaction<'_, Postgres>,
        analysis_id: Uuid,
    ) -> AppResult<AnalysisRecord<serde_json::Value>> {
        let row = sqlx::query_as::<_, AnalysisRow>(&format!(
            "SELECT {} FROM analyses WHERE id = $1 FOR UPDATE",
            ANALYSIS_COLUMNS
        ))
        .bind(analysis_id)
        .fetch_optional(&mut **tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Analysis".to_string()))?;

        row.into_record()
    }

    /// Claim the oldest pending job and mark it processing, or take over a
    /// processing job whose lease has run out.
    ///
    /// `SKIP LOCKED` lets several workers share the queue without ever
    /// claiming the same job. Jobs out of claims are failed on the way.
    pub async fn claim_next(&self, policy: &ClaimPolicy) -> AppResult<Option<ClaimedJob>> {
        loop {
            let now = Utc::now();
            let mut tx = self.db.begin().await?;

            let row = sqlx::query_as::<_, AnalysisRow>(&format!(
                r#"
                SELECT {} FROM analyses
                WHERE status = $1
                   OR (status = $2 AND (started_at IS NULL OR started_at < $3))
                ORDER BY CASE WHEN status = $1 THEN 0 ELSE 1 END, created_at
                LIMIT 1
                FOR UPDATE SKIP LOCKED
                "#,
                ANALYSIS_COLUMNS
            ))
            .bind(AnalysisStatus::Pending.as_str())
            .bind(AnalysisStatus::Processing.as_str())
            .bind(policy.stale_before(now))
            .fetch_optional(&mut *tx)
            .await?;

            let Some(row) = row else {
                return Ok(None);
            };

            let claims = u32::try_from(row.claims).unwrap_or(0);
            let decision = policy.decide(row.status()?, row.started_at, claims, now);
            let mut record = row.into_record::<serde_json::Value>()?;

            match decision {
                ClaimDecision::Start => record.mark_processing()?,
                ClaimDecision::Reclaim => {
                    tracing::warn!(analysis_id = %record.id, claims, "reclaiming analysis after lease expired");
                }
                ClaimDecision::Abandon => {
                    record.fail(format!("Analysis abandoned after {} attempts", claims), now)?;
                    Self::write_failure(&mut tx, &record).await?;
                    tx.commit().await?;
                    tracing::warn!(analysis_id = %record.id, claims, "analysis abandoned");
                    continue;
                }
                ClaimDecision::Skip => return Ok(None),
            }

            let params: Option<serde_json::Value> = sqlx::query_scalar(
                r#"
                UPDATE analyses SET status = $2, started_at = NOW(), claims = claims + 1
                WHERE id = $1
                RETURNING params
                "#,
            )
            .bind(record.id)
            .bind(record.status().as_str())
            .fetch_one(&mut *tx)
            .await?;
            tx.commit().await?;

            tracing::info!(analysis_id = %record.id, kind = %record.kind, "analysis processing");
            return Ok(Some(ClaimedJob {
                id: record.id,
                farm_id: record.farm_id,
                kind: record.kind,
                params: params.unwrap_or(serde_json::Value::Null),
                reclaimed: decision == ClaimDecision::Reclaim,
            }));
        }
    }

    /// Store the result of a processing analysis
    pub async fn complete<P: Serialize>(&self, analysis_id: Uuid, result: &P) -> AppResult<()> {
        let value = serde_json::to_value(result).map_err(|e| AppError::Internal(e.to_string()))?;

        let mut tx = self.db.begin().await?;
        let mut record = Self::lock_for_transition(&mut tx, analysis_id).await?;
        record.complete(value.clone(), Utc::now())?;

        sqlx::query(
            "UPDATE analyses SET status = $2, result = $3, error = NULL, completed_at = $4 WHERE id = $1",
        )
        .bind(analysis_id)
        .bind(record.status().as_str())
        .bind(&value)
        .bind(record.completed_at)
        .execute(&mut *tx)
        .await?;

        if record.kind == AnalysisKind::SoilHealth {
            let report: SoilHealthReport = serde_json::from_value(value)
                .map_err(|e| AppError::Internal(e.to_string()))?;
            Self::store_zones(&mut tx, analysis_id, &report).await?;
        }

        tx.commit().await?;

        tracing::info!(%analysis_id, kind = %record.kind, "analysis completed");
        Ok(())
    }

    /// Record that a pending or processing analysis failed
    pub async fn fail(&self, analysis_id: Uuid, error: &str) -> AppResult<()> {
        let mut tx = self.db.begin().await?;
        let mut record = Self::lock_for_transition(&mut tx, analysis_id).await?;
        record.fail(error, Utc::now())?;
        Self::write_failure(&mut tx, &record).await?;
        tx.commit().await?;

        tracing::warn!(%analysis_id, error = record.state.error().unwrap_or_default(), "analysis failed");
        Ok(())
    }

    async fn write_failure(
        tx: &mut Transaction<'_, Postgres>,
        record: &AnalysisRecord<serde_json::Value>,
    ) -> AppResult<()> {
        sqlx::query(
            "UPDATE analyses SET status = $2, error = $3, completed_at = $4 WHERE id = $1",
        )
        .bind(record.id)
        .bind(record.status().as_str())
        .bind(record.state.error())
        .bind(record.completed_at)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    async fn store_zones(
        tx: &mut Transaction<'_, Postgres>,
        analysis_id: Uuid,
        report: &SoilHealthReport,
    ) -> AppResult<()> {
        for zone in &report.zones {
            sqlx::query(
                r#"
                INSERT INTO analysis_zones
                    (analysis_id, zone_id, row_index, col_index, health_score, status,
                     ndvi, ndwi, ndmi, bsi, moisture)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
                "#,
            )
            .bind(analysis_id)
            .bind(&zone.zone_id)
            .bind(zone.row as i32)
            .bind(zone.col as i32)
            .bind(zone.health_score)
            .bind(zone.status.as_str())
            .bind(zone.indices.ndvi)
            .bind(zone.indices.ndwi)
            .bind(zone.indices.ndmi)
            .bind(zone.indices.bsi)
            .bind(zone.moisture)
            .execute(&mut **tx)
            .await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(status: &str) -> AnalysisRow {
        AnalysisRow {
            id: Uuid::new_v4(),
            farm_id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            kind: "roi".to_string(),
            status: status.to_string(),
            result: None,
            error: None,
            created_at: Utc::now(),
            started_at: None,
            claims: 0,
            completed_at: None,
        }
    }

    #[test]
    fn test_pending_row_to_record() {
        let record: AnalysisRecord<serde_json::Value> = row("pending").into_record().unwrap();
        assert_eq!(record.status(), AnalysisStatus::Pending);
        assert_eq!(record.kind, AnalysisKind::Roi);
    }

    #[test]
    fn test_completed_row_needs_result() {
        let missing = row("completed").into_record::<u32>();
        assert!(matches!(missing, Err(AppError::Internal(_))));

        let mut ok = row("completed");
        ok.result = Some(serde_json::json!(12));
        ok.completed_at = Some(Utc::now());
        let record = ok.into_record::<u32>().unwrap();
        assert_eq!(record.state.result(), Some(&12));
    }

    #[test]
    fn test_failed_row_keeps_error_verbatim() {
        let mut failed = row("failed");
        failed.error = Some("Satellite imagery unavailable".to_string());
        let record = failed.into_record::<u32>().unwrap();
        assert_eq!(record.state.error(), Some("Satellite imagery unavailable"));

        assert!(row("failed").into_record::<u32>().is_err());
    }

    #[test]
    fn test_unknown_status_is_internal_error() {
        assert!(row("queued").into_record::<u32>().is_err());
    }

    #[test]
    fn test_roi_request_defaults() {
        let request: RoiRequest =
            serde_json::from_value(serde_json::json!({ "farm_id": Uuid::nil() })).unwrap();
        assert!(request.crops.is_none());
        assert!(request.soil_health_analysis_id.is_none());
    }

    #[test]
    fn test_soil_link_must_be_completed_soil_analysis() {
        let mut linked = row("completed");
        linked.kind = "soil_health".to_string();
        let farm_id = linked.farm_id;
        assert!(check_soil_link(&linked, farm_id).is_ok());
        assert!(check_soil_link(&linked, Uuid::new_v4()).is_err());

        for status in ["pending", "processing", "failed"] {
            let mut unfinished = row(status);
            unfinished.kind = "soil_health".to_string();
            let farm_id = unfinished.farm_id;
            assert!(matches!(
                check_soil_link(&unfinished, farm_id),
                Err(AppError::Validation { .. })
            ));
        }

        let roi = row("completed");
        let farm_id = roi.farm_id;
        assert!(check_soil_link(&roi, farm_id).is_err());
    }

    fn policy() -> ClaimPolicy {
        ClaimPolicy {
            lease: Duration::from_secs(300),
            max_claims: 3,
        }
    }

    #[test]
    fn test_pending_jobs_are_started() {
        let now = Utc::now();
        assert_eq!(
            policy().decide(AnalysisStatus::Pending, None, 0, now),
            ClaimDecision::Start
        );
    }

    #[test]
    fn test_processing_job_within_lease_is_left_alone() {
        let now = Utc::now();
        let started = now - chrono::Duration::seconds(60);
        assert_eq!(
            policy().decide(AnalysisStatus::Processing, Some(started), 1, now),
            ClaimDecision::Skip
        );
    }

    #[test]
    fn test_stale_processing_job_is_reclaimed_then_abandoned() {
        let now = Utc::now();
        let started = now - chrono::Duration::seconds(301);
        assert_eq!(
            policy().decide(AnalysisStatus::Processing, Some(started), 1, now),
            ClaimDecision::Reclaim
        );
        assert_eq!(
            policy().decide(AnalysisStatus::Processing, Some(started), 3, now),
            ClaimDecision::Abandon
        );
        // No start time recorded counts as stale
        assert_eq!(
            policy().decide(AnalysisStatus::Processing, None, 1, now),
            ClaimDecision::Reclaim
        );
    }

    #[test]
    fn test_terminal_jobs_are_never_claimed() {
        let now = Utc::now();
        let long_ago = now - chrono::Duration::days(1);
        for status in [AnalysisStatus::Completed, AnalysisStatus::Failed] {
            assert_eq!(
                policy().decide(status, Some(long_ago), 0, now),
                ClaimDecision::Skip
            );
        }
    }

    #[test]
    fn test_huge_lease_does_not_overflow() {
        let policy = ClaimPolicy {
            lease: Duration::from_secs(u64::MAX),
            max_claims: 1,
        };
        assert_eq!(policy.stale_before(Utc::now()), DateTime::<Utc>::default());
    }
}
