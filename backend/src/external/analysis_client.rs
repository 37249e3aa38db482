//! HTTP client for the analysis API
//!
//! Requests an analysis, then polls its status endpoint until a terminal
//! state. Used by other services and tooling that talk to a running server.

use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use shared::{AnalysisRecord, RoiReport, SoilHealthReport};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::config::PollingConfig;
use crate::error::{AppError, AppResult, ErrorResponse};
use crate::services::analysis::{AnalysisAccepted, RoiRequest, SoilHealthRequest};
use crate::services::polling::{poll_until_terminal, PollError, PollPolicy};

/// Analysis API client
#[derive(Clone)]
pub struct AnalysisClient {
    client: Client,
    base_url: String,
    token: String,
    policy: PollPolicy,
}

impl AnalysisClient {
    /// Create a new AnalysisClient for `base_url` (e.g. `http://host:3000/api/v1`)
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
            policy: PollPolicy::default(),
        }
    }

    /// Client whose `wait_for_*` methods follow the `polling` config section
    pub fn from_config(
        base_url: impl Into<String>,
        token: impl Into<String>,
        polling: &PollingConfig,
    ) -> Self {
        Self::new(base_url, token).with_policy(PollPolicy::from(polling))
    }

    /// Override the polling policy used by the `wait_for_*` methods
    pub fn with_policy(mut self, policy: PollPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> PollPolicy {
        self.policy
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn read_response<T: DeserializeOwned>(response: reqwest::Response) -> AppResult<T> {
        let status = response.status();
        if status.is_success() {
            return response
                .json()
                .await
                .map_err(|e| AppError::ExternalService(format!("Unreadable analysis response: {}", e)));
        }

        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorResponse>(&body)
            .map(|e| e.error.message)
            .unwrap_or(body);

        Err(match status {
            StatusCode::NOT_FOUND => AppError::NotFound("Analysis".to_string()),
            StatusCode::UNAUTHORIZED => AppError::Unauthorized(message),
            StatusCode::BAD_REQUEST => AppError::ValidationError(message),
            _ => AppError::ExternalService(format!("Analysis API error: {} - {}", status, message)),
        })
    }

    async fn post<B: Serialize>(&self, path: &str, body: &B) -> AppResult<AnalysisAccepted> {
        let response = self
            .client
            .post(self.url(path))
            .bearer_auth(&self.token)
            .json(body)
            .send()
            .await?;
        Self::read_response(response).await
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> AppResult<T> {
        let response = self
            .client
            .get(self.url(path))
            .bearer_auth(&self.token)
            .send()
            .await?;
        Self::read_response(response).await
    }

    /// Request a soil health analysis for a farm
    pub async fn request_soil_health(&self, farm_id: Uuid) -> AppResult<AnalysisAccepted> {
        self.post("/analysis/soil-health", &SoilHealthRequest { farm_id })
            .await
    }

    /// Request an ROI analysis
    pub async fn request_roi(&self, request: &RoiRequest) -> AppResult<AnalysisAccepted> {
        self.post("/analysis/roi", request).await
    }

    pub async fn get_soil_health(
        &self,
        analysis_id: Uuid,
    ) -> AppResult<AnalysisRecord<SoilHealthReport>> {
        self.get(&format!("/analysis/soil-health/{}", analysis_id))
            .await
    }

    pub async fn get_roi(&self, analysis_id: Uuid) -> AppResult<AnalysisRecord<RoiReport>> {
        self.get(&format!("/analysis/roi/{}", analysis_id)).await
    }

    /// Poll a soil health analysis until it completes or fails
    pub async fn wait_for_soil_health(
        &self,
        analysis_id: Uuid,
        cancel: &CancellationToken,
    ) -> Result<SoilHealthReport, PollError> {
        poll_until_terminal(self.policy, cancel, || self.get_soil_health(analysis_id)).await
    }

    /// Poll an ROI analysis until it completes or fails
    pub async fn wait_for_roi(
        &self,
        analysis_id: Uuid,
        cancel: &CancellationToken,
    ) -> Result<RoiReport, PollError> {
        poll_until_terminal(self.policy, cancel, || self.get_roi(analysis_id)).await
    }
}
