//! Analysis client tests against a stub HTTP server
//!
//! The stub serves the analysis endpoints with scripted lifecycles so the
//! client's request, fetch and wait paths run over real HTTP.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use farm_analysis_backend::config::PollingConfig;
use farm_analysis_backend::error::{ErrorDetail, ErrorResponse};
use farm_analysis_backend::external::AnalysisClient;
use farm_analysis_backend::services::analysis::{AnalysisAccepted, RoiRequest};
use farm_analysis_backend::services::polling::PollError;
use farm_analysis_backend::AppError;
use shared::{
    build_soil_health_report, AnalysisKind, AnalysisRecord, AnalysisStatus, FarmGrid, GeoPoint,
    RoiReport, SoilHealthReport, SpectralIndices, ZoneReading,
};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

const TOKEN: &str = "test-token";
const ROI_FAILURE: &str = "Market data provider returned no prices";

#[derive(Clone)]
struct Stub {
    soil_id: Uuid,
    roi_id: Uuid,
    farm_id: Uuid,
    soil_calls: Arc<AtomicU32>,
    roi_calls: Arc<AtomicU32>,
}

fn report() -> SoilHealthReport {
    let grid = FarmGrid::new(GeoPoint::new(41.88, -87.63), 7.5).unwrap();
    let readings: Vec<ZoneReading> = grid
        .zones
        .iter()
        .map(|z| ZoneReading {
            row: z.row,
            col: z.col,
            indices: SpectralIndices {
                ndvi: 0.6,
                ndwi: 0.1,
                ndmi: 0.2,
                bsi: 0.05,
            },
            data_quality: 92.0,
        })
        .collect();
    build_soil_health_report(&grid, &readings).unwrap()
}

fn not_found() -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorResponse {
            error: ErrorDetail::new("NOT_FOUND", "Analysis not found"),
        }),
    )
        .into_response()
}

fn authorized(headers: &HeaderMap) -> bool {
    headers.get(AUTHORIZATION).and_then(|h| h.to_str().ok()) == Some("Bearer test-token")
}

async fn request_soil_health(State(stub): State<Stub>, headers: HeaderMap) -> Response {
    if !authorized(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    (
        StatusCode::ACCEPTED,
        Json(AnalysisAccepted {
            analysis_id: stub.soil_id,
            status: AnalysisStatus::Pending,
        }),
    )
        .into_response()
}

/// pending, processing, then completed on the third check
async fn get_soil_health(State(stub): State<Stub>, Path(id): Path<Uuid>) -> Response {
    if id != stub.soil_id {
        return not_found();
    }
    let n = stub.soil_calls.fetch_add(1, Ordering::SeqCst) + 1;

    let mut record =
        AnalysisRecord::<SoilHealthReport>::pending(stub.farm_id, Uuid::nil(), AnalysisKind::SoilHealth);
    record.id = id;
    if n >= 2 {
        record.mark_processing().unwrap();
    }
    if n >= 3 {
        record.complete(report(), Utc::now()).unwrap();
    }
    Json(record).into_response()
}

/// processing, then failed on the second check
async fn get_roi(State(stub): State<Stub>, Path(id): Path<Uuid>) -> Response {
    if id != stub.roi_id {
        return not_found();
    }
    let n = stub.roi_calls.fetch_add(1, Ordering::SeqCst) + 1;

    let mut record = AnalysisRecord::<RoiReport>::pending(stub.farm_id, Uuid::nil(), AnalysisKind::Roi);
    record.id = id;
    record.mark_processing().unwrap();
    if n >= 2 {
        record.fail(ROI_FAILURE, Utc::now()).unwrap();
    }
    Json(record).into_response()
}

async fn request_roi(State(stub): State<Stub>, Json(request): Json<RoiRequest>) -> Response {
    if request.farm_id != stub.farm_id {
        return (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: ErrorDetail::new("VALIDATION_ERROR", "Unknown farm"),
            }),
        )
            .into_response();
    }
    (
        StatusCode::ACCEPTED,
        Json(AnalysisAccepted {
            analysis_id: stub.roi_id,
            status: AnalysisStatus::Pending,
        }),
    )
        .into_response()
}

async fn spawn_stub() -> (AnalysisClient, Stub, String) {
    let stub = Stub {
        soil_id: Uuid::new_v4(),
        roi_id: Uuid::new_v4(),
        farm_id: Uuid::new_v4(),
        soil_calls: Arc::new(AtomicU32::new(0)),
        roi_calls: Arc::new(AtomicU32::new(0)),
    };

    let app = Router::new()
        .route("/api/v1/analysis/soil-health", post(request_soil_health))
        .route("/api/v1/analysis/soil-health/:id", get(get_soil_health))
        .route("/api/v1/analysis/roi", post(request_roi))
        .route("/api/v1/analysis/roi/:id", get(get_roi))
        .with_state(stub.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let base_url = format!("http://{}/api/v1", addr);
    let polling = PollingConfig {
        interval_ms: 10,
        max_attempts: 10,
    };
    let client = AnalysisClient::from_config(base_url.clone(), TOKEN, &polling);
    (client, stub, base_url)
}

#[tokio::test]
async fn test_request_then_wait_for_soil_health() {
    let (client, stub, _) = spawn_stub().await;

    let accepted = client.request_soil_health(stub.farm_id).await.unwrap();
    assert_eq!(accepted.status, AnalysisStatus::Pending);

    let report = client
        .wait_for_soil_health(accepted.analysis_id, &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(report.zones.len(), 9);
    assert_eq!(report.summary.total_zone_count, 9);
    assert_eq!(stub.soil_calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_failed_roi_message_is_verbatim() {
    let (client, stub, _) = spawn_stub().await;

    let accepted = client
        .request_roi(&RoiRequest {
            farm_id: stub.farm_id,
            soil_health_analysis_id: None,
            crops: None,
        })
        .await
        .unwrap();

    let result = client
        .wait_for_roi(accepted.analysis_id, &CancellationToken::new())
        .await;
    match result {
        Err(PollError::Failed(message)) => assert_eq!(message, ROI_FAILURE),
        other => panic!("expected failure, got {:?}", other.map(|r| r.recommended_crop)),
    }
    assert_eq!(stub.roi_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_unknown_analysis_is_not_found() {
    let (client, _stub, _) = spawn_stub().await;

    let result = client
        .wait_for_soil_health(Uuid::new_v4(), &CancellationToken::new())
        .await;
    assert!(matches!(result, Err(PollError::Fetch(AppError::NotFound(_)))));
}

#[tokio::test]
async fn test_validation_error_is_surfaced() {
    let (client, _stub, _) = spawn_stub().await;

    let result = client
        .request_roi(&RoiRequest {
            farm_id: Uuid::new_v4(),
            soil_health_analysis_id: None,
            crops: None,
        })
        .await;
    match result {
        Err(AppError::ValidationError(message)) => assert_eq!(message, "Unknown farm"),
        other => panic!("expected validation error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_missing_token_is_unauthorized() {
    let (_client, stub, base_url) = spawn_stub().await;
    let anonymous = AnalysisClient::new(base_url, "");

    let result = anonymous.request_soil_health(stub.farm_id).await;
    assert!(matches!(result, Err(AppError::Unauthorized(_))));
}
