//! Background analysis worker
//!
//! Claims pending analyses one at a time, computes them, and records the
//! outcome. A job whose outcome could not be recorded stays `processing` until
//! its lease runs out and another claim picks it up. Spectral data comes from a `SpectralSource`; the bundled
//! `DemoSpectralSource` produces deterministic readings per farm.

use std::str::FromStr;
use std::time::Duration;

use rust_decimal::Decimal;
use shared::{
    build_roi_report, build_soil_health_report, AnalysisKind, AnalysisRecord, CropMarketInput,
    CropType, Farm, FarmGrid, RoiReport, SoilHealthReport, SpectralIndices, ZoneReading,
};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::config::WorkerConfig;
use crate::error::{AppError, AppResult};
use crate::services::analysis::{AnalysisService, ClaimPolicy, ClaimedJob, RoiParams};
use crate::services::farm::FarmService;

/// Provider of per-zone spectral readings
#[axum::async_trait]
pub trait SpectralSource: Send + Sync {
    /// One reading per zone of `grid`
    async fn zone_readings(&self, farm: &Farm, grid: &FarmGrid) -> AppResult<Vec<ZoneReading>>;
}

/// Deterministic readings derived from the farm id and zone position
#[derive(Debug, Clone, Copy, Default)]
pub struct DemoSpectralSource;

/// splitmix64
fn mix(mut x: u64) -> u64 {
    x = x.wrapping_add(0x9E37_79B9_7F4A_7C15);
    x = (x ^ (x >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    x = (x ^ (x >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    x ^ (x >> 31)
}

/// Uniform value in [low, high] from a seed
fn sample(seed: u64, low: f64, high: f64) -> f64 {
    let unit = (mix(seed) >> 11) as f64 / (1u64 << 53) as f64;
    low + unit * (high - low)
}

fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

impl DemoSpectralSource {
    pub fn reading(farm_seed: u64, row: u32, col: u32) -> ZoneReading {
        let seed = farm_seed ^ (u64::from(row) << 32 | u64::from(col));
        ZoneReading {
            row,
            col,
            indices: SpectralIndices {
                ndvi: round3(sample(seed, 0.15, 0.8)),
                ndwi: round3(sample(seed.wrapping_add(1), -0.2, 0.3)),
                ndmi: round3(sample(seed.wrapping_add(2), -0.1, 0.4)),
                bsi: round3(sample(seed.wrapping_add(3), -0.2, 0.3)),
            },
            data_quality: (sample(seed.wrapping_add(4), 70.0, 98.0) * 10.0).round() / 10.0,
        }
    }
}

#[axum::async_trait]
impl SpectralSource for DemoSpectralSource {
    async fn zone_readings(&self, farm: &Farm, grid: &FarmGrid) -> AppResult<Vec<ZoneReading>> {
        let uuid = farm.id.as_u128();
        let farm_seed = (uuid >> 64) as u64 ^ uuid as u64;
        Ok(grid
            .zones
            .iter()
            .map(|z| Self::reading(farm_seed, z.row, z.col))
            .collect())
    }
}

/// Regional market defaults used when an ROI request brings no crop inputs
pub fn default_market_inputs() -> Vec<CropMarketInput> {
    let dec = |s: &str| Decimal::from_str(s).unwrap_or_default();
    vec![
        CropMarketInput {
            crop_type: CropType::Corn,
            expected_yield: dec("10.5"),
            price_per_unit: dec("180"),
            input_costs: dec("1150"),
        },
        CropMarketInput {
            crop_type: CropType::Soybeans,
            expected_yield: dec("3.4"),
            price_per_unit: dec("430"),
            input_costs: dec("650"),
        },
        CropMarketInput {
            crop_type: CropType::Wheat,
            expected_yield: dec("6.2"),
            price_per_unit: dec("210"),
            input_costs: dec("780"),
        },
        CropMarketInput {
            crop_type: CropType::Rice,
            expected_yield: dec("7.0"),
            price_per_unit: dec("260"),
            input_costs: dec("1300"),
        },
    ]
}

/// Soil analysis id and score an ROI report builds on; an analysis without a
/// result contributes neither
fn soil_link(soil: Option<&AnalysisRecord<SoilHealthReport>>) -> (Option<Uuid>, Option<f64>) {
    match soil.and_then(|record| record.state.result().map(|r| (record.id, r))) {
        Some((id, report)) => (Some(id), Some(report.summary.overall_health)),
        None => (None, None),
    }
}

/// Worker that drains the analysis queue
pub struct AnalysisWorker<S> {
    analyses: AnalysisService,
    farms: FarmService,
    source: S,
    idle_interval: Duration,
    claims: ClaimPolicy,
}

impl<S: SpectralSource> AnalysisWorker<S> {
    pub fn new(db: sqlx::PgPool, source: S, config: &WorkerConfig) -> Self {
        Self {
            analyses: AnalysisService::new(db.clone()),
            farms: FarmService::new(db),
            source,
            idle_interval: config.idle_interval(),
            claims: ClaimPolicy::from(config),
        }
    }

    /// Process jobs until `cancel` fires
    pub async fn run(self, cancel: CancellationToken) {
        tracing::info!("analysis worker started");

        while !cancel.is_cancelled() {
            let idle = match self.process_next().await {
                Ok(processed) => !processed,
                Err(e) => {
                    tracing::error!(error = %e, "analysis worker error");
                    true
                }
            };

            if idle {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = tokio::time::sleep(self.idle_interval) => {}
                }
            }
        }

        tracing::info!("analysis worker stopped");
    }

    /// Claim and process one job. Returns false when the queue was empty.
    pub async fn process_next(&self) -> AppResult<bool> {
        let Some(job) = self.analyses.claim_next(&self.claims).await? else {
            return Ok(false);
        };

        let outcome = match job.kind {
            AnalysisKind::SoilHealth => match self.soil_health(&job).await {
                Ok(report) => self.analyses.complete(job.id, &report).await,
                Err(e) => Err(e),
            },
            AnalysisKind::Roi => match self.roi(&job).await {
                Ok(report) => self.analyses.complete(job.id, &report).await,
                Err(e) => Err(e),
            },
        };

        if let Err(e) = outcome {
            self.analyses.fail(job.id, &e.to_string()).await?;
        }
        Ok(true)
    }

    async fn soil_health(&self, job: &ClaimedJob) -> AppResult<SoilHealthReport> {
        let farm = self.farms.get_farm_unchecked(job.farm_id).await?;
        let grid = FarmGrid::new(farm.location, farm.area_hectares)?;
        let readings = self.source.zone_readings(&farm, &grid).await?;
        tracing::debug!(analysis_id = %job.id, zones = readings.len(), "zone readings fetched");

        Ok(build_soil_health_report(&grid, &readings)?)
    }

    async fn roi(&self, job: &ClaimedJob) -> AppResult<RoiReport> {
        let farm = self.farms.get_farm_unchecked(job.farm_id).await?;
        let params: RoiParams = if job.params.is_null() {
            RoiParams::default()
        } else {
            serde_json::from_value(job.params.clone())
                .map_err(|e| AppError::Internal(format!("Invalid ROI parameters: {}", e)))?
        };

        let soil = match params.soil_health_analysis_id {
            Some(id) => Some(self.analyses.soil_health_by_id(id).await?),
            None => self.analyses.latest_soil_health(farm.id).await?,
        };
        let (soil_id, soil_score) = soil_link(soil.as_ref());

        let area = Decimal::from_f64_retain(farm.area_hectares)
            .map(|a| a.round_dp(4))
            .ok_or_else(|| AppError::validation("area_hectares", "Area is not representable"))?;
        let crops = params.crops.unwrap_or_else(default_market_inputs);

        build_roi_report(area, soil_id, soil_score, &crops)
            .map_err(|m| AppError::validation("crops", m))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::GeoPoint;

    #[test]
    fn test_demo_readings_are_deterministic_and_valid() {
        for (row, col) in [(0, 0), (2, 3), (4, 4)] {
            let a = DemoSpectralSource::reading(42, row, col);
            let b = DemoSpectralSource::reading(42, row, col);
            assert_eq!(a, b);
            assert_eq!((a.row, a.col), (row, col));
            assert!(a.validate().is_ok());
        }
        assert_ne!(
            DemoSpectralSource::reading(42, 0, 0),
            DemoSpectralSource::reading(42, 0, 1)
        );
    }

    #[tokio::test]
    async fn test_demo_source_covers_every_zone() {
        let farm = Farm {
            id: uuid::Uuid::new_v4(),
            owner_id: uuid::Uuid::new_v4(),
            name: "Demo".to_string(),
            location: GeoPoint::new(38.5, -121.7),
            area_hectares: 60.0,
            crop_type: CropType::Corn,
            planting_date: None,
            harvest_date: None,
            notes: None,
            created_at: chrono::Utc::now(),
            updated_at: chrono::Utc::now(),
        };
        let grid = FarmGrid::new(farm.location, farm.area_hectares).unwrap();
        let readings = DemoSpectralSource.zone_readings(&farm, &grid).await.unwrap();
        assert_eq!(readings.len(), 25);

        let report = build_soil_health_report(&grid, &readings).unwrap();
        assert_eq!(report.summary.total_zone_count, 25);
        assert!(report
            .zones
            .iter()
            .all(|z| (0.0..=100.0).contains(&z.health_score)));
    }

    #[test]
    fn test_default_market_is_valid() {
        let report = build_roi_report(Decimal::from(10), None, None, &default_market_inputs()).unwrap();
        assert_eq!(report.crop_options.len(), 4);
        assert!(report.recommended_crop.is_some());
    }

    #[test]
    fn test_soil_link_needs_a_result() {
        let farm_id = Uuid::new_v4();
        let mut record =
            AnalysisRecord::<SoilHealthReport>::pending(farm_id, Uuid::new_v4(), AnalysisKind::SoilHealth);
        assert_eq!(soil_link(None), (None, None));
        assert_eq!(soil_link(Some(&record)), (None, None));

        record.mark_processing().unwrap();
        record.fail("no imagery", chrono::Utc::now()).unwrap();
        assert_eq!(soil_link(Some(&record)), (None, None));

        let grid = FarmGrid::new(GeoPoint::new(38.5, -121.7), 1.5).unwrap();
        let readings: Vec<ZoneReading> = grid
            .zones
            .iter()
            .map(|z| DemoSpectralSource::reading(7, z.row, z.col))
            .collect();
        let report = build_soil_health_report(&grid, &readings).unwrap();
        let overall = report.summary.overall_health;

        let mut done =
            AnalysisRecord::<SoilHealthReport>::pending(farm_id, Uuid::new_v4(), AnalysisKind::SoilHealth);
        done.mark_processing().unwrap();
        done.complete(report, chrono::Utc::now()).unwrap();
        assert_eq!(soil_link(Some(&done)), (Some(done.id), Some(overall)));
    }
}
