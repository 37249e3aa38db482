//! Zone-level soil health models

use serde::{Deserialize, Serialize};

use crate::grid::{GridTier, SatelliteSource};
use crate::types::BoundingBox;
use crate::validation::validate_spectral_index;

/// Lower bound (inclusive) of the healthy band
pub const HEALTHY_THRESHOLD: f64 = 75.0;
/// Lower bound (inclusive) of the moderate band; zones below it are problem zones
pub const MODERATE_THRESHOLD: f64 = 55.0;
/// Lower bound (inclusive) of the degraded band
pub const DEGRADED_THRESHOLD: f64 = 35.0;

/// Health category of a zone
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ZoneStatus {
    Healthy,
    Moderate,
    Degraded,
    Critical,
}

impl ZoneStatus {
    /// Classify a 0-100 health score. Every score maps to exactly one band.
    pub fn from_score(score: f64) -> Self {
        if score >= HEALTHY_THRESHOLD {
            ZoneStatus::Healthy
        } else if score >= MODERATE_THRESHOLD {
            ZoneStatus::Moderate
        } else if score >= DEGRADED_THRESHOLD {
            ZoneStatus::Degraded
        } else {
            ZoneStatus::Critical
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ZoneStatus::Healthy => "healthy",
            ZoneStatus::Moderate => "moderate",
            ZoneStatus::Degraded => "degraded",
            ZoneStatus::Critical => "critical",
        }
    }
}

impl std::fmt::Display for ZoneStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// True for zones that need attention in the farm summary
pub fn is_problem_zone(score: f64) -> bool {
    score < MODERATE_THRESHOLD
}

/// Spectral indices measured for a zone
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct SpectralIndices {
    /// Normalized Difference Vegetation Index
    pub ndvi: f64,
    /// Normalized Difference Water Index
    pub ndwi: f64,
    /// Normalized Difference Moisture Index
    pub ndmi: f64,
    /// Bare Soil Index (lower is better)
    pub bsi: f64,
}

/// Raw per-zone measurement handed to zone scoring
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ZoneReading {
    pub row: u32,
    pub col: u32,
    pub indices: SpectralIndices,
    /// Share of valid pixels and their consistency, 0-100
    pub data_quality: f64,
}

impl ZoneReading {
    pub fn validate(&self) -> Result<(), &'static str> {
        let SpectralIndices {
            ndvi,
            ndwi,
            ndmi,
            bsi,
        } = self.indices;
        for value in [ndvi, ndwi, ndmi, bsi] {
            validate_spectral_index(value)?;
        }
        if !(0.0..=100.0).contains(&self.data_quality) {
            return Err("Data quality must be between 0 and 100");
        }
        Ok(())
    }
}

/// Analysis result for one zone
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ZoneResult {
    pub zone_id: String,
    pub row: u32,
    pub col: u32,
    pub bounds: BoundingBox,
    pub health_score: f64,
    pub status: ZoneStatus,
    pub indices: SpectralIndices,
    /// Estimated soil moisture percentage
    pub moisture: f64,
    pub alerts: Vec<String>,
    pub recommendations: Vec<String>,
    pub data_quality: f64,
}

/// Farm-level roll-up of zone results
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FarmZoneSummary {
    pub overall_health: f64,
    pub healthy_zone_count: u32,
    pub problem_zone_count: u32,
    pub total_zone_count: u32,
    pub priority_actions: Vec<String>,
}

/// Spread of health scores across zones
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SpatialVariability {
    pub coefficient_of_variation: f64,
    pub range: f64,
    /// 100 = perfectly uniform
    pub uniformity_score: f64,
    pub std_dev: f64,
    pub mean: f64,
}

/// Grid metadata attached to a soil health report
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GridSummary {
    pub rows: u32,
    pub cols: u32,
    pub resolution_meters: u32,
    pub satellite_source: SatelliteSource,
}

impl From<GridTier> for GridSummary {
    fn from(tier: GridTier) -> Self {
        Self {
            rows: tier.rows,
            cols: tier.cols,
            resolution_meters: tier.resolution_meters,
            satellite_source: tier.source,
        }
    }
}

/// Completed soil health analysis payload
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SoilHealthReport {
    pub grid: GridSummary,
    /// Row-major, north-west first
    pub zones: Vec<ZoneResult>,
    pub summary: FarmZoneSummary,
    pub problem_zones: Vec<String>,
    /// rows × cols matrix of zone health scores
    pub heatmap: Vec<Vec<f64>>,
    pub variability: SpatialVariability,
}
