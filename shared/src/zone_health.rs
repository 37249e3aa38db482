//! Zone health scoring and farm-level aggregation
//!
//! Turns per-zone spectral readings into scored zones, a heatmap and a
//! summary of the farm's problem areas.

use crate::grid::{FarmGrid, GridError};
use crate::models::{
    is_problem_zone, FarmZoneSummary, GridSummary, SoilHealthReport, SpatialVariability,
    SpectralIndices, ZoneReading, ZoneResult, ZoneStatus,
};
use crate::types::BoundingBox;

fn clamp_score(value: f64) -> f64 {
    value.clamp(0.0, 100.0)
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

// ============================================================================
// Per-zone scoring
// ============================================================================

/// Estimate soil moisture (%) from NDMI and NDWI
pub fn estimate_zone_moisture(indices: &SpectralIndices) -> f64 {
    let combined = 0.7 * indices.ndmi + 0.3 * indices.ndwi;
    round1(clamp_score((combined + 0.5) * 100.0))
}

/// Moisture is best between 40% and 60%
fn moisture_score(moisture: f64) -> f64 {
    if moisture < 40.0 {
        clamp_score(moisture * 2.5)
    } else if moisture <= 60.0 {
        100.0
    } else {
        clamp_score(100.0 - (moisture - 60.0) * 2.5)
    }
}

/// Weighted 0-100 health score for a zone
pub fn calculate_zone_health_score(indices: &SpectralIndices, moisture: f64) -> f64 {
    let ndvi_score = clamp_score((indices.ndvi + 1.0) * 50.0);
    let ndwi_score = clamp_score((indices.ndwi + 0.5) * 100.0);
    let bsi_score = clamp_score(100.0 - (indices.bsi + 1.0) * 50.0);

    let score = ndvi_score * 0.4 + moisture_score(moisture) * 0.3 + ndwi_score * 0.2 + bsi_score * 0.1;
    round1(clamp_score(score))
}

/// Alerts and recommendations for one zone
pub fn generate_zone_recommendations(
    indices: &SpectralIndices,
    moisture: f64,
    health_score: f64,
) -> (Vec<String>, Vec<String>) {
    let mut alerts = Vec::new();
    let mut recommendations = Vec::new();

    if indices.ndvi < 0.2 {
        alerts.push("Critical vegetation stress detected".to_string());
        recommendations.push("Inspect for pests or disease".to_string());
        recommendations.push("Run a soil test for nutrient deficiencies".to_string());
    } else if indices.ndvi < 0.4 {
        alerts.push("Low vegetation density".to_string());
        recommendations.push("Consider a balanced fertilizer application".to_string());
    }

    if moisture < 20.0 {
        alerts.push("Very low soil moisture".to_string());
        recommendations.push("Irrigate within the next few days".to_string());
    } else if moisture < 35.0 {
        alerts.push("Low soil moisture".to_string());
        recommendations.push("Schedule irrigation".to_string());
    } else if moisture > 80.0 {
        alerts.push("Excess soil moisture".to_string());
        recommendations.push("Check field drainage".to_string());
    }

    if health_score < 40.0 {
        recommendations.push("Zone needs immediate attention".to_string());
    } else if health_score < 60.0 {
        recommendations.push("Monitor this zone weekly".to_string());
    }

    (alerts, recommendations)
}

/// Score, classify and annotate a single zone
pub fn score_zone(zone_id: &str, reading: &ZoneReading, bounds: BoundingBox) -> ZoneResult {
    let moisture = estimate_zone_moisture(&reading.indices);
    let health_score = calculate_zone_health_score(&reading.indices, moisture);
    let (alerts, recommendations) = generate_zone_recommendations(&reading.indices, moisture, health_score);

    ZoneResult {
        zone_id: zone_id.to_string(),
        row: reading.row,
        col: reading.col,
        bounds,
        health_score,
        status: ZoneStatus::from_score(health_score),
        indices: reading.indices,
        moisture,
        alerts,
        recommendations,
        data_quality: reading.data_quality,
    }
}

// ============================================================================
// Farm-level aggregation
// ============================================================================

/// Urgency of a suggested action
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ActionPriority {
    High,
    Medium,
}

/// Most urgent action for a problem zone
pub fn priority_action(zone: &ZoneResult) -> (ActionPriority, String) {
    let id = &zone.zone_id;
    if zone.moisture < 25.0 {
        (ActionPriority::High, format!("Water zone {} within 3 days", id))
    } else if zone.moisture > 75.0 {
        (ActionPriority::High, format!("Check drainage in zone {}", id))
    } else if zone.indices.ndvi < 0.2 {
        (ActionPriority::High, format!("Inspect zone {} for pests or disease", id))
    } else if zone.indices.ndvi < 0.35 {
        (ActionPriority::Medium, format!("Consider fertilizing zone {}", id))
    } else {
        (ActionPriority::Medium, format!("Inspect zone {} this week", id))
    }
}

/// Mean of zone scores, weighted by zone area when every zone has one
pub fn overall_health(scores: &[f64], areas: Option<&[f64]>) -> f64 {
    if scores.is_empty() {
        return 0.0;
    }

    let weighted = areas.filter(|a| a.len() == scores.len() && a.iter().sum::<f64>() > 0.0);
    let mean = match weighted {
        Some(areas) => {
            let total: f64 = areas.iter().sum();
            scores.iter().zip(areas).map(|(s, a)| s * a).sum::<f64>() / total
        }
        None => scores.iter().sum::<f64>() / scores.len() as f64,
    };
    round1(mean)
}

/// Spread of zone scores; fewer than two zones counts as perfectly uniform
pub fn spatial_variability(scores: &[f64]) -> SpatialVariability {
    let mean = if scores.is_empty() {
        0.0
    } else {
        scores.iter().sum::<f64>() / scores.len() as f64
    };

    if scores.len() < 2 {
        return SpatialVariability {
            coefficient_of_variation: 0.0,
            range: 0.0,
            uniformity_score: 100.0,
            std_dev: 0.0,
            mean: round1(mean),
        };
    }

    let variance =
        scores.iter().map(|s| (s - mean).powi(2)).sum::<f64>() / (scores.len() - 1) as f64;
    let std_dev = variance.sqrt();
    let cv = if mean > 0.0 { std_dev / mean * 100.0 } else { 0.0 };
    let max = scores.iter().copied().fold(f64::MIN, f64::max);
    let min = scores.iter().copied().fold(f64::MAX, f64::min);

    SpatialVariability {
        coefficient_of_variation: round1(cv),
        range: round1(max - min),
        uniformity_score: round1((100.0 - cv).max(0.0)),
        std_dev: round1(std_dev),
        mean: round1(mean),
    }
}

/// rows × cols matrix of health scores
pub fn heatmap(zones: &[ZoneResult], rows: u32, cols: u32) -> Vec<Vec<f64>> {
    let mut matrix = vec![vec![0.0; cols as usize]; rows as usize];
    for zone in zones {
        if let Some(cell) = matrix
            .get_mut(zone.row as usize)
            .and_then(|r| r.get_mut(zone.col as usize))
        {
            *cell = zone.health_score;
        }
    }
    matrix
}

/// Roll zone results up into the farm summary
pub fn summarize_zones(zones: &[ZoneResult], areas: Option<&[f64]>) -> FarmZoneSummary {
    let scores: Vec<f64> = zones.iter().map(|z| z.health_score).collect();

    let mut actions: Vec<(ActionPriority, f64, String)> = zones
        .iter()
        .filter(|z| is_problem_zone(z.health_score))
        .map(|z| {
            let (priority, action) = priority_action(z);
            (priority, z.health_score, action)
        })
        .collect();
    actions.sort_by(|a, b| a.0.cmp(&b.0).then(a.1.total_cmp(&b.1)));

    FarmZoneSummary {
        overall_health: overall_health(&scores, areas),
        healthy_zone_count: zones
            .iter()
            .filter(|z| z.status == ZoneStatus::Healthy)
            .count() as u32,
        problem_zone_count: actions.len() as u32,
        total_zone_count: zones.len() as u32,
        priority_actions: actions.into_iter().map(|(_, _, action)| action).collect(),
    }
}

/// Score every zone of `grid` and assemble the soil health report.
///
/// Exactly one reading per zone is required; readings may arrive in any order.
pub fn build_soil_health_report(
    grid: &FarmGrid,
    readings: &[ZoneReading],
) -> Result<SoilHealthReport, GridError> {
    let expected = grid.zones.len();
    if readings.len() != expected {
        return Err(GridError::ReadingCountMismatch {
            expected,
            actual: readings.len(),
        });
    }

    let mut slots: Vec<Option<&ZoneReading>> = vec![None; expected];
    for reading in readings {
        reading.validate().map_err(GridError::InvalidReading)?;
        grid.zone_at(reading.row, reading.col)?;
        slots[(reading.row * grid.cols() + reading.col) as usize] = Some(reading);
    }

    let zones = grid
        .zones
        .iter()
        .zip(&slots)
        .map(|(geometry, slot)| match slot {
            Some(reading) => Ok(score_zone(&geometry.zone_id, reading, geometry.bounds)),
            None => Err(GridError::MissingReading {
                row: geometry.row,
                col: geometry.col,
            }),
        })
        .collect::<Result<Vec<_>, _>>()?;

    let areas: Vec<f64> = grid.zones.iter().map(|z| z.area_hectares).collect();
    let scores: Vec<f64> = zones.iter().map(|z| z.health_score).collect();
    let problem_zones = zones
        .iter()
        .filter(|z| is_problem_zone(z.health_score))
        .map(|z| z.zone_id.clone())
        .collect();

    Ok(SoilHealthReport {
        grid: GridSummary::from(grid.tier),
        heatmap: heatmap(&zones, grid.rows(), grid.cols()),
        summary: summarize_zones(&zones, Some(&areas)),
        variability: spatial_variability(&scores),
        problem_zones,
        zones,
    })
}
