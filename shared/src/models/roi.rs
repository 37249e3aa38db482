//! ROI analysis models and crop projections

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::farm::CropType;
use crate::models::zone::{DEGRADED_THRESHOLD, HEALTHY_THRESHOLD, MODERATE_THRESHOLD};

/// Risk attached to a recommendation
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Moderate,
    High,
    Critical,
}

impl RiskLevel {
    /// Risk implied by the farm's soil health score
    pub fn from_soil_score(score: Option<f64>) -> Self {
        match score {
            Some(s) if s >= HEALTHY_THRESHOLD => RiskLevel::Low,
            Some(s) if s >= MODERATE_THRESHOLD => RiskLevel::Moderate,
            Some(s) if s >= DEGRADED_THRESHOLD => RiskLevel::High,
            Some(_) => RiskLevel::Critical,
            None => RiskLevel::Moderate,
        }
    }
}

/// How strongly a crop option is recommended
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationLevel {
    HighlyRecommended,
    Recommended,
    Neutral,
    NotRecommended,
}

impl RecommendationLevel {
    pub fn from_roi(roi_percentage: Decimal) -> Self {
        if roi_percentage >= Decimal::from(80) {
            RecommendationLevel::HighlyRecommended
        } else if roi_percentage >= Decimal::from(50) {
            RecommendationLevel::Recommended
        } else if roi_percentage >= Decimal::from(20) {
            RecommendationLevel::Neutral
        } else {
            RecommendationLevel::NotRecommended
        }
    }
}

/// Market and agronomic inputs for projecting one crop (per hectare)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CropMarketInput {
    pub crop_type: CropType,
    /// Expected yield in tonnes per hectare
    pub expected_yield: Decimal,
    /// Price per tonne
    pub price_per_unit: Decimal,
    /// Input costs per hectare
    pub input_costs: Decimal,
}

/// Economic projection for one crop
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CropOption {
    pub crop_type: CropType,
    pub expected_yield: Decimal,
    pub estimated_revenue: Decimal,
    pub input_costs: Decimal,
    pub net_profit: Decimal,
    pub roi_percentage: Decimal,
    /// Net profit for the whole farm area
    pub farm_net_profit: Decimal,
    pub recommendation_level: RecommendationLevel,
    pub soil_health_impact: String,
}

/// Completed ROI analysis payload
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RoiReport {
    /// Soil health analysis whose score informed this report, if any
    pub soil_health_analysis_id: Option<Uuid>,
    pub soil_score: Option<f64>,
    pub crop_options: Vec<CropOption>,
    pub recommended_crop: Option<CropType>,
    pub risk_level: RiskLevel,
    pub confidence_score: f64,
    pub economic_summary: String,
}

fn soil_health_impact(crop: CropType) -> &'static str {
    match crop {
        CropType::Soybeans => "Improves nitrogen fixation and soil structure",
        CropType::Corn => "Heavy nitrogen demand; neutral with proper management",
        CropType::Wheat => "Moderate demand; good rotation crop",
        CropType::Rice => "High water demand; monitor salinity",
        CropType::Vegetables => "Intensive; plan cover crops between cycles",
        CropType::Other => "Impact depends on management practices",
    }
}

/// Project revenue, profit and ROI for one crop on a farm of `area_hectares`
pub fn project_crop(input: &CropMarketInput, area_hectares: Decimal) -> Result<CropOption, &'static str> {
    if input.expected_yield < Decimal::ZERO || input.price_per_unit < Decimal::ZERO {
        return Err("Yield and price cannot be negative");
    }
    if input.input_costs <= Decimal::ZERO {
        return Err("Input costs must be greater than zero");
    }
    if area_hectares <= Decimal::ZERO {
        return Err("Area must be greater than zero");
    }

    let revenue = input.expected_yield * input.price_per_unit;
    let net_profit = revenue - input.input_costs;
    let roi = (net_profit / input.input_costs * Decimal::from(100)).round_dp(1);

    Ok(CropOption {
        crop_type: input.crop_type,
        expected_yield: input.expected_yield,
        estimated_revenue: revenue.round_dp(2),
        input_costs: input.input_costs,
        net_profit: net_profit.round_dp(2),
        roi_percentage: roi,
        farm_net_profit: (net_profit * area_hectares).round_dp(2),
        recommendation_level: RecommendationLevel::from_roi(roi),
        soil_health_impact: soil_health_impact(input.crop_type).to_string(),
    })
}

/// Rule-based crop preference for a soil score
pub fn preferred_crop_for_soil(score: f64) -> CropType {
    if score >= HEALTHY_THRESHOLD {
        CropType::Corn
    } else if score >= 60.0 {
        CropType::Soybeans
    } else {
        CropType::Wheat
    }
}

/// Build an ROI report from market inputs and an optional soil score.
///
/// When a soil score is known and its preferred crop is among the options,
/// that crop is recommended; otherwise the highest-ROI option wins.
pub fn build_roi_report(
    area_hectares: Decimal,
    soil_health_analysis_id: Option<Uuid>,
    soil_score: Option<f64>,
    inputs: &[CropMarketInput],
) -> Result<RoiReport, &'static str> {
    let mut crop_options = inputs
        .iter()
        .map(|input| project_crop(input, area_hectares))
        .collect::<Result<Vec<_>, _>>()?;
    crop_options.sort_by(|a, b| b.roi_percentage.cmp(&a.roi_percentage));

    let soil_pick = soil_score
        .map(preferred_crop_for_soil)
        .filter(|crop| crop_options.iter().any(|o| o.crop_type == *crop));
    let recommended_crop = soil_pick.or_else(|| crop_options.first().map(|o| o.crop_type));

    let economic_summary = match recommended_crop
        .and_then(|crop| crop_options.iter().find(|o| o.crop_type == crop))
    {
        Some(option) => format!(
            "{} projects {}% ROI ({} net per hectare).",
            option.crop_type, option.roi_percentage, option.net_profit
        ),
        None => "No crop options were available for projection.".to_string(),
    };

    Ok(RoiReport {
        soil_health_analysis_id,
        soil_score,
        crop_options,
        recommended_crop,
        risk_level: RiskLevel::from_soil_score(soil_score),
        confidence_score: if soil_score.is_some() { 0.75 } else { 0.60 },
        economic_summary,
    })
}
