//! Validation utilities for farm records and analysis inputs

use chrono::NaiveDate;
use validator::ValidationError;

use crate::grid::farm_bounds;
use crate::models::{CreateFarmInput, UpdateFarmInput};
use crate::types::GeoPoint;

// ============================================================================
// Farm Geometry Validations
// ============================================================================

/// Validate a farm area in hectares (must be finite and strictly positive)
pub fn validate_area_hectares(area: f64) -> Result<(), &'static str> {
    if !area.is_finite() {
        return Err("Area must be a finite number");
    }
    if area <= 0.0 {
        return Err("Area must be greater than zero");
    }
    Ok(())
}

/// Validate latitude/longitude ranges
pub fn validate_coordinates(latitude: f64, longitude: f64) -> Result<(), &'static str> {
    if !latitude.is_finite() || !(-90.0..=90.0).contains(&latitude) {
        return Err("Latitude must be between -90 and 90");
    }
    if !longitude.is_finite() || !(-180.0..=180.0).contains(&longitude) {
        return Err("Longitude must be between -180 and 180");
    }
    Ok(())
}

/// Validate that harvest follows planting when both are set
pub fn validate_growing_season(
    planting_date: Option<NaiveDate>,
    harvest_date: Option<NaiveDate>,
) -> Result<(), &'static str> {
    match (planting_date, harvest_date) {
        (Some(planting), Some(harvest)) if harvest <= planting => {
            Err("Harvest date must be after planting date")
        }
        _ => Ok(()),
    }
}

/// Validate a farm name
pub fn validate_farm_name(name: &str) -> Result<(), &'static str> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err("Farm name cannot be empty");
    }
    if trimmed.chars().count() > 100 {
        return Err("Farm name must be at most 100 characters");
    }
    Ok(())
}

// ============================================================================
// Analysis Validations
// ============================================================================

/// Validate a zone health score (0-100)
pub fn validate_health_score(score: f64) -> Result<(), &'static str> {
    if !score.is_finite() || !(0.0..=100.0).contains(&score) {
        return Err("Health score must be between 0 and 100");
    }
    Ok(())
}

/// Validate a normalized spectral index (-1 to 1)
pub fn validate_spectral_index(value: f64) -> Result<(), &'static str> {
    if !value.is_finite() || !(-1.0..=1.0).contains(&value) {
        return Err("Spectral index must be between -1 and 1");
    }
    Ok(())
}

// ============================================================================
// validator hooks
// ============================================================================

fn to_validation_error(code: &'static str, message: &'static str) -> ValidationError {
    let mut error = ValidationError::new(code);
    error.message = Some(message.into());
    error
}

/// Struct-level checks for farm creation that field attributes cannot express
pub(crate) fn validate_create_farm(input: &CreateFarmInput) -> Result<(), ValidationError> {
    validate_farm_name(&input.name).map_err(|m| to_validation_error("name", m))?;
    validate_coordinates(input.latitude, input.longitude)
        .map_err(|m| to_validation_error("location", m))?;
    validate_area_hectares(input.area_hectares)
        .map_err(|m| to_validation_error("area_hectares", m))?;
    // The farm square must be partitionable, not just its centre valid
    farm_bounds(GeoPoint::new(input.latitude, input.longitude), input.area_hectares).map_err(|_| {
        to_validation_error(
            "location",
            "Farm extends past the poles or the antimeridian",
        )
    })?;
    validate_growing_season(input.planting_date, input.harvest_date)
        .map_err(|m| to_validation_error("growing_season", m))
}

/// Struct-level checks for farm updates; only supplied fields are checked
pub(crate) fn validate_update_farm(input: &UpdateFarmInput) -> Result<(), ValidationError> {
    if let Some(name) = &input.name {
        validate_farm_name(name).map_err(|m| to_validation_error("name", m))?;
    }
    match (input.latitude, input.longitude) {
        (Some(lat), Some(lon)) => {
            validate_coordinates(lat, lon).map_err(|m| to_validation_error("location", m))?
        }
        (Some(lat), None) => {
            validate_coordinates(lat, 0.0).map_err(|m| to_validation_error("location", m))?
        }
        (None, Some(lon)) => {
            validate_coordinates(0.0, lon).map_err(|m| to_validation_error("location", m))?
        }
        (None, None) => {}
    }
    if let Some(area) = input.area_hectares {
        validate_area_hectares(area).map_err(|m| to_validation_error("area_hectares", m))?;
    }
    validate_growing_season(input.planting_date, input.harvest_date)
        .map_err(|m| to_validation_error("growing_season", m))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_validate_area() {
        assert!(validate_area_hectares(0.1).is_ok());
        assert!(validate_area_hectares(5000.0).is_ok());
        assert!(validate_area_hectares(0.0).is_err());
        assert!(validate_area_hectares(-1.0).is_err());
        assert!(validate_area_hectares(f64::INFINITY).is_err());
        assert!(validate_area_hectares(f64::NAN).is_err());
    }

    #[test]
    fn test_validate_coordinates() {
        assert!(validate_coordinates(0.0, 0.0).is_ok());
        assert!(validate_coordinates(90.0, 180.0).is_ok());
        assert!(validate_coordinates(-90.0, -180.0).is_ok());
        assert!(validate_coordinates(90.1, 0.0).is_err());
        assert!(validate_coordinates(0.0, -180.5).is_err());
        assert!(validate_coordinates(f64::NAN, 0.0).is_err());
    }

    #[test]
    fn test_validate_growing_season() {
        assert!(validate_growing_season(None, None).is_ok());
        assert!(validate_growing_season(Some(date(2024, 4, 1)), None).is_ok());
        assert!(validate_growing_season(None, Some(date(2024, 9, 1))).is_ok());
        assert!(validate_growing_season(Some(date(2024, 4, 1)), Some(date(2024, 9, 1))).is_ok());
        // Same day is not strictly after
        assert!(validate_growing_season(Some(date(2024, 4, 1)), Some(date(2024, 4, 1))).is_err());
        assert!(validate_growing_season(Some(date(2024, 9, 1)), Some(date(2024, 4, 1))).is_err());
    }

    fn farm_at(latitude: f64, longitude: f64, area_hectares: f64) -> CreateFarmInput {
        CreateFarmInput {
            name: "Edge Field".to_string(),
            latitude,
            longitude,
            area_hectares,
            crop_type: crate::models::CropType::Wheat,
            planting_date: None,
            harvest_date: None,
            notes: None,
        }
    }

    #[test]
    fn test_create_farm_must_fit_the_projection() {
        assert!(validate_create_farm(&farm_at(45.0, 10.0, 1.0)).is_ok());

        let near_pole = validate_create_farm(&farm_at(89.9999, 10.0, 1.0)).unwrap_err();
        assert_eq!(near_pole.code, "location");
        assert!(validate_create_farm(&farm_at(89.9999, 179.9999, 1.0)).is_err());
        assert!(validate_create_farm(&farm_at(0.0, -179.9999, 1.0)).is_err());
        assert!(validate_create_farm(&farm_at(-90.0, 0.0, 1.0)).is_err());
    }

    #[test]
    fn test_validate_farm_name() {
        assert!(validate_farm_name("North Field").is_ok());
        assert!(validate_farm_name("   ").is_err());
        assert!(validate_farm_name(&"x".repeat(101)).is_err());
    }

    #[test]
    fn test_validate_health_score() {
        assert!(validate_health_score(0.0).is_ok());
        assert!(validate_health_score(100.0).is_ok());
        assert!(validate_health_score(100.1).is_err());
        assert!(validate_health_score(-0.1).is_err());
    }

    #[test]
    fn test_validate_spectral_index() {
        assert!(validate_spectral_index(0.65).is_ok());
        assert!(validate_spectral_index(-1.0).is_ok());
        assert!(validate_spectral_index(1.2).is_err());
    }
}
