//! WebAssembly module for the Farm Zone Analysis Platform
//!
//! Provides client-side computation for:
//! - Grid tier selection and zone geometry
//! - Zone health scoring and status classification
//! - Offline validation of farm input

use wasm_bindgen::prelude::*;

// Re-export shared types for use in JavaScript
pub use shared::grid::*;
pub use shared::models::*;
pub use shared::types::*;
pub use shared::validation::*;

/// Initialize the WASM module
#[wasm_bindgen(start)]
pub fn init() {
    // Set up panic hook for better error messages in browser console
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}

fn js_error(e: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&e.to_string())
}

/// Grid tier for a farm area as JSON (`rows`, `cols`, `resolution_meters`, `source`)
#[wasm_bindgen]
pub fn grid_tier_json(area_hectares: f64) -> Result<String, JsValue> {
    let tier = GridTier::for_area(area_hectares).map_err(js_error)?;
    serde_json::to_string(&tier).map_err(js_error)
}

/// Full zone grid for a farm as JSON
#[wasm_bindgen]
pub fn farm_grid_json(latitude: f64, longitude: f64, area_hectares: f64) -> Result<String, JsValue> {
    let grid = FarmGrid::new(GeoPoint::new(latitude, longitude), area_hectares).map_err(js_error)?;
    serde_json::to_string(&grid).map_err(js_error)
}

/// Bounds of one zone as JSON
#[wasm_bindgen]
pub fn zone_bounds_json(
    latitude: f64,
    longitude: f64,
    area_hectares: f64,
    rows: u32,
    cols: u32,
    row: u32,
    col: u32,
) -> Result<String, JsValue> {
    let bounds = zone_bounds(
        GeoPoint::new(latitude, longitude),
        area_hectares,
        rows,
        cols,
        row,
        col,
    )
    .map_err(js_error)?;
    serde_json::to_string(&bounds).map_err(js_error)
}

/// Status band for a zone health score
#[wasm_bindgen]
pub fn classify_zone_status(score: f64) -> String {
    ZoneStatus::from_score(score).as_str().to_string()
}

/// Whether a zone needs attention
#[wasm_bindgen]
pub fn is_problem_score(score: f64) -> bool {
    is_problem_zone(score)
}

/// Health score from raw spectral indices
#[wasm_bindgen]
pub fn zone_health_score(ndvi: f64, ndwi: f64, ndmi: f64, bsi: f64) -> f64 {
    let indices = SpectralIndices {
        ndvi,
        ndwi,
        ndmi,
        bsi,
    };
    let moisture = shared::estimate_zone_moisture(&indices);
    shared::calculate_zone_health_score(&indices, moisture)
}

/// Validate a farm creation form before it is sent
#[wasm_bindgen]
pub fn validate_farm_input(input_json: &str) -> Result<bool, JsValue> {
    let input: CreateFarmInput = serde_json::from_str(input_json)
        .map_err(|e| JsValue::from_str(&format!("Invalid farm JSON: {}", e)))?;

    validate_farm_name(&input.name).map_err(js_error)?;
    validate_coordinates(input.latitude, input.longitude).map_err(js_error)?;
    validate_area_hectares(input.area_hectares).map_err(js_error)?;
    validate_growing_season(input.planting_date, input.harvest_date).map_err(js_error)?;
    Ok(true)
}
