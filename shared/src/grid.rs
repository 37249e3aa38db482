//! Zone grid partitioning for farm analysis
//!
//! A farm is modelled as a square of `sqrt(area × 10 000)` meters centred on
//! its registered coordinate. The square is split into a rows × cols grid
//! whose size depends on the farm's area tier; each cell is one analysis
//! zone. Row 0 is the northernmost band and column 0 the westernmost.
//!
//! Meters are converted to degrees with a local linearization
//! (1° lat ≈ 111 320 m, 1° lon ≈ 111 320 m × cos(lat)). This only holds for
//! farm-sized areas and must not be reused for regional geometry.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{BoundingBox, GeoPoint};
use crate::validation::{validate_area_hectares, validate_coordinates};

/// Meters per degree of latitude (and of longitude at the equator)
pub const METERS_PER_DEGREE: f64 = 111_320.0;

/// Square meters per hectare
pub const SQUARE_METERS_PER_HECTARE: f64 = 10_000.0;

/// Errors raised by grid construction and zone lookup
#[derive(Debug, Clone, Error, PartialEq)]
pub enum GridError {
    #[error("Invalid farm area: {0}")]
    InvalidArea(&'static str),

    #[error("Invalid farm coordinates: {0}")]
    InvalidCoordinates(&'static str),

    #[error("Grid dimensions must be non-zero (got {rows}x{cols})")]
    InvalidDimensions { rows: u32, cols: u32 },

    #[error("Zone ({row}, {col}) is outside the {rows}x{cols} grid")]
    ZoneOutOfRange {
        row: u32,
        col: u32,
        rows: u32,
        cols: u32,
    },

    #[error("Farm square extends past the valid coordinate range")]
    ExceedsProjection,

    #[error("Expected {expected} zone readings, got {actual}")]
    ReadingCountMismatch { expected: usize, actual: usize },

    #[error("No reading for zone ({row}, {col})")]
    MissingReading { row: u32, col: u32 },

    #[error("Invalid zone reading: {0}")]
    InvalidReading(&'static str),
}

/// Satellite collections used as the source imagery for a tier
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SatelliteSource {
    /// 10 m multispectral
    Sentinel2,
    /// 30 m multispectral
    Landsat8,
}

impl SatelliteSource {
    /// Earth Engine collection identifier
    pub fn collection_id(&self) -> &'static str {
        match self {
            SatelliteSource::Sentinel2 => "COPERNICUS/S2_SR_HARMONIZED",
            SatelliteSource::Landsat8 => "LANDSAT/LC08/C02/T1_L2",
        }
    }

    pub fn resolution_meters(&self) -> u32 {
        match self {
            SatelliteSource::Sentinel2 => 10,
            SatelliteSource::Landsat8 => 30,
        }
    }
}

/// Grid dimensions and source resolution chosen for a farm area
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct GridTier {
    pub rows: u32,
    pub cols: u32,
    pub resolution_meters: u32,
    pub source: SatelliteSource,
}

impl GridTier {
    const fn new(size: u32, source: SatelliteSource) -> Self {
        let resolution_meters = match source {
            SatelliteSource::Sentinel2 => 10,
            SatelliteSource::Landsat8 => 30,
        };
        Self {
            rows: size,
            cols: size,
            resolution_meters,
            source,
        }
    }

    /// Select the grid tier for a farm area in hectares.
    ///
    /// | area (ha)      | grid | resolution |
    /// |----------------|------|------------|
    /// | < 2            | 2×2  | 10 m       |
    /// | 2 ≤ a < 10     | 3×3  | 10 m       |
    /// | 10 ≤ a < 50    | 4×4  | 30 m       |
    /// | ≥ 50           | 5×5  | 30 m       |
    ///
    /// Boundary values belong to the upper tier. The 10 ha boundary is a
    /// change of imagery source and is never interpolated.
    pub fn for_area(area_hectares: f64) -> Result<Self, GridError> {
        validate_area_hectares(area_hectares).map_err(GridError::InvalidArea)?;

        let tier = if area_hectares < 2.0 {
            Self::new(2, SatelliteSource::Sentinel2)
        } else if area_hectares < 10.0 {
            Self::new(3, SatelliteSource::Sentinel2)
        } else if area_hectares < 50.0 {
            Self::new(4, SatelliteSource::Landsat8)
        } else {
            Self::new(5, SatelliteSource::Landsat8)
        };
        Ok(tier)
    }

    pub fn zone_count(&self) -> u32 {
        self.rows * self.cols
    }
}

/// Geometry of a single zone
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ZoneGeometry {
    pub zone_id: String,
    pub row: u32,
    pub col: u32,
    pub center: GeoPoint,
    pub bounds: BoundingBox,
    pub area_hectares: f64,
}

/// Bounding square of the whole farm
pub fn farm_bounds(center: GeoPoint, area_hectares: f64) -> Result<BoundingBox, GridError> {
    validate_area_hectares(area_hectares).map_err(GridError::InvalidArea)?;
    validate_coordinates(center.latitude, center.longitude)
        .map_err(GridError::InvalidCoordinates)?;

    let side_m = (area_hectares * SQUARE_METERS_PER_HECTARE).sqrt();
    let half_lat = (side_m / 2.0) / METERS_PER_DEGREE;
    let half_lng = (side_m / 2.0) / (METERS_PER_DEGREE * center.latitude.to_radians().cos());

    let bounds = BoundingBox {
        south: center.latitude - half_lat,
        west: center.longitude - half_lng,
        north: center.latitude + half_lat,
        east: center.longitude + half_lng,
    };

    let finite = [bounds.south, bounds.west, bounds.north, bounds.east]
        .iter()
        .all(|v| v.is_finite());
    if !finite
        || bounds.south < -90.0
        || bounds.north > 90.0
        || bounds.west < -180.0
        || bounds.east > 180.0
    {
        return Err(GridError::ExceedsProjection);
    }

    Ok(bounds)
}

/// Bounds of cell (row, col) inside `farm`.
///
/// Edges are derived from band indices so adjacent cells share identical
/// edge values and the outermost cells reproduce the farm edges exactly.
fn cell_bounds(farm: &BoundingBox, rows: u32, cols: u32, row: u32, col: u32) -> BoundingBox {
    let lat_span = farm.north - farm.south;
    let lng_span = farm.east - farm.west;

    let lat_edge = |band: u32| {
        if band == rows {
            farm.south
        } else {
            farm.north - lat_span * f64::from(band) / f64::from(rows)
        }
    };
    let lng_edge = |band: u32| {
        if band == cols {
            farm.east
        } else {
            farm.west + lng_span * f64::from(band) / f64::from(cols)
        }
    };

    BoundingBox {
        south: lat_edge(row + 1),
        west: lng_edge(col),
        north: lat_edge(row),
        east: lng_edge(col + 1),
    }
}

fn check_position(rows: u32, cols: u32, row: u32, col: u32) -> Result<(), GridError> {
    if rows == 0 || cols == 0 {
        return Err(GridError::InvalidDimensions { rows, cols });
    }
    if row >= rows || col >= cols {
        return Err(GridError::ZoneOutOfRange {
            row,
            col,
            rows,
            cols,
        });
    }
    Ok(())
}

/// Bounding box of zone (row, col) for a farm partitioned into rows × cols
pub fn zone_bounds(
    center: GeoPoint,
    area_hectares: f64,
    rows: u32,
    cols: u32,
    row: u32,
    col: u32,
) -> Result<BoundingBox, GridError> {
    check_position(rows, cols, row, col)?;
    let farm = farm_bounds(center, area_hectares)?;
    Ok(cell_bounds(&farm, rows, cols, row, col))
}

const ZONE_NAMES_2X2: [[&str; 2]; 2] = [["NW", "NE"], ["SW", "SE"]];
const ZONE_NAMES_3X3: [[&str; 3]; 3] = [["NW", "N", "NE"], ["W", "C", "E"], ["SW", "S", "SE"]];
const ZONE_NAMES_4X4: [[&str; 4]; 4] = [
    ["NW1", "NW2", "NE1", "NE2"],
    ["NW3", "NW4", "NE3", "NE4"],
    ["SW1", "SW2", "SE1", "SE2"],
    ["SW3", "SW4", "SE3", "SE4"],
];
const ZONE_NAMES_5X5: [[&str; 5]; 5] = [
    ["NW1", "NW2", "N1", "NE1", "NE2"],
    ["NW3", "NW4", "N2", "NE3", "NE4"],
    ["W1", "W2", "C", "E1", "E2"],
    ["SW1", "SW2", "S1", "SE1", "SE2"],
    ["SW3", "SW4", "S2", "SE3", "SE4"],
];

/// Compass-style label for a zone position
pub fn zone_label(rows: u32, cols: u32, row: u32, col: u32) -> String {
    let (r, c) = (row as usize, col as usize);
    match (rows, cols) {
        (2, 2) if r < 2 && c < 2 => ZONE_NAMES_2X2[r][c].to_string(),
        (3, 3) if r < 3 && c < 3 => ZONE_NAMES_3X3[r][c].to_string(),
        (4, 4) if r < 4 && c < 4 => ZONE_NAMES_4X4[r][c].to_string(),
        (5, 5) if r < 5 && c < 5 => ZONE_NAMES_5X5[r][c].to_string(),
        _ => format!("R{}C{}", row, col),
    }
}

/// A farm partitioned into its analysis zones
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FarmGrid {
    pub center: GeoPoint,
    pub area_hectares: f64,
    pub tier: GridTier,
    pub bounds: BoundingBox,
    /// Row-major, north-west to south-east
    pub zones: Vec<ZoneGeometry>,
}

impl FarmGrid {
    /// Partition a farm using the grid tier for its area
    pub fn new(center: GeoPoint, area_hectares: f64) -> Result<Self, GridError> {
        let tier = GridTier::for_area(area_hectares)?;
        Self::with_tier(center, area_hectares, tier)
    }

    /// Partition a farm with explicit grid dimensions
    pub fn with_tier(
        center: GeoPoint,
        area_hectares: f64,
        tier: GridTier,
    ) -> Result<Self, GridError> {
        if tier.rows == 0 || tier.cols == 0 {
            return Err(GridError::InvalidDimensions {
                rows: tier.rows,
                cols: tier.cols,
            });
        }

        let bounds = farm_bounds(center, area_hectares)?;
        let zone_area = area_hectares / f64::from(tier.zone_count());

        let zones = (0..tier.rows)
            .flat_map(|row| (0..tier.cols).map(move |col| (row, col)))
            .map(|(row, col)| {
                let cell = cell_bounds(&bounds, tier.rows, tier.cols, row, col);
                ZoneGeometry {
                    zone_id: zone_label(tier.rows, tier.cols, row, col),
                    row,
                    col,
                    center: cell.center(),
                    bounds: cell,
                    area_hectares: zone_area,
                }
            })
            .collect();

        Ok(Self {
            center,
            area_hectares,
            tier,
            bounds,
            zones,
        })
    }

    pub fn rows(&self) -> u32 {
        self.tier.rows
    }

    pub fn cols(&self) -> u32 {
        self.tier.cols
    }

    /// Zone at a grid position; positions outside the grid are an error
    pub fn zone_at(&self, row: u32, col: u32) -> Result<&ZoneGeometry, GridError> {
        check_position(self.tier.rows, self.tier.cols, row, col)?;
        let index = (row * self.tier.cols + col) as usize;
        Ok(&self.zones[index])
    }

    pub fn zone_by_id(&self, zone_id: &str) -> Option<&ZoneGeometry> {
        self.zones.iter().find(|z| z.zone_id == zone_id)
    }
}
