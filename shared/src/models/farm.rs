//! Farm models

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::types::GeoPoint;
use crate::validation::{validate_create_farm, validate_update_farm};

/// A farm registered by a user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Farm {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub name: String,
    pub location: GeoPoint,
    pub area_hectares: f64,
    pub crop_type: CropType,
    pub planting_date: Option<NaiveDate>,
    pub harvest_date: Option<NaiveDate>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Crops tracked by the platform
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CropType {
    Rice,
    Corn,
    Wheat,
    Soybeans,
    Vegetables,
    Other,
}

impl CropType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CropType::Rice => "rice",
            CropType::Corn => "corn",
            CropType::Wheat => "wheat",
            CropType::Soybeans => "soybeans",
            CropType::Vegetables => "vegetables",
            CropType::Other => "other",
        }
    }
}

impl std::str::FromStr for CropType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "rice" => Ok(CropType::Rice),
            "corn" => Ok(CropType::Corn),
            "wheat" => Ok(CropType::Wheat),
            "soybeans" => Ok(CropType::Soybeans),
            "vegetables" => Ok(CropType::Vegetables),
            "other" => Ok(CropType::Other),
            _ => Err(format!("Unknown crop type: {}", s)),
        }
    }
}

impl std::fmt::Display for CropType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Input for creating a farm
#[derive(Debug, Clone, Deserialize, Validate)]
#[validate(schema(function = "validate_create_farm"))]
pub struct CreateFarmInput {
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub area_hectares: f64,
    pub crop_type: CropType,
    pub planting_date: Option<NaiveDate>,
    pub harvest_date: Option<NaiveDate>,
    pub notes: Option<String>,
}

/// Input for updating a farm; absent fields keep their stored value
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[validate(schema(function = "validate_update_farm"))]
pub struct UpdateFarmInput {
    pub name: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub area_hectares: Option<f64>,
    pub crop_type: Option<CropType>,
    pub planting_date: Option<NaiveDate>,
    pub harvest_date: Option<NaiveDate>,
    pub notes: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input() -> CreateFarmInput {
        CreateFarmInput {
            name: "North Field".to_string(),
            latitude: 40.7128,
            longitude: -74.0060,
            area_hectares: 7.5,
            crop_type: CropType::Corn,
            planting_date: NaiveDate::from_ymd_opt(2024, 4, 15),
            harvest_date: NaiveDate::from_ymd_opt(2024, 9, 15),
            notes: None,
        }
    }

    #[test]
    fn test_valid_farm_input() {
        assert!(input().validate().is_ok());
    }

    #[test]
    fn test_rejects_out_of_range_latitude() {
        let mut farm = input();
        farm.latitude = 91.0;
        assert!(farm.validate().is_err());
    }

    #[test]
    fn test_rejects_zero_area() {
        let mut farm = input();
        farm.area_hectares = 0.0;
        assert!(farm.validate().is_err());
    }

    #[test]
    fn test_rejects_harvest_before_planting() {
        let mut farm = input();
        farm.harvest_date = NaiveDate::from_ymd_opt(2024, 3, 1);
        assert!(farm.validate().is_err());
    }

    #[test]
    fn test_update_only_checks_supplied_fields() {
        assert!(UpdateFarmInput::default().validate().is_ok());

        let bad = UpdateFarmInput {
            area_hectares: Some(-2.0),
            ..Default::default()
        };
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_crop_type_round_trip() {
        for crop in [CropType::Rice, CropType::Soybeans, CropType::Other] {
            assert_eq!(crop.as_str().parse::<CropType>().unwrap(), crop);
        }
        assert!("coffee".parse::<CropType>().is_err());
    }
}
