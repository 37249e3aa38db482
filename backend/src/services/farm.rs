//! Farm management service
//!
//! Farms belong to the user who created them. A farm owned by someone else
//! is reported as not found.

use chrono::{DateTime, NaiveDate, Utc};
use shared::{CreateFarmInput, CropType, Farm, FarmGrid, GeoPoint, UpdateFarmInput};
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};

/// Farm service for managing a user's farms
#[derive(Clone)]
pub struct FarmService {
    db: PgPool,
}

/// Database row for a farm
#[derive(Debug, sqlx::FromRow)]
struct FarmRow {
    id: Uuid,
    owner_id: Uuid,
    name: String,
    latitude: f64,
    longitude: f64,
    area_hectares: f64,
    crop_type: String,
    planting_date: Option<NaiveDate>,
    harvest_date: Option<NaiveDate>,
    notes: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<FarmRow> for Farm {
    type Error = AppError;

    fn try_from(row: FarmRow) -> Result<Self, Self::Error> {
        let crop_type = row
            .crop_type
            .parse::<CropType>()
            .map_err(AppError::Internal)?;

        Ok(Farm {
            id: row.id,
            owner_id: row.owner_id,
            name: row.name,
            location: GeoPoint::new(row.latitude, row.longitude),
            area_hectares: row.area_hectares,
            crop_type,
            planting_date: row.planting_date,
            harvest_date: row.harvest_date,
            notes: row.notes,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

const FARM_COLUMNS: &str = "id, owner_id, name, latitude, longitude, area_hectares, crop_type, \
                            planting_date, harvest_date, notes, created_at, updated_at";

/// Apply an update to a stored farm, producing the full record to validate
fn merge_update(farm: &Farm, input: UpdateFarmInput) -> CreateFarmInput {
    CreateFarmInput {
        name: input.name.unwrap_or_else(|| farm.name.clone()),
        latitude: input.latitude.unwrap_or(farm.location.latitude),
        longitude: input.longitude.unwrap_or(farm.location.longitude),
        area_hectares: input.area_hectares.unwrap_or(farm.area_hectares),
        crop_type: input.crop_type.unwrap_or(farm.crop_type),
        planting_date: input.planting_date.or(farm.planting_date),
        harvest_date: input.harvest_date.or(farm.harvest_date),
        notes: input.notes.or_else(|| farm.notes.clone()),
    }
}

impl FarmService {
    /// Create a new FarmService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// List all farms owned by a user
    pub async fn list_farms(&self, owner_id: Uuid) -> AppResult<Vec<Farm>> {
        let rows = sqlx::query_as::<_, FarmRow>(&format!(
            "SELECT {} FROM farms WHERE owner_id = $1 ORDER BY created_at DESC",
            FARM_COLUMNS
        ))
        .bind(owner_id)
        .fetch_all(&self.db)
        .await?;

        rows.into_iter().map(Farm::try_from).collect()
    }

    /// Get a farm owned by `owner_id`
    pub async fn get_farm(&self, owner_id: Uuid, farm_id: Uuid) -> AppResult<Farm> {
        let row = sqlx::query_as::<_, FarmRow>(&format!(
            "SELECT {} FROM farms WHERE id = $1 AND owner_id = $2",
            FARM_COLUMNS
        ))
        .bind(farm_id)
        .bind(owner_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Farm".to_string()))?;

        Farm::try_from(row)
    }

    /// Get a farm regardless of owner (worker use only)
    pub async fn get_farm_unchecked(&self, farm_id: Uuid) -> AppResult<Farm> {
        let row = sqlx::query_as::<_, FarmRow>(&format!(
            "SELECT {} FROM farms WHERE id = $1",
            FARM_COLUMNS
        ))
        .bind(farm_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Farm".to_string()))?;

        Farm::try_from(row)
    }

    /// Create a new farm
    pub async fn create_farm(&self, owner_id: Uuid, input: CreateFarmInput) -> AppResult<Farm> {
        input.validate()?;

        let row = sqlx::query_as::<_, FarmRow>(&format!(
            r#"
            INSERT INTO farms (id, owner_id, name, latitude, longitude, area_hectares,
                               crop_type, planting_date, harvest_date, notes)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING {}
            "#,
            FARM_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(owner_id)
        .bind(input.name.trim())
        .bind(input.latitude)
        .bind(input.longitude)
        .bind(input.area_hectares)
        .bind(input.crop_type.as_str())
        .bind(input.planting_date)
        .bind(input.harvest_date)
        .bind(&input.notes)
        .fetch_one(&self.db)
        .await?;

        tracing::info!(farm_id = %row.id, area_hectares = row.area_hectares, "farm created");
        Farm::try_from(row)
    }

    /// Update a farm. The merged record must pass the same checks as creation.
    pub async fn update_farm(
        &self,
        owner_id: Uuid,
        farm_id: Uuid,
        input: UpdateFarmInput,
    ) -> AppResult<Farm> {
        input.validate()?;
        let existing = self.get_farm(owner_id, farm_id).await?;
        let merged = merge_update(&existing, input);
        merged.validate()?;

        let row = sqlx::query_as::<_, FarmRow>(&format!(
            r#"
            UPDATE farms
            SET name = $3, latitude = $4, longitude = $5, area_hectares = $6,
                crop_type = $7, planting_date = $8, harvest_date = $9, notes = $10,
                updated_at = NOW()
            WHERE id = $1 AND owner_id = $2
            RETURNING {}
            "#,
            FARM_COLUMNS
        ))
        .bind(farm_id)
        .bind(owner_id)
        .bind(merged.name.trim())
        .bind(merged.latitude)
        .bind(merged.longitude)
        .bind(merged.area_hectares)
        .bind(merged.crop_type.as_str())
        .bind(merged.planting_date)
        .bind(merged.harvest_date)
        .bind(&merged.notes)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Farm".to_string()))?;

        Farm::try_from(row)
    }

    /// Delete a farm; its analyses and zone results go with it
    pub async fn delete_farm(&self, owner_id: Uuid, farm_id: Uuid) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM farms WHERE id = $1 AND owner_id = $2")
            .bind(farm_id)
            .bind(owner_id)
            .execute(&self.db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Farm".to_string()));
        }

        tracing::info!(%farm_id, "farm deleted");
        Ok(())
    }

    /// Zone grid for a farm
    pub async fn get_grid(&self, owner_id: Uuid, farm_id: Uuid) -> AppResult<FarmGrid> {
        let farm = self.get_farm(owner_id, farm_id).await?;
        Ok(FarmGrid::new(farm.location, farm.area_hectares)?)
    }
}
