use async_trait::async_trait;
use robbit_core::models::{BoundingBox, ScanArea};
use robbit_geo::{multipolygon_from_geojson, multipolygon_to_geojson, validate_area};

use super::PostgresStore;
use crate::error::Result;
use crate::ports::AreaStore;

#[async_trait]
impl AreaStore for PostgresStore {
    async fn get_area(&self, name: &str) -> Result<Option<ScanArea>> {
        let geojson: Option<String> = sqlx::query_scalar("SELECT ST_AsGeoJSON(area) FROM areas WHERE name = $1")
            .bind(name)
            .fetch_optional(self.pool())
            .await?;

        match geojson {
            Some(geojson) => Ok(Some(ScanArea::new(name, multipolygon_from_geojson(&geojson)?)?)),
            None => Ok(None),
        }
    }

    async fn put_area(&self, area: &ScanArea) -> Result<()> {
        validate_area(&area.geometry)?;

        sqlx::query(
            r#"
            INSERT INTO areas (name, area)
            VALUES ($1, ST_Multi(ST_SetSRID(ST_GeomFromGeoJSON($2), 4326)))
            ON CONFLICT (name) DO UPDATE SET area = EXCLUDED.area
            "#,
        )
        .bind(&area.name)
        .bind(multipolygon_to_geojson(&area.geometry))
        .execute(self.pool())
        .await?;
        Ok(())
    }

    async fn list_areas(&self) -> Result<Vec<String>> {
        Ok(sqlx::query_scalar("SELECT name FROM areas ORDER BY name")
            .fetch_all(self.pool())
            .await?)
    }

    async fn area_intersects(&self, name: &str, bbox: &BoundingBox) -> Result<bool> {
        let hit: Option<bool> = sqlx::query_scalar(
            r#"
            SELECT ST_Intersects(ST_MakeEnvelope($2, $3, $4, $5, 4326), area)
            FROM areas WHERE name = $1
            "#,
        )
        .bind(name)
        .bind(bbox.low.lon)
        .bind(bbox.low.lat)
        .bind(bbox.high.lon)
        .bind(bbox.high.lat)
        .fetch_optional(self.pool())
        .await?;
        Ok(hit.unwrap_or(false))
    }
}
