use async_trait::async_trait;
use robbit_core::models::{Image, TileKey, TileStatus};
use sqlx::{PgConnection, Postgres, QueryBuilder};
use std::collections::HashSet;

use super::tiles::lock_tile;
use super::PostgresStore;
use crate::error::{Result, StoreError};
use crate::ports::ImageStore;

const BINDS_PER_ROW: usize = 6;

// Keeps a chunk well under the protocol's limit of 65535 parameters
const INSERT_CHUNK: usize = 1000;
const _: () = assert!(INSERT_CHUNK * BINDS_PER_ROW <= u16::MAX as usize);

async fn select_existing(conn: &mut PgConnection, ids: &[i64]) -> Result<HashSet<i64>> {
    let existing: Vec<i64> = sqlx::query_scalar("SELECT flickr_id FROM images WHERE flickr_id = ANY($1)")
        .bind(ids)
        .fetch_all(conn)
        .await?;
    Ok(existing.into_iter().collect())
}

fn images_insert(chunk: &[Image]) -> QueryBuilder<'_, Postgres> {
    let mut insert = QueryBuilder::new("INSERT INTO images (flickr_id, coords, date_taken, faves, data) ");
    insert.push_values(chunk, |mut b, image| {
        b.push_bind(image.external_id)
            .push("ST_SetSRID(ST_MakePoint(")
            .push_bind_unseparated(image.coords.lon)
            .push_unseparated(", ")
            .push_bind_unseparated(image.coords.lat)
            .push_unseparated("), 4326)")
            .push_bind(image.date_taken)
            .push_bind(i32::try_from(image.popularity).unwrap_or(i32::MAX))
            .push_bind(image.data.clone());
    });
    // Another tile committing concurrently may have inserted the same photo
    insert.push(" ON CONFLICT (flickr_id) DO NOTHING");
    insert
}

#[async_trait]
impl ImageStore for PostgresStore {
    async fn existing_ids(&self, ids: &[i64]) -> Result<HashSet<i64>> {
        if ids.is_empty() {
            return Ok(HashSet::new());
        }
        let mut conn = self.pool().acquire().await?;
        select_existing(&mut conn, ids).await
    }

    async fn commit_tile(&self, key: TileKey, images: Vec<Image>) -> Result<usize> {
        let mut tx = self.begin().await?;

        let (tile_id, status) = lock_tile(tx.conn()?, key).await?;
        if status != TileStatus::ToProbe {
            tx.rollback().await?;
            return Err(StoreError::InvalidTransition { key, status, action: "mark contained" });
        }

        let ids: Vec<i64> = images.iter().map(|i| i.external_id).collect();
        let mut seen = select_existing(tx.conn()?, &ids).await?;
        let fresh: Vec<Image> = images.into_iter().filter(|i| seen.insert(i.external_id)).collect();

        let mut inserted = 0u64;
        for chunk in fresh.chunks(INSERT_CHUNK) {
            let mut insert = images_insert(chunk);
            inserted += insert.build().execute(tx.conn()?).await?.rows_affected();
        }

        sqlx::query("UPDATE tiles SET status = $1 WHERE id = $2")
            .bind(TileStatus::Contained.as_str())
            .bind(tile_id)
            .execute(tx.conn()?)
            .await?;

        tx.commit().await?;
        Ok(inserted as usize)
    }

    async fn count_images(&self) -> Result<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM images")
            .fetch_one(self.pool())
            .await?;
        Ok(count as u64)
    }
}
