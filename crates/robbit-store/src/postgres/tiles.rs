use async_trait::async_trait;
use robbit_core::models::{SplitOutcome, Tile, TileKey, TileStatus};
use sqlx::{PgConnection, Postgres, QueryBuilder, Row};

use super::PostgresStore;
use crate::error::{Result, StoreError};
use crate::ports::{ResetReport, StatusCount, TileStore};

fn column_u32(row: &sqlx::postgres::PgRow, column: &str) -> Result<u32> {
    let value: i32 = row.try_get(column)?;
    u32::try_from(value).map_err(|_| StoreError::CorruptRow {
        table: "tiles",
        reason: format!("{} is negative: {}", column, value),
    })
}

fn parse_status(raw: &str) -> Result<TileStatus> {
    raw.parse::<TileStatus>()
        .map_err(|e| StoreError::CorruptRow { table: "tiles", reason: e.to_string() })
}

fn row_to_tile(row: &sqlx::postgres::PgRow) -> Result<Tile> {
    let key = TileKey::new(column_u32(row, "depth")?, column_u32(row, "x")?, column_u32(row, "y")?)
        .map_err(|e| StoreError::CorruptRow { table: "tiles", reason: e.to_string() })?;
    let status: String = row.try_get("status")?;

    Ok(Tile { key, parent: key.parent(), status: parse_status(&status)? })
}

/// Lock a tile row for the rest of the transaction and return its id and status
pub(super) async fn lock_tile(conn: &mut PgConnection, key: TileKey) -> Result<(i64, TileStatus)> {
    let row = sqlx::query("SELECT id, status FROM tiles WHERE depth = $1 AND x = $2 AND y = $3 FOR UPDATE")
        .bind(key.depth as i32)
        .bind(key.x as i32)
        .bind(key.y as i32)
        .fetch_optional(conn)
        .await?
        .ok_or(StoreError::TileNotFound(key))?;

    let status: String = row.try_get("status")?;
    Ok((row.try_get("id")?, parse_status(&status)?))
}

fn children_insert(parent_id: i64, children: [TileKey; 4]) -> QueryBuilder<'static, Postgres> {
    let mut insert = QueryBuilder::new("INSERT INTO tiles (parent_id, depth, x, y, status) ");
    insert.push_values(children, |mut b, child| {
        b.push_bind(parent_id)
            .push_bind(child.depth as i32)
            .push_bind(child.x as i32)
            .push_bind(child.y as i32)
            .push_bind(TileStatus::ToProbe.as_str());
    });
    insert.push(" ON CONFLICT (depth, x, y) DO NOTHING");
    insert
}

#[async_trait]
impl TileStore for PostgresStore {
    async fn ensure_root(&self) -> Result<()> {
        let root = TileKey::root();
        sqlx::query(
            r#"
            INSERT INTO tiles (parent_id, depth, x, y, status)
            VALUES (NULL, $1, $2, $3, $4)
            ON CONFLICT (depth, x, y) DO NOTHING
            "#,
        )
        .bind(root.depth as i32)
        .bind(root.x as i32)
        .bind(root.y as i32)
        .bind(TileStatus::ToProbe.as_str())
        .execute(self.pool())
        .await?;
        Ok(())
    }

    async fn get_tile(&self, key: TileKey) -> Result<Option<Tile>> {
        let row = sqlx::query("SELECT depth, x, y, status FROM tiles WHERE depth = $1 AND x = $2 AND y = $3")
            .bind(key.depth as i32)
            .bind(key.x as i32)
            .bind(key.y as i32)
            .fetch_optional(self.pool())
            .await?;

        row.as_ref().map(row_to_tile).transpose()
    }

    async fn tiles_to_probe(&self, depth: u32) -> Result<Vec<Tile>> {
        let rows = sqlx::query(
            r#"
            SELECT depth, x, y, status FROM tiles
            WHERE depth = $1 AND status = $2
            ORDER BY y, x
            "#,
        )
        .bind(depth as i32)
        .bind(TileStatus::ToProbe.as_str())
        .fetch_all(self.pool())
        .await?;

        rows.iter().map(row_to_tile).collect()
    }

    async fn need_children(&self, key: TileKey) -> Result<SplitOutcome> {
        let mut tx = self.begin().await?;
        let (id, status) = lock_tile(tx.conn()?, key).await?;

        if status != TileStatus::ToProbe {
            tx.rollback().await?;
            return Err(StoreError::InvalidTransition { key, status, action: "split" });
        }

        let Some(children) = key.children() else {
            tx.rollback().await?;
            return Ok(SplitOutcome::MaxDepth);
        };

        children_insert(id, children).build().execute(tx.conn()?).await?;

        sqlx::query("UPDATE tiles SET status = $1 WHERE id = $2")
            .bind(TileStatus::Split.as_str())
            .bind(id)
            .execute(tx.conn()?)
            .await?;

        tx.commit().await?;
        tracing::trace!(tile = %key, "Split tile");
        Ok(SplitOutcome::Split)
    }

    async fn status_counts(&self) -> Result<Vec<StatusCount>> {
        let rows = sqlx::query(
            r#"
            SELECT depth, status, COUNT(*) AS count FROM tiles
            GROUP BY depth, status
            ORDER BY depth, status
            "#,
        )
        .fetch_all(self.pool())
        .await?;

        rows.iter()
            .map(|row| {
                let status: String = row.try_get("status")?;
                let count: i64 = row.try_get("count")?;
                Ok(StatusCount {
                    depth: column_u32(row, "depth")?,
                    status: parse_status(&status)?,
                    count: count as u64,
                })
            })
            .collect()
    }

    async fn reset(&self) -> Result<ResetReport> {
        let mut tx = self.begin().await?;

        let deleted = sqlx::query("DELETE FROM tiles WHERE depth > 0")
            .execute(tx.conn()?)
            .await?
            .rows_affected();
        let reset = sqlx::query("UPDATE tiles SET status = $1")
            .bind(TileStatus::ToProbe.as_str())
            .execute(tx.conn()?)
            .await?
            .rows_affected();

        tx.commit().await?;
        Ok(ResetReport { deleted, reset })
    }
}
