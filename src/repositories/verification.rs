use async_trait::async_trait;
use sqlx::PgPool;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::models::VerificationRecord;
use crate::repositories::{StoreError, VerificationStore};

#[derive(Clone)]
pub struct VerificationRepository {
    pool: PgPool,
}

impl VerificationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl VerificationStore for VerificationRepository {
    async fn insert(&self, record: &VerificationRecord) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO verification (id, identifier, value, expires_at, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(record.id)
        .bind(&record.identifier)
        .bind(&record.value)
        .bind(record.expires_at)
        .bind(record.created_at)
        .bind(record.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_all_by_tag(&self, tag: &str) -> Result<Vec<VerificationRecord>, StoreError> {
        let records = sqlx::query_as::<_, VerificationRecord>(
            r#"
            SELECT id, identifier, value, expires_at, created_at, updated_at
            FROM verification
            WHERE identifier = $1
            "#,
        )
        .bind(tag)
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }

    async fn delete_by_id(&self, id: Uuid) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r#"
            DELETE FROM verification
            WHERE id = $1
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// 単一の DELETE ... RETURNING で取得と削除を同時に行う
    async fn consume(
        &self,
        id: Uuid,
        now: OffsetDateTime,
    ) -> Result<Option<VerificationRecord>, StoreError> {
        let record = sqlx::query_as::<_, VerificationRecord>(
            r#"
            DELETE FROM verification
            WHERE id = $1 AND expires_at >= $2
            RETURNING id, identifier, value, expires_at, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    async fn delete_expired(&self, now: OffsetDateTime) -> Result<u64, StoreError> {
        let result = sqlx::query(
            r#"
            DELETE FROM verification
            WHERE expires_at < $1
            "#,
        )
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}
