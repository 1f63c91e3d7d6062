use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::models::{
    DonorSummary, NewDonor, PASSWORD_RESET_IDENTIFIER, ProfileUpdate, SearchFilters, User,
};
use crate::repositories::{AccountStore, CREDENTIAL_PROVIDER_ID, StoreError, StoredCredential};

#[derive(Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// メールアドレスでユーザーを検索
    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, email, email_verified, phone, phone_verified, blood_group,
                   wilaya, commune, last_donation, donation_type, emergency_available,
                   created_at, updated_at
            FROM "user"
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
    }

    /// 電話番号でユーザーを検索
    pub async fn find_by_phone(&self, phone: &str) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, email, email_verified, phone, phone_verified, blood_group,
                   wilaya, commune, last_donation, donation_type, emergency_available,
                   created_at, updated_at
            FROM "user"
            WHERE phone = $1
            "#,
        )
        .bind(phone)
        .fetch_optional(&self.pool)
        .await
    }

    /// ID でユーザーを検索
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, email, email_verified, phone, phone_verified, blood_group,
                   wilaya, commune, last_donation, donation_type, emergency_available,
                   created_at, updated_at
            FROM "user"
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }

    /// ドナーを登録
    ///
    /// user 行と credential アカウント行を同一トランザクションで作成する
    ///
    /// # Errors
    /// - UNIQUE制約違反時: `sqlx::Error::Database` (constraint = "user_email_key" / "user_phone_key")
    ///   呼び出し側で `AppError` に変換すること
    pub async fn create_donor(
        &self,
        donor: &NewDonor<'_>,
        password_hash: &str,
    ) -> Result<User, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO "user" (id, name, email, phone, blood_group, wilaya, commune,
                                last_donation, donation_type, emergency_available)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING id, name, email, email_verified, phone, phone_verified, blood_group,
                      wilaya, commune, last_donation, donation_type, emergency_available,
                      created_at, updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(donor.name)
        .bind(donor.email)
        .bind(donor.phone)
        .bind(donor.blood_group)
        .bind(donor.wilaya)
        .bind(donor.commune)
        .bind(donor.last_donation)
        .bind(donor.donation_type)
        .bind(donor.emergency_available)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO account (id, user_id, provider_id, password)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user.id)
        .bind(CREDENTIAL_PROVIDER_ID)
        .bind(password_hash)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(user)
    }

    /// プロフィールを部分更新
    ///
    /// # Returns
    /// 更新後のユーザー（存在しない場合は None）
    ///
    /// # Errors
    /// - UNIQUE制約違反時: `sqlx::Error::Database` (constraint = "user_email_key" / "user_phone_key")
    pub async fn update_profile(
        &self,
        id: Uuid,
        update: &ProfileUpdate<'_>,
        updated_at: OffsetDateTime,
    ) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"
            UPDATE "user"
            SET name = COALESCE($2, name),
                email = COALESCE($3, email),
                phone = COALESCE($4, phone),
                blood_group = COALESCE($5, blood_group),
                wilaya = COALESCE($6, wilaya),
                commune = COALESCE($7, commune),
                last_donation = COALESCE($8, last_donation),
                donation_type = COALESCE($9, donation_type),
                emergency_available = COALESCE($10, emergency_available),
                updated_at = $11
            WHERE id = $1
            RETURNING id, name, email, email_verified, phone, phone_verified, blood_group,
                      wilaya, commune, last_donation, donation_type, emergency_available,
                      created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(update.name)
        .bind(update.email)
        .bind(update.phone)
        .bind(update.blood_group)
        .bind(update.wilaya)
        .bind(update.commune)
        .bind(update.last_donation)
        .bind(update.donation_type)
        .bind(update.emergency_available)
        .bind(updated_at)
        .fetch_optional(&self.pool)
        .await
    }

    /// アカウントを削除
    ///
    /// account 行、ユーザーに紐づく verification レコード
    /// （メール・電話番号を identifier とするもの、およびパスワードリセットトークン）、
    /// user 行を同一トランザクションで削除する
    ///
    /// # Returns
    /// 削除した場合 true（ユーザーが存在しない場合 false）
    pub async fn delete_account(&self, id: Uuid) -> Result<bool, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let contact: Option<(String, Option<String>)> = sqlx::query_as(
            r#"
            SELECT email, phone
            FROM "user"
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some((email, phone)) = contact else {
            return Ok(false);
        };

        sqlx::query("DELETE FROM account WHERE user_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            r#"
            DELETE FROM verification
            WHERE identifier = $1
               OR identifier = $2
               OR (identifier = $3 AND split_part(value, ':', 1) = $1)
            "#,
        )
        .bind(&email)
        .bind(phone.as_deref())
        .bind(PASSWORD_RESET_IDENTIFIER)
        .execute(&mut *tx)
        .await?;

        sqlx::query(r#"DELETE FROM "user" WHERE id = $1"#)
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(true)
    }

    /// ドナー検索
    ///
    /// 血液型・地域が未設定のユーザーは対象外。
    /// 緊急対応可能なドナーを優先し、新しい登録順に並べる
    pub async fn search_donors(
        &self,
        filters: &SearchFilters,
    ) -> Result<Vec<DonorSummary>, sqlx::Error> {
        let mut builder = QueryBuilder::<Postgres>::new(
            r#"
            SELECT id, name, blood_group, wilaya, commune, donation_type, phone,
                   last_donation, emergency_available, email_verified, phone_verified
            FROM "user"
            WHERE blood_group IS NOT NULL
              AND wilaya IS NOT NULL
              AND commune IS NOT NULL
            "#,
        );

        if let Some(blood_group) = filters.blood_group() {
            builder.push(" AND blood_group = ");
            builder.push_bind(blood_group.to_string());
        }
        if let Some(wilaya) = filters.wilaya() {
            builder.push(" AND wilaya ILIKE ");
            builder.push_bind(contains_pattern(wilaya));
        }
        if let Some(commune) = filters.commune() {
            builder.push(" AND commune ILIKE ");
            builder.push_bind(contains_pattern(commune));
        }
        if let Some(donation_type) = filters.donation_type() {
            builder.push(" AND donation_type = ");
            builder.push_bind(donation_type.to_string());
        }
        if filters.emergency_only {
            builder.push(" AND emergency_available = TRUE");
        }

        builder.push(" ORDER BY emergency_available DESC, created_at DESC");

        builder
            .build_query_as::<DonorSummary>()
            .fetch_all(&self.pool)
            .await
    }
}

#[async_trait]
impl AccountStore for UserRepository {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        Ok(UserRepository::find_by_email(self, email).await?)
    }

    async fn find_credential(
        &self,
        identifier: &str,
    ) -> Result<Option<StoredCredential>, StoreError> {
        let credential = sqlx::query_as::<_, StoredCredential>(
            r#"
            SELECT u.id, u.name, u.email, u.email_verified, u.phone, u.phone_verified,
                   u.blood_group, u.wilaya, u.commune, u.last_donation, u.donation_type,
                   u.emergency_available, u.created_at, u.updated_at,
                   a.password AS password_hash
            FROM "user" u
            LEFT JOIN account a ON a.user_id = u.id AND a.provider_id = $2
            WHERE u.email = $1 OR u.phone = $1
            LIMIT 1
            "#,
        )
        .bind(identifier)
        .bind(CREDENTIAL_PROVIDER_ID)
        .fetch_optional(&self.pool)
        .await?;

        Ok(credential)
    }

    /// # Note
    /// password_hash はログに出力しないこと
    async fn update_credential(
        &self,
        user_id: Uuid,
        provider_id: &str,
        password_hash: &str,
        updated_at: OffsetDateTime,
    ) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE account
            SET password = $3, updated_at = $4
            WHERE user_id = $1 AND provider_id = $2
            "#,
        )
        .bind(user_id)
        .bind(provider_id)
        .bind(password_hash)
        .bind(updated_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }

        Ok(())
    }
}

/// ILIKE 用の部分一致パターン（% と _ はエスケープ）
fn contains_pattern(value: &str) -> String {
    let escaped = value
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}
