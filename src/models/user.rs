use serde::Serialize;
use sqlx::FromRow;
use time::{Date, OffsetDateTime};
use uuid::Uuid;

/// 登録ユーザー（献血ドナーのプロフィールを含む）
///
/// パスワードハッシュは account テーブル側に保持する
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub email_verified: bool,
    pub phone: Option<String>,
    pub phone_verified: bool,
    pub blood_group: Option<String>,
    pub wilaya: Option<String>,
    pub commune: Option<String>,
    pub last_donation: Option<Date>,
    pub donation_type: Option<String>,
    pub emergency_available: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}
