#[cfg(test)]
pub mod memory;
pub mod user;
pub mod verification;

#[cfg(test)]
pub use memory::{InMemoryAccountStore, InMemoryVerificationStore};
pub use user::UserRepository;
pub use verification::VerificationRepository;

use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::models::{User, VerificationRecord};

/// パスワード認証アカウントのプロバイダータグ
pub const CREDENTIAL_PROVIDER_ID: &str = "credential";

/// サインイン照合用のユーザーと credential アカウントのパスワードハッシュ
///
/// ハッシュを含むため Debug は実装しない
#[derive(Clone, sqlx::FromRow)]
pub struct StoredCredential {
    #[sqlx(flatten)]
    pub user: User,
    /// credential アカウントがない（ソーシャルログインのみ）場合は None
    pub password_hash: Option<String>,
}

/// ストア層のエラー
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error")]
    Database(#[from] sqlx::Error),

    #[error("record not found")]
    NotFound,

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// アカウントストア
///
/// パスワードリセットとサインインで必要な範囲（ユーザー検索と資格情報の参照・更新）
#[async_trait]
pub trait AccountStore: Send + Sync {
    /// メールアドレスでユーザーを検索
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    /// メールアドレスまたは電話番号でユーザーと credential ハッシュを検索
    async fn find_credential(
        &self,
        identifier: &str,
    ) -> Result<Option<StoredCredential>, StoreError>;

    /// 指定プロバイダーのアカウントのパスワードハッシュを更新
    ///
    /// # Errors
    /// 該当アカウントが存在しない場合は `StoreError::NotFound`
    async fn update_credential(
        &self,
        user_id: Uuid,
        provider_id: &str,
        password_hash: &str,
        updated_at: OffsetDateTime,
    ) -> Result<(), StoreError>;
}

/// 検証レコードストア
#[async_trait]
pub trait VerificationStore: Send + Sync {
    async fn insert(&self, record: &VerificationRecord) -> Result<(), StoreError>;

    /// identifier タグが一致するレコードを全件取得
    async fn find_all_by_tag(&self, tag: &str) -> Result<Vec<VerificationRecord>, StoreError>;

    /// ID でレコードを削除
    ///
    /// # Returns
    /// 削除した場合 true
    async fn delete_by_id(&self, id: Uuid) -> Result<bool, StoreError>;

    /// 有効期限内のレコードを削除して返す（アトミック）
    ///
    /// 同一トークンの同時使用に対して、成功するのは1回だけ
    async fn consume(
        &self,
        id: Uuid,
        now: OffsetDateTime,
    ) -> Result<Option<VerificationRecord>, StoreError>;

    /// 期限切れレコードを削除
    ///
    /// # Returns
    /// 削除された行数
    async fn delete_expired(&self, now: OffsetDateTime) -> Result<u64, StoreError>;
}
