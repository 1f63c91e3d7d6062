use std::sync::Arc;

use data_encoding::HEXLOWER;
use rand::RngCore;
use rand::rngs::OsRng;
use time::Duration;

use crate::config::Config;
use crate::models::{PASSWORD_RESET_IDENTIFIER, VerificationRecord, normalize_email};
use crate::repositories::{AccountStore, CREDENTIAL_PROVIDER_ID, StoreError, VerificationStore};
use crate::services::clock::{Clock, SystemClock};
use crate::services::email::{EmailError, EmailMessage, EmailSender};
use crate::services::password::{HashError, PasswordHasher};

/// トークンのバイト長（256ビット）
const TOKEN_BYTES: usize = 32;

/// パスワードリセットの失敗理由
///
/// Display がそのまま利用者向けメッセージになる
#[derive(Debug, thiserror::Error)]
pub enum ResetError {
    #[error("No account found with this email address")]
    NoAccount,

    #[error("Invalid password reset token")]
    InvalidToken,

    #[error("Password reset token has expired")]
    ExpiredToken,

    #[error("Account not found")]
    AccountNotFound,

    #[error("Failed to process password reset request")]
    Persistence(#[from] StoreError),

    #[error("Failed to send password reset email")]
    Delivery(#[from] EmailError),

    #[error("Failed to reset password")]
    Hashing(#[from] HashError),
}

impl ResetError {
    /// 安定した識別タグ
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NoAccount => "no_account",
            Self::InvalidToken => "invalid",
            Self::ExpiredToken => "expired",
            Self::AccountNotFound => "not_found",
            Self::Persistence(_) => "persistence",
            Self::Delivery(_) => "delivery",
            Self::Hashing(_) => "hashing",
        }
    }
}

/// パスワードリセット設定
#[derive(Debug, Clone)]
pub struct ResetSettings {
    /// リセットリンクのベースURL（例: https://donors.example）
    pub app_url: String,
    /// トークンの有効期間
    pub token_ttl: Duration,
}

impl ResetSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            app_url: config.app_url.clone(),
            token_ttl: Duration::seconds(config.password_reset_token_ttl_secs),
        }
    }
}

/// パスワードリセットトークンの発行・検証・使用
///
/// トークンは verification テーブルに `"<email>:<token>"` として保存する。
/// 検証（validate_token）ではトークンを消費せず、reset_password でのみ削除する。
/// 期限切れトークンは検出時に削除する。
#[derive(Clone)]
pub struct PasswordResetCoordinator {
    accounts: Arc<dyn AccountStore>,
    verifications: Arc<dyn VerificationStore>,
    mailer: Arc<dyn EmailSender>,
    hasher: Arc<dyn PasswordHasher>,
    clock: Arc<dyn Clock>,
    settings: ResetSettings,
}

impl PasswordResetCoordinator {
    /// 新しい PasswordResetCoordinator を作成
    pub fn new(
        accounts: Arc<dyn AccountStore>,
        verifications: Arc<dyn VerificationStore>,
        mailer: Arc<dyn EmailSender>,
        hasher: Arc<dyn PasswordHasher>,
        settings: ResetSettings,
    ) -> Self {
        Self {
            accounts,
            verifications,
            mailer,
            hasher,
            clock: Arc::new(SystemClock),
            settings,
        }
    }

    /// 時刻の取得元を差し替える
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// パスワードリセットをリクエスト
    ///
    /// # Security
    /// - トークン（平文）は返却せず、ログにも出力しない
    /// - アカウントが存在しない場合は `NoAccount` を返す（存在有無が分かる）
    ///
    /// メール送信に失敗しても保存済みのレコードは削除しない（再リクエスト可能）
    pub async fn request_reset(&self, email: &str) -> Result<(), ResetError> {
        let email = normalize_email(email);
        tracing::info!(email = %email, "パスワードリセットリクエスト");

        let user = match self.accounts.find_by_email(&email).await? {
            Some(u) => u,
            None => {
                tracing::info!(email = %email, "パスワードリセット: ユーザー不在");
                return Err(ResetError::NoAccount);
            }
        };

        let token = generate_token();
        let now = self.clock.now();
        let record = VerificationRecord::password_reset(
            &user.email,
            &token,
            now + self.settings.token_ttl,
            now,
        );

        self.verifications.insert(&record).await?;

        let reset_url = self.build_reset_url(&token);
        let message = EmailMessage::password_reset(
            &user.email,
            &reset_url,
            self.settings.token_ttl.whole_minutes(),
        );

        if let Err(e) = self.mailer.send(message).await {
            tracing::error!(
                error = ?e,
                record_id = %record.id,
                "パスワードリセットメール送信失敗（トークンは保持）"
            );
            return Err(ResetError::Delivery(e));
        }

        tracing::info!(email = %email, record_id = %record.id, "パスワードリセットメール送信完了");

        Ok(())
    }

    /// トークンを検証（消費しない）
    pub async fn validate_token(&self, token: &str) -> Result<(), ResetError> {
        let record = self.find_live_record(token).await?;
        tracing::debug!(record_id = %record.id, "パスワードリセットトークン有効");
        Ok(())
    }

    /// パスワードをリセット
    ///
    /// トークンの削除（consume）を資格情報の更新より先に行うため、
    /// 更新に失敗した場合もトークンは使用済みになる
    ///
    /// # Security
    /// - トークン・新パスワードはログに出力しない
    pub async fn reset_password(&self, token: &str, new_password: &str) -> Result<(), ResetError> {
        let record = self.find_live_record(token).await?;

        let email = record.email().ok_or_else(|| {
            tracing::warn!(record_id = %record.id, "不正な形式の検証レコード");
            ResetError::InvalidToken
        })?;

        let user = match self.accounts.find_by_email(email).await? {
            Some(u) => u,
            None => {
                tracing::warn!(record_id = %record.id, "トークンに対応するユーザーが存在しない");
                return Err(ResetError::AccountNotFound);
            }
        };

        let password_hash = self.hasher.hash(new_password)?;

        let now = self.clock.now();
        if self.verifications.consume(record.id, now).await?.is_none() {
            tracing::warn!(record_id = %record.id, "トークンは既に使用済みまたは期限切れ");
            return Err(ResetError::InvalidToken);
        }

        self.accounts
            .update_credential(user.id, CREDENTIAL_PROVIDER_ID, &password_hash, now)
            .await
            .map_err(|e| match e {
                StoreError::NotFound => {
                    tracing::warn!(user_id = %user.id, "パスワード認証アカウントが存在しない");
                    ResetError::AccountNotFound
                }
                e => ResetError::Persistence(e),
            })?;

        tracing::info!(user_id = %user.id, "パスワードリセット完了");

        Ok(())
    }

    /// 期限切れトークンを一括削除
    ///
    /// # Returns
    /// 削除された件数
    pub async fn purge_expired(&self) -> Result<u64, ResetError> {
        let deleted = self.verifications.delete_expired(self.clock.now()).await?;
        if deleted > 0 {
            tracing::info!(deleted, "期限切れトークンを削除");
        }
        Ok(deleted)
    }

    /// トークンに一致する有効なレコードを検索
    ///
    /// 期限切れの場合はレコードを削除して `ExpiredToken` を返す
    async fn find_live_record(&self, token: &str) -> Result<VerificationRecord, ResetError> {
        if token.trim().is_empty() {
            return Err(ResetError::InvalidToken);
        }

        let record = self
            .verifications
            .find_all_by_tag(PASSWORD_RESET_IDENTIFIER)
            .await?
            .into_iter()
            .find(|r| r.matches_token(token))
            .ok_or(ResetError::InvalidToken)?;

        if record.is_expired(self.clock.now()) {
            tracing::warn!(record_id = %record.id, "期限切れトークン");
            if let Err(e) = self.verifications.delete_by_id(record.id).await {
                tracing::error!(error = ?e, record_id = %record.id, "期限切れトークンの削除に失敗");
            }
            return Err(ResetError::ExpiredToken);
        }

        Ok(record)
    }

    /// リセットURLを構築
    fn build_reset_url(&self, token: &str) -> String {
        format!(
            "{}/reset-password?token={}",
            self.settings.app_url.trim_end_matches('/'),
            urlencoding::encode(token)
        )
    }
}

/// 32バイトのランダムトークンを生成（16進数）
fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    HEXLOWER.encode(&bytes)
}
