use std::sync::Arc;

use crate::models::{User, normalize_email, normalize_phone};
use crate::repositories::{AccountStore, StoreError};
use crate::services::password::{HashError, PasswordHasher};

/// ユーザー不在・credential なしの場合に照合するダミーハッシュ
const DUMMY_HASH: &str = "$argon2id$v=19$m=19456,t=2,p=1$c29tZXNhbHQ$RWh6";

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Invalid email/phone or password")]
    InvalidCredentials,

    #[error("Failed to sign in")]
    Persistence(#[from] StoreError),

    #[error("Failed to sign in")]
    Hashing(#[from] HashError),
}

/// 認証サービス
///
/// セッションの発行は行わず、照合に成功したユーザーを返すのみ
#[derive(Clone)]
pub struct AuthService {
    accounts: Arc<dyn AccountStore>,
    hasher: Arc<dyn PasswordHasher>,
}

impl AuthService {
    /// 新しい AuthService を作成
    pub fn new(accounts: Arc<dyn AccountStore>, hasher: Arc<dyn PasswordHasher>) -> Self {
        Self { accounts, hasher }
    }

    /// メールアドレスまたは電話番号とパスワードで認証
    ///
    /// タイミング攻撃対策: ユーザーが存在しない場合もダミーのパスワード検証を実行
    pub async fn authenticate(&self, identifier: &str, password: &str) -> Result<User, AuthError> {
        let identifier = normalize_identifier(identifier);
        if identifier.is_empty() || password.is_empty() {
            return Err(AuthError::InvalidCredentials);
        }

        let Some(credential) = self.accounts.find_credential(&identifier).await? else {
            let _ = self.hasher.verify(password, DUMMY_HASH);
            tracing::warn!(identifier = %identifier, "認証失敗: ユーザー不在");
            return Err(AuthError::InvalidCredentials);
        };

        // ソーシャルログインのみのユーザー（パスワードなし）
        let Some(password_hash) = credential.password_hash.as_deref() else {
            let _ = self.hasher.verify(password, DUMMY_HASH);
            tracing::warn!(user_id = %credential.user.id, "認証失敗: パスワード未設定");
            return Err(AuthError::InvalidCredentials);
        };

        if self.hasher.verify(password, password_hash)? {
            tracing::info!(user_id = %credential.user.id, "認証成功");
            Ok(credential.user)
        } else {
            tracing::warn!(user_id = %credential.user.id, "認証失敗: パスワード不一致");
            Err(AuthError::InvalidCredentials)
        }
    }
}

/// `@` を含めばメールアドレス、それ以外は電話番号として正規化
fn normalize_identifier(identifier: &str) -> String {
    if identifier.contains('@') {
        normalize_email(identifier)
    } else {
        normalize_phone(identifier)
    }
}
