use std::fmt;

use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// パスワードリセット用レコードの identifier タグ
pub const PASSWORD_RESET_IDENTIFIER: &str = "password-reset";

/// 検証レコード（verification テーブル）
///
/// メール認証・パスワードリセットなどで共用され、`identifier` で用途を区別する。
/// パスワードリセットでは `value` が `"<email>:<token>"` 形式になる。
/// 平文トークンを含むため Debug 出力では value を伏せる。
#[derive(Clone, FromRow)]
pub struct VerificationRecord {
    pub id: Uuid,
    pub identifier: String,
    pub value: String,
    pub expires_at: OffsetDateTime,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl VerificationRecord {
    /// パスワードリセット用のレコードを作成
    pub fn password_reset(
        email: &str,
        token: &str,
        expires_at: OffsetDateTime,
        now: OffsetDateTime,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            identifier: PASSWORD_RESET_IDENTIFIER.to_string(),
            value: format!("{}:{}", email, token),
            expires_at,
            created_at: now,
            updated_at: now,
        }
    }

    /// value 末尾（最後の `:` 以降）のトークンが一致するか
    pub fn matches_token(&self, token: &str) -> bool {
        self.value
            .rsplit_once(':')
            .is_some_and(|(_, stored)| stored == token)
    }

    /// value 先頭（最初の `:` より前）のメールアドレス
    pub fn email(&self) -> Option<&str> {
        self.value.split_once(':').map(|(email, _)| email)
    }

    /// `now` が有効期限を過ぎているか（期限ちょうどはまだ有効）
    pub fn is_expired(&self, now: OffsetDateTime) -> bool {
        now > self.expires_at
    }
}

impl fmt::Debug for VerificationRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VerificationRecord")
            .field("id", &self.id)
            .field("identifier", &self.identifier)
            .field("value", &"[REDACTED]")
            .field("expires_at", &self.expires_at)
            .field("created_at", &self.created_at)
            .field("updated_at", &self.updated_at)
            .finish()
    }
}
