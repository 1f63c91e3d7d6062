use std::sync::Arc;

use sqlx::PgPool;

use crate::config::Config;
use crate::repositories::{UserRepository, VerificationRepository};
use crate::services::email::{EmailError, sender_from_config};
use crate::services::{
    Argon2PasswordHasher, AuthService, PasswordHasher, PasswordResetCoordinator, ResetSettings,
};

/// アプリケーション共有状態
///
/// axum の State として全ハンドラーで共有される。
/// Clone は必須（axum が内部で clone するため）。
#[derive(Clone)]
pub struct AppState {
    /// ユーザー（ドナー）リポジトリ
    pub user_repo: UserRepository,
    /// サインイン
    pub auth: AuthService,
    /// パスワードリセット
    pub password_reset: PasswordResetCoordinator,
}

impl AppState {
    /// 新しい AppState を作成
    pub fn new(db_pool: PgPool, config: &Config) -> Result<Self, EmailError> {
        let user_repo = UserRepository::new(db_pool.clone());
        let verification_repo = VerificationRepository::new(db_pool);
        let mailer = sender_from_config(config)?;
        let accounts = Arc::new(user_repo.clone());
        let hasher: Arc<dyn PasswordHasher> = Arc::new(Argon2PasswordHasher);

        let auth = AuthService::new(accounts.clone(), hasher.clone());
        let password_reset = PasswordResetCoordinator::new(
            accounts,
            Arc::new(verification_repo),
            mailer,
            hasher,
            ResetSettings::from_config(config),
        );

        Ok(Self {
            user_repo,
            auth,
            password_reset,
        })
    }
}
