use axum::{Json, extract::State};
use garde::Validate;
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::models::User;
use crate::state::AppState;

/// サインインリクエスト
#[derive(Debug, Deserialize, Validate)]
pub struct SignInRequest {
    /// メールアドレスまたは電話番号
    #[garde(length(min = 1))]
    pub identifier: String,
    #[garde(length(min = 1))]
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct SignInResponse {
    pub user: User,
}

/// サインインハンドラー
///
/// POST /api/sign-in
///
/// 認証に成功したユーザーを返す（セッションは発行しない）
///
/// # Security
/// - パスワードはログに出力しない
/// - ユーザー不在とパスワード不一致は区別しない
pub async fn sign_in(
    State(state): State<AppState>,
    Json(request): Json<SignInRequest>,
) -> Result<Json<SignInResponse>, AppError> {
    // バリデーション
    request
        .validate()
        .map_err(|_| AppError::Validation("Identifier and password are required".to_string()))?;

    let user = state
        .auth
        .authenticate(&request.identifier, &request.password)
        .await?;

    Ok(Json(SignInResponse { user }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_empty_identifier() {
        let request = SignInRequest {
            identifier: "".to_string(),
            password: "secret123".to_string(),
        };
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_validate_empty_password() {
        let request = SignInRequest {
            identifier: "0555123456".to_string(),
            password: "".to_string(),
        };
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_validate_valid_request() {
        let request = SignInRequest {
            identifier: "amina@example.com".to_string(),
            password: "secret123".to_string(),
        };
        assert!(request.validate().is_ok());
    }
}
