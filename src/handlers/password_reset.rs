use axum::{
    Json,
    extract::{Query, State},
};
use garde::Validate;
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::services::ResetError;
use crate::state::AppState;

// === リセットリクエスト ===

#[derive(Debug, Deserialize, Validate)]
pub struct ResetRequestRequest {
    #[garde(email)]
    pub email: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

/// POST /api/password/reset-request
///
/// # Security
/// アカウントが存在しない場合は 404 を返す（存在有無が分かる）
pub async fn request_password_reset(
    State(state): State<AppState>,
    Json(request): Json<ResetRequestRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    // バリデーション
    request
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    state
        .password_reset
        .request_reset(&request.email)
        .await?;

    Ok(Json(MessageResponse {
        message: "Password reset email sent successfully".to_string(),
    }))
}

// === トークン検証 ===

#[derive(Debug, Deserialize)]
pub struct ValidateTokenQuery {
    #[serde(default)]
    pub token: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ValidateTokenResponse {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// GET /api/password/reset/validate?token=...
///
/// トークンは消費しない。無効・期限切れは 200 で `valid: false` を返す
pub async fn validate_reset_token(
    State(state): State<AppState>,
    Query(query): Query<ValidateTokenQuery>,
) -> Result<Json<ValidateTokenResponse>, AppError> {
    let token = query.token.unwrap_or_default();

    match state.password_reset.validate_token(&token).await {
        Ok(()) => Ok(Json(ValidateTokenResponse {
            valid: true,
            reason: None,
            error: None,
        })),
        Err(e @ (ResetError::InvalidToken | ResetError::ExpiredToken)) => {
            Ok(Json(ValidateTokenResponse {
                valid: false,
                reason: Some(e.kind()),
                error: Some(e.to_string()),
            }))
        }
        Err(e) => Err(e.into()),
    }
}

// === パスワードリセット実行 ===

#[derive(Debug, Deserialize, Validate)]
pub struct ResetPasswordRequest {
    #[garde(skip)]
    pub token: String,
    #[garde(length(min = 8))]
    pub new_password: String,
}

/// POST /api/password/reset
///
/// # Security
/// - token, new_password はログに出力しない
pub async fn reset_password(
    State(state): State<AppState>,
    Json(request): Json<ResetPasswordRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    // バリデーション
    request
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    state
        .password_reset
        .reset_password(&request.token, &request.new_password)
        .await?;

    Ok(Json(MessageResponse {
        message: "Password reset successfully".to_string(),
    }))
}
