use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::services::{AuthError, ResetError};

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("バリデーションエラー: {0}")]
    Validation(String),

    #[error("データベースエラー")]
    Database(#[from] sqlx::Error),

    #[error("内部エラー")]
    Internal(#[from] anyhow::Error),

    #[error("このメールアドレスは既に使用されています")]
    EmailAlreadyExists,

    #[error("この電話番号は既に使用されています")]
    PhoneAlreadyExists,

    #[error("ユーザーが存在しません")]
    UserNotFound,

    #[error("サインインエラー: {0}")]
    SignIn(#[from] AuthError),

    #[error("パスワードリセットエラー: {0}")]
    PasswordReset(#[from] ResetError),
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

impl AppError {
    /// UNIQUE制約違反を重複エラーに変換（同時登録・同時更新）
    pub fn from_unique_violation(e: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &e {
            match db_err.constraint() {
                Some("user_email_key") => return Self::EmailAlreadyExists,
                Some("user_phone_key") => return Self::PhoneAlreadyExists,
                _ => {}
            }
        }
        Self::Database(e)
    }

    fn status_and_message(&self) -> (StatusCode, String) {
        match self {
            Self::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            Self::Database(e) => {
                tracing::error!(error = ?e, "データベースエラー");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An internal error occurred".to_string(),
                )
            }
            Self::Internal(e) => {
                tracing::error!(error = ?e, "内部エラー");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An internal error occurred".to_string(),
                )
            }
            Self::EmailAlreadyExists => (
                StatusCode::CONFLICT,
                "User with this email already exists".to_string(),
            ),
            Self::PhoneAlreadyExists => (
                StatusCode::CONFLICT,
                "User with this phone number already exists".to_string(),
            ),
            Self::UserNotFound => (StatusCode::NOT_FOUND, "User not found".to_string()),
            Self::SignIn(e) => {
                let status = match e {
                    AuthError::InvalidCredentials => StatusCode::UNAUTHORIZED,
                    AuthError::Persistence(cause) => {
                        tracing::error!(error = ?cause, "サインイン: ストアエラー");
                        StatusCode::INTERNAL_SERVER_ERROR
                    }
                    AuthError::Hashing(cause) => {
                        tracing::error!(error = ?cause, "サインイン: ハッシュ照合エラー");
                        StatusCode::INTERNAL_SERVER_ERROR
                    }
                };
                (status, e.to_string())
            }
            Self::PasswordReset(e) => {
                let status = match e {
                    ResetError::NoAccount | ResetError::AccountNotFound => StatusCode::NOT_FOUND,
                    ResetError::InvalidToken | ResetError::ExpiredToken => StatusCode::BAD_REQUEST,
                    ResetError::Delivery(cause) => {
                        tracing::error!(error = ?cause, "メール送信エラー");
                        StatusCode::BAD_GATEWAY
                    }
                    ResetError::Persistence(cause) => {
                        tracing::error!(error = ?cause, "パスワードリセット: ストアエラー");
                        StatusCode::INTERNAL_SERVER_ERROR
                    }
                    ResetError::Hashing(cause) => {
                        tracing::error!(error = ?cause, "パスワードリセット: ハッシュ化エラー");
                        StatusCode::INTERNAL_SERVER_ERROR
                    }
                };
                (status, e.to_string())
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = self.status_and_message();
        (status, Json(ErrorResponse { error: message })).into_response()
    }
}
