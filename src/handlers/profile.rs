use axum::{
    Json,
    extract::{Path, State},
};
use garde::Validate;
use serde::Deserialize;
use time::{Date, OffsetDateTime};
use uuid::Uuid;

use crate::error::AppError;
use crate::handlers::password_reset::MessageResponse;
use crate::handlers::register::{validate_blood_group, validate_donation_type, validate_phone};
use crate::models::{ProfileUpdate, User, normalize_email, normalize_phone};
use crate::state::AppState;

/// プロフィール更新リクエスト
///
/// 未指定・空文字列の項目は変更しない
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateProfileRequest {
    #[garde(length(min = 2))]
    pub name: Option<String>,
    #[garde(email)]
    pub email: Option<String>,
    #[garde(length(min = 10), custom(validate_optional_phone))]
    pub phone: Option<String>,
    #[garde(custom(validate_optional_blood_group))]
    pub blood_group: Option<String>,
    #[garde(length(min = 1))]
    pub wilaya: Option<String>,
    #[garde(length(min = 1))]
    pub commune: Option<String>,
    #[garde(skip)]
    pub last_donation: Option<Date>,
    #[garde(custom(validate_optional_donation_type))]
    pub donation_type: Option<String>,
    #[garde(skip)]
    pub emergency_available: Option<bool>,
}

impl UpdateProfileRequest {
    /// 空文字列を未指定として扱い、メールアドレス・電話番号を正規化
    fn normalized(self) -> Self {
        let non_blank = |value: Option<String>| {
            value
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        Self {
            name: non_blank(self.name),
            email: non_blank(self.email).map(|v| normalize_email(&v)),
            phone: non_blank(self.phone).map(|v| normalize_phone(&v)),
            blood_group: non_blank(self.blood_group),
            wilaya: non_blank(self.wilaya),
            commune: non_blank(self.commune),
            last_donation: self.last_donation,
            donation_type: non_blank(self.donation_type),
            emergency_available: self.emergency_available,
        }
    }

    fn as_update(&self) -> ProfileUpdate<'_> {
        ProfileUpdate {
            name: self.name.as_deref(),
            email: self.email.as_deref(),
            phone: self.phone.as_deref(),
            blood_group: self.blood_group.as_deref(),
            wilaya: self.wilaya.as_deref(),
            commune: self.commune.as_deref(),
            last_donation: self.last_donation,
            donation_type: self.donation_type.as_deref(),
            emergency_available: self.emergency_available,
        }
    }
}

/// GET /api/users/{id}
pub async fn get_profile(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<User>, AppError> {
    let user = state
        .user_repo
        .find_by_id(user_id)
        .await?
        .ok_or(AppError::UserNotFound)?;

    Ok(Json(user))
}

/// PATCH /api/users/{id}
///
/// メールアドレス・電話番号は他のユーザーと重複できない
pub async fn update_profile(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    Json(request): Json<UpdateProfileRequest>,
) -> Result<Json<User>, AppError> {
    let request = request.normalized();

    // バリデーション
    validate_update_request(&request, OffsetDateTime::now_utc().date())?;

    // 重複チェック（自分自身は除く）
    if let Some(email) = &request.email {
        let existing = state.user_repo.find_by_email(email).await?;
        if taken_by_other(existing.as_ref(), user_id) {
            return Err(AppError::EmailAlreadyExists);
        }
    }
    if let Some(phone) = &request.phone {
        let existing = state.user_repo.find_by_phone(phone).await?;
        if taken_by_other(existing.as_ref(), user_id) {
            return Err(AppError::PhoneAlreadyExists);
        }
    }

    let user = state
        .user_repo
        .update_profile(user_id, &request.as_update(), OffsetDateTime::now_utc())
        .await
        .map_err(AppError::from_unique_violation)?
        .ok_or(AppError::UserNotFound)?;

    tracing::info!(user_id = %user.id, "プロフィール更新");

    Ok(Json(user))
}

/// DELETE /api/users/{id}
///
/// アカウント・検証レコード・ユーザーを同一トランザクションで削除
pub async fn delete_account(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<MessageResponse>, AppError> {
    if !state.user_repo.delete_account(user_id).await? {
        return Err(AppError::UserNotFound);
    }

    tracing::info!(user_id = %user_id, "アカウント削除");

    Ok(Json(MessageResponse {
        message: "Account deleted successfully".to_string(),
    }))
}

fn validate_update_request(request: &UpdateProfileRequest, today: Date) -> Result<(), AppError> {
    request
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    if request.last_donation.is_some_and(|date| date > today) {
        return Err(AppError::Validation(
            "Last donation date cannot be in the future".to_string(),
        ));
    }
    Ok(())
}

fn taken_by_other(existing: Option<&User>, user_id: Uuid) -> bool {
    existing.is_some_and(|user| user.id != user_id)
}

// Option 項目用（None は検証しない）
fn validate_optional_phone(value: &Option<String>, ctx: &()) -> garde::Result {
    value.as_ref().map_or(Ok(()), |v| validate_phone(v, ctx))
}

fn validate_optional_blood_group(value: &Option<String>, ctx: &()) -> garde::Result {
    value.as_ref().map_or(Ok(()), |v| validate_blood_group(v, ctx))
}

fn validate_optional_donation_type(value: &Option<String>, ctx: &()) -> garde::Result {
    value.as_ref().map_or(Ok(()), |v| validate_donation_type(v, ctx))
}
