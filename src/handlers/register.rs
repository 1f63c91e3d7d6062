use axum::{Json, extract::State};
use garde::Validate;
use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};
use uuid::Uuid;

use crate::error::AppError;
use crate::models::{NewDonor, is_valid_phone, normalize_email, normalize_phone};
use crate::services::{Argon2PasswordHasher, PasswordHasher};
use crate::state::AppState;

pub const BLOOD_GROUPS: [&str; 8] = ["A+", "A-", "B+", "B-", "AB+", "AB-", "O+", "O-"];
pub const DONATION_TYPES: [&str; 2] = ["Blood", "Blood & Platelets"];

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[garde(length(min = 2))]
    pub full_name: String,
    #[garde(custom(validate_blood_group))]
    pub blood_group: String,
    #[garde(email)]
    pub email: String,
    #[garde(length(min = 6))]
    pub password: String, // SecretBox不要（Deserialize後すぐハッシュ化）
    #[garde(matches(password))]
    pub confirm_password: String,
    #[garde(length(min = 10), custom(validate_phone))]
    pub phone: String,
    #[garde(length(min = 1))]
    pub wilaya: String,
    #[garde(length(min = 1))]
    pub commune: String,
    #[garde(skip)]
    pub last_donation: Option<Date>,
    #[garde(custom(validate_donation_type))]
    pub donation_type: String,
    #[serde(default)]
    #[garde(skip)]
    pub emergency_available: bool,
}

impl RegisterRequest {
    /// メールアドレスを正規化
    fn normalized(mut self) -> Self {
        self.email = normalize_email(&self.email);
        self
    }
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// ドナー登録ハンドラー
///
/// POST /api/register
///
/// # Security
/// - パスワードはログに出力しない
/// - パスワードは即座にハッシュ化
pub async fn register(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> Result<Json<RegisterResponse>, AppError> {
    let request = request.normalized();

    // バリデーション
    validate_register_request(&request, OffsetDateTime::now_utc().date())?;

    let phone = normalize_phone(&request.phone);

    // 重複チェック
    if state.user_repo.find_by_email(&request.email).await?.is_some() {
        return Err(AppError::EmailAlreadyExists);
    }
    if state.user_repo.find_by_phone(&phone).await?.is_some() {
        return Err(AppError::PhoneAlreadyExists);
    }

    // パスワードハッシュ化
    let password_hash = Argon2PasswordHasher
        .hash(&request.password)
        .map_err(|e| AppError::Internal(e.into()))?;

    let donor = NewDonor {
        name: request.full_name.trim(),
        email: &request.email,
        phone: &phone,
        blood_group: &request.blood_group,
        wilaya: request.wilaya.trim(),
        commune: request.commune.trim(),
        last_donation: request.last_donation,
        donation_type: &request.donation_type,
        emergency_available: request.emergency_available,
    };

    let user = state
        .user_repo
        .create_donor(&donor, &password_hash)
        .await
        .map_err(AppError::from_unique_violation)?;

    tracing::info!(email = %request.email, user_id = %user.id, "ドナー登録成功");

    Ok(Json(RegisterResponse {
        id: user.id,
        name: user.name,
        email: user.email,
        created_at: user.created_at,
    }))
}

/// 登録リクエストのバリデーション
fn validate_register_request(request: &RegisterRequest, today: Date) -> Result<(), AppError> {
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

pub(crate) fn validate_blood_group(value: &String, _: &()) -> garde::Result {
    if BLOOD_GROUPS.contains(&value.as_str()) {
        Ok(())
    } else {
        Err(garde::Error::new("Please select a valid blood group"))
    }
}

pub(crate) fn validate_donation_type(value: &String, _: &()) -> garde::Result {
    if DONATION_TYPES.contains(&value.as_str()) {
        Ok(())
    } else {
        Err(garde::Error::new("Please select a valid donation type"))
    }
}

pub(crate) fn validate_phone(value: &String, _: &()) -> garde::Result {
    if is_valid_phone(&normalize_phone(value)) {
        Ok(())
    } else {
        Err(garde::Error::new(
            "Please enter a valid phone number (e.g., +1234567890)",
        ))
    }
}
