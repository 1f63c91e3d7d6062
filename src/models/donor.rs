use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::Date;
use uuid::Uuid;

/// ドナー検索結果（メールアドレスは含めない）
#[derive(Debug, FromRow, Serialize)]
pub struct DonorSummary {
    pub id: Uuid,
    pub name: String,
    pub blood_group: Option<String>,
    pub wilaya: Option<String>,
    pub commune: Option<String>,
    pub donation_type: Option<String>,
    pub phone: Option<String>,
    pub last_donation: Option<Date>,
    pub emergency_available: bool,
    pub email_verified: bool,
    pub phone_verified: bool,
}

/// 新規ドナー登録データ（バリデーション済み）
#[derive(Debug)]
pub struct NewDonor<'a> {
    pub name: &'a str,
    pub email: &'a str,
    pub phone: &'a str,
    pub blood_group: &'a str,
    pub wilaya: &'a str,
    pub commune: &'a str,
    pub last_donation: Option<Date>,
    pub donation_type: &'a str,
    pub emergency_available: bool,
}

/// プロフィール更新データ（バリデーション済み）
///
/// None の項目は変更しない
#[derive(Debug, Default)]
pub struct ProfileUpdate<'a> {
    pub name: Option<&'a str>,
    pub email: Option<&'a str>,
    pub phone: Option<&'a str>,
    pub blood_group: Option<&'a str>,
    pub wilaya: Option<&'a str>,
    pub commune: Option<&'a str>,
    pub last_donation: Option<Date>,
    pub donation_type: Option<&'a str>,
    pub emergency_available: Option<bool>,
}

/// ドナー検索条件
///
/// 空文字列の条件は指定なしとして扱う
#[derive(Debug, Default, Deserialize)]
pub struct SearchFilters {
    pub blood_group: Option<String>,
    pub wilaya: Option<String>,
    pub commune: Option<String>,
    pub donation_type: Option<String>,
    #[serde(default)]
    pub emergency_only: bool,
}

impl SearchFilters {
    pub fn blood_group(&self) -> Option<&str> {
        non_blank(&self.blood_group)
    }

    pub fn wilaya(&self) -> Option<&str> {
        non_blank(&self.wilaya)
    }

    pub fn commune(&self) -> Option<&str> {
        non_blank(&self.commune)
    }

    pub fn donation_type(&self) -> Option<&str> {
        non_blank(&self.donation_type)
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_filters_are_ignored() {
        let filters = SearchFilters {
            blood_group: Some("  ".to_string()),
            wilaya: Some("".to_string()),
            commune: None,
            donation_type: Some("Blood".to_string()),
            emergency_only: false,
        };
        assert_eq!(filters.blood_group(), None);
        assert_eq!(filters.wilaya(), None);
        assert_eq!(filters.commune(), None);
        assert_eq!(filters.donation_type(), Some("Blood"));
    }

    #[test]
    fn test_filters_are_trimmed() {
        let filters = SearchFilters {
            wilaya: Some(" Alger ".to_string()),
            ..Default::default()
        };
        assert_eq!(filters.wilaya(), Some("Alger"));
    }
}
