use std::sync::LazyLock;

use regex::Regex;

/// 国際形式（`+` 任意、先頭 1-9、計 2〜15 桁）または 0 始まりの国内形式（計 10〜15 桁）
static PHONE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\+?[1-9]\d{1,14}|0\d{9,14})$").expect("phone pattern is a valid regex")
});

/// メールアドレスの正規化（前後の空白除去・小文字化）
///
/// 登録・サインイン・プロフィール更新・パスワードリセットの全経路でこれを通す
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// 電話番号の正規化（空白を除去）
pub fn normalize_phone(phone: &str) -> String {
    phone.chars().filter(|c| !c.is_whitespace()).collect()
}

/// 正規化済みの電話番号が受け付け可能な形式か
pub fn is_valid_phone(phone: &str) -> bool {
    PHONE_PATTERN.is_match(phone)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_email() {
        assert_eq!(normalize_email("  Alice@Example.COM "), "alice@example.com");
    }

    #[test]
    fn test_normalize_phone_strips_whitespace() {
        assert_eq!(normalize_phone("0555 12 34 56"), "0555123456");
        assert_eq!(normalize_phone("+213 555\t123 456"), "+213555123456");
    }

    #[test]
    fn test_phone_formats() {
        assert!(is_valid_phone("0555123456"));
        assert!(is_valid_phone("+213555123456"));
        assert!(is_valid_phone("213555123456"));
        assert!(is_valid_phone("+12"));
        assert!(!is_valid_phone("055512345"));
        assert!(!is_valid_phone("0555123456789012"));
        assert!(!is_valid_phone("+0555123456"));
        assert!(!is_valid_phone("0555-123-456"));
        assert!(!is_valid_phone("+1234567890123456"));
        assert!(!is_valid_phone(""));
    }
}
