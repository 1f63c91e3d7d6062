use argon2::password_hash::SaltString;
use argon2::password_hash::rand_core::OsRng;
use argon2::{Argon2, PasswordHash, PasswordHasher as _, PasswordVerifier};

#[derive(Debug, thiserror::Error)]
#[error("password hash error: {0}")]
pub struct HashError(String);

/// パスワードハッシュ化
pub trait PasswordHasher: Send + Sync {
    fn hash(&self, password: &str) -> Result<String, HashError>;

    /// ハッシュとの照合（不一致は `Ok(false)`、ハッシュ形式の不正は Err）
    fn verify(&self, password: &str, hash: &str) -> Result<bool, HashError>;
}

/// argon2id（ランダムソルト付き、PHC文字列形式）
#[derive(Debug, Default, Clone, Copy)]
pub struct Argon2PasswordHasher;

impl PasswordHasher for Argon2PasswordHasher {
    fn hash(&self, password: &str) -> Result<String, HashError> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| {
                tracing::error!(error = ?e, "パスワードハッシュ生成エラー");
                HashError(e.to_string())
            })?;
        Ok(hash.to_string())
    }

    fn verify(&self, password: &str, hash: &str) -> Result<bool, HashError> {
        let parsed_hash = PasswordHash::new(hash).map_err(|e| {
            tracing::error!(error = ?e, "パスワードハッシュのパースエラー");
            HashError(e.to_string())
        })?;

        Ok(Argon2::default()
            .verify_password(password.as_bytes(), &parsed_hash)
            .is_ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_is_not_plaintext_and_verifies() {
        let hash = Argon2PasswordHasher.hash("NewPass123").unwrap();
        assert_ne!(hash, "NewPass123");
        assert!(hash.starts_with("$argon2id$"));

        let parsed = PasswordHash::new(&hash).unwrap();
        assert!(
            Argon2::default()
                .verify_password(b"NewPass123", &parsed)
                .is_ok()
        );
        assert!(
            Argon2::default()
                .verify_password(b"WrongPass", &parsed)
                .is_err()
        );
    }

    #[test]
    fn test_hash_is_salted() {
        let a = Argon2PasswordHasher.hash("same-password").unwrap();
        let b = Argon2PasswordHasher.hash("same-password").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_verify_matches_only_hashed_password() {
        let hash = Argon2PasswordHasher.hash("secret123").unwrap();
        assert!(Argon2PasswordHasher.verify("secret123", &hash).unwrap());
        assert!(!Argon2PasswordHasher.verify("secret124", &hash).unwrap());
    }

    #[test]
    fn test_verify_rejects_malformed_hash() {
        assert!(Argon2PasswordHasher.verify("secret123", "invalid_hash_format").is_err());
    }
}
