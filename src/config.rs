use secrecy::SecretBox;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct Config {
    pub database_url: SecretBox<String>,
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// 公開URL（リセットリンクのベース）
    #[serde(default = "default_app_url")]
    pub app_url: String,
    /// CORS 許可オリジン（未設定時は CORS ヘッダーを付与しない）
    #[serde(default)]
    pub cors_allowed_origin: Option<String>,

    // メール送信設定
    pub resend_api_key: Option<SecretBox<String>>,
    #[serde(default = "default_email_from")]
    pub email_from: String,

    // SMTP設定（オプション - email機能有効時のみ使用）
    #[serde(default)]
    pub smtp_host: Option<String>,
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,
    pub smtp_username: Option<SecretBox<String>>,
    pub smtp_password: Option<SecretBox<String>>,

    // パスワードリセット設定
    #[serde(default = "default_password_reset_token_ttl_secs")]
    pub password_reset_token_ttl_secs: i64,
    /// 期限切れトークン削除の実行間隔
    #[serde(default = "default_token_purge_interval_secs")]
    pub token_purge_interval_secs: u64,
}

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 3000;
const DEFAULT_APP_URL: &str = "http://localhost:3000";
const DEFAULT_EMAIL_FROM: &str = "Donate Blood Platform <no-reply@localhost>";
const DEFAULT_SMTP_PORT: u16 = 587;
const DEFAULT_PASSWORD_RESET_TOKEN_TTL_SECS: i64 = 3600;
const DEFAULT_TOKEN_PURGE_INTERVAL_SECS: u64 = 900;

fn default_host() -> String {
    DEFAULT_HOST.to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_app_url() -> String {
    DEFAULT_APP_URL.to_string()
}

fn default_email_from() -> String {
    DEFAULT_EMAIL_FROM.to_string()
}

fn default_smtp_port() -> u16 {
    DEFAULT_SMTP_PORT
}

fn default_password_reset_token_ttl_secs() -> i64 {
    DEFAULT_PASSWORD_RESET_TOKEN_TTL_SECS
}

fn default_token_purge_interval_secs() -> u64 {
    DEFAULT_TOKEN_PURGE_INTERVAL_SECS
}

impl Config {
    pub fn load() -> Result<Self, envy::Error> {
        envy::from_env()
    }
}
