use std::sync::Arc;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretBox};
use serde::Serialize;

use crate::config::Config;

const RESEND_API_URL: &str = "https://api.resend.com/emails";

#[derive(Debug, thiserror::Error)]
pub enum EmailError {
    #[error("email API request failed")]
    Http(#[from] reqwest::Error),

    #[error("email API rejected the message: {status}")]
    Rejected { status: u16, body: String },

    #[error("invalid email address: {0}")]
    InvalidAddress(String),

    #[error("SMTP error: {0}")]
    Smtp(String),
}

/// 送信するメール
#[derive(Debug, Clone)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub html: String,
}

impl EmailMessage {
    /// パスワードリセットメール
    ///
    /// # Security
    /// reset_url には平文トークンが含まれるため、この値をログに出力しないこと
    pub fn password_reset(to: &str, reset_url: &str, valid_minutes: i64) -> Self {
        Self {
            to: to.to_string(),
            subject: "Reset your password - Donate Blood Platform".to_string(),
            html: format!(
                concat!(
                    "<h2>Password Reset Request</h2>",
                    "<p>Hello,</p>",
                    "<p>You requested to reset your password. ",
                    "Click the link below to reset your password:</p>",
                    "<p><a href=\"{url}\">Reset Password</a></p>",
                    "<p>If you didn't request this password reset, please ignore this email.</p>",
                    "<p>This link will expire in {minutes} minutes.</p>"
                ),
                url = reset_url,
                minutes = valid_minutes,
            ),
        }
    }
}

/// メール送信
#[async_trait]
pub trait EmailSender: Send + Sync {
    async fn send(&self, message: EmailMessage) -> Result<(), EmailError>;
}

/// 設定に応じて送信手段を選択
///
/// SMTP（email 機能有効時）→ Resend API → ログ出力のみ、の順
pub fn sender_from_config(config: &Config) -> Result<Arc<dyn EmailSender>, EmailError> {
    #[cfg(feature = "email")]
    {
        if let Some(sender) = SmtpEmailSender::from_config(config)? {
            tracing::info!("メール送信: SMTP");
            return Ok(Arc::new(sender));
        }
    }

    if let Some(api_key) = &config.resend_api_key {
        tracing::info!("メール送信: Resend API");
        return Ok(Arc::new(ResendEmailSender::new(
            SecretBox::new(Box::new(api_key.expose_secret().clone())),
            config.email_from.clone(),
        )));
    }

    tracing::warn!("メール送信設定なし: ログ出力のみ（開発モード）");
    Ok(Arc::new(LogEmailSender))
}

/// 開発用: メールを送信せずログ出力のみ
#[derive(Debug, Default, Clone, Copy)]
pub struct LogEmailSender;

#[async_trait]
impl EmailSender for LogEmailSender {
    async fn send(&self, message: EmailMessage) -> Result<(), EmailError> {
        // 本文にはトークンが含まれるため宛先と件名のみ
        tracing::info!(
            to = %message.to,
            subject = %message.subject,
            "メール送信（開発モード）"
        );
        Ok(())
    }
}

#[derive(Serialize)]
struct ResendRequest<'a> {
    from: &'a str,
    to: [&'a str; 1],
    subject: &'a str,
    html: &'a str,
}

/// Resend API によるメール送信
pub struct ResendEmailSender {
    client: reqwest::Client,
    api_key: SecretBox<String>,
    from: String,
}

impl ResendEmailSender {
    pub fn new(api_key: SecretBox<String>, from: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            from,
        }
    }
}

#[async_trait]
impl EmailSender for ResendEmailSender {
    async fn send(&self, message: EmailMessage) -> Result<(), EmailError> {
        let response = self
            .client
            .post(RESEND_API_URL)
            .bearer_auth(self.api_key.expose_secret())
            .json(&ResendRequest {
                from: &self.from,
                to: [&message.to],
                subject: &message.subject,
                html: &message.html,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "Resend API エラー");
            return Err(EmailError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        tracing::info!(to = %message.to, "メール送信完了（Resend）");
        Ok(())
    }
}

#[cfg(feature = "email")]
pub use smtp::SmtpEmailSender;

#[cfg(feature = "email")]
mod smtp {
    use async_trait::async_trait;
    use lettre::message::header::ContentType;
    use lettre::message::Mailbox;
    use lettre::transport::smtp::authentication::Credentials;
    use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
    use secrecy::ExposeSecret;

    use super::{EmailError, EmailMessage, EmailSender};
    use crate::config::Config;

    /// SMTP によるメール送信（STARTTLS）
    pub struct SmtpEmailSender {
        transport: AsyncSmtpTransport<Tokio1Executor>,
        from: Mailbox,
    }

    impl SmtpEmailSender {
        /// SMTP設定がすべて揃っている場合のみ作成
        pub fn from_config(config: &Config) -> Result<Option<Self>, EmailError> {
            let (Some(host), Some(username), Some(password)) = (
                &config.smtp_host,
                &config.smtp_username,
                &config.smtp_password,
            ) else {
                return Ok(None);
            };

            let from = config
                .email_from
                .parse::<Mailbox>()
                .map_err(|e| EmailError::InvalidAddress(e.to_string()))?;

            let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)
                .map_err(|e| EmailError::Smtp(e.to_string()))?
                .port(config.smtp_port)
                .credentials(Credentials::new(
                    username.expose_secret().clone(),
                    password.expose_secret().clone(),
                ))
                .build();

            Ok(Some(Self { transport, from }))
        }
    }

    #[async_trait]
    impl EmailSender for SmtpEmailSender {
        async fn send(&self, message: EmailMessage) -> Result<(), EmailError> {
            let to = message
                .to
                .parse::<Mailbox>()
                .map_err(|e| EmailError::InvalidAddress(e.to_string()))?;

            let email = Message::builder()
                .from(self.from.clone())
                .to(to)
                .subject(message.subject)
                .header(ContentType::TEXT_HTML)
                .body(message.html)
                .map_err(|e| EmailError::Smtp(e.to_string()))?;

            self.transport.send(email).await.map_err(|e| {
                tracing::error!(error = ?e, "SMTP送信エラー");
                EmailError::Smtp(e.to_string())
            })?;

            tracing::info!(to = %message.to, "メール送信完了（SMTP）");
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_password_reset_message_contains_link() {
        let url = "https://donors.example/reset-password?token=abc";
        let message = EmailMessage::password_reset("alice@example.com", url, 60);
        assert_eq!(message.to, "alice@example.com");
        assert!(message.html.contains(url));
        assert!(message.html.contains("60 minutes"));
    }

    #[test]
    fn test_password_reset_body_omits_recipient() {
        let to = "<script>x</script>@example.com";
        let message = EmailMessage::password_reset(to, "https://donors.example/r", 60);
        assert_eq!(message.to, to);
        assert!(!message.html.contains("<script>"));
    }

    #[tokio::test]
    async fn test_log_sender_always_succeeds() {
        let message = EmailMessage::password_reset("a@example.com", "http://x", 60);
        assert!(LogEmailSender.send(message).await.is_ok());
    }
}
