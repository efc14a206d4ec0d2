use std::fmt;

use async_trait::async_trait;
use serde_json::json;
use thiserror::Error;
use tokio::time::{sleep, Duration};

use crate::{config::Config, utils::contact::is_valid_email};

const MAX_RETRIES: u32 = 3;
const RETRY_DELAY_MS: u64 = 500;
const RESEND_ENDPOINT: &str = "https://api.resend.com/emails";

#[derive(Debug, Clone, PartialEq)]
pub struct OutgoingMail {
    pub to: String,
    pub bcc: Vec<String>,
    pub subject: String,
    pub text: String,
    pub html: String,
}

#[derive(Debug, Error)]
pub enum MailError {
    #[error("Invalid email address: {0}")]
    InvalidRecipient(String),

    #[error("No mail transport is configured")]
    NotConfigured,

    #[error("Resend API error: {0}")]
    Provider(String),

    #[error("SMTP send failed: {0}")]
    Smtp(String),

    #[error("Mail send timed out after {0}s")]
    Timeout(u64),
}

/// Outbound mail collaborator. Returns a provider message id on success.
#[async_trait]
pub trait Mailer: Send + Sync + fmt::Debug {
    async fn send(&self, mail: &OutgoingMail) -> Result<String, MailError>;
}

#[derive(Debug, Clone)]
struct SmtpSettings {
    host: String,
    port: u16,
    username: String,
    password: String,
}

/// Resend HTTP API with retries, falling back to SMTP when configured.
#[derive(Clone)]
pub struct ResendMailer {
    client: reqwest::Client,
    api_key: Option<String>,
    from: String,
    smtp: Option<SmtpSettings>,
}

impl fmt::Debug for ResendMailer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResendMailer")
            .field("resend", &self.api_key.is_some())
            .field("from", &self.from)
            .field("smtp", &self.smtp.as_ref().map(|s| s.host.as_str()))
            .finish()
    }
}

impl ResendMailer {
    pub fn new(config: &Config) -> Self {
        let smtp = config.smtp_host.as_ref().map(|host| SmtpSettings {
            host: host.clone(),
            port: config.smtp_port,
            username: config.smtp_username.clone(),
            password: config.smtp_password.clone(),
        });

        Self {
            client: reqwest::Client::new(),
            api_key: config.resend_api_key.clone(),
            from: config.from_email.clone(),
            smtp,
        }
    }

    async fn send_with_retries(&self, api_key: &str, mail: &OutgoingMail) -> Result<String, MailError> {
        let mut last_error = None;

        for attempt in 1..=MAX_RETRIES {
            match self.send_via_resend(api_key, mail).await {
                Ok(id) => return Ok(id),
                Err(e) => {
                    last_error = Some(e);
                    if attempt < MAX_RETRIES {
                        let delay = RETRY_DELAY_MS * 2_u64.pow(attempt - 1);
                        tracing::warn!(
                            "Email send attempt {} failed for {}. Retrying in {}ms...",
                            attempt,
                            mail.to,
                            delay
                        );
                        sleep(Duration::from_millis(delay)).await;
                    }
                }
            }
        }

        Err(last_error.unwrap_or_else(|| MailError::Provider("unknown error".to_string())))
    }

    async fn send_via_resend(&self, api_key: &str, mail: &OutgoingMail) -> Result<String, MailError> {
        let mut body = json!({
            "from": self.from,
            "to": mail.to,
            "subject": mail.subject,
            "html": mail.html,
            "text": mail.text,
        });
        if !mail.bcc.is_empty() {
            body["bcc"] = json!(mail.bcc);
        }

        let response = self
            .client
            .post(RESEND_ENDPOINT)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| MailError::Provider(format!("network error: {}", e)))?;

        let status = response.status();
        let text = response.text().await.unwrap_or_default();

        if !status.is_success() {
            return Err(MailError::Provider(format!("{}: {}", status.as_u16(), text)));
        }

        let id = serde_json::from_str::<serde_json::Value>(&text)
            .ok()
            .and_then(|v| v.get("id").and_then(|id| id.as_str()).map(str::to_string))
            .unwrap_or_else(|| "sent".to_string());
        Ok(id)
    }

    async fn send_via_smtp(&self, settings: SmtpSettings, mail: &OutgoingMail) -> Result<String, MailError> {
        use lettre::{
            message::{Mailbox, MultiPart},
            transport::smtp::authentication::Credentials,
            Message, SmtpTransport, Transport,
        };

        let parse = |address: &str| {
            address
                .parse::<Mailbox>()
                .map_err(|_| MailError::InvalidRecipient(address.to_string()))
        };

        let mut builder = Message::builder()
            .from(parse(&self.from)?)
            .to(parse(&mail.to)?)
            .subject(mail.subject.clone());
        for bcc in &mail.bcc {
            builder = builder.bcc(parse(bcc)?);
        }
        let message = builder
            .multipart(MultiPart::alternative_plain_html(
                mail.text.clone(),
                mail.html.clone(),
            ))
            .map_err(|e| MailError::Smtp(e.to_string()))?;

        // lettre's SmtpTransport blocks
        let result = tokio::task::spawn_blocking(move || {
            let transport = SmtpTransport::relay(&settings.host)
                .map_err(|e| MailError::Smtp(e.to_string()))?
                .port(settings.port)
                .credentials(Credentials::new(settings.username, settings.password))
                .build();
            transport
                .send(&message)
                .map(|response| response.code().to_string())
                .map_err(|e| MailError::Smtp(e.to_string()))
        })
        .await
        .map_err(|e| MailError::Smtp(e.to_string()))?;

        result
    }
}

#[async_trait]
impl Mailer for ResendMailer {
    async fn send(&self, mail: &OutgoingMail) -> Result<String, MailError> {
        validate_recipients(mail)?;

        let resend_result = match &self.api_key {
            Some(api_key) => Some(self.send_with_retries(api_key, mail).await),
            None => None,
        };

        match (resend_result, self.smtp.clone()) {
            (Some(Ok(id)), _) => {
                tracing::info!("Email sent to {} (id: {})", mail.to, id);
                Ok(id)
            }
            (Some(Err(e)), Some(smtp)) => {
                tracing::warn!("Resend failed for {}: {}. Falling back to SMTP", mail.to, e);
                self.send_via_smtp(smtp, mail).await
            }
            (Some(Err(e)), None) => Err(e),
            (None, Some(smtp)) => self.send_via_smtp(smtp, mail).await,
            (None, None) => Err(MailError::NotConfigured),
        }
    }
}

pub fn validate_recipients(mail: &OutgoingMail) -> Result<(), MailError> {
    std::iter::once(&mail.to)
        .chain(mail.bcc.iter())
        .find(|address| !is_valid_email(address))
        .map_or(Ok(()), |bad| Err(MailError::InvalidRecipient(bad.clone())))
}
