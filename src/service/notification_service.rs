// service/notification_service.rs
use std::sync::Arc;

use futures::future::join_all;
use tokio::time::{timeout, Duration};

use crate::{
    config::Config,
    db::{activitydb::ActivityExt, store::Store},
    mail::{
        mails,
        sendmail::{MailError, Mailer, OutgoingMail},
    },
    models::{providermodel::Provider, requestmodel::CustomerRequest},
};

/// What the dispatch fan-out managed to deliver.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchReport {
    pub admin_notified: bool,
    pub providers_notified: usize,
    pub providers_failed: usize,
}

/// Best-effort mail. Every attempt is logged to `mail_log`; no failure
/// ever reaches the caller.
#[derive(Debug, Clone)]
pub struct NotificationService {
    db_client: Arc<dyn Store>,
    mailer: Arc<dyn Mailer>,
    app_url: String,
    admin_email: Option<String>,
    admin_bcc: Vec<String>,
    send_timeout: Duration,
}

impl NotificationService {
    pub fn new(db_client: Arc<dyn Store>, mailer: Arc<dyn Mailer>, config: &Config) -> Self {
        Self {
            db_client,
            mailer,
            app_url: config.app_url.clone(),
            admin_email: config.admin_email.clone(),
            admin_bcc: config.admin_bcc.clone(),
            send_timeout: Duration::from_secs(config.mail_timeout_secs),
        }
    }

    async fn deliver(&self, reference: &str, kind: &str, mail: OutgoingMail) -> bool {
        let result = match timeout(self.send_timeout, self.mailer.send(&mail)).await {
            Ok(result) => result,
            Err(_) => Err(MailError::Timeout(self.send_timeout.as_secs())),
        };

        let error = result.as_ref().err().map(|e| e.to_string());
        match &error {
            None => tracing::info!("Mail {} for {} sent to {}", kind, reference, mail.to),
            Some(e) => tracing::warn!("Mail {} for {} to {} failed: {}", kind, reference, mail.to, e),
        }

        if let Err(e) = self
            .db_client
            .log_mail_attempt(Some(reference), kind, &mail.to, error.is_none(), error.as_deref())
            .await
        {
            tracing::warn!("Failed to record mail attempt for {}: {}", reference, e);
        }

        error.is_none()
    }

    /// Admin summary plus one notice per matched provider, sent concurrently.
    pub async fn notify_new_request(
        &self,
        request: &CustomerRequest,
        providers: &[Provider],
    ) -> DispatchReport {
        let admin = async {
            match &self.admin_email {
                Some(admin_email) => {
                    let mail = mails::admin_summary(
                        admin_email,
                        &self.admin_bcc,
                        request,
                        providers,
                        &self.app_url,
                    );
                    self.deliver(&request.reference, "admin_summary", mail).await
                }
                None => {
                    tracing::debug!("ADMIN_EMAIL not set; skipping summary for {}", request.reference);
                    false
                }
            }
        };

        let notices = join_all(providers.iter().map(|provider| {
            let mail = mails::provider_notice(provider, request, &self.app_url);
            self.deliver(&request.reference, "provider_notice", mail)
        }));

        let (admin_notified, results) = tokio::join!(admin, notices);
        let providers_notified = results.iter().filter(|ok| **ok).count();

        DispatchReport {
            admin_notified,
            providers_notified,
            providers_failed: results.len() - providers_notified,
        }
    }

    pub async fn notify_request_accepted(&self, request: &CustomerRequest) -> bool {
        let mail = mails::request_accepted(request, &self.app_url);
        self.deliver(&request.reference, "request_accepted", mail).await
    }

    pub async fn notify_request_rejected(&self, request: &CustomerRequest, note: Option<&str>) -> bool {
        let mail = mails::request_rejected(request, note);
        self.deliver(&request.reference, "request_rejected", mail).await
    }
}
