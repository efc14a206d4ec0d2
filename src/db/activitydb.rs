// db/activitydb.rs
use async_trait::async_trait;
use sqlx::Error;

use super::db::DBClient;
use crate::models::requestmodel::{MailLog, ProviderResponse, StatusHistory};

/// Append-only audit rows. Nothing here is read back to rebuild state.
#[async_trait]
pub trait ActivityExt {
    /// A provider's per-request rejection; never touches the request row.
    async fn record_provider_rejection(
        &self,
        reference: &str,
        provider_id: i64,
        reason: Option<&str>,
    ) -> Result<(), Error>;

    async fn log_mail_attempt(
        &self,
        reference: Option<&str>,
        kind: &str,
        recipient: &str,
        ok: bool,
        error: Option<&str>,
    ) -> Result<(), Error>;

    async fn get_status_history(&self, reference: &str) -> Result<Vec<StatusHistory>, Error>;

    async fn get_provider_responses(&self, reference: &str) -> Result<Vec<ProviderResponse>, Error>;

    async fn get_mail_log(&self, reference: &str) -> Result<Vec<MailLog>, Error>;
}

#[async_trait]
impl ActivityExt for DBClient {
    async fn record_provider_rejection(
        &self,
        reference: &str,
        provider_id: i64,
        reason: Option<&str>,
    ) -> Result<(), Error> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO provider_responses (ref, provider_id, accepted, reason)
            VALUES ($1, $2, FALSE, $3)
            "#,
        )
        .bind(reference)
        .bind(provider_id)
        .bind(reason)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO status_history (ref, event, provider_id, note)
            VALUES ($1, 'rejected', $2, $3)
            "#,
        )
        .bind(reference)
        .bind(provider_id)
        .bind(reason)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn log_mail_attempt(
        &self,
        reference: Option<&str>,
        kind: &str,
        recipient: &str,
        ok: bool,
        error: Option<&str>,
    ) -> Result<(), Error> {
        sqlx::query(
            r#"
            INSERT INTO mail_log (ref, kind, recipient, ok, error)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(reference)
        .bind(kind)
        .bind(recipient)
        .bind(ok)
        .bind(error)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get_status_history(&self, reference: &str) -> Result<Vec<StatusHistory>, Error> {
        sqlx::query_as::<_, StatusHistory>(
            r#"
            SELECT id, ref, event, provider_id, note, created_at
            FROM status_history
            WHERE ref = $1
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(reference)
        .fetch_all(&self.pool)
        .await
    }

    async fn get_provider_responses(&self, reference: &str) -> Result<Vec<ProviderResponse>, Error> {
        sqlx::query_as::<_, ProviderResponse>(
            r#"
            SELECT id, ref, provider_id, accepted, reason, created_at
            FROM provider_responses
            WHERE ref = $1
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(reference)
        .fetch_all(&self.pool)
        .await
    }

    async fn get_mail_log(&self, reference: &str) -> Result<Vec<MailLog>, Error> {
        sqlx::query_as::<_, MailLog>(
            r#"
            SELECT id, ref, kind, recipient, ok, error, created_at
            FROM mail_log
            WHERE ref = $1
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(reference)
        .fetch_all(&self.pool)
        .await
    }
}
