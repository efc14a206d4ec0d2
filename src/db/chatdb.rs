// db/chatdb.rs
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::Error;
use uuid::Uuid;

use super::db::DBClient;
use crate::models::chatmodels::*;

#[async_trait]
pub trait ChatExt {
    async fn get_or_create_conversation(&self, request_id: i64) -> Result<Conversation, Error>;

    async fn get_conversation(&self, conversation_id: Uuid) -> Result<Option<Conversation>, Error>;

    async fn find_conversation_for_request(
        &self,
        request_id: i64,
    ) -> Result<Option<Conversation>, Error>;

    /// Content must already be sanitized; this layer stores what it is given.
    async fn append_message(
        &self,
        conversation_id: Uuid,
        sender_role: SenderRole,
        media_type: MediaType,
        content: &str,
        media_url: Option<&str>,
    ) -> Result<Message, Error>;

    /// Oldest first.
    async fn get_messages(
        &self,
        conversation_id: Uuid,
        since: Option<DateTime<Utc>>,
        limit: i64,
    ) -> Result<Vec<Message>, Error>;
}

#[async_trait]
impl ChatExt for DBClient {
    async fn get_or_create_conversation(&self, request_id: i64) -> Result<Conversation, Error> {
        let existing = self.find_conversation_for_request(request_id).await?;
        if let Some(conversation) = existing {
            return Ok(conversation);
        }

        sqlx::query(
            r#"
            INSERT INTO conversations (request_id)
            VALUES ($1)
            ON CONFLICT (request_id) DO NOTHING
            "#,
        )
        .bind(request_id)
        .execute(&self.pool)
        .await?;

        // a concurrent creator may have won; either way one row exists now
        sqlx::query_as::<_, Conversation>(
            r#"
            SELECT id, request_id, created_at
            FROM conversations
            WHERE request_id = $1
            "#,
        )
        .bind(request_id)
        .fetch_one(&self.pool)
        .await
    }

    async fn get_conversation(&self, conversation_id: Uuid) -> Result<Option<Conversation>, Error> {
        sqlx::query_as::<_, Conversation>(
            r#"
            SELECT id, request_id, created_at
            FROM conversations
            WHERE id = $1
            "#,
        )
        .bind(conversation_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn find_conversation_for_request(
        &self,
        request_id: i64,
    ) -> Result<Option<Conversation>, Error> {
        sqlx::query_as::<_, Conversation>(
            r#"
            SELECT id, request_id, created_at
            FROM conversations
            WHERE request_id = $1
            "#,
        )
        .bind(request_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn append_message(
        &self,
        conversation_id: Uuid,
        sender_role: SenderRole,
        media_type: MediaType,
        content: &str,
        media_url: Option<&str>,
    ) -> Result<Message, Error> {
        sqlx::query_as::<_, Message>(
            r#"
            INSERT INTO messages (conversation_id, sender_role, media_type, content, media_url)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, conversation_id, sender_role, media_type, content, media_url, created_at
            "#,
        )
        .bind(conversation_id)
        .bind(sender_role)
        .bind(media_type)
        .bind(content)
        .bind(media_url)
        .fetch_one(&self.pool)
        .await
    }

    async fn get_messages(
        &self,
        conversation_id: Uuid,
        since: Option<DateTime<Utc>>,
        limit: i64,
    ) -> Result<Vec<Message>, Error> {
        sqlx::query_as::<_, Message>(
            r#"
            SELECT id, conversation_id, sender_role, media_type, content, media_url, created_at
            FROM messages
            WHERE conversation_id = $1
              AND ($2::timestamptz IS NULL OR created_at > $2)
            ORDER BY created_at ASC, id ASC
            LIMIT $3
            "#,
        )
        .bind(conversation_id)
        .bind(since)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
    }
}
