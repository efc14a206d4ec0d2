// service/chat_service.rs
use std::sync::Arc;

use chrono::{DateTime, Utc};
use uuid::Uuid;
use validator::Validate;

use crate::{
    db::{chatdb::ChatExt, store::Store},
    dtos::{chatdtos::*, first_invalid_field},
    models::{
        chatmodels::{Conversation, MediaType, Message, SenderRole},
        requestmodel::CustomerRequest,
    },
    service::{
        error::{DbContext, ServiceError},
        lookup::{request_by_ref, request_for_contact},
    },
    utils::{reference::normalize_ref, sanitize::{contains_contact_info, sanitize_message}},
};

pub const MESSAGE_PAGE_LIMIT: i64 = 500;

#[derive(Debug, Clone)]
pub struct ChatService {
    db_client: Arc<dyn Store>,
}

impl ChatService {
    pub fn new(db_client: Arc<dyn Store>) -> Self {
        Self { db_client }
    }

    /// Appends a message. Text is scrubbed of contact details before it is
    /// stored, whatever the sender.
    pub async fn send_message(
        &self,
        conversation_id: Uuid,
        sender_role: SenderRole,
        body: SendMessageDto,
    ) -> Result<Message, ServiceError> {
        body.validate()
            .map_err(|e| first_invalid_field(&e, SendMessageDto::FIELD_ORDER))?;

        let content = body.content.as_deref().map(str::trim).unwrap_or("");
        let media_url = body
            .media_url
            .as_deref()
            .map(str::trim)
            .filter(|u| !u.is_empty());

        match body.media_type {
            MediaType::Text | MediaType::Location if content.is_empty() => {
                return Err(ServiceError::MissingFields)
            }
            MediaType::Image | MediaType::Voice if media_url.is_none() => {
                return Err(ServiceError::MissingFields)
            }
            _ => {}
        }

        self.db_client
            .get_conversation(conversation_id)
            .await
            .db("db_read_failed")?
            .ok_or(ServiceError::NotFound("Conversation"))?;

        if contains_contact_info(content) {
            tracing::info!("Masked contact details in conversation {}", conversation_id);
        }
        let content = sanitize_message(content);
        let message = self
            .db_client
            .append_message(conversation_id, sender_role, body.media_type, &content, media_url)
            .await
            .db("db_insert_failed")?;

        tracing::debug!(
            "Message {} appended to conversation {}",
            message.id,
            conversation_id
        );
        Ok(message)
    }

    pub async fn list_messages(
        &self,
        conversation_id: Uuid,
        since: Option<DateTime<Utc>>,
    ) -> Result<ConversationMessages, ServiceError> {
        let messages = self
            .db_client
            .get_messages(conversation_id, since, MESSAGE_PAGE_LIMIT)
            .await
            .db("db_read_failed")?;

        Ok(ConversationMessages {
            conversation_id,
            messages,
        })
    }

    async fn conversation_for(&self, request: &CustomerRequest) -> Result<Conversation, ServiceError> {
        if request.accepted_provider_id.is_none() {
            return Err(ServiceError::ChatUnavailable);
        }
        self.db_client
            .get_or_create_conversation(request.id)
            .await
            .db("db_insert_failed")
    }

    pub async fn customer_conversation(
        &self,
        reference: &str,
        contact: &str,
    ) -> Result<Conversation, ServiceError> {
        let request = request_for_contact(self.db_client.as_ref(), reference, contact).await?;
        self.conversation_for(&request).await
    }

    pub async fn provider_conversation(
        &self,
        reference: &str,
        provider_id: i64,
    ) -> Result<Conversation, ServiceError> {
        let reference = normalize_ref(reference);
        let request = request_by_ref(self.db_client.as_ref(), &reference).await?;
        if !request.is_accepted_by(provider_id) {
            return Err(ServiceError::Unauthorized(provider_id, reference));
        }
        self.conversation_for(&request).await
    }

    pub async fn send_customer_message(
        &self,
        body: CustomerMessageDto,
    ) -> Result<Message, ServiceError> {
        let conversation = self
            .customer_conversation(&body.reference, &body.contact)
            .await?;
        self.send_message(conversation.id, SenderRole::Customer, body.message)
            .await
    }

    pub async fn send_provider_message(
        &self,
        reference: &str,
        provider_id: i64,
        body: SendMessageDto,
    ) -> Result<Message, ServiceError> {
        let conversation = self.provider_conversation(reference, provider_id).await?;
        self.send_message(conversation.id, SenderRole::Provider, body)
            .await
    }

    pub async fn customer_messages(
        &self,
        query: CustomerMessagesQuery,
    ) -> Result<ConversationMessages, ServiceError> {
        let conversation = self
            .customer_conversation(&query.reference, &query.contact)
            .await?;
        self.list_messages(conversation.id, query.since).await
    }

    pub async fn provider_messages(
        &self,
        reference: &str,
        provider_id: i64,
        since: Option<DateTime<Utc>>,
    ) -> Result<ConversationMessages, ServiceError> {
        let conversation = self.provider_conversation(reference, provider_id).await?;
        self.list_messages(conversation.id, since).await
    }
}
