use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::chatmodels::{MediaType, Message};

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct SendMessageDto {
    #[validate(length(max = 2000, message = "Message must be at most 2000 characters"))]
    pub content: Option<String>,

    #[serde(default)]
    pub media_type: MediaType,

    #[validate(url(message = "Invalid media URL"))]
    pub media_url: Option<String>,
}

impl SendMessageDto {
    pub const FIELD_ORDER: &'static [&'static str] = &["content", "media_url"];
}

/// Customer chat is addressed by ref + contact instead of a session.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CustomerMessageDto {
    #[serde(rename = "ref", default)]
    pub reference: String,
    #[serde(default)]
    pub contact: String,
    #[serde(flatten)]
    pub message: SendMessageDto,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CustomerMessagesQuery {
    #[serde(rename = "ref", default)]
    pub reference: String,
    #[serde(default)]
    pub contact: String,
    pub since: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MessagesQuery {
    pub since: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationMessages {
    pub conversation_id: Uuid,
    pub messages: Vec<Message>,
}
