// models/chatmodels.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "sender_role", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum SenderRole {
    Customer,
    Provider,
    System,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, sqlx::Type, PartialEq, Eq, Default)]
#[sqlx(type_name = "media_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum MediaType {
    #[default]
    Text,
    Image,
    Voice,
    Location,
}

#[derive(Debug, Serialize, Clone, Deserialize, sqlx::FromRow)]
pub struct Conversation {
    pub id: Uuid,
    pub request_id: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone)]
pub struct Message {
    pub id: Uuid,
    pub conversation_id: Uuid,
    pub sender_role: SenderRole,
    pub media_type: MediaType,
    pub content: String,
    pub media_url: Option<String>,
    pub created_at: DateTime<Utc>,
}
