//! Chat endpoints.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State, rejection::JsonRejection},
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::{
    domain::{Chat, ChatId, StoredMessage, UserId},
    ui::{error::ApiError, extractor::AuthenticatedUser, state::AppState},
};

use super::http::json_body;

#[derive(Debug, Deserialize)]
pub struct CreateChatRequest {
    pub chat_name: String,
    #[serde(default)]
    pub member_ids: Vec<String>,
}

/// Paging parameters. Unparseable values fall back to the defaults.
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub limit: Option<String>,
    pub offset: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ChatDto {
    pub id: ChatId,
    pub name: String,
    pub members: Vec<UserId>,
    pub created_by: UserId,
    pub created_at: String,
}

impl From<Chat> for ChatDto {
    fn from(chat: Chat) -> Self {
        Self {
            id: chat.id,
            name: chat.name,
            members: chat.members,
            created_by: chat.created_by,
            created_at: chat.created_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MessageDto {
    pub chat_id: ChatId,
    pub sender: UserId,
    pub content: String,
    pub timestamp: String,
}

impl From<StoredMessage> for MessageDto {
    fn from(message: StoredMessage) -> Self {
        Self {
            chat_id: message.chat_id,
            sender: message.sender,
            content: message.content,
            timestamp: message.created_at.to_rfc3339(),
        }
    }
}

fn parse_chat_id(raw: &str) -> Result<ChatId, ApiError> {
    raw.parse()
        .map_err(|_| ApiError::bad_request("Chat ID is not int"))
}

pub async fn create_chat(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
    body: Result<Json<CreateChatRequest>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let request = json_body(body)?;
    let member_ids = request
        .member_ids
        .into_iter()
        .map(UserId::new)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| ApiError::bad_request(e.to_string()))?;

    let chat = state
        .create_chat_usecase
        .execute(user.user_id, request.chat_name, member_ids)
        .await?;

    Ok(Json(json!({"chat_id": chat.id})))
}

pub async fn get_chats(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
) -> Result<Json<Value>, ApiError> {
    let chats: Vec<ChatDto> = state
        .get_chats_usecase
        .execute(&user.user_id)
        .await?
        .into_iter()
        .map(ChatDto::from)
        .collect();

    Ok(Json(json!({"chats": chats})))
}

pub async fn get_chat_messages(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
    Path(chat_id): Path<String>,
    Query(page): Query<PageQuery>,
) -> Result<Json<Value>, ApiError> {
    let chat_id = parse_chat_id(&chat_id)?;
    let limit = page.limit.and_then(|raw| raw.parse().ok());
    let offset = page.offset.and_then(|raw| raw.parse().ok());

    let messages: Vec<MessageDto> = state
        .get_messages_usecase
        .execute(&user.user_id, chat_id, limit, offset)
        .await?
        .into_iter()
        .map(MessageDto::from)
        .collect();

    Ok(Json(json!({"messages": messages})))
}

pub async fn delete_chat(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
    Path(chat_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let chat_id = parse_chat_id(&chat_id)?;
    state
        .delete_chat_usecase
        .execute(user.user_id, chat_id)
        .await?;

    Ok(Json(json!({"message": "Chat deleted successfully"})))
}
