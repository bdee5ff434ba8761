use axum::{
    Json,
    extract::{Query, State},
    response::IntoResponse,
};
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Deserialize;
use serde_json::json;
use tracing::{error, info};
use uuid::Uuid;

use companion_db::models::{BotRow, ChatTurnRow};
use companion_types::api::{AskRequest, HistoryResponse, RestartResponse};
use companion_types::models::ChatTurn;

use crate::AppState;
use crate::error::{ApiError, ApiResult};

#[derive(Debug, Deserialize)]
pub struct ConversationQuery {
    pub user_id: String,
    pub bot_id: String,
}

/// Exactly one conversation per user/bot pair.
fn conversation_id(user_id: &str, bot_id: &str) -> String {
    format!("{}_{}", user_id, bot_id)
}

fn build_prompt(bot: &BotRow, user_message: &str) -> String {
    format!(
        "You are an AI bot named {name} with the following details:\n\
         Personality: {personality}\n\
         Situation: {situation}\n\
         Backstory: {back_story}\n\
         Chatting Style: {chatting_way}\n\
         Your role is like a {type_of_bot}.\n\
         \n\
         Respond naturally, casually, like a human texting, with short one-line replies — \
         no long paragraphs, no formal tone, just chill and real.\n\
         \n\
         Start the chat from the perspective of {name} and continue accordingly.\n\
         \n\
         User: {user_message}\n\
         AI:",
        name = bot.name,
        personality = bot.personality,
        situation = bot.situation,
        back_story = bot.back_story,
        chatting_way = bot.chatting_way,
        type_of_bot = bot.type_of_bot,
    )
}

/// Stored values are RFC 3339; older rows may carry SQLite's
/// "YYYY-MM-DD HH:MM:SS" form. Anything unreadable becomes "now" —
/// lossy, but history rendering must not fail on one bad row.
fn normalize_timestamp(raw: &str) -> String {
    raw.parse::<DateTime<Utc>>()
        .or_else(|_| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
        .map(|dt| dt.to_rfc3339())
        .unwrap_or_else(|_| Utc::now().to_rfc3339())
}

pub async fn ask(
    State(state): State<AppState>,
    Json(req): Json<AskRequest>,
) -> ApiResult<impl IntoResponse> {
    let chat_id = conversation_id(&req.user_id, &req.bot_id);

    let db = state.clone();
    let bot_id = req.bot_id.clone();
    let bot = tokio::task::spawn_blocking(move || db.db.get_bot(&bot_id))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            ApiError::Internal(e.into())
        })??
        .ok_or_else(|| ApiError::NotFound("Bot not found".into()))?;

    let message_id = req
        .message_id
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    // A system turn with a supplied response (a bot's scripted opening
    // line) is stored verbatim — the generator is never consulted.
    if req.is_system_message {
        if let Some(response) = req.response {
            let turn = ChatTurnRow {
                message_id,
                chat_id,
                user_id: req.user_id,
                bot_id: req.bot_id,
                message: req.message,
                response,
                is_system_message: true,
                timestamp: Utc::now().to_rfc3339(),
                bot_avatar_base64: bot.avatar_base64,
            };
            let db = state.clone();
            tokio::task::spawn_blocking(move || db.db.insert_turn(&turn))
                .await
                .map_err(|e| {
                    error!("spawn_blocking join error: {}", e);
                    ApiError::Internal(e.into())
                })??;

            return Ok(Json(json!({
                "status": "success",
                "message": "System message stored"
            })));
        }
    }

    let prompt = build_prompt(&bot, &req.message);
    let response = state
        .generator
        .generate(&prompt)
        .await
        .map_err(|e| ApiError::Upstream(e.to_string()))?;

    let turn = ChatTurnRow {
        message_id,
        chat_id,
        user_id: req.user_id,
        bot_id: req.bot_id,
        message: req.message,
        response: response.clone(),
        is_system_message: false,
        timestamp: Utc::now().to_rfc3339(),
        bot_avatar_base64: bot.avatar_base64,
    };
    let db = state.clone();
    tokio::task::spawn_blocking(move || db.db.insert_turn(&turn))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            ApiError::Internal(e.into())
        })??;

    Ok(Json(json!({
        "status": "success",
        "response": response
    })))
}

pub async fn history(
    State(state): State<AppState>,
    Query(query): Query<ConversationQuery>,
) -> ApiResult<Json<HistoryResponse>> {
    let chat_id = conversation_id(&query.user_id, &query.bot_id);

    let db = state.clone();
    let id = chat_id.clone();
    let rows = tokio::task::spawn_blocking(move || db.db.get_turns(&id))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            ApiError::Internal(e.into())
        })??;

    let data = rows
        .into_iter()
        .map(|row| ChatTurn {
            message_id: row.message_id,
            chat_id: row.chat_id,
            user_id: row.user_id,
            bot_id: row.bot_id,
            message: row.message,
            response: row.response,
            is_system_message: row.is_system_message,
            timestamp: normalize_timestamp(&row.timestamp),
            bot_avatar_base64: row.bot_avatar_base64,
        })
        .collect();

    Ok(Json(HistoryResponse {
        status: "success".into(),
        data,
    }))
}

pub async fn restart(
    State(state): State<AppState>,
    Query(query): Query<ConversationQuery>,
) -> ApiResult<Json<RestartResponse>> {
    let chat_id = conversation_id(&query.user_id, &query.bot_id);

    let db = state.clone();
    let id = chat_id.clone();
    let deleted = tokio::task::spawn_blocking(move || db.db.delete_turns(&id))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            ApiError::Internal(e.into())
        })??;

    info!("cleared {} turns for conversation {}", deleted, chat_id);

    Ok(Json(RestartResponse {
        status: "success".into(),
        message: "Chat history cleared successfully".into(),
        deleted_count: deleted,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conversation_id_is_deterministic() {
        assert_eq!(conversation_id("u1", "b1"), "u1_b1");
        assert_eq!(conversation_id("u1", "b1"), conversation_id("u1", "b1"));
        assert_ne!(conversation_id("u1", "b2"), conversation_id("u1", "b1"));
    }

    #[test]
    fn normalize_accepts_rfc3339_and_sqlite_forms() {
        assert_eq!(
            normalize_timestamp("2026-01-01T10:20:30+00:00"),
            "2026-01-01T10:20:30+00:00"
        );
        assert_eq!(
            normalize_timestamp("2026-01-01 10:20:30"),
            "2026-01-01T10:20:30+00:00"
        );
    }

    #[test]
    fn normalize_falls_back_to_now_on_garbage() {
        let normalized = normalize_timestamp("not-a-date");
        assert!(normalized.parse::<DateTime<Utc>>().is_ok());
    }

    #[test]
    fn prompt_embeds_persona_fields_and_message() {
        let bot = BotRow {
            bot_id: "b1".into(),
            user_id: "u1".into(),
            name: "Rex".into(),
            bio: "a good boy".into(),
            first_message: "woof".into(),
            situation: "park".into(),
            back_story: "found as a stray".into(),
            personality: "loyal".into(),
            chatting_way: "short barks".into(),
            type_of_bot: "pet".into(),
            privacy: "private".into(),
            avatar_base64: None,
            created_at: String::new(),
            updated_at: String::new(),
        };

        let prompt = build_prompt(&bot, "who's a good boy?");
        assert!(prompt.contains("named Rex"));
        assert!(prompt.contains("Personality: loyal"));
        assert!(prompt.contains("Your role is like a pet."));
        assert!(prompt.contains("User: who's a good boy?"));
        assert!(prompt.ends_with("AI:"));
    }
}
