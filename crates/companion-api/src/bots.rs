use axum::{
    Json,
    extract::{Path, Query, State},
};
use chrono::Utc;
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use companion_db::models::{BotRow, BotUpdate};
use companion_types::api::{BotMutationResponse, BotUpsertRequest};
use companion_types::models::BotPersona;

use crate::AppState;
use crate::error::{ApiError, ApiResult};

#[derive(Debug, Deserialize)]
pub struct OwnerQuery {
    pub user_id: String,
}

fn to_persona(row: BotRow) -> BotPersona {
    BotPersona {
        bot_id: row.bot_id,
        user_id: row.user_id,
        name: row.name,
        bio: row.bio,
        first_message: row.first_message,
        situation: row.situation,
        back_story: row.back_story,
        personality: row.personality,
        chatting_way: row.chatting_way,
        type_of_bot: row.type_of_bot,
        privacy: row.privacy,
        avatar_base64: row.avatar_base64,
        created_at: row.created_at,
        updated_at: row.updated_at,
    }
}

pub async fn create_bot(
    State(state): State<AppState>,
    Json(req): Json<BotUpsertRequest>,
) -> ApiResult<Json<BotMutationResponse>> {
    let bot_id = Uuid::new_v4().to_string();
    let now = Utc::now().to_rfc3339();

    state.db.insert_bot(&BotRow {
        bot_id: bot_id.clone(),
        user_id: req.user_id.clone(),
        name: req.name,
        bio: req.bio,
        first_message: req.first_message,
        situation: req.situation,
        back_story: req.back_story,
        personality: req.personality,
        chatting_way: req.chatting_way,
        type_of_bot: req.type_of_bot,
        privacy: req.privacy,
        avatar_base64: req.avatar_base64,
        created_at: now.clone(),
        updated_at: now,
    })?;
    info!("bot {} created by user {}", bot_id, req.user_id);

    Ok(Json(BotMutationResponse {
        message: "Bot created successfully".into(),
        bot_id,
    }))
}

pub async fn list_public_bots(State(state): State<AppState>) -> ApiResult<Json<Vec<BotPersona>>> {
    let bots = state.db.list_public_bots()?;
    Ok(Json(bots.into_iter().map(to_persona).collect()))
}

pub async fn list_my_bots(
    State(state): State<AppState>,
    Query(query): Query<OwnerQuery>,
) -> ApiResult<Json<Vec<BotPersona>>> {
    let bots = state.db.list_bots_by_owner(&query.user_id)?;
    Ok(Json(bots.into_iter().map(to_persona).collect()))
}

pub async fn get_bot(
    State(state): State<AppState>,
    Path(bot_id): Path<String>,
) -> ApiResult<Json<BotPersona>> {
    let bot = state
        .db
        .get_bot(&bot_id)?
        .ok_or_else(|| ApiError::NotFound("Bot not found".into()))?;
    Ok(Json(to_persona(bot)))
}

pub async fn update_bot(
    State(state): State<AppState>,
    Path(bot_id): Path<String>,
    Json(req): Json<BotUpsertRequest>,
) -> ApiResult<Json<BotMutationResponse>> {
    let existing = state
        .db
        .get_bot(&bot_id)?
        .ok_or_else(|| ApiError::NotFound("Bot not found".into()))?;

    if existing.user_id != req.user_id {
        return Err(ApiError::Forbidden(
            "You don't have permission to update this bot".into(),
        ));
    }

    // Empty avatar means "keep the one already stored"
    let avatar = req.avatar_base64.as_deref().filter(|a| !a.is_empty());

    state.db.update_bot(
        &bot_id,
        &BotUpdate {
            name: &req.name,
            bio: &req.bio,
            first_message: &req.first_message,
            situation: &req.situation,
            back_story: &req.back_story,
            personality: &req.personality,
            chatting_way: &req.chatting_way,
            type_of_bot: &req.type_of_bot,
            privacy: &req.privacy,
            avatar_base64: avatar,
            updated_at: &Utc::now().to_rfc3339(),
        },
    )?;
    info!("bot {} updated by user {}", bot_id, req.user_id);

    Ok(Json(BotMutationResponse {
        message: "Bot updated successfully".into(),
        bot_id,
    }))
}

pub async fn delete_bot(
    State(state): State<AppState>,
    Path(bot_id): Path<String>,
    Query(query): Query<OwnerQuery>,
) -> ApiResult<Json<BotMutationResponse>> {
    let existing = state
        .db
        .get_bot(&bot_id)?
        .ok_or_else(|| ApiError::NotFound("Bot not found".into()))?;

    if existing.user_id != query.user_id {
        return Err(ApiError::Forbidden(
            "You don't have permission to delete this bot".into(),
        ));
    }

    state.db.delete_bot(&bot_id)?;
    info!("bot {} deleted by user {}", bot_id, query.user_id);

    Ok(Json(BotMutationResponse {
        message: "Bot deleted successfully".into(),
        bot_id,
    }))
}
