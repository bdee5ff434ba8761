use serde::{Deserialize, Serialize};

use crate::models::ChatTurn;

// -- Auth --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SignupRequest {
    pub full_name: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

#[derive(Debug, Serialize)]
pub struct SignupResponse {
    pub message: String,
    pub email_sent: bool,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub message: String,
    pub user_id: String,
    pub full_name: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

/// One endpoint covers both steps of the reset UX: with `new_password`
/// present the password is replaced, without it the code is only checked.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VerifyResetRequest {
    pub email: String,
    pub otp: String,
    #[serde(default)]
    pub new_password: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EmailVerificationRequest {
    pub email: String,
    pub otp: String,
}

#[derive(Debug, Serialize)]
pub struct StatusMessage {
    pub message: String,
}

// -- Bots --

/// Create and update share the same body shape; on update the stored
/// avatar is kept unless a new non-empty one is supplied.
#[derive(Debug, Deserialize)]
pub struct BotUpsertRequest {
    pub user_id: String,
    pub name: String,
    pub bio: String,
    pub first_message: String,
    pub situation: String,
    pub back_story: String,
    pub personality: String,
    pub chatting_way: String,
    pub type_of_bot: String,
    pub privacy: String,
    #[serde(default)]
    pub avatar_base64: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct BotMutationResponse {
    pub message: String,
    pub bot_id: String,
}

// -- Chat --

#[derive(Debug, Deserialize)]
pub struct AskRequest {
    pub user_id: String,
    pub bot_id: String,
    pub message: String,
    #[serde(default)]
    pub is_system_message: bool,
    #[serde(default)]
    pub response: Option<String>,
    #[serde(default)]
    pub message_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub status: String,
    pub data: Vec<ChatTurn>,
}

#[derive(Debug, Serialize)]
pub struct RestartResponse {
    pub status: String,
    pub message: String,
    pub deleted_count: usize,
}
