use serde::{Deserialize, Serialize};

/// A user-authored bot persona. Serialized verbatim in bot responses,
/// so the field names here are the public wire contract.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotPersona {
    pub bot_id: String,
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
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_base64: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// One message/response turn in a conversation. `message` is empty for
/// system-originated turns (a bot's scripted opening line).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatTurn {
    pub message_id: String,
    pub chat_id: String,
    pub user_id: String,
    pub bot_id: String,
    pub message: String,
    pub response: String,
    pub is_system_message: bool,
    /// RFC 3339 UTC, normalized on read.
    pub timestamp: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bot_avatar_base64: Option<String>,
}
