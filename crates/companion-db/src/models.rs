/// Database row types — these map directly to SQLite rows.
/// Distinct from the companion-types wire models to keep the DB layer
/// independent; handlers do the conversion.

pub struct UserRow {
    pub user_id: String,
    pub full_name: String,
    pub email: String,
    pub password: String,
    pub is_verified: bool,
    pub otp: Option<String>,
    pub otp_created_at: Option<String>,
    pub reset_otp: Option<String>,
    pub reset_otp_created_at: Option<String>,
    pub created_at: String,
}

pub struct BotRow {
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
    pub avatar_base64: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Persona fields applied on update. `avatar_base64 = None` keeps the
/// stored avatar.
pub struct BotUpdate<'a> {
    pub name: &'a str,
    pub bio: &'a str,
    pub first_message: &'a str,
    pub situation: &'a str,
    pub back_story: &'a str,
    pub personality: &'a str,
    pub chatting_way: &'a str,
    pub type_of_bot: &'a str,
    pub privacy: &'a str,
    pub avatar_base64: Option<&'a str>,
    pub updated_at: &'a str,
}

pub struct ChatTurnRow {
    pub message_id: String,
    pub chat_id: String,
    pub user_id: String,
    pub bot_id: String,
    pub message: String,
    pub response: String,
    pub is_system_message: bool,
    pub timestamp: String,
    pub bot_avatar_base64: Option<String>,
}
