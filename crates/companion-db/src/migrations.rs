use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS users (
            user_id               TEXT PRIMARY KEY,
            full_name             TEXT NOT NULL,
            email                 TEXT NOT NULL UNIQUE,
            password              TEXT NOT NULL,
            is_verified           INTEGER NOT NULL DEFAULT 0,
            otp                   TEXT,
            otp_created_at        TEXT,
            reset_otp             TEXT,
            reset_otp_created_at  TEXT,
            created_at            TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS bots (
            bot_id         TEXT PRIMARY KEY,
            user_id        TEXT NOT NULL,
            name           TEXT NOT NULL,
            bio            TEXT NOT NULL,
            first_message  TEXT NOT NULL,
            situation      TEXT NOT NULL,
            back_story     TEXT NOT NULL,
            personality    TEXT NOT NULL,
            chatting_way   TEXT NOT NULL,
            type_of_bot    TEXT NOT NULL,
            privacy        TEXT NOT NULL,
            avatar_base64  TEXT,
            created_at     TEXT NOT NULL,
            updated_at     TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_bots_owner
            ON bots(user_id);

        CREATE INDEX IF NOT EXISTS idx_bots_privacy
            ON bots(privacy);

        -- Duplicate message ids are allowed: re-seeding a bot's opening
        -- line may resend the same client-supplied id.
        CREATE TABLE IF NOT EXISTS chats (
            message_id         TEXT NOT NULL,
            chat_id            TEXT NOT NULL,
            user_id            TEXT NOT NULL,
            bot_id             TEXT NOT NULL,
            message            TEXT NOT NULL,
            response           TEXT NOT NULL,
            is_system_message  INTEGER NOT NULL DEFAULT 0,
            timestamp          TEXT NOT NULL,
            bot_avatar_base64  TEXT
        );

        CREATE INDEX IF NOT EXISTS idx_chats_conversation
            ON chats(chat_id, timestamp);
        ",
    )?;

    info!("Database migrations complete");
    Ok(())
}
