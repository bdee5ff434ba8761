use crate::Database;
use crate::models::{BotRow, BotUpdate, ChatTurnRow, UserRow};
use anyhow::Result;
use rusqlite::Connection;

impl Database {
    // -- Users --

    pub fn create_user(
        &self,
        user_id: &str,
        full_name: &str,
        email: &str,
        password_hash: &str,
    ) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO users (user_id, full_name, email, password) VALUES (?1, ?2, ?3, ?4)",
                (user_id, full_name, email, password_hash),
            )?;
            Ok(())
        })
    }

    pub fn get_user_by_email(&self, email: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user_by_email(conn, email))
    }

    pub fn set_signup_otp(&self, email: &str, code: &str, issued_at: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE users SET otp = ?2, otp_created_at = ?3 WHERE email = ?1",
                (email, code, issued_at),
            )?;
            Ok(())
        })
    }

    /// Flip the verification flag and consume the signup code.
    pub fn mark_verified(&self, email: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE users SET is_verified = 1, otp = NULL, otp_created_at = NULL
                 WHERE email = ?1",
                [email],
            )?;
            Ok(())
        })
    }

    pub fn set_reset_otp(&self, email: &str, code: &str, issued_at: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE users SET reset_otp = ?2, reset_otp_created_at = ?3 WHERE email = ?1",
                (email, code, issued_at),
            )?;
            Ok(())
        })
    }

    /// Replace the password hash and consume the reset code in one statement.
    pub fn update_password(&self, email: &str, password_hash: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE users SET password = ?2, reset_otp = NULL, reset_otp_created_at = NULL
                 WHERE email = ?1",
                (email, password_hash),
            )?;
            Ok(())
        })
    }

    // -- Bots --

    pub fn insert_bot(&self, bot: &BotRow) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO bots (bot_id, user_id, name, bio, first_message, situation,
                                   back_story, personality, chatting_way, type_of_bot,
                                   privacy, avatar_base64, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
                rusqlite::params![
                    bot.bot_id,
                    bot.user_id,
                    bot.name,
                    bot.bio,
                    bot.first_message,
                    bot.situation,
                    bot.back_story,
                    bot.personality,
                    bot.chatting_way,
                    bot.type_of_bot,
                    bot.privacy,
                    bot.avatar_base64,
                    bot.created_at,
                    bot.updated_at,
                ],
            )?;
            Ok(())
        })
    }

    pub fn get_bot(&self, bot_id: &str) -> Result<Option<BotRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!("{BOT_SELECT} WHERE bot_id = ?1"))?;
            let row = stmt.query_row([bot_id], bot_from_row).optional()?;
            Ok(row)
        })
    }

    pub fn list_public_bots(&self) -> Result<Vec<BotRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!("{BOT_SELECT} WHERE privacy = 'public'"))?;
            let rows = stmt
                .query_map([], bot_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn list_bots_by_owner(&self, user_id: &str) -> Result<Vec<BotRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!("{BOT_SELECT} WHERE user_id = ?1"))?;
            let rows = stmt
                .query_map([user_id], bot_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn update_bot(&self, bot_id: &str, update: &BotUpdate) -> Result<()> {
        self.with_conn(|conn| {
            // COALESCE keeps the stored avatar when no new one is supplied
            conn.execute(
                "UPDATE bots SET name = ?2, bio = ?3, first_message = ?4, situation = ?5,
                                 back_story = ?6, personality = ?7, chatting_way = ?8,
                                 type_of_bot = ?9, privacy = ?10,
                                 avatar_base64 = COALESCE(?11, avatar_base64),
                                 updated_at = ?12
                 WHERE bot_id = ?1",
                rusqlite::params![
                    bot_id,
                    update.name,
                    update.bio,
                    update.first_message,
                    update.situation,
                    update.back_story,
                    update.personality,
                    update.chatting_way,
                    update.type_of_bot,
                    update.privacy,
                    update.avatar_base64,
                    update.updated_at,
                ],
            )?;
            Ok(())
        })
    }

    pub fn delete_bot(&self, bot_id: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute("DELETE FROM bots WHERE bot_id = ?1", [bot_id])?;
            Ok(())
        })
    }

    // -- Chat turns --

    pub fn insert_turn(&self, turn: &ChatTurnRow) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO chats (message_id, chat_id, user_id, bot_id, message, response,
                                    is_system_message, timestamp, bot_avatar_base64)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                rusqlite::params![
                    turn.message_id,
                    turn.chat_id,
                    turn.user_id,
                    turn.bot_id,
                    turn.message,
                    turn.response,
                    turn.is_system_message,
                    turn.timestamp,
                    turn.bot_avatar_base64,
                ],
            )?;
            Ok(())
        })
    }

    pub fn get_turns(&self, chat_id: &str) -> Result<Vec<ChatTurnRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT message_id, chat_id, user_id, bot_id, message, response,
                        is_system_message, timestamp, bot_avatar_base64
                 FROM chats
                 WHERE chat_id = ?1
                 ORDER BY timestamp ASC",
            )?;
            let rows = stmt
                .query_map([chat_id], |row| {
                    Ok(ChatTurnRow {
                        message_id: row.get(0)?,
                        chat_id: row.get(1)?,
                        user_id: row.get(2)?,
                        bot_id: row.get(3)?,
                        message: row.get(4)?,
                        response: row.get(5)?,
                        is_system_message: row.get(6)?,
                        timestamp: row.get(7)?,
                        bot_avatar_base64: row.get(8)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Delete every turn of one conversation, returning the true count removed.
    pub fn delete_turns(&self, chat_id: &str) -> Result<usize> {
        self.with_conn(|conn| {
            let deleted = conn.execute("DELETE FROM chats WHERE chat_id = ?1", [chat_id])?;
            Ok(deleted)
        })
    }
}

const BOT_SELECT: &str =
    "SELECT bot_id, user_id, name, bio, first_message, situation, back_story, personality,
            chatting_way, type_of_bot, privacy, avatar_base64, created_at, updated_at
     FROM bots";

fn bot_from_row(row: &rusqlite::Row<'_>) -> std::result::Result<BotRow, rusqlite::Error> {
    Ok(BotRow {
        bot_id: row.get(0)?,
        user_id: row.get(1)?,
        name: row.get(2)?,
        bio: row.get(3)?,
        first_message: row.get(4)?,
        situation: row.get(5)?,
        back_story: row.get(6)?,
        personality: row.get(7)?,
        chatting_way: row.get(8)?,
        type_of_bot: row.get(9)?,
        privacy: row.get(10)?,
        avatar_base64: row.get(11)?,
        created_at: row.get(12)?,
        updated_at: row.get(13)?,
    })
}

fn query_user_by_email(conn: &Connection, email: &str) -> Result<Option<UserRow>> {
    let mut stmt = conn.prepare(
        "SELECT user_id, full_name, email, password, is_verified, otp, otp_created_at,
                reset_otp, reset_otp_created_at, created_at
         FROM users WHERE email = ?1",
    )?;

    let row = stmt
        .query_row([email], |row| {
            Ok(UserRow {
                user_id: row.get(0)?,
                full_name: row.get(1)?,
                email: row.get(2)?,
                password: row.get(3)?,
                is_verified: row.get(4)?,
                otp: row.get(5)?,
                otp_created_at: row.get(6)?,
                reset_otp: row.get(7)?,
                reset_otp_created_at: row.get(8)?,
                created_at: row.get(9)?,
            })
        })
        .optional()?;

    Ok(row)
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bot_row(bot_id: &str, user_id: &str, privacy: &str) -> BotRow {
        BotRow {
            bot_id: bot_id.into(),
            user_id: user_id.into(),
            name: "Rex".into(),
            bio: "a good boy".into(),
            first_message: "woof".into(),
            situation: "park".into(),
            back_story: "found as a stray".into(),
            personality: "loyal".into(),
            chatting_way: "short barks".into(),
            type_of_bot: "pet".into(),
            privacy: privacy.into(),
            avatar_base64: Some("aGVsbG8=".into()),
            created_at: "2026-01-01T00:00:00+00:00".into(),
            updated_at: "2026-01-01T00:00:00+00:00".into(),
        }
    }

    fn turn_row(chat_id: &str, message_id: &str, timestamp: &str) -> ChatTurnRow {
        ChatTurnRow {
            message_id: message_id.into(),
            chat_id: chat_id.into(),
            user_id: "u1".into(),
            bot_id: "b1".into(),
            message: "hi".into(),
            response: "hey".into(),
            is_system_message: false,
            timestamp: timestamp.into(),
            bot_avatar_base64: None,
        }
    }

    #[test]
    fn duplicate_email_is_rejected() {
        let db = Database::open_in_memory().unwrap();
        db.create_user("u1", "Ann", "ann@x.com", "hash").unwrap();
        assert!(db.create_user("u2", "Ann Again", "ann@x.com", "hash").is_err());
    }

    #[test]
    fn mark_verified_clears_signup_otp() {
        let db = Database::open_in_memory().unwrap();
        db.create_user("u1", "Ann", "ann@x.com", "hash").unwrap();
        db.set_signup_otp("ann@x.com", "123456", "2026-01-01T00:00:00+00:00")
            .unwrap();

        let user = db.get_user_by_email("ann@x.com").unwrap().unwrap();
        assert!(!user.is_verified);
        assert_eq!(user.otp.as_deref(), Some("123456"));

        db.mark_verified("ann@x.com").unwrap();
        let user = db.get_user_by_email("ann@x.com").unwrap().unwrap();
        assert!(user.is_verified);
        assert!(user.otp.is_none());
        assert!(user.otp_created_at.is_none());
    }

    #[test]
    fn update_password_clears_reset_otp() {
        let db = Database::open_in_memory().unwrap();
        db.create_user("u1", "Ann", "ann@x.com", "old-hash").unwrap();
        db.set_reset_otp("ann@x.com", "654321", "2026-01-01T00:00:00+00:00")
            .unwrap();

        db.update_password("ann@x.com", "new-hash").unwrap();
        let user = db.get_user_by_email("ann@x.com").unwrap().unwrap();
        assert_eq!(user.password, "new-hash");
        assert!(user.reset_otp.is_none());
        assert!(user.reset_otp_created_at.is_none());
    }

    #[test]
    fn public_listing_excludes_private_bots() {
        let db = Database::open_in_memory().unwrap();
        db.insert_bot(&bot_row("b1", "u1", "public")).unwrap();
        db.insert_bot(&bot_row("b2", "u1", "private")).unwrap();
        db.insert_bot(&bot_row("b3", "u2", "public")).unwrap();

        let public = db.list_public_bots().unwrap();
        assert_eq!(public.len(), 2);
        assert!(public.iter().all(|b| b.privacy == "public"));

        let owned = db.list_bots_by_owner("u1").unwrap();
        assert_eq!(owned.len(), 2);
    }

    #[test]
    fn update_without_avatar_keeps_stored_avatar() {
        let db = Database::open_in_memory().unwrap();
        db.insert_bot(&bot_row("b1", "u1", "private")).unwrap();

        db.update_bot(
            "b1",
            &BotUpdate {
                name: "Rexy",
                bio: "still a good boy",
                first_message: "woof!",
                situation: "beach",
                back_story: "found as a stray",
                personality: "loyal",
                chatting_way: "short barks",
                type_of_bot: "pet",
                privacy: "public",
                avatar_base64: None,
                updated_at: "2026-01-02T00:00:00+00:00",
            },
        )
        .unwrap();

        let bot = db.get_bot("b1").unwrap().unwrap();
        assert_eq!(bot.name, "Rexy");
        assert_eq!(bot.privacy, "public");
        assert_eq!(bot.avatar_base64.as_deref(), Some("aGVsbG8="));
        assert_eq!(bot.updated_at, "2026-01-02T00:00:00+00:00");
    }

    #[test]
    fn delete_turns_reports_true_count() {
        let db = Database::open_in_memory().unwrap();
        db.insert_turn(&turn_row("u1_b1", "m1", "2026-01-01T00:00:01+00:00"))
            .unwrap();
        db.insert_turn(&turn_row("u1_b1", "m2", "2026-01-01T00:00:02+00:00"))
            .unwrap();
        db.insert_turn(&turn_row("u1_b2", "m3", "2026-01-01T00:00:03+00:00"))
            .unwrap();

        assert_eq!(db.delete_turns("u1_b1").unwrap(), 2);
        assert_eq!(db.get_turns("u1_b1").unwrap().len(), 0);
        // the other conversation is untouched
        assert_eq!(db.get_turns("u1_b2").unwrap().len(), 1);
    }

    #[test]
    fn turns_come_back_ordered_by_timestamp() {
        let db = Database::open_in_memory().unwrap();
        db.insert_turn(&turn_row("u1_b1", "m2", "2026-01-01T00:00:02+00:00"))
            .unwrap();
        db.insert_turn(&turn_row("u1_b1", "m1", "2026-01-01T00:00:01+00:00"))
            .unwrap();
        db.insert_turn(&turn_row("u1_b1", "m3", "2026-01-01T00:00:03+00:00"))
            .unwrap();

        let ids: Vec<String> = db
            .get_turns("u1_b1")
            .unwrap()
            .into_iter()
            .map(|t| t.message_id)
            .collect();
        assert_eq!(ids, vec!["m1", "m2", "m3"]);
    }
}
