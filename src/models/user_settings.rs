use crate::schema::user_settings;
use chrono::{DateTime, Utc};

#[derive(Queryable, Identifiable, Debug, Clone, PartialEq, Eq)]
#[diesel(table_name = user_settings)]
#[diesel(primary_key(username))]
pub struct UserSettings {
    pub username: String,
    pub email: String,
    pub email_enabled: bool,
    pub telegram_enabled: bool,
    pub telegram_chat_id: Option<String>,
    pub notification_method: String,
    pub setup_complete: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserSettings {
    /// Chat to notify: the user's own chat, or `fallback_chat_id` when they have none.
    /// `None` while Telegram notifications are switched off.
    pub fn telegram_chat(&self, fallback_chat_id: Option<&str>) -> Option<String> {
        if !self.telegram_enabled {
            return None;
        }

        self.telegram_chat_id
            .as_deref()
            .map(str::trim)
            .filter(|chat_id| !chat_id.is_empty())
            .or(fallback_chat_id)
            .map(str::to_string)
    }

    pub fn needs_setup(&self) -> bool {
        !self.telegram_enabled
            || self
                .telegram_chat_id
                .as_deref()
                .map_or(true, |chat_id| chat_id.trim().is_empty())
    }
}
