use crate::db;
use crate::models::user_settings::UserSettings;
use crate::schema::user_settings;
use diesel::result::Error;
use diesel::{ExpressionMethods, PgConnection, QueryDsl, RunQueryDsl};

#[derive(Insertable, Debug, Clone, PartialEq, Eq)]
#[diesel(table_name = user_settings)]
pub struct NewUserSettings {
    pub username: String,
    pub email: String,
}

pub fn create(conn: &mut PgConnection, new_settings: NewUserSettings) -> Result<UserSettings, Error> {
    diesel::insert_into(user_settings::table)
        .values(new_settings)
        .get_result::<UserSettings>(conn)
}

pub fn find(conn: &mut PgConnection, username: &str) -> Option<UserSettings> {
    match user_settings::table
        .filter(user_settings::username.eq(username))
        .first::<UserSettings>(conn)
    {
        Ok(record) => Some(record),
        _ => None,
    }
}

pub fn update_notifications(
    conn: &mut PgConnection,
    settings: &UserSettings,
    telegram_chat_id: Option<String>,
    telegram_enabled: bool,
) -> Result<UserSettings, Error> {
    let telegram_chat_id = telegram_chat_id
        .map(|chat_id| chat_id.trim().to_string())
        .filter(|chat_id| !chat_id.is_empty());

    diesel::update(settings)
        .set((
            user_settings::telegram_chat_id.eq(telegram_chat_id),
            user_settings::telegram_enabled.eq(telegram_enabled),
            user_settings::notification_method.eq("telegram"),
            user_settings::updated_at.eq(db::current_time()),
        ))
        .get_result::<UserSettings>(conn)
}
