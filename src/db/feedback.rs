use crate::models::feedback::Feedback;
use crate::schema::feedback;
use diesel::result::Error;
use diesel::{ExpressionMethods, PgConnection, QueryDsl, RunQueryDsl};
use uuid::Uuid;

/// `None` fields are left to the column defaults.
#[derive(Insertable, Debug, Clone, PartialEq, Eq)]
#[diesel(table_name = feedback)]
pub struct NewFeedback {
    pub username: String,
    pub feedback_type: Option<String>,
    pub subject: Option<String>,
    pub message: String,
}

pub fn create(conn: &mut PgConnection, new_feedback: NewFeedback) -> Result<Feedback, Error> {
    diesel::insert_into(feedback::table)
        .values(new_feedback)
        .get_result::<Feedback>(conn)
}

pub fn find(conn: &mut PgConnection, id: Uuid) -> Option<Feedback> {
    match feedback::table
        .filter(feedback::id.eq(id))
        .first::<Feedback>(conn)
    {
        Ok(record) => Some(record),
        _ => None,
    }
}

pub fn find_by_username(
    conn: &mut PgConnection,
    username: &str,
    page: i64,
    count: i64,
) -> Result<Vec<Feedback>, Error> {
    let offset = (page - 1) * count;

    feedback::table
        .filter(feedback::username.eq(username))
        .order((feedback::created_at.desc(), feedback::id))
        .limit(count)
        .offset(offset)
        .get_results::<Feedback>(conn)
}

pub fn find_recent(conn: &mut PgConnection, page: i64, count: i64) -> Result<Vec<Feedback>, Error> {
    let offset = (page - 1) * count;

    feedback::table
        .order((feedback::created_at.desc(), feedback::id))
        .limit(count)
        .offset(offset)
        .get_results::<Feedback>(conn)
}

pub fn find_unread(conn: &mut PgConnection, page: i64, count: i64) -> Result<Vec<Feedback>, Error> {
    let offset = (page - 1) * count;

    feedback::table
        .filter(feedback::read.eq(false))
        .order((feedback::created_at.desc(), feedback::id))
        .limit(count)
        .offset(offset)
        .get_results::<Feedback>(conn)
}

pub fn find_unread_by_username(
    conn: &mut PgConnection,
    username: &str,
    page: i64,
    count: i64,
) -> Result<Vec<Feedback>, Error> {
    let offset = (page - 1) * count;

    feedback::table
        .filter(feedback::username.eq(username))
        .filter(feedback::read.eq(false))
        .order((feedback::created_at.desc(), feedback::id))
        .limit(count)
        .offset(offset)
        .get_results::<Feedback>(conn)
}

pub fn count_unread(conn: &mut PgConnection) -> Result<i64, Error> {
    feedback::table
        .filter(feedback::read.eq(false))
        .count()
        .get_result::<i64>(conn)
}

pub fn count_unread_by_username(conn: &mut PgConnection, username: &str) -> Result<i64, Error> {
    feedback::table
        .filter(feedback::username.eq(username))
        .filter(feedback::read.eq(false))
        .count()
        .get_result::<i64>(conn)
}

pub fn set_read(conn: &mut PgConnection, record: &Feedback, read: bool) -> Result<Feedback, Error> {
    diesel::update(record)
        .set(feedback::read.eq(read))
        .get_result::<Feedback>(conn)
}
