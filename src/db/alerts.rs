use crate::db;
use crate::models::alert::{Alert, AlertKind};
use crate::schema::alerts;
use diesel::result::Error;
use diesel::{ExpressionMethods, PgConnection, QueryDsl, RunQueryDsl};

#[derive(Insertable, Debug, Clone, PartialEq)]
#[diesel(table_name = alerts)]
pub struct NewAlert {
    pub username: String,
    pub symbol: String,
    pub target: f64,
    pub alert_type: String,
}

impl NewAlert {
    /// Symbols are stored upper-cased, market suffix included (`BHP.AX`).
    pub fn new(username: &str, symbol: &str, target: f64, kind: AlertKind) -> Self {
        NewAlert {
            username: username.to_string(),
            symbol: symbol.trim().to_uppercase(),
            target,
            alert_type: kind.to_string(),
        }
    }
}

pub fn create(conn: &mut PgConnection, new_alert: NewAlert) -> Result<Alert, Error> {
    diesel::insert_into(alerts::table)
        .values(new_alert)
        .get_result::<Alert>(conn)
}

pub fn find(conn: &mut PgConnection, id: i64) -> Option<Alert> {
    match alerts::table.filter(alerts::id.eq(id)).first::<Alert>(conn) {
        Ok(record) => Some(record),
        _ => None,
    }
}

pub fn find_by_username(conn: &mut PgConnection, username: &str) -> Result<Vec<Alert>, Error> {
    alerts::table
        .filter(alerts::username.eq(username))
        .order(alerts::id)
        .get_results::<Alert>(conn)
}

/// Keyset page of enabled alerts with ids above `after_id`, so callers may
/// disable alerts while paging.
pub fn find_enabled(
    conn: &mut PgConnection,
    after_id: i64,
    count: i64,
) -> Result<Vec<Alert>, Error> {
    alerts::table
        .filter(alerts::enabled.eq(true))
        .filter(alerts::id.gt(after_id))
        .order(alerts::id)
        .limit(count)
        .get_results::<Alert>(conn)
}

pub fn count_for_user(conn: &mut PgConnection, username: &str) -> Result<i64, Error> {
    alerts::table
        .filter(alerts::username.eq(username))
        .count()
        .get_result::<i64>(conn)
}

pub fn update_target(
    conn: &mut PgConnection,
    alert: &Alert,
    target: f64,
    kind: AlertKind,
) -> Result<Alert, Error> {
    diesel::update(alert)
        .set((
            alerts::target.eq(target),
            alerts::alert_type.eq(kind.as_str()),
            alerts::updated_at.eq(db::current_time()),
        ))
        .get_result::<Alert>(conn)
}

pub fn disable(conn: &mut PgConnection, alert: &Alert) -> Result<Alert, Error> {
    diesel::update(alert)
        .set((
            alerts::enabled.eq(false),
            alerts::updated_at.eq(db::current_time()),
        ))
        .get_result::<Alert>(conn)
}

pub fn remove(conn: &mut PgConnection, id: i64) -> Result<usize, Error> {
    let record_query = alerts::table.filter(alerts::id.eq(id));

    diesel::delete(record_query).execute(conn)
}
