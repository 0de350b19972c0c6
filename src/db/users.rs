use crate::config::Config;
use crate::db;
use crate::models::user::User;
use crate::schema::users;
use chrono::{DateTime, Duration, Utc};
use diesel::result::Error;
use diesel::sql_types::Text;
use diesel::{ExpressionMethods, PgConnection, QueryDsl, RunQueryDsl};
use typed_builder::TypedBuilder;

diesel::define_sql_function!(fn lower(x: Text) -> Text);

#[derive(Insertable, TypedBuilder, Debug, Clone)]
#[diesel(table_name = users)]
pub struct NewUser {
    #[builder(setter(into))]
    pub username: String,
    #[builder(setter(into))]
    pub password_hash: String,
    #[builder(setter(into))]
    pub email: String,
    #[builder(setter(into))]
    pub name: String,
    #[builder(default, setter(strip_option))]
    pub trial_ends: Option<DateTime<Utc>>,
}

impl NewUser {
    /// End of the signup trial starting at `now`.
    pub fn trial_ends_from(now: DateTime<Utc>) -> DateTime<Utc> {
        now + Duration::days(Config::trial_days())
    }
}

/// Values recorded when a checkout completes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionActivation {
    pub customer_id: String,
    pub subscription_id: String,
    pub plan: String,
}

/// Values recorded when the payment processor reports a subscription change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionUpdate {
    pub premium: bool,
    pub cancel_at_period_end: bool,
    pub plan: Option<String>,
}

pub fn create(conn: &mut PgConnection, new_user: NewUser) -> Result<User, Error> {
    diesel::insert_into(users::table)
        .values(new_user)
        .get_result::<User>(conn)
}

pub fn find(conn: &mut PgConnection, id: i64) -> Option<User> {
    match users::table.filter(users::id.eq(id)).first::<User>(conn) {
        Ok(record) => Some(record),
        _ => None,
    }
}

pub fn find_by_username(conn: &mut PgConnection, username: &str) -> Option<User> {
    match users::table
        .filter(lower(users::username).eq(lower(username.trim())))
        .first::<User>(conn)
    {
        Ok(record) => Some(record),
        _ => None,
    }
}

pub fn find_by_email(conn: &mut PgConnection, email: &str) -> Option<User> {
    match users::table
        .filter(lower(users::email).eq(lower(email.trim())))
        .first::<User>(conn)
    {
        Ok(record) => Some(record),
        _ => None,
    }
}

pub fn find_by_stripe_customer_id(conn: &mut PgConnection, customer_id: &str) -> Option<User> {
    match users::table
        .filter(users::stripe_customer_id.eq(customer_id))
        .first::<User>(conn)
    {
        Ok(record) => Some(record),
        _ => None,
    }
}

pub fn find_by_stripe_subscription_id(
    conn: &mut PgConnection,
    subscription_id: &str,
) -> Option<User> {
    match users::table
        .filter(users::stripe_subscription_id.eq(subscription_id))
        .first::<User>(conn)
    {
        Ok(record) => Some(record),
        _ => None,
    }
}

/// Same as `find_by_username` but holds a row lock until the transaction ends.
pub fn lock_by_username(conn: &mut PgConnection, username: &str) -> Option<User> {
    match users::table
        .filter(lower(users::username).eq(lower(username.trim())))
        .for_update()
        .first::<User>(conn)
    {
        Ok(record) => Some(record),
        _ => None,
    }
}

pub fn lock_by_stripe_customer_id(conn: &mut PgConnection, customer_id: &str) -> Option<User> {
    match users::table
        .filter(users::stripe_customer_id.eq(customer_id))
        .for_update()
        .first::<User>(conn)
    {
        Ok(record) => Some(record),
        _ => None,
    }
}

pub fn lock_by_stripe_subscription_id(
    conn: &mut PgConnection,
    subscription_id: &str,
) -> Option<User> {
    match users::table
        .filter(users::stripe_subscription_id.eq(subscription_id))
        .for_update()
        .first::<User>(conn)
    {
        Ok(record) => Some(record),
        _ => None,
    }
}

pub fn activate_subscription(
    conn: &mut PgConnection,
    user: &User,
    activation: SubscriptionActivation,
) -> Result<User, Error> {
    diesel::update(user)
        .set((
            users::stripe_customer_id.eq(activation.customer_id),
            users::stripe_subscription_id.eq(activation.subscription_id),
            users::subscription_plan.eq(activation.plan),
            users::cancel_at_period_end.eq(false),
            users::premium.eq(true),
            users::updated_at.eq(db::current_time()),
        ))
        .get_result::<User>(conn)
}

pub fn update_subscription(
    conn: &mut PgConnection,
    user: &User,
    update: SubscriptionUpdate,
) -> Result<User, Error> {
    let plan = update.plan.or_else(|| user.subscription_plan.clone());

    diesel::update(user)
        .set((
            users::subscription_plan.eq(plan),
            users::cancel_at_period_end.eq(update.cancel_at_period_end),
            users::premium.eq(update.premium),
            users::updated_at.eq(db::current_time()),
        ))
        .get_result::<User>(conn)
}

/// Drops the entitlement. The customer id stays so the billing portal keeps working.
pub fn deactivate_subscription(conn: &mut PgConnection, user: &User) -> Result<User, Error> {
    let subscription_id: Option<String> = None;

    diesel::update(user)
        .set((
            users::stripe_subscription_id.eq(subscription_id),
            users::cancel_at_period_end.eq(false),
            users::premium.eq(false),
            users::updated_at.eq(db::current_time()),
        ))
        .get_result::<User>(conn)
}
