use diesel::connection::Connection;
use diesel::PgConnection;
use dotenv::dotenv;
use std::sync::Once;
use stock_alerts::db;

static MIGRATIONS: Once = Once::new();

pub fn establish_connection() -> PgConnection {
    dotenv().ok();

    let url = db::database_url();

    let mut connection =
        PgConnection::establish(url).unwrap_or_else(|_| panic!("Error connecting to {}", url));

    MIGRATIONS.call_once(|| {
        db::run_migrations(&mut connection).expect("Failed to run migrations");
    });

    connection
}
