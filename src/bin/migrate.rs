use dotenv::dotenv;
use stock_alerts::db;

fn main() {
    dotenv().ok();
    env_logger::init();

    let mut connection = match db::pool().get() {
        Ok(connection) => connection,
        Err(error) => {
            log::error!("Failed to get a database connection: {}", error);
            std::process::exit(1);
        }
    };

    match db::run_migrations(&mut connection) {
        Ok(versions) if versions.is_empty() => log::info!("Database schema is up to date"),
        Ok(versions) => {
            for version in versions {
                log::info!("Applied migration {}", version);
            }
        }
        Err(error) => {
            log::error!("Failed to run migrations: {}", error.msg);
            std::process::exit(1);
        }
    }
}
