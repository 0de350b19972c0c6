use dotenv::dotenv;
use stock_alerts::checker::{
    CheckAlertsError, CheckAlertsJob, CheckSummary, TelegramNotifier, YahooQuotes,
};
use stock_alerts::config::Config;
use stock_alerts::db;
use tokio::runtime;
use tokio::task;
use tokio::time::{self, MissedTickBehavior};

fn run_check() -> Result<CheckSummary, CheckAlertsError> {
    let mut connection = db::pool().get()?;

    CheckAlertsJob::<YahooQuotes, TelegramNotifier>::default().execute(&mut connection)
}

fn main() {
    dotenv().ok();
    env_logger::init();

    let tokio_runtime = match runtime::Builder::new_multi_thread()
        .thread_name("checker-pool")
        .enable_all()
        .build()
    {
        Ok(tokio_runtime) => tokio_runtime,
        Err(error) => {
            log::error!("Failed to start the runtime: {}", error);
            std::process::exit(1);
        }
    };

    let period = std::time::Duration::from_secs(Config::alert_check_interval_in_seconds());

    log::info!("Checking alerts every {} seconds", period.as_secs());

    tokio_runtime.block_on(async {
        let mut interval = time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            interval.tick().await;

            match task::spawn_blocking(run_check).await {
                Ok(Ok(_)) => (),
                Ok(Err(error)) => log::error!("Failed to check alerts: {}", error.msg),
                Err(error) => log::error!("Alert check panicked: {}", error),
            }
        }
    })
}
