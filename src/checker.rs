pub mod check_alerts_job;
pub mod notifier;
pub mod quotes;
pub mod render_message;

pub use check_alerts_job::{CheckAlertsError, CheckAlertsJob, CheckSummary};
pub use notifier::{send_test_message, Notifier, TelegramNotifier, TestMessageError};
pub use quotes::{cross_market_quotes, Quote, QuoteSource, YahooQuotes};
