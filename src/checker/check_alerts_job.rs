use super::notifier::{Notifier, TelegramNotifier};
use super::quotes::{Quote, QuoteSource, YahooQuotes};
use super::render_message::render_alert_message;
use crate::config::Config;
use crate::db::{alerts, user_settings, users};
use crate::models::alert::Alert;
use crate::models::user::User;
use crate::models::user_settings::UserSettings;
use diesel::result::Error;
use diesel::PgConnection;
use std::collections::HashMap;
use std::fmt;

const ALERTS_PER_PAGE: i64 = 100;

#[derive(Debug)]
pub struct CheckAlertsError {
    pub msg: String,
}

impl fmt::Display for CheckAlertsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.msg)
    }
}

impl From<Error> for CheckAlertsError {
    fn from(error: Error) -> Self {
        let msg = format!("{:?}", error);

        CheckAlertsError { msg }
    }
}

impl From<diesel::r2d2::PoolError> for CheckAlertsError {
    fn from(error: diesel::r2d2::PoolError) -> Self {
        let msg = format!("failed to get a connection: {}", error);

        CheckAlertsError { msg }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CheckSummary {
    pub checked: usize,
    pub triggered: usize,
    pub notified: usize,
}

pub struct CheckAlertsJob<Q: QuoteSource, N: Notifier> {
    quotes: Q,
    notifier: N,
    fallback_chat_id: Option<String>,
}

impl Default for CheckAlertsJob<YahooQuotes, TelegramNotifier> {
    fn default() -> Self {
        Self::new(
            YahooQuotes::default(),
            TelegramNotifier::default(),
            Config::telegram_chat_id(),
        )
    }
}

impl<Q: QuoteSource, N: Notifier> CheckAlertsJob<Q, N> {
    pub fn new(quotes: Q, notifier: N, fallback_chat_id: Option<String>) -> Self {
        Self {
            quotes,
            notifier,
            fallback_chat_id,
        }
    }

    /// Checks every enabled alert against the latest price. Triggered alerts
    /// are disabled after notifying, even when no message could be sent.
    pub fn execute(&self, conn: &mut PgConnection) -> Result<CheckSummary, CheckAlertsError> {
        log::info!("Started checking alerts");

        let mut summary = CheckSummary::default();
        let mut prices = QuoteCache::new(&self.quotes);
        let mut after_id = 0;

        loop {
            let page = alerts::find_enabled(conn, after_id, ALERTS_PER_PAGE)?;

            let last_id = match page.last() {
                Some(alert) => alert.id,
                None => break,
            };

            for alert in page {
                summary.checked += 1;

                let quote = match prices.quote(&alert.symbol) {
                    Some(quote) => quote,
                    None => continue,
                };

                if !alert.is_triggered(quote.price) {
                    continue;
                }

                summary.triggered += 1;

                if self.handle_triggered(conn, &alert, &quote)? {
                    summary.notified += 1;
                }
            }

            after_id = last_id;
        }

        log::info!(
            "Finished checking alerts. Checked: {}, triggered: {}, notified: {}",
            summary.checked,
            summary.triggered,
            summary.notified
        );

        Ok(summary)
    }

    fn handle_triggered(
        &self,
        conn: &mut PgConnection,
        alert: &Alert,
        quote: &Quote,
    ) -> Result<bool, CheckAlertsError> {
        let settings = match user_settings::find(conn, &alert.username) {
            Some(settings) => settings,
            None => {
                log::warn!("Skipping alert {}: no settings for {}", alert.id, alert.username);
                return Ok(false);
            }
        };

        let user = match users::find_by_username(conn, &alert.username) {
            Some(user) => user,
            None => {
                log::warn!("Skipping alert {}: user {} not found", alert.id, alert.username);
                return Ok(false);
            }
        };

        let notified = self.notify(&settings, &user, alert, quote);

        alerts::disable(conn, alert)?;

        Ok(notified)
    }

    /// Sends the alert message over Telegram. Returns whether a message went out.
    pub fn notify(&self, settings: &UserSettings, user: &User, alert: &Alert, quote: &Quote) -> bool {
        let chat_id = match settings.telegram_chat(self.fallback_chat_id.as_deref()) {
            Some(chat_id) => chat_id,
            None => return false,
        };

        let message = render_alert_message(user, alert, quote);

        match self.notifier.send_message(&chat_id, &message) {
            Ok(()) => true,
            Err(error) => {
                log::error!(
                    "Failed to notify {} about alert {}: {}",
                    user.username,
                    alert.id,
                    error
                );
                false
            }
        }
    }
}

/// Prices fetched during one run, so every symbol is requested at most once.
struct QuoteCache<'a, Q: QuoteSource> {
    source: &'a Q,
    quotes: HashMap<String, Option<Quote>>,
}

impl<'a, Q: QuoteSource> QuoteCache<'a, Q> {
    fn new(source: &'a Q) -> Self {
        Self {
            source,
            quotes: HashMap::new(),
        }
    }

    fn quote(&mut self, symbol: &str) -> Option<Quote> {
        if let Some(quote) = self.quotes.get(symbol) {
            return quote.clone();
        }

        let quote = match self.source.quote(symbol) {
            Ok(Some(quote)) => Some(quote),
            Ok(None) => {
                log::warn!("No price data for {}", symbol);
                None
            }
            Err(error) => {
                log::error!("Failed to fetch price for {}: {}", symbol, error);
                None
            }
        };

        self.quotes.insert(symbol.to_string(), quote.clone());

        quote
    }
}

#[cfg(test)]
mod tests {
    use super::{CheckAlertsJob, CheckSummary, QuoteCache};
    use crate::checker::notifier::{MockNotifier, NotifyError};
    use crate::checker::quotes::{MockQuoteSource, Quote, QuoteError};
    use crate::db;
    use crate::db::alerts::{self, NewAlert};
    use crate::db::user_settings::{self, NewUserSettings};
    use crate::db::users::tests::create_user;
    use crate::models::alert::tests::build_alert;
    use crate::models::alert::AlertKind;
    use crate::models::user::tests::build_user;
    use crate::models::user_settings::tests::build_settings;
    use crate::schema;
    use diesel::connection::Connection;
    use diesel::result::Error;
    use diesel::RunQueryDsl;

    fn quote(symbol: &str, price: f64) -> Quote {
        Quote {
            symbol: symbol.to_string(),
            price,
            change_pct: None,
        }
    }

    fn job(notifier: MockNotifier) -> CheckAlertsJob<MockQuoteSource, MockNotifier> {
        CheckAlertsJob::new(MockQuoteSource::new(), notifier, Some("999".to_string()))
    }

    #[test]
    fn quote_cache_fetches_each_symbol_once() {
        let mut source = MockQuoteSource::new();
        source
            .expect_quote()
            .withf(|symbol| symbol == "BHP")
            .times(1)
            .returning(|symbol| Ok(Some(quote(symbol, 45.0))));

        let mut cache = QuoteCache::new(&source);

        assert_eq!(cache.quote("BHP").unwrap().price, 45.0);
        assert_eq!(cache.quote("BHP").unwrap().price, 45.0);
    }

    #[test]
    fn quote_cache_remembers_failures() {
        let mut source = MockQuoteSource::new();
        source.expect_quote().times(1).returning(|_| {
            Err(QuoteError {
                msg: "timeout".to_string(),
            })
        });

        let mut cache = QuoteCache::new(&source);

        assert_eq!(cache.quote("AAPL"), None);
        assert_eq!(cache.quote("AAPL"), None);
    }

    #[test]
    fn notify_sends_message_to_users_chat() {
        let mut notifier = MockNotifier::new();
        notifier
            .expect_send_message()
            .withf(|chat_id, text| {
                chat_id == "42" && text.contains("BHP crossed your target!")
            })
            .times(1)
            .returning(|_, _| Ok(()));

        let sent = job(notifier).notify(
            &build_settings(true, Some("42")),
            &build_user(),
            &build_alert("above", 40.0),
            &quote("BHP.AX", 45.0),
        );

        assert!(sent);
    }

    #[test]
    fn notify_falls_back_to_configured_chat() {
        let mut notifier = MockNotifier::new();
        notifier
            .expect_send_message()
            .withf(|chat_id, _| chat_id == "999")
            .times(1)
            .returning(|_, _| Ok(()));

        let sent = job(notifier).notify(
            &build_settings(true, None),
            &build_user(),
            &build_alert("above", 40.0),
            &quote("BHP.AX", 45.0),
        );

        assert!(sent);
    }

    #[test]
    fn notify_skips_disabled_telegram() {
        let mut notifier = MockNotifier::new();
        notifier.expect_send_message().never();

        let sent = job(notifier).notify(
            &build_settings(false, Some("42")),
            &build_user(),
            &build_alert("above", 40.0),
            &quote("BHP.AX", 45.0),
        );

        assert!(!sent);
    }

    #[test]
    fn notify_reports_failed_delivery() {
        let mut notifier = MockNotifier::new();
        notifier.expect_send_message().times(1).returning(|_, _| {
            Err(NotifyError {
                msg: "chat not found".to_string(),
            })
        });

        let sent = job(notifier).notify(
            &build_settings(true, Some("42")),
            &build_user(),
            &build_alert("below", 50.0),
            &quote("BHP.AX", 45.0),
        );

        assert!(!sent);
    }

    #[test]
    fn execute_disables_triggered_alerts() {
        let mut connection = db::establish_test_connection();

        connection.test_transaction::<_, Error, _>(|connection| {
            diesel::delete(schema::alerts::table).execute(connection)?;

            create_user(connection, "trader");
            let settings = user_settings::create(
                connection,
                NewUserSettings {
                    username: "trader".to_string(),
                    email: "trader@example.com".to_string(),
                },
            )?;
            user_settings::update_notifications(connection, &settings, Some("42".to_string()), true)?;

            let triggered =
                alerts::create(connection, NewAlert::new("trader", "bhp", 40.0, AlertKind::Above))?;
            let waiting =
                alerts::create(connection, NewAlert::new("trader", "bhp", 10.0, AlertKind::Below))?;

            let mut quotes = MockQuoteSource::new();
            quotes
                .expect_quote()
                .times(1)
                .returning(|symbol| Ok(Some(quote(symbol, 45.0))));

            let mut notifier = MockNotifier::new();
            notifier
                .expect_send_message()
                .withf(|chat_id, _| chat_id == "42")
                .times(1)
                .returning(|_, _| Ok(()));

            let job = CheckAlertsJob::new(quotes, notifier, None);
            let summary = job.execute(connection).unwrap();

            assert_eq!(
                summary,
                CheckSummary {
                    checked: 2,
                    triggered: 1,
                    notified: 1,
                }
            );
            assert!(!alerts::find(connection, triggered.id).unwrap().enabled);
            assert!(alerts::find(connection, waiting.id).unwrap().enabled);

            Ok(())
        });
    }

    #[test]
    fn execute_keeps_alerts_of_users_without_settings() {
        let mut connection = db::establish_test_connection();

        connection.test_transaction::<_, Error, _>(|connection| {
            diesel::delete(schema::alerts::table).execute(connection)?;

            create_user(connection, "trader");
            let alert =
                alerts::create(connection, NewAlert::new("trader", "AAPL", 100.0, AlertKind::Above))?;

            let mut quotes = MockQuoteSource::new();
            quotes
                .expect_quote()
                .returning(|symbol| Ok(Some(quote(symbol, 150.0))));

            let mut notifier = MockNotifier::new();
            notifier.expect_send_message().never();

            let summary = CheckAlertsJob::new(quotes, notifier, None)
                .execute(connection)
                .unwrap();

            assert_eq!(summary.triggered, 1);
            assert_eq!(summary.notified, 0);
            assert!(alerts::find(connection, alert.id).unwrap().enabled);

            Ok(())
        });
    }
}
