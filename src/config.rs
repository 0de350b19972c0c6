use dotenv::dotenv;
use std::env;
use std::sync::OnceLock;

static DATABASE_URL: OnceLock<String> = OnceLock::new();
static DATABASE_POOL_SIZE: OnceLock<u32> = OnceLock::new();
static TELEGRAM_BOT_TOKEN: OnceLock<String> = OnceLock::new();
static TELEGRAM_BASE_URL: OnceLock<String> = OnceLock::new();
static QUOTES_BASE_URL: OnceLock<String> = OnceLock::new();
static REQUEST_TIMEOUT: OnceLock<u64> = OnceLock::new();
static ALERT_CHECK_INTERVAL: OnceLock<u64> = OnceLock::new();
static TRIAL_DAYS: OnceLock<i64> = OnceLock::new();
static APP_URL: OnceLock<String> = OnceLock::new();

const DEFAULT_TELEGRAM_BASE_URL: &str = "https://api.telegram.org/bot";
const DEFAULT_APP_URL: &str = "https://stock-alerts-flask.onrender.com";
const DEFAULT_QUOTES_BASE_URL: &str = "https://query1.finance.yahoo.com/v8/finance/chart/";

type Getter = fn() -> Option<String>;

/// Operator values the deployment checklist asks for, in checklist order.
/// The boolean marks values that must never be printed in clear text.
const CHECKLIST_VARIABLES: &[(&str, bool, Getter)] = &[
    ("DATABASE_URL", true, Config::optional_database_url),
    ("STRIPE_SECRET_KEY", true, Config::stripe_secret_key),
    ("STRIPE_PUBLISHABLE_KEY", false, Config::stripe_publishable_key),
    ("STRIPE_PRICE_MONTHLY", false, Config::stripe_price_monthly),
    ("STRIPE_PRICE_YEARLY", false, Config::stripe_price_yearly),
    ("STRIPE_WEBHOOK_SECRET", true, Config::stripe_webhook_secret),
    ("EMAIL_SENDER", false, Config::email_sender),
    ("EMAIL_PASSWORD", true, Config::email_password),
    ("SMTP_SERVER", false, Config::effective_smtp_server),
    ("SMTP_PORT", false, Config::effective_smtp_port),
    ("TELEGRAM_BOT_TOKEN", true, Config::optional_telegram_bot_token),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChecklistEntry {
    pub name: &'static str,
    pub value: Option<String>,
}

impl ChecklistEntry {
    pub fn is_set(&self) -> bool {
        self.value.is_some()
    }
}

pub struct Config {}

impl Config {
    pub fn database_url() -> &'static str {
        DATABASE_URL.get_or_init(|| Self::read_var("DATABASE_URL"))
    }

    pub fn database_pool_size() -> u32 {
        *DATABASE_POOL_SIZE.get_or_init(|| Self::read_parsed_var("DATABASE_POOL_SIZE", 5))
    }

    pub fn stripe_secret_key() -> Option<String> {
        Self::read_optional_var("STRIPE_SECRET_KEY")
    }

    pub fn stripe_publishable_key() -> Option<String> {
        Self::read_optional_var("STRIPE_PUBLISHABLE_KEY")
    }

    pub fn stripe_price_monthly() -> Option<String> {
        Self::read_optional_var("STRIPE_PRICE_MONTHLY")
    }

    pub fn stripe_price_yearly() -> Option<String> {
        Self::read_optional_var("STRIPE_PRICE_YEARLY")
    }

    pub fn stripe_webhook_secret() -> Option<String> {
        Self::read_optional_var("STRIPE_WEBHOOK_SECRET")
    }

    pub fn email_sender() -> Option<String> {
        Self::read_optional_var("EMAIL_SENDER")
    }

    pub fn email_password() -> Option<String> {
        Self::read_optional_var("EMAIL_PASSWORD")
    }

    pub fn smtp_server() -> String {
        Self::read_var_with_default("SMTP_SERVER", "smtp.gmail.com")
    }

    pub fn smtp_port() -> u16 {
        Self::read_parsed_var("SMTP_PORT", 587)
    }

    pub fn telegram_bot_token() -> &'static str {
        TELEGRAM_BOT_TOKEN.get_or_init(|| Self::read_var("TELEGRAM_BOT_TOKEN"))
    }

    pub fn telegram_chat_id() -> Option<String> {
        Self::read_optional_var("TELEGRAM_CHAT_ID")
    }

    pub fn telegram_base_url() -> &'static str {
        TELEGRAM_BASE_URL.get_or_init(|| {
            Self::read_var_with_default("TELEGRAM_BASE_URL", DEFAULT_TELEGRAM_BASE_URL)
        })
    }

    pub fn quotes_base_url() -> &'static str {
        QUOTES_BASE_URL
            .get_or_init(|| Self::read_var_with_default("QUOTES_BASE_URL", DEFAULT_QUOTES_BASE_URL))
    }

    pub fn request_timeout_in_seconds() -> u64 {
        *REQUEST_TIMEOUT.get_or_init(|| Self::read_parsed_var("REQUEST_TIMEOUT_IN_SECONDS", 10))
    }

    pub fn alert_check_interval_in_seconds() -> u64 {
        *ALERT_CHECK_INTERVAL.get_or_init(|| {
            let name = "ALERT_CHECK_INTERVAL_IN_SECONDS";

            Self::ensure_positive(name, Self::read_parsed_var(name, 300))
        })
    }

    pub fn app_url() -> &'static str {
        APP_URL.get_or_init(|| Self::read_var_with_default("APP_URL", DEFAULT_APP_URL))
    }

    pub fn trial_days() -> i64 {
        *TRIAL_DAYS.get_or_init(|| Self::read_parsed_var("TRIAL_DAYS", 21))
    }

    /// Reports every checklist value with its masked value, or `None` when unset.
    /// `SMTP_SERVER` and `SMTP_PORT` always report their effective value.
    pub fn checklist() -> Vec<ChecklistEntry> {
        CHECKLIST_VARIABLES
            .iter()
            .map(|&(name, secret, getter)| ChecklistEntry {
                name,
                value: getter().map(|value| if secret { mask(&value) } else { value }),
            })
            .collect()
    }

    fn optional_database_url() -> Option<String> {
        Self::read_optional_var("DATABASE_URL")
    }

    fn optional_telegram_bot_token() -> Option<String> {
        Self::read_optional_var("TELEGRAM_BOT_TOKEN")
    }

    fn effective_smtp_server() -> Option<String> {
        Some(Self::smtp_server())
    }

    fn effective_smtp_port() -> Option<String> {
        Some(Self::smtp_port().to_string())
    }

    fn read_optional_var(name: &str) -> Option<String> {
        dotenv().ok();

        match env::var(name) {
            Ok(value) if !value.trim().is_empty() => Some(value),
            _ => None,
        }
    }

    fn read_var_with_default(name: &str, default_value: &str) -> String {
        Self::read_optional_var(name).unwrap_or_else(|| default_value.to_string())
    }

    fn read_parsed_var<T: std::str::FromStr>(name: &str, default_value: T) -> T {
        match Self::read_optional_var(name) {
            None => default_value,
            Some(value) => value
                .trim()
                .parse::<T>()
                .unwrap_or_else(|_| panic!("{name} has an invalid value: {value}")),
        }
    }

    fn ensure_positive(name: &str, value: u64) -> u64 {
        if value == 0 {
            panic!("{name} must be greater than zero");
        }

        value
    }

    fn read_var(name: &str) -> String {
        Self::read_optional_var(name).unwrap_or_else(|| panic!("{name} must be set"))
    }
}

/// Keeps the first four characters of a secret and hides the rest.
pub fn mask(value: &str) -> String {
    let visible: String = value.chars().take(4).collect();

    if value.chars().count() <= 4 {
        "****".to_string()
    } else {
        format!("{visible}****")
    }
}
