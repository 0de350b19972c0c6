use clap::{Args, Parser, Subcommand};
use dotenv::dotenv;
use std::fmt;
use stock_alerts::billing::{handler, Plans};
use stock_alerts::checker::{
    cross_market_quotes, send_test_message, TelegramNotifier, TestMessageError, YahooQuotes,
};
use stock_alerts::config::Config;
use stock_alerts::db;
use stock_alerts::models::feedback::{Feedback, FeedbackError, FeedbackForm};
use uuid::Uuid;

/// Operator tasks for Stock Alerts Pro
#[derive(Parser)]
#[command(name = "admin", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply pending database migrations
    Migrate,

    /// Show the deployment checklist and fail when a value is missing
    CheckConfig,

    /// Read and triage user feedback
    #[command(subcommand)]
    Feedback(FeedbackCommands),

    /// Apply billing webhook events
    #[command(subcommand)]
    Billing(BillingCommands),

    /// Check a user's notification setup
    #[command(subcommand)]
    Notify(NotifyCommands),

    /// Show the US and ASX listings of a symbol
    Quote { symbol: String },
}

#[derive(Subcommand)]
enum NotifyCommands {
    /// Send a test Telegram message to a user
    Test { username: String },
}

#[derive(Subcommand)]
enum FeedbackCommands {
    /// List feedback, newest first
    List(ListArgs),

    /// Record feedback on behalf of a user
    Submit(SubmitArgs),

    /// Mark feedback as read
    MarkRead { id: Uuid },

    /// Mark feedback as unread
    MarkUnread { id: Uuid },
}

#[derive(Args)]
struct ListArgs {
    /// Only unread feedback
    #[arg(long)]
    unread: bool,

    /// Only feedback sent by this user
    #[arg(long)]
    user: Option<String>,

    #[arg(long, default_value_t = 1)]
    page: i64,

    #[arg(long, default_value_t = 20)]
    limit: i64,
}

#[derive(Args)]
struct SubmitArgs {
    #[arg(long)]
    user: String,

    /// general, bug, feature or billing
    #[arg(long = "type")]
    category: Option<String>,

    #[arg(long)]
    subject: Option<String>,

    #[arg(long)]
    message: String,
}

#[derive(Subcommand)]
enum BillingCommands {
    /// Apply a webhook event saved as JSON, after its signature was verified
    Replay { path: std::path::PathBuf },
}

#[derive(Debug)]
struct AdminError {
    msg: String,
}

impl fmt::Display for AdminError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.msg)
    }
}

impl From<diesel::result::Error> for AdminError {
    fn from(error: diesel::result::Error) -> Self {
        AdminError {
            msg: format!("database error: {error}"),
        }
    }
}

impl From<diesel::r2d2::PoolError> for AdminError {
    fn from(error: diesel::r2d2::PoolError) -> Self {
        AdminError {
            msg: format!("failed to get a connection: {error}"),
        }
    }
}

impl From<FeedbackError> for AdminError {
    fn from(error: FeedbackError) -> Self {
        AdminError {
            msg: format!("invalid feedback: {error}"),
        }
    }
}

impl From<stock_alerts::billing::BillingError> for AdminError {
    fn from(error: stock_alerts::billing::BillingError) -> Self {
        AdminError {
            msg: error.to_string(),
        }
    }
}

impl From<TestMessageError> for AdminError {
    fn from(error: TestMessageError) -> Self {
        AdminError {
            msg: format!("test notification failed: {error}"),
        }
    }
}

impl From<std::io::Error> for AdminError {
    fn from(error: std::io::Error) -> Self {
        AdminError {
            msg: format!("io error: {error}"),
        }
    }
}

fn main() {
    dotenv().ok();
    env_logger::init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Migrate => migrate(),
        Commands::CheckConfig => check_config(),
        Commands::Feedback(command) => feedback(command),
        Commands::Billing(BillingCommands::Replay { path }) => replay(&path),
        Commands::Notify(NotifyCommands::Test { username }) => notify_test(&username),
        Commands::Quote { symbol } => quote(&symbol),
    };

    if let Err(error) = result {
        log::error!("{}", error);
        eprintln!("error: {}", error);
        std::process::exit(1);
    }
}

fn migrate() -> Result<(), AdminError> {
    let mut connection = db::pool().get()?;

    let versions =
        db::run_migrations(&mut connection).map_err(|error| AdminError { msg: error.msg })?;

    println!("Applied {} migration(s)", versions.len());

    for version in versions {
        println!("  {version}");
    }

    Ok(())
}

fn check_config() -> Result<(), AdminError> {
    let checklist = Config::checklist();
    let missing = checklist.iter().filter(|entry| !entry.is_set()).count();

    for entry in &checklist {
        match &entry.value {
            Some(value) => println!("[x] {:<24} {}", entry.name, value),
            None => println!("[ ] {:<24} missing", entry.name),
        }
    }

    if missing > 0 {
        return Err(AdminError {
            msg: format!("{missing} configuration value(s) missing"),
        });
    }

    Ok(())
}

fn feedback(command: FeedbackCommands) -> Result<(), AdminError> {
    let mut connection = db::pool().get()?;

    match command {
        FeedbackCommands::List(args) => {
            let page = args.page.max(1);
            let limit = args.limit.clamp(1, 200);

            let records = match (&args.user, args.unread) {
                (Some(user), true) => {
                    db::feedback::find_unread_by_username(&mut connection, user, page, limit)?
                }
                (Some(user), false) => {
                    db::feedback::find_by_username(&mut connection, user, page, limit)?
                }
                (None, true) => db::feedback::find_unread(&mut connection, page, limit)?,
                (None, false) => db::feedback::find_recent(&mut connection, page, limit)?,
            };

            for record in &records {
                print_feedback(record);
            }

            let unread = match &args.user {
                Some(user) => db::feedback::count_unread_by_username(&mut connection, user)?,
                None => db::feedback::count_unread(&mut connection)?,
            };

            println!("{unread} unread");
        }
        FeedbackCommands::Submit(args) => {
            let form = FeedbackForm {
                username: args.user,
                category: args.category,
                subject: args.subject,
                message: args.message,
            };

            let record = db::feedback::create(&mut connection, form.into_new_feedback()?)?;

            println!("Recorded feedback {}", record.id);
        }
        FeedbackCommands::MarkRead { id } => set_read(&mut connection, id, true)?,
        FeedbackCommands::MarkUnread { id } => set_read(&mut connection, id, false)?,
    }

    Ok(())
}

fn set_read(connection: &mut diesel::PgConnection, id: Uuid, read: bool) -> Result<(), AdminError> {
    let record = db::feedback::find(connection, id).ok_or_else(|| AdminError {
        msg: format!("feedback {id} not found"),
    })?;

    db::feedback::set_read(connection, &record, read)?;

    Ok(())
}

fn print_feedback(record: &Feedback) {
    let marker = if record.read { " " } else { "*" };

    println!(
        "{} {} {} [{}] {}: {}",
        marker,
        record.id,
        record.created_at.format("%Y-%m-%d %H:%M"),
        record.feedback_type,
        record.username,
        record.subject.as_deref().unwrap_or("(no subject)")
    );
    println!("    {}", record.message);
}

fn replay(path: &std::path::Path) -> Result<(), AdminError> {
    let payload = std::fs::read_to_string(path)?;
    let mut connection = db::pool().get()?;

    let outcome = handler::handle_payload(&mut connection, &Plans::from_config(), &payload)?;

    println!("{outcome:?}");

    Ok(())
}

fn notify_test(username: &str) -> Result<(), AdminError> {
    let mut connection = db::pool().get()?;

    let user = db::users::find_by_username(&mut connection, username).ok_or_else(|| AdminError {
        msg: format!("user {username} not found"),
    })?;
    let settings =
        db::user_settings::find(&mut connection, &user.username).ok_or_else(|| AdminError {
            msg: format!("user {username} has no notification settings"),
        })?;

    let chat_id = send_test_message(
        &TelegramNotifier::default(),
        &settings,
        &user,
        Config::telegram_chat_id().as_deref(),
    )?;

    println!("Test notification sent to Telegram chat {chat_id}");

    Ok(())
}

fn quote(symbol: &str) -> Result<(), AdminError> {
    let quotes = cross_market_quotes(&YahooQuotes::default(), symbol);

    if quotes.is_empty() {
        return Err(AdminError {
            msg: format!("no market data for {}", symbol.trim().to_uppercase()),
        });
    }

    for quote in quotes {
        match quote.change_pct {
            Some(change) => println!(
                "{:<12} {:<4} {:>10.2} {:+.2}%",
                quote.symbol,
                quote.market(),
                quote.price,
                change
            ),
            None => println!("{:<12} {:<4} {:>10.2}", quote.symbol, quote.market(), quote.price),
        }
    }

    Ok(())
}
