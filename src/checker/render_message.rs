use crate::checker::quotes::Quote;
use crate::config::Config;
use crate::models::alert::{Alert, AlertKind};
use crate::models::user::User;

pub fn render_alert_message(user: &User, alert: &Alert, quote: &Quote) -> String {
    let direction = match alert.kind() {
        Some(AlertKind::Below) => "🔽 below",
        _ => "🔼 above",
    };

    format!(
        "🚀 Alert Triggered!\n\n\
         Hi {},\n\n\
         {} crossed your target!\n\n\
         💰 Current Price: ${:.2}\n\
         🎯 Your Target: ${:.2} {}\n\n\
         Manage alerts: {}\n\n\
         Stock Alerts Pro",
        user.name,
        alert.symbol,
        quote.price,
        alert.target,
        direction,
        Config::app_url()
    )
}

pub fn render_test_message(user: &User) -> String {
    format!(
        "🧪 Test Alert\n\n\
         Hi {}!\n\n\
         This is a test from Stock Alerts Pro.\n\n\
         If you received this, your Telegram alerts are working perfectly! ✅",
        user.name
    )
}
