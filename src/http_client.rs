use crate::config::Config;
use isahc::config::RedirectPolicy;
use isahc::prelude::*;
use isahc::HttpClient;
use std::sync::OnceLock;
use std::time::Duration;

static CLIENT: OnceLock<HttpClient> = OnceLock::new();

const USER_AGENT: &str = concat!("stock_alerts/", env!("CARGO_PKG_VERSION"));

pub fn client() -> &'static HttpClient {
    CLIENT.get_or_init(init_client)
}

fn init_client() -> HttpClient {
    HttpClient::builder()
        .redirect_policy(RedirectPolicy::Limit(5))
        .timeout(request_timeout_seconds())
        .default_header("user-agent", USER_AGENT)
        .build()
        .unwrap_or_else(|error| panic!("Failed to build http client: {error}"))
}

fn request_timeout_seconds() -> Duration {
    let secs = Config::request_timeout_in_seconds();

    Duration::from_secs(secs)
}
