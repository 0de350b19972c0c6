use crate::config::Config;
use crate::http_client;
use isahc::prelude::*;
use serde::Deserialize;
use std::fmt;

#[cfg(test)]
use mockall::automock;

/// Suffix of symbols listed on the Australian exchange.
pub const ASX_SUFFIX: &str = ".AX";

#[derive(Debug, Clone, PartialEq)]
pub struct Quote {
    pub symbol: String,
    pub price: f64,
    pub change_pct: Option<f64>,
}

impl Quote {
    pub fn market(&self) -> &'static str {
        if self.symbol.ends_with(ASX_SUFFIX) {
            "ASX"
        } else {
            "US"
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuoteError {
    pub msg: String,
}

impl fmt::Display for QuoteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.msg)
    }
}

impl From<isahc::Error> for QuoteError {
    fn from(error: isahc::Error) -> Self {
        QuoteError {
            msg: format!("http error: {error}"),
        }
    }
}

impl From<std::io::Error> for QuoteError {
    fn from(error: std::io::Error) -> Self {
        QuoteError {
            msg: format!("io error: {error}"),
        }
    }
}

impl From<serde_json::Error> for QuoteError {
    fn from(error: serde_json::Error) -> Self {
        QuoteError {
            msg: format!("invalid quote response: {error}"),
        }
    }
}

#[cfg_attr(test, automock)]
pub trait QuoteSource {
    /// Quote of exactly this listing. `Ok(None)` when the market has no data for it.
    fn listing(&self, symbol: &str) -> Result<Option<Quote>, QuoteError>;

    /// Quote of a symbol, falling back to its ASX listing.
    fn quote(&self, symbol: &str) -> Result<Option<Quote>, QuoteError> {
        with_market_fallback(symbol, |symbol| self.listing(symbol))
    }
}

/// Every listing of a symbol that has data, US first, then ASX.
pub fn cross_market_quotes<Q: QuoteSource>(source: &Q, symbol: &str) -> Vec<Quote> {
    let symbol = symbol.trim().to_uppercase();
    let base = symbol.strip_suffix(ASX_SUFFIX).unwrap_or(&symbol);

    [base.to_string(), format!("{base}{ASX_SUFFIX}")]
        .iter()
        .filter_map(|listing| match source.listing(listing) {
            Ok(quote) => quote,
            Err(error) => {
                log::error!("Failed to look up {}: {}", listing, error);
                None
            }
        })
        .collect()
}

/// Tries the symbol as given, then as an ASX listing when it has no suffix.
pub fn with_market_fallback<F>(symbol: &str, mut fetch: F) -> Result<Option<Quote>, QuoteError>
where
    F: FnMut(&str) -> Result<Option<Quote>, QuoteError>,
{
    let symbol = symbol.trim().to_uppercase();

    if let Some(quote) = fetch(&symbol)? {
        return Ok(Some(quote));
    }

    if symbol.ends_with(ASX_SUFFIX) {
        return Ok(None);
    }

    fetch(&format!("{symbol}{ASX_SUFFIX}"))
}

#[derive(Debug, Clone)]
pub struct YahooQuotes {
    base_url: String,
}

impl Default for YahooQuotes {
    fn default() -> Self {
        Self::new(Config::quotes_base_url())
    }
}

impl YahooQuotes {
    pub fn new(base_url: &str) -> Self {
        YahooQuotes {
            base_url: base_url.to_string(),
        }
    }

    fn chart_url(&self, symbol: &str) -> String {
        let encoded = url::form_urlencoded::byte_serialize(symbol.as_bytes())
            .collect::<String>()
            .replace('+', "%20");

        format!("{}{}?range=1d&interval=1d", self.base_url, encoded)
    }

    fn fetch(&self, symbol: &str) -> Result<Option<Quote>, QuoteError> {
        let url = self.chart_url(symbol);

        let mut response = http_client::client().get(url)?;
        let status = response.status();

        if status.as_u16() == 404 {
            return Ok(None);
        }

        if !status.is_success() {
            return Err(QuoteError {
                msg: format!("quote request for {symbol} failed with status {status}"),
            });
        }

        let body = response.text()?;

        parse_chart(symbol, &body)
    }
}

impl QuoteSource for YahooQuotes {
    fn listing(&self, symbol: &str) -> Result<Option<Quote>, QuoteError> {
        self.fetch(symbol)
    }
}

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: Chart,
}

#[derive(Debug, Deserialize)]
struct Chart {
    result: Option<Vec<ChartResult>>,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    meta: ChartMeta,
    indicators: Option<Indicators>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChartMeta {
    regular_market_price: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    #[serde(default)]
    quote: Vec<Bars>,
}

#[derive(Debug, Deserialize)]
struct Bars {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
}

/// Latest close of the day and its change against the day's open.
pub fn parse_chart(symbol: &str, body: &str) -> Result<Option<Quote>, QuoteError> {
    let response: ChartResponse = serde_json::from_str(body)?;

    let result = match response.chart.result.and_then(|results| results.into_iter().next()) {
        Some(result) => result,
        None => return Ok(None),
    };

    let bars = result
        .indicators
        .and_then(|indicators| indicators.quote.into_iter().next());

    let last_bar = bars.as_ref().and_then(|bars| {
        bars.close
            .iter()
            .enumerate()
            .rev()
            .find_map(|(index, close)| close.map(|close| (index, close)))
    });

    let (price, open) = match last_bar {
        Some((index, close)) => {
            let open = bars
                .as_ref()
                .and_then(|bars| bars.open.get(index).copied().flatten());

            (close, open)
        }
        None => match result.meta.regular_market_price {
            Some(price) => (price, None),
            None => return Ok(None),
        },
    };

    let change_pct = open
        .filter(|open| *open > 0.0)
        .map(|open| (price - open) / open * 100.0);

    Ok(Some(Quote {
        symbol: symbol.to_string(),
        price,
        change_pct,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quote(symbol: &str, price: f64) -> Quote {
        Quote {
            symbol: symbol.to_string(),
            price,
            change_pct: None,
        }
    }

    #[test]
    fn parse_chart_uses_last_close_and_open() {
        let body = r#"{"chart":{"result":[{"meta":{"regularMarketPrice":101.0},
            "timestamp":[1,2],
            "indicators":{"quote":[{"open":[90.0,100.0],"close":[95.0,110.0]}]}}],"error":null}}"#;

        let quote = parse_chart("AAPL", body).unwrap().unwrap();

        assert_eq!(quote.symbol, "AAPL");
        assert_eq!(quote.price, 110.0);
        assert!((quote.change_pct.unwrap() - 10.0).abs() < 1e-9);
    }

    #[test]
    fn parse_chart_skips_missing_closes() {
        let body = r#"{"chart":{"result":[{"meta":{},
            "indicators":{"quote":[{"open":[50.0,null],"close":[40.0,null]}]}}],"error":null}}"#;

        let quote = parse_chart("BHP.AX", body).unwrap().unwrap();

        assert_eq!(quote.price, 40.0);
        assert!((quote.change_pct.unwrap() + 20.0).abs() < 1e-9);
    }

    #[test]
    fn parse_chart_falls_back_to_market_price() {
        let body = r#"{"chart":{"result":[{"meta":{"regularMarketPrice":12.5},
            "indicators":{"quote":[{}]}}],"error":null}}"#;

        let quote = parse_chart("CBA.AX", body).unwrap().unwrap();

        assert_eq!(quote.price, 12.5);
        assert_eq!(quote.change_pct, None);
    }

    #[test]
    fn parse_chart_without_result_has_no_quote() {
        let body = r#"{"chart":{"result":null,"error":{"code":"Not Found","description":"No data found"}}}"#;

        assert_eq!(parse_chart("NOPE", body).unwrap(), None);
    }

    #[test]
    fn parse_chart_rejects_garbage() {
        assert!(parse_chart("AAPL", "<html>").is_err());
    }

    #[test]
    fn fallback_returns_direct_hit() {
        let mut requested = vec![];

        let result = with_market_fallback("aapl", |symbol| {
            requested.push(symbol.to_string());
            Ok(Some(quote(symbol, 1.0)))
        })
        .unwrap();

        assert_eq!(result.unwrap().symbol, "AAPL");
        assert_eq!(requested, vec!["AAPL".to_string()]);
    }

    #[test]
    fn fallback_tries_asx_listing() {
        let mut requested = vec![];

        let result = with_market_fallback("bhp", |symbol| {
            requested.push(symbol.to_string());

            if symbol.ends_with(ASX_SUFFIX) {
                Ok(Some(quote(symbol, 45.0)))
            } else {
                Ok(None)
            }
        })
        .unwrap();

        assert_eq!(result.unwrap().symbol, "BHP.AX");
        assert_eq!(requested, vec!["BHP".to_string(), "BHP.AX".to_string()]);
    }

    #[test]
    fn fallback_does_not_double_the_suffix() {
        let mut calls = 0;

        let result = with_market_fallback("BHP.AX", |_| {
            calls += 1;
            Ok(None)
        })
        .unwrap();

        assert_eq!(result, None);
        assert_eq!(calls, 1);
    }

    #[test]
    fn chart_url_encodes_the_symbol() {
        let quotes = YahooQuotes::new("https://quotes.test/chart/");

        assert_eq!(
            quotes.chart_url("^GSPC"),
            "https://quotes.test/chart/%5EGSPC?range=1d&interval=1d"
        );
        assert_eq!(
            quotes.chart_url("BRK B"),
            "https://quotes.test/chart/BRK%20B?range=1d&interval=1d"
        );
        assert_eq!(
            quotes.chart_url("BHP.AX"),
            "https://quotes.test/chart/BHP.AX?range=1d&interval=1d"
        );
    }

    #[test]
    fn quote_falls_back_through_listings() {
        let mut source = MockQuoteSource::new();
        source
            .expect_listing()
            .withf(|symbol| symbol == "BHP")
            .times(1)
            .returning(|_| Ok(None));
        source
            .expect_listing()
            .withf(|symbol| symbol == "BHP.AX")
            .times(1)
            .returning(|symbol| Ok(Some(quote(symbol, 45.0))));

        let result = with_market_fallback("bhp", |symbol| source.listing(symbol)).unwrap();

        assert_eq!(result.unwrap().market(), "ASX");
    }

    #[test]
    fn cross_market_quotes_returns_every_listing() {
        let mut source = MockQuoteSource::new();
        source
            .expect_listing()
            .withf(|symbol| symbol == "BHP")
            .times(1)
            .returning(|symbol| Ok(Some(quote(symbol, 31.0))));
        source
            .expect_listing()
            .withf(|symbol| symbol == "BHP.AX")
            .times(1)
            .returning(|symbol| Ok(Some(quote(symbol, 45.0))));

        let quotes = cross_market_quotes(&source, "bhp.ax");

        let listings: Vec<(&str, &str)> = quotes
            .iter()
            .map(|quote| (quote.symbol.as_str(), quote.market()))
            .collect();
        assert_eq!(listings, vec![("BHP", "US"), ("BHP.AX", "ASX")]);
    }

    #[test]
    fn cross_market_quotes_skips_failed_listings() {
        let mut source = MockQuoteSource::new();
        source
            .expect_listing()
            .withf(|symbol| symbol == "AAPL")
            .returning(|symbol| Ok(Some(quote(symbol, 190.0))));
        source
            .expect_listing()
            .withf(|symbol| symbol == "AAPL.AX")
            .returning(|_| {
                Err(QuoteError {
                    msg: "timeout".to_string(),
                })
            });

        let quotes = cross_market_quotes(&source, "AAPL");

        assert_eq!(quotes, vec![quote("AAPL", 190.0)]);
    }

    #[test]
    fn fallback_propagates_errors() {
        let result = with_market_fallback("AAPL", |_| {
            Err(QuoteError {
                msg: "timeout".to_string(),
            })
        });

        assert_eq!(result.unwrap_err().msg, "timeout");
    }
}
