use std::collections::HashMap;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use crate::models::RateQuote;
use crate::repo::RateRepo;
use crate::services::{http_client, ApiError};

pub const BASE_CURRENCY: &str = "USD";
pub const QUOTE_CURRENCY: &str = "JPY";
pub const FALLBACK_SOURCE: &str = "configured fallback";

/// Provider of live USD->JPY rates
pub trait RateSource {
    /// Short name recorded as the rate's source
    fn name(&self) -> &str;
    fn fetch_usd_jpy(&self) -> Result<f64, ApiError>;
}

#[derive(Debug, Deserialize)]
struct LatestRatesResponse {
    rates: HashMap<String, f64>,
}

/// Rate source reading `rates.JPY` from a JSON endpoint keyed on USD
pub struct HttpRateSource {
    url: String,
    name: String,
}

impl HttpRateSource {
    pub fn new(url: &str) -> Self {
        let name = reqwest::Url::parse(url)
            .ok()
            .and_then(|u| u.host_str().map(str::to_string))
            .unwrap_or_else(|| url.to_string());
        Self {
            url: url.to_string(),
            name,
        }
    }
}

impl RateSource for HttpRateSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn fetch_usd_jpy(&self) -> Result<f64, ApiError> {
        let response = http_client()?
            .get(&self.url)
            .send()
            .map_err(|e| ApiError::Network(e.to_string()))?;
        if !response.status().is_success() {
            return Err(ApiError::Server(response.status().to_string()));
        }
        let body: LatestRatesResponse = response.json().map_err(|e| ApiError::Parse(e.to_string()))?;
        parse_rate(&body.rates)
    }
}

fn parse_rate(rates: &HashMap<String, f64>) -> Result<f64, ApiError> {
    match rates.get(QUOTE_CURRENCY) {
        Some(rate) if rate.is_finite() && *rate > 0.0 => Ok(*rate),
        Some(rate) => Err(ApiError::Parse(format!("invalid {} rate {}", QUOTE_CURRENCY, rate))),
        None => Err(ApiError::Parse(format!("no {} rate in response", QUOTE_CURRENCY))),
    }
}

/// Result of a rate lookup
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExchangeRate {
    pub base: String,
    pub quote: String,
    pub rate: f64,
    pub success: bool,
    pub source: String,
    pub is_fallback: bool,
    pub fetched_ts: i64,
}

impl ExchangeRate {
    fn from_quote(quote: RateQuote, source: String) -> Self {
        Self {
            base: quote.base,
            quote: quote.quote,
            rate: quote.rate,
            success: true,
            source,
            is_fallback: false,
            fetched_ts: quote.fetched_ts,
        }
    }

    pub fn convert(&self, usd: f64) -> f64 {
        usd * self.rate
    }
}

/// USD->JPY lookup with a persisted cache
///
/// A cached rate younger than `ttl_secs` is served without contacting the
/// source. Each live fetch replaces the cache and is appended to the rate
/// history used by the dashboard's candle chart.
pub struct ExchangeRateService<S: RateSource> {
    source: S,
    ttl_secs: i64,
}

impl<S: RateSource> ExchangeRateService<S> {
    pub fn new(source: S, ttl_secs: i64) -> Self {
        Self { source, ttl_secs }
    }

    fn fresh_cached(&self, conn: &Connection, now: i64) -> Option<RateQuote> {
        match RateRepo::get_cached(conn, BASE_CURRENCY, QUOTE_CURRENCY) {
            Ok(Some(cached)) if now - cached.fetched_ts < self.ttl_secs && now >= cached.fetched_ts => Some(cached),
            Ok(_) => None,
            Err(e) => {
                log::warn!("Exchange rate cache unavailable: {:#}", e);
                None
            }
        }
    }

    /// Cached or live rate; errors only when the live lookup fails
    pub fn get_exchange_rate(&self, conn: &Connection) -> Result<ExchangeRate, ApiError> {
        let now = chrono::Utc::now().timestamp();
        if let Some(cached) = self.fresh_cached(conn, now) {
            let source = format!("{} (cached)", cached.source);
            return Ok(ExchangeRate::from_quote(cached, source));
        }

        let rate = self.source.fetch_usd_jpy()?;
        let quote = RateQuote {
            base: BASE_CURRENCY.to_string(),
            quote: QUOTE_CURRENCY.to_string(),
            rate,
            source: self.source.name().to_string(),
            fetched_ts: now,
        };
        if let Err(e) = RateRepo::store(conn, &quote) {
            log::warn!("Failed to cache exchange rate: {:#}", e);
        }
        let source = quote.source.clone();
        Ok(ExchangeRate::from_quote(quote, source))
    }

    /// Never fails: a failed lookup yields `fallback`, marked as such
    pub fn get_exchange_rate_with_fallback(&self, conn: &Connection, fallback: f64) -> ExchangeRate {
        match self.get_exchange_rate(conn) {
            Ok(rate) => rate,
            Err(e) => {
                log::warn!("Exchange rate lookup via {} failed ({}); using fallback {}", self.source.name(), e, fallback);
                ExchangeRate {
                    base: BASE_CURRENCY.to_string(),
                    quote: QUOTE_CURRENCY.to_string(),
                    rate: fallback,
                    success: true,
                    source: FALLBACK_SOURCE.to_string(),
                    is_fallback: true,
                    fetched_ts: chrono::Utc::now().timestamp(),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::DbConnection;
    use std::cell::Cell;

    struct StubSource {
        result: Result<f64, ApiError>,
        calls: Cell<usize>,
    }

    impl StubSource {
        fn ok(rate: f64) -> Self {
            Self { result: Ok(rate), calls: Cell::new(0) }
        }

        fn down() -> Self {
            Self { result: Err(ApiError::Network("connection refused".to_string())), calls: Cell::new(0) }
        }
    }

    impl RateSource for StubSource {
        fn name(&self) -> &str {
            "stub"
        }

        fn fetch_usd_jpy(&self) -> Result<f64, ApiError> {
            self.calls.set(self.calls.get() + 1);
            self.result.clone()
        }
    }

    #[test]
    fn test_unreachable_source_uses_fallback() {
        let conn = DbConnection::connect_in_memory().unwrap();
        let service = ExchangeRateService::new(StubSource::down(), 3600);

        let rate = service.get_exchange_rate_with_fallback(&conn, 150.0);
        assert_eq!(rate.rate, 150.0);
        assert!(rate.success);
        assert!(rate.is_fallback);
        assert!(rate.source.ends_with("fallback"));
    }

    #[test]
    fn test_live_rate_is_cached_for_ttl() {
        let conn = DbConnection::connect_in_memory().unwrap();
        let service = ExchangeRateService::new(StubSource::ok(148.25), 3600);

        let first = service.get_exchange_rate_with_fallback(&conn, 150.0);
        assert_eq!(first.rate, 148.25);
        assert!(!first.is_fallback);
        assert_eq!(first.source, "stub");

        let second = service.get_exchange_rate_with_fallback(&conn, 150.0);
        assert_eq!(second.rate, 148.25);
        assert_eq!(second.source, "stub (cached)");
        assert_eq!(service.source.calls.get(), 1);
    }

    #[test]
    fn test_stale_cache_is_refreshed() {
        let conn = DbConnection::connect_in_memory().unwrap();
        let stale = chrono::Utc::now().timestamp() - 7200;
        RateRepo::store(&conn, &RateQuote {
            base: BASE_CURRENCY.to_string(),
            quote: QUOTE_CURRENCY.to_string(),
            rate: 140.0,
            source: "old".to_string(),
            fetched_ts: stale,
        }).unwrap();

        let service = ExchangeRateService::new(StubSource::ok(155.0), 3600);
        let rate = service.get_exchange_rate_with_fallback(&conn, 150.0);
        assert_eq!(rate.rate, 155.0);
        assert_eq!(service.source.calls.get(), 1);
        assert_eq!(RateRepo::history_since(&conn, BASE_CURRENCY, QUOTE_CURRENCY, 0).unwrap().len(), 2);
    }

    #[test]
    fn test_parse_rate_rejects_bad_values() {
        let mut rates = HashMap::new();
        assert!(parse_rate(&rates).is_err());
        rates.insert("JPY".to_string(), -1.0);
        assert!(parse_rate(&rates).is_err());
        rates.insert("JPY".to_string(), 151.3);
        assert_eq!(parse_rate(&rates), Ok(151.3));
    }

    #[test]
    fn test_http_source_name_is_host() {
        let source = HttpRateSource::new("https://open.er-api.com/v6/latest/USD");
        assert_eq!(source.name(), "open.er-api.com");
    }
}
