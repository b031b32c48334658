use serde::{Deserialize, Serialize};

/// An observed exchange rate (units of `quote` per one `base`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateQuote {
    pub base: String,
    pub quote: String,
    pub rate: f64,
    pub source: String,
    pub fetched_ts: i64,
}
