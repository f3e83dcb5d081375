//! Robinhood-specific API request and response types.
//!
//! Robinhood encodes numbers as decimal strings; fields are kept as `String`
//! here and converted by [`parse_f64`] and [`parse_cents`].

use serde::{Deserialize, Serialize};

use crate::error::BrokerError;

/// Paginated list envelope. `next` is an absolute URL or null.
#[derive(Debug, Deserialize)]
pub struct Page<T> {
    #[serde(default)]
    pub next: Option<String>,
    pub results: Vec<T>,
}

/// OAuth token request body (POST /oauth2/token/).
#[derive(Debug, Serialize)]
pub struct TokenRequest<'a> {
    pub client_id: &'a str,
    pub expires_in: u64,
    pub grant_type: &'a str,
    pub password: &'a str,
    pub scope: &'a str,
    pub username: &'a str,
    pub challenge_type: &'a str,
    pub device_token: &'a str,
    pub mfa_code: &'a str,
}

/// OAuth token response.
#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub mfa_required: bool,
    #[serde(default)]
    pub detail: Option<String>,
}

/// Brokerage account (GET /accounts/).
#[derive(Debug, Deserialize)]
pub struct AccountInfo {
    pub url: String,
    pub account_number: String,
    pub buying_power: String,
    #[serde(rename = "type")]
    pub account_type: String,
}

/// Portfolio valuation (GET /portfolios/).
#[derive(Debug, Deserialize)]
pub struct PortfolioInfo {
    #[serde(default)]
    pub market_value: Option<String>,
    #[serde(default)]
    pub equity: Option<String>,
    #[serde(default)]
    pub extended_hours_market_value: Option<String>,
}

/// Open position (GET /positions/?nonzero=true).
#[derive(Debug, Deserialize)]
pub struct PositionInfo {
    pub instrument: String,
    pub quantity: String,
    #[serde(default)]
    pub shares_available_for_exercise: Option<String>,
    #[serde(default)]
    pub shares_held_for_options_collateral: Option<String>,
}

/// Instrument record (instrument URL or GET /instruments/?symbol=).
#[derive(Debug, Deserialize)]
pub struct InstrumentInfo {
    pub url: String,
    pub symbol: String,
    #[serde(default)]
    pub margin_initial_ratio: Option<String>,
}

/// Quote (GET /quotes/?symbols=).
#[derive(Debug, Deserialize)]
pub struct QuoteInfo {
    pub symbol: String,
    #[serde(default)]
    pub last_trade_price: Option<String>,
    #[serde(default)]
    pub last_extended_hours_trade_price: Option<String>,
}

impl QuoteInfo {
    /// Extended-hours trade price when present, regular otherwise.
    pub fn latest_price(&self) -> Option<&str> {
        self.last_extended_hours_trade_price
            .as_deref()
            .or(self.last_trade_price.as_deref())
    }
}

/// Quotes envelope; unknown symbols come back as null entries.
#[derive(Debug, Deserialize)]
pub struct QuotesResponse {
    pub results: Vec<Option<QuoteInfo>>,
}

/// Watchlist header (GET /midlands/lists/default/).
#[derive(Debug, Deserialize)]
pub struct WatchlistInfo {
    pub id: String,
    pub display_name: String,
}

/// Watchlist entry (GET /midlands/lists/items/?list_id=).
#[derive(Debug, Deserialize)]
pub struct WatchlistItem {
    pub symbol: String,
}

/// Dollar notional for fractional orders.
#[derive(Debug, Serialize, PartialEq)]
pub struct DollarAmount {
    pub amount: String,
    pub currency_code: &'static str,
}

/// Order request body (POST /orders/).
#[derive(Debug, Serialize)]
pub struct OrderPayload {
    pub account: String,
    pub instrument: String,
    pub symbol: String,
    pub price: String,
    pub quantity: String,
    pub ref_id: String,
    #[serde(rename = "type")]
    pub order_type: &'static str,
    pub time_in_force: &'static str,
    pub trigger: &'static str,
    pub side: &'static str,
    pub extended_hours: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dollar_based_amount: Option<DollarAmount>,
}

/// Order record (POST /orders/ response and GET /orders/).
#[derive(Debug, Deserialize)]
pub struct OrderInfo {
    pub id: String,
    pub state: String,
    pub side: String,
    pub instrument: String,
    #[serde(default)]
    pub quantity: Option<String>,
    /// Cancel URL; null once the order can no longer be cancelled.
    #[serde(default)]
    pub cancel: Option<String>,
}

/// Parse a decimal string.
pub fn parse_f64(field: &'static str, value: &str) -> Result<f64, BrokerError> {
    value
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| BrokerError::Parse {
            field,
            value: value.to_string(),
        })
}

/// Parse a decimal dollar string to cents (e.g., "185.50" → 18550).
pub fn parse_cents(field: &'static str, value: &str) -> Result<i64, BrokerError> {
    parse_f64(field, value).map(|d| (d * 100.0).round() as i64)
}

/// Parse an optional decimal string, treating null as zero.
pub fn parse_f64_or_zero(field: &'static str, value: Option<&str>) -> Result<f64, BrokerError> {
    value.map_or(Ok(0.0), |v| parse_f64(field, v))
}
