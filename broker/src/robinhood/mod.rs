//! Robinhood broker implementation.

pub mod auth;
pub mod client;
pub mod types;

use std::fmt;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use log::{debug, info};
use rhfolio::{AccountType, Amount, Side, Symbol};
use rustc_hash::FxHashMap;
use zeroize::Zeroizing;

use crate::Brokerage;
use crate::error::BrokerError;
use crate::types::*;
use client::RobinhoodClient;
use types::{DollarAmount, OrderPayload, parse_cents, parse_f64, parse_f64_or_zero};

/// Login credentials. Secrets are wiped from memory on drop.
pub struct Credentials {
    username: String,
    password: Zeroizing<String>,
    totp_secret: Zeroizing<String>,
}

impl Credentials {
    pub fn new(username: &str, password: &str, totp_secret: &str) -> Self {
        Self {
            username: username.to_string(),
            password: Zeroizing::new(password.to_string()),
            totp_secret: Zeroizing::new(totp_secret.to_string()),
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn password(&self) -> &str {
        &self.password
    }

    pub fn totp_secret(&self) -> &str {
        &self.totp_secret
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("totp_secret", &"<redacted>")
            .finish()
    }
}

/// Instrument lookups are repeated for every position and order; cache both
/// directions.
#[derive(Default)]
struct InstrumentCache {
    by_url: FxHashMap<String, Symbol>,
    by_symbol: FxHashMap<Symbol, (String, Option<f64>)>,
}

/// Robinhood broker implementing the `Brokerage` trait.
///
/// Uses the REST API for all operations. Blocking (sync) via reqwest::blocking.
pub struct RobinhoodBroker {
    client: RobinhoodClient,
    account_url: String,
    instruments: Mutex<InstrumentCache>,
}

impl RobinhoodBroker {
    /// Log in with username, password and a TOTP code derived from the
    /// credentials' secret, then bind to the first brokerage account.
    pub fn login(
        credentials: &Credentials,
        base_url: &str,
        timeout: Duration,
    ) -> Result<Self, BrokerError> {
        let mut client = RobinhoodClient::new(base_url, timeout)?;
        let code = Zeroizing::new(auth::current_code(credentials.totp_secret())?);
        let device_token = uuid::Uuid::new_v4().to_string();

        client.authenticate(
            credentials.username(),
            credentials.password(),
            &code,
            &device_token,
        )?;
        info!("Logged in to Robinhood as {}", credentials.username());

        Self::from_client(client)
    }

    /// Wrap an already-authenticated client.
    pub fn from_client(client: RobinhoodClient) -> Result<Self, BrokerError> {
        if !client.is_authenticated() {
            return Err(BrokerError::NotConnected);
        }
        let account = client
            .accounts()?
            .into_iter()
            .next()
            .ok_or_else(|| BrokerError::Api("no brokerage account found".into()))?;
        debug!("Using account {}", account.account_number);

        Ok(Self {
            client,
            account_url: account.url,
            instruments: Mutex::new(InstrumentCache::default()),
        })
    }

    fn cache(&self) -> MutexGuard<'_, InstrumentCache> {
        self.instruments
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Ticker for an instrument URL.
    fn symbol_for_instrument(&self, url: &str) -> Result<Symbol, BrokerError> {
        if let Some(sym) = self.cache().by_url.get(url) {
            return Ok(*sym);
        }
        let instrument = self.client.instrument(url)?;
        let symbol = Symbol::try_new(&instrument.symbol)
            .ok_or_else(|| BrokerError::InvalidSymbol(instrument.symbol.clone()))?;
        let ratio = instrument
            .margin_initial_ratio
            .as_deref()
            .map(|r| parse_f64("margin_initial_ratio", r))
            .transpose()?;

        let mut cache = self.cache();
        cache.by_url.insert(url.to_string(), symbol);
        cache.by_symbol.insert(symbol, (instrument.url, ratio));
        Ok(symbol)
    }

    /// Instrument URL and margin ratio for a ticker.
    fn instrument_for_symbol(&self, symbol: &Symbol) -> Result<(String, Option<f64>), BrokerError> {
        if let Some(entry) = self.cache().by_symbol.get(symbol) {
            return Ok(entry.clone());
        }
        let instrument = self
            .client
            .instrument_by_symbol(symbol.as_str())?
            .ok_or_else(|| BrokerError::InvalidSymbol(symbol.as_str().to_string()))?;
        let ratio = instrument
            .margin_initial_ratio
            .as_deref()
            .map(|r| parse_f64("margin_initial_ratio", r))
            .transpose()?;

        let mut cache = self.cache();
        cache.by_url.insert(instrument.url.clone(), *symbol);
        cache
            .by_symbol
            .insert(*symbol, (instrument.url.clone(), ratio));
        Ok((instrument.url, ratio))
    }

    /// Build the POST /orders/ body for a request at `price_cents`.
    fn order_payload(
        &self,
        order: &OrderRequest,
        instrument: String,
        price_cents: i64,
    ) -> Result<OrderPayload, BrokerError> {
        if price_cents <= 0 {
            return Err(BrokerError::Order(format!(
                "no usable price for {}",
                order.symbol
            )));
        }
        let price = price_cents as f64 / 100.0;

        let (quantity, dollar_based_amount) = match order.amount {
            Amount::Dollars(cents) => {
                if cents <= 0 {
                    return Err(BrokerError::Order(format!(
                        "non-positive dollar amount for {}",
                        order.symbol
                    )));
                }
                let dollars = cents as f64 / 100.0;
                (
                    format_quantity(dollars / price),
                    Some(DollarAmount {
                        amount: format!("{dollars:.2}"),
                        currency_code: "USD",
                    }),
                )
            }
            Amount::Shares(qty) => {
                if !(qty.is_finite() && qty > 0.0) {
                    return Err(BrokerError::Order(format!(
                        "invalid share quantity {qty} for {}",
                        order.symbol
                    )));
                }
                (format_quantity(qty), None)
            }
        };

        Ok(OrderPayload {
            account: self.account_url.clone(),
            instrument,
            symbol: order.symbol.as_str().to_string(),
            price: format!("{price:.2}"),
            quantity,
            ref_id: uuid::Uuid::new_v4().to_string(),
            // Extended-hours sessions only accept limit orders
            order_type: if order.extended_hours { "limit" } else { "market" },
            time_in_force: order.time_in_force.as_str(),
            trigger: "immediate",
            side: order.side.as_str(),
            extended_hours: order.extended_hours,
            dollar_based_amount,
        })
    }
}

/// Share quantities go out with at most six decimals, trailing zeros trimmed.
fn format_quantity(qty: f64) -> String {
    let s = format!("{qty:.6}");
    let s = s.trim_end_matches('0').trim_end_matches('.');
    if s.is_empty() { "0".to_string() } else { s.to_string() }
}

fn parse_side(side: &str) -> Result<Side, BrokerError> {
    side.parse::<Side>().map_err(|_| BrokerError::Parse {
        field: "side",
        value: side.to_string(),
    })
}

impl Brokerage for RobinhoodBroker {
    fn watchlist(&self, name: &str) -> Result<Vec<Symbol>, BrokerError> {
        let list = self
            .client
            .watchlists()?
            .into_iter()
            .find(|w| w.display_name == name)
            .ok_or_else(|| BrokerError::WatchlistNotFound(name.to_string()))?;

        self.client
            .watchlist_items(&list.id)?
            .into_iter()
            .map(|item| {
                Symbol::try_new(&item.symbol).ok_or(BrokerError::InvalidSymbol(item.symbol))
            })
            .collect()
    }

    fn account_profile(&self) -> Result<AccountProfile, BrokerError> {
        let account = self
            .client
            .accounts()?
            .into_iter()
            .next()
            .ok_or_else(|| BrokerError::Api("no brokerage account found".into()))?;

        let account_type = match account.account_type.as_str() {
            "margin" => AccountType::Margin,
            "cash" => AccountType::Cash,
            other => {
                debug!("Unknown account type {other:?}; treating as cash");
                AccountType::Cash
            }
        };

        Ok(AccountProfile {
            account_number: account.account_number,
            buying_power_cents: parse_cents("buying_power", &account.buying_power)?,
            account_type,
        })
    }

    fn portfolio_profile(&self) -> Result<PortfolioProfile, BrokerError> {
        let p = self.client.portfolio()?;
        let cents = |field, v: Option<&str>| -> Result<i64, BrokerError> {
            v.map_or(Ok(0), |v| parse_cents(field, v))
        };

        Ok(PortfolioProfile {
            market_value_cents: cents("market_value", p.market_value.as_deref())?,
            extended_hours_market_value_cents: p
                .extended_hours_market_value
                .as_deref()
                .map(|v| parse_cents("extended_hours_market_value", v))
                .transpose()?,
            equity_cents: cents("equity", p.equity.as_deref())?,
        })
    }

    fn open_positions(&self) -> Result<Vec<Holding>, BrokerError> {
        self.client
            .positions()?
            .into_iter()
            .map(|p| {
                Ok(Holding {
                    symbol: self.symbol_for_instrument(&p.instrument)?,
                    quantity: parse_f64("quantity", &p.quantity)?,
                    available_shares: parse_f64_or_zero(
                        "shares_available_for_exercise",
                        p.shares_available_for_exercise.as_deref(),
                    )?,
                    collateral_shares: parse_f64_or_zero(
                        "shares_held_for_options_collateral",
                        p.shares_held_for_options_collateral.as_deref(),
                    )?,
                })
            })
            .collect()
    }

    fn latest_price(&self, symbol: &Symbol) -> Result<i64, BrokerError> {
        let quote = self
            .client
            .quote(symbol.as_str())?
            .ok_or_else(|| BrokerError::InvalidSymbol(symbol.as_str().to_string()))?;
        let price = quote.latest_price().ok_or_else(|| {
            BrokerError::Api(format!("no trade price for {symbol}"))
        })?;
        parse_cents("last_trade_price", price)
    }

    fn margin_initial_ratio(&self, symbol: &Symbol) -> Result<Option<f64>, BrokerError> {
        Ok(self.instrument_for_symbol(symbol)?.1)
    }

    fn submit_order(&self, order: &OrderRequest) -> Result<OrderTicket, BrokerError> {
        let (instrument, _) = self.instrument_for_symbol(&order.symbol)?;
        let price_cents = self.latest_price(&order.symbol)?;
        let payload = self.order_payload(order, instrument, price_cents)?;

        debug!("Submitting Robinhood order: {order}");
        let placed = self.client.place_order(&payload)?;

        Ok(OrderTicket {
            id: OrderId(placed.id),
            state: placed.state,
        })
    }

    fn cancel_order(&self, id: &OrderId) -> Result<(), BrokerError> {
        self.client.cancel_order(&id.0)
    }

    fn open_orders(&self) -> Result<Vec<OpenOrder>, BrokerError> {
        self.client
            .orders()?
            .into_iter()
            .filter(|o| o.cancel.is_some())
            .map(|o| {
                Ok(OpenOrder {
                    symbol: self.symbol_for_instrument(&o.instrument)?,
                    side: parse_side(&o.side)?,
                    quantity: parse_f64_or_zero("quantity", o.quantity.as_deref())?,
                    id: OrderId(o.id),
                    state: o.state,
                })
            })
            .collect()
    }
}
