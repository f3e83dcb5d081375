//! Robinhood REST API client.

use std::time::Duration;

use log::debug;
use reqwest::StatusCode;
use reqwest::blocking::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use zeroize::Zeroizing;

use super::types::{
    AccountInfo, InstrumentInfo, OrderInfo, OrderPayload, Page, PortfolioInfo, PositionInfo,
    QuoteInfo, QuotesResponse, TokenRequest, TokenResponse, WatchlistInfo, WatchlistItem,
};
use crate::error::BrokerError;

/// Production API root.
pub const DEFAULT_BASE_URL: &str = "https://api.robinhood.com";

/// Public OAuth client id used by the Robinhood web and mobile apps.
const CLIENT_ID: &str = "c82SH0WZOsabOXGP2sxqcj34FxkvfnWRZBKlBjFS";

/// Upper bound on pages followed for one listing.
const MAX_PAGES: usize = 100;

/// Blocking Robinhood REST client.
pub struct RobinhoodClient {
    client: Client,
    base_url: String,
    token: Option<Zeroizing<String>>,
}

impl RobinhoodClient {
    /// Create an unauthenticated client.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, BrokerError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| BrokerError::Connection(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: None,
        })
    }

    /// Use an existing access token instead of logging in.
    pub fn with_token(mut self, token: &str) -> Self {
        self.token = Some(Zeroizing::new(token.to_string()));
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    /// Resolve a path against the base URL; absolute URLs pass through.
    fn endpoint(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            path.to_string()
        } else {
            format!("{}{path}", self.base_url)
        }
    }

    fn authorized(&self, req: RequestBuilder) -> Result<RequestBuilder, BrokerError> {
        let token = self.token.as_ref().ok_or(BrokerError::NotConnected)?;
        Ok(req.bearer_auth(token.as_str()))
    }

    /// Password + MFA login (POST /oauth2/token/). Stores the access token.
    pub fn authenticate(
        &mut self,
        username: &str,
        password: &str,
        mfa_code: &str,
        device_token: &str,
    ) -> Result<(), BrokerError> {
        let url = self.endpoint("/oauth2/token/");
        let body = TokenRequest {
            client_id: CLIENT_ID,
            expires_in: 86_400,
            grant_type: "password",
            password,
            scope: "internal",
            username,
            challenge_type: "sms",
            device_token,
            mfa_code,
        };

        let resp = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .map_err(|e| BrokerError::Connection(format!("login request failed: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().unwrap_or_default();
            return Err(BrokerError::Auth(format!("login returned {status}: {body}")));
        }

        let token: TokenResponse = resp
            .json()
            .map_err(|e| BrokerError::Auth(format!("failed to parse login response: {e}")))?;

        match token.access_token {
            Some(access) => {
                debug!("Authenticated as {username}");
                self.token = Some(Zeroizing::new(access));
                Ok(())
            }
            None if token.mfa_required => {
                Err(BrokerError::Auth("MFA code rejected or missing".into()))
            }
            None => Err(BrokerError::Auth(
                token.detail.unwrap_or_else(|| "no access token in response".into()),
            )),
        }
    }

    /// Authenticated GET returning JSON.
    pub fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, BrokerError> {
        let url = self.endpoint(path);
        debug!("GET {url}");
        let resp = self
            .authorized(self.client.get(&url))?
            .send()
            .map_err(|e| BrokerError::Connection(format!("GET {url} failed: {e}")))?;
        parse_json(check(resp, &url)?, &url)
    }

    /// Authenticated GET following `next` links until exhausted.
    pub fn get_all<T: DeserializeOwned>(&self, path: &str) -> Result<Vec<T>, BrokerError> {
        let mut out = Vec::new();
        let mut next = Some(path.to_string());
        let mut pages = 0;

        while let Some(url) = next {
            if pages == MAX_PAGES {
                return Err(BrokerError::Api(format!(
                    "pagination for {path} exceeded {MAX_PAGES} pages"
                )));
            }
            let page: Page<T> = self.get(&url)?;
            out.extend(page.results);
            next = page.next;
            pages += 1;
        }

        Ok(out)
    }

    /// Authenticated POST with a JSON body.
    fn post<B: serde::Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, BrokerError> {
        let url = self.endpoint(path);
        debug!("POST {url}");
        let resp = self
            .authorized(self.client.post(&url))?
            .json(body)
            .send()
            .map_err(|e| BrokerError::Connection(format!("POST {url} failed: {e}")))?;
        parse_json(check(resp, &url)?, &url)
    }

    /// Accounts (GET /accounts/).
    pub fn accounts(&self) -> Result<Vec<AccountInfo>, BrokerError> {
        self.get_all("/accounts/")
    }

    /// Portfolio valuation (GET /portfolios/), first entry.
    pub fn portfolio(&self) -> Result<PortfolioInfo, BrokerError> {
        self.get_all::<PortfolioInfo>("/portfolios/")?
            .into_iter()
            .next()
            .ok_or_else(|| BrokerError::Api("no portfolio returned".into()))
    }

    /// Nonzero positions (GET /positions/?nonzero=true).
    pub fn positions(&self) -> Result<Vec<PositionInfo>, BrokerError> {
        self.get_all("/positions/?nonzero=true")
    }

    /// Instrument at an instrument URL.
    pub fn instrument(&self, url: &str) -> Result<InstrumentInfo, BrokerError> {
        self.get(url)
    }

    /// Instrument lookup by ticker (GET /instruments/?symbol=).
    pub fn instrument_by_symbol(&self, symbol: &str) -> Result<Option<InstrumentInfo>, BrokerError> {
        let page: Page<InstrumentInfo> = self.get(&format!("/instruments/?symbol={symbol}"))?;
        Ok(page.results.into_iter().next())
    }

    /// Latest quote (GET /quotes/?symbols=).
    pub fn quote(&self, symbol: &str) -> Result<Option<QuoteInfo>, BrokerError> {
        let quotes: QuotesResponse = self.get(&format!("/quotes/?symbols={symbol}"))?;
        Ok(quotes.results.into_iter().flatten().next())
    }

    /// Default watchlists (GET /midlands/lists/default/).
    pub fn watchlists(&self) -> Result<Vec<WatchlistInfo>, BrokerError> {
        self.get_all("/midlands/lists/default/")
    }

    /// Entries of one watchlist (GET /midlands/lists/items/?list_id=).
    pub fn watchlist_items(&self, list_id: &str) -> Result<Vec<WatchlistItem>, BrokerError> {
        self.get_all(&format!("/midlands/lists/items/?list_id={list_id}"))
    }

    /// Submit an order (POST /orders/).
    pub fn place_order(&self, payload: &OrderPayload) -> Result<OrderInfo, BrokerError> {
        self.post("/orders/", payload).map_err(|e| match e {
            BrokerError::Api(msg) => BrokerError::Order(msg),
            other => other,
        })
    }

    /// All orders, newest first (GET /orders/).
    pub fn orders(&self) -> Result<Vec<OrderInfo>, BrokerError> {
        self.get_all("/orders/")
    }

    /// Cancel an order (POST /orders/{id}/cancel/).
    pub fn cancel_order(&self, id: &str) -> Result<(), BrokerError> {
        let url = self.endpoint(&format!("/orders/{id}/cancel/"));
        debug!("POST {url}");
        let resp = self
            .authorized(self.client.post(&url))?
            .send()
            .map_err(|e| BrokerError::Order(format!("cancel request failed: {e}")))?;
        check(resp, &url).map_err(|e| match e {
            BrokerError::Api(msg) => BrokerError::Order(msg),
            other => other,
        })?;
        Ok(())
    }
}

/// Map non-success statuses to errors.
fn check(resp: Response, url: &str) -> Result<Response, BrokerError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().unwrap_or_default();
    Err(match status {
        StatusCode::TOO_MANY_REQUESTS => BrokerError::RateLimit,
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            BrokerError::Auth(format!("{url} returned {status}: {body}"))
        }
        _ => BrokerError::Api(format!("{url} returned {status}: {body}")),
    })
}

fn parse_json<T: DeserializeOwned>(resp: Response, url: &str) -> Result<T, BrokerError> {
    resp.json::<T>()
        .map_err(|e| BrokerError::Api(format!("failed to parse response from {url}: {e}")))
}
