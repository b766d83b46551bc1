//! Market data from the CoinGecko v3 API.
//!
//! Callers never see an upstream failure: prices degrade to an empty map and
//! the catalog degrades to [`fallback_assets`]. Only HTTP 429 is retried.

use std::{
    collections::{BTreeSet, HashMap},
    future::Future,
    time::Duration,
};

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
const MARKETS_PAGE_SIZE: u32 = 50;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AssetPrice {
    pub price: f64,
    pub change_24h: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetInfo {
    pub id: String,
    pub name: String,
    pub symbol: String,
}

#[async_trait]
pub trait PriceSource: Send + Sync {
    /// Current USD price and 24h change per asset id. Unknown ids are absent.
    async fn fetch_prices(&self, asset_ids: &BTreeSet<String>) -> HashMap<String, AssetPrice>;

    /// Display catalog, largest market cap first.
    async fn list_supported_assets(&self) -> Vec<AssetInfo>;
}

pub fn fallback_assets() -> Vec<AssetInfo> {
    [
        ("bitcoin", "Bitcoin", "BTC"),
        ("ethereum", "Ethereum", "ETH"),
        ("binancecoin", "BNB", "BNB"),
        ("solana", "Solana", "SOL"),
        ("ripple", "XRP", "XRP"),
        ("cardano", "Cardano", "ADA"),
        ("dogecoin", "Dogecoin", "DOGE"),
        ("polkadot", "Polkadot", "DOT"),
    ]
    .into_iter()
    .map(|(id, name, symbol)| AssetInfo {
        id: id.to_string(),
        name: name.to_string(),
        symbol: symbol.to_string(),
    })
    .collect()
}

#[derive(Debug, thiserror::Error)]
pub enum PriceError {
    #[error("rate limited by upstream")]
    RateLimited,

    #[error("upstream returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    pub fn with_base_delay(base_delay: Duration) -> Self {
        Self {
            base_delay,
            ..Self::default()
        }
    }

    /// Wait after the given (1-based) failed attempt: base, 2*base, 4*base, ...
    pub fn delay_after(&self, attempt: u32) -> Duration {
        self.base_delay * 2u32.saturating_pow(attempt.saturating_sub(1))
    }
}

/// Runs `op` until it succeeds, fails with anything other than a rate limit,
/// or `policy.max_attempts` is used up.
pub async fn with_rate_limit_retry<T, F, Fut>(policy: RetryPolicy, mut op: F) -> Result<T, PriceError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, PriceError>>,
{
    let mut attempt = 1;
    loop {
        match op().await {
            Err(PriceError::RateLimited) if attempt < policy.max_attempts => {
                let delay = policy.delay_after(attempt);
                tracing::warn!(
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    "price upstream rate limited, backing off"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            other => return other,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SimplePrice {
    #[serde(default)]
    pub usd: Option<f64>,
    #[serde(default)]
    pub usd_24h_change: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct MarketItem {
    pub id: String,
    pub name: String,
    pub symbol: String,
}

#[derive(Clone)]
pub struct CoinGeckoClient {
    http: Client,
    base_url: String,
    api_key: Option<String>,
    retry: RetryPolicy,
}

impl CoinGeckoClient {
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> Self {
        let http = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, PriceError> {
        let url = format!("{}{}", self.base_url, path);
        let mut req = self.http.get(url).query(query);
        if let Some(key) = &self.api_key {
            req = req.header("x-cg-demo-api-key", key);
        }

        let res = req.send().await?;

        if res.status() == StatusCode::TOO_MANY_REQUESTS {
            return Err(PriceError::RateLimited);
        }
        if !res.status().is_success() {
            let status = res.status().as_u16();
            let body = res.text().await.unwrap_or_default();
            return Err(PriceError::Status { status, body });
        }

        Ok(res.json::<T>().await?)
    }

    pub async fn simple_price(
        &self,
        asset_ids: &BTreeSet<String>,
    ) -> Result<HashMap<String, SimplePrice>, PriceError> {
        let ids = asset_ids.iter().map(String::as_str).collect::<Vec<_>>().join(",");
        let query = [
            ("ids", ids),
            ("vs_currencies", "usd".to_string()),
            ("include_24hr_change", "true".to_string()),
        ];

        let client = self;
        let query = &query;
        with_rate_limit_retry(self.retry, move || client.get_json("/simple/price", query)).await
    }

    pub async fn markets(&self) -> Result<Vec<MarketItem>, PriceError> {
        let query = [
            ("vs_currency", "usd".to_string()),
            ("order", "market_cap_desc".to_string()),
            ("per_page", MARKETS_PAGE_SIZE.to_string()),
            ("page", "1".to_string()),
        ];

        let client = self;
        let query = &query;
        with_rate_limit_retry(self.retry, move || client.get_json("/coins/markets", query)).await
    }
}

#[async_trait]
impl PriceSource for CoinGeckoClient {
    async fn fetch_prices(&self, asset_ids: &BTreeSet<String>) -> HashMap<String, AssetPrice> {
        if asset_ids.is_empty() {
            return HashMap::new();
        }

        match self.simple_price(asset_ids).await {
            Ok(raw) => raw
                .into_iter()
                .filter_map(|(id, p)| {
                    let price = p.usd?;
                    if !price.is_finite() || price <= 0.0 {
                        return None;
                    }
                    let change_24h = p.usd_24h_change.filter(|c| c.is_finite()).unwrap_or(0.0);
                    Some((id, AssetPrice { price, change_24h }))
                })
                .collect(),
            Err(e) => {
                tracing::error!(error = %e, assets = asset_ids.len(), "failed to fetch crypto prices");
                HashMap::new()
            }
        }
    }

    async fn list_supported_assets(&self) -> Vec<AssetInfo> {
        match self.markets().await {
            Ok(items) => items
                .into_iter()
                .map(|it| AssetInfo {
                    id: it.id,
                    name: it.name,
                    symbol: it.symbol.to_uppercase(),
                })
                .collect(),
            Err(e) => {
                tracing::warn!(error = %e, "failed to fetch supported cryptos, using fallback list");
                fallback_assets()
            }
        }
    }
}
