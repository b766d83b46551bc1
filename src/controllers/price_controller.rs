use std::collections::BTreeSet;

use axum::{
    extract::{Query, State},
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use serde_json::{json, Map, Value};

use crate::AppState;

const DEFAULT_ASSETS: [&str; 5] = ["bitcoin", "ethereum", "binancecoin", "solana", "ripple"];

#[derive(Debug, Default, Deserialize)]
pub struct PriceQuery {
    pub crypto: Option<String>,
    pub ids: Option<String>,
    pub list: Option<String>,
}

fn parse_ids(raw: &str) -> BTreeSet<String> {
    raw.split(',')
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}

// GET /api/price?list=true | ?crypto=bitcoin | ?ids=bitcoin,ethereum
pub async fn get_price(
    State(state): State<AppState>,
    Query(query): Query<PriceQuery>,
) -> impl IntoResponse {
    if query.list.as_deref() == Some("true") {
        let cryptos = state.prices.list_supported_assets().await;
        return Json(json!({ "cryptos": cryptos }));
    }

    if let Some(crypto) = query.crypto.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        let crypto = crypto.to_lowercase();
        let ids = BTreeSet::from([crypto.clone()]);
        let quote = state.prices.fetch_prices(&ids).await.remove(&crypto);

        return Json(json!({
            "crypto": crypto,
            "price": quote.map(|q| q.price).unwrap_or(0.0),
            "change24h": quote.map(|q| q.change_24h).unwrap_or(0.0),
        }));
    }

    let ids = match query.ids.as_deref().map(parse_ids) {
        Some(ids) if !ids.is_empty() => ids,
        _ => DEFAULT_ASSETS.iter().map(|s| s.to_string()).collect(),
    };

    let prices = state.prices.fetch_prices(&ids).await;
    let mut out = Map::new();
    for (id, p) in prices {
        out.insert(id, json!({ "usd": p.price, "usd_24h_change": p.change_24h }));
    }

    Json(json!({ "prices": Value::Object(out) }))
}
