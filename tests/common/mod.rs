#![allow(dead_code)]

use std::{
    collections::{BTreeSet, HashMap},
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
};

use async_trait::async_trait;
use axum::http::{header, Request};
use http_body_util::BodyExt;
use cryptoalert::{
    config,
    models::CurrentUser,
    services::{
        auth_service,
        coingecko::{fallback_assets, AssetInfo, AssetPrice, PriceSource},
        notifier::{AlertNotification, Notifier},
        store::{AlertStore, MemoryStore},
    },
    AppState,
};

/// Price source with canned quotes that records every call.
#[derive(Default)]
pub struct FakePrices {
    quotes: Mutex<HashMap<String, AssetPrice>>,
    calls: AtomicUsize,
    requested: Mutex<Vec<BTreeSet<String>>>,
}

impl FakePrices {
    pub fn with(quotes: &[(&str, f64)]) -> Arc<Self> {
        let fake = Self::default();
        for (id, price) in quotes {
            fake.set(id, *price);
        }
        Arc::new(fake)
    }

    pub fn set(&self, id: &str, price: f64) {
        self.quotes.lock().unwrap().insert(
            id.to_string(),
            AssetPrice {
                price,
                change_24h: 1.5,
            },
        );
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requested(&self) -> Vec<BTreeSet<String>> {
        self.requested.lock().unwrap().clone()
    }
}

#[async_trait]
impl PriceSource for FakePrices {
    async fn fetch_prices(&self, asset_ids: &BTreeSet<String>) -> HashMap<String, AssetPrice> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requested.lock().unwrap().push(asset_ids.clone());

        let quotes = self.quotes.lock().unwrap();
        asset_ids
            .iter()
            .filter_map(|id| quotes.get(id).map(|q| (id.clone(), *q)))
            .collect()
    }

    async fn list_supported_assets(&self) -> Vec<AssetInfo> {
        fallback_assets()
    }
}

/// Notifier that records what it was asked to send.
pub struct FakeNotifier {
    succeed: bool,
    sent: Mutex<Vec<AlertNotification>>,
}

impl FakeNotifier {
    pub fn ok() -> Arc<Self> {
        Arc::new(Self {
            succeed: true,
            sent: Mutex::new(Vec::new()),
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            succeed: false,
            sent: Mutex::new(Vec::new()),
        })
    }

    pub fn sent(&self) -> Vec<AlertNotification> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for FakeNotifier {
    async fn send(&self, notification: &AlertNotification) -> bool {
        self.sent.lock().unwrap().push(notification.clone());
        self.succeed
    }
}

pub fn test_settings() -> config::Settings {
    let mut settings = config::load();
    settings.jwt_secret = "integration-test-secret".to_string();
    settings.cron_secret = None;
    settings.smtp = None;
    settings
}

pub struct TestApp {
    pub state: AppState,
    pub store: Arc<MemoryStore>,
    pub prices: Arc<FakePrices>,
    pub notifier: Arc<FakeNotifier>,
}

pub fn test_app_with(settings: config::Settings, prices: Arc<FakePrices>) -> TestApp {
    let store = Arc::new(MemoryStore::new());
    let notifier = FakeNotifier::ok();

    let state = AppState::new(
        settings,
        store.clone() as Arc<dyn AlertStore>,
        prices.clone() as Arc<dyn PriceSource>,
        notifier.clone() as Arc<dyn Notifier>,
    );

    TestApp {
        state,
        store,
        prices,
        notifier,
    }
}

pub fn test_app() -> TestApp {
    test_app_with(test_settings(), FakePrices::with(&[]))
}

pub fn bearer_for(state: &AppState, user: &CurrentUser) -> String {
    let token = auth_service::make_jwt(&state.settings, user).expect("jwt");
    format!("Bearer {token}")
}

pub fn identity(id: &str) -> CurrentUser {
    CurrentUser {
        id: id.to_string(),
        email: format!("{id}@example.com"),
        name: None,
    }
}

pub fn json_request(method: &str, uri: &str, auth: Option<&str>, body: serde_json::Value) -> Request<axum::body::Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(auth) = auth {
        builder = builder.header(header::AUTHORIZATION, auth);
    }
    builder.body(axum::body::Body::from(body.to_string())).unwrap()
}

pub fn empty_request(method: &str, uri: &str, auth: Option<&str>) -> Request<axum::body::Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(auth) = auth {
        builder = builder.header(header::AUTHORIZATION, auth);
    }
    builder.body(axum::body::Body::empty()).unwrap()
}

pub async fn response_json(res: axum::response::Response) -> serde_json::Value {
    let bytes = res.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null)
}
