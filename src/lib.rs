//! Library entrypoint for CryptoAlert.
//!
//! This file exists mainly to make controller tests easy (integration tests
//! under `tests/` can import the app state, routers, controllers, services).

use std::{sync::Arc, time::Duration};

pub mod config;
pub mod error;
pub mod models;

// Keep these modules at crate root because the codebase references them as
// `crate::auth` and `crate::templates`.
#[path = "middleware/auth.rs"]
pub mod auth;

pub mod services;

#[path = "views/templates.rs"]
pub mod templates;

pub mod controllers;
pub mod routes;

use services::{
    alert_monitor::AlertMonitor,
    coingecko::{CoinGeckoClient, PriceSource, RetryPolicy},
    notifier::{LogNotifier, Notifier, SmtpNotifier},
    store::{AlertStore, JsonFileStore, MemoryStore, MongoStore, StoreResult},
};

#[derive(Clone)]
pub struct AppState {
    pub settings: config::Settings,
    pub store: Arc<dyn AlertStore>,
    pub prices: Arc<dyn PriceSource>,
    pub monitor: Arc<AlertMonitor>,
}

impl AppState {
    pub fn new(
        settings: config::Settings,
        store: Arc<dyn AlertStore>,
        prices: Arc<dyn PriceSource>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let monitor = Arc::new(AlertMonitor::new(store.clone(), prices.clone(), notifier));
        Self {
            settings,
            store,
            prices,
            monitor,
        }
    }
}

pub async fn build_store(settings: &config::Settings) -> StoreResult<Arc<dyn AlertStore>> {
    let store: Arc<dyn AlertStore> = match &settings.storage {
        config::StorageBackend::Memory { snapshot: None } => Arc::new(MemoryStore::new()),
        config::StorageBackend::Memory { snapshot: Some(path) } => Arc::new(MemoryStore::open(path).await?),
        config::StorageBackend::JsonFile { path } => Arc::new(JsonFileStore::new(path)),
        config::StorageBackend::Mongo { uri, db } => Arc::new(MongoStore::connect(uri, db).await?),
    };
    Ok(store)
}

pub fn build_price_source(settings: &config::Settings) -> Arc<dyn PriceSource> {
    let retry = RetryPolicy::with_base_delay(Duration::from_millis(settings.price_retry_base_ms));
    Arc::new(
        CoinGeckoClient::new(&settings.coingecko_api_url, settings.coingecko_api_key.clone())
            .with_retry(retry),
    )
}

/// SMTP when configured, otherwise a notifier that only logs.
pub fn build_notifier(settings: &config::Settings) -> Arc<dyn Notifier> {
    let Some(smtp) = &settings.smtp else {
        tracing::warn!("SMTP_HOST not set, alert emails will only be logged");
        return Arc::new(LogNotifier);
    };

    match SmtpNotifier::new(smtp, templates::build_handlebars()) {
        Ok(n) => Arc::new(n),
        Err(e) => {
            tracing::error!(error = %e, "invalid SMTP configuration, alert emails will only be logged");
            Arc::new(LogNotifier)
        }
    }
}
