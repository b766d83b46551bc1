use std::net::SocketAddr;

use cryptoalert::{build_notifier, build_price_source, build_store, config, routes, AppState};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let settings = config::load();

    let store = build_store(&settings)
        .await
        .expect("Failed to initialize alert store");
    let prices = build_price_source(&settings);
    let notifier = build_notifier(&settings);

    let state = AppState::new(settings.clone(), store, prices, notifier);
    let app = routes::app(state);

    let ip = settings
        .host
        .parse::<std::net::IpAddr>()
        .expect("HOST must be an IP address");
    let addr = SocketAddr::from((ip, settings.port));
    tracing::info!(storage = ?settings.storage, "listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}
