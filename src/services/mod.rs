pub mod coingecko;
pub mod db_init;
pub mod alert_monitor;
pub mod notifier;
pub mod store;

pub mod auth_service;
pub mod alerts_service;
