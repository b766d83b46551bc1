use std::{collections::BTreeSet, sync::Arc};

use serde::Serialize;
use tokio::sync::Mutex;

use crate::{
    models::Alert,
    services::{
        coingecko::PriceSource,
        notifier::{AlertNotification, Notifier},
        store::{AlertStore, StoreError},
    },
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PassReport {
    /// Active alerts loaded at the start of the pass.
    pub checked: usize,
    pub triggered: usize,
    pub skipped_no_price: usize,
    pub failed: usize,
}

/// Matches active alerts against current prices. Has no timer of its own;
/// passes are started from outside (see the cron controller).
pub struct AlertMonitor {
    store: Arc<dyn AlertStore>,
    prices: Arc<dyn PriceSource>,
    notifier: Arc<dyn Notifier>,
    // overlapping passes would race on the same alerts
    pass_lock: Mutex<()>,
}

impl AlertMonitor {
    pub fn new(
        store: Arc<dyn AlertStore>,
        prices: Arc<dyn PriceSource>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            store,
            prices,
            notifier,
            pass_lock: Mutex::new(()),
        }
    }

    /// One full scan of active alerts. Fails only if the active alerts cannot
    /// be loaded; per-alert problems are logged and counted in the report.
    pub async fn run_evaluation_pass(&self) -> Result<PassReport, StoreError> {
        let _guard = self.pass_lock.lock().await;

        // 1) All active, untriggered alerts
        let active = self.store.get_active_alerts().await?;
        if active.is_empty() {
            tracing::debug!("no active alerts to check");
            return Ok(PassReport::default());
        }

        // 2) One price request for every distinct asset
        let assets: BTreeSet<String> = active.iter().map(|a| a.asset.clone()).collect();
        let prices = self.prices.fetch_prices(&assets).await;

        let mut report = PassReport {
            checked: active.len(),
            ..PassReport::default()
        };

        // 3) Check each alert
        for alert in &active {
            let Some(quote) = prices.get(&alert.asset) else {
                report.skipped_no_price += 1;
                continue;
            };

            if !alert.condition.is_met(quote.price, alert.target_price) {
                continue;
            }

            match self.trigger(alert, quote.price).await {
                Ok(true) => report.triggered += 1,
                Ok(false) => {}
                Err(e) => {
                    report.failed += 1;
                    tracing::error!(alert_id = %alert.id, error = %e, "failed to trigger alert");
                }
            }
        }

        tracing::info!(
            checked = report.checked,
            assets = assets.len(),
            priced = prices.len(),
            triggered = report.triggered,
            skipped_no_price = report.skipped_no_price,
            failed = report.failed,
            "alert evaluation pass finished"
        );

        Ok(report)
    }

    /// Commits the trigger, records history, then notifies. Returns false when
    /// the alert was no longer pending.
    async fn trigger(&self, alert: &Alert, price: f64) -> Result<bool, StoreError> {
        if self.store.mark_triggered(&alert.id).await?.is_none() {
            tracing::debug!(alert_id = %alert.id, "alert no longer pending, skipping");
            return Ok(false);
        }

        tracing::info!(
            alert_id = %alert.id,
            asset = %alert.asset,
            condition = %alert.condition,
            target_price = alert.target_price,
            price,
            "alert triggered"
        );

        // the transition is committed; a history failure does not undo it
        if let Err(e) = self.store.create_triggered_alert(&alert.id, price).await {
            tracing::error!(alert_id = %alert.id, error = %e, "failed to record triggered alert");
        }

        self.notify_owner(alert, price).await;
        Ok(true)
    }

    async fn notify_owner(&self, alert: &Alert, price: f64) {
        let owner = match self.store.find_user_by_id(&alert.owner_id).await {
            Ok(Some(u)) => u,
            Ok(None) => {
                tracing::warn!(alert_id = %alert.id, owner_id = %alert.owner_id, "alert owner not found, no notification sent");
                return;
            }
            Err(e) => {
                tracing::error!(alert_id = %alert.id, error = %e, "failed to look up alert owner");
                return;
            }
        };

        let notification = AlertNotification {
            to_address: owner.email,
            asset: alert.asset.clone(),
            target_price: alert.target_price,
            current_price: price,
            condition: alert.condition,
        };

        if !self.notifier.send(&notification).await {
            tracing::warn!(alert_id = %alert.id, "alert notification failed; alert stays triggered");
        }
    }
}
