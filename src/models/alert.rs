use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertCondition {
    Above,
    Below,
}

impl AlertCondition {
    pub fn as_str(self) -> &'static str {
        match self {
            AlertCondition::Above => "above",
            AlertCondition::Below => "below",
        }
    }

    /// Both directions are inclusive: a price equal to the target fires.
    pub fn is_met(self, price: f64, target_price: f64) -> bool {
        match self {
            AlertCondition::Above => price >= target_price,
            AlertCondition::Below => price <= target_price,
        }
    }
}

impl fmt::Display for AlertCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AlertCondition {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "above" => Ok(AlertCondition::Above),
            "below" => Ok(AlertCondition::Below),
            other => Err(format!("unknown condition: {other}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub id: String,

    pub owner_id: String,
    pub asset: String,

    pub target_price: f64,
    pub condition: AlertCondition,

    pub is_active: bool,
    pub is_triggered: bool,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Alert {
    pub fn is_pending(&self) -> bool {
        self.is_active && !self.is_triggered
    }
}

/// Mutable status fields of an alert. Everything else is fixed at creation.
///
/// The flags always satisfy `is_active == !is_triggered`, and a triggered
/// alert stays triggered; [`AlertPatch::resolve`] refuses anything else.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AlertPatch {
    pub is_active: Option<bool>,
    pub is_triggered: Option<bool>,
}

impl AlertPatch {
    pub fn triggered() -> Self {
        Self {
            is_active: Some(false),
            is_triggered: Some(true),
        }
    }

    /// `(is_active, is_triggered)` after applying the patch to `alert`, or
    /// `None` when the result would pause, re-activate or otherwise leave the
    /// flags inconsistent.
    pub fn resolve(&self, alert: &Alert) -> Option<(bool, bool)> {
        let active = self.is_active.unwrap_or(alert.is_active);
        let triggered = self.is_triggered.unwrap_or(alert.is_triggered);

        if active == triggered {
            return None;
        }
        if alert.is_triggered && !triggered {
            return None;
        }
        Some((active, triggered))
    }

    /// Applies the patch if [`resolve`](Self::resolve) allows it. Returns
    /// false and leaves `alert` untouched otherwise.
    pub fn apply(&self, alert: &mut Alert, now: DateTime<Utc>) -> bool {
        let Some((active, triggered)) = self.resolve(alert) else {
            return false;
        };
        alert.is_active = active;
        alert.is_triggered = triggered;
        alert.updated_at = now;
        true
    }
}
