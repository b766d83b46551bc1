use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    error::AppError,
    models::{Alert, AlertCondition, TriggeredAlert},
    AppState,
};

/// Body of a create request. Fields are optional so that missing values
/// surface as validation errors rather than extractor rejections.
#[derive(Debug, Default, Deserialize)]
pub struct CreateAlertInput {
    #[serde(default, alias = "cryptocurrency")]
    pub asset: Option<String>,

    #[serde(default, alias = "targetPrice")]
    pub target_price: Option<Value>,

    #[serde(default)]
    pub condition: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlertWithLatest {
    #[serde(flatten)]
    pub alert: Alert,
    pub latest_trigger: Option<TriggeredAlert>,
}

fn parse_target_price(raw: &Value) -> Option<f64> {
    let v = match raw {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    Some(v)
}

/// Normalized `(asset, target_price, condition)` or a validation error.
pub fn validate_new_alert(input: &CreateAlertInput) -> Result<(String, f64, AlertCondition), AppError> {
    let asset = input
        .asset
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty());
    let condition = input
        .condition
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty());
    let target = input.target_price.as_ref().filter(|v| !v.is_null());

    let (Some(asset), Some(target), Some(condition)) = (asset, target, condition) else {
        return Err(AppError::Validation(
            "Cryptocurrency, target price, and condition are required".into(),
        ));
    };

    let condition: AlertCondition = condition.parse().map_err(|_| {
        AppError::Validation(r#"Condition must be either "above" or "below""#.into())
    })?;

    let target_price = match parse_target_price(target) {
        Some(v) if v.is_finite() && v > 0.0 => v,
        _ => {
            return Err(AppError::Validation(
                "Target price must be a positive number".into(),
            ))
        }
    };

    Ok((asset.to_lowercase(), target_price, condition))
}

pub async fn create_alert(
    state: &AppState,
    owner_id: &str,
    input: &CreateAlertInput,
) -> Result<Alert, AppError> {
    let (asset, target_price, condition) = validate_new_alert(input)?;

    let alert = state
        .store
        .create_alert(owner_id, &asset, target_price, condition)
        .await?;

    tracing::info!(alert_id = %alert.id, owner_id, asset = %alert.asset, "alert created");
    Ok(alert)
}

/// Caller's alerts, newest first, each with its most recent trigger record.
/// `triggered` narrows the list to triggered (`Some(true)`) or pending
/// (`Some(false)`) alerts; the HTTP handler always passes one of the two.
pub async fn list_alerts(
    state: &AppState,
    owner_id: &str,
    triggered: Option<bool>,
) -> Result<Vec<AlertWithLatest>, AppError> {
    let mut alerts = state.store.get_alerts_by_owner(owner_id).await?;
    if let Some(flag) = triggered {
        alerts.retain(|a| a.is_triggered == flag);
    }
    alerts.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| b.id.cmp(&a.id)));

    let mut latest: HashMap<String, TriggeredAlert> = HashMap::new();
    for t in state.store.get_triggered_alerts_by_owner(owner_id).await? {
        match latest.get(&t.alert_id) {
            Some(existing) if existing.triggered_at >= t.triggered_at => {}
            _ => {
                latest.insert(t.alert_id.clone(), t);
            }
        }
    }

    Ok(alerts
        .into_iter()
        .map(|alert| {
            let latest_trigger = latest.remove(&alert.id);
            AlertWithLatest {
                alert,
                latest_trigger,
            }
        })
        .collect())
}

/// Deletes one of the caller's alerts. Someone else's alert is reported
/// exactly like a missing one.
pub async fn delete_alert_for_owner(
    state: &AppState,
    owner_id: &str,
    alert_id: &str,
) -> Result<(), AppError> {
    let not_found = || AppError::NotFound("Alert not found".into());

    match state.store.find_alert_by_id(alert_id).await? {
        Some(a) if a.owner_id == owner_id => {}
        _ => return Err(not_found()),
    }

    if !state.store.delete_alert(alert_id).await? {
        return Err(not_found());
    }

    tracing::info!(alert_id, owner_id, "alert deleted");
    Ok(())
}
