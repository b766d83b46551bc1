use std::collections::{BTreeSet, HashMap};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{new_id, StoreError, StoreResult};
use crate::models::{Alert, AlertCondition, AlertPatch, TriggeredAlert, User};

pub const SCHEMA_VERSION: u32 = 1;

fn default_version() -> u32 {
    // Documents written before versioning carry no version field.
    1
}

/// On-disk layout shared by the file backends.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreDocument {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub users: Vec<User>,
    #[serde(default)]
    pub alerts: Vec<Alert>,
    #[serde(default)]
    pub triggered_alerts: Vec<TriggeredAlert>,
}

/// Users, alerts and trigger history keyed by id, with secondary indexes by
/// alert owner and by triggering alert.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    users: HashMap<String, User>,
    alerts: HashMap<String, Alert>,
    triggered: HashMap<String, TriggeredAlert>,

    alerts_by_owner: HashMap<String, BTreeSet<String>>,
    history_by_alert: HashMap<String, BTreeSet<String>>,
}

impl Dataset {
    pub fn from_document(doc: StoreDocument) -> StoreResult<Self> {
        if doc.version > SCHEMA_VERSION {
            return Err(StoreError::UnsupportedSchema(doc.version));
        }

        let mut ds = Dataset::default();
        for u in doc.users {
            ds.users.insert(u.id.clone(), u);
        }
        for a in doc.alerts {
            ds.index_alert(&a);
            ds.alerts.insert(a.id.clone(), a);
        }
        for t in doc.triggered_alerts {
            ds.history_by_alert
                .entry(t.alert_id.clone())
                .or_default()
                .insert(t.id.clone());
            ds.triggered.insert(t.id.clone(), t);
        }
        Ok(ds)
    }

    pub fn from_json(raw: &str) -> StoreResult<Self> {
        if raw.trim().is_empty() {
            return Ok(Dataset::default());
        }
        let doc: StoreDocument = serde_json::from_str(raw)?;
        Self::from_document(doc)
    }

    pub fn to_document(&self) -> StoreDocument {
        let mut users: Vec<User> = self.users.values().cloned().collect();
        users.sort_by(|a, b| (a.created_at, &a.id).cmp(&(b.created_at, &b.id)));

        let mut alerts: Vec<Alert> = self.alerts.values().cloned().collect();
        sort_alerts(&mut alerts);

        let mut triggered_alerts: Vec<TriggeredAlert> = self.triggered.values().cloned().collect();
        sort_history(&mut triggered_alerts);

        StoreDocument {
            version: SCHEMA_VERSION,
            users,
            alerts,
            triggered_alerts,
        }
    }

    pub fn to_json(&self) -> StoreResult<String> {
        Ok(serde_json::to_string_pretty(&self.to_document())?)
    }

    fn index_alert(&mut self, alert: &Alert) {
        self.alerts_by_owner
            .entry(alert.owner_id.clone())
            .or_default()
            .insert(alert.id.clone());
    }

    // ---------------- users ----------------

    pub fn create_user(
        &mut self,
        email: &str,
        password_hash: &str,
        name: Option<&str>,
        now: DateTime<Utc>,
    ) -> StoreResult<User> {
        if self.find_user_by_email(email).is_some() {
            return Err(StoreError::Conflict(format!("email {email} is already registered")));
        }

        let user = User {
            id: new_id(),
            email: email.to_string(),
            password_hash: password_hash.to_string(),
            name: name.map(str::to_string),
            created_at: now,
            updated_at: now,
        };
        self.users.insert(user.id.clone(), user.clone());
        Ok(user)
    }

    pub fn find_user_by_email(&self, email: &str) -> Option<User> {
        self.users
            .values()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .cloned()
    }

    pub fn find_user_by_id(&self, id: &str) -> Option<User> {
        self.users.get(id).cloned()
    }

    // ---------------- alerts ----------------

    pub fn create_alert(
        &mut self,
        owner_id: &str,
        asset: &str,
        target_price: f64,
        condition: AlertCondition,
        now: DateTime<Utc>,
    ) -> Alert {
        let alert = Alert {
            id: new_id(),
            owner_id: owner_id.to_string(),
            asset: asset.to_string(),
            target_price,
            condition,
            is_active: true,
            is_triggered: false,
            created_at: now,
            updated_at: now,
        };
        self.index_alert(&alert);
        self.alerts.insert(alert.id.clone(), alert.clone());
        alert
    }

    pub fn alerts_by_owner(&self, owner_id: &str) -> Vec<Alert> {
        let mut items: Vec<Alert> = self
            .alerts_by_owner
            .get(owner_id)
            .into_iter()
            .flatten()
            .filter_map(|id| self.alerts.get(id).cloned())
            .collect();
        sort_alerts(&mut items);
        items
    }

    pub fn active_alerts(&self) -> Vec<Alert> {
        let mut items: Vec<Alert> = self
            .alerts
            .values()
            .filter(|a| a.is_pending())
            .cloned()
            .collect();
        sort_alerts(&mut items);
        items
    }

    pub fn find_alert(&self, id: &str) -> Option<Alert> {
        self.alerts.get(id).cloned()
    }

    pub fn update_alert(&mut self, id: &str, patch: AlertPatch, now: DateTime<Utc>) -> Option<Alert> {
        let alert = self.alerts.get_mut(id)?;
        if !patch.apply(alert, now) {
            return None;
        }
        Some(alert.clone())
    }

    pub fn mark_triggered(&mut self, id: &str, now: DateTime<Utc>) -> Option<Alert> {
        let alert = self.alerts.get_mut(id)?;
        if !alert.is_pending() {
            return None;
        }
        AlertPatch::triggered().apply(alert, now);
        Some(alert.clone())
    }

    pub fn delete_alert(&mut self, id: &str) -> bool {
        let Some(alert) = self.alerts.remove(id) else {
            return false;
        };

        if let Some(ids) = self.alerts_by_owner.get_mut(&alert.owner_id) {
            ids.remove(id);
            if ids.is_empty() {
                self.alerts_by_owner.remove(&alert.owner_id);
            }
        }
        for history_id in self.history_by_alert.remove(id).into_iter().flatten() {
            self.triggered.remove(&history_id);
        }
        true
    }

    // ---------------- history ----------------

    pub fn create_triggered_alert(
        &mut self,
        alert_id: &str,
        triggered_price: f64,
        now: DateTime<Utc>,
    ) -> TriggeredAlert {
        let record = TriggeredAlert {
            id: new_id(),
            alert_id: alert_id.to_string(),
            triggered_price,
            triggered_at: now,
        };
        self.history_by_alert
            .entry(record.alert_id.clone())
            .or_default()
            .insert(record.id.clone());
        self.triggered.insert(record.id.clone(), record.clone());
        record
    }

    pub fn triggered_by_owner(&self, owner_id: &str) -> Vec<TriggeredAlert> {
        let mut items: Vec<TriggeredAlert> = self
            .alerts_by_owner
            .get(owner_id)
            .into_iter()
            .flatten()
            .filter_map(|alert_id| self.history_by_alert.get(alert_id))
            .flatten()
            .filter_map(|id| self.triggered.get(id).cloned())
            .collect();
        sort_history(&mut items);
        items
    }
}

fn sort_alerts(items: &mut [Alert]) {
    items.sort_by(|a, b| (a.created_at, &a.id).cmp(&(b.created_at, &b.id)));
}

fn sort_history(items: &mut [TriggeredAlert]) {
    items.sort_by(|a, b| (a.triggered_at, &a.id).cmp(&(b.triggered_at, &b.id)));
}
