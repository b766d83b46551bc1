use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures_util::StreamExt;
use mongodb::{
    bson::{self, doc, serde_helpers::chrono_datetime_as_bson_datetime, Document},
    options::{FindOneAndUpdateOptions, FindOptions, ReturnDocument},
    Client, Collection, Cursor, Database,
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use super::{new_id, AlertStore, StoreError, StoreResult};
use crate::{
    models::{Alert, AlertCondition, AlertPatch, TriggeredAlert, User},
    services::db_init,
};

// Stored shapes. Timestamps are BSON dates (millisecond precision) so that
// sorting and range queries compare instants, not strings.

#[derive(Debug, Serialize, Deserialize)]
struct UserRecord {
    id: String,
    email: String,
    password_hash: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    created_at: DateTime<Utc>,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    updated_at: DateTime<Utc>,
}

impl From<UserRecord> for User {
    fn from(r: UserRecord) -> Self {
        Self {
            id: r.id,
            email: r.email,
            password_hash: r.password_hash,
            name: r.name,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

impl From<&User> for UserRecord {
    fn from(u: &User) -> Self {
        Self {
            id: u.id.clone(),
            email: u.email.clone(),
            password_hash: u.password_hash.clone(),
            name: u.name.clone(),
            created_at: u.created_at,
            updated_at: u.updated_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct AlertRecord {
    id: String,
    owner_id: String,
    asset: String,
    target_price: f64,
    condition: AlertCondition,
    is_active: bool,
    is_triggered: bool,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    created_at: DateTime<Utc>,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    updated_at: DateTime<Utc>,
}

impl From<AlertRecord> for Alert {
    fn from(r: AlertRecord) -> Self {
        Self {
            id: r.id,
            owner_id: r.owner_id,
            asset: r.asset,
            target_price: r.target_price,
            condition: r.condition,
            is_active: r.is_active,
            is_triggered: r.is_triggered,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

impl From<&Alert> for AlertRecord {
    fn from(a: &Alert) -> Self {
        Self {
            id: a.id.clone(),
            owner_id: a.owner_id.clone(),
            asset: a.asset.clone(),
            target_price: a.target_price,
            condition: a.condition,
            is_active: a.is_active,
            is_triggered: a.is_triggered,
            created_at: a.created_at,
            updated_at: a.updated_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct TriggeredRecord {
    id: String,
    alert_id: String,
    triggered_price: f64,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    triggered_at: DateTime<Utc>,
}

impl From<TriggeredRecord> for TriggeredAlert {
    fn from(r: TriggeredRecord) -> Self {
        Self {
            id: r.id,
            alert_id: r.alert_id,
            triggered_price: r.triggered_price,
            triggered_at: r.triggered_at,
        }
    }
}

impl From<&TriggeredAlert> for TriggeredRecord {
    fn from(t: &TriggeredAlert) -> Self {
        Self {
            id: t.id.clone(),
            alert_id: t.alert_id.clone(),
            triggered_price: t.triggered_price,
            triggered_at: t.triggered_at,
        }
    }
}

/// BSON date at millisecond precision, the same value a stored record reads back as.
fn now_millis() -> DateTime<Utc> {
    bson::DateTime::now().to_chrono()
}

/// Remote backend: one MongoDB collection per record type, addressed by the
/// `id` field. Every mutation is a single-document atomic operation.
#[derive(Clone)]
pub struct MongoStore {
    db: Database,
}

async fn collect<R, T>(mut cursor: Cursor<R>) -> StoreResult<Vec<T>>
where
    R: DeserializeOwned + Unpin + Send + Sync,
    T: From<R>,
{
    let mut items: Vec<T> = Vec::new();
    while let Some(res) = cursor.next().await {
        items.push(res?.into());
    }
    Ok(items)
}

fn after_update() -> FindOneAndUpdateOptions {
    FindOneAndUpdateOptions::builder()
        .return_document(ReturnDocument::After)
        .build()
}

impl MongoStore {
    pub async fn connect(uri: &str, db_name: &str) -> StoreResult<Self> {
        let client = Client::with_uri_str(uri).await?;
        let store = Self::new(client.database(db_name));
        db_init::ensure_indexes(&store.db).await?;
        Ok(store)
    }

    pub fn new(db: Database) -> Self {
        Self { db }
    }

    fn users(&self) -> Collection<UserRecord> {
        self.db.collection::<UserRecord>("users")
    }

    fn alerts(&self) -> Collection<AlertRecord> {
        self.db.collection::<AlertRecord>("alerts")
    }

    fn triggered(&self) -> Collection<TriggeredRecord> {
        self.db.collection::<TriggeredRecord>("triggered_alerts")
    }

    async fn find_alerts(&self, filter: Document) -> StoreResult<Vec<Alert>> {
        let find_opts = FindOptions::builder()
            .sort(doc! { "created_at": 1, "id": 1 })
            .build();
        let cursor = self.alerts().find(filter, find_opts).await?;
        collect(cursor).await
    }
}

#[async_trait]
impl AlertStore for MongoStore {
    async fn create_user(
        &self,
        email: &str,
        password_hash: &str,
        name: Option<&str>,
    ) -> StoreResult<User> {
        if self.find_user_by_email(email).await?.is_some() {
            return Err(StoreError::Conflict(format!("email {email} is already registered")));
        }

        let now = now_millis();
        let user = User {
            id: new_id(),
            email: email.to_lowercase(),
            password_hash: password_hash.to_string(),
            name: name.map(str::to_string),
            created_at: now,
            updated_at: now,
        };

        if let Err(e) = self.users().insert_one(UserRecord::from(&user), None).await {
            // unique index on email lost a race with another insert
            if e.to_string().contains("E11000") {
                return Err(StoreError::Conflict(format!("email {email} is already registered")));
            }
            return Err(e.into());
        }
        Ok(user)
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let found = self
            .users()
            .find_one(doc! { "email": email.to_lowercase() }, None)
            .await?;
        Ok(found.map(User::from))
    }

    async fn find_user_by_id(&self, id: &str) -> StoreResult<Option<User>> {
        let found = self.users().find_one(doc! { "id": id }, None).await?;
        Ok(found.map(User::from))
    }

    async fn create_alert(
        &self,
        owner_id: &str,
        asset: &str,
        target_price: f64,
        condition: AlertCondition,
    ) -> StoreResult<Alert> {
        let now = now_millis();
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

        self.alerts().insert_one(AlertRecord::from(&alert), None).await?;
        Ok(alert)
    }

    async fn get_alerts_by_owner(&self, owner_id: &str) -> StoreResult<Vec<Alert>> {
        self.find_alerts(doc! { "owner_id": owner_id }).await
    }

    async fn get_active_alerts(&self) -> StoreResult<Vec<Alert>> {
        self.find_alerts(doc! { "is_active": true, "is_triggered": false })
            .await
    }

    async fn find_alert_by_id(&self, id: &str) -> StoreResult<Option<Alert>> {
        let found = self.alerts().find_one(doc! { "id": id }, None).await?;
        Ok(found.map(Alert::from))
    }

    async fn update_alert(&self, id: &str, patch: AlertPatch) -> StoreResult<Option<Alert>> {
        let Some(current) = self.find_alert_by_id(id).await? else {
            return Ok(None);
        };
        let Some((active, triggered)) = patch.resolve(&current) else {
            return Ok(None);
        };

        // only applies if nobody changed the flags since the read above
        let updated = self
            .alerts()
            .find_one_and_update(
                doc! {
                    "id": id,
                    "is_active": current.is_active,
                    "is_triggered": current.is_triggered,
                },
                doc! { "$set": {
                    "is_active": active,
                    "is_triggered": triggered,
                    "updated_at": bson::DateTime::now(),
                } },
                after_update(),
            )
            .await?;
        Ok(updated.map(Alert::from))
    }

    async fn mark_triggered(&self, id: &str) -> StoreResult<Option<Alert>> {
        let updated = self
            .alerts()
            .find_one_and_update(
                doc! { "id": id, "is_active": true, "is_triggered": false },
                doc! { "$set": {
                    "is_active": false,
                    "is_triggered": true,
                    "updated_at": bson::DateTime::now(),
                } },
                after_update(),
            )
            .await?;
        Ok(updated.map(Alert::from))
    }

    async fn delete_alert(&self, id: &str) -> StoreResult<bool> {
        let res = self.alerts().delete_one(doc! { "id": id }, None).await?;
        if res.deleted_count == 0 {
            return Ok(false);
        }

        self.triggered()
            .delete_many(doc! { "alert_id": id }, None)
            .await?;
        Ok(true)
    }

    async fn create_triggered_alert(
        &self,
        alert_id: &str,
        triggered_price: f64,
    ) -> StoreResult<TriggeredAlert> {
        let record = TriggeredAlert {
            id: new_id(),
            alert_id: alert_id.to_string(),
            triggered_price,
            triggered_at: now_millis(),
        };

        self.triggered()
            .insert_one(TriggeredRecord::from(&record), None)
            .await?;
        Ok(record)
    }

    async fn get_triggered_alerts_by_owner(
        &self,
        owner_id: &str,
    ) -> StoreResult<Vec<TriggeredAlert>> {
        let alert_ids: Vec<String> = self
            .get_alerts_by_owner(owner_id)
            .await?
            .into_iter()
            .map(|a| a.id)
            .collect();

        if alert_ids.is_empty() {
            return Ok(Vec::new());
        }

        let find_opts = FindOptions::builder()
            .sort(doc! { "triggered_at": 1, "id": 1 })
            .build();
        let cursor = self
            .triggered()
            .find(doc! { "alert_id": { "$in": alert_ids } }, find_opts)
            .await?;
        collect(cursor).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamps_are_stored_as_bson_dates() {
        let now = now_millis();
        let alert = Alert {
            id: "a1".to_string(),
            owner_id: "u1".to_string(),
            asset: "bitcoin".to_string(),
            target_price: 1.0,
            condition: AlertCondition::Below,
            is_active: true,
            is_triggered: false,
            created_at: now,
            updated_at: now,
        };

        let stored = bson::to_document(&AlertRecord::from(&alert)).unwrap();
        assert!(matches!(stored.get("created_at"), Some(bson::Bson::DateTime(_))));
        assert!(matches!(stored.get("updated_at"), Some(bson::Bson::DateTime(_))));

        let back: AlertRecord = bson::from_document(stored).unwrap();
        assert_eq!(Alert::from(back), alert);
    }
}
