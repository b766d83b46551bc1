//! Persistence for users, alerts and trigger history.
//!
//! Every backend implements [`AlertStore`]; the rest of the crate only ever
//! sees an `Arc<dyn AlertStore>`. The in-process backends share the indexed
//! [`Dataset`] and differ only in when they read and write the JSON document.

use async_trait::async_trait;

use crate::models::{Alert, AlertCondition, AlertPatch, TriggeredAlert, User};

pub mod dataset;
pub mod json_file;
pub mod memory;
pub mod mongo;

pub use dataset::{Dataset, StoreDocument, SCHEMA_VERSION};
pub use json_file::JsonFileStore;
pub use memory::MemoryStore;
pub use mongo::MongoStore;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("unsupported schema version {0}")]
    UnsupportedSchema(u32),

    #[error("mongodb error: {0}")]
    Mongo(#[from] mongodb::error::Error),

    #[error("conflict: {0}")]
    Conflict(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait AlertStore: Send + Sync {
    async fn create_user(
        &self,
        email: &str,
        password_hash: &str,
        name: Option<&str>,
    ) -> StoreResult<User>;

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>>;

    async fn find_user_by_id(&self, id: &str) -> StoreResult<Option<User>>;

    async fn create_alert(
        &self,
        owner_id: &str,
        asset: &str,
        target_price: f64,
        condition: AlertCondition,
    ) -> StoreResult<Alert>;

    async fn get_alerts_by_owner(&self, owner_id: &str) -> StoreResult<Vec<Alert>>;

    /// Alerts that are active and not yet triggered.
    async fn get_active_alerts(&self) -> StoreResult<Vec<Alert>>;

    async fn find_alert_by_id(&self, id: &str) -> StoreResult<Option<Alert>>;

    /// Applies a status patch. Returns `None` if the alert is gone or the
    /// patch would pause or re-activate it (see [`AlertPatch::resolve`]).
    async fn update_alert(&self, id: &str, patch: AlertPatch) -> StoreResult<Option<Alert>>;

    /// Flips a still-pending alert to triggered. Returns `None` if the alert
    /// is gone or another writer already triggered it.
    async fn mark_triggered(&self, id: &str) -> StoreResult<Option<Alert>>;

    /// Removes the alert and its trigger history.
    async fn delete_alert(&self, id: &str) -> StoreResult<bool>;

    async fn create_triggered_alert(
        &self,
        alert_id: &str,
        triggered_price: f64,
    ) -> StoreResult<TriggeredAlert>;

    async fn get_triggered_alerts_by_owner(&self, owner_id: &str)
        -> StoreResult<Vec<TriggeredAlert>>;

    /// Re-reads the backing storage. Backends that never cache skip this.
    async fn reload(&self) -> StoreResult<()> {
        Ok(())
    }
}

pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
