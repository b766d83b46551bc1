use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use super::{
    json_file::{load_dataset, save_dataset},
    AlertStore, Dataset, StoreResult,
};
use crate::models::{Alert, AlertCondition, AlertPatch, TriggeredAlert, User};

/// In-process dataset, optionally mirrored to a JSON snapshot file.
///
/// With a snapshot configured, each mutation is applied to a copy, the copy
/// is written out, and only then swapped in; a failed write leaves the
/// in-memory state untouched.
pub struct MemoryStore {
    data: RwLock<Dataset>,
    snapshot: Option<PathBuf>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    /// Purely in-memory; nothing survives the process.
    pub fn new() -> Self {
        Self {
            data: RwLock::new(Dataset::default()),
            snapshot: None,
        }
    }

    /// Loads the snapshot at `path`, creating an empty one if it is missing.
    pub async fn open(path: impl Into<PathBuf>) -> StoreResult<Self> {
        let path = path.into();
        let exists = tokio::fs::try_exists(&path).await?;
        let ds = load_dataset(&path).await?;

        if exists {
            tracing::info!(path = %path.display(), "loaded data snapshot");
        } else {
            save_dataset(&path, &ds).await?;
            tracing::info!(path = %path.display(), "created new data snapshot");
        }

        Ok(Self {
            data: RwLock::new(ds),
            snapshot: Some(path),
        })
    }

    pub fn snapshot_path(&self) -> Option<&Path> {
        self.snapshot.as_deref()
    }

    async fn read<T, F>(&self, f: F) -> StoreResult<T>
    where
        F: FnOnce(&Dataset) -> T + Send,
        T: Send,
    {
        let guard = self.data.read().await;
        Ok(f(&*guard))
    }

    async fn write<T, F>(&self, f: F) -> StoreResult<T>
    where
        F: FnOnce(&mut Dataset) -> StoreResult<T> + Send,
        T: Send,
    {
        let mut guard = self.data.write().await;

        let Some(path) = &self.snapshot else {
            return f(&mut *guard);
        };

        let mut next = guard.clone();
        let out = f(&mut next)?;
        if let Err(e) = save_dataset(path, &next).await {
            tracing::error!(path = %path.display(), error = %e, "failed to write data snapshot");
            return Err(e);
        }
        *guard = next;
        Ok(out)
    }
}

#[async_trait]
impl AlertStore for MemoryStore {
    async fn create_user(
        &self,
        email: &str,
        password_hash: &str,
        name: Option<&str>,
    ) -> StoreResult<User> {
        self.write(|ds| ds.create_user(email, password_hash, name, Utc::now()))
            .await
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        self.read(|ds| ds.find_user_by_email(email)).await
    }

    async fn find_user_by_id(&self, id: &str) -> StoreResult<Option<User>> {
        self.read(|ds| ds.find_user_by_id(id)).await
    }

    async fn create_alert(
        &self,
        owner_id: &str,
        asset: &str,
        target_price: f64,
        condition: AlertCondition,
    ) -> StoreResult<Alert> {
        self.write(|ds| Ok(ds.create_alert(owner_id, asset, target_price, condition, Utc::now())))
            .await
    }

    async fn get_alerts_by_owner(&self, owner_id: &str) -> StoreResult<Vec<Alert>> {
        self.read(|ds| ds.alerts_by_owner(owner_id)).await
    }

    async fn get_active_alerts(&self) -> StoreResult<Vec<Alert>> {
        self.read(|ds| ds.active_alerts()).await
    }

    async fn find_alert_by_id(&self, id: &str) -> StoreResult<Option<Alert>> {
        self.read(|ds| ds.find_alert(id)).await
    }

    async fn update_alert(&self, id: &str, patch: AlertPatch) -> StoreResult<Option<Alert>> {
        self.write(|ds| Ok(ds.update_alert(id, patch, Utc::now()))).await
    }

    async fn mark_triggered(&self, id: &str) -> StoreResult<Option<Alert>> {
        self.write(|ds| Ok(ds.mark_triggered(id, Utc::now()))).await
    }

    async fn delete_alert(&self, id: &str) -> StoreResult<bool> {
        self.write(|ds| Ok(ds.delete_alert(id))).await
    }

    async fn create_triggered_alert(
        &self,
        alert_id: &str,
        triggered_price: f64,
    ) -> StoreResult<TriggeredAlert> {
        self.write(|ds| Ok(ds.create_triggered_alert(alert_id, triggered_price, Utc::now())))
            .await
    }

    async fn get_triggered_alerts_by_owner(
        &self,
        owner_id: &str,
    ) -> StoreResult<Vec<TriggeredAlert>> {
        self.read(|ds| ds.triggered_by_owner(owner_id)).await
    }

    async fn reload(&self) -> StoreResult<()> {
        if let Some(path) = &self.snapshot {
            let ds = load_dataset(path).await?;
            *self.data.write().await = ds;
            tracing::info!(path = %path.display(), "reloaded data snapshot");
        }
        Ok(())
    }
}
