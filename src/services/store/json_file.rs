use std::{
    io,
    path::{Path, PathBuf},
};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;

use super::{AlertStore, Dataset, StoreResult};
use crate::models::{Alert, AlertCondition, AlertPatch, TriggeredAlert, User};

/// Reads the JSON document at `path`. A missing file is an empty dataset.
pub(super) async fn load_dataset(path: &Path) -> StoreResult<Dataset> {
    match tokio::fs::read_to_string(path).await {
        Ok(raw) => Dataset::from_json(&raw),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Dataset::default()),
        Err(e) => Err(e.into()),
    }
}

/// Writes the whole dataset next to `path` and renames it into place.
pub(super) async fn save_dataset(path: &Path, ds: &Dataset) -> StoreResult<()> {
    let json = ds.to_json()?;

    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(dir).await?;
    }

    let tmp = path.with_extension("json.tmp");
    tokio::fs::write(&tmp, json).await?;
    tokio::fs::rename(&tmp, path).await?;
    Ok(())
}

/// Flat JSON document backend. Nothing is cached: every call loads the file,
/// and every mutation writes it back, all under one lock.
pub struct JsonFileStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read<T, F>(&self, f: F) -> StoreResult<T>
    where
        F: FnOnce(&Dataset) -> T + Send,
        T: Send,
    {
        let _guard = self.lock.lock().await;
        let ds = load_dataset(&self.path).await?;
        Ok(f(&ds))
    }

    async fn write<T, F>(&self, f: F) -> StoreResult<T>
    where
        F: FnOnce(&mut Dataset) -> StoreResult<T> + Send,
        T: Send,
    {
        let _guard = self.lock.lock().await;
        let mut ds = load_dataset(&self.path).await?;
        let out = f(&mut ds)?;
        save_dataset(&self.path, &ds).await?;
        Ok(out)
    }
}

#[async_trait]
impl AlertStore for JsonFileStore {
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
}
