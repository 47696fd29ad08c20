//! Settings persistence seam.
//!
//! The core never persists anything itself; hosts implement
//! [`SettingsStore`] over whatever key-value storage they have. The stored
//! value is arbitrary-shaped JSON — [`EmailSettings::from_stored`] tolerates
//! whatever comes back.

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::Mutex;

use crate::error::StoreError;
use crate::settings::EmailSettings;

/// Singleton key-value settings storage.
#[async_trait]
pub trait SettingsStore: Send + Sync {
    /// Read the persisted settings value, `None` when nothing was saved yet.
    async fn load(&self) -> Result<Option<Value>, StoreError>;

    /// Persist a settings value, replacing any previous one.
    async fn save(&self, value: Value) -> Result<(), StoreError>;
}

/// Load and type the settings in one step, defaulting when the store is
/// empty.
pub async fn load_settings(store: &dyn SettingsStore) -> Result<EmailSettings, StoreError> {
    let value = store.load().await?;
    Ok(value
        .map(|v| EmailSettings::from_stored(&v))
        .unwrap_or_default())
}

/// Validate raw admin input and persist the result, returning the record
/// that was stored.
pub async fn save_settings(
    store: &dyn SettingsStore,
    raw: &Value,
) -> Result<EmailSettings, StoreError> {
    let settings = EmailSettings::sanitize(raw);
    let value = serde_json::to_value(&settings)
        .map_err(|e| StoreError::SaveFailed(e.to_string()))?;
    store.save(value).await?;
    Ok(settings)
}

/// In-memory store for tests and embedding hosts without persistence.
#[derive(Default)]
pub struct MemoryStore {
    value: Mutex<Option<Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SettingsStore for MemoryStore {
    async fn load(&self) -> Result<Option<Value>, StoreError> {
        Ok(self.value.lock().await.clone())
    }

    async fn save(&self, value: Value) -> Result<(), StoreError> {
        *self.value.lock().await = Some(value);
        Ok(())
    }
}
