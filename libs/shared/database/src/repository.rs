use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use crate::store::{validate_key, DocumentStore, StoreError};

/// Upgrades a document body from one schema version to the next.
pub type MigrationStep = fn(Value) -> Result<Value, String>;

#[derive(Debug, Serialize, Deserialize)]
struct Envelope {
    version: u32,
    saved_at: DateTime<Utc>,
    data: Value,
}

impl Envelope {
    /// Bare blobs written before envelopes existed are treated as version 0.
    fn open(raw: Value) -> Self {
        let shaped = matches!(&raw, Value::Object(map)
            if map.len() == 3
                && map.contains_key("version")
                && map.contains_key("saved_at")
                && map.contains_key("data"));

        if shaped {
            if let Ok(envelope) = serde_json::from_value::<Envelope>(raw.clone()) {
                return envelope;
            }
        }
        Self::legacy(raw)
    }

    fn legacy(data: Value) -> Self {
        Self {
            version: 0,
            saved_at: DateTime::<Utc>::UNIX_EPOCH,
            data,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MigrationReport {
    pub key: String,
    pub from_version: u32,
    pub to_version: u32,
    pub rewritten: bool,
}

/// Typed view over one document of a [`DocumentStore`].
pub struct Repository<T> {
    store: Arc<dyn DocumentStore>,
    key: String,
    latest_version: u32,
    migrations: HashMap<u32, MigrationStep>,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Clone for Repository<T> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            key: self.key.clone(),
            latest_version: self.latest_version,
            migrations: self.migrations.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T> Repository<T>
where
    T: Serialize + DeserializeOwned + Default,
{
    pub fn new(store: Arc<dyn DocumentStore>, key: impl Into<String>) -> Result<Self, StoreError> {
        let key = key.into();
        validate_key(&key)?;
        Ok(Self {
            store,
            key,
            latest_version: 1,
            migrations: HashMap::new(),
            _marker: PhantomData,
        })
    }

    /// Register the step that upgrades `from` to `from + 1`. Versions without a
    /// registered step upgrade unchanged.
    pub fn with_migration(mut self, from: u32, step: MigrationStep) -> Self {
        self.migrations.insert(from, step);
        self.latest_version = self.latest_version.max(from + 1);
        self
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn latest_version(&self) -> u32 {
        self.latest_version
    }

    fn upgrade(&self, envelope: Envelope) -> Result<(u32, Value), StoreError> {
        if envelope.version > self.latest_version {
            return Err(StoreError::FutureVersion {
                key: self.key.clone(),
                found: envelope.version,
                latest: self.latest_version,
            });
        }

        let mut version = envelope.version;
        let mut data = envelope.data;
        while version < self.latest_version {
            if let Some(step) = self.migrations.get(&version) {
                debug!("Migrating {} from version {}", self.key, version);
                data = step(data).map_err(|message| StoreError::Migration {
                    key: self.key.clone(),
                    from: version,
                    message,
                })?;
            }
            version += 1;
        }

        Ok((version, data))
    }

    fn decode(&self, data: Value) -> Result<T, StoreError> {
        serde_json::from_value(data).map_err(|e| StoreError::Corrupt {
            key: self.key.clone(),
            message: e.to_string(),
        })
    }

    /// Read the document, upgrading it in memory. A missing document loads as
    /// `T::default()`.
    pub async fn load(&self) -> Result<T, StoreError> {
        match self.store.get(&self.key).await? {
            Some(raw) => {
                let (_, data) = self.upgrade(Envelope::open(raw))?;
                self.decode(data)
            }
            None => Ok(T::default()),
        }
    }

    pub async fn save(&self, value: &T) -> Result<(), StoreError> {
        let envelope = Envelope {
            version: self.latest_version,
            saved_at: Utc::now(),
            data: serde_json::to_value(value)?,
        };
        self.store
            .put(&self.key, serde_json::to_value(envelope)?)
            .await
    }

    /// Upgrade the stored document to the latest version and write it back.
    pub async fn migrate(&self) -> Result<MigrationReport, StoreError> {
        let Some(raw) = self.store.get(&self.key).await? else {
            return Ok(MigrationReport {
                key: self.key.clone(),
                from_version: self.latest_version,
                to_version: self.latest_version,
                rewritten: false,
            });
        };

        let envelope = Envelope::open(raw);
        let from_version = envelope.version;
        let (to_version, data) = self.upgrade(envelope)?;

        let rewritten = from_version != to_version;
        if rewritten {
            // Validate against the typed model before replacing the stored copy.
            let typed = self.decode(data)?;
            self.save(&typed).await?;
            info!(
                "Migrated {} from version {} to {}",
                self.key, from_version, to_version
            );
        }

        Ok(MigrationReport {
            key: self.key.clone(),
            from_version,
            to_version,
            rewritten,
        })
    }
}
