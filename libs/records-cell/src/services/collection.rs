// libs/records-cell/src/services/collection.rs
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::debug;

use shared_database::{DocumentStore, MigrationReport, Repository};

use crate::models::{Record, RecordError};

/// A list of records kept under one store key. Writes are serialized so a
/// read-modify-write never loses a concurrent change.
pub struct RecordCollection<T> {
    repo: Repository<Vec<T>>,
    write_lock: Arc<Mutex<()>>,
}

impl<T> Clone for RecordCollection<T> {
    fn clone(&self) -> Self {
        Self {
            repo: self.repo.clone(),
            write_lock: self.write_lock.clone(),
        }
    }
}

impl<T> RecordCollection<T>
where
    T: Record + Serialize + DeserializeOwned,
{
    pub fn new(store: Arc<dyn DocumentStore>, key: &str) -> Result<Self, RecordError> {
        Ok(Self {
            repo: Repository::new(store, key)?,
            write_lock: Arc::new(Mutex::new(())),
        })
    }

    pub fn key(&self) -> &str {
        self.repo.key()
    }

    pub async fn migrate(&self) -> Result<MigrationReport, RecordError> {
        let _guard = self.write_lock.lock().await;
        Ok(self.repo.migrate().await?)
    }

    pub async fn all(&self) -> Result<Vec<T>, RecordError> {
        Ok(self.repo.load().await?)
    }

    pub async fn filter(&self, keep: impl Fn(&T) -> bool) -> Result<Vec<T>, RecordError> {
        Ok(self.all().await?.into_iter().filter(|r| keep(r)).collect())
    }

    pub async fn get(&self, id: &str) -> Result<T, RecordError> {
        self.all()
            .await?
            .into_iter()
            .find(|r| r.id() == id)
            .ok_or_else(|| not_found::<T>(id))
    }

    pub async fn insert(&self, record: T) -> Result<T, RecordError> {
        let _guard = self.write_lock.lock().await;
        let mut records = self.repo.load().await?;
        if records.iter().any(|r| r.id() == record.id()) {
            return Err(RecordError::Validation(format!(
                "{} {} already exists",
                T::KIND,
                record.id()
            )));
        }
        records.push(record.clone());
        self.repo.save(&records).await?;

        debug!("Stored {} {} in {}", T::KIND, record.id(), self.key());
        Ok(record)
    }

    /// Apply `change` to the record with `id` and store the result. Nothing is
    /// written when `change` fails.
    pub async fn update(
        &self,
        id: &str,
        change: impl FnOnce(&mut T) -> Result<(), RecordError>,
    ) -> Result<T, RecordError> {
        let _guard = self.write_lock.lock().await;
        let mut records = self.repo.load().await?;
        let record = records
            .iter_mut()
            .find(|r| r.id() == id)
            .ok_or_else(|| not_found::<T>(id))?;

        let mut updated = record.clone();
        change(&mut updated)?;
        *record = updated.clone();
        self.repo.save(&records).await?;

        Ok(updated)
    }

    pub async fn remove(&self, id: &str) -> Result<T, RecordError> {
        let _guard = self.write_lock.lock().await;
        let mut records = self.repo.load().await?;
        let index = records
            .iter()
            .position(|r| r.id() == id)
            .ok_or_else(|| not_found::<T>(id))?;
        let removed = records.remove(index);
        self.repo.save(&records).await?;

        debug!("Removed {} {} from {}", T::KIND, id, self.key());
        Ok(removed)
    }
}

fn not_found<T: Record>(id: &str) -> RecordError {
    RecordError::NotFound {
        kind: T::KIND,
        id: id.to_string(),
    }
}
