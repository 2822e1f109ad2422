pub mod repository;
pub mod store;

use std::sync::Arc;

use shared_config::AppConfig;
use shared_models::error::AppError;
use tracing::info;

pub use repository::{MigrationReport, MigrationStep, Repository};
pub use store::{DocumentStore, FileStore, MemoryStore, StoreError};

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        AppError::Storage(err.to_string())
    }
}

/// Pick the backend named by the configuration: a directory of JSON documents
/// when `DATA_DIR` is set, process memory otherwise.
pub async fn open_store(config: &AppConfig) -> Result<Arc<dyn DocumentStore>, StoreError> {
    match &config.data_dir {
        Some(dir) => {
            info!("Using file store at {}", dir.display());
            Ok(Arc::new(FileStore::open(dir).await?))
        }
        None => {
            info!("Using in-memory store");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}
