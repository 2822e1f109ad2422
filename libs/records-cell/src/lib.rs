pub mod handlers;
pub mod models;
pub mod router;
pub mod services;

use std::sync::Arc;

use shared_config::AppConfig;
use shared_database::DocumentStore;

pub use handlers::RecordsState;
pub use models::*;
pub use router::{diagnosis_routes, inventory_routes, prescription_routes, review_routes};

impl RecordsState {
    /// All record services over one store.
    pub fn open(config: Arc<AppConfig>, store: Arc<dyn DocumentStore>) -> Result<Self, RecordError> {
        Ok(Self {
            config,
            prescriptions: services::PrescriptionService::new(store.clone())?,
            reviews: services::ReviewService::new(store.clone())?,
            inventory: services::InventoryService::new(store.clone())?,
            diagnoses: services::DiagnosisService::new(store)?,
        })
    }

    /// Bring every stored collection up to the current format.
    pub async fn migrate(&self) -> Result<Vec<shared_database::MigrationReport>, RecordError> {
        Ok(vec![
            self.prescriptions.migrate().await?,
            self.reviews.migrate().await?,
            self.inventory.migrate().await?,
            self.diagnoses.migrate().await?,
        ])
    }
}
