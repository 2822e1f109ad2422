pub mod collection;
pub mod diagnoses;
pub mod inventory;
pub mod prescriptions;
pub mod reviews;

pub use collection::RecordCollection;
pub use diagnoses::DiagnosisService;
pub use inventory::InventoryService;
pub use prescriptions::PrescriptionService;
pub use reviews::ReviewService;
