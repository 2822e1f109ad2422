// libs/records-cell/src/models.rs
use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use shared_database::StoreError;
use shared_models::error::AppError;

/// A stored record addressable by id.
pub trait Record: Clone + Send + Sync {
    const KIND: &'static str;

    fn id(&self) -> &str;
}

// ==============================================================================
// PRESCRIPTIONS
// ==============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Medication {
    pub name: String,
    pub dosage: String,
    /// e.g. `1-0-1` or `twice daily`.
    pub frequency: String,
    pub duration_days: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prescription {
    pub id: String,
    pub doctor_id: String,
    pub patient_id: String,
    #[serde(default)]
    pub appointment_id: Option<String>,
    pub patient_name: String,
    /// Diagnosis catalog code.
    #[serde(default)]
    pub diagnosis: Option<String>,
    #[serde(default)]
    pub medications: Vec<Medication>,
    #[serde(default)]
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Record for Prescription {
    const KIND: &'static str = "Prescription";

    fn id(&self) -> &str {
        &self.id
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreatePrescriptionRequest {
    /// Required when an admin writes on a doctor's behalf.
    pub doctor_id: Option<String>,
    pub patient_id: String,
    pub patient_name: String,
    pub appointment_id: Option<String>,
    pub diagnosis: Option<String>,
    #[serde(default)]
    pub medications: Vec<Medication>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdatePrescriptionRequest {
    pub diagnosis: Option<String>,
    pub medications: Option<Vec<Medication>>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PrescriptionQuery {
    pub doctor_id: Option<String>,
    pub patient_id: Option<String>,
}

// ==============================================================================
// REVIEWS
// ==============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Review {
    pub id: String,
    pub doctor_id: String,
    pub patient_id: String,
    pub patient_name: String,
    pub rating: u8,
    #[serde(default)]
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Record for Review {
    const KIND: &'static str = "Review";

    fn id(&self) -> &str {
        &self.id
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateReviewRequest {
    pub doctor_id: String,
    pub patient_name: String,
    pub rating: u8,
    pub comment: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateReviewRequest {
    pub rating: Option<u8>,
    pub comment: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReviewQuery {
    pub doctor_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewSummary {
    pub doctor_id: Option<String>,
    pub count: usize,
    /// Mean rating rounded to one decimal, 0.0 with no reviews.
    pub average_rating: f64,
    /// Review count per star, keys 1 to 5.
    pub histogram: BTreeMap<u8, usize>,
}

// ==============================================================================
// INVENTORY
// ==============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryItem {
    pub id: String,
    pub doctor_id: String,
    pub name: String,
    pub category: String,
    pub quantity: u32,
    pub unit: String,
    pub reorder_level: u32,
    #[serde(default)]
    pub expiry_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl InventoryItem {
    pub fn is_low_stock(&self) -> bool {
        self.quantity <= self.reorder_level
    }
}

impl Record for InventoryItem {
    const KIND: &'static str = "Inventory item";

    fn id(&self) -> &str {
        &self.id
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateInventoryItemRequest {
    pub doctor_id: Option<String>,
    pub name: String,
    pub category: String,
    pub quantity: u32,
    pub unit: String,
    #[serde(default)]
    pub reorder_level: u32,
    pub expiry_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateInventoryItemRequest {
    pub name: Option<String>,
    pub category: Option<String>,
    pub quantity: Option<u32>,
    pub unit: Option<String>,
    pub reorder_level: Option<u32>,
    pub expiry_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdjustStockRequest {
    pub delta: i64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InventoryQuery {
    pub doctor_id: Option<String>,
    pub category: Option<String>,
}

// ==============================================================================
// DIAGNOSES
// ==============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnosis {
    pub code: String,
    pub name: String,
    pub category: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DiagnosisQuery {
    pub q: Option<String>,
}

// ==============================================================================
// ERRORS
// ==============================================================================

#[derive(Debug, thiserror::Error)]
pub enum RecordError {
    #[error("{kind} {id} not found")]
    NotFound { kind: &'static str, id: String },

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Only {available} left of {id}, cannot remove {requested}")]
    InsufficientStock {
        id: String,
        available: u32,
        requested: u64,
    },

    #[error(transparent)]
    Storage(#[from] StoreError),
}

impl From<RecordError> for AppError {
    fn from(err: RecordError) -> Self {
        match err {
            RecordError::NotFound { .. } => AppError::NotFound(err.to_string()),
            RecordError::Validation(msg) => AppError::ValidationError(msg),
            RecordError::InsufficientStock { .. } => AppError::Conflict(err.to_string()),
            RecordError::Storage(e) => e.into(),
        }
    }
}
