// libs/records-cell/src/services/prescriptions.rs
use std::sync::Arc;

use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use shared_database::{DocumentStore, MigrationReport};

use crate::models::{
    CreatePrescriptionRequest, Medication, Prescription, PrescriptionQuery, RecordError,
    UpdatePrescriptionRequest,
};
use crate::services::collection::RecordCollection;

pub const PRESCRIPTIONS_KEY: &str = "prescriptions";

fn validate_medications(medications: &[Medication]) -> Result<(), RecordError> {
    for (index, medication) in medications.iter().enumerate() {
        if medication.name.trim().is_empty() {
            return Err(RecordError::Validation(format!(
                "medication #{} needs a name",
                index + 1
            )));
        }
        if medication.dosage.trim().is_empty() {
            return Err(RecordError::Validation(format!(
                "{} needs a dosage",
                medication.name
            )));
        }
        if medication.duration_days == 0 {
            return Err(RecordError::Validation(format!(
                "{} needs a duration of at least one day",
                medication.name
            )));
        }
    }
    Ok(())
}

#[derive(Clone)]
pub struct PrescriptionService {
    records: RecordCollection<Prescription>,
}

impl PrescriptionService {
    pub fn new(store: Arc<dyn DocumentStore>) -> Result<Self, RecordError> {
        Ok(Self {
            records: RecordCollection::new(store, PRESCRIPTIONS_KEY)?,
        })
    }

    pub async fn migrate(&self) -> Result<MigrationReport, RecordError> {
        self.records.migrate().await
    }

    pub async fn list(&self, query: &PrescriptionQuery) -> Result<Vec<Prescription>, RecordError> {
        self.records
            .filter(|rx| {
                query.doctor_id.as_deref().is_none_or(|id| rx.doctor_id == id)
                    && query.patient_id.as_deref().is_none_or(|id| rx.patient_id == id)
            })
            .await
    }

    pub async fn get(&self, id: &str) -> Result<Prescription, RecordError> {
        self.records.get(id).await
    }

    /// `doctor_id` is the prescribing doctor, resolved by the caller.
    pub async fn create(
        &self,
        doctor_id: String,
        request: CreatePrescriptionRequest,
    ) -> Result<Prescription, RecordError> {
        if request.patient_id.trim().is_empty() {
            return Err(RecordError::Validation("patient_id is required".to_string()));
        }
        if request.patient_name.trim().is_empty() {
            return Err(RecordError::Validation("patient name is required".to_string()));
        }
        validate_medications(&request.medications)?;

        let now = Utc::now();
        let prescription = self
            .records
            .insert(Prescription {
                id: format!("rx-{}", Uuid::new_v4().simple()),
                doctor_id,
                patient_id: request.patient_id,
                appointment_id: request.appointment_id,
                patient_name: request.patient_name.trim().to_string(),
                diagnosis: request.diagnosis,
                medications: request.medications,
                notes: request.notes,
                created_at: now,
                updated_at: now,
            })
            .await?;

        info!(
            "Prescription {} written by {} for patient {}",
            prescription.id, prescription.doctor_id, prescription.patient_id
        );
        Ok(prescription)
    }

    pub async fn update(
        &self,
        id: &str,
        request: UpdatePrescriptionRequest,
    ) -> Result<Prescription, RecordError> {
        self.records
            .update(id, |rx| {
                if let Some(medications) = request.medications {
                    validate_medications(&medications)?;
                    rx.medications = medications;
                }
                if request.diagnosis.is_some() {
                    rx.diagnosis = request.diagnosis;
                }
                if request.notes.is_some() {
                    rx.notes = request.notes;
                }
                rx.updated_at = Utc::now();
                Ok(())
            })
            .await
    }

    pub async fn delete(&self, id: &str) -> Result<(), RecordError> {
        self.records.remove(id).await.map(|_| ())
    }
}
