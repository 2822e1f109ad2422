// libs/records-cell/src/services/diagnoses.rs
use std::sync::Arc;

use shared_database::{DocumentStore, MigrationReport, Repository};

use crate::models::{Diagnosis, RecordError};

pub const DIAGNOSES_KEY: &str = "diagnoses";

const DEFAULT_CATALOG: &[(&str, &str, &str)] = &[
    ("J06.9", "Acute upper respiratory infection", "Respiratory"),
    ("J45.909", "Asthma, uncomplicated", "Respiratory"),
    ("I10", "Essential (primary) hypertension", "Cardiovascular"),
    ("I25.10", "Coronary artery disease", "Cardiovascular"),
    ("E11.9", "Type 2 diabetes mellitus without complications", "Endocrine"),
    ("E03.9", "Hypothyroidism, unspecified", "Endocrine"),
    ("K21.9", "Gastro-esophageal reflux disease", "Digestive"),
    ("K29.70", "Gastritis, unspecified", "Digestive"),
    ("M54.5", "Low back pain", "Musculoskeletal"),
    ("M17.9", "Osteoarthritis of knee", "Musculoskeletal"),
    ("L20.9", "Atopic dermatitis", "Dermatology"),
    ("L70.0", "Acne vulgaris", "Dermatology"),
    ("F41.1", "Generalized anxiety disorder", "Mental health"),
    ("G43.909", "Migraine, unspecified", "Neurology"),
    ("N39.0", "Urinary tract infection", "Genitourinary"),
    ("A09", "Infectious gastroenteritis", "Infectious"),
];

pub fn default_catalog() -> Vec<Diagnosis> {
    DEFAULT_CATALOG
        .iter()
        .map(|(code, name, category)| Diagnosis {
            code: code.to_string(),
            name: name.to_string(),
            category: category.to_string(),
        })
        .collect()
}

/// Read-only diagnosis catalog. An empty or missing stored catalog falls
/// back to the built-in list.
#[derive(Clone)]
pub struct DiagnosisService {
    repo: Repository<Vec<Diagnosis>>,
}

impl DiagnosisService {
    pub fn new(store: Arc<dyn DocumentStore>) -> Result<Self, RecordError> {
        Ok(Self {
            repo: Repository::new(store, DIAGNOSES_KEY)?,
        })
    }

    pub async fn migrate(&self) -> Result<MigrationReport, RecordError> {
        Ok(self.repo.migrate().await?)
    }

    pub async fn catalog(&self) -> Result<Vec<Diagnosis>, RecordError> {
        let stored = self.repo.load().await?;
        if stored.is_empty() {
            Ok(default_catalog())
        } else {
            Ok(stored)
        }
    }

    /// Case-insensitive match on code, name or category.
    pub async fn search(&self, q: Option<&str>) -> Result<Vec<Diagnosis>, RecordError> {
        let catalog = self.catalog().await?;
        let needle = match q.map(str::trim).filter(|q| !q.is_empty()) {
            Some(q) => q.to_lowercase(),
            None => return Ok(catalog),
        };

        Ok(catalog
            .into_iter()
            .filter(|d| {
                d.code.to_lowercase().contains(&needle)
                    || d.name.to_lowercase().contains(&needle)
                    || d.category.to_lowercase().contains(&needle)
            })
            .collect())
    }
}
