// libs/records-cell/src/services/inventory.rs
use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use shared_database::{DocumentStore, MigrationReport};

use crate::models::{
    CreateInventoryItemRequest, InventoryItem, InventoryQuery, RecordError,
    UpdateInventoryItemRequest,
};
use crate::services::collection::RecordCollection;

pub const INVENTORY_KEY: &str = "inventory";

fn required(value: &str, field: &str) -> Result<String, RecordError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(RecordError::Validation(format!("{} is required", field)));
    }
    Ok(value.to_string())
}

/// Quantity after applying `delta`. Stock never goes below zero.
pub fn apply_delta(item: &InventoryItem, delta: i64) -> Result<u32, RecordError> {
    let next = item.quantity as i64 + delta;
    if next < 0 {
        return Err(RecordError::InsufficientStock {
            id: item.id.clone(),
            available: item.quantity,
            requested: delta.unsigned_abs(),
        });
    }
    u32::try_from(next).map_err(|_| {
        RecordError::Validation(format!("quantity of {} would overflow", item.id))
    })
}

#[derive(Clone)]
pub struct InventoryService {
    records: RecordCollection<InventoryItem>,
}

impl InventoryService {
    pub fn new(store: Arc<dyn DocumentStore>) -> Result<Self, RecordError> {
        Ok(Self {
            records: RecordCollection::new(store, INVENTORY_KEY)?,
        })
    }

    pub async fn migrate(&self) -> Result<MigrationReport, RecordError> {
        self.records.migrate().await
    }

    pub async fn list(&self, query: &InventoryQuery) -> Result<Vec<InventoryItem>, RecordError> {
        self.records
            .filter(|item| {
                query.doctor_id.as_deref().is_none_or(|id| item.doctor_id == id)
                    && query
                        .category
                        .as_deref()
                        .is_none_or(|c| item.category.eq_ignore_ascii_case(c))
            })
            .await
    }

    pub async fn low_stock(&self, doctor_id: Option<&str>) -> Result<Vec<InventoryItem>, RecordError> {
        self.records
            .filter(|item| {
                item.is_low_stock() && doctor_id.is_none_or(|id| item.doctor_id == id)
            })
            .await
    }

    pub async fn get(&self, id: &str) -> Result<InventoryItem, RecordError> {
        self.records.get(id).await
    }

    pub async fn create(
        &self,
        doctor_id: String,
        request: CreateInventoryItemRequest,
    ) -> Result<InventoryItem, RecordError> {
        let now = Utc::now();
        let item = InventoryItem {
            id: format!("inv-{}", Uuid::new_v4().simple()),
            doctor_id,
            name: required(&request.name, "name")?,
            category: required(&request.category, "category")?,
            quantity: request.quantity,
            unit: required(&request.unit, "unit")?,
            reorder_level: request.reorder_level,
            expiry_date: request.expiry_date,
            created_at: now,
            updated_at: now,
        };

        let item = self.records.insert(item).await?;
        info!("Added {} {} of {} to inventory", item.quantity, item.unit, item.name);
        Ok(item)
    }

    pub async fn update(
        &self,
        id: &str,
        request: UpdateInventoryItemRequest,
    ) -> Result<InventoryItem, RecordError> {
        self.records
            .update(id, |item| {
                if let Some(name) = request.name {
                    item.name = required(&name, "name")?;
                }
                if let Some(category) = request.category {
                    item.category = required(&category, "category")?;
                }
                if let Some(unit) = request.unit {
                    item.unit = required(&unit, "unit")?;
                }
                if let Some(quantity) = request.quantity {
                    item.quantity = quantity;
                }
                if let Some(reorder_level) = request.reorder_level {
                    item.reorder_level = reorder_level;
                }
                if request.expiry_date.is_some() {
                    item.expiry_date = request.expiry_date;
                }
                item.updated_at = Utc::now();
                Ok(())
            })
            .await
    }

    pub async fn adjust(&self, id: &str, delta: i64) -> Result<InventoryItem, RecordError> {
        let item = self
            .records
            .update(id, |item| {
                item.quantity = apply_delta(item, delta)?;
                item.updated_at = Utc::now();
                Ok(())
            })
            .await?;

        if item.is_low_stock() {
            warn!(
                "{} is low on stock: {} {} left",
                item.name, item.quantity, item.unit
            );
        }
        Ok(item)
    }

    pub async fn delete(&self, id: &str) -> Result<(), RecordError> {
        self.records.remove(id).await.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use shared_database::MemoryStore;

    fn request(name: &str, quantity: u32, reorder_level: u32) -> CreateInventoryItemRequest {
        CreateInventoryItemRequest {
            name: name.to_string(),
            category: "Consumables".to_string(),
            quantity,
            unit: "box".to_string(),
            reorder_level,
            ..CreateInventoryItemRequest::default()
        }
    }

    #[tokio::test]
    async fn stock_never_goes_negative() {
        let service = InventoryService::new(Arc::new(MemoryStore::new())).unwrap();
        let gloves = service
            .create("doc-1".to_string(), request("Gloves", 5, 2))
            .await
            .unwrap();

        assert_matches!(
            service.adjust(&gloves.id, -6).await,
            Err(RecordError::InsufficientStock { available: 5, requested: 6, .. })
        );
        assert_eq!(service.get(&gloves.id).await.unwrap().quantity, 5);

        let emptied = service.adjust(&gloves.id, -5).await.unwrap();
        assert_eq!(emptied.quantity, 0);
        assert_eq!(service.adjust(&gloves.id, 12).await.unwrap().quantity, 12);
    }

    #[tokio::test]
    async fn low_stock_uses_the_reorder_level() {
        let service = InventoryService::new(Arc::new(MemoryStore::new())).unwrap();
        service.create("doc-1".to_string(), request("Gauze", 3, 3)).await.unwrap();
        service.create("doc-1".to_string(), request("Syringes", 40, 10)).await.unwrap();
        service.create("doc-2".to_string(), request("Masks", 1, 5)).await.unwrap();

        let mine: Vec<String> = service
            .low_stock(Some("doc-1"))
            .await
            .unwrap()
            .into_iter()
            .map(|i| i.name)
            .collect();
        assert_eq!(mine, vec!["Gauze"]);
        assert_eq!(service.low_stock(None).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn blank_names_are_rejected() {
        let service = InventoryService::new(Arc::new(MemoryStore::new())).unwrap();
        assert_matches!(
            service.create("doc-1".to_string(), request("  ", 1, 0)).await,
            Err(RecordError::Validation(_))
        );
    }
}
