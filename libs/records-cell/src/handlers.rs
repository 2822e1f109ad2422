// libs/records-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};

use shared_config::AppConfig;
use shared_models::auth::{Role, User};
use shared_models::error::AppError;
use shared_utils::extractor::require_staff;

use crate::models::{
    AdjustStockRequest, CreateInventoryItemRequest, CreatePrescriptionRequest,
    CreateReviewRequest, Diagnosis, DiagnosisQuery, InventoryItem, InventoryQuery, Prescription,
    PrescriptionQuery, Review, ReviewQuery, ReviewSummary, UpdateInventoryItemRequest,
    UpdatePrescriptionRequest, UpdateReviewRequest,
};
use crate::services::{DiagnosisService, InventoryService, PrescriptionService, ReviewService};

pub struct RecordsState {
    pub config: Arc<AppConfig>,
    pub prescriptions: PrescriptionService,
    pub reviews: ReviewService,
    pub inventory: InventoryService,
    pub diagnoses: DiagnosisService,
}

/// Doctors act for themselves; admins name the doctor explicitly.
fn acting_doctor(user: &User, requested: Option<String>) -> Result<String, AppError> {
    match user.role {
        Role::Doctor => Ok(user.id.clone()),
        Role::Admin => requested
            .filter(|id| !id.trim().is_empty())
            .ok_or_else(|| AppError::BadRequest("doctor_id is required".to_string())),
        Role::Patient => Err(AppError::Forbidden(
            "Only clinic staff may perform this action".to_string(),
        )),
    }
}

/// Doctors only manage their own records; admins manage all.
fn ensure_doctor_owns(user: &User, doctor_id: &str) -> Result<(), AppError> {
    require_staff(user)?;
    if user.role == Role::Doctor && user.id != doctor_id {
        return Err(AppError::Forbidden(
            "This record belongs to another doctor".to_string(),
        ));
    }
    Ok(())
}

// ==============================================================================
// PRESCRIPTIONS
// ==============================================================================

pub async fn list_prescriptions(
    State(state): State<Arc<RecordsState>>,
    Extension(user): Extension<User>,
    Query(mut query): Query<PrescriptionQuery>,
) -> Result<Json<Value>, AppError> {
    if !user.is_staff() {
        query.patient_id = Some(user.id.clone());
    }

    let prescriptions = state.prescriptions.list(&query).await?;
    Ok(Json(json!({
        "prescriptions": prescriptions,
        "total": prescriptions.len()
    })))
}

pub async fn get_prescription(
    State(state): State<Arc<RecordsState>>,
    Extension(user): Extension<User>,
    Path(id): Path<String>,
) -> Result<Json<Prescription>, AppError> {
    let prescription = state.prescriptions.get(&id).await?;
    if !user.can_access(Some(&prescription.patient_id)) {
        return Err(AppError::Forbidden(
            "Not authorized to view this prescription".to_string(),
        ));
    }
    Ok(Json(prescription))
}

pub async fn create_prescription(
    State(state): State<Arc<RecordsState>>,
    Extension(user): Extension<User>,
    Json(request): Json<CreatePrescriptionRequest>,
) -> Result<(StatusCode, Json<Prescription>), AppError> {
    let doctor_id = acting_doctor(&user, request.doctor_id.clone())?;
    let prescription = state.prescriptions.create(doctor_id, request).await?;
    Ok((StatusCode::CREATED, Json(prescription)))
}

pub async fn update_prescription(
    State(state): State<Arc<RecordsState>>,
    Extension(user): Extension<User>,
    Path(id): Path<String>,
    Json(request): Json<UpdatePrescriptionRequest>,
) -> Result<Json<Prescription>, AppError> {
    let existing = state.prescriptions.get(&id).await?;
    ensure_doctor_owns(&user, &existing.doctor_id)?;
    Ok(Json(state.prescriptions.update(&id, request).await?))
}

pub async fn delete_prescription(
    State(state): State<Arc<RecordsState>>,
    Extension(user): Extension<User>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    let existing = state.prescriptions.get(&id).await?;
    ensure_doctor_owns(&user, &existing.doctor_id)?;
    state.prescriptions.delete(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ==============================================================================
// REVIEWS
// ==============================================================================

pub async fn list_reviews(
    State(state): State<Arc<RecordsState>>,
    Query(query): Query<ReviewQuery>,
) -> Result<Json<Value>, AppError> {
    let reviews = state.reviews.list(&query).await?;
    Ok(Json(json!({
        "reviews": reviews,
        "total": reviews.len()
    })))
}

pub async fn review_summary(
    State(state): State<Arc<RecordsState>>,
    Query(query): Query<ReviewQuery>,
) -> Result<Json<ReviewSummary>, AppError> {
    Ok(Json(state.reviews.summary(query.doctor_id.as_deref()).await?))
}

pub async fn get_review(
    State(state): State<Arc<RecordsState>>,
    Path(id): Path<String>,
) -> Result<Json<Review>, AppError> {
    Ok(Json(state.reviews.get(&id).await?))
}

pub async fn create_review(
    State(state): State<Arc<RecordsState>>,
    Extension(user): Extension<User>,
    Json(request): Json<CreateReviewRequest>,
) -> Result<(StatusCode, Json<Review>), AppError> {
    let review = state.reviews.create(user.id.clone(), request).await?;
    Ok((StatusCode::CREATED, Json(review)))
}

pub async fn update_review(
    State(state): State<Arc<RecordsState>>,
    Extension(user): Extension<User>,
    Path(id): Path<String>,
    Json(request): Json<UpdateReviewRequest>,
) -> Result<Json<Review>, AppError> {
    let existing = state.reviews.get(&id).await?;
    if !user.can_access(Some(&existing.patient_id)) {
        return Err(AppError::Forbidden(
            "Only the author can edit this review".to_string(),
        ));
    }
    Ok(Json(state.reviews.update(&id, request).await?))
}

pub async fn delete_review(
    State(state): State<Arc<RecordsState>>,
    Extension(user): Extension<User>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    let existing = state.reviews.get(&id).await?;
    if !user.can_access(Some(&existing.patient_id)) {
        return Err(AppError::Forbidden(
            "Only the author can delete this review".to_string(),
        ));
    }
    state.reviews.delete(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ==============================================================================
// INVENTORY
// ==============================================================================

pub async fn list_inventory(
    State(state): State<Arc<RecordsState>>,
    Extension(user): Extension<User>,
    Query(mut query): Query<InventoryQuery>,
) -> Result<Json<Value>, AppError> {
    require_staff(&user)?;
    if user.role == Role::Doctor {
        query.doctor_id = Some(user.id.clone());
    }

    let items = state.inventory.list(&query).await?;
    Ok(Json(json!({
        "items": items,
        "total": items.len()
    })))
}

pub async fn low_stock_inventory(
    State(state): State<Arc<RecordsState>>,
    Extension(user): Extension<User>,
) -> Result<Json<Vec<InventoryItem>>, AppError> {
    require_staff(&user)?;
    let doctor_id = (user.role == Role::Doctor).then_some(user.id.as_str());
    Ok(Json(state.inventory.low_stock(doctor_id).await?))
}

pub async fn get_inventory_item(
    State(state): State<Arc<RecordsState>>,
    Extension(user): Extension<User>,
    Path(id): Path<String>,
) -> Result<Json<InventoryItem>, AppError> {
    let item = state.inventory.get(&id).await?;
    ensure_doctor_owns(&user, &item.doctor_id)?;
    Ok(Json(item))
}

pub async fn create_inventory_item(
    State(state): State<Arc<RecordsState>>,
    Extension(user): Extension<User>,
    Json(request): Json<CreateInventoryItemRequest>,
) -> Result<(StatusCode, Json<InventoryItem>), AppError> {
    let doctor_id = acting_doctor(&user, request.doctor_id.clone())?;
    let item = state.inventory.create(doctor_id, request).await?;
    Ok((StatusCode::CREATED, Json(item)))
}

pub async fn update_inventory_item(
    State(state): State<Arc<RecordsState>>,
    Extension(user): Extension<User>,
    Path(id): Path<String>,
    Json(request): Json<UpdateInventoryItemRequest>,
) -> Result<Json<InventoryItem>, AppError> {
    let existing = state.inventory.get(&id).await?;
    ensure_doctor_owns(&user, &existing.doctor_id)?;
    Ok(Json(state.inventory.update(&id, request).await?))
}

pub async fn adjust_inventory_item(
    State(state): State<Arc<RecordsState>>,
    Extension(user): Extension<User>,
    Path(id): Path<String>,
    Json(request): Json<AdjustStockRequest>,
) -> Result<Json<InventoryItem>, AppError> {
    let existing = state.inventory.get(&id).await?;
    ensure_doctor_owns(&user, &existing.doctor_id)?;
    Ok(Json(state.inventory.adjust(&id, request.delta).await?))
}

pub async fn delete_inventory_item(
    State(state): State<Arc<RecordsState>>,
    Extension(user): Extension<User>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    let existing = state.inventory.get(&id).await?;
    ensure_doctor_owns(&user, &existing.doctor_id)?;
    state.inventory.delete(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ==============================================================================
// DIAGNOSES
// ==============================================================================

pub async fn list_diagnoses(
    State(state): State<Arc<RecordsState>>,
    Query(query): Query<DiagnosisQuery>,
) -> Result<Json<Vec<Diagnosis>>, AppError> {
    Ok(Json(state.diagnoses.search(query.q.as_deref()).await?))
}
