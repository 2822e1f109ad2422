// libs/appointment-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use serde_json::{json, Value};
use tracing::debug;

use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;
use shared_utils::extractor::require_staff;

use crate::models::{
    Appointment, AppointmentError, AppointmentQuery, CalendarCancelRequest, CalendarQuery,
    CreateAppointmentRequest, MoveAppointmentRequest, RescheduleAppointmentRequest,
    UpdateAppointmentRequest,
};
use crate::services::appointments::AppointmentService;
use crate::services::calendar::CalendarController;
use crate::services::drag::{DragController, GridBounds, MoveProposal};
use crate::services::grid::GridMapper;
use crate::services::render::WeekView;

// ==============================================================================
// STATE
// ==============================================================================

pub struct AppointmentState {
    pub config: Arc<AppConfig>,
    pub service: AppointmentService,
}

impl AppointmentState {
    pub fn new(config: Arc<AppConfig>, service: AppointmentService) -> Self {
        Self { config, service }
    }

    fn bounds(&self) -> GridBounds {
        GridBounds::from(&self.config.calendar)
    }

    /// A calendar controller over the stored appointments, writing back
    /// through the appointment service.
    async fn calendar(&self, doctor_id: Option<&str>) -> Result<CalendarController, AppointmentError> {
        let settings = &self.config.calendar;
        let board = self
            .service
            .calendar_board(
                doctor_id,
                GridMapper::new(settings.day_placement),
                settings.cancel_banner_ms,
            )
            .await?;
        let drag = DragController::new(settings.drag_activation_px, self.bounds());
        Ok(CalendarController::new(board, drag, Arc::new(self.service.clone())))
    }
}

async fn load_accessible(
    state: &AppointmentState,
    user: &User,
    appointment_id: &str,
) -> Result<Appointment, AppError> {
    let appointment = state.service.get(appointment_id).await?;
    if !user.can_access(appointment.patient_id.as_deref()) {
        return Err(AppError::Forbidden(
            "Not authorized to access this appointment".to_string(),
        ));
    }
    Ok(appointment)
}

// ==============================================================================
// APPOINTMENT HANDLERS
// ==============================================================================

pub async fn list_appointments(
    State(state): State<Arc<AppointmentState>>,
    Extension(user): Extension<User>,
    Query(mut query): Query<AppointmentQuery>,
) -> Result<Json<Value>, AppError> {
    if !user.is_staff() {
        query.patient_id = Some(user.id.clone());
    }

    let appointments = state.service.list(&query).await?;
    Ok(Json(json!({
        "appointments": appointments,
        "total": appointments.len()
    })))
}

pub async fn book_appointment(
    State(state): State<Arc<AppointmentState>>,
    Extension(user): Extension<User>,
    Json(mut request): Json<CreateAppointmentRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    if !user.is_staff() {
        request.patient_id = Some(user.id.clone());
        request.status = None;
    }

    let appointment = state.service.create(request).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "appointment": appointment,
            "message": "Appointment booked successfully"
        })),
    ))
}

pub async fn get_appointment(
    State(state): State<Arc<AppointmentState>>,
    Extension(user): Extension<User>,
    Path(appointment_id): Path<String>,
) -> Result<Json<Appointment>, AppError> {
    Ok(Json(load_accessible(&state, &user, &appointment_id).await?))
}

pub async fn update_appointment(
    State(state): State<Arc<AppointmentState>>,
    Extension(user): Extension<User>,
    Path(appointment_id): Path<String>,
    Json(request): Json<UpdateAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    load_accessible(&state, &user, &appointment_id).await?;
    if !user.is_staff() && request.status.is_some() {
        return Err(AppError::Forbidden(
            "Only clinic staff can change appointment status".to_string(),
        ));
    }

    let appointment = state.service.update(&appointment_id, request).await?;
    Ok(Json(json!({
        "success": true,
        "appointment": appointment
    })))
}

pub async fn delete_appointment(
    State(state): State<Arc<AppointmentState>>,
    Extension(user): Extension<User>,
    Path(appointment_id): Path<String>,
) -> Result<StatusCode, AppError> {
    load_accessible(&state, &user, &appointment_id).await?;
    state.service.delete(&appointment_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn cancel_appointment(
    State(state): State<Arc<AppointmentState>>,
    Extension(user): Extension<User>,
    Path(appointment_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    load_accessible(&state, &user, &appointment_id).await?;

    let appointment = state.service.cancel(&appointment_id).await?;
    Ok(Json(json!({
        "success": true,
        "appointment": appointment,
        "message": "Appointment canceled successfully"
    })))
}

pub async fn reschedule_appointment(
    State(state): State<Arc<AppointmentState>>,
    Extension(user): Extension<User>,
    Path(appointment_id): Path<String>,
    Json(request): Json<RescheduleAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    load_accessible(&state, &user, &appointment_id).await?;

    let appointment = state.service.reschedule(&appointment_id, request).await?;
    Ok(Json(json!({
        "success": true,
        "appointment": appointment,
        "message": "Appointment rescheduled successfully"
    })))
}

// ==============================================================================
// CALENDAR HANDLERS
// ==============================================================================

pub async fn get_calendar(
    State(state): State<Arc<AppointmentState>>,
    Extension(user): Extension<User>,
    Query(query): Query<CalendarQuery>,
) -> Result<Json<WeekView>, AppError> {
    require_staff(&user)?;

    let mut controller = state.calendar(query.doctor_id.as_deref()).await?;
    Ok(Json(controller.view(Utc::now())))
}

pub async fn move_calendar_appointment(
    State(state): State<Arc<AppointmentState>>,
    Extension(user): Extension<User>,
    Json(request): Json<MoveAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    require_staff(&user)?;

    if !state.bounds().contains(request.target) {
        return Err(AppointmentError::InvalidSlot(request.target.to_string()).into());
    }

    // Collisions are per doctor, so the board holds only this doctor's appointments.
    let appointment = state.service.get(&request.appointment_id).await?;
    let mut controller = state.calendar(appointment.doctor_id.as_deref()).await?;

    let from = controller
        .board()
        .get(&request.appointment_id)
        .map(|placed| placed.slot)
        .ok_or_else(|| AppointmentError::Unplaced(request.appointment_id.clone()))?;

    debug!(
        "Calendar move of {} from {} to {} requested by {}",
        request.appointment_id, from, request.target, user.id
    );

    let now = Utc::now();
    let proposal = MoveProposal {
        appointment_id: request.appointment_id,
        from,
        to: request.target,
    };
    let notice = controller.move_to(&proposal, now).await?;

    Ok(Json(json!({
        "success": true,
        "moved": notice,
        "calendar": controller.view(now)
    })))
}

pub async fn cancel_calendar_appointment(
    State(state): State<Arc<AppointmentState>>,
    Extension(user): Extension<User>,
    Json(request): Json<CalendarCancelRequest>,
) -> Result<Json<Value>, AppError> {
    require_staff(&user)?;

    let appointment = state.service.get(&request.appointment_id).await?;
    let mut controller = state.calendar(appointment.doctor_id.as_deref()).await?;

    let now = Utc::now();
    controller.request_cancel(&request.appointment_id)?;
    let banner = controller.confirm_cancel(now).await?;

    Ok(Json(json!({
        "success": true,
        "banner": banner,
        "calendar": controller.view(now)
    })))
}
