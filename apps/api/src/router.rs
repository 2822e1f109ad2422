use std::sync::Arc;

use axum::{routing::get, Router};

use appointment_cell::{appointment_routes, AppointmentState};
use records_cell::{
    diagnosis_routes, inventory_routes, prescription_routes, review_routes, RecordsState,
};

pub fn create_router(appointments: Arc<AppointmentState>, records: Arc<RecordsState>) -> Router {
    let api = Router::new()
        .nest("/appointments", appointment_routes(appointments))
        .nest("/prescriptions", prescription_routes(records.clone()))
        .nest("/reviews", review_routes(records.clone()))
        .nest("/inventory", inventory_routes(records.clone()))
        .nest("/diagnoses", diagnosis_routes(records));

    Router::new()
        .route("/", get(|| async { "Carebook Clinic API is running!" }))
        .nest("/api", api)
}
