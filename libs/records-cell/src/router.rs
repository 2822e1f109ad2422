// libs/records-cell/src/router.rs
use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use shared_utils::extractor::auth_middleware;

use crate::handlers::{self, RecordsState};

fn protect(routes: Router<Arc<RecordsState>>, state: Arc<RecordsState>) -> Router {
    routes
        .layer(middleware::from_fn_with_state(
            state.config.clone(),
            auth_middleware,
        ))
        .with_state(state)
}

pub fn prescription_routes(state: Arc<RecordsState>) -> Router {
    let routes = Router::new()
        .route(
            "/",
            get(handlers::list_prescriptions).post(handlers::create_prescription),
        )
        .route(
            "/{id}",
            get(handlers::get_prescription)
                .put(handlers::update_prescription)
                .delete(handlers::delete_prescription),
        );
    protect(routes, state)
}

pub fn review_routes(state: Arc<RecordsState>) -> Router {
    let routes = Router::new()
        .route("/", get(handlers::list_reviews).post(handlers::create_review))
        .route("/summary", get(handlers::review_summary))
        .route(
            "/{id}",
            get(handlers::get_review)
                .put(handlers::update_review)
                .delete(handlers::delete_review),
        );
    protect(routes, state)
}

pub fn inventory_routes(state: Arc<RecordsState>) -> Router {
    let routes = Router::new()
        .route(
            "/",
            get(handlers::list_inventory).post(handlers::create_inventory_item),
        )
        .route("/low-stock", get(handlers::low_stock_inventory))
        .route(
            "/{id}",
            get(handlers::get_inventory_item)
                .put(handlers::update_inventory_item)
                .delete(handlers::delete_inventory_item),
        )
        .route("/{id}/adjust", post(handlers::adjust_inventory_item));
    protect(routes, state)
}

pub fn diagnosis_routes(state: Arc<RecordsState>) -> Router {
    protect(
        Router::new().route("/", get(handlers::list_diagnoses)),
        state,
    )
}
