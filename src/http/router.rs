//! Route table. Static routes are registered alongside the generic
//! `/:entity/` tree; the router prefers the static match, so `/login/`
//! never reaches entity resolution.

use super::handlers::{self, AppState};
use axum::Router;
use axum::http::Method;
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/login/", post(handlers::login))
        .route("/logout/", post(handlers::logout))
        .route("/switch-account/", post(handlers::switch_account))
        .route("/next_code/", post(handlers::next_code))
        .route("/search/client/aadhar/", get(handlers::search_client_aadhaar))
        .route("/permission-group/", get(handlers::permission_groups))
        .route("/api/credit-bureau/pull/", post(handlers::bureau_pull))
        .route("/npa/", get(handlers::npa_summary))
        .route("/:entity/", get(handlers::list_entity))
        .route("/:entity/get/", get(handlers::create_form))
        .route("/:entity/get/:id/", get(handlers::edit_form))
        .route("/:entity/create/", post(handlers::create_record))
        .route("/:entity/update/:id/", post(handlers::update_record))
        .route("/:entity/delete/:id/", post(handlers::delete_record))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_headers(Any)
                .allow_methods([Method::GET, Method::POST, Method::OPTIONS]),
        )
        .with_state(state)
}
