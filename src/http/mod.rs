//! HTTP surface: axum router, handlers and the error-envelope mapping.

pub mod envelope;
pub mod handlers;
pub mod router;

pub use envelope::ApiError;
pub use handlers::AppState;
pub use router::build_router;
