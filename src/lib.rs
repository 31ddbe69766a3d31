// ============================================================================
// BranchDesk Library
// ============================================================================

pub mod auth;
pub mod columns;
pub mod config;
pub mod core;
pub mod engine;
pub mod features;
pub mod forms;
pub mod http;
pub mod registry;
pub mod store;

// Re-export main types for convenience
pub use crate::config::AppConfig;
pub use crate::core::{EngineError, FieldErrors, FieldValue, Result};
pub use crate::engine::{BackOffice, DeleteOutcome, ListFilter, LoginOutcome, LoginRequest};
pub use crate::registry::{EntityDescriptor, REGISTRY, Registry, Resolution};
pub use crate::store::{Record, Store, Table};

// Re-export the HTTP surface
pub use crate::http::{AppState, build_router};

/// One-call startup for embedding: bootstrap the engine and build the
/// router over it.
///
/// # Examples
///
/// ```no_run
/// use branchdesk::AppConfig;
///
/// # tokio_test::block_on(async {
/// let (engine, router) = branchdesk::open(AppConfig::default()).await.unwrap();
/// let listener = tokio::net::TcpListener::bind(engine.config().bind_addr())
///     .await
///     .unwrap();
/// axum::serve(listener, router).await.unwrap();
/// # })
/// ```
pub async fn open(config: AppConfig) -> Result<(std::sync::Arc<BackOffice>, axum::Router)> {
    let engine = std::sync::Arc::new(BackOffice::bootstrap(config).await?);
    let router = build_router(engine.clone());
    Ok((engine, router))
}
