//! HTTP application wiring (Axum router + pipeline wiring).
//!
//! - `services.rs`: the resolve → select → verify → issue pipeline
//! - `routes/`: HTTP handlers
//! - `dto.rs`: wire request/response shapes
//! - `errors.rs`: failure → status/message mapping

use std::sync::Arc;

use axum::{
    routing::{any, get},
    Extension, Router,
};
use tower::ServiceBuilder;

use crate::config::AuthServiceConfig;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

pub use services::{AuthOutcome, AuthPipeline, PipelineSettings};

/// Build the full HTTP router (public entrypoint used by `main.rs`).
pub fn build_app(config: &AuthServiceConfig) -> Router {
    build_app_with(Arc::new(AuthPipeline::from_config(config)))
}

/// Router over an already wired pipeline (tests inject stubbed stages).
pub fn build_app_with(pipeline: Arc<AuthPipeline>) -> Router {
    Router::new()
        .route("/health", get(routes::system::health))
        .route("/auth", any(routes::auth::authenticate))
        .layer(ServiceBuilder::new().layer(Extension(pipeline)))
}
