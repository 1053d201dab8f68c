//! HTTP API application wiring (Axum router + service wiring).
//!
//! - `services.rs`: store selection and service construction
//! - `routes/`: HTTP routes + handlers (one file per area)
//! - `dto.rs`: request/response DTOs and path parsing
//! - `errors.rs`: error → status/code mapping

use std::sync::Arc;

use axum::{routing::get, Extension, Router};
use tower::ServiceBuilder;

use seatwise_infra::config::ServiceConfig;

use crate::middleware;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

use services::AppServices;

/// Build the full HTTP router from configuration (public entrypoint used by
/// `main.rs`).
pub async fn build_app(config: ServiceConfig) -> anyhow::Result<Router> {
    let jwt_secret = config.jwt_secret.clone();
    let services = Arc::new(services::build_services(config).await?);
    Ok(build_router(&jwt_secret, services))
}

/// Router over already-built services.
pub fn build_router(jwt_secret: &str, services: Arc<AppServices>) -> Router {
    let jwt = Arc::new(seatwise_auth::Hs256JwtValidator::new(jwt_secret.as_bytes()));
    let auth_state = middleware::AuthState { jwt };

    // Protected routes: require a verified bearer token.
    let protected = routes::router().layer(axum::middleware::from_fn_with_state(
        auth_state,
        middleware::auth_middleware,
    ));

    Router::new()
        .route("/health", get(routes::system::health))
        .route("/invites/:token", get(routes::invites::preview_invite))
        .merge(protected)
        .layer(ServiceBuilder::new().layer(Extension(services)))
}
