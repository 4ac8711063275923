//! Crowdstory — HTTP transport.
//!
//! Maps each inbound command onto its handler and each `DomainError` onto a
//! status code. Holds no game logic of its own.

pub mod config;
pub mod error;
pub mod routes;
pub mod state;

use axum::Router;

use crate::state::AppState;

/// Builds the application router without transport layers.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(routes::health::router())
        .merge(routes::rooms::router())
        .with_state(state)
}
