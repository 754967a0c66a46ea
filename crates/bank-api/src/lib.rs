//! HTTP command ingress for the event-sourced bank account service.

pub mod config;
pub mod error;
pub mod routes;
pub mod state;

use axum::Router;

use crate::state::AppState;

/// Builds the application router: the health check plus the account
/// commands under `/account`.
pub fn app(state: AppState) -> Router {
    Router::new()
        .merge(routes::health::router())
        .nest("/account", routes::account::router())
        .with_state(state)
}
