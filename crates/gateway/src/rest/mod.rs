//! REST API endpoints for the gateway

pub mod contacts;
pub mod health;
pub mod messages;
pub mod models;
pub mod rooms;

use axum::routing::get;
use axum::Router;

use crate::state::AppState;

pub fn create_rest_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health_check))
        .merge(rooms::router())
        .merge(messages::router())
        .merge(contacts::router())
}
