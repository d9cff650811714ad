//! # Backstage Gateway Crate
//!
//! The HTTP request/response surface and the realtime chat socket, both
//! routed onto the services of `backstage-chats`.
//!
//! ## Architecture
//!
//! - **REST**: room, message and read-tracking endpoints with OpenAPI documentation
//! - **WebSocket**: the per-connection chat protocol and in-process broadcast groups
//! - **State**: the authenticator, chat services and broadcast groups shared by all handlers
//! - **Middleware**: bearer extraction, CORS and request tracing
//!
//! ## Usage
//!
//! ```rust,ignore
//! use backstage_gateway::{build_router, AppState};
//!
//! let state = AppState::new(authenticator, chats, config.realtime.group_capacity);
//! let listener = tokio::net::TcpListener::bind("127.0.0.1:7070").await?;
//! axum::serve(listener, build_router(state)).await?;
//! ```

pub mod docs;
pub mod error;
pub mod middleware;
pub mod rest;
pub mod state;
pub mod websocket;

pub use docs::ApiDoc;
pub use error::{ApiError, ApiResult, ErrorResponse};
pub use state::AppState;
pub use websocket::BroadcastGroups;

use axum::Router;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(rest::create_rest_routes())
        .merge(websocket::create_websocket_routes())
        .with_state(state)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(middleware::cors_layer())
        .layer(middleware::trace_layer())
}
