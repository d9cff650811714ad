//! WebSocket endpoints for the gateway

pub mod frames;
pub mod groups;
pub mod session;

use axum::routing::get;
use axum::Router;

use crate::state::AppState;

pub use frames::{ChatFrame, ClientFrame, FileData, FrameError, ServerFrame};
pub use groups::{group_key, BroadcastGroups};
pub use session::{chat_socket_handler, SessionState};

pub fn create_websocket_routes() -> Router<AppState> {
    Router::new().route("/ws/chat/:room_name", get(chat_socket_handler))
}
