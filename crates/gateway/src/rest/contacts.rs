use axum::extract::State;
use axum::http::HeaderMap;
use axum::routing::get;
use axum::{Json, Router};
use backstage_chats::utils::time::format_timestamp;

use crate::error::ApiResult;
use crate::rest::models::ContactPayload;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/api/chats", get(list_contacts))
}

#[utoipa::path(
    get,
    path = "/api/chats",
    tag = "rooms",
    responses(
        (status = 200, description = "Everyone the caller shares a room with, most recent first", body = [ContactPayload]),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse)
    ),
    security(("bearer" = []))
)]
pub async fn list_contacts(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<Json<Vec<ContactPayload>>> {
    let caller = state.caller(&headers).await?;
    let contacts = state.chats().rooms.list_contacts(caller.reference()).await?;

    let payloads = contacts
        .into_iter()
        .map(|contact| ContactPayload {
            participant_id: contact.participant.id,
            participant_kind: contact.participant.kind.to_string(),
            username: contact.participant.username,
            room_id: contact.room_id,
            latest_timestamp: contact
                .latest_message
                .as_ref()
                .map(|message| format_timestamp(message.timestamp)),
            latest_message: contact.latest_message.map(|message| message.content),
        })
        .collect();
    Ok(Json(payloads))
}
