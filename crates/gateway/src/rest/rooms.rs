//! Room listing, creation and detail endpoints.

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use backstage_chats::ErrorKind;
use tracing::{info, warn};

use crate::error::{ApiError, ApiResult};
use crate::rest::models::{
    CreateNamedRoomRequest, CreatePairwiseRoomRequest, MessageRenderer, ParticipantSelector,
    RoomPayload,
};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/rooms", get(list_rooms).post(get_or_create_pairwise_room))
        .route("/api/rooms/named", post(create_named_room))
        .route("/api/rooms/:room_id", get(get_room))
}

#[utoipa::path(
    get,
    path = "/api/rooms",
    tag = "rooms",
    responses(
        (status = 200, description = "Rooms the caller takes part in", body = [RoomPayload]),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse)
    ),
    security(("bearer" = []))
)]
pub async fn list_rooms(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<Json<Vec<RoomPayload>>> {
    let caller = state.caller(&headers).await?;
    let rooms = state.chats().rooms.list_rooms_for(caller.reference()).await?;

    let mut renderer = MessageRenderer::new(&state, &caller);
    let mut payloads = Vec::with_capacity(rooms.len());
    for room in &rooms {
        payloads.push(renderer.room(room).await?);
    }
    Ok(Json(payloads))
}

#[utoipa::path(
    post,
    path = "/api/rooms",
    tag = "rooms",
    request_body = CreatePairwiseRoomRequest,
    responses(
        (status = 201, description = "Pairwise room created", body = RoomPayload),
        (status = 200, description = "Existing pairwise room", body = RoomPayload),
        (status = 400, description = "Invalid participant", body = ErrorResponse),
        (status = 404, description = "Participant not found", body = ErrorResponse)
    ),
    security(("bearer" = []))
)]
pub async fn get_or_create_pairwise_room(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<CreatePairwiseRoomRequest>,
) -> ApiResult<(StatusCode, Json<RoomPayload>)> {
    let caller = state.caller(&headers).await?;
    let target = ParticipantSelector {
        id: payload.participant_id,
        kind: payload.participant_kind,
    }
    .reference()?;

    let (room, created) = state
        .chats()
        .rooms
        .get_or_create_pairwise(caller.reference(), target)
        .await?;

    let mut body = MessageRenderer::new(&state, &caller).room(&room).await?;
    body.created = Some(created);
    let status = if created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(body)))
}

#[utoipa::path(
    post,
    path = "/api/rooms/named",
    tag = "rooms",
    request_body = CreateNamedRoomRequest,
    responses(
        (status = 201, description = "Room created with the caller and the resolvable participants", body = RoomPayload),
        (status = 400, description = "Invalid room name", body = ErrorResponse)
    ),
    security(("bearer" = []))
)]
pub async fn create_named_room(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<CreateNamedRoomRequest>,
) -> ApiResult<(StatusCode, Json<RoomPayload>)> {
    let caller = state.caller(&headers).await?;
    let rooms = &state.chats().rooms;

    let room = rooms.create_room(&payload.name).await?;
    rooms.add_participant(room.id, caller.reference()).await?;

    for selector in &payload.participants {
        let participant = match selector.reference() {
            Ok(participant) => participant,
            Err(error) => {
                warn!(room_id = room.id, kind = %selector.kind, error = %error.message, "skipping participant");
                continue;
            }
        };
        match rooms.add_participant(room.id, participant).await {
            Ok(_) => {}
            Err(error) if error.kind() == ErrorKind::NotFound => {
                warn!(room_id = room.id, participant = %participant, "skipping unknown participant");
            }
            Err(error) => return Err(error.into()),
        }
    }

    info!(room_id = room.id, creator = %caller.reference(), "named room created");
    let mut body = MessageRenderer::new(&state, &caller).room(&room).await?;
    body.created = Some(true);
    Ok((StatusCode::CREATED, Json(body)))
}

#[utoipa::path(
    get,
    path = "/api/rooms/{room_id}",
    tag = "rooms",
    params(("room_id" = i64, Path, description = "Room id")),
    responses(
        (status = 200, description = "Room detail", body = RoomPayload),
        (status = 404, description = "Room missing or caller is not a participant", body = ErrorResponse)
    ),
    security(("bearer" = []))
)]
pub async fn get_room(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(room_id): Path<i64>,
) -> ApiResult<Json<RoomPayload>> {
    let caller = state.caller(&headers).await?;

    let room = state
        .chats()
        .rooms
        .require_participant(room_id, caller.reference())
        .await
        .map_err(|error| match error.kind() {
            ErrorKind::Forbidden | ErrorKind::NotFound => {
                ApiError::not_found(format!("Room not found: {room_id}"))
            }
            _ => ApiError::from(error),
        })?;

    let body = MessageRenderer::new(&state, &caller).room(&room).await?;
    Ok(Json(body))
}
