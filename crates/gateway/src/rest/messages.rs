//! Message history, posting and read tracking endpoints.

use axum::extract::{FromRequest, Multipart, Path, Request, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use backstage_chats::{AttachmentType, AttachmentUpload};
use backstage_users::Participant;
use tracing::debug;

use crate::error::{ApiError, ApiResult};
use crate::rest::models::{
    CreateMessageRequest, MarkAllReadResponse, MarkReadResponse, MessagePayload, MessageRenderer,
    UnreadCountResponse,
};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/api/rooms/:room_id/messages",
            get(list_messages).post(create_message),
        )
        .route("/api/rooms/:room_id/mark-read", post(mark_room_read))
        .route(
            "/api/rooms/:room_id/messages/:message_id/mark-read",
            post(mark_message_read),
        )
        .route("/api/rooms/:room_id/unread-count", get(unread_count))
}

/// The caller, provided it takes part in `room_id`.
async fn room_participant(state: &AppState, headers: &HeaderMap, room_id: i64) -> ApiResult<Participant> {
    let caller = state.caller(headers).await?;
    state
        .chats()
        .rooms
        .require_participant(room_id, caller.reference())
        .await?;
    Ok(caller)
}

#[utoipa::path(
    get,
    path = "/api/rooms/{room_id}/messages",
    tag = "messages",
    params(("room_id" = i64, Path, description = "Room id")),
    responses(
        (status = 200, description = "Messages in timestamp order; the caller's unread ones are marked read", body = [MessagePayload]),
        (status = 403, description = "Caller is not a participant", body = ErrorResponse),
        (status = 404, description = "Room not found", body = ErrorResponse)
    ),
    security(("bearer" = []))
)]
pub async fn list_messages(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(room_id): Path<i64>,
) -> ApiResult<Json<Vec<MessagePayload>>> {
    let caller = room_participant(&state, &headers, room_id).await?;
    let chats = state.chats();

    let marked = chats.reads.mark_all_read(room_id, caller.reference()).await?;
    debug!(room_id, participant = %caller.reference(), marked, "history read");

    let messages = chats.messages.list_messages(room_id).await?;
    let statuses = chats.reads.statuses_for_room(room_id).await?;
    let payloads = MessageRenderer::new(&state, &caller)
        .render_all(&messages, statuses)
        .await?;
    Ok(Json(payloads))
}

#[utoipa::path(
    post,
    path = "/api/rooms/{room_id}/messages",
    tag = "messages",
    params(("room_id" = i64, Path, description = "Room id")),
    request_body(
        content = CreateMessageRequest,
        description = "JSON `{content}` or multipart with `content`, `file_attachment`, `file_type`, `file_name`"
    ),
    responses(
        (status = 201, description = "Message stored", body = MessagePayload),
        (status = 400, description = "Empty message", body = ErrorResponse),
        (status = 403, description = "Caller is not a participant", body = ErrorResponse)
    ),
    security(("bearer" = []))
)]
pub async fn create_message(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(room_id): Path<i64>,
    request: Request,
) -> ApiResult<(StatusCode, Json<MessagePayload>)> {
    let caller = room_participant(&state, &headers, room_id).await?;

    let is_multipart = headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.starts_with("multipart/form-data"));

    let (content, upload) = if is_multipart {
        let multipart = Multipart::from_request(request, &state)
            .await
            .map_err(|rejection| ApiError::bad_request(rejection.body_text()))?;
        read_multipart(multipart).await?
    } else {
        let Json(payload) = Json::<CreateMessageRequest>::from_request(request, &state)
            .await
            .map_err(|rejection| ApiError::bad_request(rejection.body_text()))?;
        (payload.content, None)
    };

    let message = state
        .chats()
        .messages
        .post_message(room_id, caller.reference(), &content, upload)
        .await?;

    let body = MessageRenderer::new(&state, &caller)
        .render(&message, &[])
        .await?;
    Ok((StatusCode::CREATED, Json(body)))
}

async fn read_multipart(mut multipart: Multipart) -> ApiResult<(String, Option<AttachmentUpload>)> {
    let mut content = String::new();
    let mut file: Option<(String, bytes::Bytes)> = None;
    let mut file_type: Option<AttachmentType> = None;
    let mut file_name: Option<String> = None;

    let invalid = |error: axum::extract::multipart::MultipartError| ApiError::bad_request(error.body_text());

    while let Some(field) = multipart.next_field().await.map_err(invalid)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "content" => content = field.text().await.map_err(invalid)?,
            "file_attachment" => {
                let filename = field.file_name().unwrap_or("attachment").to_string();
                let bytes = field.bytes().await.map_err(invalid)?;
                file = Some((filename, bytes));
            }
            "file_type" => {
                let value = field.text().await.map_err(invalid)?;
                if !value.trim().is_empty() {
                    let parsed = value
                        .parse::<AttachmentType>()
                        .map_err(|_| ApiError::bad_request(format!("unknown file type '{value}'")))?;
                    file_type = Some(parsed);
                }
            }
            "file_name" => {
                let value = field.text().await.map_err(invalid)?;
                if !value.trim().is_empty() {
                    file_name = Some(value);
                }
            }
            other => debug!(field = other, "ignoring multipart field"),
        }
    }

    let upload = file.map(|(filename, bytes)| {
        let mut upload = AttachmentUpload::new(filename, bytes);
        if let Some(name) = file_name {
            upload = upload.with_name(name);
        }
        if let Some(file_type) = file_type {
            upload = upload.with_type(file_type);
        }
        upload
    });
    Ok((content, upload))
}

#[utoipa::path(
    post,
    path = "/api/rooms/{room_id}/mark-read",
    tag = "messages",
    params(("room_id" = i64, Path, description = "Room id")),
    responses(
        (status = 200, description = "Unread messages marked read", body = MarkAllReadResponse),
        (status = 403, description = "Caller is not a participant", body = ErrorResponse)
    ),
    security(("bearer" = []))
)]
pub async fn mark_room_read(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(room_id): Path<i64>,
) -> ApiResult<Json<MarkAllReadResponse>> {
    let caller = room_participant(&state, &headers, room_id).await?;
    let marked = state
        .chats()
        .reads
        .mark_all_read(room_id, caller.reference())
        .await?;

    Ok(Json(MarkAllReadResponse {
        success: true,
        marked_read_count: marked,
    }))
}

#[utoipa::path(
    post,
    path = "/api/rooms/{room_id}/messages/{message_id}/mark-read",
    tag = "messages",
    params(
        ("room_id" = i64, Path, description = "Room id"),
        ("message_id" = i64, Path, description = "Message id")
    ),
    responses(
        (status = 200, description = "Message marked read", body = MarkReadResponse),
        (status = 400, description = "Own message", body = ErrorResponse),
        (status = 404, description = "Message not in this room", body = ErrorResponse)
    ),
    security(("bearer" = []))
)]
pub async fn mark_message_read(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path((room_id, message_id)): Path<(i64, i64)>,
) -> ApiResult<Json<MarkReadResponse>> {
    let caller = room_participant(&state, &headers, room_id).await?;
    let chats = state.chats();

    let message = chats.messages.get_message(message_id).await?;
    if message.room_id != Some(room_id) {
        return Err(ApiError::not_found(format!("Message not found: {message_id}")));
    }

    let newly_read = chats.reads.mark_read(message_id, caller.reference()).await?;
    Ok(Json(MarkReadResponse {
        success: true,
        message_id,
        newly_read,
    }))
}

#[utoipa::path(
    get,
    path = "/api/rooms/{room_id}/unread-count",
    tag = "messages",
    params(("room_id" = i64, Path, description = "Room id")),
    responses(
        (status = 200, description = "Unread messages for the caller", body = UnreadCountResponse),
        (status = 403, description = "Caller is not a participant", body = ErrorResponse)
    ),
    security(("bearer" = []))
)]
pub async fn unread_count(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(room_id): Path<i64>,
) -> ApiResult<Json<UnreadCountResponse>> {
    let caller = room_participant(&state, &headers, room_id).await?;
    let unread_count = state
        .chats()
        .reads
        .unread_count(room_id, caller.reference())
        .await?;

    Ok(Json(UnreadCountResponse {
        room_id,
        unread_count,
    }))
}
