//! The per-connection chat protocol.
//!
//! A connection is authenticated during the upgrade request, joins the
//! broadcast group of its room and then turns inbound text and
//! file-notification frames into group broadcasts. Frames are persisted by a
//! per-connection worker task, so a disconnect never aborts a commit that is
//! already under way and one connection's frames are handled in order. Once
//! the connection closes, the worker finishes the frame in hand and drops the
//! rest of its queue.

use axum::extract::ws::{Message as WsMessage, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::response::Response;
use backstage_chats::{ChatError, ErrorKind};
use backstage_users::Participant;
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info, warn};

use super::frames::{ChatFrame, ClientFrame, FileData, FrameError, ServerFrame};
use super::groups::group_key;
use crate::error::ApiResult;
use crate::middleware::require_bearer;
use crate::state::AppState;

const OUTBOUND_BUFFER: usize = 64;
const INBOUND_BUFFER: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Connecting,
    Authenticated,
    Joined,
    Closed,
}

#[derive(Debug, Deserialize)]
pub struct ChatSocketQuery {
    token: Option<String>,
}

/// `GET /ws/chat/:room_name?token=…`
pub async fn chat_socket_handler(
    State(state): State<AppState>,
    Path(room_name): Path<String>,
    Query(query): Query<ChatSocketQuery>,
    headers: HeaderMap,
    ws: WebSocketUpgrade,
) -> ApiResult<Response> {
    let mut session = ChatSession::new(state, room_name);

    let token = match query.token.filter(|token| !token.trim().is_empty()) {
        Some(token) => token,
        None => require_bearer(&headers).inspect_err(|_| session.close("missing token"))?,
    };
    let participant = session
        .state
        .authenticate(&token)
        .await
        .inspect_err(|error| session.close(&error.message))?;
    session.authenticated(participant);

    Ok(ws.on_upgrade(move |socket| session.run(socket)))
}

pub struct ChatSession {
    state: AppState,
    room_name: String,
    group: String,
    participant: Option<Participant>,
    phase: SessionState,
}

impl ChatSession {
    fn new(state: AppState, room_name: String) -> Self {
        Self {
            group: group_key(&room_name),
            state,
            room_name,
            participant: None,
            phase: SessionState::Connecting,
        }
    }

    fn transition(&mut self, next: SessionState) {
        debug!(room = %self.room_name, from = ?self.phase, to = ?next, "session state change");
        self.phase = next;
    }

    fn authenticated(&mut self, participant: Participant) {
        self.participant = Some(participant);
        self.transition(SessionState::Authenticated);
    }

    fn close(&mut self, reason: &str) {
        warn!(room = %self.room_name, reason, "chat handshake rejected");
        self.transition(SessionState::Closed);
    }

    async fn run(mut self, socket: WebSocket) {
        let Some(participant) = self.participant.clone() else {
            self.transition(SessionState::Closed);
            return;
        };

        let mut group_rx = self.state.groups().join(&self.group).await;
        self.transition(SessionState::Joined);
        info!(room = %self.room_name, participant = %participant.reference(), "chat connection joined");

        let (sink, mut stream) = socket.split();
        let (out_tx, out_rx) = mpsc::channel::<ServerFrame>(OUTBOUND_BUFFER);
        let (in_tx, in_rx) = mpsc::channel::<String>(INBOUND_BUFFER);
        let (closed_tx, closed_rx) = watch::channel(false);

        tokio::spawn(write_frames(sink, out_rx));
        let worker = FrameWorker {
            state: self.state.clone(),
            room_name: self.room_name.clone(),
            group: self.group.clone(),
            participant: participant.clone(),
            room_id: None,
            replies: out_tx.clone(),
        };
        tokio::spawn(worker.run(in_rx, closed_rx));

        loop {
            tokio::select! {
                inbound = stream.next() => match inbound {
                    Some(Ok(WsMessage::Text(text))) => {
                        if in_tx.send(text).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(WsMessage::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(error)) => {
                        debug!(room = %self.room_name, error = %error, "chat socket read failed");
                        break;
                    }
                },
                broadcast = group_rx.recv() => match broadcast {
                    Ok(frame) => {
                        if out_tx.send(frame.into()).await.is_err() {
                            break;
                        }
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(room = %self.room_name, skipped, "chat connection lagging behind its group");
                        if out_tx.send(lagged_notice(skipped)).await.is_err() {
                            break;
                        }
                    }
                    Err(RecvError::Closed) => break,
                },
            }
        }

        closed_tx.send_replace(true);
        self.state.groups().leave(&self.group, group_rx).await;
        self.transition(SessionState::Closed);
        info!(room = %self.room_name, participant = %participant.reference(), "chat connection closed");
    }
}

async fn write_frames(mut sink: SplitSink<WebSocket, WsMessage>, mut frames: mpsc::Receiver<ServerFrame>) {
    while let Some(frame) = frames.recv().await {
        let text = match serde_json::to_string(&frame) {
            Ok(text) => text,
            Err(error) => {
                error!(error = %error, "failed to encode chat frame");
                continue;
            }
        };
        if sink.send(WsMessage::Text(text)).await.is_err() {
            debug!("chat socket closed while writing");
            break;
        }
    }
    let _ = sink.close().await;
}

/// Handles one connection's inbound frames in arrival order.
struct FrameWorker {
    state: AppState,
    room_name: String,
    group: String,
    participant: Participant,
    room_id: Option<i64>,
    replies: mpsc::Sender<ServerFrame>,
}

impl FrameWorker {
    async fn run(mut self, mut inbound: mpsc::Receiver<String>, mut closed: watch::Receiver<bool>) {
        loop {
            let text = tokio::select! {
                biased;
                _ = closed.changed() => break,
                text = inbound.recv() => match text {
                    Some(text) => text,
                    None => break,
                },
            };

            let outcome = match ClientFrame::parse(&text) {
                Ok(ClientFrame::Text { message }) => self.post_text(message).await,
                Ok(ClientFrame::FileNotification { message_id }) => self.announce_file(message_id).await,
                Err(error) => Err(error.into()),
            };

            match outcome {
                Ok(frame) => {
                    let reached = self.state.groups().publish(&self.group, frame).await;
                    debug!(group = %self.group, reached, "chat frame broadcast");
                }
                Err(reply) => {
                    if self.replies.send(reply).await.is_err() {
                        debug!(room = %self.room_name, "dropping error frame for closed connection");
                    }
                }
            }
        }
        debug!(room = %self.room_name, "chat frame worker stopped");
    }

    async fn room_id(&mut self) -> Result<i64, ChatError> {
        if let Some(room_id) = self.room_id {
            return Ok(room_id);
        }
        let (room, _) = self
            .state
            .chats()
            .rooms
            .get_or_create_by_name(&self.room_name)
            .await?;
        self.room_id = Some(room.id);
        Ok(room.id)
    }

    async fn post_text(&mut self, text: String) -> Result<ChatFrame, ServerFrame> {
        let sender = self.participant.reference();
        let persisted = async {
            let room_id = self.room_id().await?;
            self.state
                .chats()
                .messages
                .post_message(room_id, sender, &text, None)
                .await
        }
        .await;

        match persisted {
            Ok(message) => Ok(ChatFrame::Text {
                message: message.content,
                username: self.participant.username.clone(),
                message_id: message.id,
            }),
            Err(error) => Err(persist_failure(&error)),
        }
    }

    async fn announce_file(&mut self, message_id: i64) -> Result<ChatFrame, ServerFrame> {
        let chats = self.state.chats();
        let message = match chats.messages.get_message(message_id).await {
            Ok(message) => message,
            Err(error) if error.kind() == ErrorKind::NotFound => return Err(FrameError::FileNotFound.into()),
            Err(error) => return Err(persist_failure(&error)),
        };

        let room_id = match self.room_id {
            Some(room_id) => Some(room_id),
            None => match chats.rooms.find_room_by_name(&self.room_name).await {
                Ok(room) => room.map(|room| room.id),
                Err(error) => return Err(persist_failure(&error)),
            },
        };
        self.room_id = room_id;

        let attachment = match (&message.attachment, room_id) {
            (Some(attachment), Some(room_id)) if message.room_id == Some(room_id) => attachment,
            _ => return Err(FrameError::FileNotFound.into()),
        };

        let username = if message.sender == self.participant.reference() {
            self.participant.username.clone()
        } else {
            match self.state.resolver().resolve_ref(message.sender).await {
                Ok(sender) => sender.username,
                Err(error) => {
                    warn!(message_id, sender = %message.sender, error = %error, "file sender not resolvable");
                    message.sender.to_string()
                }
            }
        };

        Ok(ChatFrame::File {
            username,
            message_id: message.id,
            file_data: FileData {
                url: chats.messages.attachment_url(attachment),
                name: attachment.name.clone(),
                file_type: attachment.file_type.to_string(),
                size: attachment.size,
            },
        })
    }
}

/// Sent to a connection whose broadcast receiver overflowed; the skipped frames are gone.
fn lagged_notice(skipped: u64) -> ServerFrame {
    ServerFrame::error(format!(
        "Missed {skipped} messages, reload the room to catch up"
    ))
}

fn persist_failure(error: &ChatError) -> ServerFrame {
    match error.kind() {
        ErrorKind::InvalidInput | ErrorKind::NotFound | ErrorKind::Forbidden => {
            debug!(error = %error, "chat frame rejected");
            ServerFrame::error(error.to_string())
        }
        ErrorKind::StoreUnavailable => {
            warn!(error = %error, "chat frame not persisted");
            ServerFrame::error("Message store unavailable, please retry")
        }
        ErrorKind::Internal => {
            error!(error = ?error, "chat frame failed");
            ServerFrame::error("Failed to process message")
        }
    }
}
