//! Room creation, pairwise lookup and membership.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use backstage_users::{IdentityResolver, Participant, ParticipantRef, UserError};
use sqlx::SqlitePool;
use tracing::{debug, info, warn};

use crate::entities::{ChatRoom, Contact, Message};
use crate::repositories::{MessageRepository, RoomRepository};
use crate::types::{ChatError, ChatResult};
use crate::utils::{time, with_timeout, KeyedLocks, Validator};

#[derive(Clone)]
pub struct RoomDirectory {
    pool: SqlitePool,
    rooms: RoomRepository,
    messages: MessageRepository,
    resolver: Arc<dyn IdentityResolver>,
    locks: KeyedLocks,
    timeout: Duration,
}

impl RoomDirectory {
    pub fn new(pool: SqlitePool, resolver: Arc<dyn IdentityResolver>, timeout: Duration) -> Self {
        Self {
            rooms: RoomRepository::new(pool.clone()),
            messages: MessageRepository::new(pool.clone()),
            pool,
            resolver,
            locks: KeyedLocks::new(),
            timeout,
        }
    }

    /// Rooms the participant is linked to, oldest first.
    pub async fn list_rooms_for(&self, participant: ParticipantRef) -> ChatResult<Vec<ChatRoom>> {
        with_timeout(self.timeout, "list_rooms_for", self.rooms.rooms_for(participant)).await
    }

    pub async fn find_room(&self, room_id: i64) -> ChatResult<ChatRoom> {
        with_timeout(self.timeout, "find_room", self.rooms.find_by_id(room_id))
            .await?
            .ok_or_else(|| ChatError::room_not_found(room_id))
    }

    pub async fn find_room_by_name(&self, name: &str) -> ChatResult<Option<ChatRoom>> {
        with_timeout(self.timeout, "find_room_by_name", self.rooms.find_by_name(name)).await
    }

    /// Create an empty room. The caller adds participants separately.
    pub async fn create_room(&self, name: &str) -> ChatResult<ChatRoom> {
        Validator::room_name(name)?;
        let name = name.trim();

        let room = with_timeout(self.timeout, "create_room", async {
            RoomRepository::insert(&self.pool, name, None, time::now())
                .await?
                .ok_or_else(|| ChatError::internal("room insert was ignored"))
        })
        .await?;

        info!(room_id = room.id, name = %room.name, "created room");
        Ok(room)
    }

    /// Link a participant to a room; linking twice is a no-op. Returns whether a link was added.
    pub async fn add_participant(&self, room_id: i64, participant: ParticipantRef) -> ChatResult<bool> {
        self.resolve(participant).await?;

        let added = with_timeout(self.timeout, "add_participant", async {
            if self.rooms.find_by_id(room_id).await?.is_none() {
                return Err(ChatError::room_not_found(room_id));
            }
            RoomRepository::insert_participant(&self.pool, room_id, participant, time::now()).await
        })
        .await?;

        if added {
            info!(room_id, participant = %participant, "participant added to room");
        } else {
            debug!(room_id, participant = %participant, "participant already in room");
        }
        Ok(added)
    }

    pub async fn has_participant(&self, room_id: i64, participant: ParticipantRef) -> ChatResult<bool> {
        with_timeout(
            self.timeout,
            "has_participant",
            self.rooms.has_participant(room_id, participant),
        )
        .await
    }

    /// The room, if it exists and `participant` is linked to it.
    pub async fn require_participant(
        &self,
        room_id: i64,
        participant: ParticipantRef,
    ) -> ChatResult<ChatRoom> {
        let room = self.find_room(room_id).await?;
        if !self.has_participant(room_id, participant).await? {
            return Err(ChatError::forbidden(format!(
                "{participant} is not a participant of room {room_id}"
            )));
        }
        Ok(room)
    }

    /// The room shared by two participants, creating `chat_{min}_{max}` when there is none.
    ///
    /// Creation for one unordered pair is serialised in-process and backed by a
    /// unique pair key in the store, so racing callers converge on one room and
    /// exactly one of them sees `created = true`. With several shared rooms the
    /// lowest id wins.
    pub async fn get_or_create_pairwise(
        &self,
        a: ParticipantRef,
        b: ParticipantRef,
    ) -> ChatResult<(ChatRoom, bool)> {
        if a == b {
            return Err(ChatError::invalid_participant(
                "a pairwise room needs two different participants",
            ));
        }
        self.resolve(a).await?;
        self.resolve(b).await?;

        let pair_key = ChatRoom::pair_key(a, b);
        let name = ChatRoom::pairwise_name(a, b);

        let (room, created) = with_timeout(self.timeout, "get_or_create_pairwise", async {
            let _guard = self.locks.lock(format!("pair:{pair_key}")).await;

            if let Some(room) = self.rooms.common_rooms(a, b).await?.into_iter().next() {
                return Ok((room, false));
            }

            let now = time::now();
            let mut tx = self.pool.begin().await?;
            let Some(room) = RoomRepository::insert(&mut *tx, &name, Some(&pair_key), now).await? else {
                tx.rollback().await?;
                debug!(pair = %pair_key, "pairwise room created concurrently, reusing it");
                let room = self
                    .rooms
                    .find_by_pair_key(&pair_key)
                    .await?
                    .ok_or_else(|| ChatError::internal(format!("pairwise room {pair_key} vanished")))?;
                return Ok((room, false));
            };
            RoomRepository::insert_participant(&mut *tx, room.id, a, now).await?;
            RoomRepository::insert_participant(&mut *tx, room.id, b, now).await?;
            tx.commit().await?;

            Ok((room, true))
        })
        .await?;

        if created {
            info!(room_id = room.id, name = %room.name, first = %a, second = %b, "created pairwise room");
        }
        Ok((room, created))
    }

    /// The oldest room called `name`, created empty if none exists.
    pub async fn get_or_create_by_name(&self, name: &str) -> ChatResult<(ChatRoom, bool)> {
        Validator::room_name(name)?;
        let name = name.trim();

        let (room, created) = with_timeout(self.timeout, "get_or_create_by_name", async {
            let _guard = self.locks.lock(format!("name:{name}")).await;

            if let Some(room) = self.rooms.find_by_name(name).await? {
                return Ok((room, false));
            }

            let room = RoomRepository::insert(&self.pool, name, None, time::now())
                .await?
                .ok_or_else(|| ChatError::internal("room insert was ignored"))?;
            Ok((room, true))
        })
        .await?;

        if created {
            info!(room_id = room.id, name = %room.name, "created room on first use");
        }
        Ok((room, created))
    }

    /// Resolved participants of a room in join order. Links whose account is gone are skipped.
    pub async fn participants(&self, room_id: i64) -> ChatResult<Vec<Participant>> {
        let links = with_timeout(self.timeout, "participants", self.rooms.participants(room_id)).await?;

        let mut participants = Vec::with_capacity(links.len());
        for link in links {
            if let Some(participant) = self.resolve_lenient(link.participant).await? {
                participants.push(participant);
            }
        }
        Ok(participants)
    }

    /// Distinct participants sharing a room with `participant`, most recent activity first.
    pub async fn list_contacts(&self, participant: ParticipantRef) -> ChatResult<Vec<Contact>> {
        let pairs = with_timeout(
            self.timeout,
            "list_contacts",
            self.rooms.co_participants(participant),
        )
        .await?;

        let mut latest_by_room: HashMap<i64, Option<Message>> = HashMap::new();
        let mut best: HashMap<ParticipantRef, (i64, Option<Message>)> = HashMap::new();

        for (other, room_id) in pairs {
            if !latest_by_room.contains_key(&room_id) {
                let latest =
                    with_timeout(self.timeout, "latest_message", self.messages.latest_for_room(room_id))
                        .await?;
                latest_by_room.insert(room_id, latest);
            }
            let latest = latest_by_room.get(&room_id).cloned().flatten();

            let replace = match best.get(&other) {
                None => true,
                Some((_, current)) => {
                    latest.as_ref().map(|m| m.timestamp) > current.as_ref().map(|m| m.timestamp)
                }
            };
            if replace {
                best.insert(other, (room_id, latest));
            }
        }

        let mut contacts = Vec::with_capacity(best.len());
        for (other, (room_id, latest_message)) in best {
            if let Some(resolved) = self.resolve_lenient(other).await? {
                contacts.push(Contact {
                    participant: resolved,
                    room_id,
                    latest_message,
                });
            }
        }

        contacts.sort_by(|a, b| {
            b.last_activity()
                .cmp(&a.last_activity())
                .then(a.room_id.cmp(&b.room_id))
        });
        Ok(contacts)
    }

    async fn resolve(&self, participant: ParticipantRef) -> ChatResult<Participant> {
        with_timeout(self.timeout, "resolve_participant", async {
            Ok(self.resolver.resolve_ref(participant).await?)
        })
        .await
    }

    async fn resolve_lenient(&self, participant: ParticipantRef) -> ChatResult<Option<Participant>> {
        let lookup = with_timeout(self.timeout, "resolve_participant", async {
            Ok(self.resolver.resolve_ref(participant).await)
        })
        .await?;

        match lookup {
            Ok(resolved) => Ok(Some(resolved)),
            Err(UserError::NotFound { .. }) => {
                warn!(participant = %participant, "room participant has no account, skipping");
                Ok(None)
            }
            Err(err) => Err(err.into()),
        }
    }
}
