//! Identity resolution: `(kind, id)` to a participant record.

use async_trait::async_trait;
use tracing::debug;

use crate::entities::{Participant, ParticipantKind, ParticipantRef};
use crate::repositories::ParticipantRepository;
use crate::types::{UserError, UserResult};

/// Maps a participant reference to its record. The kind always comes from the
/// caller; implementations never try both kinds for a bare id.
#[async_trait]
pub trait IdentityResolver: Send + Sync {
    async fn resolve(&self, kind: ParticipantKind, id: i64) -> UserResult<Participant>;

    async fn resolve_ref(&self, reference: ParticipantRef) -> UserResult<Participant> {
        self.resolve(reference.kind, reference.id).await
    }
}

/// Resolver backed by the artist and producer tables.
#[derive(Clone)]
pub struct SqliteIdentityResolver {
    repository: ParticipantRepository,
}

impl SqliteIdentityResolver {
    pub fn new(repository: ParticipantRepository) -> Self {
        Self { repository }
    }
}

#[async_trait]
impl IdentityResolver for SqliteIdentityResolver {
    async fn resolve(&self, kind: ParticipantKind, id: i64) -> UserResult<Participant> {
        let reference = ParticipantRef::new(kind, id);
        match self.repository.find(reference).await? {
            Some(participant) => Ok(participant),
            None => {
                debug!(participant = %reference, "participant not found");
                Err(UserError::not_found(kind, id))
            }
        }
    }
}
