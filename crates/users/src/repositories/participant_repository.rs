//! Repository over the artist and producer tables.

use sqlx::{Row, SqlitePool};
use tracing::info;

use crate::entities::{Participant, ParticipantKind, ParticipantRef};
use crate::types::UserResult;

/// Repository for participant account lookups
#[derive(Clone)]
pub struct ParticipantRepository {
    pool: SqlitePool,
}

impl ParticipantRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Find a participant by kind and id
    pub async fn find(&self, reference: ParticipantRef) -> UserResult<Option<Participant>> {
        let sql = format!("SELECT id, username FROM {} WHERE id = ?", reference.kind.table());
        let row = sqlx::query(&sql)
            .bind(reference.id)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => Ok(Some(Participant {
                kind: reference.kind,
                id: row.try_get("id")?,
                username: row.try_get("username")?,
            })),
            None => Ok(None),
        }
    }

    /// Insert an account with an explicit id. Used for seeding and tests.
    pub async fn insert(
        &self,
        kind: ParticipantKind,
        id: i64,
        username: &str,
    ) -> UserResult<Participant> {
        let sql = format!("INSERT INTO {} (id, username) VALUES (?, ?)", kind.table());
        sqlx::query(&sql)
            .bind(id)
            .bind(username)
            .execute(&self.pool)
            .await?;

        info!(participant = %ParticipantRef::new(kind, id), username, "created participant account");
        Ok(Participant::new(kind, id, username))
    }
}
