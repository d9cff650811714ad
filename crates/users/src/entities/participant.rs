use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::types::UserError;

/// The two account kinds that can take part in a chat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParticipantKind {
    Artist,
    Producer,
}

impl ParticipantKind {
    pub const ALL: [ParticipantKind; 2] = [ParticipantKind::Artist, ParticipantKind::Producer];

    pub fn as_str(&self) -> &'static str {
        match self {
            ParticipantKind::Artist => "artist",
            ParticipantKind::Producer => "producer",
        }
    }

    /// Table holding accounts of this kind.
    pub(crate) fn table(&self) -> &'static str {
        match self {
            ParticipantKind::Artist => "artists",
            ParticipantKind::Producer => "producers",
        }
    }
}

impl fmt::Display for ParticipantKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ParticipantKind {
    type Err = UserError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "artist" => Ok(ParticipantKind::Artist),
            "producer" => Ok(ParticipantKind::Producer),
            other => Err(UserError::invalid_participant(format!(
                "unknown participant kind '{other}'"
            ))),
        }
    }
}

/// A `(kind, id)` reference to a participant. Never carries a kind guessed from the id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ParticipantRef {
    pub kind: ParticipantKind,
    pub id: i64,
}

impl ParticipantRef {
    pub fn new(kind: ParticipantKind, id: i64) -> Self {
        Self { kind, id }
    }

    pub fn artist(id: i64) -> Self {
        Self::new(ParticipantKind::Artist, id)
    }

    pub fn producer(id: i64) -> Self {
        Self::new(ParticipantKind::Producer, id)
    }

    /// Builds a reference from the raw column pair used by the store.
    pub fn from_parts(kind: &str, id: i64) -> Result<Self, UserError> {
        Ok(Self::new(kind.parse()?, id))
    }
}

impl fmt::Display for ParticipantRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.id)
    }
}

/// A resolved participant, as seen by the messaging core.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub kind: ParticipantKind,
    pub id: i64,
    pub username: String,
}

impl Participant {
    pub fn new(kind: ParticipantKind, id: i64, username: impl Into<String>) -> Self {
        Self {
            kind,
            id,
            username: username.into(),
        }
    }

    pub fn reference(&self) -> ParticipantRef {
        ParticipantRef::new(self.kind, self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_parses_case_insensitively() {
        assert_eq!("Artist".parse::<ParticipantKind>().unwrap(), ParticipantKind::Artist);
        assert_eq!(" producer ".parse::<ParticipantKind>().unwrap(), ParticipantKind::Producer);
    }

    #[test]
    fn unknown_kind_is_invalid_participant() {
        let err = "listener".parse::<ParticipantKind>().unwrap_err();
        assert!(matches!(err, UserError::InvalidParticipant(_)));
    }

    #[test]
    fn reference_displays_kind_and_id() {
        assert_eq!(ParticipantRef::producer(1_000_000).to_string(), "producer:1000000");
    }

    #[test]
    fn same_id_different_kind_are_distinct() {
        assert_ne!(ParticipantRef::artist(3), ParticipantRef::producer(3));
    }

    #[test]
    fn kind_serializes_lowercase() {
        let json = serde_json::to_string(&ParticipantKind::Producer).unwrap();
        assert_eq!(json, "\"producer\"");
    }
}
