//! Bearer token authentication for participants.
//!
//! A token names a `(participant_kind, participant_id)` pair; the
//! [`Authenticator`] verifies it and resolves the participant through an
//! [`IdentityResolver`].

use std::sync::Arc;

use backstage_config::AuthConfig;
use backstage_users::{IdentityResolver, Participant, ParticipantRef, UserError};
use thiserror::Error;
use tracing::{debug, warn};

pub mod jwt;

pub use jwt::{Claims, JwtManager};

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("missing bearer token")]
    MissingToken,
    #[error("invalid token: {0}")]
    InvalidToken(String),
    #[error("token expired")]
    TokenExpired,
    #[error("participant {0} not found")]
    UnknownParticipant(ParticipantRef),
    #[error("identity store error: {0}")]
    IdentityStore(String),
    #[error("token creation failed: {0}")]
    TokenCreation(String),
    #[error("auth configuration error: {0}")]
    Configuration(String),
}

impl AuthError {
    /// True when the failure is the caller's credential rather than the backend.
    pub fn is_authentication_failure(&self) -> bool {
        matches!(
            self,
            AuthError::MissingToken
                | AuthError::InvalidToken(_)
                | AuthError::TokenExpired
                | AuthError::UnknownParticipant(_)
        )
    }
}

#[derive(Clone)]
pub struct Authenticator {
    tokens: JwtManager,
    resolver: Arc<dyn IdentityResolver>,
}

impl Authenticator {
    pub fn new(config: &AuthConfig, resolver: Arc<dyn IdentityResolver>) -> Result<Self, AuthError> {
        Ok(Self {
            tokens: JwtManager::from_config(config)?,
            resolver,
        })
    }

    pub fn tokens(&self) -> &JwtManager {
        &self.tokens
    }

    pub fn resolver(&self) -> Arc<dyn IdentityResolver> {
        self.resolver.clone()
    }

    /// Verify the token and resolve the participant it names.
    pub async fn authenticate(&self, token: &str) -> Result<Participant, AuthError> {
        let token = token.trim();
        if token.is_empty() {
            return Err(AuthError::MissingToken);
        }

        let claims = self.tokens.validate_token(token)?;
        let reference = claims.participant()?;

        match self.resolver.resolve_ref(reference).await {
            Ok(participant) => {
                debug!(participant = %reference, "authenticated participant");
                Ok(participant)
            }
            Err(UserError::NotFound { .. }) => {
                warn!(participant = %reference, "token names an unknown participant");
                Err(AuthError::UnknownParticipant(reference))
            }
            Err(UserError::InvalidParticipant(message)) => Err(AuthError::InvalidToken(message)),
            Err(UserError::DatabaseError(message)) => Err(AuthError::IdentityStore(message)),
        }
    }

    /// Issue an access token for the participant.
    pub fn issue_token(&self, participant: ParticipantRef) -> Result<String, AuthError> {
        self.tokens.generate_token(participant)
    }
}
