//! Shared application state for the gateway

use std::collections::HashMap;
use std::sync::Arc;

use axum::http::HeaderMap;
use backstage_auth::Authenticator;
use backstage_chats::ChatServices;
use backstage_users::{IdentityResolver, Participant, ParticipantRef, UserError};

use crate::error::{ApiError, ApiResult};
use crate::middleware::require_bearer;
use crate::websocket::BroadcastGroups;

#[derive(Clone)]
pub struct AppState {
    authenticator: Authenticator,
    chats: ChatServices,
    groups: BroadcastGroups,
}

impl AppState {
    pub fn new(authenticator: Authenticator, chats: ChatServices, group_capacity: usize) -> Self {
        Self {
            authenticator,
            chats,
            groups: BroadcastGroups::new(group_capacity),
        }
    }

    pub fn authenticator(&self) -> &Authenticator {
        &self.authenticator
    }

    pub fn chats(&self) -> &ChatServices {
        &self.chats
    }

    pub fn groups(&self) -> &BroadcastGroups {
        &self.groups
    }

    pub fn resolver(&self) -> Arc<dyn IdentityResolver> {
        self.authenticator.resolver()
    }

    pub async fn authenticate(&self, token: &str) -> ApiResult<Participant> {
        self.authenticator
            .authenticate(token)
            .await
            .map_err(ApiError::from)
    }

    /// The caller named by the request's bearer token.
    pub async fn caller(&self, headers: &HeaderMap) -> ApiResult<Participant> {
        let token = require_bearer(headers)?;
        self.authenticate(&token).await
    }
}

/// Per-request username lookup; each participant is resolved at most once.
pub struct UsernameCache {
    resolver: Arc<dyn IdentityResolver>,
    known: HashMap<ParticipantRef, Option<String>>,
}

impl UsernameCache {
    pub fn new(resolver: Arc<dyn IdentityResolver>) -> Self {
        Self {
            resolver,
            known: HashMap::new(),
        }
    }

    pub fn seed(&mut self, participant: &Participant) {
        self.known
            .insert(participant.reference(), Some(participant.username.clone()));
    }

    /// `None` when the account no longer exists.
    pub async fn username(&mut self, participant: ParticipantRef) -> ApiResult<Option<String>> {
        if let Some(known) = self.known.get(&participant) {
            return Ok(known.clone());
        }

        let username = match self.resolver.resolve_ref(participant).await {
            Ok(resolved) => Some(resolved.username),
            Err(UserError::NotFound { .. }) => None,
            Err(UserError::InvalidParticipant(message)) => return Err(ApiError::bad_request(message)),
            Err(UserError::DatabaseError(message)) => {
                tracing::warn!(participant = %participant, error = %message, "username lookup failed");
                return Err(ApiError::service_unavailable("identity store unavailable"));
            }
        };
        self.known.insert(participant, username.clone());
        Ok(username)
    }
}
