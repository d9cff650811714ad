//! JWT access tokens carrying a participant reference.

use std::str::FromStr;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use backstage_config::AuthConfig;
use backstage_users::{ParticipantKind, ParticipantRef};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::AuthError;

/// Access token claims. Older tokens name the identity fields `user_id` and
/// `user_type`; both spellings are accepted on decode.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Claims {
    #[serde(alias = "user_id")]
    pub participant_id: i64,
    #[serde(alias = "user_type")]
    pub participant_kind: String,
    pub exp: u64,
    #[serde(default)]
    pub iat: u64,
    #[serde(default)]
    pub jti: String,
}

impl Claims {
    pub fn participant(&self) -> Result<ParticipantRef, AuthError> {
        let kind = ParticipantKind::from_str(&self.participant_kind)
            .map_err(|err| AuthError::InvalidToken(err.to_string()))?;
        Ok(ParticipantRef::new(kind, self.participant_id))
    }
}

/// JWT token manager
#[derive(Clone)]
pub struct JwtManager {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    algorithm: Algorithm,
    leeway: u64,
    token_duration: Duration,
}

impl JwtManager {
    /// Build a manager from configuration. Only HMAC algorithms are accepted
    /// since the key material is a shared secret.
    pub fn from_config(config: &AuthConfig) -> Result<Self, AuthError> {
        let algorithm = Algorithm::from_str(&config.jwt_algorithm).map_err(|_| {
            AuthError::Configuration(format!("unknown jwt algorithm {}", config.jwt_algorithm))
        })?;
        if !matches!(algorithm, Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512) {
            return Err(AuthError::Configuration(format!(
                "jwt algorithm {} needs key material, only HS256/HS384/HS512 are supported",
                config.jwt_algorithm
            )));
        }
        if config.jwt_secret.is_empty() {
            return Err(AuthError::Configuration("jwt secret is empty".to_string()));
        }

        Ok(Self {
            encoding_key: EncodingKey::from_secret(config.jwt_secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            algorithm,
            leeway: config.leeway_seconds,
            token_duration: Duration::from_secs(config.token_ttl_seconds),
        })
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.token_duration = duration;
        self
    }

    /// Generate a new access token for the participant
    pub fn generate_token(&self, participant: ParticipantRef) -> Result<String, AuthError> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|_| AuthError::TokenCreation("system time error".to_string()))?;
        let exp = now.saturating_add(self.token_duration);

        let claims = Claims {
            participant_id: participant.id,
            participant_kind: participant.kind.as_str().to_string(),
            exp: exp.as_secs(),
            iat: now.as_secs(),
            jti: uuid::Uuid::new_v4().simple().to_string(),
        };

        self.encode(&claims)
    }

    pub fn encode(&self, claims: &Claims) -> Result<String, AuthError> {
        encode(&Header::new(self.algorithm), claims, &self.encoding_key)
            .map_err(|err| AuthError::TokenCreation(err.to_string()))
    }

    /// Validate signature and expiry, then decode the claims
    pub fn validate_token(&self, token: &str) -> Result<Claims, AuthError> {
        let mut validation = Validation::new(self.algorithm);
        validation.leeway = self.leeway;
        validation.set_required_spec_claims(&["exp"]);

        decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|err| match err.kind() {
                ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                _ => AuthError::InvalidToken(err.to_string()),
            })
    }
}
