#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use backstage_auth::Authenticator;
use backstage_chats::{ChatServices, LocalBlobStore};
use backstage_config::{AuthConfig, DatabaseConfig};
use backstage_database::initialize_database;
use backstage_gateway::{build_router, AppState};
use backstage_users::{
    IdentityResolver, ParticipantKind, ParticipantRef, ParticipantRepository,
    SqliteIdentityResolver,
};
use http_body_util::BodyExt;
use serde_json::Value;
use sqlx::pool::PoolConnection;
use sqlx::{Sqlite, SqlitePool};
use tempfile::TempDir;
use tower::ServiceExt;

pub type TestResult<T = ()> = anyhow::Result<T>;

pub const ARIA: ParticipantRef = ParticipantRef {
    kind: ParticipantKind::Artist,
    id: 1,
};
pub const BEX: ParticipantRef = ParticipantRef {
    kind: ParticipantKind::Artist,
    id: 2,
};
pub const NOVA: ParticipantRef = ParticipantRef {
    kind: ParticipantKind::Artist,
    id: 5,
};
pub const BEATSMITH: ParticipantRef = ParticipantRef {
    kind: ParticipantKind::Producer,
    id: 1_000_000,
};

pub struct TestApp {
    pub temp_dir: TempDir,
    pub pool: SqlitePool,
    pub state: AppState,
    pub router: Router,
}

impl TestApp {
    pub async fn new() -> TestResult<Self> {
        Self::with_store_timeout(Duration::from_secs(5)).await
    }

    /// An app whose store operations give up after `store_timeout`.
    pub async fn with_store_timeout(store_timeout: Duration) -> TestResult<Self> {
        let temp_dir = TempDir::new()?;
        let db_path = temp_dir.path().join("gateway.sqlite");
        let pool = initialize_database(&DatabaseConfig {
            url: format!("sqlite://{}", db_path.display()),
            max_connections: 5,
            store_timeout_ms: store_timeout.as_millis() as u64,
            ..DatabaseConfig::default()
        })
        .await?;

        let accounts = ParticipantRepository::new(pool.clone());
        accounts.insert(ParticipantKind::Artist, 1, "aria").await?;
        accounts.insert(ParticipantKind::Artist, 2, "bex").await?;
        accounts.insert(ParticipantKind::Artist, 5, "nova").await?;
        accounts
            .insert(ParticipantKind::Producer, 1_000_000, "beatsmith")
            .await?;

        let resolver: Arc<dyn IdentityResolver> = Arc::new(SqliteIdentityResolver::new(accounts));
        let authenticator = Authenticator::new(
            &AuthConfig {
                jwt_secret: "gateway-test-secret".to_string(),
                ..AuthConfig::default()
            },
            resolver.clone(),
        )?;
        let blobs = Arc::new(LocalBlobStore::new(temp_dir.path().join("media"), "/media/"));
        let chats = ChatServices::new(pool.clone(), resolver, blobs, store_timeout);

        let state = AppState::new(authenticator, chats, 16);
        let router = build_router(state.clone());

        Ok(Self {
            temp_dir,
            pool,
            state,
            router,
        })
    }

    pub fn token(&self, participant: ParticipantRef) -> String {
        self.state
            .authenticator()
            .issue_token(participant)
            .expect("token issuance")
    }

    pub async fn send(&self, request: Request<Body>) -> TestResult<(StatusCode, Value)> {
        let response = self.router.clone().oneshot(request).await?;
        let status = response.status();
        let bytes = response.into_body().collect().await?.to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)?
        };
        Ok((status, body))
    }

    pub async fn get(&self, uri: &str, as_participant: ParticipantRef) -> TestResult<(StatusCode, Value)> {
        let request = Request::builder()
            .method(Method::GET)
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {}", self.token(as_participant)))
            .body(Body::empty())?;
        self.send(request).await
    }

    pub async fn post_json(
        &self,
        uri: &str,
        as_participant: ParticipantRef,
        body: Value,
    ) -> TestResult<(StatusCode, Value)> {
        let request = Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {}", self.token(as_participant)))
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))?;
        self.send(request).await
    }

    pub async fn post_empty(&self, uri: &str, as_participant: ParticipantRef) -> TestResult<(StatusCode, Value)> {
        let request = Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {}", self.token(as_participant)))
            .body(Body::empty())?;
        self.send(request).await
    }

    /// Takes the database write lock until `release_write_lock`.
    pub async fn hold_write_lock(&self) -> TestResult<PoolConnection<Sqlite>> {
        let mut conn = self.pool.acquire().await?;
        sqlx::query("BEGIN IMMEDIATE").execute(&mut *conn).await?;
        Ok(conn)
    }

    pub async fn release_write_lock(&self, mut conn: PoolConnection<Sqlite>) -> TestResult {
        sqlx::query("ROLLBACK").execute(&mut *conn).await?;
        Ok(())
    }

    /// Pairwise room between two participants, created through the service layer.
    pub async fn pair_room(&self, a: ParticipantRef, b: ParticipantRef) -> TestResult<i64> {
        let (room, _) = self.state.chats().rooms.get_or_create_pairwise(a, b).await?;
        Ok(room.id)
    }
}
