use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use backstage_auth::Authenticator;
use backstage_chats::{BlobStore, ChatServices, LocalBlobStore};
use backstage_config::AppConfig;
use backstage_database::initialize_database;
use backstage_users::{IdentityResolver, ParticipantRepository, SqliteIdentityResolver};
use sqlx::SqlitePool;
use tracing::info;

pub mod telemetry {
    use anyhow::Result;
    use tracing::Level;
    use tracing_subscriber::{fmt::SubscriberBuilder, EnvFilter};

    pub fn init_tracing() -> Result<()> {
        let env_filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        let subscriber = SubscriberBuilder::default()
            .with_max_level(Level::DEBUG)
            .with_env_filter(env_filter)
            .finish();

        tracing::subscriber::set_global_default(subscriber)
            .map_err(|error| anyhow::anyhow!("failed to set tracing subscriber: {error}"))
    }
}

/// Everything the server needs, wired from one [`AppConfig`].
#[derive(Clone)]
pub struct BackendServices {
    pub db_pool: SqlitePool,
    pub accounts: ParticipantRepository,
    pub resolver: Arc<dyn IdentityResolver>,
    pub authenticator: Authenticator,
    pub chats: ChatServices,
}

impl BackendServices {
    pub async fn initialise(config: &AppConfig) -> Result<Self> {
        let db_pool = initialize_database(&config.database)
            .await
            .context("failed to initialise database")?;

        tokio::fs::create_dir_all(&config.storage.media_root)
            .await
            .with_context(|| {
                format!(
                    "failed to create media root {}",
                    config.storage.media_root.display()
                )
            })?;
        let blobs: Arc<dyn BlobStore> = Arc::new(LocalBlobStore::new(
            config.storage.media_root.clone(),
            config.storage.media_url.clone(),
        ));

        let accounts = ParticipantRepository::new(db_pool.clone());
        let resolver: Arc<dyn IdentityResolver> =
            Arc::new(SqliteIdentityResolver::new(accounts.clone()));

        let authenticator = Authenticator::new(&config.auth, resolver.clone())
            .context("failed to build authenticator")?;

        let chats = ChatServices::new(
            db_pool.clone(),
            resolver.clone(),
            blobs,
            Duration::from_millis(config.database.store_timeout_ms),
        );

        info!(
            media_root = %config.storage.media_root.display(),
            media_url = %config.storage.media_url,
            "messaging services ready"
        );

        Ok(Self {
            db_pool,
            accounts,
            resolver,
            authenticator,
            chats,
        })
    }
}

pub async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::warn!(?error, "failed to listen for shutdown signal");
    }
    info!("shutdown signal received");
}
