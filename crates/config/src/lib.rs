use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

const DEFAULT_CONFIG_FILES: &[&str] = &[
    "backstage.toml",
    "config/backstage.toml",
    "crates/config/backstage.toml",
    "../backstage.toml",
    "../config/backstage.toml",
];

/// Environment variable naming an explicit configuration file.
pub const CONFIG_PATH_ENV: &str = "BACKSTAGE_CONFIG";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    pub http: HttpConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub realtime: RealtimeConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    pub address: String,
    pub port: u16,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            address: "127.0.0.1".to_string(),
            port: 7070,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    #[serde(default = "DatabaseConfig::default_acquire_timeout")]
    pub acquire_timeout_seconds: u64,
    /// Upper bound for a single persistence call before it reports the store as unavailable.
    #[serde(default = "DatabaseConfig::default_store_timeout")]
    pub store_timeout_ms: u64,
}

impl DatabaseConfig {
    const fn default_acquire_timeout() -> u64 {
        5
    }

    const fn default_store_timeout() -> u64 {
        5_000
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://backstage.db".to_string(),
            max_connections: 10,
            acquire_timeout_seconds: Self::default_acquire_timeout(),
            store_timeout_ms: Self::default_store_timeout(),
        }
    }
}

/// Bearer token settings shared by the request/response surface and the realtime handshake.
///
/// ```
/// use backstage_config::AuthConfig;
///
/// let auth = AuthConfig::default();
/// assert_eq!(auth.jwt_algorithm, "HS256");
/// assert_eq!(auth.token_ttl_seconds, 4 * 60 * 60);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    pub jwt_secret: String,
    #[serde(default = "AuthConfig::default_algorithm")]
    pub jwt_algorithm: String,
    #[serde(default = "AuthConfig::default_token_ttl")]
    pub token_ttl_seconds: u64,
    #[serde(default)]
    pub leeway_seconds: u64,
}

impl AuthConfig {
    fn default_algorithm() -> String {
        "HS256".to_string()
    }

    const fn default_token_ttl() -> u64 {
        14_400
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: "change-me-in-production".to_string(),
            jwt_algorithm: Self::default_algorithm(),
            token_ttl_seconds: Self::default_token_ttl(),
            leeway_seconds: 0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub media_root: PathBuf,
    pub media_url: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            media_root: PathBuf::from("media"),
            media_url: "/media/".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RealtimeConfig {
    /// Frames buffered per broadcast group before slow receivers start lagging.
    /// A lagging connection loses the overflowed frames and is sent an error
    /// frame with the number it missed.
    pub group_capacity: usize,
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self { group_capacity: 100 }
    }
}

/// Load the application configuration by combining defaults, files, and environment overrides.
///
/// ```
/// use backstage_config::load;
///
/// std::env::remove_var("BACKSTAGE_CONFIG");
///
/// let config = load().expect("configuration should load with defaults");
/// assert!(!config.http.address.is_empty());
/// ```
pub fn load() -> anyhow::Result<AppConfig> {
    let explicit = std::env::var(CONFIG_PATH_ENV).ok().map(PathBuf::from);
    load_from(explicit.as_deref())
}

/// Same as [`load`], but an explicit file path wins over `BACKSTAGE_CONFIG` and discovery.
pub fn load_from(path: Option<&Path>) -> anyhow::Result<AppConfig> {
    let defaults = AppConfig::default();

    let builder = config::Config::builder()
        .set_default("http.address", defaults.http.address.clone())?
        .set_default("http.port", i64::from(defaults.http.port))?
        .set_default("database.url", defaults.database.url.clone())?
        .set_default(
            "database.max_connections",
            i64::from(defaults.database.max_connections),
        )?
        .set_default(
            "database.acquire_timeout_seconds",
            saturating_i64(defaults.database.acquire_timeout_seconds),
        )?
        .set_default(
            "database.store_timeout_ms",
            saturating_i64(defaults.database.store_timeout_ms),
        )?
        .set_default("auth.jwt_secret", defaults.auth.jwt_secret.clone())?
        .set_default("auth.jwt_algorithm", defaults.auth.jwt_algorithm.clone())?
        .set_default(
            "auth.token_ttl_seconds",
            saturating_i64(defaults.auth.token_ttl_seconds),
        )?
        .set_default("auth.leeway_seconds", 0_i64)?
        .set_default(
            "storage.media_root",
            defaults.storage.media_root.display().to_string(),
        )?
        .set_default("storage.media_url", defaults.storage.media_url.clone())?
        .set_default(
            "realtime.group_capacity",
            saturating_i64(defaults.realtime.group_capacity as u64),
        )?;

    let mut builder = builder;
    let mut config_file_attached = false;

    if let Some(path) = path {
        debug!(path = %path.display(), "loading explicit configuration file");
        builder = builder.add_source(config::File::from(path.to_path_buf()));
        config_file_attached = true;
    } else if let Ok(cwd) = std::env::current_dir() {
        let fallback = DEFAULT_CONFIG_FILES
            .iter()
            .map(|candidate| cwd.join(candidate))
            .find(|path| path.exists());

        if let Some(path) = fallback {
            debug!(path = %path.display(), "loading configuration file");
            builder = builder.add_source(config::File::from(path));
            config_file_attached = true;
        }
    }

    if !config_file_attached {
        debug!("no configuration file found, relying on defaults and environment overrides");
    }

    builder = builder.add_source(config::Environment::with_prefix("BACKSTAGE").separator("__"));

    let cfg = builder.build().context("unable to build configuration")?;

    let mut config = cfg
        .try_deserialize::<AppConfig>()
        .context("invalid configuration")?;

    if config.auth.token_ttl_seconds > i64::MAX as u64 {
        config.auth.token_ttl_seconds = i64::MAX as u64;
    }

    if config.realtime.group_capacity == 0 {
        anyhow::bail!("realtime.group_capacity must be greater than zero");
    }

    debug!(
        http = %format!("{}:{}", config.http.address, config.http.port),
        database = %config.database.url,
        "loaded backend configuration"
    );
    Ok(config)
}

fn saturating_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}
