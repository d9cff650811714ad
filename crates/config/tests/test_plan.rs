//! Test plan for the `backstage-config` crate.
//!
//! These tests exercise the configuration loader across default handling,
//! file discovery, environment overrides, and validation behaviour.

use std::fs;
use std::path::{Path, PathBuf};

use serial_test::serial;
use tempfile::TempDir;

use backstage_config::{
    load, load_from, AppConfig, AuthConfig, HttpConfig, RealtimeConfig, StorageConfig,
};

const ENV_VARS_TO_RESET: &[&str] = &[
    "BACKSTAGE_CONFIG",
    "BACKSTAGE__AUTH__JWT_SECRET",
    "BACKSTAGE__AUTH__TOKEN_TTL_SECONDS",
    "BACKSTAGE__DATABASE__MAX_CONNECTIONS",
    "BACKSTAGE__DATABASE__URL",
    "BACKSTAGE__DATABASE__STORE_TIMEOUT_MS",
    "BACKSTAGE__HTTP__ADDRESS",
    "BACKSTAGE__HTTP__PORT",
    "BACKSTAGE__REALTIME__GROUP_CAPACITY",
    "BACKSTAGE__STORAGE__MEDIA_ROOT",
    "BACKSTAGE__STORAGE__MEDIA_URL",
];

struct TestContext {
    vars: Vec<(String, Option<String>)>,
    original_dir: Option<PathBuf>,
}

impl TestContext {
    fn new() -> Self {
        Self {
            vars: Vec::new(),
            original_dir: None,
        }
    }

    fn reset_environment(&mut self) {
        for key in ENV_VARS_TO_RESET {
            self.remove_var(key);
        }
    }

    fn set_var(&mut self, key: &str, value: impl AsRef<str>) {
        let previous = std::env::var(key).ok();
        std::env::set_var(key, value.as_ref());
        self.vars.push((key.to_string(), previous));
    }

    fn remove_var(&mut self, key: &str) {
        let previous = std::env::var(key).ok();
        std::env::remove_var(key);
        self.vars.push((key.to_string(), previous));
    }

    fn set_current_dir(&mut self, dir: &Path) {
        if self.original_dir.is_none() {
            self.original_dir =
                Some(std::env::current_dir().expect("failed to capture current directory"));
        }
        std::env::set_current_dir(dir).expect("failed to set current directory");
    }
}

impl Drop for TestContext {
    fn drop(&mut self) {
        if let Some(original) = self.original_dir.take() {
            let _ = std::env::set_current_dir(original);
        }

        while let Some((key, value)) = self.vars.pop() {
            match value {
                Some(val) => std::env::set_var(&key, val),
                None => std::env::remove_var(&key),
            }
        }
    }
}

fn write_config_file(root: &Path, relative: &str, contents: &str) -> PathBuf {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("failed to create config directories");
    }
    fs::write(&path, contents).expect("failed to write config file");
    path
}

#[test]
#[serial]
fn load_uses_default_values_when_no_files_found() {
    let temp_dir = TempDir::new().expect("failed to create temp dir");
    let mut ctx = TestContext::new();
    ctx.reset_environment();
    ctx.set_current_dir(temp_dir.path());

    let config = load().expect("configuration load should succeed without files");
    let defaults = AppConfig::default();

    assert_eq!(config.http.address, defaults.http.address);
    assert_eq!(config.http.port, defaults.http.port);
    assert_eq!(config.database.url, defaults.database.url);
    assert_eq!(
        config.database.max_connections,
        defaults.database.max_connections
    );
    assert_eq!(
        config.database.store_timeout_ms,
        defaults.database.store_timeout_ms
    );
    assert_eq!(config.auth.jwt_algorithm, defaults.auth.jwt_algorithm);
    assert_eq!(config.auth.token_ttl_seconds, defaults.auth.token_ttl_seconds);
    assert_eq!(config.storage.media_root, defaults.storage.media_root);
    assert_eq!(
        config.realtime.group_capacity,
        defaults.realtime.group_capacity
    );
}

#[test]
#[serial]
fn load_picks_first_available_file_in_search_order() {
    let temp_dir = TempDir::new().expect("failed to create temp dir");
    let mut ctx = TestContext::new();
    ctx.reset_environment();
    ctx.set_current_dir(temp_dir.path());

    write_config_file(
        temp_dir.path(),
        "backstage.toml",
        r#"
        [http]
        port = 4242
        "#,
    );
    write_config_file(
        temp_dir.path(),
        "config/backstage.toml",
        r#"
        [http]
        port = 5151
        "#,
    );

    let config = load().expect("configuration load should pick the first file");
    assert_eq!(config.http.port, 4242);
}

#[test]
#[serial]
fn load_merges_partial_file_with_defaults() {
    let temp_dir = TempDir::new().expect("failed to create temp dir");
    let mut ctx = TestContext::new();
    ctx.reset_environment();
    ctx.set_current_dir(temp_dir.path());

    write_config_file(
        temp_dir.path(),
        "backstage.toml",
        r#"
        [http]
        port = 8181

        [database]
        max_connections = 50

        [storage]
        media_url = "/uploads/"
        "#,
    );

    let config = load().expect("configuration load should succeed");
    let defaults = AppConfig::default();

    assert_eq!(config.http.port, 8181);
    assert_eq!(config.http.address, defaults.http.address);
    assert_eq!(config.database.max_connections, 50);
    assert_eq!(config.database.url, defaults.database.url);
    assert_eq!(config.storage.media_url, "/uploads/");
    assert_eq!(config.storage.media_root, defaults.storage.media_root);
}

#[test]
#[serial]
fn load_applies_environment_overrides() {
    let temp_dir = TempDir::new().expect("failed to create temp dir");
    let mut ctx = TestContext::new();
    ctx.reset_environment();
    ctx.set_current_dir(temp_dir.path());

    write_config_file(
        temp_dir.path(),
        "backstage.toml",
        r#"
        [http]
        port = 3030
        "#,
    );

    ctx.set_var("BACKSTAGE__HTTP__PORT", "8080");
    ctx.set_var("BACKSTAGE__AUTH__JWT_SECRET", "from-env");

    let config = load().expect("configuration load should honour env overrides");
    assert_eq!(config.http.port, 8080);
    assert_eq!(config.auth.jwt_secret, "from-env");
}

#[test]
#[serial]
fn load_honours_explicit_config_path_variable() {
    let temp_dir = TempDir::new().expect("failed to create temp dir");
    let mut ctx = TestContext::new();
    ctx.reset_environment();
    ctx.set_current_dir(temp_dir.path());

    write_config_file(
        temp_dir.path(),
        "backstage.toml",
        r#"
        [http]
        port = 1111
        "#,
    );
    let explicit = write_config_file(
        temp_dir.path(),
        "elsewhere/custom.toml",
        r#"
        [http]
        port = 2222
        "#,
    );

    ctx.set_var("BACKSTAGE_CONFIG", explicit.display().to_string());

    let config = load().expect("explicit configuration path should load");
    assert_eq!(config.http.port, 2222);
}

#[test]
#[serial]
fn load_from_prefers_argument_over_discovery() {
    let temp_dir = TempDir::new().expect("failed to create temp dir");
    let mut ctx = TestContext::new();
    ctx.reset_environment();
    ctx.set_current_dir(temp_dir.path());

    write_config_file(
        temp_dir.path(),
        "backstage.toml",
        r#"
        [realtime]
        group_capacity = 8
        "#,
    );
    let explicit = write_config_file(
        temp_dir.path(),
        "cli.toml",
        r#"
        [realtime]
        group_capacity = 16
        "#,
    );

    let config = load_from(Some(&explicit)).expect("explicit path should load");
    assert_eq!(config.realtime.group_capacity, 16);
}

#[test]
#[serial]
fn load_rejects_zero_group_capacity() {
    let temp_dir = TempDir::new().expect("failed to create temp dir");
    let mut ctx = TestContext::new();
    ctx.reset_environment();
    ctx.set_current_dir(temp_dir.path());

    ctx.set_var("BACKSTAGE__REALTIME__GROUP_CAPACITY", "0");

    let error = load().expect_err("zero capacity should be rejected");
    assert!(error.to_string().contains("group_capacity"));
}

#[test]
#[serial]
fn load_clamps_token_ttl_to_i64_maximum() {
    let temp_dir = TempDir::new().expect("failed to create temp dir");
    let mut ctx = TestContext::new();
    ctx.reset_environment();
    ctx.set_current_dir(temp_dir.path());

    let oversized = (i64::MAX as u128 + 42).to_string();
    ctx.set_var("BACKSTAGE__AUTH__TOKEN_TTL_SECONDS", &oversized);

    let config = load().expect("configuration load should succeed with oversized TTL");
    assert_eq!(config.auth.token_ttl_seconds, i64::MAX as u64);
}

#[test]
#[serial]
fn load_errors_on_invalid_toml_contents() {
    let temp_dir = TempDir::new().expect("failed to create temp dir");
    let mut ctx = TestContext::new();
    ctx.reset_environment();
    ctx.set_current_dir(temp_dir.path());

    write_config_file(
        temp_dir.path(),
        "backstage.toml",
        r#"
        [http]
        port = "not-a-number
        "#,
    );

    let error = load().expect_err("invalid TOML should cause load to fail");
    let message = error.to_string();
    assert!(
        message.contains("invalid configuration") || message.contains("unable to build configuration"),
        "unexpected error message: {message}"
    );
}

#[test]
fn auth_config_defaults_use_four_hour_hs256_tokens() {
    let defaults = AuthConfig::default();
    assert_eq!(defaults.jwt_algorithm, "HS256");
    assert_eq!(defaults.token_ttl_seconds, 14_400);
    assert_eq!(defaults.leeway_seconds, 0);
}

#[test]
fn storage_and_realtime_defaults() {
    let storage = StorageConfig::default();
    assert_eq!(storage.media_root, PathBuf::from("media"));
    assert_eq!(storage.media_url, "/media/");
    assert_eq!(RealtimeConfig::default().group_capacity, 100);
}

#[test]
fn http_config_defaults_match_expected_host_and_port() {
    let defaults = HttpConfig::default();
    assert_eq!(defaults.address, "127.0.0.1");
    assert_eq!(defaults.port, 7070);
}
