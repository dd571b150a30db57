//! Configuration loader
//!
//! Loads application configuration from environment variables or files.
//!
//! ## Loading Strategy
//! 1. First, attempts to load from environment variables
//! 2. If incomplete, falls back to loading from file
//! 3. Probes multiple paths for config files
//! 4. Supports JSON and TOML formats
//!
//! ## Environment Variables
//! - `ADMIN_SYNC_TOKEN`: Bearer token for the upsert endpoints (required)
//! - `ADMIN_TENANTS_UPSERT_URL`, `ADMIN_CLIENTS_UPSERT_URL`,
//!   `ADMIN_SUBTENANTS_UPSERT_URL`, `ADMIN_DOMAINS_UPSERT_URL`,
//!   `ADMIN_BRANDING_UPSERT_URL`: Per-kind upsert URLs (required)
//! - `ADMIN_TIMEOUT_MS`: Per-call timeout (default 8000)
//! - `ADMINSYNC_DB_PATH`: Outbox database file path (required)
//! - `ADMINSYNC_DB_POOL_SIZE`: Connection pool size (default 4)
//! - `ADMINSYNC_DRAIN_BATCH_SIZE`: Records per drain pass (default 10)
//! - `ADMINSYNC_DRAIN_MAX_ATTEMPTS`: Attempts before terminal failure (default 5)
//! - `ADMINSYNC_BACKOFF_BASE_MS`: Backoff base delay (default 1000)
//! - `ADMINSYNC_BACKOFF_MAX_MS`: Backoff cap (default 30000)
//! - `ADMINSYNC_DRAIN_INTERVAL_SECS`: Worker poll interval (default 5)
//! - `ADMINSYNC_SENT_RETENTION_SECS`: SENT record retention (default 86400)
//!
//! ## File Locations
//! The loader probes the following paths (in order):
//! 1. `./adminsync.json` or `./adminsync.toml` (current working directory)
//! 2. `./config.json` or `./config.toml` (current working directory)
//! 3. The same names next to the executable

use std::path::{Path, PathBuf};
use std::str::FromStr;

use adminsync_domain::constants::{
    DEFAULT_BACKOFF_BASE_MS, DEFAULT_BACKOFF_MAX_MS, DEFAULT_DB_POOL_SIZE,
    DEFAULT_DRAIN_BATCH_SIZE, DEFAULT_DRAIN_INTERVAL_SECS, DEFAULT_MAX_ATTEMPTS,
    DEFAULT_SENT_RETENTION_SECS, DEFAULT_UPSERT_TIMEOUT_MS,
};
use adminsync_domain::{
    AdminSyncError, Config, DatabaseConfig, DrainConfig, EndpointUrls, HubConfig, Result,
};

const CONFIG_FILE_NAMES: [&str; 4] =
    ["adminsync.json", "adminsync.toml", "config.json", "config.toml"];

/// Load and validate configuration with automatic fallback strategy
///
/// First attempts to load from environment variables. If any required
/// variables are missing, falls back to loading from a config file.
///
/// # Errors
/// Returns `AdminSyncError::Config` if:
/// - Configuration cannot be loaded from either source
/// - File format is invalid
/// - The loaded configuration fails validation
pub fn load() -> Result<Config> {
    let config = match load_from_env() {
        Ok(config) => {
            tracing::info!("Configuration loaded from environment variables");
            config
        }
        Err(e) => {
            tracing::debug!(error = %e, "Failed to load from environment, trying file");
            load_from_file(None)?
        }
    };

    config.validate()?;
    Ok(config)
}

/// Load configuration from environment variables
///
/// Required variables must be present; optional ones fall back to their
/// defaults. The result is not validated.
///
/// # Errors
/// Returns `AdminSyncError::Config` if required variables are missing
/// or have invalid values.
pub fn load_from_env() -> Result<Config> {
    let token = env_var("ADMIN_SYNC_TOKEN")?;
    let urls = EndpointUrls {
        tenants: env_var("ADMIN_TENANTS_UPSERT_URL")?,
        clients: env_var("ADMIN_CLIENTS_UPSERT_URL")?,
        subtenants: env_var("ADMIN_SUBTENANTS_UPSERT_URL")?,
        domains: env_var("ADMIN_DOMAINS_UPSERT_URL")?,
        branding: env_var("ADMIN_BRANDING_UPSERT_URL")?,
    };
    let timeout_ms = env_or("ADMIN_TIMEOUT_MS", DEFAULT_UPSERT_TIMEOUT_MS)?;

    let db_path = env_var("ADMINSYNC_DB_PATH")?;
    let pool_size = env_or("ADMINSYNC_DB_POOL_SIZE", DEFAULT_DB_POOL_SIZE)?;

    let drain = DrainConfig {
        batch_size: env_or("ADMINSYNC_DRAIN_BATCH_SIZE", DEFAULT_DRAIN_BATCH_SIZE)?,
        max_attempts: env_or("ADMINSYNC_DRAIN_MAX_ATTEMPTS", DEFAULT_MAX_ATTEMPTS)?,
        backoff_base_ms: env_or("ADMINSYNC_BACKOFF_BASE_MS", DEFAULT_BACKOFF_BASE_MS)?,
        backoff_max_ms: env_or("ADMINSYNC_BACKOFF_MAX_MS", DEFAULT_BACKOFF_MAX_MS)?,
        interval_secs: env_or("ADMINSYNC_DRAIN_INTERVAL_SECS", DEFAULT_DRAIN_INTERVAL_SECS)?,
        sent_retention_secs: env_or(
            "ADMINSYNC_SENT_RETENTION_SECS",
            DEFAULT_SENT_RETENTION_SECS,
        )?,
    };

    Ok(Config {
        hub: HubConfig { token, timeout_ms, urls },
        database: DatabaseConfig { path: db_path, pool_size },
        drain,
    })
}

/// Load configuration from a file
///
/// If `path` is `None`, probes multiple locations for config files.
/// Supports both JSON and TOML formats (detected by file extension).
///
/// # Errors
/// Returns `AdminSyncError::Config` if:
/// - File not found (when path is specified)
/// - No config file found (when path is `None`)
/// - File format is invalid
/// - Required fields are missing
pub fn load_from_file(path: Option<PathBuf>) -> Result<Config> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(AdminSyncError::Config(format!(
                    "Config file not found: {}",
                    p.display()
                )));
            }
            p
        }
        None => probe_config_paths().ok_or_else(|| {
            AdminSyncError::Config(
                "No config file found in any of the standard locations".to_string(),
            )
        })?,
    };

    tracing::info!(path = %config_path.display(), "Loading configuration from file");

    let contents = std::fs::read_to_string(&config_path)
        .map_err(|e| AdminSyncError::Config(format!("Failed to read config file: {}", e)))?;

    parse_config(&contents, &config_path)
}

/// Parse configuration from string content
///
/// Format is detected by file extension (`.json` or `.toml`).
fn parse_config(contents: &str, path: &Path) -> Result<Config> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

    match extension {
        "toml" => toml::from_str(contents)
            .map_err(|e| AdminSyncError::Config(format!("Invalid TOML format: {}", e))),
        "json" => serde_json::from_str(contents)
            .map_err(|e| AdminSyncError::Config(format!("Invalid JSON format: {}", e))),
        _ => Err(AdminSyncError::Config(format!("Unsupported config format: {}", extension))),
    }
}

/// Probe multiple paths for configuration files
///
/// Searches the current working directory first, then the directory of the
/// running executable.
///
/// # Returns
/// The first config file found, or `None` if no file exists.
pub fn probe_config_paths() -> Option<PathBuf> {
    let mut dirs = Vec::new();

    if let Ok(cwd) = std::env::current_dir() {
        dirs.push(cwd);
    }

    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            dirs.push(exe_dir.to_path_buf());
        }
    }

    dirs.iter()
        .flat_map(|dir| CONFIG_FILE_NAMES.iter().map(move |name| dir.join(name)))
        .find(|path| path.exists())
}

/// Get required environment variable
///
/// # Errors
/// Returns `AdminSyncError::Config` if the variable is not set.
fn env_var(key: &str) -> Result<String> {
    std::env::var(key).map_err(|_| {
        AdminSyncError::Config(format!("Missing required environment variable: {}", key))
    })
}

/// Parse an optional environment variable, falling back to `default`.
///
/// # Errors
/// Returns `AdminSyncError::Config` if the variable is set but unparsable.
fn env_or<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| AdminSyncError::Config(format!("Invalid value for {}: {}", key, e))),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::sync::Mutex;

    use once_cell::sync::Lazy;
    use tempfile::NamedTempFile;

    use super::*;

    static ENV_LOCK: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

    const REQUIRED_VARS: [(&str, &str); 7] = [
        ("ADMIN_SYNC_TOKEN", "secret-token"),
        ("ADMIN_TENANTS_UPSERT_URL", "https://hub.test/tenants"),
        ("ADMIN_CLIENTS_UPSERT_URL", "https://hub.test/clients"),
        ("ADMIN_SUBTENANTS_UPSERT_URL", "https://hub.test/subtenants"),
        ("ADMIN_DOMAINS_UPSERT_URL", "https://hub.test/domains"),
        ("ADMIN_BRANDING_UPSERT_URL", "https://hub.test/branding"),
        ("ADMINSYNC_DB_PATH", "/tmp/adminsync-test.db"),
    ];

    const OPTIONAL_VARS: [&str; 8] = [
        "ADMIN_TIMEOUT_MS",
        "ADMINSYNC_DB_POOL_SIZE",
        "ADMINSYNC_DRAIN_BATCH_SIZE",
        "ADMINSYNC_DRAIN_MAX_ATTEMPTS",
        "ADMINSYNC_BACKOFF_BASE_MS",
        "ADMINSYNC_BACKOFF_MAX_MS",
        "ADMINSYNC_DRAIN_INTERVAL_SECS",
        "ADMINSYNC_SENT_RETENTION_SECS",
    ];

    fn set_required() {
        for (key, value) in REQUIRED_VARS {
            std::env::set_var(key, value);
        }
    }

    fn clear_all() {
        for (key, _) in REQUIRED_VARS {
            std::env::remove_var(key);
        }
        for key in OPTIONAL_VARS {
            std::env::remove_var(key);
        }
    }

    fn write_temp(contents: &str, extension: &str) -> PathBuf {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(contents.as_bytes()).unwrap();
        let path = temp_file.path().with_extension(extension);
        std::fs::copy(temp_file.path(), &path).unwrap();
        path
    }

    #[test]
    fn test_load_from_env_applies_defaults() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");
        clear_all();
        set_required();

        let config = load_from_env().expect("config loads from env");

        assert_eq!(config.hub.token, "secret-token");
        assert_eq!(config.hub.timeout_ms, 8_000);
        assert_eq!(config.hub.urls.domains, "https://hub.test/domains");
        assert_eq!(config.database.path, "/tmp/adminsync-test.db");
        assert_eq!(config.database.pool_size, 4);
        assert_eq!(config.drain, DrainConfig::default());
        assert!(config.validate().is_ok());

        clear_all();
    }

    #[test]
    fn test_load_from_env_reads_overrides() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");
        clear_all();
        set_required();
        std::env::set_var("ADMIN_TIMEOUT_MS", "2500");
        std::env::set_var("ADMINSYNC_DRAIN_BATCH_SIZE", "25");
        std::env::set_var("ADMINSYNC_DRAIN_MAX_ATTEMPTS", "8");
        std::env::set_var("ADMINSYNC_BACKOFF_MAX_MS", "60000");

        let config = load_from_env().expect("config loads from env");

        assert_eq!(config.hub.timeout_ms, 2_500);
        assert_eq!(config.drain.batch_size, 25);
        assert_eq!(config.drain.max_attempts, 8);
        assert_eq!(config.drain.backoff_max_ms, 60_000);
        assert_eq!(config.drain.backoff_base_ms, 1_000);

        clear_all();
    }

    #[test]
    fn test_load_from_env_missing_url() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");
        clear_all();
        set_required();
        std::env::remove_var("ADMIN_BRANDING_UPSERT_URL");

        let err = load_from_env().unwrap_err();
        match err {
            AdminSyncError::Config(msg) => assert!(msg.contains("ADMIN_BRANDING_UPSERT_URL")),
            other => panic!("expected config error, got {:?}", other),
        }

        clear_all();
    }

    #[test]
    fn test_load_from_env_invalid_number() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");
        clear_all();
        set_required();
        std::env::set_var("ADMINSYNC_DB_POOL_SIZE", "not-a-number");

        let err = load_from_env().unwrap_err();
        assert!(matches!(err, AdminSyncError::Config(_)), "Should be a Config error");

        clear_all();
    }

    #[test]
    fn test_load_from_file_json() {
        let path = write_temp(
            r#"{
                "hub": {
                    "token": "file-token",
                    "urls": {
                        "tenants": "https://hub.test/t",
                        "clients": "https://hub.test/c",
                        "subtenants": "https://hub.test/s",
                        "domains": "https://hub.test/d",
                        "branding": "https://hub.test/b"
                    }
                },
                "database": { "path": "outbox.db" },
                "drain": { "batch_size": 3 }
            }"#,
            "json",
        );

        let config = load_from_file(Some(path.clone())).expect("JSON config loads");

        assert_eq!(config.hub.token, "file-token");
        assert_eq!(config.hub.timeout_ms, 8_000);
        assert_eq!(config.database.pool_size, 4);
        assert_eq!(config.drain.batch_size, 3);
        assert_eq!(config.drain.max_attempts, 5);

        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_load_from_file_toml() {
        let path = write_temp(
            r#"
[hub]
token = "file-token"
timeout_ms = 3000

[hub.urls]
tenants = "https://hub.test/t"
clients = "https://hub.test/c"
subtenants = "https://hub.test/s"
domains = "https://hub.test/d"
branding = "https://hub.test/b"

[database]
path = "outbox.db"
pool_size = 2
"#,
            "toml",
        );

        let config = load_from_file(Some(path.clone())).expect("TOML config loads");

        assert_eq!(config.hub.timeout_ms, 3_000);
        assert_eq!(config.database.pool_size, 2);
        assert_eq!(config.drain, DrainConfig::default());

        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_load_from_file_not_found() {
        let result = load_from_file(Some(PathBuf::from("/nonexistent/adminsync.json")));
        assert!(matches!(result, Err(AdminSyncError::Config(_))));
    }

    #[test]
    fn test_load_from_file_invalid_json() {
        let path = write_temp(r#"{ "this is": "not valid json" "#, "json");

        let result = load_from_file(Some(path.clone()));
        assert!(result.is_err(), "Should fail with invalid JSON");

        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_parse_config_unsupported_extension() {
        let result = parse_config("key: value", Path::new("adminsync.yaml"));
        match result {
            Err(AdminSyncError::Config(msg)) => assert!(msg.contains("yaml")),
            other => panic!("expected config error, got {:?}", other),
        }
    }
}
