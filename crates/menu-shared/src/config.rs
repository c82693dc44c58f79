//! Configuration management

use std::path::{Path, PathBuf};
use std::time::Duration;

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

use crate::constants::*;
use crate::error::AppError;
use crate::types::StorageBackend;

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub app: AppSettings,
    pub storage: StorageSettings,
    pub admin: AdminSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppSettings {
    pub env: String,
    pub host: String,
    pub port: u16,
    pub name: String,
    /// When set, logs are also written to a daily rolling file in this directory.
    pub log_dir: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageSettings {
    pub backend: StorageBackend,
    pub data_dir: String,
    pub menu_file: String,
    pub database_url: String,
    pub max_connections: u32,
    pub lock_timeout_ms: u64,
    pub backup_retention: usize,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AdminSettings {
    pub username: String,
    pub password_hash: String,
    pub session_timeout_secs: i64,
    pub inactivity_timeout_secs: i64,
    pub rotation_interval_secs: i64,
    pub max_login_attempts: u32,
    pub lockout_secs: i64,
}

impl StorageSettings {
    pub fn menu_path(&self) -> PathBuf {
        Path::new(&self.data_dir).join(&self.menu_file)
    }

    pub fn lock_timeout(&self) -> Duration {
        Duration::from_millis(self.lock_timeout_ms)
    }
}

impl AppConfig {
    /// Layered load: built-in defaults, `config/default`, `config/{APP_ENV}`,
    /// then `APP__SECTION__KEY` environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(Path::new("config"))
    }

    pub fn load_from(config_dir: &Path) -> Result<Self, ConfigError> {
        let env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".into());
        let config = Config::builder()
            .set_default("app.env", "development")?
            .set_default("app.host", "127.0.0.1")?
            .set_default("app.port", 8080)?
            .set_default("app.name", "menu-server")?
            .set_default("storage.backend", "document")?
            .set_default("storage.data_dir", "data")?
            .set_default("storage.menu_file", "menu.json")?
            .set_default("storage.database_url", "sqlite://data/menu.db")?
            .set_default("storage.max_connections", 5)?
            .set_default("storage.lock_timeout_ms", DEFAULT_LOCK_TIMEOUT_MS)?
            .set_default("storage.backup_retention", DEFAULT_BACKUP_RETENTION as u64)?
            .set_default("admin.username", "admin")?
            .set_default("admin.password_hash", "")?
            .set_default("admin.session_timeout_secs", DEFAULT_SESSION_TIMEOUT_SECS)?
            .set_default("admin.inactivity_timeout_secs", DEFAULT_INACTIVITY_TIMEOUT_SECS)?
            .set_default("admin.rotation_interval_secs", DEFAULT_SESSION_ROTATION_SECS)?
            .set_default("admin.max_login_attempts", DEFAULT_MAX_LOGIN_ATTEMPTS)?
            .set_default("admin.lockout_secs", DEFAULT_LOCKOUT_SECS)?
            .add_source(File::from(config_dir.join("default")).required(false))
            .add_source(File::from(config_dir.join(&env)).required(false))
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            // Credentials kept in .env under their historical names
            .set_override_option("admin.username", std::env::var("ADMIN_USERNAME").ok())?
            .set_override_option("admin.password_hash", std::env::var("ADMIN_PASSWORD_HASH").ok())?
            .build()?;
        config.try_deserialize()
    }

    /// Checks the values the server cannot start without.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.admin.username.trim().is_empty() {
            return Err(AppError::MissingConfig("admin.username"));
        }
        if self.admin.password_hash.trim().is_empty() {
            return Err(AppError::MissingConfig("admin.password_hash"));
        }
        if self.admin.session_timeout_secs <= 0 || self.admin.inactivity_timeout_secs <= 0 {
            return Err(AppError::InvalidConfig(
                "session timeouts must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_without_files() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig::load_from(dir.path()).unwrap();

        assert_eq!(config.storage.menu_file, "menu.json");
        assert_eq!(config.storage.backup_retention, 5);
        assert_eq!(config.admin.max_login_attempts, 5);
        assert_eq!(config.storage.menu_path(), Path::new("data").join("menu.json"));
    }

    #[test]
    fn test_file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("default.toml"),
            "[storage]\nbackend = \"relational\"\nbackup_retention = 2\n\n[admin]\nlockout_secs = 60\n",
        )
        .unwrap();

        let config = AppConfig::load_from(dir.path()).unwrap();
        assert_eq!(config.storage.backend, StorageBackend::Relational);
        assert_eq!(config.storage.backup_retention, 2);
        assert_eq!(config.admin.lockout_secs, 60);
    }

    #[test]
    fn test_validate_requires_password_hash() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = AppConfig::load_from(dir.path()).unwrap();
        config.admin.password_hash = String::new();
        assert!(matches!(
            config.validate(),
            Err(AppError::MissingConfig("admin.password_hash"))
        ));

        config.admin.password_hash = "$argon2id$v=19$m=19456,t=2,p=1$abc$def".to_string();
        assert!(config.validate().is_ok());
    }
}
