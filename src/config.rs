use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

/// Placeholder secret written into fresh config files. Rejected outside `dev`.
pub const DEFAULT_JWT_SECRET: &str = "change-me-userhub-jwt-secret";

/// Upper bound for every token lifetime: ten years.
pub const MAX_TTL_SECONDS: i64 = 10 * 365 * 24 * 60 * 60;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub general: GeneralConfig,

    pub server: ServerConfig,

    pub auth: AuthConfig,

    pub security: SecurityConfig,

    pub uploads: UploadConfig,

    pub scheduler: SchedulerConfig,

    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Prod,
    Dev,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    pub database_path: String,

    pub log_level: String,

    /// `dev` exposes error details in 500 responses.
    pub environment: Environment,

    /// Number of tokio worker threads (default: 2)
    /// Set to 0 to use the number of CPU cores
    pub worker_threads: usize,

    pub max_db_connections: u32,

    pub min_db_connections: u32,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            database_path: "sqlite:data/userhub.db".to_string(),
            log_level: "info".to_string(),
            environment: Environment::Prod,
            worker_threads: 2,
            max_db_connections: 5,
            min_db_connections: 1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,

    pub cors_allowed_origins: Vec<String>,

    /// Whether to set the Secure flag on the refresh cookie.
    /// Default: true. Set to false for local development without HTTPS.
    pub secure_cookies: bool,

    /// Scheme and host prefixed onto profile image paths in responses,
    /// e.g. `https://api.example.com`. Paths stay relative when unset.
    pub public_url: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            cors_allowed_origins: vec![
                "http://localhost:5173".to_string(),
                "http://127.0.0.1:5173".to_string(),
            ],
            secure_cookies: true,
            public_url: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// HMAC secret for access tokens. `USERHUB_JWT_SECRET` takes precedence.
    pub jwt_secret: String,

    pub jwt_issuer: String,

    pub access_token_ttl_seconds: i64,

    /// Refresh token lifetime for "remember me" logins (30 days).
    pub remember_me_ttl_seconds: i64,

    /// Refresh token lifetime for plain logins (3 hours).
    pub session_ttl_seconds: i64,

    pub refresh_cookie_name: String,

    pub refresh_cookie_path: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: DEFAULT_JWT_SECRET.to_string(),
            jwt_issuer: "userhub".to_string(),
            access_token_ttl_seconds: 60 * 60,
            remember_me_ttl_seconds: 60 * 60 * 24 * 30,
            session_ttl_seconds: 60 * 60 * 3,
            refresh_cookie_name: "REFRESH_TOKEN".to_string(),
            refresh_cookie_path: "/api/auth/token".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Argon2 memory cost in KiB (default: 8192 = 8MB)
    pub argon2_memory_cost_kib: u32,

    /// Argon2 time cost (iterations)
    pub argon2_time_cost: u32,

    pub argon2_parallelism: u32,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            argon2_memory_cost_kib: 8192,
            argon2_time_cost: 3,
            argon2_parallelism: 1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadConfig {
    /// Root directory for stored images, served under `/images`.
    pub images_path: String,

    pub max_upload_bytes: usize,

    pub max_width: u32,

    pub max_height: u32,

    pub default_profile_image: String,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            images_path: "images".to_string(),
            max_upload_bytes: 5 * 1024 * 1024,
            max_width: 1024,
            max_height: 1024,
            default_profile_image: "/images/default/pfp.webp".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    pub enabled: bool,

    /// Six-field cron expression (seconds first) for pruning expired refresh tokens.
    pub token_cleanup_cron: String,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            token_cleanup_cron: "0 0 * * * *".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    pub metrics_enabled: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            metrics_enabled: true,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            general: GeneralConfig::default(),
            server: ServerConfig::default(),
            auth: AuthConfig::default(),
            security: SecurityConfig::default(),
            uploads: UploadConfig::default(),
            scheduler: SchedulerConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let paths = Self::config_paths();

        let mut config = None;
        for path in &paths {
            if path.exists() {
                info!("Loading config from: {}", path.display());
                config = Some(Self::load_from_path(path)?);
                break;
            }
        }

        let mut config = config.unwrap_or_else(|| {
            info!("No config file found, using defaults");
            Self::default()
        });
        config.apply_env_overrides();
        Ok(config)
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(secret) = std::env::var("USERHUB_JWT_SECRET")
            && !secret.is_empty()
        {
            self.auth.jwt_secret = secret;
        }
    }

    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        info!("Config saved to: {}", path.display());
        Ok(())
    }

    fn config_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from("config.toml")];

        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("userhub").join("config.toml"));
        }

        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".userhub").join("config.toml"));
        }

        paths
    }

    fn default_config_path() -> PathBuf {
        PathBuf::from("config.toml")
    }

    pub fn create_default_if_missing() -> Result<bool> {
        let path = Self::default_config_path();
        if path.exists() {
            Ok(false)
        } else {
            let config = Self::default();
            config.save_to_path(&path)?;
            info!("Created default config file: {}", path.display());
            Ok(true)
        }
    }

    #[must_use]
    pub fn is_dev(&self) -> bool {
        self.general.environment == Environment::Dev
    }

    pub fn validate(&self) -> Result<()> {
        if self.auth.jwt_secret.is_empty() {
            anyhow::bail!("auth.jwt_secret cannot be empty");
        }

        if !self.is_dev() && self.auth.jwt_secret == DEFAULT_JWT_SECRET {
            anyhow::bail!(
                "auth.jwt_secret is still the placeholder; set it or USERHUB_JWT_SECRET"
            );
        }

        if self.auth.access_token_ttl_seconds <= 0
            || self.auth.remember_me_ttl_seconds <= 0
            || self.auth.session_ttl_seconds <= 0
        {
            anyhow::bail!("Token lifetimes must be positive");
        }

        if self.auth.access_token_ttl_seconds > MAX_TTL_SECONDS
            || self.auth.remember_me_ttl_seconds > MAX_TTL_SECONDS
            || self.auth.session_ttl_seconds > MAX_TTL_SECONDS
        {
            anyhow::bail!("Token lifetimes cannot exceed {MAX_TTL_SECONDS} seconds");
        }

        if self.auth.session_ttl_seconds > self.auth.remember_me_ttl_seconds {
            anyhow::bail!("auth.session_ttl_seconds cannot exceed auth.remember_me_ttl_seconds");
        }

        if !self.auth.refresh_cookie_path.starts_with('/') {
            anyhow::bail!("auth.refresh_cookie_path must start with '/'");
        }

        if self.uploads.max_width == 0 || self.uploads.max_height == 0 {
            anyhow::bail!("Upload image bounds must be > 0");
        }

        Ok(())
    }
}
