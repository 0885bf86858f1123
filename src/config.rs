use std::time::Duration;

use anyhow::{bail, Context};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    /// Lifetime as configured, echoed back to clients as `tokenExpires`.
    pub expires_in: String,
    #[serde(skip)]
    pub ttl: Duration,
}

impl JwtConfig {
    pub fn new(secret: impl Into<String>, expires_in: impl Into<String>) -> anyhow::Result<Self> {
        let secret = secret.into();
        if secret.trim().is_empty() {
            bail!("JWT_SECRET must not be empty");
        }
        let expires_in = expires_in.into();
        let ttl = parse_ttl(&expires_in)
            .with_context(|| format!("invalid JWT_EXPIRES_IN value {expires_in:?}"))?;
        Ok(Self {
            secret,
            expires_in,
            ttl,
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DbConfig {
    pub url: String,
    pub max_connections: u32,
    pub acquire_timeout_secs: u64,
}

/// Argon2 work factor.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct PasswordConfig {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl Default for PasswordConfig {
    fn default() -> Self {
        Self {
            memory_kib: argon2::Params::DEFAULT_M_COST,
            iterations: argon2::Params::DEFAULT_T_COST,
            parallelism: argon2::Params::DEFAULT_P_COST,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub db: DbConfig,
    pub jwt: JwtConfig,
    pub password: PasswordConfig,
    pub host: String,
    pub port: u16,
    /// Reported by `/health`. Defaults to `"development"` when `APP_ENV` is unset.
    pub environment: String,
    /// Set only when `APP_ENV` is explicitly `development`.
    #[serde(default)]
    pub expose_errors: bool,
    pub frontend_url: String,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let secret = std::env::var("JWT_SECRET")
            .context("JWT_SECRET environment variable is required")?;
        let jwt = JwtConfig::new(
            secret,
            std::env::var("JWT_EXPIRES_IN").unwrap_or_else(|_| "24h".into()),
        )?;

        let db = DbConfig {
            url: std::env::var("DATABASE_URL").unwrap_or_else(|_| database_url_from_parts()),
            max_connections: env_parse("DB_MAX_CONNECTIONS").unwrap_or(20),
            acquire_timeout_secs: env_parse("DB_ACQUIRE_TIMEOUT_SECS").unwrap_or(2),
        };

        let defaults = PasswordConfig::default();
        let password = PasswordConfig {
            memory_kib: env_parse("PASSWORD_HASH_MEMORY_KIB").unwrap_or(defaults.memory_kib),
            iterations: env_parse("PASSWORD_HASH_ITERATIONS").unwrap_or(defaults.iterations),
            parallelism: env_parse("PASSWORD_HASH_PARALLELISM").unwrap_or(defaults.parallelism),
        };

        let app_env = std::env::var("APP_ENV").ok();

        Ok(Self {
            db,
            jwt,
            password,
            host: std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: env_parse("APP_PORT").unwrap_or(5000),
            environment: app_env.clone().unwrap_or_else(|| "development".into()),
            expose_errors: exposes_errors(app_env.as_deref()),
            frontend_url: std::env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:3000".into()),
        })
    }

    /// Internal error messages are only exposed to clients in development.
    pub fn expose_error_details(&self) -> bool {
        self.expose_errors
    }
}

fn exposes_errors(app_env: Option<&str>) -> bool {
    app_env == Some("development")
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.parse::<T>().ok())
}

fn database_url_from_parts() -> String {
    let var = |key: &str, default: &str| std::env::var(key).unwrap_or_else(|_| default.into());
    format!(
        "postgres://{}:{}@{}:{}/{}",
        var("DB_USER", "admin"),
        var("DB_PASSWORD", "password"),
        var("DB_HOST", "localhost"),
        var("DB_PORT", "5432"),
        var("DB_NAME", "kpop_cards"),
    )
}

/// Longest accepted token lifetime, ten years.
pub const MAX_TTL_SECS: u64 = 10 * 365 * 24 * 60 * 60;

/// Parses lifetimes like `"3600"`, `"90s"`, `"15m"`, `"24h"`, `"7d"`, `"2w"`.
/// A bare number is seconds.
pub fn parse_ttl(raw: &str) -> anyhow::Result<Duration> {
    let raw = raw.trim();
    let split = raw
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(raw.len());
    let (digits, unit) = raw.split_at(split);
    if digits.is_empty() {
        bail!("missing numeric value");
    }
    let value: u64 = digits.parse().context("value out of range")?;
    let multiplier = match unit.trim() {
        "" | "s" => 1,
        "m" => 60,
        "h" => 60 * 60,
        "d" => 60 * 60 * 24,
        "w" => 60 * 60 * 24 * 7,
        other => bail!("unknown unit {other:?}"),
    };
    if value == 0 {
        bail!("lifetime must be positive");
    }
    let secs = value
        .checked_mul(multiplier)
        .context("value out of range")?;
    if secs > MAX_TTL_SECS {
        bail!("lifetime exceeds maximum of {MAX_TTL_SECS} seconds");
    }
    Ok(Duration::from_secs(secs))
}
