//! Server configuration from `SLOTWISE_*` environment variables.
//!
//! A `.env` file in the working directory is loaded first when present.
//! Every variable is optional except the JWT public key.

use std::fmt::Display;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, anyhow};
use slotwise_auth::AuthConfig;
use slotwise_booking::BookingConfig;
use slotwise_core::models::business_hours::BookingSettings;
use slotwise_db::DbConfig;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    pub db: DbConfig,
    pub auth: AuthConfig,
    pub booking: BookingConfig,
}

impl ServerConfig {
    /// Load `.env` (if any) and read the process environment.
    pub fn from_env() -> anyhow::Result<Self> {
        if let Ok(path) = dotenvy::dotenv() {
            tracing::debug!(path = %path.display(), "Loaded .env file");
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let env = Env(&lookup);

        let db_defaults = DbConfig::default();
        let db = DbConfig {
            url: env.string("SLOTWISE_DB_URL", db_defaults.url),
            namespace: env.string("SLOTWISE_DB_NAMESPACE", db_defaults.namespace),
            database: env.string("SLOTWISE_DB_DATABASE", db_defaults.database),
            username: env.string("SLOTWISE_DB_USERNAME", db_defaults.username),
            password: env.string("SLOTWISE_DB_PASSWORD", db_defaults.password),
        };

        let auth_defaults = AuthConfig::default();
        let auth = AuthConfig {
            jwt_public_key_pem: env.pem("SLOTWISE_JWT_PUBLIC_KEY")?,
            jwt_private_key_pem: String::new(),
            jwt_issuer: env.string("SLOTWISE_JWT_ISSUER", auth_defaults.jwt_issuer),
            access_token_lifetime_secs: auth_defaults.access_token_lifetime_secs,
        };

        let booking_defaults = BookingConfig::default();
        let settings_defaults = booking_defaults.default_settings;
        let default_settings = BookingSettings {
            slot_minutes: env.parse("SLOTWISE_SLOT_MINUTES", settings_defaults.slot_minutes)?,
            min_lead_minutes: env
                .parse("SLOTWISE_MIN_LEAD_MINUTES", settings_defaults.min_lead_minutes)?,
            max_horizon_days: env
                .parse("SLOTWISE_MAX_HORIZON_DAYS", settings_defaults.max_horizon_days)?,
            allow_overlap_per_staff: env.parse(
                "SLOTWISE_ALLOW_OVERLAP_PER_STAFF",
                settings_defaults.allow_overlap_per_staff,
            )?,
        };
        default_settings
            .validate()
            .map_err(|e| anyhow!("invalid default booking settings: {e}"))?;

        let booking = BookingConfig {
            default_settings,
            max_page_size: env.parse("SLOTWISE_MAX_PAGE_SIZE", booking_defaults.max_page_size)?,
            operation_timeout: Duration::from_secs(env.parse(
                "SLOTWISE_OPERATION_TIMEOUT_SECS",
                booking_defaults.operation_timeout.as_secs(),
            )?),
            ..booking_defaults
        };
        if booking.max_page_size == 0 {
            return Err(anyhow!("SLOTWISE_MAX_PAGE_SIZE must be at least 1"));
        }

        Ok(Self {
            bind_addr: env.parse(
                "SLOTWISE_BIND_ADDR",
                SocketAddr::from(([0, 0, 0, 0], 8080)),
            )?,
            db,
            auth,
            booking,
        })
    }
}

struct Env<'a, F>(&'a F);

impl<F: Fn(&str) -> Option<String>> Env<'_, F> {
    fn get(&self, key: &str) -> Option<String> {
        (self.0)(key).filter(|v| !v.trim().is_empty())
    }

    fn string(&self, key: &str, default: String) -> String {
        self.get(key).unwrap_or(default)
    }

    fn parse<T>(&self, key: &str, default: T) -> anyhow::Result<T>
    where
        T: FromStr,
        T::Err: Display,
    {
        match self.get(key) {
            Some(raw) => raw
                .trim()
                .parse()
                .map_err(|e: T::Err| anyhow!("{e}"))
                .with_context(|| format!("invalid value for {key}: {raw}")),
            None => Ok(default),
        }
    }

    /// PEM given inline as `KEY`, or read from the file named by `KEY_PATH`.
    fn pem(&self, key: &str) -> anyhow::Result<String> {
        if let Some(inline) = self.get(key) {
            return Ok(inline.replace("\\n", "\n"));
        }
        let path_key = format!("{key}_PATH");
        let path = self
            .get(&path_key)
            .with_context(|| format!("{key} or {path_key} must be set"))?;
        std::fs::read_to_string(&path).with_context(|| format!("failed to read {path_key} {path}"))
    }
}
