use crate::messages::handshake::DEFAULT_HANDSHAKE_ORIGIN;
use crate::messages::{WireConfig, DEFAULT_MAX_FRAME_SIZE};
use crate::network::{
    SessionConfig, DEFAULT_CHAT_HOST, DEFAULT_CHAT_PORT, DEFAULT_CLIENT_NAME,
    DEFAULT_LIVENESS_TIMEOUT,
};
use crate::ticket::{DEFAULT_HTTP_TIMEOUT, DEFAULT_TICKET_RENEWAL_INTERVAL, DEFAULT_TICKET_URL};
use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Accepted ping timeouts, in seconds
pub const PING_TIMEOUT_RANGE: RangeInclusive<u64> = 1..=3600;
/// Accepted ticket renewal intervals, in seconds
pub const TICKET_RENEWAL_RANGE: RangeInclusive<u64> = 60..=86400;
/// Accepted ticket request timeouts, in seconds
pub const HTTP_TIMEOUT_RANGE: RangeInclusive<u64> = 1..=600;
/// Accepted frame size limits, in bytes
pub const MAX_FRAME_SIZE_RANGE: RangeInclusive<usize> = 1024..=64 * 1024 * 1024;

fn check_range<T>(name: &str, value: T, range: &RangeInclusive<T>) -> Result<()>
where
    T: PartialOrd + std::fmt::Display,
{
    if range.contains(&value) {
        Ok(())
    } else {
        anyhow::bail!(
            "{} = {} is out of range (expected {} to {})",
            name,
            value,
            range.start(),
            range.end()
        )
    }
}

/// Application configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Account used to request login tickets
    pub account: String,
    /// Character to log in as
    pub character: String,
    /// Chat server host
    pub host: String,
    /// Chat server port
    pub port: u16,
    /// Send the legacy upgrade request before identifying
    pub legacy_handshake: bool,
    /// Origin header of the legacy upgrade request
    pub handshake_origin: String,
    /// Ticket issuance endpoint
    pub ticket_url: String,
    /// Timeout for ticket requests, in seconds
    pub http_timeout_secs: u64,
    /// Disconnect after this many seconds without a ping
    pub ping_timeout_secs: u64,
    /// Seconds between ticket renewals
    pub ticket_renewal_secs: u64,
    /// Largest frame accepted from the server, in bytes
    pub max_frame_size: usize,
    /// Client name reported when identifying
    pub client_name: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            account: String::new(),
            character: String::new(),
            host: DEFAULT_CHAT_HOST.to_string(),
            port: DEFAULT_CHAT_PORT,
            legacy_handshake: true,
            handshake_origin: DEFAULT_HANDSHAKE_ORIGIN.to_string(),
            ticket_url: DEFAULT_TICKET_URL.to_string(),
            http_timeout_secs: DEFAULT_HTTP_TIMEOUT.as_secs(),
            ping_timeout_secs: DEFAULT_LIVENESS_TIMEOUT.as_secs(),
            ticket_renewal_secs: DEFAULT_TICKET_RENEWAL_INTERVAL.as_secs(),
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
            client_name: DEFAULT_CLIENT_NAME.to_string(),
        }
    }
}

impl Config {
    /// Get the default config directory
    pub fn default_config_dir() -> Result<PathBuf> {
        ProjectDirs::from("dev", "chatwire", "chatwire")
            .map(|proj_dirs| proj_dirs.config_dir().to_path_buf())
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))
    }

    /// Get the default config file path
    pub fn default_config_file() -> Result<PathBuf> {
        Ok(Self::default_config_dir()?.join("config.toml"))
    }

    /// Load configuration from the default location, creating it if it doesn't exist
    pub fn load_or_create_default() -> Result<Self> {
        Self::load_or_create(&Self::default_config_file()?)
    }

    /// Load configuration from `path`, writing the defaults there first if it doesn't exist
    pub fn load_or_create(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load_from(path)
        } else {
            let config = Config::default();
            config.save_to(path)?;
            Ok(config)
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read configuration file: {}", path.display()))?;
        let config: Config =
            toml::from_str(&content).context("Failed to parse configuration file")?;
        config
            .validate()
            .with_context(|| format!("Invalid configuration file: {}", path.display()))?;
        Ok(config)
    }

    /// Check that every timer and size setting is usable
    pub fn validate(&self) -> Result<()> {
        check_range("ping_timeout_secs", self.ping_timeout_secs, &PING_TIMEOUT_RANGE)?;
        check_range("ticket_renewal_secs", self.ticket_renewal_secs, &TICKET_RENEWAL_RANGE)?;
        check_range("http_timeout_secs", self.http_timeout_secs, &HTTP_TIMEOUT_RANGE)?;
        check_range("max_frame_size", self.max_frame_size, &MAX_FRAME_SIZE_RANGE)?;
        Ok(())
    }

    /// Save configuration to the default location
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::default_config_file()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        // Ensure config directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize configuration")?;

        std::fs::write(path, content)
            .with_context(|| format!("Failed to write configuration file: {}", path.display()))?;

        Ok(())
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    /// Runtime settings for a session built from this configuration.
    pub fn session_config(&self) -> Result<SessionConfig> {
        self.validate().context("Invalid session settings")?;
        Ok(SessionConfig {
            host: self.host.clone(),
            port: self.port,
            legacy_handshake: self.legacy_handshake,
            handshake_origin: self.handshake_origin.clone(),
            liveness_timeout: Duration::from_secs(self.ping_timeout_secs),
            ticket_renewal_interval: Duration::from_secs(self.ticket_renewal_secs),
            wire: WireConfig::with_max_frame_size(self.max_frame_size),
            client_name: self.client_name.clone(),
            ..SessionConfig::default()
        })
    }
}
