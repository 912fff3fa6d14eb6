//! Configuration for the mailbox watcher.
//!
//! A [`WatchConfig`] is built once before the watch session starts, either
//! programmatically through [`WatchConfig::builder`] or from the environment
//! through [`WatchConfig::from_env`]. Missing required fields are fatal: the
//! process must halt before any session logic runs.
//!
//! ```
//! use mail_sentinel::WatchConfig;
//!
//! let config = WatchConfig::builder()
//!     .host("imap.example.com")
//!     .login("user@example.com")
//!     .secret("app-password")
//!     .webhook_url("https://hooks.example.com/T000/B000")
//!     .build()
//!     .expect("valid config");
//! ```

use crate::error::{Error, Result};
use secrecy::{ExposeSecret, SecretString};
use std::time::Duration;

/// Default folder watched when none is configured.
pub const DEFAULT_FOLDER: &str = "INBOX";

/// Environment variable names read by [`WatchConfig::from_env`].
const ENV_HOST: &str = "MAIL_HOST";
const ENV_LOGIN: &str = "MAIL_LOGIN";
const ENV_SECRET: &str = "MAIL_PASS";
const ENV_TLS: &str = "MAIL_SSL";
const ENV_FOLDER: &str = "MAIL_FOLDER";
const ENV_WEBHOOK: &str = "WEBHOOK";

/// Configuration for one mailbox watch.
///
/// Immutable once built. The `secret` field is stored as a [`SecretString`]
/// to prevent accidental logging of credentials.
#[derive(Clone)]
pub struct WatchConfig {
    /// IMAP server hostname.
    pub host: String,
    /// Login name for authentication.
    pub login: String,
    /// Mailbox secret (protected from accidental logging).
    secret: SecretString,
    /// Whether to wrap the connection in TLS.
    pub tls: bool,
    /// Explicit server port; when `None` the conventional port for the
    /// security flag is used (993 for TLS, 143 for plain).
    pub port: Option<u16>,
    /// Folder to watch.
    pub folder: String,
    /// Notification webhook endpoint.
    pub webhook_url: String,
    /// Timing knobs for the watch loop.
    pub timing: TimingConfig,
}

impl std::fmt::Debug for WatchConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatchConfig")
            .field("host", &self.host)
            .field("login", &self.login)
            .field("secret", &"[REDACTED]")
            .field("tls", &self.tls)
            .field("port", &self.port)
            .field("folder", &self.folder)
            .field("webhook_url", &self.webhook_url)
            .field("timing", &self.timing)
            .finish()
    }
}

/// Timing configuration for the watch loop.
///
/// The two delays are deliberately separate knobs: connection failures are
/// retried with a fixed backoff while the idle wait has its own timeout.
#[derive(Debug, Clone)]
pub struct TimingConfig {
    /// Delay between connection attempts.
    pub connect_retry_delay: Duration,
    /// Maximum time to hold one IDLE wait before sending a keepalive.
    pub idle_timeout: Duration,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            connect_retry_delay: Duration::from_secs(10),
            idle_timeout: Duration::from_secs(5 * 60),
        }
    }
}

impl WatchConfig {
    /// Creates a new configuration builder.
    #[must_use]
    pub fn builder() -> WatchConfigBuilder {
        WatchConfigBuilder::default()
    }

    /// Loads configuration from the process environment.
    ///
    /// Reads `MAIL_HOST`, `MAIL_LOGIN`, `MAIL_PASS`, `MAIL_SSL`,
    /// `MAIL_FOLDER` and `WEBHOOK`. Host, login, secret and webhook are
    /// required; the folder defaults to `INBOX`; `MAIL_SSL` defaults to
    /// `true` and must parse as a boolean when present.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] when a required variable is missing
    /// or empty, or when `MAIL_SSL` holds an unrecognized value.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads configuration through an injectable variable lookup.
    ///
    /// This is the testable core of [`from_env`](Self::from_env).
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut builder = Self::builder();

        if let Some(host) = lookup(ENV_HOST) {
            builder = builder.host(host);
        }
        if let Some(login) = lookup(ENV_LOGIN) {
            builder = builder.login(login);
        }
        if let Some(secret) = lookup(ENV_SECRET) {
            builder = builder.secret(secret);
        }
        if let Some(webhook_url) = lookup(ENV_WEBHOOK) {
            builder = builder.webhook_url(webhook_url);
        }
        if let Some(folder) = lookup(ENV_FOLDER) {
            builder = builder.folder(folder);
        }
        if let Some(raw) = lookup(ENV_TLS) {
            builder = builder.tls(parse_bool(ENV_TLS, &raw)?);
        }

        builder.build()
    }

    /// Returns the secret as a string slice.
    ///
    /// The secret is intentionally not directly accessible to prevent
    /// accidental logging.
    #[must_use]
    pub fn secret(&self) -> &str {
        self.secret.expose_secret()
    }

    /// Returns the effective server port.
    #[must_use]
    pub fn effective_port(&self) -> u16 {
        self.port.unwrap_or(if self.tls { 993 } else { 143 })
    }

    /// Returns the full server address as "host:port".
    #[must_use]
    pub fn server_address(&self) -> String {
        format!("{}:{}", self.host, self.effective_port())
    }
}

/// Parses a boolean environment value.
///
/// Accepts `1/0/true/false/yes/no`, ASCII case-insensitively. Anything else
/// is a fatal configuration error rather than being coerced.
fn parse_bool(key: &str, raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" => Ok(true),
        "0" | "false" | "no" => Ok(false),
        _ => Err(Error::InvalidConfig {
            message: format!("{key} must be a boolean, got '{raw}'"),
        }),
    }
}

/// Builder for [`WatchConfig`].
#[derive(Debug, Default)]
pub struct WatchConfigBuilder {
    host: Option<String>,
    login: Option<String>,
    secret: Option<String>,
    tls: Option<bool>,
    port: Option<u16>,
    folder: Option<String>,
    webhook_url: Option<String>,
    timing: Option<TimingConfig>,
}

impl WatchConfigBuilder {
    /// Sets the IMAP server hostname (required).
    #[must_use]
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    /// Sets the login name (required).
    #[must_use]
    pub fn login(mut self, login: impl Into<String>) -> Self {
        self.login = Some(login.into());
        self
    }

    /// Sets the mailbox secret (required).
    ///
    /// For Gmail/Outlook, use an app-specific password.
    #[must_use]
    pub fn secret(mut self, secret: impl Into<String>) -> Self {
        self.secret = Some(secret.into());
        self
    }

    /// Sets the transport-security flag. Default is `true`.
    #[must_use]
    pub fn tls(mut self, tls: bool) -> Self {
        self.tls = Some(tls);
        self
    }

    /// Sets an explicit server port.
    #[must_use]
    pub fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Sets the folder to watch. Default is `INBOX`.
    #[must_use]
    pub fn folder(mut self, folder: impl Into<String>) -> Self {
        self.folder = Some(folder.into());
        self
    }

    /// Sets the notification webhook endpoint (required).
    #[must_use]
    pub fn webhook_url(mut self, url: impl Into<String>) -> Self {
        self.webhook_url = Some(url.into());
        self
    }

    /// Sets timing configuration.
    #[must_use]
    pub fn timing(mut self, timing: TimingConfig) -> Self {
        self.timing = Some(timing);
        self
    }

    /// Sets the delay between connection attempts.
    #[must_use]
    pub fn connect_retry_delay(mut self, delay: Duration) -> Self {
        self.timing
            .get_or_insert_with(TimingConfig::default)
            .connect_retry_delay = delay;
        self
    }

    /// Sets the idle-wait timeout.
    #[must_use]
    pub fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.timing
            .get_or_insert_with(TimingConfig::default)
            .idle_timeout = timeout;
        self
    }

    /// Builds the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if a required field is missing or empty.
    pub fn build(self) -> Result<WatchConfig> {
        let host = require("host", self.host)?;
        let login = require("login", self.login)?;
        let secret = require("secret", self.secret)?;
        let webhook_url = require("webhook endpoint", self.webhook_url)?;

        let folder = match self.folder {
            Some(folder) if !folder.is_empty() => folder,
            _ => DEFAULT_FOLDER.to_string(),
        };

        Ok(WatchConfig {
            host,
            login,
            secret: SecretString::from(secret),
            tls: self.tls.unwrap_or(true),
            port: self.port,
            folder,
            webhook_url,
            timing: self.timing.unwrap_or_default(),
        })
    }
}

fn require(name: &str, value: Option<String>) -> Result<String> {
    match value {
        Some(value) if !value.is_empty() => Ok(value),
        _ => Err(Error::InvalidConfig {
            message: format!("{name} is required"),
        }),
    }
}
