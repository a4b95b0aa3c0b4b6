/**
 * Server Configuration
 *
 * `ServerConfig` holds everything the server needs at startup: bind address,
 * database location, session lifetime and the per-connection liveness knobs.
 *
 * # Configuration Sources
 *
 * Lowest to highest precedence:
 *
 * 1. Built-in defaults
 * 2. TOML file named by `SOCIALNET_CONFIG` (every key optional)
 * 3. Environment variables (`DATABASE_URL`, `SERVER_HOST`, `SERVER_PORT`,
 *    `SOCIALNET_SESSION_TTL_SECS`, `SOCIALNET_WRITE_TIMEOUT_MS`,
 *    `SOCIALNET_OUTBOUND_BUFFER`, `SOCIALNET_PING_INTERVAL_SECS`,
 *    `SOCIALNET_ERROR_ACKS`, `SOCIALNET_LOG_FILTER`)
 *
 * Invalid values fail startup with a `ConfigError` instead of being ignored.
 */
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

/// Environment variable naming the optional TOML file
pub const CONFIG_FILE_ENV: &str = "SOCIALNET_CONFIG";

/// Longest session lifetime accepted (one year)
pub const MAX_SESSION_TTL_SECS: u64 = 365 * 24 * 60 * 60;

/// Server configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// sqlx SQLite URL, e.g. `sqlite://socialnet.db`
    pub database_url: String,
    pub session_ttl_secs: u64,
    /// Upper bound on a single socket write (and on enqueueing into a full queue)
    pub write_timeout_ms: u64,
    /// Capacity of each connection's outbound queue
    pub outbound_buffer: usize,
    /// Ping cadence; 0 disables pings
    pub ping_interval_secs: u64,
    /// Send `error` frames back for dropped inbound frames
    pub error_acks: bool,
    /// `EnvFilter` directive used when `RUST_LOG` is not set
    pub log_filter: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            database_url: "sqlite://socialnet.db".to_string(),
            session_ttl_secs: 24 * 60 * 60,
            write_timeout_ms: 10_000,
            outbound_buffer: 64,
            ping_interval_secs: 30,
            error_acks: false,
            log_filter: "socialnet=info,tower_http=info".to_string(),
        }
    }
}

impl ServerConfig {
    /// Create a new ServerConfigBuilder seeded with defaults
    pub fn builder() -> ServerConfigBuilder {
        ServerConfigBuilder::default()
    }

    /// Load from defaults, the optional TOML file and the process environment
    ///
    /// # Returns
    /// * `Ok(ServerConfig)` - validated configuration
    /// * `Err(ConfigError)` - unreadable file, unparsable value or failed validation
    pub fn load() -> Result<Self, ConfigError> {
        let mut builder = Self::builder();
        if let Ok(path) = std::env::var(CONFIG_FILE_ENV) {
            builder = builder.file(Path::new(&path))?;
        }
        builder.env(|key| std::env::var(key).ok())?.build()
    }

    /// `host:port` string for binding the listener
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session_ttl_secs)
    }

    pub fn write_timeout(&self) -> Duration {
        Duration::from_millis(self.write_timeout_ms)
    }

    /// `None` when pings are disabled
    pub fn ping_interval(&self) -> Option<Duration> {
        (self.ping_interval_secs > 0).then(|| Duration::from_secs(self.ping_interval_secs))
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.database_url.trim().is_empty() {
            return Err(ConfigError::MissingValue("database_url"));
        }
        if self.port == 0 {
            return Err(ConfigError::Invalid("port must be non-zero".to_string()));
        }
        if self.write_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "write_timeout_ms must be non-zero".to_string(),
            ));
        }
        if self.outbound_buffer == 0 {
            return Err(ConfigError::Invalid(
                "outbound_buffer must be non-zero".to_string(),
            ));
        }
        if self.session_ttl_secs == 0 {
            return Err(ConfigError::Invalid(
                "session_ttl_secs must be non-zero".to_string(),
            ));
        }
        if self.session_ttl_secs > MAX_SESSION_TTL_SECS {
            return Err(ConfigError::Invalid(format!(
                "session_ttl_secs must be at most {}",
                MAX_SESSION_TTL_SECS
            )));
        }
        Ok(())
    }
}

/// Keys accepted in the TOML file
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileConfig {
    host: Option<String>,
    port: Option<u16>,
    database_url: Option<String>,
    session_ttl_secs: Option<u64>,
    write_timeout_ms: Option<u64>,
    outbound_buffer: Option<usize>,
    ping_interval_secs: Option<u64>,
    error_acks: Option<bool>,
    log_filter: Option<String>,
}

/// Builder for ServerConfig
#[derive(Debug, Default)]
pub struct ServerConfigBuilder {
    config: ServerConfig,
}

impl ServerConfigBuilder {
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.config.host = host.into();
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    pub fn database_url(mut self, url: impl Into<String>) -> Self {
        self.config.database_url = url.into();
        self
    }

    pub fn session_ttl_secs(mut self, secs: u64) -> Self {
        self.config.session_ttl_secs = secs;
        self
    }

    pub fn write_timeout_ms(mut self, millis: u64) -> Self {
        self.config.write_timeout_ms = millis;
        self
    }

    pub fn outbound_buffer(mut self, capacity: usize) -> Self {
        self.config.outbound_buffer = capacity;
        self
    }

    pub fn ping_interval_secs(mut self, secs: u64) -> Self {
        self.config.ping_interval_secs = secs;
        self
    }

    pub fn error_acks(mut self, enabled: bool) -> Self {
        self.config.error_acks = enabled;
        self
    }

    pub fn log_filter(mut self, filter: impl Into<String>) -> Self {
        self.config.log_filter = filter.into();
        self
    }

    /// Overlay values from a TOML file
    pub fn file(self, path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        self.toml(&contents)
    }

    /// Overlay values from TOML text
    pub fn toml(mut self, contents: &str) -> Result<Self, ConfigError> {
        let file: FileConfig = toml::from_str(contents)?;
        let config = &mut self.config;
        if let Some(host) = file.host {
            config.host = host;
        }
        if let Some(port) = file.port {
            config.port = port;
        }
        if let Some(url) = file.database_url {
            config.database_url = url;
        }
        if let Some(secs) = file.session_ttl_secs {
            config.session_ttl_secs = secs;
        }
        if let Some(millis) = file.write_timeout_ms {
            config.write_timeout_ms = millis;
        }
        if let Some(capacity) = file.outbound_buffer {
            config.outbound_buffer = capacity;
        }
        if let Some(secs) = file.ping_interval_secs {
            config.ping_interval_secs = secs;
        }
        if let Some(enabled) = file.error_acks {
            config.error_acks = enabled;
        }
        if let Some(filter) = file.log_filter {
            config.log_filter = filter;
        }
        Ok(self)
    }

    /// Overlay values from environment variables
    ///
    /// # Arguments
    /// * `lookup` - returns the value of a variable, `std::env::var(key).ok()` in production
    pub fn env<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let config = &mut self.config;
        if let Some(url) = lookup("DATABASE_URL") {
            config.database_url = url;
        }
        if let Some(host) = lookup("SERVER_HOST") {
            config.host = host;
        }
        if let Some(port) = parse_var(&lookup, "SERVER_PORT")? {
            config.port = port;
        }
        if let Some(secs) = parse_var(&lookup, "SOCIALNET_SESSION_TTL_SECS")? {
            config.session_ttl_secs = secs;
        }
        if let Some(millis) = parse_var(&lookup, "SOCIALNET_WRITE_TIMEOUT_MS")? {
            config.write_timeout_ms = millis;
        }
        if let Some(capacity) = parse_var(&lookup, "SOCIALNET_OUTBOUND_BUFFER")? {
            config.outbound_buffer = capacity;
        }
        if let Some(secs) = parse_var(&lookup, "SOCIALNET_PING_INTERVAL_SECS")? {
            config.ping_interval_secs = secs;
        }
        if let Some(enabled) = parse_var(&lookup, "SOCIALNET_ERROR_ACKS")? {
            config.error_acks = enabled;
        }
        if let Some(filter) = lookup("SOCIALNET_LOG_FILTER") {
            config.log_filter = filter;
        }
        Ok(self)
    }

    /// Build and validate the configuration
    pub fn build(self) -> Result<ServerConfig, ConfigError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

fn parse_var<T, F>(lookup: &F, key: &'static str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue { key, value: raw }),
    }
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value:?}")]
    InvalidValue { key: &'static str, value: String },
    #[error("missing value: {0}")]
    MissingValue(&'static str),
    #[error("invalid configuration: {0}")]
    Invalid(String),
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}
