//! Configuration management for the gpscot relay.
//!
//! This module provides the configuration surface read once at startup:
//! - Loading from YAML files
//! - Environment variable overrides (`GPSCOT__SECTION__KEY`)
//! - Validation of all settings
//!
//! Every field has a default, so an empty file is a complete configuration
//! that sends UDP to localhost from `/dev/ttyUSB0`.

use crate::error::{ConfigError, Result, TransportError};
use crate::types::{Identity, Protocol};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::Level;

/// Main application configuration.
///
/// # Examples
///
/// ```no_run
/// use gpscot_core::config::AppConfig;
///
/// // Load from file
/// let config = AppConfig::from_file("gpscot.yaml").unwrap();
///
/// // Validate before use
/// config.validate().unwrap();
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// TAK server destination and protocol selector
    #[serde(default)]
    pub destination: DestinationConfig,

    /// Serial device holding the GPS receiver
    #[serde(default)]
    pub serial: SerialConfig,

    /// Identity carried by every event
    #[serde(default)]
    pub identity: IdentityConfig,

    /// TLS material and verification flags
    #[serde(default)]
    pub tls: TlsSettings,

    /// Cadence and timeouts
    #[serde(default)]
    pub timing: TimingConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Process output
    #[serde(default)]
    pub output: OutputConfig,

    /// Run bounds
    #[serde(default)]
    pub relay: RelayConfig,
}

impl AppConfig {
    /// Creates a new default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::file_not_found(path.display().to_string()).into());
        }

        let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::LoadFailed {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;

        Self::from_yaml(&contents)
    }

    /// Loads configuration from a YAML string.
    ///
    /// An empty document yields the default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the YAML cannot be parsed.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }

        serde_yaml::from_str(yaml).map_err(|e| {
            ConfigError::InvalidFormat {
                reason: e.to_string(),
            }
            .into()
        })
    }

    /// Loads configuration using the `config` crate, layering environment
    /// variable overrides on top of an optional file.
    ///
    /// `GPSCOT__DESTINATION__HOST=10.0.0.5` overrides `destination.host`.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded or merged.
    pub fn from_config_builder(path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            if !path.exists() {
                return Err(ConfigError::file_not_found(path.display().to_string()).into());
            }
            builder = builder.add_source(config::File::from(path).required(true));
        }

        let origin = path
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "environment".to_string());

        let config = builder
            // Override with environment variables (GPSCOT__*)
            .add_source(
                config::Environment::with_prefix("GPSCOT")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| ConfigError::LoadFailed {
                path: origin,
                reason: e.to_string(),
            })?;

        config.try_deserialize().map_err(|e| {
            ConfigError::InvalidFormat {
                reason: e.to_string(),
            }
            .into()
        })
    }

    /// Serializes the effective configuration back to YAML.
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).map_err(|e| {
            ConfigError::InvalidFormat {
                reason: e.to_string(),
            }
            .into()
        })
    }

    /// Validates the configuration.
    ///
    /// Checks for:
    /// - A non-empty destination host and non-zero port
    /// - A usable baud rate and read timeout
    /// - A non-empty callsign
    /// - Non-zero cadence and timeouts
    /// - TLS client material given as a pair, and present on disk when TLS is selected
    ///
    /// An unrecognized protocol selector is not a validation failure: the
    /// relay reports it on every cycle instead.
    ///
    /// # Errors
    ///
    /// Returns an error if validation fails.
    pub fn validate(&self) -> Result<()> {
        self.destination.validate()?;
        self.serial.validate()?;
        self.identity.validate()?;
        self.timing.validate()?;
        self.tls.validate()?;
        self.logging.parse_level()?;

        if matches!(self.protocol(), Ok(Protocol::Tls { .. })) {
            self.tls.validate_files()?;
        }

        Ok(())
    }

    /// Parses the protocol selector.
    pub fn protocol(&self) -> std::result::Result<Protocol, TransportError> {
        Protocol::parse(&self.destination.protocol, self.destination.tls_persistent)
    }

    /// Builds the run-scoped identity, generating a uid unless one is configured.
    pub fn identity(&self) -> Identity {
        match self.identity.uid.as_deref().map(str::trim) {
            Some(uid) if !uid.is_empty() => Identity::new(uid, self.identity.callsign.clone()),
            _ => Identity::generate(self.identity.callsign.clone()),
        }
    }
}

/// Where events are sent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DestinationConfig {
    /// TAK server host name or IP address
    #[serde(default = "default_host")]
    pub host: String,

    /// TAK server port (8087 UDP, 8088 TCP, 8089 TLS by convention)
    #[serde(default = "default_port")]
    pub port: u16,

    /// Protocol selector: "UDP", "TCP" or "TLS", any case
    #[serde(default = "default_protocol")]
    pub protocol: String,

    /// Hold one TLS session for the whole run
    #[serde(default = "default_true")]
    pub tls_persistent: bool,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8087
}

fn default_protocol() -> String {
    "UDP".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for DestinationConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            protocol: default_protocol(),
            tls_persistent: true,
        }
    }
}

impl DestinationConfig {
    /// Validates the destination.
    pub fn validate(&self) -> Result<()> {
        if self.host.trim().is_empty() {
            return Err(ConfigError::invalid_value("destination.host", "Host cannot be empty").into());
        }

        if self.port == 0 {
            return Err(ConfigError::invalid_value("destination.port", "Port cannot be 0").into());
        }

        Ok(())
    }

    /// Returns the destination as `host:port`.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Serial device settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SerialConfig {
    /// Device path
    #[serde(default = "default_device")]
    pub device: String,

    /// Baud rate
    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,

    /// Per-read timeout in milliseconds
    #[serde(default = "default_read_timeout_ms")]
    pub read_timeout_ms: u64,
}

fn default_device() -> String {
    "/dev/ttyUSB0".to_string()
}

fn default_baud_rate() -> u32 {
    4800
}

fn default_read_timeout_ms() -> u64 {
    1000
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            device: default_device(),
            baud_rate: default_baud_rate(),
            read_timeout_ms: default_read_timeout_ms(),
        }
    }
}

impl SerialConfig {
    /// Validates the serial settings.
    pub fn validate(&self) -> Result<()> {
        if self.device.trim().is_empty() {
            return Err(ConfigError::invalid_value("serial.device", "Device path cannot be empty").into());
        }

        if self.baud_rate == 0 {
            return Err(ConfigError::invalid_value("serial.baud_rate", "Baud rate cannot be 0").into());
        }

        if self.read_timeout_ms == 0 {
            return Err(ConfigError::invalid_value(
                "serial.read_timeout_ms",
                "Read timeout cannot be 0",
            )
            .into());
        }

        Ok(())
    }

    /// Returns the per-read timeout as a Duration.
    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }
}

/// Identity settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityConfig {
    /// Display callsign
    #[serde(default = "default_callsign")]
    pub callsign: String,

    /// Fixed uid; a random UUID v4 is generated per run when absent
    #[serde(default)]
    pub uid: Option<String>,
}

fn default_callsign() -> String {
    "GPS Receiver".to_string()
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            callsign: default_callsign(),
            uid: None,
        }
    }
}

impl IdentityConfig {
    /// Validates the identity settings.
    pub fn validate(&self) -> Result<()> {
        if self.callsign.trim().is_empty() {
            return Err(ConfigError::invalid_value("identity.callsign", "Callsign cannot be empty").into());
        }
        Ok(())
    }
}

/// TLS material and verification flags.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TlsSettings {
    /// PEM client certificate for mutual TLS
    #[serde(default)]
    pub client_cert: Option<PathBuf>,

    /// PEM private key matching `client_cert`
    #[serde(default)]
    pub client_key: Option<PathBuf>,

    /// PEM CA bundle; the bundled webpki roots are used when absent
    #[serde(default)]
    pub ca_cert: Option<PathBuf>,

    /// Verify the server certificate chain
    #[serde(default = "default_true")]
    pub verify_server_cert: bool,

    /// Skip the hostname/SAN check (chain is still verified)
    #[serde(default)]
    pub skip_hostname_verify: bool,
}

impl Default for TlsSettings {
    fn default() -> Self {
        Self {
            client_cert: None,
            client_key: None,
            ca_cert: None,
            verify_server_cert: true,
            skip_hostname_verify: false,
        }
    }
}

impl TlsSettings {
    /// Validates that client cert and key are both present or both absent.
    pub fn validate(&self) -> Result<()> {
        match (&self.client_cert, &self.client_key) {
            (Some(_), None) | (None, Some(_)) => Err(ConfigError::invalid_value(
                "tls",
                "Client cert and key must both be specified or both omitted",
            )
            .into()),
            _ => Ok(()),
        }
    }

    /// Validates that every configured file exists.
    pub fn validate_files(&self) -> Result<()> {
        let files = [
            ("tls.client_cert", &self.client_cert),
            ("tls.client_key", &self.client_key),
            ("tls.ca_cert", &self.ca_cert),
        ];

        for (field, path) in files {
            if let Some(path) = path {
                if !path.exists() {
                    return Err(ConfigError::invalid_value(
                        field,
                        format!("File not found: {}", path.display()),
                    )
                    .into());
                }
            }
        }

        Ok(())
    }
}

/// Cadence and timeouts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimingConfig {
    /// Delay between cycle completions in seconds
    #[serde(default = "default_cycle_interval")]
    pub cycle_interval_secs: u64,

    /// Event validity window in seconds
    #[serde(default = "default_stale_after")]
    pub stale_after_secs: u64,

    /// TCP connect and TLS handshake timeout in seconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// Network write timeout in seconds
    #[serde(default = "default_write_timeout")]
    pub write_timeout_secs: u64,
}

fn default_cycle_interval() -> u64 {
    20
}

fn default_stale_after() -> u64 {
    120
}

fn default_connect_timeout() -> u64 {
    5
}

fn default_write_timeout() -> u64 {
    5
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            cycle_interval_secs: default_cycle_interval(),
            stale_after_secs: default_stale_after(),
            connect_timeout_secs: default_connect_timeout(),
            write_timeout_secs: default_write_timeout(),
        }
    }
}

impl TimingConfig {
    /// Validates that no timing value is zero.
    pub fn validate(&self) -> Result<()> {
        let values = [
            ("timing.cycle_interval_secs", self.cycle_interval_secs),
            ("timing.stale_after_secs", self.stale_after_secs),
            ("timing.connect_timeout_secs", self.connect_timeout_secs),
            ("timing.write_timeout_secs", self.write_timeout_secs),
        ];

        for (field, value) in values {
            if value == 0 {
                return Err(ConfigError::invalid_value(field, "Value must be greater than 0").into());
            }
        }

        Ok(())
    }

    pub fn cycle_interval(&self) -> Duration {
        Duration::from_secs(self.cycle_interval_secs)
    }

    pub fn stale_after(&self) -> Duration {
        Duration::from_secs(self.stale_after_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn write_timeout(&self) -> Duration {
        Duration::from_secs(self.write_timeout_secs)
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: "text" or "json"
    #[serde(default)]
    pub format: LogFormat,

    /// Log file path; logs go to stderr when absent
    #[serde(default = "default_log_file")]
    pub file: Option<PathBuf>,

    /// Rotate the log file once it reaches this size
    #[serde(default = "default_max_bytes")]
    pub max_bytes: u64,

    /// Number of rotated files kept next to the active one
    #[serde(default = "default_backups")]
    pub backups: usize,
}

fn default_log_level() -> String {
    "error".to_string()
}

fn default_log_file() -> Option<PathBuf> {
    Some(PathBuf::from("/tmp/gps_logs/usb_gps.log"))
}

fn default_max_bytes() -> u64 {
    1024 * 1024 // 1MB
}

fn default_backups() -> usize {
    5
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::Text,
            file: default_log_file(),
            max_bytes: default_max_bytes(),
            backups: default_backups(),
        }
    }
}

impl LoggingConfig {
    /// Parses the log level string to a tracing Level.
    pub fn parse_level(&self) -> Result<Level> {
        self.level.parse().map_err(|_| {
            ConfigError::InvalidValue {
                field: "logging.level".to_string(),
                reason: format!("Invalid log level: {}", self.level),
            }
            .into()
        })
    }
}

/// Log format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable text format
    #[default]
    Text,
    /// JSON format for structured logging
    Json,
}

/// Process output settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Print every encoded event to stdout
    #[serde(default = "default_true")]
    pub echo_events: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self { echo_events: true }
    }
}

/// Run bounds.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RelayConfig {
    /// Stop after this many cycles; runs until interrupted when absent
    #[serde(default)]
    pub max_cycles: Option<u64>,
}
