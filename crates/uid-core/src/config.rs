//! Configuration types for the User-ID sync system
//!
//! This module defines all configuration structures used throughout the crate.

use serde::{Deserialize, Serialize};

/// Relation monitor configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Lifetime (in minutes) given to relations recorded without a TTL
    ///
    /// The device keeps such relations until explicitly removed; the monitor
    /// approximates that with a long fixed lifetime.
    ///
    /// Default: 43200 minutes (720 hours)
    #[serde(default = "default_max_lifetime_minutes")]
    pub max_lifetime_minutes: u64,

    /// Expected working-set size of each relation store
    ///
    /// Only used to pre-size internal storage.
    ///
    /// Default: 100 relations
    #[serde(default = "default_capacity_hint")]
    pub capacity_hint: usize,
}

impl MonitorConfig {
    /// Create a new configuration with defaults
    pub fn new() -> Self {
        Self {
            max_lifetime_minutes: default_max_lifetime_minutes(),
            capacity_hint: default_capacity_hint(),
        }
    }

    /// Set the lifetime used when no TTL is given
    pub fn with_max_lifetime_minutes(mut self, minutes: u64) -> Self {
        self.max_lifetime_minutes = minutes;
        self
    }

    /// Set the per-store capacity hint
    pub fn with_capacity_hint(mut self, capacity_hint: usize) -> Self {
        self.capacity_hint = capacity_hint;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.max_lifetime_minutes == 0 {
            return Err(crate::Error::config("Monitor max lifetime must be > 0"));
        }
        // chrono::Duration::minutes panics beyond i64::MAX milliseconds
        if self.max_lifetime_minutes > i64::MAX as u64 / 60_000 {
            return Err(crate::Error::config("Monitor max lifetime is out of range"));
        }
        Ok(())
    }

    /// Lifetime applied to relations without a TTL
    pub fn max_lifetime(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.max_lifetime_minutes as i64)
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self::new()
    }
}

fn default_max_lifetime_minutes() -> u64 {
    720 * 60
}

fn default_capacity_hint() -> usize {
    100
}

/// Target device configuration
///
/// # Security
///
/// The Debug implementation intentionally does NOT expose the API key.
#[derive(Clone, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// Device host, optionally with port (e.g. "10.1.1.1:443")
    pub host: String,

    /// XML API key
    /// ⚠️ NEVER log this value
    pub api_key: String,

    /// HTTP request timeout (in seconds)
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Accept self-signed device certificates
    #[serde(default)]
    pub accept_invalid_certs: bool,

    /// Dry-run mode: encode and log the message but do not send it
    #[serde(default)]
    pub dry_run: bool,
}

impl DeviceConfig {
    /// Create a new device configuration
    pub fn new(host: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            api_key: api_key.into(),
            timeout_secs: default_timeout_secs(),
            accept_invalid_certs: false,
            dry_run: false,
        }
    }

    /// Set the request timeout
    pub fn with_timeout_secs(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    /// Accept or reject self-signed certificates
    pub fn with_accept_invalid_certs(mut self, accept: bool) -> Self {
        self.accept_invalid_certs = accept;
        self
    }

    /// Enable or disable dry-run mode
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// XML API endpoint of the device
    pub fn endpoint(&self) -> String {
        format!("https://{}/api/", self.host)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.host.is_empty() {
            return Err(crate::Error::config("Device host cannot be empty"));
        }
        if self.host.contains("://") || self.host.contains('/') {
            return Err(crate::Error::config(
                "Device host must be a bare host[:port], without scheme or path",
            ));
        }
        if self.api_key.is_empty() {
            return Err(crate::Error::config("Device API key cannot be empty"));
        }
        if self.timeout_secs == 0 {
            return Err(crate::Error::config("Device timeout must be > 0"));
        }
        Ok(())
    }
}

// Custom Debug implementation that hides the API key
impl std::fmt::Debug for DeviceConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceConfig")
            .field("host", &self.host)
            .field("api_key", &"<REDACTED>")
            .field("timeout_secs", &self.timeout_secs)
            .field("accept_invalid_certs", &self.accept_invalid_certs)
            .field("dry_run", &self.dry_run)
            .finish()
    }
}

fn default_timeout_secs() -> u64 {
    30
}
