use crate::core::{InvError, Result};
use std::time::Duration;

pub const DEFAULT_LEASE_TTL: Duration = Duration::from_secs(60);
pub const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);
pub const DEFAULT_REGEX_CACHE_CAPACITY: usize = 256;

/// Lock service and client tuning
#[derive(Debug, Clone)]
pub struct LockConfig {
    /// How long a grant or renewal keeps a lease active
    pub lease_ttl: Duration,

    /// Cadence of heartbeat renewals for an open edit session
    pub heartbeat_interval: Duration,

    /// Compiled validation patterns kept by the reconciliation validator
    pub regex_cache_capacity: usize,
}

impl LockConfig {
    pub fn new() -> Self {
        Self {
            lease_ttl: DEFAULT_LEASE_TTL,
            heartbeat_interval: DEFAULT_HEARTBEAT_INTERVAL,
            regex_cache_capacity: DEFAULT_REGEX_CACHE_CAPACITY,
        }
    }

    /// Set lease TTL
    pub fn lease_ttl(mut self, ttl: Duration) -> Self {
        self.lease_ttl = ttl;
        self
    }

    /// Set heartbeat interval
    pub fn heartbeat_interval(mut self, interval: Duration) -> Self {
        self.heartbeat_interval = interval;
        self
    }

    /// Set regex cache capacity
    pub fn regex_cache_capacity(mut self, capacity: usize) -> Self {
        self.regex_cache_capacity = capacity;
        self
    }

    /// Read overrides from `INVSYNC_LEASE_TTL_SECS`, `INVSYNC_HEARTBEAT_SECS`
    /// and `INVSYNC_REGEX_CACHE`, falling back to defaults.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::new();
        if let Some(secs) = env_u64("INVSYNC_LEASE_TTL_SECS")? {
            config.lease_ttl = Duration::from_secs(secs);
        }
        if let Some(secs) = env_u64("INVSYNC_HEARTBEAT_SECS")? {
            config.heartbeat_interval = Duration::from_secs(secs);
        }
        if let Some(capacity) = env_u64("INVSYNC_REGEX_CACHE")? {
            config.regex_cache_capacity = capacity as usize;
        }
        config.validate()?;
        Ok(config)
    }

    /// Lease TTL as a chrono duration, for expiry arithmetic.
    pub fn lease_ttl_chrono(&self) -> chrono::Duration {
        chrono::Duration::from_std(self.lease_ttl).unwrap_or(chrono::Duration::seconds(60))
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.lease_ttl.is_zero() {
            return Err(InvError::Config("lease_ttl must be > 0".to_string()));
        }

        if self.heartbeat_interval.is_zero() {
            return Err(InvError::Config("heartbeat_interval must be > 0".to_string()));
        }

        if self.heartbeat_interval >= self.lease_ttl {
            return Err(InvError::Config(
                "heartbeat_interval must be shorter than lease_ttl".to_string(),
            ));
        }

        if self.regex_cache_capacity == 0 {
            return Err(InvError::Config("regex_cache_capacity must be > 0".to_string()));
        }

        Ok(())
    }
}

impl Default for LockConfig {
    fn default() -> Self {
        Self::new()
    }
}

fn env_u64(key: &str) -> Result<Option<u64>> {
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<u64>()
            .map(Some)
            .map_err(|_| InvError::Config(format!("{} must be a non-negative integer", key))),
        Err(_) => Ok(None),
    }
}
