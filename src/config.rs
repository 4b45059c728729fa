//! Configuration Module
//!
//! Cache construction options, loadable from environment variables or JSON.

use std::env;
use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;

use crate::error::{CacheError, Result};

/// Environment variable for [`CacheConfig::max`]
pub const ENV_MAX: &str = "LRU_MAX";
/// Environment variable for [`CacheConfig::ttl_ms`]
pub const ENV_TTL_MS: &str = "LRU_TTL_MS";
/// Environment variable for [`CacheConfig::allow_stale`]
pub const ENV_ALLOW_STALE: &str = "LRU_ALLOW_STALE";
/// Environment variable for [`CacheConfig::update_age_on_get`]
pub const ENV_UPDATE_AGE_ON_GET: &str = "LRU_UPDATE_AGE_ON_GET";

/// Cache construction options.
///
/// The default is an unbounded cache without expiration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CacheConfig {
    /// Maximum number of resident entries, 0 = unbounded
    pub max: usize,
    /// Time-to-live in milliseconds, 0 = entries never expire by time
    pub ttl_ms: u64,
    /// Serve a stale entry once before evicting it
    pub allow_stale: bool,
    /// Reads refresh recency and the TTL baseline
    pub update_age_on_get: bool,
}

impl CacheConfig {
    /// Loads options from environment variables.
    ///
    /// # Environment Variables
    /// - `LRU_MAX` - Maximum entries (default: 0, unbounded)
    /// - `LRU_TTL_MS` - TTL in milliseconds (default: 0, no expiry)
    /// - `LRU_ALLOW_STALE` - `true`/`false` (default: false)
    /// - `LRU_UPDATE_AGE_ON_GET` - `true`/`false` (default: false)
    ///
    /// Unset variables keep their defaults. Malformed values, negative numbers
    /// included, are rejected rather than replaced by a default.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| {
            env::var_os(name).map(|raw| raw.to_string_lossy().into_owned())
        })
    }

    /// Same as [`from_env`](Self::from_env) but reads through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Ok(Self {
            max: parse_var(&lookup, ENV_MAX)?.unwrap_or(defaults.max),
            ttl_ms: parse_var(&lookup, ENV_TTL_MS)?.unwrap_or(defaults.ttl_ms),
            allow_stale: parse_var(&lookup, ENV_ALLOW_STALE)?.unwrap_or(defaults.allow_stale),
            update_age_on_get: parse_var(&lookup, ENV_UPDATE_AGE_ON_GET)?
                .unwrap_or(defaults.update_age_on_get),
        })
    }

    /// Parses options from a JSON object. Missing fields keep their defaults;
    /// unknown fields and out-of-range values are rejected.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| CacheError::Config(e.to_string()))
    }

    /// TTL as a duration, `None` when disabled.
    pub fn ttl(&self) -> Option<Duration> {
        (self.ttl_ms > 0).then(|| Duration::from_millis(self.ttl_ms))
    }

    /// True when nothing bounds memory growth.
    pub fn is_unbounded(&self) -> bool {
        self.max == 0 && self.ttl_ms == 0
    }
}

fn parse_var<T, F>(lookup: &F, name: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(name) {
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| CacheError::Config(format!("{name}={raw:?}: {e}"))),
        None => Ok(None),
    }
}
