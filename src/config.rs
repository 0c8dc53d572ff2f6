use std::path::PathBuf;
use std::time::Duration;

use tracing::debug;

use crate::error::{Result, VordrError};

/// Process-wide validator configuration, set once at init.
#[derive(Debug, Clone)]
pub struct ValidatorConfig {
    /// Path to a zone-file-style stream of DS/DNSKEY trust anchors
    pub trust_anchor_file: Option<PathBuf>,

    /// Upper bound on how long validated key entries may be cached
    pub key_cache_max_ttl: Duration,

    /// Optional cap on the number of cached key entries
    pub key_cache_max_entries: Option<usize>,

    /// TTL for Bad key entries, throttling re-validation of broken zones
    pub bad_key_ttl: Duration,

    /// Timeout applied to each upstream subquery
    pub query_timeout: Duration,

    /// NSEC3 iteration caps as (key bits, max iterations)
    pub nsec3_iteration_limits: Vec<(usize, u16)>,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        ValidatorConfig {
            trust_anchor_file: None,
            key_cache_max_ttl: Duration::from_secs(86400),
            key_cache_max_entries: None,
            bad_key_ttl: Duration::from_secs(crate::dnssec::constants::DEFAULT_BAD_KEY_TTL_SECS),
            query_timeout: Duration::from_secs(5),
            nsec3_iteration_limits: vec![(1024, 150), (2048, 500), (4096, 2500)],
        }
    }
}

impl ValidatorConfig {
    /// Build a config from `VORDR_*` environment variables, falling back
    /// to defaults for anything unset.
    pub fn from_env() -> Result<Self> {
        let mut config = ValidatorConfig::default();

        if let Ok(path) = std::env::var("VORDR_TRUST_ANCHOR_FILE") {
            config.trust_anchor_file = Some(PathBuf::from(path));
        }
        if let Some(secs) = parse_env_u64("VORDR_KEYCACHE_MAX_TTL")? {
            config.key_cache_max_ttl = Duration::from_secs(secs);
        }
        if let Some(entries) = parse_env_u64("VORDR_KEYCACHE_MAX_ENTRIES")? {
            config.key_cache_max_entries = Some(entries as usize);
        }
        if let Some(secs) = parse_env_u64("VORDR_BAD_KEY_TTL")? {
            config.bad_key_ttl = Duration::from_secs(secs);
        }
        if let Some(secs) = parse_env_u64("VORDR_QUERY_TIMEOUT")? {
            config.query_timeout = Duration::from_secs(secs);
        }
        if let Ok(spec) = std::env::var("VORDR_NSEC3_ITERATIONS") {
            config.nsec3_iteration_limits = parse_iteration_limits(&spec)?;
        }

        debug!(?config, "validator configuration loaded");
        Ok(config)
    }
}

fn parse_env_u64(key: &'static str) -> Result<Option<u64>> {
    match std::env::var(key) {
        Ok(value) => value
            .parse::<u64>()
            .map(Some)
            .map_err(|_| VordrError::InvalidConfig(key, value)),
        Err(_) => Ok(None),
    }
}

/// Parse "1024=150,2048=500,4096=2500" into the policy table.
fn parse_iteration_limits(spec: &str) -> Result<Vec<(usize, u16)>> {
    let mut limits = Vec::new();
    for part in spec.split(',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        let Some((bits, cap)) = part.split_once('=') else {
            return Err(VordrError::InvalidConfig("VORDR_NSEC3_ITERATIONS", spec.to_string()));
        };
        let bits = bits
            .trim()
            .parse::<usize>()
            .map_err(|_| VordrError::InvalidConfig("VORDR_NSEC3_ITERATIONS", spec.to_string()))?;
        let cap = cap
            .trim()
            .parse::<u16>()
            .map_err(|_| VordrError::InvalidConfig("VORDR_NSEC3_ITERATIONS", spec.to_string()))?;
        limits.push((bits, cap));
    }
    if limits.is_empty() {
        return Err(VordrError::InvalidConfig("VORDR_NSEC3_ITERATIONS", spec.to_string()));
    }
    limits.sort_unstable_by_key(|(bits, _)| *bits);
    Ok(limits)
}
