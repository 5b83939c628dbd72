//! Node configuration
//!
//! Defaults, then an optional JSON file named by `DP_CONFIG`, then individual
//! `DP_*` environment overrides:
//!
//! | Variable | Field |
//! |----------|-------|
//! | `DP_DELEGATES` | `schedule.total_delegates` |
//! | `DP_BLOCK_INTERVAL` | `schedule.block_interval_secs` |
//! | `DP_CONFIRM_THRESHOLD` | `fork_pool.confirm.threshold` |
//! | `DP_MINING` | `node.mining_enabled` |
//! | `DP_SOLO` | `production.mining.allow_solo` |
//! | `DP_FORCE` | `production.mining.force` |
//! | `DP_TARGET_HEIGHT` | `production.mining.target_height` |
//! | `DP_LOCAL_DELEGATES` | `node.local_delegates` (comma separated) |
//! | `DP_GENESIS_TIME` | `node.genesis_time` |
//!
//! Malformed override values are logged and ignored.

use crate::error::{Result, RuntimeError};
use dp_01_delegate_schedule::ScheduleConfig;
use dp_02_block_verification::VerifierConfig;
use dp_03_fork_pool::ForkPoolConfig;
use dp_04_block_production::BlockProductionConfig;
use serde::Deserialize;
use std::str::FromStr;
use tracing::{info, warn};

/// Starting balance of every devnet delegate account.
pub const DEFAULT_STARTING_BALANCE: u64 = 1_000_000_000;

/// Full node configuration
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    pub schedule: ScheduleConfig,
    pub verifier: VerifierConfig,
    pub fork_pool: ForkPoolConfig,
    pub production: BlockProductionConfig,
    pub node: RuntimeConfig,
}

/// Parameters of the runtime itself
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    pub mining_enabled: bool,

    /// How often the finality driver runs
    pub finality_interval_ms: u64,

    /// Delegate indexes whose keys this node holds; `None` holds them all
    pub local_delegates: Option<Vec<usize>>,

    /// Peer count reported to the mining gate
    pub static_peers: usize,

    /// Genesis timestamp; `None` uses the current time
    pub genesis_time: Option<u64>,

    pub starting_balance: u64,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            mining_enabled: true,
            finality_interval_ms: 1_000,
            local_delegates: None,
            static_peers: 0,
            genesis_time: None,
            starting_balance: DEFAULT_STARTING_BALANCE,
        }
    }
}

impl NodeConfig {
    /// Indexes of the delegates whose keys this node holds.
    pub fn local_delegate_indexes(&self) -> Vec<usize> {
        match &self.node.local_delegates {
            Some(indexes) => indexes.clone(),
            None => (0..self.schedule.total_delegates).collect(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        let total = self.schedule.total_delegates;
        if let Some(bad) = self
            .local_delegate_indexes()
            .into_iter()
            .find(|i| *i >= total)
        {
            return Err(RuntimeError::InvalidConfig(format!(
                "local delegate {} outside the {} delegate set",
                bad, total
            )));
        }
        if self.fork_pool.confirm.threshold == 0 {
            return Err(RuntimeError::InvalidConfig(
                "confirm threshold must be positive".into(),
            ));
        }
        if self.node.finality_interval_ms == 0 {
            return Err(RuntimeError::InvalidConfig(
                "finality interval must be positive".into(),
            ));
        }
        self.production.validate()?;
        Ok(())
    }
}

/// Loads the configuration from the process environment.
pub fn load_config() -> Result<NodeConfig> {
    load_from(|key| std::env::var(key).ok())
}

/// Loads the configuration through `lookup` in place of the environment.
pub fn load_from(lookup: impl Fn(&str) -> Option<String>) -> Result<NodeConfig> {
    let mut config = match lookup("DP_CONFIG") {
        Some(path) => {
            let raw = std::fs::read_to_string(&path).map_err(|source| RuntimeError::ConfigRead {
                path: path.clone(),
                source,
            })?;
            let file_config: NodeConfig =
                serde_json::from_str(&raw).map_err(|source| RuntimeError::ConfigParse {
                    path: path.clone(),
                    source,
                })?;
            info!("Loaded configuration from {}", path);
            file_config
        }
        None => NodeConfig::default(),
    };

    if let Some(n) = parsed(&lookup, "DP_DELEGATES") {
        config.schedule.total_delegates = n;
    }
    if let Some(secs) = parsed(&lookup, "DP_BLOCK_INTERVAL") {
        config.schedule.block_interval_secs = secs;
    }
    if let Some(k) = parsed(&lookup, "DP_CONFIRM_THRESHOLD") {
        config.fork_pool.confirm.threshold = k;
    }
    if let Some(on) = flag(&lookup, "DP_MINING") {
        config.node.mining_enabled = on;
    }
    if let Some(on) = flag(&lookup, "DP_SOLO") {
        config.production.mining.allow_solo = on;
    }
    if let Some(on) = flag(&lookup, "DP_FORCE") {
        config.production.mining.force = on;
    }
    if let Some(height) = parsed(&lookup, "DP_TARGET_HEIGHT") {
        config.production.mining.target_height = Some(height);
    }
    if let Some(ts) = parsed(&lookup, "DP_GENESIS_TIME") {
        config.node.genesis_time = Some(ts);
    }
    if let Some(raw) = lookup("DP_LOCAL_DELEGATES") {
        let indexes: std::result::Result<Vec<usize>, _> = raw
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(usize::from_str)
            .collect();
        match indexes {
            Ok(indexes) => config.node.local_delegates = Some(indexes),
            Err(e) => warn!("Ignoring DP_LOCAL_DELEGATES={:?}: {}", raw, e),
        }
    }

    Ok(config)
}

fn parsed<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(e) => {
            warn!("Ignoring {}={:?}: {}", key, raw, e);
            None
        }
    }
}

fn flag(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<bool> {
    let raw = lookup(key)?;
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => {
            warn!("Ignoring {}={:?}: expected a boolean", key, raw);
            None
        }
    }
}
