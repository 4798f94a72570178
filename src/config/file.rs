//! JSON configuration for the feeder chain.
//!
//! Every field is optional: whatever a file leaves out keeps the value the
//! chain was built with. A missing file means "no overrides".

use crate::chain::chain::Chain;
use crate::chain::node::{FeederNode, FeederParams, interval_from_secs};
use crate::error::{ConfigError, FeederError};
use crate::simulation::order::{DEFAULT_ESCALATION_LIMIT, OrderCoordinator};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tracing::{debug, info};

pub const DEFAULT_CONFIG_FILE: &str = "feedchain.json";

/// Overrides for one feeder. Intervals are in seconds.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FeederSettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stock: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_capacity: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_capacity: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub replenish_amount: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub replenish_interval: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub consumption_per_replenish: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dispatch_rate: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dispatch_interval: Option<f64>,
}

impl FeederSettings {
    pub fn from_node(node: &FeederNode) -> Self {
        let params = node.params();
        Self {
            name: Some(node.name().to_string()),
            stock: Some(node.stock()),
            min_capacity: Some(params.min_capacity),
            max_capacity: Some(params.max_capacity),
            replenish_amount: Some(params.replenish_amount),
            replenish_interval: Some(params.replenish_interval.as_secs_f64()),
            consumption_per_replenish: Some(params.consumption_per_replenish),
            dispatch_rate: Some(params.dispatch_rate),
            dispatch_interval: Some(params.dispatch_interval.as_secs_f64()),
        }
    }

    /// Stock and parameters `node` would have with these overrides applied.
    pub fn resolve(&self, node: &FeederNode) -> Result<(i64, FeederParams), FeederError> {
        let current = node.params();
        let params = FeederParams {
            min_capacity: self.min_capacity.unwrap_or(current.min_capacity),
            max_capacity: self.max_capacity.unwrap_or(current.max_capacity),
            replenish_amount: self.replenish_amount.unwrap_or(current.replenish_amount),
            replenish_interval: match self.replenish_interval {
                Some(secs) => interval_from_secs(secs)?,
                None => current.replenish_interval,
            },
            consumption_per_replenish: self
                .consumption_per_replenish
                .unwrap_or(current.consumption_per_replenish),
            dispatch_rate: self.dispatch_rate.unwrap_or(current.dispatch_rate),
            dispatch_interval: match self.dispatch_interval {
                Some(secs) => interval_from_secs(secs)?,
                None => current.dispatch_interval,
            },
        };
        params.validate()?;
        let stock = self.stock.unwrap_or(node.stock());
        if stock < 0 || stock > params.max_capacity {
            return Err(FeederError::InvalidConfiguration(format!(
                "stock {} outside [0, {}]",
                stock, params.max_capacity
            )));
        }
        Ok((stock, params))
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ChainConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub escalation_limit: Option<u32>,
    /// keyed by feeder key, e.g. "achigan"
    pub feeders: BTreeMap<String, FeederSettings>,
}

impl ChainConfig {
    /// Loads `path`, or returns an empty configuration if it does not exist.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            debug!(path = %path.display(), "no config file, using built-in chain");
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path).map_err(ConfigError::Read)?;
        let config = serde_json::from_str(&content)?;
        info!(path = %path.display(), "configuration loaded");
        Ok(config)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(ConfigError::Write)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content).map_err(ConfigError::Write)
    }

    pub fn from_chain(chain: &Chain, escalation_limit: u32) -> Self {
        Self {
            escalation_limit: Some(escalation_limit),
            feeders: chain
                .nodes()
                .iter()
                .map(|n| (n.key().to_string(), FeederSettings::from_node(n)))
                .collect(),
        }
    }

    /// Applies every feeder's overrides, or none of them if any is invalid.
    pub fn apply(&self, chain: &mut Chain) -> Result<(), ConfigError> {
        let mut resolved = Vec::with_capacity(self.feeders.len());
        for (key, settings) in &self.feeders {
            let id = chain
                .find(key)
                .ok_or_else(|| ConfigError::UnknownFeeder(key.clone()))?;
            let (stock, params) =
                settings
                    .resolve(chain.node(id))
                    .map_err(|source| ConfigError::Invalid {
                        key: key.clone(),
                        source,
                    })?;
            resolved.push((id, settings.name.clone(), stock, params));
        }

        for (id, name, stock, params) in resolved {
            let node = chain.node_mut(id);
            node.reconfigure(stock, params)
                .map_err(|source| ConfigError::Invalid {
                    key: node.key().to_string(),
                    source,
                })?;
            if let Some(name) = name {
                node.set_name(name);
            }
        }
        Ok(())
    }

    pub fn coordinator(&self) -> OrderCoordinator {
        OrderCoordinator::new(self.escalation_limit.unwrap_or(DEFAULT_ESCALATION_LIMIT))
    }
}
