use crate::error::FeederError;
use crate::remote::channel::RemoteChannel;
use std::fmt;
use std::time::Duration;
use tracing::warn;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Capacity bounds and rates of a single reservoir.
#[derive(Clone, Debug, PartialEq)]
pub struct FeederParams {
    /// 0 <= min_capacity < max_capacity
    pub min_capacity: i64,
    pub max_capacity: i64,
    /// added to this node per successful replenishment
    pub replenish_amount: i64,
    /// zero disables the autonomous replenish timer
    pub replenish_interval: Duration,
    /// taken from the predecessor per successful replenishment
    pub consumption_per_replenish: i64,
    /// released per disbursement tick, >= 1
    pub dispatch_rate: i64,
    pub dispatch_interval: Duration,
}

impl Default for FeederParams {
    fn default() -> Self {
        Self {
            min_capacity: 2,
            max_capacity: 20,
            replenish_amount: 2,
            replenish_interval: Duration::from_secs(10),
            consumption_per_replenish: 2,
            dispatch_rate: 1,
            dispatch_interval: Duration::from_secs(10),
        }
    }
}

impl FeederParams {
    pub fn validate(&self) -> Result<(), FeederError> {
        if self.min_capacity < 0 {
            return Err(invalid(format!(
                "min_capacity must be >= 0, got {}",
                self.min_capacity
            )));
        }
        if self.min_capacity >= self.max_capacity {
            return Err(invalid(format!(
                "min_capacity ({}) must be below max_capacity ({})",
                self.min_capacity, self.max_capacity
            )));
        }
        if self.replenish_amount < 0 {
            return Err(invalid(format!(
                "replenish_amount must be >= 0, got {}",
                self.replenish_amount
            )));
        }
        if self.consumption_per_replenish < 0 {
            return Err(invalid(format!(
                "consumption_per_replenish must be >= 0, got {}",
                self.consumption_per_replenish
            )));
        }
        if self.dispatch_rate < 1 {
            return Err(invalid(format!(
                "dispatch_rate must be >= 1, got {}",
                self.dispatch_rate
            )));
        }
        if self.dispatch_interval.is_zero() {
            return Err(invalid("dispatch_interval must be positive".to_string()));
        }
        Ok(())
    }
}

fn invalid(reason: String) -> FeederError {
    FeederError::InvalidConfiguration(reason)
}

/// Converts configured seconds into a timer interval.
pub fn interval_from_secs(secs: f64) -> Result<Duration, FeederError> {
    Duration::try_from_secs_f64(secs)
        .map_err(|_| invalid(format!("interval must be a non-negative number of seconds, got {secs}")))
}

pub struct FeederNode {
    id: NodeId,
    key: String,
    name: String,
    /// 0 <= stock <= max_capacity
    stock: i64,
    params: FeederParams,
    predecessor: Option<NodeId>,
    channel: Box<dyn RemoteChannel>,
}

impl FeederNode {
    pub fn new(
        id: NodeId,
        key: impl Into<String>,
        name: impl Into<String>,
        stock: i64,
        params: FeederParams,
        channel: Box<dyn RemoteChannel>,
    ) -> Result<Self, FeederError> {
        params.validate()?;
        check_stock(stock, &params)?;
        Ok(Self {
            id,
            key: key.into(),
            name: name.into(),
            stock,
            params,
            predecessor: None,
            channel,
        })
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn stock(&self) -> i64 {
        self.stock
    }

    pub fn params(&self) -> &FeederParams {
        &self.params
    }

    pub fn min_capacity(&self) -> i64 {
        self.params.min_capacity
    }

    pub fn max_capacity(&self) -> i64 {
        self.params.max_capacity
    }

    pub fn replenish_amount(&self) -> i64 {
        self.params.replenish_amount
    }

    pub fn replenish_interval(&self) -> Duration {
        self.params.replenish_interval
    }

    pub fn consumption_per_replenish(&self) -> i64 {
        self.params.consumption_per_replenish
    }

    pub fn dispatch_rate(&self) -> i64 {
        self.params.dispatch_rate
    }

    pub fn dispatch_interval(&self) -> Duration {
        self.params.dispatch_interval
    }

    pub fn predecessor(&self) -> Option<NodeId> {
        self.predecessor
    }

    pub fn feed(&self) -> &str {
        self.channel.feed()
    }

    pub(crate) fn link(&mut self, predecessor: Option<NodeId>) {
        self.predecessor = predecessor;
    }

    /// Writes a stock value already checked by the caller.
    pub(crate) fn store(&mut self, stock: i64) {
        debug_assert!((0..=self.params.max_capacity).contains(&stock));
        self.stock = stock;
    }

    /// Mirrors the current stock on this node's remote feed.
    pub(crate) fn publish_stock(&mut self) -> bool {
        self.channel.publish(self.stock)
    }

    /// Authoritative override from the remote feed. Out-of-range values are
    /// clamped into `[0, max_capacity]`; returns the value actually stored.
    pub fn set_stock(&mut self, value: i64) -> i64 {
        let clamped = value.clamp(0, self.params.max_capacity);
        if clamped != value {
            warn!(
                node = %self.name,
                received = value,
                stored = clamped,
                "remote stock override out of range, clamped"
            );
        }
        self.stock = clamped;
        clamped
    }

    /// Configured stock, rejected rather than clamped when out of range.
    pub fn reset_stock(&mut self, stock: i64) -> Result<(), FeederError> {
        check_stock(stock, &self.params)?;
        self.stock = stock;
        Ok(())
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn set_min_capacity(&mut self, min_capacity: i64) -> Result<(), FeederError> {
        self.update(|p| p.min_capacity = min_capacity)
    }

    pub fn set_max_capacity(&mut self, max_capacity: i64) -> Result<(), FeederError> {
        self.update(|p| p.max_capacity = max_capacity)
    }

    pub fn set_bounds(&mut self, min_capacity: i64, max_capacity: i64) -> Result<(), FeederError> {
        self.update(|p| {
            p.min_capacity = min_capacity;
            p.max_capacity = max_capacity;
        })
    }

    pub fn set_replenish_amount(&mut self, amount: i64) -> Result<(), FeederError> {
        self.update(|p| p.replenish_amount = amount)
    }

    pub fn set_replenish_interval(&mut self, interval: Duration) -> Result<(), FeederError> {
        self.update(|p| p.replenish_interval = interval)
    }

    pub fn set_consumption_per_replenish(&mut self, eat: i64) -> Result<(), FeederError> {
        self.update(|p| p.consumption_per_replenish = eat)
    }

    pub fn set_dispatch_rate(&mut self, rate: i64) -> Result<(), FeederError> {
        self.update(|p| p.dispatch_rate = rate)
    }

    pub fn set_dispatch_interval(&mut self, interval: Duration) -> Result<(), FeederError> {
        self.update(|p| p.dispatch_interval = interval)
    }

    /// Replaces stock and parameters together; nothing changes on error.
    pub fn reconfigure(&mut self, stock: i64, params: FeederParams) -> Result<(), FeederError> {
        params.validate()?;
        check_stock(stock, &params)?;
        self.stock = stock;
        self.params = params;
        Ok(())
    }

    fn update(&mut self, apply: impl FnOnce(&mut FeederParams)) -> Result<(), FeederError> {
        let mut params = self.params.clone();
        apply(&mut params);
        params.validate()?;
        check_stock(self.stock, &params)?;
        self.params = params;
        Ok(())
    }
}

fn check_stock(stock: i64, params: &FeederParams) -> Result<(), FeederError> {
    if stock < 0 || stock > params.max_capacity {
        return Err(invalid(format!(
            "stock {} outside [0, {}]",
            stock, params.max_capacity
        )));
    }
    Ok(())
}

impl fmt::Debug for FeederNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FeederNode")
            .field("id", &self.id)
            .field("key", &self.key)
            .field("name", &self.name)
            .field("stock", &self.stock)
            .field("params", &self.params)
            .field("predecessor", &self.predecessor)
            .field("feed", &self.channel.feed())
            .finish()
    }
}
