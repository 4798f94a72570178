use crate::chain::chain::Chain;
use crate::chain::node::NodeId;
use crate::state::snapshot::Snapshot;

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum StockLevel {
    Empty,
    BelowMinimum,
    Normal,
    Full,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum StockTrend {
    Up,
    Down,
    Flat,
}

pub struct NodeSummary {
    id: NodeId,
    name: String,
    stock: i64,
    min_capacity: i64,
    max_capacity: i64,
    fill: f64,
    level: StockLevel,
    trend: StockTrend,
    pending: i64,
}

impl NodeSummary {
    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn stock(&self) -> i64 {
        self.stock
    }

    pub fn min_capacity(&self) -> i64 {
        self.min_capacity
    }

    pub fn max_capacity(&self) -> i64 {
        self.max_capacity
    }

    /// stock / max_capacity, in [0.0, 1.0]
    pub fn fill(&self) -> f64 {
        self.fill
    }

    pub fn level(&self) -> StockLevel {
        self.level
    }

    pub fn trend(&self) -> StockTrend {
        self.trend
    }

    pub fn pending(&self) -> i64 {
        self.pending
    }
}

pub fn fill_ratio(stock: i64, max_capacity: i64) -> f64 {
    if max_capacity > 0 {
        (stock as f64 / max_capacity as f64).clamp(0.0, 1.0)
    } else {
        0.0
    }
}

pub fn classify(stock: i64, min_capacity: i64, max_capacity: i64) -> StockLevel {
    match stock {
        s if s <= 0 => StockLevel::Empty,
        s if s < min_capacity => StockLevel::BelowMinimum,
        s if s >= max_capacity => StockLevel::Full,
        _ => StockLevel::Normal,
    }
}

/// One row per node, root first. Snapshots are indexed like the chain.
pub fn summarize(chain: &Chain, current: &Snapshot, previous: &Snapshot) -> Vec<NodeSummary> {
    chain
        .nodes()
        .iter()
        .map(|node| {
            let i = node.id().index();
            let stock = current.stocks()[i];
            let before = previous.stocks().get(i).copied().unwrap_or(stock);
            let trend = match stock.cmp(&before) {
                std::cmp::Ordering::Greater => StockTrend::Up,
                std::cmp::Ordering::Less => StockTrend::Down,
                std::cmp::Ordering::Equal => StockTrend::Flat,
            };
            NodeSummary {
                id: node.id(),
                name: node.name().to_string(),
                stock,
                min_capacity: node.min_capacity(),
                max_capacity: node.max_capacity(),
                fill: fill_ratio(stock, node.max_capacity()),
                level: classify(stock, node.min_capacity(), node.max_capacity()),
                trend,
                pending: current.pending().get(i).copied().unwrap_or(0),
            }
        })
        .collect()
}
