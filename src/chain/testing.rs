use crate::chain::chain::Chain;
use crate::chain::node::{FeederNode, FeederParams, NodeId};
use crate::remote::broker::{Broker, stock_feed};
use std::time::Duration;

pub fn params(min: i64, max: i64, amount: i64, eat: i64) -> FeederParams {
    FeederParams {
        min_capacity: min,
        max_capacity: max,
        replenish_amount: amount,
        replenish_interval: Duration::ZERO,
        consumption_per_replenish: eat,
        dispatch_rate: 1,
        dispatch_interval: Duration::from_secs(1),
    }
}

/// Builds a chain named n0 (root) .. nK (terminal) on `broker`.
pub fn chain_of(broker: &Broker, rows: Vec<(i64, FeederParams)>) -> Chain {
    let nodes = rows
        .into_iter()
        .enumerate()
        .map(|(i, (stock, params))| {
            let key = format!("n{i}");
            FeederNode::new(
                NodeId(i),
                key.clone(),
                key.to_uppercase(),
                stock,
                params,
                Box::new(broker.channel(&stock_feed(&key))),
            )
            .unwrap()
        })
        .collect();
    Chain::new(nodes).unwrap()
}
