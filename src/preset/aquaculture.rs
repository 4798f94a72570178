use crate::chain::chain::Chain;
use crate::chain::node::{FeederNode, FeederParams, NodeId};
use crate::error::FeederError;
use crate::remote::broker::{Broker, stock_feed};
use std::time::Duration;

struct Row {
    key: &'static str,
    name: &'static str,
    stock: i64,
    min: i64,
    max: i64,
    replenish_amount: i64,
    replenish_secs: u64,
    eat: i64,
    dispatch_rate: i64,
    dispatch_secs: u64,
}

/// Kibble feeds goldfish, goldfish feed bass, bass stock the restaurant.
const CHAIN: [Row; 4] = [
    Row {
        key: "croquette",
        name: "Croquette",
        stock: 30000,
        min: 1000,
        max: 50000,
        replenish_amount: 0,
        replenish_secs: 0,
        eat: 0,
        dispatch_rate: 1000,
        dispatch_secs: 10,
    },
    Row {
        key: "poisson_rouge",
        name: "Poisson Rouge",
        stock: 30,
        min: 20,
        max: 100,
        replenish_amount: 3,
        replenish_secs: 15,
        eat: 2000,
        dispatch_rate: 3,
        dispatch_secs: 10,
    },
    Row {
        key: "achigan",
        name: "Achigan",
        stock: 10,
        min: 5,
        max: 20,
        replenish_amount: 1,
        replenish_secs: 40,
        eat: 4,
        dispatch_rate: 2,
        dispatch_secs: 10,
    },
    Row {
        key: "achigan_resto",
        name: "Achigan du Restaurant",
        stock: 12,
        min: 5,
        max: 30,
        replenish_amount: 1,
        replenish_secs: 40,
        eat: 1,
        dispatch_rate: 1,
        dispatch_secs: 10,
    },
];

pub struct AquacultureChain;

impl AquacultureChain {
    pub fn build(broker: &Broker) -> Result<Chain, FeederError> {
        let nodes = CHAIN
            .iter()
            .enumerate()
            .map(|(i, row)| {
                let params = FeederParams {
                    min_capacity: row.min,
                    max_capacity: row.max,
                    replenish_amount: row.replenish_amount,
                    replenish_interval: Duration::from_secs(row.replenish_secs),
                    consumption_per_replenish: row.eat,
                    dispatch_rate: row.dispatch_rate,
                    dispatch_interval: Duration::from_secs(row.dispatch_secs),
                };
                FeederNode::new(
                    NodeId(i),
                    row.key,
                    row.name,
                    row.stock,
                    params,
                    Box::new(broker.channel(&stock_feed(row.key))),
                )
            })
            .collect::<Result<Vec<_>, _>>()?;
        Chain::new(nodes)
    }
}
