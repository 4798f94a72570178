use crate::chain::chain::Chain;
use crate::chain::node::NodeId;
use crate::error::FeederError;
use crate::simulation::disburse::DisbursementTask;
use crate::simulation::replenish::replenish;
use tracing::{debug, info, warn};

pub const DEFAULT_ESCALATION_LIMIT: u32 = 64;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OrderReceipt {
    pub node: NodeId,
    pub quantity: i64,
}

/// Accepts orders on a node, escalating up the chain when it runs short.
pub struct OrderCoordinator {
    escalation_limit: u32,
}

impl Default for OrderCoordinator {
    fn default() -> Self {
        Self::new(DEFAULT_ESCALATION_LIMIT)
    }
}

impl OrderCoordinator {
    pub fn new(escalation_limit: u32) -> Self {
        Self { escalation_limit }
    }

    pub fn escalation_limit(&self) -> u32 {
        self.escalation_limit
    }

    /// Starts disbursing `quantity` out of `target` once it can be spared
    /// without dropping below the node's minimum.
    ///
    /// While it cannot, each round walks from the target's predecessor
    /// towards the root and stops at the first successful replenishment, then
    /// checks again. A round with no success anywhere, or running out of
    /// rounds, rejects the order. Replenishments done before a rejection stay
    /// committed.
    pub fn place_order(
        &self,
        chain: &mut Chain,
        tasks: &mut [DisbursementTask],
        target: NodeId,
        quantity: i64,
    ) -> Result<OrderReceipt, FeederError> {
        if quantity < 0 {
            return Err(FeederError::InvalidArgument(format!(
                "order quantity must be >= 0, got {quantity}"
            )));
        }

        let mut escalations = 0;
        loop {
            let node = chain.node(target);
            if node.stock() - quantity >= node.min_capacity() {
                tasks[target.index()].start(node, quantity);
                info!(
                    node = %node.name(),
                    quantity,
                    stock = node.stock(),
                    escalations,
                    "order accepted"
                );
                return Ok(OrderReceipt {
                    node: target,
                    quantity,
                });
            }

            if escalations >= self.escalation_limit {
                warn!(node = %node.name(), quantity, escalations, "order rejected, escalation limit reached");
                return Err(insufficient(chain, target, quantity));
            }

            debug!(node = %node.name(), quantity, stock = node.stock(), "escalating");
            if !escalate(chain, target) {
                warn!(node = %chain.node(target).name(), quantity, "order rejected, chain exhausted");
                return Err(insufficient(chain, target, quantity));
            }
            escalations += 1;
        }
    }
}

/// One pass over the predecessors of `target`, nearest first; at most
/// `chain.len() - 1` attempts.
fn escalate(chain: &mut Chain, target: NodeId) -> bool {
    let walk: Vec<NodeId> = chain.upstream(target).collect();
    walk.into_iter().any(|id| replenish(chain, id))
}

fn insufficient(chain: &Chain, target: NodeId, quantity: i64) -> FeederError {
    let node = chain.node(target);
    FeederError::InsufficientStock {
        node: node.name().to_string(),
        requested: quantity,
        available: (node.stock() - node.min_capacity()).max(0),
    }
}
