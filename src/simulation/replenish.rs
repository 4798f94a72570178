use crate::chain::chain::Chain;
use crate::chain::node::{FeederNode, NodeId};
use std::fmt;
use tracing::{debug, info, warn};

#[derive(Debug, PartialEq, Eq)]
enum Refusal {
    NoPredecessor,
    AlreadyFull,
    PredecessorShort { available: i64, needed: i64 },
    WouldOverflow { projected: i64, max: i64 },
}

impl fmt::Display for Refusal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Refusal::NoPredecessor => write!(f, "no predecessor"),
            Refusal::AlreadyFull => write!(f, "already at max capacity"),
            Refusal::PredecessorShort { available, needed } => {
                write!(f, "predecessor holds {available}, needs {needed}")
            }
            Refusal::WouldOverflow { projected, max } => {
                write!(f, "would reach {projected} above max {max}")
            }
        }
    }
}

fn check(pred: &FeederNode, node: &FeederNode) -> Result<(), Refusal> {
    if node.stock() >= node.max_capacity() {
        return Err(Refusal::AlreadyFull);
    }
    let needed = node.consumption_per_replenish() + pred.min_capacity();
    if pred.stock() < needed {
        return Err(Refusal::PredecessorShort {
            available: pred.stock(),
            needed,
        });
    }
    let projected = node.stock() + node.replenish_amount();
    if projected > node.max_capacity() {
        return Err(Refusal::WouldOverflow {
            projected,
            max: node.max_capacity(),
        });
    }
    Ok(())
}

/// Moves one replenishment from the predecessor of `id` into `id`.
///
/// Both new values are mirrored remotely, predecessor first. If either
/// publish goes unacknowledged both stocks are restored and `false` is
/// returned, so local state never runs ahead of the remote side.
pub fn replenish(chain: &mut Chain, id: NodeId) -> bool {
    if chain.node(id).predecessor().is_none() {
        debug!(node = %chain.node(id).name(), reason = %Refusal::NoPredecessor, "replenish skipped");
        return false;
    }
    let Some((pred, node)) = chain.with_predecessor_mut(id) else {
        return false;
    };

    if let Err(reason) = check(pred, node) {
        debug!(node = %node.name(), from = %pred.name(), %reason, "replenish refused");
        return false;
    }

    let (pred_before, node_before) = (pred.stock(), node.stock());
    pred.store(pred_before - node.consumption_per_replenish());
    node.store(node_before + node.replenish_amount());

    if !pred.publish_stock() {
        pred.store(pred_before);
        node.store(node_before);
        warn!(node = %node.name(), feed = %pred.feed(), "replenish rolled back, predecessor publish failed");
        return false;
    }

    if !node.publish_stock() {
        pred.store(pred_before);
        node.store(node_before);
        // the predecessor's tentative value already reached the remote side
        let restored = pred.publish_stock();
        warn!(
            node = %node.name(),
            feed = %node.feed(),
            restored,
            "replenish rolled back, node publish failed"
        );
        return false;
    }

    info!(
        node = %node.name(),
        from = %pred.name(),
        stock = node.stock(),
        from_stock = pred.stock(),
        "replenished"
    );
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::testing::{chain_of, params};
    use crate::remote::broker::{Broker, stock_feed};
    use proptest::prelude::*;

    #[test]
    fn test_replenish_moves_stock_from_predecessor() {
        let broker = Broker::reliable();
        let mut chain = chain_of(
            &broker,
            vec![(10, params(2, 20, 1, 1)), (5, params(2, 20, 3, 2))],
        );

        assert!(replenish(&mut chain, NodeId(1)));
        assert_eq!(8, chain.node(NodeId(0)).stock());
        assert_eq!(8, chain.node(NodeId(1)).stock());
        assert_eq!(Some(8), broker.last_value(&stock_feed("n0")));
        assert_eq!(Some(8), broker.last_value(&stock_feed("n1")));
    }

    #[test]
    fn test_root_never_replenishes() {
        let broker = Broker::reliable();
        let mut chain = chain_of(&broker, vec![(10, params(2, 20, 1, 1))]);

        assert!(!replenish(&mut chain, NodeId(0)));
        assert_eq!(10, chain.node(NodeId(0)).stock());
        assert!(broker.history(&stock_feed("n0")).is_empty());
    }

    #[test]
    fn test_refuses_when_full() {
        let broker = Broker::reliable();
        let mut chain = chain_of(
            &broker,
            vec![(10, params(2, 20, 1, 1)), (20, params(2, 20, 3, 2))],
        );
        assert!(!replenish(&mut chain, NodeId(1)));
        assert_eq!(10, chain.node(NodeId(0)).stock());
    }

    #[test]
    fn test_refuses_when_predecessor_would_drop_below_min() {
        let broker = Broker::reliable();
        // 3 < eat 2 + min 2
        let mut chain = chain_of(
            &broker,
            vec![(3, params(2, 20, 1, 1)), (5, params(2, 20, 3, 2))],
        );
        assert!(!replenish(&mut chain, NodeId(1)));

        // exactly at the threshold is allowed
        chain.node_mut(NodeId(0)).set_stock(4);
        assert!(replenish(&mut chain, NodeId(1)));
        assert_eq!(2, chain.node(NodeId(0)).stock());
    }

    #[test]
    fn test_refuses_when_node_would_overflow() {
        let broker = Broker::reliable();
        let mut chain = chain_of(
            &broker,
            vec![(10, params(2, 20, 1, 1)), (18, params(2, 20, 3, 2))],
        );
        assert!(!replenish(&mut chain, NodeId(1)));

        chain.node_mut(NodeId(1)).set_stock(17);
        assert!(replenish(&mut chain, NodeId(1)));
        assert_eq!(20, chain.node(NodeId(1)).stock());
    }

    #[test]
    fn test_rollback_when_predecessor_publish_fails() {
        let broker = Broker::reliable();
        let mut chain = chain_of(
            &broker,
            vec![(10, params(2, 20, 1, 1)), (5, params(2, 20, 3, 2))],
        );
        let before = chain.snapshot(0, vec![0, 0]);
        broker.fail_next(&stock_feed("n0"), 1);

        assert!(!replenish(&mut chain, NodeId(1)));
        assert_eq!(before, chain.snapshot(0, vec![0, 0]));
        assert!(broker.history(&stock_feed("n1")).is_empty());
    }

    #[test]
    fn test_rollback_when_node_publish_fails() {
        let broker = Broker::reliable();
        let mut chain = chain_of(
            &broker,
            vec![(10, params(2, 20, 1, 1)), (5, params(2, 20, 3, 2))],
        );
        let before = chain.snapshot(0, vec![0, 0]);
        broker.fail_next(&stock_feed("n1"), 1);

        assert!(!replenish(&mut chain, NodeId(1)));
        assert_eq!(before, chain.snapshot(0, vec![0, 0]));
        // tentative value, then the restored one
        assert_eq!(vec![8, 10], broker.history(&stock_feed("n0")));
    }

    #[test]
    fn test_net_gain_is_allowed() {
        let broker = Broker::reliable();
        let mut chain = chain_of(
            &broker,
            vec![(10, params(2, 20, 1, 1)), (5, params(2, 20, 4, 1))],
        );
        let before = chain.total_stock();
        assert!(replenish(&mut chain, NodeId(1)));
        assert_eq!(before + 3, chain.total_stock());
    }

    proptest! {
        #[test]
        fn prop_replenish_conserves_or_restores(
            pred_stock in 0i64..=40,
            node_stock in 0i64..=30,
            amount in 0i64..=10,
            eat in 0i64..=10,
            fail_feed in 0u8..3,
        ) {
            let broker = Broker::reliable();
            let mut chain = chain_of(
                &broker,
                vec![(pred_stock, params(3, 40, 1, 1)), (node_stock, params(1, 30, amount, eat))],
            );
            match fail_feed {
                1 => broker.fail_next(&stock_feed("n0"), 1),
                2 => broker.fail_next(&stock_feed("n1"), 1),
                _ => {}
            }
            let before = chain.snapshot(0, vec![0, 0]);

            let ok = replenish(&mut chain, NodeId(1));

            let (pred, node) = (chain.node(NodeId(0)), chain.node(NodeId(1)));
            prop_assert!((0..=pred.max_capacity()).contains(&pred.stock()));
            prop_assert!((0..=node.max_capacity()).contains(&node.stock()));
            if ok {
                prop_assert_eq!(fail_feed, 0);
                prop_assert_eq!(pred_stock - eat, pred.stock());
                prop_assert_eq!(node_stock + amount, node.stock());
                prop_assert!(pred.stock() >= pred.min_capacity());
            } else {
                prop_assert_eq!(before, chain.snapshot(0, vec![0, 0]));
            }
        }
    }
}
