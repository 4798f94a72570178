use crate::chain::node::FeederNode;
use crate::error::FeederError;
use crate::remote::channel::Telemetry;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Pending order being drained out of one node.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DisbursementTask {
    /// remaining >= 0
    remaining: i64,
    rate: i64,
    interval: Duration,
    active: bool,
}

impl DisbursementTask {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts draining `quantity` from `node`. An order already in flight is
    /// replaced, not queued.
    pub fn start(&mut self, node: &FeederNode, quantity: i64) {
        if self.active && self.remaining > 0 {
            warn!(
                node = %node.name(),
                dropped = self.remaining,
                replaced_by = quantity,
                "in-flight order overwritten"
            );
        }
        self.remaining = quantity.max(0);
        self.rate = node.dispatch_rate();
        self.interval = node.dispatch_interval();
        self.active = true;
    }

    /// Picks up the node's current dispatch settings for the rest of the order.
    pub fn retune(&mut self, node: &FeederNode) {
        self.rate = node.dispatch_rate();
        self.interval = node.dispatch_interval();
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn remaining(&self) -> i64 {
        self.remaining
    }

    pub fn rate(&self) -> i64 {
        self.rate
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    fn deactivate(&mut self) {
        self.active = false;
        self.remaining = 0;
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TickReport {
    pub dispatched: i64,
    pub remaining: i64,
    /// first feed that did not acknowledge this tick, if any
    pub failure: Option<FeederError>,
    pub finished: bool,
}

impl TickReport {
    pub fn acknowledged(&self) -> bool {
        self.failure.is_none()
    }
}

/// Releases one batch of the pending order.
///
/// Publish failures are reported but never undo the release: once stock has
/// left the reservoir it is gone.
pub fn tick(
    node: &mut FeederNode,
    task: &mut DisbursementTask,
    telemetry: &mut Telemetry,
) -> Option<TickReport> {
    if !task.is_active() {
        return None;
    }
    if task.remaining <= 0 {
        task.deactivate();
        return None;
    }

    let amount = task.rate.min(task.remaining).min(node.stock());
    if amount <= 0 {
        warn!(
            node = %node.name(),
            remaining = task.remaining,
            "disbursement stalled, reservoir empty"
        );
        return Some(TickReport {
            dispatched: 0,
            remaining: task.remaining,
            failure: None,
            finished: false,
        });
    }

    node.store(node.stock() - amount);
    task.remaining -= amount;

    let stock_ok = node.publish_stock();
    let progress_ok = telemetry.publish_progress(task.remaining);
    let ready_ok = telemetry.publish_ready(amount);
    let failed_feed = if !stock_ok {
        Some(node.feed())
    } else if !progress_ok {
        Some(telemetry.progress_feed())
    } else if !ready_ok {
        Some(telemetry.ready_feed())
    } else {
        None
    };
    let failure = failed_feed.map(|feed| FeederError::PublishFailure {
        feed: feed.to_string(),
    });

    debug!(
        node = %node.name(),
        dispatched = amount,
        remaining = task.remaining,
        stock = node.stock(),
        "disbursement tick"
    );
    if failure.is_some() {
        warn!(
            node = %node.name(),
            stock_ok,
            progress_ok,
            ready_ok,
            "disbursement publish not acknowledged, keeping local stock"
        );
    }

    let finished = task.remaining == 0;
    if finished {
        task.deactivate();
        info!(node = %node.name(), stock = node.stock(), "order fulfilled");
    }

    Some(TickReport {
        dispatched: amount,
        remaining: task.remaining,
        failure,
        finished,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::node::{FeederParams, NodeId};
    use crate::remote::broker::{Broker, ORDER_FEED, READY_FEED, stock_feed};
    use proptest::prelude::*;

    fn feeder(broker: &Broker, stock: i64, rate: i64) -> FeederNode {
        let params = FeederParams {
            min_capacity: 5,
            max_capacity: 30,
            dispatch_rate: rate,
            ..FeederParams::default()
        };
        FeederNode::new(
            NodeId(0),
            "t",
            "T",
            stock,
            params,
            Box::new(broker.channel(&stock_feed("t"))),
        )
        .unwrap()
    }

    #[test]
    fn test_inactive_task_is_a_no_op() {
        let broker = Broker::reliable();
        let mut node = feeder(&broker, 12, 1);
        let mut task = DisbursementTask::new();
        let mut telemetry = broker.telemetry();

        assert_eq!(None, tick(&mut node, &mut task, &mut telemetry));
        assert_eq!(12, node.stock());
    }

    #[test]
    fn test_order_of_six_at_rate_one() {
        let broker = Broker::reliable();
        let mut node = feeder(&broker, 12, 1);
        let mut task = DisbursementTask::new();
        let mut telemetry = broker.telemetry();
        task.start(&node, 6);

        let mut ticks = 0;
        while task.is_active() {
            let report = tick(&mut node, &mut task, &mut telemetry).unwrap();
            assert_eq!(1, report.dispatched);
            ticks += 1;
            assert_eq!(12 - ticks, node.stock());
            assert_eq!(6 - ticks, report.remaining);
        }

        assert_eq!(6, ticks);
        assert_eq!(0, task.remaining());
        assert_eq!(6, node.stock());
        assert_eq!(vec![5, 4, 3, 2, 1, 0], broker.history(ORDER_FEED));
        assert_eq!(Some(6), broker.last_value(READY_FEED));
        assert_eq!(Some(6), broker.last_value(&stock_feed("t")));
    }

    #[test]
    fn test_last_batch_is_truncated() {
        let broker = Broker::reliable();
        let mut node = feeder(&broker, 20, 4);
        let mut task = DisbursementTask::new();
        let mut telemetry = broker.telemetry();
        task.start(&node, 6);

        let first = tick(&mut node, &mut task, &mut telemetry).unwrap();
        let second = tick(&mut node, &mut task, &mut telemetry).unwrap();

        assert_eq!((2, 2), (first.remaining, second.dispatched));
        assert!(second.finished);
        assert!(!task.is_active());
        assert_eq!(14, node.stock());
    }

    #[test]
    fn test_zero_quantity_deactivates_on_first_tick() {
        let broker = Broker::reliable();
        let mut node = feeder(&broker, 12, 1);
        let mut task = DisbursementTask::new();
        let mut telemetry = broker.telemetry();
        task.start(&node, 0);

        assert!(task.is_active());
        assert_eq!(None, tick(&mut node, &mut task, &mut telemetry));
        assert!(!task.is_active());
        assert_eq!(12, node.stock());
    }

    #[test]
    fn test_publish_failure_does_not_restore_stock() {
        let broker = Broker::reliable();
        let mut node = feeder(&broker, 12, 2);
        let mut task = DisbursementTask::new();
        let mut telemetry = broker.telemetry();
        task.start(&node, 4);
        broker.set_offline(true);

        let report = tick(&mut node, &mut task, &mut telemetry).unwrap();

        // unlike replenishment, a released batch stays released
        assert!(!report.acknowledged());
        assert_eq!(
            Some(FeederError::PublishFailure {
                feed: stock_feed("t")
            }),
            report.failure
        );
        assert_eq!(10, node.stock());
        assert_eq!(2, task.remaining());
        assert_eq!(None, broker.last_value(&stock_feed("t")));
    }

    #[test]
    fn test_progress_feed_failure_is_named() {
        let broker = Broker::reliable();
        let mut node = feeder(&broker, 12, 1);
        let mut task = DisbursementTask::new();
        let mut telemetry = broker.telemetry();
        task.start(&node, 3);
        broker.fail_next(ORDER_FEED, 1);

        let report = tick(&mut node, &mut task, &mut telemetry).unwrap();

        assert_eq!(
            Some(FeederError::PublishFailure {
                feed: ORDER_FEED.to_string()
            }),
            report.failure
        );
        assert_eq!(Some(11), broker.last_value(&stock_feed("t")));
        assert_eq!(Some(1), broker.last_value(READY_FEED));
    }

    #[test]
    fn test_new_order_overwrites_remaining() {
        let broker = Broker::reliable();
        let mut node = feeder(&broker, 20, 1);
        let mut task = DisbursementTask::new();
        let mut telemetry = broker.telemetry();
        task.start(&node, 5);
        tick(&mut node, &mut task, &mut telemetry);
        assert_eq!(4, task.remaining());

        task.start(&node, 2);
        assert_eq!(2, task.remaining());
        tick(&mut node, &mut task, &mut telemetry);
        tick(&mut node, &mut task, &mut telemetry);
        assert!(!task.is_active());
        // 1 from the first order, 2 from the second; the other 4 are dropped
        assert_eq!(17, node.stock());
    }

    #[test]
    fn test_stalls_instead_of_going_negative() {
        let broker = Broker::reliable();
        let mut node = feeder(&broker, 12, 3);
        let mut task = DisbursementTask::new();
        let mut telemetry = broker.telemetry();
        task.start(&node, 6);
        node.set_stock(2);

        let report = tick(&mut node, &mut task, &mut telemetry).unwrap();
        assert_eq!(2, report.dispatched);
        assert_eq!(0, node.stock());

        let report = tick(&mut node, &mut task, &mut telemetry).unwrap();
        assert_eq!(0, report.dispatched);
        assert_eq!(4, report.remaining);
        assert!(task.is_active());
    }

    proptest! {
        #[test]
        fn prop_disbursement_reaches_exactly_zero(
            quantity in 0i64..=25,
            rate in 1i64..=9,
        ) {
            let broker = Broker::reliable();
            let mut node = feeder(&broker, 30, rate);
            let mut task = DisbursementTask::new();
            let mut telemetry = broker.telemetry();
            task.start(&node, quantity);

            let mut ticks = 0;
            while task.is_active() {
                tick(&mut node, &mut task, &mut telemetry);
                prop_assert!(task.remaining() >= 0);
                ticks += 1;
                prop_assert!(ticks <= quantity + 1);
            }
            prop_assert_eq!(0, task.remaining());
            prop_assert_eq!(30 - quantity, node.stock());
        }
    }
}
