use crate::chain::chain::Chain;
use crate::chain::node::{FeederNode, NodeId};
use crate::command::{parse_quantity, parse_stock};
use crate::error::FeederError;
use crate::remote::channel::Telemetry;
use crate::simulation::disburse::{DisbursementTask, tick};
use crate::simulation::order::{OrderCoordinator, OrderReceipt};
use crate::simulation::replenish::replenish;
use crate::simulation::scheduler::{Firing, Scheduler, TimerKind};
use crate::state::snapshot::Snapshot;
use std::collections::VecDeque;
use std::fmt;
use std::time::Duration;
use tracing::debug;

const ACTIVITY_LIMIT: usize = 32;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Activity {
    Replenished { node: String, stock: i64 },
    OrderAccepted { quantity: i64 },
    OrderRejected { quantity: i64, reason: String },
    Dispatched { node: String, amount: i64, remaining: i64, acknowledged: bool },
    PublishFailed { reason: String },
    OrderFulfilled { node: String },
    RemoteOverride { node: String, stock: i64 },
}

impl fmt::Display for Activity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Activity::Replenished { node, stock } => write!(f, "{node} replenished to {stock}"),
            Activity::OrderAccepted { quantity } => write!(f, "order of {quantity} accepted"),
            Activity::OrderRejected { quantity, reason } => {
                write!(f, "order of {quantity} rejected: {reason}")
            }
            Activity::Dispatched { node, amount, remaining, acknowledged } => {
                write!(f, "{node} released {amount}, {remaining} to go")?;
                if !acknowledged {
                    write!(f, " (unacknowledged)")?;
                }
                Ok(())
            }
            Activity::OrderFulfilled { node } => write!(f, "{node} fulfilled its order"),
            Activity::PublishFailed { reason } => write!(f, "{reason}"),
            Activity::RemoteOverride { node, stock } => write!(f, "{node} set to {stock} remotely"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ActivityEntry {
    pub at: Duration,
    pub activity: Activity,
}

/// Owns the chain and everything that mutates it. All entry points take
/// `&mut self`, so mutations of any node are serialized.
pub struct FeederEngine {
    chain: Chain,
    tasks: Vec<DisbursementTask>,
    telemetry: Telemetry,
    coordinator: OrderCoordinator,
    scheduler: Scheduler,
    previous_snapshot: Option<Snapshot>,
    activity: VecDeque<ActivityEntry>,
}

impl FeederEngine {
    pub fn new(chain: Chain, telemetry: Telemetry, coordinator: OrderCoordinator) -> Self {
        let mut scheduler = Scheduler::new();
        chain.nodes().iter().for_each(|n| {
            scheduler.arm(n.id(), TimerKind::Replenish, n.replenish_interval());
        });
        Self {
            tasks: vec![DisbursementTask::new(); chain.len()],
            chain,
            telemetry,
            coordinator,
            scheduler,
            previous_snapshot: None,
            activity: VecDeque::with_capacity(ACTIVITY_LIMIT),
        }
    }

    pub fn chain(&self) -> &Chain {
        &self.chain
    }

    pub fn task(&self, id: NodeId) -> &DisbursementTask {
        &self.tasks[id.index()]
    }

    pub fn coordinator(&self) -> &OrderCoordinator {
        &self.coordinator
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn now(&self) -> Duration {
        self.scheduler.now()
    }

    pub fn activity(&self) -> impl DoubleEndedIterator<Item = &ActivityEntry> {
        self.activity.iter()
    }

    pub fn current_snapshot(&self) -> Snapshot {
        self.chain.snapshot(
            self.now().as_millis() as u64,
            self.tasks.iter().map(|t| t.remaining()).collect(),
        )
    }

    /// State before the latest `advance`, or the current one before any.
    pub fn previous_snapshot(&self) -> Snapshot {
        self.previous_snapshot
            .clone()
            .unwrap_or_else(|| self.current_snapshot())
    }

    /// Places an order on the terminal node.
    pub fn place_order(&mut self, quantity: i64) -> Result<OrderReceipt, FeederError> {
        let terminal = self.chain.terminal();
        let result =
            self.coordinator
                .place_order(&mut self.chain, &mut self.tasks, terminal, quantity);
        match &result {
            Ok(_) => {
                let interval = self.tasks[terminal.index()].interval();
                self.scheduler.arm(terminal, TimerKind::Dispatch, interval);
                self.record(Activity::OrderAccepted { quantity });
            }
            Err(e) => self.record(Activity::OrderRejected {
                quantity,
                reason: e.to_string(),
            }),
        }
        result
    }

    /// Order payload as received from the command feed.
    pub fn receive_order(&mut self, payload: &str) -> Result<OrderReceipt, FeederError> {
        let quantity = parse_quantity(payload)?;
        self.place_order(quantity)
    }

    /// Stock value pushed by the remote side for the feeder `key`.
    pub fn receive_stock(&mut self, key: &str, payload: &str) -> Result<i64, FeederError> {
        let id = self
            .chain
            .find(key)
            .ok_or_else(|| FeederError::InvalidArgument(format!("unknown feeder '{key}'")))?;
        let value = parse_stock(payload)?;
        Ok(self.set_stock(id, value))
    }

    pub fn set_stock(&mut self, id: NodeId, value: i64) -> i64 {
        let node = self.chain.node_mut(id);
        let stored = node.set_stock(value);
        let name = node.name().to_string();
        self.record(Activity::RemoteOverride {
            node: name,
            stock: stored,
        });
        stored
    }

    /// Applies a setter to one node, then refreshes its replenish timer and
    /// any order it is currently draining.
    pub fn update_node(
        &mut self,
        id: NodeId,
        update: impl FnOnce(&mut FeederNode) -> Result<(), FeederError>,
    ) -> Result<(), FeederError> {
        let node = self.chain.node_mut(id);
        let interval = node.replenish_interval();
        let (rate, dispatch_interval) = (node.dispatch_rate(), node.dispatch_interval());
        update(&mut *node)?;

        if node.replenish_interval() != interval {
            self.scheduler
                .arm(id, TimerKind::Replenish, node.replenish_interval());
        }
        let task = &mut self.tasks[id.index()];
        if task.is_active() {
            task.retune(node);
            if node.dispatch_interval() != dispatch_interval {
                self.scheduler
                    .arm(id, TimerKind::Dispatch, node.dispatch_interval());
            } else if node.dispatch_rate() != rate {
                debug!(node = %node.name(), rate = node.dispatch_rate(), "in-flight order retuned");
            }
        }
        Ok(())
    }

    pub fn step(&mut self) {
        self.advance(Duration::from_secs(1));
    }

    /// Runs every timer falling due within the next `dt`, in due order.
    pub fn advance(&mut self, dt: Duration) {
        self.previous_snapshot = Some(self.current_snapshot());
        let until = self.now() + dt;
        while let Some(firing) = self.scheduler.pop_due(until) {
            self.fire(firing);
        }
        self.scheduler.settle(until);
    }

    fn fire(&mut self, firing: Firing) {
        let id = firing.node;
        match firing.kind {
            TimerKind::Replenish => {
                if replenish(&mut self.chain, id) {
                    let node = self.chain.node(id);
                    let activity = Activity::Replenished {
                        node: node.name().to_string(),
                        stock: node.stock(),
                    };
                    self.record(activity);
                }
            }
            TimerKind::Dispatch => {
                let node = self.chain.node_mut(id);
                let task = &mut self.tasks[id.index()];
                let report = tick(node, task, &mut self.telemetry);
                let name = node.name().to_string();
                if !task.is_active() {
                    self.scheduler.disarm(id, TimerKind::Dispatch);
                }
                if let Some(report) = report {
                    self.record(Activity::Dispatched {
                        node: name.clone(),
                        amount: report.dispatched,
                        remaining: report.remaining,
                        acknowledged: report.acknowledged(),
                    });
                    if let Some(failure) = report.failure {
                        self.record(Activity::PublishFailed {
                            reason: failure.to_string(),
                        });
                    }
                    if report.finished {
                        self.record(Activity::OrderFulfilled { node: name });
                    }
                }
            }
        }
    }

    fn record(&mut self, activity: Activity) {
        if self.activity.len() == ACTIVITY_LIMIT {
            self.activity.pop_front();
        }
        self.activity.push_back(ActivityEntry {
            at: self.now(),
            activity,
        });
    }
}
