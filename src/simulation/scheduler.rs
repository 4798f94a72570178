use crate::chain::node::NodeId;
use std::time::Duration;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TimerKind {
    Replenish,
    Dispatch,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Firing {
    pub node: NodeId,
    pub kind: TimerKind,
    pub at: Duration,
}

#[derive(Clone, Debug)]
struct Timer {
    node: NodeId,
    kind: TimerKind,
    interval: Duration,
    next_due: Duration,
    seq: u64,
}

/// Periodic timers on a simulated clock. Nothing fires on its own: the
/// caller pulls due firings one at a time, so a firing always runs to
/// completion before the next one starts.
#[derive(Debug, Default)]
pub struct Scheduler {
    now: Duration,
    timers: Vec<Timer>,
    next_seq: u64,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn now(&self) -> Duration {
        self.now
    }

    /// (Re)starts a timer firing every `interval` from now. A zero interval
    /// disarms it instead.
    pub fn arm(&mut self, node: NodeId, kind: TimerKind, interval: Duration) {
        self.disarm(node, kind);
        if interval.is_zero() {
            return;
        }
        self.timers.push(Timer {
            node,
            kind,
            interval,
            next_due: self.now + interval,
            seq: self.next_seq,
        });
        self.next_seq += 1;
    }

    pub fn disarm(&mut self, node: NodeId, kind: TimerKind) {
        self.timers.retain(|t| !(t.node == node && t.kind == kind));
    }

    pub fn is_armed(&self, node: NodeId, kind: TimerKind) -> bool {
        self.timers.iter().any(|t| t.node == node && t.kind == kind)
    }

    pub fn next_due(&self, node: NodeId, kind: TimerKind) -> Option<Duration> {
        self.timers
            .iter()
            .find(|t| t.node == node && t.kind == kind)
            .map(|t| t.next_due)
    }

    /// Earliest firing due no later than `until`; ties go to the timer armed
    /// first. Moves the clock to the firing time and reschedules the timer.
    pub fn pop_due(&mut self, until: Duration) -> Option<Firing> {
        let timer = self
            .timers
            .iter_mut()
            .filter(|t| t.next_due <= until)
            .min_by_key(|t| (t.next_due, t.seq))?;

        let firing = Firing {
            node: timer.node,
            kind: timer.kind,
            at: timer.next_due,
        };
        timer.next_due += timer.interval;
        self.now = self.now.max(firing.at);
        Some(firing)
    }

    pub fn settle(&mut self, until: Duration) {
        self.now = self.now.max(until);
    }
}
