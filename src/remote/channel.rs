/// Outbound link mirroring one integer value to the remote side.
pub trait RemoteChannel {
    fn feed(&self) -> &str;

    /// Attempts delivery and reports whether it was acknowledged.
    fn publish(&mut self, value: i64) -> bool;
}

/// Last known value of the external "items ready" counter; 0 when unknown.
pub trait ReadyCounter {
    fn ready_count(&self) -> i64;
}

/// Feeds shared by every disbursement: order progress and the ready counter.
pub struct Telemetry {
    progress: Box<dyn RemoteChannel>,
    ready: Box<dyn RemoteChannel>,
    counter: Box<dyn ReadyCounter>,
}

impl Telemetry {
    pub fn new(
        progress: Box<dyn RemoteChannel>,
        ready: Box<dyn RemoteChannel>,
        counter: Box<dyn ReadyCounter>,
    ) -> Self {
        Self {
            progress,
            ready,
            counter,
        }
    }

    pub fn publish_progress(&mut self, remaining: i64) -> bool {
        self.progress.publish(remaining.max(0))
    }

    /// Publishes the ready counter raised by `amount`.
    pub fn publish_ready(&mut self, amount: i64) -> bool {
        let total = self.counter.ready_count() + amount;
        self.ready.publish(total)
    }

    pub fn progress_feed(&self) -> &str {
        self.progress.feed()
    }

    pub fn ready_feed(&self) -> &str {
        self.ready.feed()
    }
}
