#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Snapshot {
    elapsed_ms: u64,
    /// indexed by NodeId
    stocks: Vec<i64>,
    /// remaining quantity of each node's disbursement task, 0 when idle
    pending: Vec<i64>,
}

impl Snapshot {
    pub fn new(elapsed_ms: u64, stocks: Vec<i64>, pending: Vec<i64>) -> Self {
        Self {
            elapsed_ms,
            stocks,
            pending,
        }
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.elapsed_ms
    }

    pub fn stocks(&self) -> &[i64] {
        &self.stocks
    }

    pub fn pending(&self) -> &[i64] {
        &self.pending
    }

    pub fn total_stock(&self) -> i64 {
        self.stocks.iter().sum()
    }
}
