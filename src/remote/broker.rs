use crate::remote::channel::{ReadyCounter, RemoteChannel, Telemetry};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::rc::Rc;

pub const ORDER_FEED: &str = "order";
pub const READY_FEED: &str = "ready";

const HISTORY_LIMIT: usize = 64;

pub fn stock_feed(key: &str) -> String {
    format!("{key}.stock")
}

#[derive(Clone, Debug, Default)]
pub struct Feed {
    last: Option<i64>,
    history: VecDeque<i64>,
    delivered: u64,
    failures: u64,
}

impl Feed {
    pub fn last(&self) -> Option<i64> {
        self.last
    }

    pub fn history(&self) -> impl Iterator<Item = i64> + '_ {
        self.history.iter().copied()
    }

    pub fn delivered(&self) -> u64 {
        self.delivered
    }

    pub fn failures(&self) -> u64 {
        self.failures
    }

    fn record(&mut self, value: i64) {
        self.last = Some(value);
        self.delivered += 1;
        if self.history.len() == HISTORY_LIMIT {
            self.history.pop_front();
        }
        self.history.push_back(value);
    }
}

struct BrokerState {
    feeds: HashMap<String, Feed>,
    loss_rate: f64,
    rng: StdRng,
    offline: bool,
    scripted_failures: HashMap<String, u32>,
}

/// In-process stand-in for the publish/subscribe service. Cloning yields
/// another handle to the same feeds.
#[derive(Clone)]
pub struct Broker {
    state: Rc<RefCell<BrokerState>>,
}

impl Broker {
    pub fn new(seed: u64, loss_rate: f64) -> Self {
        Self {
            state: Rc::new(RefCell::new(BrokerState {
                feeds: HashMap::new(),
                loss_rate: sanitize_rate(loss_rate),
                rng: StdRng::seed_from_u64(seed),
                offline: false,
                scripted_failures: HashMap::new(),
            })),
        }
    }

    pub fn reliable() -> Self {
        Self::new(0, 0.0)
    }

    pub fn channel(&self, feed: &str) -> FeedChannel {
        FeedChannel {
            broker: self.clone(),
            feed: feed.to_string(),
        }
    }

    /// Progress and ready feeds backed by this broker.
    pub fn telemetry(&self) -> Telemetry {
        Telemetry::new(
            Box::new(self.channel(ORDER_FEED)),
            Box::new(self.channel(READY_FEED)),
            Box::new(self.clone()),
        )
    }

    pub fn set_offline(&self, offline: bool) {
        self.state.borrow_mut().offline = offline;
    }

    pub fn is_offline(&self) -> bool {
        self.state.borrow().offline
    }

    pub fn set_loss_rate(&self, loss_rate: f64) {
        self.state.borrow_mut().loss_rate = sanitize_rate(loss_rate);
    }

    pub fn loss_rate(&self) -> f64 {
        self.state.borrow().loss_rate
    }

    /// Makes the next `count` publishes on `feed` go unacknowledged.
    pub fn fail_next(&self, feed: &str, count: u32) {
        self.state
            .borrow_mut()
            .scripted_failures
            .insert(feed.to_string(), count);
    }

    /// Writes a value as if another client had published it.
    pub fn inject(&self, feed: &str, value: i64) {
        self.state
            .borrow_mut()
            .feeds
            .entry(feed.to_string())
            .or_default()
            .record(value);
    }

    pub fn feed(&self, feed: &str) -> Option<Feed> {
        self.state.borrow().feeds.get(feed).cloned()
    }

    pub fn last_value(&self, feed: &str) -> Option<i64> {
        self.state.borrow().feeds.get(feed).and_then(|f| f.last)
    }

    pub fn history(&self, feed: &str) -> Vec<i64> {
        self.state
            .borrow()
            .feeds
            .get(feed)
            .map(|f| f.history().collect())
            .unwrap_or_default()
    }

    pub fn failures(&self, feed: &str) -> u64 {
        self.state
            .borrow()
            .feeds
            .get(feed)
            .map_or(0, |f| f.failures)
    }

    fn deliver(&self, feed: &str, value: i64) -> bool {
        let mut state = self.state.borrow_mut();
        let scripted = match state.scripted_failures.get_mut(feed) {
            Some(n) if *n > 0 => {
                *n -= 1;
                true
            }
            _ => false,
        };
        let loss_rate = state.loss_rate;
        let lost = state.offline || scripted || state.rng.gen_bool(loss_rate);

        let entry = state.feeds.entry(feed.to_string()).or_default();
        if lost {
            entry.failures += 1;
            false
        } else {
            entry.record(value);
            true
        }
    }
}

impl ReadyCounter for Broker {
    fn ready_count(&self) -> i64 {
        if self.is_offline() {
            return 0;
        }
        self.last_value(READY_FEED).unwrap_or(0)
    }
}

fn sanitize_rate(rate: f64) -> f64 {
    if rate.is_finite() {
        rate.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

pub struct FeedChannel {
    broker: Broker,
    feed: String,
}

impl RemoteChannel for FeedChannel {
    fn feed(&self) -> &str {
        &self.feed
    }

    fn publish(&mut self, value: i64) -> bool {
        self.broker.deliver(&self.feed, value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reliable_broker_records_values() {
        let broker = Broker::reliable();
        let mut channel = broker.channel("a.stock");

        assert!(channel.publish(4));
        assert!(channel.publish(7));
        assert_eq!(Some(7), broker.last_value("a.stock"));
        assert_eq!(vec![4, 7], broker.history("a.stock"));
        assert_eq!(None, broker.last_value("b.stock"));
    }

    #[test]
    fn test_scripted_failures_are_consumed() {
        let broker = Broker::reliable();
        let mut channel = broker.channel("a.stock");
        broker.fail_next("a.stock", 2);

        assert!(!channel.publish(1));
        assert!(!channel.publish(2));
        assert!(channel.publish(3));
        assert_eq!(2, broker.failures("a.stock"));
        assert_eq!(vec![3], broker.history("a.stock"));
    }

    #[test]
    fn test_offline_broker_rejects_everything() {
        let broker = Broker::reliable();
        broker.inject(READY_FEED, 12);
        assert_eq!(12, broker.ready_count());

        broker.set_offline(true);
        assert!(!broker.channel("x").publish(1));
        assert_eq!(0, broker.ready_count());

        broker.set_offline(false);
        assert!(broker.channel("x").publish(1));
    }

    #[test]
    fn test_full_loss_rate_never_acknowledges() {
        let broker = Broker::new(7, 1.0);
        let mut channel = broker.channel("x");
        assert!((0..20).all(|i| !channel.publish(i)));
        assert_eq!(20, broker.failures("x"));
    }

    #[test]
    fn test_loss_rate_is_sanitized() {
        assert_eq!(1.0, Broker::new(1, 4.0).loss_rate());
        assert_eq!(0.0, Broker::new(1, f64::NAN).loss_rate());
    }

    #[test]
    fn test_history_is_bounded() {
        let broker = Broker::reliable();
        let mut channel = broker.channel("x");
        for i in 0..(HISTORY_LIMIT as i64 + 10) {
            channel.publish(i);
        }
        let history = broker.history("x");
        assert_eq!(HISTORY_LIMIT, history.len());
        assert_eq!(Some(&10), history.first());
        assert_eq!(HISTORY_LIMIT as u64 + 10, broker.feed("x").unwrap().delivered());
    }

    #[test]
    fn test_telemetry_raises_ready_counter() {
        let broker = Broker::reliable();
        let mut telemetry = broker.telemetry();
        broker.inject(READY_FEED, 5);

        assert!(telemetry.publish_ready(3));
        assert_eq!(Some(8), broker.last_value(READY_FEED));
        assert!(telemetry.publish_progress(-2));
        assert_eq!(Some(0), broker.last_value(ORDER_FEED));
    }
}
