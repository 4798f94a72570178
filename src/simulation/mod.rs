pub mod disburse;
pub mod engine;
pub mod order;
pub mod replenish;
pub mod scheduler;
