pub mod broker;
pub mod channel;
