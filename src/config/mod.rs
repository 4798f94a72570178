pub mod file;

pub use file::{ChainConfig, DEFAULT_CONFIG_FILE, FeederSettings};
