use thiserror::Error;

/// Failures surfaced by chain operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FeederError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("insufficient stock in {node}: requested {requested}, available {available}")]
    InsufficientStock {
        node: String,
        requested: i64,
        available: i64,
    },

    #[error("remote feed '{feed}' did not acknowledge")]
    PublishFailure { feed: String },
}

/// Configuration file errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Read(#[source] std::io::Error),

    #[error("failed to parse config file: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("failed to write config file: {0}")]
    Write(#[source] std::io::Error),

    #[error("config references unknown feeder '{0}'")]
    UnknownFeeder(String),

    #[error("feeder '{key}': {source}")]
    Invalid {
        key: String,
        #[source]
        source: FeederError,
    },
}
