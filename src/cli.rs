use crate::config::DEFAULT_CONFIG_FILE;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "feedchain", version, about = "Simulates a self-replenishing chain of feeders")]
pub struct Cli {
    /// JSON configuration overriding the built-in chain
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_FILE)]
    pub config: PathBuf,

    #[arg(long, global = true, default_value = "logs")]
    pub log_dir: PathBuf,

    /// Seed for the simulated link's packet loss
    #[arg(long, global = true, default_value_t = 0)]
    pub seed: u64,

    /// Probability in [0, 1] that a publish goes unacknowledged
    #[arg(long, global = true, default_value_t = 0.0)]
    pub loss: f64,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum Command {
    /// Interactive terminal dashboard (default)
    Dashboard {
        /// Simulated seconds per real second
        #[arg(long, default_value_t = 1.0)]
        speed: f64,
    },
    /// Runs the chain without a UI and prints the final stocks
    Run {
        #[arg(long, default_value_t = 120)]
        seconds: u64,

        /// Order placed on the terminal feeder; repeat for more
        #[arg(long = "order", allow_negative_numbers = true)]
        orders: Vec<i64>,

        /// Seconds between consecutive orders
        #[arg(long, default_value_t = 30)]
        order_every: u64,
    },
    /// Writes the built-in chain as a configuration file
    InitConfig {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}
