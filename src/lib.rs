pub mod analysis;
pub mod chain;
pub mod cli;
pub mod command;
pub mod config;
pub mod error;
pub mod logging;
pub mod preset;
pub mod remote;
pub mod simulation;
pub mod state;
pub mod tui;
