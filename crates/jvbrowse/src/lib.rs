#![forbid(unsafe_code)]

pub mod browse;
pub mod cli;
pub mod config;
pub mod coordinator;
pub mod derived;
pub mod discovery;
pub mod merge;
pub mod models;
pub mod process;
pub mod repository;
pub mod sqlite;
pub mod state;
pub mod utils;

use std::sync::OnceLock;

use log::LevelFilter;

pub use cli::app::{Cli, Command};

static LOGGER: OnceLock<()> = OnceLock::new();

/// Installs the stderr logger once; `RUST_LOG` overrides the crate's `info` default.
pub fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if std::env::var("RUST_LOG").is_err() {
            builder.filter_module("jvbrowse", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}
