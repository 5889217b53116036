//! Trend dashboard CLI library.
//!
//! This crate provides the CLI interface for the trend dashboard.

mod cli;
pub mod commands;
mod config;

use std::path::Path;

use anyhow::{Context, Result};

pub use cli::{Cli, Commands};
pub use config::Config;

/// Load config and open database, ensuring the parent directory exists.
pub fn open_database(config_path: Option<&Path>) -> Result<(tb_db::Database, Config)> {
    let config = Config::load_from(config_path).context("failed to load configuration")?;
    tracing::debug!(?config, "loaded configuration");

    if let Some(parent) = config.database_path.parent() {
        std::fs::create_dir_all(parent).context("failed to create database directory")?;
    }

    let db = tb_db::Database::open(&config.database_path)
        .with_context(|| format!("failed to open {}", config.database_path.display()))?;
    Ok((db, config))
}
