//! CLI subcommand implementations.

pub mod import;
pub mod log_visit;
pub mod seed;
pub mod status;
pub mod trends;
