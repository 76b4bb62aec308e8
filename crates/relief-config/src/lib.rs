//! Configuration system for the relief terrain pipeline.
//!
//! Provides ingestion and world-streaming settings that persist to disk as RON
//! files. Supports CLI overrides via clap, hot-reload detection, and
//! forward/backward compatible serialization.

mod cli;
mod config;
mod error;

pub use cli::{CliArgs, Command, IngestArgs, SampleArgs};
pub use config::{Config, DebugConfig, IngestConfig, WorldConfig, default_config_dir};
pub use error::ConfigError;
