//! Configuration module for Snapshot-Courier
//!
//! This module loads settings from the process environment (optionally
//! seeded from a `.env` file), applies defaults and validates the result.
//!
//! # Example
//!
//! ```no_run
//! use snapshot_courier::config::{load_config, load_env_file};
//!
//! load_env_file(None).unwrap();
//! let config = load_config().unwrap();
//! println!("Daily trigger at {}", config.schedule.trigger_time);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{Config, FetchConfig, MailConfig, OutputConfig, ScheduleConfig};

// Re-export parser functions
pub use parser::{load_config, load_config_from, load_env_file, parse_trigger_time};
